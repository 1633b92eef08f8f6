use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    time::Duration,
};

use clap::{Parser, Subcommand};
use huesync_core::{
    hue::{self, HOST_KEY, USERNAME_KEY},
    lights::memory::MemoryProvider,
    mapping::name_key,
    Bridge, ChannelAssignment, Clock, ConfigStore, HttpRetriever, HueProvider, Provider,
    Retriever, RunSettings, SyncError,
};
use tracing_subscriber::EnvFilter;

fn main() -> huesync_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut store = ConfigStore::open(&cli.config)?;

    match cli.command {
        Commands::Setup => run_setup(&mut store),
        Commands::Run(args) => run_sync(&mut store, args),
        Commands::Lights => list_lights(&mut store),
    }
}

fn run_setup(store: &mut ConfigStore) -> huesync_core::Result<()> {
    let provider = connect(store)?;
    let stdin = io::stdin();
    huesync_core::setup::calibrate(&provider, store, stdin.lock(), io::stdout())
}

fn run_sync(store: &mut ConfigStore, args: RunArgs) -> huesync_core::Result<()> {
    let settings = args.settings(store.run_settings()?);
    tracing::info!(url = %args.url, ?settings, "starting run");

    let retriever = HttpRetriever::new(&settings.data_url)?;
    let data = retriever.get(&args.url)?;
    let (source, timeline) = huesync_core::decode(&data)?;
    tracing::info!(%source, updates = timeline.len(), "decoded timeline");

    let mut clock = Clock::start(settings.offset_seconds);
    let poll_delay = Duration::try_from_secs_f64(settings.poll_delay_seconds)
        .map_err(|err| SyncError::msg(format!("invalid poll delay: {err}")))?;

    if args.dry_run {
        let provider = dry_run_provider(store);
        huesync_core::run_once(
            &provider,
            &mut clock,
            &timeline,
            store,
            poll_delay,
            settings.transition_seconds,
        )
    } else {
        let provider = connect(store)?;
        huesync_core::run_once(
            &provider,
            &mut clock,
            &timeline,
            store,
            poll_delay,
            settings.transition_seconds,
        )
    }
}

fn list_lights(store: &mut ConfigStore) -> huesync_core::Result<()> {
    let provider = connect(store)?;
    let mut stdout = io::stdout().lock();
    for light in provider.lights()? {
        let assignment = ChannelAssignment::from_store(store, light.id());
        match assignment.slot() {
            Some(_) => writeln!(
                stdout,
                "{}\t{}\t{:?} {}",
                light.id(),
                light.name(),
                assignment.kind,
                assignment.index
            )?,
            None => writeln!(stdout, "{}\t{}\tunassigned", light.id(), light.name())?,
        }
    }
    Ok(())
}

/// Connects to the stored bridge, pairing a new one first if necessary.
fn connect(store: &mut ConfigStore) -> huesync_core::Result<HueProvider> {
    if !Bridge::is_paired(store) {
        pair_bridge(store)?;
    }
    HueProvider::connect(Bridge::from_store(store)?)
}

fn pair_bridge(store: &mut ConfigStore) -> huesync_core::Result<()> {
    tracing::info!("setting up Philips Hue bridge");

    let host = match hue::discover()? {
        Some(host) => host,
        None => ask("No bridge found in network. Please enter the IP address of your bridge: ")?,
    };
    if host.is_empty() {
        return Err(SyncError::msg("no bridge address given"));
    }

    ask("Press link button on bridge and press enter to continue.")?;
    let username = hue::pair(&host)?;

    store.set(HOST_KEY, &host)?;
    store.set(USERNAME_KEY, username)?;
    store.save()?;
    tracing::info!(%host, "paired bridge");
    Ok(())
}

/// Provider that only logs what would be sent to the lights recorded in the
/// configuration.
fn dry_run_provider(store: &ConfigStore) -> MemoryProvider {
    store
        .children("lights")
        .into_iter()
        .fold(MemoryProvider::new(), |provider, id| {
            let name = store.get_str(&name_key(&id)).unwrap_or(&id).to_string();
            provider.with_light(id, name)
        })
}

fn ask(question: &str) -> huesync_core::Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{question}")?;
    stdout.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Keeps Hue lights in sync with a video's color timeline", long_about = None)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true, default_value = "config.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Pair the bridge if needed and assign lights to channels.
    Setup,
    /// Follow the timeline of a video with the configured lights.
    Run(RunArgs),
    /// List the bridge's lights and their channel assignments.
    Lights,
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// URL of the video that is playing.
    #[arg(long)]
    url: String,
    /// Playback position in seconds when the run starts. May be negative.
    #[arg(long, allow_negative_numbers = true)]
    offset: Option<f64>,
    /// Seconds between two updates.
    #[arg(long)]
    delay: Option<f64>,
    /// Seconds each light takes to transition.
    #[arg(long)]
    transition: Option<f64>,
    /// Base URL of the timeline data.
    #[arg(long)]
    data: Option<String>,
    /// Log light changes instead of sending them to the bridge.
    #[arg(long)]
    dry_run: bool,
}

impl RunArgs {
    /// Overrides the stored settings with whatever was given on the command line.
    fn settings(&self, stored: RunSettings) -> RunSettings {
        RunSettings {
            poll_delay_seconds: self.delay.unwrap_or(stored.poll_delay_seconds),
            transition_seconds: self.transition.unwrap_or(stored.transition_seconds),
            offset_seconds: self.offset.unwrap_or(stored.offset_seconds),
            data_url: self.data.clone().unwrap_or(stored.data_url),
        }
    }
}
