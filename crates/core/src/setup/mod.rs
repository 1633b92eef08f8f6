use std::io::{BufRead, Write};

use crate::{
    mapping::{index_key, kind_key, name_key, ChannelKind},
    ConfigStore, Light, Provider, Result, SyncError,
};

/// Walks through every light and asks which channel it should follow.
///
/// Each light flashes while its questions are open. Answers are written to
/// `store` under `lights.<id>` and the store is saved at the end. Declining a
/// light, or picking neither hue nor temperature, removes its assignment.
pub fn calibrate<R: BufRead, W: Write>(
    provider: &dyn Provider,
    store: &mut ConfigStore,
    mut input: R,
    mut output: W,
) -> Result<()> {
    let lights = provider.lights()?;
    tracing::info!(count = lights.len(), "calibrating lights");

    for light in &lights {
        let stop = light.alert()?;
        let outcome = ask_assignment(light.as_ref(), &mut input, &mut output);
        stop()?;

        match outcome? {
            Some((kind, index)) => {
                let id = light.id();
                store.set(&kind_key(id), kind.as_config_value())?;
                store.set(&index_key(id), index)?;
                store.set(&name_key(id), light.name())?;
                tracing::info!(light = light.name(), ?kind, index, "assigned light");
            }
            None => {
                store.delete(&format!("lights.{}", light.id()));
                tracing::info!(light = light.name(), "light left unassigned");
            }
        }
    }

    store.save()
}

fn ask_assignment<R: BufRead, W: Write>(
    light: &dyn Light,
    input: &mut R,
    output: &mut W,
) -> Result<Option<(ChannelKind, u64)>> {
    let answer = prompt(
        input,
        output,
        &format!("Would you like to configure light {:?}? (y/N) ", light.name()),
    )?;
    if answer != "y" {
        return Ok(None);
    }

    let kind = match prompt(input, output, "Hue or Temperature? (h/t) ")?.as_str() {
        "h" => ChannelKind::Hue,
        "t" => ChannelKind::Temperature,
        _ => {
            writeln!(output, "Invalid input. Ignoring this light.")?;
            return Ok(None);
        }
    };

    let index = prompt(input, output, "Which hue/temperature index? ")?;
    let index = index
        .parse::<u64>()
        .ok()
        .filter(|index| *index > 0)
        .ok_or_else(|| SyncError::msg(format!("invalid channel index `{index}`")))?;

    Ok(Some((kind, index)))
}

fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> Result<String> {
    write!(output, "{question}")?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(SyncError::msg("input ended before setup was complete"));
    }
    Ok(line.trim().to_string())
}
