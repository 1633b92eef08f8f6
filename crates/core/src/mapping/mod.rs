use crate::{ConfigStore, Light};

/// Highest 1-based channel index a light can be assigned to.
pub const MAX_CHANNELS: usize = 256;

/// Which kind of channel a light listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Hue,
    Temperature,
    Unassigned,
}

impl ChannelKind {
    /// Parses the kind stored in the configuration. Unknown values mean the
    /// light is not assigned.
    pub fn parse(value: &str) -> Self {
        match value {
            "hue" => Self::Hue,
            "temp" | "temperature" => Self::Temperature,
            _ => Self::Unassigned,
        }
    }

    /// Value written to the configuration for this kind.
    pub fn as_config_value(self) -> Option<&'static str> {
        match self {
            Self::Hue => Some("hue"),
            Self::Temperature => Some("temp"),
            Self::Unassigned => None,
        }
    }
}

/// Configuration key holding the channel kind of a light.
pub fn kind_key(light_id: &str) -> String {
    format!("lights.{light_id}.type")
}

/// Configuration key holding the 1-based channel index of a light.
pub fn index_key(light_id: &str) -> String {
    format!("lights.{light_id}.index")
}

/// Configuration key holding the display name recorded during setup.
pub fn name_key(light_id: &str) -> String {
    format!("lights.{light_id}.name")
}

/// Channel a single light has been assigned to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelAssignment {
    pub light_id: String,
    pub kind: ChannelKind,
    /// 1-based channel index. Zero means unassigned.
    pub index: usize,
}

impl ChannelAssignment {
    pub fn from_store(store: &ConfigStore, light_id: &str) -> Self {
        let kind = store
            .get_str(&kind_key(light_id))
            .map(ChannelKind::parse)
            .unwrap_or(ChannelKind::Unassigned);
        let index = store
            .get_u64(&index_key(light_id))
            .and_then(|index| usize::try_from(index).ok())
            .unwrap_or(0);

        Self {
            light_id: light_id.to_string(),
            kind,
            index,
        }
    }

    /// Zero-based slot of the assignment, if the light takes part at all.
    pub fn slot(&self) -> Option<usize> {
        match self.kind {
            ChannelKind::Unassigned => None,
            _ => self.index.checked_sub(1),
        }
    }
}

/// Lights grouped into hue and temperature channels.
///
/// Both channel lists share one length: the highest index assigned to any
/// light. A slot may hold several lights, all of which receive that
/// channel's value.
#[derive(Debug, Default)]
pub struct ChannelMap<'a> {
    hue: Vec<Vec<&'a dyn Light>>,
    temperature: Vec<Vec<&'a dyn Light>>,
}

impl<'a> ChannelMap<'a> {
    pub fn build(lights: &'a [Box<dyn Light>], store: &ConfigStore) -> Self {
        let assigned: Vec<(&'a dyn Light, ChannelKind, usize)> = lights
            .iter()
            .filter_map(|light| {
                let assignment = ChannelAssignment::from_store(store, light.id());
                let slot = assignment.slot()?;
                if slot >= MAX_CHANNELS {
                    tracing::warn!(
                        light = light.id(),
                        index = assignment.index,
                        max = MAX_CHANNELS,
                        "channel index out of range, light left unassigned"
                    );
                    return None;
                }
                Some((light.as_ref(), assignment.kind, slot))
            })
            .collect();

        let len = assigned
            .iter()
            .map(|(_, _, slot)| slot + 1)
            .max()
            .unwrap_or(0);
        let mut map = Self {
            hue: vec![Vec::new(); len],
            temperature: vec![Vec::new(); len],
        };

        for (light, kind, slot) in assigned {
            let channels = match kind {
                ChannelKind::Hue => &mut map.hue,
                ChannelKind::Temperature => &mut map.temperature,
                ChannelKind::Unassigned => continue,
            };
            channels[slot].push(light);
        }

        tracing::debug!(
            channels = len,
            hue_lights = map.hue.iter().map(Vec::len).sum::<usize>(),
            temperature_lights = map.temperature.iter().map(Vec::len).sum::<usize>(),
            "built channel map"
        );
        map
    }

    /// Number of slots in each channel list.
    pub fn len(&self) -> usize {
        self.hue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hue.is_empty()
    }

    /// Lights on hue channel `index` (zero-based). Out-of-range channels are empty.
    pub fn hue(&self, index: usize) -> &[&'a dyn Light] {
        self.hue.get(index).map(Vec::as_slice).unwrap_or_default()
    }

    /// Lights on temperature channel `index` (zero-based).
    pub fn temperature(&self, index: usize) -> &[&'a dyn Light] {
        self.temperature
            .get(index)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
