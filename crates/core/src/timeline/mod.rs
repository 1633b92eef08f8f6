use serde::{Deserialize, Serialize};

use crate::{Hsv, Result, SyncError};

/// A color change the lights should reach at a given playback time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColorUpdate {
    /// Playback time of the update in seconds.
    pub timestamp: f64,
    /// Colors for the hue channels, in channel order.
    pub hues: Vec<Hsv>,
    /// White temperatures in Kelvin for the temperature channels.
    pub temperatures: Vec<f64>,
}

impl ColorUpdate {
    pub fn new(timestamp: f64) -> Self {
        Self {
            timestamp,
            ..Default::default()
        }
    }

    pub fn with_hues(mut self, hues: Vec<Hsv>) -> Self {
        self.hues = hues;
        self
    }

    pub fn with_temperatures(mut self, temperatures: Vec<f64>) -> Self {
        self.temperatures = temperatures;
        self
    }
}

/// Color updates of one video, expected in ascending timestamp order.
///
/// The order is a precondition of [`Timeline::select`]; decoding keeps the
/// payload order as-is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    updates: Vec<ColorUpdate>,
}

impl Timeline {
    pub fn new(updates: Vec<ColorUpdate>) -> Self {
        Self { updates }
    }

    pub fn updates(&self) -> &[ColorUpdate] {
        &self.updates
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn is_ascending(&self) -> bool {
        self.updates
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp)
    }

    /// Picks the update that should be active at `timestamp`.
    ///
    /// An update becomes active `lead` seconds before its own timestamp so that
    /// a transition of that length lands on time. The latest such update wins;
    /// `None` means playback has not reached the first one yet.
    pub fn select(&self, timestamp: f64, lead: f64) -> Option<&ColorUpdate> {
        self.updates
            .iter()
            .rev()
            .find(|update| update.timestamp - lead <= timestamp)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawDocument {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    updates: Option<Vec<RawUpdate>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawUpdate {
    #[serde(default)]
    time: Option<f64>,
    #[serde(default)]
    hue: Option<Vec<Vec<f64>>>,
    #[serde(default)]
    temp: Option<Vec<f64>>,
}

impl RawUpdate {
    fn validate(self) -> Result<ColorUpdate> {
        let mut hues = Vec::new();
        for triple in self.hue.iter().flatten() {
            let color = match triple.as_slice() {
                [hue, saturation, value] => Hsv::new(*hue, *saturation, *value),
                _ => return Err(self.reject("hue needs exactly three components")),
            };
            if !color.is_in_range() {
                return Err(self.reject("hue component outside [0, 1]"));
            }
            hues.push(color);
        }

        let temperatures = self.temp.clone().unwrap_or_default();
        if temperatures.iter().any(|kelvin| *kelvin < 0.0) {
            return Err(self.reject("negative temperature"));
        }

        Ok(ColorUpdate {
            timestamp: self.time.unwrap_or_default(),
            hues,
            temperatures,
        })
    }

    fn reject(&self, reason: &str) -> SyncError {
        let payload = serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"));
        SyncError::decode(reason, payload)
    }
}

/// Decodes a timeline document into its video URL and color updates.
///
/// Missing `url`, `updates`, `hue` or `temp` fields decode to empty values. A
/// single invalid update fails the whole document.
pub fn decode(data: &[u8]) -> Result<(String, Timeline)> {
    let document: RawDocument = serde_json::from_slice(data)
        .map_err(|err| SyncError::decode(err.to_string(), String::from_utf8_lossy(data)))?;

    let updates = document
        .updates
        .unwrap_or_default()
        .into_iter()
        .map(RawUpdate::validate)
        .collect::<Result<Vec<_>>>()?;

    Ok((document.url.unwrap_or_default(), Timeline::new(updates)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_step_timeline() -> Timeline {
        Timeline::new(vec![
            ColorUpdate::new(0.0).with_hues(vec![Hsv::new(0.1, 0.2, 0.3)]),
            ColorUpdate::new(10.0).with_hues(vec![Hsv::new(0.4, 0.5, 0.6)]),
        ])
    }

    fn is_decode_error(result: Result<(String, Timeline)>) -> bool {
        matches!(result, Err(SyncError::Decode { .. }))
    }

    #[test]
    fn decodes_empty_document() {
        let (url, timeline) = decode(b"{}").unwrap();
        assert_eq!(url, "");
        assert!(timeline.is_empty());
    }

    #[test]
    fn decodes_url_only() {
        let (url, timeline) = decode(br#"{"url":"http://example.com"}"#).unwrap();
        assert_eq!(url, "http://example.com");
        assert!(timeline.is_empty());
    }

    #[test]
    fn decodes_hues_and_temperatures() {
        let data = br#"{
            "url": "https://www.youtube.com/watch?v=abc",
            "updates": [
                {"time": 1.5, "hue": [[0.1, 0.2, 0.3], [1, 0, 1]], "temp": [2700, 6500]},
                {"time": 4}
            ]
        }"#;
        let (_, timeline) = decode(data).unwrap();

        assert_eq!(timeline.len(), 2);
        let first = &timeline.updates()[0];
        assert_eq!(first.timestamp, 1.5);
        assert_eq!(first.hues, vec![Hsv::new(0.1, 0.2, 0.3), Hsv::new(1.0, 0.0, 1.0)]);
        assert_eq!(first.temperatures, vec![2700.0, 6500.0]);

        let second = &timeline.updates()[1];
        assert!(second.hues.is_empty());
        assert!(second.temperatures.is_empty());
    }

    #[test]
    fn null_fields_decode_as_empty() {
        let (url, timeline) =
            decode(br#"{"url": null, "updates": [{"time": 2, "hue": null, "temp": null}]}"#)
                .unwrap();
        assert_eq!(url, "");
        assert_eq!(timeline.updates()[0], ColorUpdate::new(2.0));
    }

    #[test]
    fn rejects_out_of_range_hue() {
        assert!(is_decode_error(decode(br#"{"updates":[{"hue":[[1.1,0,0]]}]}"#)));
        assert!(is_decode_error(decode(br#"{"updates":[{"hue":[[0,-0.1,0]]}]}"#)));
    }

    #[test]
    fn rejects_wrong_hue_length() {
        assert!(is_decode_error(decode(br#"{"updates":[{"hue":[[0.1,0.2]]}]}"#)));
        assert!(is_decode_error(decode(br#"{"updates":[{"hue":[[0.1,0.2,0.3,0.4]]}]}"#)));
    }

    #[test]
    fn rejects_negative_temperature() {
        assert!(is_decode_error(decode(br#"{"updates":[{"temp":[2700,-1]}]}"#)));
    }

    #[test]
    fn decode_error_carries_the_offending_update() {
        let err = decode(br#"{"updates":[{"time":3,"hue":[[0.5,0.5,7]]}]}"#).unwrap_err();
        match err {
            SyncError::Decode { payload, .. } => assert!(payload.contains('7')),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(is_decode_error(decode(b"not json")));
        assert!(is_decode_error(decode(br#"{"updates":[{"hue":["red"]}]}"#)));
    }

    #[test]
    fn selects_with_transition_lead() {
        let timeline = two_step_timeline();

        assert_eq!(timeline.select(7.0, 2.0).unwrap().timestamp, 0.0);
        assert_eq!(timeline.select(8.0, 2.0).unwrap().timestamp, 10.0);
        assert_eq!(timeline.select(9.0, 2.0).unwrap().timestamp, 10.0);
        assert_eq!(timeline.select(-1.0, 2.0).unwrap().timestamp, 0.0);
        assert!(timeline.select(-2.5, 2.0).is_none());
    }

    #[test]
    fn selects_none_only_before_the_first_update() {
        let timeline = two_step_timeline();
        let lead = 2.0;
        let earliest = timeline.updates()[0].timestamp - lead;

        assert!(timeline.select(earliest - 0.001, lead).is_none());
        assert!(timeline.select(earliest, lead).is_some());
        assert!(Timeline::default().select(100.0, lead).is_none());
    }

    #[test]
    fn selection_is_monotonic_in_time() {
        let timeline = Timeline::new(
            [0.0, 3.0, 3.0, 7.5, 12.0, 40.0]
                .into_iter()
                .map(ColorUpdate::new)
                .collect(),
        );

        let mut last_seen = f64::NEG_INFINITY;
        let mut t = -5.0;
        while t < 50.0 {
            if let Some(update) = timeline.select(t, 1.5) {
                assert!(update.timestamp >= last_seen);
                last_seen = update.timestamp;
            } else {
                assert_eq!(last_seen, f64::NEG_INFINITY);
            }
            t += 0.25;
        }
    }

    #[test]
    fn select_returns_the_stored_entry() {
        let timeline = two_step_timeline();
        let selected = timeline.select(20.0, 0.0).unwrap();
        assert!(std::ptr::eq(selected, &timeline.updates()[1]));
    }

    #[test]
    fn reports_ordering() {
        assert!(two_step_timeline().is_ascending());
        let unsorted = Timeline::new(vec![ColorUpdate::new(5.0), ColorUpdate::new(1.0)]);
        assert!(!unsorted.is_ascending());
    }
}
