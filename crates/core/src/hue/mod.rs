//! Philips Hue bridge support over the bridge's local REST API.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    color::{transition_deciseconds, TemperatureBucket, MAX_BRIDGE_LEVEL},
    AlertStop, ConfigStore, Hsv, Light, Provider, Result, SyncError,
};

/// Public endpoint listing the bridges registered on the caller's network.
pub const DISCOVERY_URL: &str = "https://discovery.meethue.com/";
/// Configuration key holding the bridge address.
pub const HOST_KEY: &str = "bridge.philips.ip";
/// Configuration key holding the user created while pairing.
pub const USERNAME_KEY: &str = "bridge.philips.username";

const DEVICE_TYPE: &str = "huesync#cli";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const SUPPORTED_TYPES: [&str; 2] = ["Color temperature light", "Extended color light"];

fn client() -> Result<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|err| SyncError::Provider(err.to_string()))
}

#[derive(Debug, Deserialize)]
struct DiscoveredBridge {
    #[serde(rename = "internalipaddress")]
    address: String,
}

/// Looks up the first bridge registered on the local network.
pub fn discover() -> Result<Option<String>> {
    let bridges: Vec<DiscoveredBridge> = client()?
        .get(DISCOVERY_URL)
        .send()
        .and_then(|response| response.json())
        .map_err(|err| SyncError::Provider(format!("bridge discovery failed: {err}")))?;
    Ok(bridges
        .into_iter()
        .map(|bridge| bridge.address)
        .find(|address| !address.is_empty()))
}

/// Creates a user on the bridge at `host`. The bridge's link button has to be
/// pressed shortly before.
pub fn pair(host: &str) -> Result<String> {
    let response: Value = client()?
        .post(format!("http://{host}/api"))
        .json(&serde_json::json!({ "devicetype": DEVICE_TYPE }))
        .send()
        .and_then(|response| response.json())
        .map_err(|err| SyncError::Provider(err.to_string()))?;

    bridge_errors(&response).map_err(SyncError::Provider)?;
    response
        .pointer("/0/success/username")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| SyncError::Provider(format!("unexpected pairing response: {response}")))
}

/// Connection to a paired bridge.
#[derive(Debug, Clone)]
pub struct Bridge {
    api: String,
    client: Client,
}

impl Bridge {
    pub fn new(host: &str, username: &str) -> Result<Self> {
        Ok(Self::with_client(host, username, client()?))
    }

    pub fn with_client(host: &str, username: &str, client: Client) -> Self {
        Self {
            api: format!("http://{host}/api/{username}"),
            client,
        }
    }

    /// Connects with the credentials stored by a previous pairing.
    pub fn from_store(store: &ConfigStore) -> Result<Self> {
        let host = store
            .get_str(HOST_KEY)
            .ok_or_else(|| SyncError::Config(format!("`{HOST_KEY}` is not set")))?;
        let username = store
            .get_str(USERNAME_KEY)
            .ok_or_else(|| SyncError::Config(format!("`{USERNAME_KEY}` is not set")))?;
        Self::new(host, username)
    }

    /// Returns whether `store` holds credentials for a bridge.
    pub fn is_paired(store: &ConfigStore) -> bool {
        store.exists(HOST_KEY) && store.exists(USERNAME_KEY)
    }

    fn fetch_lights(&self) -> Result<Vec<LightInfo>> {
        let response: Value = self
            .client
            .get(format!("{}/lights", self.api))
            .send()
            .and_then(|response| response.json())
            .map_err(|err| SyncError::Provider(err.to_string()))?;
        parse_lights(&response)
    }

    fn put_state(&self, light: &LightInfo, state: &LightState) -> Result<()> {
        let response: Value = self
            .client
            .put(format!("{}/lights/{}/state", self.api, light.number))
            .json(state)
            .send()
            .and_then(|response| response.json())
            .map_err(|err| SyncError::device(&light.unique_id, err))?;
        bridge_errors(&response).map_err(|message| SyncError::device(&light.unique_id, message))
    }
}

/// Provider serving the color and white-ambiance lights of one bridge.
#[derive(Debug, Clone)]
pub struct HueProvider {
    bridge: Bridge,
}

impl HueProvider {
    /// Connects to the bridge and checks that it answers.
    pub fn connect(bridge: Bridge) -> Result<Self> {
        bridge.fetch_lights()?;
        Ok(Self { bridge })
    }
}

impl Provider for HueProvider {
    fn lights(&self) -> Result<Vec<Box<dyn Light>>> {
        let lights = self.bridge.fetch_lights()?;
        tracing::debug!(count = lights.len(), "enumerated bridge lights");
        Ok(lights
            .into_iter()
            .map(|info| {
                Box::new(HueLight {
                    bridge: self.bridge.clone(),
                    info,
                }) as Box<dyn Light>
            })
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LightInfo {
    number: String,
    unique_id: String,
    name: String,
}

/// A single light behind a [`Bridge`].
#[derive(Debug, Clone)]
pub struct HueLight {
    bridge: Bridge,
    info: LightInfo,
}

impl Light for HueLight {
    fn id(&self) -> &str {
        &self.info.unique_id
    }

    fn name(&self) -> &str {
        &self.info.name
    }

    fn set_color(&self, color: &Hsv, transition_seconds: f64) -> Result<()> {
        self.bridge
            .put_state(&self.info, &LightState::color(color, transition_seconds))
    }

    fn set_temperature(&self, kelvin: f64, transition_seconds: f64) -> Result<()> {
        self.bridge
            .put_state(&self.info, &LightState::temperature(kelvin, transition_seconds))
    }

    fn alert(&self) -> Result<AlertStop<'_>> {
        self.bridge
            .put_state(&self.info, &LightState::alert("lselect"))?;
        Ok(Box::new(move || {
            self.bridge.put_state(&self.info, &LightState::alert("none"))
        }))
    }
}

/// Body of a `PUT /lights/<n>/state` request.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
struct LightState {
    #[serde(skip_serializing_if = "Option::is_none")]
    on: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hue: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sat: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bri: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ct: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    alert: Option<&'static str>,
    #[serde(rename = "transitiontime", skip_serializing_if = "Option::is_none")]
    transition_time: Option<u16>,
}

impl LightState {
    fn color(color: &Hsv, transition_seconds: f64) -> Self {
        Self {
            on: Some(true),
            hue: Some(color.bridge_hue()),
            sat: Some(color.bridge_saturation()),
            bri: Some(color.bridge_brightness()),
            transition_time: Some(transition_deciseconds(transition_seconds)),
            ..Default::default()
        }
    }

    fn temperature(kelvin: f64, transition_seconds: f64) -> Self {
        Self {
            on: Some(true),
            ct: Some(TemperatureBucket::from_kelvin(kelvin).mired()),
            bri: Some(MAX_BRIDGE_LEVEL),
            transition_time: Some(transition_deciseconds(transition_seconds)),
            ..Default::default()
        }
    }

    fn alert(mode: &'static str) -> Self {
        Self {
            alert: Some(mode),
            ..Default::default()
        }
    }
}

/// Collects the descriptions of any error entries in a bridge response.
fn bridge_errors(response: &Value) -> std::result::Result<(), String> {
    let errors: Vec<&str> = response
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.pointer("/error/description"))
        .map(|description| description.as_str().unwrap_or("unknown bridge error"))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join("; "))
    }
}

fn parse_lights(response: &Value) -> Result<Vec<LightInfo>> {
    bridge_errors(response).map_err(SyncError::Provider)?;
    let lights = response
        .as_object()
        .ok_or_else(|| SyncError::Provider(format!("unexpected lights response: {response}")))?;

    let mut result: Vec<LightInfo> = lights
        .iter()
        .filter(|(_, light)| {
            light
                .get("type")
                .and_then(Value::as_str)
                .is_some_and(|kind| SUPPORTED_TYPES.contains(&kind))
        })
        .map(|(number, light)| {
            let field = |name: &str| {
                light
                    .get(name)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            LightInfo {
                number: number.clone(),
                unique_id: field("uniqueid"),
                name: field("name"),
            }
        })
        .collect();

    result.sort_by_key(|light| light.number.parse::<u32>().unwrap_or(u32::MAX));
    Ok(result)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::{local_client, serve_once};

    fn local_light(address: &str) -> HueLight {
        let host = address.trim_start_matches("http://");
        HueLight {
            bridge: Bridge::with_client(host, "user", local_client()),
            info: LightInfo {
                number: "3".to_string(),
                unique_id: "00:17:88:01:03-0b".to_string(),
                name: "Desk".to_string(),
            },
        }
    }

    #[test]
    fn lists_supported_lights_in_bridge_order() {
        let response = json!({
            "10": {"type": "Extended color light", "name": "Sofa", "uniqueid": "00:17:88:01:0a-0b"},
            "2": {"type": "Color temperature light", "name": "Desk", "uniqueid": "00:17:88:01:02-0b"},
            "3": {"type": "Dimmable light", "name": "Hall", "uniqueid": "00:17:88:01:03-0b"}
        });

        let lights = parse_lights(&response).unwrap();
        assert_eq!(
            lights,
            vec![
                LightInfo {
                    number: "2".to_string(),
                    unique_id: "00:17:88:01:02-0b".to_string(),
                    name: "Desk".to_string(),
                },
                LightInfo {
                    number: "10".to_string(),
                    unique_id: "00:17:88:01:0a-0b".to_string(),
                    name: "Sofa".to_string(),
                },
            ]
        );
    }

    #[test]
    fn surfaces_bridge_errors() {
        let response = json!([
            {"error": {"type": 1, "address": "/lights", "description": "unauthorized user"}}
        ]);
        let err = parse_lights(&response).unwrap_err();
        assert!(matches!(err, SyncError::Provider(ref message) if message == "unauthorized user"));

        let ok = json!([{"success": {"/lights/1/state/on": true}}]);
        assert!(bridge_errors(&ok).is_ok());
    }

    #[test]
    fn color_state_uses_bridge_units() {
        let state = LightState::color(&Hsv::new(0.5, 1.0, 0.5), 2.5);
        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            json!({"on": true, "hue": 32767, "sat": 254, "bri": 127, "transitiontime": 25})
        );
    }

    #[test]
    fn temperature_state_is_bucketed() {
        let cold = LightState::temperature(6500.0, 10.0);
        let neutral = LightState::temperature(4000.0, 10.0);
        let warm = LightState::temperature(2200.0, 10.0);

        assert_eq!(cold.ct, Some(153));
        assert_eq!(neutral.ct, Some(250));
        assert_eq!(warm.ct, Some(500));
        assert_eq!(warm.transition_time, Some(100));
        assert_eq!(warm.bri, Some(MAX_BRIDGE_LEVEL));
    }

    #[test]
    fn alert_state_only_sets_alert() {
        assert_eq!(
            serde_json::to_value(LightState::alert("lselect")).unwrap(),
            json!({"alert": "lselect"})
        );
    }

    #[test]
    fn requires_stored_credentials() {
        let mut store = ConfigStore::in_memory();
        assert!(!Bridge::is_paired(&store));
        assert!(matches!(Bridge::from_store(&store), Err(SyncError::Config(_))));

        store.set(HOST_KEY, "192.168.1.20").unwrap();
        store.set(USERNAME_KEY, "abc").unwrap();
        assert!(Bridge::is_paired(&store));
        assert!(Bridge::from_store(&store).is_ok());
    }

    #[test]
    fn state_changes_reach_the_light_endpoint() {
        let (address, path) = serve_once(
            "200 OK",
            "application/json",
            r#"[{"success":{"/lights/3/state/ct":500}}]"#,
        );
        let light = local_light(&address);

        light.set_temperature(2700.0, 1.0).unwrap();
        assert_eq!(path.recv().unwrap(), "/api/user/lights/3/state");
    }

    #[test]
    fn bridge_errors_become_device_errors() {
        let (address, _path) = serve_once(
            "200 OK",
            "application/json",
            r#"[{"error":{"type":201,"address":"/lights/3/state/hue","description":"parameter, hue, is not modifiable. Device is set to off."}}]"#,
        );
        let light = local_light(&address);

        let err = light.set_color(&Hsv::new(0.5, 1.0, 1.0), 1.0).unwrap_err();
        match err {
            SyncError::Device { light, message } => {
                assert_eq!(light, "00:17:88:01:03-0b");
                assert!(message.contains("is not modifiable"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
