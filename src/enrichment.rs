//! Externally sourced data republished alongside radar snapshots.
//!
//! The roster of players in slot and the shared map overlay come from an
//! external store. The session only sees decoded payloads through
//! [`EnrichmentSource`]; query construction stays with the implementor.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// A player currently in a slot, as reported by the roster store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SlotPlayer {
    pub discord_id: String,
    pub player_name: String,
}

/// Payload of `SESSION_PLAYERS_IN_SLOT`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayersInSlot {
    #[serde(rename = "Inflight")]
    pub inflight: Vec<SlotPlayer>,
}

/// A shared map overlay item (marker, zone, recon report).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Geometry {
    pub id: i64,
    #[serde(rename = "Type")]
    pub kind: String,
    pub name: String,
    pub discord_name: String,
    pub avatar: String,
    #[serde(rename = "PosMGRS", default, skip_serializing_if = "Option::is_none")]
    pub pos_mgrs: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub screenshot: Vec<String>,
    pub side: String,
    pub server: String,
    #[serde(default)]
    pub position: Vec<f32>,
    #[serde(default)]
    pub points: Vec<Vec<f32>>,
    #[serde(default)]
    pub center: Vec<f32>,
    #[serde(default)]
    pub radius: f32,
}

/// Payload of `SESSION_SHARED_GEOMETRY`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SharedGeometry {
    pub add: Vec<Geometry>,
    pub delete: Vec<i64>,
    pub recon: Vec<Geometry>,
}

/// Source of roster and overlay data for a game server.
///
/// Implementations must use parameterized queries; `server_name` is
/// operator-supplied text.
pub trait EnrichmentSource: Send + Sync {
    /// Players currently in a slot on `server_name`.
    fn fetch_roster(&self, server_name: &str) -> Result<PlayersInSlot>;

    /// Shared overlay geometry for `server_name`.
    fn fetch_overlay(&self, server_name: &str) -> Result<SharedGeometry>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_roster_wire_names() {
        let roster = PlayersInSlot {
            inflight: vec![SlotPlayer {
                discord_id: "1234".to_string(),
                player_name: "Maverick".to_string(),
            }],
        };

        let value = serde_json::to_value(&roster).unwrap();
        assert_eq!(
            value,
            json!({"Inflight": [{"DiscordId": "1234", "PlayerName": "Maverick"}]})
        );
    }

    #[test]
    fn test_geometry_wire_names() {
        let overlay = SharedGeometry {
            add: vec![Geometry {
                id: 4,
                kind: "zone".to_string(),
                name: "CAP North".to_string(),
                points: vec![vec![41.5, 43.1], vec![41.9, 43.6]],
                ..Default::default()
            }],
            delete: vec![2],
            recon: vec![Geometry {
                id: 9,
                kind: "recon".to_string(),
                pos_mgrs: Some("37T GG 12345 67890".to_string()),
                screenshot: vec!["shot.png".to_string()],
                ..Default::default()
            }],
        };

        let value: Value = serde_json::to_value(&overlay).unwrap();
        assert_eq!(value["Add"][0]["Type"], "zone");
        assert_eq!(value["Add"][0]["Points"][1][1], json!(43.6f32));
        assert!(value["Add"][0].get("PosMGRS").is_none());
        assert_eq!(value["Delete"], json!([2]));
        assert_eq!(value["Recon"][0]["PosMGRS"], "37T GG 12345 67890");
        assert_eq!(value["Recon"][0]["Screenshot"], json!(["shot.png"]));
    }
}
