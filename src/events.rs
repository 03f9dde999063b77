//! Events published to subscribers.
//!
//! Every message is a single JSON envelope `{"e": <name>, "d": <payload>}`.
//! The payload set is closed: one variant per event name.

use crate::enrichment::{PlayersInSlot, SharedGeometry};
use crate::error::Result;
use crate::types::{Entity, ObjectId, Offset};
use serde::{Deserialize, Serialize};

pub const SESSION_STATE: &str = "SESSION_STATE";
pub const SESSION_RADAR_SNAPSHOT: &str = "SESSION_RADAR_SNAPSHOT";
pub const SESSION_SHARED_GEOMETRY: &str = "SESSION_SHARED_GEOMETRY";
pub const SESSION_PLAYERS_IN_SLOT: &str = "SESSION_PLAYERS_IN_SLOT";

/// Full baseline of a session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStatePayload {
    pub session_id: String,
    pub offset: Offset,
    pub objects: Vec<Entity>,
}

/// Changes since the previous diff cycle.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RadarSnapshot {
    pub offset: Offset,
    pub created: Vec<Entity>,
    pub updated: Vec<Entity>,
    pub deleted: Vec<ObjectId>,
}

impl RadarSnapshot {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }
}

/// A session event, tagged by its wire name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "e", content = "d")]
pub enum SessionEvent {
    #[serde(rename = "SESSION_STATE")]
    SessionState(SessionStatePayload),

    #[serde(rename = "SESSION_RADAR_SNAPSHOT")]
    RadarSnapshot(RadarSnapshot),

    #[serde(rename = "SESSION_SHARED_GEOMETRY")]
    SharedGeometry(SharedGeometry),

    #[serde(rename = "SESSION_PLAYERS_IN_SLOT")]
    PlayersInSlot(PlayersInSlot),
}

impl SessionEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::SessionState(_) => SESSION_STATE,
            SessionEvent::RadarSnapshot(_) => SESSION_RADAR_SNAPSHOT,
            SessionEvent::SharedGeometry(_) => SESSION_SHARED_GEOMETRY,
            SessionEvent::PlayersInSlot(_) => SESSION_PLAYERS_IN_SLOT,
        }
    }

    /// Encode as an envelope.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Envelope for events outside the closed set.
#[derive(Serialize)]
struct Envelope<'a, T: Serialize + ?Sized> {
    e: &'a str,
    d: &'a T,
}

/// Encode an arbitrary payload under `event`.
pub fn encode_envelope<T: Serialize + ?Sized>(event: &str, payload: &T) -> Result<String> {
    Ok(serde_json::to_string(&Envelope { e: event, d: payload })?)
}
