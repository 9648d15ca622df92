//! The per-tick control intent a client sends to the server.

use crate::vector::Vec2;
use serde::{Deserialize, Serialize};

/// Requested movement direction for the tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Movement {
    Up,
    Down,
    Left,
    Right,
    None,
}

/// Requested weapon for the tick. `Alt` is the beam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FireType {
    Main,
    Alt,
    None,
}

/// One client intent, sent as a single JSON line. At most one command is in
/// effect per tank per tick; an `alt` fire replaces whatever was already
/// buffered so a beam shot is never dropped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlCommand {
    pub moving: Movement,
    pub fire: FireType,
    #[serde(rename = "tdir")]
    pub turret_direction: Vec2,
}

impl ControlCommand {
    pub fn new(moving: Movement, fire: FireType, turret_direction: Vec2) -> Self {
        Self {
            moving,
            fire,
            turret_direction,
        }
    }
}
