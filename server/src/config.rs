//! Server settings, loaded once at startup from a JSON file.

use serde::Deserialize;
use shared::Vec2;
use std::path::Path;

/// Endpoints of one static wall segment. Walls are axis-aligned, so one
/// coordinate is shared between the two points.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WallSpec {
    pub p1: Vec2,
    pub p2: Vec2,
}

/// Everything tunable about a match. Fields missing from the settings file
/// fall back to the defaults below.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Side length of the square arena.
    pub world_size: i32,
    /// Wall-clock budget of one tick.
    pub ms_per_frame: u64,
    /// Ticks between main cannon shots.
    pub frames_per_shot: u32,
    /// Ticks a dead tank waits before respawning.
    pub respawn_rate: u32,
    /// Ticks of the post-spawn invincibility window.
    pub invincibility_frames: u32,
    /// Cap on simultaneously live powerups.
    pub max_powerups: usize,
    /// Upper bound of the randomized powerup spawn delay, in ticks.
    pub max_powerup_delay: u32,
    /// When enabled, dying also costs the victim one point.
    pub score_decrement: bool,
    pub walls: Vec<WallSpec>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            world_size: 2000,
            ms_per_frame: 17,
            frames_per_shot: 80,
            respawn_rate: 300,
            invincibility_frames: 150,
            max_powerups: 4,
            max_powerup_delay: 1650,
            score_decrement: false,
            walls: Vec::new(),
        }
    }
}

impl Settings {
    /// Reads settings from a JSON file. Any read or parse failure aborts
    /// startup; a half-understood configuration is worse than none.
    pub fn load(path: &Path) -> Result<Settings, Box<dyn std::error::Error>> {
        let text = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&text)?;
        Ok(settings)
    }
}
