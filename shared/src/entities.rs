//! Entity records shared between server and clients.
//!
//! Every record serializes to the exact wire shape described in the protocol:
//! one JSON object per line, identified by its discriminant key (`tank`,
//! `proj`, `wall`, `power`, `beam`). Server-only bookkeeping (velocity and
//! the per-tank frame counters) is kept off the wire with `#[serde(skip)]`.

use crate::command::Movement;
use crate::vector::Vec2;
use serde::{Deserialize, Serialize};

/// Side length of a tank's sprite; collision expansions derive from it.
pub const TANK_SIZE: f64 = 60.0;
/// Distance a tank covers per tick while a movement key is held.
pub const TANK_SPEED: f64 = 3.0;
/// Side length of a projectile sprite.
pub const PROJECTILE_SIZE: f64 = 30.0;
/// Distance a projectile covers per tick.
pub const PROJECTILE_SPEED: f64 = 25.0;
/// Full thickness of a wall segment.
pub const WALL_THICKNESS: f64 = 50.0;
/// Radius of the circle used for beam hit tests.
pub const BEAM_RADIUS: f64 = 30.0;
/// Display names longer than this are truncated on join.
pub const MAX_NAME_LEN: usize = 16;

/// True when `point` lies strictly inside the square of half-width
/// `expansion` centered on `center`. All tank-vs-thing overlap tests in the
/// game reduce to this single-point-plus-expansion check.
pub fn within_expansion(center: Vec2, point: Vec2, expansion: f64) -> bool {
    (point.x - center.x).abs() < expansion && (point.y - center.y).abs() < expansion
}

/// A player's tank. The serialized fields are rebroadcast every tick;
/// the skipped fields are the server's per-tick bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tank {
    #[serde(rename = "tank")]
    pub id: u32,
    #[serde(rename = "loc")]
    pub location: Vec2,
    /// Body facing, follows the last movement direction.
    #[serde(rename = "bdir")]
    pub orientation: Vec2,
    /// Turret aim, independent of body facing.
    #[serde(rename = "tdir")]
    pub aiming: Vec2,
    pub name: String,
    pub hp: u32,
    pub score: i32,
    /// Set for exactly one broadcast when the tank dies.
    pub died: bool,
    #[serde(rename = "dc")]
    pub disconnected: bool,
    /// Set for exactly one broadcast when the tank first appears.
    #[serde(rename = "join")]
    pub joined: bool,

    #[serde(skip)]
    pub velocity: Vec2,
    #[serde(skip)]
    fire_frames: u32,
    #[serde(skip)]
    respawn_frames: u32,
    #[serde(skip)]
    invincibility_frames: u32,
    /// Accumulated powerup charges, i.e. beam ammo.
    #[serde(skip)]
    pub powerup_count: u32,
}

impl Tank {
    /// Creates a tank at the origin with full health, facing up.
    ///
    /// The fire counter starts at `fire_max` so a fresh tank can shoot
    /// immediately; the invincibility counter starts at zero so a fresh
    /// tank spawns inside its invincibility window.
    pub fn new(id: u32, name: &str, fire_max: u32) -> Self {
        let mut name = name.to_string();
        name.truncate(MAX_NAME_LEN);
        Self {
            id,
            location: Vec2::default(),
            orientation: Vec2::new(0.0, -1.0),
            aiming: Vec2::new(0.0, -1.0),
            name,
            hp: 3,
            score: 0,
            died: false,
            disconnected: false,
            joined: true,
            velocity: Vec2::default(),
            fire_frames: fire_max,
            respawn_frames: 0,
            invincibility_frames: 0,
            powerup_count: 0,
        }
    }

    /// Points the body along the requested direction and sets the per-tick
    /// velocity; `Movement::None` stops the tank but keeps its facing.
    pub fn change_dir_and_vel(&mut self, moving: Movement) {
        match moving {
            Movement::Left => self.orientation = Vec2::new(-1.0, 0.0),
            Movement::Right => self.orientation = Vec2::new(1.0, 0.0),
            Movement::Up => self.orientation = Vec2::new(0.0, -1.0),
            Movement::Down => self.orientation = Vec2::new(0.0, 1.0),
            Movement::None => {
                self.velocity = Vec2::default();
                return;
            }
        }
        self.velocity = self.orientation.scale(TANK_SPEED);
    }

    /// True when the projectile overlaps this tank and is allowed to hit it:
    /// the tank must be alive and must not own the projectile.
    ///
    /// The overlap test expands the tank's center point rather than a true
    /// two-corner box; see the collision notes in DESIGN.md.
    pub fn collides_projectile(&self, proj: &Projectile) -> bool {
        let expansion = TANK_SIZE / 2.0 + PROJECTILE_SIZE / 2.0;
        self.hp > 0
            && proj.owner != self.id
            && within_expansion(self.location, proj.location, expansion)
    }

    /// True when a powerup at `loc` is within pickup range.
    pub fn collides_powerup(&self, loc: Vec2) -> bool {
        within_expansion(self.location, loc, TANK_SIZE / 2.0)
    }

    /// The main cannon is ready once the counter has climbed back to max.
    pub fn can_fire(&self, fire_max: u32) -> bool {
        self.fire_frames == fire_max
    }

    pub fn advance_fire_frame(&mut self, fire_max: u32) {
        if self.fire_frames != fire_max {
            self.fire_frames += 1;
        }
    }

    pub fn reset_fire_frame(&mut self) {
        self.fire_frames = 0;
    }

    /// A dead tank may be relocated once the respawn delay has elapsed.
    pub fn can_respawn(&self, respawn_max: u32) -> bool {
        self.respawn_frames == respawn_max
    }

    pub fn advance_death_frame(&mut self, respawn_max: u32) {
        if self.respawn_frames != respawn_max {
            self.respawn_frames += 1;
        }
    }

    pub fn reset_death_frame(&mut self) {
        self.respawn_frames = 0;
    }

    /// The invincibility window holds until the counter reaches max.
    pub fn is_invincible(&self, invincible_max: u32) -> bool {
        self.invincibility_frames != invincible_max
    }

    pub fn advance_invincibility_frame(&mut self, invincible_max: u32) {
        if self.invincibility_frames != invincible_max {
            self.invincibility_frames += 1;
        }
    }

    pub fn reset_invincibility(&mut self) {
        self.invincibility_frames = 0;
    }

    /// The beam weapon spends one powerup charge per shot.
    pub fn can_fire_beam(&self) -> bool {
        self.powerup_count > 0
    }
}

/// A cannon round in flight. Destroyed on wall hit, tank hit, or when it
/// leaves the arena; the `died` flag is broadcast once before the record
/// is purged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    #[serde(rename = "proj")]
    pub id: u32,
    #[serde(rename = "loc")]
    pub location: Vec2,
    #[serde(rename = "dir")]
    pub orientation: Vec2,
    pub died: bool,
    pub owner: u32,
}

impl Projectile {
    pub fn new(id: u32, owner: u32, location: Vec2, orientation: Vec2) -> Self {
        Self {
            id,
            location,
            orientation,
            died: false,
            owner,
        }
    }
}

/// A static wall segment, always axis-aligned; sent once during the
/// handshake and never again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wall {
    #[serde(rename = "wall")]
    pub id: u32,
    pub p1: Vec2,
    pub p2: Vec2,
}

impl Wall {
    pub fn new(id: u32, p1: Vec2, p2: Vec2) -> Self {
        Self { id, p1, p2 }
    }

    /// Corner extremes as (left, right, top, bottom).
    fn bounds(&self) -> (f64, f64, f64, f64) {
        (
            self.p1.x.min(self.p2.x),
            self.p1.x.max(self.p2.x),
            self.p1.y.min(self.p2.y),
            self.p1.y.max(self.p2.y),
        )
    }

    fn collides(&self, point: Vec2, expansion: f64) -> bool {
        let (left, right, top, bot) = self.bounds();
        left - expansion < point.x
            && point.x < right + expansion
            && top - expansion < point.y
            && point.y < bot + expansion
    }

    /// True when a tank centered at `loc` would overlap this wall.
    pub fn collides_tank(&self, loc: Vec2) -> bool {
        self.collides(loc, WALL_THICKNESS / 2.0 + TANK_SIZE / 2.0)
    }

    /// True when a projectile at `loc` would overlap this wall.
    pub fn collides_projectile(&self, loc: Vec2) -> bool {
        self.collides(loc, WALL_THICKNESS / 2.0 + PROJECTILE_SIZE / 2.0)
    }

    /// True when a powerup at `loc` would sit inside this wall.
    pub fn collides_powerup(&self, loc: Vec2) -> bool {
        self.collides(loc, WALL_THICKNESS / 2.0 + 5.0)
    }
}

/// A collectible granting one beam charge to whichever tank drives over it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Powerup {
    #[serde(rename = "power")]
    pub id: u32,
    #[serde(rename = "loc")]
    pub location: Vec2,
    pub died: bool,
}

impl Powerup {
    pub fn new(id: u32, location: Vec2) -> Self {
        Self {
            id,
            location,
            died: false,
        }
    }
}

/// An instantaneous beam shot. Beams are never stored in the world; each
/// one is broadcast exactly once on the tick it was fired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Beam {
    #[serde(rename = "beam")]
    pub id: u32,
    #[serde(rename = "org")]
    pub origin: Vec2,
    #[serde(rename = "dir")]
    pub direction: Vec2,
    pub owner: u32,
}

impl Beam {
    pub fn new(id: u32, owner: u32, origin: Vec2, direction: Vec2) -> Self {
        Self {
            id,
            origin,
            direction,
            owner,
        }
    }
}
