//! Types shared by the TankWars server and its clients: geometry, entity
//! records, the control command, and the line-delimited JSON wire codec.
//!
//! The server is the single authority over every record defined here;
//! clients only render what they are told. Keeping the records and the
//! codec in one crate guarantees both ends agree on the wire shape.

pub mod codec;
pub mod command;
pub mod entities;
pub mod vector;

pub use codec::{to_line, DecodeError, FrameBuffer, ServerRecord};
pub use command::{ControlCommand, FireType, Movement};
pub use entities::{
    within_expansion, Beam, Powerup, Projectile, Tank, Wall, BEAM_RADIUS, MAX_NAME_LEN,
    PROJECTILE_SIZE, PROJECTILE_SPEED, TANK_SIZE, TANK_SPEED, WALL_THICKNESS,
};
pub use vector::Vec2;
