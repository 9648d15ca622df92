use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// A point or direction in the arena plane.
///
/// Positive x is to the right, positive y is down (screen coordinates),
/// so the "up" direction is (0, -1).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns the magnitude of the vector.
    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Returns the dot product of two vectors.
    pub fn dot(&self, other: &Vec2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Returns the vector scaled by a scalar.
    pub fn scale(&self, scalar: f64) -> Vec2 {
        Vec2 {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }

    /// Returns the unit-length vector pointing the same way.
    ///
    /// The zero vector has no direction and is returned unchanged; callers
    /// must not rely on normalizing (0, 0).
    pub fn normalize(&self) -> Vec2 {
        let len = self.length();
        if len == 0.0 {
            Vec2 { x: 0.0, y: 0.0 }
        } else {
            Vec2 {
                x: self.x / len,
                y: self.y / len,
            }
        }
    }

    /// Returns the angle in degrees, clockwise from the up vector (0, -1).
    ///
    /// Only renderers need this; the simulation works on raw vectors.
    pub fn to_angle(&self) -> f64 {
        self.x.atan2(-self.y).to_degrees()
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, other: Vec2) -> Vec2 {
        Vec2 {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, other: Vec2) -> Vec2 {
        Vec2 {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }
}
