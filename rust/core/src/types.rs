// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed value records shared by every Wayfinder crate.
//!
//! Positions are `nalgebra::Point3<f64>` in a right-handed, Y-up frame;
//! the horizontal plane is X/Z. Orientation is a fixed-field quaternion.
//! Incoming JSON payloads are loosely typed, so explicit conversion
//! functions turn them into these records at the boundary.

use nalgebra::{Point3, Quaternion, UnitQuaternion};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Unit quaternion stored as plain fields
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quat {
    pub const IDENTITY: Quat = Quat {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    #[inline]
    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// Normalized nalgebra rotation
    pub fn to_rotation(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::from_quaternion(Quaternion::new(self.w, self.x, self.y, self.z))
    }
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// One device pose sample from a position trace
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSample {
    /// Seconds since the trace started (monotonic per device)
    pub time: f64,
    pub position: Point3<f64>,
    pub orientation: Quat,
}

impl PositionSample {
    pub fn new(time: f64, position: Point3<f64>) -> Self {
        Self {
            time,
            position,
            orientation: Quat::IDENTITY,
        }
    }
}

/// Axis-aligned rectangle on the horizontal (X/Z) plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect2 {
    pub min_x: f64,
    pub min_z: f64,
    pub max_x: f64,
    pub max_z: f64,
}

impl Rect2 {
    pub fn new(min_x: f64, min_z: f64, max_x: f64, max_z: f64) -> Self {
        Self {
            min_x,
            min_z,
            max_x,
            max_z,
        }
    }

    /// Square centered on the origin
    pub fn centered(half_extent: f64) -> Self {
        Self::new(-half_extent, -half_extent, half_extent, half_extent)
    }

    /// Empty accumulator for [`Rect2::include`]
    pub fn empty() -> Self {
        Self::new(f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_z > self.max_z
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[inline]
    pub fn depth(&self) -> f64 {
        self.max_z - self.min_z
    }

    pub fn include(&mut self, x: f64, z: f64) {
        self.min_x = self.min_x.min(x);
        self.min_z = self.min_z.min(z);
        self.max_x = self.max_x.max(x);
        self.max_z = self.max_z.max(z);
    }

    pub fn union(&self, other: &Rect2) -> Rect2 {
        Rect2::new(
            self.min_x.min(other.min_x),
            self.min_z.min(other.min_z),
            self.max_x.max(other.max_x),
            self.max_z.max(other.max_z),
        )
    }

    pub fn expanded(&self, margin: f64) -> Rect2 {
        Rect2::new(
            self.min_x - margin,
            self.min_z - margin,
            self.max_x + margin,
            self.max_z + margin,
        )
    }

    #[inline]
    pub fn contains(&self, x: f64, z: f64) -> bool {
        x >= self.min_x && x <= self.max_x && z >= self.min_z && z <= self.max_z
    }
}

// ============================================================================
// Loosely-typed JSON conversion
// ============================================================================

fn number_field(value: &Value, key: &str) -> Result<f64> {
    value
        .get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| Error::InvalidValue(format!("missing numeric field '{}'", key)))
}

fn number_array<const N: usize>(items: &[Value]) -> Result<[f64; N]> {
    if items.len() != N {
        return Err(Error::InvalidValue(format!(
            "expected {} components, got {}",
            N,
            items.len()
        )));
    }
    let mut out = [0.0; N];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = item
            .as_f64()
            .ok_or_else(|| Error::InvalidValue(format!("non-numeric component {}", item)))?;
    }
    Ok(out)
}

/// Converts `{"x":..,"y":..,"z":..}` or `[x, y, z]` into a point.
pub fn vec3_from_json(value: &Value) -> Result<Point3<f64>> {
    match value {
        Value::Array(items) => {
            let [x, y, z] = number_array::<3>(items)?;
            Ok(Point3::new(x, y, z))
        }
        Value::Object(_) => Ok(Point3::new(
            number_field(value, "x")?,
            number_field(value, "y")?,
            number_field(value, "z")?,
        )),
        other => Err(Error::InvalidValue(format!("not a vector: {}", other))),
    }
}

/// Converts `{"x":..,"y":..,"z":..,"w":..}` or `[x, y, z, w]` into a quaternion.
pub fn quat_from_json(value: &Value) -> Result<Quat> {
    match value {
        Value::Array(items) => {
            let [x, y, z, w] = number_array::<4>(items)?;
            Ok(Quat::new(x, y, z, w))
        }
        Value::Object(_) => Ok(Quat::new(
            number_field(value, "x")?,
            number_field(value, "y")?,
            number_field(value, "z")?,
            number_field(value, "w")?,
        )),
        other => Err(Error::InvalidValue(format!("not a quaternion: {}", other))),
    }
}

/// Converts `{"time":.., "position":.., "orientation":..}`; orientation is optional.
pub fn sample_from_json(value: &Value) -> Result<PositionSample> {
    let time = value.get("time").and_then(Value::as_f64).unwrap_or(0.0);
    let position = value
        .get("position")
        .ok_or_else(|| Error::InvalidValue("missing 'position'".into()))
        .and_then(vec3_from_json)?;
    let orientation = match value.get("orientation") {
        Some(v) if !v.is_null() => quat_from_json(v)?,
        _ => Quat::IDENTITY,
    };
    Ok(PositionSample {
        time,
        position,
        orientation,
    })
}
