//! World-Space 3D Vector
//!
//! Avatar positions as reported by browsers. Coordinates are plain `f64`
//! world units; the server never simulates, it only validates and clamps.

use std::fmt;
use serde::{Serialize, Deserialize};
use serde_json::Value;

/// 3D point in world units.
#[derive(Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component
    pub x: f64,
    /// Y component
    pub y: f64,
    /// Z component
    pub z: f64,
}

impl Vec3 {
    /// Origin
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0 };

    /// Create a new vector.
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Read a vector from an untrusted JSON payload.
    ///
    /// Returns `None` unless the value is an object whose `x`, `y` and `z`
    /// members are all JSON numbers. Extra members are ignored.
    pub fn from_json(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let coord = |key: &str| obj.get(key).and_then(Value::as_f64);
        Some(Self {
            x: coord("x")?,
            y: coord("y")?,
            z: coord("z")?,
        })
    }

    /// Clamp every component into `[-limit, limit]`.
    ///
    /// Each axis is clamped independently, so an out-of-range coordinate
    /// never disturbs the other two.
    #[inline]
    pub fn clamp_cube(self, limit: f64) -> Self {
        Self {
            x: clamp_axis(self.x, limit),
            y: clamp_axis(self.y, limit),
            z: clamp_axis(self.z, limit),
        }
    }

    /// Check if every component lies within `[-limit, limit]`.
    #[inline]
    pub fn is_within_cube(self, limit: f64) -> bool {
        [self.x, self.y, self.z]
            .iter()
            .all(|c| (-limit..=limit).contains(c))
    }
}

#[inline]
fn clamp_axis(value: f64, limit: f64) -> f64 {
    value.max(-limit).min(limit)
}

impl fmt::Debug for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vec3({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_from_json_accepts_numbers() {
        let v = Vec3::from_json(&json!({"x": 1, "y": -2.5, "z": 3e2})).unwrap();
        assert_eq!(v, Vec3::new(1.0, -2.5, 300.0));
    }

    #[test]
    fn test_from_json_ignores_extra_members() {
        let v = Vec3::from_json(&json!({"x": 0, "y": 0, "z": 0, "w": "ignored"}));
        assert_eq!(v, Some(Vec3::ZERO));
    }

    #[test]
    fn test_from_json_rejects_bad_shapes() {
        let bad = [
            json!(null),
            json!(42),
            json!([1, 2, 3]),
            json!({"x": 1, "y": 2}),
            json!({"x": "1", "y": 2, "z": 3}),
            json!({"x": 1, "y": null, "z": 3}),
            json!({"x": 1, "y": 2, "z": true}),
        ];
        for value in bad {
            assert_eq!(Vec3::from_json(&value), None, "accepted {}", value);
        }
    }

    #[test]
    fn test_clamp_cube() {
        let v = Vec3::new(100.0, -0.5, -75.0).clamp_cube(50.0);
        assert_eq!(v, Vec3::new(50.0, -0.5, -50.0));
        assert!(v.is_within_cube(50.0));
    }

    #[test]
    fn test_in_range_untouched() {
        let v = Vec3::new(49.999, -50.0, 50.0);
        assert_eq!(v.clamp_cube(50.0), v);
    }

    proptest! {
        #[test]
        fn prop_clamp_always_within(x in -1e9f64..1e9, y in -1e9f64..1e9, z in -1e9f64..1e9) {
            prop_assert!(Vec3::new(x, y, z).clamp_cube(50.0).is_within_cube(50.0));
        }

        #[test]
        fn prop_out_of_range_axis_pins_to_signed_limit(
            mag in 50.0001f64..1e9,
            negative in any::<bool>(),
            y in -1e9f64..1e9,
            z in -1e9f64..1e9,
        ) {
            let x = if negative { -mag } else { mag };
            let clamped = Vec3::new(x, y, z).clamp_cube(50.0);
            prop_assert_eq!(clamped.x, if negative { -50.0 } else { 50.0 });
            prop_assert_eq!(clamped.y, Vec3::new(y, 0.0, 0.0).clamp_cube(50.0).x);
        }
    }
}
