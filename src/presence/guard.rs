//! Rate/Bounds Guard
//!
//! Gatekeeper for inbound position reports. Throttles each connection to a
//! minimum interval between accepted updates, validates the payload shape,
//! and clamps coordinates into the world cube.
//!
//! Out-of-range positions are corrected rather than dropped so a desynced
//! client stays visible at the boundary instead of freezing for observers.

use std::time::{Duration, Instant};
use serde_json::Value;

use crate::core::vec3::Vec3;
use crate::presence::participant::ConnectionId;
use crate::presence::registry::SessionRegistry;

/// Half-width of the world cube, in world units.
pub const POSITION_LIMIT: f64 = 50.0;

/// Minimum time between two accepted updates from one connection (20/s).
pub const UPDATE_INTERVAL: Duration = Duration::from_millis(50);

/// Guard tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuardConfig {
    /// Coordinates are clamped into `[-position_limit, position_limit]`.
    pub position_limit: f64,
    /// Floor interval between accepted updates.
    pub update_interval: Duration,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            position_limit: POSITION_LIMIT,
            update_interval: UPDATE_INTERVAL,
        }
    }
}

/// Why an update was not admitted. Never surfaced to the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Arrived inside the floor interval of the last accepted update.
    Throttled,
    /// Payload is not an `{x, y, z}` numeric triple.
    Malformed,
    /// Connection is not registered.
    UnknownConnection,
}

/// Per-connection throttle plus world-bounds clamp.
#[derive(Debug, Clone, Default)]
pub struct RateGuard {
    config: GuardConfig,
}

impl RateGuard {
    /// Create a guard.
    pub fn new(config: GuardConfig) -> Self {
        Self { config }
    }

    /// Get guard configuration.
    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Admit a position report.
    ///
    /// On success the clamped position is written into the participant, the
    /// connection's rate record is stamped with `now`, and the clamped value
    /// is returned for broadcast. Rejections leave the registry untouched.
    pub fn admit(
        &self,
        registry: &mut SessionRegistry,
        id: &ConnectionId,
        proposed: &Value,
        now: Instant,
    ) -> Result<Vec3, Rejection> {
        let (participant, rate) = registry
            .entry_mut(id)
            .ok_or(Rejection::UnknownConnection)?;

        if let Some(last) = rate.last_accepted {
            if now.saturating_duration_since(last) < self.config.update_interval {
                return Err(Rejection::Throttled);
            }
        }

        let position = Vec3::from_json(proposed).ok_or(Rejection::Malformed)?;
        let clamped = position.clamp_cube(self.config.position_limit);

        rate.last_accepted = Some(now);
        participant.position = clamped;

        Ok(clamped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    use crate::presence::participant::{AvatarKind, HslColor, Participant, SPAWN_POINT};

    fn registry_with_one() -> (SessionRegistry, ConnectionId) {
        let mut registry = SessionRegistry::new();
        let id = ConnectionId::new_v4();
        registry
            .insert(Participant::new(id, "SharpShark9".into(), HslColor::from_hue(10.0), AvatarKind::Dino))
            .unwrap();
        (registry, id)
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_first_update_accepted() {
        let (mut registry, id) = registry_with_one();
        let guard = RateGuard::default();
        let now = Instant::now();

        let pos = guard.admit(&mut registry, &id, &json!({"x": 1, "y": 2, "z": 3}), now).unwrap();
        assert_eq!(pos, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(registry.get(&id).unwrap().position, pos);
        assert_eq!(registry.rate_record(&id).unwrap().last_accepted, Some(now));
    }

    #[test]
    fn test_clamps_out_of_bounds() {
        let (mut registry, id) = registry_with_one();
        let guard = RateGuard::default();

        let pos = guard
            .admit(&mut registry, &id, &json!({"x": 100, "y": 0, "z": -1e6}), Instant::now())
            .unwrap();
        assert_eq!(pos, Vec3::new(50.0, 0.0, -50.0));
    }

    #[test]
    fn test_throttle_window() {
        let (mut registry, id) = registry_with_one();
        let guard = RateGuard::default();
        let t0 = Instant::now();
        let p = json!({"x": 0, "y": 0, "z": 0});

        assert!(guard.admit(&mut registry, &id, &p, t0).is_ok());
        assert_eq!(guard.admit(&mut registry, &id, &p, t0 + ms(1)), Err(Rejection::Throttled));
        assert_eq!(guard.admit(&mut registry, &id, &p, t0 + ms(49)), Err(Rejection::Throttled));
        assert!(guard.admit(&mut registry, &id, &p, t0 + ms(50)).is_ok());
        assert_eq!(guard.admit(&mut registry, &id, &p, t0 + ms(99)), Err(Rejection::Throttled));
        assert!(guard.admit(&mut registry, &id, &p, t0 + ms(100)).is_ok());
    }

    #[test]
    fn test_throttled_update_leaves_state() {
        let (mut registry, id) = registry_with_one();
        let guard = RateGuard::default();
        let t0 = Instant::now();

        guard.admit(&mut registry, &id, &json!({"x": 1, "y": 1, "z": 1}), t0).unwrap();
        let _ = guard.admit(&mut registry, &id, &json!({"x": 9, "y": 9, "z": 9}), t0 + ms(10));

        assert_eq!(registry.get(&id).unwrap().position, Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(registry.rate_record(&id).unwrap().last_accepted, Some(t0));
    }

    #[test]
    fn test_malformed_rejected_without_stamping() {
        let (mut registry, id) = registry_with_one();
        let guard = RateGuard::default();
        let t0 = Instant::now();

        let bad = json!({"x": "left", "y": 0, "z": 0});
        assert_eq!(guard.admit(&mut registry, &id, &bad, t0), Err(Rejection::Malformed));
        assert_eq!(guard.admit(&mut registry, &id, &json!(null), t0), Err(Rejection::Malformed));
        assert_eq!(registry.get(&id).unwrap().position, SPAWN_POINT);
        assert_eq!(registry.rate_record(&id).unwrap().last_accepted, None);

        // A valid report right after a malformed one is not throttled.
        assert!(guard.admit(&mut registry, &id, &json!({"x": 0, "y": 0, "z": 0}), t0 + ms(1)).is_ok());
    }

    #[test]
    fn test_unknown_connection() {
        let mut registry = SessionRegistry::new();
        let guard = RateGuard::default();
        let result = guard.admit(&mut registry, &ConnectionId::new_v4(), &json!({"x": 0, "y": 0, "z": 0}), Instant::now());
        assert_eq!(result, Err(Rejection::UnknownConnection));
    }

    #[test]
    fn test_connections_throttled_independently() {
        let (mut registry, a) = registry_with_one();
        let b = ConnectionId::new_v4();
        registry
            .insert(Participant::new(b, "WiseOwl0".into(), HslColor::from_hue(0.0), AvatarKind::Alien))
            .unwrap();
        let guard = RateGuard::default();
        let t0 = Instant::now();
        let p = json!({"x": 0, "y": 0, "z": 0});

        assert!(guard.admit(&mut registry, &a, &p, t0).is_ok());
        assert!(guard.admit(&mut registry, &b, &p, t0 + ms(1)).is_ok());
        assert_eq!(guard.admit(&mut registry, &a, &p, t0 + ms(2)), Err(Rejection::Throttled));
    }

    #[test]
    fn test_custom_config() {
        let (mut registry, id) = registry_with_one();
        let guard = RateGuard::new(GuardConfig {
            position_limit: 5.0,
            update_interval: Duration::ZERO,
        });
        let t0 = Instant::now();

        let pos = guard.admit(&mut registry, &id, &json!({"x": 6, "y": -6, "z": 1}), t0).unwrap();
        assert_eq!(pos, Vec3::new(5.0, -5.0, 1.0));
        assert!(guard.admit(&mut registry, &id, &json!({"x": 0, "y": 0, "z": 0}), t0).is_ok());
    }

    proptest! {
        #[test]
        fn prop_one_accept_per_window(offsets in proptest::collection::vec(0u64..50, 1..40)) {
            let (mut registry, id) = registry_with_one();
            let guard = RateGuard::default();
            let t0 = Instant::now();
            let p = json!({"x": 0, "y": 0, "z": 0});

            let mut sorted = offsets;
            sorted.sort_unstable();
            let accepted = sorted
                .iter()
                .filter(|off| guard.admit(&mut registry, &id, &p, t0 + ms(**off)).is_ok())
                .count();
            prop_assert_eq!(accepted, 1);
        }

        #[test]
        fn prop_accepted_positions_are_in_bounds(x in -1e6f64..1e6, y in -1e6f64..1e6, z in -1e6f64..1e6) {
            let (mut registry, id) = registry_with_one();
            let guard = RateGuard::default();
            let pos = guard
                .admit(&mut registry, &id, &json!({"x": x, "y": y, "z": z}), Instant::now())
                .unwrap();
            prop_assert!(pos.is_within_cube(POSITION_LIMIT));
            prop_assert_eq!(registry.get(&id).unwrap().position, pos);
        }
    }
}
