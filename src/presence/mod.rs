//! Presence Module
//!
//! All shared session state. Pure in-memory logic, no I/O.
//!
//! ## Module Structure
//!
//! - `participant`: Connection identity and participant record
//! - `registry`: Session registry (participants + rate records)
//! - `identity`: Username, color and avatar generation
//! - `guard`: Position throttle and world-bounds clamp

pub mod participant;
pub mod registry;
pub mod identity;
pub mod guard;

// Re-export key types
pub use participant::{ConnectionId, Participant, AvatarKind, HslColor, SPAWN_POINT};
pub use registry::{SessionRegistry, RateRecord, RegistryError};
pub use guard::{RateGuard, GuardConfig, Rejection, POSITION_LIMIT, UPDATE_INTERVAL};
