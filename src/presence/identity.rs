//! Identity Generator
//!
//! Cosmetic identity for new participants: a display name built from two
//! closed vocabularies plus a numeric suffix, a random hue, and an avatar.
//! Names are not unique; collisions are harmless.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::presence::participant::{AvatarKind, ConnectionId, HslColor, Participant};

/// Name prefixes.
pub const ADJECTIVES: [&str; 10] = [
    "Swift", "Bright", "Bold", "Quick", "Calm", "Cool", "Sharp", "Wild", "Free", "Wise",
];

/// Name stems.
pub const NOUNS: [&str; 10] = [
    "Fox", "Wolf", "Eagle", "Bear", "Lion", "Tiger", "Shark", "Owl", "Hawk", "Raven",
];

/// Exclusive upper bound of the numeric suffix.
pub const SUFFIX_RANGE: u32 = 100;

/// Generate a display name like `QuickRaven42`.
pub fn generate_username<R: Rng + ?Sized>(rng: &mut R) -> String {
    let adjective = ADJECTIVES.choose(rng).copied().unwrap_or(ADJECTIVES[0]);
    let noun = NOUNS.choose(rng).copied().unwrap_or(NOUNS[0]);
    let suffix = rng.gen_range(0..SUFFIX_RANGE);
    format!("{adjective}{noun}{suffix}")
}

/// Pick an avatar uniformly.
pub fn generate_avatar<R: Rng + ?Sized>(rng: &mut R) -> AvatarKind {
    AvatarKind::ALL[rng.gen_range(0..AvatarKind::ALL.len())]
}

/// Pick a uniformly random hue with the fixed saturation/lightness.
pub fn generate_color<R: Rng + ?Sized>(rng: &mut R) -> HslColor {
    HslColor::from_hue(rng.gen_range(0.0..360.0))
}

/// Build a complete participant for a freshly accepted connection.
pub fn generate_participant<R: Rng + ?Sized>(rng: &mut R, id: ConnectionId) -> Participant {
    let username = generate_username(rng);
    let color = generate_color(rng);
    let avatar = generate_avatar(rng);
    Participant::new(id, username, color, avatar)
}
