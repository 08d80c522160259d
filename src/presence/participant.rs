//! Participant State
//!
//! Server-side record for one live connection: identity, display name,
//! position and cosmetic appearance.

use std::fmt;
use serde::{Serialize, Serializer, Deserialize};
use uuid::Uuid;

use crate::core::vec3::Vec3;

// =============================================================================
// CONNECTION ID
// =============================================================================

/// Opaque per-connection identity, allocated by the transport at accept time.
///
/// Serialized as a hyphenated UUID string. Implements Ord for BTreeMap keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Allocate a fresh random identity.
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse a client-supplied identity string.
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }

    /// Short prefix for log lines.
    pub fn short(&self) -> ShortId {
        ShortId(self.0)
    }
}

/// First eight hex digits of a [`ConnectionId`], formatted without
/// allocating.
#[derive(Clone, Copy, Debug)]
pub struct ShortId(Uuid);

impl fmt::Display for ShortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = Uuid::encode_buffer();
        let hex = self.0.simple().encode_lower(&mut buf);
        f.write_str(&hex[..8])
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

// =============================================================================
// AVATAR KIND
// =============================================================================

/// Avatar archetype rendered by the browser.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvatarKind {
    /// Alien model
    Alien,
    /// Robot model
    Robot,
    /// Dinosaur model
    Dino,
}

impl AvatarKind {
    /// Every selectable avatar, in catalogue order.
    pub const ALL: [AvatarKind; 3] = [AvatarKind::Alien, AvatarKind::Robot, AvatarKind::Dino];
}

// =============================================================================
// COLOR
// =============================================================================

/// Display color as hue/saturation/lightness.
///
/// Serialized as a CSS `hsl()` string so the browser can use it directly.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HslColor {
    /// Hue in degrees, `[0, 360)`.
    pub hue: f64,
    /// Saturation percentage.
    pub saturation: u8,
    /// Lightness percentage.
    pub lightness: u8,
}

impl HslColor {
    /// Fixed saturation for generated colors.
    pub const SATURATION: u8 = 70;
    /// Fixed lightness for generated colors.
    pub const LIGHTNESS: u8 = 50;

    /// Color with the given hue and the fixed saturation/lightness.
    pub fn from_hue(hue: f64) -> Self {
        Self {
            hue,
            saturation: Self::SATURATION,
            lightness: Self::LIGHTNESS,
        }
    }
}

impl fmt::Display for HslColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hsl({}, {}%, {}%)", self.hue, self.saturation, self.lightness)
    }
}

impl Serialize for HslColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// =============================================================================
// PARTICIPANT
// =============================================================================

/// Default spawn point for new participants.
pub const SPAWN_POINT: Vec3 = Vec3::new(0.0, 0.0, -3.0);

/// State of a single connected participant.
///
/// Everything except `position` is fixed at creation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Participant {
    /// Connection identity
    pub id: ConnectionId,

    /// Generated display name
    pub username: String,

    /// Last accepted position
    pub position: Vec3,

    /// Display color
    pub color: HslColor,

    /// Avatar archetype
    #[serde(rename = "modelType")]
    pub avatar: AvatarKind,
}

impl Participant {
    /// Create a participant at the spawn point.
    pub fn new(id: ConnectionId, username: String, color: HslColor, avatar: AvatarKind) -> Self {
        Self {
            id,
            username,
            position: SPAWN_POINT,
            color,
            avatar,
        }
    }
}
