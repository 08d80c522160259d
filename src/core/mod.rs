//! Core primitives shared by the presence and network layers.

pub mod vec3;

pub use vec3::Vec3;
