//! Core primitive types for rendering
//!
//! Only the camera survives here; meshes live in `assets::geometry` as plain
//! data since nothing in this crate talks to a GPU.

pub mod camera;

pub use camera::Camera;
