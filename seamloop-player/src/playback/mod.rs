//! Rendering a positionable source into device frames

pub mod player;

pub use player::{PlayerStatus, SourcePlayer};
