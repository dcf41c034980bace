//! Procedural dragon flying over streamed noise terrain.
//!
//! Everything here produces plain triangle soup ([`geometry::Facets`]);
//! drawing it is left to a [`renderer::DrawTarget`].

pub mod chunk;
pub mod config;
pub mod creature;
pub mod dragon;
pub mod error;
pub mod flight;
pub mod geometry;
pub mod math;
pub mod profiler;
pub mod renderer;
pub mod scene;
pub mod terrain;
pub mod texture;
pub mod tube;

pub use error::{GeometryError, Result};
pub use geometry::Facets;
