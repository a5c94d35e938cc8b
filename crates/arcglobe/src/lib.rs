//! Flight scheduling, arc geometry and surface sampling for an animated
//! connection globe.
//!
//! This crate is engine-agnostic. Rendering goes through the
//! [`FlightScene`] trait, which a client implements for its scene graph.
//!
//! # Example
//!
//! ```ignore
//! use arcglobe::{FlightConfig, FlightScheduler, LumaMask, SamplingConfig, SurfacePoints};
//!
//! let mask = LumaMask::new(gray_map, 128);
//! let points = SurfacePoints::from_mask(&mask, &SamplingConfig::default())?;
//! let mut scheduler =
//!     FlightScheduler::new(FlightConfig::default(), points.flight_eligible, rand::rng())?;
//!
//! // Once per frame:
//! scheduler.tick(&mut my_scene);
//! ```

pub mod arc;
mod error;
pub mod picking;
pub mod projection;
pub mod scheduler;
pub mod surface;

pub use arc::{ArcPhase, FlightArc};
pub use error::{Error, Result};
pub use picking::{PickShape, nearest_hit};
pub use projection::{raise, raise_to_top};
pub use scheduler::{
    Endpoint, Flight, FlightConfig, FlightScene, FlightScheduler, Marker, SlotState, choose_end,
};
pub use surface::{LandMask, LumaMask, MIN_STEP_DEG, SamplingConfig, SurfacePoints};

/// Radius of the globe surface.
pub const GLOBE_RADIUS: f32 = 25.0;

/// Full height of a marker tower above the surface.
pub const TOWER_HEIGHT: f32 = 2.2;
