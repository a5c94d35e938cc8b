//! Launch parameter parsing for the viewer.
//!
//! On native, parameters are parsed from command-line arguments using clap.
//! On WASM, defaults are used (CLI argument parsing is not available).

use arcglobe::scheduler::MAX_ARC_DISTANCE;
use bevy::prelude::*;

/// Default land-mask image, relative to the asset directory.
const DEFAULT_MAP: &str = "maps/world.png";
/// Default number of simultaneously animated flights.
const DEFAULT_MAX_CONCURRENT: usize = 20;
/// Default number of static landmark spikes.
const DEFAULT_LANDMARKS: usize = 10;
/// Default luminance below which a map pixel counts as land.
const DEFAULT_LAND_THRESHOLD: u8 = 128;
/// Default angular spacing of surface samples, in degrees.
const DEFAULT_SAMPLE_STEP: f64 = 1.0;

/// Launch parameters for the viewer.
#[derive(Resource, Debug, Clone)]
pub struct LaunchParams {
    /// Land-mask image path (asset-relative).
    pub map: String,
    /// Optional environment image wrapped onto the sky sphere.
    pub environment_map: Option<String>,
    /// Optional glTF model whose first mesh replaces the tower cylinder.
    pub tower_model: Option<String>,
    /// Seed for flight placement; random when absent.
    pub seed: Option<u64>,
    /// Number of simultaneously animated flights.
    pub max_concurrent: usize,
    /// Maximum distance between a flight's endpoints.
    pub max_arc_distance: f32,
    /// Number of static landmark spikes.
    pub landmarks: usize,
    /// Luminance below which a map pixel counts as land.
    pub land_threshold: u8,
    /// Treat bright map pixels as land instead of dark ones.
    pub invert_mask: bool,
    /// Angular spacing of surface samples, in degrees.
    pub sample_step: f64,
    /// Start with camera auto-rotation enabled.
    pub auto_rotate: bool,
}

impl Default for LaunchParams {
    fn default() -> Self {
        Self {
            map: DEFAULT_MAP.to_string(),
            environment_map: None,
            tower_model: None,
            seed: None,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            max_arc_distance: MAX_ARC_DISTANCE,
            landmarks: DEFAULT_LANDMARKS,
            land_threshold: DEFAULT_LAND_THRESHOLD,
            invert_mask: false,
            sample_step: DEFAULT_SAMPLE_STEP,
            auto_rotate: true,
        }
    }
}

#[cfg(not(target_family = "wasm"))]
mod native {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    #[command(about = "Animated flight arcs on a dotted globe")]
    struct CliArgs {
        /// Land-mask image, relative to the asset directory.
        #[arg(long, default_value = DEFAULT_MAP)]
        map: String,

        /// Environment image wrapped onto the sky sphere.
        #[arg(long)]
        environment_map: Option<String>,

        /// glTF model whose first mesh is used for marker towers.
        #[arg(long)]
        tower_model: Option<String>,

        /// Seed for flight placement.
        #[arg(long)]
        seed: Option<u64>,

        /// Number of simultaneously animated flights.
        #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENT)]
        max_concurrent: usize,

        /// Maximum distance between a flight's endpoints (globe radius is 25).
        #[arg(long, default_value_t = MAX_ARC_DISTANCE)]
        max_arc_distance: f32,

        /// Number of static landmark spikes.
        #[arg(long, default_value_t = DEFAULT_LANDMARKS)]
        landmarks: usize,

        /// Luminance (0-255) below which a map pixel counts as land.
        #[arg(long, default_value_t = DEFAULT_LAND_THRESHOLD)]
        land_threshold: u8,

        /// Treat bright map pixels as land.
        #[arg(long)]
        invert_mask: bool,

        /// Angular spacing of surface samples, in degrees (at least 0.05).
        #[arg(long, default_value_t = DEFAULT_SAMPLE_STEP)]
        sample_step: f64,

        /// Start with camera auto-rotation disabled.
        #[arg(long)]
        no_auto_rotate: bool,
    }

    pub fn parse() -> LaunchParams {
        let args = CliArgs::parse();
        LaunchParams {
            map: args.map,
            environment_map: args.environment_map,
            tower_model: args.tower_model,
            seed: args.seed,
            max_concurrent: args.max_concurrent,
            max_arc_distance: args.max_arc_distance,
            landmarks: args.landmarks,
            land_threshold: args.land_threshold,
            invert_mask: args.invert_mask,
            sample_step: args.sample_step,
            auto_rotate: !args.no_auto_rotate,
        }
    }
}

/// Parse launch parameters from CLI args (native) or use defaults (WASM).
pub fn parse() -> LaunchParams {
    #[cfg(not(target_family = "wasm"))]
    {
        native::parse()
    }
    #[cfg(target_family = "wasm")]
    {
        LaunchParams::default()
    }
}
