//! Animated flight-arc globe using Bevy.
//!
//! Samples land points from a world map, then keeps a bounded number of
//! flights running between nearby points: towers grow at both ends, an arc is
//! drawn between them, and everything retracts again. Hovering a marker shows
//! its location.

mod bootstrap;
mod camera;
mod flights;
mod hover;
mod launch_params;
mod scene;
mod ui;

use bevy::prelude::*;
use bootstrap::BootstrapPlugin;
use camera::OrbitCameraPlugin;
use flights::FlightsPlugin;
use hover::HoverPlugin;
use scene::ScenePlugin;
use ui::StatsUiPlugin;

/// Plugin for the main application.
pub struct AppPlugin;

impl Plugin for AppPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            BootstrapPlugin,
            ScenePlugin,
            OrbitCameraPlugin,
            FlightsPlugin,
            HoverPlugin,
            StatsUiPlugin,
        ));
    }
}

fn main() {
    // Initialize tracing for native platforms.
    #[cfg(not(target_family = "wasm"))]
    {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    // Initialize tracing for WASM (logs to browser console).
    #[cfg(target_family = "wasm")]
    {
        console_error_panic_hook::set_once();
        tracing_wasm::set_as_global_default();
    }

    let params = launch_params::parse();

    let mut app = App::new();

    #[allow(unused_mut)]
    let mut window = Window {
        title: "arcglobe-viewer".to_string(),
        resolution: (1280, 720).into(),
        ..Default::default()
    };

    // WASM: Fit canvas to parent element and prevent browser event handling.
    #[cfg(target_family = "wasm")]
    {
        window.fit_canvas_to_parent = true;
        window.prevent_default_event_handling = true;
    }

    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(window),
        ..Default::default()
    }))
    .insert_resource(params)
    .add_plugins(AppPlugin)
    .run();
}
