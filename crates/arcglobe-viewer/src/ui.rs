//! Stats overlay, loading indicator and bootstrap error panel.
//!
//! `F1` toggles the stats window.

use bevy::diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin};
use bevy::prelude::*;
use bevy_egui::input::egui_wants_any_keyboard_input;
use bevy_egui::{EguiContexts, EguiPlugin, EguiPrimaryContextPass, egui};

use crate::bootstrap::{AppPhase, BootstrapError, LoadedWorld};
use crate::camera::OrbitSettings;
use crate::flights::Flights;

/// Plugin for the egui overlays.
pub struct StatsUiPlugin;

impl Plugin for StatsUiPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(EguiPlugin::default())
            .add_plugins(FrameTimeDiagnosticsPlugin::default())
            .init_resource::<StatsVisible>()
            .add_systems(
                Update,
                toggle_stats.run_if(not(egui_wants_any_keyboard_input)),
            )
            .add_systems(
                EguiPrimaryContextPass,
                (
                    stats_ui_system.run_if(|visible: Res<StatsVisible>| visible.0),
                    loading_ui_system.run_if(in_state(AppPhase::Loading)),
                    error_ui_system.run_if(in_state(AppPhase::Failed)),
                ),
            );
    }
}

/// Whether the stats window is shown.
#[derive(Resource)]
pub struct StatsVisible(pub bool);

impl Default for StatsVisible {
    fn default() -> Self {
        Self(true)
    }
}

fn toggle_stats(keyboard: Res<ButtonInput<KeyCode>>, mut visible: ResMut<StatsVisible>) {
    if keyboard.just_pressed(KeyCode::F1) {
        visible.0 = !visible.0;
    }
}

/// Render the stats window.
#[allow(clippy::needless_pass_by_value)]
fn stats_ui_system(
    mut contexts: EguiContexts,
    diagnostics: Res<DiagnosticsStore>,
    flights: Option<Res<Flights>>,
    world: Option<Res<LoadedWorld>>,
    mut orbit: ResMut<OrbitSettings>,
) -> Result {
    let ctx = contexts.ctx_mut()?;

    let fps = diagnostics
        .get(&FrameTimeDiagnosticsPlugin::FPS)
        .and_then(bevy::diagnostic::Diagnostic::smoothed)
        .unwrap_or(0.0);

    egui::Window::new("Stats")
        .default_pos([10.0, 10.0])
        .show(ctx, |ui| {
            ui.label(format!("FPS: {fps:.0}"));
            if let Some(flights) = &flights {
                ui.label(format!(
                    "Flights: {} / {} active",
                    flights.0.active_count(),
                    flights.0.capacity()
                ));
                ui.label(format!(
                    "Endpoints: {} (max arc {:.0})",
                    flights.0.points().len(),
                    flights.0.config().max_arc_distance
                ));
            }
            if let Some(world) = &world {
                ui.label(format!(
                    "Land points: {} ({} for flights)",
                    world.points.all.len(),
                    world.points.flight_eligible.len()
                ));
            }
            ui.checkbox(&mut orbit.auto_rotate, "Auto-rotate");
            ui.separator();
            ui.label("Controls:");
            ui.label("  Left drag - Rotate");
            ui.label("  F1 - Toggle this window");
        });

    Ok(())
}

/// Show a loading label while bootstrap runs.
fn loading_ui_system(mut contexts: EguiContexts) -> Result {
    let ctx = contexts.ctx_mut()?;
    egui::Area::new(egui::Id::new("loading"))
        .anchor(egui::Align2::CENTER_BOTTOM, [0.0, -40.0])
        .show(ctx, |ui| {
            ui.label("Loading map...");
        });
    Ok(())
}

/// Show why bootstrap failed.
#[allow(clippy::needless_pass_by_value)]
fn error_ui_system(mut contexts: EguiContexts, error: Option<Res<BootstrapError>>) -> Result {
    let ctx = contexts.ctx_mut()?;
    let message = error.as_ref().map_or("Unknown error", |error| error.0.as_str());

    egui::Window::new("Error")
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .collapsible(false)
        .resizable(false)
        .show(ctx, |ui| {
            ui.colored_label(egui::Color32::LIGHT_RED, "The globe could not be started.");
            ui.label(message);
        });

    Ok(())
}
