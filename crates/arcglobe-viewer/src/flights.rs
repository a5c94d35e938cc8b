//! Flight markers and arcs in the Bevy world.
//!
//! The [`FlightScheduler`] owns all flight state. This module implements its
//! [`FlightScene`] seam with entities (one tower and one top per marker),
//! ticks it once per frame, and draws the visible part of every arc with
//! gizmos. A handful of permanent landmark spikes are spawned alongside.

use arcglobe::scheduler::{Endpoint, FlightConfig, FlightScene, FlightScheduler};
use arcglobe::{TOWER_HEIGHT, raise_to_top};
use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;

use crate::bootstrap::{AppPhase, BootstrapError, LoadedWorld};
use crate::launch_params::LaunchParams;

/// Shortest tower length, to keep the transform invertible.
const MIN_TOWER_LENGTH: f32 = 1e-4;
/// Tower radius for the built-in cylinder.
const TOWER_RADIUS: f32 = 0.1;
/// Radius of the sphere on top of each tower.
const TOP_RADIUS: f32 = 0.25;
/// Landmark tower length as a fraction of the full height.
const LANDMARK_TOWER_SCALE: f32 = 0.8;
/// Marker color.
const MARKER_COLOR: Color = Color::srgb(0.0, 1.0, 0.0);
/// Tower opacity.
const TOWER_ALPHA: f32 = 0.7;
/// Arc color at full opacity.
const ARC_COLOR: Color = Color::srgb(0.3, 1.0, 0.6);

/// Plugin for scheduling and drawing flights.
pub struct FlightsPlugin;

impl Plugin for FlightsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(AppPhase::Running), start_flights)
            .add_systems(
                Update,
                (tick_flights, draw_arcs)
                    .chain()
                    .run_if(in_state(AppPhase::Running).and(resource_exists::<Flights>)),
            );
    }
}

/// Entities making up one marker.
#[derive(Debug, Clone, Copy)]
pub struct MarkerEntities {
    pub tower: Entity,
    pub top: Entity,
}

/// The running flight scheduler.
#[derive(Resource)]
pub struct Flights(pub FlightScheduler<MarkerEntities, StdRng>);

/// Tower part of a marker; scaled along its local Y axis.
#[derive(Component)]
pub struct Tower;

/// Sphere at the top of a tower.
#[derive(Component)]
pub struct TowerTop;

/// What a marker entity represents, for hover descriptions.
#[derive(Component, Debug, Clone, Copy)]
pub struct MarkerInfo {
    /// Point on the globe surface under the marker.
    pub surface: Vec3,
    pub kind: MarkerKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    /// One end of a scheduled flight.
    Flight { slot: usize, endpoint: Endpoint },
    /// Permanent spike.
    Landmark { index: usize },
}

/// Shared meshes and materials for markers.
#[derive(Resource)]
pub struct MarkerAssets {
    tower_mesh: Handle<Mesh>,
    tower_material: Handle<StandardMaterial>,
    top_mesh: Handle<Mesh>,
    top_material: Handle<StandardMaterial>,
}

impl MarkerAssets {
    /// Build marker assets, using `tower_mesh` instead of the default
    /// cylinder when given.
    ///
    /// A custom tower mesh should stand on the origin and be one unit tall
    /// along +Y.
    fn new(
        tower_mesh: Option<Handle<Mesh>>,
        meshes: &mut Assets<Mesh>,
        materials: &mut Assets<StandardMaterial>,
    ) -> Self {
        let tower_mesh = tower_mesh.unwrap_or_else(|| {
            meshes.add(Mesh::from(Cylinder::new(TOWER_RADIUS, 1.0)).translated_by(Vec3::Y * 0.5))
        });
        Self {
            tower_mesh,
            tower_material: materials.add(StandardMaterial {
                base_color: MARKER_COLOR.with_alpha(TOWER_ALPHA),
                alpha_mode: AlphaMode::Blend,
                ..default()
            }),
            top_mesh: meshes.add(Sphere::new(TOP_RADIUS)),
            top_material: materials.add(StandardMaterial {
                base_color: MARKER_COLOR,
                unlit: true,
                ..default()
            }),
        }
    }

    /// Spawn a tower and its top.
    fn spawn(
        &self,
        commands: &mut Commands,
        info: MarkerInfo,
        top: Vec3,
        tower_scale: f32,
    ) -> MarkerEntities {
        let tower = commands
            .spawn((
                Mesh3d(self.tower_mesh.clone()),
                MeshMaterial3d(self.tower_material.clone()),
                tower_transform(info.surface, tower_scale),
                Tower,
                info,
            ))
            .id();
        let top = commands
            .spawn((
                Mesh3d(self.top_mesh.clone()),
                MeshMaterial3d(self.top_material.clone()),
                Transform::from_translation(top),
                TowerTop,
                info,
            ))
            .id();
        MarkerEntities { tower, top }
    }
}

/// Transform for a tower standing on `surface`, pointing away from the
/// globe center.
pub fn tower_transform(surface: Vec3, tower_scale: f32) -> Transform {
    let up = surface.try_normalize().unwrap_or(Vec3::Y);
    Transform {
        translation: surface,
        rotation: Quat::from_rotation_arc(Vec3::Y, up),
        scale: Vec3::new(1.0, tower_length(tower_scale), 1.0),
    }
}

/// World-space tower length for a scale in `0..=1`.
pub fn tower_length(tower_scale: f32) -> f32 {
    (tower_scale * TOWER_HEIGHT).max(MIN_TOWER_LENGTH)
}

/// [`FlightScene`] backed by ECS entities.
#[derive(SystemParam)]
pub struct MarkerScene<'w, 's> {
    commands: Commands<'w, 's>,
    assets: Res<'w, MarkerAssets>,
    towers: Query<'w, 's, &'static mut Transform, With<Tower>>,
}

impl FlightScene for MarkerScene<'_, '_> {
    type Handle = MarkerEntities;

    fn spawn_marker(
        &mut self,
        slot: usize,
        endpoint: Endpoint,
        surface: Vec3,
        top: Vec3,
    ) -> MarkerEntities {
        let info = MarkerInfo {
            surface,
            kind: MarkerKind::Flight { slot, endpoint },
        };
        self.assets.spawn(&mut self.commands, info, top, 0.0)
    }

    fn set_tower_scale(&mut self, handle: &MarkerEntities, scale: f32) {
        // Towers spawned this frame are not queryable yet.
        if let Ok(mut transform) = self.towers.get_mut(handle.tower) {
            transform.scale.y = tower_length(scale);
        }
    }

    fn release_marker(&mut self, handle: MarkerEntities) {
        self.commands.entity(handle.tower).despawn();
        self.commands.entity(handle.top).despawn();
    }
}

/// Create the scheduler and the landmark spikes.
#[allow(clippy::needless_pass_by_value)]
fn start_flights(
    mut commands: Commands,
    world: Res<LoadedWorld>,
    params: Res<LaunchParams>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut next_phase: ResMut<NextState<AppPhase>>,
) {
    let mut rng = match params.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let assets = MarkerAssets::new(world.tower_mesh.clone(), &mut meshes, &mut materials);

    let points = &world.points.flight_eligible;
    for (index, &surface) in points
        .choose_multiple(&mut rng, params.landmarks)
        .enumerate()
    {
        let info = MarkerInfo {
            surface,
            kind: MarkerKind::Landmark { index },
        };
        assets.spawn(&mut commands, info, raise_to_top(surface), LANDMARK_TOWER_SCALE);
    }

    let config = FlightConfig {
        max_concurrent: params.max_concurrent,
        max_arc_distance: params.max_arc_distance,
        ..Default::default()
    };
    match FlightScheduler::new(config, points.clone(), rng) {
        Ok(scheduler) => {
            commands.insert_resource(assets);
            commands.insert_resource(Flights(scheduler));
            tracing::info!("Started flights with {} landmarks", params.landmarks);
        }
        Err(error) => {
            commands.insert_resource(BootstrapError(error.to_string()));
            next_phase.set(AppPhase::Failed);
        }
    }
}

/// Advance every scheduled flight by one frame.
pub fn tick_flights(mut flights: ResMut<Flights>, mut scene: MarkerScene) {
    flights.0.tick(&mut scene);
}

/// Draw the visible part of every arc.
#[allow(clippy::needless_pass_by_value)]
fn draw_arcs(mut gizmos: Gizmos, flights: Res<Flights>) {
    for (_, flight) in flights.0.active_flights() {
        let arc = flight.arc();
        let points = arc.visible_points();
        if points.len() < 2 {
            continue;
        }
        gizmos.linestrip(points.iter().copied(), ARC_COLOR.with_alpha(arc.opacity()));
    }
}
