//! Asset bootstrap and application phase.
//!
//! Loads the map image (plus the optional environment map and tower model)
//! through the asset server and samples land points from the map on the async
//! compute pool. Once every load has finished and the points have arrived,
//! the app moves to [`AppPhase::Running`]. Any failure moves it to
//! [`AppPhase::Failed`] instead; there are no retries.

use arcglobe::{LumaMask, SamplingConfig, SurfacePoints};
use bevy::asset::{LoadState, RecursiveDependencyLoadState, UntypedAssetId};
use bevy::gltf::{Gltf, GltfMesh};
use bevy::prelude::*;
use bevy::tasks::AsyncComputeTaskPool;
use web_time::Instant;

use crate::launch_params::LaunchParams;

/// Plugin for loading assets and sampling the globe surface.
pub struct BootstrapPlugin;

impl Plugin for BootstrapPlugin {
    fn build(&self, app: &mut App) {
        app.init_state::<AppPhase>()
            .init_resource::<SamplingChannel>()
            .add_systems(Startup, start_loading)
            .add_systems(
                Update,
                (check_load_failures, start_sampling, finish_bootstrap)
                    .chain()
                    .run_if(in_state(AppPhase::Loading)),
            )
            .add_systems(OnEnter(AppPhase::Failed), report_failure);
    }
}

/// Top-level application phase.
#[derive(States, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AppPhase {
    /// Assets are loading and the surface is being sampled.
    #[default]
    Loading,
    /// Flights are running.
    Running,
    /// Bootstrap failed; see [`BootstrapError`].
    Failed,
}

/// Why bootstrap failed.
#[derive(Resource, Debug)]
pub struct BootstrapError(pub String);

/// Everything the running scene needs from bootstrap.
#[derive(Resource)]
pub struct LoadedWorld {
    /// Sampled land points.
    pub points: SurfacePoints,
    /// Mesh from the tower model, if one was configured.
    pub tower_mesh: Option<Handle<Mesh>>,
    /// Environment map for the sky sphere, if one was configured.
    pub environment: Option<Handle<Image>>,
}

/// Pending loads, tracked while in [`AppPhase::Loading`].
#[derive(Resource)]
pub struct BootstrapState {
    map: Handle<Image>,
    environment: Option<Handle<Image>>,
    tower_model: Option<Handle<Gltf>>,
    sampling_started: bool,
    points: Option<SurfacePoints>,
    started_at: Instant,
}

/// Channel for receiving sampled points from the background task.
#[derive(Resource)]
struct SamplingChannel {
    tx: async_channel::Sender<arcglobe::Result<SurfacePoints>>,
    rx: async_channel::Receiver<arcglobe::Result<SurfacePoints>>,
}

impl Default for SamplingChannel {
    fn default() -> Self {
        let (tx, rx) = async_channel::bounded(1);
        Self { tx, rx }
    }
}

/// Queue every asset load.
#[allow(clippy::needless_pass_by_value)]
fn start_loading(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    params: Res<LaunchParams>,
) {
    let map = asset_server.load::<Image>(params.map.clone());
    let environment = params
        .environment_map
        .as_ref()
        .map(|path| asset_server.load::<Image>(path.clone()));
    let tower_model = params
        .tower_model
        .as_ref()
        .map(|path| asset_server.load::<Gltf>(path.clone()));

    tracing::info!("Loading map {}", params.map);

    commands.insert_resource(BootstrapState {
        map,
        environment,
        tower_model,
        sampling_started: false,
        points: None,
        started_at: Instant::now(),
    });
}

/// Fail bootstrap if any asset, or anything it depends on, could not be
/// loaded.
#[allow(clippy::needless_pass_by_value)]
fn check_load_failures(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    state: Res<BootstrapState>,
    params: Res<LaunchParams>,
    mut next_phase: ResMut<NextState<AppPhase>>,
) {
    let states = |id: UntypedAssetId| {
        (
            asset_server.load_state(id),
            asset_server.recursive_dependency_load_state(id),
        )
    };

    let mut loads = vec![(params.map.as_str(), states(state.map.id().untyped()))];
    if let (Some(path), Some(handle)) = (&params.environment_map, &state.environment) {
        loads.push((path.as_str(), states(handle.id().untyped())));
    }
    if let (Some(path), Some(handle)) = (&params.tower_model, &state.tower_model) {
        loads.push((path.as_str(), states(handle.id().untyped())));
    }

    for (path, (load, dependencies)) in loads {
        if let Some(message) = load_failure(path, load, dependencies) {
            commands.insert_resource(BootstrapError(message));
            next_phase.set(AppPhase::Failed);
            return;
        }
    }
}

/// Describe a failed load of `path`, if the asset or one of its dependencies
/// failed.
///
/// A glTF whose textures are missing still loads itself, so only the
/// dependency state reports the failure.
fn load_failure(
    path: &str,
    load: LoadState,
    dependencies: RecursiveDependencyLoadState,
) -> Option<String> {
    if let LoadState::Failed(error) = load {
        return Some(format!("Failed to load {path}: {error}"));
    }
    if let RecursiveDependencyLoadState::Failed(error) = dependencies {
        return Some(format!("Failed to load a dependency of {path}: {error}"));
    }
    None
}

/// Start sampling the map once its pixels are available.
#[allow(clippy::needless_pass_by_value)]
fn start_sampling(
    mut state: ResMut<BootstrapState>,
    images: Res<Assets<Image>>,
    params: Res<LaunchParams>,
    channel: Res<SamplingChannel>,
) {
    if state.sampling_started {
        return;
    }
    let Some(image) = images.get(&state.map).cloned() else {
        return;
    };
    state.sampling_started = true;

    let source = params.map.clone();
    let threshold = params.land_threshold;
    let invert = params.invert_mask;
    let config = SamplingConfig {
        step_deg: params.sample_step,
        ..Default::default()
    };
    let tx = channel.tx.clone();

    AsyncComputeTaskPool::get()
        .spawn(async move {
            let result = sample_map(image, &source, threshold, invert, &config);
            let _ = tx.send(result).await;
        })
        .detach();

    tracing::info!("Started sampling land points");
}

/// Sample land points from a loaded map image.
fn sample_map(
    image: Image,
    source: &str,
    threshold: u8,
    invert: bool,
    config: &SamplingConfig,
) -> arcglobe::Result<SurfacePoints> {
    let luma = image
        .try_into_dynamic()
        .map_err(|error| arcglobe::Error::MapImage {
            source: source.to_string(),
            message: error.to_string(),
        })?
        .to_luma8();

    let mask = LumaMask::new(luma, threshold).inverted(invert);
    let points = SurfacePoints::from_mask(&mask, config)?;
    if points.flight_eligible.is_empty() {
        return Err(arcglobe::Error::EmptyPointSet);
    }
    Ok(points)
}

/// Collect the sampled points and enter [`AppPhase::Running`] once everything
/// is ready.
#[allow(clippy::needless_pass_by_value)]
fn finish_bootstrap(
    mut commands: Commands,
    mut state: ResMut<BootstrapState>,
    channel: Res<SamplingChannel>,
    asset_server: Res<AssetServer>,
    gltfs: Res<Assets<Gltf>>,
    gltf_meshes: Res<Assets<GltfMesh>>,
    mut next_phase: ResMut<NextState<AppPhase>>,
) {
    if let Ok(result) = channel.rx.try_recv() {
        match result {
            Ok(points) => {
                tracing::info!(
                    "Sampled {} land points, {} usable for flights",
                    points.all.len(),
                    points.flight_eligible.len()
                );
                state.points = Some(points);
            }
            Err(error) => {
                commands.insert_resource(BootstrapError(error.to_string()));
                next_phase.set(AppPhase::Failed);
                return;
            }
        }
    }

    if state.points.is_none() {
        return;
    }
    if let Some(handle) = &state.environment
        && !asset_server.is_loaded_with_dependencies(handle)
    {
        return;
    }

    let tower_mesh = match &state.tower_model {
        Some(handle) => {
            if !asset_server.is_loaded_with_dependencies(handle) {
                return;
            }
            let mesh = gltfs
                .get(handle)
                .and_then(|gltf| gltf.meshes.first())
                .and_then(|mesh| gltf_meshes.get(mesh))
                .and_then(|mesh| mesh.primitives.first())
                .map(|primitive| primitive.mesh.clone());
            if mesh.is_none() {
                commands.insert_resource(BootstrapError(
                    "Tower model contains no meshes".to_string(),
                ));
                next_phase.set(AppPhase::Failed);
                return;
            }
            mesh
        }
        None => None,
    };

    let Some(points) = state.points.take() else {
        return;
    };
    commands.insert_resource(LoadedWorld {
        points,
        tower_mesh,
        environment: state.environment.clone(),
    });
    next_phase.set(AppPhase::Running);

    tracing::info!(
        "Bootstrap complete in {:.2}s",
        state.started_at.elapsed().as_secs_f32()
    );
}

/// Log the bootstrap error once.
#[allow(clippy::needless_pass_by_value)]
fn report_failure(error: Option<Res<BootstrapError>>) {
    match error {
        Some(error) => tracing::error!("Bootstrap failed: {}", error.0),
        None => tracing::error!("Bootstrap failed"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bevy::asset::io::AssetReaderError;
    use bevy::asset::{AssetLoadError, RenderAssetUsages};
    use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
    use bevy::state::app::StatesPlugin;

    use super::*;

    /// An RGBA image whose left half is black (land) and right half white.
    fn half_land_image(width: u32, height: u32) -> Image {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for _y in 0..height {
            for x in 0..width {
                let value = if x < width / 2 { 0 } else { 255 };
                data.extend_from_slice(&[value, value, value, 255]);
            }
        }
        Image::new(
            Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            TextureDimension::D2,
            data,
            TextureFormat::Rgba8Unorm,
            RenderAssetUsages::default(),
        )
    }

    #[test]
    fn test_sample_map_finds_land() {
        let points = sample_map(
            half_land_image(72, 36),
            "test.png",
            128,
            false,
            &SamplingConfig::default(),
        )
        .unwrap();
        assert!(!points.all.is_empty());
        assert!(points.flight_eligible.len() <= points.all.len());

        // Western hemisphere only: longitudes in [-180, 0).
        for point in &points.all {
            let (_, lon) = arcglobe::surface::point_to_lat_lon(*point);
            assert!(lon < 0.5, "longitude {lon}");
        }
    }

    #[test]
    fn test_sample_map_without_land_fails() {
        let result = sample_map(
            half_land_image(72, 36),
            "test.png",
            0,
            false,
            &SamplingConfig::default(),
        );
        assert!(matches!(result, Err(arcglobe::Error::EmptyPointSet)));
    }

    #[test]
    fn test_inverted_mask_swaps_hemispheres() {
        let points = sample_map(
            half_land_image(72, 36),
            "test.png",
            128,
            true,
            &SamplingConfig::default(),
        )
        .unwrap();
        for point in &points.all {
            let (_, lon) = arcglobe::surface::point_to_lat_lon(*point);
            assert!(lon > -0.5, "longitude {lon}");
        }
    }

    fn not_found(path: &str) -> Arc<AssetLoadError> {
        Arc::new(AssetLoadError::AssetReaderError(AssetReaderError::NotFound(
            path.into(),
        )))
    }

    /// App with just enough to run the bootstrap systems, in `Loading` with
    /// nothing sampled yet.
    fn loading_app(environment: Option<Handle<Image>>) -> App {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, AssetPlugin::default(), StatesPlugin))
            .init_asset::<Image>()
            .init_asset::<Gltf>()
            .init_asset::<GltfMesh>()
            .init_state::<AppPhase>()
            .init_resource::<SamplingChannel>()
            .insert_resource(BootstrapState {
                map: Handle::default(),
                environment,
                tower_model: None,
                sampling_started: true,
                points: None,
                started_at: Instant::now(),
            });
        app
    }

    fn send_sampled(app: &App, result: arcglobe::Result<SurfacePoints>) {
        let channel = app.world().resource::<SamplingChannel>();
        channel.tx.try_send(result).unwrap();
    }

    /// Run one bootstrap step and let the state transition apply.
    fn step(app: &mut App) -> AppPhase {
        app.world_mut().run_system_cached(finish_bootstrap).unwrap();
        app.update();
        *app.world().resource::<State<AppPhase>>().get()
    }

    #[test]
    fn test_load_failure_reports_asset_and_dependencies() {
        assert_eq!(
            load_failure(
                "map.png",
                LoadState::Loading,
                RecursiveDependencyLoadState::Loading
            ),
            None
        );
        assert_eq!(
            load_failure(
                "map.png",
                LoadState::Loaded,
                RecursiveDependencyLoadState::Loaded
            ),
            None
        );

        let message = load_failure(
            "map.png",
            LoadState::Failed(not_found("map.png")),
            RecursiveDependencyLoadState::Failed(not_found("map.png")),
        )
        .unwrap();
        assert!(message.starts_with("Failed to load map.png"), "{message}");

        // The model itself loaded but one of its textures did not.
        let message = load_failure(
            "tower.gltf",
            LoadState::Loaded,
            RecursiveDependencyLoadState::Failed(not_found("tower.png")),
        )
        .unwrap();
        assert!(message.contains("dependency of tower.gltf"), "{message}");
    }

    #[test]
    fn test_running_waits_for_sampled_points() {
        let mut app = loading_app(None);

        assert_eq!(step(&mut app), AppPhase::Loading);
        assert!(!app.world().contains_resource::<LoadedWorld>());

        let points = sample_map(
            half_land_image(72, 36),
            "test.png",
            128,
            false,
            &SamplingConfig::default(),
        );
        send_sampled(&app, points);

        assert_eq!(step(&mut app), AppPhase::Running);
        let world = app.world().resource::<LoadedWorld>();
        assert!(!world.points.flight_eligible.is_empty());
        assert!(world.tower_mesh.is_none());
        assert!(!app.world().contains_resource::<BootstrapError>());
    }

    #[test]
    fn test_running_waits_for_optional_assets() {
        // Never loaded by the asset server.
        let environment = Handle::<Image>::default();
        let mut app = loading_app(Some(environment));

        let points = sample_map(
            half_land_image(72, 36),
            "test.png",
            128,
            false,
            &SamplingConfig::default(),
        );
        send_sampled(&app, points);

        for _ in 0..3 {
            assert_eq!(step(&mut app), AppPhase::Loading);
        }
        assert!(!app.world().contains_resource::<LoadedWorld>());
    }

    #[test]
    fn test_empty_sampling_fails_bootstrap() {
        let mut app = loading_app(None);
        send_sampled(&app, Err(arcglobe::Error::EmptyPointSet));

        assert_eq!(step(&mut app), AppPhase::Failed);
        assert!(!app.world().contains_resource::<LoadedWorld>());
        let error = app.world().resource::<BootstrapError>();
        assert_eq!(error.0, arcglobe::Error::EmptyPointSet.to_string());
    }

    #[test]
    fn test_sample_map_rejects_degenerate_step() {
        let config = SamplingConfig {
            step_deg: f64::NAN,
            ..Default::default()
        };
        let result = sample_map(half_land_image(72, 36), "test.png", 128, false, &config);
        assert!(matches!(
            result,
            Err(arcglobe::Error::InvalidConfig {
                field: "step_deg",
                ..
            })
        ));
    }
}
