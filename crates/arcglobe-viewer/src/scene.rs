//! Static scene: camera, lights, sky, globe and continents.
//!
//! The camera, lights, sky and bare globe are spawned at startup so something
//! is on screen while bootstrap runs. The continent dots and the environment
//! map are added once the world has loaded.

use arcglobe::GLOBE_RADIUS;
use bevy::asset::RenderAssetUsages;
use bevy::camera::ClearColorConfig;
use bevy::mesh::{Indices, PrimitiveTopology};
use bevy::prelude::*;
use bevy::render::render_resource::Face;

use crate::bootstrap::{AppPhase, LoadedWorld};
use crate::camera::OrbitCamera;

/// Initial camera position.
const CAMERA_START: Vec3 = Vec3::new(0.0, 0.5, 90.0);
/// Radius of the inverted sky sphere.
const SKY_RADIUS: f32 = 400.0;
/// Sky sphere offset from the origin.
const SKY_OFFSET: Vec3 = Vec3::new(0.0, -5.0, 0.0);
/// Point light offset, relative to the camera.
const LIGHT_OFFSET: Vec3 = Vec3::new(-300.0, 500.0, 0.0);
/// Height of continent dots above the globe surface.
const CONTINENT_LIFT: f32 = 0.02;
/// Radius of a single continent dot.
const DOT_RADIUS: f32 = 0.16;
/// Triangles per continent dot.
const DOT_SEGMENTS: u32 = 6;

/// Plugin for the static scene.
pub struct ScenePlugin;

impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_scene).add_systems(
            OnEnter(AppPhase::Running),
            (spawn_continents, apply_environment_map),
        );
    }
}

/// Marker for the sky sphere.
#[derive(Component)]
pub struct Sky;

/// Marker for the continent dot mesh.
#[derive(Component)]
pub struct Continents;

/// Spawn camera, lights, sky and globe.
fn setup_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.spawn((
        Camera3d::default(),
        Camera {
            clear_color: ClearColorConfig::Custom(Color::BLACK),
            ..default()
        },
        Transform::from_translation(CAMERA_START).looking_at(Vec3::ZERO, Vec3::Y),
        Projection::Perspective(PerspectiveProjection {
            fov: 45.0_f32.to_radians(),
            near: 0.1,
            far: 1000.0,
            ..Default::default()
        }),
        AmbientLight {
            color: Color::WHITE,
            brightness: 400.0,
            ..default()
        },
        OrbitCamera::from_position(CAMERA_START),
        children![(
            PointLight {
                intensity: 2.0e9,
                range: 2000.0,
                ..default()
            },
            Transform::from_translation(LIGHT_OFFSET),
        )],
    ));

    commands.spawn((
        Mesh3d(meshes.add(Sphere::new(SKY_RADIUS).mesh().uv(32, 20))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb_u8(0x05, 0x08, 0x17),
            unlit: true,
            cull_mode: Some(Face::Front),
            ..default()
        })),
        Transform::from_translation(SKY_OFFSET),
        Sky,
    ));

    commands.spawn((
        Mesh3d(meshes.add(Sphere::new(GLOBE_RADIUS).mesh().uv(64, 48))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb_u8(0x0b, 0x16, 0x33),
            perceptual_roughness: 0.8,
            ..default()
        })),
        Transform::default(),
    ));

    tracing::info!("Scene setup complete - drag to rotate the globe");
}

/// Spawn one merged mesh holding a dot for every land point.
#[allow(clippy::needless_pass_by_value)]
fn spawn_continents(
    mut commands: Commands,
    world: Res<LoadedWorld>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let mesh = continent_mesh(&world.points.all);

    commands.spawn((
        Mesh3d(meshes.add(mesh)),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.55, 0.75, 0.95),
            emissive: LinearRgba::rgb(0.05, 0.08, 0.12),
            cull_mode: None,
            ..default()
        })),
        Transform::default(),
        Continents,
    ));

    tracing::debug!("Spawned {} continent dots", world.points.all.len());
}

/// Put the environment map on the sky sphere, if one was loaded.
///
/// The map is only a backdrop; scene lighting stays the ambient and point
/// lights.
#[allow(clippy::needless_pass_by_value)]
fn apply_environment_map(
    mut commands: Commands,
    world: Res<LoadedWorld>,
    sky: Query<Entity, With<Sky>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let Some(environment) = &world.environment else {
        return;
    };
    let material = materials.add(StandardMaterial {
        base_color_texture: Some(environment.clone()),
        unlit: true,
        cull_mode: Some(Face::Front),
        ..default()
    });
    for entity in &sky {
        commands
            .entity(entity)
            .insert(MeshMaterial3d(material.clone()));
    }
    tracing::info!("Applied environment map to sky");
}

/// Build the continent dot mesh.
fn continent_mesh(points: &[Vec3]) -> Mesh {
    let (positions, normals, indices) = disc_geometry(
        points,
        GLOBE_RADIUS + CONTINENT_LIFT,
        DOT_RADIUS,
        DOT_SEGMENTS,
    );

    let mut mesh = Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::default(),
    );
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
    mesh.insert_indices(Indices::U32(indices));
    mesh
}

/// Flat discs tangent to the sphere at each point, as a triangle fan per disc.
///
/// Every point is pushed out to `radius`. Triangles wind counter-clockwise
/// when seen from outside the sphere.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn disc_geometry(
    points: &[Vec3],
    radius: f32,
    disc_radius: f32,
    segments: u32,
) -> (Vec<[f32; 3]>, Vec<[f32; 3]>, Vec<u32>) {
    let verts_per_disc = segments as usize + 1;
    let mut positions = Vec::with_capacity(points.len() * verts_per_disc);
    let mut normals = Vec::with_capacity(points.len() * verts_per_disc);
    let mut indices = Vec::with_capacity(points.len() * segments as usize * 3);

    for point in points {
        let Some(normal) = point.try_normalize() else {
            continue;
        };
        let center = normal * radius;
        let tangent = normal.any_orthonormal_vector();
        let bitangent = normal.cross(tangent);

        let base = positions.len() as u32;
        positions.push(center.to_array());
        normals.push(normal.to_array());
        for i in 0..segments {
            let angle = std::f32::consts::TAU * i as f32 / segments as f32;
            let rim = center + (tangent * angle.cos() + bitangent * angle.sin()) * disc_radius;
            positions.push(rim.to_array());
            normals.push(normal.to_array());
        }
        for i in 0..segments {
            let current = base + 1 + i;
            let next = base + 1 + (i + 1) % segments;
            indices.extend_from_slice(&[base, current, next]);
        }
    }

    (positions, normals, indices)
}
