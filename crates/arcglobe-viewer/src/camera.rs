//! Orbit camera around the globe.
//!
//! Left-drag rotates, the camera slowly auto-rotates, and both are smoothed
//! with per-frame damping. There is no pan or zoom: the camera always looks at
//! the globe center from a fixed distance.

use std::f32::consts::{FRAC_PI_2, TAU};

use bevy::ecs::message::MessageReader;
use bevy::input::mouse::MouseMotion;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use bevy_egui::EguiContexts;

use crate::launch_params::LaunchParams;

/// Keeps the camera from flipping over the poles.
const MAX_PITCH: f32 = FRAC_PI_2 - 0.05;

/// Plugin for the orbit camera.
pub struct OrbitCameraPlugin;

impl Plugin for OrbitCameraPlugin {
    fn build(&self, app: &mut App) {
        let settings = OrbitSettings::from_launch_params(app.world());
        app.insert_resource(settings)
            .add_systems(Update, orbit_camera);
    }
}

/// Settings for the orbit camera.
#[derive(Resource, Debug, Clone)]
pub struct OrbitSettings {
    /// Fraction of the pending rotation applied each frame.
    pub damping: f32,
    /// Rotate around the globe when idle.
    pub auto_rotate: bool,
    /// Auto-rotation speed; 1.0 is one revolution per minute.
    pub auto_rotate_speed: f32,
    /// Drag sensitivity; a drag across the viewport height is one revolution.
    pub rotate_speed: f32,
}

impl Default for OrbitSettings {
    fn default() -> Self {
        Self {
            damping: 0.05,
            auto_rotate: true,
            auto_rotate_speed: 0.5,
            rotate_speed: 1.0,
        }
    }
}

impl OrbitSettings {
    /// Defaults, seeded from `LaunchParams` when present.
    fn from_launch_params(world: &World) -> Self {
        let auto_rotate = world
            .get_resource::<LaunchParams>()
            .is_none_or(|params| params.auto_rotate);
        Self {
            auto_rotate,
            ..Default::default()
        }
    }
}

/// Camera orbiting the origin, in spherical coordinates.
#[derive(Component, Debug, Clone)]
pub struct OrbitCamera {
    /// Angle around the Y axis, 0 looking down -Z.
    pub yaw: f32,
    /// Elevation above the equator plane.
    pub pitch: f32,
    /// Distance from the origin.
    pub radius: f32,
    yaw_delta: f32,
    pitch_delta: f32,
}

impl OrbitCamera {
    /// Orbit camera currently at `position`.
    pub fn from_position(position: Vec3) -> Self {
        let radius = position.length();
        Self {
            yaw: position.x.atan2(position.z),
            pitch: (position.y / radius).asin(),
            radius,
            yaw_delta: 0.0,
            pitch_delta: 0.0,
        }
    }

    /// World-space camera position.
    pub fn position(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        Vec3::new(
            self.radius * cos_pitch * sin_yaw,
            self.radius * sin_pitch,
            self.radius * cos_pitch * cos_yaw,
        )
    }

    /// Advance by one frame.
    ///
    /// `drag` is the mouse movement this frame in pixels, `viewport_height`
    /// the window height in pixels.
    pub fn update(&mut self, settings: &OrbitSettings, drag: Vec2, viewport_height: f32, dt: f32) {
        if settings.auto_rotate {
            self.yaw_delta -= TAU / 60.0 * settings.auto_rotate_speed * dt;
        }
        if viewport_height > 0.0 {
            self.yaw_delta -= TAU * drag.x / viewport_height * settings.rotate_speed;
            self.pitch_delta += TAU * drag.y / viewport_height * settings.rotate_speed;
        }

        self.yaw = (self.yaw + self.yaw_delta * settings.damping).rem_euclid(TAU);
        self.pitch =
            (self.pitch + self.pitch_delta * settings.damping).clamp(-MAX_PITCH, MAX_PITCH);

        self.yaw_delta *= 1.0 - settings.damping;
        self.pitch_delta *= 1.0 - settings.damping;
    }
}

/// Apply drag and auto-rotation to the camera.
#[allow(clippy::needless_pass_by_value)]
fn orbit_camera(
    mut mouse_motion: MessageReader<MouseMotion>,
    mouse: Res<ButtonInput<MouseButton>>,
    mut contexts: EguiContexts,
    settings: Res<OrbitSettings>,
    time: Res<Time>,
    window: Single<&Window, With<PrimaryWindow>>,
    mut query: Query<(&mut OrbitCamera, &mut Transform)>,
) {
    let mut drag = Vec2::ZERO;
    for event in mouse_motion.read() {
        drag += event.delta;
    }

    let egui_wants_pointer = contexts
        .ctx_mut()
        .ok()
        .is_some_and(|ctx| ctx.is_pointer_over_area());
    if !mouse.pressed(MouseButton::Left) || egui_wants_pointer {
        drag = Vec2::ZERO;
    }

    for (mut camera, mut transform) in &mut query {
        camera.update(&settings, drag, window.height(), time.delta_secs());
        *transform = Transform::from_translation(camera.position()).looking_at(Vec3::ZERO, Vec3::Y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: f32 = 1.0 / 60.0;

    #[test]
    fn test_position_round_trip() {
        let start = Vec3::new(0.0, 0.5, 90.0);
        let camera = OrbitCamera::from_position(start);
        assert!(camera.position().distance(start) < 1e-4);
        assert!((camera.radius - start.length()).abs() < 1e-4);
    }

    #[test]
    fn test_auto_rotation_period() {
        let settings = OrbitSettings::default();
        let mut camera = OrbitCamera::from_position(Vec3::new(0.0, 0.0, 90.0));

        // Let the damped rotation reach its steady rate.
        for _ in 0..600 {
            camera.update(&settings, Vec2::ZERO, 720.0, FRAME);
        }
        let before = camera.yaw;
        for _ in 0..60 {
            camera.update(&settings, Vec2::ZERO, 720.0, FRAME);
        }
        let per_second = (before - camera.yaw).rem_euclid(TAU);

        // One revolution every 120 seconds.
        assert!((per_second - TAU / 120.0).abs() < 1e-3, "rate {per_second}");
        assert!((camera.radius - 90.0).abs() < 1e-4);
    }

    #[test]
    fn test_no_motion_without_input_or_auto_rotate() {
        let settings = OrbitSettings {
            auto_rotate: false,
            ..Default::default()
        };
        let mut camera = OrbitCamera::from_position(Vec3::new(0.0, 0.5, 90.0));
        let start = camera.position();
        for _ in 0..100 {
            camera.update(&settings, Vec2::ZERO, 720.0, FRAME);
        }
        assert!(camera.position().distance(start) < 1e-4);
    }

    #[test]
    fn test_drag_is_damped_and_pitch_clamped() {
        let settings = OrbitSettings {
            auto_rotate: false,
            ..Default::default()
        };
        let mut camera = OrbitCamera::from_position(Vec3::new(0.0, 0.0, 90.0));

        camera.update(&settings, Vec2::new(0.0, 720.0), 720.0, FRAME);
        let first_step = camera.pitch;
        assert!(first_step > 0.0);
        // Only part of the drag is applied immediately.
        assert!(first_step < TAU * 0.1);

        for _ in 0..600 {
            camera.update(&settings, Vec2::new(0.0, 720.0), 720.0, FRAME);
        }
        assert!((camera.pitch - MAX_PITCH).abs() < 1e-6);
        assert!((camera.position().length() - 90.0).abs() < 1e-3);
    }
}
