//! Hover picking for markers.
//!
//! Every frame a ray is cast from the camera through the cursor and tested
//! against the globe, every tower and every top. When the closest hit is a
//! marker, a small panel next to the cursor describes it. Moving the pointer
//! hides the panel until the next pick.

use arcglobe::GLOBE_RADIUS;
use arcglobe::picking::{PickShape, nearest_hit};
use arcglobe::scheduler::Endpoint;
use arcglobe::surface::point_to_lat_lon;
use bevy::ecs::message::MessageReader;
use bevy::prelude::*;
use bevy::window::CursorMoved;
use bevy_egui::{EguiContexts, EguiPrimaryContextPass, egui};

use crate::bootstrap::AppPhase;
use crate::flights::{MarkerInfo, MarkerKind, Tower, TowerTop, tick_flights};

/// Panel offset from the cursor, in logical pixels.
const PANEL_OFFSET: Vec2 = Vec2::new(-150.0, -47.0);
/// Pick radius around a tower's axis; wider than the mesh to be easy to hit.
const TOWER_PICK_RADIUS: f32 = 0.15;
/// Pick radius of a tower top.
const TOP_PICK_RADIUS: f32 = 0.25;

/// Marker entities of one kind, with what they represent.
type MarkerQuery<'w, 's, T> = Query<'w, 's, (&'static Transform, &'static MarkerInfo), With<T>>;

/// Plugin for marker hover descriptions.
pub struct HoverPlugin;

impl Plugin for HoverPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<HoverState>()
            .add_systems(
                Update,
                (
                    track_cursor,
                    pick_marker
                        .after(tick_flights)
                        .run_if(in_state(AppPhase::Running)),
                )
                    .chain(),
            )
            .add_systems(EguiPrimaryContextPass, description_panel);
    }
}

/// Cursor position and the description of the hovered marker.
#[derive(Resource, Debug, Default)]
pub struct HoverState {
    /// Cursor position in logical window pixels.
    pub cursor: Option<Vec2>,
    /// Whether the description panel is shown.
    pub visible: bool,
    /// Text for the description panel.
    pub description: String,
}

impl HoverState {
    /// Show the panel for `picked`, or hide it.
    pub fn show(&mut self, picked: Option<&MarkerInfo>) {
        match picked {
            Some(info) => {
                self.visible = true;
                self.description = describe(info);
            }
            None => self.visible = false,
        }
    }
}

/// Record pointer moves and hide the panel.
fn track_cursor(mut moves: MessageReader<CursorMoved>, mut hover: ResMut<HoverState>) {
    if let Some(event) = moves.read().last() {
        hover.cursor = Some(event.position);
        hover.visible = false;
    }
}

/// Cast a ray through the cursor and find the closest marker.
#[allow(clippy::needless_pass_by_value)]
fn pick_marker(
    mut hover: ResMut<HoverState>,
    camera: Single<(&Camera, &GlobalTransform)>,
    towers: MarkerQuery<Tower>,
    tops: MarkerQuery<TowerTop>,
) {
    let Some(cursor) = hover.cursor else {
        return;
    };
    let (camera, camera_transform) = *camera;
    let Ok(ray) = camera.viewport_to_world(camera_transform, cursor) else {
        return;
    };

    let picked = hovered_marker(ray, &towers, &tops);
    hover.show(picked.as_ref());
}

/// The marker closest along `ray`, unless the globe is in front of it.
fn hovered_marker(
    ray: Ray3d,
    towers: &MarkerQuery<Tower>,
    tops: &MarkerQuery<TowerTop>,
) -> Option<MarkerInfo> {
    let globe = std::iter::once((
        None,
        PickShape::Sphere {
            center: Vec3::ZERO,
            radius: GLOBE_RADIUS,
        },
    ));
    let tower_shapes = towers.iter().map(|(transform, info)| {
        let tip = transform.transform_point(Vec3::Y);
        (
            Some(*info),
            PickShape::Capsule {
                a: transform.translation,
                b: tip,
                radius: TOWER_PICK_RADIUS,
            },
        )
    });
    let top_shapes = tops.iter().map(|(transform, info)| {
        (
            Some(*info),
            PickShape::Sphere {
                center: transform.translation,
                radius: TOP_PICK_RADIUS,
            },
        )
    });

    nearest_hit(
        ray.origin,
        *ray.direction,
        globe.chain(tower_shapes).chain(top_shapes),
    )
    .and_then(|(info, _)| info)
}

/// Draw the description panel next to the cursor.
#[allow(clippy::needless_pass_by_value)]
fn description_panel(mut contexts: EguiContexts, hover: Res<HoverState>) -> Result {
    let Some(cursor) = hover.cursor else {
        return Ok(());
    };
    if !hover.visible {
        return Ok(());
    }
    let ctx = contexts.ctx_mut()?;

    let position = cursor + PANEL_OFFSET;
    egui::Area::new(egui::Id::new("marker_description"))
        .fixed_pos([position.x, position.y])
        .interactable(false)
        .show(ctx, |ui| {
            egui::Frame::popup(ui.style()).show(ui, |ui| {
                ui.label(hover.description.as_str());
            });
        });

    Ok(())
}

/// Human-readable description of a marker.
fn describe(info: &MarkerInfo) -> String {
    let title = match info.kind {
        MarkerKind::Flight { slot, endpoint } => {
            let end = match endpoint {
                Endpoint::Start => "departure",
                Endpoint::End => "arrival",
            };
            format!("Flight {slot} {end}")
        }
        MarkerKind::Landmark { index } => format!("Landmark {index}"),
    };
    let (lat, lon) = point_to_lat_lon(info.surface);
    format!("{title}\n{}", format_lat_lon(lat, lon))
}

/// Format a latitude/longitude pair with hemisphere letters.
fn format_lat_lon(lat: f64, lon: f64) -> String {
    let ns = if lat >= 0.0 { 'N' } else { 'S' };
    let ew = if lon >= 0.0 { 'E' } else { 'W' };
    format!("{:.2}°{ns}, {:.2}°{ew}", lat.abs(), lon.abs())
}

#[cfg(test)]
mod tests {
    use arcglobe::raise_to_top;
    use arcglobe::surface::lat_lon_to_point;
    use bevy::ecs::message::Messages;

    use super::*;
    use crate::flights::tower_transform;

    fn flight_marker(surface: Vec3) -> MarkerInfo {
        MarkerInfo {
            surface,
            kind: MarkerKind::Flight {
                slot: 4,
                endpoint: Endpoint::Start,
            },
        }
    }

    /// World with one full-height marker standing on `surface`.
    fn world_with_marker(surface: Vec3) -> World {
        let mut world = World::new();
        let info = flight_marker(surface);
        world.spawn((tower_transform(surface, 1.0), Tower, info));
        world.spawn((
            Transform::from_translation(raise_to_top(surface)),
            TowerTop,
            info,
        ));
        world
    }

    fn pick(world: &mut World, ray: Ray3d) -> Option<MarkerInfo> {
        world
            .run_system_cached_with(
                |In(ray): In<Ray3d>, towers: MarkerQuery<Tower>, tops: MarkerQuery<TowerTop>| {
                    hovered_marker(ray, &towers, &tops)
                },
                ray,
            )
            .unwrap()
    }

    fn ray_towards_origin(from: Vec3) -> Ray3d {
        Ray3d::new(from, Dir3::new(-from).unwrap())
    }

    #[test]
    fn test_marker_in_front_of_globe_is_picked() {
        let surface = Vec3::Z * GLOBE_RADIUS;
        let mut world = world_with_marker(surface);

        let picked = pick(&mut world, ray_towards_origin(Vec3::Z * 90.0));
        assert_eq!(picked.map(|info| info.kind), Some(flight_marker(surface).kind));
    }

    #[test]
    fn test_globe_hides_markers_behind_it() {
        let mut world = world_with_marker(Vec3::NEG_Z * GLOBE_RADIUS);
        assert!(pick(&mut world, ray_towards_origin(Vec3::Z * 90.0)).is_none());
    }

    #[test]
    fn test_globe_hit_away_from_markers_picks_nothing() {
        let mut world = world_with_marker(Vec3::X * GLOBE_RADIUS);
        assert!(pick(&mut world, ray_towards_origin(Vec3::Z * 90.0)).is_none());
    }

    #[test]
    fn test_tower_body_is_pickable() {
        let surface = Vec3::Z * GLOBE_RADIUS;
        let mut world = world_with_marker(surface);

        // Passes beside the top, through the middle of the tower.
        let mid = surface + Vec3::Z * 1.0;
        let ray = Ray3d::new(mid + Vec3::X * 50.0, Dir3::NEG_X);
        assert!(pick(&mut world, ray).is_some());
    }

    #[test]
    fn test_show_toggles_panel() {
        let mut hover = HoverState::default();
        let info = flight_marker(lat_lon_to_point(0.0, 0.0, GLOBE_RADIUS));

        hover.show(Some(&info));
        assert!(hover.visible);
        assert!(hover.description.starts_with("Flight 4 departure"));

        hover.show(None);
        assert!(!hover.visible);
    }

    #[test]
    fn test_pointer_move_hides_panel() {
        let mut world = World::new();
        world.init_resource::<Messages<CursorMoved>>();
        world.insert_resource(HoverState {
            cursor: Some(Vec2::ZERO),
            visible: true,
            description: "Landmark 0".to_string(),
        });

        world.write_message(CursorMoved {
            window: Entity::PLACEHOLDER,
            position: Vec2::new(320.0, 240.0),
            delta: None,
        });
        world.run_system_cached(track_cursor).unwrap();

        let hover = world.resource::<HoverState>();
        assert!(!hover.visible);
        assert_eq!(hover.cursor, Some(Vec2::new(320.0, 240.0)));
    }

    #[test]
    fn test_no_pointer_move_keeps_panel() {
        let mut world = World::new();
        world.init_resource::<Messages<CursorMoved>>();
        world.insert_resource(HoverState {
            cursor: Some(Vec2::ZERO),
            visible: true,
            description: "Landmark 0".to_string(),
        });

        world.run_system_cached(track_cursor).unwrap();
        assert!(world.resource::<HoverState>().visible);
    }

    #[test]
    fn test_format_lat_lon() {
        assert_eq!(format_lat_lon(40.7, -74.0), "40.70°N, 74.00°W");
        assert_eq!(format_lat_lon(-33.87, 151.21), "33.87°S, 151.21°E");
    }

    #[test]
    fn test_describe_flight_marker() {
        let info = MarkerInfo {
            surface: lat_lon_to_point(10.0, 20.0, GLOBE_RADIUS),
            kind: MarkerKind::Flight {
                slot: 7,
                endpoint: Endpoint::End,
            },
        };
        assert_eq!(describe(&info), "Flight 7 arrival\n10.00°N, 20.00°E");
    }

    #[test]
    fn test_describe_landmark() {
        let info = MarkerInfo {
            surface: lat_lon_to_point(-5.0, -60.0, GLOBE_RADIUS),
            kind: MarkerKind::Landmark { index: 2 },
        };
        assert_eq!(describe(&info), "Landmark 2\n5.00°S, 60.00°W");
    }
}
