//! Per-frame scheduler for concurrent flight animations.
//!
//! A fixed pool of slots is pre-allocated, but only the first
//! `max_concurrent` are ever scheduled. Each slot is either idle, counting
//! frames towards its start delay, or active with a pair of markers and an
//! arc between them.
//!
//! ```text
//! Idle { timer, delay } --(timer > delay)--> Active(Flight)
//! Active(Flight) --(arc finished)--> Idle { timer: 0, delay }
//! ```
//!
//! The scheduler never touches the renderer directly. Marker creation, tower
//! updates and release go through [`FlightScene`].

use glam::Vec3;
use rand::Rng;

use crate::arc::{ArcPhase, FlightArc, MAX_DRAW_TICKS};
use crate::error::{Error, Result};
use crate::projection::raise_to_top;

/// Default maximum chord length between a flight's endpoints.
pub const MAX_ARC_DISTANCE: f32 = 40.0;
/// Change in tower scale per frame while an arc is drawing or erasing.
pub const TOWER_GROWTH_PER_FRAME: f32 = 0.01;
/// Random draws for an end point before falling back to a full scan.
pub const MAX_END_POINT_ATTEMPTS: usize = 1000;

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct FlightConfig {
    /// Number of pre-allocated slots (two markers each).
    pub pool_slots: usize,
    /// Number of slots that are actually scheduled.
    pub max_concurrent: usize,
    /// Start delays are drawn from `0..max_delay` frames.
    pub max_delay: u32,
    /// Maximum distance between a flight's start and end points.
    pub max_arc_distance: f32,
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            pool_slots: 200,
            max_concurrent: 20,
            max_delay: 2000,
            max_arc_distance: MAX_ARC_DISTANCE,
        }
    }
}

impl FlightConfig {
    /// Check that the configuration can be scheduled.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent == 0 || self.max_concurrent > self.pool_slots {
            return Err(Error::InvalidConfig {
                field: "max_concurrent",
                detail: format!(
                    "must be between 1 and pool size {}, got {}",
                    self.pool_slots, self.max_concurrent
                ),
            });
        }
        if self.max_delay == 0 {
            return Err(Error::InvalidConfig {
                field: "max_delay",
                detail: "must be at least 1 frame".to_string(),
            });
        }
        if self.max_arc_distance.is_nan() || self.max_arc_distance <= 0.0 {
            return Err(Error::InvalidConfig {
                field: "max_arc_distance",
                detail: format!("must be positive, got {}", self.max_arc_distance),
            });
        }
        Ok(())
    }
}

/// Which end of a flight a marker belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Start,
    End,
}

/// Rendering backend for markers.
///
/// Handles are moved into [`FlightScene::release_marker`], so each marker is
/// released exactly once.
pub trait FlightScene {
    /// Engine-side handle for one marker (tower + top).
    type Handle;

    /// Create a marker with a zero-length tower at `surface` and its top at
    /// `top`, both facing the globe center.
    fn spawn_marker(&mut self, slot: usize, endpoint: Endpoint, surface: Vec3, top: Vec3)
    -> Self::Handle;

    /// Set the tower length as a fraction of its full height.
    fn set_tower_scale(&mut self, handle: &Self::Handle, scale: f32);

    /// Remove the marker and free its resources.
    fn release_marker(&mut self, handle: Self::Handle);
}

/// One endpoint marker of an active flight.
#[derive(Debug)]
pub struct Marker<H> {
    surface: Vec3,
    top: Vec3,
    tower_scale: f32,
    handle: H,
}

impl<H> Marker<H> {
    fn spawn<S>(scene: &mut S, slot: usize, endpoint: Endpoint, surface: Vec3) -> Self
    where
        S: FlightScene<Handle = H>,
    {
        let top = raise_to_top(surface);
        Self {
            surface,
            top,
            tower_scale: 0.0,
            handle: scene.spawn_marker(slot, endpoint, surface, top),
        }
    }

    /// Point on the globe surface.
    pub fn surface(&self) -> Vec3 {
        self.surface
    }

    /// Raised counterpart where the top sits.
    pub fn top(&self) -> Vec3 {
        self.top
    }

    /// Tower length as a fraction of full height, in `0..=1`.
    pub fn tower_scale(&self) -> f32 {
        self.tower_scale
    }

    /// Engine handle.
    pub fn handle(&self) -> &H {
        &self.handle
    }
}

/// An active flight: two markers and the arc joining them.
#[derive(Debug)]
pub struct Flight<H> {
    start: Marker<H>,
    end: Marker<H>,
    arc: FlightArc,
    delay: u32,
}

impl<H> Flight<H> {
    pub fn start(&self) -> &Marker<H> {
        &self.start
    }

    pub fn end(&self) -> &Marker<H> {
        &self.end
    }

    pub fn arc(&self) -> &FlightArc {
        &self.arc
    }

    /// Advance towers and arc by one frame.
    fn step<S>(&mut self, scene: &mut S)
    where
        S: FlightScene<Handle = H>,
    {
        if self.arc.draw_ticks() < MAX_DRAW_TICKS {
            let delta = match self.arc.phase() {
                ArcPhase::Growing => TOWER_GROWTH_PER_FRAME,
                ArcPhase::Shrinking => -TOWER_GROWTH_PER_FRAME,
            };
            for marker in [&mut self.start, &mut self.end] {
                marker.tower_scale = (marker.tower_scale + delta).clamp(0.0, 1.0);
                scene.set_tower_scale(&marker.handle, marker.tower_scale);
            }
        }
        self.arc.advance();
    }
}

/// State of one pool slot.
#[derive(Debug)]
pub enum SlotState<H> {
    /// Waiting to launch; `timer` counts frames spent idle.
    Idle { timer: u32, delay: u32 },
    /// Running a flight.
    Active(Flight<H>),
}

impl<H> SlotState<H> {
    pub fn is_active(&self) -> bool {
        matches!(self, SlotState::Active(_))
    }
}

/// What a slot needs after its per-frame bookkeeping.
enum SlotAction {
    Nothing,
    Launch { delay: u32 },
    Teardown,
}

/// Drives the bounded set of concurrent flights.
pub struct FlightScheduler<H, R> {
    config: FlightConfig,
    points: Vec<Vec3>,
    slots: Vec<SlotState<H>>,
    rng: R,
}

impl<H, R: Rng> FlightScheduler<H, R> {
    /// Create a scheduler over a non-empty set of candidate endpoints.
    ///
    /// Every slot gets a random start delay in `0..max_delay`, except slot 0
    /// which starts on the first tick.
    pub fn new(config: FlightConfig, points: Vec<Vec3>, mut rng: R) -> Result<Self> {
        config.validate()?;
        if points.is_empty() {
            return Err(Error::EmptyPointSet);
        }

        let slots = (0..config.pool_slots)
            .map(|index| SlotState::Idle {
                timer: 0,
                delay: if index == 0 {
                    0
                } else {
                    rng.random_range(0..config.max_delay)
                },
            })
            .collect();

        tracing::info!(
            "Flight scheduler ready: {} of {} slots scheduled, {} candidate points",
            config.max_concurrent,
            config.pool_slots,
            points.len()
        );

        Ok(Self {
            config,
            points,
            slots,
            rng,
        })
    }

    /// Advance every scheduled slot by one frame, in ascending slot order.
    pub fn tick<S>(&mut self, scene: &mut S)
    where
        S: FlightScene<Handle = H>,
    {
        for index in 0..self.config.max_concurrent {
            self.tick_slot(index, scene);
        }
    }

    fn tick_slot<S>(&mut self, index: usize, scene: &mut S)
    where
        S: FlightScene<Handle = H>,
    {
        let action = match &mut self.slots[index] {
            SlotState::Idle { timer, delay } => {
                *timer += 1;
                if *timer > *delay {
                    SlotAction::Launch { delay: *delay }
                } else {
                    SlotAction::Nothing
                }
            }
            SlotState::Active(flight) => {
                if flight.arc.still_animating() {
                    flight.step(scene);
                    SlotAction::Nothing
                } else {
                    SlotAction::Teardown
                }
            }
        };

        match action {
            SlotAction::Nothing => {}
            SlotAction::Launch { delay } => {
                let flight = self.launch(index, delay, scene);
                self.slots[index] = SlotState::Active(flight);
            }
            SlotAction::Teardown => {
                self.teardown(index, scene);
            }
        }
    }

    fn launch<S>(&mut self, index: usize, delay: u32, scene: &mut S) -> Flight<H>
    where
        S: FlightScene<Handle = H>,
    {
        let start_index = self.rng.random_range(0..self.points.len());
        let end_index = choose_end(
            &self.points,
            start_index,
            self.config.max_arc_distance,
            &mut self.rng,
        );
        let start = self.points[start_index];
        let end = self.points[end_index];

        tracing::trace!(
            slot = index,
            distance = start.distance(end),
            "Launching flight"
        );

        Flight {
            start: Marker::spawn(scene, index, Endpoint::Start, start),
            end: Marker::spawn(scene, index, Endpoint::End, end),
            arc: FlightArc::new(start, end),
            delay,
        }
    }
}

impl<H, R> FlightScheduler<H, R> {
    /// Release an active slot's markers and return it to idle.
    ///
    /// Returns `false` (and does nothing) if the slot is idle or out of range.
    pub fn teardown<S>(&mut self, index: usize, scene: &mut S) -> bool
    where
        S: FlightScene<Handle = H>,
    {
        let Some(slot) = self.slots.get_mut(index) else {
            return false;
        };
        if !slot.is_active() {
            return false;
        }

        let idle = SlotState::Idle { timer: 0, delay: 0 };
        let SlotState::Active(flight) = std::mem::replace(slot, idle) else {
            return false;
        };
        let Flight {
            start, end, delay, ..
        } = flight;
        scene.release_marker(start.handle);
        scene.release_marker(end.handle);
        *slot = SlotState::Idle { timer: 0, delay };

        tracing::trace!(slot = index, "Flight finished");
        true
    }

    /// All pool slots, including the unscheduled headroom.
    pub fn slots(&self) -> &[SlotState<H>] {
        &self.slots
    }

    /// Active flights with their slot index.
    pub fn active_flights(&self) -> impl Iterator<Item = (usize, &Flight<H>)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                SlotState::Active(flight) => Some((index, flight)),
                SlotState::Idle { .. } => None,
            })
    }

    /// Number of currently active flights.
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_active()).count()
    }

    /// Maximum number of simultaneously active flights.
    pub fn capacity(&self) -> usize {
        self.config.max_concurrent
    }

    /// Number of pre-allocated slots.
    pub fn pool_size(&self) -> usize {
        self.slots.len()
    }

    /// Candidate endpoints.
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Configuration the scheduler was built with.
    pub fn config(&self) -> &FlightConfig {
        &self.config
    }
}

/// Pick an end point index within `max_distance` of `points[start_index]`.
///
/// Draws uniformly at random until a point other than the start is in range.
/// After [`MAX_END_POINT_ATTEMPTS`] misses, chooses uniformly among all
/// in-range points instead; if there are none, returns `start_index`.
pub fn choose_end<R: Rng + ?Sized>(
    points: &[Vec3],
    start_index: usize,
    max_distance: f32,
    rng: &mut R,
) -> usize {
    let start = points[start_index];
    let in_range =
        |index: usize| index != start_index && points[index].distance(start) <= max_distance;

    for _ in 0..MAX_END_POINT_ATTEMPTS {
        let candidate = rng.random_range(0..points.len());
        if in_range(candidate) {
            return candidate;
        }
    }

    let candidates: Vec<usize> = (0..points.len()).filter(|&index| in_range(index)).collect();
    if candidates.is_empty() {
        tracing::debug!("No end point within {max_distance} of {start}, using start point");
        return start_index;
    }
    candidates[rng.random_range(0..candidates.len())]
}
