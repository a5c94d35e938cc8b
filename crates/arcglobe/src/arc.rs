//! Curved flight arcs drawn progressively above the globe.
//!
//! An arc is a cubic Bézier from the start point to the end point whose
//! control points are lifted off the surface in proportion to the distance
//! travelled. It is sampled once at construction; animation only moves the
//! window of samples that is visible.
//!
//! ```text
//! Growing:   head advances 0 -> MAX_DRAW_TICKS, then holds for HOLD_FRAMES
//! Shrinking: tail advances 0 -> MAX_DRAW_TICKS while the arc fades out
//! ```

use glam::Vec3;

use crate::GLOBE_RADIUS;

/// Draw ticks at which an arc is fully drawn (or fully erased).
pub const MAX_DRAW_TICKS: u32 = 3600;
/// Draw ticks added per frame.
pub const DRAW_TICKS_PER_FRAME: u32 = 36;
/// Frames a fully drawn arc stays on screen before retracting.
pub const HOLD_FRAMES: u32 = 90;
/// Number of line segments an arc is sampled into.
pub const ARC_SEGMENTS: usize = 120;
/// Lowest peak altitude above the globe surface.
pub const ARC_MIN_ALTITUDE: f32 = 1.5;
/// Peak altitude per unit of chord length.
pub const ARC_ALTITUDE_FACTOR: f32 = 0.35;

/// Which way an arc is currently animating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcPhase {
    /// The head is being drawn out from the start point (or holding).
    Growing,
    /// The tail is being erased towards the end point.
    Shrinking,
}

/// A single animated arc between two surface points.
#[derive(Debug, Clone)]
pub struct FlightArc {
    points: Vec<Vec3>,
    phase: ArcPhase,
    draw_ticks: u32,
    hold_remaining: u32,
    animating: bool,
}

impl FlightArc {
    /// Build the arc for a start and end point on the globe surface.
    #[must_use]
    pub fn new(start: Vec3, end: Vec3) -> Self {
        Self {
            points: sample_curve(start, end),
            phase: ArcPhase::Growing,
            draw_ticks: 0,
            hold_remaining: HOLD_FRAMES,
            animating: true,
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> ArcPhase {
        self.phase
    }

    /// Draw progress within the current phase, in `0..=MAX_DRAW_TICKS`.
    #[must_use]
    pub fn draw_ticks(&self) -> u32 {
        self.draw_ticks
    }

    /// False once the arc has been drawn, held, and fully erased.
    #[must_use]
    pub fn still_animating(&self) -> bool {
        self.animating
    }

    /// All sampled points, start to end.
    #[must_use]
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Advance the animation by one frame.
    pub fn advance(&mut self) {
        if !self.animating {
            return;
        }

        match self.phase {
            ArcPhase::Growing => {
                if self.draw_ticks < MAX_DRAW_TICKS {
                    self.draw_ticks = (self.draw_ticks + DRAW_TICKS_PER_FRAME).min(MAX_DRAW_TICKS);
                } else if self.hold_remaining > 0 {
                    self.hold_remaining -= 1;
                } else {
                    self.phase = ArcPhase::Shrinking;
                    self.draw_ticks = 0;
                }
            }
            ArcPhase::Shrinking => {
                self.draw_ticks = (self.draw_ticks + DRAW_TICKS_PER_FRAME).min(MAX_DRAW_TICKS);
                if self.draw_ticks == MAX_DRAW_TICKS {
                    self.animating = false;
                }
            }
        }
    }

    /// The part of the arc that should currently be drawn.
    #[must_use]
    pub fn visible_points(&self) -> &[Vec3] {
        if !self.animating {
            return &[];
        }
        let cut = self.cut_index();
        match self.phase {
            ArcPhase::Growing => &self.points[..=cut],
            ArcPhase::Shrinking => &self.points[cut..],
        }
    }

    /// Line opacity: solid while growing, fading out while shrinking.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn opacity(&self) -> f32 {
        match self.phase {
            ArcPhase::Growing => 1.0,
            ArcPhase::Shrinking => 1.0 - self.draw_ticks as f32 / MAX_DRAW_TICKS as f32,
        }
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn cut_index(&self) -> usize {
        let t = self.draw_ticks as f32 / MAX_DRAW_TICKS as f32;
        ((t * ARC_SEGMENTS as f32).round() as usize).min(ARC_SEGMENTS)
    }
}

/// Sample the lifted cubic Bézier between two surface points.
#[allow(clippy::cast_precision_loss)]
fn sample_curve(start: Vec3, end: Vec3) -> Vec<Vec3> {
    let altitude = (start.distance(end) * ARC_ALTITUDE_FACTOR).max(ARC_MIN_ALTITUDE);
    let lift = |t: f32| {
        let chord = start.lerp(end, t);
        // Antipodal chords pass through the origin.
        let dir = chord.try_normalize().unwrap_or(Vec3::Y);
        dir * (GLOBE_RADIUS + altitude)
    };
    let c1 = lift(0.25);
    let c2 = lift(0.75);

    (0..=ARC_SEGMENTS)
        .map(|i| {
            let t = i as f32 / ARC_SEGMENTS as f32;
            let u = 1.0 - t;
            start * (u * u * u)
                + c1 * (3.0 * u * u * t)
                + c2 * (3.0 * u * t * t)
                + end * (t * t * t)
        })
        .collect()
}
