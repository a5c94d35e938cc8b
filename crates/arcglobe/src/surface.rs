//! Surface point sampling from an equirectangular land mask.
//!
//! A world map image is treated as a land/water mask. Cells of a lat/lon grid
//! that fall on land become points on the globe surface. Longitude samples are
//! thinned towards the poles so the dots stay roughly evenly spaced.

use glam::Vec3;
use image::GrayImage;

use crate::{Error, GLOBE_RADIUS, Result};

/// Finest accepted sampling step, in degrees.
pub const MIN_STEP_DEG: f64 = 0.05;

/// Convert latitude and longitude (degrees) to a point on a sphere.
///
/// Y is up (north pole at `+Y`), longitude 0 lies on `+X` and increases
/// towards `-Z`.
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub fn lat_lon_to_point(lat_deg: f64, lon_deg: f64, radius: f32) -> Vec3 {
    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();
    let radius = f64::from(radius);
    Vec3::new(
        (radius * lat.cos() * lon.cos()) as f32,
        (radius * lat.sin()) as f32,
        (-radius * lat.cos() * lon.sin()) as f32,
    )
}

/// Convert a point to latitude and longitude (degrees).
///
/// Inverse of [`lat_lon_to_point`] for any radius.
#[must_use]
pub fn point_to_lat_lon(point: Vec3) -> (f64, f64) {
    let p = point.as_dvec3();
    let lat = (p.y / p.length()).clamp(-1.0, 1.0).asin();
    let lon = (-p.z).atan2(p.x);
    (lat.to_degrees(), lon.to_degrees())
}

/// A land/water mask addressed in pixel coordinates.
pub trait LandMask {
    /// Width and height in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// Whether the pixel at `(x, y)` is land. Coordinates are in range.
    fn is_land(&self, x: u32, y: u32) -> bool;
}

/// A grayscale image thresholded by luminance.
///
/// By default dark pixels are land, which matches the usual
/// "black continents on white" dot-map source images.
pub struct LumaMask {
    image: GrayImage,
    threshold: u8,
    invert: bool,
}

impl LumaMask {
    /// Create a mask where pixels darker than `threshold` are land.
    #[must_use]
    pub fn new(image: GrayImage, threshold: u8) -> Self {
        Self {
            image,
            threshold,
            invert: false,
        }
    }

    /// Treat bright pixels as land instead.
    #[must_use]
    pub fn inverted(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }
}

impl LandMask for LumaMask {
    fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn is_land(&self, x: u32, y: u32) -> bool {
        let dark = self.image.get_pixel(x, y).0[0] < self.threshold;
        dark != self.invert
    }
}

/// Parameters for turning a mask into surface points.
#[derive(Debug, Clone)]
pub struct SamplingConfig {
    /// Angular spacing between samples, in degrees.
    pub step_deg: f64,
    /// Sphere radius for the produced points.
    pub radius: f32,
    /// Points further than this from the equator are not used for flights.
    pub polar_cutoff_deg: f64,
}

impl SamplingConfig {
    /// Check that sampling terminates with a sensible number of points.
    pub fn validate(&self) -> Result<()> {
        if !self.step_deg.is_finite() || self.step_deg < MIN_STEP_DEG {
            return Err(Error::InvalidConfig {
                field: "step_deg",
                detail: format!(
                    "must be a finite angle of at least {MIN_STEP_DEG} degrees, got {}",
                    self.step_deg
                ),
            });
        }
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(Error::InvalidConfig {
                field: "radius",
                detail: format!("must be positive, got {}", self.radius),
            });
        }
        Ok(())
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            step_deg: 1.0,
            radius: GLOBE_RADIUS,
            polar_cutoff_deg: 60.0,
        }
    }
}

/// Sampled globe surface points.
#[derive(Debug, Clone, Default)]
pub struct SurfacePoints {
    /// Every land point, used to build the continent mesh.
    pub all: Vec<Vec3>,
    /// Land points outside the polar regions, used as flight endpoints.
    pub flight_eligible: Vec<Vec3>,
}

impl SurfacePoints {
    /// Sample `mask` on a lat/lon grid.
    ///
    /// Fails if `config` does not pass [`SamplingConfig::validate`].
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn from_mask(mask: &impl LandMask, config: &SamplingConfig) -> Result<Self> {
        config.validate()?;
        let (width, height) = mask.dimensions();
        let mut points = Self::default();
        if width == 0 || height == 0 {
            return Ok(points);
        }

        let rows = (180.0 / config.step_deg).round().max(1.0) as u32;
        for row in 0..rows {
            let lat = 90.0 - (f64::from(row) + 0.5) * config.step_deg;

            // Fewer samples on shorter parallels.
            let columns = ((360.0 / config.step_deg) * lat.to_radians().cos())
                .round()
                .max(1.0) as u32;
            let lon_step = 360.0 / f64::from(columns);

            for column in 0..columns {
                let lon = -180.0 + (f64::from(column) + 0.5) * lon_step;

                let x = (((lon + 180.0) / 360.0) * f64::from(width)) as u32;
                let y = (((90.0 - lat) / 180.0) * f64::from(height)) as u32;
                if !mask.is_land(x.min(width - 1), y.min(height - 1)) {
                    continue;
                }

                let point = lat_lon_to_point(lat, lon, config.radius);
                points.all.push(point);
                if lat.abs() <= config.polar_cutoff_deg {
                    points.flight_eligible.push(point);
                }
            }
        }

        tracing::debug!(
            "Sampled {} land points ({} flight eligible) from {}x{} mask",
            points.all.len(),
            points.flight_eligible.len(),
            width,
            height
        );

        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use image::Luma;

    use super::*;

    /// Mask where only the listed latitude band is land.
    struct BandMask {
        min_lat: f64,
        max_lat: f64,
    }

    impl LandMask for BandMask {
        fn dimensions(&self) -> (u32, u32) {
            (360, 180)
        }

        fn is_land(&self, _x: u32, y: u32) -> bool {
            let lat = 90.0 - f64::from(y) - 0.5;
            lat >= self.min_lat && lat <= self.max_lat
        }
    }

    #[test]
    fn test_lat_lon_round_trip() {
        for (lat, lon) in [(0.0, 0.0), (45.0, 90.0), (-33.9, 151.2), (10.0, -120.0)] {
            let p = lat_lon_to_point(lat, lon, GLOBE_RADIUS);
            assert!((p.length() - GLOBE_RADIUS).abs() < 1e-3);
            let (lat2, lon2) = point_to_lat_lon(p);
            assert!((lat - lat2).abs() < 1e-3, "lat {lat} vs {lat2}");
            assert!((lon - lon2).abs() < 1e-3, "lon {lon} vs {lon2}");
        }
    }

    #[test]
    fn test_north_pole_is_up() {
        let p = lat_lon_to_point(90.0, 0.0, 1.0);
        assert!((p.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_luma_mask_threshold() {
        let mut image = GrayImage::from_pixel(4, 2, Luma([255]));
        image.put_pixel(1, 0, Luma([10]));

        let mask = LumaMask::new(image.clone(), 128);
        assert!(mask.is_land(1, 0));
        assert!(!mask.is_land(0, 0));

        let mask = LumaMask::new(image, 128).inverted(true);
        assert!(!mask.is_land(1, 0));
        assert!(mask.is_land(0, 0));
    }

    #[test]
    fn test_all_water_produces_no_points() {
        let mask = LumaMask::new(GrayImage::from_pixel(36, 18, Luma([255])), 128);
        let points = SurfacePoints::from_mask(&mask, &SamplingConfig::default()).unwrap();
        assert!(points.all.is_empty());
        assert!(points.flight_eligible.is_empty());
    }

    #[test]
    fn test_points_lie_on_sphere() {
        let mask = LumaMask::new(GrayImage::from_pixel(36, 18, Luma([0])), 128);
        let config = SamplingConfig {
            step_deg: 10.0,
            ..Default::default()
        };
        let points = SurfacePoints::from_mask(&mask, &config).unwrap();
        assert!(!points.all.is_empty());
        for p in &points.all {
            assert!((p.length() - config.radius).abs() < 1e-3);
        }
    }

    #[test]
    fn test_polar_points_are_not_flight_eligible() {
        let mask = BandMask {
            min_lat: 65.0,
            max_lat: 90.0,
        };
        let config = SamplingConfig {
            step_deg: 2.0,
            ..Default::default()
        };
        let points = SurfacePoints::from_mask(&mask, &config).unwrap();
        assert!(!points.all.is_empty());
        assert!(points.flight_eligible.is_empty());
    }

    #[test]
    fn test_equatorial_band_is_flight_eligible() {
        let mask = BandMask {
            min_lat: -10.0,
            max_lat: 10.0,
        };
        let points = SurfacePoints::from_mask(&mask, &SamplingConfig::default()).unwrap();
        assert_eq!(points.all.len(), points.flight_eligible.len());
        for p in &points.flight_eligible {
            let (lat, _) = point_to_lat_lon(*p);
            assert!(lat.abs() <= 10.5);
        }
    }

    #[test]
    fn test_degenerate_steps_are_rejected() {
        let mask = LumaMask::new(GrayImage::from_pixel(36, 18, Luma([0])), 128);
        for step_deg in [0.0, -1.0, 1e-7, f64::NAN, f64::INFINITY] {
            let config = SamplingConfig {
                step_deg,
                ..Default::default()
            };
            let result = SurfacePoints::from_mask(&mask, &config);
            assert!(
                matches!(
                    result,
                    Err(Error::InvalidConfig {
                        field: "step_deg",
                        ..
                    })
                ),
                "step {step_deg} accepted"
            );
        }

        let config = SamplingConfig {
            step_deg: MIN_STEP_DEG,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
