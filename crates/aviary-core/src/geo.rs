//! Heading arithmetic and small geodesy helpers.
//!
//! Headings are degrees clockwise from true north. Positions are plain
//! latitude/longitude pairs; distances that matter to the tasks are small
//! enough that a flat local approximation is used for bearings.

/// Wrap a heading into `[0, 360)`.
#[must_use]
pub fn wrap_heading_deg(heading: f64) -> f64 {
    let wrapped = heading.rem_euclid(360.0);
    // rem_euclid can round tiny negative inputs up to exactly 360.0
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Reduce an angle into `[-180, 180)`.
#[must_use]
pub fn reduce_reflex_angle_deg(angle: f64) -> f64 {
    let reduced = (angle + 180.0).rem_euclid(360.0) - 180.0;
    if reduced >= 180.0 { -180.0 } else { reduced }
}

/// Signed minimal angle from `target` to `current`, in `[-180, 180)`.
///
/// Positive when `current` is clockwise of `target`.
#[must_use]
pub fn heading_error_deg(current: f64, target: f64) -> f64 {
    reduce_reflex_angle_deg(current - target)
}

/// Unsigned minimal angle between two headings, in `[0, 180]`.
#[must_use]
pub fn minimal_angle_deg(a: f64, b: f64) -> f64 {
    heading_error_deg(a, b).abs()
}

// ---------------------------------------------------------------------------
// Vector2
// ---------------------------------------------------------------------------

/// Planar vector with `x` pointing east and `y` pointing north.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

impl Vector2 {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Bearing of the vector in `[0, 360)` degrees.
    #[must_use]
    pub fn heading_deg(&self) -> f64 {
        wrap_heading_deg(self.x.atan2(self.y).to_degrees())
    }

    #[must_use]
    pub fn norm(&self) -> f64 {
        self.x.hypot(self.y)
    }
}

impl std::ops::Sub for Vector2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

// ---------------------------------------------------------------------------
// GeodeticPosition
// ---------------------------------------------------------------------------

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeodeticPosition {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
}

impl GeodeticPosition {
    #[must_use]
    pub const fn new(latitude_deg: f64, longitude_deg: f64) -> Self {
        Self {
            latitude_deg,
            longitude_deg,
        }
    }

    /// Offset to `other` as an east/north vector in degrees.
    #[must_use]
    pub fn offset_to(&self, other: &Self) -> Vector2 {
        Vector2::new(
            other.longitude_deg - self.longitude_deg,
            other.latitude_deg - self.latitude_deg,
        )
    }

    /// Bearing from `self` to `other` in `[0, 360)` degrees.
    #[must_use]
    pub fn heading_deg_to(&self, other: &Self) -> f64 {
        self.offset_to(other).heading_deg()
    }

    /// True when both coordinates differ by less than `tolerance_deg`.
    ///
    /// Non-finite coordinates are never within tolerance.
    #[must_use]
    pub fn within(&self, other: &Self, tolerance_deg: f64) -> bool {
        (self.latitude_deg - other.latitude_deg).abs() < tolerance_deg
            && (self.longitude_deg - other.longitude_deg).abs() < tolerance_deg
    }
}
