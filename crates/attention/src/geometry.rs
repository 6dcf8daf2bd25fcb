//! Eye openness from bounding-box geometry
//!
//! The detector only reports an axis-aligned box per eye, so six landmark
//! points are synthesized from the box and fed to the usual eye aspect ratio
//! formula. This is an approximation: for a box the score reduces to
//! `height / width`, it does not measure eyelid position.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Geometry errors
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum GeometryError {
    /// Left and right eye corners coincide
    #[error("Horizontal eye distance is zero")]
    DivideByZero,
}

/// Axis-aligned box in image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Candidate eye region as reported by the detector
pub type EyeRegion = BoundingBox;

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Scale position and size by the same factor
    pub fn scaled(&self, k: f32) -> Self {
        Self {
            x: self.x * k,
            y: self.y * k,
            width: self.width * k,
            height: self.height * k,
        }
    }
}

/// 2D point
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance
    pub fn distance(&self, other: &Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Six synthetic landmarks, always in the order
/// left corner, right corner, upper-left, upper-right, lower-left, lower-right
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeLandmarks {
    pub left: Point,
    pub right: Point,
    pub upper_left: Point,
    pub upper_right: Point,
    pub lower_left: Point,
    pub lower_right: Point,
}

impl EyeLandmarks {
    /// Synthesize landmarks from an eye box.
    ///
    /// Corners sit at mid-height on the left and right edges; the upper and
    /// lower pairs sit on the top and bottom edges at 25% and 75% of the width.
    pub fn from_region(region: &EyeRegion) -> Self {
        let BoundingBox { x, y, width: w, height: h } = *region;
        let mid_y = y + h * 0.5;
        let quarter_x = x + w * 0.25;
        let three_quarter_x = x + w * 0.75;

        Self {
            left: Point::new(x, mid_y),
            right: Point::new(x + w, mid_y),
            upper_left: Point::new(quarter_x, y),
            upper_right: Point::new(three_quarter_x, y),
            lower_left: Point::new(quarter_x, y + h),
            lower_right: Point::new(three_quarter_x, y + h),
        }
    }

    /// Points in canonical order
    pub fn points(&self) -> [Point; 6] {
        [
            self.left,
            self.right,
            self.upper_left,
            self.upper_right,
            self.lower_left,
            self.lower_right,
        ]
    }

    /// Eye aspect ratio: (|UL-LL| + |UR-LR|) / (2 * |L-R|)
    pub fn aspect_ratio(&self) -> Result<OpennessScore, GeometryError> {
        let vertical_1 = self.upper_left.distance(&self.lower_left);
        let vertical_2 = self.upper_right.distance(&self.lower_right);
        let horizontal = self.left.distance(&self.right);

        // NaN fails this comparison too
        if !(horizontal > 0.0) {
            return Err(GeometryError::DivideByZero);
        }

        Ok(OpennessScore((vertical_1 + vertical_2) / (2.0 * horizontal)))
    }
}

/// Non-negative eye openness (eye aspect ratio)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct OpennessScore(f32);

impl OpennessScore {
    pub fn value(self) -> f32 {
        self.0
    }
}

/// Compute the openness score of one eye region
pub fn openness(region: &EyeRegion) -> Result<OpennessScore, GeometryError> {
    EyeLandmarks::from_region(region).aspect_ratio()
}
