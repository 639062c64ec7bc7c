//! Low-resolution classification against a target display resolution.
//!
//! An image is low resolution when **either** dimension falls below the
//! target scaled down by the tolerance. A full-height but narrow image is
//! still flagged.

use crate::probe::Dimensions;
use serde::Serialize;
use thiserror::Error;

/// Default target width (FHD).
pub const DEFAULT_TARGET_WIDTH: u32 = 1920;

/// Default target height (FHD).
pub const DEFAULT_TARGET_HEIGHT: u32 = 1080;

/// Fraction below the target that is still accepted.
pub const DEFAULT_TOLERANCE: f64 = 0.05;

#[derive(Debug, Error, PartialEq)]
pub enum InvalidTarget {
    #[error("target width and height must be positive, got {width}x{height}")]
    ZeroDimension { width: u32, height: u32 },
    #[error("tolerance must be within [0, 1), got {0}")]
    Tolerance(f64),
}

/// Target resolution plus the accepted shortfall.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolutionTarget {
    pub width: u32,
    pub height: u32,
    pub tolerance: f64,
}

impl Default for ResolutionTarget {
    fn default() -> Self {
        Self {
            width: DEFAULT_TARGET_WIDTH,
            height: DEFAULT_TARGET_HEIGHT,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl ResolutionTarget {
    pub fn new(width: u32, height: u32, tolerance: f64) -> Result<Self, InvalidTarget> {
        if width == 0 || height == 0 {
            return Err(InvalidTarget::ZeroDimension { width, height });
        }
        if !(0.0..1.0).contains(&tolerance) {
            return Err(InvalidTarget::Tolerance(tolerance));
        }
        Ok(Self {
            width,
            height,
            tolerance,
        })
    }

    /// Effective minimum `(width, height)` after applying the tolerance.
    pub fn thresholds(&self) -> (f64, f64) {
        let factor = 1.0 - self.tolerance;
        (
            f64::from(self.width) * factor,
            f64::from(self.height) * factor,
        )
    }

    /// Returns true when either dimension is strictly below its threshold.
    pub fn is_low_res(&self, dimensions: Dimensions) -> bool {
        is_low_res(dimensions.width, dimensions.height, self)
    }
}

/// Free-function form of [`ResolutionTarget::is_low_res`].
pub fn is_low_res(width: u32, height: u32, target: &ResolutionTarget) -> bool {
    let (threshold_w, threshold_h) = target.thresholds();
    f64::from(width) < threshold_w || f64::from(height) < threshold_h
}
