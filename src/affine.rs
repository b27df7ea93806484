//! Affine pixel-to-map transform.
//!
//! Coefficients follow the `(a, b, c, d, e, f)` convention:
//!
//! ```text
//! x = a * col + b * row + c
//! y = d * col + e * row + f
//! ```
//!
//! `a`/`e` are the pixel scales (`e` is negative for north-up images), `b`/`d`
//! the shear terms and `(c, f)` the map coordinate of the top-left corner of
//! pixel `(0, 0)`. Pixel coordinates address pixel *corners*; the centre of
//! pixel `(col, row)` is `(col + 0.5, row + 0.5)`.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl GeoTransform {
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0)
    }

    /// North-up transform from the top-left corner and positive pixel sizes.
    pub fn from_origin(left: f64, top: f64, xres: f64, yres: f64) -> Self {
        Self::new(xres, 0.0, left, 0.0, -yres, top)
    }

    /// True when there is no rotation/shear term.
    pub fn is_rectilinear(&self) -> bool {
        self.b == 0.0 && self.d == 0.0
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.e - self.b * self.d
    }

    /// Map coordinate of a (fractional) pixel position.
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.a * col + self.b * row + self.c,
            self.d * col + self.e * row + self.f,
        )
    }

    /// Inverse transform (map → pixel). `None` when the transform is not
    /// invertible (zero scale or collinear axes).
    pub fn inverse(&self) -> Option<Self> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let ia = self.e / det;
        let ib = -self.b / det;
        let id = -self.d / det;
        let ie = self.a / det;
        Some(Self::new(
            ia,
            ib,
            -(ia * self.c + ib * self.f),
            id,
            ie,
            -(id * self.c + ie * self.f),
        ))
    }

    /// Same scale and shear, origin moved to pixel `(col, row)` of this grid.
    ///
    /// Used by cropping: the window's top-left pixel becomes the new origin.
    pub fn shifted(&self, col: f64, row: f64) -> Self {
        let (c, f) = self.apply(col, row);
        Self { c, f, ..*self }
    }

    pub fn to_array(self) -> [f64; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Display for GeoTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "| {:.2}, {:.2}, {:.2}|\n| {:.2}, {:.2}, {:.2}|\n| 0.00, 0.00, 1.00|",
            self.a, self.b, self.c, self.d, self.e, self.f
        )
    }
}
