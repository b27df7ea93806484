//! Resampling kernels.
//!
//! Kernels sample one band at a fractional source position `(u, v)` in
//! pixel-corner coordinates: pixel `(col, row)` covers `[col, col + 1) ×
//! [row, row + 1)` and its value sits at the centre. A position outside the
//! grid yields `None`.

use crate::raster::is_nodata;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Resampling kernel used when warping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resampling {
    /// Value of the pixel containing the point. Never invents values.
    #[default]
    Nearest,
    /// Distance-weighted mean of the 2×2 neighbouring centres.
    Bilinear,
    /// Keys cubic convolution (a = −0.5) over the 4×4 neighbourhood.
    Cubic,
}

impl fmt::Display for Resampling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Nearest => "nearest",
            Self::Bilinear => "bilinear",
            Self::Cubic => "cubic",
        })
    }
}

impl FromStr for Resampling {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nearest" => Ok(Self::Nearest),
            "bilinear" => Ok(Self::Bilinear),
            "cubic" => Ok(Self::Cubic),
            other => Err(format!(
                "unknown resampling '{other}' (expected nearest, bilinear or cubic)"
            )),
        }
    }
}

/// Read-only view of one band for sampling.
pub struct BandView<'a> {
    pub data: &'a [f64],
    pub width: usize,
    pub height: usize,
    pub nodata: Option<f64>,
}

impl BandView<'_> {
    /// Valid sample at integer `(col, row)`; `None` outside or at no-data.
    fn valid(&self, col: isize, row: isize) -> Option<f64> {
        if col < 0 || row < 0 || col as usize >= self.width || row as usize >= self.height {
            return None;
        }
        let v = self.data[row as usize * self.width + col as usize];
        match self.nodata {
            Some(nd) if is_nodata(v, nd) => None,
            _ => Some(v),
        }
    }

    fn contains(&self, u: f64, v: f64) -> bool {
        u >= 0.0 && v >= 0.0 && u < self.width as f64 && v < self.height as f64
    }

    pub fn sample(&self, kernel: Resampling, u: f64, v: f64) -> Option<f64> {
        if !self.contains(u, v) {
            return None;
        }
        match kernel {
            Resampling::Nearest => self.nearest(u, v),
            Resampling::Bilinear => self.bilinear(u, v),
            Resampling::Cubic => self.cubic(u, v),
        }
    }

    fn nearest(&self, u: f64, v: f64) -> Option<f64> {
        let (col, row) = (u.floor() as usize, v.floor() as usize);
        Some(self.data[row * self.width + col])
    }

    /// Missing neighbours (edge or no-data) drop out and the remaining
    /// weights are renormalised.
    fn bilinear(&self, u: f64, v: f64) -> Option<f64> {
        let (x, y) = (u - 0.5, v - 0.5);
        let (x0, y0) = (x.floor(), y.floor());
        let (fx, fy) = (x - x0, y - y0);
        let (x0, y0) = (x0 as isize, y0 as isize);

        let mut sum = 0.0;
        let mut weight = 0.0;
        for (dr, wy) in [(0, 1.0 - fy), (1, fy)] {
            for (dc, wx) in [(0, 1.0 - fx), (1, fx)] {
                let w = wx * wy;
                if w == 0.0 {
                    continue;
                }
                if let Some(value) = self.valid(x0 + dc, y0 + dr) {
                    sum += w * value;
                    weight += w;
                }
            }
        }
        (weight > 0.0).then(|| sum / weight)
    }

    /// Falls back to bilinear when any of the 16 neighbours is missing.
    fn cubic(&self, u: f64, v: f64) -> Option<f64> {
        let (x, y) = (u - 0.5, v - 0.5);
        let (x0, y0) = (x.floor(), y.floor());
        let (fx, fy) = (x - x0, y - y0);
        let (x0, y0) = (x0 as isize, y0 as isize);

        let mut sum = 0.0;
        for j in -1..=2isize {
            let wy = keys(fy - j as f64);
            for i in -1..=2isize {
                let Some(value) = self.valid(x0 + i, y0 + j) else {
                    return self.bilinear(u, v);
                };
                sum += keys(fx - i as f64) * wy * value;
            }
        }
        Some(sum)
    }
}

/// Keys cubic convolution kernel with a = −0.5.
fn keys(t: f64) -> f64 {
    const A: f64 = -0.5;
    let t = t.abs();
    if t <= 1.0 {
        ((A + 2.0) * t - (A + 3.0)) * t * t + 1.0
    } else if t < 2.0 {
        ((A * t - 5.0 * A) * t + 8.0 * A) * t - 4.0 * A
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(width: usize, height: usize) -> Vec<f64> {
        (0..height)
            .flat_map(|_| (0..width).map(|c| 2.0 * c as f64))
            .collect()
    }

    fn view(data: &[f64], width: usize, height: usize, nodata: Option<f64>) -> BandView<'_> {
        BandView {
            data,
            width,
            height,
            nodata,
        }
    }

    #[test]
    fn parse_and_display() {
        assert_eq!("Bilinear".parse::<Resampling>().unwrap(), Resampling::Bilinear);
        assert_eq!(Resampling::Cubic.to_string(), "cubic");
        assert!("lanczos".parse::<Resampling>().is_err());
        assert_eq!(Resampling::default(), Resampling::Nearest);
    }

    #[test]
    fn outside_grid_is_none() {
        let data = ramp(4, 4);
        let v = view(&data, 4, 4, None);
        for kernel in [Resampling::Nearest, Resampling::Bilinear, Resampling::Cubic] {
            assert_eq!(v.sample(kernel, -0.1, 1.0), None);
            assert_eq!(v.sample(kernel, 4.0, 1.0), None);
            assert_eq!(v.sample(kernel, 1.0, 4.0), None);
        }
    }

    #[test]
    fn nearest_picks_containing_pixel() {
        let data = ramp(4, 4);
        let v = view(&data, 4, 4, None);
        assert_eq!(v.sample(Resampling::Nearest, 2.99, 0.1), Some(4.0));
        assert_eq!(v.sample(Resampling::Nearest, 3.0, 3.9), Some(6.0));
    }

    #[test]
    fn bilinear_interpolates_between_centres() {
        let data = ramp(6, 6);
        let v = view(&data, 6, 6, None);
        // Halfway between centres of columns 2 and 3.
        let value = v.sample(Resampling::Bilinear, 3.0, 3.0).unwrap();
        assert!((value - 5.0).abs() < 1e-12);
        // Exactly on a centre.
        assert_eq!(v.sample(Resampling::Bilinear, 2.5, 2.5), Some(4.0));
    }

    #[test]
    fn bilinear_skips_nodata_neighbours() {
        let mut data = ramp(4, 4);
        // Column 2 of rows 1 and 2.
        data[6] = -1.0;
        data[10] = -1.0;
        let v = view(&data, 4, 4, Some(-1.0));
        // Neighbours at columns 1 and 2; column 2 is no-data, so column 1 wins.
        assert_eq!(v.sample(Resampling::Bilinear, 2.0, 2.0), Some(2.0));
    }

    #[test]
    fn bilinear_all_nodata_is_none() {
        let data = vec![-1.0; 4];
        let v = view(&data, 2, 2, Some(-1.0));
        assert_eq!(v.sample(Resampling::Bilinear, 1.0, 1.0), None);
    }

    #[test]
    fn cubic_reproduces_linear_ramp() {
        let data = ramp(8, 8);
        let v = view(&data, 8, 8, None);
        let value = v.sample(Resampling::Cubic, 4.25, 4.0).unwrap();
        // Centre-relative x = 3.75 → 2 × 3.75.
        assert!((value - 7.5).abs() < 1e-9, "{value}");
    }

    #[test]
    fn cubic_falls_back_near_edges() {
        let data = ramp(8, 8);
        let v = view(&data, 8, 8, None);
        let cubic = v.sample(Resampling::Cubic, 0.75, 4.0).unwrap();
        let bilinear = v.sample(Resampling::Bilinear, 0.75, 4.0).unwrap();
        assert_eq!(cubic, bilinear);
    }

    #[test]
    fn keys_kernel_partition_of_unity() {
        for f in [0.0, 0.25, 0.5, 0.9] {
            let total: f64 = (-1..=2).map(|i| keys(f - i as f64)).sum();
            assert!((total - 1.0).abs() < 1e-12);
        }
        assert_eq!(keys(0.0), 1.0);
        assert_eq!(keys(1.0), 0.0);
        assert_eq!(keys(2.0), 0.0);
    }
}
