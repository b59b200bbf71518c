//! Tone curves: remap a sampled intensity through a polynomial that passes exactly through a set
//! of user-chosen control points.
//!
//! The interpolant is the global Lagrange polynomial through every control point, evaluated in
//! barycentric form. Nothing keeps it inside `[0, 1]` or monotonic between the points; with many
//! or unevenly spaced points it will overshoot, and callers are expected to clamp.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "WireToneCurve", into = "WireToneCurve")]
pub struct ToneCurve {
    /// Control points sorted by `x`, always including `x = 0` and `x = 1`.
    points: Vec<(f64, f64)>,
    /// Barycentric weight of each point; derived from `points`, never persisted.
    weights: Vec<f64>,
}

/// Persisted form of a [`ToneCurve`]: parallel coordinate lists.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WireToneCurve {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CurveError {
    Empty,
    LengthMismatch { xs: usize, ys: usize },
    OutOfRange { x: f64, y: f64 },
    DuplicateX { x: f64 },
    EndpointRemoval { x: f64 },
}

impl fmt::Display for CurveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CurveError::Empty => write!(f, "tone curve needs at least one control point"),
            CurveError::LengthMismatch { xs, ys } => {
                write!(f, "tone curve has {} xs but {} ys", xs, ys)
            }
            CurveError::OutOfRange { x, y } => {
                write!(f, "control point ({}, {}) is outside [0, 1]²", x, y)
            }
            CurveError::DuplicateX { x } => write!(f, "two control points share x = {}", x),
            CurveError::EndpointRemoval { x } => {
                write!(f, "cannot remove the endpoint at x = {}", x)
            }
        }
    }
}

impl std::error::Error for CurveError {}

impl ToneCurve {
    /// Builds a curve through `points`. Points may come in any order. Missing endpoints at
    /// `x = 0` and `x = 1` are added with the `y` of the nearest given point.
    pub fn new(points: impl IntoIterator<Item = (f64, f64)>) -> Result<Self, CurveError> {
        let mut points: Vec<(f64, f64)> = points.into_iter().collect();
        for &(x, y) in &points {
            // NaN fails both range checks.
            if !(0.0..=1.0).contains(&x) || !(0.0..=1.0).contains(&y) {
                return Err(CurveError::OutOfRange { x, y });
            }
        }
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        if let Some(w) = points.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(CurveError::DuplicateX { x: w[0].0 });
        }

        let (first, last) = match (points.first(), points.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => return Err(CurveError::Empty),
        };
        if first.0 != 0.0 {
            points.insert(0, (0.0, first.1));
        }
        if last.0 != 1.0 {
            points.push((1.0, last.1));
        }

        let weights = barycentric_weights(&points);
        Ok(ToneCurve { points, weights })
    }

    /// The straight line `f(x) = x`.
    pub fn identity() -> Self {
        ToneCurve {
            points: vec![(0.0, 0.0), (1.0, 1.0)],
            weights: vec![-1.0, 1.0],
        }
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Returns a copy of this curve with a control point at `x` set to `y`, moving the existing
    /// point at `x` if there is one.
    pub fn with_point(&self, x: f64, y: f64) -> Result<Self, CurveError> {
        let points = self
            .points
            .iter()
            .copied()
            .filter(|&(px, _)| px != x)
            .chain(std::iter::once((x, y)));
        ToneCurve::new(points)
    }

    /// Returns a copy of this curve without the control point at `x`. The endpoints cannot be
    /// removed; an `x` with no control point leaves the curve unchanged.
    pub fn without_point(&self, x: f64) -> Result<Self, CurveError> {
        if x == 0.0 || x == 1.0 {
            return Err(CurveError::EndpointRemoval { x });
        }
        ToneCurve::new(self.points.iter().copied().filter(|&(px, _)| px != x))
    }

    /// Evaluates the interpolating polynomial at `x`.
    pub fn eval(&self, x: f64) -> f64 {
        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for (&(xj, yj), &wj) in self.points.iter().zip(&self.weights) {
            if x == xj {
                return yj;
            }
            let t = wj / (x - xj);
            numerator += t * yj;
            denominator += t;
        }
        numerator / denominator
    }
}

impl Default for ToneCurve {
    fn default() -> Self {
        ToneCurve::identity()
    }
}

fn barycentric_weights(points: &[(f64, f64)]) -> Vec<f64> {
    points
        .iter()
        .enumerate()
        .map(|(j, &(xj, _))| {
            let product: f64 = points
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != j)
                .map(|(_, &(xi, _))| xj - xi)
                .product();
            product.recip()
        })
        .collect()
}

impl TryFrom<WireToneCurve> for ToneCurve {
    type Error = CurveError;
    fn try_from(wire: WireToneCurve) -> Result<Self, Self::Error> {
        if wire.xs.len() != wire.ys.len() {
            return Err(CurveError::LengthMismatch {
                xs: wire.xs.len(),
                ys: wire.ys.len(),
            });
        }
        ToneCurve::new(wire.xs.into_iter().zip(wire.ys))
    }
}

impl From<ToneCurve> for WireToneCurve {
    fn from(curve: ToneCurve) -> Self {
        let (xs, ys) = curve.points.into_iter().unzip();
        WireToneCurve { xs, ys }
    }
}
