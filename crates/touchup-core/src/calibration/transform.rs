//! Projective calibration transform.
//!
//! Four (raw, screen) pairs determine a 3×3 homography `H` with `H[8] = 1`:
//!
//! ```text
//!  ┌ u·w ┐   ┌ h0 h1 h2 ┐ ┌ x ┐
//!  │ v·w │ = │ h3 h4 h5 │ │ y │
//!  └  w  ┘   └ h6 h7 1  ┘ └ 1 ┘
//! ```
//!
//! Each pair contributes two linear equations in the eight unknowns, so the
//! four pairs give an 8×8 system solved by LU decomposition.  A projective
//! mapping (rather than an affine one) absorbs the keystone distortion of
//! panels mounted slightly off-axis.
//!
//! The system only has a unique solution when no three raw points are
//! collinear, so that is checked before solving.

use nalgebra::{Matrix3, SMatrix, SVector, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::display::{NormalizedPoint, Point};

/// Determinants smaller than this are treated as zero.
const SINGULAR_EPSILON: f64 = 1e-10;

/// One accepted calibration sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPair {
    /// Where the panel reported the touch.
    pub raw: NormalizedPoint,
    /// Where the target was drawn, in absolute pixels.
    pub screen: Point,
}

impl CalibrationPair {
    pub fn new(raw: NormalizedPoint, screen: Point) -> Self {
        Self { raw, screen }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum CalibrationError {
    #[error("calibration points are degenerate: no projective transform exists")]
    Degenerate,

    #[error("calibration needs 4 points, only {captured} captured")]
    Incomplete { captured: usize },
}

/// Row-major homography from raw panel space to absolute pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationMapping {
    matrix: [f64; 9],
}

impl CalibrationMapping {
    /// Solves for the homography through four pairs.
    pub fn from_pairs(pairs: &[CalibrationPair; 4]) -> Result<Self, CalibrationError> {
        if has_collinear_triple(pairs) {
            return Err(CalibrationError::Degenerate);
        }

        let mut a = SMatrix::<f64, 8, 8>::zeros();
        let mut b = SVector::<f64, 8>::zeros();
        for (i, pair) in pairs.iter().enumerate() {
            let (x, y) = (pair.raw.x, pair.raw.y);
            let (u, v) = (pair.screen.x, pair.screen.y);
            a.row_mut(2 * i)
                .copy_from_slice(&[x, y, 1.0, 0.0, 0.0, 0.0, -x * u, -y * u]);
            a.row_mut(2 * i + 1)
                .copy_from_slice(&[0.0, 0.0, 0.0, x, y, 1.0, -x * v, -y * v]);
            b[2 * i] = u;
            b[2 * i + 1] = v;
        }

        let h = a.lu().solve(&b).ok_or(CalibrationError::Degenerate)?;
        if !h.iter().all(|v| v.is_finite()) {
            return Err(CalibrationError::Degenerate);
        }

        let homography = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0);
        if homography.determinant().abs() < SINGULAR_EPSILON {
            return Err(CalibrationError::Degenerate);
        }

        Ok(Self {
            matrix: [h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0],
        })
    }

    pub fn matrix(&self) -> &[f64; 9] {
        &self.matrix
    }

    fn homography(&self) -> Matrix3<f64> {
        Matrix3::from_row_slice(&self.matrix)
    }

    /// Maps a raw location to absolute pixels.
    ///
    /// Returns `None` for points on the transform's line at infinity.
    pub fn apply(&self, raw: NormalizedPoint) -> Option<Point> {
        let mapped = self.homography() * Vector3::new(raw.x, raw.y, 1.0);
        let w = mapped[2];
        if w.abs() < SINGULAR_EPSILON {
            return None;
        }
        Some(Point {
            x: mapped[0] / w,
            y: mapped[1] / w,
        })
    }
}

/// True when any three raw points lie on one line (coincident points included).
fn has_collinear_triple(pairs: &[CalibrationPair; 4]) -> bool {
    const TRIPLES: [[usize; 3]; 4] = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]];
    TRIPLES.iter().any(|&[i, j, k]| {
        let (p, q, r) = (pairs[i].raw, pairs[j].raw, pairs[k].raw);
        let area = Matrix3::new(p.x, p.y, 1.0, q.x, q.y, 1.0, r.x, r.y, 1.0).determinant();
        area.abs() < SINGULAR_EPSILON
    })
}
