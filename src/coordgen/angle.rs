//! Angle arithmetic in radians, counter-clockwise from +x.

use super::*;
use std::f32::consts::{PI, TAU};

pub fn angle(from: PointF, to: PointF) -> f32 {
    (to - from).angle()
}
/// Wrap an angle into `(-π, π]`.
pub fn normalize(angle: f32) -> f32 {
    let a = (angle + PI).rem_euclid(TAU) - PI;
    if a <= -PI {
        a + TAU
    } else {
        a
    }
}
/// Signed turn from `from` to `to`, in `(-π, π]`.
pub fn difference(from: f32, to: f32) -> f32 {
    normalize(to - from)
}
/// Bisector of the widest free sector between the given directions.
pub fn largest_gap_bisector(angles: &[f32]) -> f32 {
    match angles {
        [] => 0.0,
        [only] => normalize(only + PI),
        _ => {
            let mut sorted: Vec<f32> = angles.iter().map(|a| a.rem_euclid(TAU)).collect();
            sorted.sort_by(f32::total_cmp);
            let mut best = (sorted[sorted.len() - 1], sorted[0] + TAU - sorted[sorted.len() - 1]);
            for w in sorted.windows(2) {
                let gap = w[1] - w[0];
                if gap > best.1 + crate::EPSILON {
                    best = (w[0], gap);
                }
            }
            normalize(best.0 + best.1 * 0.5)
        }
    }
}
