//! Idealised local geometries for the fragment kinds.

use super::*;
use std::f32::consts::{FRAC_PI_2, FRAC_PI_3, PI, TAU};

/// Vertices of a regular polygon with unit sides, counter-clockwise, centred on the origin.
pub fn regular_polygon(n: usize) -> Vec<PointF> {
    let radius = 0.5 / (PI / n as f32).sin();
    let start = -FRAC_PI_2 - PI / n as f32;
    (0..n)
        .map(|i| PointF::from_angle(start + TAU * i as f32 / n as f32) * radius)
        .collect()
}

/// Zig-zag with 120° bond angles along +x.
pub fn zigzag(n: usize) -> Vec<PointF> {
    let step = FRAC_PI_3.sin();
    (0..n)
        .map(|i| PointF(i as f32 * step, if i % 2 == 0 { 0.0 } else { 0.5 }))
        .collect()
}

/// Centre at the origin with `n` neighbours evenly spread around it.
pub fn star(n: usize) -> Vec<PointF> {
    std::iter::once(PointF::ORIGIN)
        .chain((0..n).map(|i| PointF::from_angle(TAU * i as f32 / n as f32)))
        .collect()
}

/// Centre with its non-terminal neighbours along the x axis and the terminal ones filling the
/// remaining arms of a cross. Returns positions for `[center, non_terminal.., terminal..]`.
pub fn quaternary_motif(non_terminal: usize, terminal: usize) -> Vec<PointF> {
    const ARMS: [f32; 4] = [PI, 0.0, FRAC_PI_2, -FRAC_PI_2];
    std::iter::once(PointF::ORIGIN)
        .chain(ARMS.iter().take(non_terminal + terminal).map(|&a| PointF::from_angle(a)))
        .collect()
}

/// A straight run of `n` atoms along +x, plus the positions of up to three substituents splayed
/// at 120° around each end. `start_substituents` hang off atom 0, `end_substituents` off atom
/// `n - 1`.
pub fn linear_run(n: usize, start_substituents: usize, end_substituents: usize) -> (Vec<PointF>, Vec<PointF>, Vec<PointF>) {
    let axis: Vec<PointF> = (0..n).map(|i| PointF(i as f32, 0.0)).collect();
    let splay = |count: usize, origin: PointF, forward: f32| -> Vec<PointF> {
        let angles: &[f32] = match count {
            0 => &[],
            1 => &[FRAC_PI_3],
            2 => &[FRAC_PI_3, -FRAC_PI_3],
            _ => &[FRAC_PI_3, -FRAC_PI_3, 0.0],
        };
        angles
            .iter()
            .map(|&a| origin + PointF::from_angle(forward + a))
            .collect()
    };
    let start = splay(start_substituents, axis[0], PI);
    let end = splay(end_substituents, axis[n.saturating_sub(1)], 0.0);
    (axis, start, end)
}
