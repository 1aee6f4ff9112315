//! Placing two disjoint fragments next to each other through anchor points.

use super::*;
use ahash::AHashMap;
use std::f32::consts::PI;

const BIN_HEIGHT: f32 = COLLISION_LIMIT;

/// Two fragments to be joined, with one anchor point on each side.
///
/// Anchors are running means of the points added to them, so several bonds or charged atoms
/// can pull on the same pair.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentAssociation {
    fragments: [usize; 2],
    anchor: [PointF; 2],
    count: [usize; 2],
}
impl FragmentAssociation {
    pub fn new(first: usize, second: usize) -> Self {
        Self {
            fragments: [first, second],
            anchor: [PointF::ORIGIN; 2],
            count: [0; 2],
        }
    }
    /// Association anchored at the centroids of both fragments.
    pub fn with_centroids(fragments: &[Fragment], first: usize, second: usize) -> Self {
        let mut assoc = Self::new(first, second);
        assoc.add_point(0, fragments[first].centroid());
        assoc.add_point(1, fragments[second].centroid());
        assoc
    }
    /// Add a point to the anchor of `side` (0 or 1).
    pub fn add_point(&mut self, side: usize, p: PointF) {
        let n = self.count[side] as f32;
        self.anchor[side] = (self.anchor[side] * n + p) / (n + 1.0);
        self.count[side] += 1;
    }
    pub fn fragments(&self) -> [usize; 2] {
        self.fragments
    }
    pub fn anchors(&self) -> [PointF; 2] {
        self.anchor
    }
    /// Swap the roles of the two fragments.
    pub fn reversed(&self) -> Self {
        Self {
            fragments: [self.fragments[1], self.fragments[0]],
            anchor: [self.anchor[1], self.anchor[0]],
            count: [self.count[1], self.count[0]],
        }
    }

    /// Move `second` so that its anchor sits `min_distance` or more from the anchor of `first`
    /// along the preferred attachment directions, with no atom pair closer than `min_distance`.
    /// With `keep_first`, `first` ends exactly where it started.
    pub fn arrange(&self, first: &mut Fragment, second: &mut Fragment, min_distance: f32, keep_first: bool) {
        let [a0, a1] = self.anchor;
        let saved = keep_first.then(|| first.coordinates().to_vec());
        let angle0 = first.preferred_attachment_angle(a0, second.len());
        let angle1 = second.preferred_attachment_angle(a1, first.len());
        first.rotate(a0, -angle0);
        second.rotate(a1, PI - angle1);
        second.translate(a0 - a1);

        let bin = |p: PointF| ((p.1 - a0.1) / BIN_HEIGHT).floor() as i64;
        let mut right_edge: AHashMap<i64, f32> = AHashMap::new();
        for &p in first.coordinates() {
            let e = right_edge.entry(bin(p)).or_insert(f32::NEG_INFINITY);
            *e = e.max(p.0);
        }
        let mut left_edge: AHashMap<i64, f32> = AHashMap::new();
        for &p in second.coordinates() {
            let e = left_edge.entry(bin(p)).or_insert(f32::INFINITY);
            *e = e.min(p.0);
        }
        let reach = (min_distance / BIN_HEIGHT).ceil() as i64;
        let mut shift = min_distance;
        for (&row, &max_x) in &right_edge {
            for nearby in row - reach..=row + reach {
                if let Some(&min_x) = left_edge.get(&nearby) {
                    shift = shift.max(max_x - min_x + min_distance);
                }
            }
        }
        second.translate(PointF(shift, 0.0));

        if let Some(saved) = saved {
            second.rotate(a0, angle0);
            for (i, p) in saved.into_iter().enumerate() {
                first.set_coordinate(i, p);
            }
        }
    }
}
