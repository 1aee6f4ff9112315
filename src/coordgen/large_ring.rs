//! Macrocycle shapes built from 60° turns.
//!
//! A ring of `n` atoms is described by one bit per ring bond: set when the bond is drawn Z
//! (both ring neighbours on the same side). Walking the ring with ±60° turns, a bond is Z when
//! the turns at its two ends have the same sign. Each catalogued pattern closes (or nearly
//! closes) after adding a constant correction to every turn.

use super::*;
use tracing::debug;

/// Ring sizes laid out from the pattern catalogue.
pub const CATALOGUE_RANGE: std::ops::RangeInclusive<usize> = 9..=25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondConstraint {
    Free,
    E,
    Z,
}

struct RingPattern {
    size: usize,
    bits: u32,
    /// Degrees added to every turn so that the turns sum to one full circle.
    correction: f32,
    /// The reversed bit sequence is a rotation of the original.
    symmetric: bool,
}

const fn pattern(size: usize, bits: u32, correction: f32, symmetric: bool) -> RingPattern {
    RingPattern {
        size,
        bits,
        correction,
        symmetric,
    }
}

#[rustfmt::skip]
const CATALOGUE: &[RingPattern] = &[
    pattern(9, 511, -20.0, true),
    pattern(10, 231, 0.0, true),
    pattern(11, 463, -5.4545, true),
    pattern(12, 819, 0.0, true),
    pattern(13, 1612, 4.6154, true),
    pattern(14, 9804, 0.0, true), pattern(14, 2519, 0.0, true), pattern(14, 903, 0.0, true),
    pattern(15, 4681, 4.0, true), pattern(15, 11411, 4.0, true), pattern(15, 7324, -4.0, true), pattern(15, 11879, -4.0, true),
    pattern(16, 3219, 0.0, true), pattern(16, 3287, 0.0, false),
    pattern(17, 25027, -3.5294, true), pattern(17, 45863, -3.5294, false), pattern(17, 99540, 3.5294, false),
    pattern(17, 74116, 3.5294, true), pattern(17, 45251, 3.5294, true), pattern(17, 35975, 3.5294, false),
    pattern(17, 75340, -3.5294, true),
    pattern(18, 54891, 0.0, true), pattern(18, 178923, 0.0, true), pattern(18, 37449, 0.0, true), pattern(18, 37483, 0.0, true),
    pattern(18, 91351, 0.0, true), pattern(18, 37815, 0.0, true), pattern(18, 137313, 0.0, true), pattern(18, 85671, 0.0, false),
    pattern(19, 440437, -3.1579, true), pattern(19, 183347, -3.1579, true), pattern(19, 353475, -3.1579, false),
    pattern(19, 301156, -3.1579, true), pattern(19, 397933, 3.1579, false), pattern(19, 68961, 3.1579, true),
    pattern(19, 274480, 3.1579, true), pattern(19, 109621, 3.1579, false),
    pattern(20, 50103, 0.0, true), pattern(20, 137655, 0.0, false), pattern(20, 694379, 0.0, false), pattern(20, 137323, 0.0, false),
    pattern(20, 55063, 0.0, false), pattern(20, 137289, 0.0, true), pattern(20, 176979, 0.0, true), pattern(20, 694345, 0.0, false),
    pattern(21, 1198372, -2.8571, true), pattern(21, 441067, -2.8571, true), pattern(21, 1268140, -2.8571, true),
    pattern(21, 301769, -2.8571, true), pattern(21, 317273, -2.8571, true), pattern(21, 1210084, -2.8571, true),
    pattern(21, 889047, 2.8571, false), pattern(21, 68791, 2.8571, false),
    pattern(22, 3745006, 0.0, true), pattern(22, 219243, 0.0, true), pattern(22, 1535575, 0.0, false), pattern(22, 899179, 0.0, false),
    pattern(22, 554731, 0.0, false), pattern(22, 149611, 0.0, true), pattern(22, 158315, 0.0, false), pattern(22, 2841963, 0.0, true),
    pattern(23, 439724, 2.6087, true), pattern(23, 1263280, 2.6087, false), pattern(23, 2302028, 2.6087, true),
    pattern(23, 316772, 2.6087, true), pattern(23, 435372, 2.6087, true), pattern(23, 4231861, 2.6087, false),
    pattern(23, 435419, 2.6087, false), pattern(23, 1618796, 2.6087, false),
    pattern(24, 7254231, 0.0, true), pattern(24, 6140483, 0.0, false), pattern(24, 2197367, 0.0, false), pattern(24, 11954795, 0.0, false),
    pattern(24, 3590409, 0.0, true), pattern(24, 6140695, 0.0, false), pattern(24, 2450999, 0.0, false), pattern(24, 3591531, 0.0, true),
    pattern(25, 15616295, -2.4, true), pattern(25, 28142426, 2.4, true), pattern(25, 17318416, 2.4, true), pattern(25, 22713013, 2.4, true),
    pattern(25, 11870507, 2.4, true), pattern(25, 22172821, 2.4, true), pattern(25, 26586466, 2.4, false), pattern(25, 21271977, 2.4, false),
];

/// Per-bond constraints of a ring, in ring bond order.
///
/// Stereo double bonds translate their cis/trans annotation into a ring-relative E/Z; bonds
/// shared with a smaller ring must be Z.
pub fn ring_constraints(mol: &Molecule, ring: &Ring) -> Vec<BondConstraint> {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let bond = ring.bonds[i];
            let b = mol.bond(bond);
            if b.is_stereo() {
                let Some((r_start, r_end)) = mol.stereo_references(bond) else {
                    return BondConstraint::Free;
                };
                let (prev, next) = (ring.atoms[(i + n - 1) % n], ring.atoms[(i + 2) % n]);
                let (ring_start, ring_end) = if b.start == ring.atoms[i] { (prev, next) } else { (next, prev) };
                let invert = (r_start != ring_start) ^ (r_end != ring_end);
                let cis = (b.stereo.stereo == Stereo::Cis) ^ invert;
                return if cis { BondConstraint::Z } else { BondConstraint::E };
            }
            let in_smaller = mol
                .rings()
                .bond_rings(bond)
                .iter()
                .any(|&r| mol.rings().ring(r).len() < n);
            if in_smaller {
                BondConstraint::Z
            } else {
                BondConstraint::Free
            }
        })
        .collect()
}

fn compatible(bits: &[bool], constraints: &[BondConstraint]) -> bool {
    bits.iter().zip(constraints).all(|(&z, c)| match c {
        BondConstraint::Free => true,
        BondConstraint::Z => z,
        BondConstraint::E => !z,
    })
}

/// First catalogued bit sequence (any rotation, or its reversal) that satisfies the constraints.
fn lookup(constraints: &[BondConstraint]) -> Option<(Vec<bool>, f32)> {
    let n = constraints.len();
    for entry in CATALOGUE.iter().filter(|e| e.size == n) {
        let forward: Vec<bool> = (0..n).map(|i| entry.bits >> i & 1 == 1).collect();
        let mut orders = vec![forward.clone()];
        if !entry.symmetric {
            orders.push(forward.iter().rev().copied().collect());
        }
        for bits in orders {
            for rot in 0..n {
                let rotated: Vec<bool> = (0..n).map(|i| bits[(i + rot) % n]).collect();
                if compatible(&rotated, constraints) {
                    return Some((rotated, entry.correction));
                }
            }
        }
    }
    None
}

/// Walk the ring with ±60° (plus `correction` degrees) turns derived from the bond bits,
/// clockwise, spreading the closure gap over the vertices and centring on the origin.
fn walk(bits: &[bool], correction: f32) -> Vec<PointF> {
    let n = bits.len();
    let mut signs = vec![1.0f32; n];
    for i in 0..n - 1 {
        signs[i + 1] = if bits[i] { signs[i] } else { -signs[i] };
    }
    if signs.iter().filter(|&&s| s < 0.0).count() * 2 > n {
        for s in &mut signs {
            *s = -*s;
        }
    }
    let mut points = Vec::with_capacity(n + 1);
    let mut p = PointF::ORIGIN;
    let mut heading = 0.0f32;
    points.push(p);
    for i in 0..n {
        p += PointF::from_angle(heading);
        points.push(p);
        heading -= (signs[(i + 1) % n] * 60.0 + correction).to_radians();
    }
    let gap = points[n] - points[0];
    points.truncate(n);
    for (i, q) in points.iter_mut().enumerate() {
        *q -= gap * (i as f32 / n as f32);
    }
    let center = math::centroid(points.iter().copied());
    points.iter().map(|&q| q - center).collect()
}

/// Regular polygon with concave vertices pushed in wherever an E bond demands a sign change.
/// Returns the coordinates and the number of constraints that could not be honoured.
fn fallback(constraints: &[BondConstraint]) -> (Vec<PointF>, usize) {
    let n = constraints.len();
    let mut points = builder::regular_polygon(n);
    let mut signs = vec![true; n];
    for i in 0..n - 1 {
        signs[i + 1] = if constraints[i] == BondConstraint::E { !signs[i] } else { signs[i] };
    }
    let mut reflected = vec![false; n];
    for i in 0..n {
        if signs[i] {
            continue;
        }
        let (prev, next) = ((i + n - 1) % n, (i + 1) % n);
        if reflected[prev] || reflected[next] {
            continue;
        }
        points[i] = math::mirror_point(points[i], points[prev], points[next]);
        reflected[i] = true;
    }
    let bits: Vec<bool> = (0..n)
        .map(|i| {
            let turn = |v: usize| {
                math::side_of_line(points[(v + 1) % n], points[(v + n - 1) % n], points[v]) > 0.0
            };
            turn(i) == turn((i + 1) % n)
        })
        .collect();
    let missed = bits
        .iter()
        .zip(constraints)
        .filter(|(&z, c)| matches!((c, z), (BondConstraint::Z, false) | (BondConstraint::E, true)))
        .count();
    (points, missed)
}

/// Coordinates for a ring of the given constraints, in ring atom order.
pub fn layout(constraints: &[BondConstraint]) -> Vec<PointF> {
    let n = constraints.len();
    if CATALOGUE_RANGE.contains(&n) {
        if let Some((bits, correction)) = lookup(constraints) {
            return walk(&bits, correction);
        }
    }
    let (points, missed) = fallback(constraints);
    debug!(size = n, missed, "large ring laid out as distorted polygon");
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn z_bits(points: &[PointF]) -> Vec<bool> {
        let n = points.len();
        let turn = |v: usize| math::side_of_line(points[(v + 1) % n], points[(v + n - 1) % n], points[v]) > 0.0;
        (0..n).map(|i| turn(i) == turn((i + 1) % n)).collect()
    }

    #[test]
    fn every_pattern_closes_with_its_bits() {
        for entry in CATALOGUE {
            let bits: Vec<bool> = (0..entry.size).map(|i| entry.bits >> i & 1 == 1).collect();
            let points = walk(&bits, entry.correction);
            for i in 0..entry.size {
                let d = points[i].distance(points[(i + 1) % entry.size]);
                assert!((d - 1.0).abs() < 0.15, "size {} bits {} bond {i}: {d}", entry.size, entry.bits);
            }
            assert_eq!(z_bits(&points), bits, "size {} bits {}", entry.size, entry.bits);
        }
    }

    #[test]
    fn catalogue_covers_every_size() {
        for n in CATALOGUE_RANGE {
            assert!(CATALOGUE.iter().any(|e| e.size == n), "no pattern for {n}");
        }
    }

    #[test]
    fn constraints_pick_matching_rotation() {
        let mut constraints = vec![BondConstraint::Free; 12];
        constraints[0] = BondConstraint::E;
        constraints[1] = BondConstraint::E;
        let (bits, _) = lookup(&constraints).unwrap();
        assert!(!bits[0] && !bits[1]);
        let points = layout(&constraints);
        let z = z_bits(&points);
        assert!(!z[0] && !z[1]);
    }

    #[test]
    fn unmatched_constraints_fall_back() {
        let constraints = vec![BondConstraint::E; 9];
        let points = layout(&constraints);
        assert_eq!(points.len(), 9);
        assert!(points.iter().all(|p| p.is_finite()));
        let (_, missed) = fallback(&constraints);
        assert!(missed > 0);
    }
}
