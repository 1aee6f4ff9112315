//! Fusing fragments that share atoms until no two fragments overlap.
//!
//! The pair fused next is the one with the highest `(not a lone hinge, higher max priority,
//! lower max priority, shared atom count)`. The lower-priority fragment moves onto the other.
//! Rings sharing three or more atoms are bridged: when the superposition lands the second ring
//! on the first, its extra atoms are laid out again as a bridge.

use super::*;
use std::f32::consts::{FRAC_PI_3, PI, TAU};
use tracing::trace;

const RING_CLOSURE_WEIGHT: f32 = 2.0;
const MISMATCH_WEIGHT: f32 = 10.0;
const RING_ANGLE_WEIGHT: f32 = 10.0;

type PairKey = (bool, u32, u32, usize);

fn is_lone_hinge(mol: &Molecule, a: &Fragment, b: &Fragment, shared: &[usize]) -> bool {
    match shared {
        &[atom] => a.internal_neighbors(mol, atom).len() == 1 && b.internal_neighbors(mol, atom).len() == 1,
        _ => false,
    }
}

fn best_pair(mol: &Molecule, fragments: &[Fragment]) -> Option<(usize, usize, Vec<usize>)> {
    let mut best: Option<(PairKey, usize, usize, Vec<usize>)> = None;
    for i in 0..fragments.len() {
        for j in i + 1..fragments.len() {
            let shared = fragments[i].shared_atoms(&fragments[j]);
            if shared.is_empty() {
                continue;
            }
            let (pi, pj) = (fragments[i].highest_priority(), fragments[j].highest_priority());
            let key = (
                !is_lone_hinge(mol, &fragments[i], &fragments[j], &shared),
                pi.max(pj),
                pi.min(pj),
                shared.len(),
            );
            if best.as_ref().map_or(true, |(k, ..)| key > *k) {
                best = Some((key, i, j, shared));
            }
        }
    }
    best.map(|(_, i, j, shared)| (i, j, shared))
}

/// Penalty of placing `moving` next to `fixed`: collisions between atoms not shared by both, and
/// stretched bonds between the two that will have to close a ring.
fn placement_penalty(mol: &Molecule, fixed: &Fragment, moving: &Fragment) -> f32 {
    let mut penalty = 0.0;
    for (&a, &p) in moving.atoms().iter().zip(moving.coordinates()) {
        if fixed.contains(a) {
            continue;
        }
        for (&b, &q) in fixed.atoms().iter().zip(fixed.coordinates()) {
            if moving.contains(b) {
                continue;
            }
            let d = p.distance(q);
            if mol.bond_between(a, b).is_some_and(|bond| !mol.bond(bond).is_metal_ligand()) {
                penalty += RING_CLOSURE_WEIGHT * (d - 1.0) * (d - 1.0);
            } else if d < COLLISION_LIMIT {
                penalty += 1.0 + (COLLISION_LIMIT - d) * (COLLISION_LIMIT - d);
            }
        }
    }
    penalty
}

/// Neighbour pairs of `atom`, one only in `moving` and one only in `fixed`, that lie on a ring
/// through it. Each comes with the angle that ring wants between them and the weight of missing
/// it, which grows as the ring gets smaller.
fn ring_angles(mol: &Molecule, fixed: &Fragment, moving: &Fragment, atom: usize) -> Vec<(usize, usize, f32, f32)> {
    let mut out = Vec::new();
    for m in moving.internal_neighbors(mol, atom) {
        if fixed.contains(m) {
            continue;
        }
        for f in fixed.internal_neighbors(mol, atom) {
            if moving.contains(f) {
                continue;
            }
            let Some(ring) = mol.shared_ring(m, f) else {
                continue;
            };
            if !mol.rings().ring(ring).atoms.contains(&atom) {
                continue;
            }
            let size = mol.ring_size(ring);
            let target = if size > ring::MAX_SMALL_RING {
                2.0 * FRAC_PI_3
            } else {
                PI * (size - 2) as f32 / size as f32
            };
            out.push((m, f, target, RING_ANGLE_WEIGHT / size as f32));
        }
    }
    out
}

fn ring_angle_penalty(centre: PointF, fixed: &Fragment, moving: &Fragment, pairs: &[(usize, usize, f32, f32)]) -> f32 {
    pairs
        .iter()
        .filter_map(|&(m, f, target, weight)| {
            let turn = angle::difference(angle::angle(centre, fixed.position(f)?), angle::angle(centre, moving.position(m)?));
            Some(weight * (turn.abs() - target) * (turn.abs() - target))
        })
        .sum()
}

/// Attach `moving` to `fixed` at one shared atom.
///
/// The neighbours of `moving` go into the widest free sector around the atom. Two fragments
/// meeting at an atom with one neighbour on each side get a 120° bond angle instead of a
/// straight line. Neighbours that close a ring through the atom may instead take the ring's
/// own angle. Both mirror images are tried.
fn fuse_on_atom(mol: &Molecule, fixed: &Fragment, moving: &mut Fragment, atom: usize) {
    let (Some(pf), Some(pm)) = (fixed.position(atom), moving.position(atom)) else {
        return;
    };
    moving.translate(pf - pm);
    let directions = |f: &Fragment| -> Vec<f32> {
        f.internal_neighbors(mol, atom)
            .into_iter()
            .filter_map(|n| f.position(n))
            .map(|p| angle::angle(pf, p))
            .collect()
    };
    let fixed_dirs = directions(fixed);
    let moving_dirs = directions(&*moving);
    if fixed_dirs.is_empty() || moving_dirs.is_empty() {
        return;
    }
    let mut options = Vec::new();
    if let (&[f], &[m]) = (fixed_dirs.as_slice(), moving_dirs.as_slice()) {
        for side in [1.0, -1.0] {
            let target = f + PI + side * FRAC_PI_3;
            options.push((target - m, target));
        }
    } else {
        let gap = angle::largest_gap_bisector(&fixed_dirs);
        let own = angle::largest_gap_bisector(&moving_dirs);
        options.push((gap - (own + PI), gap));
    }
    let rings = ring_angles(mol, fixed, moving, atom);
    for &(m, f, target, _) in &rings {
        let (Some(pm), Some(pn)) = (moving.position(m), fixed.position(f)) else {
            continue;
        };
        for side in [1.0, -1.0] {
            let wanted = angle::angle(pf, pn) + side * target;
            options.push((wanted - angle::angle(pf, pm), wanted));
        }
    }
    let mut best: Option<(f32, Fragment)> = None;
    for (rotation, axis) in options {
        for mirrored in [false, true] {
            let mut candidate = moving.clone();
            candidate.rotate(pf, rotation);
            if mirrored {
                candidate.flip(pf, axis);
            }
            let score = placement_penalty(mol, fixed, &candidate) + ring_angle_penalty(pf, fixed, &candidate, &rings);
            if best.as_ref().map_or(true, |(s, _)| score < *s - crate::EPSILON) {
                best = Some((score, candidate));
            }
        }
    }
    if let Some((_, placed)) = best {
        *moving = placed;
    }
}

/// Attach `moving` to `fixed` through several shared atoms by least-squares superposition,
/// plain or mirrored, whichever fits and collides less.
fn fuse_on_atoms(mol: &Molecule, fixed: &Fragment, moving: &mut Fragment, shared: &[usize]) {
    let fixed_pts: Vec<PointF> = shared.iter().filter_map(|&a| fixed.position(a)).collect();
    let moving_pts: Vec<PointF> = shared.iter().filter_map(|&a| moving.position(a)).collect();
    let cf = math::centroid(fixed_pts.iter().copied());
    let cm = math::centroid(moving_pts.iter().copied());
    let to: Vec<PointF> = fixed_pts.iter().map(|&p| p - cf).collect();
    let mut best: Option<(f32, Fragment)> = None;
    for mirrored in [false, true] {
        let mut candidate = moving.clone();
        candidate.translate(cf - cm);
        let from: Vec<PointF> = moving_pts
            .iter()
            .map(|&p| p - cm)
            .map(|v| if mirrored { PointF(v.0, -v.1) } else { v })
            .collect();
        if mirrored {
            candidate.flip(cf, 0.0);
        }
        candidate.rotate(cf, math::best_fit_rotation(&from, &to));
        let mismatch: f32 = shared
            .iter()
            .filter_map(|&a| Some((fixed.position(a)? - candidate.position(a)?).sq_length()))
            .sum();
        let score = mismatch * MISMATCH_WEIGHT + placement_penalty(mol, fixed, &candidate);
        if best.as_ref().map_or(true, |(s, _)| score < *s - crate::EPSILON) {
            best = Some((score, candidate));
        }
    }
    if let Some((_, placed)) = best {
        *moving = placed;
    }
}

/// Some atom only in `moving` sits on an atom only in `fixed`.
fn loose_atoms_collide(fixed: &Fragment, moving: &Fragment) -> bool {
    let only = |f: &Fragment, other: &Fragment| -> Vec<PointF> {
        f.atoms()
            .iter()
            .zip(f.coordinates())
            .filter(|(a, _)| !other.contains(**a))
            .map(|(_, &p)| p)
            .collect()
    };
    let theirs = only(fixed, moving);
    only(moving, fixed)
        .into_iter()
        .any(|p| theirs.iter().any(|&q| p.distance(q) < COLLISION_LIMIT))
}

/// The atoms of `moving` missing from `fixed`, as one path hanging between two shared atoms.
fn bridge_path(mol: &Molecule, fixed: &Fragment, moving: &Fragment) -> Option<(Vec<usize>, usize, usize)> {
    let loose = moving.atoms().iter().filter(|&&a| !fixed.contains(a)).count();
    let from = moving
        .atoms()
        .iter()
        .copied()
        .filter(|&a| fixed.contains(a))
        .find(|&a| moving.internal_neighbors(mol, a).iter().any(|&n| !fixed.contains(n)))?;
    let (mut prev, mut here) = (from, moving.internal_neighbors(mol, from).into_iter().find(|&n| !fixed.contains(n))?);
    let mut path = Vec::new();
    while !fixed.contains(here) {
        if path.contains(&here) {
            return None;
        }
        path.push(here);
        let next: Vec<usize> = moving
            .internal_neighbors(mol, here)
            .into_iter()
            .filter(|&n| n != prev)
            .collect();
        let &[next] = next.as_slice() else {
            return None;
        };
        (prev, here) = (here, next);
    }
    (path.len() == loose && here != from).then_some((path, from, here))
}

/// `count` points between `from` and `to` at unit spacing on a circular arc bulging to the left
/// of `from -> to` for `side = 1`, to the right for `side = -1`. An arc that would need longer
/// steps becomes a straight line.
fn bridge_arc(from: PointF, to: PointF, count: usize, side: f32) -> Vec<PointF> {
    let steps = (count + 1) as f32;
    let chord = from.distance(to);
    if chord >= steps - crate::EPSILON || chord < crate::EPSILON {
        return (1..=count).map(|i| from + (to - from) * (i as f32 / steps)).collect();
    }
    // unit chords turning by `step` each span `chord` in total
    let (mut lo, mut hi) = (0.0f32, TAU / steps);
    for _ in 0..48 {
        let mid = (lo + hi) * 0.5;
        if (steps * mid * 0.5).sin() / (mid * 0.5).sin() > chord {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    let step = (lo + hi) * 0.5;
    let radius = 0.5 / (step * 0.5).sin();
    let normal = (to - from).perpendicular().normalized() * side;
    let centre = (from + to) * 0.5 - normal * (radius * (steps * step * 0.5).cos());
    (1..=count).map(|i| from.rotated_around(centre, -side * step * i as f32)).collect()
}

/// Lay out the atoms `moving` adds to `fixed` as a bridge between the two shared atoms they hang
/// from, on whichever side collides less. Shared atoms on the path between those two that have
/// no other neighbours in `fixed` move onto the straight line joining them first, freeing their
/// side for the bridge. Returns false when the added atoms do not form such a bridge.
fn lay_out_bridge(mol: &Molecule, fixed: &mut Fragment, moving: &mut Fragment, shared: &[usize]) -> bool {
    let Some((bridge, from, to)) = bridge_path(mol, fixed, moving) else {
        return false;
    };
    let (Some(pa), Some(pb)) = (fixed.position(from), fixed.position(to)) else {
        return false;
    };
    let along_shared = |bond: usize| {
        let b = mol.bond(bond);
        moving.has_bond(mol, bond) && shared.contains(&b.start) && shared.contains(&b.end)
    };
    if let Some(path) = Chain::shortest_path(mol, from, to, along_shared) {
        let inner = &path.atoms[1..path.atoms.len() - 1];
        let free = inner.iter().all(|&a| {
            fixed.priority_of(a).is_some_and(|p| p < fragmenter::PRIORITY_TEMPLATE)
                && fixed.internal_neighbors(mol, a).iter().all(|n| path.atoms.contains(n))
        });
        if free {
            for (k, &a) in inner.iter().enumerate() {
                let t = (k + 1) as f32 / (inner.len() + 1) as f32;
                if let Some(l) = fixed.local_index(a) {
                    fixed.set_coordinate(l, pa + (pb - pa) * t);
                }
            }
        }
    }
    for &a in shared {
        if let (Some(p), Some(l)) = (fixed.position(a), moving.local_index(a)) {
            moving.set_coordinate(l, p);
        }
    }
    let mut best: Option<(f32, Fragment)> = None;
    for side in [1.0, -1.0] {
        let mut candidate = moving.clone();
        for (&a, p) in bridge.iter().zip(bridge_arc(pa, pb, bridge.len(), side)) {
            if let Some(l) = candidate.local_index(a) {
                candidate.set_coordinate(l, p);
            }
        }
        let score = placement_penalty(mol, fixed, &candidate);
        if best.as_ref().map_or(true, |(s, _)| score < *s - crate::EPSILON) {
            best = Some((score, candidate));
        }
    }
    if let Some((_, placed)) = best {
        *moving = placed;
    }
    trace!(bridge = bridge.len(), "laid out bridge");
    true
}

/// Fuse `moving` onto `fixed` and return the union.
pub fn fuse(mol: &Molecule, fixed: &Fragment, moving: &Fragment, shared: &[usize]) -> Fragment {
    let mut moving = moving.clone();
    match shared {
        [] => {}
        &[atom] => fuse_on_atom(mol, fixed, &mut moving, atom),
        _ => {
            fuse_on_atoms(mol, fixed, &mut moving, shared);
            if loose_atoms_collide(fixed, &moving) {
                let mut fixed = fixed.clone();
                if lay_out_bridge(mol, &mut fixed, &mut moving, shared) {
                    return fixed.merge(&moving);
                }
            }
        }
    }
    fixed.merge(&moving)
}

/// Repeatedly fuse the best overlapping pair until all fragments are disjoint.
pub fn join_overlapping(mol: &Molecule, mut fragments: Vec<Fragment>) -> Vec<Fragment> {
    while let Some((i, j, shared)) = best_pair(mol, &fragments) {
        let (fixed, moving) = if fragments[j].highest_priority() > fragments[i].highest_priority() {
            (j, i)
        } else {
            (i, j)
        };
        let (f, m) = (&fragments[fixed], &fragments[moving]);
        let merged = if m.is_subset_of(f) {
            f.clone()
        } else if f.is_subset_of(m) && f.highest_priority() == m.highest_priority() {
            m.clone()
        } else {
            fuse(mol, f, m, &shared)
        };
        trace!(fixed = f.len(), moving = m.len(), shared = shared.len(), "fused fragments");
        fragments = replace_pair(fragments, i, j, merged);
    }
    fragments
}

/// New fragment list with `merged` at the lower of the two indices and the other one removed.
pub(crate) fn replace_pair(fragments: Vec<Fragment>, i: usize, j: usize, merged: Fragment) -> Vec<Fragment> {
    let (keep_at, drop_at) = (i.min(j), i.max(j));
    let mut merged = Some(merged);
    fragments
        .into_iter()
        .enumerate()
        .filter(|&(k, _)| k != drop_at)
        .filter_map(|(k, frag)| if k == keep_at { merged.take() } else { Some(frag) })
        .collect()
}
