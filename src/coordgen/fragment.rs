use super::*;
use ahash::AHashMap;
use std::collections::VecDeque;
use std::f32::consts::{PI, TAU};

/// Non-bonded atoms closer than this collide.
pub const COLLISION_LIMIT: f32 = 0.8;
/// Atoms closer than this to a foreign bond are pushed away from it.
pub const ATOM_MOVEMENT_LIMIT: f32 = 0.5;
const MAX_NUDGE: f32 = 0.2;
const ATTACHMENT_BINS: usize = 36;

/// Collision state of a fragment; fewer collisions always wins, then lower penalty.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CollisionScore {
    pub count: usize,
    pub penalty: f32,
}
impl CollisionScore {
    pub fn is_better_than(self, other: Self) -> bool {
        self.count < other.count
            || (self.count == other.count && self.penalty < other.penalty - crate::EPSILON)
    }
}

/// A rigid piece of the drawing: a set of atoms with local coordinates.
///
/// Every atom carries a priority; when two fragments are fused, the coordinates of shared atoms
/// come from the fragment with the higher priority for that atom.
#[derive(Debug, Clone)]
pub struct Fragment {
    atoms: Vec<usize>,
    coords: Vec<PointF>,
    priority: Vec<u32>,
    local: AHashMap<usize, usize>,
    bonds: Option<Vec<usize>>,
    /// Marked atoms must not move relative to each other.
    pub keep_marked_atoms: bool,
}
impl Fragment {
    pub fn new(atoms: Vec<usize>, coords: Vec<PointF>, priority: u32) -> Self {
        let priorities = vec![priority; atoms.len()];
        Self::with_priorities(atoms, coords, priorities)
    }
    pub fn with_priorities(atoms: Vec<usize>, coords: Vec<PointF>, priority: Vec<u32>) -> Self {
        debug_assert_eq!(atoms.len(), coords.len());
        debug_assert_eq!(atoms.len(), priority.len());
        let local = atoms.iter().enumerate().map(|(i, &a)| (a, i)).collect();
        Self {
            atoms,
            coords,
            priority,
            local,
            bonds: None,
            keep_marked_atoms: false,
        }
    }
    pub fn single_atom(atom: usize) -> Self {
        Self::new(vec![atom], vec![PointF::ORIGIN], 0)
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }
    pub fn atoms(&self) -> &[usize] {
        &self.atoms
    }
    pub fn coordinates(&self) -> &[PointF] {
        &self.coords
    }
    pub fn coordinate(&self, local: usize) -> PointF {
        self.coords[local]
    }
    pub fn set_coordinate(&mut self, local: usize, p: PointF) {
        self.coords[local] = p;
    }
    pub fn local_index(&self, atom: usize) -> Option<usize> {
        self.local.get(&atom).copied()
    }
    pub fn contains(&self, atom: usize) -> bool {
        self.local.contains_key(&atom)
    }
    pub fn position(&self, atom: usize) -> Option<PointF> {
        self.local_index(atom).map(|i| self.coords[i])
    }
    pub fn priority_of(&self, atom: usize) -> Option<u32> {
        self.local_index(atom).map(|i| self.priority[i])
    }
    pub fn highest_priority(&self) -> u32 {
        self.priority.iter().copied().max().unwrap_or(0)
    }
    pub fn is_subset_of(&self, other: &Fragment) -> bool {
        self.atoms.iter().all(|&a| other.contains(a))
    }
    pub fn shared_atoms(&self, other: &Fragment) -> Vec<usize> {
        self.atoms.iter().copied().filter(|&a| other.contains(a)).collect()
    }

    /// Covalent bonds with both ends in the fragment, computed on first use.
    pub fn bonds(&mut self, mol: &Molecule) -> &[usize] {
        if self.bonds.is_none() {
            let mut bonds: Vec<usize> = self
                .atoms
                .iter()
                .flat_map(|&a| mol.links(a))
                .filter(|&(n, _)| self.contains(n))
                .map(|(_, b)| b)
                .collect();
            bonds.sort_unstable();
            bonds.dedup();
            self.bonds = Some(bonds);
        }
        self.bonds.as_deref().unwrap_or_default()
    }
    pub fn has_bond(&self, mol: &Molecule, bond: usize) -> bool {
        let b = mol.bond(bond);
        !b.is_metal_ligand() && self.contains(b.start) && self.contains(b.end)
    }
    /// Neighbours of `atom` that are also in this fragment.
    pub fn internal_neighbors(&self, mol: &Molecule, atom: usize) -> Vec<usize> {
        mol.links(atom)
            .map(|(n, _)| n)
            .filter(|&n| self.contains(n))
            .collect()
    }

    pub fn translate(&mut self, offset: PointF) {
        for p in &mut self.coords {
            *p += offset;
        }
    }
    /// Rotate counter-clockwise by `angle` radians around `pivot`.
    pub fn rotate(&mut self, pivot: PointF, angle: f32) {
        let (sin, cos) = angle.sin_cos();
        for p in &mut self.coords {
            let mut v = *p - pivot;
            v.rotate(sin, cos);
            *p = pivot + v;
        }
    }
    /// Mirror across the line through `pivot` pointing at `axis` radians.
    pub fn flip(&mut self, pivot: PointF, axis: f32) {
        let other = pivot + PointF::from_angle(axis);
        for p in &mut self.coords {
            *p = math::mirror_point(*p, pivot, other);
        }
    }
    pub fn centroid(&self) -> PointF {
        math::centroid(self.coords.iter().copied())
    }
    /// Axis-aligned bounding box as `(min, max)`.
    pub fn extents(&self) -> (PointF, PointF) {
        self.coords.iter().fold(
            (PointF(f32::INFINITY, f32::INFINITY), PointF(f32::NEG_INFINITY, f32::NEG_INFINITY)),
            |(lo, hi), p| (PointF(lo.0.min(p.0), lo.1.min(p.1)), PointF(hi.0.max(p.0), hi.1.max(p.1))),
        )
    }

    /// Union of two fragments. Shared atoms take the coordinates of whichever fragment has the
    /// higher priority for them (`self` on ties), and the higher priority.
    pub fn merge(&self, other: &Fragment) -> Fragment {
        let mut atoms = self.atoms.clone();
        let mut coords = self.coords.clone();
        let mut priority = self.priority.clone();
        for (i, &a) in other.atoms.iter().enumerate() {
            match self.local_index(a) {
                Some(l) => {
                    if other.priority[i] > priority[l] {
                        coords[l] = other.coords[i];
                        priority[l] = other.priority[i];
                    }
                }
                None => {
                    atoms.push(a);
                    coords.push(other.coords[i]);
                    priority.push(other.priority[i]);
                }
            }
        }
        let mut merged = Fragment::with_priorities(atoms, coords, priority);
        merged.keep_marked_atoms = self.keep_marked_atoms || other.keep_marked_atoms;
        merged
    }

    /// Pairs of atoms (global ids) closer than [`COLLISION_LIMIT`].
    pub fn collision_list(&self) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        for i in 0..self.coords.len() {
            for j in i + 1..self.coords.len() {
                if self.coords[i].distance(self.coords[j]) < COLLISION_LIMIT {
                    out.push((self.atoms[i], self.atoms[j]));
                }
            }
        }
        out
    }
    pub fn collision_score(&self) -> CollisionScore {
        let mut score = CollisionScore::default();
        for i in 0..self.coords.len() {
            for j in i + 1..self.coords.len() {
                let d = self.coords[i].distance(self.coords[j]);
                if d < COLLISION_LIMIT {
                    score.count += 1;
                    score.penalty += (COLLISION_LIMIT - d) * (COLLISION_LIMIT - d);
                }
            }
        }
        score
    }

    fn side_of_bond(&self, mol: &Molecule, from: usize, skip: usize) -> Vec<bool> {
        let mut side = vec![false; self.atoms.len()];
        let Some(start) = self.local_index(from) else {
            return side;
        };
        side[start] = true;
        let mut queue = VecDeque::from([from]);
        while let Some(atom) = queue.pop_front() {
            for (next, bond) in mol.links(atom) {
                if bond == skip {
                    continue;
                }
                if let Some(l) = self.local_index(next) {
                    if !side[l] {
                        side[l] = true;
                        queue.push_back(next);
                    }
                }
            }
        }
        side
    }

    /// Mirror the smaller side of a non-ring bond across the bond axis.
    ///
    /// With `keep_marked_atoms`, the side without marked atoms moves instead; if both sides
    /// hold marked atoms nothing moves, unless `move_marked` lifts the protection. Returns
    /// whether anything was flipped.
    pub fn flip_one_side(&mut self, mol: &Molecule, bond: usize, move_marked: bool) -> bool {
        let b = mol.bond(bond);
        let (Some(ls), Some(le)) = (self.local_index(b.start), self.local_index(b.end)) else {
            return false;
        };
        let side_start = self.side_of_bond(mol, b.start, bond);
        if side_start[le] {
            return false;
        }
        let side_end = self.side_of_bond(mol, b.end, bond);
        let size = |m: &[bool]| m.iter().filter(|&&x| x).count();
        let (mut moving, mut fixed) = if size(&side_start) <= size(&side_end) {
            (side_start, side_end)
        } else {
            (side_end, side_start)
        };
        if self.keep_marked_atoms && !move_marked {
            let marked = |m: &[bool]| {
                m.iter()
                    .zip(&self.atoms)
                    .any(|(&inside, &a)| inside && mol.atom(a).marked)
            };
            match (marked(&moving), marked(&fixed)) {
                (true, true) => return false,
                (true, false) => std::mem::swap(&mut moving, &mut fixed),
                _ => {}
            }
        }
        let (p1, p2) = (self.coords[ls], self.coords[le]);
        for (p, _) in self.coords.iter_mut().zip(&moving).filter(|(_, &m)| m) {
            *p = math::mirror_point(*p, p1, p2);
        }
        true
    }

    /// Push one atom away from nearby foreign bonds and colliding atoms. Returns whether the
    /// atom moved.
    pub fn optimize_atom_coordinates(&mut self, mol: &Molecule, local: usize) -> bool {
        let atom = self.atoms[local];
        let p = self.coords[local];
        let mut force = PointF::ORIGIN;
        let bonds = self.bonds(mol).to_vec();
        for bond in bonds {
            let b = mol.bond(bond);
            if b.contains(atom) {
                continue;
            }
            let (Some(s), Some(e)) = (self.position(b.start), self.position(b.end)) else {
                continue;
            };
            let (d2, t) = math::sq_dist_point_segment(p, s, e);
            let d = d2.sqrt();
            if d >= ATOM_MOVEMENT_LIMIT {
                continue;
            }
            let mut away = p - (s + (e - s) * t);
            if away.length() < crate::EPSILON {
                away = (e - s).perpendicular();
            }
            force += away.normalized() * (ATOM_MOVEMENT_LIMIT - d);
        }
        for (j, &q) in self.coords.iter().enumerate() {
            if j == local || mol.bond_between(atom, self.atoms[j]).is_some() {
                continue;
            }
            let d = p.distance(q);
            if d >= COLLISION_LIMIT {
                continue;
            }
            let mut away = p - q;
            if away.length() < crate::EPSILON {
                away = PointF(1.0, 0.0);
            }
            force += away.normalized() * ((COLLISION_LIMIT - d) * 0.5);
        }
        let len = force.length();
        if len < crate::EPSILON {
            return false;
        }
        if len > MAX_NUDGE {
            force *= MAX_NUDGE / len;
        }
        self.coords[local] = p + force;
        true
    }

    /// Direction (radians) from `anchor` with the most free room for attaching something of
    /// `neighbour_count` atoms.
    pub fn preferred_attachment_angle(&self, anchor: PointF, neighbour_count: usize) -> f32 {
        let bin_width = TAU / ATTACHMENT_BINS as f32;
        let mut reach = [0.0f32; ATTACHMENT_BINS];
        for &p in &self.coords {
            let v = p - anchor;
            let d = v.length();
            if d < crate::EPSILON {
                continue;
            }
            let bin = (((v.angle() + PI) / bin_width) as usize).min(ATTACHMENT_BINS - 1);
            reach[bin] = reach[bin].max(d);
        }
        let bin_angle = |bin: usize| -PI + (bin as f32 + 0.5) * bin_width;
        let Some(farthest) = (0..ATTACHMENT_BINS)
            .filter(|&b| reach[b] > 0.0)
            .max_by(|&a, &b| reach[a].total_cmp(&reach[b]).then(b.cmp(&a)))
        else {
            return 0.0;
        };
        let opposite = bin_angle(farthest) + PI;
        let footprint = (neighbour_count + 1).min(ATTACHMENT_BINS / 4) as isize;
        let mut best = (f32::INFINITY, 0.0);
        for c in 0..ATTACHMENT_BINS {
            let mut clearance = 0.0f32;
            for k in -footprint..=footprint {
                let cos = (k as f32 * bin_width).cos();
                if cos <= 0.0 {
                    continue;
                }
                let bin = (c as isize + k).rem_euclid(ATTACHMENT_BINS as isize) as usize;
                clearance = clearance.max(reach[bin] * cos);
            }
            let score = clearance + 0.1 * angle::difference(bin_angle(c), opposite).abs();
            if score < best.0 - crate::EPSILON {
                best = (score, bin_angle(c));
            }
        }
        best.1
    }

    /// Move `other` next to this fragment, `gap` apart, choosing among side-by-side, stacked and
    /// the four diagonal placements the one with the smallest combined bounding box.
    pub fn arrange_with(&self, other: &mut Fragment, gap: f32) {
        let (min1, max1) = self.extents();
        let (min2, max2) = other.extents();
        let c1 = (min1 + max1) * 0.5;
        let c2 = (min2 + max2) * 0.5;
        let mut offsets = vec![
            PointF(max1.0 + gap - min2.0, c1.1 - c2.1),
            PointF(c1.0 - c2.0, min1.1 - gap - max2.1),
        ];
        for dir in [PointF(1.0, 1.0), PointF(1.0, -1.0), PointF(-1.0, 1.0), PointF(-1.0, -1.0)] {
            let dir = dir.normalized();
            let reach1 = self.coords.iter().map(|&p| (p - c1).dot(dir)).fold(0.0f32, f32::max);
            let reach2 = other.coords.iter().map(|&p| (c2 - p).dot(dir)).fold(0.0f32, f32::max);
            offsets.push(c1 + dir * (reach1 + reach2 + gap) - c2);
        }
        let area = |offset: PointF| {
            let lo = PointF(min1.0.min(min2.0 + offset.0), min1.1.min(min2.1 + offset.1));
            let hi = PointF(max1.0.max(max2.0 + offset.0), max1.1.max(max2.1 + offset.1));
            (hi.0 - lo.0) * (hi.1 - lo.1)
        };
        let mut best = offsets[0];
        let mut best_area = area(best);
        for &offset in &offsets[1..] {
            let a = area(offset);
            if a < best_area - crate::EPSILON {
                best = offset;
                best_area = a;
            }
        }
        other.translate(best);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn butane() -> Molecule {
        let mut b = Builder::new();
        let a: Vec<_> = (0..4).map(|_| b.add_atom(6)).collect();
        for i in 0..3 {
            b.add_bond(a[i], a[i + 1], 1).unwrap();
        }
        b.finish()
    }

    fn zigzag(n: usize) -> Fragment {
        let coords = (0..n)
            .map(|i| PointF(i as f32 * 0.866, if i % 2 == 0 { 0.0 } else { 0.5 }))
            .collect();
        Fragment::new((0..n).collect(), coords, 1)
    }

    #[test]
    fn flip_mirrors_smaller_side() {
        let mol = butane();
        let mut f = zigzag(4);
        let before = f.position(3);
        assert!(f.flip_one_side(&mol, 1, false));
        // atom 0 swings over to the cis position, the far side stays
        assert_eq!(f.position(3), before);
        let p0 = f.position(0).unwrap();
        assert!(p0.1 > 1.0);
        assert!((p0.distance(f.position(1).unwrap()) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn flip_keeps_marked_side() {
        let mut mol = butane();
        mol.atom_mut(0).marked = true;
        let mut f = zigzag(4);
        f.keep_marked_atoms = true;
        let before = f.position(0);
        assert!(f.flip_one_side(&mol, 1, false));
        assert_eq!(f.position(0), before);
        assert!(f.position(3).unwrap().1 < -0.5);
    }

    #[test]
    fn marked_on_both_sides_moves_only_when_allowed() {
        let mut mol = butane();
        mol.atom_mut(0).marked = true;
        mol.atom_mut(3).marked = true;
        let mut f = zigzag(4);
        f.keep_marked_atoms = true;
        let before = f.coordinates().to_vec();
        assert!(!f.flip_one_side(&mol, 1, false));
        assert_eq!(f.coordinates(), before.as_slice());
        assert!(f.flip_one_side(&mol, 1, true));
        assert_ne!(f.position(0), Some(before[0]));
    }

    #[test]
    fn ring_bonds_do_not_flip() {
        let mut b = Builder::new();
        let a: Vec<_> = (0..3).map(|_| b.add_atom(6)).collect();
        for i in 0..3 {
            b.add_bond(a[i], a[(i + 1) % 3], 1).unwrap();
        }
        let mol = b.finish();
        let mut f = Fragment::new(vec![0, 1, 2], vec![PointF(0.0, 0.0), PointF(1.0, 0.0), PointF(0.5, 0.8)], 1);
        assert!(!f.flip_one_side(&mol, 0, false));
    }

    #[test]
    fn collisions_are_counted_once() {
        let f = Fragment::new(vec![4, 7, 9], vec![PointF(0.0, 0.0), PointF(0.5, 0.0), PointF(3.0, 0.0)], 1);
        assert_eq!(f.collision_list(), vec![(4, 7)]);
        let s = f.collision_score();
        assert_eq!(s.count, 1);
        assert!((s.penalty - 0.09).abs() < 1e-4);
    }

    #[test]
    fn merge_prefers_higher_priority_coordinates() {
        let a = Fragment::new(vec![0, 1], vec![PointF(0.0, 0.0), PointF(1.0, 0.0)], 5);
        let b = Fragment::new(vec![1, 2], vec![PointF(9.0, 9.0), PointF(2.0, 0.0)], 10);
        let m = a.merge(&b);
        assert_eq!(m.atoms(), &[0, 1, 2]);
        assert_eq!(m.position(1), Some(PointF(9.0, 9.0)));
        assert_eq!(m.priority_of(1), Some(10));
        assert_eq!(m.priority_of(0), Some(5));
    }

    #[test]
    fn attachment_points_away_from_bulk() {
        let f = Fragment::new(
            (0..4).collect(),
            vec![PointF(0.0, 0.0), PointF(-1.0, 0.0), PointF(-2.0, 0.5), PointF(-1.5, -1.0)],
            1,
        );
        let a = f.preferred_attachment_angle(PointF(0.0, 0.0), 1);
        assert!(a.cos() > 0.7, "angle {a}");
    }

    #[test]
    fn arranged_fragments_do_not_overlap() {
        let a = zigzag(5);
        let mut b = zigzag(3);
        a.arrange_with(&mut b, 1.6);
        let closest = a
            .coordinates()
            .iter()
            .flat_map(|&p| b.coordinates().iter().map(move |&q| p.distance(q)))
            .fold(f32::INFINITY, f32::min);
        assert!(closest >= 1.6 - 1e-3, "closest {closest}");
    }
}
