//! Collision repair inside a fragment: randomised bond flips, then small per-atom nudges.

use super::*;
use rand::Rng;
use tracing::trace;

/// How eagerly a bond may be flipped. Ordered from least to most preferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FlipTier {
    /// Both ends marked while marked coordinates are only preferred.
    LastResort,
    Possible,
    /// Touches a ring atom.
    Preferred,
}
impl FlipTier {
    /// Attempts spent while this tier is the lowest one allowed.
    pub fn budget(self) -> usize {
        match self {
            Self::Preferred => 32,
            Self::Possible => 64,
            Self::LastResort => 128,
        }
    }
}

/// Flip tier of every bond, `None` where flipping is excluded.
#[derive(Debug, Clone, Default)]
pub struct FlipCandidates {
    tiers: Vec<Option<FlipTier>>,
}
impl FlipCandidates {
    pub fn classify(mol: &Molecule, ranks: &[u32], mode: Mode) -> Self {
        let tiers = (0..mol.bond_count())
            .map(|bond| {
                let b = mol.bond(bond);
                if b.bond_order != 1 || mol.is_ring_bond(bond) {
                    return None;
                }
                if pointless_side(mol, ranks, b.start, b.end) || pointless_side(mol, ranks, b.end, b.start) {
                    return None;
                }
                let both_marked = mol.atom(b.start).marked && mol.atom(b.end).marked;
                if both_marked && mode.contains(Mode::KEEP_MARKED_ATOM_COORDS) {
                    return None;
                }
                if both_marked && mode.contains(Mode::PREFER_MARKED_ATOM_COORDS) {
                    Some(FlipTier::LastResort)
                } else if mol.is_ring_atom(b.start) || mol.is_ring_atom(b.end) {
                    Some(FlipTier::Preferred)
                } else {
                    Some(FlipTier::Possible)
                }
            })
            .collect();
        Self { tiers }
    }
    pub fn tier(&self, bond: usize) -> Option<FlipTier> {
        self.tiers.get(bond).copied().flatten()
    }
}

/// Mirroring the substituents of `atom` (seen from `partner`) changes nothing.
fn pointless_side(mol: &Molecule, ranks: &[u32], atom: usize, partner: usize) -> bool {
    let others: Vec<u32> = mol
        .links(atom)
        .filter(|&(n, _)| n != partner)
        .map(|(n, _)| ranks[n])
        .collect();
    match others.as_slice() {
        [] => true,
        [_] => false,
        [first, rest @ ..] => rest.iter().all(|r| r == first),
    }
}

/// Randomised flip search. Each attempt picks a collision, walks the shortest bond path between
/// the two atoms and flips one allowed bond on it. The best state seen is kept.
///
/// Returns the best score after every attempt, starting with the initial score.
pub fn optimize_fragment<R: Rng>(
    mol: &Molecule,
    frag: &mut Fragment,
    candidates: &FlipCandidates,
    rng: &mut R,
) -> Vec<CollisionScore> {
    let mut best_score = frag.collision_score();
    let mut history = vec![best_score];
    if best_score.count == 0 {
        return history;
    }
    let mut best = frag.clone();
    let mut last_flipped = None;
    'tiers: for tier in [FlipTier::Preferred, FlipTier::Possible, FlipTier::LastResort] {
        for _ in 0..tier.budget() {
            let collisions = frag.collision_list();
            if collisions.is_empty() {
                break 'tiers;
            }
            let (a, b) = collisions[rng.random_range(0..collisions.len())];
            let Some(path) = Chain::shortest_path(mol, a, b, |bond| frag.has_bond(mol, bond)) else {
                continue;
            };
            let options: Vec<usize> = path
                .bonds
                .iter()
                .copied()
                .filter(|&bond| Some(bond) != last_flipped && candidates.tier(bond).is_some_and(|t| t >= tier))
                .collect();
            if options.is_empty() {
                continue;
            }
            let bond = options[rng.random_range(0..options.len())];
            let last_resort = candidates.tier(bond) == Some(FlipTier::LastResort);
            if !frag.flip_one_side(mol, bond, last_resort) {
                continue;
            }
            last_flipped = Some(bond);
            let score = frag.collision_score();
            if score.is_better_than(best_score) {
                best_score = score;
                best = frag.clone();
            }
            history.push(best_score);
        }
    }
    trace!(collisions = best_score.count, attempts = history.len() - 1, "flip search done");
    *frag = best;
    history
}

/// Nudge atoms in increasing rank order away from close bonds and atoms, undoing every nudge
/// that makes the collision score worse. Ring atoms only move while they collide.
///
/// Marked atoms and template atoms stay put. When marked coordinates are only preferred, a
/// second pass moves the marked atoms that still collide with each other.
pub fn perturb(mol: &Molecule, frag: &mut Fragment, ranks: &[u32], mode: Mode) {
    let marked = |atom: usize| mode.uses_core() && mol.atom(atom).marked;
    let templated: Vec<usize> = frag
        .atoms()
        .iter()
        .copied()
        .filter(|&a| frag.priority_of(a).is_some_and(|p| p >= fragmenter::PRIORITY_TEMPLATE))
        .collect();
    nudge_pass(mol, frag, ranks, |atom| !marked(atom) && !templated.contains(&atom));
    if mode.contains(Mode::PREFER_MARKED_ATOM_COORDS) && !mode.contains(Mode::KEEP_MARKED_ATOM_COORDS) {
        let stuck: Vec<usize> = frag
            .collision_list()
            .into_iter()
            .filter(|&(a, b)| marked(a) && marked(b))
            .flat_map(|(a, b)| [a, b])
            .collect();
        if !stuck.is_empty() {
            trace!(atoms = stuck.len(), "nudging colliding marked atoms");
            nudge_pass(mol, frag, ranks, |atom| stuck.contains(&atom));
        }
    }
}

fn nudge_pass(mol: &Molecule, frag: &mut Fragment, ranks: &[u32], movable: impl Fn(usize) -> bool) {
    if frag.collision_score().count == 0 {
        return;
    }
    let crowded: Vec<usize> = frag.collision_list().into_iter().flat_map(|(a, b)| [a, b]).collect();
    let mut order: Vec<usize> = (0..frag.len()).collect();
    order.sort_by_key(|&l| (ranks[frag.atoms()[l]], frag.atoms()[l]));
    for local in order {
        let atom = frag.atoms()[local];
        if !movable(atom) || (mol.is_ring_atom(atom) && !crowded.contains(&atom)) {
            continue;
        }
        let before = frag.collision_score();
        let saved = frag.coordinate(local);
        if frag.optimize_atom_coordinates(mol, local) && before.is_better_than(frag.collision_score()) {
            frag.set_coordinate(local, saved);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn branched() -> Molecule {
        // 0-1(-4)-2(-5)-3 with distinct substituents on both middle atoms
        let mut b = Builder::new();
        let a: Vec<_> = [6, 6, 6, 6, 7, 8].iter().map(|&z| b.add_atom(z)).collect();
        for (s, e) in [(0, 1), (1, 2), (2, 3), (1, 4), (2, 5)] {
            b.add_bond(a[s], a[e], 1).unwrap();
        }
        b.finish()
    }

    #[test]
    fn terminal_and_symmetric_bonds_are_excluded() {
        let mol = branched();
        let ranks = symmetry_ranks(&mol);
        let c = FlipCandidates::classify(&mol, &ranks, Mode::default());
        // 0-1: atom 0 is terminal
        assert_eq!(c.tier(0), None);
        // 1-2: both sides have distinguishable substituents
        assert_eq!(c.tier(1), Some(FlipTier::Possible));
        // 1-4 ends in a terminal atom
        assert_eq!(c.tier(3), None);
    }

    #[test]
    fn marked_bonds_follow_mode() {
        let mut mol = branched();
        mol.atom_mut(1).marked = true;
        mol.atom_mut(2).marked = true;
        let ranks = symmetry_ranks(&mol);
        let keep = FlipCandidates::classify(&mol, &ranks, Mode::KEEP_MARKED_ATOM_COORDS);
        assert_eq!(keep.tier(1), None);
        let prefer = FlipCandidates::classify(&mol, &ranks, Mode::PREFER_MARKED_ATOM_COORDS);
        assert_eq!(prefer.tier(1), Some(FlipTier::LastResort));
    }

    fn atoms(count: usize, bonds: &[(usize, usize)]) -> Molecule {
        let mut b = Builder::new();
        let a: Vec<_> = (0..count).map(|_| b.add_atom(6)).collect();
        for &(s, e) in bonds {
            b.add_bond(a[s], a[e], 1).unwrap();
        }
        b.finish()
    }

    #[test]
    fn preferred_core_atoms_wait_for_the_others() {
        // atom 3 sits just above the marked middle atom of a straight chain
        let mut mol = atoms(4, &[(0, 1), (1, 2)]);
        mol.atom_mut(1).marked = true;
        let coords = vec![PointF(0.0, 0.0), PointF(1.0, 0.0), PointF(2.0, 0.0), PointF(1.0, 0.4)];
        let mut frag = Fragment::new((0..4).collect(), coords, 1);
        let ranks = symmetry_ranks(&mol);
        perturb(&mol, &mut frag, &ranks, Mode::PREFER_MARKED_ATOM_COORDS);
        assert_eq!(frag.position(1), Some(PointF(1.0, 0.0)));
        assert!(frag.position(3).unwrap().1 > 0.5);
    }

    #[test]
    fn colliding_marked_atoms_move_only_when_preferred() {
        let mut mol = atoms(2, &[]);
        mol.atom_mut(0).marked = true;
        mol.atom_mut(1).marked = true;
        let ranks = symmetry_ranks(&mol);
        let start = Fragment::new(vec![0, 1], vec![PointF(0.0, 0.0), PointF(0.3, 0.0)], 1);

        let mut kept = start.clone();
        perturb(&mol, &mut kept, &ranks, Mode::KEEP_MARKED_ATOM_COORDS);
        assert_eq!(kept.coordinates(), start.coordinates());

        let mut preferred = start.clone();
        perturb(&mol, &mut preferred, &ranks, Mode::PREFER_MARKED_ATOM_COORDS);
        let gap = preferred.coordinate(0).distance(preferred.coordinate(1));
        assert!(gap > 0.3 + 0.1, "gap {gap}");
    }

    #[test]
    fn crowded_ring_atom_gives_way() {
        // triangle with a kept atom pressing on one corner
        let mut mol = atoms(4, &[(0, 1), (1, 2), (2, 0)]);
        mol.atom_mut(3).marked = true;
        let coords = vec![PointF(0.0, 0.0), PointF(1.0, 0.0), PointF(0.5, 0.866), PointF(-0.3, -0.3)];
        let mut frag = Fragment::new((0..4).collect(), coords, 1);
        let ranks = symmetry_ranks(&mol);
        perturb(&mol, &mut frag, &ranks, Mode::KEEP_MARKED_ATOM_COORDS);
        assert_eq!(frag.position(3), Some(PointF(-0.3, -0.3)));
        assert_eq!(frag.position(1), Some(PointF(1.0, 0.0)));
        assert!(frag.position(0).unwrap().distance(PointF(-0.3, -0.3)) > 0.5);
    }

    #[test]
    fn template_atoms_are_not_nudged() {
        let mol = atoms(3, &[(0, 1), (1, 2)]);
        let coords = vec![PointF(0.0, 0.0), PointF(1.0, 0.0), PointF(0.3, 0.0)];
        let mut frag = Fragment::new((0..3).collect(), coords.clone(), fragmenter::PRIORITY_TEMPLATE);
        let ranks = symmetry_ranks(&mol);
        perturb(&mol, &mut frag, &ranks, Mode::default());
        for (a, &p) in coords.iter().enumerate() {
            assert_eq!(frag.position(a), Some(p));
        }

        let mut loose = Fragment::new((0..3).collect(), coords, 1);
        perturb(&mol, &mut loose, &ranks, Mode::default());
        assert!(loose.position(2).unwrap().distance(loose.position(0).unwrap()) > 0.3);
    }

    #[test]
    fn flip_search_never_gets_worse() {
        // hexane folded onto itself: atom 5 sits on top of atom 0
        let mut b = Builder::new();
        let a: Vec<_> = (0..6).map(|_| b.add_atom(6)).collect();
        for i in 0..5 {
            b.add_bond(a[i], a[i + 1], 1).unwrap();
        }
        let mol = b.finish();
        let coords = builder::regular_polygon(6);
        let mut frag = Fragment::new((0..6).collect(), coords, 1);
        frag.set_coordinate(5, frag.coordinate(0) + PointF(0.1, 0.0));
        let ranks = symmetry_ranks(&mol);
        let candidates = FlipCandidates::classify(&mol, &ranks, Mode::default());
        let mut rng = StdRng::seed_from_u64(7);
        let history = optimize_fragment(&mol, &mut frag, &candidates, &mut rng);
        assert!(history.len() > 1);
        for w in history.windows(2) {
            assert!(!w[0].is_better_than(w[1]));
        }
        assert!(!history[0].is_better_than(frag.collision_score()));
        assert!(frag.collision_score().is_better_than(history[0]));
    }
}
