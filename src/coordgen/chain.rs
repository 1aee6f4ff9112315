//! Paths through the molecular graph: longest open chains, smallest rings, shortest paths.
//!
//! All searches are breadth-first over covalent bonds in adjacency order, so results are
//! deterministic for a given molecule.

use super::*;
use std::collections::VecDeque;

/// A path of atoms. `bonds[i]` joins `atoms[i]` and `atoms[i + 1]`; a ring carries one extra
/// bond closing back to `atoms[0]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chain {
    pub atoms: Vec<usize>,
    pub bonds: Vec<usize>,
}

struct Search {
    parent: Vec<Option<(usize, usize)>>,
    order: Vec<usize>,
}

fn bfs(
    mol: &Molecule,
    start: usize,
    mut expand: impl FnMut(usize) -> bool,
    mut use_bond: impl FnMut(usize) -> bool,
) -> Search {
    let mut parent = vec![None; mol.atom_count()];
    let mut seen = vec![false; mol.atom_count()];
    let mut order = vec![start];
    let mut queue = VecDeque::from([start]);
    seen[start] = true;
    while let Some(current) = queue.pop_front() {
        if current != start && !expand(current) {
            continue;
        }
        for (next, bond) in mol.links(current) {
            if seen[next] || !use_bond(bond) {
                continue;
            }
            seen[next] = true;
            parent[next] = Some((current, bond));
            order.push(next);
            queue.push_back(next);
        }
    }
    Search { parent, order }
}

impl Search {
    fn path_to(&self, start: usize, target: usize) -> Option<Chain> {
        let mut atoms = vec![target];
        let mut bonds = Vec::new();
        let mut current = target;
        while current != start {
            let (prev, bond) = self.parent[current]?;
            atoms.push(prev);
            bonds.push(bond);
            current = prev;
        }
        atoms.reverse();
        bonds.reverse();
        Some(Chain { atoms, bonds })
    }
}

impl Chain {
    pub fn len(&self) -> usize {
        self.atoms.len()
    }
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Longest path made of unhandled bonds, passing only through unhandled atoms except at its
    /// two ends. Returns `None` once every covalent bond is handled.
    pub fn longest_unhandled(mol: &Molecule, handled_atoms: &[bool], handled_bonds: &[bool]) -> Option<Self> {
        let seed = (0..mol.atom_count()).find(|&a| {
            mol.links(a).any(|(_, b)| !handled_bonds[b])
        })?;
        let far_end = |from: usize| {
            let search = bfs(mol, from, |a| !handled_atoms[a], |b| !handled_bonds[b]);
            let depth = |mut a: usize| {
                let mut d = 0;
                while let Some((p, _)) = search.parent[a] {
                    a = p;
                    d += 1;
                }
                d
            };
            let mut best = from;
            let mut best_depth = 0;
            for &a in &search.order {
                let d = depth(a);
                if d > best_depth {
                    best = a;
                    best_depth = d;
                }
            }
            (best, search)
        };
        let (first, _) = far_end(seed);
        let (second, search) = far_end(first);
        search.path_to(first, second).filter(|c| !c.bonds.is_empty())
    }

    /// Smallest ring through `bond`, ignoring coordinative bonds.
    pub fn smallest_ring(mol: &Molecule, bond: usize) -> Option<Self> {
        let b = mol.bond(bond);
        let (start, end) = (b.start, b.end);
        let search = bfs(mol, start, |_| true, |other| other != bond);
        let mut ring = search.path_to(start, end)?;
        ring.bonds.push(bond);
        Some(ring)
    }

    /// Shortest path between two atoms using only bonds accepted by `use_bond`.
    pub fn shortest_path(mol: &Molecule, from: usize, to: usize, use_bond: impl FnMut(usize) -> bool) -> Option<Self> {
        bfs(mol, from, |_| true, use_bond).path_to(from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hexane_on_ring() -> Molecule {
        // cyclopropane 0-1-2 carrying a hexyl chain 3..8 on atom 0
        let mut b = Builder::new();
        let a: Vec<_> = (0..9).map(|_| b.add_atom(6)).collect();
        b.add_bond(a[0], a[1], 1).unwrap();
        b.add_bond(a[1], a[2], 1).unwrap();
        b.add_bond(a[2], a[0], 1).unwrap();
        b.add_bond(a[0], a[3], 1).unwrap();
        for i in 3..8 {
            b.add_bond(a[i], a[i + 1], 1).unwrap();
        }
        b.finish()
    }

    #[test]
    fn longest_chain_stops_at_handled_atoms() {
        let mol = hexane_on_ring();
        let mut atoms = vec![false; 9];
        let mut bonds = vec![false; mol.bond_count()];
        for a in 0..3 {
            atoms[a] = true;
        }
        for b in 0..3 {
            bonds[b] = true;
        }
        let chain = Chain::longest_unhandled(&mol, &atoms, &bonds).unwrap();
        assert_eq!(chain.len(), 7);
        assert_eq!(chain.bonds.len(), 6);
        assert!(chain.atoms.contains(&0));
        assert!(!chain.atoms.contains(&1));
        let all = vec![true; mol.bond_count()];
        assert!(Chain::longest_unhandled(&mol, &atoms, &all).is_none());
    }

    #[test]
    fn smallest_ring_closes_on_bond() {
        let mol = hexane_on_ring();
        let ring = Chain::smallest_ring(&mol, 1).unwrap();
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.bonds.len(), 3);
        assert_eq!(*ring.bonds.last().unwrap(), 1);
        assert!(Chain::smallest_ring(&mol, 5).is_none());
    }

    #[test]
    fn shortest_path_respects_filter() {
        let mol = hexane_on_ring();
        let path = Chain::shortest_path(&mol, 1, 8, |_| true).unwrap();
        assert_eq!(path.atoms.first(), Some(&1));
        assert_eq!(path.atoms.last(), Some(&8));
        assert_eq!(path.bonds.len(), 7);
        assert!(Chain::shortest_path(&mol, 1, 8, |b| b != 3).is_none());
    }
}
