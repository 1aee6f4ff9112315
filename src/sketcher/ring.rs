use super::*;
use crate::coordgen::chain::Chain;
use ahash::AHashSet;

/// Every simple cycle up to this size is perceived.
pub const MAX_SMALL_RING: usize = 7;

/// A cycle in atom order. `bonds[i]` joins `atoms[i]` and `atoms[i + 1]`, the last bond closes
/// the ring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ring {
    pub atoms: Vec<usize>,
    pub bonds: Vec<usize>,
}
impl Ring {
    pub fn len(&self) -> usize {
        self.atoms.len()
    }
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }
    pub fn is_macrocycle(&self) -> bool {
        self.atoms.len() > MAX_SMALL_RING
    }
}

/// Rings sorted by size, with per-atom and per-bond membership lists.
#[derive(Debug, Default, Clone)]
pub struct RingSet {
    rings: Vec<Ring>,
    atom_rings: Vec<Vec<usize>>,
    bond_rings: Vec<Vec<usize>>,
}
impl RingSet {
    /// All simple cycles of at most [`MAX_SMALL_RING`] atoms, plus the smallest ring through
    /// every ring bond those do not cover. Coordinative bonds are not part of any ring.
    pub fn perceive(mol: &Molecule) -> Self {
        let mut rings = Vec::new();
        let mut path = Vec::new();
        let mut bonds = Vec::new();
        for start in 0..mol.atom_count() {
            path.push(start);
            small_cycles(mol, start, &mut path, &mut bonds, &mut rings);
            path.clear();
        }

        let mut covered = vec![false; mol.bond_count()];
        for r in &rings {
            for &b in &r.bonds {
                covered[b] = true;
            }
        }
        let mut seen: AHashSet<Vec<usize>> = rings
            .iter()
            .map(|r| {
                let mut key = r.bonds.clone();
                key.sort_unstable();
                key
            })
            .collect();
        for bond in 0..mol.bond_count() {
            if covered[bond] || mol.bond(bond).is_metal_ligand() {
                continue;
            }
            let Some(chain) = Chain::smallest_ring(mol, bond) else {
                continue;
            };
            let mut key = chain.bonds.clone();
            key.sort_unstable();
            if seen.insert(key) {
                for &b in &chain.bonds {
                    covered[b] = true;
                }
                rings.push(Ring {
                    atoms: chain.atoms,
                    bonds: chain.bonds,
                });
            }
        }
        rings.sort_by_key(Ring::len);

        let mut atom_rings = vec![Vec::new(); mol.atom_count()];
        let mut bond_rings = vec![Vec::new(); mol.bond_count()];
        for (idx, r) in rings.iter().enumerate() {
            for &a in &r.atoms {
                atom_rings[a].push(idx);
            }
            for &b in &r.bonds {
                bond_rings[b].push(idx);
            }
        }
        Self {
            rings,
            atom_rings,
            bond_rings,
        }
    }
    pub fn len(&self) -> usize {
        self.rings.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }
    pub fn rings(&self) -> &[Ring] {
        &self.rings
    }
    pub fn ring(&self, idx: usize) -> &Ring {
        &self.rings[idx]
    }
    pub fn atom_rings(&self, atom: usize) -> &[usize] {
        self.atom_rings.get(atom).map_or(&[], Vec::as_slice)
    }
    pub fn bond_rings(&self, bond: usize) -> &[usize] {
        self.bond_rings.get(bond).map_or(&[], Vec::as_slice)
    }
}

fn small_cycles(
    mol: &Molecule,
    start: usize,
    path: &mut Vec<usize>,
    bonds: &mut Vec<usize>,
    out: &mut Vec<Ring>,
) {
    let Some(&current) = path.last() else {
        return;
    };
    let links: Vec<_> = mol.links(current).collect();
    for (next, bond) in links {
        if next == start && path.len() >= 3 {
            // each cycle is found twice, keep one direction
            if path[1] < path[path.len() - 1] {
                let mut ring_bonds = bonds.clone();
                ring_bonds.push(bond);
                out.push(Ring {
                    atoms: path.clone(),
                    bonds: ring_bonds,
                });
            }
        } else if next > start && path.len() < MAX_SMALL_RING && !path.contains(&next) {
            path.push(next);
            bonds.push(bond);
            small_cycles(mol, start, path, bonds, out);
            path.pop();
            bonds.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring_of(size: usize) -> Molecule {
        let mut b = Builder::new();
        let atoms: Vec<_> = (0..size).map(|_| b.add_atom(6)).collect();
        for i in 0..size {
            b.add_bond(atoms[i], atoms[(i + 1) % size], 1).unwrap();
        }
        b.finish()
    }

    #[test]
    fn naphthalene_has_two_small_rings_and_envelope() {
        let mut b = Builder::new();
        let a: Vec<_> = (0..10).map(|_| b.add_atom(6)).collect();
        for (s, e) in [(0, 1), (1, 2), (2, 3), (3, 4), (4, 5), (5, 0), (4, 6), (6, 7), (7, 8), (8, 9), (9, 5)] {
            b.add_bond(a[s], a[e], 1).unwrap();
        }
        let mol = b.finish();
        // the 10-ring envelope is only found when some bond is left uncovered
        assert_eq!(mol.rings().len(), 2);
        assert!(mol.rings().rings().iter().all(|r| r.len() == 6));
        assert_eq!(mol.rings().atom_rings(4).len(), 2);
        assert_eq!(mol.rings().bond_rings(10).len(), 1);
    }

    #[test]
    fn macrocycle_is_found() {
        let mol = ring_of(12);
        assert_eq!(mol.rings().len(), 1);
        let ring = mol.rings().ring(0);
        assert_eq!(ring.len(), 12);
        assert!(ring.is_macrocycle());
        for (i, &bond) in ring.bonds.iter().enumerate() {
            let b = mol.bond(bond);
            assert!(b.contains(ring.atoms[i]));
            assert!(b.contains(ring.atoms[(i + 1) % 12]));
        }
    }

    #[test]
    fn rings_sorted_by_size() {
        // cyclopropane fused with cyclohexane sharing one bond
        let mut b = Builder::new();
        let a: Vec<_> = (0..7).map(|_| b.add_atom(6)).collect();
        for i in 0..6 {
            b.add_bond(a[i], a[(i + 1) % 6], 1).unwrap();
        }
        b.add_bond(a[0], a[6], 1).unwrap();
        b.add_bond(a[1], a[6], 1).unwrap();
        let mol = b.finish();
        let sizes: Vec<_> = mol.rings().rings().iter().map(Ring::len).collect();
        assert_eq!(sizes, vec![3, 6, 7]);
        assert_eq!(mol.smallest_ring_size(6), Some(3));
        assert_eq!(mol.smallest_ring_size(3), Some(6));
        // 0 and 1 share all three rings, the smallest wins
        assert_eq!(mol.shared_ring(0, 1), Some(0));
        let envelope = mol.shared_ring(6, 3).unwrap();
        assert_eq!(mol.ring_size(envelope), 7);
    }
}
