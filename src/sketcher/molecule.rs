use super::*;

/// Index arena holding atoms, bonds and the perceived ring set.
///
/// Adjacency and rings are derived data; [`Molecule::force_update_struct`] rebuilds them after
/// the atom or bond lists change.
#[derive(Debug, Default, Clone)]
pub struct Molecule {
    pub(crate) atoms: Vec<Atom>,
    pub(crate) bonds: Vec<Bond>,
    pub(crate) rings: RingSet,
}
impl Molecule {
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }
    pub fn bond_count(&self) -> usize {
        self.bonds.len()
    }
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }
    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }
    pub fn atom(&self, atom: usize) -> &Atom {
        &self.atoms[atom]
    }
    pub fn atom_mut(&mut self, atom: usize) -> &mut Atom {
        &mut self.atoms[atom]
    }
    pub fn bond(&self, bond: usize) -> &Bond {
        &self.bonds[bond]
    }
    pub fn bond_mut(&mut self, bond: usize) -> &mut Bond {
        &mut self.bonds[bond]
    }
    pub fn rings(&self) -> &RingSet {
        &self.rings
    }
    pub fn coordinates(&self, atom: usize) -> PointF {
        self.atoms[atom].coordinates
    }

    /// Covalent neighbours of an atom with the connecting bond, skipping metal-ligand bonds.
    pub fn links(&self, atom: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
        let a = &self.atoms[atom];
        a.neighbors
            .iter()
            .zip(&a.bonds)
            .filter(|(_, &b)| !self.bonds[b].is_metal_ligand())
            .map(|(&n, &b)| (n, b))
    }
    /// Number of covalent neighbours.
    pub fn degree(&self, atom: usize) -> usize {
        self.links(atom).count()
    }
    pub fn bond_between(&self, a: usize, b: usize) -> Option<usize> {
        let atom = &self.atoms[a];
        atom.neighbors
            .iter()
            .position(|&n| n == b)
            .map(|i| atom.bonds[i])
    }
    pub fn is_ring_atom(&self, atom: usize) -> bool {
        !self.rings.atom_rings(atom).is_empty()
    }
    pub fn is_ring_bond(&self, bond: usize) -> bool {
        !self.rings.bond_rings(bond).is_empty()
    }
    pub fn ring_size(&self, ring: usize) -> usize {
        self.rings.ring(ring).len()
    }
    /// Size of the smallest ring containing the atom.
    pub fn smallest_ring_size(&self, atom: usize) -> Option<usize> {
        self.rings.atom_rings(atom).iter().map(|&r| self.ring_size(r)).min()
    }
    /// Smallest ring containing both atoms.
    pub fn shared_ring(&self, a: usize, b: usize) -> Option<usize> {
        self.rings
            .atom_rings(a)
            .iter()
            .copied()
            .filter(|r| self.rings.atom_rings(b).contains(r))
            .min_by_key(|&r| (self.ring_size(r), r))
    }

    /// Mean length of covalent bonds in the current coordinates, or `None` without bonds.
    pub fn average_bond_length(&self) -> Option<f32> {
        let (sum, count) = self
            .bonds
            .iter()
            .filter(|b| !b.is_metal_ligand())
            .fold((0.0, 0), |(s, c), b| {
                (s + self.coordinates(b.start).distance(self.coordinates(b.end)), c + 1)
            });
        (count > 0).then(|| sum / count as f32)
    }

    pub fn force_update_struct(&mut self) {
        for a in &mut self.atoms {
            a.bonds.clear();
            a.neighbors.clear();
        }
        for (idx, b) in self.bonds.iter().enumerate() {
            self.atoms[b.start].bonds.push(idx);
            self.atoms[b.start].neighbors.push(b.end);
            self.atoms[b.end].bonds.push(idx);
            self.atoms[b.end].neighbors.push(b.start);
        }
        self.rings = RingSet::perceive(self);
    }

    /// Single and double bonds between a metal and a non-terminal partner become coordinative.
    pub(crate) fn demote_metal_bonds(&mut self) {
        let mut degree = vec![0usize; self.atoms.len()];
        for b in &self.bonds {
            degree[b.start] += 1;
            degree[b.end] += 1;
        }
        for b in &mut self.bonds {
            if !(1..=2).contains(&b.bond_order) || degree[b.start] == 1 || degree[b.end] == 1 {
                continue;
            }
            if Atom::is_metal(self.atoms[b.start].atomic_number)
                || Atom::is_metal(self.atoms[b.end].atomic_number)
            {
                b.bond_order = 0;
            }
        }
    }

    /// Drop plain hydrogens with at most one neighbour, returning how many were removed.
    ///
    /// Stereo annotations that referenced a removed hydrogen are rewritten against the
    /// remaining atoms so their meaning survives the renumbering.
    pub fn remove_explicit_hydrogens(&mut self) -> usize {
        let remove: Vec<bool> = self
            .atoms
            .iter()
            .map(|a| a.is_plain_hydrogen() && a.neighbors.len() <= 1)
            .collect();
        let removed = remove.iter().filter(|&&r| r).count();
        if removed == 0 {
            return 0;
        }

        for bond in 0..self.bonds.len() {
            if !self.bonds[bond].is_stereo() {
                continue;
            }
            let Some((mut r1, mut r2)) = self.stereo_references(bond) else {
                continue;
            };
            let (start, end) = (self.bonds[bond].start, self.bonds[bond].end);
            let mut stereo = self.bonds[bond].stereo.stereo;
            for (reference, center, partner) in [(&mut r1, start, end), (&mut r2, end, start)] {
                if !remove[*reference] {
                    continue;
                }
                let replacement = self
                    .links(center)
                    .map(|(n, _)| n)
                    .find(|&n| n != partner && n != *reference && !remove[n]);
                match replacement {
                    Some(n) => {
                        *reference = n;
                        stereo = stereo.inverted();
                    }
                    None => stereo = Stereo::Unspecified,
                }
            }
            self.bonds[bond].stereo = StereoInfo {
                atom1: Some(r1),
                atom2: Some(r2),
                stereo,
            };
        }

        for atom in 0..self.atoms.len() {
            if remove[atom] || self.atoms[atom].chirality == Chirality::Unspecified {
                continue;
            }
            let mut neighbors: Vec<usize> = self.links(atom).map(|(n, _)| n).collect();
            neighbors.sort_unstable();
            let dropped: Vec<usize> = (0..neighbors.len()).filter(|&i| remove[neighbors[i]]).collect();
            match (neighbors.len(), dropped.as_slice()) {
                (_, []) => {}
                (4, &[k]) => {
                    // the hydrogen moves to the highest slot
                    if (3 - k) % 2 == 1 {
                        self.atoms[atom].chirality = self.atoms[atom].chirality.inverted();
                    }
                }
                _ => self.atoms[atom].chirality = Chirality::Unspecified,
            }
        }

        let mut new_index = vec![None; self.atoms.len()];
        let mut next = 0;
        for (i, &r) in remove.iter().enumerate() {
            if !r {
                new_index[i] = Some(next);
                next += 1;
            }
        }
        let mut idx = 0;
        self.atoms.retain(|_| {
            idx += 1;
            !remove[idx - 1]
        });
        let bonds = std::mem::take(&mut self.bonds);
        self.bonds = bonds
            .into_iter()
            .filter_map(|mut b| {
                b.start = new_index[b.start]?;
                b.end = new_index[b.end]?;
                b.stereo.atom1 = b.stereo.atom1.and_then(|a| new_index[a]);
                b.stereo.atom2 = b.stereo.atom2.and_then(|a| new_index[a]);
                b.wedge = match b.wedge {
                    Wedge::Up(c) => new_index[c].map_or(Wedge::None, Wedge::Up),
                    Wedge::Down(c) => new_index[c].map_or(Wedge::None, Wedge::Down),
                    Wedge::None => Wedge::None,
                };
                Some(b)
            })
            .collect();
        self.force_update_struct();
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hydrogen_removal_keeps_chirality_meaning() {
        // C0 with H1, F2, Cl3, Br4: the hydrogen is the lowest neighbour
        let mut b = Builder::new();
        let c = b.add_atom(6);
        let h = b.add_atom(1);
        let f = b.add_atom(9);
        let cl = b.add_atom(17);
        let br = b.add_atom(35);
        for n in [h, f, cl, br] {
            b.add_bond(c, n, 1).unwrap();
        }
        b.atom_mut(c).chirality = Chirality::Clockwise;
        let mut mol = b.finish();
        assert_eq!(mol.remove_explicit_hydrogens(), 1);
        assert_eq!(mol.atom_count(), 4);
        assert_eq!(mol.bond_count(), 3);
        // moving H from slot 0 to slot 3 is an odd permutation
        assert_eq!(mol.atom(0).chirality, Chirality::CounterClockwise);
    }

    #[test]
    fn metal_bonds_between_non_terminal_atoms_are_demoted() {
        let mut b = Builder::new();
        let fe = b.add_atom(26);
        let c1 = b.add_atom(6);
        let c2 = b.add_atom(6);
        let cl = b.add_atom(17);
        b.add_bond(c1, c2, 1).unwrap();
        b.add_bond(fe, c1, 1).unwrap();
        b.add_bond(fe, c2, 1).unwrap();
        b.add_bond(fe, cl, 1).unwrap();
        let mol = b.finish();
        assert!(mol.bond(1).is_metal_ligand());
        assert!(mol.bond(2).is_metal_ligand());
        assert!(!mol.bond(3).is_metal_ligand());
        assert_eq!(mol.rings().len(), 0);
        assert_eq!(mol.degree(fe), 1);
    }
}
