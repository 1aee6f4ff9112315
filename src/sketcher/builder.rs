use super::*;
use crate::{Error, Result};

#[derive(Debug, Default)]
pub struct Builder {
    mol: Molecule,
}
impl Builder {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn add_atom(&mut self, atomic_number: u8) -> usize {
        self.mol.atoms.push(Atom::new(atomic_number));
        self.mol.atoms.len() - 1
    }
    pub fn add_charged_atom(&mut self, atomic_number: u8, charge: i8) -> usize {
        let idx = self.add_atom(atomic_number);
        self.mol.atoms[idx].charge = charge;
        idx
    }
    pub fn add_bond(&mut self, start: usize, end: usize, order: u8) -> Result<usize> {
        let count = self.mol.atoms.len();
        for index in [start, end] {
            if index >= count {
                return Err(Error::UnknownAtom { index, count });
            }
        }
        if start == end {
            return Err(Error::SelfBond(start));
        }
        self.mol.bonds.push(Bond::new(start, end, order));
        Ok(self.mol.bonds.len() - 1)
    }
    pub fn atom_mut(&mut self, atom: usize) -> &mut Atom {
        &mut self.mol.atoms[atom]
    }
    pub fn bond_mut(&mut self, bond: usize) -> &mut Bond {
        &mut self.mol.bonds[bond]
    }
    pub fn finish(mut self) -> Molecule {
        self.mol.demote_metal_bonds();
        self.mol.force_update_struct();
        self.mol
    }
}
