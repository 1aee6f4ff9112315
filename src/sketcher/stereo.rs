//! Reading stereo parities back from 2D coordinates, and choosing wedges for stereo centres.

use super::*;

impl Molecule {
    /// Resolved reference atoms of a double bond: explicit ones if set, otherwise the
    /// lowest-indexed covalent neighbour on each side.
    pub fn stereo_references(&self, bond: usize) -> Option<(usize, usize)> {
        let b = &self.bonds[bond];
        let pick = |center: usize, partner: usize, explicit: Option<usize>| {
            explicit
                .filter(|&a| a != partner && self.bond_between(center, a).is_some())
                .or_else(|| self.links(center).map(|(n, _)| n).filter(|&n| n != partner).min())
        };
        Some((
            pick(b.start, b.end, b.stereo.atom1)?,
            pick(b.end, b.start, b.stereo.atom2)?,
        ))
    }

    /// Cis/trans relation of the reference atoms of a double bond in the current coordinates.
    pub fn geometric_stereo(&self, bond: usize) -> Stereo {
        let Some((r1, r2)) = self.stereo_references(bond) else {
            return Stereo::Unspecified;
        };
        let b = &self.bonds[bond];
        let (s, e) = (self.coordinates(b.start), self.coordinates(b.end));
        let side1 = math::side_of_line(self.coordinates(r1), s, e);
        let side2 = math::side_of_line(self.coordinates(r2), s, e);
        if side1.abs() < crate::EPSILON || side2.abs() < crate::EPSILON {
            Stereo::Unspecified
        } else if side1 * side2 > 0.0 {
            Stereo::Cis
        } else {
            Stereo::Trans
        }
    }

    /// Tetrahedral parity implied by the coordinates and the wedges on the centre's bonds.
    pub fn geometric_chirality(&self, atom: usize) -> Chirality {
        self.chirality_with(atom, None)
    }

    /// Same as [`Self::geometric_chirality`], pretending `trial` is the only wedge at the centre.
    fn chirality_with(&self, atom: usize, trial: Option<(usize, Wedge)>) -> Chirality {
        let center = self.coordinates(atom);
        let mut neighbors: Vec<(usize, usize)> = self.links(atom).collect();
        if !(3..=4).contains(&neighbors.len()) {
            return Chirality::Unspecified;
        }
        neighbors.sort_unstable();
        let mut vectors: Vec<[f32; 3]> = neighbors
            .iter()
            .map(|&(n, bond)| {
                let wedge = match trial {
                    Some((b, w)) if b == bond => w,
                    Some(_) => Wedge::None,
                    None => self.bonds[bond].wedge,
                };
                let z = match wedge {
                    Wedge::Up(c) if c == atom => 1.0,
                    Wedge::Down(c) if c == atom => -1.0,
                    _ => 0.0,
                };
                let v = (self.coordinates(n) - center).normalized();
                [v.0, v.1, z]
            })
            .collect();
        if vectors.len() == 3 {
            let implicit = [0, 1, 2].map(|k| -vectors.iter().map(|v| v[k]).sum::<f32>());
            vectors.push(implicit);
        }
        let d = |i: usize, k: usize| vectors[i][k] - vectors[3][k];
        let det = d(0, 0) * (d(1, 1) * d(2, 2) - d(1, 2) * d(2, 1))
            - d(0, 1) * (d(1, 0) * d(2, 2) - d(1, 2) * d(2, 0))
            + d(0, 2) * (d(1, 0) * d(2, 1) - d(1, 1) * d(2, 0));
        if det.abs() < crate::EPSILON {
            Chirality::Unspecified
        } else if det < 0.0 {
            Chirality::Clockwise
        } else {
            Chirality::CounterClockwise
        }
    }

    /// Put one up or down wedge on a bond of every specified stereo centre so the drawing
    /// carries its parity.
    pub fn assign_wedges(&mut self) {
        for b in &mut self.bonds {
            b.wedge = Wedge::None;
        }
        for atom in 0..self.atoms.len() {
            let wanted = self.atoms[atom].chirality;
            if wanted == Chirality::Unspecified {
                continue;
            }
            let mut candidates: Vec<(usize, usize)> = self
                .links(atom)
                .filter(|&(_, b)| self.bonds[b].bond_order == 1 && self.bonds[b].wedge == Wedge::None)
                .collect();
            candidates.sort_by_key(|&(n, b)| {
                (
                    self.is_ring_bond(b),
                    self.atoms[n].chirality != Chirality::Unspecified,
                    self.degree(n),
                    n,
                )
            });
            for (_, bond) in candidates {
                let up = self.chirality_with(atom, Some((bond, Wedge::Up(atom))));
                if up == Chirality::Unspecified {
                    continue;
                }
                self.bonds[bond].wedge = if up == wanted {
                    Wedge::Up(atom)
                } else {
                    Wedge::Down(atom)
                };
                break;
            }
        }
    }
}
