//! Discovery of the initial fragments.
//!
//! Rules run in a fixed order and each one only claims bonds that no earlier rule claimed:
//! core, templates, hubs, rings, linear runs, quaternary centres, then chains and isolated
//! atoms once the first fusion pass is done.

use super::*;
use tracing::debug;

pub const PRIORITY_CORE: u32 = 1 << 20;
pub const PRIORITY_TEMPLATE: u32 = 1 << 18;
/// Rings get this minus their size, so smaller rings win.
pub const PRIORITY_RING: u32 = 1 << 12;
pub const PRIORITY_LINEAR: u32 = 1 << 10;
pub const PRIORITY_HUB: u32 = 1 << 9;
pub const PRIORITY_QUATERNARY: u32 = 1 << 8;
/// Chains get their atom count, capped below the quaternary priority.
const MAX_CHAIN_PRIORITY: u32 = PRIORITY_QUATERNARY - 1;

/// Atoms already placed in some fragment and bonds already laid out by one.
#[derive(Debug, Clone)]
pub struct Handled {
    pub atoms: Vec<bool>,
    pub bonds: Vec<bool>,
}
impl Handled {
    pub fn new(mol: &Molecule) -> Self {
        Self {
            atoms: vec![false; mol.atom_count()],
            bonds: vec![false; mol.bond_count()],
        }
    }
    pub fn mark(&mut self, found: &Discovered) {
        for &a in found.fragment.atoms() {
            self.atoms[a] = true;
        }
        for &b in &found.bonds {
            self.bonds[b] = true;
        }
    }
    fn all_bonds(&self, bonds: &[usize]) -> bool {
        bonds.iter().all(|&b| self.bonds[b])
    }
    fn any_bond(&self, bonds: impl IntoIterator<Item = usize>) -> bool {
        bonds.into_iter().any(|b| self.bonds[b])
    }
}

/// A new fragment and the bonds whose geometry it fixes.
#[derive(Debug, Clone)]
pub struct Discovered {
    pub fragment: Fragment,
    pub bonds: Vec<usize>,
}

/// The marked atoms at their input coordinates, scaled to unit bond length. The fragment keeps
/// its marked atoms in both core modes; only the last-resort flips and nudges may move them.
#[derive(Debug, Clone)]
pub struct CoreLayout {
    pub found: Discovered,
    /// Mean length of bonds between marked atoms in the input.
    pub bond_length: f32,
    pub original: Vec<(usize, PointF)>,
}

pub fn core_fragment(mol: &Molecule, default_bond_length: f32) -> Option<CoreLayout> {
    let atoms: Vec<usize> = (0..mol.atom_count()).filter(|&a| mol.atom(a).marked).collect();
    if atoms.is_empty() {
        return None;
    }
    let bonds: Vec<usize> = (0..mol.bond_count())
        .filter(|&b| {
            let bond = mol.bond(b);
            !bond.is_metal_ligand() && mol.atom(bond.start).marked && mol.atom(bond.end).marked
        })
        .collect();
    let measured = bonds
        .iter()
        .map(|&b| mol.coordinates(mol.bond(b).start).distance(mol.coordinates(mol.bond(b).end)))
        .sum::<f32>()
        / bonds.len().max(1) as f32;
    let bond_length = if measured > crate::EPSILON { measured } else { default_bond_length };
    let original: Vec<(usize, PointF)> = atoms.iter().map(|&a| (a, mol.coordinates(a))).collect();
    let coords = original.iter().map(|&(_, p)| p / bond_length).collect();
    let mut fragment = Fragment::new(atoms, coords, PRIORITY_CORE);
    fragment.keep_marked_atoms = true;
    Some(CoreLayout {
        found: Discovered { fragment, bonds },
        bond_length,
        original,
    })
}

/// A template match, with the template coordinates per atom when it pins the orientation.
#[derive(Debug, Clone)]
pub struct TemplateHit {
    pub found: Discovered,
    pub pin: Option<Vec<(usize, PointF)>>,
}

/// Non-overlapping matches of every template, in list order, avoiding handled atoms.
pub fn template_fragments<'t>(
    mol: &Molecule,
    templates: impl IntoIterator<Item = &'t Template>,
    handled: &Handled,
) -> Vec<TemplateHit> {
    let fingerprint = FragmentFingerprint::of(mol);
    let mut excluded = handled.atoms.clone();
    let mut hits = Vec::new();
    for template in templates {
        if !fingerprint.may_contain(template.fingerprint()) {
            continue;
        }
        while let Some(mapping) = mol.substructure_match(template.molecule(), &excluded) {
            for &a in &mapping {
                excluded[a] = true;
            }
            let bonds = template
                .molecule()
                .bonds()
                .iter()
                .filter_map(|b| mol.bond_between(mapping[b.start], mapping[b.end]))
                .collect();
            let pin = template
                .is_absolute_orientation()
                .then(|| mapping.iter().copied().zip(template.coordinates().iter().copied()).collect());
            debug!(atoms = mapping.len(), "template matched");
            let fragment = Fragment::new(mapping, template.coordinates().to_vec(), PRIORITY_TEMPLATE);
            hits.push(TemplateHit {
                found: Discovered { fragment, bonds },
                pin,
            });
        }
    }
    hits
}

/// Stars for atoms with more than four covalent neighbours.
pub fn hub_fragments(mol: &Molecule, handled: &Handled) -> Vec<Discovered> {
    (0..mol.atom_count())
        .filter(|&a| mol.degree(a) > 4)
        .filter_map(|a| {
            let (neighbors, bonds): (Vec<usize>, Vec<usize>) = mol.links(a).unzip();
            if handled.all_bonds(&bonds) {
                return None;
            }
            let atoms = std::iter::once(a).chain(neighbors).collect();
            let fragment = Fragment::new(atoms, builder::star(bonds.len()), PRIORITY_HUB);
            Some(Discovered { fragment, bonds })
        })
        .collect()
}

/// One fragment per elementary ring. A ring is skipped when its bonds are all handled or every
/// one of its atoms already belongs to a smaller ring.
pub fn ring_fragments(mol: &Molecule, handled: &Handled) -> Vec<Discovered> {
    let rings = mol.rings();
    let mut out = Vec::new();
    let mut claimed = handled.bonds.clone();
    for ring in rings.rings() {
        if ring.bonds.iter().all(|&b| claimed[b]) {
            continue;
        }
        let n = ring.len();
        let composite = ring
            .atoms
            .iter()
            .all(|&a| mol.smallest_ring_size(a).is_some_and(|s| s < n));
        if composite {
            continue;
        }
        let coords = if ring.is_macrocycle() {
            large_ring::layout(&large_ring::ring_constraints(mol, ring))
        } else {
            builder::regular_polygon(n)
        };
        for &b in &ring.bonds {
            claimed[b] = true;
        }
        let priority = PRIORITY_RING.saturating_sub(n as u32);
        out.push(Discovered {
            fragment: Fragment::new(ring.atoms.clone(), coords, priority),
            bonds: ring.bonds.clone(),
        });
    }
    out
}

fn is_sp(mol: &Molecule, atom: usize) -> bool {
    if mol.is_ring_atom(atom) || mol.degree(atom) != 2 {
        return false;
    }
    let orders: Vec<u8> = mol.links(atom).map(|(_, b)| mol.bond(b).bond_order).collect();
    orders.contains(&3) || orders == [2, 2]
}

/// Walk from `from` through `next` along sp atoms, returning the atoms and bonds up to and
/// including the first non-sp atom.
fn sp_walk(mol: &Molecule, mut from: usize, mut next: usize, seen: &mut [bool]) -> (Vec<usize>, Vec<usize>) {
    let mut atoms = Vec::new();
    let mut bonds = Vec::new();
    loop {
        if let Some(b) = mol.bond_between(from, next) {
            bonds.push(b);
        }
        atoms.push(next);
        if !is_sp(mol, next) || seen[next] {
            break;
        }
        seen[next] = true;
        let Some(after) = mol.links(next).map(|(n, _)| n).find(|&n| n != from) else {
            break;
        };
        from = next;
        next = after;
    }
    (atoms, bonds)
}

/// Straight runs through triple bonds and cumulated double bonds, with the substituents of
/// non-ring end atoms splayed at 120°.
pub fn linear_fragments(mol: &Molecule, handled: &Handled) -> Vec<Discovered> {
    let mut seen = vec![false; mol.atom_count()];
    let mut out = Vec::new();
    for atom in 0..mol.atom_count() {
        if seen[atom] || !is_sp(mol, atom) {
            continue;
        }
        seen[atom] = true;
        let ends: Vec<usize> = mol.links(atom).map(|(n, _)| n).collect();
        let [left, right] = ends.as_slice() else {
            continue;
        };
        let (mut run, mut bonds) = sp_walk(mol, atom, *left, &mut seen);
        run.reverse();
        bonds.reverse();
        run.push(atom);
        let (tail, tail_bonds) = sp_walk(mol, atom, *right, &mut seen);
        run.extend(tail);
        bonds.extend(tail_bonds);
        if handled.all_bonds(&bonds) || run.first() == run.last() {
            continue;
        }

        let substituents = |end: usize, inner: usize| -> Vec<(usize, usize)> {
            if mol.is_ring_atom(end) {
                return Vec::new();
            }
            let subs: Vec<(usize, usize)> = mol
                .links(end)
                .filter(|&(n, _)| n != inner && !run.contains(&n))
                .collect();
            if subs.len() <= 3 {
                subs
            } else {
                Vec::new()
            }
        };
        let n = run.len();
        let start_subs = substituents(run[0], run[1]);
        let end_subs = substituents(run[n - 1], run[n - 2]);
        let (mut coords, start_pos, end_pos) = builder::linear_run(n, start_subs.len(), end_subs.len());
        let mut atoms = run.clone();
        for (&(a, b), p) in start_subs.iter().chain(&end_subs).zip(start_pos.into_iter().chain(end_pos)) {
            if atoms.contains(&a) {
                continue;
            }
            atoms.push(a);
            coords.push(p);
            bonds.push(b);
        }
        out.push(Discovered {
            fragment: Fragment::new(atoms, coords, PRIORITY_LINEAR),
            bonds,
        });
    }
    out
}

/// Cross or tee motifs for non-ring atoms with four neighbours, two or three of them terminal.
pub fn quaternary_fragments(mol: &Molecule, handled: &Handled) -> Vec<Discovered> {
    let mut claimed = handled.clone();
    let mut out = Vec::new();
    for atom in 0..mol.atom_count() {
        if mol.is_ring_atom(atom) || mol.degree(atom) != 4 {
            continue;
        }
        if claimed.any_bond(mol.links(atom).map(|(_, b)| b)) {
            continue;
        }
        let (terminal, non_terminal): (Vec<(usize, usize)>, Vec<(usize, usize)>) =
            mol.links(atom).partition(|&(n, _)| mol.degree(n) == 1);
        if !(2..=3).contains(&terminal.len()) {
            continue;
        }
        let coords = builder::quaternary_motif(non_terminal.len(), terminal.len());
        let ordered: Vec<(usize, usize)> = non_terminal.into_iter().chain(terminal).collect();
        let atoms = std::iter::once(atom).chain(ordered.iter().map(|&(n, _)| n)).collect();
        let found = Discovered {
            fragment: Fragment::new(atoms, coords, PRIORITY_QUATERNARY),
            bonds: ordered.iter().map(|&(_, b)| b).collect(),
        };
        claimed.mark(&found);
        out.push(found);
    }
    out
}

/// The longest chain of unhandled bonds, as a zig-zag.
pub fn chain_fragment(mol: &Molecule, handled: &Handled) -> Option<Discovered> {
    let chain = Chain::longest_unhandled(mol, &handled.atoms, &handled.bonds)?;
    let priority = (chain.len() as u32).min(MAX_CHAIN_PRIORITY);
    let coords = builder::zigzag(chain.len());
    Some(Discovered {
        fragment: Fragment::new(chain.atoms, coords, priority),
        bonds: chain.bonds,
    })
}

/// Single-atom fragments for atoms no other rule placed.
pub fn isolated_atoms(mol: &Molecule, handled: &Handled) -> Vec<Discovered> {
    (0..mol.atom_count())
        .filter(|&a| !handled.atoms[a])
        .map(|a| Discovered {
            fragment: Fragment::single_atom(a),
            bonds: Vec::new(),
        })
        .collect()
}
