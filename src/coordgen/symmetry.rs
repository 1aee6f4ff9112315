//! Graph symmetry classes.
//!
//! Atoms start out ranked by element, charge, degree, ring membership and the E/Z parity of
//! their double bonds. Each round re-ranks every atom by its own rank and the sorted ranks of
//! its neighbours, until the number of classes stops growing. Equal final ranks mean the atoms
//! cannot be told apart by the layout.

use super::*;

fn consolidate<K: Ord + Clone>(keys: &[K]) -> (Vec<u32>, usize) {
    let mut ordered = keys.to_vec();
    ordered.sort();
    ordered.dedup();
    let ranks = keys
        .iter()
        .map(|k| ordered.binary_search(k).map_or(0, |i| i as u32 + 1))
        .collect();
    (ranks, ordered.len())
}

pub fn symmetry_ranks(mol: &Molecule) -> Vec<u32> {
    let seeds: Vec<(u8, i8, usize, bool, u8)> = (0..mol.atom_count())
        .map(|a| {
            let atom = mol.atom(a);
            let parity = mol
                .links(a)
                .map(|(_, b)| match mol.bond(b) {
                    bond if bond.is_stereo() => match bond.stereo.stereo {
                        Stereo::Cis => 1,
                        _ => 2,
                    },
                    _ => 0,
                })
                .max()
                .unwrap_or(0);
            (atom.atomic_number, atom.charge, mol.degree(a), mol.is_ring_atom(a), parity)
        })
        .collect();
    let (mut ranks, mut classes) = consolidate(&seeds);
    loop {
        let signatures: Vec<(u32, Vec<u32>)> = (0..mol.atom_count())
            .map(|a| {
                let mut around: Vec<u32> = mol.links(a).map(|(n, _)| ranks[n]).collect();
                around.sort_unstable();
                (ranks[a], around)
            })
            .collect();
        let (new_ranks, new_classes) = consolidate(&signatures);
        if new_classes <= classes {
            break;
        }
        ranks = new_ranks;
        classes = new_classes;
    }
    ranks
}
