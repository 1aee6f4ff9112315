//! Joining the disjoint fragments left after fusion: metal-ligand bonds first, then opposite
//! charges, then whatever remains.

use super::*;
use super::fusion::replace_pair;
use tracing::debug;

pub const JOIN_DISTANCE_METAL_BOND: f32 = 1.2;
pub const JOIN_DISTANCE_CHARGED_ATOMS: f32 = 1.4;
pub const JOIN_DISTANCE_UNCHARGED_FRAGMENTS: f32 = 1.6;

fn fragment_of(fragments: &[Fragment], atom: usize) -> Option<usize> {
    fragments.iter().position(|f| f.contains(atom))
}

/// Arrange the two fragments of `assoc` and merge them. A fragment holding kept core atoms is
/// never moved.
fn combine(fragments: Vec<Fragment>, assoc: FragmentAssociation, distance: f32) -> Vec<Fragment> {
    let [i, j] = assoc.fragments();
    let assoc = if fragments[j].keep_marked_atoms && !fragments[i].keep_marked_atoms {
        assoc.reversed()
    } else {
        assoc
    };
    let [first, second] = assoc.fragments();
    let mut a = fragments[first].clone();
    let mut b = fragments[second].clone();
    let keep_first = a.keep_marked_atoms;
    assoc.arrange(&mut a, &mut b, distance, keep_first);
    replace_pair(fragments, i, j, a.merge(&b))
}

/// Join fragments connected by coordinative bonds, anchored on the bonded atoms.
pub fn join_metal_bonded(mol: &Molecule, mut fragments: Vec<Fragment>) -> Vec<Fragment> {
    let ends = |fragments: &[Fragment], bond: &Bond| -> Option<(usize, usize)> {
        if !bond.is_metal_ligand() {
            return None;
        }
        let pair = (fragment_of(fragments, bond.start)?, fragment_of(fragments, bond.end)?);
        (pair.0 != pair.1).then_some(pair)
    };
    while let Some((fi, fj)) = mol.bonds().iter().find_map(|b| ends(&fragments, b)) {
        let mut assoc = FragmentAssociation::new(fi, fj);
        for bond in mol.bonds() {
            let Some((a, b)) = ends(&fragments, bond) else {
                continue;
            };
            let sides = if (a, b) == (fi, fj) {
                [(0, bond.start), (1, bond.end)]
            } else if (a, b) == (fj, fi) {
                [(0, bond.end), (1, bond.start)]
            } else {
                continue;
            };
            for (side, atom) in sides {
                if let Some(p) = fragments[if side == 0 { fi } else { fj }].position(atom) {
                    assoc.add_point(side, p);
                }
            }
        }
        debug!(first = fi, second = fj, "joining over metal bonds");
        fragments = combine(fragments, assoc, JOIN_DISTANCE_METAL_BOND);
    }
    fragments
}

/// Charges left to pair up, after cancelling opposite charges inside each fragment. Query atoms
/// carry no charge.
fn charge_ledger(mol: &Molecule, fragments: &[Fragment]) -> Vec<i32> {
    let mut charge: Vec<i32> = mol
        .atoms()
        .iter()
        .map(|a| if a.query { 0 } else { a.charge as i32 })
        .collect();
    for f in fragments {
        let positive: i32 = f.atoms().iter().map(|&a| charge[a].max(0)).sum();
        let negative: i32 = f.atoms().iter().map(|&a| (-charge[a]).max(0)).sum();
        let (mut cancel_pos, mut cancel_neg) = (positive.min(negative), positive.min(negative));
        for &a in f.atoms() {
            if charge[a] > 0 {
                let take = charge[a].min(cancel_pos);
                charge[a] -= take;
                cancel_pos -= take;
            } else if charge[a] < 0 {
                let take = (-charge[a]).min(cancel_neg);
                charge[a] += take;
                cancel_neg -= take;
            }
        }
    }
    charge
}

/// Next donor/acceptor pair: an exact magnitude match if any (smallest first), otherwise the
/// largest remaining charge with the largest opposite one.
fn pick_charge_pair(charge: &[i32], fragments: &[Fragment]) -> Option<(usize, usize)> {
    let owner: Vec<Option<usize>> = (0..charge.len()).map(|a| fragment_of(fragments, a)).collect();
    let charged: Vec<usize> = (0..charge.len()).filter(|&a| charge[a] != 0 && owner[a].is_some()).collect();
    let apart = |a: usize, b: usize| owner[a] != owner[b];

    let exact = charged
        .iter()
        .filter(|&&p| charge[p] > 0)
        .flat_map(|&p| charged.iter().map(move |&n| (p, n)))
        .filter(|&(p, n)| charge[n] == -charge[p] && apart(p, n))
        .min_by_key(|&(p, n)| (charge[p], p, n));
    if exact.is_some() {
        return exact;
    }

    let mut donors = charged.clone();
    donors.sort_by_key(|&a| (std::cmp::Reverse(charge[a].abs()), a));
    donors.into_iter().find_map(|d| {
        charged
            .iter()
            .copied()
            .filter(|&a| charge[a].signum() == -charge[d].signum() && apart(a, d))
            .min_by_key(|&a| (std::cmp::Reverse(charge[a].abs()), a))
            .map(|a| (d, a))
    })
}

/// Join fragments carrying opposite net charges, anchored on the charged atoms.
pub fn join_charged(mol: &Molecule, mut fragments: Vec<Fragment>) -> Vec<Fragment> {
    let mut charge = charge_ledger(mol, &fragments);
    while let Some((a, b)) = pick_charge_pair(&charge, &fragments) {
        let (Some(fa), Some(fb)) = (fragment_of(&fragments, a), fragment_of(&fragments, b)) else {
            break;
        };
        let mut assoc = FragmentAssociation::new(fa, fb);
        if let (Some(pa), Some(pb)) = (fragments[fa].position(a), fragments[fb].position(b)) {
            assoc.add_point(0, pa);
            assoc.add_point(1, pb);
        }
        let used = charge[a].abs().min(charge[b].abs());
        charge[a] -= used * charge[a].signum();
        charge[b] -= used * charge[b].signum();
        debug!(donor = a, acceptor = b, charge = used, "joining charged fragments");
        fragments = combine(fragments, assoc, JOIN_DISTANCE_CHARGED_ATOMS);
    }
    fragments
}

/// Join everything else, first two fragments at a time.
pub fn join_remaining(mut fragments: Vec<Fragment>, strategy: LeftoverJoin) -> Vec<Fragment> {
    while fragments.len() > 1 {
        fragments = match strategy {
            LeftoverJoin::Associate => {
                let assoc = FragmentAssociation::with_centroids(&fragments, 0, 1);
                combine(fragments, assoc, JOIN_DISTANCE_UNCHARGED_FRAGMENTS)
            }
            LeftoverJoin::Pack => {
                let (first, second) = if fragments[1].keep_marked_atoms && !fragments[0].keep_marked_atoms {
                    (1, 0)
                } else {
                    (0, 1)
                };
                let mut moved = fragments[second].clone();
                fragments[first].arrange_with(&mut moved, JOIN_DISTANCE_UNCHARGED_FRAGMENTS);
                let merged = fragments[first].merge(&moved);
                replace_pair(fragments, 0, 1, merged)
            }
        };
    }
    fragments
}
