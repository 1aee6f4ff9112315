//! Connectivity-only substructure search used to place templates.
//!
//! Atoms match on atomic number, bonds match on presence regardless of order. Target atoms
//! flagged in `excluded` are never used, which lets callers keep matches disjoint.

use super::*;

/// Query atom index -> target atom index.
pub type AtomMapping = Vec<usize>;

impl Molecule {
    pub fn substructure_match(&self, query: &Molecule, excluded: &[bool]) -> Option<AtomMapping> {
        let mut results = Vec::new();
        Vf2::new(self, query, excluded).recurse(0, &mut results, 1);
        results.pop()
    }
    pub fn substructure_matches(
        &self,
        query: &Molecule,
        excluded: &[bool],
        limit: usize,
    ) -> Vec<AtomMapping> {
        let mut results = Vec::new();
        if limit > 0 {
            Vf2::new(self, query, excluded).recurse(0, &mut results, limit);
        }
        results
    }
}

struct Vf2<'a> {
    target: &'a Molecule,
    query: &'a Molecule,
    excluded: &'a [bool],
    /// Query atoms in visiting order, each with an earlier neighbour to extend from.
    query_order: Vec<(usize, Option<usize>)>,
    query_map: Vec<Option<usize>>,
    target_used: Vec<bool>,
}

impl<'a> Vf2<'a> {
    fn new(target: &'a Molecule, query: &'a Molecule, excluded: &'a [bool]) -> Self {
        let n = query.atom_count();
        let mut seeds: Vec<usize> = (0..n).collect();
        seeds.sort_by(|&a, &b| query.degree(b).cmp(&query.degree(a)));
        let mut placed = vec![false; n];
        let mut query_order = Vec::with_capacity(n);
        for seed in seeds {
            if placed[seed] {
                continue;
            }
            placed[seed] = true;
            let first = query_order.len();
            query_order.push((seed, None));
            let mut head = first;
            while head < query_order.len() {
                let (current, _) = query_order[head];
                head += 1;
                for (next, _) in query.links(current) {
                    if !placed[next] {
                        placed[next] = true;
                        query_order.push((next, Some(current)));
                    }
                }
            }
        }
        Self {
            target,
            query,
            excluded,
            query_order,
            query_map: vec![None; n],
            target_used: vec![false; target.atom_count()],
        }
    }

    fn recurse(&mut self, depth: usize, results: &mut Vec<AtomMapping>, limit: usize) {
        if depth == self.query_order.len() {
            results.push(self.query_map.iter().flatten().copied().collect());
            return;
        }
        let (query_node, parent) = self.query_order[depth];
        let candidates: Vec<usize> = match parent.and_then(|p| self.query_map[p]) {
            Some(anchor) => self.target.links(anchor).map(|(n, _)| n).collect(),
            None => (0..self.target.atom_count()).collect(),
        };
        for target_node in candidates {
            if !self.is_feasible(query_node, target_node) {
                continue;
            }
            self.query_map[query_node] = Some(target_node);
            self.target_used[target_node] = true;
            self.recurse(depth + 1, results, limit);
            self.query_map[query_node] = None;
            self.target_used[target_node] = false;
            if results.len() >= limit {
                return;
            }
        }
    }

    fn is_feasible(&self, query_node: usize, target_node: usize) -> bool {
        if self.target_used[target_node] || self.excluded.get(target_node).copied().unwrap_or(false) {
            return false;
        }
        let q = self.query.atom(query_node);
        let t = self.target.atom(target_node);
        if q.atomic_number != t.atomic_number {
            return false;
        }
        if self.target.degree(target_node) < self.query.degree(query_node) {
            return false;
        }
        self.query.links(query_node).all(|(q_nbr, _)| match self.query_map[q_nbr] {
            Some(t_nbr) => self
                .target
                .bond_between(target_node, t_nbr)
                .is_some_and(|b| !self.target.bond(b).is_metal_ligand()),
            None => true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cyclohexane_with_methyl() -> Molecule {
        let mut b = Builder::new();
        let a: Vec<_> = (0..7).map(|_| b.add_atom(6)).collect();
        for i in 0..6 {
            b.add_bond(a[i], a[(i + 1) % 6], 1).unwrap();
        }
        b.add_bond(a[0], a[6], 1).unwrap();
        b.finish()
    }

    fn cyclopropane() -> Molecule {
        let mut b = Builder::new();
        let a: Vec<_> = (0..3).map(|_| b.add_atom(6)).collect();
        b.add_bond(a[0], a[1], 1).unwrap();
        b.add_bond(a[1], a[2], 2).unwrap();
        b.add_bond(a[2], a[0], 1).unwrap();
        b.finish()
    }

    #[test]
    fn ring_found_ignoring_bond_order() {
        let target = cyclohexane_with_methyl();
        let mut b = Builder::new();
        let a: Vec<_> = (0..6).map(|_| b.add_atom(6)).collect();
        for i in 0..6 {
            b.add_bond(a[i], a[(i + 1) % 6], if i % 2 == 0 { 2 } else { 1 }).unwrap();
        }
        let query = b.finish();
        let m = target.substructure_match(&query, &[]).unwrap();
        assert_eq!(m.len(), 6);
        assert!(!m.contains(&6));
        assert_eq!(target.substructure_matches(&query, &[], 100).len(), 12);
    }

    #[test]
    fn no_match_for_missing_ring() {
        assert!(cyclohexane_with_methyl().substructure_match(&cyclopropane(), &[]).is_none());
    }

    #[test]
    fn excluded_atoms_are_skipped() {
        let target = cyclohexane_with_methyl();
        let mut b = Builder::new();
        let c0 = b.add_atom(6);
        let c1 = b.add_atom(6);
        b.add_bond(c0, c1, 1).unwrap();
        let query = b.finish();
        let mut excluded = vec![true; 7];
        excluded[0] = false;
        excluded[6] = false;
        let m = target.substructure_match(&query, &excluded).unwrap();
        let mut sorted = m.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 6]);
    }
}
