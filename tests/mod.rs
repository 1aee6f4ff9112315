use coordinvent_rs::prelude::*;

fn molecule(atoms: &[(u8, i8)], bonds: &[(usize, usize, u8)]) -> Molecule {
    let mut b = Builder::new();
    for &(z, charge) in atoms {
        b.add_charged_atom(z, charge);
    }
    for &(s, e, order) in bonds {
        b.add_bond(s, e, order).unwrap();
    }
    b.finish()
}

fn neutral(atoms: &[u8]) -> Vec<(u8, i8)> {
    atoms.iter().map(|&z| (z, 0)).collect()
}

fn invent_with(mol: &mut Molecule, config: InventorConfig) {
    CoordinateInventor::new(config).invent(mol);
}

fn invent(mol: &mut Molecule) {
    invent_with(mol, InventorConfig::default().with_seed(42));
}

fn distance(mol: &Molecule, a: usize, b: usize) -> f32 {
    mol.atom(a).coordinates.distance(mol.atom(b).coordinates)
}

fn closest_between(mol: &Molecule, left: &[usize], right: &[usize]) -> f32 {
    left.iter()
        .flat_map(|&a| right.iter().map(move |&b| (a, b)))
        .map(|(a, b)| distance(mol, a, b))
        .fold(f32::INFINITY, f32::min)
}

fn pair_distances(points: &[PointF]) -> Vec<f32> {
    let mut d: Vec<f32> = (0..points.len())
        .flat_map(|i| (i + 1..points.len()).map(move |j| (i, j)))
        .map(|(i, j)| points[i].distance(points[j]))
        .collect();
    d.sort_by(f32::total_cmp);
    d
}

fn benzene() -> Molecule {
    molecule(
        &neutral(&[6; 6]),
        &[(0, 1, 2), (1, 2, 1), (2, 3, 2), (3, 4, 1), (4, 5, 2), (5, 0, 1)],
    )
}

fn substituted_naphthalene() -> Molecule {
    let mut atoms = neutral(&[6; 16]);
    atoms.push((8, 0));
    atoms.push((11, 1));
    atoms.push((17, -1));
    molecule(
        &atoms,
        &[
            (0, 1, 2),
            (1, 2, 1),
            (2, 3, 2),
            (3, 4, 1),
            (4, 9, 2),
            (9, 0, 1),
            (4, 5, 1),
            (5, 6, 2),
            (6, 7, 1),
            (7, 8, 2),
            (8, 9, 1),
            (1, 10, 1),
            (10, 11, 1),
            (10, 12, 1),
            (10, 13, 1),
            (6, 14, 1),
            (14, 15, 3),
        ],
    )
}

#[test]
fn benzene_is_a_regular_hexagon() {
    let mut mol = benzene();
    invent(&mut mol);
    for b in mol.bonds() {
        assert!((distance(&mol, b.start, b.end) - 1.0).abs() < 1e-3);
    }
    for i in 0..6 {
        let (prev, here, next) = ((i + 5) % 6, i, (i + 1) % 6);
        let a = mol.atom(prev).coordinates - mol.atom(here).coordinates;
        let c = mol.atom(next).coordinates - mol.atom(here).coordinates;
        let inner = (a.dot(c) / (a.length() * c.length())).acos().to_degrees();
        assert!((inner - 120.0).abs() < 0.5, "angle {inner} at atom {here}");
    }
    assert!(mol.atoms().iter().all(|a| a.coordinates.is_finite()));
}

#[test]
fn small_rings_are_regular() {
    for size in [3usize, 4, 5, 7] {
        let bonds: Vec<_> = (0..size).map(|i| (i, (i + 1) % size, 1)).collect();
        let mut mol = molecule(&neutral(&vec![6; size]), &bonds);
        invent(&mut mol);
        let turn = std::f32::consts::PI - std::f32::consts::PI * (size as f32 - 2.0) / size as f32;
        let edge = |i: usize| mol.atom((i + 1) % size).coordinates - mol.atom(i).coordinates;
        for i in 0..size {
            let (u, v) = (edge(i), edge((i + 1) % size));
            let got = u.cross(v).atan2(u.dot(v)).abs();
            assert!((got - turn).abs() < 1e-2, "ring {size}: turn {got} vs {turn}");
        }
    }
}

#[test]
fn complex_molecule_has_finite_coordinates_and_unit_bonds() {
    let mut mol = substituted_naphthalene();
    invent(&mut mol);
    assert!(mol.atoms().iter().all(|a| a.coordinates.is_finite()));
    let mean = mol.average_bond_length().unwrap();
    assert!((mean - 1.0).abs() < 0.05, "mean bond length {mean}");
    let triple = mol.bond(mol.bond_between(14, 15).unwrap());
    assert_eq!(triple.bond_order, 3);
    let bend = mol.atom(6).coordinates - mol.atom(14).coordinates;
    let run = mol.atom(15).coordinates - mol.atom(14).coordinates;
    let straight = (bend.dot(run) / (bend.length() * run.length())).acos().to_degrees();
    assert!((straight - 180.0).abs() < 1.0);
}

#[test]
fn neutral_fragments_keep_their_distance() {
    // ethanol and water
    let mut mol = molecule(&neutral(&[6, 6, 8, 8]), &[(0, 1, 1), (1, 2, 1)]);
    invent(&mut mol);
    assert!(closest_between(&mol, &[0, 1, 2], &[3]) >= 1.6 - 1e-3);

    let mut packed = molecule(&neutral(&[6, 6, 8, 8]), &[(0, 1, 1), (1, 2, 1)]);
    let config = InventorConfig::default().with_seed(42).with_leftover_join(LeftoverJoin::Pack);
    invent_with(&mut packed, config);
    assert!(closest_between(&packed, &[0, 1, 2], &[3]) >= 1.6 - 1e-3);
}

#[test]
fn salt_ions_sit_at_charged_distance() {
    let mut mol = molecule(&[(11, 1), (17, -1)], &[]);
    invent(&mut mol);
    assert!((distance(&mol, 0, 1) - 1.4).abs() < 1e-3);
}

#[test]
fn zwitterion_pair_joins_on_charges() {
    // acetate and ammonium
    let mut mol = molecule(
        &[(6, 0), (6, 0), (8, 0), (8, -1), (7, 1)],
        &[(0, 1, 1), (1, 2, 2), (1, 3, 1)],
    );
    invent(&mut mol);
    assert!(closest_between(&mol, &[0, 1, 2, 3], &[4]) >= 1.4 - 1e-3);
    let to_oxide = distance(&mol, 3, 4);
    assert!((to_oxide - 1.4).abs() < 1e-2, "charged atoms {to_oxide} apart");
    let to_methyl = distance(&mol, 0, 4);
    assert!(to_oxide < to_methyl);
}

#[test]
fn fixed_seed_is_deterministic() {
    let config = InventorConfig::default().with_seed(7);
    let mut first = substituted_naphthalene();
    let mut second = substituted_naphthalene();
    invent_with(&mut first, config.clone());
    invent_with(&mut second, config);
    for (a, b) in first.atoms().iter().zip(second.atoms()) {
        assert_eq!(a.coordinates, b.coordinates);
    }
}

#[test]
fn double_bond_configuration_round_trips() {
    for wanted in [Stereo::Cis, Stereo::Trans] {
        let mut mol = molecule(&neutral(&[6, 6, 6, 6]), &[(0, 1, 1), (1, 2, 2), (2, 3, 1)]);
        let double = mol.bond_mut(1);
        double.stereo.atom1 = Some(0);
        double.stereo.atom2 = Some(3);
        double.stereo.stereo = wanted;
        invent(&mut mol);
        assert_eq!(mol.geometric_stereo(1), wanted);
    }
}

#[test]
fn absolute_template_keeps_its_orientation() {
    let template = Template::decode("C3N;0-1 1-2 1-3;0,0 1,0 1.5,0.866 1.5,-0.866", true).unwrap();
    let templates: TemplateList = std::iter::once(template).collect();
    let mut mol = molecule(&neutral(&[6, 6, 6, 7, 6]), &[(0, 1, 1), (1, 2, 1), (1, 3, 1), (2, 4, 1)]);
    let config = InventorConfig::default().with_seed(42).with_templates(templates);
    invent_with(&mut mol, config);
    let nitrogen = mol.atom(3).coordinates - mol.atom(1).coordinates;
    assert!((nitrogen - PointF(0.5, -0.866)).length() < 1e-2, "{nitrogen:?}");
}

#[test]
fn kept_core_stays_in_place() {
    let mut mol = molecule(&neutral(&[6, 6, 6, 6, 8]), &[(0, 1, 1), (1, 2, 1), (2, 3, 1), (3, 4, 1)]);
    let core = [PointF(0.0, 0.0), PointF(2.0, 0.0), PointF(3.0, 1.732)];
    for (a, &p) in core.iter().enumerate() {
        let atom = mol.atom_mut(a);
        atom.marked = true;
        atom.coordinates = p;
    }
    let config = InventorConfig::default()
        .with_seed(42)
        .with_mode(Mode::KEEP_MARKED_ATOM_COORDS);
    invent_with(&mut mol, config);
    for (a, &p) in core.iter().enumerate() {
        assert!((mol.atom(a).coordinates - p).length() < 1e-3, "atom {a} moved");
    }
    assert!((distance(&mol, 2, 3) - 2.0).abs() < 1e-2);
    assert!(mol.atoms().iter().all(|a| a.coordinates.is_finite()));
}

#[test]
fn hydrogens_removed_and_wedge_keeps_parity() {
    // CHFClBr with an explicit hydrogen
    let mut mol = molecule(&neutral(&[6, 9, 17, 35, 1]), &[(0, 1, 1), (0, 2, 1), (0, 3, 1), (0, 4, 1)]);
    mol.atom_mut(0).chirality = Chirality::Clockwise;
    let config = InventorConfig::default().with_seed(42).with_mode(Mode::REMOVE_HYDROGEN);
    invent_with(&mut mol, config);
    assert_eq!(mol.atom_count(), 4);
    assert_eq!(mol.bond_count(), 3);
    let wanted = mol.atom(0).chirality;
    assert_ne!(wanted, Chirality::Unspecified);
    assert_eq!(mol.bonds().iter().filter(|b| b.wedge != Wedge::None).count(), 1);
    assert_eq!(mol.geometric_chirality(0), wanted);
}

#[test]
fn large_ring_honours_double_bond_geometry() {
    // cyclododecadiene, one E and one Z double bond
    let bonds: Vec<_> = (0..12)
        .map(|i| (i, (i + 1) % 12, if i % 6 == 0 { 2 } else { 1 }))
        .collect();
    let mut mol = molecule(&neutral(&[6; 12]), &bonds);
    for (bond, before, after, wanted) in [(0, 11, 2, Stereo::Trans), (6, 5, 8, Stereo::Cis)] {
        let double = mol.bond_mut(bond);
        double.stereo.atom1 = Some(before);
        double.stereo.atom2 = Some(after);
        double.stereo.stereo = wanted;
    }
    invent(&mut mol);
    assert!(mol.atoms().iter().all(|a| a.coordinates.is_finite()));
    assert_eq!(mol.geometric_stereo(0), Stereo::Trans);
    assert_eq!(mol.geometric_stereo(6), Stereo::Cis);
    for b in mol.bonds() {
        assert!((distance(&mol, b.start, b.end) - 1.0).abs() < 1e-2);
    }
    let points: Vec<PointF> = mol.atoms().iter().map(|a| a.coordinates).collect();
    assert!(pair_distances(&points)[0] > 0.9);
}

#[test]
fn catalogue_cages_reproduce_their_templates() {
    let catalogue = TemplateList::default_catalogue().unwrap();
    // adamantane, then cubane
    for template in catalogue.iter().skip(1) {
        let shape = template.molecule();
        let bonds: Vec<_> = shape.bonds().iter().map(|b| (b.start, b.end, b.bond_order)).collect();
        let mut mol = molecule(&neutral(&vec![6; shape.atom_count()]), &bonds);
        invent(&mut mol);
        let points: Vec<PointF> = mol.atoms().iter().map(|a| a.coordinates).collect();
        let got = pair_distances(&points);
        let want = pair_distances(template.coordinates());
        for (g, w) in got.iter().zip(&want) {
            assert!((g - w).abs() < 1e-3, "{} atoms: distance {g} vs {w}", shape.atom_count());
        }
    }
}

#[test]
fn bridged_bicyclics_have_no_overlapping_atoms() {
    let norbornane = [(0, 1, 1), (1, 2, 1), (2, 3, 1), (3, 4, 1), (4, 5, 1), (5, 0, 1), (0, 6, 1), (6, 3, 1)];
    let mut mol = molecule(&neutral(&[6; 7]), &norbornane);
    invent_with(&mut mol, InventorConfig::default().with_seed(1));
    assert!(mol.atoms().iter().all(|a| a.coordinates.is_finite()));
    let points: Vec<PointF> = mol.atoms().iter().map(|a| a.coordinates).collect();
    let closest = pair_distances(&points)[0];
    assert!(closest > 0.5, "closest pair {closest}");
}

#[test]
fn preferred_core_survives_every_seed() {
    // propyl chain on benzene, the first three chain atoms marked
    let mut bonds = vec![(0, 1, 1), (1, 2, 1), (2, 3, 1), (3, 4, 1)];
    bonds.extend((0..6).map(|i| (4 + i, 4 + (i + 1) % 6, if i % 2 == 0 { 2 } else { 1 })));
    let core = [PointF(0.0, 0.0), PointF(0.866, 0.5), PointF(1.732, 0.0)];
    for seed in 0..8 {
        let mut mol = molecule(&neutral(&[6; 10]), &bonds);
        for (a, &p) in core.iter().enumerate() {
            let atom = mol.atom_mut(a);
            atom.marked = true;
            atom.coordinates = p;
        }
        let config = InventorConfig::default()
            .with_seed(seed)
            .with_mode(Mode::PREFER_MARKED_ATOM_COORDS);
        invent_with(&mut mol, config);
        for (a, &p) in core.iter().enumerate() {
            assert!((mol.atom(a).coordinates - p).length() < 1e-2, "seed {seed}: atom {a} moved");
        }
    }
}
