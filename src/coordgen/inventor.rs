//! The layout pipeline: discover fragments, fuse them, fix stereo and collisions, join what is
//! left and write the coordinates back.

use super::*;
use super::fragmenter::*;
use super::joining::{join_charged, join_metal_bonded, join_remaining};
use super::minimizer::{optimize_fragment, perturb};
use rand::{rngs::StdRng, SeedableRng};
use std::f32::consts::{FRAC_PI_3, FRAC_PI_6};
use tracing::{debug, trace, warn};

/// Orientation buckets per 60° period, one per degree.
const ORIENTATION_BUCKETS: usize = 60;

/// Generates 2D coordinates for every atom of a molecule.
#[derive(Debug)]
pub struct CoordinateInventor<'r> {
    config: InventorConfig,
    repository: &'r TemplateRepository,
}
impl CoordinateInventor<'static> {
    pub fn new(config: InventorConfig) -> Self {
        Self::with_repository(config, TemplateRepository::global())
    }
}
impl Default for CoordinateInventor<'static> {
    fn default() -> Self {
        Self::new(InventorConfig::default())
    }
}
impl<'r> CoordinateInventor<'r> {
    pub fn with_repository(config: InventorConfig, repository: &'r TemplateRepository) -> Self {
        Self { config, repository }
    }
    pub fn config(&self) -> &InventorConfig {
        &self.config
    }

    /// Lay out `mol` in place: atom coordinates, then wedges for the stereo centres.
    pub fn invent(&self, mol: &mut Molecule) {
        let mode = self.config.mode;
        if mode.contains(Mode::REMOVE_HYDROGEN) {
            let removed = mol.remove_explicit_hydrogens();
            debug!(removed, "removed explicit hydrogens");
        }
        if mol.atom_count() == 0 {
            return;
        }
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let mut handled = Handled::new(mol);
        let mut fragments = Vec::new();
        let core = if mode.uses_core() {
            core_fragment(mol, self.config.bond_length)
        } else {
            None
        };
        if let Some(core) = &core {
            handled.mark(&core.found);
            fragments.push(core.found.fragment.clone());
        }

        let pin = self.place_templates(mol, &mut handled, &mut fragments);

        let rules: [fn(&Molecule, &Handled) -> Vec<Discovered>; 4] =
            [hub_fragments, ring_fragments, linear_fragments, quaternary_fragments];
        for rule in rules {
            let found = rule(mol, &handled);
            for d in found {
                handled.mark(&d);
                fragments.push(d.fragment);
            }
        }
        debug!(fragments = fragments.len(), "structural fragments found");
        let mut fragments = fusion::join_overlapping(mol, fragments);

        while let Some(d) = chain_fragment(mol, &handled) {
            handled.mark(&d);
            fragments.push(d.fragment);
        }
        for d in isolated_atoms(mol, &handled) {
            handled.mark(&d);
            fragments.push(d.fragment);
        }
        let mut fragments = fusion::join_overlapping(mol, fragments);
        debug!(fragments = fragments.len(), "fused fragments");

        correct_chain_parities(mol, &mut fragments);

        let ranks = symmetry_ranks(mol);
        let candidates = FlipCandidates::classify(mol, &ranks, mode);
        for frag in &mut fragments {
            let history = optimize_fragment(mol, frag, &candidates, &mut rng);
            perturb(mol, frag, &ranks, mode);
            trace!(
                atoms = frag.len(),
                before = history.first().map_or(0, |s| s.count),
                after = frag.collision_score().count,
                "fragment optimised"
            );
        }

        let fragments = join_metal_bonded(mol, fragments);
        let fragments = join_charged(mol, fragments);
        let Some(mut drawing) = join_remaining(fragments, self.config.leftover_join).into_iter().next() else {
            return;
        };

        if let Some(pin) = &pin {
            orient_to_template(&mut drawing, pin);
        } else if core.is_none() && self.config.normalize_orientation {
            normalize_orientation(mol, &mut drawing);
        }

        match &core {
            Some(core) => write_core_relative(mol, &drawing, core),
            None => write_centred(mol, &drawing, self.config.bond_length),
        }
        mol.assign_wedges();
    }

    /// Match custom templates, then the default catalogue unless skipped. Returns the pinned
    /// coordinates of the first absolute-orientation hit.
    fn place_templates(
        &self,
        mol: &Molecule,
        handled: &mut Handled,
        fragments: &mut Vec<Fragment>,
    ) -> Option<Vec<(usize, PointF)>> {
        let defaults = if self.config.mode.contains(Mode::SKIP_DEFAULT_TEMPLATES) {
            None
        } else {
            match self.repository.ensure_loaded() {
                Ok(list) => Some(list),
                Err(error) => {
                    warn!(%error, "default templates unavailable");
                    None
                }
            }
        };
        let templates = self.config.custom_templates.iter().chain(defaults.into_iter().flat_map(|l| l.iter()));
        let mut pin = None;
        for hit in template_fragments(mol, templates, handled) {
            handled.mark(&hit.found);
            if pin.is_none() {
                pin = hit.pin;
            }
            fragments.push(hit.found.fragment);
        }
        pin
    }
}

fn store_coordinates(mol: &mut Molecule, frag: &Fragment) {
    for (&a, &p) in frag.atoms().iter().zip(frag.coordinates()) {
        mol.atom_mut(a).coordinates = p;
    }
}

/// Mirror one side of every non-ring double bond whose drawn E/Z relation is the opposite of
/// the requested one.
fn correct_chain_parities(mol: &mut Molecule, fragments: &mut [Fragment]) {
    for frag in fragments.iter() {
        store_coordinates(mol, frag);
    }
    for bond in 0..mol.bond_count() {
        let wanted = mol.bond(bond).stereo.stereo;
        if wanted == Stereo::Unspecified || mol.bond(bond).bond_order != 2 || mol.is_ring_bond(bond) {
            continue;
        }
        let drawn = mol.geometric_stereo(bond);
        if drawn == Stereo::Unspecified || drawn == wanted {
            continue;
        }
        let start = mol.bond(bond).start;
        let Some(frag) = fragments.iter_mut().find(|f| f.contains(start)) else {
            continue;
        };
        if frag.flip_one_side(mol, bond, false) {
            store_coordinates(mol, frag);
            trace!(bond, "corrected double bond parity");
        }
    }
}

/// Rotate the drawing, mirrored if that fits better, so the pinned atoms line up with their
/// template coordinates.
fn orient_to_template(drawing: &mut Fragment, pin: &[(usize, PointF)]) {
    let placed: Vec<(PointF, PointF)> = pin
        .iter()
        .filter_map(|&(a, t)| Some((drawing.position(a)?, t)))
        .collect();
    if placed.len() < 2 {
        return;
    }
    let from_centre = math::centroid(placed.iter().map(|&(p, _)| p));
    let to_centre = math::centroid(placed.iter().map(|&(_, t)| t));
    let to: Vec<PointF> = placed.iter().map(|&(_, t)| t - to_centre).collect();
    let fit = |mirror: bool| {
        let from: Vec<PointF> = placed
            .iter()
            .map(|&(p, _)| {
                let v = p - from_centre;
                if mirror { PointF(v.0, -v.1) } else { v }
            })
            .collect();
        let angle = math::best_fit_rotation(&from, &to);
        let (sin, cos) = angle.sin_cos();
        let residual: f32 = from
            .iter()
            .zip(&to)
            .map(|(&f, &t)| {
                let mut f = f;
                f.rotate(sin, cos);
                f.distance(t)
            })
            .sum();
        (residual, angle)
    };
    let (plain, mirrored) = (fit(false), fit(true));
    if mirrored.0 + crate::EPSILON < plain.0 {
        drawing.flip(from_centre, 0.0);
        drawing.rotate(from_centre, mirrored.1);
    } else {
        drawing.rotate(from_centre, plain.1);
    }
}

/// Rotate so the most common bond direction sits at 30° modulo 60°. Ring bonds count double.
fn normalize_orientation(mol: &Molecule, drawing: &mut Fragment) {
    let mut histogram = [0.0f32; ORIENTATION_BUCKETS];
    for (bond, b) in mol.bonds().iter().enumerate() {
        let (Some(s), Some(e)) = (drawing.position(b.start), drawing.position(b.end)) else {
            continue;
        };
        if b.is_metal_ligand() || s.distance(e) < crate::EPSILON {
            continue;
        }
        let degrees = (e - s).angle().to_degrees().round() as i64;
        let bucket = degrees.rem_euclid(ORIENTATION_BUCKETS as i64) as usize;
        histogram[bucket] += if mol.is_ring_bond(bond) { 2.0 } else { 1.0 };
    }
    let Some((dominant, &weight)) = histogram
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, &f32)>, (i, w)| match best {
            Some((_, bw)) if bw >= w => best,
            _ => Some((i, w)),
        })
    else {
        return;
    };
    if weight <= 0.0 {
        return;
    }
    let current = (dominant as f32).to_radians();
    let turn = (FRAC_PI_6 - current).rem_euclid(FRAC_PI_3);
    if turn.abs() > crate::EPSILON {
        drawing.rotate(drawing.centroid(), turn);
    }
}

/// Keep the core at its input place and scale.
fn write_core_relative(mol: &mut Molecule, drawing: &Fragment, core: &CoreLayout) {
    let scale = core.bond_length;
    let offsets: Vec<PointF> = core
        .original
        .iter()
        .filter_map(|&(a, original)| Some(original - drawing.position(a)? * scale))
        .collect();
    let offset = math::centroid(offsets);
    for (&a, &p) in drawing.atoms().iter().zip(drawing.coordinates()) {
        mol.atom_mut(a).coordinates = p * scale + offset;
    }
}

/// Scale to `bond_length` and centre the bounding box on the origin.
fn write_centred(mol: &mut Molecule, drawing: &Fragment, bond_length: f32) {
    let (min, max) = drawing.extents();
    let centre = (min + max) * 0.5;
    for (&a, &p) in drawing.atoms().iter().zip(drawing.coordinates()) {
        mol.atom_mut(a).coordinates = (p - centre) * bond_length;
    }
}
