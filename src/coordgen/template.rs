//! Pre-computed coordinates for ring systems that the generic fragments draw badly.
//!
//! A template code has three `;`-separated sections: element runs (`C10`, `N`, `Cl2`), bonds
//! (`0-4`, `1=2`, `3#4`) and one `x,y` pair per atom.

use super::*;
use crate::{Error, Result};
use ahash::AHashMap;
use std::sync::OnceLock;

const FULLERENE: &str = "C60;0-1 0-2 0-4 1-3 1-5 2-6 2-10 3-7 3-11 4-8 4-12 5-9 5-13 6-7 6-14 7-15 8-9 8-16 9-17 10-12 10-18 11-13 11-19 12-20 13-21 14-22 14-23 15-22 15-24 16-25 16-27 17-26 17-27 18-23 18-28 19-24 19-29 20-25 20-30 21-26 21-31 22-32 23-33 24-34 25-35 26-36 27-37 28-30 28-38 29-31 29-39 30-40 31-41 32-42 32-43 33-38 33-42 34-39 34-43 35-40 35-44 36-41 36-45 37-44 37-45 38-46 39-47 40-48 41-49 42-50 43-51 44-52 45-53 46-48 46-54 47-49 47-55 48-56 49-57 50-51 50-54 51-55 52-53 52-56 53-57 54-58 55-59 56-58 57-59 58-59;-2.183,-2.494 -0.795,-3.217 -2.283,-1.800 -0.169,-2.902 -2.943,-1.453 0.494,-3.244 -1.491,-1.818 -0.638,-2.263 -1.922,-0.937 0.334,-2.113 -2.811,-0.732 1.008,-2.724 -3.305,-0.226 1.706,-2.839 -1.314,-1.107 -0.157,-1.711 -1.495,1.567 2.143,-0.331 -2.345,-0.095 1.264,-1.977 -3.040,1.312 2.815,-1.742 -0.580,-1.112 -1.672,-0.385 0.640,-1.591 -2.289,2.359 3.245,-0.528 1.012,1.936 -2.183,0.852 1.947,-1.303 -2.409,1.612 2.700,-1.053 -0.268,-0.514 -1.232,0.201 0.869,-0.895 -1.235,3.070 3.224,0.743 1.523,2.917 -1.453,0.899 1.568,-0.677 -1.560,2.440 2.893,0.117 -0.567,0.087 0.396,-0.415 0.302,3.294 2.529,2.132 -0.878,1.461 1.700,0.116 -0.811,2.191 2.260,0.589 -0.088,0.557 0.507,0.247 0.785,2.783 1.834,2.236 -0.186,1.224 1.110,0.548 0.136,2.330 1.833,1.445 0.408,1.651 1.120,1.279";
const ADAMANTANE: &str = "C10;0-4 0-6 0-8 1-4 1-7 1-9 2-5 2-6 2-9 3-5 3-7 3-8;-0.652,-0.485 -0.770,0.269 0.570,1.040 0.852,-0.824 -1.422,-0.216 1.422,0.216 -0.082,0.555 0.082,-0.555 0.199,-1.309 -0.199,1.309";
const CUBANE: &str = "C8;0-1 0-2 0-4 1-3 1-5 2-3 2-6 3-7 4-5 4-6 5-7 6-7;-0.268,-0.953 0.872,-0.736 -1.125,-0.186 0.148,0.412 -0.062,-0.174 0.752,0.118 -0.603,0.500 0.286,1.019";

/// Cheap necessary condition for a substructure match: element and ring-atom counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FragmentFingerprint {
    elements: AHashMap<u8, usize>,
    ring_atoms: usize,
}
impl FragmentFingerprint {
    pub fn of(mol: &Molecule) -> Self {
        let mut elements = AHashMap::new();
        for a in mol.atoms() {
            *elements.entry(a.atomic_number).or_insert(0) += 1;
        }
        let ring_atoms = (0..mol.atom_count()).filter(|&a| mol.is_ring_atom(a)).count();
        Self { elements, ring_atoms }
    }
    /// Whether a molecule with this fingerprint could contain one with `query`'s.
    pub fn may_contain(&self, query: &Self) -> bool {
        self.ring_atoms >= query.ring_atoms
            && query
                .elements
                .iter()
                .all(|(z, &count)| self.elements.get(z).is_some_and(|&c| c >= count))
    }
}

/// A substructure with coordinates normalised to unit mean bond length around the origin.
#[derive(Debug, Clone)]
pub struct Template {
    molecule: Molecule,
    coordinates: Vec<PointF>,
    absolute_orientation: bool,
    fingerprint: FragmentFingerprint,
}
impl Template {
    pub fn new(molecule: Molecule, coordinates: Vec<PointF>, absolute_orientation: bool) -> Result<Self> {
        if molecule.atom_count() != coordinates.len() {
            return Err(Error::TemplateSize {
                atoms: molecule.atom_count(),
                coordinates: coordinates.len(),
            });
        }
        let (sum, count) = molecule
            .bonds()
            .iter()
            .fold((0.0, 0), |(s, c), b| (s + coordinates[b.start].distance(coordinates[b.end]), c + 1));
        if count == 0 || sum <= crate::EPSILON {
            return Err(Error::TemplateWithoutBonds);
        }
        let scale = count as f32 / sum;
        let center = math::centroid(coordinates.iter().copied());
        let coordinates = coordinates.iter().map(|&p| (p - center) * scale).collect();
        let fingerprint = FragmentFingerprint::of(&molecule);
        Ok(Self {
            molecule,
            coordinates,
            absolute_orientation,
            fingerprint,
        })
    }
    /// Template from a molecule whose atoms already carry coordinates.
    pub fn from_molecule(molecule: Molecule, absolute_orientation: bool) -> Result<Self> {
        let coordinates = molecule.atoms().iter().map(|a| a.coordinates).collect();
        Self::new(molecule, coordinates, absolute_orientation)
    }
    pub fn decode(code: &str, absolute_orientation: bool) -> Result<Self> {
        let sections: Vec<&str> = code.split(';').collect();
        let [elements, bonds, coords] = sections.as_slice() else {
            return Err(Error::TemplateSections(sections.len()));
        };
        let mut builder = Builder::new();
        for (symbol, count) in element_runs(elements)? {
            let z = atom::element_number(&symbol).ok_or_else(|| Error::TemplateToken {
                token: symbol.clone(),
                detail: "unknown element",
            })?;
            for _ in 0..count {
                builder.add_atom(z);
            }
        }
        for token in bonds.split_whitespace() {
            let (pos, order) = token
                .char_indices()
                .find_map(|(i, c)| match c {
                    '-' => Some((i, 1)),
                    '=' => Some((i, 2)),
                    '#' => Some((i, 3)),
                    _ => None,
                })
                .ok_or_else(|| bad_token(token, "missing bond symbol"))?;
            let start = token[..pos].parse().map_err(|_| bad_token(token, "bad atom index"))?;
            let end = token[pos + 1..].parse().map_err(|_| bad_token(token, "bad atom index"))?;
            builder.add_bond(start, end, order)?;
        }
        let coordinates = coords
            .split_whitespace()
            .map(|token| {
                let (x, y) = token.split_once(',').ok_or_else(|| bad_token(token, "expected x,y"))?;
                let x = x.parse().map_err(|_| bad_token(token, "bad number"))?;
                let y = y.parse().map_err(|_| bad_token(token, "bad number"))?;
                Ok(PointF(x, y))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(builder.finish(), coordinates, absolute_orientation)
    }
    pub fn molecule(&self) -> &Molecule {
        &self.molecule
    }
    pub fn coordinates(&self) -> &[PointF] {
        &self.coordinates
    }
    pub fn is_absolute_orientation(&self) -> bool {
        self.absolute_orientation
    }
    pub fn fingerprint(&self) -> &FragmentFingerprint {
        &self.fingerprint
    }
}

fn bad_token(token: &str, detail: &'static str) -> Error {
    Error::TemplateToken {
        token: token.to_owned(),
        detail,
    }
}

fn element_runs(section: &str) -> Result<Vec<(String, usize)>> {
    let mut runs = Vec::new();
    let mut chars = section.trim().chars().peekable();
    while let Some(c) = chars.next() {
        if !c.is_ascii_uppercase() {
            return Err(bad_token(section, "element symbols must start uppercase"));
        }
        let mut symbol = c.to_string();
        while let Some(&l) = chars.peek().filter(|l| l.is_ascii_lowercase()) {
            symbol.push(l);
            chars.next();
        }
        let mut digits = String::new();
        while let Some(&d) = chars.peek().filter(|d| d.is_ascii_digit()) {
            digits.push(d);
            chars.next();
        }
        let count = if digits.is_empty() {
            1
        } else {
            digits.parse().map_err(|_| bad_token(section, "bad atom count"))?
        };
        runs.push((symbol, count));
    }
    Ok(runs)
}

#[derive(Debug, Clone, Default)]
pub struct TemplateList {
    templates: Vec<Template>,
}
impl TemplateList {
    pub fn new() -> Self {
        Self::default()
    }
    /// Fullerene, adamantane and cubane, in that order.
    pub fn default_catalogue() -> Result<Self> {
        let templates = [FULLERENE, ADAMANTANE, CUBANE]
            .into_iter()
            .map(|code| Template::decode(code, false))
            .collect::<Result<_>>()?;
        Ok(Self { templates })
    }
    pub fn push(&mut self, template: Template) {
        self.templates.push(template);
    }
    pub fn len(&self) -> usize {
        self.templates.len()
    }
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
    pub fn iter(&self) -> std::slice::Iter<'_, Template> {
        self.templates.iter()
    }
}
impl FromIterator<Template> for TemplateList {
    fn from_iter<I: IntoIterator<Item = Template>>(iter: I) -> Self {
        Self {
            templates: iter.into_iter().collect(),
        }
    }
}

/// Default template catalogue, loaded on first use and shared afterwards.
pub struct TemplateRepository {
    loader: fn() -> Result<TemplateList>,
    catalogue: OnceLock<Result<TemplateList>>,
}
impl TemplateRepository {
    pub const fn new(loader: fn() -> Result<TemplateList>) -> Self {
        Self {
            loader,
            catalogue: OnceLock::new(),
        }
    }
    /// Repository backed by the built-in catalogue, shared by every inventor.
    pub fn global() -> &'static Self {
        static GLOBAL: TemplateRepository = TemplateRepository::new(TemplateList::default_catalogue);
        &GLOBAL
    }
    /// Load the catalogue once; later calls return the same list or the same error.
    pub fn ensure_loaded(&self) -> Result<&TemplateList> {
        match self.catalogue.get_or_init(self.loader) {
            Ok(list) => Ok(list),
            Err(e) => Err(e.clone()),
        }
    }
}
impl std::fmt::Debug for TemplateRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateRepository")
            .field("loaded", &self.catalogue.get().is_some())
            .finish()
    }
}
