//! 2D depiction coordinates for molecular graphs.
//!
//! The [`sketcher`] module holds the molecule the layout works on (atoms, bonds, perceived
//! rings, substructure search). The [`coordgen`] module is the layout engine: it cuts the
//! molecule into geometrically well defined fragments, fuses them, repairs collisions and
//! joins whatever is left into one drawing.

pub mod coordgen;
pub mod error;
pub mod sketcher;

pub use error::{Error, Result};

/// Default distance between two bonded atoms in the written coordinates.
pub const BOND_LENGTH: f32 = 1.0;
const EPSILON: f32 = 0.001;

pub mod prelude {
    pub use super::coordgen::{
        CoordinateInventor, InventorConfig, LeftoverJoin, Mode, Template, TemplateList,
        TemplateRepository,
    };
    pub use super::sketcher::{Builder, Chirality, Molecule, PointF, Stereo, Wedge};
}
