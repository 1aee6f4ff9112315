//! Molecule model: index-addressed atoms and bonds, ring perception, substructure search and
//! stereo helpers.

pub mod atom;
pub mod bond;
pub mod builder;
pub(crate) mod math;
pub mod molecule;
pub mod point;
pub mod ring;
pub mod stereo;
pub mod substruct;

pub use atom::{Atom, Chirality};
pub use bond::{Bond, Stereo, StereoInfo, Wedge};
pub use builder::Builder;
pub use molecule::Molecule;
pub use point::PointF;
pub use ring::{Ring, RingSet};
pub use substruct::AtomMapping;
