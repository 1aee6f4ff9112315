//! The layout engine. [`CoordinateInventor`] drives it; the other modules are its stages and
//! building blocks.

pub mod angle;
pub mod association;
pub mod builder;
pub mod chain;
pub mod config;
pub mod fragment;
pub mod fragmenter;
pub mod fusion;
pub mod inventor;
pub mod joining;
pub mod large_ring;
pub mod minimizer;
pub mod symmetry;
pub mod template;

use super::sketcher::*;

pub use association::FragmentAssociation;
pub use chain::Chain;
pub use config::{InventorConfig, LeftoverJoin, Mode};
pub use fragment::{CollisionScore, Fragment, COLLISION_LIMIT};
pub use inventor::CoordinateInventor;
pub use minimizer::{FlipCandidates, FlipTier};
pub use symmetry::symmetry_ranks;
pub use template::{FragmentFingerprint, Template, TemplateList, TemplateRepository};
