//! Error type shared by the molecule builder and the template codec.
//!
//! Layout itself never fails; these errors only come from building molecules with bad
//! indices or decoding malformed template codes.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A bond referenced an atom index that does not exist.
    #[error("atom index {index} out of range for a molecule with {count} atoms")]
    UnknownAtom { index: usize, count: usize },

    /// A bond was requested between an atom and itself.
    #[error("cannot bond atom {0} to itself")]
    SelfBond(usize),

    /// A template code is not made of the three `;`-separated sections.
    #[error("malformed template code: expected 3 sections, found {0}")]
    TemplateSections(usize),

    /// A token inside a template code could not be parsed.
    #[error("malformed template code token '{token}': {detail}")]
    TemplateToken { token: String, detail: &'static str },

    /// Atom and coordinate counts of a template disagree.
    #[error("template has {atoms} atoms but {coordinates} coordinates")]
    TemplateSize { atoms: usize, coordinates: usize },

    /// A template without bonds cannot be normalised to unit bond length.
    #[error("template has no bonds")]
    TemplateWithoutBonds,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
