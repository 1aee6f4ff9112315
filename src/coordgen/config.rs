use super::*;
use std::ops::{BitOr, BitOrAssign};

/// Layout mode flags.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mode(u8);
impl Mode {
    pub const NONE: Self = Self(0);
    /// Only the caller's custom templates are matched.
    pub const SKIP_DEFAULT_TEMPLATES: Self = Self(1);
    /// Drop plain explicit hydrogens before layout.
    pub const REMOVE_HYDROGEN: Self = Self(2);
    /// Marked atoms keep their relative coordinates exactly.
    pub const KEEP_MARKED_ATOM_COORDS: Self = Self(4);
    /// Marked atoms start from their coordinates but may move if that removes collisions.
    pub const PREFER_MARKED_ATOM_COORDS: Self = Self(8);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
    pub const fn uses_core(self) -> bool {
        self.0 & (Self::KEEP_MARKED_ATOM_COORDS.0 | Self::PREFER_MARKED_ATOM_COORDS.0) != 0
    }
}
impl BitOr for Mode {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}
impl BitOrAssign for Mode {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

/// How fragments without any bond or charge relation are combined at the end.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeftoverJoin {
    /// Centroid-anchored association, at the uncharged join distance.
    #[default]
    Associate,
    /// Bounding-box packing of the two fragments.
    Pack,
}

#[derive(Debug, Clone)]
pub struct InventorConfig {
    pub mode: Mode,
    /// Seed for the flip search. `None` draws one from the operating system.
    pub seed: Option<u64>,
    /// Length of a bond in the written coordinates when no core fixes the scale.
    pub bond_length: f32,
    /// Rotate the finished drawing so its dominant bond direction sits at 30° modulo 60°.
    pub normalize_orientation: bool,
    pub leftover_join: LeftoverJoin,
    /// Matched before the default catalogue.
    pub custom_templates: TemplateList,
}
impl Default for InventorConfig {
    fn default() -> Self {
        Self {
            mode: Mode::NONE,
            seed: None,
            bond_length: crate::BOND_LENGTH,
            normalize_orientation: true,
            leftover_join: LeftoverJoin::Associate,
            custom_templates: TemplateList::new(),
        }
    }
}
impl InventorConfig {
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
    pub fn with_bond_length(mut self, bond_length: f32) -> Self {
        self.bond_length = bond_length;
        self
    }
    pub fn with_templates(mut self, templates: TemplateList) -> Self {
        self.custom_templates = templates;
        self
    }
    pub fn with_leftover_join(mut self, join: LeftoverJoin) -> Self {
        self.leftover_join = join;
        self
    }
    pub fn without_orientation(mut self) -> Self {
        self.normalize_orientation = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_flags_combine() {
        let mode = Mode::REMOVE_HYDROGEN | Mode::KEEP_MARKED_ATOM_COORDS;
        assert!(mode.contains(Mode::REMOVE_HYDROGEN));
        assert!(!mode.contains(Mode::SKIP_DEFAULT_TEMPLATES));
        assert!(mode.uses_core());
        assert!(!Mode::NONE.uses_core());
    }

    #[test]
    fn builders_set_fields() {
        let config = InventorConfig::default()
            .with_seed(9)
            .with_bond_length(1.5)
            .with_leftover_join(LeftoverJoin::Pack)
            .without_orientation();
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.bond_length, 1.5);
        assert_eq!(config.leftover_join, LeftoverJoin::Pack);
        assert!(!config.normalize_orientation);
        assert!(config.custom_templates.is_empty());
    }
}
