#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stereo {
    Cis,
    Trans,
    #[default]
    Unspecified,
}
impl Stereo {
    pub fn inverted(self) -> Self {
        match self {
            Self::Cis => Self::Trans,
            Self::Trans => Self::Cis,
            Self::Unspecified => Self::Unspecified,
        }
    }
}

/// E/Z annotation of a double bond.
///
/// `stereo` relates `atom1` (a neighbour of the start atom) and `atom2` (a neighbour of the
/// end atom). A missing reference means the lowest-indexed neighbour on that side.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StereoInfo {
    pub atom1: Option<usize>,
    pub atom2: Option<usize>,
    pub stereo: Stereo,
}

/// Up/down wedge drawn on a bond, pointing away from the stereo centre it belongs to.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wedge {
    #[default]
    None,
    Up(usize),
    Down(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bond {
    pub start: usize,
    pub end: usize,
    /// 0 for coordinative (metal-ligand) bonds, otherwise 1 to 3.
    pub bond_order: u8,
    pub stereo: StereoInfo,
    pub wedge: Wedge,
}
impl Bond {
    pub const fn new(start: usize, end: usize, bond_order: u8) -> Self {
        Self {
            start,
            end,
            bond_order,
            stereo: StereoInfo {
                atom1: None,
                atom2: None,
                stereo: Stereo::Unspecified,
            },
            wedge: Wedge::None,
        }
    }
    pub fn contains(&self, atom: usize) -> bool {
        self.start == atom || self.end == atom
    }
    pub fn is_metal_ligand(&self) -> bool {
        self.bond_order == 0
    }
    pub fn is_stereo(&self) -> bool {
        self.bond_order == 2 && self.stereo.stereo != Stereo::Unspecified
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stereo_needs_a_double_bond() {
        let mut bond = Bond::new(0, 1, 1);
        bond.stereo.stereo = Stereo::Trans;
        assert!(!bond.is_stereo());
        bond.bond_order = 2;
        assert!(bond.is_stereo());
        assert!(Bond::new(2, 3, 0).is_metal_ligand());
        assert!(bond.contains(1) && !bond.contains(2));
    }
}
