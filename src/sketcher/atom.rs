use super::*;

/// Tetrahedral configuration of a stereo centre.
///
/// The parity is relative to neighbour indices: sort the neighbours by atom index (an implicit
/// hydrogen counts as the highest), view the centre with the highest neighbour pointing away,
/// and the remaining three run clockwise or counter-clockwise in ascending index order.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Chirality {
    Clockwise,
    CounterClockwise,
    #[default]
    Unspecified,
}
impl Chirality {
    pub fn inverted(self) -> Self {
        match self {
            Self::Clockwise => Self::CounterClockwise,
            Self::CounterClockwise => Self::Clockwise,
            Self::Unspecified => Self::Unspecified,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub atomic_number: u8,
    pub charge: i8,
    /// Marked atoms form the core whose coordinates may be kept.
    pub marked: bool,
    /// Query atoms stand for a set of elements; their charge is a constraint, not a real charge.
    pub query: bool,
    pub chirality: Chirality,
    pub coordinates: PointF,
    pub(crate) neighbors: Vec<usize>,
    pub(crate) bonds: Vec<usize>,
}
impl Atom {
    pub fn new(atomic_number: u8) -> Self {
        Self {
            atomic_number,
            charge: 0,
            marked: false,
            query: false,
            chirality: Chirality::Unspecified,
            coordinates: PointF::ORIGIN,
            neighbors: Vec::new(),
            bonds: Vec::new(),
        }
    }
    /// All bonded neighbours, including coordinative ones. Parallel to [`Self::bonds`].
    pub fn neighbors(&self) -> &[usize] {
        &self.neighbors
    }
    pub fn bonds(&self) -> &[usize] {
        &self.bonds
    }
    pub fn is_metal(atomic_number: u8) -> bool {
        [3, 4, 11, 12, 13, 31, 49, 32, 50, 51].contains(&atomic_number)
            || [19..=30, 37..=48, 55..=84, 87..=112]
                .iter()
                .any(|r| r.contains(&atomic_number))
    }
    /// An uncharged, unmarked, non-stereo hydrogen that may be dropped from the drawing.
    pub fn is_plain_hydrogen(&self) -> bool {
        self.atomic_number == 1 && self.charge == 0 && !self.marked
    }
}

pub(crate) fn element_number(symbol: &str) -> Option<u8> {
    Some(match symbol {
        "H" => 1,
        "B" => 5,
        "C" => 6,
        "N" => 7,
        "O" => 8,
        "F" => 9,
        "Si" => 14,
        "P" => 15,
        "S" => 16,
        "Cl" => 17,
        "Se" => 34,
        "Br" => 35,
        "I" => 53,
        _ => return None,
    })
}
