use std::{iter::Sum, ops::*};

/// A 2D point or vector in drawing units.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PointF(pub f32, pub f32);
impl PointF {
    pub const ORIGIN: Self = Self(0.0, 0.0);

    /// Unit vector pointing at `angle` radians, counter-clockwise from +x.
    pub fn from_angle(angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self(cos, sin)
    }
    pub fn sq_length(self) -> f32 {
        self.0 * self.0 + self.1 * self.1
    }
    /// Euclidean length; vectors shorter than machine epsilon count as zero.
    pub fn length(self) -> f32 {
        match self.sq_length() {
            sq if sq > f32::EPSILON => sq.sqrt(),
            _ => 0.0,
        }
    }
    pub fn distance(self, other: Self) -> f32 {
        (self - other).length()
    }
    /// Direction of the vector in radians, in `(-π, π]`.
    pub fn angle(self) -> f32 {
        self.1.atan2(self.0)
    }
    /// Scale to unit length. Zero vectors are left alone.
    pub fn normalize(&mut self) {
        let len = self.length();
        if len > f32::EPSILON {
            *self /= len;
        }
    }
    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }
    /// Turn counter-clockwise by the angle with this sine and cosine.
    pub fn rotate(&mut self, sin: f32, cos: f32) {
        *self = Self(self.0 * cos - self.1 * sin, self.0 * sin + self.1 * cos);
    }
    /// Rotate counter-clockwise by `angle` radians around `pivot`.
    pub fn rotated_around(self, pivot: Self, angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        let mut v = self - pivot;
        v.rotate(sin, cos);
        pivot + v
    }
    /// The vector turned a quarter turn counter-clockwise.
    pub fn perpendicular(self) -> Self {
        Self(-self.1, self.0)
    }
    pub fn dot(self, other: Self) -> f32 {
        self.0 * other.0 + self.1 * other.1
    }
    /// z component of the 3D cross product; positive when `other` lies counter-clockwise.
    pub fn cross(self, other: Self) -> f32 {
        self.0 * other.1 - self.1 * other.0
    }
    pub fn is_finite(self) -> bool {
        self.0.is_finite() && self.1.is_finite()
    }
}
macro_rules! componentwise {
    ($($trait:ident :: $method:ident, $assign:ident :: $assign_method:ident => $op:tt;)*) => {$(
        impl $trait for PointF {
            type Output = Self;
            fn $method(self, rhs: Self) -> Self {
                Self(self.0 $op rhs.0, self.1 $op rhs.1)
            }
        }
        impl $assign for PointF {
            fn $assign_method(&mut self, rhs: Self) {
                *self = *self $op rhs;
            }
        }
    )*};
}
componentwise! {
    Add::add, AddAssign::add_assign => +;
    Sub::sub, SubAssign::sub_assign => -;
}

macro_rules! scaled {
    ($($trait:ident :: $method:ident, $assign:ident :: $assign_method:ident => $op:tt;)*) => {$(
        impl $trait<f32> for PointF {
            type Output = Self;
            fn $method(self, k: f32) -> Self {
                Self(self.0 $op k, self.1 $op k)
            }
        }
        impl $assign<f32> for PointF {
            fn $assign_method(&mut self, k: f32) {
                *self = *self $op k;
            }
        }
    )*};
}
scaled! {
    Mul::mul, MulAssign::mul_assign => *;
    Div::div, DivAssign::div_assign => /;
}

impl Neg for PointF {
    type Output = Self;
    fn neg(self) -> Self {
        Self(-self.0, -self.1)
    }
}
impl Sum for PointF {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ORIGIN, Add::add)
    }
}
