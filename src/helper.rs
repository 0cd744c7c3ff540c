use nalgebra::ComplexField;
use nalgebra::RealField;
use nalgebra::Scalar;
use nalgebra::SimdComplexField;
use nalgebra::SimdRealField;
use num::{One, Zero};
use crate::helper::mat::{Half, Two};

pub mod mat;

pub trait BaseFloat : Scalar + ComplexField + RealField + SimdComplexField + SimdRealField
    + Zero + One + Two + Half + Copy
{
    const MIN: Self;
    const MAX: Self;
    /// Sentinel hit distance: any real intersection is strictly closer.
    const NO_HIT: Self;

    fn from_f32(v: f32) -> Self;
    fn from_usize(v: usize) -> Self;
    fn floor_to_u32(self) -> u32;
    fn to_f32(self) -> f32;
}

impl BaseFloat for f64 {
    const MIN: Self = f64::MIN;
    const MAX: Self = f64::MAX;
    const NO_HIT: Self = 1e30;

    fn from_f32(v: f32) -> Self {
        v as f64
    }

    fn from_usize(v: usize) -> Self {
        v as f64
    }

    fn floor_to_u32(self) -> u32 {
        self as u32
    }

    fn to_f32(self) -> f32 {
        self as f32
    }
}

impl BaseFloat for f32 {
    const MIN: Self = f32::MIN;
    const MAX: Self = f32::MAX;
    const NO_HIT: Self = 1e30;

    fn from_f32(v: f32) -> Self {
        v
    }

    fn from_usize(v: usize) -> Self {
        v as f32
    }

    fn floor_to_u32(self) -> u32 {
        self as u32
    }

    fn to_f32(self) -> f32 {
        self
    }
}
