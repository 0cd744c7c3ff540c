use nalgebra::ClosedAdd;
use nalgebra::Matrix4;
use nalgebra::Vector3;
use nalgebra::Vector4;
use num::One;
use crate::helper::BaseFloat;

pub trait Two {
    /// Returns the additional double value of the `one` value.
    fn two() -> Self;
}

impl<T> Two for T
where T: One + ClosedAdd<Output=T> {
    fn two() -> Self {
        T::one() + T::one()
    }
}

pub trait Half {
    /// returns 0.5 for the number type
    fn half() -> Self;
}

impl Half for f32 {
    fn half() -> Self {
        0.5
    }
}

impl Half for f64 {
    fn half() -> Self {
        0.5
    }
}


/// Generates a 4x4 translation matrix from a given 3d point.
pub fn init_translation<T>(pos: &Vector3<T>) -> Matrix4<T>
where T: BaseFloat {
    Matrix4::new(
        T::one(),  T::zero(), T::zero(), pos[0],
        T::zero(), T::one(),  T::zero(), pos[1],
        T::zero(), T::zero(), T::one(),  pos[2],
        T::zero(), T::zero(), T::zero(), T::one(),
    )
}

/// Generates a 4x4 rotation matrix about the x axis.
pub fn init_rotation_x<T>(angle: T) -> Matrix4<T>
where T: BaseFloat {
    let (s, c) = (angle.sin(), angle.cos());
    Matrix4::new(
        T::one(),  T::zero(), T::zero(), T::zero(),
        T::zero(), c,         -s,        T::zero(),
        T::zero(), s,         c,         T::zero(),
        T::zero(), T::zero(), T::zero(), T::one(),
    )
}

/// Generates a 4x4 rotation matrix about the y axis.
pub fn init_rotation_y<T>(angle: T) -> Matrix4<T>
where T: BaseFloat {
    let (s, c) = (angle.sin(), angle.cos());
    Matrix4::new(
        c,         T::zero(), s,         T::zero(),
        T::zero(), T::one(),  T::zero(), T::zero(),
        -s,        T::zero(), c,         T::zero(),
        T::zero(), T::zero(), T::zero(), T::one(),
    )
}

/// Generates a 4x4 scale matrix from a 3d scale vector.
pub fn init_scale<T>(scale: &Vector3<T>) -> Matrix4<T>
where T: BaseFloat {
    Matrix4::new(
        scale[0],  T::zero(), T::zero(), T::zero(),
        T::zero(), scale[1],  T::zero(), T::zero(),
        T::zero(), T::zero(), scale[2],  T::zero(),
        T::zero(), T::zero(), T::zero(), T::one(),
    )
}

/// Applies the affine matrix to a position (homogeneous w = 1).
pub fn transform_point<T>(m: &Matrix4<T>, p: &Vector3<T>) -> Vector3<T>
where T: BaseFloat {
    let h = m * Vector4::new(p[0], p[1], p[2], T::one());
    Vector3::new(h[0], h[1], h[2])
}

/// Applies the affine matrix to a direction (homogeneous w = 0, so the
/// translation part is ignored).
pub fn transform_vector<T>(m: &Matrix4<T>, v: &Vector3<T>) -> Vector3<T>
where T: BaseFloat {
    let h = m * Vector4::new(v[0], v[1], v[2], T::zero());
    Vector3::new(h[0], h[1], h[2])
}
