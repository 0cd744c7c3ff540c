use std::path::Path;
use log::info;
use nalgebra::Vector3;
use crate::error::LoadError;
use crate::helper::BaseFloat;

/// HDR environment map in longitude/latitude parameterization, stored as
/// rows of RGB triplets. The square root of every sample is taken at load
/// time as a simple tone pre-shape, so `sample` returns pre-shaped values.
pub struct SkyDome {
    width: usize,
    height: usize,
    pixels: Vec<f32>,
}

impl SkyDome {
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let img = image::open(path)
            .map_err(|source| LoadError::Image { path: path.into(), source })?
            .into_rgb32f();
        let (width, height) = img.dimensions();
        let mut pixels = img.into_raw();
        for p in pixels.iter_mut() {
            *p = p.sqrt();
        }
        info!("loaded {}x{} environment from {}", width, height, path.display());
        Ok(SkyDome {
            width: width as usize,
            height: height as usize,
            pixels,
        })
    }

    /// Wraps raw RGB rows that are already in linear radiance; applies the
    /// same tone pre-shape as `load`.
    pub fn from_raw(width: usize, height: usize, mut pixels: Vec<f32>) -> Self {
        assert_eq!(pixels.len(), width * height * 3);
        for p in pixels.iter_mut() {
            *p = p.sqrt();
        }
        SkyDome {
            width,
            height,
            pixels,
        }
    }

    /// Looks the direction up as longitude/latitude:
    /// `u = w·atan2(z, x)/2π − ½`, `v = h·acos(y)/π − ½`, with a negative
    /// longitude wrapping once around and the packed index taken modulo the
    /// pixel count.
    pub fn sample<T>(&self, dir: &Vector3<T>) -> Vector3<T>
    where T: BaseFloat {
        let w = <T as BaseFloat>::from_usize(self.width);
        let h = <T as BaseFloat>::from_usize(self.height);
        let mut u = w * dir[2].atan2(dir[0]) / T::two_pi() - T::half();
        if u < T::zero() {
            u += w;
        }
        let mut v = h * dir[1].acos() / T::pi() - T::half();
        if v < T::zero() {
            v += h;
        }
        let idx = (u.floor_to_u32() as usize + v.floor_to_u32() as usize * self.width)
            % (self.width * self.height);
        Vector3::new(
            <T as BaseFloat>::from_f32(self.pixels[idx * 3]),
            <T as BaseFloat>::from_f32(self.pixels[idx * 3 + 1]),
            <T as BaseFloat>::from_f32(self.pixels[idx * 3 + 2]),
        )
    }
}


#[cfg(test)]
mod test {
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use super::SkyDome;

    /// 4x2 dome where every texel holds its own packed index in the red
    /// channel, squared so the load-time pre-shape restores it.
    fn indexed_dome() -> SkyDome {
        let mut pixels = vec![0f32; 4 * 2 * 3];
        for i in 0..8 {
            pixels[i * 3] = (i * i) as f32;
        }
        SkyDome::from_raw(4, 2, pixels)
    }

    #[test]
    fn positive_x_wraps_the_negative_longitude() {
        let dome = indexed_dome();
        // atan2(0, 1) = 0 puts u at -0.5, which wraps to the last column
        let c = dome.sample(&Vector3::new(1.0f32, 0.0, 0.0));
        assert_relative_eq!(c[0], 3.0);
    }

    #[test]
    fn negative_x_lands_mid_row() {
        let dome = indexed_dome();
        // atan2(0, -1) = pi puts u in column 1 of the top row
        let c = dome.sample(&Vector3::new(-1.0f32, 0.0, 0.0));
        assert_relative_eq!(c[0], 1.0);
    }

    #[test]
    fn straight_up_wraps_both_coordinates() {
        let dome = indexed_dome();
        // atan2(0, 0) = 0 and acos(1) = 0 put both u and v at -0.5, which
        // wraps each to its last cell: texel (3, 1), packed index 7
        let c = dome.sample(&Vector3::new(0.0f32, 1.0, 0.0));
        assert_relative_eq!(c[0], 7.0);
    }
}
