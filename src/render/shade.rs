use nalgebra::Vector3;
use crate::geom::ray::{Ray, RayCounter};
use crate::helper::mat::transform_vector;
use crate::helper::BaseFloat;
use crate::render::driver::Scene;
use crate::render::{HALF_MIRRORED, MAX_RAY_DEPTH};

/// The shading hook: turns a traced ray into a color. On a hit the record
/// identifies the instance, triangle and barycentrics needed to
/// reconstruct position, normal and texture coordinates; on a miss only
/// the direction is meaningful (environment lookup). Implementations may
/// re-enter the scene with secondary rays and own their recursion bound.
pub trait Shader<T>
where T: BaseFloat {
    fn trace(&self, scene: &Scene<T>, ray: &mut Ray<T>, counter: &mut RayCounter, depth: u32)
        -> Vector3<T>;
}

fn rgb8_to_rgb32f<T>(c: u32) -> Vector3<T>
where T: BaseFloat {
    let s = T::one() / <T as BaseFloat>::from_f32(256.0);
    Vector3::new(
        <T as BaseFloat>::from_usize(((c >> 16) & 255) as usize) * s,
        <T as BaseFloat>::from_usize(((c >> 8) & 255) as usize) * s,
        <T as BaseFloat>::from_usize((c & 255) as usize) * s,
    )
}

/// Whitted-style shading: textured Lambertian under one point light, with
/// part of the instances rendered as perfect mirrors and misses falling
/// through to the environment.
pub struct WhittedShader<T> {
    pub light_pos: Vector3<T>,
    pub light_color: Vector3<T>,
    pub ambient: Vector3<T>,
}

impl<T> Default for WhittedShader<T>
where T: BaseFloat {
    fn default() -> Self {
        WhittedShader {
            light_pos: Vector3::new(<T as BaseFloat>::from_f32(3.0), <T as BaseFloat>::from_f32(10.0), <T as BaseFloat>::from_f32(2.0)),
            light_color: Vector3::new(<T as BaseFloat>::from_f32(150.0), <T as BaseFloat>::from_f32(150.0), <T as BaseFloat>::from_f32(120.0)),
            ambient: Vector3::new(<T as BaseFloat>::from_f32(0.2), <T as BaseFloat>::from_f32(0.2), <T as BaseFloat>::from_f32(0.4)),
        }
    }
}

impl<T> Shader<T> for WhittedShader<T>
where T: BaseFloat {
    fn trace(
        &self,
        scene: &Scene<T>,
        ray: &mut Ray<T>,
        counter: &mut RayCounter,
        depth: u32,
    ) -> Vector3<T> {
        scene.intersect(ray, counter);
        let hit = ray.hit;
        if !hit.is_hit() {
            return match &scene.sky {
                Some(sky) => sky.sample(&ray.dir) * <T as BaseFloat>::from_f32(0.65),
                None => Vector3::zeros(),
            };
        }

        let inst_idx = hit.instance() as usize;
        let tri_idx = hit.triangle() as usize;
        let instance = &scene.tlas.instances()[inst_idx];
        let mesh = &scene.meshes[instance.blas_idx()];
        let w = T::one() - (hit.u + hit.v);

        // albedo and surface normal from the shading attributes when the
        // mesh has them, otherwise the flat geometric fallback
        let (albedo, local_normal) = match mesh.tri_ex.get(tri_idx) {
            Some(attrs) => {
                let albedo = match &mesh.texture {
                    Some(tex) => {
                        let uv = attrs.uv1 * hit.u + attrs.uv2 * hit.v + attrs.uv0 * w;
                        let iu = (uv[0] * <T as BaseFloat>::from_usize(tex.width)).floor_to_u32() as usize
                            % tex.width;
                        let iv = (uv[1] * <T as BaseFloat>::from_usize(tex.height)).floor_to_u32() as usize
                            % tex.height;
                        rgb8_to_rgb32f(tex.pixel(iu, iv))
                    }
                    None => Vector3::repeat(T::one()),
                };
                (albedo, attrs.n1 * hit.u + attrs.n2 * hit.v + attrs.n0 * w)
            }
            None => {
                let tri = &mesh.blas.tris()[tri_idx];
                let normal = (tri.vertex1 - tri.vertex0).cross(&(tri.vertex2 - tri.vertex0));
                (Vector3::repeat(T::one()), normal)
            }
        };
        let normal = transform_vector(instance.transform(), &local_normal).normalize();
        let point = ray.origin + ray.dir * hit.t;

        let mirror = (inst_idx * 17) & 1 == 1;
        if mirror && HALF_MIRRORED {
            counter.bounces += 1;
            if depth >= MAX_RAY_DEPTH {
                return Vector3::zeros();
            }
            let reflected = ray.dir - normal * (T::two() * normal.dot(&ray.dir));
            let mut secondary = Ray::new(point + reflected * <T as BaseFloat>::from_f32(1e-3), reflected);
            return self.trace(scene, &mut secondary, counter, depth + 1);
        }

        let to_light = self.light_pos - point;
        let dist = to_light.norm();
        let to_light = to_light / dist;
        let diffuse = T::max(T::zero(), normal.dot(&to_light));
        let irradiance = self.ambient + self.light_color * (diffuse / (dist * dist));
        albedo.component_mul(&irradiance)
    }
}


#[cfg(test)]
mod test {
    use std::sync::Arc;
    use nalgebra::Vector3;
    use crate::accel::blas::Blas;
    use crate::accel::instance::BlasInstance;
    use crate::accel::splitting::{BinnedSah, BINS};
    use crate::accel::tlas::Tlas;
    use crate::geom::ray::{Ray, RayCounter};
    use crate::geom::tri::Tri;
    use crate::helper::mat::init_translation;
    use crate::mesh::Mesh;
    use crate::render::driver::Scene;
    use crate::sky::SkyDome;
    use super::{Shader, WhittedShader};

    fn facing_tri_blas() -> Arc<Blas<f32>> {
        let mut blas = Blas::new(vec![Tri::new(
            Vector3::new(-1.0, -1.0, 0.0),
            Vector3::new(1.0, -1.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        )]);
        blas.build::<BinnedSah<BINS>>();
        Arc::new(blas)
    }

    fn two_instance_scene(sky: Option<SkyDome>) -> Scene<f32> {
        let blas = facing_tri_blas();
        let mesh = Mesh {
            blas: blas.clone(),
            tri_ex: Vec::new(),
            texture: None,
        };
        let mut instances = Vec::new();
        for i in 0..2u32 {
            let mut instance = BlasInstance::new(blas.clone(), 0, i);
            instance.set_transform(init_translation(&Vector3::new(
                i as f32 * 4.0 - 2.0,
                0.0,
                0.0,
            )));
            instances.push(instance);
        }
        let mut tlas = Tlas::new(instances);
        tlas.build();
        Scene {
            meshes: vec![mesh],
            tlas,
            sky,
        }
    }

    #[test]
    fn miss_without_sky_is_black() {
        let scene = two_instance_scene(None);
        let shader = WhittedShader::default();
        let mut ray = Ray::new(Vector3::new(0.0, 50.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        let c = shader.trace(&scene, &mut ray, &mut RayCounter::default(), 0);
        assert_eq!(c, Vector3::zeros());
    }

    #[test]
    fn miss_with_sky_samples_the_environment() {
        let sky = SkyDome::from_raw(4, 2, vec![4.0; 4 * 2 * 3]);
        let scene = two_instance_scene(Some(sky));
        let shader = WhittedShader::default();
        let mut ray = Ray::new(Vector3::new(0.0, 50.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        let c = shader.trace(&scene, &mut ray, &mut RayCounter::default(), 0);
        // sqrt(4) scaled by the 0.65 sky factor
        assert!((c[0] - 1.3).abs() < 1e-6);
    }

    #[test]
    fn diffuse_instance_gets_lit() {
        let scene = two_instance_scene(None);
        let shader = WhittedShader::<f32>::default();
        // instance 0 is diffuse under the every-other-instance mirror rule
        let mut ray = Ray::new(Vector3::new(-2.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        let mut counter = RayCounter::default();
        let c = shader.trace(&scene, &mut ray, &mut counter, 0);
        assert_eq!(counter.bounces, 0);
        // at least the ambient term survives
        assert!(c[0] >= shader.ambient[0]);
    }

    #[test]
    fn mirror_instance_bounces_once_into_the_void() {
        let scene = two_instance_scene(None);
        let shader = WhittedShader::default();
        // instance 1 mirrors; the triangle faces +z, so the reflection of a
        // +z ray leaves the scene and shades black
        let mut ray = Ray::new(Vector3::new(2.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));
        let mut counter = RayCounter::default();
        let c = shader.trace(&scene, &mut ray, &mut counter, 0);
        assert_eq!(counter.bounces, 1);
        assert_eq!(c, Vector3::zeros());
    }
}
