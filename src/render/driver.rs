use std::time::Instant;
use log::info;
use nalgebra::{Matrix4, Vector3};
use rayon::prelude::*;
use crate::accel::tlas::Tlas;
use crate::geom::ray::{Ray, RayCounter};
use crate::helper::mat::{init_rotation_y, init_scale, init_translation, transform_point};
use crate::helper::BaseFloat;
use crate::mesh::{Mesh, Surface};
use crate::render::counter::CounterRing;
use crate::render::shade::Shader;
use crate::render::{
    COUNTER_CAPACITY, SCR_HEIGHT, SCR_WIDTH, SHOULD_MOVE, STATS_INTERVAL, TILE_SIZE,
};
use crate::sky::SkyDome;

/// Everything a ray can hit: the mesh table (BLAS plus shading attributes),
/// the top-level hierarchy over the placed instances, and the environment.
/// Shared read-only during a frame; all mutation happens between frames.
pub struct Scene<T> {
    pub meshes: Vec<Mesh<T>>,
    pub tlas: Tlas<T>,
    pub sky: Option<SkyDome>,
}

impl<T> Scene<T>
where T: BaseFloat {
    pub fn intersect(&self, ray: &mut Ray<T>, counter: &mut RayCounter) {
        self.tlas.intersect(ray, counter);
    }
}

/// The virtual screen plane in world space: its top-left, top-right and
/// bottom-left corners, relative to the camera position.
pub struct Camera<T> {
    pub pos: Vector3<T>,
    pub p0: Vector3<T>,
    pub p1: Vector3<T>,
    pub p2: Vector3<T>,
}

impl<T> Camera<T>
where T: BaseFloat {
    /// Places the plane at depth 1.5 in front of the camera, rotated by
    /// `view`, with the aspect ratio of the framebuffer.
    pub fn new(pos: Vector3<T>, view: &Matrix4<T>) -> Self {
        let aspect = <T as BaseFloat>::from_usize(SCR_WIDTH) / <T as BaseFloat>::from_usize(SCR_HEIGHT);
        let depth = <T as BaseFloat>::from_f32(1.5);
        Camera {
            pos,
            p0: transform_point(view, &Vector3::new(-aspect, T::one(), depth)),
            p1: transform_point(view, &Vector3::new(aspect, T::one(), depth)),
            p2: transform_point(view, &Vector3::new(-aspect, -T::one(), depth)),
        }
    }
}

/// Renders frames as 8x8 pixel tiles fanned out over a worker pool. Tiles
/// never share pixels (the screen is split into tile-row bands, one task
/// per band), so the accumulator needs no synchronization; each tile owns
/// one `RayCounter` and publishes it when the tile is done.
pub struct TileDriver<T, S> {
    pub scene: Scene<T>,
    pub camera: Camera<T>,
    shader: S,
    accumulator: Vec<Vector3<T>>,
    pub screen: Surface,
    counters: CounterRing,
    stats_timer: Instant,
    anim_angle: Vec<T>,
    anim_height: Vec<T>,
    anim_speed: Vec<T>,
}

impl<T, S> TileDriver<T, S>
where
    T: BaseFloat + Send + Sync,
    S: Shader<T> + Sync,
{
    pub fn new(scene: Scene<T>, camera: Camera<T>, shader: S) -> Self {
        let n = scene.tlas.instances().len();
        let heights = [5, 4, 3, 2, 1, 5, 4, 3];
        TileDriver {
            scene,
            camera,
            shader,
            accumulator: vec![Vector3::zeros(); SCR_WIDTH * SCR_HEIGHT],
            screen: Surface::new(SCR_WIDTH, SCR_HEIGHT),
            counters: CounterRing::new(COUNTER_CAPACITY),
            stats_timer: Instant::now(),
            anim_angle: vec![T::zero(); n],
            anim_height: (0..n).map(|i| <T as BaseFloat>::from_usize(heights[i % 8])).collect(),
            anim_speed: vec![T::zero(); n],
        }
    }

    pub fn counters(&self) -> &CounterRing {
        &self.counters
    }

    /// Re-places every instance on a square grid (optionally animated) and
    /// rebuilds the TLAS. This is the frame's only mutation and runs
    /// strictly before any tile is dispatched.
    pub fn animate_scene(&mut self) {
        let n = self.scene.tlas.instances().len();
        if n == 0 {
            self.scene.tlas.build();
            return;
        }
        let side = (0..).find(|s| s * s >= n).unwrap_or(1);
        let spacing = <T as BaseFloat>::from_f32(2.5);
        let center = <T as BaseFloat>::from_usize(side - 1) * T::half();

        for i in 0..n {
            let (x, y) = (i / side, i % side);
            let translate = init_translation(&Vector3::new(
                (<T as BaseFloat>::from_usize(x) - center) * spacing,
                T::zero(),
                (<T as BaseFloat>::from_usize(y) - center) * spacing,
            ));
            let mut rotate = Matrix4::identity();
            if SHOULD_MOVE {
                if (x + y) & 1 == 1 {
                    rotate = init_rotation_y(self.anim_angle[i]);
                } else {
                    rotate = init_translation(&Vector3::new(
                        T::zero(),
                        self.anim_height[i / 2],
                        T::zero(),
                    ));
                }
                self.anim_angle[i] += <T as BaseFloat>::from_f32((((i * 13) & 7) + 2) as f32 * 0.005);
                if self.anim_angle[i] > T::two_pi() {
                    self.anim_angle[i] -= T::two_pi();
                }
                self.anim_speed[i] -= <T as BaseFloat>::from_f32(0.01);
                self.anim_height[i] += self.anim_speed[i];
                if self.anim_height[i] < T::zero() {
                    self.anim_speed[i] = <T as BaseFloat>::from_f32(0.2);
                }
            }
            let scale = init_scale(&Vector3::repeat(<T as BaseFloat>::from_f32(1.5)));
            self.scene.tlas.instances_mut()[i].set_transform(translate * rotate * scale);
        }
        self.scene.tlas.build();
    }

    /// One full frame: mutate, rebuild, trace tiles in parallel, quantize,
    /// and dump counter statistics when the interval elapsed.
    pub fn render_frame(&mut self) {
        let frame_start = Instant::now();
        self.animate_scene();

        let scene = &self.scene;
        let camera = &self.camera;
        let shader = &self.shader;
        let counters = &self.counters;
        self.accumulator
            .par_chunks_mut(TILE_SIZE * SCR_WIDTH)
            .enumerate()
            .for_each(|(band, rows)| {
                for tile_x in 0..SCR_WIDTH / TILE_SIZE {
                    let mut counter = RayCounter::default();
                    for v in 0..TILE_SIZE {
                        for u in 0..TILE_SIZE {
                            let x = tile_x * TILE_SIZE + u;
                            let y = band * TILE_SIZE + v;
                            let fx = <T as BaseFloat>::from_usize(x) / <T as BaseFloat>::from_usize(SCR_WIDTH);
                            let fy = <T as BaseFloat>::from_usize(y) / <T as BaseFloat>::from_usize(SCR_HEIGHT);
                            let pixel_pos = camera.pos
                                + camera.p0
                                + (camera.p1 - camera.p0) * fx
                                + (camera.p2 - camera.p0) * fy;
                            let mut ray =
                                Ray::new(camera.pos, (pixel_pos - camera.pos).normalize());
                            rows[x + v * SCR_WIDTH] =
                                shader.trace(scene, &mut ray, &mut counter, 0);
                        }
                    }
                    counters.push(counter);
                }
            });

        for (i, c) in self.accumulator.iter().enumerate() {
            self.screen.pixels[i] = pack_color(c);
        }

        info!(
            "frame rendered in {:.2} ms",
            frame_start.elapsed().as_secs_f64() * 1e3
        );
        if self.stats_timer.elapsed() >= STATS_INTERVAL {
            self.counters.report();
            self.stats_timer = Instant::now();
        }
    }
}

/// Quantizes a linear color into the 0x00RRGGBB framebuffer format:
/// clamped at 255, no gamma.
fn pack_color<T>(c: &Vector3<T>) -> u32
where T: BaseFloat {
    let channel = |v: T| u32::min(255, (<T as BaseFloat>::from_usize(255) * v).floor_to_u32());
    (channel(c[0]) << 16) | (channel(c[1]) << 8) | channel(c[2])
}


#[cfg(test)]
mod test {
    use nalgebra::{Matrix4, Vector3};
    use crate::accel::tlas::Tlas;
    use crate::render::shade::WhittedShader;
    use crate::render::{SCR_HEIGHT, SCR_WIDTH, TILE_SIZE};
    use super::{pack_color, Camera, Scene, TileDriver};

    #[test]
    fn pack_color_clamps_and_packs() {
        assert_eq!(pack_color(&Vector3::new(0.0f32, 0.0, 0.0)), 0);
        assert_eq!(pack_color(&Vector3::new(2.0f32, 1.0, 0.5)), 0x00ffff7f);
        // negative values saturate to zero rather than wrapping
        assert_eq!(pack_color(&Vector3::new(-1.0f32, 0.0, 0.0)), 0);
    }

    #[test]
    fn empty_scene_renders_black_and_collects_one_counter_per_tile() {
        let scene = Scene::<f32> {
            meshes: Vec::new(),
            tlas: Tlas::new(Vec::new()),
            sky: None,
        };
        let camera = Camera::new(Vector3::new(0.0, 0.0, -5.0), &Matrix4::identity());
        let mut driver = TileDriver::new(scene, camera, WhittedShader::default());
        driver.render_frame();

        assert!(driver.screen.pixels.iter().all(|&p| p == 0));
        let tiles = (SCR_WIDTH / TILE_SIZE) * (SCR_HEIGHT / TILE_SIZE);
        assert_eq!(driver.counters().len(), tiles);
    }
}
