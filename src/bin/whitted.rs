use std::error::Error;
use std::path::PathBuf;
use std::process;
use log::{error, info};
use nalgebra::Vector3;
use radiant_trace::accel::instance::BlasInstance;
use radiant_trace::accel::tlas::Tlas;
use radiant_trace::helper::mat::init_rotation_x;
use radiant_trace::mesh::Mesh;
use radiant_trace::render::driver::{Camera, Scene, TileDriver};
use radiant_trace::render::shade::WhittedShader;
use radiant_trace::render::{NUM_MESHES, SCR_HEIGHT, SCR_WIDTH};
use radiant_trace::sky::SkyDome;

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        error!("{e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let mut args = std::env::args().skip(1);
    let obj = PathBuf::from(args.next().unwrap_or_else(|| "assets/teapot.obj".into()));
    let texture = args.next().map(PathBuf::from);
    let sky_path = args.next().map(PathBuf::from);
    let frames: usize = match args.next() {
        Some(s) => s.parse()?,
        None => 8,
    };

    let mesh = Mesh::<f32>::from_obj(&obj, texture.as_deref())?;
    let sky = match &sky_path {
        Some(path) => Some(SkyDome::load(path)?),
        None => None,
    };

    // a grid of instances sharing the one mesh; the driver re-places them
    // every frame before it rebuilds the TLAS
    let instances = (0..NUM_MESHES)
        .map(|i| BlasInstance::new(mesh.blas.clone(), 0, i as u32))
        .collect();
    let scene = Scene {
        meshes: vec![mesh],
        tlas: Tlas::new(instances),
        sky,
    };
    let camera = Camera::new(Vector3::new(0.0, -2.0, -8.5), &init_rotation_x(-0.65));

    let mut driver = TileDriver::new(scene, camera, WhittedShader::default());
    for frame in 0..frames {
        info!("frame {}/{}", frame + 1, frames);
        driver.render_frame();
    }
    driver.counters().report();

    let mut img = image::RgbImage::new(SCR_WIDTH as u32, SCR_HEIGHT as u32);
    for (i, p) in driver.screen.pixels.iter().enumerate() {
        let (x, y) = ((i % SCR_WIDTH) as u32, (i / SCR_WIDTH) as u32);
        img.put_pixel(x, y, image::Rgb([(p >> 16) as u8, (p >> 8) as u8, *p as u8]));
    }
    img.save("frame.png")?;
    info!("wrote frame.png");
    Ok(())
}
