use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use log::info;
use nalgebra::{Vector2, Vector3};
use crate::accel::blas::Blas;
use crate::accel::splitting::{BinnedSah, BINS};
use crate::error::LoadError;
use crate::geom::tri::{Tri, TriEx};
use crate::helper::BaseFloat;

/// A 32-bit 0x00RRGGBB pixel buffer, used both for mesh textures and for
/// the driver's framebuffer.
pub struct Surface {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u32>,
}

impl Surface {
    pub fn new(width: usize, height: usize) -> Self {
        Surface {
            width,
            height,
            pixels: vec![0; width * height],
        }
    }

    pub fn from_image(path: &Path) -> Result<Self, LoadError> {
        let img = image::open(path)
            .map_err(|source| LoadError::Image { path: path.into(), source })?
            .into_rgb8();
        let (width, height) = img.dimensions();
        let pixels = img
            .pixels()
            .map(|p| ((p[0] as u32) << 16) | ((p[1] as u32) << 8) | p[2] as u32)
            .collect();
        Ok(Surface {
            width: width as usize,
            height: height as usize,
            pixels,
        })
    }

    pub fn plot(&mut self, x: usize, y: usize, c: u32) {
        self.pixels[x + y * self.width] = c;
    }

    pub fn pixel(&self, x: usize, y: usize) -> u32 {
        self.pixels[x + y * self.width]
    }
}


/// Reads a triangle soup: one triangle per line as nine whitespace-separated
/// floats. The caller states how many triangles it expects; fewer (or any
/// malformed line before that) is an error, extra lines are ignored.
pub fn load_tri_file<T>(path: &Path, expected: usize) -> Result<Vec<Tri<T>>, LoadError>
where T: BaseFloat {
    let text = fs::read_to_string(path)
        .map_err(|source| LoadError::Io { path: path.into(), source })?;

    let mut tris = Vec::with_capacity(expected);
    for (line_no, line) in text.lines().enumerate() {
        if tris.len() == expected {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut values = [0f32; 9];
        let mut tokens = line.split_whitespace();
        for value in values.iter_mut() {
            let token = tokens.next().ok_or_else(|| LoadError::TriFormat {
                path: path.into(),
                line: line_no + 1,
                reason: "expected nine floats".into(),
            })?;
            *value = token.parse().map_err(|_| LoadError::TriFormat {
                path: path.into(),
                line: line_no + 1,
                reason: format!("not a float: {token:?}"),
            })?;
        }
        if tokens.next().is_some() {
            return Err(LoadError::TriFormat {
                path: path.into(),
                line: line_no + 1,
                reason: "trailing data after nine floats".into(),
            });
        }
        tris.push(Tri::new(
            Vector3::new(
                <T as BaseFloat>::from_f32(values[0]),
                <T as BaseFloat>::from_f32(values[1]),
                <T as BaseFloat>::from_f32(values[2]),
            ),
            Vector3::new(
                <T as BaseFloat>::from_f32(values[3]),
                <T as BaseFloat>::from_f32(values[4]),
                <T as BaseFloat>::from_f32(values[5]),
            ),
            Vector3::new(
                <T as BaseFloat>::from_f32(values[6]),
                <T as BaseFloat>::from_f32(values[7]),
                <T as BaseFloat>::from_f32(values[8]),
            ),
        ));
    }
    if tris.len() < expected {
        return Err(LoadError::TriFormat {
            path: path.into(),
            line: text.lines().count(),
            reason: format!("expected {} triangles, found {}", expected, tris.len()),
        });
    }
    Ok(tris)
}


/// A renderable mesh: the built hierarchy plus the shading attributes the
/// traversal itself never looks at.
pub struct Mesh<T> {
    pub blas: Arc<Blas<T>>,
    pub tri_ex: Vec<TriEx<T>>,
    pub texture: Option<Surface>,
}

impl<T> Mesh<T>
where T: BaseFloat {
    /// Loads a bare triangle soup; no normals, uvs or texture.
    pub fn from_tri_file(path: &Path, expected: usize) -> Result<Self, LoadError> {
        let tris = load_tri_file(path, expected)?;
        Ok(Mesh::from_tris(tris, Vec::new(), None))
    }

    /// Loads a textured mesh through the OBJ loader, producing matching
    /// triangle and attribute arrays. Missing normals or texture
    /// coordinates fall back to zero.
    pub fn from_obj(obj_path: &Path, texture_path: Option<&Path>) -> Result<Self, LoadError> {
        let (models, _materials) = tobj::load_obj(
            obj_path,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
        )
        .map_err(|source| LoadError::Obj { path: obj_path.into(), source })?;

        let mut tris = Vec::new();
        let mut tri_ex = Vec::new();
        for model in &models {
            let m = &model.mesh;
            let position = |i: usize| {
                Vector3::new(
                    <T as BaseFloat>::from_f32(m.positions[3 * i]),
                    <T as BaseFloat>::from_f32(m.positions[3 * i + 1]),
                    <T as BaseFloat>::from_f32(m.positions[3 * i + 2]),
                )
            };
            let normal = |i: usize| {
                if m.normals.is_empty() {
                    Vector3::zeros()
                } else {
                    Vector3::new(
                        <T as BaseFloat>::from_f32(m.normals[3 * i]),
                        <T as BaseFloat>::from_f32(m.normals[3 * i + 1]),
                        <T as BaseFloat>::from_f32(m.normals[3 * i + 2]),
                    )
                }
            };
            let texcoord = |i: usize| {
                if m.texcoords.is_empty() {
                    Vector2::zeros()
                } else {
                    Vector2::new(
                        <T as BaseFloat>::from_f32(m.texcoords[2 * i]),
                        <T as BaseFloat>::from_f32(m.texcoords[2 * i + 1]),
                    )
                }
            };
            for idx in m.indices.chunks_exact(3) {
                let (i0, i1, i2) = (idx[0] as usize, idx[1] as usize, idx[2] as usize);
                tris.push(Tri::new(position(i0), position(i1), position(i2)));
                tri_ex.push(TriEx {
                    n0: normal(i0),
                    n1: normal(i1),
                    n2: normal(i2),
                    uv0: texcoord(i0),
                    uv1: texcoord(i1),
                    uv2: texcoord(i2),
                });
            }
        }

        let texture = match texture_path {
            Some(path) => Some(Surface::from_image(path)?),
            None => None,
        };
        Ok(Mesh::from_tris(tris, tri_ex, texture))
    }

    /// Builds the hierarchy over already-loaded triangles.
    pub fn from_tris(tris: Vec<Tri<T>>, tri_ex: Vec<TriEx<T>>, texture: Option<Surface>) -> Self {
        let tri_count = tris.len();
        let start = Instant::now();
        let mut blas = Blas::new(tris);
        blas.build::<BinnedSah<BINS>>();
        info!(
            "built BLAS over {} triangles, {} nodes, in {:.2} ms",
            tri_count,
            blas.nodes_used(),
            start.elapsed().as_secs_f64() * 1e3
        );
        Mesh {
            blas: Arc::new(blas),
            tri_ex,
            texture,
        }
    }
}


#[cfg(test)]
mod test {
    use std::io::Write;
    use nalgebra::Vector3;
    use crate::error::LoadError;
    use super::{load_tri_file, Mesh, Surface};

    #[test]
    fn tri_file_round_trip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "0 0 0 1 0 0 0 1 0").unwrap();
        writeln!(file, "0 0 1 1 0 1 0 1 1").unwrap();
        file.flush().unwrap();

        let tris = load_tri_file::<f32>(file.path(), 2).unwrap();
        assert_eq!(tris.len(), 2);
        assert_eq!(tris[0].vertex1, Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(tris[1].vertex0, Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn short_tri_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "0 0 0 1 0 0 0 1 0").unwrap();
        file.flush().unwrap();

        let err = load_tri_file::<f32>(file.path(), 2).unwrap_err();
        assert!(matches!(err, LoadError::TriFormat { .. }));
    }

    #[test]
    fn malformed_float_is_rejected_with_its_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "0 0 0 1 0 0 0 1 0").unwrap();
        writeln!(file, "0 0 0 banana 0 0 0 1 0").unwrap();
        file.flush().unwrap();

        match load_tri_file::<f32>(file.path(), 2).unwrap_err() {
            LoadError::TriFormat { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn tri_file_mesh_is_traceable() {
        use crate::geom::ray::{Ray, RayCounter};

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "-1 -1 0 1 -1 0 0 1 0").unwrap();
        file.flush().unwrap();

        let mesh = Mesh::<f32>::from_tri_file(file.path(), 1).unwrap();
        assert!(mesh.tri_ex.is_empty());
        let mut ray = Ray::new(Vector3::new(0.0, 0.0, -3.0), Vector3::new(0.0, 0.0, 1.0));
        mesh.blas.intersect(&mut ray, 0, &mut RayCounter::default());
        assert!(ray.hit.is_hit());
    }

    #[test]
    fn obj_loader_produces_matching_attribute_arrays() {
        let mut file = tempfile::Builder::new().suffix(".obj").tempfile().unwrap();
        writeln!(file, "v 0 0 0").unwrap();
        writeln!(file, "v 1 0 0").unwrap();
        writeln!(file, "v 0 1 0").unwrap();
        writeln!(file, "f 1 2 3").unwrap();
        file.flush().unwrap();

        let mesh = Mesh::<f32>::from_obj(file.path(), None).unwrap();
        assert_eq!(mesh.blas.tris().len(), 1);
        assert_eq!(mesh.tri_ex.len(), 1);
        assert!(mesh.texture.is_none());
        assert_eq!(mesh.blas.tris()[0].vertex2, Vector3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn surface_plots_packed_pixels() {
        let mut surface = Surface::new(4, 2);
        surface.plot(3, 1, 0x00ff8040);
        assert_eq!(surface.pixel(3, 1), 0x00ff8040);
        assert_eq!(surface.pixel(0, 0), 0);
    }
}
