//! Wavefront OBJ export and import.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use nalgebra::{Point3, Vector3};
use tracing::{debug, info, warn};

use crate::Mesh;
use crate::error::{ScanError, ScanResult};
use crate::types::Triangle;

/// Check the output file name and append `.obj` when it has no extension.
///
/// Any extension other than `.obj` (case-insensitive) fails with
/// [`ScanError::InvalidOutputPath`].
pub fn resolve_output_path(path: impl AsRef<Path>) -> ScanResult<PathBuf> {
    let path = path.as_ref();
    match path.extension().and_then(|e| e.to_str()) {
        None => Ok(path.with_extension("obj")),
        Some(ext) if ext.eq_ignore_ascii_case("obj") => Ok(path.to_path_buf()),
        Some(ext) => Err(ScanError::InvalidOutputPath {
            path: path.to_path_buf(),
            extension: ext.to_string(),
        }),
    }
}

/// Save a mesh as a single named OBJ object.
///
/// Vertices are written once, one `vn` per face, and every corner of a face
/// references that face's normal (`f v//n`), which keeps shading flat.
pub fn save_obj(mesh: &Mesh, path: &Path) -> ScanResult<()> {
    info!("Saving mesh to {:?} (OBJ format)", path);
    mesh.validate()?;

    let file = File::create(path).map_err(|e| ScanError::io_write(path, e))?;
    let mut writer = BufWriter::new(file);
    write_obj(mesh, &mut writer).map_err(|e| ScanError::io_write(path, e))?;

    info!(
        "Saved {} vertices and {} faces to {:?}",
        mesh.vertices.len(),
        mesh.faces.len(),
        path
    );
    Ok(())
}

fn write_obj<W: Write>(mesh: &Mesh, writer: &mut W) -> std::io::Result<()> {
    writeln!(writer, "# Arena mesh exported by arena-scan")?;
    writeln!(writer, "# Vertices: {}", mesh.vertices.len())?;
    writeln!(writer, "# Faces: {}", mesh.faces.len())?;
    writeln!(writer)?;
    writeln!(writer, "o {}", mesh.name)?;

    for v in &mesh.vertices {
        writeln!(writer, "v {:.6} {:.6} {:.6}", v.x, v.y, v.z)?;
    }
    for n in &mesh.normals {
        writeln!(writer, "vn {:.6} {:.6} {:.6}", n.x, n.y, n.z)?;
    }

    writeln!(writer, "s off")?;
    for (i, face) in mesh.faces.iter().enumerate() {
        // OBJ uses 1-based indexing
        let n = i + 1;
        writeln!(
            writer,
            "f {}//{} {}//{} {}//{}",
            face[0] + 1,
            n,
            face[1] + 1,
            n,
            face[2] + 1,
            n
        )?;
    }

    writer.flush()
}

/// Load an OBJ file into a flat-shaded mesh.
///
/// Polygons are fan-triangulated and multiple objects are merged. Each
/// triangle takes the normal referenced by its first corner; files without
/// normals get normals computed from the geometry.
pub fn load_obj(path: &Path) -> ScanResult<Mesh> {
    let (models, _materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: false,
            ..Default::default()
        },
    )
    .map_err(|e| match e {
        tobj::LoadError::OpenFileFailed => ScanError::io_read(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "unable to open file"),
        ),
        other => ScanError::parse_error(path, other.to_string()),
    })?;

    let Some(first) = models.first() else {
        return Err(ScanError::invalid_mesh("OBJ file contains no objects"));
    };

    let mut mesh = Mesh::new(first.name.clone());
    let mut recomputed = 0usize;

    for model in &models {
        debug!("OBJ model '{}': loading", model.name);
        let obj_mesh = &model.mesh;
        let vertex_offset = mesh.vertices.len() as u32;

        mesh.vertices.extend(
            obj_mesh
                .positions
                .chunks_exact(3)
                .map(|c| Point3::new(c[0] as f64, c[1] as f64, c[2] as f64)),
        );

        let normals: Vec<Vector3<f64>> = obj_mesh
            .normals
            .chunks_exact(3)
            .map(|c| Vector3::new(c[0] as f64, c[1] as f64, c[2] as f64))
            .collect();

        for (tri, corners) in obj_mesh.indices.chunks_exact(3).enumerate() {
            let face = [
                corners[0] + vertex_offset,
                corners[1] + vertex_offset,
                corners[2] + vertex_offset,
            ];
            if let Some(&bad) = face.iter().find(|&&i| i as usize >= mesh.vertices.len()) {
                return Err(ScanError::parse_error(
                    path,
                    format!("face references missing vertex {}", bad + 1),
                ));
            }

            let normal = obj_mesh
                .normal_indices
                .get(tri * 3)
                .and_then(|&n| normals.get(n as usize))
                .copied()
                .or_else(|| {
                    recomputed += 1;
                    Triangle::new(
                        mesh.vertices[face[0] as usize],
                        mesh.vertices[face[1] as usize],
                        mesh.vertices[face[2] as usize],
                    )
                    .normal()
                })
                .unwrap_or_else(Vector3::zeros);

            mesh.faces.push(face);
            mesh.normals.push(normal);
        }
    }

    if recomputed > 0 {
        warn!(recomputed, "OBJ faces without normals; computed from geometry");
    }

    debug!(
        "OBJ loaded: {} vertices, {} faces from {} models",
        mesh.vertices.len(),
        mesh.faces.len(),
        models.len()
    );

    mesh.validate()?;
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use tempfile::NamedTempFile;

    fn tetrahedron() -> Mesh {
        let mut mesh = Mesh::new("arena");
        mesh.vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(0.0, 10.0, 0.0),
            Point3::new(0.0, 0.0, 10.0),
        ];
        mesh.faces = vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]];
        mesh.normals = mesh
            .triangles()
            .map(|t| t.normal().unwrap())
            .collect();
        mesh
    }

    #[test]
    fn test_resolve_output_path() {
        assert_eq!(resolve_output_path("arena").unwrap(), PathBuf::from("arena.obj"));
        assert_eq!(
            resolve_output_path("out/arena.obj").unwrap(),
            PathBuf::from("out/arena.obj")
        );
        assert_eq!(resolve_output_path("arena.OBJ").unwrap(), PathBuf::from("arena.OBJ"));

        let err = resolve_output_path("arena.stl").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidOutputPath);
        assert!(err.to_string().contains("stl"));
    }

    #[test]
    fn test_save_writes_object_normals_and_faces() {
        let mesh = tetrahedron();
        let file = NamedTempFile::with_suffix(".obj").unwrap();
        save_obj(&mesh, file.path()).unwrap();

        let text = std::fs::read_to_string(file.path()).unwrap();
        assert!(text.contains("o arena\n"));
        assert_eq!(text.lines().filter(|l| l.starts_with("v ")).count(), 4);
        assert_eq!(text.lines().filter(|l| l.starts_with("vn ")).count(), 4);
        assert!(text.contains("f 1//1 3//1 2//1"));
        assert!(text.contains("f 2//4 3//4 4//4"));
    }

    #[test]
    fn test_save_and_reload_obj() {
        let mesh = tetrahedron();
        let file = NamedTempFile::with_suffix(".obj").unwrap();
        save_obj(&mesh, file.path()).unwrap();

        let reloaded = load_obj(file.path()).unwrap();
        assert_eq!(reloaded.name, "arena");
        assert_eq!(reloaded.vertex_count(), 4);
        assert_eq!(reloaded.face_count(), 4);

        // The loader may renumber vertices, so compare triangle corners.
        for (i, (orig, loaded)) in mesh.triangles().zip(reloaded.triangles()).enumerate() {
            for (a, b) in [(orig.v0, loaded.v0), (orig.v1, loaded.v1), (orig.v2, loaded.v2)] {
                assert!(
                    (a - b).norm() < 1e-5,
                    "Face {} corner mismatch: {:?} vs {:?}",
                    i,
                    a,
                    b
                );
            }
        }
        for (a, b) in mesh.normals.iter().zip(&reloaded.normals) {
            assert!((a - b).norm() < 1e-5);
        }
    }

    #[test]
    fn test_load_without_normals_recomputes_them() {
        let mut file = NamedTempFile::with_suffix(".obj").unwrap();
        writeln!(file, "o plate").unwrap();
        writeln!(file, "v 0 0 0").unwrap();
        writeln!(file, "v 1 0 0").unwrap();
        writeln!(file, "v 1 1 0").unwrap();
        writeln!(file, "v 0 1 0").unwrap();
        writeln!(file, "f 1 2 3 4").unwrap();
        file.flush().unwrap();

        let mesh = load_obj(file.path()).unwrap();
        assert_eq!(mesh.name, "plate");
        assert_eq!(mesh.face_count(), 2);
        for n in &mesh.normals {
            assert!((n - Vector3::z()).norm() < 1e-9);
        }
    }

    #[test]
    fn test_save_rejects_invalid_mesh() {
        let mut mesh = tetrahedron();
        mesh.normals.pop();
        let file = NamedTempFile::with_suffix(".obj").unwrap();
        let err = save_obj(&mesh, file.path()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidMesh);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_obj(Path::new("/nonexistent/arena.obj")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::IoRead);
    }
}
