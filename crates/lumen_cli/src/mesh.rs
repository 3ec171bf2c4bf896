//! Mesh sources for the command line: OBJ files or a built-in unit cube.

use anyhow::{Context, Result};
use lumen_renderer::{Aabb, Topology, Vec3};
use std::path::Path;

/// Flat position and index buffers ready to attach.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub positions: Vec<f32>,
    pub indices: Vec<u32>,
    pub topology: Topology,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn face_count(&self) -> usize {
        self.indices.len() / self.topology.arity()
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_iter_points(self.positions.chunks_exact(3).map(Vec3::from_slice))
    }
}

/// Load every model of an OBJ file into one triangle mesh.
pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<Mesh> {
    let path = path.as_ref();
    let (models, _materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            single_index: true,
            triangulate: true,
            ..Default::default()
        },
    )
    .with_context(|| format!("Failed to load OBJ {}", path.display()))?;

    if models.is_empty() {
        anyhow::bail!("No models found in OBJ file {}", path.display());
    }

    let mut positions = Vec::new();
    let mut indices = Vec::new();
    for model in &models {
        let base = (positions.len() / 3) as u32;
        positions.extend_from_slice(&model.mesh.positions);
        indices.extend(model.mesh.indices.iter().map(|i| base + i));
        log::debug!(
            "OBJ model '{}': {} vertices, {} triangles",
            model.name,
            model.mesh.positions.len() / 3,
            model.mesh.indices.len() / 3
        );
    }

    let mesh = Mesh {
        positions,
        indices,
        topology: Topology::Triangle,
    };
    log::info!(
        "Loaded {}: {} models, {} vertices, {} triangles",
        path.display(),
        models.len(),
        mesh.vertex_count(),
        mesh.face_count()
    );
    Ok(mesh)
}

const CUBE_CORNERS: [[f32; 3]; 8] = [
    [-0.5, -0.5, -0.5],
    [0.5, -0.5, -0.5],
    [0.5, 0.5, -0.5],
    [-0.5, 0.5, -0.5],
    [-0.5, -0.5, 0.5],
    [0.5, -0.5, 0.5],
    [0.5, 0.5, 0.5],
    [-0.5, 0.5, 0.5],
];

const CUBE_FACES: [[u32; 4]; 6] = [
    [0, 3, 2, 1], // -Z
    [4, 5, 6, 7], // +Z
    [0, 4, 7, 3], // -X
    [1, 2, 6, 5], // +X
    [0, 1, 5, 4], // -Y
    [3, 7, 6, 2], // +Y
];

/// Unit cube centered at the origin, as six outward-facing quads.
pub fn unit_cube() -> Mesh {
    Mesh {
        positions: bytemuck::cast_slice(&CUBE_CORNERS).to_vec(),
        indices: bytemuck::cast_slice(&CUBE_FACES).to_vec(),
        topology: Topology::Quad,
    }
}
