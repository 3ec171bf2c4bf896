//! Geometry store: the single mesh currently registered with the engine.
//!
//! Buffers come in two flavors:
//! - **Owned**: the caller's buffers are copied (positions get one trailing
//!   padding float so engines with vector-width read-ahead stay in bounds).
//! - **Shared**: the store keeps reference-counted handles to the caller's
//!   buffers without copying. A shared position buffer may carry its own
//!   trailing padding float; it is not part of the mesh.
//!
//! Buffers are validated before anything already attached is released, so a
//! rejected attach leaves the previous mesh in place.

use std::fmt;
use std::sync::Arc;

use crate::engine::IntersectionEngine;
use crate::error::GeometryError;
use lumen_math::{Aabb, Vec3};
use serde::{Deserialize, Serialize};

/// Face layout of the index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    #[default]
    Triangle,
    Quad,
}

impl Topology {
    /// Number of indices per face.
    pub fn arity(self) -> usize {
        match self {
            Topology::Triangle => 3,
            Topology::Quad => 4,
        }
    }
}

/// Id of a mesh registered with an intersection engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryId(pub u32);

impl fmt::Display for GeometryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "geom#{}", self.0)
    }
}

enum Buffers {
    Owned {
        positions: Vec<f32>,
        indices: Vec<u32>,
    },
    Shared {
        positions: Arc<[f32]>,
        indices: Arc<[u32]>,
    },
}

/// Validated position and index buffers of one mesh.
pub struct MeshBuffers {
    buffers: Buffers,
    topology: Topology,
    vertex_count: usize,
}

impl MeshBuffers {
    /// Copy caller buffers into an owned mesh.
    ///
    /// Positions may be any float-like type and indices any integer type;
    /// they are converted to `f32` and `u32`.
    pub fn owned<P, I>(positions: &[P], indices: &[I], topology: Topology) -> Result<Self, GeometryError>
    where
        P: Copy + Into<f64>,
        I: Copy + TryInto<u64>,
    {
        if positions.len() % 3 != 0 {
            return Err(GeometryError::PositionArity(positions.len()));
        }

        let mut converted_indices = Vec::with_capacity(indices.len());
        for (position, &index) in indices.iter().enumerate() {
            let wide: u64 = index
                .try_into()
                .map_err(|_| GeometryError::IndexOverflow(position))?;
            let narrow = u32::try_from(wide).map_err(|_| GeometryError::IndexOverflow(position))?;
            converted_indices.push(narrow);
        }

        let mut converted_positions = Vec::with_capacity(positions.len() + 1);
        converted_positions.extend(positions.iter().map(|&p| Into::<f64>::into(p) as f32));
        // Padding for read-ahead
        converted_positions.push(0.0);

        let vertex_count = positions.len() / 3;
        validate_indices(&converted_indices, vertex_count, topology)?;

        Ok(Self {
            buffers: Buffers::Owned {
                positions: converted_positions,
                indices: converted_indices,
            },
            topology,
            vertex_count,
        })
    }

    /// Wrap caller buffers without copying.
    ///
    /// `positions` holds `3 * n` floats, optionally followed by one padding float.
    pub fn shared(
        positions: Arc<[f32]>,
        indices: Arc<[u32]>,
        topology: Topology,
    ) -> Result<Self, GeometryError> {
        if positions.len() % 3 == 2 {
            return Err(GeometryError::PositionArity(positions.len()));
        }

        let vertex_count = positions.len() / 3;
        validate_indices(&indices, vertex_count, topology)?;

        Ok(Self {
            buffers: Buffers::Shared { positions, indices },
            topology,
            vertex_count,
        })
    }

    /// Vertex positions as flat `xyz` triples, without padding.
    pub fn positions(&self) -> &[f32] {
        &self.raw_positions()[..self.vertex_count * 3]
    }

    /// The full position buffer including padding, if it has any.
    pub fn padded_positions(&self) -> Option<&[f32]> {
        let raw = self.raw_positions();
        (raw.len() > self.vertex_count * 3).then_some(raw)
    }

    fn raw_positions(&self) -> &[f32] {
        match &self.buffers {
            Buffers::Owned { positions, .. } => positions,
            Buffers::Shared { positions, .. } => positions,
        }
    }

    /// Flat index buffer, `topology.arity()` indices per face.
    pub fn indices(&self) -> &[u32] {
        match &self.buffers {
            Buffers::Owned { indices, .. } => indices,
            Buffers::Shared { indices, .. } => indices,
        }
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn face_count(&self) -> usize {
        self.indices().len() / self.topology.arity()
    }

    /// Whether the buffers are borrowed from the caller rather than copied.
    pub fn is_shared(&self) -> bool {
        matches!(self.buffers, Buffers::Shared { .. })
    }

    /// Position of vertex `i`.
    #[inline]
    pub fn vertex(&self, i: u32) -> Vec3 {
        let base = i as usize * 3;
        Vec3::from_slice(&self.positions()[base..base + 3])
    }

    /// Vertex indices of each face.
    pub fn faces(&self) -> impl Iterator<Item = &[u32]> + '_ {
        self.indices().chunks_exact(self.topology.arity())
    }

    /// Bounding box of all vertices.
    pub fn bounds(&self) -> Aabb {
        Aabb::from_iter_points(self.positions().chunks_exact(3).map(Vec3::from_slice))
    }
}

impl fmt::Debug for MeshBuffers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeshBuffers")
            .field("topology", &self.topology)
            .field("vertex_count", &self.vertex_count)
            .field("face_count", &self.face_count())
            .field("shared", &self.is_shared())
            .finish()
    }
}

fn validate_indices(indices: &[u32], vertex_count: usize, topology: Topology) -> Result<(), GeometryError> {
    let arity = topology.arity();
    if indices.len() % arity != 0 {
        return Err(GeometryError::IndexArity {
            len: indices.len(),
            arity,
            topology,
        });
    }

    if vertex_count == 0 || indices.is_empty() {
        return Err(GeometryError::Empty);
    }

    if let Some((position, &index)) = indices
        .iter()
        .enumerate()
        .find(|(_, &index)| index as usize >= vertex_count)
    {
        return Err(GeometryError::IndexOutOfRange {
            index: index as u64,
            position,
            vertex_count,
        });
    }

    Ok(())
}

/// A mesh that is registered with an engine.
struct Attached {
    id: GeometryId,
    mesh: MeshBuffers,
}

/// Holds at most one attached mesh.
#[derive(Default)]
pub struct GeometryStore {
    active: Option<Attached>,
}

impl GeometryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `mesh` with `engine`, releasing whatever was attached before.
    ///
    /// If the engine rejects the mesh the store is left empty.
    pub fn attach<E>(&mut self, engine: &mut E, mesh: MeshBuffers) -> Result<GeometryId, GeometryError>
    where
        E: IntersectionEngine + ?Sized,
    {
        self.release(engine);

        let id = engine.attach(&mesh).map_err(|e| {
            log::warn!("Engine rejected geometry: {}", e);
            e
        })?;

        log::debug!(
            "Attached {}: {} vertices, {} {:?} faces ({})",
            id,
            mesh.vertex_count(),
            mesh.face_count(),
            mesh.topology(),
            if mesh.is_shared() { "shared" } else { "owned" }
        );

        self.active = Some(Attached { id, mesh });
        Ok(id)
    }

    /// Deregister the attached mesh, if any.
    pub fn release<E>(&mut self, engine: &mut E)
    where
        E: IntersectionEngine + ?Sized,
    {
        // Detach before the buffers drop: the engine may point into them
        if let Some(attached) = self.active.take() {
            engine.detach(attached.id);
            log::debug!("Released {}", attached.id);
        }
    }

    /// Id of the attached mesh.
    pub fn active_id(&self) -> Option<GeometryId> {
        self.active.as_ref().map(|a| a.id)
    }

    /// Buffers of the attached mesh.
    pub fn mesh(&self) -> Option<&MeshBuffers> {
        self.active.as_ref().map(|a| &a.mesh)
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_none()
    }
}
