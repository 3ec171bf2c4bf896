//! Intersection engine contract.
//!
//! The renderer never walks triangles itself: it hands rays to an engine that
//! answers nearest-hit and occlusion queries against the attached mesh.

use crate::error::GeometryError;
use crate::geometry::{GeometryId, MeshBuffers};
use crate::ray::RayHit;
use lumen_math::Aabb;

/// Answers ray queries against at most one attached mesh.
///
/// Queries take `&self` and may run concurrently from every render worker.
pub trait IntersectionEngine: Send + Sync {
    /// Register a mesh and return its id.
    ///
    /// Engines may keep pointers into `mesh` until [`detach`](Self::detach)
    /// is called with the returned id; [`GeometryStore`](crate::GeometryStore)
    /// keeps the buffers alive and unmodified for that long.
    fn attach(&mut self, mesh: &MeshBuffers) -> Result<GeometryId, GeometryError>;

    /// Deregister a mesh. Unknown ids are ignored.
    fn detach(&mut self, id: GeometryId);

    /// Whether `id` currently resolves to registered geometry.
    fn is_attached(&self, id: GeometryId) -> bool;

    /// Find the nearest hit inside `rayhit.interval` and record it.
    ///
    /// Leaves `rayhit.hit` as `None` on a miss.
    fn intersect(&self, rayhit: &mut RayHit);

    /// Whether any surface lies inside `rayhit.interval`.
    fn occluded(&self, rayhit: &RayHit) -> bool;

    /// Bounds of the registered geometry, `Aabb::EMPTY` when nothing is attached.
    fn bounds(&self) -> Aabb;
}
