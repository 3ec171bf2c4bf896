//! Triangle primitive for the built-in engine.
//!
//! Uses the Möller-Trumbore algorithm for ray-triangle intersection.

use lumen_math::{Aabb, Interval, Ray, Vec3};

/// Parallel-ray / degenerate-face threshold on the determinant.
const DET_EPSILON: f32 = 1e-12;

/// A triangle with precomputed edges, tagged with the face it came from.
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    v0: Vec3,
    edge1: Vec3,
    edge2: Vec3,
    /// Unit geometric normal (zero for degenerate faces)
    normal: Vec3,
    /// Face index in the source index buffer
    prim_id: u32,
}

/// Parameters of a ray-triangle intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    pub t: f32,
    pub u: f32,
    pub v: f32,
}

impl Triangle {
    /// Create a triangle from three vertices.
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3, prim_id: u32) -> Self {
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;

        Self {
            v0,
            edge1,
            edge2,
            normal: edge1.cross(edge2).normalize_or_zero(),
            prim_id,
        }
    }

    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    pub fn prim_id(&self) -> u32 {
        self.prim_id
    }

    /// Zero-area triangles never report hits.
    pub fn is_degenerate(&self) -> bool {
        self.normal == Vec3::ZERO
    }

    /// Bounding box of the three vertices.
    pub fn bounding_box(&self) -> Aabb {
        let v1 = self.v0 + self.edge1;
        let v2 = self.v0 + self.edge2;
        Aabb::from_points(self.v0.min(v1).min(v2), self.v0.max(v1).max(v2))
    }

    pub fn centroid(&self) -> Vec3 {
        self.v0 + (self.edge1 + self.edge2) / 3.0
    }

    /// Möller-Trumbore intersection, accepting `t` in `[ray_t.min, ray_t.max)`.
    #[inline]
    pub fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<TriangleHit> {
        let h = ray.direction.cross(self.edge2);
        let a = self.edge1.dot(h);

        // Ray is parallel to triangle, or the triangle has no area
        if a.abs() < DET_EPSILON {
            return None;
        }

        let f = 1.0 / a;
        let s = ray.origin - self.v0;
        let u = f * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(self.edge1);
        let v = f * ray.direction.dot(q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * self.edge2.dot(q);
        if !ray_t.admits(t) {
            return None;
        }

        Some(TriangleHit { t, u, v })
    }
}
