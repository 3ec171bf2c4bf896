//! Ray records exchanged between cameras, the renderer and intersection engines.
//!
//! A `RayHit` couples a ray with its parametric interval and a hit slot that
//! starts empty. Engines narrow the interval as they find closer surfaces.

use crate::geometry::GeometryId;
use lumen_math::{Interval, Ray, Vec3};

/// Default near end of a camera ray.
pub const DEFAULT_NEAR: f32 = 0.0;

/// Default far end of a camera ray.
pub const DEFAULT_FAR: f32 = f32::MAX;

/// Nearest surface intersection along a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Ray parameter of the intersection
    pub t: f32,
    /// World-space hit point
    pub point: Vec3,
    /// Unit geometric normal, in winding order (not flipped towards the ray)
    pub normal: Vec3,
    /// Index of the face that was hit
    pub prim_id: u32,
    /// Geometry the face belongs to
    pub geom_id: GeometryId,
    /// Barycentric coordinates inside the hit triangle
    pub u: f32,
    pub v: f32,
}

impl Hit {
    /// Normal flipped, if needed, to face against `direction`.
    #[inline]
    pub fn facing_normal(&self, direction: Vec3) -> Vec3 {
        if self.normal.dot(-direction) < 0.0 {
            -self.normal
        } else {
            self.normal
        }
    }
}

/// A ray, its valid parameter range `[near, far)`, and the hit found so far.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub ray: Ray,
    pub interval: Interval,
    pub hit: Option<Hit>,
}

impl RayHit {
    /// Create a ray record with no hit.
    #[inline]
    pub fn new(ray: Ray, near: f32, far: f32) -> Self {
        Self {
            ray,
            interval: Interval::new(near, far),
            hit: None,
        }
    }

    /// Whether an engine recorded a hit.
    #[inline]
    pub fn is_hit(&self) -> bool {
        self.hit.is_some()
    }

    /// Distance to the recorded hit, if any.
    #[inline]
    pub fn depth(&self) -> Option<f32> {
        self.hit.map(|h| h.t)
    }

    /// Record a hit and shrink the interval so only closer hits are accepted.
    #[inline]
    pub fn record(&mut self, hit: Hit) {
        self.interval.max = hit.t;
        self.hit = Some(hit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit_at(t: f32, normal: Vec3) -> Hit {
        Hit {
            t,
            point: Vec3::ZERO,
            normal,
            prim_id: 0,
            geom_id: GeometryId(0),
            u: 0.0,
            v: 0.0,
        }
    }

    #[test]
    fn test_new_record_has_no_hit() {
        let rh = RayHit::new(Ray::new(Vec3::ZERO, Vec3::Z), DEFAULT_NEAR, DEFAULT_FAR);

        assert!(!rh.is_hit());
        assert_eq!(rh.depth(), None);
        assert_eq!(rh.interval.min, 0.0);
        assert_eq!(rh.interval.max, f32::MAX);
    }

    #[test]
    fn test_record_shrinks_interval() {
        let mut rh = RayHit::new(Ray::new(Vec3::ZERO, Vec3::Z), 0.0, 100.0);
        rh.record(hit_at(4.0, Vec3::NEG_Z));

        assert_eq!(rh.depth(), Some(4.0));
        assert_eq!(rh.interval.max, 4.0);
        assert!(!rh.interval.admits(4.0));
    }

    #[test]
    fn test_facing_normal_flips_towards_origin() {
        let hit = hit_at(1.0, Vec3::Z);

        // Ray travelling +Z sees the back of a +Z normal
        assert_eq!(hit.facing_normal(Vec3::Z), Vec3::NEG_Z);
        assert_eq!(hit.facing_normal(Vec3::NEG_Z), Vec3::Z);
    }
}
