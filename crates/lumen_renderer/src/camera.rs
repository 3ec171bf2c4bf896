//! Positionable cameras for primary ray generation.
//!
//! A camera is a position plus a right-handed orthonormal basis `{u, v, dir}`
//! where `dir` points *away* from what the camera looks at. The projection is
//! a closed set of variants dispatched in [`Camera::gen_ray`]:
//!
//! - **Perspective**: every ray starts at the camera position; the film plane
//!   sits one unit in front of it and its size follows from the vertical field
//!   of view and aspect ratio.
//! - **Orthogonal**: every ray travels along `-dir`; the film plane is given
//!   directly in world units and rays start on it.

use crate::error::CameraError;
use crate::ray::{RayHit, DEFAULT_FAR, DEFAULT_NEAR};
use lumen_math::{Ray, Vec3};

/// Default vertical field of view in degrees.
pub const DEFAULT_VFOV: f32 = 90.0;

/// Default film extent of an orthogonal camera, in world units.
pub const DEFAULT_EXTENT: f32 = 256.0;

/// The film plane, in plane-local units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Film {
    pub width: f32,
    pub height: f32,
}

/// Projection model and its parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Vertical field of view in degrees and width/height aspect ratio.
    Perspective { vfov: f32, aspect: f32 },
    /// Film plane extent set directly in world units.
    Orthogonal,
}

/// A positionable camera (right-handed coordinate system).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    position: Vec3,
    u: Vec3,
    v: Vec3,
    /// Negative view direction
    dir: Vec3,
    film: Film,
    projection: Projection,
}

impl Camera {
    /// Perspective camera at the origin looking down -Z, 90° fov, square film.
    pub fn default_perspective() -> Self {
        Self {
            position: Vec3::ZERO,
            u: Vec3::X,
            v: Vec3::Y,
            dir: Vec3::Z,
            film: perspective_film(DEFAULT_VFOV, 1.0),
            projection: Projection::Perspective {
                vfov: DEFAULT_VFOV,
                aspect: 1.0,
            },
        }
    }

    /// Orthogonal camera at the origin looking down -Z with a 256x256 film.
    pub fn default_orthogonal() -> Self {
        Self {
            film: Film {
                width: DEFAULT_EXTENT,
                height: DEFAULT_EXTENT,
            },
            projection: Projection::Orthogonal,
            ..Self::default_perspective()
        }
    }

    /// Create a perspective camera.
    ///
    /// # Arguments
    /// * `position` - Camera position
    /// * `focus` - Point the camera looks at
    /// * `up` - Rough up direction
    /// * `vfov` - Vertical field of view in degrees
    /// * `aspect` - Film width divided by film height
    pub fn perspective(
        position: Vec3,
        focus: Vec3,
        up: Vec3,
        vfov: f32,
        aspect: f32,
    ) -> Result<Self, CameraError> {
        validate_fov(vfov)?;
        validate_extent(aspect, 1.0)?;

        let mut camera = Self::default_perspective();
        camera.lookat(position, focus, up)?;
        camera.projection = Projection::Perspective { vfov, aspect };
        camera.film = perspective_film(vfov, aspect);
        Ok(camera)
    }

    /// Create an orthogonal camera whose film spans `width` x `height` world units.
    pub fn orthogonal(
        position: Vec3,
        focus: Vec3,
        up: Vec3,
        width: f32,
        height: f32,
    ) -> Result<Self, CameraError> {
        let mut camera = Self::default_orthogonal();
        camera.lookat(position, focus, up)?;
        camera.set_extent(width, height)?;
        Ok(camera)
    }

    /// Position the camera.
    ///
    /// On error the camera keeps its previous basis.
    pub fn lookat(&mut self, position: Vec3, focus: Vec3, up: Vec3) -> Result<(), CameraError> {
        let back = position - focus;
        if back.length_squared() <= f32::EPSILON * f32::EPSILON {
            return Err(CameraError::CoincidentFocus);
        }
        let dir = back.normalize();

        let side = up.normalize_or_zero().cross(dir);
        if side.length_squared() < 1e-12 {
            return Err(CameraError::ParallelUp);
        }
        let u = side.normalize();
        let v = dir.cross(u);

        self.position = position;
        self.u = u;
        self.v = v;
        self.dir = dir;
        Ok(())
    }

    /// Set the vertical field of view in degrees (perspective only).
    pub fn set_fov(&mut self, vfov: f32) -> Result<(), CameraError> {
        validate_fov(vfov)?;
        match &mut self.projection {
            Projection::Perspective { vfov: current, aspect } => {
                *current = vfov;
                self.film = perspective_film(vfov, *aspect);
                Ok(())
            }
            Projection::Orthogonal => Err(CameraError::WrongProjection {
                operation: "set_fov",
                expected: "perspective",
            }),
        }
    }

    /// Set the aspect ratio from an image size in pixels (perspective only).
    pub fn set_aspect(&mut self, width: u32, height: u32) -> Result<(), CameraError> {
        validate_extent(width as f32, height as f32)?;
        match &mut self.projection {
            Projection::Perspective { vfov, aspect } => {
                *aspect = width as f32 / height as f32;
                self.film = perspective_film(*vfov, *aspect);
                Ok(())
            }
            Projection::Orthogonal => Err(CameraError::WrongProjection {
                operation: "set_aspect",
                expected: "perspective",
            }),
        }
    }

    /// Set the extent of the film plane in world units (orthogonal only).
    pub fn set_extent(&mut self, width: f32, height: f32) -> Result<(), CameraError> {
        validate_extent(width, height)?;
        match self.projection {
            Projection::Orthogonal => {
                self.film = Film { width, height };
                Ok(())
            }
            Projection::Perspective { .. } => Err(CameraError::WrongProjection {
                operation: "set_extent",
                expected: "orthogonal",
            }),
        }
    }

    /// Generate a ray through the film coordinate `(s, t)`.
    ///
    /// `s` runs left to right and `t` top to bottom, both in `[0, 1)`. The
    /// returned record accepts hits with parameter in `[near, far)` and starts
    /// without a hit.
    #[inline]
    pub fn gen_ray(&self, s: f32, t: f32, near: f32, far: f32) -> RayHit {
        let offset = (s * 2.0 - 1.0) * 0.5 * self.film.width * self.u
            + (1.0 - t * 2.0) * 0.5 * self.film.height * self.v;

        let ray = match self.projection {
            Projection::Perspective { .. } => {
                Ray::new(self.position, (offset - self.dir).normalize())
            }
            Projection::Orthogonal => Ray::new(self.position + offset, -self.dir),
        };

        RayHit::new(ray, near, far)
    }

    /// [`gen_ray`](Self::gen_ray) over the default interval `[0, f32::MAX)`.
    #[inline]
    pub fn primary_ray(&self, s: f32, t: f32) -> RayHit {
        self.gen_ray(s, t, DEFAULT_NEAR, DEFAULT_FAR)
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn u(&self) -> Vec3 {
        self.u
    }

    pub fn v(&self) -> Vec3 {
        self.v
    }

    /// Negative view direction.
    pub fn dir(&self) -> Vec3 {
        self.dir
    }

    pub fn film(&self) -> Film {
        self.film
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    pub fn is_perspective(&self) -> bool {
        matches!(self.projection, Projection::Perspective { .. })
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::default_perspective()
    }
}

/// Film plane one unit in front of a perspective camera.
fn perspective_film(vfov: f32, aspect: f32) -> Film {
    let height = 2.0 * (vfov.to_radians() / 2.0).tan();
    Film {
        width: height * aspect,
        height,
    }
}

fn validate_fov(vfov: f32) -> Result<(), CameraError> {
    if vfov.is_finite() && vfov > 0.0 && vfov < 180.0 {
        Ok(())
    } else {
        Err(CameraError::InvalidFov(vfov))
    }
}

fn validate_extent(width: f32, height: f32) -> Result<(), CameraError> {
    if width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0 {
        Ok(())
    } else {
        Err(CameraError::InvalidExtent { width, height })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn assert_orthonormal(cam: &Camera) {
        assert!(cam.u().dot(cam.v()).abs() < EPS);
        assert!(cam.u().dot(cam.dir()).abs() < EPS);
        assert!(cam.v().dot(cam.dir()).abs() < EPS);
        assert!((cam.u().length() - 1.0).abs() < EPS);
        assert!((cam.v().length() - 1.0).abs() < EPS);
        assert!((cam.dir().length() - 1.0).abs() < EPS);
        assert!((cam.u().cross(cam.v()) - cam.dir()).length() < EPS);
    }

    #[test]
    fn test_lookat_builds_right_handed_basis() {
        let configs = [
            (Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y),
            (Vec3::new(3.0, 2.0, -1.0), Vec3::new(0.5, 0.0, 0.2), Vec3::Y),
            (Vec3::new(-4.0, 7.0, 2.0), Vec3::ZERO, Vec3::new(0.3, 1.0, 0.1)),
            (Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO, Vec3::Z),
        ];

        for (position, focus, up) in configs {
            let mut cam = Camera::default_perspective();
            cam.lookat(position, focus, up).unwrap();
            assert_orthonormal(&cam);
            assert!((cam.dir() - (position - focus).normalize()).length() < EPS);
            assert_eq!(cam.position(), position);
        }
    }

    #[test]
    fn test_lookat_rejects_degenerate_configurations() {
        let mut cam = Camera::default_perspective();
        let before = cam;

        assert_eq!(
            cam.lookat(Vec3::ONE, Vec3::ONE, Vec3::Y),
            Err(CameraError::CoincidentFocus)
        );
        assert_eq!(
            cam.lookat(Vec3::new(0.0, 5.0, 0.0), Vec3::ZERO, Vec3::Y),
            Err(CameraError::ParallelUp)
        );
        assert_eq!(
            cam.lookat(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::ZERO),
            Err(CameraError::ParallelUp)
        );
        assert_eq!(cam, before);
    }

    #[test]
    fn test_perspective_rays_share_origin() {
        let position = Vec3::new(1.0, 2.0, 3.0);
        let cam = Camera::perspective(position, Vec3::ZERO, Vec3::Y, 60.0, 1.5).unwrap();

        for &(s, t) in &[(0.0, 0.0), (0.25, 0.75), (0.5, 0.5), (0.99, 0.1)] {
            let rh = cam.primary_ray(s, t);
            assert_eq!(rh.ray.origin, position);
            assert!((rh.ray.direction.length() - 1.0).abs() < EPS);
            assert!(!rh.is_hit());
        }
    }

    #[test]
    fn test_orthogonal_rays_share_direction() {
        let cam =
            Camera::orthogonal(Vec3::new(0.0, 3.0, 4.0), Vec3::ZERO, Vec3::Y, 4.0, 2.0).unwrap();
        let expected = -cam.dir();

        let mut origins = Vec::new();
        for &(s, t) in &[(0.0, 0.0), (0.25, 0.75), (0.5, 0.5), (0.99, 0.1)] {
            let rh = cam.primary_ray(s, t);
            assert!((rh.ray.direction - expected).length() < EPS);
            origins.push(rh.ray.origin);
        }
        assert_ne!(origins[0], origins[1]);
    }

    #[test]
    fn test_center_ray_points_along_view_direction() {
        let persp =
            Camera::perspective(Vec3::new(2.0, 1.0, 5.0), Vec3::ZERO, Vec3::Y, 45.0, 1.0).unwrap();
        let ortho =
            Camera::orthogonal(Vec3::new(2.0, 1.0, 5.0), Vec3::ZERO, Vec3::Y, 3.0, 3.0).unwrap();

        for cam in [persp, ortho] {
            let rh = cam.primary_ray(0.5, 0.5);
            assert!((rh.ray.origin - cam.position()).length() < EPS);
            assert!((rh.ray.direction + cam.dir()).length() < EPS);
        }
    }

    #[test]
    fn test_perspective_corner_ray_matches_fov() {
        // 90° fov, square film: the top-left corner ray is at 45° on both axes
        let cam = Camera::default_perspective();
        let d = cam.primary_ray(0.0, 0.0).ray.direction;
        let expected = Vec3::new(-1.0, 1.0, -1.0).normalize();
        assert!((d - expected).length() < EPS);
    }

    #[test]
    fn test_orthogonal_corner_origin_matches_extent() {
        let cam = Camera::orthogonal(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y, 4.0, 2.0)
            .unwrap();
        let origin = cam.primary_ray(0.0, 0.0).ray.origin;
        assert!((origin - Vec3::new(-2.0, 1.0, 5.0)).length() < EPS);
    }

    #[test]
    fn test_gen_ray_carries_interval() {
        let cam = Camera::default_perspective();
        let rh = cam.gen_ray(0.5, 0.5, 0.25, 10.0);
        assert_eq!(rh.interval.min, 0.25);
        assert_eq!(rh.interval.max, 10.0);
    }

    #[test]
    fn test_set_fov_and_aspect_update_film() {
        let mut cam = Camera::default_perspective();
        cam.set_fov(60.0).unwrap();
        cam.set_aspect(800, 400).unwrap();

        let half_height = (30.0f32).to_radians().tan();
        assert!((cam.film().height - 2.0 * half_height).abs() < EPS);
        assert!((cam.film().width - 4.0 * half_height).abs() < EPS);
        assert_eq!(
            cam.projection(),
            Projection::Perspective {
                vfov: 60.0,
                aspect: 2.0
            }
        );
    }

    #[test]
    fn test_setters_check_projection_kind() {
        let mut ortho = Camera::default_orthogonal();
        assert!(matches!(ortho.set_fov(45.0), Err(CameraError::WrongProjection { .. })));
        assert!(matches!(ortho.set_aspect(4, 3), Err(CameraError::WrongProjection { .. })));
        ortho.set_extent(10.0, 5.0).unwrap();
        assert_eq!(ortho.film(), Film { width: 10.0, height: 5.0 });

        let mut persp = Camera::default_perspective();
        assert!(matches!(
            persp.set_extent(1.0, 1.0),
            Err(CameraError::WrongProjection { .. })
        ));
    }

    #[test]
    fn test_invalid_parameters_are_rejected() {
        let mut cam = Camera::default_perspective();
        assert_eq!(cam.set_fov(0.0), Err(CameraError::InvalidFov(0.0)));
        assert_eq!(cam.set_fov(180.0), Err(CameraError::InvalidFov(180.0)));
        assert!(cam.set_aspect(100, 0).is_err());

        let mut ortho = Camera::default_orthogonal();
        assert!(ortho.set_extent(-1.0, 2.0).is_err());
        assert!(ortho.set_extent(1.0, f32::NAN).is_err());
    }

    #[test]
    fn test_defaults() {
        let persp = Camera::default();
        assert!(persp.is_perspective());
        assert!((persp.film().height - 2.0).abs() < EPS);

        let ortho = Camera::default_orthogonal();
        assert!(!ortho.is_perspective());
        assert_eq!(ortho.film(), Film { width: 256.0, height: 256.0 });
    }
}
