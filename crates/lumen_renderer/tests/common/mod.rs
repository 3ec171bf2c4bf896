#![allow(dead_code)]

use lumen_renderer::{Camera, RayTracer, RenderConfig, Vec3};

pub const WIDTH: u32 = 64;
pub const HEIGHT: u32 = 64;

/// Unit cube centered at the origin.
pub const CUBE_POSITIONS: [f32; 24] = [
    -0.5, -0.5, -0.5, //
    0.5, -0.5, -0.5, //
    0.5, 0.5, -0.5, //
    -0.5, 0.5, -0.5, //
    -0.5, -0.5, 0.5, //
    0.5, -0.5, 0.5, //
    0.5, 0.5, 0.5, //
    -0.5, 0.5, 0.5, //
];

/// Outward-facing quads of the cube.
pub const CUBE_QUADS: [u32; 24] = [
    0, 3, 2, 1, // -Z
    4, 5, 6, 7, // +Z
    0, 4, 7, 3, // -X
    1, 2, 6, 5, // +X
    0, 1, 5, 4, // -Y
    3, 7, 6, 2, // +Y
];

/// The cube quads split into triangles.
pub fn cube_triangles() -> Vec<u32> {
    CUBE_QUADS
        .chunks_exact(4)
        .flat_map(|q| [q[0], q[1], q[2], q[0], q[2], q[3]])
        .collect()
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn tracer() -> RayTracer {
    init_logging();
    RayTracer::with_config(RenderConfig::default().with_threads(4)).unwrap()
}

/// Perspective camera on +Z looking at the origin, 60° vfov.
pub fn front_camera(distance: f32) -> Camera {
    Camera::perspective(Vec3::new(0.0, 0.0, distance), Vec3::ZERO, Vec3::Y, 60.0, 1.0).unwrap()
}

/// Perspective camera looking at the cube from above a corner.
pub fn corner_camera() -> Camera {
    Camera::perspective(Vec3::new(2.0, 1.5, 2.5), Vec3::ZERO, Vec3::Y, 60.0, 1.0).unwrap()
}

pub fn at(image: &[f32], x: u32, y: u32) -> f32 {
    image[(y * WIDTH + x) as usize]
}
