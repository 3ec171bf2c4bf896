//! Lumen - single-mesh CPU ray caster
//!
//! Casts one primary ray per sample from a perspective or orthographic camera
//! against one attached triangle or quad mesh, and writes shaded, depth or
//! silhouette images into caller-provided buffers. Rows are rendered in
//! parallel on a rayon pool.
//!
//! ```no_run
//! use lumen_renderer::{Camera, Layout, RayTracer, Topology, Vec3};
//!
//! let mut tracer = RayTracer::new(0)?;
//! let positions = [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
//! tracer.attach_geometry(&positions, &[0u32, 1, 2], Topology::Triangle)?;
//!
//! let camera = Camera::perspective(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO, Vec3::Y, 60.0, 1.0)?;
//! let mut rgb = vec![0u8; 3 * 64 * 64];
//! tracer.render_shaded(&mut rgb, &camera, 64, 64, 4, Layout::Interleaved)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod bucket;
mod bvh;
mod camera;
#[cfg(feature = "embree")]
mod embree;
mod engine;
mod error;
mod geometry;
mod material;
mod pixel;
mod ray;
mod renderer;
mod triangle;

pub use bucket::{generate_buckets, Bucket, DEFAULT_BAND_ROWS};
pub use bvh::{BvhEngine, BvhNode};
pub use camera::{Camera, Film, Projection, DEFAULT_EXTENT, DEFAULT_VFOV};
#[cfg(feature = "embree")]
pub use embree::EmbreeEngine;
pub use engine::IntersectionEngine;
pub use error::{CameraError, GeometryError, RenderError, RenderResult};
pub use geometry::{GeometryId, GeometryStore, MeshBuffers, Topology};
pub use material::{Color, Material};
pub use pixel::{quantize, Layout, Pixel, MAX_CHANNEL};
pub use ray::{Hit, RayHit, DEFAULT_FAR, DEFAULT_NEAR};
pub use renderer::{tone_map_depth, RayTracer, RenderConfig, DEFAULT_SEED};
pub use triangle::{Triangle, TriangleHit};

/// Re-export Vec3 and common math types from lumen_math
pub use lumen_math::{Aabb, Interval, Ray, Vec3};
