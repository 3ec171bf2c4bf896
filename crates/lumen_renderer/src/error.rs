//! Error types for camera setup, geometry attachment and rendering.

use thiserror::Error;

use crate::geometry::Topology;

/// Errors raised while positioning or configuring a camera.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CameraError {
    #[error("Camera position and focus coincide")]
    CoincidentFocus,

    #[error("Up vector is parallel to the view direction")]
    ParallelUp,

    #[error("Vertical field of view must be in (0, 180) degrees, got {0}")]
    InvalidFov(f32),

    #[error("Film extent must be positive and finite, got {width}x{height}")]
    InvalidExtent { width: f32, height: f32 },

    #[error("{operation} requires a {expected} camera")]
    WrongProjection {
        operation: &'static str,
        expected: &'static str,
    },
}

/// Errors raised while attaching geometry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Position buffer length {0} is not a multiple of 3")]
    PositionArity(usize),

    #[error("Index buffer length {len} is not a multiple of {arity} ({topology:?})")]
    IndexArity {
        len: usize,
        arity: usize,
        topology: Topology,
    },

    #[error("Geometry has no vertices or no faces")]
    Empty,

    #[error("Index {index} at position {position} is out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        index: u64,
        position: usize,
        vertex_count: usize,
    },

    #[error("Index at position {0} is negative or does not fit in 32 bits")]
    IndexOverflow(usize),

    #[error("Shared position buffer must carry one trailing padding float")]
    MissingPadding,

    #[error("Intersection engine rejected geometry: {0}")]
    Engine(String),
}

/// Errors raised by the render entry points.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Output buffer holds {actual} elements, {required} required")]
    BufferTooSmall { required: usize, actual: usize },

    #[error("Samples per pixel must be at least 1")]
    NoSamples,

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Result type for rendering operations.
pub type RenderResult<T> = Result<T, RenderError>;
