//! Multi-threaded ray caster.
//!
//! The image is split into row bands (see [`crate::bucket`]). Every band owns
//! a disjoint slice of the output buffer and is rendered on the tracer's
//! rayon pool. Shaded renders jitter sub-pixel samples from a per-band
//! `StdRng`, so identical inputs always give identical images.

use std::sync::Arc;
use std::time::Instant;

use lumen_math::{Aabb, Interval};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};

use crate::bucket::{generate_buckets, Bucket, DEFAULT_BAND_ROWS};
use crate::bvh::BvhEngine;
use crate::camera::Camera;
use crate::engine::IntersectionEngine;
use crate::error::{GeometryError, RenderError, RenderResult};
use crate::geometry::{GeometryId, GeometryStore, MeshBuffers, Topology};
use crate::material::{Color, Material};
use crate::pixel::{quantize, Layout, Pixel, MAX_CHANNEL};

/// Default jitter seed.
pub const DEFAULT_SEED: u64 = 0x5EED;

/// Render configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Worker threads, 0 for one per hardware thread
    pub threads: usize,
    /// Image rows per work unit
    pub band_rows: u32,
    /// Seed for sub-pixel jitter
    pub seed: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            band_rows: DEFAULT_BAND_ROWS,
            seed: DEFAULT_SEED,
        }
    }
}

impl RenderConfig {
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_band_rows(mut self, band_rows: u32) -> Self {
        self.band_rows = band_rows;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Renders one mesh with one material through an intersection engine.
///
/// Rendering borrows the tracer immutably while geometry and material changes
/// borrow it mutably, so the scene cannot change under an in-flight render.
pub struct RayTracer<E: IntersectionEngine = BvhEngine> {
    engine: E,
    store: GeometryStore,
    material: Material,
    pool: ThreadPool,
    config: RenderConfig,
}

impl RayTracer<BvhEngine> {
    /// Create a tracer on the built-in engine with `threads` workers (0 = all cores).
    pub fn new(threads: usize) -> RenderResult<Self> {
        Self::with_config(RenderConfig::default().with_threads(threads))
    }

    pub fn with_config(config: RenderConfig) -> RenderResult<Self> {
        Self::with_engine(BvhEngine::new(), config)
    }
}

impl<E: IntersectionEngine> RayTracer<E> {
    /// Create a tracer on a caller-provided engine.
    pub fn with_engine(engine: E, config: RenderConfig) -> RenderResult<Self> {
        let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("lumen-worker-{}", i));
        if config.threads > 0 {
            builder = builder.num_threads(config.threads);
        }
        let pool = builder.build()?;

        log::info!(
            "Ray tracer ready: {} worker threads, {} rows per band",
            pool.current_num_threads(),
            config.band_rows.max(1)
        );

        Ok(Self {
            engine,
            store: GeometryStore::new(),
            material: Material::default(),
            pool,
            config,
        })
    }

    /// Copy `positions` and `indices` into tracer-owned storage and attach them.
    ///
    /// Replaces the previously attached mesh. Buffers that fail validation
    /// leave the previous mesh attached.
    pub fn attach_geometry<P, I>(
        &mut self,
        positions: &[P],
        indices: &[I],
        topology: Topology,
    ) -> Result<GeometryId, GeometryError>
    where
        P: Copy + Into<f64>,
        I: Copy + TryInto<u64>,
    {
        let mesh = MeshBuffers::owned(positions, indices, topology)?;
        self.store.attach(&mut self.engine, mesh)
    }

    /// Attach caller-shared buffers without copying them.
    ///
    /// The tracer holds a reference to both buffers until the mesh is released.
    pub fn attach_geometry_shared(
        &mut self,
        positions: Arc<[f32]>,
        indices: Arc<[u32]>,
        topology: Topology,
    ) -> Result<GeometryId, GeometryError> {
        let mesh = MeshBuffers::shared(positions, indices, topology)?;
        self.store.attach(&mut self.engine, mesh)
    }

    /// Detach the active mesh. Does nothing when no mesh is attached.
    pub fn release_geometry(&mut self) {
        self.store.release(&mut self.engine);
    }

    pub fn set_material(&mut self, material: Material) {
        self.material = material;
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn active_geometry(&self) -> Option<GeometryId> {
        self.store.active_id()
    }

    /// Buffers of the active mesh.
    pub fn geometry(&self) -> Option<&MeshBuffers> {
        self.store.mesh()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// World bounds of the active mesh, `Aabb::EMPTY` without geometry.
    pub fn bounds(&self) -> Aabb {
        self.engine.bounds()
    }

    pub fn thread_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render a shaded 3-channel image into `pixels`.
    ///
    /// With one sample the ray goes through the pixel center; with more,
    /// samples are jittered inside the pixel and averaged. Channels are
    /// clamped to `[0, 1]` and scaled to `0..=255`.
    pub fn render_shaded<T: Pixel>(
        &self,
        pixels: &mut [T],
        camera: &Camera,
        width: u32,
        height: u32,
        samples: u32,
        layout: Layout,
    ) -> RenderResult<()> {
        if samples == 0 {
            return Err(RenderError::NoSamples);
        }
        let plane = plane_len(width, height);
        let pixels = output_slice(pixels, 3 * plane)?;
        let start = Instant::now();

        let buckets = generate_buckets(width, height, self.config.band_rows);
        let band_len = self.band_len(width);

        let shade = |x: u32, y: u32, rng: &mut StdRng| {
            let color = self.shade_pixel(camera, x, y, width, height, samples, rng);
            [quantize(color.x), quantize(color.y), quantize(color.z)]
        };

        match layout {
            Layout::Interleaved => self.pool.install(|| {
                pixels
                    .par_chunks_mut(3 * band_len)
                    .zip(buckets.par_iter())
                    .for_each(|(band, bucket)| {
                        let mut rng = self.band_rng(bucket);
                        for ((x, y), out) in bucket.pixels().zip(band.chunks_exact_mut(3)) {
                            let rgb = shade(x, y, &mut rng);
                            for (o, c) in out.iter_mut().zip(rgb) {
                                *o = T::from_value(c);
                            }
                        }
                    })
            }),
            Layout::Planar => {
                let (red, rest) = pixels.split_at_mut(plane);
                let (green, blue) = rest.split_at_mut(plane);
                self.pool.install(|| {
                    red.par_chunks_mut(band_len)
                        .zip(green.par_chunks_mut(band_len))
                        .zip(blue.par_chunks_mut(band_len))
                        .zip(buckets.par_iter())
                        .for_each(|(((r, g), b), bucket)| {
                            let mut rng = self.band_rng(bucket);
                            for (i, (x, y)) in bucket.pixels().enumerate() {
                                let [cr, cg, cb] = shade(x, y, &mut rng);
                                r[i] = T::from_value(cr);
                                g[i] = T::from_value(cg);
                                b[i] = T::from_value(cb);
                            }
                        })
                });
            }
        }

        log::debug!(
            "Shaded {}x{} at {} spp ({:?}) in {:.2?}",
            width,
            height,
            samples,
            layout,
            start.elapsed()
        );
        Ok(())
    }

    /// Render a 1-channel depth image into `pixels`.
    ///
    /// Raw depth writes the hit distance and 0 for misses. Tone-mapped depth
    /// writes 254 for the nearest hit in the frame, 1 for the farthest and 0
    /// for misses, so values stay in `[0, 255)`; a frame with no hits is all
    /// zeros.
    pub fn render_depth<T: Pixel>(
        &self,
        pixels: &mut [T],
        camera: &Camera,
        width: u32,
        height: u32,
        tone_mapped: bool,
    ) -> RenderResult<()> {
        let pixels = output_slice(pixels, plane_len(width, height))?;
        let start = Instant::now();

        if !tone_mapped {
            self.for_each_band(pixels, width, height, |bucket, band| {
                for ((x, y), out) in bucket.pixels().zip(band.iter_mut()) {
                    let depth = self.trace_depth(camera, x, y, width, height);
                    *out = T::from_value(depth.unwrap_or(0.0));
                }
            });
            log::debug!("Depth {}x{} in {:.2?}", width, height, start.elapsed());
            return Ok(());
        }

        let mut depths = vec![None; pixels.len()];
        self.for_each_band(&mut depths, width, height, |bucket, band| {
            for ((x, y), out) in bucket.pixels().zip(band.iter_mut()) {
                *out = self.trace_depth(camera, x, y, width, height);
            }
        });

        // Barrier: the range must cover every band before any pixel is mapped
        let range = self.pool.install(|| {
            depths
                .par_iter()
                .filter_map(|d| *d)
                .fold(|| Interval::EMPTY, |acc, d| acc.include(d))
                .reduce(|| Interval::EMPTY, |a, b| Interval::surrounding(&a, &b))
        });

        let band_len = self.band_len(width);
        self.pool.install(|| {
            pixels
                .par_chunks_mut(band_len)
                .zip(depths.par_chunks(band_len))
                .for_each(|(out, depth)| {
                    for (o, d) in out.iter_mut().zip(depth) {
                        *o = T::from_value(d.map_or(0.0, |d| tone_map_depth(d, range)));
                    }
                })
        });

        if range.is_empty() {
            log::debug!("Tone-mapped depth {}x{}: no hits", width, height);
        } else {
            log::debug!(
                "Tone-mapped depth {}x{} over [{}, {}] in {:.2?}",
                width,
                height,
                range.min,
                range.max,
                start.elapsed()
            );
        }
        Ok(())
    }

    /// Render a 1-channel coverage mask: 255 where a surface is hit, 0 elsewhere.
    pub fn render_silhouette<T: Pixel>(
        &self,
        pixels: &mut [T],
        camera: &Camera,
        width: u32,
        height: u32,
    ) -> RenderResult<()> {
        let pixels = output_slice(pixels, plane_len(width, height))?;
        let start = Instant::now();

        self.for_each_band(pixels, width, height, |bucket, band| {
            for ((x, y), out) in bucket.pixels().zip(band.iter_mut()) {
                let (s, t) = pixel_center(x, y, width, height);
                let rayhit = camera.primary_ray(s, t);
                let value = if self.engine.occluded(&rayhit) {
                    MAX_CHANNEL
                } else {
                    0.0
                };
                *out = T::from_value(value);
            }
        });

        log::debug!("Silhouette {}x{} in {:.2?}", width, height, start.elapsed());
        Ok(())
    }

    /// Run `f` over every band of a single-channel buffer on the pool.
    fn for_each_band<V, F>(&self, values: &mut [V], width: u32, height: u32, f: F)
    where
        V: Send,
        F: Fn(&Bucket, &mut [V]) + Sync,
    {
        let buckets = generate_buckets(width, height, self.config.band_rows);
        let band_len = self.band_len(width);
        self.pool.install(|| {
            values
                .par_chunks_mut(band_len)
                .zip(buckets.par_iter())
                .for_each(|(band, bucket)| f(bucket, band))
        });
    }

    /// Elements per band in a single-channel buffer.
    fn band_len(&self, width: u32) -> usize {
        // Zero-width images have no buckets; keep chunk sizes non-zero
        (self.config.band_rows.max(1) as usize * width as usize).max(1)
    }

    fn band_rng(&self, bucket: &Bucket) -> StdRng {
        StdRng::seed_from_u64(
            self.config.seed ^ (bucket.index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15),
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn shade_pixel(
        &self,
        camera: &Camera,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        samples: u32,
        rng: &mut StdRng,
    ) -> Color {
        if samples == 1 {
            let (s, t) = pixel_center(x, y, width, height);
            return self.shade_sample(camera, s, t);
        }

        let mut sum = Color::ZERO;
        for _ in 0..samples {
            let s = (x as f32 + rng.gen::<f32>()) / width as f32;
            let t = (y as f32 + rng.gen::<f32>()) / height as f32;
            sum += self.shade_sample(camera, s, t);
        }
        sum / samples as f32
    }

    /// Shade one camera ray with a point light at the camera position.
    fn shade_sample(&self, camera: &Camera, s: f32, t: f32) -> Color {
        let mut rayhit = camera.primary_ray(s, t);
        self.engine.intersect(&mut rayhit);

        match rayhit.hit {
            Some(hit) => {
                let normal = hit.facing_normal(rayhit.ray.direction);
                let to_light = (camera.position() - hit.point).normalize_or_zero();
                self.material.shade(normal, to_light)
            }
            None => Color::ZERO,
        }
    }

    fn trace_depth(&self, camera: &Camera, x: u32, y: u32, width: u32, height: u32) -> Option<f32> {
        let (s, t) = pixel_center(x, y, width, height);
        let mut rayhit = camera.primary_ray(s, t);
        self.engine.intersect(&mut rayhit);
        rayhit.depth()
    }
}

impl<E: IntersectionEngine> Drop for RayTracer<E> {
    fn drop(&mut self) {
        self.store.release(&mut self.engine);
    }
}

/// Brightest value a tone-mapped hit can take; hits stay below 255.
const TONE_MAX: f32 = MAX_CHANNEL - 1.0;

/// Map a hit distance into `1..=254`: nearest 254, farthest 1.
///
/// When every hit lies at the same depth the result is 254.
pub fn tone_map_depth(depth: f32, range: Interval) -> f32 {
    let span = range.size();
    if span <= 0.0 {
        return TONE_MAX;
    }
    (1.0 + (TONE_MAX - 1.0) * (range.max - depth) / span).round()
}

/// Normalized film coordinates of the center of pixel `(x, y)`.
#[inline]
fn pixel_center(x: u32, y: u32, width: u32, height: u32) -> (f32, f32) {
    (
        (x as f32 + 0.5) / width as f32,
        (y as f32 + 0.5) / height as f32,
    )
}

fn plane_len(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

/// The first `required` elements of `pixels`, or an error if it is shorter.
fn output_slice<T>(pixels: &mut [T], required: usize) -> RenderResult<&mut [T]> {
    let actual = pixels.len();
    pixels
        .get_mut(..required)
        .ok_or(RenderError::BufferTooSmall { required, actual })
}
