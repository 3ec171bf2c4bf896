mod job;
mod mesh;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use image::{GrayImage, ImageBuffer, Luma, RgbImage};
use job::{CameraKind, Job, Mode};
use lumen_renderer::{Camera, IntersectionEngine, Layout, RayTracer};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Renders an OBJ mesh (or a unit cube) and writes PNG images.
///
/// Flags override the values of the optional JSON job file.
#[derive(Parser, Debug)]
#[command(name = "lumen", version, about, long_about = None)]
struct Cli {
    /// JSON job file
    #[arg(value_name = "JOB.json")]
    job: Option<PathBuf>,

    /// OBJ file to render
    #[arg(long, value_name = "PATH")]
    mesh: Option<PathBuf>,

    /// Output image path
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Image to render (repeatable)
    #[arg(long = "mode", value_name = "MODE", value_enum)]
    modes: Vec<ModeArg>,

    /// Image size in pixels
    #[arg(long, value_name = "WxH", value_parser = parse_size)]
    size: Option<(u32, u32)>,

    /// Samples per pixel for shaded images
    #[arg(long, value_name = "N")]
    samples: Option<u32>,

    /// Camera projection
    #[arg(long, value_name = "KIND", value_enum)]
    camera: Option<CameraKind>,

    /// Vertical field of view in degrees
    #[arg(long, value_name = "DEGREES")]
    fov: Option<f32>,

    /// Write shaded channels as stacked planes
    #[arg(long)]
    planar: bool,

    /// Write 16-bit distances instead of tone-mapped depth
    #[arg(long)]
    raw_depth: bool,

    /// Worker threads (0 = all cores)
    #[arg(long, value_name = "N")]
    threads: Option<usize>,

    /// Jitter seed
    #[arg(long, value_name = "N")]
    seed: Option<u64>,

    /// Use the Embree engine (needs the `embree` feature)
    #[arg(long)]
    embree: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Shaded,
    Depth,
    Silhouette,
    /// All three modes
    All,
}

impl ModeArg {
    fn modes(self) -> &'static [Mode] {
        match self {
            ModeArg::Shaded => &[Mode::Shaded],
            ModeArg::Depth => &[Mode::Depth],
            ModeArg::Silhouette => &[Mode::Silhouette],
            ModeArg::All => &Mode::ALL,
        }
    }
}

impl Cli {
    fn apply(self, job: &mut Job) {
        if let Some(mesh) = self.mesh {
            job.mesh = Some(mesh);
        }
        if let Some(output) = self.output {
            job.output = output;
        }
        if !self.modes.is_empty() {
            job.modes = self.modes.iter().flat_map(|m| m.modes()).copied().collect();
        }
        if let Some((width, height)) = self.size {
            job.width = width;
            job.height = height;
        }
        if let Some(samples) = self.samples {
            job.samples = samples;
        }
        if let Some(kind) = self.camera {
            job.camera.kind = kind;
        }
        if let Some(fov) = self.fov {
            job.camera.vfov = fov;
        }
        if self.planar {
            job.layout = Layout::Planar;
        }
        if self.raw_depth {
            job.tone_mapped = false;
        }
        if let Some(threads) = self.threads {
            job.render.threads = threads;
        }
        if let Some(seed) = self.seed {
            job.render.seed = seed;
        }
    }
}

fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got '{}'", s))?;
    let dimension = |v: &str| {
        v.parse::<u32>()
            .map_err(|e| format!("invalid dimension '{}': {}", v, e))
    };
    Ok((dimension(w)?, dimension(h)?))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut job = match &cli.job {
        Some(path) => Job::load(path)?,
        None => Job::default(),
    };
    let use_embree = cli.embree;
    cli.apply(&mut job);
    job.validate()?;

    let mesh = match &job.mesh {
        Some(path) => mesh::load_obj(path)?,
        None => {
            log::info!("No mesh given, rendering the unit cube");
            mesh::unit_cube()
        }
    };

    if use_embree {
        run_embree(&job, &mesh)
    } else {
        render_job(RayTracer::with_config(job.render.clone())?, &job, &mesh)
    }
}

#[cfg(feature = "embree")]
fn run_embree(job: &Job, mesh: &mesh::Mesh) -> Result<()> {
    let engine = lumen_renderer::EmbreeEngine::new()?;
    render_job(RayTracer::with_engine(engine, job.render.clone())?, job, mesh)
}

#[cfg(not(feature = "embree"))]
fn run_embree(_job: &Job, _mesh: &mesh::Mesh) -> Result<()> {
    anyhow::bail!("This build does not include the Embree engine; rebuild with --features embree")
}

fn render_job<E: IntersectionEngine>(
    mut tracer: RayTracer<E>,
    job: &Job,
    mesh: &mesh::Mesh,
) -> Result<()> {
    tracer
        .attach_geometry(&mesh.positions, &mesh.indices, mesh.topology)
        .context("Failed to attach mesh")?;
    tracer.set_material(job.material);

    let camera = job.camera.build(&tracer.bounds(), job.width, job.height)?;
    log::info!(
        "Camera at {:?} looking along {:?}",
        camera.position(),
        -camera.dir()
    );

    for &mode in &job.modes {
        let start = Instant::now();
        let path = job.output_for(mode);
        render_mode(&tracer, &camera, job, mode, &path)?;
        log::info!(
            "Rendered {} {}x{} in {:.2?} -> {}",
            mode.name(),
            job.width,
            job.height,
            start.elapsed(),
            path.display()
        );
    }

    Ok(())
}

fn render_mode<E: IntersectionEngine>(
    tracer: &RayTracer<E>,
    camera: &Camera,
    job: &Job,
    mode: Mode,
    path: &Path,
) -> Result<()> {
    let (width, height) = (job.width, job.height);
    let pixel_count = pixel_count(width, height);

    match mode {
        Mode::Shaded => {
            let mut rgb = vec![0u8; 3 * pixel_count];
            tracer.render_shaded(&mut rgb, camera, width, height, job.samples, job.layout)?;
            match job.layout {
                Layout::Interleaved => save(RgbImage::from_raw(width, height, rgb), path),
                // Planes stacked top to bottom: red, green, blue
                Layout::Planar => save(GrayImage::from_raw(width, 3 * height, rgb), path),
            }
        }
        Mode::Depth if job.tone_mapped => {
            let mut depth = vec![0u8; pixel_count];
            tracer.render_depth(&mut depth, camera, width, height, true)?;
            save(GrayImage::from_raw(width, height, depth), path)
        }
        Mode::Depth => {
            let mut depth = vec![0.0f32; pixel_count];
            tracer.render_depth(&mut depth, camera, width, height, false)?;
            let scaled: Vec<u16> = depth
                .iter()
                .map(|d| (d * job.depth_scale).round() as u16)
                .collect();
            save(ImageBuffer::<Luma<u16>, _>::from_raw(width, height, scaled), path)
        }
        Mode::Silhouette => {
            let mut mask = vec![0u8; pixel_count];
            tracer.render_silhouette(&mut mask, camera, width, height)?;
            save(GrayImage::from_raw(width, height, mask), path)
        }
    }
}

/// Pixels in a `width` x `height` image, computed without `u32` overflow.
fn pixel_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

fn save<P>(image: Option<ImageBuffer<P, Vec<P::Subpixel>>>, path: &Path) -> Result<()>
where
    P: image::Pixel + image::PixelWithColorType,
    [P::Subpixel]: image::EncodableLayout,
{
    let image = image.context("Image buffer does not match its dimensions")?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    image
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use lumen_renderer::RenderConfig;

    fn cli(list: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("lumen").chain(list.iter().copied()))
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_flags() {
        let parsed = cli(&[
            "job.json", "--mesh", "bunny.obj", "--size", "320x240", "--mode", "depth", "--mode",
            "silhouette", "--samples", "8", "--camera", "orthogonal", "--planar", "--threads", "2",
        ])
        .unwrap();

        assert_eq!(parsed.job, Some(PathBuf::from("job.json")));
        assert_eq!(parsed.mesh, Some(PathBuf::from("bunny.obj")));
        assert_eq!(parsed.size, Some((320, 240)));
        assert_eq!(parsed.modes, vec![ModeArg::Depth, ModeArg::Silhouette]);
        assert_eq!(parsed.samples, Some(8));
        assert_eq!(parsed.camera, Some(CameraKind::Orthogonal));
        assert!(parsed.planar);
        assert_eq!(parsed.threads, Some(2));
    }

    #[test]
    fn test_parse_errors() {
        assert!(cli(&["--size", "320"]).is_err());
        assert!(cli(&["--size", "320x-1"]).is_err());
        assert!(cli(&["--samples"]).is_err());
        assert!(cli(&["--mode", "normals"]).is_err());
        assert!(cli(&["--bogus"]).is_err());
        assert!(cli(&["a.json", "b.json"]).is_err());
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("640x480"), Ok((640, 480)));
        assert_eq!(parse_size("64X32"), Ok((64, 32)));
        assert!(parse_size("640").is_err());
        assert!(parse_size("x480").is_err());
    }

    #[test]
    fn test_pixel_count_does_not_overflow() {
        assert_eq!(pixel_count(32, 24), 768);
        assert_eq!(pixel_count(70_000, 70_000), 4_900_000_000);
    }

    #[test]
    fn test_flags_override_job() {
        let mut job = Job::default();
        cli(&["--mode", "all", "--raw-depth", "--fov", "45", "--seed", "7", "-o", "x.png"])
            .unwrap()
            .apply(&mut job);

        assert_eq!(job.modes, Mode::ALL.to_vec());
        assert!(!job.tone_mapped);
        assert_eq!(job.camera.vfov, 45.0);
        assert_eq!(job.render.seed, 7);
        assert_eq!(job.output, PathBuf::from("x.png"));
        // Untouched values keep the job's settings
        assert_eq!(job.width, 800);
        assert_eq!(job.layout, Layout::Interleaved);
    }

    #[test]
    fn test_repeated_modes_accumulate() {
        let mut job = Job::default();
        cli(&["--mode", "silhouette", "--mode", "shaded"])
            .unwrap()
            .apply(&mut job);
        assert_eq!(job.modes, vec![Mode::Silhouette, Mode::Shaded]);
    }

    #[test]
    fn test_render_all_modes_to_disk() {
        let dir = std::env::temp_dir().join(format!("lumen_cli_render_{}", std::process::id()));
        let mut job = Job {
            width: 32,
            height: 24,
            modes: Mode::ALL.to_vec(),
            output: dir.join("cube.png"),
            render: RenderConfig::default().with_threads(2),
            ..Job::default()
        };
        job.samples = 2;

        let tracer = RayTracer::with_config(job.render.clone()).unwrap();
        render_job(tracer, &job, &mesh::unit_cube()).unwrap();

        for mode in Mode::ALL {
            let size = image::image_dimensions(job.output_for(mode)).unwrap();
            assert_eq!(size, (32, 24));
        }
        std::fs::remove_dir_all(&dir).ok();
    }
}
