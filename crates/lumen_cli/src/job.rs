//! Render job description, loaded from JSON and overridden by flags.

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use lumen_renderer::{Aabb, Camera, Layout, Material, RenderConfig, Vec3};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Shaded,
    Depth,
    Silhouette,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Shaded, Mode::Depth, Mode::Silhouette];

    pub fn name(self) -> &'static str {
        match self {
            Mode::Shaded => "shaded",
            Mode::Depth => "depth",
            Mode::Silhouette => "silhouette",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CameraKind {
    #[default]
    Perspective,
    Orthogonal,
}

/// Camera placement. Missing position, focus or extent are framed from the
/// mesh bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraJob {
    pub kind: CameraKind,
    pub position: Option<[f32; 3]>,
    pub focus: Option<[f32; 3]>,
    pub up: [f32; 3],
    /// Vertical field of view in degrees (perspective)
    pub vfov: f32,
    /// Film size in world units (orthogonal)
    pub extent: Option<[f32; 2]>,
}

impl Default for CameraJob {
    fn default() -> Self {
        Self {
            kind: CameraKind::Perspective,
            position: None,
            focus: None,
            up: [0.0, 1.0, 0.0],
            vfov: 60.0,
            extent: None,
        }
    }
}

impl CameraJob {
    /// Build the camera for an image of `width` x `height` looking at `bounds`.
    ///
    /// The default view sits above and in front of the mesh center:
    /// `center + (0, ylen / 2, 2 * reach)` where `reach` is the depth, or half
    /// the largest side for flat meshes. Orthographic film defaults to 1.5
    /// times the larger of width and height.
    pub fn build(&self, bounds: &Aabb, width: u32, height: u32) -> Result<Camera> {
        let (center, size) = if bounds.is_empty() {
            (Vec3::ZERO, Vec3::ONE)
        } else {
            (bounds.centroid(), bounds.extent())
        };

        // Flat meshes have no depth to back away from
        let reach = size.z.max(0.5 * size.max_element());
        let position = self
            .position
            .map(Vec3::from_array)
            .unwrap_or(center + Vec3::new(0.0, 0.5 * size.y, 2.0 * reach));
        let focus = self.focus.map(Vec3::from_array).unwrap_or(center);
        let up = Vec3::from_array(self.up);
        let aspect = width as f32 / height as f32;

        let camera = match self.kind {
            CameraKind::Perspective => {
                Camera::perspective(position, focus, up, self.vfov, aspect)
            }
            CameraKind::Orthogonal => {
                let [xextent, yextent] = self.extent.unwrap_or_else(|| {
                    let xextent = 1.5 * size.x.max(size.y);
                    [xextent, xextent / aspect]
                });
                Camera::orthogonal(position, focus, up, xextent, yextent)
            }
        };
        camera.context("Invalid camera")
    }
}

/// Everything needed for one invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Job {
    /// OBJ file to render, the built-in unit cube when absent
    pub mesh: Option<PathBuf>,
    pub width: u32,
    pub height: u32,
    /// Modes to render; each writes its own image
    pub modes: Vec<Mode>,
    pub samples: u32,
    pub layout: Layout,
    pub tone_mapped: bool,
    /// 16-bit units per world unit for raw depth images
    pub depth_scale: f32,
    pub camera: CameraJob,
    pub material: Material,
    pub render: RenderConfig,
    /// Output path; with several modes the mode name is appended to the stem
    pub output: PathBuf,
}

impl Default for Job {
    fn default() -> Self {
        Self {
            mesh: None,
            width: 800,
            height: 600,
            modes: vec![Mode::Shaded],
            samples: 1,
            layout: Layout::Interleaved,
            tone_mapped: true,
            depth_scale: 1000.0,
            camera: CameraJob::default(),
            material: Material::default(),
            render: RenderConfig::default(),
            output: PathBuf::from("render.png"),
        }
    }
}

impl Job {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read job file {}", path.display()))?;
        let job: Job = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse job file {}", path.display()))?;
        log::info!("Loaded job from {}", path.display());
        Ok(job)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            bail!("Image size must be non-zero, got {}x{}", self.width, self.height);
        }
        if self.samples == 0 {
            bail!("Samples per pixel must be at least 1");
        }
        if self.modes.is_empty() {
            bail!("No render modes requested");
        }
        Ok(())
    }

    /// Where the image for `mode` is written.
    pub fn output_for(&self, mode: Mode) -> PathBuf {
        if self.modes.len() == 1 {
            return self.output.clone();
        }

        let stem = self
            .output
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "render".to_string());
        let ext = self
            .output
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "png".to_string());
        self.output
            .with_file_name(format!("{}_{}.{}", stem, mode.name(), ext))
    }
}
