//! Simple ray caster example.
//!
//! Builds a grid of boxes with random heights as one quad mesh, then saves a
//! shaded PPM and a tone-mapped depth PGM.

use lumen_renderer::{Camera, Color, Layout, Material, RayTracer, Topology, Vec3};
use rand::Rng;
use std::fs::File;
use std::io::{BufWriter, Write};

const WIDTH: u32 = 800;
const HEIGHT: u32 = 450;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Lumen Ray Caster - Simple Example");
    println!("=================================");

    let start = std::time::Instant::now();
    let (positions, indices) = build_scene();
    println!(
        "Scene built in {:?}: {} vertices, {} quads",
        start.elapsed(),
        positions.len() / 3,
        indices.len() / 4
    );

    let mut tracer = RayTracer::new(0)?;
    tracer.attach_geometry(&positions, &indices, Topology::Quad)?;
    tracer.set_material(Material::new(
        Color::new(0.1, 0.12, 0.15),
        Color::new(0.6, 0.7, 0.8),
    ));

    let camera = Camera::perspective(
        Vec3::new(9.0, 7.0, 11.0), // position
        Vec3::new(0.0, 0.5, 0.0),  // focus
        Vec3::Y,                   // up
        35.0,
        WIDTH as f32 / HEIGHT as f32,
    )?;

    println!(
        "Rendering {}x{} on {} threads...",
        WIDTH,
        HEIGHT,
        tracer.thread_count()
    );

    let start = std::time::Instant::now();
    let mut rgb = vec![0u8; (3 * WIDTH * HEIGHT) as usize];
    tracer.render_shaded(&mut rgb, &camera, WIDTH, HEIGHT, 8, Layout::Interleaved)?;
    println!("Shaded in {:?}", start.elapsed());

    let start = std::time::Instant::now();
    let mut depth = vec![0u8; (WIDTH * HEIGHT) as usize];
    tracer.render_depth(&mut depth, &camera, WIDTH, HEIGHT, true)?;
    println!("Depth in {:?}", start.elapsed());

    save_pnm("output.ppm", "P6", &rgb)?;
    save_pnm("depth.pgm", "P5", &depth)?;
    println!("Saved to output.ppm and depth.pgm");

    Ok(())
}

/// A 10x10 grid of boxes with random heights.
fn build_scene() -> (Vec<f32>, Vec<u32>) {
    let mut rng = rand::thread_rng();
    let mut positions = Vec::new();
    let mut indices = Vec::new();

    for a in -5..5 {
        for b in -5..5 {
            let min = Vec3::new(a as f32 + 0.05, 0.0, b as f32 + 0.05);
            let max = Vec3::new(a as f32 + 0.95, 0.2 + 1.8 * rng.gen::<f32>(), b as f32 + 0.95);
            push_box(&mut positions, &mut indices, min, max);
        }
    }

    (positions, indices)
}

fn push_box(positions: &mut Vec<f32>, indices: &mut Vec<u32>, min: Vec3, max: Vec3) {
    let base = (positions.len() / 3) as u32;
    for i in 0..8 {
        let corner = Vec3::new(
            if i & 1 == 0 { min.x } else { max.x },
            if i & 2 == 0 { min.y } else { max.y },
            if i & 4 == 0 { min.z } else { max.z },
        );
        positions.extend_from_slice(&corner.to_array());
    }

    const FACES: [[u32; 4]; 6] = [
        [0, 2, 3, 1], // -Z
        [4, 5, 7, 6], // +Z
        [0, 4, 6, 2], // -X
        [1, 3, 7, 5], // +X
        [0, 1, 5, 4], // -Y
        [2, 6, 7, 3], // +Y
    ];
    for face in FACES {
        indices.extend(face.iter().map(|i| base + i));
    }
}

fn save_pnm(filename: &str, magic: &str, data: &[u8]) -> std::io::Result<()> {
    let file = File::create(filename)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "{}", magic)?;
    writeln!(writer, "{} {}", WIDTH, HEIGHT)?;
    writeln!(writer, "255")?;
    writer.write_all(data)?;

    Ok(())
}
