use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use formats::{ImageFileDecoder, JpegTileEncoder, TilesetManifest, read_indices, read_mesh};
use tools::{GeneratorConfig, MESH_EXTENSION};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Bakes planet albedo and elevation rasters into tile pyramids")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Shade, tile and mesh the configured sources
    Generate(GenerateArgs),

    /// Print the header of a mesh tile, an index file, or a tileset directory
    Inspect {
        path: PathBuf,

        /// Also print elevation range for mesh tiles
        #[arg(long)]
        stats: bool,
    },
}

#[derive(clap::Args, Debug)]
struct GenerateArgs {
    /// JSON config; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Albedo source image
    #[arg(long)]
    albedo: Option<PathBuf>,

    /// Elevation source image (elevation = alpha * blue / 255)
    #[arg(long)]
    elevation: Option<PathBuf>,

    /// Output directory
    #[arg(long)]
    out: Option<PathBuf>,

    #[arg(long)]
    albedo_tile_size: Option<u32>,

    #[arg(long)]
    elevation_tile_size: Option<u32>,

    /// Shadow pass worker threads
    #[arg(long)]
    workers: Option<usize>,

    #[arg(long)]
    sun_heading: Option<f32>,

    #[arg(long)]
    sun_pitch: Option<f32>,

    #[arg(long)]
    shadow_strength: Option<f32>,

    /// Elevation alignment offset in texels: x,y
    #[arg(long, value_delimiter = ',')]
    elevation_offset: Option<Vec<u32>>,

    #[arg(long)]
    no_shadows: bool,

    #[arg(long)]
    no_gradient: bool,

    #[arg(long)]
    no_albedo_tiles: bool,

    #[arg(long)]
    no_elevation_tiles: bool,

    #[arg(long)]
    no_indices: bool,

    #[arg(long)]
    no_manifest: bool,

    /// Also write grayscale elevation preview tiles
    #[arg(long)]
    previews: bool,
}

impl GenerateArgs {
    fn into_config(self) -> Result<GeneratorConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => GeneratorConfig::load(path)?,
            None => GeneratorConfig::default(),
        };

        if let Some(p) = self.albedo {
            config.albedo_path = Some(p);
        }
        if let Some(p) = self.elevation {
            config.elevation_path = Some(p);
        }
        if let Some(p) = self.out {
            config.output_root = p;
        }
        if let Some(v) = self.albedo_tile_size {
            config.albedo_tile_size = v;
        }
        if let Some(v) = self.elevation_tile_size {
            config.elevation_tile_size = v;
        }
        if let Some(v) = self.workers {
            config.worker_threads = v;
        }
        if let Some(v) = self.sun_heading {
            config.sun.heading_deg = v;
        }
        if let Some(v) = self.sun_pitch {
            config.sun.pitch_deg = v;
        }
        if let Some(v) = self.shadow_strength {
            config.shadow_strength = v;
        }
        if let Some(offset) = self.elevation_offset {
            let [dx, dy] = offset[..] else {
                return Err("--elevation-offset takes exactly two values: x,y".into());
            };
            config.elevation_offset = [dx, dy];
        }

        let stages = &mut config.stages;
        stages.shadows &= !self.no_shadows;
        stages.border_gradient &= !self.no_gradient;
        stages.albedo_tiles &= !self.no_albedo_tiles;
        stages.elevation_tiles &= !self.no_elevation_tiles;
        stages.shared_indices &= !self.no_indices;
        stages.manifest &= !self.no_manifest;
        stages.elevation_previews |= self.previews;

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match args.command {
        Command::Generate(generate) => {
            let config = generate.into_config()?;
            let summary = tools::run(&config, &ImageFileDecoder, &JpegTileEncoder)?;
            for level in &summary.levels {
                info!(
                    "lod {}: {}x{}, {} tiles, {} files",
                    level.lod,
                    level.width,
                    level.height,
                    level.tiles,
                    level.files()
                );
            }
            println!(
                "wrote {} files to {:?}",
                summary.files_written(),
                config.output_root
            );
        }
        Command::Inspect { path, stats } => inspect(&path, stats)?,
    }
    Ok(())
}

fn inspect(path: &Path, stats: bool) -> Result<(), Box<dyn std::error::Error>> {
    if fs::metadata(path)?.is_dir() {
        let manifest = TilesetManifest::load(path)?;
        println!("{}", serde_json::to_string_pretty(&manifest)?);
        return Ok(());
    }

    let mut r = BufReader::new(File::open(path)?);
    if path.extension().is_some_and(|ext| ext == MESH_EXTENSION) {
        let mesh = read_mesh(&mut r)?;
        println!(
            "mesh {}x{} quads, {} vertices",
            mesh.width,
            mesh.height,
            mesh.vertices.len()
        );
        if stats {
            let (min, max) = mesh
                .vertices
                .iter()
                .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
                    (lo.min(v.z), hi.max(v.z))
                });
            println!("elevation {min}..{max}");
        }
    } else {
        let file = read_indices(&mut r)?;
        println!(
            "index buffer for {}x{} quads, {} indices",
            file.width,
            file.height,
            file.indices.len()
        );
    }
    Ok(())
}
