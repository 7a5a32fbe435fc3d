use std::fs;
use std::path::{Path, PathBuf};

use compute::{render_border_gradient, render_shadows};
use formats::{
    IndexEntry, MANIFEST_FILE_NAME, RasterDecoder, TileEncoder, TileLayerEntry, TilesetManifest,
    content_hash_hex, tile_path_template, write_indices,
};
use foundation::TileGrid;
use layers::{AlbedoRaster, HeightField, RasterLayer, SharedIndexBuffer};
use runtime::BandScheduler;
use tracing::{info, warn};

use crate::config::GeneratorConfig;
use crate::error::{PipelineError, io_err};
use crate::tiler::{LevelSources, LevelSummary, MESH_EXTENSION, TileWriter};

/// Decoded inputs. Either may be absent; the run then skips whatever needs
/// the missing raster.
#[derive(Debug, Default)]
pub struct SourceRasters {
    pub albedo: Option<AlbedoRaster>,
    pub elevation: Option<HeightField>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub levels: Vec<LevelSummary>,
    pub index_file: Option<PathBuf>,
    pub manifest_file: Option<PathBuf>,
}

impl RunSummary {
    pub fn tiles_per_lod(&self) -> Vec<usize> {
        self.levels.iter().map(|l| l.tiles).collect()
    }

    pub fn files_written(&self) -> usize {
        let tiles: usize = self.levels.iter().map(LevelSummary::files).sum();
        tiles + self.index_file.iter().count() + self.manifest_file.iter().count()
    }
}

/// Decodes the sources the enabled stages need.
pub fn load_sources(
    config: &GeneratorConfig,
    decoder: &dyn RasterDecoder,
) -> Result<SourceRasters, PipelineError> {
    let mut sources = SourceRasters::default();

    if config.stages.needs_albedo() {
        match &config.albedo_path {
            Some(path) => {
                let decoded = decoder
                    .decode_rgba(path)
                    .map_err(|source| PipelineError::Decode {
                        path: path.clone(),
                        source,
                    })?;
                info!("loaded albedo {path:?} ({}x{})", decoded.width, decoded.height);
                sources.albedo = Some(AlbedoRaster::new(
                    decoded.width,
                    decoded.height,
                    decoded.rgba,
                )?);
            }
            None => warn!("no albedo source configured, albedo stages are skipped"),
        }
    }

    if config.stages.needs_elevation() {
        match &config.elevation_path {
            Some(path) => {
                let decoded = decoder
                    .decode_rgba(path)
                    .map_err(|source| PipelineError::Decode {
                        path: path.clone(),
                        source,
                    })?;
                info!("loaded elevation {path:?} ({}x{})", decoded.width, decoded.height);
                sources.elevation = Some(HeightField::from_encoded_rgba(
                    decoded.width,
                    decoded.height,
                    &decoded.rgba,
                )?);
            }
            None => warn!("no elevation source configured, elevation stages are skipped"),
        }
    }

    Ok(sources)
}

/// Level sizes, in albedo texels, from the source size down to the first
/// level that fits in one tile.
///
/// Fails when some level is neither whole tiles nor smaller than one tile
/// along an axis, or when some halving (of the albedo, or of the elevation
/// after `shrink_steps` pre-halvings) would see an odd dimension.
pub fn plan_levels(
    width: u32,
    height: u32,
    tile: u32,
    shrink_steps: u32,
) -> Result<Vec<(u32, u32)>, PipelineError> {
    let misaligned = |reason: String| PipelineError::Misaligned {
        width,
        height,
        reason,
    };

    if width == 0 || height == 0 || width % tile != 0 || height % tile != 0 {
        return Err(misaligned(format!("not a multiple of the {tile} texel tile")));
    }

    let mut levels = Vec::new();
    let (mut w, mut h) = (width, height);
    loop {
        // Tiles never straddle the level edge: an axis is either whole tiles
        // or covered by a single, shorter tile.
        let tiles_whole = |d: u32| d % tile == 0 || d < tile;
        if !tiles_whole(w) || !tiles_whole(h) {
            return Err(misaligned(format!(
                "level {} ({w}x{h}) is not a whole number of {tile} texel tiles",
                levels.len()
            )));
        }
        levels.push((w, h));
        if TileGrid::new(w, h, tile, 0).is_single_tile() {
            return Ok(levels);
        }
        let even = |d: u32| d % 2 == 0 && (d >> shrink_steps) % 2 == 0;
        if !even(w) || !even(h) {
            return Err(misaligned(format!(
                "level {} ({w}x{h}) cannot be halved evenly",
                levels.len() - 1
            )));
        }
        w /= 2;
        h /= 2;
    }
}

/// Runs every enabled stage over one pair of sources.
pub struct Pipeline<'a> {
    config: &'a GeneratorConfig,
    encoder: &'a dyn TileEncoder,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a GeneratorConfig, encoder: &'a dyn TileEncoder) -> Self {
        Self { config, encoder }
    }

    /// Shadows are marched over the full-resolution height field; the
    /// elevation is pre-shrunk to mesh resolution only after the albedo passes.
    pub fn run(&self, sources: SourceRasters) -> Result<RunSummary, PipelineError> {
        let config = self.config;
        let stages = config.stages;
        config.validate()?;

        let SourceRasters {
            mut albedo,
            mut elevation,
        } = sources;

        let (width, height) = match (&albedo, &elevation) {
            (Some(a), Some(e)) => {
                if a.dimensions() != e.dimensions() {
                    return Err(PipelineError::SizeMismatch {
                        albedo: a.dimensions(),
                        elevation: e.dimensions(),
                    });
                }
                a.dimensions()
            }
            (Some(a), None) => a.dimensions(),
            (None, Some(e)) => e.dimensions(),
            (None, None) => return Err(PipelineError::NoInput),
        };

        let shrink_steps = config.elevation_shrink_steps();
        let levels = plan_levels(width, height, config.albedo_tile_size, shrink_steps)?;
        let index_buffer = if stages.shared_indices {
            Some(SharedIndexBuffer::build(config.elevation_tile_size)?)
        } else {
            None
        };

        if stages.shadows {
            match (albedo.as_mut(), elevation.as_ref()) {
                (Some(albedo), Some(field)) => {
                    let sun = config.sun_samples()?;
                    let scheduler = BandScheduler::new(config.worker_threads)?;
                    render_shadows(albedo, field, &sun, config.shadow_strength, &scheduler)?;
                }
                _ => warn!("shadow pass needs both albedo and elevation, skipping"),
            }
        }

        if stages.border_gradient {
            match albedo.as_mut() {
                Some(albedo) => render_border_gradient(albedo, config.border_margin),
                None => warn!("border gradient needs albedo, skipping"),
            }
        }

        if let Some(field) = elevation.as_mut() {
            for _ in 0..shrink_steps {
                field.downsample()?;
            }
            let [dx, dy] = config.elevation_offset;
            if dx != 0 || dy != 0 {
                info!("shifting elevation by ({dx}, {dy})");
                field.shift_origin(dx, dy);
            }
        }

        let root = config.output_root.as_path();
        fs::create_dir_all(root).map_err(io_err(root))?;

        let mut writer = TileWriter::new(
            root,
            self.encoder,
            config.albedo_tile_size,
            config.elevation_tile_size,
            config.albedo_quality,
            config.elevation_preview_quality,
        );

        let mut summary = RunSummary::default();
        for (lod, &(w, h)) in levels.iter().enumerate() {
            let sources = LevelSources {
                albedo: albedo.as_ref().filter(|_| stages.albedo_tiles),
                elevation: elevation.as_ref(),
                meshes: stages.elevation_tiles,
                previews: stages.elevation_previews,
            };
            summary
                .levels
                .push(writer.write_level(lod as u32, w, h, sources)?);

            if lod + 1 < levels.len() {
                if let Some(albedo) = albedo.as_mut() {
                    albedo.downsample()?;
                }
                if let Some(field) = elevation.as_mut() {
                    field.downsample()?;
                }
            }
        }

        let mut manifest = TilesetManifest::new(width, height);
        manifest.lod_count = levels.len() as u32;

        if let Some(buffer) = &index_buffer {
            let (path, entry) = self.write_index_file(root, buffer)?;
            summary.index_file = Some(path);
            manifest.indices = Some(entry);
        }

        if stages.manifest {
            let ext = self.encoder.extension();
            if albedo.is_some() && stages.albedo_tiles {
                manifest.albedo = Some(TileLayerEntry {
                    tile_size: config.albedo_tile_size,
                    path_template: tile_path_template(ext),
                    quality: Some(config.albedo_quality),
                });
            }
            if elevation.is_some() && stages.elevation_tiles {
                manifest.elevation = Some(TileLayerEntry {
                    tile_size: config.elevation_tile_size,
                    path_template: tile_path_template(MESH_EXTENSION),
                    quality: None,
                });
            }
            if elevation.is_some() && stages.elevation_previews {
                manifest.elevation_preview = Some(TileLayerEntry {
                    tile_size: config.elevation_tile_size,
                    path_template: tile_path_template(&format!("elev.{ext}")),
                    quality: Some(config.elevation_preview_quality),
                });
            }
            manifest.write(root)?;
            summary.manifest_file = Some(root.join(MANIFEST_FILE_NAME));
        }

        info!(
            "done: {} levels, {} files",
            summary.levels.len(),
            summary.files_written()
        );
        Ok(summary)
    }

    fn write_index_file(
        &self,
        root: &Path,
        buffer: &SharedIndexBuffer,
    ) -> Result<(PathBuf, IndexEntry), PipelineError> {
        let path = root.join(&self.config.index_file_name);
        let mut bytes: Vec<u8> = Vec::new();
        write_indices(&mut bytes, buffer.size(), buffer.size(), buffer.indices()).map_err(
            |source| PipelineError::MeshFile {
                path: path.clone(),
                source,
            },
        )?;
        fs::write(&path, &bytes).map_err(io_err(&path))?;
        info!("wrote {} shared indices to {path:?}", buffer.indices().len());

        let entry = IndexEntry {
            path: self.config.index_file_name.clone(),
            tile_size: buffer.size(),
            index_count: buffer.indices().len() as u32,
            content_hash: content_hash_hex(&bytes),
        };
        Ok((path, entry))
    }
}

/// Validates `config`, decodes its sources and runs the whole pipeline.
pub fn run(
    config: &GeneratorConfig,
    decoder: &dyn RasterDecoder,
    encoder: &dyn TileEncoder,
) -> Result<RunSummary, PipelineError> {
    config.validate()?;
    let sources = load_sources(config, decoder)?;
    Pipeline::new(config, encoder).run(sources)
}

#[cfg(test)]
mod tests {
    use super::{Pipeline, PipelineError, SourceRasters, plan_levels, run};
    use crate::config::GeneratorConfig;
    use crate::testing::{RecordingEncoder, temp_root};
    use formats::{
        CodecError, DecodedRaster, PixelFormat, RasterDecoder, TilesetManifest, content_hash_hex,
        read_indices, read_mesh,
    };
    use layers::{AlbedoRaster, HeightField};
    use pretty_assertions::assert_eq;
    use std::fs::{self, File};
    use std::path::{Path, PathBuf};

    fn small_config(label: &str) -> GeneratorConfig {
        let mut config = GeneratorConfig {
            output_root: temp_root(label),
            albedo_tile_size: 64,
            elevation_tile_size: 16,
            worker_threads: 2,
            border_margin: 32,
            ..GeneratorConfig::default()
        };
        config.stages.shadows = false;
        config.stages.border_gradient = false;
        config
    }

    fn flat_sources(width: u32, height: u32) -> SourceRasters {
        SourceRasters {
            albedo: Some(AlbedoRaster::filled(width, height, [120, 120, 120, 255])),
            elevation: Some(HeightField::flat(width, height, 10.0)),
        }
    }

    #[test]
    fn plans_levels_down_to_one_tile() {
        assert_eq!(
            plan_levels(256, 256, 64, 2).unwrap(),
            vec![(256, 256), (128, 128), (64, 64)]
        );
        assert_eq!(
            plan_levels(512, 256, 128, 2).unwrap(),
            vec![(512, 256), (256, 128), (128, 64)]
        );
        assert!(plan_levels(300, 256, 64, 0).is_err());
        // 3 tiles wide: the second level is 1.5 tiles.
        assert!(plan_levels(192, 64, 64, 2).is_err());
        assert_eq!(
            plan_levels(512, 64, 64, 0).unwrap(),
            vec![(512, 64), (256, 32), (128, 16), (64, 8)]
        );
        // After six pre-halvings the elevation is 1 texel tall.
        assert!(plan_levels(256, 64, 64, 6).is_err());
    }

    #[test]
    fn writes_a_full_pyramid() {
        let config = small_config("pipeline_pyramid");
        let encoder = RecordingEncoder::default();
        let summary = Pipeline::new(&config, &encoder)
            .run(flat_sources(256, 256))
            .unwrap();

        assert_eq!(summary.tiles_per_lod(), vec![16, 4, 1]);
        // 21 albedo + 21 mesh tiles, index file, manifest.
        assert_eq!(summary.files_written(), 44);

        let root = &config.output_root;
        assert!(root.join("0/3/3.jpg").is_file());
        assert!(root.join("1/1/1.el").is_file());
        assert!(root.join("2/0/0.el").is_file());
        assert!(!root.join("2/0/1.el").exists());

        let mesh = read_mesh(&mut File::open(root.join("1/0/0.el")).unwrap()).unwrap();
        assert_eq!((mesh.width, mesh.height), (16, 16));
        assert!(mesh.vertices.iter().all(|v| v.z == 10.0));

        let index_bytes = fs::read(root.join("tile.indices")).unwrap();
        let indices = read_indices(&mut index_bytes.as_slice()).unwrap();
        assert_eq!((indices.width, indices.height), (16, 16));
        assert_eq!(indices.indices.len(), 16 * 16 * 6);

        let manifest = TilesetManifest::load(root).unwrap();
        assert_eq!(manifest.lod_count, 3);
        assert_eq!(manifest.width, 256);
        let entry = manifest.indices.unwrap();
        assert_eq!(entry.content_hash, content_hash_hex(&index_bytes));
        assert_eq!(entry.index_count, 1536);
        assert_eq!(
            manifest.elevation.unwrap().path_template,
            "{lod}/{row}/{col}.el"
        );

        fs::remove_dir_all(root).ok();
    }

    #[test]
    fn wide_sources_pad_the_last_level() {
        let mut config = small_config("pipeline_wide");
        config.stages.elevation_previews = true;
        let encoder = RecordingEncoder::default();
        let summary = Pipeline::new(&config, &encoder)
            .run(flat_sources(256, 128))
            .unwrap();

        assert_eq!(summary.tiles_per_lod(), vec![8, 2, 1]);

        let root = &config.output_root;
        let mesh = read_mesh(&mut File::open(root.join("2/0/0.el")).unwrap()).unwrap();
        assert_eq!((mesh.width, mesh.height), (16, 8));

        let calls = encoder.calls();
        let last_albedo = calls
            .iter()
            .rev()
            .find(|c| c.format == PixelFormat::Rgb8)
            .unwrap();
        assert_eq!((last_albedo.width, last_albedo.height), (64, 64));
        let filled = 64 * 32 * 3;
        assert!(last_albedo.pixels[..filled].iter().all(|&b| b == 120));
        assert!(last_albedo.pixels[filled..].iter().all(|&b| b == 0));

        let last_preview = calls.last().unwrap();
        assert_eq!(last_preview.format, PixelFormat::L8);
        assert_eq!((last_preview.width, last_preview.height), (16, 16));

        fs::remove_dir_all(root).ok();
    }

    #[test]
    fn flat_terrain_casts_no_shadows() {
        let mut config = small_config("pipeline_flat_shadows");
        config.stages.shadows = true;
        let encoder = RecordingEncoder::default();
        let sources = SourceRasters {
            albedo: Some(AlbedoRaster::filled(256, 256, [120, 120, 120, 255])),
            elevation: Some(HeightField::flat(256, 256, 250.0)),
        };
        Pipeline::new(&config, &encoder).run(sources).unwrap();

        for call in encoder.calls() {
            assert!(call.pixels.iter().all(|&b| b == 120));
        }
        fs::remove_dir_all(&config.output_root).ok();
    }

    #[test]
    fn border_gradient_darkens_only_the_margin() {
        let mut config = small_config("pipeline_gradient");
        config.stages.border_gradient = true;
        let encoder = RecordingEncoder::default();
        Pipeline::new(&config, &encoder)
            .run(flat_sources(256, 256))
            .unwrap();

        let calls = encoder.calls();
        let corner = &calls[0];
        assert_eq!(&corner.pixels[..3], &[0, 0, 0]);

        // Along row 32 and column 32 of tile (0, 0) the margin starts at 32.
        let red = |x: u32, y: u32| corner.pixels[((y * corner.width + x) * 3) as usize];
        assert_eq!(red(32, 32), 120);
        for d in (0..32).rev() {
            assert!(red(d, 32) < red(d + 1, 32), "row 32 at x={d}");
            assert!(red(32, d) < red(32, d + 1), "column 32 at y={d}");
        }

        let plain = RecordingEncoder::default();
        let mut plain_config = config.clone();
        plain_config.stages.border_gradient = false;
        plain_config.output_root = temp_root("pipeline_gradient_plain");
        Pipeline::new(&plain_config, &plain)
            .run(flat_sources(256, 256))
            .unwrap();

        // Tile (1, 1) lies entirely inside the margin.
        assert_eq!(calls[5].pixels, plain.calls()[5].pixels);
        fs::remove_dir_all(&config.output_root).ok();
        fs::remove_dir_all(&plain_config.output_root).ok();
    }

    #[test]
    fn elevation_only_run_skips_albedo_stages() {
        let mut config = small_config("pipeline_elevation_only");
        config.stages.shadows = true;
        let encoder = RecordingEncoder::default();
        let sources = SourceRasters {
            albedo: None,
            elevation: Some(HeightField::flat(128, 128, 3.0)),
        };
        let summary = Pipeline::new(&config, &encoder).run(sources).unwrap();

        assert!(encoder.calls().is_empty());
        assert_eq!(summary.levels[0].mesh_files, 4);
        assert_eq!(summary.levels[0].albedo_files, 0);

        let manifest = TilesetManifest::load(&config.output_root).unwrap();
        assert!(manifest.albedo.is_none());
        assert!(manifest.elevation.is_some());
        fs::remove_dir_all(&config.output_root).ok();
    }

    #[test]
    fn input_errors_write_nothing() {
        let config = small_config("pipeline_rejects");
        let encoder = RecordingEncoder::default();

        let err = Pipeline::new(&config, &encoder)
            .run(flat_sources(200, 256))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Misaligned { .. }));

        let err = Pipeline::new(&config, &encoder)
            .run(flat_sources(192, 64))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Misaligned { .. }));

        let mismatched = SourceRasters {
            albedo: Some(AlbedoRaster::filled(256, 256, [0; 4])),
            elevation: Some(HeightField::flat(128, 128, 0.0)),
        };
        let err = Pipeline::new(&config, &encoder).run(mismatched).unwrap_err();
        assert!(matches!(err, PipelineError::SizeMismatch { .. }));

        let err = Pipeline::new(&config, &encoder)
            .run(SourceRasters::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::NoInput));

        assert!(!config.output_root.exists());
    }

    struct FixedDecoder;

    impl RasterDecoder for FixedDecoder {
        fn decode_rgba(&self, path: &Path) -> Result<DecodedRaster, CodecError> {
            if path.ends_with("missing.png") {
                return Err(CodecError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "missing",
                )));
            }
            // Elevation 204 * 250 / 255 = 200 everywhere.
            Ok(DecodedRaster {
                width: 64,
                height: 64,
                rgba: [1, 2, 250, 204].repeat(64 * 64),
            })
        }
    }

    #[test]
    fn run_decodes_configured_sources() {
        let mut config = small_config("pipeline_decode");
        config.albedo_path = Some(PathBuf::from("albedo.png"));
        config.elevation_path = Some(PathBuf::from("elevation.png"));
        let encoder = RecordingEncoder::default();

        let summary = run(&config, &FixedDecoder, &encoder).unwrap();
        assert_eq!(summary.tiles_per_lod(), vec![1]);

        let mut file = File::open(config.output_root.join("0/0/0.el")).unwrap();
        let mesh = read_mesh(&mut file).unwrap();
        assert!(mesh.vertices.iter().all(|v| v.z == 200.0));
        assert_eq!(&encoder.calls()[0].pixels[..3], &[1, 2, 250]);
        fs::remove_dir_all(&config.output_root).ok();

        config.elevation_path = Some(PathBuf::from("missing.png"));
        let err = run(&config, &FixedDecoder, &encoder).unwrap_err();
        assert!(matches!(err, PipelineError::Decode { .. }));
    }
}
