use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use formats::{PixelFormat, TileEncoder, tile_path, write_mesh};
use foundation::{TileGrid, TileRect};
use layers::{
    AlbedoRaster, BYTES_PER_PIXEL, HeightField, MeshVertex, RasterLayer, sample_vertex_grid,
};
use tracing::{debug, info};

use crate::error::{PipelineError, io_err};

pub const MESH_EXTENSION: &str = "el";

/// What one level writes. A missing source disables the tiles built from it.
#[derive(Debug, Copy, Clone, Default)]
pub struct LevelSources<'a> {
    pub albedo: Option<&'a AlbedoRaster>,
    pub elevation: Option<&'a HeightField>,
    pub meshes: bool,
    pub previews: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelSummary {
    pub lod: u32,
    pub width: u32,
    pub height: u32,
    pub tiles: usize,
    pub albedo_files: usize,
    pub mesh_files: usize,
    pub preview_files: usize,
}

impl LevelSummary {
    pub fn files(&self) -> usize {
        self.albedo_files + self.mesh_files + self.preview_files
    }
}

/// Cuts one pyramid level into albedo tiles, mesh tiles and optional
/// elevation previews under `<root>/<lod>/<row>/<col>.<ext>`.
///
/// The pixel and vertex buffers are reused for every tile of every level.
pub struct TileWriter<'a> {
    root: PathBuf,
    encoder: &'a dyn TileEncoder,
    albedo_tile: u32,
    elevation_tile: u32,
    albedo_quality: u8,
    preview_quality: u8,
    pixels: Vec<u8>,
    vertices: Vec<MeshVertex>,
}

impl<'a> TileWriter<'a> {
    pub fn new(
        root: &Path,
        encoder: &'a dyn TileEncoder,
        albedo_tile: u32,
        elevation_tile: u32,
        albedo_quality: u8,
        preview_quality: u8,
    ) -> Self {
        Self {
            root: root.to_path_buf(),
            encoder,
            albedo_tile,
            elevation_tile,
            albedo_quality,
            preview_quality,
            pixels: Vec::new(),
            vertices: Vec::new(),
        }
    }

    /// Writes every tile of one level. `width`/`height` are the level size
    /// in albedo texels, whether or not an albedo source is present.
    pub fn write_level(
        &mut self,
        lod: u32,
        width: u32,
        height: u32,
        sources: LevelSources<'_>,
    ) -> Result<LevelSummary, PipelineError> {
        let grid = TileGrid::new(width, height, self.albedo_tile, lod);
        info!("lod {lod}: {width}x{height}, {} tiles", grid.len());

        let mut summary = LevelSummary {
            lod,
            width,
            height,
            tiles: grid.len(),
            ..LevelSummary::default()
        };

        for row in 0..grid.rows() {
            let dir = self.root.join(lod.to_string()).join(row.to_string());
            fs::create_dir_all(&dir).map_err(io_err(&dir))?;
        }

        for tile in grid.tiles() {
            if let Some(albedo) = sources.albedo {
                self.write_albedo_tile(albedo, tile)?;
                summary.albedo_files += 1;
            }
            if let Some(field) = sources.elevation {
                if sources.meshes {
                    self.write_mesh_tile(field, tile)?;
                    summary.mesh_files += 1;
                }
                if sources.previews {
                    self.write_preview_tile(field, tile)?;
                    summary.preview_files += 1;
                }
            }
        }
        Ok(summary)
    }

    fn write_albedo_tile(
        &mut self,
        albedo: &AlbedoRaster,
        tile: TileRect,
    ) -> Result<(), PipelineError> {
        let (width, height) = albedo.dimensions();
        let cols = self.albedo_tile.min(width);
        let rows = self.albedo_tile.min(height);
        let side = cols.max(rows);

        self.pixels.clear();
        self.pixels.resize((cols * side) as usize * 3, 0);

        let x0 = tile.x as usize * BYTES_PER_PIXEL;
        let x1 = (tile.x + cols) as usize * BYTES_PER_PIXEL;
        for ty in 0..rows {
            let src = &albedo.row(tile.y + ty)[x0..x1];
            let dst_start = (ty * cols) as usize * 3;
            let dst = &mut self.pixels[dst_start..dst_start + cols as usize * 3];
            let texels = dst.chunks_exact_mut(3).zip(src.chunks_exact(BYTES_PER_PIXEL));
            for (rgb, rgba) in texels {
                rgb.copy_from_slice(&rgba[..3]);
            }
        }

        let ext = self.encoder.extension().to_string();
        let path = tile_path(&self.root, tile.lod, tile.row(), tile.col(), &ext);
        self.encode_to(&path, cols, side, PixelFormat::Rgb8, self.albedo_quality)
    }

    /// Origin and extent of the mesh block that sits under `tile`.
    fn mesh_block(&self, field: &HeightField, tile: TileRect) -> (u32, u32, u32, u32) {
        let factor = self.albedo_tile / self.elevation_tile;
        (
            tile.x / factor,
            tile.y / factor,
            self.elevation_tile.min(field.width()),
            self.elevation_tile.min(field.height()),
        )
    }

    fn write_mesh_tile(
        &mut self,
        field: &HeightField,
        tile: TileRect,
    ) -> Result<(), PipelineError> {
        let (x0, y0, width, height) = self.mesh_block(field, tile);
        sample_vertex_grid(field, x0, y0, width, height, &mut self.vertices);

        let path = tile_path(&self.root, tile.lod, tile.row(), tile.col(), MESH_EXTENSION);
        let file = File::create(&path).map_err(io_err(&path))?;
        let mut w = BufWriter::new(file);
        write_mesh(&mut w, width, height, &self.vertices).map_err(|source| {
            PipelineError::MeshFile {
                path: path.clone(),
                source,
            }
        })?;
        w.flush().map_err(io_err(&path))?;
        debug!("wrote {path:?}");
        Ok(())
    }

    fn write_preview_tile(
        &mut self,
        field: &HeightField,
        tile: TileRect,
    ) -> Result<(), PipelineError> {
        let (x0, y0, cols, rows) = self.mesh_block(field, tile);
        let side = cols.max(rows);

        self.pixels.clear();
        self.pixels.resize((cols * side) as usize, 0);
        for ty in 0..rows {
            for tx in 0..cols {
                self.pixels[(ty * cols + tx) as usize] = field.texel(x0 + tx, y0 + ty) as u8;
            }
        }

        let ext = format!("elev.{}", self.encoder.extension());
        let path = tile_path(&self.root, tile.lod, tile.row(), tile.col(), &ext);
        self.encode_to(&path, cols, side, PixelFormat::L8, self.preview_quality)
    }

    fn encode_to(
        &self,
        path: &Path,
        width: u32,
        height: u32,
        format: PixelFormat,
        quality: u8,
    ) -> Result<(), PipelineError> {
        let file = File::create(path).map_err(io_err(path))?;
        let mut w = BufWriter::new(file);
        self.encoder
            .encode(&self.pixels, width, height, format, quality, &mut w)
            .map_err(|source| PipelineError::Encode {
                path: path.to_path_buf(),
                source,
            })?;
        w.flush().map_err(io_err(path))?;
        debug!("wrote {path:?}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{LevelSources, TileWriter};
    use crate::testing::{RecordingEncoder, temp_root};
    use formats::{PixelFormat, read_mesh};
    use layers::{AlbedoRaster, HeightField};
    use std::fs::{self, File};

    #[test]
    fn albedo_tiles_drop_alpha_and_keep_row_order() {
        let root = temp_root("tiler_albedo");
        let rgba = (0..8 * 4).flat_map(|i| [i as u8, 100, 200, 255]).collect();
        let albedo = AlbedoRaster::new(8, 4, rgba).unwrap();

        let encoder = RecordingEncoder::default();
        let mut writer = TileWriter::new(&root, &encoder, 4, 4, 80, 70);
        let summary = writer
            .write_level(
                0,
                8,
                4,
                LevelSources {
                    albedo: Some(&albedo),
                    ..LevelSources::default()
                },
            )
            .unwrap();

        assert_eq!(summary.tiles, 2);
        assert_eq!(summary.albedo_files, 2);

        let calls = encoder.calls();
        assert_eq!(calls.len(), 2);
        let right = &calls[1];
        assert_eq!((right.width, right.height), (4, 4));
        assert_eq!(right.format, PixelFormat::Rgb8);
        assert_eq!(right.quality, 80);
        // Tile (0, 1) starts at texel x = 4 of row 0.
        assert_eq!(&right.pixels[..3], &[4, 100, 200]);
        // Row 1, first texel is source index 8 + 4.
        assert_eq!(&right.pixels[12..15], &[12, 100, 200]);
        assert!(root.join("0/0/1.jpg").is_file());

        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn short_rasters_are_zero_padded() {
        let root = temp_root("tiler_pad");
        let albedo = AlbedoRaster::filled(4, 2, [9, 9, 9, 255]);

        let encoder = RecordingEncoder::default();
        let mut writer = TileWriter::new(&root, &encoder, 8, 8, 80, 70);
        writer
            .write_level(
                3,
                4,
                2,
                LevelSources {
                    albedo: Some(&albedo),
                    ..LevelSources::default()
                },
            )
            .unwrap();

        let call = &encoder.calls()[0];
        assert_eq!((call.width, call.height), (4, 4));
        assert!(call.pixels[..4 * 2 * 3].iter().all(|&b| b == 9));
        assert!(call.pixels[4 * 2 * 3..].iter().all(|&b| b == 0));

        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn mesh_tiles_sample_the_block_under_the_albedo_tile() {
        let root = temp_root("tiler_mesh");
        // Albedo tile 8, elevation tile 2: the mesh field is a quarter size.
        let field = HeightField::from_fn(4, 2, |x, y| (x + 10 * y) as f32);

        let encoder = RecordingEncoder::default();
        let mut writer = TileWriter::new(&root, &encoder, 8, 2, 80, 70);
        let summary = writer
            .write_level(
                0,
                16,
                8,
                LevelSources {
                    elevation: Some(&field),
                    meshes: true,
                    previews: true,
                    ..LevelSources::default()
                },
            )
            .unwrap();
        assert_eq!(summary.mesh_files, 2);
        assert_eq!(summary.preview_files, 2);
        assert_eq!(summary.albedo_files, 0);

        let mut file = File::open(root.join("0/0/1.el")).unwrap();
        let mesh = read_mesh(&mut file).unwrap();
        assert_eq!((mesh.width, mesh.height), (2, 2));
        assert_eq!(mesh.vertices.len(), 9);
        assert_eq!(mesh.vertices[0].z, 2.0);
        assert_eq!(mesh.vertices[1].x, 0.5);
        // Last column and row replicate the field edge.
        assert_eq!(mesh.vertices[8].z, 13.0);

        let previews: Vec<_> = encoder
            .calls()
            .into_iter()
            .filter(|c| c.format == PixelFormat::L8)
            .collect();
        assert_eq!(previews.len(), 2);
        assert_eq!(previews[1].quality, 70);
        assert_eq!(previews[1].pixels, vec![2, 3, 12, 13]);
        assert!(root.join("0/0/1.elev.jpg").is_file());

        fs::remove_dir_all(&root).ok();
    }
}
