use foundation::math::Vec2;

use crate::layer::{RasterError, RasterLayer};
use crate::mip::halve_f32;

/// Highest elevation a texel can hold.
pub const MAX_ELEVATION: f32 = 255.0;

/// Float elevation raster with bilinear sampling.
///
/// Values are in `[0, MAX_ELEVATION]`. The same type backs both the
/// full-resolution field the shadow pass marches through and the coarser
/// working copy meshes are cut from.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightField {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl HeightField {
    pub fn new(width: u32, height: u32, data: Vec<f32>) -> Result<Self, RasterError> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(RasterError::BufferSize {
                expected,
                found: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn flat(width: u32, height: u32, elevation: f32) -> Self {
        Self {
            width,
            height,
            data: vec![elevation; width as usize * height as usize],
        }
    }

    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> f32) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Decodes an elevation image whose texels carry elevation as
    /// `alpha * blue / 255`.
    pub fn from_encoded_rgba(width: u32, height: u32, rgba: &[u8]) -> Result<Self, RasterError> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(RasterError::BufferSize {
                expected,
                found: rgba.len(),
            });
        }

        let data = rgba
            .chunks_exact(4)
            .map(|px| px[3] as f32 * px[2] as f32 / 255.0)
            .collect();
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn texel(&self, x: u32, y: u32) -> f32 {
        self.data[x as usize + y as usize * self.width as usize]
    }

    /// Texel lookup that replicates the last row/column past the edge.
    pub fn texel_clamped(&self, x: u32, y: u32) -> f32 {
        self.texel(x.min(self.width - 1), y.min(self.height - 1))
    }

    /// Bilinearly interpolated elevation at a continuous position.
    ///
    /// `pos` must lie in `[0, width - 2] x [0, height - 2]`; callers keep their
    /// own margins; only debug builds check.
    #[inline]
    pub fn elevation_at(&self, pos: Vec2) -> f32 {
        debug_assert!(
            pos.x >= 0.0
                && pos.y >= 0.0
                && pos.x <= (self.width - 2) as f32
                && pos.y <= (self.height - 2) as f32,
            "elevation sample {pos:?} outside {}x{}",
            self.width,
            self.height
        );

        let px = pos.x as usize;
        let py = pos.y as usize;
        let wx = pos.x - px as f32;
        let wy = pos.y - py as f32;

        let stride = self.width as usize;
        let i = px + py * stride;
        let d = &self.data;

        (1.0 - wx) * (1.0 - wy) * d[i]
            + wx * (1.0 - wy) * d[i + 1]
            + (1.0 - wx) * wy * d[i + stride]
            + wx * wy * d[i + stride + 1]
    }

    /// Moves the field `dx` texels right and `dy` texels down, repeating the
    /// first column/row into the uncovered strip. Used to realign an
    /// elevation source that is offset against its albedo.
    pub fn shift_origin(&mut self, dx: u32, dy: u32) {
        if dx == 0 && dy == 0 {
            return;
        }

        let w = self.width as usize;
        // Walk backwards so every source texel is read before it is overwritten.
        for y in (0..self.height as usize).rev() {
            let sy = y.saturating_sub(dy as usize);
            for x in (0..w).rev() {
                let sx = x.saturating_sub(dx as usize);
                self.data[x + y * w] = self.data[sx + sy * w];
            }
        }
    }
}

impl RasterLayer for HeightField {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn downsample(&mut self) -> Result<(), RasterError> {
        self.data = halve_f32(&self.data, self.width, self.height)?;
        self.width /= 2;
        self.height /= 2;
        Ok(())
    }
}
