use crate::layer::{RasterError, RasterLayer};
use crate::mip::halve_rgba;

pub const BYTES_PER_PIXEL: usize = 4;

/// Packed RGBA8 color raster. Alpha is carried along but never used.
#[derive(Debug, Clone, PartialEq)]
pub struct AlbedoRaster {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl AlbedoRaster {
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, RasterError> {
        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        if rgba.len() != expected {
            return Err(RasterError::BufferSize {
                expected,
                found: rgba.len(),
            });
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn filled(width: u32, height: u32, pixel: [u8; 4]) -> Self {
        let rgba = pixel.repeat(width as usize * height as usize);
        Self {
            width,
            height,
            rgba,
        }
    }

    pub fn row_len(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (x as usize + y as usize * self.width as usize) * BYTES_PER_PIXEL;
        [self.rgba[i], self.rgba[i + 1], self.rgba[i + 2], self.rgba[i + 3]]
    }

    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.row_len();
        &self.rgba[start..start + self.row_len()]
    }

    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let len = self.row_len();
        let start = y as usize * len;
        &mut self.rgba[start..start + len]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.rgba
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.rgba
    }
}

impl RasterLayer for AlbedoRaster {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn downsample(&mut self) -> Result<(), RasterError> {
        self.rgba = halve_rgba(&self.rgba, self.width, self.height)?;
        self.width /= 2;
        self.height /= 2;
        Ok(())
    }
}

/// Scales the RGB channels of one RGBA pixel, truncating toward zero.
#[inline]
pub fn darken_rgb(pixel: &mut [u8], intensity: f32) {
    for c in &mut pixel[..3] {
        *c = (*c as f32 * intensity) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::{AlbedoRaster, darken_rgb};
    use crate::layer::{RasterError, RasterLayer};

    #[test]
    fn rejects_short_buffers() {
        let err = AlbedoRaster::new(2, 2, vec![0; 15]).unwrap_err();
        assert_eq!(
            err,
            RasterError::BufferSize {
                expected: 16,
                found: 15
            }
        );
    }

    #[test]
    fn darken_leaves_alpha_alone() {
        let mut px = [200, 101, 3, 77];
        darken_rgb(&mut px, 0.5);
        assert_eq!(px, [100, 50, 1, 77]);

        let mut px = [200, 101, 3, 77];
        darken_rgb(&mut px, 1.0);
        assert_eq!(px, [200, 101, 3, 77]);
    }

    #[test]
    fn downsample_constant_keeps_value() {
        let mut albedo = AlbedoRaster::filled(512, 256, [12, 34, 56, 255]);
        albedo.downsample().unwrap();
        assert_eq!(albedo.dimensions(), (256, 128));
        assert_eq!(albedo.as_bytes().len(), 256 * 128 * 4);
        assert!(albedo.as_bytes().chunks_exact(4).all(|p| p == [12, 34, 56, 255]));

        albedo.downsample().unwrap();
        assert_eq!(albedo.dimensions(), (128, 64));
    }

    #[test]
    fn rows_are_width_times_four_bytes() {
        let mut albedo = AlbedoRaster::filled(3, 2, [0, 0, 0, 0]);
        albedo.row_mut(1)[4..8].copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(albedo.row(1).len(), 12);
        assert_eq!(albedo.pixel(1, 1), [1, 2, 3, 4]);
        assert_eq!(albedo.pixel(1, 0), [0, 0, 0, 0]);
    }
}
