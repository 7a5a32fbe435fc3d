//! 2x2 box-filter halving, the building block of every pyramid level.

use crate::layer::RasterError;

fn check_even(width: u32, height: u32) -> Result<(), RasterError> {
    if width % 2 != 0 || height % 2 != 0 {
        return Err(RasterError::OddDimensions { width, height });
    }
    Ok(())
}

/// Halves a packed RGBA8 raster. Each channel of an output texel is the
/// truncated integer mean of the 2x2 input block.
pub fn halve_rgba(src: &[u8], width: u32, height: u32) -> Result<Vec<u8>, RasterError> {
    check_even(width, height)?;

    let (w, h) = (width as usize, height as usize);
    let half_w = w / 2;
    let mut out = vec![0u8; half_w * (h / 2) * 4];

    for y in (0..h).step_by(2) {
        let top = &src[y * w * 4..(y + 1) * w * 4];
        let bottom = &src[(y + 1) * w * 4..(y + 2) * w * 4];
        let dst_row = &mut out[(y / 2) * half_w * 4..(y / 2 + 1) * half_w * 4];

        for x in (0..w).step_by(2) {
            for c in 0..4 {
                let sum = top[x * 4 + c] as u32
                    + top[(x + 1) * 4 + c] as u32
                    + bottom[x * 4 + c] as u32
                    + bottom[(x + 1) * 4 + c] as u32;
                dst_row[(x / 2) * 4 + c] = (sum / 4) as u8;
            }
        }
    }

    Ok(out)
}

/// Halves a float raster by averaging each 2x2 block.
pub fn halve_f32(src: &[f32], width: u32, height: u32) -> Result<Vec<f32>, RasterError> {
    check_even(width, height)?;

    let (w, h) = (width as usize, height as usize);
    let half_w = w / 2;
    let mut out = Vec::with_capacity(half_w * (h / 2));

    for y in (0..h).step_by(2) {
        let top = &src[y * w..(y + 1) * w];
        let bottom = &src[(y + 1) * w..(y + 2) * w];
        for x in (0..w).step_by(2) {
            out.push((top[x] + top[x + 1] + bottom[x] + bottom[x + 1]) / 4.0);
        }
    }

    Ok(out)
}
