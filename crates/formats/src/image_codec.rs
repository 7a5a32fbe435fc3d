//! Image codecs behind small traits, so the pipeline only deals in byte
//! buffers and writers.

use std::fmt;
use std::io::Write;
use std::path::Path;

use image::ExtendedColorType;
use image::codecs::jpeg::JpegEncoder;

#[derive(Debug)]
pub enum CodecError {
    Io(std::io::Error),
    Image(image::ImageError),
    BufferSize { expected: usize, found: usize },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Io(err) => write!(f, "I/O error: {err}"),
            CodecError::Image(err) => write!(f, "image codec error: {err}"),
            CodecError::BufferSize { expected, found } => {
                write!(f, "pixel buffer holds {found} bytes, expected {expected}")
            }
        }
    }
}

impl std::error::Error for CodecError {}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        CodecError::Io(err)
    }
}

impl From<image::ImageError> for CodecError {
    fn from(err: image::ImageError) -> Self {
        CodecError::Image(err)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb8,
    L8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb8 => 3,
            PixelFormat::L8 => 1,
        }
    }
}

/// Compresses one tile into `out`.
pub trait TileEncoder {
    /// File extension of the produced tiles, without the dot.
    fn extension(&self) -> &str;

    fn encode(
        &self,
        pixels: &[u8],
        width: u32,
        height: u32,
        format: PixelFormat,
        quality: u8,
        out: &mut dyn Write,
    ) -> Result<(), CodecError>;
}

#[derive(Debug, Copy, Clone, Default)]
pub struct JpegTileEncoder;

impl TileEncoder for JpegTileEncoder {
    fn extension(&self) -> &str {
        "jpg"
    }

    fn encode(
        &self,
        pixels: &[u8],
        width: u32,
        height: u32,
        format: PixelFormat,
        quality: u8,
        out: &mut dyn Write,
    ) -> Result<(), CodecError> {
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if pixels.len() != expected {
            return Err(CodecError::BufferSize {
                expected,
                found: pixels.len(),
            });
        }

        let color = match format {
            PixelFormat::Rgb8 => ExtendedColorType::Rgb8,
            PixelFormat::L8 => ExtendedColorType::L8,
        };
        let mut encoder = JpegEncoder::new_with_quality(out, quality);
        encoder.encode(pixels, width, height, color)?;
        Ok(())
    }
}

/// A decoded source raster, always expanded to RGBA8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRaster {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

pub trait RasterDecoder {
    fn decode_rgba(&self, path: &Path) -> Result<DecodedRaster, CodecError>;
}

/// Decodes any format the `image` crate recognises (PNG in practice).
#[derive(Debug, Copy, Clone, Default)]
pub struct ImageFileDecoder;

impl RasterDecoder for ImageFileDecoder {
    fn decode_rgba(&self, path: &Path) -> Result<DecodedRaster, CodecError> {
        let mut reader = image::ImageReader::open(path)?.with_guessed_format()?;
        // Source maps are far beyond the default allocation limit.
        reader.no_limits();
        let rgba = reader.decode()?.into_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(DecodedRaster {
            width,
            height,
            rgba: rgba.into_raw(),
        })
    }
}
