use foundation::math::Vec2;
use layers::{AlbedoRaster, HeightField, RasterLayer, darken_rgb};
use runtime::BandScheduler;
use tracing::info;

use super::ShadowError;
use super::raycast::ShadowCaster;
use super::sun::SunSampleSet;

/// Bakes soft sun shadows into `albedo`.
///
/// Rows are split into one band per scheduler worker; each worker shades
/// only its own rows while all of them read the shared height field. Returns
/// once every band is done.
pub fn render_shadows(
    albedo: &mut AlbedoRaster,
    field: &HeightField,
    sun: &SunSampleSet,
    strength: f32,
    scheduler: &BandScheduler,
) -> Result<(), ShadowError> {
    if albedo.dimensions() != field.dimensions() {
        return Err(ShadowError::SizeMismatch {
            albedo: albedo.dimensions(),
            elevation: field.dimensions(),
        });
    }
    let (width, height) = field.dimensions();
    if width < 4 || height < 4 {
        return Err(ShadowError::FieldTooSmall { width, height });
    }

    info!(
        "rendering shadows over {width}x{height} with {} workers",
        scheduler.workers()
    );

    let caster = ShadowCaster::new(field, strength);
    // Start positions are pulled in so the first bilinear lookup stays valid.
    let max_x = width as f32 - 2.0;
    let max_y = height as f32 - 2.0;
    let row_len = albedo.row_len();

    scheduler.run_bands(albedo.as_bytes_mut(), row_len, |mut band| {
        for y in band.rows() {
            let row = band.row_mut(y);
            for (x, pixel) in row.chunks_exact_mut(4).enumerate() {
                let start = Vec2::new((x as f32).min(max_x), (y as f32).min(max_y));
                let intensity = caster.intensity(start, sun);
                darken_rgb(pixel, intensity);
            }
        }
    });

    Ok(())
}
