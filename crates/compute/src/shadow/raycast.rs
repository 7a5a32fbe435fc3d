use foundation::math::{Vec2, Vec3};
use layers::{HeightField, MAX_ELEVATION, RasterLayer};

use super::sun::{SUN_SAMPLES, SunSampleSet};

/// Rays start this far above the surface so they don't hit their own texel.
pub const VIEWER_HEIGHT_OFFSET: f32 = 2.0;

/// How far below the terrain a ray must be before it counts as blocked.
pub const OCCLUSION_TOLERANCE: f32 = 5.0;

// Rays stop once they come this close to the field edge, which keeps every
// bilinear lookup (and its +1 neighbours) in range.
const LOW_MARGIN: f32 = 1.0;
const HIGH_MARGIN: f32 = 3.0;

/// Marches sun rays through a height field.
#[derive(Debug, Copy, Clone)]
pub struct ShadowCaster<'a> {
    field: &'a HeightField,
    strength: f32,
    max_x: f32,
    max_y: f32,
}

impl<'a> ShadowCaster<'a> {
    /// `strength` is the darkening applied when every sun sample is blocked.
    pub fn new(field: &'a HeightField, strength: f32) -> Self {
        Self {
            field,
            strength,
            max_x: field.width() as f32 - HIGH_MARGIN,
            max_y: field.height() as f32 - HIGH_MARGIN,
        }
    }

    /// Whether terrain blocks the ray from the surface at `start` toward the
    /// sun along `direction`.
    ///
    /// Each step advances exactly one texel horizontally; the vertical step
    /// follows from the pitch, so steep rays cover more 3D distance per step.
    /// Leaving the field or climbing above [`MAX_ELEVATION`] means the ray is
    /// free.
    pub fn is_occluded(&self, start: Vec2, direction: Vec3) -> bool {
        assert!(direction.z > 0.0, "sun ray must point upward");

        let mut pos = Vec3::from_xy(start, self.field.elevation_at(start) + VIEWER_HEIGHT_OFFSET);
        let step = direction * (1.0 / direction.xy().length());

        loop {
            pos += step;

            if pos.x < LOW_MARGIN || pos.x >= self.max_x || pos.y < LOW_MARGIN || pos.y >= self.max_y
            {
                return false;
            }

            let elevation = self.field.elevation_at(pos.xy());
            if pos.z < elevation - OCCLUSION_TOLERANCE {
                return true;
            }
            if pos.z > MAX_ELEVATION {
                return false;
            }
        }
    }

    /// Light multiplier for `start`: one minus `strength` scaled by the
    /// fraction of blocked sun samples.
    pub fn intensity(&self, start: Vec2, sun: &SunSampleSet) -> f32 {
        let hits = sun
            .directions()
            .iter()
            .filter(|dir| self.is_occluded(start, **dir))
            .count();
        1.0 - hits as f32 * (self.strength / SUN_SAMPLES as f32)
    }
}
