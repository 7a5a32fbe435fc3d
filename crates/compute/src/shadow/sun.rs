use foundation::math::Vec3;

/// Number of directions sampled per texel.
pub const SUN_SAMPLES: usize = 5;

/// Sun position and angular size, in degrees.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SunParams {
    pub heading_deg: f32,
    pub pitch_deg: f32,
    pub heading_spread_deg: f32,
    pub pitch_spread_deg: f32,
}

impl Default for SunParams {
    fn default() -> Self {
        Self {
            heading_deg: 180.0,
            pitch_deg: 25.0,
            heading_spread_deg: 2.0,
            pitch_spread_deg: 0.5,
        }
    }
}

/// Five directions toward an extended sun: the center, then heading +/-
/// spread, then pitch +/- spread.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SunSampleSet {
    directions: [Vec3; SUN_SAMPLES],
}

impl SunSampleSet {
    /// Returns `None` when any sample would not point above the horizon.
    pub fn new(params: SunParams) -> Option<Self> {
        let h = params.heading_deg.to_radians();
        let p = params.pitch_deg.to_radians();
        let hs = params.heading_spread_deg.to_radians();
        let ps = params.pitch_spread_deg.to_radians();

        let directions = [
            Vec3::from_heading_pitch(h, p),
            Vec3::from_heading_pitch(h + hs, p),
            Vec3::from_heading_pitch(h - hs, p),
            Vec3::from_heading_pitch(h, p + ps),
            Vec3::from_heading_pitch(h, p - ps),
        ];

        if directions.iter().any(|d| d.z <= 0.0) {
            return None;
        }
        Some(Self { directions })
    }

    pub fn directions(&self) -> &[Vec3; SUN_SAMPLES] {
        &self.directions
    }
}
