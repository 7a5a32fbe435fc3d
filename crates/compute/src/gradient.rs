use layers::{AlbedoRaster, RasterLayer, darken_rgb};
use tracing::info;

/// Fades the albedo to black over the outer `margin` texels of every edge.
///
/// Per axis the fade distance is how far a texel sits past
/// `center - margin` from the midline, in units of `margin`; the two axes
/// combine as a Euclidean length clamped to 1, so corners round off.
pub fn render_border_gradient(albedo: &mut AlbedoRaster, margin: u32) {
    assert!(margin > 0, "border margin must be non-zero");
    info!("rendering border gradient (margin {margin})");

    let (width, height) = albedo.dimensions();
    for y in 0..height {
        let yd = axis_distance(y, height, margin);
        let row = albedo.row_mut(y);
        for (x, pixel) in (0..width).zip(row.chunks_exact_mut(4)) {
            let xd = axis_distance(x, width, margin);
            let dist = (xd * xd + yd * yd).sqrt().min(1.0);
            darken_rgb(pixel, 1.0 - dist);
        }
    }
}

fn axis_distance(coord: u32, size: u32, margin: u32) -> f32 {
    let center = (size / 2) as i64;
    let past = (coord as i64 - center).abs() - (center - margin as i64);
    past.max(0) as f32 / margin as f32
}

#[cfg(test)]
mod tests {
    use super::{axis_distance, render_border_gradient};
    use layers::AlbedoRaster;

    #[test]
    fn axis_distance_is_zero_inside_margin() {
        assert_eq!(axis_distance(512, 1024, 255), 0.0);
        assert_eq!(axis_distance(255, 1024, 255), 0.0);
        assert_eq!(axis_distance(769, 1024, 255), 0.0);
        assert_eq!(axis_distance(0, 1024, 255), 1.0);
        assert!(axis_distance(100, 1024, 255) > axis_distance(200, 1024, 255));
    }

    #[test]
    fn interior_is_untouched_and_edges_darken() {
        let mut albedo = AlbedoRaster::filled(1024, 1024, [200, 150, 100, 255]);
        render_border_gradient(&mut albedo, 255);

        for (x, y) in [(512, 512), (300, 700), (257, 512), (767, 767)] {
            assert_eq!(albedo.pixel(x, y), [200, 150, 100, 255], "at ({x}, {y})");
        }

        // Strictly darker walking toward each edge from the interior.
        let mut prev = albedo.pixel(512, 255)[0];
        for y in (0..255).rev().step_by(16) {
            let v = albedo.pixel(512, y)[0];
            assert!(v < prev, "row {y}: {v} !< {prev}");
            prev = v;
        }
        let mut prev = albedo.pixel(769, 512)[0];
        for x in (770..1024).step_by(16) {
            let v = albedo.pixel(x, 512)[0];
            assert!(v < prev, "col {x}: {v} !< {prev}");
            prev = v;
        }

        assert_eq!(albedo.pixel(0, 512), [0, 0, 0, 255]);
        assert_eq!(albedo.pixel(0, 0), [0, 0, 0, 255]);
    }
}
