//! Terrain mesh tiles: per-tile vertex grids and the index topology shared by
//! every tile of the same size.

use std::fmt;

use foundation::math::z_order;

use crate::terrain::HeightField;

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct MeshVertex {
    /// 0..1 across the tile.
    pub x: f32,
    /// 0..1 down the tile.
    pub y: f32,
    /// Raw elevation.
    pub z: f32,
}

/// Fills `out` with the `(width + 1) x (height + 1)` vertex grid of the
/// `width x height` quad block whose top-left texel is `(x0, y0)`.
///
/// Grid points past the field edge take the last row/column (the mesh must
/// stay closed, so the edge is replicated rather than zeroed).
pub fn sample_vertex_grid(
    field: &HeightField,
    x0: u32,
    y0: u32,
    width: u32,
    height: u32,
    out: &mut Vec<MeshVertex>,
) {
    out.clear();
    out.reserve((width as usize + 1) * (height as usize + 1));

    for ty in 0..=height {
        for tx in 0..=width {
            out.push(MeshVertex {
                x: tx as f32 / width as f32,
                y: ty as f32 / height as f32,
                z: field.texel_clamped(x0 + tx, y0 + ty),
            });
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexBufferError {
    NotPowerOfTwo(u32),
    TooLarge(u32),
}

impl fmt::Display for IndexBufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexBufferError::NotPowerOfTwo(size) => {
                write!(f, "mesh tile size {size} is not a power of two")
            }
            IndexBufferError::TooLarge(size) => {
                write!(f, "mesh tile size {size} needs indices wider than 16 bits")
            }
        }
    }
}

impl std::error::Error for IndexBufferError {}

/// Triangle list for a `size x size` quad tile, in Z-order.
///
/// The order only depends on `size`, so one buffer serves every tile of
/// every level. Quad `(x, y)` with top-left vertex `v = x + y * (size + 1)`
/// emits `v, v+1, v+s` and `v+1, v+s+1, v+s` where `s = size + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedIndexBuffer {
    size: u32,
    indices: Vec<u16>,
}

impl SharedIndexBuffer {
    pub fn build(size: u32) -> Result<Self, IndexBufferError> {
        if !size.is_power_of_two() {
            return Err(IndexBufferError::NotPowerOfTwo(size));
        }
        let stride = size + 1;
        if (stride as u64 * stride as u64) > u16::MAX as u64 + 1 {
            return Err(IndexBufferError::TooLarge(size));
        }

        let depth = size.trailing_zeros();
        let mut indices = Vec::with_capacity(size as usize * size as usize * 6);
        for (x, y) in z_order(depth) {
            let v = (x + y * stride) as u16;
            let s = stride as u16;
            indices.extend_from_slice(&[v, v + 1, v + s, v + 1, v + s + 1, v + s]);
        }

        Ok(Self { size, indices })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn indices(&self) -> &[u16] {
        &self.indices
    }
}

#[cfg(test)]
mod tests {
    use super::{IndexBufferError, SharedIndexBuffer, sample_vertex_grid};
    use crate::terrain::HeightField;

    #[test]
    fn index_buffer_for_128_covers_every_quad() {
        let buffer = SharedIndexBuffer::build(128).unwrap();
        assert_eq!(buffer.indices().len(), 128 * 128 * 6);
        assert!(buffer.indices().iter().all(|&i| (i as u32) < 129 * 129));

        let mut quads: Vec<u16> = buffer.indices().chunks_exact(6).map(|q| q[0]).collect();
        quads.sort_unstable();
        quads.dedup();
        assert_eq!(quads.len(), 128 * 128);
    }

    #[test]
    fn quads_follow_z_order() {
        let buffer = SharedIndexBuffer::build(4).unwrap();
        let first: Vec<u16> = buffer.indices().chunks_exact(6).take(5).map(|q| q[0]).collect();
        // (0,0) (1,0) (0,1) (1,1) (2,0) with a stride of 5.
        assert_eq!(first, vec![0, 1, 5, 6, 2]);
        assert_eq!(&buffer.indices()[..6], &[0, 1, 5, 1, 6, 5]);
    }

    #[test]
    fn rejects_unsupported_sizes() {
        assert_eq!(
            SharedIndexBuffer::build(100),
            Err(IndexBufferError::NotPowerOfTwo(100))
        );
        assert_eq!(
            SharedIndexBuffer::build(256),
            Err(IndexBufferError::TooLarge(256))
        );
    }

    #[test]
    fn vertex_grid_replicates_the_far_edge() {
        let field = HeightField::from_fn(4, 4, |x, y| (x + 4 * y) as f32);
        let mut verts = Vec::new();
        sample_vertex_grid(&field, 2, 2, 2, 2, &mut verts);

        assert_eq!(verts.len(), 9);
        assert_eq!(verts[0].z, 10.0);
        assert_eq!(verts[2].z, 11.0);
        assert_eq!(verts[8].z, 15.0);
        assert_eq!((verts[4].x, verts[4].y), (0.5, 0.5));
        assert_eq!((verts[8].x, verts[8].y), (1.0, 1.0));
    }
}
