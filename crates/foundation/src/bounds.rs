/// One tile of a pyramid level, in texels of that level.
///
/// Only used to drive iteration; tiles are never stored, only written out.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TileRect {
    pub x: u32,
    pub y: u32,
    pub extent: u32,
    pub lod: u32,
}

impl TileRect {
    pub fn new(x: u32, y: u32, extent: u32, lod: u32) -> Self {
        TileRect { x, y, extent, lod }
    }

    pub fn row(&self) -> u32 {
        self.y / self.extent
    }

    pub fn col(&self) -> u32 {
        self.x / self.extent
    }
}

/// Tile origins covering a `width x height` level in strides of `extent`,
/// row by row.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TileGrid {
    pub width: u32,
    pub height: u32,
    pub extent: u32,
    pub lod: u32,
}

impl TileGrid {
    pub fn new(width: u32, height: u32, extent: u32, lod: u32) -> Self {
        assert!(extent > 0, "tile extent must be non-zero");
        TileGrid {
            width,
            height,
            extent,
            lod,
        }
    }

    pub fn cols(&self) -> u32 {
        self.width.div_ceil(self.extent)
    }

    pub fn rows(&self) -> u32 {
        self.height.div_ceil(self.extent)
    }

    pub fn len(&self) -> usize {
        self.cols() as usize * self.rows() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True once the whole level fits in a single tile.
    pub fn is_single_tile(&self) -> bool {
        self.width <= self.extent && self.height <= self.extent
    }

    pub fn tiles(&self) -> impl Iterator<Item = TileRect> + '_ {
        let grid = *self;
        (0..grid.rows()).flat_map(move |row| {
            (0..grid.cols()).map(move |col| {
                TileRect::new(col * grid.extent, row * grid.extent, grid.extent, grid.lod)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{TileGrid, TileRect};

    #[test]
    fn grid_walks_rows_then_columns() {
        let grid = TileGrid::new(1024, 512, 256, 1);
        assert_eq!(grid.cols(), 4);
        assert_eq!(grid.rows(), 2);
        assert_eq!(grid.len(), 8);

        let tiles: Vec<_> = grid.tiles().collect();
        assert_eq!(tiles[0], TileRect::new(0, 0, 256, 1));
        assert_eq!(tiles[3], TileRect::new(768, 0, 256, 1));
        assert_eq!(tiles[4], TileRect::new(0, 256, 256, 1));
        assert_eq!((tiles[7].row(), tiles[7].col()), (1, 3));
    }

    #[test]
    fn undersized_level_is_one_tile() {
        let grid = TileGrid::new(512, 256, 512, 3);
        assert!(grid.is_single_tile());
        assert_eq!(grid.len(), 1);
        assert!(!TileGrid::new(1024, 512, 512, 0).is_single_tile());
    }
}
