//! Morton (Z-order) codes over a square grid of `2^depth x 2^depth` cells.
//!
//! A code is read two bits per level, least significant level first: bit 0 of
//! the level's quadrant selects the x half, bit 1 selects the y half. Visiting
//! codes `0..4^depth` in ascending order therefore walks quadrants
//! recursively (top-left, top-right, bottom-left, bottom-right at every
//! level), which is the traversal the shared mesh index buffer is baked in.

/// Largest depth whose codes fit in a `u32`.
pub const MAX_DEPTH: u32 = 16;

/// Decodes a Morton code into `(x, y)` by de-interleaving `depth` levels.
pub fn morton_decode(code: u32, depth: u32) -> (u32, u32) {
    debug_assert!(depth <= MAX_DEPTH);

    let mut x = 0u32;
    let mut y = 0u32;
    for level in 0..depth {
        let quadrant = (code >> (2 * level)) & 0b11;
        x |= (quadrant & 1) << level;
        y |= ((quadrant >> 1) & 1) << level;
    }
    (x, y)
}

/// Interleaves `x` and `y` into a Morton code (inverse of [`morton_decode`]).
pub fn morton_encode(x: u32, y: u32, depth: u32) -> u32 {
    debug_assert!(depth <= MAX_DEPTH);

    let mut code = 0u32;
    for level in 0..depth {
        let quadrant = ((x >> level) & 1) | (((y >> level) & 1) << 1);
        code |= quadrant << (2 * level);
    }
    code
}

/// All cells of a `2^depth` square grid in Z-order.
pub fn z_order(depth: u32) -> impl Iterator<Item = (u32, u32)> {
    assert!(depth <= MAX_DEPTH, "z-order depth {depth} too large");
    let count = 1u64 << (2 * depth);
    (0..count).map(move |code| morton_decode(code as u32, depth))
}
