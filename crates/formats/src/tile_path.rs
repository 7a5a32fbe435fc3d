use std::path::{Path, PathBuf};

/// `<root>/<lod>/<row>/<col>.<ext>`
pub fn tile_path(root: &Path, lod: u32, row: u32, col: u32, ext: &str) -> PathBuf {
    root.join(lod.to_string())
        .join(row.to_string())
        .join(format!("{col}.{ext}"))
}

/// Client-side template matching [`tile_path`].
pub fn tile_path_template(ext: &str) -> String {
    format!("{{lod}}/{{row}}/{{col}}.{ext}")
}
