//! Flat binary mesh tiles and the shared index file.
//!
//! Both start with the same little-endian header, `u32 width, u32 height,
//! u32 count`, followed by `count` records:
//! - mesh tile: `count = (width + 1) * (height + 1)` vertices of `f32 x, y, z`
//! - index file: `count = width * height * 6` `u16` indices

use std::fmt;
use std::io::{Read, Write};

use layers::MeshVertex;

#[derive(Debug)]
pub enum MeshFileError {
    UnexpectedEof,
    Io(std::io::Error),
    CountMismatch { expected: u64, found: u32 },
}

impl fmt::Display for MeshFileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshFileError::UnexpectedEof => write!(f, "unexpected EOF"),
            MeshFileError::Io(err) => write!(f, "I/O error: {err}"),
            MeshFileError::CountMismatch { expected, found } => {
                write!(f, "header declares {found} records, expected {expected}")
            }
        }
    }
}

impl std::error::Error for MeshFileError {}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub width: u32,
    pub height: u32,
    pub count: u32,
}

impl FileHeader {
    pub const LEN: usize = 12;

    pub fn read(r: &mut impl Read) -> Result<Self, MeshFileError> {
        Ok(Self {
            width: read_u32_le(r)?,
            height: read_u32_le(r)?,
            count: read_u32_le(r)?,
        })
    }

    fn write(&self, w: &mut impl Write) -> Result<(), MeshFileError> {
        write_u32_le(w, self.width)?;
        write_u32_le(w, self.height)?;
        write_u32_le(w, self.count)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshTile {
    pub width: u32,
    pub height: u32,
    pub vertices: Vec<MeshVertex>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexFile {
    pub width: u32,
    pub height: u32,
    pub indices: Vec<u16>,
}

pub fn write_mesh(
    w: &mut impl Write,
    width: u32,
    height: u32,
    vertices: &[MeshVertex],
) -> Result<(), MeshFileError> {
    let header = FileHeader {
        width,
        height,
        count: vertices.len() as u32,
    };
    check_count(mesh_vertex_count(width, height), header.count)?;
    header.write(w)?;

    let mut bytes = Vec::with_capacity(vertices.len() * 12);
    for v in vertices {
        bytes.extend_from_slice(&v.x.to_le_bytes());
        bytes.extend_from_slice(&v.y.to_le_bytes());
        bytes.extend_from_slice(&v.z.to_le_bytes());
    }
    w.write_all(&bytes).map_err(map_io_err)
}

pub fn read_mesh(r: &mut impl Read) -> Result<MeshTile, MeshFileError> {
    let header = FileHeader::read(r)?;
    check_count(mesh_vertex_count(header.width, header.height), header.count)?;

    let bytes = read_records(r, header.count as u64 * 12)?;
    let vertices = bytes
        .chunks_exact(12)
        .map(|rec| MeshVertex {
            x: f32_at(rec, 0),
            y: f32_at(rec, 4),
            z: f32_at(rec, 8),
        })
        .collect();

    Ok(MeshTile {
        width: header.width,
        height: header.height,
        vertices,
    })
}

pub fn write_indices(
    w: &mut impl Write,
    width: u32,
    height: u32,
    indices: &[u16],
) -> Result<(), MeshFileError> {
    let header = FileHeader {
        width,
        height,
        count: indices.len() as u32,
    };
    check_count(index_count(width, height), header.count)?;
    header.write(w)?;

    let bytes: Vec<u8> = indices.iter().flat_map(|i| i.to_le_bytes()).collect();
    w.write_all(&bytes).map_err(map_io_err)
}

pub fn read_indices(r: &mut impl Read) -> Result<IndexFile, MeshFileError> {
    let header = FileHeader::read(r)?;
    check_count(index_count(header.width, header.height), header.count)?;

    let bytes = read_records(r, header.count as u64 * 2)?;
    let indices = bytes
        .chunks_exact(2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .collect();

    Ok(IndexFile {
        width: header.width,
        height: header.height,
        indices,
    })
}

fn mesh_vertex_count(width: u32, height: u32) -> u64 {
    (width as u64 + 1) * (height as u64 + 1)
}

fn index_count(width: u32, height: u32) -> u64 {
    width as u64 * height as u64 * 6
}

fn check_count(expected: u64, found: u32) -> Result<(), MeshFileError> {
    if expected != found as u64 {
        return Err(MeshFileError::CountMismatch { expected, found });
    }
    Ok(())
}

fn f32_at(rec: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes([rec[offset], rec[offset + 1], rec[offset + 2], rec[offset + 3]])
}

fn map_io_err(e: std::io::Error) -> MeshFileError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        MeshFileError::UnexpectedEof
    } else {
        MeshFileError::Io(e)
    }
}

/// Reads exactly `len` bytes. The buffer grows only as data arrives, never
/// from the header count alone.
fn read_records(r: &mut impl Read, len: u64) -> Result<Vec<u8>, MeshFileError> {
    let mut bytes = Vec::new();
    r.by_ref().take(len).read_to_end(&mut bytes).map_err(map_io_err)?;
    if (bytes.len() as u64) < len {
        return Err(MeshFileError::UnexpectedEof);
    }
    Ok(bytes)
}

fn read_u32_le(r: &mut impl Read) -> Result<u32, MeshFileError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf).map_err(map_io_err)?;
    Ok(u32::from_le_bytes(buf))
}

fn write_u32_le(w: &mut impl Write, v: u32) -> Result<(), MeshFileError> {
    w.write_all(&v.to_le_bytes()).map_err(map_io_err)
}
