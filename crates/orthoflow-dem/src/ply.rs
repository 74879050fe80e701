use std::io::{BufRead, BufWriter, Read, Write};
use std::path::Path;

use crate::cloud::PointCloud;

/// Error types for the PLY module.
#[derive(Debug, thiserror::Error)]
pub enum PlyError {
    /// Failed to read or write the PLY file.
    #[error("failed to access PLY file")]
    Io(#[from] std::io::Error),

    /// The header is not the binary little-endian layout written here.
    #[error("unsupported PLY header")]
    UnsupportedHeader,
}

const HEADER_PROPERTIES: [&str; 6] = [
    "property double x",
    "property double y",
    "property double z",
    "property uchar red",
    "property uchar green",
    "property uchar blue",
];

/// Write a point cloud as binary little-endian PLY with per-point color.
///
/// Uncolored clouds are written black so every artifact carries the same
/// layout.
pub fn write_ply_binary(path: impl AsRef<Path>, cloud: &PointCloud) -> Result<(), PlyError> {
    let file = std::fs::File::create(path)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "ply")?;
    writeln!(writer, "format binary_little_endian 1.0")?;
    writeln!(writer, "element vertex {}", cloud.len())?;
    for property in HEADER_PROPERTIES {
        writeln!(writer, "{property}")?;
    }
    writeln!(writer, "end_header")?;

    for (i, point) in cloud.points().iter().enumerate() {
        for coord in point {
            writer.write_all(&coord.to_le_bytes())?;
        }
        let color = cloud.colors().map_or([0, 0, 0], |c| c[i]);
        writer.write_all(&color)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a point cloud written by [`write_ply_binary`].
pub fn read_ply_binary(path: impl AsRef<Path>) -> Result<PointCloud, PlyError> {
    let file = std::fs::File::open(path)?;
    let mut reader = std::io::BufReader::new(file);

    let vertex_count = parse_header(&mut reader)?;

    let mut points = Vec::with_capacity(vertex_count);
    let mut colors = Vec::with_capacity(vertex_count);
    let mut buffer = [0u8; 27]; // 3 doubles + 3 uchars

    for _ in 0..vertex_count {
        reader.read_exact(&mut buffer)?;
        let mut point = [0.0; 3];
        for (i, coord) in point.iter_mut().enumerate() {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&buffer[i * 8..i * 8 + 8]);
            *coord = f64::from_le_bytes(bytes);
        }
        points.push(point);
        colors.push([buffer[24], buffer[25], buffer[26]]);
    }

    Ok(PointCloud::new(points, Some(colors)))
}

fn parse_header<R: BufRead>(reader: &mut R) -> Result<usize, PlyError> {
    let mut line = String::new();
    let mut vertex_count = None;
    let mut is_ply = false;
    let mut is_binary_little_endian = false;

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let trimmed = line.trim();

        if trimmed == "ply" {
            is_ply = true;
        } else if trimmed == "end_header" {
            break;
        } else if trimmed.starts_with("format binary_little_endian") {
            is_binary_little_endian = true;
        } else if trimmed.starts_with("element vertex") {
            vertex_count = trimmed
                .split_whitespace()
                .last()
                .and_then(|s| s.parse().ok());
        }
    }

    if !is_ply || !is_binary_little_endian {
        return Err(PlyError::UnsupportedHeader);
    }
    vertex_count.ok_or(PlyError::UnsupportedHeader)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_round_trip() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("points.ply");

        let cloud = PointCloud::new(
            vec![[200_100.5, 600_250.25, 57.125], [200_101.0, 600_251.0, 58.0]],
            Some(vec![[255, 128, 0], [0, 64, 32]]),
        );
        write_ply_binary(&path, &cloud)?;

        let back = read_ply_binary(&path)?;
        assert_eq!(back.len(), 2);
        assert_eq!(back.points()[0], [200_100.5, 600_250.25, 57.125]);
        assert_eq!(back.colors().unwrap()[1], [0, 64, 32]);
        Ok(())
    }

    #[test]
    fn uncolored_cloud_is_written_black() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("bare.ply");

        write_ply_binary(&path, &PointCloud::new(vec![[1.0, 2.0, 3.0]], None))?;
        let back = read_ply_binary(&path)?;
        assert_eq!(back.colors().unwrap()[0], [0, 0, 0]);
        Ok(())
    }

    #[test]
    fn ascii_header_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("ascii.ply");
        std::fs::write(&path, "ply\nformat ascii 1.0\nelement vertex 0\nend_header\n")?;
        assert!(matches!(
            read_ply_binary(&path),
            Err(PlyError::UnsupportedHeader)
        ));
        Ok(())
    }
}
