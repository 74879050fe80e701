use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::IoError;

/// Merge planar B, G, R, A channels and write a georeferenced PNG plus
/// its 6-line affine world-file sidecar.
///
/// The sidecar holds `{pixel size x, 0, 0, -pixel size y, top-left x,
/// top-left y}`, one value per line. The CRS identity is communicated
/// out-of-band. Identical inputs always produce byte-identical outputs.
///
/// # Arguments
///
/// * `dst` - Output path without extension; `.png` and `.pgw` are added.
/// * `b`, `g`, `r`, `a` - Planar channels, `width * height` bytes each.
/// * `width`, `height` - Raster shape in pixels.
/// * `gsd` - Ground size of one pixel in meters.
/// * `top_left` - Target CRS position of the raster's north-west corner.
///
/// # Returns
///
/// The path of the written PNG.
#[allow(clippy::too_many_arguments)]
pub fn write_orthophoto(
    dst: impl AsRef<Path>,
    b: &[u8],
    g: &[u8],
    r: &[u8],
    a: &[u8],
    width: usize,
    height: usize,
    gsd: f64,
    top_left: (f64, f64),
) -> Result<PathBuf, IoError> {
    let expected = width * height;
    for (channel, data) in [("b", b), ("g", g), ("r", r), ("a", a)] {
        if data.len() != expected {
            log::error!("channel {channel} holds {} bytes, raster needs {expected}", data.len());
            return Err(IoError::InvalidImageBuffer(data.len(), width, height, 1));
        }
    }

    let mut rgba = Vec::with_capacity(expected * 4);
    for i in 0..expected {
        rgba.extend_from_slice(&[r[i], g[i], b[i], a[i]]);
    }

    let png_path = dst.as_ref().with_extension("png");
    let file = BufWriter::new(File::create(&png_path)?);
    let mut encoder = png::Encoder::new(file, width as u32, height as u32);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&rgba)?;
    writer.finish()?;

    write_world_file(dst.as_ref().with_extension("pgw"), gsd, top_left)?;
    Ok(png_path)
}

/// Write the 6-line affine world file for a north-up raster.
pub fn write_world_file(
    path: impl AsRef<Path>,
    gsd: f64,
    top_left: (f64, f64),
) -> Result<(), IoError> {
    let mut file = BufWriter::new(File::create(path)?);
    write!(
        file,
        "{gsd}\n0\n0\n{}\n{}\n{}",
        -gsd, top_left.0, top_left.1
    )?;
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_raster_and_sidecar() -> Result<(), IoError> {
        let dir = tempfile::tempdir()?;
        let dst = dir.path().join("ortho_0001");

        let b = vec![10u8; 6];
        let g = vec![20u8; 6];
        let r = vec![30u8; 6];
        let a = vec![255u8; 6];
        let png = write_orthophoto(&dst, &b, &g, &r, &a, 3, 2, 0.1, (200_000.0, 600_010.0))?;

        assert!(png.exists());
        let world = std::fs::read_to_string(dst.with_extension("pgw"))?;
        let lines: Vec<&str> = world.lines().collect();
        assert_eq!(lines, vec!["0.1", "0", "0", "-0.1", "200000", "600010"]);
        Ok(())
    }

    #[test]
    fn identical_inputs_are_byte_identical() -> Result<(), IoError> {
        let dir = tempfile::tempdir()?;
        let b: Vec<u8> = (0..16).collect();
        let g: Vec<u8> = (16..32).collect();
        let r: Vec<u8> = (32..48).collect();
        let a = vec![255u8; 16];

        let first = dir.path().join("first");
        let second = dir.path().join("second");
        write_orthophoto(&first, &b, &g, &r, &a, 4, 4, 0.05, (1.5, 2.5))?;
        write_orthophoto(&second, &b, &g, &r, &a, 4, 4, 0.05, (1.5, 2.5))?;

        assert_eq!(
            std::fs::read(first.with_extension("png"))?,
            std::fs::read(second.with_extension("png"))?
        );
        assert_eq!(
            std::fs::read(first.with_extension("pgw"))?,
            std::fs::read(second.with_extension("pgw"))?
        );
        Ok(())
    }

    #[test]
    fn channel_size_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let dst = dir.path().join("bad");
        let result = write_orthophoto(&dst, &[0; 4], &[0; 4], &[0; 4], &[0; 3], 2, 2, 0.1, (0.0, 0.0));
        assert!(matches!(result, Err(IoError::InvalidImageBuffer(3, 2, 2, 1))));
    }
}
