use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::IoError;

/// Capture metadata of one geotagged drone image.
///
/// Positions are geodetic WGS84 degrees; the relative altitude is meters
/// above the takeoff point, which approximates height over ground far
/// better than the GPS altitude. Gimbal angles are in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureMetadata {
    /// Geodetic latitude in degrees.
    pub latitude: f64,
    /// Geodetic longitude in degrees.
    pub longitude: f64,
    /// Height above the takeoff point in meters.
    pub relative_altitude: f64,
    /// GPS (ellipsoidal) altitude in meters, when present.
    pub absolute_altitude: Option<f64>,
    /// Gimbal roll in degrees.
    pub gimbal_roll: f64,
    /// Gimbal pitch in degrees, -90 at nadir.
    pub gimbal_pitch: f64,
    /// Gimbal yaw in degrees, clockwise from north.
    pub gimbal_yaw: f64,
}

// The XMP packet sits in an APP1 segment near the start of the file;
// this covers every DJI firmware seen so far.
const HEADER_SCAN_BYTES: usize = 256 * 1024;

/// Read drone capture metadata from an image file without decoding pixels.
///
/// Scans the file header for the maker XMP packet (`drone-dji:` tags)
/// the way DJI writes it: XML attributes inside an APP1 segment. Both
/// the `GpsLongitude` and the misspelled `GpsLongtitude` tags found in
/// older firmwares are accepted.
///
/// # Arguments
///
/// * `path` - Path to the image file.
///
/// # Returns
///
/// The capture metadata, or an error naming the first missing tag.
pub fn read_capture_metadata(path: impl AsRef<Path>) -> Result<CaptureMetadata, IoError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(IoError::FileDoesNotExist(path.to_path_buf()));
    }

    let mut file = File::open(path)?;
    let mut buffer = vec![0; HEADER_SCAN_BYTES];
    let n = file.read(&mut buffer)?;
    buffer.truncate(n);

    // the packet is plain text, the surrounding JPEG is not; scan lossily
    let header = String::from_utf8_lossy(&buffer);

    let longitude = scan_tag(&header, "GpsLongitude")
        .or_else(|_| scan_tag(&header, "GpsLongtitude"))
        .map_err(|_| IoError::MissingMetadataTag("GpsLongitude"))?;

    Ok(CaptureMetadata {
        latitude: scan_tag(&header, "GpsLatitude")?,
        longitude,
        relative_altitude: scan_tag(&header, "RelativeAltitude")?,
        absolute_altitude: scan_tag(&header, "AbsoluteAltitude").ok(),
        gimbal_roll: scan_tag(&header, "GimbalRollDegree")?,
        gimbal_pitch: scan_tag(&header, "GimbalPitchDegree")?,
        gimbal_yaw: scan_tag(&header, "GimbalYawDegree")?,
    })
}

/// Extract one `drone-dji` tag value, accepting both the attribute form
/// (`drone-dji:Tag="v"`) and the element form (`<drone-dji:Tag>v</...>`).
fn scan_tag(header: &str, tag: &'static str) -> Result<f64, IoError> {
    let attribute = format!("drone-dji:{tag}=\"");
    let raw = if let Some(start) = header.find(&attribute) {
        let rest = &header[start + attribute.len()..];
        rest.split('"').next()
    } else {
        let element = format!("<drone-dji:{tag}>");
        header.find(&element).and_then(|start| {
            let rest = &header[start + element.len()..];
            rest.split('<').next()
        })
    };

    let raw = raw.ok_or(IoError::MissingMetadataTag(tag))?.trim();
    raw.trim_start_matches('+')
        .parse()
        .map_err(|_| IoError::MalformedMetadataTag(tag))
}
