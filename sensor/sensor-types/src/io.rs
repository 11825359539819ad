//! Plain-text XYZ point files.
//!
//! One point per line: `x y z`, optionally followed by an intensity and/or
//! an 8-bit RGB triple:
//!
//! | Columns | Meaning |
//! |---------|---------|
//! | 3 | `x y z` |
//! | 4 | `x y z intensity` |
//! | 6 | `x y z r g b` |
//! | 7 | `x y z intensity r g b` |
//!
//! Blank lines and lines starting with `#` or `//` are ignored. The file
//! carries no header, so the caller supplies the stamp and frame.
//!
//! # Example
//!
//! ```
//! use sensor_types::{io, CloudHeader, Timestamp};
//!
//! let text = "# scan\n0 0 0\n1 0 0.5 0.8\n";
//! let cloud = io::read_xyz(text.as_bytes(), CloudHeader::new(Timestamp::zero(), "lidar")).unwrap();
//! assert_eq!(cloud.len(), 2);
//! assert_eq!(cloud.points[1].intensity, Some(0.8));
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::{CloudHeader, CloudPoint, PointCloud, PointColor, SensorError};

/// Extensions accepted by [`load_xyz`] and [`save_xyz`].
pub const XYZ_EXTENSIONS: [&str; 3] = ["xyz", "txt", "pts"];

/// Returns true if the path has an XYZ-style extension.
#[must_use]
pub fn is_xyz_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| XYZ_EXTENSIONS.iter().any(|x| x.eq_ignore_ascii_case(e)))
}

/// Reads an XYZ point file.
///
/// # Errors
///
/// Returns an error if the file cannot be opened, has an unsupported
/// extension, or contains a malformed line.
pub fn load_xyz(path: impl AsRef<Path>, header: CloudHeader) -> Result<PointCloud, SensorError> {
    let path = path.as_ref();
    check_extension(path)?;
    let file = File::open(path)?;
    read_xyz(BufReader::new(file), header)
}

/// Writes a cloud as an XYZ point file.
///
/// # Errors
///
/// Returns an error if the extension is unsupported or the file cannot be
/// written.
pub fn save_xyz(cloud: &PointCloud, path: impl AsRef<Path>) -> Result<(), SensorError> {
    let path = path.as_ref();
    check_extension(path)?;
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_xyz(cloud, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Parses XYZ text from any buffered reader.
///
/// # Errors
///
/// Returns [`SensorError::Parse`] for a line with the wrong number of
/// columns or a value that does not parse, and [`SensorError::Io`] for read
/// failures.
pub fn read_xyz(reader: impl BufRead, header: CloudHeader) -> Result<PointCloud, SensorError> {
    let mut cloud = PointCloud::new(header);

    for (line_idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            continue;
        }
        cloud.push(parse_line(line, line_idx + 1)?);
    }

    Ok(cloud)
}

/// Writes a cloud as XYZ text.
///
/// Intensity and color columns are written only when every point has them,
/// so the output always parses back with a consistent column count.
///
/// # Errors
///
/// Returns [`SensorError::Io`] if writing fails.
pub fn write_xyz(cloud: &PointCloud, mut writer: impl Write) -> Result<(), SensorError> {
    let all_intensity = !cloud.is_empty() && cloud.points.iter().all(|p| p.intensity.is_some());
    let all_color = !cloud.is_empty() && cloud.points.iter().all(|p| p.color.is_some());

    writeln!(writer, "# frame: {} stamp: {}", cloud.frame(), cloud.stamp())?;
    for point in &cloud.points {
        let p = &point.position;
        write!(writer, "{} {} {}", p.x, p.y, p.z)?;
        if all_intensity {
            if let Some(i) = point.intensity {
                write!(writer, " {i}")?;
            }
        }
        if all_color {
            if let Some(c) = point.color {
                write!(writer, " {} {} {}", c.r, c.g, c.b)?;
            }
        }
        writeln!(writer)?;
    }
    Ok(())
}

fn check_extension(path: &Path) -> Result<(), SensorError> {
    if is_xyz_path(path) {
        Ok(())
    } else {
        Err(SensorError::UnsupportedFormat(
            path.extension()
                .and_then(|e| e.to_str())
                .unwrap_or("none")
                .to_string(),
        ))
    }
}

fn parse_line(line: &str, line_no: usize) -> Result<CloudPoint, SensorError> {
    let parts: Vec<&str> = line.split_whitespace().collect();

    let float = |i: usize| -> Result<f64, SensorError> {
        parts[i]
            .parse::<f64>()
            .map_err(|_| SensorError::parse(line_no, format!("invalid number '{}'", parts[i])))
    };
    let channel = |i: usize| -> Result<u8, SensorError> {
        parts[i]
            .parse::<u8>()
            .map_err(|_| SensorError::parse(line_no, format!("invalid color channel '{}'", parts[i])))
    };

    let (has_intensity, color_start) = match parts.len() {
        3 => (false, None),
        4 => (true, None),
        6 => (false, Some(3)),
        7 => (true, Some(4)),
        n => {
            return Err(SensorError::parse(
                line_no,
                format!("expected 3, 4, 6 or 7 columns, found {n}"),
            ));
        }
    };

    let mut point = CloudPoint::from_coords(float(0)?, float(1)?, float(2)?);
    if has_intensity {
        #[allow(clippy::cast_possible_truncation)]
        let intensity = float(3)? as f32;
        point.intensity = Some(intensity);
    }
    if let Some(start) = color_start {
        point.color = Some(PointColor::new(
            channel(start)?,
            channel(start + 1)?,
            channel(start + 2)?,
        ));
    }
    Ok(point)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::Timestamp;
    use approx::assert_relative_eq;
    use tempfile::tempdir;

    fn header() -> CloudHeader {
        CloudHeader::new(Timestamp::from_nanos(5), "lidar")
    }

    #[test]
    fn extension_detection() {
        assert!(is_xyz_path(Path::new("scan.xyz")));
        assert!(is_xyz_path(Path::new("scan.PTS")));
        assert!(!is_xyz_path(Path::new("scan.ply")));
        assert!(!is_xyz_path(Path::new("scan")));
    }

    #[test]
    fn read_column_layouts() {
        let text = "0 0 0\n1 2 3 0.5\n4 5 6 255 0 10\n7 8 9 0.25 1 2 3\n";
        let cloud = read_xyz(text.as_bytes(), header()).unwrap();
        assert_eq!(cloud.len(), 4);
        assert_eq!(cloud.points[0].intensity, None);
        assert_eq!(cloud.points[1].intensity, Some(0.5));
        assert_eq!(cloud.points[2].color, Some(PointColor::new(255, 0, 10)));
        assert_eq!(cloud.points[3].intensity, Some(0.25));
        assert_eq!(cloud.points[3].color, Some(PointColor::new(1, 2, 3)));
        assert_eq!(cloud.header, header());
    }

    #[test]
    fn read_skips_comments() {
        let text = "# comment\n// other\n\n1 1 1\n";
        let cloud = read_xyz(text.as_bytes(), header()).unwrap();
        assert_eq!(cloud.len(), 1);
    }

    #[test]
    fn read_rejects_bad_lines() {
        let err = read_xyz("1 2\n".as_bytes(), header()).unwrap_err();
        assert!(matches!(err, SensorError::Parse { line: 1, .. }));

        let err = read_xyz("0 0 0\n1 x 2\n".as_bytes(), header()).unwrap_err();
        assert!(matches!(err, SensorError::Parse { line: 2, .. }));

        let err = read_xyz("1 2 3 300 0 0\n".as_bytes(), header()).unwrap_err();
        assert!(matches!(err, SensorError::Parse { .. }));
    }

    #[test]
    fn file_roundtrip_with_attributes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("frame.xyz");

        let mut cloud = PointCloud::new(header());
        cloud.push(
            CloudPoint::from_coords(0.5, -1.25, 2.0)
                .with_intensity(0.75)
                .with_color(PointColor::new(9, 8, 7)),
        );
        cloud.push(
            CloudPoint::from_coords(3.0, 4.0, 5.0)
                .with_intensity(0.5)
                .with_color(PointColor::new(1, 1, 1)),
        );
        save_xyz(&cloud, &path).unwrap();

        let loaded = load_xyz(&path, header()).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_relative_eq!(loaded.points[0].position.y, -1.25);
        assert_eq!(loaded.points[0].intensity, Some(0.75));
        assert_eq!(loaded.points[1].color, Some(PointColor::new(1, 1, 1)));
    }

    #[test]
    fn mixed_attributes_are_dropped_on_write() {
        let mut cloud = PointCloud::new(header());
        cloud.push(CloudPoint::from_coords(0.0, 0.0, 0.0).with_intensity(1.0));
        cloud.push(CloudPoint::from_coords(1.0, 0.0, 0.0));

        let mut buf = Vec::new();
        write_xyz(&cloud, &mut buf).unwrap();
        let loaded = read_xyz(buf.as_slice(), header()).unwrap();
        assert!(loaded.points.iter().all(|p| p.intensity.is_none()));
    }

    #[test]
    fn empty_cloud_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.xyz");
        save_xyz(&PointCloud::new(header()), &path).unwrap();
        assert!(load_xyz(&path, header()).unwrap().is_empty());
    }

    #[test]
    fn unsupported_extension() {
        let err = load_xyz("frame.ply", header()).unwrap_err();
        assert!(matches!(err, SensorError::UnsupportedFormat(ref e) if e == "ply"));
    }

    #[test]
    fn missing_file() {
        let err = load_xyz("does-not-exist.xyz", header()).unwrap_err();
        assert!(matches!(err, SensorError::Io(_)));
    }
}
