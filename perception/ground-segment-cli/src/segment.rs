//! The `segment` command: runs the obstacle detector over recorded frames.
//!
//! Input files are read on a separate thread and queued in order. Each
//! frame is stamped from its position in the sequence and the frame rate;
//! results are written as `ground_<stamp>.xyz` and `obstacles_<stamp>.xyz`
//! with the stamp in nanoseconds.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, bail, Context, Result};
use ground_segment::{cloud_channel, DetectorStats, FnSink, ObstacleDetector, SegmentationConfig};
use sensor_fusion::{RigidTransform, StampedTransform, StaticTransformProvider};
use sensor_types::{io, CloudHeader, PointCloud, Timestamp};
use tracing::{debug, error, info, warn};

/// What to segment and where the results go.
#[derive(Debug, Clone)]
pub struct SegmentOptions {
    /// XYZ files, or directories searched (non-recursively) for them.
    pub inputs: Vec<PathBuf>,
    /// Directory receiving the output files.
    pub out_dir: PathBuf,
    /// Frame the input points are expressed in.
    pub source_frame: String,
    /// Pose of the source frame in the robot frame.
    pub transform: RigidTransform,
    /// Frames per second used to stamp the inputs.
    pub rate_hz: f64,
}

/// Expands directories into their XYZ files, sorted by name.
pub fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(input)
                .with_context(|| format!("reading directory {}", input.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && io::is_xyz_path(p))
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }
    if files.is_empty() {
        bail!("no XYZ input files found");
    }
    Ok(files)
}

fn frame_stamp(index: usize, rate_hz: f64) -> Timestamp {
    #[allow(clippy::cast_precision_loss)]
    Timestamp::from_secs_f64((index + 1) as f64 / rate_hz)
}

fn file_sink(dir: PathBuf, kind: &'static str) -> FnSink<impl FnMut(PointCloud) + Send> {
    FnSink::new(move |cloud: PointCloud| {
        let path = dir.join(format!("{kind}_{:020}.xyz", cloud.stamp().as_nanos()));
        match io::save_xyz(&cloud, &path) {
            Ok(()) => debug!("wrote {} points to {}", cloud.len(), path.display()),
            Err(err) => error!("could not write {}: {}", path.display(), err),
        }
    })
}

/// Segments every input frame and writes the two result clouds per frame.
pub fn run(config: SegmentationConfig, options: &SegmentOptions) -> Result<DetectorStats> {
    if !(options.rate_hz.is_finite() && options.rate_hz > 0.0) {
        bail!("frame rate must be positive, got {}", options.rate_hz);
    }
    let files = collect_inputs(&options.inputs)?;
    std::fs::create_dir_all(&options.out_dir)
        .with_context(|| format!("creating output directory {}", options.out_dir.display()))?;

    let provider = StaticTransformProvider::new(StampedTransform::new(
        config.frame_id.as_str(),
        options.source_frame.as_str(),
        Timestamp::zero(),
        options.transform,
    ));
    let mut detector = ObstacleDetector::new(config, Arc::new(provider))?
        .with_ground_sink(file_sink(options.out_dir.clone(), "ground"))
        .with_obstacle_sink(file_sink(options.out_dir.clone(), "obstacles"));

    info!("segmenting {} files into {}", files.len(), options.out_dir.display());

    let (sender, receiver) = cloud_channel(detector.queue_size());
    let source_frame = options.source_frame.clone();
    let rate_hz = options.rate_hz;
    let reader = thread::spawn(move || {
        for (index, path) in files.iter().enumerate() {
            let header = CloudHeader::new(frame_stamp(index, rate_hz), source_frame.as_str());
            match io::load_xyz(path, header) {
                Ok(cloud) => {
                    info!("{} -> stamp {} ({} points)", path.display(), cloud.stamp().as_nanos(), cloud.len());
                    if sender.send(cloud).is_err() {
                        break;
                    }
                }
                Err(err) => warn!("skipping {}: {}", path.display(), err),
            }
        }
    });

    let stats = detector.run(&receiver);
    reader.join().map_err(|_| anyhow!("input reader thread panicked"))?;
    Ok(stats)
}

/// Loads a configuration file, or the defaults when none is given.
pub fn load_config(path: Option<&Path>) -> Result<SegmentationConfig> {
    match path {
        Some(path) => {
            SegmentationConfig::load(path).with_context(|| format!("loading configuration {}", path.display()))
        }
        None => Ok(SegmentationConfig::default()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn write_frame(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn stamps_start_after_zero() {
        assert_eq!(frame_stamp(0, 10.0), Timestamp::from_nanos(100_000_000));
        assert_eq!(frame_stamp(9, 10.0), Timestamp::from_nanos(1_000_000_000));
    }

    #[test]
    fn directories_are_expanded_in_order() {
        let dir = tempfile::tempdir().unwrap();
        write_frame(dir.path(), "b.xyz", "0 0 0\n");
        write_frame(dir.path(), "a.xyz", "0 0 0\n");
        write_frame(dir.path(), "notes.md", "not a cloud\n");

        let files = collect_inputs(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<_> = files.iter().map(|p| p.file_name().unwrap().to_owned()).collect();
        assert_eq!(names, vec!["a.xyz", "b.xyz"]);
    }

    #[test]
    fn empty_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(collect_inputs(&[dir.path().to_path_buf()]).is_err());
    }

    #[test]
    fn segments_files_to_output_directory() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        // camera 0.5 above the robot origin: -0.8 -> -0.3 ground, 0.2 -> 0.7 obstacle
        write_frame(input.path(), "000.xyz", "1 0 -0.8\n1 0 0.2\n");
        write_frame(input.path(), "001.xyz", "broken line\n");

        let options = SegmentOptions {
            inputs: vec![input.path().to_path_buf()],
            out_dir: out.path().to_path_buf(),
            source_frame: "camera".to_string(),
            transform: RigidTransform::from_translation(Vector3::new(0.0, 0.0, 0.5)),
            rate_hz: 10.0,
        };
        let stats = run(SegmentationConfig::simple(), &options).unwrap();
        assert_eq!(stats.published, 1);

        let header = CloudHeader::new(Timestamp::zero(), "base_link");
        let ground = io::load_xyz(out.path().join("ground_00000000000100000000.xyz"), header.clone()).unwrap();
        let obstacles = io::load_xyz(out.path().join("obstacles_00000000000100000000.xyz"), header).unwrap();
        assert_eq!(ground.len(), 1);
        assert!((ground.points[0].position.z + 0.3).abs() < 1e-9);
        assert_eq!(obstacles.len(), 1);
        assert!((obstacles.points[0].position.z - 0.7).abs() < 1e-9);
    }

    #[test]
    fn missing_config_file() {
        assert!(load_config(Some(Path::new("/nonexistent/segment.json"))).is_err());
        assert!(load_config(None).is_ok());
    }
}
