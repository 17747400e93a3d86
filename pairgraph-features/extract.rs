use std::path::{Path, PathBuf};

use image::RgbImage;
use pairgraph_core::{
    normalize_angle_degrees, FeatureSet, ProgressSink, Viewport, ViewportList,
};
use rayon::prelude::*;

use crate::detector::Detector;
use crate::error::{FeatureError, FeatureResult};
use crate::keyfile::write_key_file;

/// Feature extraction phase: one independent task per catalog image,
/// executed on the Rayon pool. Results land in catalog order regardless
/// of completion order. Any unreadable image aborts the whole phase.
pub struct ExtractionStage<'a, D: Detector> {
    detector: &'a D,
    key_dir: Option<&'a Path>,
}

impl<'a, D: Detector> ExtractionStage<'a, D> {
    pub fn new(detector: &'a D) -> Self {
        Self {
            detector,
            key_dir: None,
        }
    }

    /// Persist a `<image file name>.key` file per image into `dir`.
    pub fn with_key_dir(mut self, dir: &'a Path) -> Self {
        self.key_dir = Some(dir);
        self
    }

    pub fn run(
        &self,
        images: &[PathBuf],
        progress: &dyn ProgressSink,
    ) -> FeatureResult<ViewportList> {
        images
            .par_iter()
            .map(|path| {
                let viewport = self.extract_one(path);
                progress.advance();
                viewport
            })
            .collect()
    }

    fn extract_one(&self, path: &Path) -> FeatureResult<Viewport> {
        let reader = image::ImageReader::open(path).map_err(|source| FeatureError::ImageRead {
            path: path.to_path_buf(),
            source: image::ImageError::IoError(source),
        })?;
        let decoded = reader.decode().map_err(|source| FeatureError::ImageRead {
            path: path.to_path_buf(),
            source,
        })?;
        let gray = decoded.to_luma8();
        let rgb = decoded.into_rgb8();

        let (mut keypoints, descriptors) = self.detector.detect_and_compute(&gray);
        debug_assert_eq!(keypoints.len(), descriptors.rows());
        log::debug!("{}: {} features", path.display(), keypoints.len());
        for kp in keypoints.iter_mut() {
            kp.angle = normalize_angle_degrees(kp.angle);
        }

        let features = FeatureSet {
            positions: keypoints.iter().map(|kp| [kp.x, kp.y]).collect(),
            colors: keypoints.iter().map(|kp| sample_color(&rgb, kp.x, kp.y)).collect(),
        };

        if let Some(dir) = self.key_dir {
            let mut name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image".to_owned());
            name.push_str(".key");
            write_key_file(&dir.join(name), &keypoints, &descriptors)?;
        }

        Ok(Viewport {
            keypoints,
            descriptors,
            features,
            camera: None,
        })
    }
}

fn sample_color(rgb: &RgbImage, x: f32, y: f32) -> [u8; 3] {
    let (w, h) = rgb.dimensions();
    let px = (x.round() as u32).min(w.saturating_sub(1));
    let py = (y.round() as u32).min(h.saturating_sub(1));
    rgb.get_pixel(px, py).0
}
