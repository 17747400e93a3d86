use std::io;
use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_circle_mut;
use pairgraph_core::{LogProgress, PipelineConfig, Stopwatch, Viewport};
use pairgraph_features::{scan_images, ExtractionStage, FeatureError, HessianPatchDetector};
use pairgraph_match::{match_all_pairs, pair_tasks, write_matches_file, BruteForceMatcher, MatchError};
use pairgraph_prebundle::{
    load_bundle_file, load_prebundle_file, save_prebundle_file, Bundle, BundleError, BundleFormat,
    PrebundleError,
};

#[derive(Debug)]
pub enum CliError {
    Feature(FeatureError),
    Match(MatchError),
    Prebundle(PrebundleError),
    Bundle(BundleError),
    ThreadPool(rayon::ThreadPoolBuildError),
    Config { path: PathBuf, message: String },
    Draw { path: PathBuf, source: image::ImageError },
    Io(io::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Feature(e) => write!(f, "{}", e),
            CliError::Match(e) => write!(f, "{}", e),
            CliError::Prebundle(e) => write!(f, "{}", e),
            CliError::Bundle(e) => write!(f, "{}", e),
            CliError::ThreadPool(e) => write!(f, "thread pool error: {}", e),
            CliError::Config { path, message } => {
                write!(f, "bad config file {}: {}", path.display(), message)
            }
            CliError::Draw { path, source } => {
                write!(f, "can not write overlay {}: {}", path.display(), source)
            }
            CliError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for CliError {}

impl From<FeatureError> for CliError {
    fn from(err: FeatureError) -> Self {
        CliError::Feature(err)
    }
}

impl From<MatchError> for CliError {
    fn from(err: MatchError) -> Self {
        CliError::Match(err)
    }
}

impl From<PrebundleError> for CliError {
    fn from(err: PrebundleError) -> Self {
        CliError::Prebundle(err)
    }
}

impl From<BundleError> for CliError {
    fn from(err: BundleError) -> Self {
        CliError::Bundle(err)
    }
}

impl From<rayon::ThreadPoolBuildError> for CliError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        CliError::ThreadPool(err)
    }
}

impl From<io::Error> for CliError {
    fn from(err: io::Error) -> Self {
        CliError::Io(err)
    }
}

pub type CliResult<T> = Result<T, CliError>;

/// Everything FeatureDetect needs. One pipeline code path: `output` is
/// always the matches file; key-file persistence, prebundle
/// checkpointing and overlay rendering are independent opt-ins.
#[derive(Debug, Clone)]
pub struct FeatureDetectParams {
    pub image_directory: PathBuf,
    pub output: PathBuf,
    pub key_dir: Option<PathBuf>,
    pub prebundle: Option<PathBuf>,
    pub draw_dir: Option<PathBuf>,
    pub config: PipelineConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureDetectReport {
    pub image_count: usize,
    pub pair_task_count: usize,
    pub retained_pairs: usize,
    pub total_matches: usize,
}

/// Run the full pipeline: catalog, parallel extraction, parallel
/// all-pairs matching, filtered matches output.
pub fn run_feature_detect(params: &FeatureDetectParams) -> CliResult<FeatureDetectReport> {
    let cfg = &params.config;
    let images = scan_images(&params.image_directory)?;
    log::info!("found {} images in {}", images.len(), params.image_directory.display());

    let detector = HessianPatchDetector::new(cfg.detector_threshold);
    let mut extraction = ExtractionStage::new(&detector);
    if let Some(dir) = &params.key_dir {
        extraction = extraction.with_key_dir(dir);
    }

    let progress = LogProgress::new("feature detect", images.len());
    let sw = Stopwatch::start();
    let viewports = extraction.run(&images, &progress)?;
    log::info!("feature detect: time used {}s", sw.elapsed().as_secs());

    if let Some(dir) = &params.draw_dir {
        draw_keypoint_overlays(&images, &viewports, dir)?;
    }

    let task_count = pair_tasks(viewports.len()).len();
    let progress = LogProgress::new("feature matching", task_count);
    let sw = Stopwatch::start();
    let matching = match_all_pairs(&viewports, &BruteForceMatcher::new(), cfg, &progress);
    log::info!("feature matching: time used {}s", sw.elapsed().as_secs());

    write_matches_file(&params.output, &matching)?;
    if let Some(path) = &params.prebundle {
        save_prebundle_file(path, &viewports, &matching)?;
        log::info!("saved prebundle checkpoint to {}", path.display());
    }

    Ok(FeatureDetectReport {
        image_count: images.len(),
        pair_task_count: task_count,
        retained_pairs: matching.len(),
        total_matches: matching.iter().map(|r| r.matches.len()).sum(),
    })
}

/// Load a `PipelineConfig` from a TOML or JSON file (chosen by
/// extension) and sanity-check it.
pub fn load_config(path: &Path) -> CliResult<PipelineConfig> {
    let config_err = |message: String| CliError::Config {
        path: path.to_path_buf(),
        message,
    };
    let text = std::fs::read_to_string(path)?;
    let cfg: PipelineConfig = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&text).map_err(|e| config_err(e.to_string()))?,
        _ => toml::from_str(&text).map_err(|e| config_err(e.to_string()))?,
    };
    if !(0.0..=1.0).contains(&cfg.ratio_threshold) {
        return Err(config_err(format!(
            "ratio_threshold {} outside (0, 1]",
            cfg.ratio_threshold
        )));
    }
    if cfg.n_threads == 0 {
        return Err(config_err("n_threads must be at least 1".into()));
    }
    Ok(cfg)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrebundleStats {
    pub viewport_count: usize,
    pub feature_count: usize,
    pub pair_count: usize,
    pub match_count: usize,
}

pub fn prebundle_info(path: &Path) -> CliResult<PrebundleStats> {
    let (viewports, matching) = load_prebundle_file(path)?;
    Ok(PrebundleStats {
        viewport_count: viewports.len(),
        feature_count: viewports.iter().map(|vp| vp.features.positions.len()).sum(),
        pair_count: matching.len(),
        match_count: matching.iter().map(|r| r.matches.len()).sum(),
    })
}

pub fn import_bundle(path: &Path, format: BundleFormat) -> CliResult<Bundle> {
    Ok(load_bundle_file(path, format)?)
}

/// Write a `<image name>.png` per image with a hollow circle on every
/// detected keypoint.
fn draw_keypoint_overlays(
    images: &[PathBuf],
    viewports: &[Viewport],
    dir: &Path,
) -> CliResult<()> {
    for (path, viewport) in images.iter().zip(viewports) {
        let decoded = image::ImageReader::open(path)
            .map_err(|e| CliError::Feature(FeatureError::ImageRead {
                path: path.to_path_buf(),
                source: image::ImageError::IoError(e),
            }))?
            .decode()
            .map_err(|source| CliError::Feature(FeatureError::ImageRead {
                path: path.to_path_buf(),
                source,
            }))?;
        let mut output: RgbaImage = decoded.into_rgba8();
        for kp in &viewport.keypoints {
            draw_hollow_circle_mut(
                &mut output,
                (kp.x as i32, kp.y as i32),
                3,
                Rgba([255, 0, 0, 255]),
            );
        }
        let name = path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_owned());
        let out_path = dir.join(format!("{}.png", name));
        output.save(&out_path).map_err(|source| CliError::Draw {
            path: out_path.clone(),
            source,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pairgraph_match::read_matches_file;

    /// Three synthetic views: 0 and 1 see the same texture, 2 is blank.
    fn create_scene_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let mut textured = image::GrayImage::from_pixel(96, 96, image::Luma([60]));
        // Bright rectangles of six distinct shapes, so descriptors differ
        // structurally and the ratio test has clear winners
        for blob in 0..6u32 {
            let cx = 20 + (blob % 3) * 22;
            let cy = 24 + (blob / 3) * 30;
            let w = 2 + blob % 3;
            let h = 2 + blob / 3;
            for dy in 0..h {
                for dx in 0..w {
                    textured.put_pixel(cx + dx, cy + dy, image::Luma([235]));
                }
            }
        }
        textured.save(dir.path().join("a.png")).unwrap();
        textured.save(dir.path().join("b.png")).unwrap();
        image::GrayImage::from_pixel(96, 96, image::Luma([60]))
            .save(dir.path().join("c.png"))
            .unwrap();
        dir
    }

    fn create_params(scene: &Path, out_dir: &Path) -> FeatureDetectParams {
        FeatureDetectParams {
            image_directory: scene.to_path_buf(),
            output: out_dir.join("matches.txt"),
            key_dir: None,
            prebundle: None,
            draw_dir: None,
            config: PipelineConfig {
                n_threads: 1,
                min_pair_matches: 4,
                ..PipelineConfig::default()
            },
        }
    }

    #[test]
    fn test_end_to_end_identical_views_match() {
        let scene = create_scene_dir();
        let out = tempfile::tempdir().unwrap();
        let params = create_params(scene.path(), out.path());
        let report = run_feature_detect(&params).unwrap();

        assert_eq!(report.image_count, 3);
        assert_eq!(report.pair_task_count, 3);
        // Only the a-b pair shares texture; blank c matches nothing
        assert_eq!(report.retained_pairs, 1);

        let matching = read_matches_file(&params.output).unwrap();
        assert_eq!(matching.len(), 1);
        assert_eq!((matching[0].view_1_id, matching[0].view_2_id), (0, 1));
        assert!(matching[0].matches.len() >= 4);
        // Identical images match feature-for-feature
        for &(q, t) in &matching[0].matches {
            assert_eq!(q, t);
        }
    }

    #[test]
    fn test_rerun_is_byte_identical() {
        let scene = create_scene_dir();
        let out = tempfile::tempdir().unwrap();
        let params = create_params(scene.path(), out.path());
        run_feature_detect(&params).unwrap();
        let first = std::fs::read(&params.output).unwrap();
        run_feature_detect(&params).unwrap();
        let second = std::fs::read(&params.output).unwrap();
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn test_prebundle_checkpoint_round_trips() {
        let scene = create_scene_dir();
        let out = tempfile::tempdir().unwrap();
        let mut params = create_params(scene.path(), out.path());
        params.prebundle = Some(out.path().join("prebundle.sfm"));
        let report = run_feature_detect(&params).unwrap();

        let stats = prebundle_info(params.prebundle.as_ref().unwrap()).unwrap();
        assert_eq!(stats.viewport_count, 3);
        assert_eq!(stats.pair_count, report.retained_pairs);
        assert_eq!(stats.match_count, report.total_matches);
        assert!(stats.feature_count > 0);
    }

    #[test]
    fn test_missing_directory_fails_before_any_work() {
        let out = tempfile::tempdir().unwrap();
        let params = create_params(Path::new("/nonexistent/images"), out.path());
        let result = run_feature_detect(&params);
        assert!(matches!(
            result,
            Err(CliError::Feature(FeatureError::DirectoryNotFound(_)))
        ));
        assert!(!params.output.exists());
    }

    #[test]
    fn test_config_file_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pairgraph.toml");
        std::fs::write(
            &path,
            "detector_threshold = 250.0\nratio_threshold = 0.8\nmin_pair_matches = 8\nn_threads = 2\n",
        )
        .unwrap();
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.detector_threshold, 250.0);
        assert_eq!(cfg.ratio_threshold, 0.8);
        assert_eq!(cfg.min_pair_matches, 8);
        assert_eq!(cfg.n_threads, 2);
    }

    #[test]
    fn test_config_json_variant() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pairgraph.json");
        std::fs::write(
            &path,
            r#"{"detector_threshold": 300.0, "ratio_threshold": 0.7, "min_pair_matches": 16, "n_threads": 1}"#,
        )
        .unwrap();
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.detector_threshold, 300.0);
    }

    #[test]
    fn test_config_rejects_bad_ratio() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pairgraph.toml");
        std::fs::write(
            &path,
            "detector_threshold = 250.0\nratio_threshold = 1.5\nmin_pair_matches = 8\nn_threads = 2\n",
        )
        .unwrap();
        assert!(matches!(load_config(&path), Err(CliError::Config { .. })));
    }
}
