pub mod progress;

pub use progress::{LogProgress, NullProgress, ProgressSink, Stopwatch};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Fixed descriptor width of the reference detector (6x20 + 8 key-file layout).
pub const DESCRIPTOR_WIDTH: usize = 128;

/// Detected feature: subpixel position, response strength and
/// orientation angle in radians, normalized to (-pi, pi].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub response: f32,
    pub angle: f32,
}

/// Row-major matrix of per-feature descriptors. Row `i` describes
/// keypoint `i`; every row is `DESCRIPTOR_WIDTH` values wide.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescriptorMatrix {
    data: Vec<f32>,
    rows: usize,
}

impl DescriptorMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw row-major data; `data.len()` must be a multiple
    /// of `DESCRIPTOR_WIDTH`.
    pub fn from_raw(data: Vec<f32>) -> Self {
        assert!(data.len() % DESCRIPTOR_WIDTH == 0);
        let rows = data.len() / DESCRIPTOR_WIDTH;
        Self { data, rows }
    }

    pub fn push_row(&mut self, row: &[f32]) {
        assert_eq!(row.len(), DESCRIPTOR_WIDTH);
        self.data.extend_from_slice(row);
        self.rows += 1;
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * DESCRIPTOR_WIDTH..(i + 1) * DESCRIPTOR_WIDTH]
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }
}

/// Per-viewport feature data carried through the prebundle checkpoint:
/// keypoint image positions and the color sampled under each keypoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureSet {
    pub positions: Vec<[f32; 2]>,
    pub colors: Vec<[u8; 3]>,
}

/// Camera parameters filled in by later reconstruction stages. Kept as a
/// placeholder so a viewport list survives a checkpoint round trip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraInfo {
    pub focal_length: f32,
    pub distortion: [f32; 2],
    pub rotation: [f32; 9],
    pub translation: [f32; 3],
}

impl Default for CameraInfo {
    fn default() -> Self {
        Self {
            focal_length: 0.0,
            distortion: [0.0; 2],
            rotation: [0.0; 9],
            translation: [0.0; 3],
        }
    }
}

/// Per-image container: detected keypoints, their descriptors, the
/// checkpointed feature set, and the camera pose placeholder.
///
/// Invariant: `descriptors.rows() == keypoints.len()`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Viewport {
    pub keypoints: Vec<Keypoint>,
    pub descriptors: DescriptorMatrix,
    pub features: FeatureSet,
    pub camera: Option<CameraInfo>,
}

pub type ViewportList = Vec<Viewport>;

/// Index pair linking a feature in the first view (query) to a feature
/// in the second view (train).
pub type CorrespondenceIndex = (u32, u32);

/// Surviving correspondences between one unordered image pair.
/// By convention `view_1_id < view_2_id`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TwoViewMatching {
    pub view_1_id: u32,
    pub view_2_id: u32,
    pub matches: Vec<CorrespondenceIndex>,
}

/// All retained two-view records, in pair-scheduler order
/// (ascending `i`, then ascending `j`).
pub type PairwiseMatching = Vec<TwoViewMatching>;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PipelineConfig {
    /// Detector response threshold (minHessian-equivalent).
    pub detector_threshold: f32,
    /// Lowe ratio: keep a candidate iff best < ratio * second_best.
    pub ratio_threshold: f32,
    /// Minimum surviving correspondences for a pair to be retained.
    pub min_pair_matches: usize,
    pub n_threads: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            detector_threshold: 400.0,
            ratio_threshold: 0.7,
            min_pair_matches: 16,
            n_threads: num_cpus::get().max(1),
        }
    }
}

/// Wrap a detector-reported angle in degrees into radians in (-pi, pi].
pub fn normalize_angle_degrees(degrees: f32) -> f32 {
    let mut radians = degrees.to_radians();
    if radians > std::f32::consts::PI {
        radians -= 2.0 * std::f32::consts::PI;
    }
    radians
}

/// Initialize the global Rayon thread pool with the specified number of threads
pub fn init_thread_pool(n_threads: usize) -> Result<(), rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build_global()
}
