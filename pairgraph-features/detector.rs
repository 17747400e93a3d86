use image::GrayImage;
use pairgraph_core::{DescriptorMatrix, Keypoint, DESCRIPTOR_WIDTH};

/// Detector capability consumed by the extraction stage.
///
/// Implementations report `Keypoint::angle` in degrees, as detectors
/// conventionally do; the extraction stage normalizes angles to radians
/// in (-pi, pi]. The returned matrix must have one row per keypoint.
pub trait Detector: Sync {
    fn detect_and_compute(&self, image: &GrayImage) -> (Vec<Keypoint>, DescriptorMatrix);
}

/// Baseline implementation of the detector contract.
///
/// Uses a determinant-of-Hessian response with 3x3 non-maximum
/// suppression and a polar pixel-sampling descriptor. It is not meant to
/// compete with SIFT-class detectors; it exists so the pipeline runs
/// without an external one plugged in.
pub struct HessianPatchDetector {
    threshold: f32,
}

/// Descriptor sampling pattern: 8 rings of 16 samples each.
const RING_COUNT: usize = 8;
const RING_SAMPLES: usize = 16;
const RING_SPACING: f32 = 1.5;

/// Border inside which no keypoint is reported, wide enough for the
/// outermost descriptor ring plus bilinear interpolation.
const PATCH_MARGIN: u32 = 14;

impl HessianPatchDetector {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    fn hessian_response(image: &GrayImage, x: u32, y: u32) -> f32 {
        let v = |dx: i32, dy: i32| -> f32 {
            image.get_pixel((x as i32 + dx) as u32, (y as i32 + dy) as u32)[0] as f32
        };
        let dxx = v(-1, 0) - 2.0 * v(0, 0) + v(1, 0);
        let dyy = v(0, -1) - 2.0 * v(0, 0) + v(0, 1);
        let dxy = (v(1, 1) - v(-1, 1) - v(1, -1) + v(-1, -1)) / 4.0;
        dxx * dyy - dxy * dxy
    }

    fn orientation_degrees(image: &GrayImage, x: u32, y: u32) -> f32 {
        let v = |dx: i32, dy: i32| -> f32 {
            image.get_pixel((x as i32 + dx) as u32, (y as i32 + dy) as u32)[0] as f32
        };
        let gx = v(1, 0) - v(-1, 0);
        let gy = v(0, 1) - v(0, -1);
        gy.atan2(gx).to_degrees()
    }

    fn sample_bilinear(image: &GrayImage, x: f32, y: f32) -> f32 {
        let x0 = x.floor() as u32;
        let y0 = y.floor() as u32;
        let fx = x - x0 as f32;
        let fy = y - y0 as f32;
        let p = |px: u32, py: u32| image.get_pixel(px, py)[0] as f32;
        let top = p(x0, y0) * (1.0 - fx) + p(x0 + 1, y0) * fx;
        let bottom = p(x0, y0 + 1) * (1.0 - fx) + p(x0 + 1, y0 + 1) * fx;
        top * (1.0 - fy) + bottom * fy
    }

    fn describe(image: &GrayImage, x: f32, y: f32) -> [f32; DESCRIPTOR_WIDTH] {
        let mut samples = [0.0f32; DESCRIPTOR_WIDTH];
        let mut idx = 0;
        for ring in 0..RING_COUNT {
            let radius = RING_SPACING * (ring + 1) as f32;
            for step in 0..RING_SAMPLES {
                let theta = std::f32::consts::TAU * step as f32 / RING_SAMPLES as f32;
                let sx = x + radius * theta.cos();
                let sy = y + radius * theta.sin();
                samples[idx] = Self::sample_bilinear(image, sx, sy);
                idx += 1;
            }
        }

        // Normalize against local brightness/contrast, then map into the
        // 0..255 range the key-file encoding expects.
        let mean = samples.iter().sum::<f32>() / DESCRIPTOR_WIDTH as f32;
        let var = samples.iter().map(|s| (s - mean) * (s - mean)).sum::<f32>()
            / DESCRIPTOR_WIDTH as f32;
        let sigma = var.sqrt().max(1.0);
        for s in samples.iter_mut() {
            *s = (128.0 + 48.0 * (*s - mean) / sigma).clamp(0.0, 255.0);
        }
        samples
    }
}

impl Detector for HessianPatchDetector {
    fn detect_and_compute(&self, image: &GrayImage) -> (Vec<Keypoint>, DescriptorMatrix) {
        let (width, height) = image.dimensions();
        let mut keypoints = Vec::new();
        let mut descriptors = DescriptorMatrix::new();
        if width <= 2 * PATCH_MARGIN || height <= 2 * PATCH_MARGIN {
            return (keypoints, descriptors);
        }

        let response_at = |x: u32, y: u32| Self::hessian_response(image, x, y);

        for y in PATCH_MARGIN..height - PATCH_MARGIN {
            for x in PATCH_MARGIN..width - PATCH_MARGIN {
                let response = response_at(x, y);
                if response <= self.threshold {
                    continue;
                }
                // 3x3 local maximum, ties broken toward the first pixel
                // in scan order so detection stays deterministic.
                let mut is_max = true;
                'nms: for dy in -1i32..=1 {
                    for dx in -1i32..=1 {
                        if dx == 0 && dy == 0 {
                            continue;
                        }
                        let nx = (x as i32 + dx) as u32;
                        let ny = (y as i32 + dy) as u32;
                        let neighbor = response_at(nx, ny);
                        let earlier = dy < 0 || (dy == 0 && dx < 0);
                        if neighbor > response || (earlier && neighbor == response) {
                            is_max = false;
                            break 'nms;
                        }
                    }
                }
                if !is_max {
                    continue;
                }

                keypoints.push(Keypoint {
                    x: x as f32,
                    y: y as f32,
                    response,
                    angle: Self::orientation_degrees(image, x, y),
                });
                descriptors.push_row(&Self::describe(image, x as f32, y as f32));
            }
        }

        (keypoints, descriptors)
    }
}
