//! Importers for legacy photogrammetry bundle files (Photosynther and
//! Bundler text formats). A separate strategy per format tag; these
//! share nothing with the binary prebundle codec, and the defensive
//! camera/feature count bounds live here only.

use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use pairgraph_core::CameraInfo;

const MAX_CAMERAS: i64 = 10_000;
const MAX_FEATURES: i64 = 100_000_000;

/// Which legacy dialect to parse; selects the expected version line and
/// the per-reference field layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleFormat {
    Photosynther,
    Bundler,
}

impl BundleFormat {
    fn version_line(self) -> &'static str {
        match self {
            BundleFormat::Photosynther => "drews 1.0",
            BundleFormat::Bundler => "# Bundle file v0.3",
        }
    }

    fn name(self) -> &'static str {
        match self {
            BundleFormat::Photosynther => "Photosynther",
            BundleFormat::Bundler => "Bundler",
        }
    }
}

impl FromStr for BundleFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "photosynther" => Ok(BundleFormat::Photosynther),
            "bundler" => Ok(BundleFormat::Bundler),
            other => Err(format!(
                "unknown bundle format {:?} (expected photosynther or bundler)",
                other
            )),
        }
    }
}

#[derive(Debug)]
pub enum BundleError {
    FileOpen { path: std::path::PathBuf, source: io::Error },
    Io(io::Error),
    /// The version line does not match the selected format.
    BadSignature(String),
    /// Camera or feature counts outside plausible dataset sizes.
    SpuriousCounts { cameras: i64, features: i64 },
    InvalidRefCount { feature: usize, refs: i64 },
    UnexpectedEof,
    Parse(String),
}

impl std::fmt::Display for BundleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BundleError::FileOpen { path, source } => {
                write!(f, "can not open file {}: {}", path.display(), source)
            }
            BundleError::Io(e) => write!(f, "bundle I/O error: {}", e),
            BundleError::BadSignature(line) => {
                write!(f, "invalid bundle file signature: {}", line)
            }
            BundleError::SpuriousCounts { cameras, features } => {
                write!(f, "spurious amount of cameras or features: {} / {}", cameras, features)
            }
            BundleError::InvalidRefCount { feature, refs } => {
                write!(f, "invalid reference amount {} at feature {}", refs, feature)
            }
            BundleError::UnexpectedEof => write!(f, "unexpected EOF in bundle file"),
            BundleError::Parse(msg) => write!(f, "bundle file read error: {}", msg),
        }
    }
}

impl std::error::Error for BundleError {}

impl From<io::Error> for BundleError {
    fn from(err: io::Error) -> Self {
        BundleError::Io(err)
    }
}

pub type BundleResult<T> = Result<T, BundleError>;

/// One observation of a 3D feature in a view.
///
/// Photosynther carries a reprojection quality instead of an image
/// position; the position is filled with -1 there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRef {
    pub view_id: i32,
    pub feature_id: i32,
    pub pos: [f32; 2],
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature3D {
    pub pos: [f32; 3],
    /// Color normalized to 0..1.
    pub color: [f32; 3],
    pub refs: Vec<FeatureRef>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bundle {
    pub cameras: Vec<CameraInfo>,
    pub features: Vec<Feature3D>,
}

/// Whitespace token stream over a reader, mirroring `operator>>`-style
/// parsing the legacy formats were written for.
struct Tokens<R: BufRead> {
    input: R,
    buffer: Vec<String>,
    next: usize,
}

impl<R: BufRead> Tokens<R> {
    fn new(input: R) -> Self {
        Self {
            input,
            buffer: Vec::new(),
            next: 0,
        }
    }

    fn next_token(&mut self) -> BundleResult<Option<String>> {
        while self.next >= self.buffer.len() {
            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            self.buffer = line.split_whitespace().map(str::to_owned).collect();
            self.next = 0;
        }
        let token = self.buffer[self.next].clone();
        self.next += 1;
        Ok(Some(token))
    }

    fn next_f32(&mut self) -> BundleResult<f32> {
        let token = self.next_token()?.ok_or(BundleError::UnexpectedEof)?;
        token
            .parse()
            .map_err(|_| BundleError::Parse(format!("bad float {:?}", token)))
    }

    fn next_i64(&mut self) -> BundleResult<i64> {
        let token = self.next_token()?.ok_or(BundleError::UnexpectedEof)?;
        token
            .parse()
            .map_err(|_| BundleError::Parse(format!("bad integer {:?}", token)))
    }

}

/// Parse a legacy bundle stream in the given dialect.
pub fn load_bundle<R: Read>(input: R, format: BundleFormat) -> BundleResult<Bundle> {
    let mut reader = BufReader::new(input);

    let mut version_line = String::new();
    reader.read_line(&mut version_line)?;
    let version = version_line.trim_end_matches(['\n', '\r']);
    if version != format.version_line() {
        return Err(BundleError::BadSignature(version.to_owned()));
    }

    let mut tokens = Tokens::new(reader);
    let num_cameras = tokens.next_i64()?;
    let num_features = tokens.next_i64()?;
    if !(0..=MAX_CAMERAS).contains(&num_cameras) || !(0..=MAX_FEATURES).contains(&num_features) {
        return Err(BundleError::SpuriousCounts {
            cameras: num_cameras,
            features: num_features,
        });
    }

    log::info!(
        "reading {} file ({} cameras, {} features)",
        format.name(),
        num_cameras,
        num_features
    );

    let mut bundle = Bundle::default();
    bundle.cameras.reserve(num_cameras as usize);
    for _ in 0..num_cameras {
        let mut camera = CameraInfo {
            focal_length: tokens.next_f32()?,
            distortion: [tokens.next_f32()?, tokens.next_f32()?],
            ..CameraInfo::default()
        };
        for r in camera.rotation.iter_mut() {
            *r = tokens.next_f32()?;
        }
        for t in camera.translation.iter_mut() {
            *t = tokens.next_f32()?;
        }
        bundle.cameras.push(camera);
    }

    bundle.features.reserve(num_features as usize);
    for i in 0..num_features as usize {
        let feature = match read_feature(&mut tokens, format, i, num_cameras) {
            Ok(feature) => feature,
            // Datasets in the wild are sometimes cut short mid-feature;
            // the reference importer keeps what it has and stops.
            Err(BundleError::UnexpectedEof) => {
                log::warn!("unexpected EOF at feature {}, truncating", i);
                break;
            }
            Err(e) => return Err(e),
        };
        bundle.features.push(feature);
    }

    Ok(bundle)
}

fn read_feature<R: BufRead>(
    tokens: &mut Tokens<R>,
    format: BundleFormat,
    index: usize,
    num_cameras: i64,
) -> BundleResult<Feature3D> {
    let pos = [tokens.next_f32()?, tokens.next_f32()?, tokens.next_f32()?];
    let color = [
        tokens.next_f32()? / 255.0,
        tokens.next_f32()? / 255.0,
        tokens.next_f32()? / 255.0,
    ];

    let ref_count = tokens.next_i64()?;
    if ref_count < 0 || ref_count > num_cameras {
        return Err(BundleError::InvalidRefCount {
            feature: index,
            refs: ref_count,
        });
    }

    let mut refs = Vec::with_capacity(ref_count as usize);
    for _ in 0..ref_count {
        let view_id = tokens.next_i64()? as i32;
        let feature_id = tokens.next_i64()? as i32;
        let pos = match format {
            BundleFormat::Photosynther => {
                let _reprojection_quality = tokens.next_f32()?;
                [-1.0, -1.0]
            }
            BundleFormat::Bundler => [tokens.next_f32()?, tokens.next_f32()?],
        };
        refs.push(FeatureRef {
            view_id,
            feature_id,
            pos,
        });
    }

    Ok(Feature3D { pos, color, refs })
}

pub fn load_bundle_file(path: &Path, format: BundleFormat) -> BundleResult<Bundle> {
    let file = std::fs::File::open(path).map_err(|source| BundleError::FileOpen {
        path: path.to_path_buf(),
        source,
    })?;
    load_bundle(file, format)
}
