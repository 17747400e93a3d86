use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use pairgraph_core::{
    FeatureSet, PairwiseMatching, TwoViewMatching, Viewport, ViewportList,
};

/// Format tag and version marker in one; bumping the format means
/// changing this string.
pub const PREBUNDLE_SIGNATURE: &[u8; 14] = b"MVE_PREBUNDLE\n";

#[derive(Debug)]
pub enum PrebundleError {
    FileOpen { path: std::path::PathBuf, source: io::Error },
    Io(io::Error),
    /// The first 14 bytes are not the prebundle signature: not this format.
    BadSignature,
    /// Input ended before all declared counts were satisfied: corrupt
    /// data of this format.
    PrematureEof,
    /// A negative count field.
    InvalidCount(i32),
}

impl std::fmt::Display for PrebundleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrebundleError::FileOpen { path, source } => {
                write!(f, "can not open file {}: {}", path.display(), source)
            }
            PrebundleError::Io(e) => write!(f, "prebundle I/O error: {}", e),
            PrebundleError::BadSignature => write!(f, "invalid prebundle file signature"),
            PrebundleError::PrematureEof => write!(f, "premature EOF in prebundle file"),
            PrebundleError::InvalidCount(n) => write!(f, "invalid prebundle count: {}", n),
        }
    }
}

impl std::error::Error for PrebundleError {}

impl From<io::Error> for PrebundleError {
    fn from(err: io::Error) -> Self {
        PrebundleError::Io(err)
    }
}

pub type PrebundleResult<T> = Result<T, PrebundleError>;

fn write_i32<W: Write>(out: &mut W, value: i32) -> io::Result<()> {
    out.write_all(&value.to_le_bytes())
}

fn write_f32<W: Write>(out: &mut W, value: f32) -> io::Result<()> {
    out.write_all(&value.to_le_bytes())
}

fn read_exact_or_eof<R: Read>(input: &mut R, buf: &mut [u8]) -> PrebundleResult<()> {
    input.read_exact(buf).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            PrebundleError::PrematureEof
        } else {
            PrebundleError::Io(e)
        }
    })
}

fn read_i32<R: Read>(input: &mut R) -> PrebundleResult<i32> {
    let mut buf = [0u8; 4];
    read_exact_or_eof(input, &mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_f32<R: Read>(input: &mut R) -> PrebundleResult<f32> {
    let mut buf = [0u8; 4];
    read_exact_or_eof(input, &mut buf)?;
    Ok(f32::from_le_bytes(buf))
}

fn read_count<R: Read>(input: &mut R) -> PrebundleResult<usize> {
    let value = read_i32(input)?;
    if value < 0 {
        return Err(PrebundleError::InvalidCount(value));
    }
    Ok(value as usize)
}

/// Serialize viewport feature sets and the pairwise matching into the
/// prebundle container. Only checkpointed data (positions, colors,
/// correspondences) is written; descriptors never enter the format.
pub fn save_prebundle<W: Write>(
    out: &mut W,
    viewports: &[Viewport],
    matching: &PairwiseMatching,
) -> PrebundleResult<()> {
    out.write_all(PREBUNDLE_SIGNATURE)?;

    write_i32(out, viewports.len() as i32)?;
    for viewport in viewports {
        let features = &viewport.features;
        write_i32(out, features.positions.len() as i32)?;
        for pos in &features.positions {
            write_f32(out, pos[0])?;
            write_f32(out, pos[1])?;
        }
        write_i32(out, features.colors.len() as i32)?;
        for color in &features.colors {
            out.write_all(color)?;
        }
    }

    write_i32(out, matching.len() as i32)?;
    for record in matching {
        write_i32(out, record.view_1_id as i32)?;
        write_i32(out, record.view_2_id as i32)?;
        write_i32(out, record.matches.len() as i32)?;
        for &(query_idx, train_idx) in &record.matches {
            write_i32(out, query_idx as i32)?;
            write_i32(out, train_idx as i32)?;
        }
    }
    Ok(())
}

/// Decode a prebundle stream. The inverse of [`save_prebundle`]:
/// decoded viewports carry feature sets only, with empty keypoint and
/// descriptor data and no camera.
pub fn load_prebundle<R: Read>(
    input: &mut R,
) -> PrebundleResult<(ViewportList, PairwiseMatching)> {
    let mut signature = [0u8; PREBUNDLE_SIGNATURE.len()];
    read_exact_or_eof(input, &mut signature)?;
    if &signature != PREBUNDLE_SIGNATURE {
        return Err(PrebundleError::BadSignature);
    }

    let viewport_count = read_count(input)?;
    let mut viewports = ViewportList::with_capacity(viewport_count);
    for _ in 0..viewport_count {
        let mut features = FeatureSet::default();

        let position_count = read_count(input)?;
        features.positions.reserve(position_count);
        for _ in 0..position_count {
            features.positions.push([read_f32(input)?, read_f32(input)?]);
        }

        let color_count = read_count(input)?;
        features.colors.reserve(color_count);
        for _ in 0..color_count {
            let mut color = [0u8; 3];
            read_exact_or_eof(input, &mut color)?;
            features.colors.push(color);
        }

        viewports.push(Viewport {
            features,
            ..Viewport::default()
        });
    }

    let pair_count = read_count(input)?;
    let mut matching = PairwiseMatching::with_capacity(pair_count);
    for _ in 0..pair_count {
        let view_1_id = read_i32(input)? as u32;
        let view_2_id = read_i32(input)? as u32;
        let match_count = read_count(input)?;
        let mut matches = Vec::with_capacity(match_count);
        for _ in 0..match_count {
            matches.push((read_i32(input)? as u32, read_i32(input)? as u32));
        }
        matching.push(TwoViewMatching {
            view_1_id,
            view_2_id,
            matches,
        });
    }

    Ok((viewports, matching))
}

pub fn save_prebundle_file(
    path: &Path,
    viewports: &[Viewport],
    matching: &PairwiseMatching,
) -> PrebundleResult<()> {
    let file = std::fs::File::create(path).map_err(|source| PrebundleError::FileOpen {
        path: path.to_path_buf(),
        source,
    })?;
    let mut out = BufWriter::new(file);
    save_prebundle(&mut out, viewports, matching)?;
    out.flush()?;
    Ok(())
}

pub fn load_prebundle_file(path: &Path) -> PrebundleResult<(ViewportList, PairwiseMatching)> {
    let file = std::fs::File::open(path).map_err(|source| PrebundleError::FileOpen {
        path: path.to_path_buf(),
        source,
    })?;
    load_prebundle(&mut BufReader::new(file))
}
