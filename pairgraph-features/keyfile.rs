use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use pairgraph_core::{DescriptorMatrix, Keypoint, DESCRIPTOR_WIDTH};

use crate::error::{FeatureError, FeatureResult};

/// Descriptor values per line: six lines of 20 followed by one line of 8.
const LINE_WIDTH: usize = 20;

/// Write one image's features as a key-file.
///
/// Layout: a `rows cols` header, then per feature one
/// `x y response angle` line followed by the descriptor rendered as
/// decimal bytes across 7 lines (6x20 + 1x8). Angles are expected to be
/// normalized radians already.
pub fn write_key_file(
    path: &Path,
    keypoints: &[Keypoint],
    descriptors: &DescriptorMatrix,
) -> FeatureResult<()> {
    let io_err = |source| FeatureError::KeyFileIo {
        path: path.to_path_buf(),
        source,
    };
    let file = std::fs::File::create(path).map_err(io_err)?;
    let mut out = BufWriter::new(file);
    write_key_data(&mut out, keypoints, descriptors).map_err(io_err)?;
    out.flush().map_err(io_err)
}

fn write_key_data<W: Write>(
    out: &mut W,
    keypoints: &[Keypoint],
    descriptors: &DescriptorMatrix,
) -> std::io::Result<()> {
    writeln!(out, "{} {}", descriptors.rows(), DESCRIPTOR_WIDTH)?;
    for (kp, i) in keypoints.iter().zip(0..descriptors.rows()) {
        writeln!(out, "{} {} {} {}", kp.x, kp.y, kp.response, kp.angle)?;
        for chunk in descriptors.row(i).chunks(LINE_WIDTH) {
            let line: Vec<String> = chunk
                .iter()
                .map(|v| (v.round().clamp(0.0, 255.0) as u8).to_string())
                .collect();
            writeln!(out, "{}", line.join(" "))?;
        }
    }
    Ok(())
}

/// Read a key-file back into keypoints and descriptors. Descriptor
/// values come back as whole numbers in 0..=255; the byte rendering in
/// the file is lossy with respect to the original floats.
pub fn read_key_file(path: &Path) -> FeatureResult<(Vec<Keypoint>, DescriptorMatrix)> {
    let file = std::fs::File::open(path).map_err(|source| FeatureError::KeyFileIo {
        path: path.to_path_buf(),
        source,
    })?;
    let parse_err = |message: String| FeatureError::KeyFileParse {
        path: path.to_path_buf(),
        message,
    };

    let mut tokens = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|source| FeatureError::KeyFileIo {
            path: path.to_path_buf(),
            source,
        })?;
        tokens.extend(line.split_whitespace().map(str::to_owned));
    }
    let mut cursor = tokens.iter();
    let mut next_f32 = || -> FeatureResult<f32> {
        cursor
            .next()
            .ok_or_else(|| parse_err("unexpected end of file".into()))?
            .parse::<f32>()
            .map_err(|e| parse_err(format!("bad value: {}", e)))
    };

    let rows = next_f32()? as usize;
    let cols = next_f32()? as usize;
    if cols != DESCRIPTOR_WIDTH {
        return Err(parse_err(format!(
            "descriptor width {} (expected {})",
            cols, DESCRIPTOR_WIDTH
        )));
    }

    let mut keypoints = Vec::with_capacity(rows);
    let mut descriptors = DescriptorMatrix::new();
    for _ in 0..rows {
        keypoints.push(Keypoint {
            x: next_f32()?,
            y: next_f32()?,
            response: next_f32()?,
            angle: next_f32()?,
        });
        let mut row = [0.0f32; DESCRIPTOR_WIDTH];
        for v in row.iter_mut() {
            let value = next_f32()?;
            if !(0.0..=255.0).contains(&value) {
                return Err(parse_err(format!("descriptor byte {} out of range", value)));
            }
            *v = value;
        }
        descriptors.push_row(&row);
    }
    Ok((keypoints, descriptors))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_features(count: usize) -> (Vec<Keypoint>, DescriptorMatrix) {
        let mut keypoints = Vec::new();
        let mut descriptors = DescriptorMatrix::new();
        for i in 0..count {
            keypoints.push(Keypoint {
                x: i as f32 + 0.5,
                y: 2.0 * i as f32,
                response: 100.0 + i as f32,
                angle: -1.5 + i as f32 * 0.25,
            });
            let mut row = [0.0f32; DESCRIPTOR_WIDTH];
            for (j, v) in row.iter_mut().enumerate() {
                *v = ((i * 31 + j * 7) % 256) as f32;
            }
            descriptors.push_row(&row);
        }
        (keypoints, descriptors)
    }

    #[test]
    fn test_header_and_line_layout() {
        let (kps, desc) = create_test_features(2);
        let mut buf = Vec::new();
        write_key_data(&mut buf, &kps, &desc).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        // header + 2 * (1 coordinate line + 7 descriptor lines)
        assert_eq!(lines.len(), 1 + 2 * 8);
        assert_eq!(lines[0], format!("2 {}", DESCRIPTOR_WIDTH));
        assert_eq!(lines[1].split_whitespace().count(), 4);
        for desc_line in &lines[2..8] {
            assert_eq!(desc_line.split_whitespace().count(), 20);
        }
        assert_eq!(lines[8].split_whitespace().count(), 8);
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("view0.jpg.key");
        let (kps, desc) = create_test_features(5);
        write_key_file(&path, &kps, &desc).unwrap();
        let (read_kps, read_desc) = read_key_file(&path).unwrap();
        assert_eq!(read_kps, kps);
        // Byte-valued test descriptors survive exactly
        assert_eq!(read_desc, desc);
    }

    #[test]
    fn test_empty_feature_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.key");
        write_key_file(&path, &[], &DescriptorMatrix::new()).unwrap();
        let (kps, desc) = read_key_file(&path).unwrap();
        assert!(kps.is_empty());
        assert!(desc.is_empty());
    }

    #[test]
    fn test_truncated_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.key");
        std::fs::write(&path, "2 128\n1.0 2.0 3.0 0.5\n1 2 3\n").unwrap();
        let result = read_key_file(&path);
        assert!(matches!(result, Err(FeatureError::KeyFileParse { .. })));
    }

    #[test]
    fn test_wrong_width_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.key");
        std::fs::write(&path, "0 64\n").unwrap();
        let result = read_key_file(&path);
        assert!(matches!(result, Err(FeatureError::KeyFileParse { .. })));
    }
}
