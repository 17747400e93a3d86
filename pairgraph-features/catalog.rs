use std::path::{Path, PathBuf};

use crate::error::{FeatureError, FeatureResult};

/// Recognized image extensions. Matching is case-sensitive: every
/// downstream image index depends on exactly which files are admitted.
const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "JPG", "png", "PNG"];

/// Enumerate the images of `dir` in lexicographic order of their full
/// path. The order defines the numeric view ids used everywhere else,
/// so it must be stable across runs on the same directory contents.
pub fn scan_images(dir: &Path) -> FeatureResult<Vec<PathBuf>> {
    if !dir.exists() {
        return Err(FeatureError::DirectoryNotFound(dir.to_path_buf()));
    }
    if !dir.is_dir() {
        return Err(FeatureError::NotADirectory(dir.to_path_buf()));
    }

    let entries = std::fs::read_dir(dir).map_err(|source| FeatureError::DirectoryRead {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut images = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| FeatureError::DirectoryRead {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            if IMAGE_EXTENSIONS.contains(&ext) {
                images.push(path);
            }
        }
    }

    images.sort();
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_catalog_dir(names: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in names {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        dir
    }

    #[test]
    fn test_missing_directory() {
        let result = scan_images(Path::new("/nonexistent/imagedir"));
        assert!(matches!(result, Err(FeatureError::DirectoryNotFound(_))));
    }

    #[test]
    fn test_not_a_directory() {
        let dir = create_catalog_dir(&["a.jpg"]);
        let file = dir.path().join("a.jpg");
        let result = scan_images(&file);
        assert!(matches!(result, Err(FeatureError::NotADirectory(_))));
    }

    #[test]
    fn test_extension_filter_is_case_sensitive() {
        let dir = create_catalog_dir(&["a.jpg", "b.JPG", "c.png", "d.PNG", "e.Jpg", "f.jpeg", "g.txt"]);
        let images = scan_images(dir.path()).unwrap();
        let names: Vec<_> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.JPG", "c.png", "d.PNG"]);
    }

    #[test]
    fn test_order_is_lexicographic_on_full_path() {
        let dir = create_catalog_dir(&["zz.jpg", "IMG_10.png", "IMG_2.png", "aa.JPG"]);
        let images = scan_images(dir.path()).unwrap();
        let names: Vec<_> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        // Plain lexicographic, not numeric-aware: IMG_10 sorts before IMG_2
        assert_eq!(names, vec!["IMG_10.png", "IMG_2.png", "aa.JPG", "zz.jpg"]);
    }

    #[test]
    fn test_empty_directory() {
        let dir = create_catalog_dir(&[]);
        assert!(scan_images(dir.path()).unwrap().is_empty());
    }
}
