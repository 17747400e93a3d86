use std::io;
use std::path::PathBuf;

#[derive(Debug)]
pub enum FeatureError {
    DirectoryNotFound(PathBuf),
    NotADirectory(PathBuf),
    DirectoryRead { path: PathBuf, source: io::Error },
    ImageRead { path: PathBuf, source: image::ImageError },
    KeyFileIo { path: PathBuf, source: io::Error },
    KeyFileParse { path: PathBuf, message: String },
}

impl std::fmt::Display for FeatureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureError::DirectoryNotFound(p) => {
                write!(f, "the image directory {} does not exist", p.display())
            }
            FeatureError::NotADirectory(p) => {
                write!(f, "{} is not a directory", p.display())
            }
            FeatureError::DirectoryRead { path, source } => {
                write!(f, "can not read directory {}: {}", path.display(), source)
            }
            FeatureError::ImageRead { path, source } => {
                write!(f, "can not read image {}: {}", path.display(), source)
            }
            FeatureError::KeyFileIo { path, source } => {
                write!(f, "key-file I/O error for {}: {}", path.display(), source)
            }
            FeatureError::KeyFileParse { path, message } => {
                write!(f, "malformed key-file {}: {}", path.display(), message)
            }
        }
    }
}

impl std::error::Error for FeatureError {}

pub type FeatureResult<T> = Result<T, FeatureError>;
