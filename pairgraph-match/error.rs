use std::io;
use std::path::PathBuf;

#[derive(Debug)]
pub enum MatchError {
    FileOpen { path: PathBuf, source: io::Error },
    Io(io::Error),
    Parse { line: usize, message: String },
}

impl std::fmt::Display for MatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchError::FileOpen { path, source } => {
                write!(f, "can not open file {}: {}", path.display(), source)
            }
            MatchError::Io(e) => write!(f, "matches I/O error: {}", e),
            MatchError::Parse { line, message } => {
                write!(f, "malformed matches file (line {}): {}", line, message)
            }
        }
    }
}

impl std::error::Error for MatchError {}

impl From<io::Error> for MatchError {
    fn from(err: io::Error) -> Self {
        MatchError::Io(err)
    }
}

pub type MatchResult<T> = Result<T, MatchError>;
