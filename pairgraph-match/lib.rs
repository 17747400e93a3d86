pub mod error;
pub mod filter;
pub mod matcher;
pub mod scheduler;
pub mod writer;

pub use error::{MatchError, MatchResult};
pub use filter::ratio_filter;
pub use matcher::{BruteForceMatcher, Matcher, Neighbor};
pub use scheduler::{match_all_pairs, pair_tasks};
pub use writer::{read_matches, read_matches_file, write_matches, write_matches_file};
