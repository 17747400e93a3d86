pub mod catalog;
pub mod detector;
pub mod error;
pub mod extract;
pub mod keyfile;

pub use catalog::scan_images;
pub use detector::{Detector, HessianPatchDetector};
pub use error::{FeatureError, FeatureResult};
pub use extract::ExtractionStage;
pub use keyfile::{read_key_file, write_key_file};
