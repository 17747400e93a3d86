pub mod bundle;
pub mod codec;

pub use bundle::{
    load_bundle, load_bundle_file, Bundle, BundleError, BundleFormat, BundleResult, Feature3D,
    FeatureRef,
};
pub use codec::{
    load_prebundle, load_prebundle_file, save_prebundle, save_prebundle_file, PrebundleError,
    PrebundleResult, PREBUNDLE_SIGNATURE,
};
