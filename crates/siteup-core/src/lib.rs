//! Siteup Core Library
//!
//! Installation-state logic for learning-management-system sites: which
//! release branches a site may move to, and how to read the progress stream
//! of the external installer/upgrader helpers.

pub mod config;
pub mod environment;
pub mod helper;
pub mod manifest;
pub mod resolver;
pub mod status;
pub mod version;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{ConfigStore, SiteupConfig};

    // Manifest
    pub use crate::manifest::{
        BranchVariant, DEFAULT_VARIANT, ManifestError, ProductInfo, ReleaseManifest,
        ReleaseRecord,
    };

    // Resolution
    pub use crate::environment::EnvironmentSnapshot;
    pub use crate::resolver::{ResolutionResult, ResolutionWarning, ResolveRequest, resolve};
    pub use crate::version::BranchTag;

    // Helpers
    pub use crate::helper::{
        HelperCommand, HelperError, HelperEvent, HelperRunner, ProgressStage, classify,
    };
    pub use crate::status::{HelperSession, StatusLog, StatusReporter};
}
