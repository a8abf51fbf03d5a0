//! beatsync — installation and verification pipeline for Beat Saber content.
//!
//! The crate resolves mod and map identifiers against a remote catalog,
//! downloads the matching archives, verifies their MD5 digests and extracts
//! them into a validated game install directory. UI, settings persistence and
//! install-directory discovery are the caller's concern; every operation here
//! takes an already-validated path and an optional progress observer.

pub mod core;

pub use crate::core::cancel::CancelToken;
pub use crate::core::catalog::{
    CatalogResolver, DownloadDescriptor, HttpCatalogResolver, InstallUnit,
};
pub use crate::core::error::{InstallerError, InstallerResult};
pub use crate::core::pipeline::InstallationPipeline;
pub use crate::core::playlist::PlaylistInstaller;
pub use crate::core::progress::{Phase, Progress, ProgressEvent};
