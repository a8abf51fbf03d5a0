// ─── beatsync core ───
// Installation & verification pipeline for Beat Saber content.
//
// Architecture:
//   core/
//     catalog/    — Catalog wire model + identifier resolution
//     downloader/ — Lazy, ordered HTTP fetch sequence with progress
//     hashing/    — MD5 verification of extracted files
//     archive/    — Zip extraction with path-traversal rejection
//     pipeline/   — Per-unit install state machine + rollback
//     playlist/   — Playlist manifest parsing + installation
//     progress    — Non-blocking progress event channel
//     cancel      — Cooperative cancellation token

pub mod archive;
pub mod cancel;
pub mod catalog;
pub mod downloader;
pub mod error;
pub mod hashing;
pub mod http;
pub mod pipeline;
pub mod playlist;
pub mod progress;
