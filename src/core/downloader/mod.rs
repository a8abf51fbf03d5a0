mod client;

pub use client::{BatchDownloader, FetchItem, FetchOutcome};
