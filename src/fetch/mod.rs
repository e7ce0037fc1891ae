mod client;
mod stats;
mod store;
mod worker;
#[cfg(test)]
mod tests;

pub use client::{Fetcher, HttpFetcher};
pub use stats::{FetchStats, FetchStatsSnapshot};
pub use store::{ArtifactStore, FileArtifactStore};
pub use worker::{FetchOutcome, FetchState, FetchWorker};
