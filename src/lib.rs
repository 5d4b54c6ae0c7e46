//! Friend-link feed aggregator: probes a roster of blogs for RSS/Atom
//! feeds, normalizes their entries, and persists the combined article
//! dataset as JSON.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod merge;
pub mod model;
pub mod output;
pub mod util;
