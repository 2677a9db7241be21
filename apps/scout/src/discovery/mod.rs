//! Discovery pipeline: fetch from every source, canonicalize, dedup across
//! sources, and score locally.

pub mod aggregator;
pub mod canonical;
pub mod local_score;

pub use aggregator::Aggregator;
