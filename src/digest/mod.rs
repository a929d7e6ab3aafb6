//! Leaf digests, directory combination, and injectable digest sources

pub mod algorithm;
pub mod cache;
pub mod combine;
pub mod leaf;
pub mod source;

pub use algorithm::DigestAlgorithm;
pub use cache::MemoizingSource;
pub use combine::{Combiner, DigestMap, ListingCombiner};
pub use leaf::{LeafDigester, DIGEST_BLOCK_SIZE};
pub use source::{DigestSource, SharedSource};
