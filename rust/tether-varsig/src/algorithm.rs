//! Signature algorithm configurations.

pub mod eddsa;

/// A signature algorithm configuration, identified by its varsig tags.
///
/// Each algorithm contributes a [multicodec] prefix plus zero or more
/// configuration tags (hash function, key length, and so on) to the
/// varsig header.
///
/// [multicodec]: https://github.com/multiformats/multicodec
pub trait SignatureAlgorithm: Default {
    /// The algorithm's multicodec prefix tag.
    fn prefix(&self) -> u64;

    /// Configuration tags following the prefix.
    fn config_tags(&self) -> Vec<u64>;

    /// Try to parse this algorithm from the front of a tag sequence,
    /// returning the algorithm and the unconsumed tags.
    fn try_from_tags(tags: &[u64]) -> Option<(Self, &[u64])>;
}
