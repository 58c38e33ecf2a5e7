//! The top-level compiled template artifact.

use crate::node::Node;
use serde::{Deserialize, Serialize};
use tim_common::ContentHash;

/// A compiled template: the source fingerprint plus the node sequence.
///
/// Immutable once built. The cache store owns each instance behind an
/// `Arc`; renders borrow it read-only, which is what makes concurrent
/// renders safe without locking on the render path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompiledTemplate {
    /// Fingerprint of the source bytes this IR was compiled from.
    pub fingerprint: ContentHash,
    /// The renderable node sequence.
    pub nodes: Vec<Node>,
}

impl CompiledTemplate {
    /// Creates a compiled template from a fingerprint and node sequence.
    pub fn new(fingerprint: ContentHash, nodes: Vec<Node>) -> Self {
        Self { fingerprint, nodes }
    }
}
