//! Immutable snapshots of template files with line/column indexing.

use std::path::PathBuf;
use tim_common::ContentHash;

/// A template source loaded from disk (or memory, in tests).
///
/// Snapshots are immutable: when a file changes on disk a new
/// `TemplateSource` is created and the old one is superseded, never
/// mutated. Line starts are precomputed so that compiler diagnostics can
/// resolve byte offsets to 1-indexed line/column pairs cheaply.
pub struct TemplateSource {
    /// The logical template name this source was resolved from.
    pub name: String,
    /// The filesystem path of the source (or a synthetic name in tests).
    pub path: PathBuf,
    /// The full source text.
    pub text: String,
    /// Fingerprint of the source bytes, for cache invalidation.
    pub fingerprint: ContentHash,
    /// Byte offsets of each line start; the first entry is always 0.
    line_starts: Vec<u32>,
}

impl TemplateSource {
    /// Creates a source snapshot from already-loaded text.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, text: String) -> Self {
        let line_starts = compute_line_starts(&text);
        let fingerprint = ContentHash::from_bytes(text.as_bytes());
        Self {
            name: name.into(),
            path: path.into(),
            text,
            fingerprint,
            line_starts,
        }
    }

    /// Converts a byte offset into 1-indexed (line, column) coordinates.
    pub fn line_col(&self, byte_offset: u32) -> (u32, u32) {
        let line_idx = match self.line_starts.binary_search(&byte_offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        let line = (line_idx as u32) + 1;
        let col = byte_offset - self.line_starts[line_idx] + 1;
        (line, col)
    }
}

fn compute_line_starts(text: &str) -> Vec<u32> {
    let mut starts = vec![0u32];
    for (i, byte) in text.bytes().enumerate() {
        if byte == b'\n' {
            starts.push((i + 1) as u32);
        }
    }
    starts
}
