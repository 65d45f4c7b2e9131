//! Splitter implementations.

mod recursive;
mod semantic;

pub use recursive::RecursiveSplitter;
pub use semantic::SemanticSplitter;

use std::ops::Range;

/// Splits text into passage spans.
///
/// Spans are byte ranges into the input, in document order. Consecutive
/// spans may overlap; together they cover every non-whitespace character.
pub trait ChunkSplitter: Send + Sync {
    fn name(&self) -> &'static str;

    fn split(&self, text: &str) -> Vec<Range<usize>>;
}
