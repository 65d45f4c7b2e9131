//! Chunking of loaded documents into passages.
//!
//! A [`Chunker`] applies one [`ChunkSplitter`] to every page of a document,
//! trims the resulting spans and numbers them across pages.

pub mod splitters;

pub use splitters::{ChunkSplitter, RecursiveSplitter, SemanticSplitter};

use luxas_core::config::{ChunkingSettings, SplitterKind};
use luxas_core::{AppError, AppResult};

use crate::loader::LoadedDocument;
use crate::types::Passage;

pub struct Chunker {
    splitter: Box<dyn ChunkSplitter>,
}

impl std::fmt::Debug for Chunker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunker")
            .field("splitter", &self.splitter.name())
            .finish()
    }
}

impl Chunker {
    /// Build the configured splitter.
    pub fn new(settings: &ChunkingSettings) -> AppResult<Self> {
        if settings.chunk_size == 0 || settings.chunk_overlap >= settings.chunk_size {
            return Err(AppError::Config(format!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                settings.chunk_overlap, settings.chunk_size
            )));
        }

        let splitter: Box<dyn ChunkSplitter> = match settings.splitter {
            SplitterKind::Recursive => Box::new(RecursiveSplitter::new(
                settings.chunk_size,
                settings.chunk_overlap,
                settings.separators.clone(),
            )),
            SplitterKind::Semantic => Box::new(SemanticSplitter::new(
                settings.chunk_size,
                settings.chunk_overlap,
            )?),
        };

        Ok(Self::with_splitter(splitter))
    }

    pub fn with_splitter(splitter: Box<dyn ChunkSplitter>) -> Self {
        Self { splitter }
    }

    pub fn splitter_name(&self) -> &'static str {
        self.splitter.name()
    }

    /// Split one text unit. Sequence numbers start at `first_index`.
    pub fn chunk_text(
        &self,
        source: &str,
        page: Option<u32>,
        text: &str,
        first_index: u32,
    ) -> Vec<Passage> {
        let mut passages = Vec::new();
        let mut next_index = first_index;

        for span in self.splitter.split(text) {
            let Some((start, end)) = trim_span(text, span.start, span.end) else {
                continue;
            };

            passages.push(Passage::new(
                source,
                next_index,
                page,
                (start, end),
                &text[start..end],
            ));
            next_index += 1;
        }

        passages
    }

    /// Split every page of a document, numbering passages across pages.
    pub fn chunk_document(&self, document: &LoadedDocument) -> Vec<Passage> {
        let mut passages: Vec<Passage> = Vec::new();

        for page in &document.pages {
            let first_index = passages.len() as u32;
            passages.extend(self.chunk_text(&document.source, page.page, &page.text, first_index));
        }

        tracing::debug!(
            source = %document.source,
            splitter = self.splitter.name(),
            pages = document.pages.len(),
            passages = passages.len(),
            "Chunked document"
        );

        passages
    }
}

/// Shrink a span to exclude surrounding whitespace; `None` if blank.
fn trim_span(text: &str, start: usize, end: usize) -> Option<(usize, usize)> {
    let slice = &text[start..end];
    let leading = slice.len() - slice.trim_start().len();
    let trailing = slice.len() - slice.trim_end().len();
    if leading == slice.len() {
        return None;
    }
    Some((start + leading, end - trailing))
}
