//! Citation block appended to every answer.

use super::retrieve::RetrievalResult;
use super::truncate_chars;
use luxas_core::config::RetrievalSettings;

const RULE_WIDTH: usize = 60;

/// Formats the sources behind an answer. Pure and byte-deterministic.
#[derive(Debug, Clone, Copy)]
pub struct CitationAssembler {
    previews_per_source: usize,
    preview_chars: usize,
}

impl Default for CitationAssembler {
    fn default() -> Self {
        Self::from_settings(&RetrievalSettings::default())
    }
}

impl CitationAssembler {
    pub fn new(previews_per_source: usize, preview_chars: usize) -> Self {
        Self {
            previews_per_source,
            preview_chars,
        }
    }

    pub fn from_settings(settings: &RetrievalSettings) -> Self {
        Self::new(settings.citation_previews, settings.citation_preview_chars)
    }

    pub fn assemble(&self, retrieval: &RetrievalResult) -> String {
        let groups = retrieval.groups();
        let rule = "=".repeat(RULE_WIDTH);

        let mut block = format!(
            "\n\n{rule}\n📚 **Sources Consultées** ({} document(s), {} chunk(s))\n{rule}\n\n",
            groups.len(),
            retrieval.len()
        );

        for group in &groups {
            let count = group.passages.len();
            block.push_str(&format!("📄 **{}** ({} chunk(s))\n", group.source, count));

            for (i, scored) in group.passages.iter().take(self.previews_per_source).enumerate() {
                block.push_str(&format!(
                    "   • Extrait {}: _{}_\n",
                    i + 1,
                    self.preview(&scored.passage.text)
                ));
            }
            if count > self.previews_per_source {
                block.push_str(&format!(
                    "   • ... et {} autre(s) extrait(s)\n",
                    count - self.previews_per_source
                ));
            }
            block.push('\n');
        }

        block
    }

    fn preview(&self, text: &str) -> String {
        let flattened = text.replace('\n', " ");
        let cut = truncate_chars(&flattened, self.preview_chars);
        let mut preview = cut.trim().to_string();
        if cut.len() < flattened.len() {
            preview.push_str("...");
        }
        preview
    }
}
