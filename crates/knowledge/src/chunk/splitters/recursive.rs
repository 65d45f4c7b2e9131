//! Separator-driven splitter with character overlap.

use std::ops::Range;

use unicode_segmentation::UnicodeSegmentation;

use super::ChunkSplitter;

/// Splits on the highest-priority separator present in the text, recursing
/// into oversized pieces with the remaining separators, then greedily merges
/// pieces back up to `chunk_size` characters.
///
/// Separators stay attached to the start of the piece that follows them, so
/// merged spans are contiguous slices of the input. The empty separator
/// splits on grapheme clusters.
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize, separators: Vec<String>) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk_overlap: chunk_overlap.min(chunk_size.saturating_sub(1)),
            separators,
        }
    }

    fn split_range(&self, text: &str, range: Range<usize>, separators: &[String]) -> Vec<Range<usize>> {
        let slice = &text[range.clone()];

        let position = separators
            .iter()
            .position(|sep| sep.is_empty() || slice.contains(sep.as_str()));
        let (separator, remaining) = match position {
            Some(i) => (separators[i].as_str(), &separators[i + 1..]),
            None => ("", &separators[separators.len()..]),
        };

        let pieces = split_pieces(slice, range.start, separator);

        let mut chunks = Vec::new();
        let mut pending: Vec<Range<usize>> = Vec::new();

        for piece in pieces {
            if char_len(text, &piece) <= self.chunk_size {
                pending.push(piece);
                continue;
            }

            if !pending.is_empty() {
                chunks.extend(self.merge(text, &pending));
                pending.clear();
            }

            if remaining.is_empty() {
                // Nothing finer to split on
                chunks.push(piece);
            } else {
                chunks.extend(self.split_range(text, piece, remaining));
            }
        }

        if !pending.is_empty() {
            chunks.extend(self.merge(text, &pending));
        }

        chunks
    }

    /// Merge adjacent pieces into spans of at most `chunk_size` characters,
    /// restarting each span from trailing pieces worth at most `chunk_overlap`.
    fn merge(&self, text: &str, pieces: &[Range<usize>]) -> Vec<Range<usize>> {
        let mut spans = Vec::new();
        let mut window: std::collections::VecDeque<(Range<usize>, usize)> = Default::default();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(text, piece);

            if total + len > self.chunk_size && !window.is_empty() {
                spans.push(span_of(&window));

                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match window.pop_front() {
                        Some((_, popped)) => total -= popped,
                        None => break,
                    }
                }
            }

            window.push_back((piece.clone(), len));
            total += len;
        }

        if !window.is_empty() {
            spans.push(span_of(&window));
        }

        spans
    }
}

impl ChunkSplitter for RecursiveSplitter {
    fn name(&self) -> &'static str {
        "recursive"
    }

    fn split(&self, text: &str) -> Vec<Range<usize>> {
        if text.is_empty() {
            return Vec::new();
        }
        self.split_range(text, 0..text.len(), &self.separators)
    }
}

/// Cut `slice` before every occurrence of `separator` (or at every grapheme
/// when it is empty), returning absolute byte ranges.
fn split_pieces(slice: &str, offset: usize, separator: &str) -> Vec<Range<usize>> {
    if separator.is_empty() {
        return slice
            .grapheme_indices(true)
            .map(|(i, g)| offset + i..offset + i + g.len())
            .collect();
    }

    let mut starts: Vec<usize> = slice
        .match_indices(separator)
        .map(|(i, _)| i)
        .filter(|&i| i > 0)
        .collect();
    starts.insert(0, 0);

    let mut pieces = Vec::with_capacity(starts.len());
    for (n, &start) in starts.iter().enumerate() {
        let end = starts.get(n + 1).copied().unwrap_or(slice.len());
        if end > start {
            pieces.push(offset + start..offset + end);
        }
    }
    pieces
}

fn span_of(window: &std::collections::VecDeque<(Range<usize>, usize)>) -> Range<usize> {
    let start = window.front().map(|(r, _)| r.start).unwrap_or(0);
    let end = window.back().map(|(r, _)| r.end).unwrap_or(start);
    start..end
}

fn char_len(text: &str, range: &Range<usize>) -> usize {
    text[range.clone()].chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_separators() -> Vec<String> {
        ["\n\n", "\n", ". ", " ", ""].iter().map(|s| s.to_string()).collect()
    }

    fn texts<'a>(text: &'a str, spans: &[Range<usize>]) -> Vec<&'a str> {
        spans.iter().map(|r| &text[r.clone()]).collect()
    }

    #[test]
    fn test_short_text_is_single_span() {
        let splitter = RecursiveSplitter::new(1000, 200, default_separators());
        let text = "Article 1. La présente loi est applicable.";
        let spans = splitter.split(text);
        assert_eq!(spans, vec![0..text.len()]);
    }

    #[test]
    fn test_paragraph_separator_wins() {
        let splitter = RecursiveSplitter::new(20, 0, default_separators());
        let text = "Premier paragraphe.\n\nSecond paragraphe.";
        let spans = splitter.split(text);
        let parts = texts(text, &spans);
        assert_eq!(parts, vec!["Premier paragraphe.", "\n\nSecond paragraphe."]);
    }

    #[test]
    fn test_spans_respect_size() {
        let splitter = RecursiveSplitter::new(50, 10, default_separators());
        let text = "Le mot loi revient souvent dans ce texte de loi. ".repeat(20);
        for span in splitter.split(&text) {
            assert!(text[span].chars().count() <= 50);
        }
    }

    #[test]
    fn test_consecutive_spans_overlap_within_bound() {
        let splitter = RecursiveSplitter::new(40, 12, default_separators());
        let text = "un deux trois quatre cinq six sept huit neuf dix onze douze treize quatorze";
        let spans = splitter.split(text);
        assert!(spans.len() > 1);
        for pair in spans.windows(2) {
            let overlap = pair[0].end.saturating_sub(pair[1].start);
            assert!(text[pair[1].start..pair[1].start + overlap].chars().count() <= 12);
            assert!(pair[1].start > pair[0].start);
        }
    }

    #[test]
    fn test_grapheme_fallback_keeps_utf8_boundaries() {
        let splitter = RecursiveSplitter::new(4, 1, default_separators());
        let text = "éàçüœ👪ñ";
        let spans = splitter.split(text);
        for span in &spans {
            assert!(text.is_char_boundary(span.start));
            assert!(text.is_char_boundary(span.end));
        }
        assert_eq!(spans.last().map(|r| r.end), Some(text.len()));
    }

    #[test]
    fn test_trailing_content_is_kept() {
        let splitter = RecursiveSplitter::new(30, 5, default_separators());
        let text = format!("{} fin", "mot ".repeat(30));
        let spans = splitter.split(&text);
        assert!(text[spans.last().unwrap().clone()].ends_with("fin"));
    }
}
