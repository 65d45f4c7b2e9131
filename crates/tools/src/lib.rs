//! Auxiliary utilities around a law text.
//!
//! Independent of the answer pipeline: each tool is one prompt over a
//! language model, plus a news search for the tone analysis.

pub mod news;
pub mod summarize;
pub mod tone;

pub use news::{NewsArticle, NewsSearch, SerpApiNews};
pub use summarize::Summarizer;
pub use tone::{ToneAnalyzer, ToneReport};
