//! Text normalization and term extraction.

pub mod compound;
pub mod html;
pub mod morph;
pub mod normalize;
pub mod remote;
pub mod tokenizer;

use std::path::PathBuf;

use thiserror::Error;

pub use compound::CompoundDictionary;
pub use html::html_to_text;
pub use morph::{DictionaryAnalyzer, MorphAnalyzer, Morpheme, PosTag};
pub use normalize::normalize;
pub use remote::RemoteTokenizer;
pub use tokenizer::{tokenize, TermExtractor, TokenizerBackend};

#[derive(Error, Debug)]
pub enum NlpError {
    #[error("IO error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid lexicon entry at line {line}: {reason}")]
    LexiconLine { line: usize, reason: String },

    #[error("Failed to create HTTP client: {0}")]
    HttpClient(String),

    #[error("Remote tokenizer selected but neither url nor base_url is configured")]
    MissingEndpoint,
}
