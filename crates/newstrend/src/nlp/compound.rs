//! Compound-term dictionary and greedy merger.
//!
//! Morphological analysis splits multi-morpheme expressions (`인공`+`지능`).
//! The merger reassembles adjacent terms whose concatenation is a known
//! compound.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;

use super::NlpError;

pub const DEFAULT_MAX_SPAN: usize = 5;
pub const DEFAULT_MIN_SPAN: usize = 2;

/// Normalizes a dictionary entry: internal whitespace removed, so `"인공 지능"`
/// and `"인공지능"` are the same compound. Empty results are dropped.
fn normalize_entry(entry: &str) -> Option<String> {
    let joined: String = entry.split_whitespace().collect();
    (!joined.is_empty()).then_some(joined)
}

fn build_set<I, S>(entries: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    entries
        .into_iter()
        .filter_map(|e| normalize_entry(e.as_ref()))
        .collect()
}

/// Reads dictionary entries from a file: one per line, `#` comments skipped.
pub fn read_entries(path: &Path) -> Result<Vec<String>, NlpError> {
    let content = std::fs::read_to_string(path).map_err(|e| NlpError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Shared set of known compounds.
///
/// Readers take a snapshot with a single atomic load; `reload` publishes a
/// whole new set with a single atomic store. The set is never mutated in
/// place, so a reader sees either the old set or the new one.
pub struct CompoundDictionary {
    entries: ArcSwap<HashSet<String>>,
    max_span: usize,
    min_span: usize,
}

impl std::fmt::Debug for CompoundDictionary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompoundDictionary")
            .field("entries", &self.len())
            .field("max_span", &self.max_span)
            .field("min_span", &self.min_span)
            .finish()
    }
}

impl Default for CompoundDictionary {
    fn default() -> Self {
        Self::empty()
    }
}

impl CompoundDictionary {
    pub fn empty() -> Self {
        Self::new(std::iter::empty::<&str>())
    }

    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_spans(entries, DEFAULT_MAX_SPAN, DEFAULT_MIN_SPAN)
    }

    /// Builds a dictionary with explicit span bounds. `min_span` is raised to
    /// at least 1 and `max_span` to at least `min_span`.
    pub fn with_spans<I, S>(entries: I, max_span: usize, min_span: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let min_span = min_span.max(1);
        Self {
            entries: ArcSwap::new(Arc::new(build_set(entries))),
            max_span: max_span.max(min_span),
            min_span,
        }
    }

    /// Replaces the whole entry set.
    pub fn reload<I, S>(&self, entries: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set = build_set(entries);
        log::info!("Compound dictionary reloaded with {} entries", set.len());
        self.entries.store(Arc::new(set));
    }

    /// Reloads the entries from a file. On error the current set is kept.
    pub fn reload_from_file(&self, path: &Path) -> Result<usize, NlpError> {
        let entries = read_entries(path)?;
        self.reload(&entries);
        Ok(self.len())
    }

    pub fn contains(&self, term: &str) -> bool {
        self.entries.load().contains(term)
    }

    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.load().is_empty()
    }

    /// Greedy left-to-right merge.
    ///
    /// At each position the longest span (down to `min_span`) whose
    /// concatenation is a known compound is emitted as one term; otherwise
    /// the single term is emitted. No backtracking.
    pub fn merge(&self, tokens: &[String]) -> Vec<String> {
        let dict = self.entries.load();
        if dict.is_empty() || tokens.is_empty() {
            return tokens.to_vec();
        }

        let n = tokens.len();
        let mut out = Vec::with_capacity(n);
        let mut i = 0;
        while i < n {
            let longest = self.max_span.min(n - i);
            let matched = (self.min_span..=longest).rev().find_map(|len| {
                let candidate = tokens[i..i + len].concat();
                dict.contains(&candidate).then_some((candidate, len))
            });
            match matched {
                Some((compound, len)) => {
                    out.push(compound);
                    i += len;
                }
                None => {
                    out.push(tokens[i].clone());
                    i += 1;
                }
            }
        }
        out
    }
}
