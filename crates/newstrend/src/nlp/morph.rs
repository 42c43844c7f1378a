//! Part-of-speech tagging for local term extraction.
//!
//! Tags follow the Sejong tag set. [`DictionaryAnalyzer`] is a lexicon-driven
//! tagger: lexicon surfaces are matched longest-prefix inside each
//! whitespace-delimited word, trailing particles and verbal endings are split
//! off with a built-in table, and everything else falls back to a tag derived
//! from its character class.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use super::NlpError;

/// Sejong part-of-speech tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PosTag {
    Nng,
    Nnp,
    Nnb,
    Nr,
    Np,
    Vv,
    Va,
    Vx,
    Vcp,
    Vcn,
    Mm,
    Mag,
    Maj,
    Ic,
    Jks,
    Jkc,
    Jkg,
    Jko,
    Jkb,
    Jkv,
    Jkq,
    Jx,
    Jc,
    Ep,
    Ef,
    Ec,
    Etn,
    Etm,
    Xpn,
    Xsn,
    Xsv,
    Xsa,
    Xr,
    Sf,
    Sp,
    Ss,
    Se,
    So,
    Sw,
    Sl,
    Sh,
    Sn,
}

const ALL_TAGS: &[PosTag] = &[
    PosTag::Nng,
    PosTag::Nnp,
    PosTag::Nnb,
    PosTag::Nr,
    PosTag::Np,
    PosTag::Vv,
    PosTag::Va,
    PosTag::Vx,
    PosTag::Vcp,
    PosTag::Vcn,
    PosTag::Mm,
    PosTag::Mag,
    PosTag::Maj,
    PosTag::Ic,
    PosTag::Jks,
    PosTag::Jkc,
    PosTag::Jkg,
    PosTag::Jko,
    PosTag::Jkb,
    PosTag::Jkv,
    PosTag::Jkq,
    PosTag::Jx,
    PosTag::Jc,
    PosTag::Ep,
    PosTag::Ef,
    PosTag::Ec,
    PosTag::Etn,
    PosTag::Etm,
    PosTag::Xpn,
    PosTag::Xsn,
    PosTag::Xsv,
    PosTag::Xsa,
    PosTag::Xr,
    PosTag::Sf,
    PosTag::Sp,
    PosTag::Ss,
    PosTag::Se,
    PosTag::So,
    PosTag::Sw,
    PosTag::Sl,
    PosTag::Sh,
    PosTag::Sn,
];

impl PosTag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nng => "NNG",
            Self::Nnp => "NNP",
            Self::Nnb => "NNB",
            Self::Nr => "NR",
            Self::Np => "NP",
            Self::Vv => "VV",
            Self::Va => "VA",
            Self::Vx => "VX",
            Self::Vcp => "VCP",
            Self::Vcn => "VCN",
            Self::Mm => "MM",
            Self::Mag => "MAG",
            Self::Maj => "MAJ",
            Self::Ic => "IC",
            Self::Jks => "JKS",
            Self::Jkc => "JKC",
            Self::Jkg => "JKG",
            Self::Jko => "JKO",
            Self::Jkb => "JKB",
            Self::Jkv => "JKV",
            Self::Jkq => "JKQ",
            Self::Jx => "JX",
            Self::Jc => "JC",
            Self::Ep => "EP",
            Self::Ef => "EF",
            Self::Ec => "EC",
            Self::Etn => "ETN",
            Self::Etm => "ETM",
            Self::Xpn => "XPN",
            Self::Xsn => "XSN",
            Self::Xsv => "XSV",
            Self::Xsa => "XSA",
            Self::Xr => "XR",
            Self::Sf => "SF",
            Self::Sp => "SP",
            Self::Ss => "SS",
            Self::Se => "SE",
            Self::So => "SO",
            Self::Sw => "SW",
            Self::Sl => "SL",
            Self::Sh => "SH",
            Self::Sn => "SN",
        }
    }
}

impl fmt::Display for PosTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PosTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        ALL_TAGS
            .iter()
            .copied()
            .find(|tag| tag.as_str() == wanted)
            .ok_or_else(|| format!("unknown POS tag '{}'", s.trim()))
    }
}

/// Tags whose morphemes may become terms.
pub const ALLOW_POS: &[PosTag] = &[
    PosTag::Nng,
    PosTag::Nnp,
    PosTag::Nnb,
    PosTag::Nr,
    PosTag::Np,
    PosTag::Vv,
    PosTag::Va,
    PosTag::Vx,
    PosTag::Vcp,
    PosTag::Vcn,
    PosTag::Sn,
];

/// Particles, adverbs, interjections and symbols.
pub const STOP_POS: &[PosTag] = &[
    PosTag::Jks,
    PosTag::Jkc,
    PosTag::Jkg,
    PosTag::Jko,
    PosTag::Jkb,
    PosTag::Jkv,
    PosTag::Jkq,
    PosTag::Jx,
    PosTag::Jc,
    PosTag::Mag,
    PosTag::Maj,
    PosTag::Ic,
    PosTag::Sf,
    PosTag::Sp,
    PosTag::Ss,
    PosTag::Se,
    PosTag::So,
    PosTag::Sw,
];

/// A morpheme must be allowed and not stopped. Both checks always apply.
pub fn is_retained(tag: PosTag) -> bool {
    ALLOW_POS.contains(&tag) && !STOP_POS.contains(&tag)
}

/// A surface form with its tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Morpheme {
    pub surface: String,
    pub tag: PosTag,
}

impl Morpheme {
    pub fn new(surface: impl Into<String>, tag: PosTag) -> Self {
        Self {
            surface: surface.into(),
            tag,
        }
    }
}

/// Splits text into tagged morphemes.
pub trait MorphAnalyzer: Send + Sync {
    fn analyze(&self, text: &str) -> Vec<Morpheme>;
}

/// Keeps the surfaces of retained, non-blank morphemes in order.
pub fn retained_terms(morphemes: &[Morpheme]) -> Vec<String> {
    morphemes
        .iter()
        .filter(|m| is_retained(m.tag))
        .map(|m| m.surface.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Particles and verbal endings split from the end of a Hangul run.
/// Longer entries are tried first.
const SUFFIXES: &[(&str, PosTag)] = &[
    ("으로부터", PosTag::Jkb),
    ("에서부터", PosTag::Jkb),
    ("했습니다", PosTag::Ef),
    ("합니다", PosTag::Ef),
    ("으로서", PosTag::Jkb),
    ("으로써", PosTag::Jkb),
    ("에게서", PosTag::Jkb),
    ("이라고", PosTag::Jkq),
    ("까지", PosTag::Jx),
    ("부터", PosTag::Jx),
    ("에서", PosTag::Jkb),
    ("에게", PosTag::Jkb),
    ("으로", PosTag::Jkb),
    ("보다", PosTag::Jkb),
    ("처럼", PosTag::Jkb),
    ("라고", PosTag::Jkq),
    ("하고", PosTag::Ec),
    ("하며", PosTag::Ec),
    ("했고", PosTag::Ec),
    ("했다", PosTag::Ef),
    ("한다", PosTag::Ef),
    ("된다", PosTag::Ef),
    ("됐다", PosTag::Ef),
    ("하는", PosTag::Etm),
    ("되는", PosTag::Etm),
    ("이다", PosTag::Vcp),
    ("이", PosTag::Jks),
    ("가", PosTag::Jks),
    ("을", PosTag::Jko),
    ("를", PosTag::Jko),
    ("은", PosTag::Jx),
    ("는", PosTag::Jx),
    ("도", PosTag::Jx),
    ("만", PosTag::Jx),
    ("의", PosTag::Jkg),
    ("에", PosTag::Jkb),
    ("로", PosTag::Jkb),
    ("와", PosTag::Jc),
    ("과", PosTag::Jc),
    ("한", PosTag::Etm),
];

/// Bound nouns that follow numerals, plus a few common adverbs.
const BUILTIN_LEXICON: &[(&str, PosTag)] = &[
    ("년", PosTag::Nnb),
    ("월", PosTag::Nnb),
    ("일", PosTag::Nnb),
    ("개", PosTag::Nnb),
    ("명", PosTag::Nnb),
    ("원", PosTag::Nnb),
    ("것", PosTag::Nnb),
    ("수", PosTag::Nnb),
    ("그리고", PosTag::Maj),
    ("하지만", PosTag::Maj),
    ("또한", PosTag::Mag),
    ("매우", PosTag::Mag),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Hangul,
    Latin,
    Digit,
    Han,
    Symbol,
}

fn classify(ch: char) -> CharClass {
    match ch {
        '\u{AC00}'..='\u{D7A3}' | '\u{1100}'..='\u{11FF}' | '\u{3130}'..='\u{318F}' => {
            CharClass::Hangul
        }
        '\u{4E00}'..='\u{9FFF}' => CharClass::Han,
        c if c.is_ascii_digit() => CharClass::Digit,
        c if c.is_alphabetic() => CharClass::Latin,
        _ => CharClass::Symbol,
    }
}

fn symbol_tag(ch: char) -> PosTag {
    match ch {
        '.' | '?' | '!' => PosTag::Sf,
        ',' | '·' | ':' | '/' | ';' => PosTag::Sp,
        '"' | '\'' | '(' | ')' | '[' | ']' | '{' | '}' | '<' | '>' | '“' | '”' | '‘' | '’'
        | '「' | '」' | '『' | '』' | '《' | '》' | '〈' | '〉' => PosTag::Ss,
        '…' => PosTag::Se,
        '~' | '-' | '～' => PosTag::So,
        _ => PosTag::Sw,
    }
}

/// Lexicon-driven analyzer used when no remote tokenizer is configured.
#[derive(Debug, Clone)]
pub struct DictionaryAnalyzer {
    lexicon: HashMap<String, PosTag>,
    max_entry_chars: usize,
}

impl Default for DictionaryAnalyzer {
    fn default() -> Self {
        Self::new(std::iter::empty())
    }
}

impl DictionaryAnalyzer {
    /// Builds an analyzer from user entries layered over the built-in ones.
    pub fn new(entries: impl IntoIterator<Item = (String, PosTag)>) -> Self {
        let mut lexicon: HashMap<String, PosTag> = BUILTIN_LEXICON
            .iter()
            .map(|(s, t)| (s.to_string(), *t))
            .collect();
        for (surface, tag) in entries {
            let surface: String = surface.split_whitespace().collect();
            if !surface.is_empty() {
                lexicon.insert(surface, tag);
            }
        }
        let max_entry_chars = lexicon.keys().map(|k| k.chars().count()).max().unwrap_or(0);
        Self {
            lexicon,
            max_entry_chars,
        }
    }

    /// Parses `surface<TAB>TAG` lines. A missing tag means NNP; blank lines
    /// and `#` comments are skipped.
    pub fn parse_lexicon(content: &str) -> Result<Vec<(String, PosTag)>, NlpError> {
        let mut entries = Vec::new();
        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (surface, tag) = match line.split_once('\t') {
                Some((surface, tag)) => {
                    let tag = tag.parse::<PosTag>().map_err(|reason| NlpError::LexiconLine {
                        line: idx + 1,
                        reason,
                    })?;
                    (surface.trim(), tag)
                }
                None => (line, PosTag::Nnp),
            };
            entries.push((surface.to_string(), tag));
        }
        Ok(entries)
    }

    /// Loads a lexicon file.
    pub fn from_lexicon_file(path: &Path) -> Result<Self, NlpError> {
        let content = std::fs::read_to_string(path).map_err(|e| NlpError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let entries = Self::parse_lexicon(&content)?;
        log::info!("Loaded {} lexicon entries from {}", entries.len(), path.display());
        Ok(Self::new(entries))
    }

    pub fn lexicon_len(&self) -> usize {
        self.lexicon.len()
    }

    fn analyze_word(&self, word: &str, out: &mut Vec<Morpheme>) {
        if let Some(tag) = self.lexicon.get(word) {
            out.push(Morpheme::new(word, *tag));
            return;
        }

        let chars: Vec<char> = word.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let class = classify(chars[i]);
            if class == CharClass::Symbol {
                out.push(Morpheme::new(chars[i].to_string(), symbol_tag(chars[i])));
                i += 1;
                continue;
            }
            let start = i;
            while i < chars.len() && classify(chars[i]) == class {
                i += 1;
            }
            let run: String = chars[start..i].iter().collect();
            match class {
                CharClass::Hangul => self.analyze_hangul(&run, out),
                CharClass::Digit => out.push(Morpheme::new(run, PosTag::Sn)),
                CharClass::Han => out.push(Morpheme::new(run, PosTag::Sh)),
                CharClass::Latin | CharClass::Symbol => {
                    let tag = self.lexicon.get(&run).copied().unwrap_or(PosTag::Sl);
                    out.push(Morpheme::new(run, tag));
                }
            }
        }
    }

    fn analyze_hangul(&self, run: &str, out: &mut Vec<Morpheme>) {
        if let Some(tag) = self.lexicon.get(run) {
            out.push(Morpheme::new(run, *tag));
            return;
        }
        let (stem, tail) = self.split_suffix(run);
        self.segment(stem, out);
        if let Some((suffix, tag)) = tail {
            out.push(Morpheme::new(suffix, tag));
        }
    }

    /// Splits one trailing particle or ending. Single-syllable stems are kept
    /// whole unless the lexicon knows them, so `국가` is not read as `국`+`가`.
    fn split_suffix<'a>(&self, run: &'a str) -> (&'a str, Option<(&'a str, PosTag)>) {
        for (suffix, tag) in SUFFIXES {
            let Some(stem) = run.strip_suffix(suffix) else {
                continue;
            };
            if stem.is_empty() {
                continue;
            }
            if stem.chars().count() >= 2 || self.lexicon.contains_key(stem) {
                return (stem, Some((&run[stem.len()..], *tag)));
            }
        }
        (run, None)
    }

    /// Longest-prefix lexicon segmentation; unmatched stretches become NNG.
    fn segment(&self, stem: &str, out: &mut Vec<Morpheme>) {
        let chars: Vec<char> = stem.chars().collect();
        let mut unknown = String::new();
        let mut i = 0;
        while i < chars.len() {
            let longest = (1..=self.max_entry_chars.min(chars.len() - i))
                .rev()
                .find_map(|len| {
                    let candidate: String = chars[i..i + len].iter().collect();
                    self.lexicon.get(&candidate).map(|tag| (candidate, *tag, len))
                });
            // A lone single-syllable match inside a longer unknown stretch
            // is usually part of that word, not a separate morpheme.
            match longest {
                Some((surface, tag, len)) if len > 1 || (unknown.is_empty() && i + 1 == chars.len()) => {
                    if !unknown.is_empty() {
                        out.push(Morpheme::new(std::mem::take(&mut unknown), PosTag::Nng));
                    }
                    out.push(Morpheme::new(surface, tag));
                    i += len;
                }
                _ => {
                    unknown.push(chars[i]);
                    i += 1;
                }
            }
        }
        if !unknown.is_empty() {
            out.push(Morpheme::new(unknown, PosTag::Nng));
        }
    }
}

impl MorphAnalyzer for DictionaryAnalyzer {
    fn analyze(&self, text: &str) -> Vec<Morpheme> {
        let mut out = Vec::new();
        for word in text.split_whitespace() {
            self.analyze_word(word, &mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer(entries: &[(&str, PosTag)]) -> DictionaryAnalyzer {
        DictionaryAnalyzer::new(entries.iter().map(|(s, t)| (s.to_string(), *t)))
    }

    fn surfaces(morphemes: &[Morpheme]) -> Vec<(&str, PosTag)> {
        morphemes.iter().map(|m| (m.surface.as_str(), m.tag)).collect()
    }

    #[test]
    fn test_allow_and_stop_are_both_checked() {
        assert!(is_retained(PosTag::Nng));
        assert!(is_retained(PosTag::Sn));
        assert!(!is_retained(PosTag::Jks));
        assert!(!is_retained(PosTag::Mag));
        // Neither allowed nor stopped.
        assert!(!is_retained(PosTag::Sl));
        assert!(!is_retained(PosTag::Ef));
    }

    #[test]
    fn test_tag_parse_round_trip() {
        for tag in ALL_TAGS {
            assert_eq!(tag.as_str().parse::<PosTag>().unwrap(), *tag);
        }
        assert_eq!("nnp".parse::<PosTag>().unwrap(), PosTag::Nnp);
        assert!("XYZ".parse::<PosTag>().is_err());
    }

    #[test]
    fn test_particles_and_punctuation_split() {
        let a = analyzer(&[("정부", PosTag::Nng), ("반도체", PosTag::Nng)]);
        let got = a.analyze("정부가 반도체를 지원한다.");
        assert_eq!(
            surfaces(&got),
            vec![
                ("정부", PosTag::Nng),
                ("가", PosTag::Jks),
                ("반도체", PosTag::Nng),
                ("를", PosTag::Jko),
                ("지원", PosTag::Nng),
                ("한다", PosTag::Ef),
                (".", PosTag::Sf),
            ]
        );
        assert_eq!(retained_terms(&got), vec!["정부", "반도체", "지원"]);
    }

    #[test]
    fn test_single_syllable_stem_is_not_split() {
        let a = DictionaryAnalyzer::default();
        let got = a.analyze("국가");
        assert_eq!(surfaces(&got), vec![("국가", PosTag::Nng)]);
    }

    #[test]
    fn test_lexicon_segments_compounds() {
        let a = analyzer(&[("인공", PosTag::Nng), ("지능", PosTag::Nng)]);
        let got = a.analyze("인공지능의 발전");
        assert_eq!(retained_terms(&got), vec!["인공", "지능", "발전"]);
    }

    #[test]
    fn test_digits_latin_and_han() {
        let a = analyzer(&[("AI", PosTag::Nnp)]);
        let got = a.analyze("2026년 AI 和 GPU");
        assert_eq!(
            surfaces(&got),
            vec![
                ("2026", PosTag::Sn),
                ("년", PosTag::Nnb),
                ("AI", PosTag::Nnp),
                ("和", PosTag::Sh),
                ("GPU", PosTag::Sl),
            ]
        );
        assert_eq!(retained_terms(&got), vec!["2026", "년", "AI"]);
    }

    #[test]
    fn test_parse_lexicon() {
        let entries =
            DictionaryAnalyzer::parse_lexicon("# comment\n\n반도체\tNNG\n삼성전자\n").unwrap();
        assert_eq!(
            entries,
            vec![
                ("반도체".to_string(), PosTag::Nng),
                ("삼성전자".to_string(), PosTag::Nnp),
            ]
        );
        let err = DictionaryAnalyzer::parse_lexicon("a\tNNG\nb\tBAD").unwrap_err();
        assert!(matches!(err, NlpError::LexiconLine { line: 2, .. }));
    }

    #[test]
    fn test_lexicon_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user.dic");
        std::fs::write(&path, "반도체\tNNG\n").unwrap();
        let a = DictionaryAnalyzer::from_lexicon_file(&path).unwrap();
        assert_eq!(a.lexicon_len(), BUILTIN_LEXICON.len() + 1);

        let missing = DictionaryAnalyzer::from_lexicon_file(&dir.path().join("nope.dic"));
        assert!(matches!(missing, Err(NlpError::Io { .. })));
    }
}
