//! Declaration block extraction.
//!
//! Recognizes blocks shaped `keyword "identifier" { ...body... }` in raw
//! declaration text. This is a structural scan, not a parser: a default
//! written in a shape the default pattern does not know is reported as
//! "no default".

use crate::errors::ModgateError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Keyword introducing an input declaration.
pub const INPUT_KEYWORD: &str = "variable";

/// Keyword introducing an output declaration.
pub const OUTPUT_KEYWORD: &str = "output";

/// Recognizes `default = ...` as an empty collection, a bracketed or braced
/// (possibly multi-line) literal, or a single-line scalar or expression.
const DEFAULT_PATTERN: &str =
    r"\bdefault\s*=\s*(?:\[\]|\{\}|\[[\s\S]*?\]|\{[\s\S]*?\}|[^}\n]+)";

/// One declaration found in a file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeclaredSymbol {
    /// The quoted identifier.
    pub name: String,
    /// Whether the body assigns a recognizable default.
    pub has_default: bool,
}

impl DeclaredSymbol {
    /// Creates a new declared symbol.
    #[must_use]
    pub fn new(name: impl Into<String>, has_default: bool) -> Self {
        Self {
            name: name.into(),
            has_default,
        }
    }
}

/// The declarations found in one file.
///
/// Names are unique; when a name recurs the last block wins and the name is
/// remembered in `duplicates`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    found: BTreeMap<String, DeclaredSymbol>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    duplicates: BTreeSet<String>,
}

impl ExtractionResult {
    /// Creates an empty result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a symbol, replacing an earlier one with the same name.
    pub fn insert(&mut self, symbol: DeclaredSymbol) {
        if let Some(previous) = self.found.insert(symbol.name.clone(), symbol) {
            self.duplicates.insert(previous.name);
        }
    }

    /// Returns true if the name was declared.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.found.contains_key(name)
    }

    /// Returns the symbol for a name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DeclaredSymbol> {
        self.found.get(name)
    }

    /// Returns true if the name was declared with a recognizable default.
    #[must_use]
    pub fn has_default(&self, name: &str) -> bool {
        self.found.get(name).is_some_and(|s| s.has_default)
    }

    /// Iterates symbols in name order.
    pub fn symbols(&self) -> impl Iterator<Item = &DeclaredSymbol> {
        self.found.values()
    }

    /// Iterates declared names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.found.keys().map(String::as_str)
    }

    /// Names declared more than once.
    #[must_use]
    pub fn duplicates(&self) -> &BTreeSet<String> {
        &self.duplicates
    }

    /// Number of distinct declarations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.found.len()
    }

    /// Returns true if nothing was declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.found.is_empty()
    }
}

impl FromIterator<DeclaredSymbol> for ExtractionResult {
    fn from_iter<I: IntoIterator<Item = DeclaredSymbol>>(iter: I) -> Self {
        let mut result = Self::new();
        for symbol in iter {
            result.insert(symbol);
        }
        result
    }
}

/// Scans declaration text for one kind of named block.
#[derive(Debug, Clone)]
pub struct ContractExtractor {
    keyword: String,
    header: Regex,
    default: Regex,
}

impl ContractExtractor {
    /// Creates an extractor for blocks introduced by `keyword`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPattern` if the block pattern fails to compile.
    pub fn new(keyword: &str) -> Result<Self, ModgateError> {
        let header_pattern = format!(r#"\b{}\s+"([^"]+)"\s*\{{"#, regex::escape(keyword));
        let header =
            Regex::new(&header_pattern).map_err(|e| ModgateError::pattern(&header_pattern, e))?;
        let default =
            Regex::new(DEFAULT_PATTERN).map_err(|e| ModgateError::pattern(DEFAULT_PATTERN, e))?;
        Ok(Self {
            keyword: keyword.to_string(),
            header,
            default,
        })
    }

    /// Extractor for `variable` blocks.
    pub fn inputs() -> Result<Self, ModgateError> {
        Self::new(INPUT_KEYWORD)
    }

    /// Extractor for `output` blocks.
    pub fn outputs() -> Result<Self, ModgateError> {
        Self::new(OUTPUT_KEYWORD)
    }

    /// The block keyword.
    #[must_use]
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Finds every non-overlapping block in `text`.
    #[must_use]
    pub fn extract(&self, text: &str) -> ExtractionResult {
        let mut result = ExtractionResult::new();
        let mut pos = 0;

        while let Some(caps) = self.header.captures_at(text, pos) {
            let Some(whole) = caps.get(0) else { break };
            let name = caps.get(1).map_or("", |m| m.as_str());
            // The header match ends just past the opening brace.
            let (body, end) = block_body(text, whole.end());
            result.insert(DeclaredSymbol::new(name, self.default.is_match(body)));
            pos = end.max(whole.end());
        }

        result
    }

    /// Reads and scans a declarations file.
    ///
    /// Returns `Ok(None)` when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns `DeclarationsUnreadable` if the file exists but cannot be read.
    pub fn extract_file(&self, path: &Path) -> Result<Option<ExtractionResult>, ModgateError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(Some(self.extract(&text))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ModgateError::DeclarationsUnreadable {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

/// Returns the body starting at `start` (just after an opening brace) up to
/// its matching closing brace, and the offset after that brace.
///
/// Braces inside double-quoted strings and comments (`#`, `//`, `/* */`) are
/// ignored. An unterminated block extends to the end of the text.
fn block_body(text: &str, start: usize) -> (&str, usize) {
    let bytes = text.as_bytes();
    let mut depth = 1usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut i = start;

    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
        } else {
            match b {
                b'"' => in_string = true,
                b'#' => i = line_end(bytes, i),
                b'/' if bytes.get(i + 1) == Some(&b'/') => i = line_end(bytes, i),
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    i = text[i + 2..]
                        .find("*/")
                        .map_or(bytes.len(), |offset| i + 2 + offset + 1);
                }
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return (&text[start..i], i + 1);
                    }
                }
                _ => {}
            }
        }
        i += 1;
    }

    (&text[start..], text.len())
}

/// Offset of the newline ending the line that contains `from`.
fn line_end(bytes: &[u8], from: usize) -> usize {
    bytes[from..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |offset| from + offset)
}
