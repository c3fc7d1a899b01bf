use fst::automaton::{Automaton, Str};
use fst::{IntoStreamer, Set, Streamer};
use regex::Regex;
use crate::core::error::{Error, Result};

/// Wildcard pattern where `*` matches any run of characters and `?` exactly one
#[derive(Debug, Clone)]
pub struct WildcardPattern {
    source: String,
    literal_prefix: String,
    regex: Regex,
}

impl WildcardPattern {
    pub fn compile(pattern: &str) -> Result<Self> {
        let literal_prefix: String = pattern
            .chars()
            .take_while(|c| *c != '*' && *c != '?')
            .collect();

        let mut expr = String::with_capacity(pattern.len() + 8);
        expr.push('^');
        for c in pattern.chars() {
            match c {
                '*' => expr.push_str(".*"),
                '?' => expr.push('.'),
                other => expr.push_str(&regex::escape(other.encode_utf8(&mut [0u8; 4]))),
            }
        }
        expr.push('$');

        let regex = Regex::new(&expr)
            .map_err(|e| Error::query_syntax("constraint", format!("invalid wildcard '{}': {}", pattern, e)))?;

        Ok(WildcardPattern {
            source: pattern.to_string(),
            literal_prefix,
            regex,
        })
    }

    pub fn is_match(&self, term: &str) -> bool {
        self.regex.is_match(term)
    }

    pub fn literal_prefix(&self) -> &str {
        &self.literal_prefix
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn has_wildcards(pattern: &str) -> bool {
        pattern.contains('*') || pattern.contains('?')
    }
}

/// Sorted, immutable term set of one field, built once per snapshot.
///
/// Wildcard expansion walks only the terms sharing the pattern's literal
/// prefix and confirms each candidate against the full pattern.
pub struct TermDictionary {
    set: Set<Vec<u8>>,
}

impl TermDictionary {
    /// `terms` must be sorted and free of duplicates
    pub fn build<'a, I>(terms: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let set = Set::from_iter(terms.into_iter().map(|t| t.as_bytes()))
            .map_err(|e| Error::index_unavailable(format!("term dictionary build failed: {}", e)))?;
        Ok(TermDictionary { set })
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn contains(&self, term: &str) -> bool {
        self.set.contains(term)
    }

    pub fn expand(&self, pattern: &WildcardPattern) -> Vec<String> {
        let automaton = Str::new(pattern.literal_prefix()).starts_with();
        let mut stream = self.set.search(automaton).into_stream();

        let mut matches = Vec::new();
        while let Some(term_bytes) = stream.next() {
            if let Ok(term) = std::str::from_utf8(term_bytes) {
                if pattern.is_match(term) {
                    matches.push(term.to_string());
                }
            }
        }
        matches
    }
}

impl std::fmt::Debug for TermDictionary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TermDictionary").field("terms", &self.set.len()).finish()
    }
}
