use std::collections::HashMap;
use std::sync::Arc;
use parking_lot::RwLock;
use crate::analysis::filter::{LowercaseFilter, TokenFilter, TrimFilter};
use crate::analysis::token::Token;
use crate::analysis::tokenizer::{KeywordTokenizer, StandardTokenizer, Tokenizer};
use crate::core::error::{Error, ErrorKind, Result};

pub const STANDARD_ANALYZER: &str = "standard";
pub const KEYWORD_ANALYZER: &str = "keyword";

/// Text analysis pipeline
pub struct Analyzer {
    pub tokenizer: Box<dyn Tokenizer>,
    pub filters: Vec<Box<dyn TokenFilter>>,
    pub name: String,
}

impl Analyzer {
    pub fn new(name: String, tokenizer: Box<dyn Tokenizer>) -> Self {
        Analyzer {
            tokenizer,
            filters: Vec::new(),
            name,
        }
    }

    pub fn add_filter(mut self, filter: Box<dyn TokenFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn analyze(&self, text: &str) -> Vec<Token> {
        let mut tokens = self.tokenizer.tokenize(text);

        for filter in &self.filters {
            tokens = filter.filter(tokens);
        }

        tokens
    }

    /// Term texts only, in token order
    pub fn terms(&self, text: &str) -> Vec<String> {
        self.analyze(text).into_iter().map(|t| t.text).collect()
    }

    /// Word-split, lowercased; used for free-text fields
    pub fn standard() -> Self {
        Analyzer::new(STANDARD_ANALYZER.to_string(),
                      Box::new(StandardTokenizer::default()))
            .add_filter(Box::new(LowercaseFilter))
    }

    /// Whole value as one exact, case-sensitive term; used for identifiers and codes
    pub fn keyword() -> Self {
        Analyzer::new(KEYWORD_ANALYZER.to_string(), Box::new(KeywordTokenizer))
            .add_filter(Box::new(TrimFilter))
    }
}

/// Registry for managing analyzers
pub struct AnalyzerRegistry {
    analyzers: RwLock<HashMap<String, Arc<Analyzer>>>,
}

impl AnalyzerRegistry {
    pub fn new() -> Self {
        let registry = AnalyzerRegistry {
            analyzers: RwLock::new(HashMap::new()),
        };

        registry.register(STANDARD_ANALYZER, Analyzer::standard());
        registry.register(KEYWORD_ANALYZER, Analyzer::keyword());
        registry
    }

    pub fn register(&self, name: &str, analyzer: Analyzer) {
        self.analyzers.write().insert(name.to_string(), Arc::new(analyzer));
    }

    pub fn get(&self, name: &str) -> Option<Arc<Analyzer>> {
        self.analyzers.read().get(name).cloned()
    }

    pub fn require(&self, name: &str) -> Result<Arc<Analyzer>> {
        self.get(name).ok_or_else(|| {
            Error::new(ErrorKind::NotFound, format!("Analyzer '{}' not found", name))
        })
    }

    pub fn analyze(&self, analyzer_name: &str, text: &str) -> Result<Vec<Token>> {
        self.require(analyzer_name).map(|analyzer| analyzer.analyze(text))
    }
}

impl Default for AnalyzerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_lowercases() {
        let analyzer = Analyzer::standard();
        assert_eq!(analyzer.terms("Ocean TEMPERATURE"), vec!["ocean", "temperature"]);
    }

    #[test]
    fn test_keyword_is_case_sensitive() {
        let analyzer = Analyzer::keyword();
        assert_eq!(analyzer.terms("Dataset"), vec!["Dataset"]);
        assert_eq!(analyzer.terms(" Dataset  "), vec!["Dataset"]);
        assert!(analyzer.terms("   ").is_empty());
    }

    #[test]
    fn test_registry_unknown_analyzer() {
        let registry = AnalyzerRegistry::new();
        let err = registry.analyze("french", "bonjour").unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert!(registry.get(STANDARD_ANALYZER).is_some());
    }
}
