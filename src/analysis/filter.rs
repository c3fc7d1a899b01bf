use crate::analysis::token::Token;

pub trait TokenFilter: Send + Sync {
    fn filter(&self, tokens: Vec<Token>) -> Vec<Token>;

    fn name(&self) -> &str;
}

/// Unicode lowercase folding, for case-insensitive matching
pub struct LowercaseFilter;

impl TokenFilter for LowercaseFilter {
    fn filter(&self, tokens: Vec<Token>) -> Vec<Token> {
        tokens.into_iter()
            .map(|mut token| {
                if token.text.chars().any(char::is_uppercase) {
                    token.text = token.text.to_lowercase();
                }
                token
            })
            .collect()
    }

    fn name(&self) -> &str {
        "lowercase"
    }
}

/// Strips surrounding whitespace and drops tokens left empty
pub struct TrimFilter;

impl TokenFilter for TrimFilter {
    fn filter(&self, tokens: Vec<Token>) -> Vec<Token> {
        tokens.into_iter()
            .filter_map(|mut token| {
                let trimmed = token.text.trim();
                if trimmed.is_empty() {
                    return None;
                }
                if trimmed.len() != token.text.len() {
                    token.offset += token.text.len() - token.text.trim_start().len();
                    token.text = trimmed.to_string();
                }
                Some(token)
            })
            .collect()
    }

    fn name(&self) -> &str {
        "trim"
    }
}
