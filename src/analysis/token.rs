use serde::{Serialize, Deserialize};

/// Token produced by a tokenizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub position: u32,     // Ordinal within the analyzed value
    pub offset: usize,     // Byte offset in original text
}

impl Token {
    pub fn new(text: String, position: u32, offset: usize) -> Self {
        Token { text, position, offset }
    }
}
