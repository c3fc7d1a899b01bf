pub mod ast;
pub mod cache;
pub mod matcher;
pub mod parser;
pub mod validator;
