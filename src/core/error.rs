use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed filter expression, sort or paging parameter
    QuerySyntax,
    /// Record rejected by the writer (empty identifier, bad typed value)
    InvalidRecord,
    /// Index storage could not be read or written
    IndexUnavailable,
    /// A federated catalog failed or timed out
    RemoteEndpointFailure,
    InvalidConfig,
    NotFound,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
    /// Request parameter the error refers to, when there is one
    pub parameter: Option<String>,
}

impl Error {
    pub fn new(kind: ErrorKind, context: String) -> Self {
        Error { kind, context, parameter: None }
    }

    pub fn query_syntax(parameter: &str, context: impl Into<String>) -> Self {
        Error {
            kind: ErrorKind::QuerySyntax,
            context: context.into(),
            parameter: Some(parameter.to_string()),
        }
    }

    pub fn invalid_record(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::InvalidRecord, context.into())
    }

    pub fn index_unavailable(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::IndexUnavailable, context.into())
    }

    pub fn remote_endpoint(endpoint: &str, context: impl Into<String>) -> Self {
        Error {
            kind: ErrorKind::RemoteEndpointFailure,
            context: format!("endpoint '{}': {}", endpoint, context.into()),
            parameter: None,
        }
    }

    pub fn invalid_config(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::InvalidConfig, context.into())
    }

    pub fn is_query_syntax(&self) -> bool {
        self.kind == ErrorKind::QuerySyntax
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.parameter {
            Some(param) => write!(f, "{:?} ({}): {}", self.kind, param, self.context),
            None => write!(f, "{:?}: {}", self.kind, self.context),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::new(ErrorKind::IndexUnavailable, err.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::new(ErrorKind::IndexUnavailable, format!("snapshot encoding: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_names_parameter() {
        let err = Error::query_syntax("constraint", "unbalanced bracket");
        assert!(err.is_query_syntax());
        assert_eq!(err.parameter.as_deref(), Some("constraint"));
        assert_eq!(err.to_string(), "QuerySyntax (constraint): unbalanced bracket");
    }

    #[test]
    fn test_io_error_is_index_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io.into();
        assert_eq!(err.kind, ErrorKind::IndexUnavailable);
        assert!(err.parameter.is_none());
    }

    #[test]
    fn test_remote_error_mentions_endpoint() {
        let err = Error::remote_endpoint("nasa", "timed out");
        assert_eq!(err.kind, ErrorKind::RemoteEndpointFailure);
        assert!(err.to_string().contains("nasa"));
    }
}
