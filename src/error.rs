use std::path::PathBuf;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for resolution and sampling
#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),
    ParseError { file: PathBuf, message: String },
    /// No declared path template matches the request, or the method is not declared
    /// under any matching template. Carries every `METHOD PATH` pair of the document.
    EndpointNotFound { available: Vec<String> },
    /// The request path cannot be mapped to an API document.
    InvalidRequestPath(String),
    /// None of the preferred status codes is declared for the operation.
    NoStatusDefined { path: String, method: String },
    /// A `$ref` chain revisited a `file#pointer` node already on the chain.
    CircularReference { chain: Vec<String> },
    /// Resolution nested deeper than the configured limit.
    DepthLimitExceeded { limit: usize },
    FileNotFound(PathBuf),
    MalformedPointer(String),
}

/// Outward-facing error classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Maps to HTTP 404
    NotFound,
    /// Maps to HTTP 500
    Internal,
}

impl Error {
    /// Classifies the error into the two classes callers report.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::EndpointNotFound { .. } | Error::InvalidRequestPath(_) => ErrorKind::NotFound,
            _ => ErrorKind::Internal,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "IO error: {}", e),
            Error::ParseError { file, message } => {
                write!(f, "Failed to parse {}: {}", file.display(), message)
            }
            Error::EndpointNotFound { available } => {
                write!(
                    f,
                    "Endpoint not found.\n\nThe list of available APIs:\n{}",
                    available.join("\n")
                )
            }
            Error::InvalidRequestPath(path) => write!(f, "URL parse error: {}", path),
            Error::NoStatusDefined { path, method } => write!(
                f,
                "Status code is required: no supported status defined for {} {}",
                method.to_uppercase(),
                path
            ),
            Error::CircularReference { chain } => {
                write!(f, "Circular $ref detected: {}", chain.join(" -> "))
            }
            Error::DepthLimitExceeded { limit } => {
                write!(f, "Reference resolution exceeded depth limit of {}", limit)
            }
            Error::FileNotFound(path) => write!(f, "File not found: {}", path.display()),
            Error::MalformedPointer(value) => write!(f, "Malformed $ref: {}", value),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}
