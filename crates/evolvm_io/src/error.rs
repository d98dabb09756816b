//! Error types for genome import and export.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IoError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("archive error: {0}")]
    Archive(String),

    #[error("file system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("line {line}: unknown instruction '{name}'")]
    UnknownInstruction { line: usize, name: String },

    #[error("{0} holds no instructions")]
    Empty(&'static str),

    /// A memory space whose flag array does not cover its instructions.
    #[error("{instructions} instructions but {flags} flag bytes")]
    FlagMismatch { instructions: usize, flags: usize },

    #[error("malformed input: {0}")]
    Malformed(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{context}: {source}")]
    Context {
        context: String,
        source: Box<IoError>,
    },
}

pub type Result<T> = std::result::Result<T, IoError>;

impl IoError {
    #[must_use]
    pub fn archive<S: Into<String>>(msg: S) -> Self {
        Self::Archive(msg.into())
    }

    #[must_use]
    pub fn malformed<S: Into<String>>(msg: S) -> Self {
        Self::Malformed(msg.into())
    }

    #[must_use]
    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        Self::NotFound(resource.into())
    }

    /// Maps a read failure on `path`, keeping a missing file distinct.
    #[must_use]
    pub fn reading(err: std::io::Error, what: &str, path: &std::path::Path) -> Self {
        let context = format!("reading {what} {}", path.display());
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::not_found(path.display().to_string()).with_context(context)
        } else {
            Self::FileSystem(err).with_context(context)
        }
    }

    #[must_use]
    pub fn with_context<S: Into<String>>(self, context: S) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error under any context wrappers.
    #[must_use]
    pub fn root(&self) -> &IoError {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }
}
