use std::fmt;

/// Machine-readable error codes for scripted consumers of the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    InputRead,
    InvalidParameter,
    UnknownNodeId,
    GraphTooLarge,
    InconsistentGraph,
    CacheCorrupt,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::InputRead => "E1002",
            Self::InvalidParameter => "E2001",
            Self::UnknownNodeId => "E2002",
            Self::GraphTooLarge => "E2003",
            Self::InconsistentGraph => "E2004",
            Self::CacheCorrupt => "E3001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::InputRead => "Input stream could not be read",
            Self::InvalidParameter => "Invalid parameter",
            Self::UnknownNodeId => "Node id not present in index",
            Self::GraphTooLarge => "Too many distinct pages for 32-bit node ids",
            Self::InconsistentGraph => "Inconsistent link graph structure",
            Self::CacheCorrupt => "Corrupt graph cache entry",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in wikirank.toml and retry."),
            Self::InputRead => Some("Check the input path; decompress .bz2 dumps first."),
            Self::InvalidParameter => {
                Some("Use 0 < damping < 1, max_iter >= 1, a positive tolerance and a positive limit.")
            }
            Self::UnknownNodeId | Self::InconsistentGraph => None,
            Self::GraphTooLarge => Some("Rerun with --limit to bound the ingested edges."),
            Self::CacheCorrupt => Some("Delete the cache directory or rerun with --no-cache."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors raised by the ranking core.
///
/// Malformed input lines and non-convergence are deliberately absent: the
/// former are counted and skipped, the latter is reported on the result.
#[derive(Debug, thiserror::Error)]
pub enum RankError {
    /// A caller-supplied parameter is outside its valid range.
    #[error("invalid parameter `{name}` = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: &'static str,
    },

    /// A node id has no entry in the [`crate::graph::NameIndex`].
    #[error("node id {id} is out of range for an index of {len} names")]
    UnknownNodeId { id: usize, len: usize },

    /// Every [`crate::graph::NodeId`] is already allocated.
    #[error("node id space exhausted after {len} names")]
    IdSpaceExhausted { len: usize },

    /// A deserialized graph violates the CSR layout or disagrees with its index.
    #[error("inconsistent link graph: {0}")]
    InconsistentGraph(String),

    /// Reading the underlying triple stream failed.
    #[error("failed to read input stream: {0}")]
    Io(#[from] std::io::Error),
}

impl RankError {
    /// Shorthand used by parameter validation.
    pub fn invalid(name: &'static str, value: impl fmt::Display, reason: &'static str) -> Self {
        Self::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Map this error onto its stable [`ErrorCode`].
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidParameter { .. } => ErrorCode::InvalidParameter,
            Self::UnknownNodeId { .. } => ErrorCode::UnknownNodeId,
            Self::IdSpaceExhausted { .. } => ErrorCode::GraphTooLarge,
            Self::InconsistentGraph(_) => ErrorCode::InconsistentGraph,
            Self::Io(_) => ErrorCode::InputRead,
        }
    }
}
