//! Error taxonomy shared by the `gh` layer and the HTTP handlers.

use thiserror::Error;

/// Errors surfaced while talking to `gh` or shaping its output.
///
/// A pull request that does not exist upstream is not an error: the fetcher
/// returns `Ok(None)` so one inaccessible PR never breaks the page.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    /// The `gh` subprocess could not be spawned or exited non-zero.
    #[error("`gh {command}` failed: {message}")]
    ExternalTool {
        /// Subcommand that was run, e.g. `pr list`.
        command: String,
        /// Captured stderr, or the spawn error when `gh` is missing.
        message: String,
    },

    /// The working directory is not a repository `gh` recognises.
    #[error("could not resolve the current repository: {message}")]
    RepositoryResolution {
        /// Details from `gh` or the parser.
        message: String,
    },

    /// The lifecycle-state filter was not one of open, closed, merged, all.
    #[error("invalid pull request state '{value}' (expected open, closed, merged or all)")]
    InvalidState {
        /// The rejected input.
        value: String,
    },

    /// The PR number in the request path is not a positive 32-bit integer.
    #[error("invalid pull request number '{value}'")]
    InvalidPrNumber {
        /// The rejected path segment.
        value: String,
    },

    /// The GraphQL call failed or returned something we could not parse.
    #[error("failed to fetch review comments: {message}")]
    DataFetch {
        /// Details from `gh`, GitHub or the parser.
        message: String,
    },
}

impl Error {
    /// Short human heading used on the error page.
    pub fn title(&self) -> &'static str {
        match self {
            Error::ExternalTool { .. } => "GitHub CLI error",
            Error::RepositoryResolution { .. } => "Repository not found",
            Error::InvalidState { .. } => "Invalid filter",
            Error::InvalidPrNumber { .. } => "Invalid pull request",
            Error::DataFetch { .. } => "Could not load comments",
        }
    }

    /// Whether the failure was caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidState { .. } | Error::InvalidPrNumber { .. }
        )
    }
}
