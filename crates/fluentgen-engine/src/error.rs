//! Error types for synthesis and builds

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while synthesizing types or running a build
///
/// The type is `Clone` so a single captured error can be stored in a
/// [`BuildResult`](crate::BuildResult), handed to event subscribers and
/// returned to the caller.
#[derive(Debug, Clone, Error)]
pub enum SynthesisError {
    /// Invalid engine configuration or build request
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Another build is already running on this engine
    #[error("A build is already in progress")]
    ConcurrentBuild,

    /// A member's type could not be made self-contained
    #[error("Cannot dereference member {owner}.{member} of type {ty}: {reason}")]
    Dereference {
        /// Canonical name of the declaring type
        owner: String,
        /// Member name
        member: String,
        /// Declared member type
        ty: String,
        /// Underlying cause
        reason: String,
    },

    /// Output path exists and overwriting was not requested
    #[error("Artifact already exists: {}", .0.display())]
    ArtifactExists(PathBuf),

    /// Deleting or writing the output failed
    #[error("Cannot write artifact {}: {source}", path.display())]
    ArtifactWrite {
        /// Output path
        path: PathBuf,
        /// I/O failure
        #[source]
        source: Arc<io::Error>,
    },

    /// None of the requested types produced a fluent wrapper
    #[error("No type was produced ({requested} requested)")]
    EmptyResult {
        /// Number of types requested
        requested: usize,
    },

    /// A named type is not in the source catalog
    #[error("Unknown type: {0}")]
    UnknownType(String),

    /// A configured name is empty after sanitisation
    #[error("Invalid name: {0:?}")]
    InvalidName(String),

    /// The session was cancelled while waiting for a cache entry
    #[error("Build cancelled")]
    Cancelled,

    /// An in-progress cache entry was not completed in time
    #[error("Timed out after {waited:?} waiting for {name}")]
    WaitTimeout {
        /// Cache key waited on
        name: String,
        /// Time spent waiting
        waited: Duration,
    },

    /// The producer of an awaited cache entry failed
    #[error("Synthesis of {name} failed: {reason}")]
    DependencyFailed {
        /// Cache key waited on
        name: String,
        /// Producer's error message
        reason: String,
    },

    /// A backend could not lower the synthesized types
    #[error("Lowering failed: {0}")]
    Lowering(String),
}

impl SynthesisError {
    /// Wrap an I/O failure on the output path
    pub fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::ArtifactWrite {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    /// Check if this is one of the errors a build reports in its result
    /// rather than a failure of an individual type
    pub fn is_build_level(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_)
                | Self::ConcurrentBuild
                | Self::ArtifactExists(_)
                | Self::ArtifactWrite { .. }
                | Self::EmptyResult { .. }
                | Self::Lowering(_)
        )
    }
}

/// Result alias for synthesis operations
pub type SynthesisResult<T> = Result<T, SynthesisError>;
