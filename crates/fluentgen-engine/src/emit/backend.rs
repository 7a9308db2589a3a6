//! Backend trait

use crate::error::SynthesisResult;
use crate::synth::SynthesizedType;
use std::sync::Arc;

/// Descriptive metadata attached once per build
pub use fluentgen_artifact::Metadata as ArtifactMetadata;

/// Lowers synthesized types into a concrete output
///
/// `types` is ordered dependencies first and holds every type of the build
/// exactly once.
pub trait Backend {
    /// What the backend produces
    type Output;

    /// Lower metadata and types
    fn lower(&self, metadata: &ArtifactMetadata, types: &[Arc<SynthesizedType>]) -> SynthesisResult<Self::Output>;
}
