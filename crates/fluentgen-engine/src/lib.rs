//! Fluentgen Engine
//!
//! Given descriptors of existing types, this crate synthesizes for each one
//! an abstract interface, a sealed proxy implementing it and a fluent
//! wrapper whose setters return the wrapper itself, then lowers everything
//! into a single self-contained artifact.
//!
//! # Pipeline
//!
//! ```text
//! TypeDescriptor -> extract -> dereference -> interface / proxy / fluent
//!                                                 |
//!                                     TypeCache (per Session)
//!                                                 |
//!                                  Backend (artifact or listing)
//! ```
//!
//! Member types pointing at other source types are rewritten to synthesized
//! interfaces (classes), clones (structs and enums) or left untouched
//! (runtime types), so the artifact has no dependency on the source types.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod cache;
pub mod config;
pub mod descriptor;
pub mod driver;
pub mod emit;
pub mod error;
pub mod extract;
pub mod plan;
pub mod session;
pub mod synth;

pub use cache::{CacheKey, TypeCache};
pub use config::{sanitize_name, EngineOptions};
pub use descriptor::{
    DescriptorKind, Literal, MemberDescriptor, Origin, PrimitiveType, QualifiedName, SourceCatalog,
    TypeDescriptor, TypeOptions, TypeRef, Visibility,
};
pub use driver::{BuildRequest, BuildResult, DeleteConflict, Engine, SubscriptionId};
pub use emit::{ArtifactBackend, ArtifactMetadata, Backend, ListingBackend};
pub use error::{SynthesisError, SynthesisResult};
pub use plan::BuildPlan;
pub use session::Session;
pub use synth::{SynthKind, Synthesized, SynthesizedType, Synthesizer};
