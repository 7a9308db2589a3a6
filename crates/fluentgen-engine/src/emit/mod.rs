//! Emission backends
//!
//! Synthesized types carry backend-independent instruction bodies
//! ([`Instr`]). A [`Backend`] lowers a build's types plus its metadata into a
//! concrete output: [`ArtifactBackend`] produces a loadable binary artifact,
//! [`ListingBackend`] a human-readable source-style listing.

mod artifact;
mod backend;
mod instr;
mod listing;

pub use artifact::ArtifactBackend;
pub use backend::{ArtifactMetadata, Backend};
pub use instr::{Body, BodyBuilder, FieldRef, Instr, MethodRef, CONSTRUCTOR, ROOT_OBJECT};
pub use listing::ListingBackend;
