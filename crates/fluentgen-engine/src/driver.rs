//! Emission driver
//!
//! An [`Engine`] runs one build at a time: it synthesizes every requested
//! type through a [`Synthesizer`], lowers the session's types to an
//! artifact and writes it to disk. Every outcome, including failures, is
//! reported as a [`BuildResult`].

use crate::config::EngineOptions;
use crate::descriptor::{QualifiedName, SourceCatalog};
use crate::emit::{ArtifactBackend, ArtifactMetadata, Backend};
use crate::error::{SynthesisError, SynthesisResult};
use crate::session::Session;
use crate::synth::Synthesizer;
use fluentgen_artifact::artifact::FILE_EXTENSION;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Identifies an event subscription
pub type SubscriptionId = u64;

type CriticalErrorHandler = Arc<dyn Fn(&SynthesisError) + Send + Sync>;
type DeleteConflictHandler = Arc<dyn Fn(&DeleteConflict) + Send + Sync>;

/// Payload of the delete-conflict event
#[derive(Debug, Clone)]
pub struct DeleteConflict {
    /// Existing output file that could not be deleted
    pub path: PathBuf,
    /// The failure
    pub error: SynthesisError,
}

/// What to build
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Every type the scanner knows about
    pub catalog: SourceCatalog,
    /// Types to synthesize, in order
    pub types: Vec<QualifiedName>,
    /// Output path; computed from the artifact name when absent
    pub path: Option<PathBuf>,
    /// Metadata; an empty name is replaced by the default artifact name
    pub metadata: ArtifactMetadata,
}

impl BuildRequest {
    /// Request with no types selected
    pub fn new(catalog: SourceCatalog) -> Self {
        Self {
            catalog,
            types: Vec::new(),
            path: None,
            metadata: ArtifactMetadata::default(),
        }
    }

    /// Request selecting every class, interface and struct not shipped with the runtime
    pub fn all(catalog: SourceCatalog) -> Self {
        let types = catalog
            .iter()
            .filter(|t| is_candidate(t))
            .map(|t| t.name.clone())
            .collect();
        Self {
            types,
            ..Self::new(catalog)
        }
    }

    /// Builder-style method to select a type
    pub fn with_type(mut self, canonical: &str) -> Self {
        self.types.push(QualifiedName::parse(canonical));
        self
    }

    /// Builder-style method to set the output path
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Builder-style method to set the metadata
    pub fn with_metadata(mut self, metadata: ArtifactMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Check if a descriptor can be selected for synthesis
pub(crate) fn is_candidate(ty: &crate::descriptor::TypeDescriptor) -> bool {
    !ty.is_runtime() && !matches!(ty.kind, crate::descriptor::DescriptorKind::Enum { .. })
}

/// Outcome of a build
///
/// Success is read from `succeeded`; `path` is set only on success.
#[derive(Debug, Clone, Default)]
pub struct BuildResult {
    /// Whether an artifact was written
    pub succeeded: bool,
    /// Path of the written artifact
    pub path: Option<PathBuf>,
    /// Error that ended the build
    pub error: Option<SynthesisError>,
    /// Number of types requested
    pub types_requested: usize,
    /// Number of requested types that produced a fluent wrapper
    pub types_produced: usize,
    /// Canonical names of every type in the artifact
    pub synthesized: Vec<String>,
    /// Metadata written to the artifact, with defaults filled in
    pub metadata: Option<ArtifactMetadata>,
}

impl BuildResult {
    fn failed(types_requested: usize, error: SynthesisError) -> Self {
        Self {
            types_requested,
            error: Some(error),
            ..Self::default()
        }
    }

    /// Human-readable summary
    pub fn message(&self) -> String {
        match (&self.error, &self.path) {
            (Some(err), _) => format!("Build failed: {}", err),
            (None, Some(path)) => format!(
                "Built {} of {} types ({} synthesized) into {}",
                self.types_produced,
                self.types_requested,
                self.synthesized.len(),
                path.display()
            ),
            (None, None) => "No build has run".to_string(),
        }
    }
}

/// Resets the busy flag when a build ends
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs builds, one at a time
pub struct Engine {
    options: EngineOptions,
    busy: AtomicBool,
    next_subscription: AtomicU64,
    critical_error: Mutex<Vec<(SubscriptionId, CriticalErrorHandler)>>,
    delete_conflict: Mutex<Vec<(SubscriptionId, DeleteConflictHandler)>>,
    session: Mutex<Option<Arc<Session>>>,
}

impl Engine {
    /// Create an engine, validating and sanitising the options
    pub fn new(options: EngineOptions) -> SynthesisResult<Self> {
        Ok(Self {
            options: options.validate()?,
            busy: AtomicBool::new(false),
            next_subscription: AtomicU64::new(1),
            critical_error: Mutex::new(Vec::new()),
            delete_conflict: Mutex::new(Vec::new()),
            session: Mutex::new(None),
        })
    }

    /// Options in effect
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Check if a build is running
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Session of the running or most recent build
    pub fn session(&self) -> Option<Arc<Session>> {
        self.session.lock().clone()
    }

    /// Cancel the running build's session, releasing its cache waiters
    pub fn cancel(&self) {
        if let Some(session) = self.session() {
            session.cancel();
        }
    }

    /// Discard the retained session
    pub fn reset(&self) -> SynthesisResult<()> {
        let _busy = BusyGuard::acquire(&self.busy).ok_or(SynthesisError::ConcurrentBuild)?;
        *self.session.lock() = None;
        Ok(())
    }

    // ===== Events =====

    /// Subscribe to errors that end a build
    pub fn subscribe_critical_error<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&SynthesisError) + Send + Sync + 'static,
    {
        let id = self.next_subscription.fetch_add(1, Ordering::Relaxed);
        self.critical_error.lock().push((id, Arc::new(handler)));
        id
    }

    /// Subscribe to failures to delete an existing output file
    pub fn subscribe_delete_conflict<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&DeleteConflict) + Send + Sync + 'static,
    {
        let id = self.next_subscription.fetch_add(1, Ordering::Relaxed);
        self.delete_conflict.lock().push((id, Arc::new(handler)));
        id
    }

    /// Remove a subscription; returns whether it existed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut critical = self.critical_error.lock();
        let before = critical.len();
        critical.retain(|(sid, _)| *sid != id);
        if critical.len() != before {
            return true;
        }
        drop(critical);

        let mut conflicts = self.delete_conflict.lock();
        let before = conflicts.len();
        conflicts.retain(|(sid, _)| *sid != id);
        conflicts.len() != before
    }

    fn notify_critical(&self, err: &SynthesisError) {
        // Handlers run outside the lock so they may (un)subscribe
        let handlers: Vec<CriticalErrorHandler> = self.critical_error.lock().iter().map(|(_, h)| h.clone()).collect();
        for handler in handlers {
            handler(err);
        }
    }

    fn notify_delete_conflict(&self, conflict: &DeleteConflict) {
        let handlers: Vec<DeleteConflictHandler> = self.delete_conflict.lock().iter().map(|(_, h)| h.clone()).collect();
        for handler in handlers {
            handler(conflict);
        }
    }

    // ===== Builds =====

    /// Run a build in a fresh session
    pub fn build(&self, request: BuildRequest) -> BuildResult {
        let session = Arc::new(Session::new(self.options.wait_timeout()));
        self.build_in_session(request, session)
    }

    /// Run a build in a caller-supplied session
    ///
    /// Types already in the session's cache are reused. The artifact holds
    /// only the types reachable from this build's wrappers, so leftovers of
    /// an earlier failed build in the same session are not written.
    pub fn build_in_session(&self, request: BuildRequest, session: Arc<Session>) -> BuildResult {
        let requested = request.types.len();
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            warn!("build rejected: another build is in progress");
            return BuildResult::failed(requested, SynthesisError::ConcurrentBuild);
        };

        *self.session.lock() = Some(session.clone());
        info!(session = %session.id(), requested, "build started");

        match self.run(&request, &session) {
            Ok(result) => {
                info!(
                    produced = result.types_produced,
                    requested,
                    synthesized = result.synthesized.len(),
                    "build finished"
                );
                result
            }
            Err(err) => {
                error!(error = %err, "build failed");
                self.notify_critical(&err);
                BuildResult::failed(requested, err)
            }
        }
    }

    fn run(&self, request: &BuildRequest, session: &Session) -> SynthesisResult<BuildResult> {
        if request.types.is_empty() {
            return Err(SynthesisError::Configuration("no types selected".to_string()));
        }

        let synth = Synthesizer::new(&request.catalog, &self.options, session);
        let mut roots: Vec<QualifiedName> = Vec::new();
        let mut produced = 0;
        for name in &request.types {
            let source = request.catalog.require(name)?;
            match synth.synthesize(source)? {
                Some(types) => {
                    debug!(source = %name, fluent = %types.fluent.name, "type produced");
                    roots.extend([&types.interface, &types.proxy, &types.fluent].map(|t| t.name.clone()));
                    produced += 1;
                }
                None => debug!(source = %name, "no type produced"),
            }
        }

        if produced == 0 {
            warn!(requested = request.types.len(), "no type was produced");
            return Err(SynthesisError::EmptyResult {
                requested: request.types.len(),
            });
        }

        let types = session.closure(&roots);
        let metadata = self.metadata_for(request)?;
        let runtime = request.catalog.iter().filter(|t| t.is_runtime()).map(|t| t.canonical());
        let artifact = ArtifactBackend::new()
            .with_runtime_types(runtime)
            .with_runtime_generics(request.catalog.runtime_generics())
            .lower(&metadata, &types)?;

        let path = match &request.path {
            Some(path) => path.clone(),
            None => self.default_path(&metadata.name),
        };
        self.prepare_path(&path)?;
        fs::write(&path, artifact.encode()).map_err(|e| SynthesisError::write(&path, e))?;
        info!(path = %path.display(), types = types.len(), "artifact written");

        Ok(BuildResult {
            succeeded: true,
            path: Some(path),
            error: None,
            types_requested: request.types.len(),
            types_produced: produced,
            synthesized: types.iter().map(|t| t.canonical()).collect(),
            metadata: Some(artifact.metadata),
        })
    }

    fn metadata_for(&self, request: &BuildRequest) -> SynthesisResult<ArtifactMetadata> {
        let mut metadata = request.metadata.clone();
        if metadata.name.trim().is_empty() {
            let first = request.catalog.require(&request.types[0])?;
            metadata.name = default_artifact_name(&first.origin_name());
        }
        if metadata.guid.is_none() {
            metadata.guid = Some(Uuid::new_v4().to_string());
        }
        Ok(metadata)
    }

    /// Default output path for an artifact name
    pub fn default_path(&self, artifact_name: &str) -> PathBuf {
        let file = default_file_name(artifact_name, self.options.append_hash);
        match &self.options.output_dir {
            Some(dir) => dir.join(file),
            None => PathBuf::from(file),
        }
    }

    /// Apply the overwrite policy and create missing parent directories
    fn prepare_path(&self, path: &Path) -> SynthesisResult<()> {
        if path.exists() {
            if !self.options.overwrite {
                return Err(SynthesisError::ArtifactExists(path.to_path_buf()));
            }
            if let Err(e) = fs::remove_file(path) {
                let err = SynthesisError::write(path, e);
                warn!(path = %path.display(), error = %err, "cannot delete existing artifact");
                self.notify_delete_conflict(&DeleteConflict {
                    path: path.to_path_buf(),
                    error: err.clone(),
                });
                return Err(err);
            }
            debug!(path = %path.display(), "deleted existing artifact");
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| SynthesisError::write(path, e))?;
        }
        Ok(())
    }
}

/// `{origin}.Fluent`
pub fn default_artifact_name(origin: &str) -> String {
    format!("{}.Fluent", origin)
}

/// `{name}.{crc32(name):x}.fga`, or `{name}.fga` without the hash
pub fn default_file_name(artifact_name: &str, append_hash: bool) -> String {
    if append_hash {
        let hash = crc32fast::hash(artifact_name.as_bytes());
        format!("{}.{:x}.{}", artifact_name, hash, FILE_EXTENSION)
    } else {
        format!("{}.{}", artifact_name, FILE_EXTENSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{MemberDescriptor, PrimitiveType, TypeDescriptor};
    use std::sync::atomic::AtomicUsize;

    fn catalog() -> SourceCatalog {
        SourceCatalog::from_types(vec![
            TypeDescriptor::class("Acme.Point")
                .with_member(MemberDescriptor::new("X", PrimitiveType::I32))
                .with_member(MemberDescriptor::new("Y", PrimitiveType::I32)),
            TypeDescriptor::class("Acme.Marker"),
        ])
        .unwrap()
    }

    #[test]
    fn test_default_file_name() {
        let hashed = default_file_name("Acme.Fluent", true);
        let hash = crc32fast::hash(b"Acme.Fluent");
        assert_eq!(hashed, format!("Acme.Fluent.{:x}.fga", hash));
        assert_eq!(default_file_name("Acme.Fluent", false), "Acme.Fluent.fga");
        assert_eq!(default_artifact_name("Acme"), "Acme.Fluent");
    }

    #[test]
    fn test_default_path_uses_output_dir() {
        let engine = Engine::new(EngineOptions::new().with_output_dir("out").with_append_hash(false)).unwrap();
        assert_eq!(engine.default_path("Acme.Fluent"), PathBuf::from("out").join("Acme.Fluent.fga"));
    }

    #[test]
    fn test_no_types_selected() {
        let engine = Engine::new(EngineOptions::default()).unwrap();
        let result = engine.build(BuildRequest::new(catalog()));
        assert!(!result.succeeded);
        assert!(result.path.is_none());
        assert!(matches!(result.error, Some(SynthesisError::Configuration(_))));
    }

    #[test]
    fn test_empty_result_fires_critical_error() {
        let engine = Engine::new(EngineOptions::default()).unwrap();
        let fired = Arc::new(AtomicUsize::new(0));
        let seen = fired.clone();
        let id = engine.subscribe_critical_error(move |err| {
            assert!(matches!(err, SynthesisError::EmptyResult { requested: 1 }));
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let result = engine.build(BuildRequest::new(catalog()).with_type("Acme.Marker"));
        assert!(!result.succeeded);
        assert!(result.path.is_none());
        assert_eq!(result.types_produced, 0);
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        assert!(engine.unsubscribe(id));
        assert!(!engine.unsubscribe(id));
        engine.build(BuildRequest::new(catalog()).with_type("Acme.Marker"));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_result_message() {
        let ok = BuildResult {
            succeeded: true,
            path: Some(PathBuf::from("a.fga")),
            types_requested: 2,
            types_produced: 1,
            synthesized: vec!["Acme.IPoint".to_string()],
            ..BuildResult::default()
        };
        assert_eq!(ok.message(), "Built 1 of 2 types (1 synthesized) into a.fga");
        let failed = BuildResult::failed(1, SynthesisError::ConcurrentBuild);
        assert_eq!(failed.message(), "Build failed: A build is already in progress");
    }

    #[test]
    fn test_reset_while_idle() {
        let engine = Engine::new(EngineOptions::default()).unwrap();
        assert!(engine.session().is_none());
        engine.build(BuildRequest::new(catalog()).with_type("Acme.Marker"));
        assert!(engine.session().is_some());
        engine.reset().unwrap();
        assert!(engine.session().is_none());
        assert!(!engine.is_busy());
    }

    #[test]
    fn test_invalid_options_rejected() {
        assert!(Engine::new(EngineOptions::new().with_object_property("!!")).is_err());
    }
}
