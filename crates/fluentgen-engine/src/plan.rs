//! Chained build facade
//!
//! ```ignore
//! let mut plan = BuildPlan::new(EngineOptions::default())?
//!     .scan(types)?
//!     .on_error(|err| eprintln!("{}", err))?;
//! let result = plan.execute()?;
//! ```

use crate::config::EngineOptions;
use crate::descriptor::{QualifiedName, SourceCatalog, TypeDescriptor};
use crate::driver::{is_candidate, BuildRequest, BuildResult, DeleteConflict, Engine, SubscriptionId};
use crate::emit::ArtifactMetadata;
use crate::error::{SynthesisError, SynthesisResult};
use std::path::PathBuf;
use std::sync::Arc;

type ErrorHandler = Arc<dyn Fn(&SynthesisError) + Send + Sync>;

/// Collects types and handlers, then runs one build
pub struct BuildPlan {
    engine: Engine,
    catalog: SourceCatalog,
    selected: Vec<QualifiedName>,
    path: Option<PathBuf>,
    metadata: ArtifactMetadata,
    error_handler: Option<ErrorHandler>,
    delete_subscription: Option<SubscriptionId>,
    result: Option<BuildResult>,
}

impl BuildPlan {
    /// Plan on a new engine
    pub fn new(options: EngineOptions) -> SynthesisResult<Self> {
        Ok(Self::with_engine(Engine::new(options)?))
    }

    /// Plan on an existing engine
    pub fn with_engine(engine: Engine) -> Self {
        Self {
            engine,
            catalog: SourceCatalog::new(),
            selected: Vec::new(),
            path: None,
            metadata: ArtifactMetadata::default(),
            error_handler: None,
            delete_subscription: None,
            result: None,
        }
    }

    /// Register types and select the ones that can be synthesized
    ///
    /// Runtime types and enums are registered for dereferencing but never
    /// selected.
    pub fn scan(mut self, types: impl IntoIterator<Item = TypeDescriptor>) -> SynthesisResult<Self> {
        for ty in types {
            if is_candidate(&ty) {
                self.selected.push(ty.name.clone());
            }
            self.catalog.insert(ty)?;
        }
        Ok(self)
    }

    /// Register types without selecting them
    pub fn with_dependencies(mut self, types: impl IntoIterator<Item = TypeDescriptor>) -> SynthesisResult<Self> {
        for ty in types {
            self.catalog.insert(ty)?;
        }
        Ok(self)
    }

    /// Builder-style method to set the output path
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Builder-style method to set the artifact metadata
    pub fn with_metadata(mut self, metadata: ArtifactMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Route build errors to `handler` instead of returning them
    pub fn on_error<F>(mut self, handler: F) -> SynthesisResult<Self>
    where
        F: Fn(&SynthesisError) + Send + Sync + 'static,
    {
        if self.error_handler.is_some() {
            return Err(SynthesisError::Configuration("error handler already registered".to_string()));
        }
        self.error_handler = Some(Arc::new(handler));
        Ok(self)
    }

    /// Subscribe to failures to delete an existing output file
    pub fn on_delete_error<F>(mut self, handler: F) -> SynthesisResult<Self>
    where
        F: Fn(&DeleteConflict) + Send + Sync + 'static,
    {
        if self.delete_subscription.is_some() {
            return Err(SynthesisError::Configuration(
                "delete error handler already registered".to_string(),
            ));
        }
        self.delete_subscription = Some(self.engine.subscribe_delete_conflict(handler));
        Ok(self)
    }

    /// Underlying engine
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Types selected so far
    pub fn selected(&self) -> &[QualifiedName] {
        &self.selected
    }

    /// Run the build
    ///
    /// With no types selected the configuration error goes to the error
    /// handler, or is returned when none is registered. A failed build is
    /// reported to the handler and still recorded as the plan's result.
    pub fn execute(&mut self) -> SynthesisResult<&BuildResult> {
        if self.selected.is_empty() {
            let err = SynthesisError::Configuration("no types selected".to_string());
            let Some(handler) = &self.error_handler else {
                return Err(err);
            };
            handler(&err);
            let result = BuildResult {
                error: Some(err),
                ..BuildResult::default()
            };
            return Ok(&*self.result.insert(result));
        }

        let mut request = BuildRequest::new(self.catalog.clone()).with_metadata(self.metadata.clone());
        request.types = self.selected.clone();
        request.path = self.path.clone();

        let result = self.engine.build(request);
        if let (Some(err), Some(handler)) = (&result.error, &self.error_handler) {
            handler(err);
        }
        Ok(&*self.result.insert(result))
    }

    /// Result of the last execution
    pub fn result(&self) -> SynthesisResult<&BuildResult> {
        self.result
            .as_ref()
            .ok_or_else(|| SynthesisError::Configuration("plan has not been executed".to_string()))
    }

    /// Forget the last result and the engine's retained session
    pub fn reset(&mut self) -> SynthesisResult<()> {
        if self.result.is_none() {
            return Err(SynthesisError::Configuration("plan has not been executed".to_string()));
        }
        self.engine.reset()?;
        self.result = None;
        Ok(())
    }
}

impl Drop for BuildPlan {
    fn drop(&mut self) {
        if let Some(id) = self.delete_subscription.take() {
            self.engine.unsubscribe(id);
        }
    }
}
