//! Engine configuration

use crate::error::{SynthesisError, SynthesisResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Every non-word character
static NON_WORD_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W+").expect("valid name pattern"));

/// Strip characters that cannot appear in a type or member name
///
/// Non-word characters go first, so digits they exposed at the start are
/// stripped as well.
pub fn sanitize_name(name: &str) -> String {
    let words = NON_WORD_CHARS.replace_all(name, "");
    words.trim_start_matches(|c: char| c.is_ascii_digit()).to_string()
}

/// Engine-wide options, threaded through every synthesizer call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Prepended to a source name to form its interface name
    pub interface_prefix: String,
    /// Appended to a source name to form its proxy name
    pub proxy_suffix: String,
    /// Prepended to a source name to form its fluent wrapper name
    pub fluent_prefix: String,
    /// Name of the fluent wrapper's read-only accessor to the wrapped object
    pub object_property: String,
    /// Rewrite member types so the artifact is self-contained
    pub dereference: bool,
    /// Abort a type when a member cannot be dereferenced
    pub fail_fast: bool,
    /// Delete an existing output file before writing
    pub overwrite: bool,
    /// Append a hash of the artifact name to default file names
    pub append_hash: bool,
    /// Directory for default output paths
    pub output_dir: Option<PathBuf>,
    /// Bound on waits for in-progress cache entries, in milliseconds
    pub wait_timeout_ms: u64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            interface_prefix: "I".to_string(),
            proxy_suffix: "Proxy".to_string(),
            fluent_prefix: "Fluent".to_string(),
            object_property: "Object".to_string(),
            dereference: true,
            fail_fast: true,
            overwrite: false,
            append_hash: true,
            output_dir: None,
            wait_timeout_ms: 30_000,
        }
    }
}

impl EngineOptions {
    /// Default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style method to set the interface prefix
    pub fn with_interface_prefix(mut self, prefix: &str) -> Self {
        self.interface_prefix = sanitize_name(prefix);
        self
    }

    /// Builder-style method to set the proxy suffix
    pub fn with_proxy_suffix(mut self, suffix: &str) -> Self {
        self.proxy_suffix = sanitize_name(suffix);
        self
    }

    /// Builder-style method to set the fluent prefix
    pub fn with_fluent_prefix(mut self, prefix: &str) -> Self {
        self.fluent_prefix = sanitize_name(prefix);
        self
    }

    /// Builder-style method to set the wrapped-object accessor name
    pub fn with_object_property(mut self, name: &str) -> Self {
        self.object_property = sanitize_name(name);
        self
    }

    /// Builder-style method to toggle dereferencing
    pub fn with_dereference(mut self, enabled: bool) -> Self {
        self.dereference = enabled;
        self
    }

    /// Builder-style method to toggle fail-fast dereferencing
    pub fn with_fail_fast(mut self, enabled: bool) -> Self {
        self.fail_fast = enabled;
        self
    }

    /// Builder-style method to toggle overwriting
    pub fn with_overwrite(mut self, enabled: bool) -> Self {
        self.overwrite = enabled;
        self
    }

    /// Builder-style method to toggle the file-name hash
    pub fn with_append_hash(mut self, enabled: bool) -> Self {
        self.append_hash = enabled;
        self
    }

    /// Builder-style method to set the output directory
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Builder-style method to set the cache wait bound
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout_ms = timeout.as_millis().min(u64::MAX as u128) as u64;
        self
    }

    /// Bound on waits for in-progress cache entries
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    /// Sanitise names set directly on the fields and check the result
    pub fn validate(&self) -> SynthesisResult<Self> {
        let options = Self {
            interface_prefix: sanitize_name(&self.interface_prefix),
            proxy_suffix: sanitize_name(&self.proxy_suffix),
            fluent_prefix: sanitize_name(&self.fluent_prefix),
            object_property: sanitize_name(&self.object_property),
            ..self.clone()
        };

        if options.object_property.is_empty() {
            return Err(SynthesisError::Configuration(format!(
                "wrapped-object accessor name {:?} is empty after sanitisation",
                self.object_property
            )));
        }
        if options.interface_prefix.is_empty() && options.proxy_suffix.is_empty() {
            return Err(SynthesisError::Configuration(
                "interface prefix and proxy suffix cannot both be empty".to_string(),
            ));
        }
        if options.interface_prefix == options.fluent_prefix {
            return Err(SynthesisError::Configuration(format!(
                "interface and fluent prefixes are both {:?}",
                options.interface_prefix
            )));
        }
        if options.wait_timeout_ms == 0 {
            return Err(SynthesisError::Configuration(
                "wait timeout must be positive".to_string(),
            ));
        }
        Ok(options)
    }
}
