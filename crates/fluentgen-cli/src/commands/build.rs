//! `fluentgen build`: Synthesize an artifact from a descriptor manifest.

use crate::manifest::{merge_metadata, Manifest, ProjectConfig};
use crate::output::StyledOutput;
use anyhow::{bail, Context};
use clap::Args;
use fluentgen_engine::{Backend, BuildRequest, BuildResult, Engine, EngineOptions, ListingBackend, Session};
use std::path::PathBuf;
use termcolor::ColorChoice;
use tracing::debug;

#[derive(Args, Debug, Default)]
pub struct BuildArgs {
    /// Descriptor manifest (JSON)
    pub manifest: PathBuf,

    /// Only synthesize these types (canonical names, comma separated)
    #[arg(short, long, value_delimiter = ',')]
    pub types: Vec<String>,

    /// Output file
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Output directory for the default file name
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,

    /// Delete an existing output file
    #[arg(short = 'd', long)]
    pub overwrite: bool,

    /// Fluent wrapper prefix
    #[arg(short = 'b', long)]
    pub prefix: Option<String>,

    /// Proxy suffix
    #[arg(short = 'e', long)]
    pub suffix: Option<String>,

    /// Name of the wrapped-object accessor
    #[arg(short = 'p', long)]
    pub property_name: Option<String>,

    /// Interface prefix
    #[arg(long)]
    pub interface_prefix: Option<String>,

    /// Keep member types as declared
    #[arg(long)]
    pub no_dereference: bool,

    /// Keep foreign member types instead of failing
    #[arg(long)]
    pub lenient: bool,

    /// Do not append a name hash to the default file name
    #[arg(long)]
    pub no_hash: bool,

    /// Project configuration (defaults to fluentgen.toml beside the manifest)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Also print a listing of the synthesized types
    #[arg(long)]
    pub listing: bool,
}

impl BuildArgs {
    /// Layer the command-line flags over configured options
    pub fn apply(&self, mut options: EngineOptions) -> EngineOptions {
        if let Some(prefix) = &self.prefix {
            options = options.with_fluent_prefix(prefix);
        }
        if let Some(suffix) = &self.suffix {
            options = options.with_proxy_suffix(suffix);
        }
        if let Some(name) = &self.property_name {
            options = options.with_object_property(name);
        }
        if let Some(prefix) = &self.interface_prefix {
            options = options.with_interface_prefix(prefix);
        }
        if let Some(dir) = &self.out_dir {
            options = options.with_output_dir(dir);
        }
        if self.overwrite {
            options = options.with_overwrite(true);
        }
        if self.no_dereference {
            options = options.with_dereference(false);
        }
        if self.lenient {
            options = options.with_fail_fast(false);
        }
        if self.no_hash {
            options = options.with_append_hash(false);
        }
        options
    }
}

pub fn execute(args: BuildArgs, color: ColorChoice) -> anyhow::Result<()> {
    let manifest = Manifest::from_file(&args.manifest)?;
    let (config, config_path) = ProjectConfig::discover(args.config.as_deref(), &args.manifest)?;
    if let Some(path) = &config_path {
        debug!(config = %path.display(), "loaded project config");
    }

    let engine = Engine::new(args.apply(config.engine)).context("invalid options")?;
    engine.subscribe_delete_conflict(move |conflict| {
        StyledOutput::new(color).stderr_warning(&format!(
            "warning: cannot replace {}: {}\n",
            conflict.path.display(),
            conflict.error
        ));
    });

    let mut request = BuildRequest::new(manifest.catalog()?)
        .with_metadata(merge_metadata(manifest.metadata.clone(), config.metadata));
    request.types = manifest.select(&args.types)?;
    if let Some(file) = &args.file {
        request = request.with_path(file);
    }

    let result = engine.build(request);
    if let Some(err) = &result.error {
        bail!("build failed: {}", err);
    }

    let mut out = StyledOutput::new(color);
    if args.listing {
        if let Some(session) = engine.session() {
            out.plain(&render_listing(&result, &session)?);
            out.newline();
        }
    }

    out.success("Built");
    out.plain(&format!(
        " {} of {} types ({} synthesized)",
        result.types_produced,
        result.types_requested,
        result.synthesized.len()
    ));
    out.newline();
    if let Some(path) = &result.path {
        out.info(&format!("  {}", path.display()));
        out.newline();
    }
    let skipped = result.types_requested - result.types_produced;
    if skipped > 0 {
        out.warning("  skipped");
        out.plain(&format!(" {} types with no eligible members", skipped));
        out.newline();
    }
    out.flush();
    Ok(())
}

/// Listing of the types written by `result`, headed by the metadata the
/// artifact actually carries
fn render_listing(result: &BuildResult, session: &Session) -> anyhow::Result<String> {
    let metadata = result.metadata.clone().unwrap_or_default();
    let types: Vec<_> = session
        .types()
        .into_iter()
        .filter(|t| result.synthesized.contains(&t.canonical()))
        .collect();
    Ok(ListingBackend::new().with_bodies(true).lower(&metadata, &types)?)
}
