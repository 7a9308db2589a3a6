//! `fluentgen inspect`: Print an artifact's declarations and bodies.

use anyhow::Context;
use fluentgen_artifact::{Artifact, PrettyPrint};
use std::path::Path;

pub fn execute(path: &Path) -> anyhow::Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    let artifact = Artifact::decode(&bytes).with_context(|| format!("cannot decode {}", path.display()))?;
    print!("{}", artifact.pretty_print());
    Ok(())
}
