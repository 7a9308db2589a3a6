//! `fluentgen verify`: Decode and verify an artifact.

use crate::output::StyledOutput;
use anyhow::Context;
use fluentgen_artifact::{flags, verify_artifact, Artifact};
use std::path::Path;
use termcolor::ColorChoice;

pub fn execute(path: &Path, color: ColorChoice) -> anyhow::Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    let artifact = Artifact::decode(&bytes).with_context(|| format!("cannot decode {}", path.display()))?;
    verify_artifact(&artifact).with_context(|| format!("{} failed verification", path.display()))?;

    let mode = if artifact.flags & flags::STANDALONE != 0 {
        "standalone"
    } else {
        "lenient"
    };
    let mut out = StyledOutput::new(color);
    out.success("ok");
    out.plain(&format!(
        " {}: {} types, {} member refs ({})",
        path.display(),
        artifact.types.len(),
        artifact.member_refs.len(),
        mode
    ));
    out.newline();
    out.flush();
    Ok(())
}
