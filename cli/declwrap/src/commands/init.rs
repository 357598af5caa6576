//! `declwrap init`: manifest scaffolding.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::manifest::{DeclwrapManifest, MANIFEST_NAME};

/// Write a template `declwrap.toml` into `dir`, creating the directory if needed.
///
/// The project name defaults to the directory name.
pub fn run(dir: &Path, name: Option<&str>) -> Result<()> {
    let manifest_path = dir.join(MANIFEST_NAME);
    if manifest_path.exists() {
        bail!("{} already exists", manifest_path.display());
    }

    let name = match name {
        Some(name) => name.to_string(),
        None => project_name(dir)?,
    };

    fs::create_dir_all(dir.join("pxd")).context("creating pxd/ directory")?;
    fs::write(&manifest_path, DeclwrapManifest::template(&name))
        .with_context(|| format!("writing {}", manifest_path.display()))?;

    println!("Created {}", manifest_path.display());
    println!("  add declaration sources under {}", dir.join("pxd").display());
    Ok(())
}

fn project_name(dir: &Path) -> Result<String> {
    let absolute = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        std::env::current_dir()?.join(dir)
    };
    absolute
        .components()
        .next_back()
        .and_then(|c| c.as_os_str().to_str())
        .filter(|s| !s.is_empty() && *s != "." && *s != "/")
        .map(str::to_string)
        .context("cannot derive a project name; pass --name")
}
