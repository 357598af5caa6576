//! `declwrap.toml` manifest parsing and project configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use declwrap_core::{GeneratorOptions, OpaqueType, PermanentIgnores, Source};
use serde::{Deserialize, Serialize};

pub const MANIFEST_NAME: &str = "declwrap.toml";

/// The top-level manifest structure for a declwrap project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclwrapManifest {
    /// Project metadata (required).
    pub project: ProjectConfig,
    /// Where the raw native declarations live.
    #[serde(default)]
    pub native: NativeConfig,
    /// Generation inputs and output.
    #[serde(default)]
    pub generate: GenerateConfig,
    /// Names added to the built-in permanent ignore list.
    #[serde(default)]
    pub ignore: IgnoreConfig,
    /// Handle-only types that never appear with a body.
    #[serde(default)]
    pub opaque: Vec<OpaqueConfig>,
}

/// Project metadata section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name (required).
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NativeConfig {
    /// Rust path of the bindgen module, such as `crate::ffi`.
    #[serde(default = "default_module")]
    pub module: String,
}

impl Default for NativeConfig {
    fn default() -> Self {
        Self {
            module: default_module(),
        }
    }
}

fn default_module() -> String {
    "crate::ffi".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateConfig {
    /// Declaration sources, processed in this order.
    #[serde(default)]
    pub sources: Vec<PathBuf>,
    #[serde(default = "default_output")]
    pub output: PathBuf,
    /// Fail on declaration lines the parser does not recognize.
    #[serde(default)]
    pub strict: bool,
    /// Hand-written bridge files spliced in after the runtime preamble.
    #[serde(default)]
    pub bridges: Vec<PathBuf>,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            output: default_output(),
            strict: false,
            bridges: Vec::new(),
        }
    }
}

fn default_output() -> PathBuf {
    PathBuf::from("src/bindings.rs")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IgnoreConfig {
    #[serde(default)]
    pub structs: Vec<String>,
    #[serde(default)]
    pub functions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpaqueConfig {
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
}

impl DeclwrapManifest {
    /// Search upward from `start_dir` for a `declwrap.toml` file, parse and return it
    /// along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(MANIFEST_NAME);
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate)
                    .with_context(|| format!("reading {}", candidate.display()))?;
                let manifest: DeclwrapManifest = toml::from_str(&content)
                    .with_context(|| format!("parsing {}", candidate.display()))?;
                return Ok(Some((manifest, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Parse a manifest from a TOML string.
    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing declwrap.toml")
    }

    /// Generator options, with bridge files read relative to `project_dir`.
    pub fn generator_options(&self, project_dir: &Path) -> Result<GeneratorOptions> {
        let ignores = PermanentIgnores::builtin()
            .extend_structs(self.ignore.structs.iter().cloned())
            .extend_functions(self.ignore.functions.iter().cloned());
        let opaque = self
            .opaque
            .iter()
            .map(|o| OpaqueType {
                name: o.name.clone(),
                alias: o.alias.clone(),
            })
            .collect();
        let bridges = self
            .generate
            .bridges
            .iter()
            .map(|path| {
                let full = project_dir.join(path);
                Source::load(&full).with_context(|| format!("reading bridge {}", full.display()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(GeneratorOptions {
            native_module: self.native.module.clone(),
            strict: self.generate.strict,
            ignores,
            opaque,
            bridges,
        })
    }

    /// Generate the default template for `declwrap init`.
    pub fn template(name: &str) -> String {
        format!(
            r#"[project]
name = "{name}"

[native]
module = "crate::ffi"

[generate]
sources = ["pxd/{name}.pxd"]
output = "src/bindings.rs"
strict = false
bridges = []

[ignore]
structs = []
functions = []
"#
        )
    }
}
