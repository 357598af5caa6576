//! `declwrap generate`: run every pass and write the wrapper artifact.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use declwrap_core::{Generated, Generator, GeneratorOptions, Source};

use crate::manifest::DeclwrapManifest;

/// Command-line overrides for the manifest's `[generate]` section.
#[derive(Debug, Default)]
pub struct GenerateArgs {
    pub sources: Vec<PathBuf>,
    pub output: Option<PathBuf>,
    pub strict: bool,
    pub module: Option<String>,
}

/// Generate wrappers for the manifest's sources, or for `args.sources` when given.
///
/// Without a manifest and without `--output` the artifact goes to stdout.
pub fn run(project_dir: &Path, manifest: Option<&DeclwrapManifest>, args: GenerateArgs) -> Result<()> {
    let mut options = match manifest {
        Some(manifest) => manifest.generator_options(project_dir)?,
        None => GeneratorOptions::default(),
    };
    options.strict |= args.strict;
    if let Some(module) = args.module {
        options.native_module = module;
    }

    let paths: Vec<PathBuf> = if !args.sources.is_empty() {
        args.sources
    } else if let Some(manifest) = manifest {
        manifest
            .generate
            .sources
            .iter()
            .map(|path| project_dir.join(path))
            .collect()
    } else {
        bail!("no declaration sources given and no declwrap.toml found")
    };
    if paths.is_empty() {
        bail!("declwrap.toml lists no [generate] sources");
    }

    let sources = paths
        .iter()
        .map(|path| Source::load(path).with_context(|| format!("reading {}", path.display())))
        .collect::<Result<Vec<_>>>()?;

    let generator = Generator::new(options)?;
    let generated = generator.run(&sources)?;

    let output = args
        .output
        .or_else(|| manifest.map(|m| project_dir.join(&m.generate.output)));
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            fs::write(&path, &generated.code)
                .with_context(|| format!("writing {}", path.display()))?;
            print_summary(&generated, &path);
        }
        None => {
            std::io::stdout()
                .write_all(generated.code.as_bytes())
                .context("writing to stdout")?;
        }
    }
    Ok(())
}

fn print_summary(generated: &Generated, output: &Path) {
    for (name, stats) in &generated.passes {
        println!(
            "{name}: {} structs, {} unions, {} fields, {} functions ({} skipped, {} members and {} functions excluded)",
            stats.structs,
            stats.unions,
            stats.fields,
            stats.functions,
            stats.skipped,
            stats.excluded_members,
            stats.excluded_functions,
        );
        if stats.dropped_lines > 0 {
            println!("  {} unrecognized lines dropped; rerun with --strict to list them", stats.dropped_lines);
        }
    }
    println!("Wrote {}", output.display());
}

#[cfg(test)]
mod tests {
    use super::*;

    const DECLS: &str = "struct __dev \"dev\"\n\nstruct foo:\n    int a\n    dev* d\n\nint foo_get(foo* f)\n";

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("pxd")).unwrap();
        fs::write(dir.path().join("pxd/demo.pxd"), DECLS).unwrap();
        fs::write(
            dir.path().join("declwrap.toml"),
            DeclwrapManifest::template("demo"),
        )
        .unwrap();
        dir
    }

    #[test]
    fn generate_from_manifest_writes_output() {
        let dir = project();
        let (manifest, root) = DeclwrapManifest::find_and_load(dir.path()).unwrap().unwrap();

        run(&root, Some(&manifest), GenerateArgs::default()).unwrap();

        let code = fs::read_to_string(dir.path().join("src/bindings.rs")).unwrap();
        assert!(code.starts_with("// @generated by declwrap"));
        assert!(code.contains("pub struct Foo {"));
        assert!(code.contains("block: Block<crate::ffi::dev>,"));
        assert!(code.contains("pub unsafe fn foo_get(f: &Foo) -> ::std::ffi::c_int"));
    }

    #[test]
    fn arguments_override_manifest() {
        let dir = project();
        fs::write(dir.path().join("other.pxd"), "struct other:\n    int x\n").unwrap();
        let (manifest, root) = DeclwrapManifest::find_and_load(dir.path()).unwrap().unwrap();
        let output = dir.path().join("out/other.rs");

        let args = GenerateArgs {
            sources: vec![dir.path().join("other.pxd")],
            output: Some(output.clone()),
            strict: false,
            module: Some("libother_sys".to_string()),
        };
        run(&root, Some(&manifest), args).unwrap();

        let code = fs::read_to_string(output).unwrap();
        assert!(code.contains("block: Block<libother_sys::other>,"));
        assert!(!code.contains("pub struct Foo {"));
    }

    #[test]
    fn strict_flag_fails_on_unrecognized_lines() {
        let dir = project();
        fs::write(dir.path().join("pxd/demo.pxd"), "int ok(int x)\nthis line is junk\n").unwrap();
        let (manifest, root) = DeclwrapManifest::find_and_load(dir.path()).unwrap().unwrap();

        let args = GenerateArgs {
            strict: true,
            ..GenerateArgs::default()
        };
        let err = run(&root, Some(&manifest), args).unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }

    #[test]
    fn xnvme_demo_bridges_every_ignored_function() {
        let demo = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/xnvme");
        let (manifest, root) = DeclwrapManifest::find_and_load(&demo).unwrap().unwrap();
        let out = tempfile::tempdir().unwrap();
        let output = out.path().join("bindings.rs");

        let args = GenerateArgs {
            output: Some(output.clone()),
            ..GenerateArgs::default()
        };
        run(&root, Some(&manifest), args).unwrap();

        let code = fs::read_to_string(output).unwrap();
        for function in [
            "xnvme_enumerate",
            "xnvme_cmd_ctx_from_dev",
            "xnvme_cmd_ctx_set_cb",
            "xnvme_queue_set_cb",
        ] {
            let definition = format!("pub unsafe fn {function}");
            assert_eq!(code.matches(&definition).count(), 1, "{function}");
        }
        assert_eq!(code.matches("// bridge: ").count(), 4);
        assert_eq!(code.matches("pub struct XnvmeCmdCtx {").count(), 1);
        assert!(code.contains("pub unsafe fn xnvme_dev_open("));
        assert!(!code.contains("pub unsafe fn xnvme_dev_derive_geo("));
    }

    #[test]
    fn missing_sources_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run(dir.path(), None, GenerateArgs::default()).is_err());
    }
}
