//! Wrapper source generation.
//!
//! A run emits the runtime preamble once, then opaque handle types, then any
//! hand-written bridge files, then one pass per declaration source. Each pass
//! takes the [`DefinitionRegistry`] produced by the previous one and returns
//! it grown, so nothing is emitted twice across sources.

mod function;
mod names;
mod nesting;
mod wrapper;

use std::path::Path;

use tracing::{debug, info};

use crate::error::{DeclwrapError, Result};
use crate::ignore::PermanentIgnores;
use crate::parser::DeclarationParser;
use crate::record::{public_name, Block, DeclarationRecord};
use crate::registry::{DefinitionRegistry, Skip, TypeKind};

pub use names::{camel_case, function_name, ident, wrapper_name};

use self::function::emit_function;
use self::wrapper::{emit_wrapper, WrapperSpec};

/// Source of the runtime support emitted at the top of every artifact.
pub const RUNTIME: &str = include_str!("../runtime.rs");

/// Declaration text or bridge code with the name used in logs and markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub name: String,
    pub text: String,
}

impl Source {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    /// Read a source file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::new(path.display().to_string(), text))
    }
}

/// A type only ever handled through pointers, declared without a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpaqueType {
    pub name: String,
    pub alias: Option<String>,
}

/// Generator settings.
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    /// Path of the module holding the raw native declarations.
    pub native_module: String,
    /// Fail on unmatched declaration lines instead of dropping them.
    pub strict: bool,
    pub ignores: PermanentIgnores,
    pub opaque: Vec<OpaqueType>,
    /// Hand-written bridge code spliced in after the preamble.
    pub bridges: Vec<Source>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            native_module: "crate::ffi".to_string(),
            strict: false,
            ignores: PermanentIgnores::builtin(),
            opaque: Vec::new(),
            bridges: Vec::new(),
        }
    }
}

/// Counters for one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    pub structs: usize,
    pub unions: usize,
    pub functions: usize,
    /// Enum and typedef headers recorded without code.
    pub headers: usize,
    /// Records left out because their name was already emitted or is listed.
    pub skipped: usize,
    /// Leaf fields generated across every wrapper in the pass.
    pub fields: usize,
    pub excluded_members: usize,
    pub excluded_functions: usize,
    /// Lines that matched no declaration shape.
    pub dropped_lines: usize,
}

impl PassStats {
    /// Records that produced code.
    pub fn emitted(&self) -> usize {
        self.structs + self.unions + self.functions
    }
}

/// Result of one pass.
#[derive(Debug, Clone)]
pub struct PassOutput {
    pub code: String,
    pub registry: DefinitionRegistry,
    pub stats: PassStats,
}

/// Result of a whole run.
#[derive(Debug, Clone)]
pub struct Generated {
    pub code: String,
    pub registry: DefinitionRegistry,
    /// Per-source statistics, in pass order.
    pub passes: Vec<(String, PassStats)>,
}

/// Turns declaration sources into wrapper source.
#[derive(Debug, Clone)]
pub struct Generator {
    options: GeneratorOptions,
}

impl Generator {
    pub fn new(options: GeneratorOptions) -> Result<Self> {
        validate_module_path(&options.native_module)?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// Generate the complete artifact for `sources`, processed in order.
    pub fn run(&self, sources: &[Source]) -> Result<Generated> {
        let mut code = format!(
            "// @generated by declwrap {}. Do not edit.\n\n",
            env!("CARGO_PKG_VERSION")
        );
        code.push_str(RUNTIME);

        let mut registry = DefinitionRegistry::new();
        if !self.options.opaque.is_empty() {
            code.push_str("\n// opaque handle types\n");
            for opaque in &self.options.opaque {
                code.push('\n');
                code.push_str(&self.emit_opaque(opaque, &mut registry));
            }
        }

        for bridge in &self.options.bridges {
            code.push_str(&format!("\n// bridge: {}\n\n", bridge.name));
            code.push_str(&bridge.text);
            if !bridge.text.ends_with('\n') {
                code.push('\n');
            }
        }

        let mut passes = Vec::with_capacity(sources.len());
        for source in sources {
            let pass = self.run_pass(source, registry)?;
            code.push('\n');
            code.push_str(&pass.code);
            registry = pass.registry;
            passes.push((source.name.clone(), pass.stats));
        }

        Ok(Generated {
            code,
            registry,
            passes,
        })
    }

    /// Generate wrappers for one source, skipping everything `registry` already holds.
    pub fn run_pass(&self, source: &Source, mut registry: DefinitionRegistry) -> Result<PassOutput> {
        let parser = DeclarationParser::new(&source.text).strict(self.options.strict);

        // Index type kinds first so members may point at blocks declared later.
        for record in parser.iter() {
            let record = record?;
            let kind = match &record {
                DeclarationRecord::Struct(_) | DeclarationRecord::Union(_) => TypeKind::Wrapped {
                    wrapper: wrapper_name(record.public_name()),
                },
                DeclarationRecord::Enum(_) => TypeKind::Enum,
                DeclarationRecord::Typedef(_) => TypeKind::Callback,
                DeclarationRecord::Function(_) => continue,
            };
            for name in spellings(record.name(), record.alias()) {
                registry.define(name, kind.clone());
            }
        }

        let mut stats = PassStats::default();
        let mut code = format!("// declarations from {}\n", source.name);
        let mut records = parser.iter();
        for record in records.by_ref() {
            let record = record?;
            let names = spellings(record.name(), record.alias());
            match &record {
                DeclarationRecord::Struct(block) | DeclarationRecord::Union(block) => {
                    let skip = registry.ignore_set(&self.options.ignores).check_struct(&names);
                    if skip == Some(Skip::AlreadyEmitted) {
                        debug!(name = %record.name(), "skipping already emitted {}", record.kind_label());
                        stats.skipped += 1;
                        continue;
                    }
                    let emitted = self.emit_block(record.kind_label(), block, skip.is_some(), &registry);
                    code.push('\n');
                    code.push_str(&emitted.code);
                    stats.fields += emitted.members;
                    stats.excluded_members += emitted.excluded;
                    if matches!(record, DeclarationRecord::Union(_)) {
                        stats.unions += 1;
                    } else {
                        stats.structs += 1;
                    }
                }
                DeclarationRecord::Function(func) => {
                    if let Some(skip) = registry.ignore_set(&self.options.ignores).check_function(&names) {
                        debug!(name = %func.name, ?skip, "skipping function");
                        stats.skipped += 1;
                        continue;
                    }
                    match emit_function(func, record.public_name(), &self.options.native_module, &registry) {
                        Ok(wrapped) => {
                            code.push('\n');
                            code.push_str(&wrapped);
                            stats.functions += 1;
                        }
                        Err(reason) => {
                            debug!(name = %func.name, %reason, "excluding function");
                            stats.excluded_functions += 1;
                            continue;
                        }
                    }
                }
                DeclarationRecord::Enum(_) | DeclarationRecord::Typedef(_) => {
                    if registry.contains_any(names.iter().copied()) {
                        stats.skipped += 1;
                        continue;
                    }
                    stats.headers += 1;
                }
            }
            for name in &names {
                registry.record(name);
            }
        }
        stats.dropped_lines = records.dropped();

        info!(
            source = %source.name,
            structs = stats.structs,
            unions = stats.unions,
            functions = stats.functions,
            skipped = stats.skipped,
            fields = stats.fields,
            excluded_members = stats.excluded_members,
            excluded_functions = stats.excluded_functions,
            dropped_lines = stats.dropped_lines,
            "generated pass"
        );

        Ok(PassOutput {
            code,
            registry,
            stats,
        })
    }

    fn emit_block(
        &self,
        kind: &'static str,
        block: &Block,
        ignored: bool,
        registry: &DefinitionRegistry,
    ) -> wrapper::EmittedWrapper {
        if ignored {
            debug!(name = %block.name, "generating permanently ignored block without members");
        }
        let type_name = public_name(&block.name, block.alias.as_deref());
        let native = block.alias.as_deref().unwrap_or(&block.name);
        let spec = WrapperSpec {
            kind,
            block,
            wrapper: wrapper_name(type_name),
            type_name,
            native_path: format!("{}::{}", self.options.native_module, ident(native)),
            ignored,
        };
        emit_wrapper(&spec, registry)
    }

    fn emit_opaque(&self, opaque: &OpaqueType, registry: &mut DefinitionRegistry) -> String {
        let block = Block {
            name: opaque.name.clone(),
            alias: opaque.alias.clone(),
            fields: Vec::new(),
            opaque: true,
        };
        let wrapper = wrapper_name(public_name(&block.name, block.alias.as_deref()));
        for name in spellings(&block.name, block.alias.as_deref()) {
            registry.define(name, TypeKind::Wrapped {
                wrapper: wrapper.clone(),
            });
            registry.record(name);
        }
        self.emit_block("struct", &block, false, registry).code
    }
}

/// Declared name, alias and public name, without repeats.
fn spellings<'a>(name: &'a str, alias: Option<&'a str>) -> Vec<&'a str> {
    let mut names = vec![name];
    for extra in [alias, Some(public_name(name, alias))].into_iter().flatten() {
        if !names.contains(&extra) {
            names.push(extra);
        }
    }
    names
}

fn validate_module_path(path: &str) -> Result<()> {
    let trimmed = path.strip_prefix("::").unwrap_or(path);
    let valid = !trimmed.is_empty()
        && trimmed.split("::").all(|segment| {
            let mut chars = segment.chars();
            chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if valid {
        Ok(())
    } else {
        Err(DeclwrapError::Config {
            detail: format!("native module '{path}' is not a Rust path"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOO: &str = "struct dev\n\n\
                       struct foo:\n    int a\n    char* b\n    dev* c\n    void* priv\n\n\
                       enum mode:\n    FAST = 1\n\n\
                       void* alloc_buf(dev* d, int n)\n\
                       int set_mode(mode m)\n";

    fn generator() -> Generator {
        Generator::new(GeneratorOptions::default()).unwrap()
    }

    #[test]
    fn pass_counts_records() {
        let pass = generator()
            .run_pass(&Source::new("foo.pxd", FOO), DefinitionRegistry::new())
            .unwrap();
        assert_eq!(pass.stats.structs, 2);
        assert_eq!(pass.stats.functions, 1);
        assert_eq!(pass.stats.headers, 1);
        assert_eq!(pass.stats.fields, 3);
        assert_eq!(pass.stats.excluded_members, 1);
        assert_eq!(pass.stats.excluded_functions, 1);
        assert!(pass.code.starts_with("// declarations from foo.pxd\n"));
        assert!(pass.registry.contains("foo*"));
        assert!(pass.registry.contains("alloc_buf"));
        assert!(!pass.registry.contains("set_mode"));
    }

    #[test]
    fn second_pass_over_same_source_emits_nothing() {
        let generator = generator();
        let source = Source::new("foo.pxd", FOO);
        let first = generator.run_pass(&source, DefinitionRegistry::new()).unwrap();
        let second = generator.run_pass(&source, first.registry.clone()).unwrap();
        assert_eq!(second.stats.emitted(), 0);
        assert_eq!(second.stats.headers, 0);
        assert_eq!(second.code, "// declarations from foo.pxd\n");
        assert_eq!(second.registry, first.registry);
    }

    #[test]
    fn members_may_point_at_later_blocks() {
        let source = Source::new("later.pxd", "struct a:\n    b* next\n\nstruct b:\n    int x\n");
        let pass = generator().run_pass(&source, DefinitionRegistry::new()).unwrap();
        assert_eq!(pass.stats.excluded_members, 0);
        assert!(pass.code.contains("pub fn get_next(&self) -> Result<B, WrapperError>"));
    }

    #[test]
    fn permanently_ignored_struct_is_emitted_empty() {
        let source = Source::new(
            "vs.pxd",
            "struct __xnvme_spec_vs_register \"xnvme_spec_vs_register\":\n    uint32_t val\n",
        );
        let pass = generator().run_pass(&source, DefinitionRegistry::new()).unwrap();
        assert_eq!(pass.stats.structs, 1);
        assert_eq!(pass.stats.excluded_members, 1);
        assert!(pass.code.contains("pub struct XnvmeSpecVsRegister {"));
        assert!(pass.code.contains("block: Block<crate::ffi::xnvme_spec_vs_register>,"));
    }

    #[test]
    fn permanently_ignored_function_is_skipped() {
        let source = Source::new("enum.pxd", "int xnvme_enumerate(const char* sys_uri)\n");
        let pass = generator().run_pass(&source, DefinitionRegistry::new()).unwrap();
        assert_eq!(pass.stats.functions, 0);
        assert_eq!(pass.stats.skipped, 1);
    }

    #[test]
    fn runtime_names_are_not_shadowed() {
        let source = Source::new(
            "value.pxd",
            "struct value:\n    int a\n\nint block_count(value* v)\nint read_c_str(value* v)\n",
        );
        let pass = generator().run_pass(&source, DefinitionRegistry::new()).unwrap();
        assert!(pass.code.contains("pub struct NativeValue {"));
        assert!(!pass.code.contains("pub struct Value {"));
        assert!(pass.code.contains("const TYPE_NAME: &'static str = \"value\";"));
        assert!(pass.code.contains("pub unsafe fn block_count(v: &NativeValue) -> ::std::ffi::c_int"));
        assert!(pass.code.contains("pub unsafe fn read_c_str_(v: &NativeValue)"));
        assert_eq!(
            pass.registry.kind("value"),
            Some(&TypeKind::Wrapped {
                wrapper: "NativeValue".into()
            })
        );
    }

    #[test]
    fn renamed_wrapper_resolves_in_later_passes() {
        let options = GeneratorOptions {
            opaque: vec![OpaqueType {
                name: "block".into(),
                alias: None,
            }],
            ..GeneratorOptions::default()
        };
        let sources = [Source::new("a.pxd", "int block_size(block* b)\n")];
        let generated = Generator::new(options).unwrap().run(&sources).unwrap();
        assert!(generated.code.contains("pub struct NativeBlock {"));
        assert!(generated.code.contains("block: Block<crate::ffi::block>,"));
        assert!(generated.code.contains("pub unsafe fn block_size(b: &NativeBlock)"));
    }

    #[test]
    fn strict_pass_fails_on_unmatched_line() {
        let options = GeneratorOptions {
            strict: true,
            ..GeneratorOptions::default()
        };
        let generator = Generator::new(options).unwrap();
        let source = Source::new("bad.pxd", "int f(int x)\nnot a declaration\n");
        let err = generator.run_pass(&source, DefinitionRegistry::new()).unwrap_err();
        assert!(matches!(err, DeclwrapError::Parse { line: 2, .. }));
    }

    #[test]
    fn run_emits_preamble_once_and_threads_registry() {
        let options = GeneratorOptions {
            opaque: vec![OpaqueType {
                name: "__xnvme_queue".into(),
                alias: Some("xnvme_queue".into()),
            }],
            bridges: vec![Source::new("bridge.rs", "pub fn bridge() {}")],
            ..GeneratorOptions::default()
        };
        let generator = Generator::new(options).unwrap();
        let sources = [
            Source::new("a.pxd", "struct foo:\n    int a\n\nint get(xnvme_queue* q)\n"),
            Source::new("b.pxd", "struct foo:\n    int a\n\nint other(foo* f)\n"),
        ];
        let generated = generator.run(&sources).unwrap();
        assert!(generated.code.starts_with("// @generated by declwrap"));
        assert_eq!(generated.code.matches("pub struct OpaqueHandle").count(), 1);
        assert_eq!(generated.code.matches("pub struct Foo {").count(), 1);
        assert!(generated.code.contains("pub struct XnvmeQueue {"));
        assert!(generated.code.contains("// bridge: bridge.rs\n\npub fn bridge() {}\n"));
        assert!(generated.code.contains("pub unsafe fn get(q: &XnvmeQueue)"));
        assert!(generated.code.contains("pub unsafe fn other(f: &Foo)"));
        assert_eq!(generated.passes.len(), 2);
        assert_eq!(generated.passes[1].1.skipped, 1);
    }

    #[test]
    fn rejects_invalid_module_path() {
        let options = GeneratorOptions {
            native_module: "crate::ffi-sys".into(),
            ..GeneratorOptions::default()
        };
        assert!(matches!(Generator::new(options), Err(DeclwrapError::Config { .. })));
        assert!(validate_module_path("::libxnvme_sys").is_ok());
        assert!(validate_module_path("").is_err());
    }

    #[test]
    fn load_reads_source_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.pxd");
        std::fs::write(&path, "int f(int x)\n").unwrap();
        let source = Source::load(&path).unwrap();
        assert_eq!(source.text, "int f(int x)\n");
        assert!(source.name.ends_with("x.pxd"));
        assert!(Source::load(&dir.path().join("missing.pxd")).is_err());
    }
}
