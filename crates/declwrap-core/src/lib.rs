//! Declaration parsing and wrapper code generation for native libraries.
//!
//! Reads a line-oriented C declaration dialect (the header subset of Cython
//! `.pxd` files) and emits Rust wrapper types with field accessors,
//! name-based attribute access and null-checked function wrappers over a
//! bindgen-style raw module.
//!
//! ## Modules
//!
//! - [`record`]: typed declaration records and their dialect rendering
//! - [`lexer`]: per-line tokenizer for the declaration dialect
//! - [`parser`]: lazy, restartable declaration parser
//! - [`typemap`]: native type classification and code templates
//! - [`registry`]: emitted names threaded between generation passes
//! - [`ignore`]: names that are never wrapped
//! - [`generate`]: wrapper source emission
//! - [`runtime`]: support code emitted at the top of every artifact

pub mod error;
pub mod generate;
pub mod ignore;
pub mod lexer;
pub mod parser;
pub mod record;
pub mod registry;
/// Compiled here as well as emitted, so the runtime is type-checked and tested.
pub mod runtime;
pub mod typemap;

pub use error::{DeclwrapError, Result};
pub use generate::{Generated, Generator, GeneratorOptions, OpaqueType, PassStats, Source};
pub use ignore::PermanentIgnores;
pub use parser::DeclarationParser;
pub use record::{DeclarationRecord, TypeToken};
pub use registry::{DefinitionRegistry, TypeKind};
pub use typemap::{map_type, Shape};
