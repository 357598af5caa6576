//! Names emitted across generation passes.
//!
//! A [`DefinitionRegistry`] is threaded explicitly from one pass to the next:
//! each pass receives it by value, skips everything it already holds, and
//! returns it grown by what the pass emitted. It only ever grows.

use std::collections::{BTreeMap, BTreeSet};

use crate::ignore::PermanentIgnores;
use crate::typemap::TypeLookup;

/// What a declared type name resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// A struct, union or opaque handle with a generated wrapper type.
    Wrapped { wrapper: String },
    Enum,
    /// A function-pointer typedef.
    Callback,
}

/// Emitted names plus the type kinds later passes resolve against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefinitionRegistry {
    emitted: BTreeSet<String>,
    kinds: BTreeMap<String, TypeKind>,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `name` as emitted, together with its one- and two-pointer spellings.
    pub fn record(&mut self, name: &str) {
        self.emitted.insert(name.to_string());
        self.emitted.insert(format!("{name}*"));
        self.emitted.insert(format!("{name}**"));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.emitted.contains(name)
    }

    /// Whether any of the given spellings has been emitted.
    pub fn contains_any<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> bool {
        names.into_iter().any(|n| self.contains(n))
    }

    /// Registers what a type name resolves to; an existing entry is kept.
    pub fn define(&mut self, name: &str, kind: TypeKind) {
        self.kinds.entry(name.to_string()).or_insert(kind);
    }

    pub fn kind(&self, name: &str) -> Option<&TypeKind> {
        self.kinds.get(name)
    }

    /// Every emitted spelling, in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.emitted.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.emitted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emitted.is_empty()
    }

    /// The ignore-set for the next pass: these emitted names plus `permanent`.
    pub fn ignore_set<'a>(&'a self, permanent: &'a PermanentIgnores) -> IgnoreSet<'a> {
        IgnoreSet {
            registry: self,
            permanent,
        }
    }
}

impl TypeLookup for DefinitionRegistry {
    fn lookup(&self, name: &str) -> Option<&TypeKind> {
        self.kind(name)
    }
}

/// Why a record is left out of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    /// Emitted by this or an earlier pass.
    AlreadyEmitted,
    /// Listed permanently.
    Permanent,
}

/// Union of emitted names and the permanent ignore lists.
#[derive(Debug, Clone, Copy)]
pub struct IgnoreSet<'a> {
    registry: &'a DefinitionRegistry,
    permanent: &'a PermanentIgnores,
}

impl IgnoreSet<'_> {
    pub fn check_struct(&self, names: &[&str]) -> Option<Skip> {
        if self.registry.contains_any(names.iter().copied()) {
            Some(Skip::AlreadyEmitted)
        } else if self.permanent.ignores_struct(names.iter().copied()) {
            Some(Skip::Permanent)
        } else {
            None
        }
    }

    pub fn check_function(&self, names: &[&str]) -> Option<Skip> {
        if self.registry.contains_any(names.iter().copied()) {
            Some(Skip::AlreadyEmitted)
        } else if self.permanent.ignores_function(names.iter().copied()) {
            Some(Skip::Permanent)
        } else {
            None
        }
    }
}
