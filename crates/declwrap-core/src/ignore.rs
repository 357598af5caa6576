//! Names that are never generated automatically.
//!
//! The built-in lists cover the xNVMe symbols that need hand-written
//! bridges: callback registration, by-value struct returns, out-pointer
//! allocation and double-pointer signatures. Projects add their own names
//! through [`PermanentIgnores::extend_structs`] and
//! [`PermanentIgnores::extend_functions`].

use std::collections::BTreeSet;

/// Structs whose members are never generated.
pub const PERMANENT_STRUCTS: &[&str] = &["xnvme_spec_vs_register"];

/// Functions that are never generated.
pub const PERMANENT_FUNCTIONS: &[&str] = &[
    "xnvme_be_attr_list_bundled",
    "xnvme_queue_init",
    "xnvme_buf_phys_alloc",
    "xnvme_buf_phys_realloc",
    "xnvme_buf_phys_free",
    "xnvme_buf_vtophys",
    "xnvme_cmd_ctx_from_dev",
    "xnvme_enumerate",
    "xnvme_cmd_ctx_set_cb",
    "xnvme_queue_set_cb",
];

/// The permanent part of the ignore-set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermanentIgnores {
    structs: BTreeSet<String>,
    functions: BTreeSet<String>,
}

impl PermanentIgnores {
    /// The built-in lists.
    pub fn builtin() -> Self {
        Self::empty()
            .extend_structs(PERMANENT_STRUCTS.iter().copied())
            .extend_functions(PERMANENT_FUNCTIONS.iter().copied())
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn extend_structs<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.structs.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn extend_functions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.functions.extend(names.into_iter().map(Into::into));
        self
    }

    /// Whether any of the given spellings of a struct or union is listed.
    pub fn ignores_struct<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> bool {
        names.into_iter().any(|n| self.structs.contains(n))
    }

    /// Whether any of the given spellings of a function is listed.
    pub fn ignores_function<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> bool {
        names.into_iter().any(|n| self.functions.contains(n))
    }

    pub fn structs(&self) -> impl Iterator<Item = &str> {
        self.structs.iter().map(String::as_str)
    }

    pub fn functions(&self) -> impl Iterator<Item = &str> {
        self.functions.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_lists_are_carried() {
        let ignores = PermanentIgnores::builtin();
        assert!(ignores.ignores_struct(["xnvme_spec_vs_register"]));
        assert!(ignores.ignores_function(["xnvme_enumerate"]));
        assert!(ignores.ignores_function(["xnvme_cmd_ctx_from_dev"]));
        assert_eq!(ignores.functions().count(), PERMANENT_FUNCTIONS.len());
    }

    #[test]
    fn any_spelling_matches() {
        let ignores = PermanentIgnores::empty().extend_functions(["buf_free"]);
        assert!(ignores.ignores_function(["__buf_free", "buf_free"]));
        assert!(!ignores.ignores_function(["__buf_free"]));
    }

    #[test]
    fn empty_ignores_nothing() {
        let ignores = PermanentIgnores::empty();
        assert!(!ignores.ignores_struct(["xnvme_spec_vs_register"]));
        assert_eq!(ignores.structs().count(), 0);
    }
}
