//! Identifier helpers for emitted Rust source.

/// Words that cannot be used as plain identifiers; bindgen appends `_` to them.
const RUST_KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "crate",
    "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl",
    "in", "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub",
    "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true", "try", "type",
    "typeof", "union", "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

/// A native name as a usable Rust identifier, following bindgen's keyword rule.
pub fn ident(name: &str) -> String {
    if RUST_KEYWORDS.contains(&name) {
        format!("{name}_")
    } else {
        name.to_string()
    }
}

/// Type names the runtime preamble defines or imports, and prelude names the
/// emitted code refers to. A wrapper with one of these names would not compile.
const RESERVED_TYPES: &[&str] = &[
    "Any", "AsRef", "Attributes", "BTreeMap", "Block", "Box", "CStr", "CString",
    "CallbackContext", "Clone", "Copy", "Default", "Drop", "Eq", "Err", "FnOnce", "From",
    "Into", "IntoIterator", "Iterator", "KeepAlive", "Layout", "Nested", "NestedMut", "None",
    "NonNull", "ObjectRef", "Ok", "OpaqueHandle", "Option", "PartialEq", "RawBlock", "Rc",
    "Result", "Retained", "Scalar", "Sized", "Some", "String", "Value", "Vec", "WrapperError",
];

/// Free functions defined by the runtime preamble.
const RESERVED_FUNCTIONS: &[&str] = &["c_str_arg", "join_path", "read_c_str"];

/// Wrapper type name for a public native name; reserved names get a `Native` prefix.
pub fn wrapper_name(public: &str) -> String {
    let name = camel_case(public);
    if RESERVED_TYPES.contains(&name.as_str()) {
        format!("Native{name}")
    } else {
        name
    }
}

/// Wrapper function name for a public native name.
pub fn function_name(public: &str) -> String {
    if RESERVED_FUNCTIONS.contains(&public) {
        format!("{public}_")
    } else {
        ident(public)
    }
}

/// `xnvme_cmd_ctx` becomes `XnvmeCmdCtx`.
pub fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for part in name.split('_').filter(|p| !p.is_empty()) {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Splits a flattened member name into its nesting segments.
///
/// Names with an empty segment (`__rsvd`, `a____b`) are not nested.
pub fn segments(name: &str) -> Vec<&str> {
    let parts: Vec<&str> = name.split("__").collect();
    if parts.iter().any(|p| p.is_empty()) {
        vec![name]
    } else {
        parts
    }
}
