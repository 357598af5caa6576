//! Typed declaration records produced by the parser.
//!
//! Every record renders back into the declaration dialect through `Display`,
//! so `parse(render(record)) == record` for anything the parser accepts.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::{DeclwrapError, Result};

/// A normalized native type: base name, pointer depth and constness.
///
/// Elaborated-type keywords (`struct`, `union`, `enum`) and `volatile` are
/// dropped during normalization; `const` is kept as a flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeToken {
    base: String,
    depth: usize,
    is_const: bool,
}

impl TypeToken {
    /// A non-const type with `depth` levels of indirection.
    pub fn new(base: impl Into<String>, depth: usize) -> Self {
        Self {
            base: base.into(),
            depth,
            is_const: false,
        }
    }

    /// Builds a type from declaration words and a pointer count.
    ///
    /// Fails when no base word remains after qualifiers are removed.
    pub fn from_words<'w>(words: impl IntoIterator<Item = &'w str>, depth: usize) -> Result<Self> {
        let mut base: Vec<&str> = Vec::new();
        let mut is_const = false;
        for word in words {
            match word {
                "const" => is_const = true,
                "volatile" | "struct" | "union" | "enum" => {}
                other => base.push(other),
            }
        }
        if base.is_empty() {
            return Err(DeclwrapError::InvalidType {
                detail: "missing base type".to_string(),
            });
        }
        Ok(Self {
            base: base.join(" "),
            depth,
            is_const,
        })
    }

    pub fn with_const(mut self, is_const: bool) -> Self {
        self.is_const = is_const;
        self
    }

    /// The type name without qualifiers or pointer markers.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Number of pointer markers.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_const(&self) -> bool {
        self.is_const
    }

    pub fn is_pointer(&self) -> bool {
        self.depth > 0
    }

    /// The same type with one more level of indirection.
    pub fn pointer_to(&self) -> Self {
        Self {
            depth: self.depth + 1,
            ..self.clone()
        }
    }
}

impl fmt::Display for TypeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_const {
            write!(f, "const ")?;
        }
        write!(f, "{}{}", self.base, "*".repeat(self.depth))
    }
}

impl FromStr for TypeToken {
    type Err = DeclwrapError;

    /// Parse a type such as `"const char*"` or `"unsigned int"`.
    fn from_str(s: &str) -> Result<Self> {
        let depth = s.matches('*').count();
        let spaced = s.replace('*', " ");
        if let Some(bad) = spaced
            .split_whitespace()
            .find(|w| !w.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
        {
            return Err(DeclwrapError::InvalidType {
                detail: format!("unexpected '{bad}' in '{s}'"),
            });
        }
        Self::from_words(spaced.split_whitespace(), depth)
    }
}

impl Serialize for TypeToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A struct or union member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub ty: TypeToken,
    /// Member name; `__` separates segments of a flattened nested member.
    pub name: String,
    /// Bracket content for fixed-size arrays (`rsvd[4]` holds `"4"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub array: Option<String>,
}

impl Field {
    pub fn new(ty: TypeToken, name: impl Into<String>) -> Self {
        Self {
            ty,
            name: name.into(),
            array: None,
        }
    }

    pub fn is_array(&self) -> bool {
        self.array.is_some()
    }
}

/// A struct or union declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Block {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub fields: Vec<Field>,
    /// Declared without a body; only ever handled through pointers.
    pub opaque: bool,
}

/// A function argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Arg {
    pub ty: TypeToken,
    pub name: String,
}

/// A function header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Function {
    pub return_type: TypeToken,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub args: Vec<Arg>,
}

/// An enum header. Only the name is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumDecl {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// A function-pointer typedef header. The parameter list is not kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Typedef {
    pub return_type: TypeToken,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// One declaration extracted from a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DeclarationRecord {
    Struct(Block),
    Union(Block),
    Function(Function),
    Enum(EnumDecl),
    Typedef(Typedef),
}

impl DeclarationRecord {
    /// The declared name.
    pub fn name(&self) -> &str {
        match self {
            Self::Struct(b) | Self::Union(b) => &b.name,
            Self::Function(f) => &f.name,
            Self::Enum(e) => &e.name,
            Self::Typedef(t) => &t.name,
        }
    }

    /// The quoted alias, if one was declared.
    pub fn alias(&self) -> Option<&str> {
        match self {
            Self::Struct(b) | Self::Union(b) => b.alias.as_deref(),
            Self::Function(f) => f.alias.as_deref(),
            Self::Enum(e) => e.alias.as_deref(),
            Self::Typedef(t) => t.alias.as_deref(),
        }
    }

    /// Name used for generated items: the alias, else the name without leading underscores.
    pub fn public_name(&self) -> &str {
        public_name(self.name(), self.alias())
    }

    /// Name of the symbol in the native module: the alias, else the name.
    pub fn native_name(&self) -> &str {
        self.alias().unwrap_or(self.name())
    }

    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Struct(_) => "struct",
            Self::Union(_) => "union",
            Self::Function(_) => "function",
            Self::Enum(_) => "enum",
            Self::Typedef(_) => "typedef",
        }
    }
}

pub(crate) fn public_name<'a>(name: &'a str, alias: Option<&'a str>) -> &'a str {
    match alias {
        Some(alias) => alias,
        None => {
            let trimmed = name.trim_start_matches('_');
            if trimmed.is_empty() {
                name
            } else {
                trimmed
            }
        }
    }
}

struct AliasSuffix<'a>(Option<&'a str>);

impl fmt::Display for AliasSuffix<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(alias) => write!(f, " \"{alias}\""),
            None => Ok(()),
        }
    }
}

impl fmt::Display for DeclarationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Struct(block) | Self::Union(block) => {
                write!(
                    f,
                    "{} {}{}",
                    self.kind_label(),
                    block.name,
                    AliasSuffix(block.alias.as_deref())
                )?;
                if block.opaque {
                    return Ok(());
                }
                write!(f, ":")?;
                for field in &block.fields {
                    write!(f, "\n    {} {}", field.ty, field.name)?;
                    if let Some(array) = &field.array {
                        write!(f, "[{array}]")?;
                    }
                }
                Ok(())
            }
            Self::Function(func) => {
                write!(
                    f,
                    "{} {}{}(",
                    func.return_type,
                    func.name,
                    AliasSuffix(func.alias.as_deref())
                )?;
                for (i, arg) in func.args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} {}", arg.ty, arg.name)?;
                }
                write!(f, ")")
            }
            Self::Enum(e) => write!(f, "enum {}{}:", e.name, AliasSuffix(e.alias.as_deref())),
            Self::Typedef(t) => write!(
                f,
                "typedef {} (*{}{})(...)",
                t.return_type,
                t.name,
                AliasSuffix(t.alias.as_deref())
            ),
        }
    }
}
