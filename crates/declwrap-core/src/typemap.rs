//! Native type classification and the code templates used for each class.
//!
//! Every decision about how a native type crosses the wrapper boundary lives
//! in [`RULES`]: one entry per [`Shape`], holding the parameter form, the
//! call-site conversion, the return handling and the member accessors. Adding
//! a type category means adding a `Shape` and its table entry.
//!
//! Templates use `{placeholder}` markers:
//!
//! - `{name}`: argument identifier
//! - `{rust}`: Rust spelling of a scalar type
//! - `{wrapper}`: generated wrapper type for a record
//! - `{call}`: the native call expression
//! - `{function}`: public name of the wrapped function
//! - `{field}`: native field identifier
//! - `{attr}`: member name as seen through `getattr`
//! - `{method}`: accessor suffix (`get_{method}` / `set_{method}`)

use crate::record::TypeToken;
use crate::registry::TypeKind;

/// How a native type is treated at the wrapper boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Void,
    /// Plain numeric or boolean value.
    Scalar,
    /// `char*`, read and written as a NUL-terminated string.
    CharPointer,
    /// `void*`, carried as an opaque handle.
    VoidPointer,
    /// Pointer to a wrapped struct or union.
    RecordPointer,
    /// Struct or union passed by value.
    RecordValue,
    EnumValue,
    /// Function-pointer typedef.
    Callback,
    /// Pointer to a scalar or enum, usually an out-parameter.
    ScalarPointer,
    PointerToPointer,
    Unknown,
}

impl Shape {
    pub const ALL: [Shape; 11] = [
        Shape::Void,
        Shape::Scalar,
        Shape::CharPointer,
        Shape::VoidPointer,
        Shape::RecordPointer,
        Shape::RecordValue,
        Shape::EnumValue,
        Shape::Callback,
        Shape::ScalarPointer,
        Shape::PointerToPointer,
        Shape::Unknown,
    ];

    pub fn rule(self) -> &'static TypeRule {
        &RULES[self as usize]
    }
}

/// How a return value is turned into the wrapper's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnStrategy {
    /// No result.
    Unit,
    /// The native value as is.
    Passthrough,
    /// Copied out of a character pointer.
    Text,
    /// Null-checked and wrapped in an `OpaqueHandle`.
    Handle,
    /// Null-checked and wrapped in the record's wrapper type.
    Wrapped,
}

/// Parameter declaration and call-site expression.
#[derive(Debug)]
pub struct ParamRule {
    pub decl: &'static str,
    pub call: &'static str,
}

/// Return type (empty for none) and function body.
#[derive(Debug)]
pub struct ReturnRule {
    pub ty: &'static str,
    pub strategy: ReturnStrategy,
    pub body: &'static str,
}

/// Typed accessors plus their dynamic (`Value`) counterparts.
#[derive(Debug)]
pub struct MemberRule {
    pub get_type: &'static str,
    pub get_expr: &'static str,
    pub set_type: &'static str,
    pub set_body: &'static str,
    pub to_value: &'static str,
    pub from_value: &'static str,
}

/// Table entry for one [`Shape`]. A missing part means the shape is excluded there.
#[derive(Debug)]
pub struct TypeRule {
    pub shape: Shape,
    pub param: Option<ParamRule>,
    pub ret: Option<ReturnRule>,
    pub member: Option<MemberRule>,
    /// Why the shape is excluded where a part is missing.
    pub reason: &'static str,
}

const NULL_CHECK: &str = "let ret = unsafe { {call} };
if ret.is_null() {
    return Err(WrapperError::NullHandle { function: \"{function}\" });
}";

/// Indexed by `Shape as usize`.
pub static RULES: [TypeRule; 11] = [
    TypeRule {
        shape: Shape::Void,
        param: None,
        ret: Some(ReturnRule {
            ty: "",
            strategy: ReturnStrategy::Unit,
            body: "unsafe { {call} };",
        }),
        member: None,
        reason: "void value",
    },
    TypeRule {
        shape: Shape::Scalar,
        param: Some(ParamRule {
            decl: "{name}: {rust}",
            call: "{name}",
        }),
        ret: Some(ReturnRule {
            ty: "{rust}",
            strategy: ReturnStrategy::Passthrough,
            body: "unsafe { {call} }",
        }),
        member: Some(MemberRule {
            get_type: "{rust}",
            get_expr: "unsafe { (*raw).{field} }",
            set_type: "{rust}",
            set_body: "unsafe { (*raw).{field} = value };",
            to_value: "self.get_{method}().map(Scalar::into_value)",
            from_value: "self.set_{method}(value.to_scalar(Self::TYPE_NAME, name)?)",
        }),
        reason: "",
    },
    TypeRule {
        shape: Shape::CharPointer,
        param: Some(ParamRule {
            decl: "{name}: Option<&::std::ffi::CStr>",
            call: "c_str_arg({name}) as _",
        }),
        ret: Some(ReturnRule {
            ty: "Option<Vec<u8>>",
            strategy: ReturnStrategy::Text,
            body: "unsafe { read_c_str({call}) }",
        }),
        member: Some(MemberRule {
            get_type: "Option<Vec<u8>>",
            get_expr: "unsafe { read_c_str((*raw).{field}) }",
            set_type: "Option<&[u8]>",
            set_body: "let text = self.keep_alive.retain_text(Self::TYPE_NAME, \"{attr}\", value)?;
unsafe { (*raw).{field} = text as _ };",
            to_value: "self.get_{method}().map(Value::from_text)",
            from_value: "self.set_{method}(value.as_text(Self::TYPE_NAME, name)?)",
        }),
        reason: "",
    },
    TypeRule {
        shape: Shape::VoidPointer,
        param: Some(ParamRule {
            decl: "{name}: &OpaqueHandle",
            call: "{name}.as_ptr() as _",
        }),
        ret: Some(ReturnRule {
            ty: "Result<OpaqueHandle, WrapperError>",
            strategy: ReturnStrategy::Handle,
            body: "{null_check}
Ok(OpaqueHandle::from_ptr(ret as _))",
        }),
        member: None,
        reason: "untyped pointer",
    },
    TypeRule {
        shape: Shape::RecordPointer,
        param: Some(ParamRule {
            decl: "{name}: &{wrapper}",
            call: "{name}.as_ptr() as _",
        }),
        ret: Some(ReturnRule {
            ty: "Result<{wrapper}, WrapperError>",
            strategy: ReturnStrategy::Wrapped,
            body: "{null_check}
Ok(unsafe { {wrapper}::from_raw(ret as _) })",
        }),
        member: Some(MemberRule {
            get_type: "{wrapper}",
            get_expr: "unsafe { {wrapper}::from_raw((*raw).{field} as _) }",
            set_type: "&{wrapper}",
            set_body: "unsafe { (*raw).{field} = value.as_ptr() as _ };
self.keep_alive.retain_handle(\"{attr}\", value.as_handle());",
            to_value: "self.get_{method}().map(|v| Value::Object(v.as_object()))",
            from_value: "let target = match value.to_object(Self::TYPE_NAME, name, {wrapper}::TYPE_NAME)? {
    Some(object) => unsafe { {wrapper}::from_handle(object.handle()) },
    None => {wrapper}::new(),
};
self.set_{method}(&target)",
        }),
        reason: "",
    },
    TypeRule {
        shape: Shape::RecordValue,
        param: None,
        ret: None,
        member: None,
        reason: "struct or union by value",
    },
    TypeRule {
        shape: Shape::EnumValue,
        param: None,
        ret: None,
        member: None,
        reason: "enum value",
    },
    TypeRule {
        shape: Shape::Callback,
        param: None,
        ret: None,
        member: None,
        reason: "callback",
    },
    TypeRule {
        shape: Shape::ScalarPointer,
        param: None,
        ret: None,
        member: None,
        reason: "numeric out-pointer",
    },
    TypeRule {
        shape: Shape::PointerToPointer,
        param: None,
        ret: None,
        member: None,
        reason: "double indirection",
    },
    TypeRule {
        shape: Shape::Unknown,
        param: None,
        ret: None,
        member: None,
        reason: "unknown type",
    },
];

/// Native scalar spellings and their Rust FFI types.
pub static SCALARS: &[(&str, &str)] = &[
    ("char", "::std::ffi::c_char"),
    ("signed char", "::std::ffi::c_schar"),
    ("unsigned char", "::std::ffi::c_uchar"),
    ("short", "::std::ffi::c_short"),
    ("unsigned short", "::std::ffi::c_ushort"),
    ("int", "::std::ffi::c_int"),
    ("signed int", "::std::ffi::c_int"),
    ("unsigned", "::std::ffi::c_uint"),
    ("unsigned int", "::std::ffi::c_uint"),
    ("long", "::std::ffi::c_long"),
    ("unsigned long", "::std::ffi::c_ulong"),
    ("long long", "::std::ffi::c_longlong"),
    ("unsigned long long", "::std::ffi::c_ulonglong"),
    ("float", "f32"),
    ("double", "f64"),
    ("int8_t", "i8"),
    ("int16_t", "i16"),
    ("int32_t", "i32"),
    ("int64_t", "i64"),
    ("uint8_t", "u8"),
    ("uint16_t", "u16"),
    ("uint32_t", "u32"),
    ("uint64_t", "u64"),
    ("size_t", "usize"),
    ("ssize_t", "isize"),
    ("intptr_t", "isize"),
    ("uintptr_t", "usize"),
    ("bool", "bool"),
    ("_Bool", "bool"),
    ("bint", "::std::ffi::c_int"),
];

/// Rust type for a native scalar spelling.
pub fn scalar_type(base: &str) -> Option<&'static str> {
    SCALARS.iter().find(|(c, _)| *c == base).map(|(_, rust)| *rust)
}

/// Resolves declared type names to what the generator knows about them.
pub trait TypeLookup {
    fn lookup(&self, name: &str) -> Option<&TypeKind>;
}

/// A classified type with the values its templates need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedType {
    shape: Shape,
    rust: Option<&'static str>,
    wrapper: Option<String>,
}

/// Parameter text for a function wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamCode {
    pub decl: String,
    pub call: String,
}

/// Return type (if any) and body for a function wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnCode {
    pub ty: Option<String>,
    pub strategy: ReturnStrategy,
    pub body: String,
}

/// Rendered member accessor parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberCode {
    pub get_type: String,
    pub get_expr: String,
    pub set_type: String,
    pub set_body: String,
    pub to_value: String,
    pub from_value: String,
}

/// Classify `ty` against what `lookup` knows.
pub fn map_type(ty: &TypeToken, lookup: &impl TypeLookup) -> MappedType {
    let base = ty.base();
    let depth = ty.depth();
    let by_depth = |value: Shape, pointer: Shape| if depth == 0 { value } else { pointer };

    if depth >= 2 {
        return MappedType::plain(Shape::PointerToPointer);
    }
    if base == "void" {
        return MappedType::plain(by_depth(Shape::Void, Shape::VoidPointer));
    }
    if base == "char" && depth == 1 {
        return MappedType::plain(Shape::CharPointer);
    }
    if let Some(rust) = scalar_type(base) {
        return MappedType {
            shape: by_depth(Shape::Scalar, Shape::ScalarPointer),
            rust: Some(rust),
            wrapper: None,
        };
    }
    match lookup.lookup(base) {
        Some(TypeKind::Wrapped { wrapper }) => MappedType {
            shape: by_depth(Shape::RecordValue, Shape::RecordPointer),
            rust: None,
            wrapper: Some(wrapper.clone()),
        },
        Some(TypeKind::Enum) => MappedType::plain(by_depth(Shape::EnumValue, Shape::ScalarPointer)),
        Some(TypeKind::Callback) => MappedType::plain(by_depth(Shape::Callback, Shape::PointerToPointer)),
        None => MappedType::plain(Shape::Unknown),
    }
}

impl MappedType {
    fn plain(shape: Shape) -> Self {
        Self {
            shape,
            rust: None,
            wrapper: None,
        }
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn rule(&self) -> &'static TypeRule {
        self.shape.rule()
    }

    /// Why this type is excluded, for log messages.
    pub fn reason(&self) -> &'static str {
        self.rule().reason
    }

    pub fn param(&self, name: &str) -> Option<ParamCode> {
        let rule = self.rule().param.as_ref()?;
        let vars = self.vars(&[("name", name)]);
        Some(ParamCode {
            decl: render(rule.decl, &vars),
            call: render(rule.call, &vars),
        })
    }

    pub fn ret(&self, call: &str, function: &str) -> Option<ReturnCode> {
        let rule = self.rule().ret.as_ref()?;
        let body = rule.body.replace("{null_check}", NULL_CHECK);
        let vars = self.vars(&[("call", call), ("function", function)]);
        Some(ReturnCode {
            ty: (!rule.ty.is_empty()).then(|| render(rule.ty, &vars)),
            strategy: rule.strategy,
            body: render(&body, &vars),
        })
    }

    pub fn member(&self, field: &str, attr: &str, method: &str) -> Option<MemberCode> {
        let rule = self.rule().member.as_ref()?;
        let vars = self.vars(&[("field", field), ("attr", attr), ("method", method)]);
        Some(MemberCode {
            get_type: render(rule.get_type, &vars),
            get_expr: render(rule.get_expr, &vars),
            set_type: render(rule.set_type, &vars),
            set_body: render(rule.set_body, &vars),
            to_value: render(rule.to_value, &vars),
            from_value: render(rule.from_value, &vars),
        })
    }

    fn vars<'v>(&'v self, extra: &[(&'static str, &'v str)]) -> Vec<(&'static str, &'v str)> {
        let mut vars = extra.to_vec();
        if let Some(rust) = self.rust {
            vars.push(("rust", rust));
        }
        if let Some(wrapper) = &self.wrapper {
            vars.push(("wrapper", wrapper.as_str()));
        }
        vars
    }
}

/// Substitutes `{key}` markers; unknown markers and other braces are left alone.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}
