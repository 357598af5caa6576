//! Function wrapper emission.

use super::names::{function_name, ident};
use crate::record::Function;
use crate::typemap::{map_type, TypeLookup};

/// Emitted wrapper source, or the reason the function cannot be wrapped.
pub(crate) fn emit_function(
    func: &Function,
    public: &str,
    native_module: &str,
    lookup: &impl TypeLookup,
) -> Result<String, String> {
    let mut params = Vec::with_capacity(func.args.len());
    let mut calls = Vec::with_capacity(func.args.len());
    for arg in &func.args {
        let mapped = map_type(&arg.ty, lookup);
        let param = mapped
            .param(&ident(&arg.name))
            .ok_or_else(|| format!("argument `{}`: {}", arg.name, mapped.reason()))?;
        params.push(param.decl);
        calls.push(param.call);
    }

    let native = ident(func.alias.as_deref().unwrap_or(&func.name));
    let call = format!("{native_module}::{native}({})", calls.join(", "));
    let mapped = map_type(&func.return_type, lookup);
    let ret = mapped
        .ret(&call, public)
        .ok_or_else(|| format!("return type: {}", mapped.reason()))?;

    let name = function_name(public);
    let signature = match &ret.ty {
        Some(ty) => format!("pub unsafe fn {name}({}) -> {ty}", params.join(", ")),
        None => format!("pub unsafe fn {name}({})", params.join(", ")),
    };
    let body = ret
        .body
        .lines()
        .map(|line| format!("    {line}"))
        .collect::<Vec<_>>()
        .join("\n");

    Ok(format!(
        "/// Calls `{native}`.
///
/// # Safety
///
/// Handle arguments must point to live native blocks of their declared types.
{signature} {{
{body}
}}
"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Arg, TypeToken};
    use crate::registry::{DefinitionRegistry, TypeKind};

    fn registry() -> DefinitionRegistry {
        let mut registry = DefinitionRegistry::new();
        registry.define("dev", TypeKind::Wrapped { wrapper: "Dev".into() });
        registry.define("cb", TypeKind::Callback);
        registry
    }

    fn function(ret: TypeToken, args: &[(&str, TypeToken)]) -> Function {
        Function {
            return_type: ret,
            name: "f".into(),
            alias: None,
            args: args
                .iter()
                .map(|(name, ty)| Arg {
                    ty: ty.clone(),
                    name: name.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn wraps_handle_argument_and_return() {
        let func = function(
            TypeToken::new("dev", 1),
            &[("d", TypeToken::new("dev", 1)), ("type", TypeToken::new("int", 0))],
        );
        let code = emit_function(&func, "f", "crate::ffi", &registry()).unwrap();
        assert!(code.contains(
            "pub unsafe fn f(d: &Dev, type_: ::std::ffi::c_int) -> Result<Dev, WrapperError> {"
        ));
        assert!(code.contains("let ret = unsafe { crate::ffi::f(d.as_ptr() as _, type_) };"));
        assert!(code.contains("Ok(unsafe { Dev::from_raw(ret as _) })"));
    }

    #[test]
    fn void_function_has_no_return_type() {
        let func = function(TypeToken::new("void", 0), &[]);
        let code = emit_function(&func, "f", "ffi", &registry()).unwrap();
        assert!(code.contains("pub unsafe fn f() {\n    unsafe { ffi::f() };\n}"));
    }

    #[test]
    fn char_pointer_argument_and_return() {
        let func = function(
            TypeToken::new("char", 1).with_const(true),
            &[("path", TypeToken::new("char", 1).with_const(true))],
        );
        let code = emit_function(&func, "f", "ffi", &registry()).unwrap();
        assert!(code.contains("pub unsafe fn f(path: Option<&::std::ffi::CStr>) -> Option<Vec<u8>> {"));
        assert!(code.contains("unsafe { read_c_str(ffi::f(c_str_arg(path) as _)) }"));
    }

    #[test]
    fn excluded_argument_reports_reason() {
        let func = function(TypeToken::new("int", 0), &[("cb", TypeToken::new("cb", 0))]);
        let err = emit_function(&func, "f", "ffi", &registry()).unwrap_err();
        assert_eq!(err, "argument `cb`: callback");

        let func = function(TypeToken::new("int", 0), &[("out", TypeToken::new("uint64_t", 1))]);
        let err = emit_function(&func, "f", "ffi", &registry()).unwrap_err();
        assert_eq!(err, "argument `out`: numeric out-pointer");
    }

    #[test]
    fn excluded_return_reports_reason() {
        let func = function(TypeToken::new("dev", 2), &[]);
        let err = emit_function(&func, "f", "ffi", &registry()).unwrap_err();
        assert_eq!(err, "return type: double indirection");
    }
}
