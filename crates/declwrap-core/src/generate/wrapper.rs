//! Struct and union wrapper emission.

use tracing::debug;

use super::names::{camel_case, ident};
use super::nesting::{NestingTree, Node};
use crate::record::Block;
use crate::typemap::{map_type, MemberCode, TypeLookup};

/// Everything needed to emit one wrapper type.
pub(crate) struct WrapperSpec<'a> {
    pub kind: &'static str,
    pub block: &'a Block,
    pub wrapper: String,
    /// Name reported by `TYPE_NAME` and in errors.
    pub type_name: &'a str,
    /// Path of the native type, such as `crate::ffi::xnvme_dev`.
    pub native_path: String,
    /// On the permanent ignore list: emitted with no members.
    pub ignored: bool,
}

/// Emitted source plus member counts for statistics.
pub(crate) struct EmittedWrapper {
    pub code: String,
    pub members: usize,
    pub excluded: usize,
}

struct Member {
    attr: String,
    code: MemberCode,
}

pub(crate) fn emit_wrapper(spec: &WrapperSpec<'_>, lookup: &impl TypeLookup) -> EmittedWrapper {
    let mut members = Vec::new();
    let mut excluded = 0;
    for field in &spec.block.fields {
        let reason = if spec.ignored {
            Some("permanent ignore list")
        } else if field.is_array() {
            Some("fixed-size array")
        } else {
            let mapped = map_type(&field.ty, lookup);
            match mapped.member(&ident(&field.name), &field.name, &field.name) {
                Some(code) => {
                    members.push(Member {
                        attr: field.name.clone(),
                        code,
                    });
                    None
                }
                None => Some(mapped.reason()),
            }
        };
        if let Some(reason) = reason {
            debug!(
                wrapper = %spec.type_name,
                member = %field.name,
                ty = %field.ty,
                reason,
                "excluding member"
            );
            excluded += 1;
        }
    }

    let attrs: Vec<&str> = members.iter().map(|m| m.attr.as_str()).collect();
    let tree = NestingTree::build(&attrs);

    let mut code = String::new();
    emit_type(&mut code, spec);
    emit_accessors(&mut code, spec, &members, &tree);
    emit_attributes(&mut code, spec, &members, &tree);
    for node in tree.interior() {
        emit_proxy(&mut code, spec, &members, node);
    }

    EmittedWrapper {
        code,
        members: members.len(),
        excluded,
    }
}

fn emit_type(code: &mut String, spec: &WrapperSpec<'_>) {
    let WrapperSpec {
        kind,
        wrapper,
        type_name,
        native_path,
        ..
    } = spec;

    code.push_str(&format!(
        "/// Wrapper over the native `{type_name}` {kind}.
pub struct {wrapper} {{
    block: Block<{native_path}>,
    keep_alive: KeepAlive,
}}

impl {wrapper} {{
    /// An unallocated wrapper; attribute access fails until a block is attached.
    pub fn new() -> Self {{
        Self::from_block(Block::unallocated())
    }}

    pub fn from_block(block: Block<{native_path}>) -> Self {{
        Self {{
            block,
            keep_alive: KeepAlive::new(),
        }}
    }}

    /// Aliases `raw` without taking ownership.
    ///
    /// # Safety
    ///
    /// `raw` must be null or point to a live `{type_name}` that outlives the wrapper.
    pub unsafe fn from_raw(raw: *mut {native_path}) -> Self {{
        Self::from_block(Block::alias(raw))
    }}

    /// Aliases the block behind `handle`, keeping whatever it anchors alive.
    ///
    /// # Safety
    ///
    /// `handle` must be null or point to a live `{type_name}`.
    pub unsafe fn from_handle(handle: &OpaqueHandle) -> Self {{
        Self::from_block(Block::from_handle(handle))
    }}
"
    ));

    if !spec.block.opaque {
        code.push_str(
            "
    /// Allocates an owned, zero-initialized block.
    pub fn alloc() -> Self {
        Self::from_block(Block::zeroed())
    }

    /// Attaches a fresh owned, zero-initialized block in place of the current one.
    ///
    /// Values retained for the previous block are released with it.
    pub fn allocate(&mut self) {
        self.block = Block::zeroed();
        self.keep_alive = KeepAlive::new();
    }

    /// Allocates an owned block and assigns each named field through `setattr`.
    pub fn with_fields<I, K>(fields: I) -> Result<Self, WrapperError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut wrapper = Self::alloc();
        for (name, value) in fields {
            wrapper.setattr(name.as_ref(), value)?;
        }
        Ok(wrapper)
    }
",
        );
    }

    code.push_str(&format!(
        "
    pub fn is_allocated(&self) -> bool {{
        self.block.is_allocated()
    }}

    pub fn is_owned(&self) -> bool {{
        self.block.is_owned()
    }}

    pub fn as_ptr(&self) -> *mut {native_path} {{
        self.block.as_ptr()
    }}

    pub fn as_handle(&self) -> OpaqueHandle {{
        self.block.to_handle()
    }}

    pub fn as_object(&self) -> ObjectRef {{
        unsafe {{ ObjectRef::new(Self::TYPE_NAME, self.block.to_handle()) }}
    }}
}}

impl Default for {wrapper} {{
    fn default() -> Self {{
        Self::new()
    }}
}}
"
    ));
}

fn emit_accessors(code: &mut String, spec: &WrapperSpec<'_>, members: &[Member], tree: &NestingTree<'_>) {
    if members.is_empty() {
        return;
    }
    let wrapper = &spec.wrapper;
    code.push_str(&format!("\n#[allow(non_snake_case)]\nimpl {wrapper} {{\n"));

    for (i, member) in members.iter().enumerate() {
        if i > 0 {
            code.push('\n');
        }
        let MemberCode {
            get_type,
            get_expr,
            set_type,
            set_body,
            ..
        } = &member.code;
        let attr = &member.attr;
        code.push_str(&format!(
            "    pub fn get_{attr}(&self) -> Result<{get_type}, WrapperError> {{
        let raw = self.block.get(Self::TYPE_NAME)?;
        Ok({get_expr})
    }}

    pub fn set_{attr}(&mut self, value: {set_type}) -> Result<(), WrapperError> {{
        let raw = self.block.get(Self::TYPE_NAME)?;
{set_body}
        Ok(())
    }}
",
            set_body = indent(set_body, 8),
        ));
    }

    for node in tree.roots.iter().filter(|n| n.is_interior()) {
        let proxy = proxy_name(wrapper, node);
        let segment = node.segment;
        code.push_str(&format!(
            "
    pub fn get_{segment}(&self) -> {proxy}<&{wrapper}> {{
        {proxy} {{ owner: self }}
    }}

    pub fn get_{segment}_mut(&mut self) -> {proxy}<&mut {wrapper}> {{
        {proxy} {{ owner: self }}
    }}
"
        ));
    }

    code.push_str("}\n");
}

fn emit_attributes(code: &mut String, spec: &WrapperSpec<'_>, members: &[Member], tree: &NestingTree<'_>) {
    let wrapper = &spec.wrapper;
    let type_name = spec.type_name;
    let fields: Vec<String> = members.iter().map(|m| format!("\"{}\"", m.attr)).collect();

    code.push_str(&format!(
        "
impl Attributes for {wrapper} {{
    const TYPE_NAME: &'static str = \"{type_name}\";
    const FIELDS: &'static [&'static str] = &[{}];
",
        fields.join(", ")
    ));

    if members.is_empty() {
        code.push_str(
            "
    fn getattr(&self, name: &str) -> Result<Value, WrapperError> {
        self.block.get(Self::TYPE_NAME)?;
        Err(WrapperError::unknown_attribute(Self::TYPE_NAME, name))
    }

    fn setattr(&mut self, name: &str, _value: Value) -> Result<(), WrapperError> {
        self.block.get(Self::TYPE_NAME)?;
        Err(WrapperError::unknown_attribute(Self::TYPE_NAME, name))
    }
}
",
        );
        return;
    }

    code.push_str(
        "
    fn getattr(&self, name: &str) -> Result<Value, WrapperError> {
        self.block.get(Self::TYPE_NAME)?;
        match name {
",
    );
    for member in members {
        code.push_str(&match_arm(&member.attr, &member.code.to_value));
    }
    let prefixes: Vec<String> = tree
        .interior()
        .iter()
        .map(|n| format!("\"{}\"", n.flat_name()))
        .collect();
    if !prefixes.is_empty() {
        code.push_str(&format!(
            "            {} => Ok(Value::Nested(name.to_string())),\n",
            prefixes.join(" | ")
        ));
    }
    code.push_str(
        "            _ => Err(WrapperError::unknown_attribute(Self::TYPE_NAME, name)),
        }
    }

    fn setattr(&mut self, name: &str, value: Value) -> Result<(), WrapperError> {
        self.block.get(Self::TYPE_NAME)?;
        match name {
",
    );
    for member in members {
        code.push_str(&match_arm(&member.attr, &member.code.from_value));
    }
    code.push_str(
        "            _ => Err(WrapperError::unknown_attribute(Self::TYPE_NAME, name)),
        }
    }
}
",
    );
}

fn emit_proxy(code: &mut String, spec: &WrapperSpec<'_>, members: &[Member], node: &Node<'_>) {
    let wrapper = &spec.wrapper;
    let proxy = proxy_name(wrapper, node);
    let flat = node.flat_name();

    let mut reads = Vec::new();
    let mut writes = Vec::new();
    for child in &node.children {
        let segment = child.segment;
        if let Some(index) = child.leaf {
            let member = &members[index];
            let attr = &member.attr;
            let MemberCode { get_type, set_type, .. } = &member.code;
            reads.push(format!(
                "    pub fn get_{segment}(&self) -> Result<{get_type}, WrapperError> {{
        self.owner.get_{attr}()
    }}
"
            ));
            writes.push(format!(
                "    pub fn set_{segment}(&mut self, value: {set_type}) -> Result<(), WrapperError> {{
        self.owner.set_{attr}(value)
    }}
"
            ));
        } else if child.is_interior() {
            let nested = proxy_name(wrapper, child);
            reads.push(format!(
                "    pub fn get_{segment}(&self) -> {nested}<&{wrapper}> {{
        {nested} {{ owner: &*self.owner }}
    }}
"
            ));
            writes.push(format!(
                "    pub fn get_{segment}_mut(&mut self) -> {nested}<&mut {wrapper}> {{
        {nested} {{ owner: &mut *self.owner }}
    }}
"
            ));
        }
    }

    code.push_str(&format!(
        "
/// Nested `{flat}` members of [`{wrapper}`].
pub struct {proxy}<R> {{
    owner: R,
}}

#[allow(non_snake_case)]
impl<R: ::std::ops::Deref<Target = {wrapper}>> {proxy}<R> {{
{}}}

#[allow(non_snake_case)]
impl<R: ::std::ops::DerefMut<Target = {wrapper}>> {proxy}<R> {{
{}}}
",
        reads.join("\n"),
        writes.join("\n"),
    ));
}

fn match_arm(attr: &str, expr: &str) -> String {
    if expr.contains('\n') {
        format!(
            "            \"{attr}\" => {{\n{}\n            }}\n",
            indent(expr, 16)
        )
    } else {
        format!("            \"{attr}\" => {expr},\n")
    }
}

fn proxy_name(wrapper: &str, node: &Node<'_>) -> String {
    let path: String = node.path.iter().map(|s| camel_case(s)).collect();
    format!("{wrapper}{path}Proxy")
}

/// Indents every line of `text` by `width` spaces.
fn indent(text: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    text.lines()
        .map(|line| format!("{pad}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Field, TypeToken};
    use crate::registry::{DefinitionRegistry, TypeKind};

    fn spec(block: &Block, ignored: bool) -> WrapperSpec<'_> {
        WrapperSpec {
            kind: "struct",
            block,
            wrapper: "Foo".to_string(),
            type_name: "foo",
            native_path: "crate::ffi::foo".to_string(),
            ignored,
        }
    }

    fn foo() -> Block {
        Block {
            name: "foo".into(),
            alias: None,
            fields: vec![
                Field::new(TypeToken::new("int", 0), "a"),
                Field::new(TypeToken::new("dev", 1), "c"),
                Field::new(TypeToken::new("uint32_t", 0), "cfg__depth"),
                Field::new(TypeToken::new("void", 1), "priv"),
            ],
            opaque: false,
        }
    }

    fn registry() -> DefinitionRegistry {
        let mut registry = DefinitionRegistry::new();
        registry.define("dev", TypeKind::Wrapped { wrapper: "Dev".into() });
        registry
    }

    #[test]
    fn excluded_members_are_counted() {
        let block = foo();
        let emitted = emit_wrapper(&spec(&block, false), &registry());
        assert_eq!(emitted.members, 3);
        assert_eq!(emitted.excluded, 1);
        assert!(!emitted.code.contains("get_priv"));
        assert!(emitted.code.contains("const FIELDS: &'static [&'static str] = &[\"a\", \"c\", \"cfg__depth\"];"));
    }

    #[test]
    fn interior_prefix_gets_proxy_and_nested_arm() {
        let block = foo();
        let code = emit_wrapper(&spec(&block, false), &registry()).code;
        assert!(code.contains("pub struct FooCfgProxy<R>"));
        assert!(code.contains("pub fn get_cfg(&self) -> FooCfgProxy<&Foo>"));
        assert!(code.contains("\"cfg\" => Ok(Value::Nested(name.to_string())),"));
        assert!(code.contains("self.owner.get_cfg__depth()"));
    }

    #[test]
    fn unknown_member_type_is_excluded_without_a_wrapper() {
        let block = foo();
        let emitted = emit_wrapper(&spec(&block, false), &DefinitionRegistry::new());
        assert_eq!(emitted.members, 2);
        assert!(!emitted.code.contains("get_c("));
    }

    #[test]
    fn ignored_block_has_no_members() {
        let block = foo();
        let emitted = emit_wrapper(&spec(&block, true), &registry());
        assert_eq!(emitted.members, 0);
        assert_eq!(emitted.excluded, 4);
        assert!(emitted.code.contains("const FIELDS: &'static [&'static str] = &[];"));
        assert!(emitted.code.contains("_value: Value"));
        assert!(emitted.code.contains("pub fn with_fields"));
        assert!(emitted.code.contains("pub fn allocate(&mut self)"));
    }

    #[test]
    fn opaque_block_has_no_allocation() {
        let block = Block {
            name: "__dev".into(),
            alias: Some("dev".into()),
            fields: Vec::new(),
            opaque: true,
        };
        let code = emit_wrapper(&spec(&block, false), &registry()).code;
        assert!(!code.contains("pub fn alloc()"));
        assert!(!code.contains("pub fn allocate(&mut self)"));
        assert!(code.contains("pub unsafe fn from_handle"));
    }
}
