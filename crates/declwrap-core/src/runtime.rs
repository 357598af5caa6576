// Runtime support shared by every generated wrapper.
//
// This file is emitted verbatim at the top of each generated artifact, so it
// may only depend on `std` and must not use inner attributes or `crate::` paths.

use std::alloc::{self, Layout};
use std::any::Any;
use std::collections::BTreeMap;
use std::ffi::{c_char, c_void, CStr, CString};
use std::fmt;
use std::ptr::{self, NonNull};
use std::rc::Rc;

/// Errors raised by generated wrappers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WrapperError {
    /// An attribute was touched on a wrapper with no native block attached.
    Uninitialized { type_name: &'static str },
    /// The name matched neither a leaf field nor a nested prefix.
    UnknownAttribute { type_name: &'static str, attr: String },
    /// A function declared to return a handle returned null.
    NullHandle { function: &'static str },
    /// A dynamically assigned value does not fit the field.
    InvalidValue {
        type_name: &'static str,
        attr: String,
        expected: &'static str,
    },
}

impl WrapperError {
    pub fn unknown_attribute(type_name: &'static str, attr: &str) -> Self {
        Self::UnknownAttribute {
            type_name,
            attr: attr.to_owned(),
        }
    }

    pub fn invalid_value(type_name: &'static str, attr: &str, expected: &'static str) -> Self {
        Self::InvalidValue {
            type_name,
            attr: attr.to_owned(),
            expected,
        }
    }
}

impl fmt::Display for WrapperError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized { type_name } => write!(
                f,
                "{type_name}: internal pointer is not initialized; allocate it or supply fields when constructing"
            ),
            Self::UnknownAttribute { type_name, attr } => {
                write!(f, "{type_name} has no attribute {attr}")
            }
            Self::NullHandle { function } => write!(f, "{function} returned a null pointer"),
            Self::InvalidValue {
                type_name,
                attr,
                expected,
            } => write!(f, "{type_name}.{attr} expects {expected}"),
        }
    }
}

impl std::error::Error for WrapperError {}

/// An untyped native pointer, optionally keeping the block it points into alive.
#[derive(Clone)]
pub struct OpaqueHandle {
    ptr: *mut c_void,
    anchor: Option<Rc<dyn Any>>,
}

impl OpaqueHandle {
    pub const fn null() -> Self {
        Self {
            ptr: ptr::null_mut(),
            anchor: None,
        }
    }

    pub fn from_ptr(ptr: *mut c_void) -> Self {
        Self { ptr, anchor: None }
    }

    pub fn from_address(address: usize) -> Self {
        Self::from_ptr(address as *mut c_void)
    }

    fn anchored(ptr: *mut c_void, anchor: Option<Rc<dyn Any>>) -> Self {
        Self { ptr, anchor }
    }

    pub fn as_ptr(&self) -> *mut c_void {
        self.ptr
    }

    pub fn address(&self) -> usize {
        self.ptr as usize
    }

    pub fn is_null(&self) -> bool {
        self.ptr.is_null()
    }

    /// A handle `bytes` past this one that shares its anchor.
    pub fn offset(&self, bytes: usize) -> Self {
        Self {
            ptr: self.ptr.cast::<u8>().wrapping_add(bytes).cast(),
            anchor: self.anchor.clone(),
        }
    }
}

impl Default for OpaqueHandle {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Debug for OpaqueHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OpaqueHandle").field(&self.ptr).finish()
    }
}

impl PartialEq for OpaqueHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
    }
}

impl Eq for OpaqueHandle {}

struct RawBlock<T> {
    ptr: NonNull<T>,
    owned: bool,
    anchor: Option<Rc<dyn Any>>,
}

impl<T> Drop for RawBlock<T> {
    fn drop(&mut self) {
        let layout = Layout::new::<T>();
        if self.owned && layout.size() != 0 {
            // SAFETY: owned blocks are allocated by `Block::zeroed` with this layout.
            unsafe { alloc::dealloc(self.ptr.as_ptr().cast(), layout) };
        }
    }
}

/// The single native memory block behind a wrapper.
///
/// A block is either unallocated, an alias of memory owned elsewhere, or an
/// owned allocation freed when the last reference to it drops.
pub struct Block<T: 'static> {
    raw: Option<Rc<RawBlock<T>>>,
}

impl<T: 'static> Block<T> {
    pub const fn unallocated() -> Self {
        Self { raw: None }
    }

    /// Allocates an owned, zero-initialized block.
    pub fn zeroed() -> Self {
        let layout = Layout::new::<T>();
        let ptr = if layout.size() == 0 {
            NonNull::dangling()
        } else {
            // SAFETY: the layout has a non-zero size.
            let raw = unsafe { alloc::alloc_zeroed(layout) };
            match NonNull::new(raw.cast::<T>()) {
                Some(ptr) => ptr,
                None => alloc::handle_alloc_error(layout),
            }
        };
        Self::with_raw(ptr, true, None)
    }

    /// Moves `value` into a freshly allocated owned block.
    pub fn from_value(value: T) -> Self {
        let block = Self::zeroed();
        // SAFETY: the block was just allocated for a `T` and is exclusively ours.
        unsafe { ptr::write(block.as_ptr(), value) };
        block
    }

    /// Aliases `ptr` without taking ownership; null yields an unallocated block.
    pub fn alias(ptr: *mut T) -> Self {
        match NonNull::new(ptr) {
            Some(ptr) => Self::with_raw(ptr, false, None),
            None => Self::unallocated(),
        }
    }

    /// Aliases the pointer behind `handle`, holding on to whatever it anchors.
    pub fn from_handle(handle: &OpaqueHandle) -> Self {
        match NonNull::new(handle.as_ptr().cast::<T>()) {
            Some(ptr) => Self::with_raw(ptr, false, handle.anchor.clone()),
            None => Self::unallocated(),
        }
    }

    fn with_raw(ptr: NonNull<T>, owned: bool, anchor: Option<Rc<dyn Any>>) -> Self {
        Self {
            raw: Some(Rc::new(RawBlock { ptr, owned, anchor })),
        }
    }

    pub fn is_allocated(&self) -> bool {
        self.raw.is_some()
    }

    pub fn is_owned(&self) -> bool {
        self.raw.as_ref().is_some_and(|raw| raw.owned)
    }

    /// The block address, or null when unallocated.
    pub fn as_ptr(&self) -> *mut T {
        self.raw
            .as_ref()
            .map_or(ptr::null_mut(), |raw| raw.ptr.as_ptr())
    }

    /// The block address, failing with `Uninitialized` when there is none.
    pub fn get(&self, type_name: &'static str) -> Result<*mut T, WrapperError> {
        self.raw
            .as_ref()
            .map(|raw| raw.ptr.as_ptr())
            .ok_or(WrapperError::Uninitialized { type_name })
    }

    /// A handle to this block that keeps owned memory alive while it exists.
    pub fn to_handle(&self) -> OpaqueHandle {
        let anchor = self.raw.as_ref().and_then(|raw| {
            if raw.owned {
                Some(Rc::clone(raw) as Rc<dyn Any>)
            } else {
                raw.anchor.clone()
            }
        });
        OpaqueHandle::anchored(self.as_ptr().cast(), anchor)
    }
}

impl<T: 'static> Default for Block<T> {
    fn default() -> Self {
        Self::unallocated()
    }
}

// Retained values are never read back; holding them is the point.
#[allow(dead_code)]
enum Retained {
    Text(CString),
    Handle(OpaqueHandle),
}

/// Per-instance back-references for every non-numeric value assigned to a field.
#[derive(Default)]
pub struct KeepAlive {
    refs: BTreeMap<String, Retained>,
}

impl KeepAlive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    pub fn contains(&self, attr: &str) -> bool {
        self.refs.contains_key(attr)
    }

    /// Stores a NUL-terminated copy of `text` under `attr` and returns its address.
    ///
    /// `None` releases whatever `attr` held and yields null.
    pub fn retain_text(
        &mut self,
        type_name: &'static str,
        attr: &str,
        text: Option<&[u8]>,
    ) -> Result<*mut c_char, WrapperError> {
        let Some(text) = text else {
            self.refs.remove(attr);
            return Ok(ptr::null_mut());
        };
        let owned = CString::new(text)
            .map_err(|_| WrapperError::invalid_value(type_name, attr, "bytes without interior NUL"))?;
        let ptr = owned.as_ptr().cast_mut();
        self.refs.insert(attr.to_owned(), Retained::Text(owned));
        Ok(ptr)
    }

    pub fn retain_handle(&mut self, attr: &str, handle: OpaqueHandle) {
        self.refs.insert(attr.to_owned(), Retained::Handle(handle));
    }
}

/// A handle tagged with the wrapper type it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    type_name: &'static str,
    handle: OpaqueHandle,
}

impl ObjectRef {
    /// # Safety
    ///
    /// `handle` must be null or point to a live block of the native type behind `type_name`.
    pub unsafe fn new(type_name: &'static str, handle: OpaqueHandle) -> Self {
        Self { type_name, handle }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn handle(&self) -> &OpaqueHandle {
        &self.handle
    }
}

/// A dynamically typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Bytes(Vec<u8>),
    /// A null character pointer.
    Absent,
    Handle(OpaqueHandle),
    Object(ObjectRef),
    /// A prefix of flattened member names; resolve further through [`Nested`].
    Nested(String),
}

impl Value {
    pub fn is_number(&self) -> bool {
        matches!(
            self,
            Self::Int(_) | Self::UInt(_) | Self::Float(_) | Self::Bool(_)
        )
    }

    pub fn from_text(text: Option<Vec<u8>>) -> Self {
        text.map_or(Self::Absent, Self::Bytes)
    }

    pub fn to_scalar<S: Scalar>(&self, type_name: &'static str, attr: &str) -> Result<S, WrapperError> {
        S::from_value(self).ok_or_else(|| WrapperError::invalid_value(type_name, attr, S::EXPECTED))
    }

    pub fn as_text(&self, type_name: &'static str, attr: &str) -> Result<Option<&[u8]>, WrapperError> {
        match self {
            Self::Bytes(bytes) => Ok(Some(bytes)),
            Self::Absent => Ok(None),
            _ => Err(WrapperError::invalid_value(type_name, attr, "bytes")),
        }
    }

    /// The object reference held by this value, if it wraps `expected`.
    pub fn to_object(
        &self,
        type_name: &'static str,
        attr: &str,
        expected: &'static str,
    ) -> Result<Option<&ObjectRef>, WrapperError> {
        match self {
            Self::Object(object) if object.type_name == expected => Ok(Some(object)),
            Self::Absent => Ok(None),
            _ => Err(WrapperError::invalid_value(type_name, attr, expected)),
        }
    }

    pub fn as_nested(&self) -> Option<&str> {
        match self {
            Self::Nested(prefix) => Some(prefix),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::Bytes(text.as_bytes().to_vec())
    }
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<OpaqueHandle> for Value {
    fn from(handle: OpaqueHandle) -> Self {
        Self::Handle(handle)
    }
}

impl From<ObjectRef> for Value {
    fn from(object: ObjectRef) -> Self {
        Self::Object(object)
    }
}

/// Native scalar types that convert to and from [`Value`].
pub trait Scalar: Copy {
    const EXPECTED: &'static str;

    fn from_value(value: &Value) -> Option<Self>;

    fn into_value(self) -> Value;
}

macro_rules! signed_scalar {
    ($($ty:ty),*) => {$(
        impl Scalar for $ty {
            const EXPECTED: &'static str = stringify!($ty);

            fn from_value(value: &Value) -> Option<Self> {
                match *value {
                    Value::Int(v) => <$ty>::try_from(v).ok(),
                    Value::UInt(v) => <$ty>::try_from(v).ok(),
                    _ => None,
                }
            }

            fn into_value(self) -> Value {
                Value::Int(self as i64)
            }
        }

        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                v.into_value()
            }
        }
    )*};
}

macro_rules! unsigned_scalar {
    ($($ty:ty),*) => {$(
        impl Scalar for $ty {
            const EXPECTED: &'static str = stringify!($ty);

            fn from_value(value: &Value) -> Option<Self> {
                match *value {
                    Value::Int(v) => <$ty>::try_from(v).ok(),
                    Value::UInt(v) => <$ty>::try_from(v).ok(),
                    _ => None,
                }
            }

            fn into_value(self) -> Value {
                Value::UInt(self as u64)
            }
        }

        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                v.into_value()
            }
        }
    )*};
}

signed_scalar!(i8, i16, i32, i64, isize);
unsigned_scalar!(u8, u16, u32, u64, usize);

impl Scalar for f32 {
    const EXPECTED: &'static str = "f32";

    fn from_value(value: &Value) -> Option<Self> {
        match *value {
            Value::Float(v) => Some(v as f32),
            Value::Int(v) => Some(v as f32),
            Value::UInt(v) => Some(v as f32),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Float(f64::from(self))
    }
}

impl Scalar for f64 {
    const EXPECTED: &'static str = "f64";

    fn from_value(value: &Value) -> Option<Self> {
        match *value {
            Value::Float(v) => Some(v),
            Value::Int(v) => Some(v as f64),
            Value::UInt(v) => Some(v as f64),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl Scalar for bool {
    const EXPECTED: &'static str = "bool";

    fn from_value(value: &Value) -> Option<Self> {
        match *value {
            Value::Bool(v) => Some(v),
            Value::Int(v) => Some(v != 0),
            Value::UInt(v) => Some(v != 0),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// Name-based field access implemented by every generated struct and union wrapper.
pub trait Attributes {
    const TYPE_NAME: &'static str;
    /// Leaf fields in declared order, nested members by their flattened names.
    const FIELDS: &'static [&'static str];

    fn getattr(&self, name: &str) -> Result<Value, WrapperError>;

    fn setattr(&mut self, name: &str, value: Value) -> Result<(), WrapperError>;

    fn to_dict(&self) -> Result<BTreeMap<&'static str, Value>, WrapperError> {
        Self::FIELDS
            .iter()
            .map(|&name| Ok((name, self.getattr(name)?)))
            .collect()
    }

    /// A read proxy for the flattened members under `name`.
    fn nested(&self, name: &str) -> Result<Nested<'_, Self>, WrapperError>
    where
        Self: Sized,
    {
        match self.getattr(name)? {
            Value::Nested(prefix) => Ok(Nested::new(self, prefix)),
            _ => Err(WrapperError::unknown_attribute(Self::TYPE_NAME, name)),
        }
    }

    /// A write proxy for the flattened members under `name`.
    fn nested_mut(&mut self, name: &str) -> Result<NestedMut<'_, Self>, WrapperError>
    where
        Self: Sized,
    {
        match self.getattr(name)? {
            Value::Nested(prefix) => Ok(NestedMut::new(self, prefix)),
            _ => Err(WrapperError::unknown_attribute(Self::TYPE_NAME, name)),
        }
    }
}

/// Joins a nested prefix and a member segment into a flattened name.
pub fn join_path(prefix: &str, name: &str) -> String {
    format!("{prefix}__{name}")
}

/// Forwards reads onto the owning wrapper under a flattened-name prefix.
pub struct Nested<'a, W> {
    owner: &'a W,
    prefix: String,
}

impl<'a, W: Attributes> Nested<'a, W> {
    pub fn new(owner: &'a W, prefix: impl Into<String>) -> Self {
        Self {
            owner,
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn get(&self, name: &str) -> Result<Value, WrapperError> {
        self.owner.getattr(&join_path(&self.prefix, name))
    }

    /// The proxy one level deeper, when `name` is itself only a prefix.
    pub fn nested(&self, name: &str) -> Result<Nested<'a, W>, WrapperError> {
        let path = join_path(&self.prefix, name);
        match self.owner.getattr(&path)? {
            Value::Nested(prefix) => Ok(Nested::new(self.owner, prefix)),
            _ => Err(WrapperError::unknown_attribute(W::TYPE_NAME, &path)),
        }
    }
}

/// Forwards reads and writes onto the owning wrapper under a flattened-name prefix.
pub struct NestedMut<'a, W> {
    owner: &'a mut W,
    prefix: String,
}

impl<'a, W: Attributes> NestedMut<'a, W> {
    pub fn new(owner: &'a mut W, prefix: impl Into<String>) -> Self {
        Self {
            owner,
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn get(&self, name: &str) -> Result<Value, WrapperError> {
        self.owner.getattr(&join_path(&self.prefix, name))
    }

    pub fn set(&mut self, name: &str, value: Value) -> Result<(), WrapperError> {
        self.owner.setattr(&join_path(&self.prefix, name), value)
    }

    pub fn nested(self, name: &str) -> Result<NestedMut<'a, W>, WrapperError> {
        let path = join_path(&self.prefix, name);
        match self.owner.getattr(&path)? {
            Value::Nested(prefix) => Ok(NestedMut::new(self.owner, prefix)),
            _ => Err(WrapperError::unknown_attribute(W::TYPE_NAME, &path)),
        }
    }
}

/// The `(callback, user argument)` pair handed to native code as an opaque context.
///
/// Hand-written trampolines recover it with [`CallbackContext::with_raw`].
pub struct CallbackContext<F, A> {
    pub callback: F,
    pub arg: A,
}

impl<F, A> CallbackContext<F, A> {
    pub fn new(callback: F, arg: A) -> Box<Self> {
        Box::new(Self { callback, arg })
    }

    /// A borrowed context pointer for native calls that invoke the callback synchronously.
    pub fn as_raw(&mut self) -> *mut c_void {
        (self as *mut Self).cast()
    }

    /// Leaks the context for callbacks that stay registered; reclaim it with [`Self::from_raw`].
    pub fn into_raw(self: Box<Self>) -> *mut c_void {
        Box::into_raw(self).cast()
    }

    /// # Safety
    ///
    /// `raw` must come from [`Self::into_raw`] with the same `F` and `A`, and must
    /// no longer be reachable from native code.
    pub unsafe fn from_raw(raw: *mut c_void) -> Box<Self> {
        // SAFETY: guaranteed by the caller.
        unsafe { Box::from_raw(raw.cast()) }
    }

    /// # Safety
    ///
    /// `raw` must come from [`Self::as_raw`] or [`Self::into_raw`] with the same
    /// `F` and `A`, and the context must still be alive.
    pub unsafe fn with_raw<R>(raw: *mut c_void, f: impl FnOnce(&mut Self) -> R) -> R {
        // SAFETY: guaranteed by the caller.
        let context = unsafe { &mut *raw.cast::<Self>() };
        f(context)
    }
}

/// Copies the string behind a native character pointer; null maps to `None`.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string.
pub unsafe fn read_c_str(ptr: *const c_char) -> Option<Vec<u8>> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: non-null and NUL-terminated per the caller.
    Some(unsafe { CStr::from_ptr(ptr) }.to_bytes().to_vec())
}

/// The pointer passed to native code for an optional string argument.
pub fn c_str_arg(text: Option<&CStr>) -> *const c_char {
    text.map_or(ptr::null(), CStr::as_ptr)
}
