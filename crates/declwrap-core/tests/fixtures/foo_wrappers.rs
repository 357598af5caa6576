// declarations from foo.pxd

/// Wrapper over the native `dev` struct.
pub struct Dev {
    block: Block<crate::ffi::dev>,
    keep_alive: KeepAlive,
}

impl Dev {
    /// An unallocated wrapper; attribute access fails until a block is attached.
    pub fn new() -> Self {
        Self::from_block(Block::unallocated())
    }

    pub fn from_block(block: Block<crate::ffi::dev>) -> Self {
        Self {
            block,
            keep_alive: KeepAlive::new(),
        }
    }

    /// Aliases `raw` without taking ownership.
    ///
    /// # Safety
    ///
    /// `raw` must be null or point to a live `dev` that outlives the wrapper.
    pub unsafe fn from_raw(raw: *mut crate::ffi::dev) -> Self {
        Self::from_block(Block::alias(raw))
    }

    /// Aliases the block behind `handle`, keeping whatever it anchors alive.
    ///
    /// # Safety
    ///
    /// `handle` must be null or point to a live `dev`.
    pub unsafe fn from_handle(handle: &OpaqueHandle) -> Self {
        Self::from_block(Block::from_handle(handle))
    }

    pub fn is_allocated(&self) -> bool {
        self.block.is_allocated()
    }

    pub fn is_owned(&self) -> bool {
        self.block.is_owned()
    }

    pub fn as_ptr(&self) -> *mut crate::ffi::dev {
        self.block.as_ptr()
    }

    pub fn as_handle(&self) -> OpaqueHandle {
        self.block.to_handle()
    }

    pub fn as_object(&self) -> ObjectRef {
        unsafe { ObjectRef::new(Self::TYPE_NAME, self.block.to_handle()) }
    }
}

impl Default for Dev {
    fn default() -> Self {
        Self::new()
    }
}

impl Attributes for Dev {
    const TYPE_NAME: &'static str = "dev";
    const FIELDS: &'static [&'static str] = &[];

    fn getattr(&self, name: &str) -> Result<Value, WrapperError> {
        self.block.get(Self::TYPE_NAME)?;
        Err(WrapperError::unknown_attribute(Self::TYPE_NAME, name))
    }

    fn setattr(&mut self, name: &str, _value: Value) -> Result<(), WrapperError> {
        self.block.get(Self::TYPE_NAME)?;
        Err(WrapperError::unknown_attribute(Self::TYPE_NAME, name))
    }
}

/// Wrapper over the native `foo` struct.
pub struct Foo {
    block: Block<crate::ffi::foo>,
    keep_alive: KeepAlive,
}

impl Foo {
    /// An unallocated wrapper; attribute access fails until a block is attached.
    pub fn new() -> Self {
        Self::from_block(Block::unallocated())
    }

    pub fn from_block(block: Block<crate::ffi::foo>) -> Self {
        Self {
            block,
            keep_alive: KeepAlive::new(),
        }
    }

    /// Aliases `raw` without taking ownership.
    ///
    /// # Safety
    ///
    /// `raw` must be null or point to a live `foo` that outlives the wrapper.
    pub unsafe fn from_raw(raw: *mut crate::ffi::foo) -> Self {
        Self::from_block(Block::alias(raw))
    }

    /// Aliases the block behind `handle`, keeping whatever it anchors alive.
    ///
    /// # Safety
    ///
    /// `handle` must be null or point to a live `foo`.
    pub unsafe fn from_handle(handle: &OpaqueHandle) -> Self {
        Self::from_block(Block::from_handle(handle))
    }

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

    pub fn is_allocated(&self) -> bool {
        self.block.is_allocated()
    }

    pub fn is_owned(&self) -> bool {
        self.block.is_owned()
    }

    pub fn as_ptr(&self) -> *mut crate::ffi::foo {
        self.block.as_ptr()
    }

    pub fn as_handle(&self) -> OpaqueHandle {
        self.block.to_handle()
    }

    pub fn as_object(&self) -> ObjectRef {
        unsafe { ObjectRef::new(Self::TYPE_NAME, self.block.to_handle()) }
    }
}

impl Default for Foo {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(non_snake_case)]
impl Foo {
    pub fn get_a(&self) -> Result<::std::ffi::c_int, WrapperError> {
        let raw = self.block.get(Self::TYPE_NAME)?;
        Ok(unsafe { (*raw).a })
    }

    pub fn set_a(&mut self, value: ::std::ffi::c_int) -> Result<(), WrapperError> {
        let raw = self.block.get(Self::TYPE_NAME)?;
        unsafe { (*raw).a = value };
        Ok(())
    }

    pub fn get_b(&self) -> Result<Option<Vec<u8>>, WrapperError> {
        let raw = self.block.get(Self::TYPE_NAME)?;
        Ok(unsafe { read_c_str((*raw).b) })
    }

    pub fn set_b(&mut self, value: Option<&[u8]>) -> Result<(), WrapperError> {
        let raw = self.block.get(Self::TYPE_NAME)?;
        let text = self.keep_alive.retain_text(Self::TYPE_NAME, "b", value)?;
        unsafe { (*raw).b = text as _ };
        Ok(())
    }

    pub fn get_c(&self) -> Result<Dev, WrapperError> {
        let raw = self.block.get(Self::TYPE_NAME)?;
        Ok(unsafe { Dev::from_raw((*raw).c as _) })
    }

    pub fn set_c(&mut self, value: &Dev) -> Result<(), WrapperError> {
        let raw = self.block.get(Self::TYPE_NAME)?;
        unsafe { (*raw).c = value.as_ptr() as _ };
        self.keep_alive.retain_handle("c", value.as_handle());
        Ok(())
    }

    pub fn get_cfg__depth(&self) -> Result<u32, WrapperError> {
        let raw = self.block.get(Self::TYPE_NAME)?;
        Ok(unsafe { (*raw).cfg__depth })
    }

    pub fn set_cfg__depth(&mut self, value: u32) -> Result<(), WrapperError> {
        let raw = self.block.get(Self::TYPE_NAME)?;
        unsafe { (*raw).cfg__depth = value };
        Ok(())
    }

    pub fn get_cfg__qp__id(&self) -> Result<u8, WrapperError> {
        let raw = self.block.get(Self::TYPE_NAME)?;
        Ok(unsafe { (*raw).cfg__qp__id })
    }

    pub fn set_cfg__qp__id(&mut self, value: u8) -> Result<(), WrapperError> {
        let raw = self.block.get(Self::TYPE_NAME)?;
        unsafe { (*raw).cfg__qp__id = value };
        Ok(())
    }

    pub fn get_cfg(&self) -> FooCfgProxy<&Foo> {
        FooCfgProxy { owner: self }
    }

    pub fn get_cfg_mut(&mut self) -> FooCfgProxy<&mut Foo> {
        FooCfgProxy { owner: self }
    }
}

impl Attributes for Foo {
    const TYPE_NAME: &'static str = "foo";
    const FIELDS: &'static [&'static str] = &["a", "b", "c", "cfg__depth", "cfg__qp__id"];

    fn getattr(&self, name: &str) -> Result<Value, WrapperError> {
        self.block.get(Self::TYPE_NAME)?;
        match name {
            "a" => self.get_a().map(Scalar::into_value),
            "b" => self.get_b().map(Value::from_text),
            "c" => self.get_c().map(|v| Value::Object(v.as_object())),
            "cfg__depth" => self.get_cfg__depth().map(Scalar::into_value),
            "cfg__qp__id" => self.get_cfg__qp__id().map(Scalar::into_value),
            "cfg" | "cfg__qp" => Ok(Value::Nested(name.to_string())),
            _ => Err(WrapperError::unknown_attribute(Self::TYPE_NAME, name)),
        }
    }

    fn setattr(&mut self, name: &str, value: Value) -> Result<(), WrapperError> {
        self.block.get(Self::TYPE_NAME)?;
        match name {
            "a" => self.set_a(value.to_scalar(Self::TYPE_NAME, name)?),
            "b" => self.set_b(value.as_text(Self::TYPE_NAME, name)?),
            "c" => {
                let target = match value.to_object(Self::TYPE_NAME, name, Dev::TYPE_NAME)? {
                    Some(object) => unsafe { Dev::from_handle(object.handle()) },
                    None => Dev::new(),
                };
                self.set_c(&target)
            }
            "cfg__depth" => self.set_cfg__depth(value.to_scalar(Self::TYPE_NAME, name)?),
            "cfg__qp__id" => self.set_cfg__qp__id(value.to_scalar(Self::TYPE_NAME, name)?),
            _ => Err(WrapperError::unknown_attribute(Self::TYPE_NAME, name)),
        }
    }
}

/// Nested `cfg` members of [`Foo`].
pub struct FooCfgProxy<R> {
    owner: R,
}

#[allow(non_snake_case)]
impl<R: ::std::ops::Deref<Target = Foo>> FooCfgProxy<R> {
    pub fn get_depth(&self) -> Result<u32, WrapperError> {
        self.owner.get_cfg__depth()
    }

    pub fn get_qp(&self) -> FooCfgQpProxy<&Foo> {
        FooCfgQpProxy { owner: &*self.owner }
    }
}

#[allow(non_snake_case)]
impl<R: ::std::ops::DerefMut<Target = Foo>> FooCfgProxy<R> {
    pub fn set_depth(&mut self, value: u32) -> Result<(), WrapperError> {
        self.owner.set_cfg__depth(value)
    }

    pub fn get_qp_mut(&mut self) -> FooCfgQpProxy<&mut Foo> {
        FooCfgQpProxy { owner: &mut *self.owner }
    }
}

/// Nested `cfg__qp` members of [`Foo`].
pub struct FooCfgQpProxy<R> {
    owner: R,
}

#[allow(non_snake_case)]
impl<R: ::std::ops::Deref<Target = Foo>> FooCfgQpProxy<R> {
    pub fn get_id(&self) -> Result<u8, WrapperError> {
        self.owner.get_cfg__qp__id()
    }
}

#[allow(non_snake_case)]
impl<R: ::std::ops::DerefMut<Target = Foo>> FooCfgQpProxy<R> {
    pub fn set_id(&mut self, value: u8) -> Result<(), WrapperError> {
        self.owner.set_cfg__qp__id(value)
    }
}

/// Calls `alloc_buf`.
///
/// # Safety
///
/// Handle arguments must point to live native blocks of their declared types.
pub unsafe fn alloc_buf(d: &Dev, n: ::std::ffi::c_int) -> Result<OpaqueHandle, WrapperError> {
    let ret = unsafe { crate::ffi::alloc_buf(d.as_ptr() as _, n) };
    if ret.is_null() {
        return Err(WrapperError::NullHandle { function: "alloc_buf" });
    }
    Ok(OpaqueHandle::from_ptr(ret as _))
}
