/// Zero-filled command buffer owned by a device.
///
/// `xnvme_buf_alloc` hands out DMA-capable memory that must be returned with
/// `xnvme_buf_free` on the same device; `Drop` does that.
pub struct DeviceBuffer<'d> {
    dev: &'d XnvmeDev,
    ptr: *mut ::std::ffi::c_void,
    len: usize,
}

impl<'d> DeviceBuffer<'d> {
    pub fn new(dev: &'d XnvmeDev, len: usize) -> Result<Self, WrapperError> {
        // SAFETY: `dev` wraps a live device handle.
        let handle = unsafe { xnvme_buf_alloc(dev, len)? };
        let ptr = handle.as_ptr();
        // SAFETY: the allocation is `len` bytes long.
        unsafe { ::std::ptr::write_bytes(ptr.cast::<u8>(), 0, len) };
        Ok(Self { dev, ptr, len })
    }

    pub fn as_ptr(&self) -> *mut ::std::ffi::c_void {
        self.ptr
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Drop for DeviceBuffer<'_> {
    fn drop(&mut self) {
        // SAFETY: `ptr` came from `xnvme_buf_alloc` on this device.
        unsafe { libxnvme_sys::xnvme_buf_free(self.dev.as_ptr(), self.ptr) };
    }
}
