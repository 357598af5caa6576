/// Called once per device found by [`xnvme_enumerate`]; a non-zero return stops the scan.
pub type EnumerateFn<A> = fn(&XnvmeDev, &mut A) -> ::std::ffi::c_int;

unsafe extern "C" fn enumerate_trampoline<A>(
    dev: *mut libxnvme_sys::xnvme_dev,
    cb_args: *mut ::std::ffi::c_void,
) -> ::std::ffi::c_int {
    // SAFETY: `cb_args` is the context `xnvme_enumerate` packed for this `A`,
    // alive for the duration of the native call.
    unsafe {
        CallbackContext::<EnumerateFn<A>, A>::with_raw(cb_args, |ctx| {
            let dev = XnvmeDev::from_raw(dev);
            (ctx.callback)(&dev, &mut ctx.arg)
        })
    }
}

/// Enumerates devices reachable through `sys_uri`, or on the local system for `None`.
///
/// Returns the native status together with `arg` as the callback left it.
///
/// # Safety
///
/// `opts` must be allocated.
pub unsafe fn xnvme_enumerate<A>(
    sys_uri: Option<&::std::ffi::CStr>,
    opts: &XnvmeOpts,
    callback: EnumerateFn<A>,
    arg: A,
) -> (::std::ffi::c_int, A) {
    let mut ctx = CallbackContext::new(callback, arg);
    // SAFETY: the trampoline matches `xnvme_enumerate_cb` and runs before this call returns.
    let status = unsafe {
        libxnvme_sys::xnvme_enumerate(
            c_str_arg(sys_uri),
            opts.as_ptr(),
            Some(enumerate_trampoline::<A>),
            ctx.as_raw(),
        )
    };
    (status, ctx.arg)
}
