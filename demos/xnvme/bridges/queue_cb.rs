/// Completion callback for commands submitted through a queue.
pub type QueueFn<A> = fn(&mut XnvmeCmdCtx, &mut A);

unsafe extern "C" fn queue_trampoline<A>(
    ctx: *mut libxnvme_sys::xnvme_cmd_ctx,
    opaque: *mut ::std::ffi::c_void,
) {
    // SAFETY: `opaque` belongs to a live `QueueCallback<A>`.
    unsafe {
        CallbackContext::<QueueFn<A>, A>::with_raw(opaque, |cb| {
            let mut ctx = XnvmeCmdCtx::from_raw(ctx);
            (cb.callback)(&mut ctx, &mut cb.arg)
        })
    }
}

/// A completion callback registered with the native layer.
///
/// Completions arrive after the registering call returns, so the context
/// lives on the heap until this value drops. Drop it only once the queue is
/// drained or the callback has been replaced.
pub struct QueueCallback<A> {
    raw: *mut ::std::ffi::c_void,
    marker: ::std::marker::PhantomData<A>,
}

impl<A> QueueCallback<A> {
    fn register(callback: QueueFn<A>, arg: A) -> Self {
        Self {
            raw: CallbackContext::new(callback, arg).into_raw(),
            marker: ::std::marker::PhantomData,
        }
    }

    /// The user argument, as completions have left it so far.
    pub fn arg(&mut self) -> &mut A {
        // SAFETY: `raw` came from `into_raw` with these parameters and is freed only on drop.
        unsafe { &mut (*self.raw.cast::<CallbackContext<QueueFn<A>, A>>()).arg }
    }
}

impl<A> Drop for QueueCallback<A> {
    fn drop(&mut self) {
        // SAFETY: `raw` came from `into_raw` with these parameters.
        drop(unsafe { CallbackContext::<QueueFn<A>, A>::from_raw(self.raw) });
    }
}

/// Sets the completion callback of a single command context.
///
/// # Safety
///
/// `ctx` must be allocated, and the returned value must outlive the command.
pub unsafe fn xnvme_cmd_ctx_set_cb<A>(ctx: &XnvmeCmdCtx, callback: QueueFn<A>, arg: A) -> QueueCallback<A> {
    let registered = QueueCallback::register(callback, arg);
    // SAFETY: the trampoline matches `xnvme_queue_cb` and the context is leaked until drop.
    unsafe { libxnvme_sys::xnvme_cmd_ctx_set_cb(ctx.as_ptr(), Some(queue_trampoline::<A>), registered.raw) };
    registered
}

/// Sets the default completion callback for every command on `queue`.
///
/// # Safety
///
/// `queue` must wrap a live queue, and the returned value must outlive its commands.
pub unsafe fn xnvme_queue_set_cb<A>(
    queue: &XnvmeQueue,
    callback: QueueFn<A>,
    arg: A,
) -> (::std::ffi::c_int, QueueCallback<A>) {
    let registered = QueueCallback::register(callback, arg);
    // SAFETY: as for `xnvme_cmd_ctx_set_cb`.
    let status = unsafe {
        libxnvme_sys::xnvme_queue_set_cb(queue.as_ptr(), Some(queue_trampoline::<A>), registered.raw)
    };
    (status, registered)
}
