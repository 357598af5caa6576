/// A command context for `dev`.
///
/// `xnvme_cmd_ctx_from_dev` returns the context by value; it is moved into an
/// owned block so the wrapper frees it on drop like any allocated context.
///
/// # Safety
///
/// `dev` must wrap a live device handle.
pub unsafe fn xnvme_cmd_ctx_from_dev(dev: &XnvmeDev) -> XnvmeCmdCtx {
    // SAFETY: guaranteed by the caller.
    let ctx = unsafe { libxnvme_sys::xnvme_cmd_ctx_from_dev(dev.as_ptr()) };
    XnvmeCmdCtx::from_block(Block::from_value(ctx))
}
