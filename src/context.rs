use crate::errno::Errno;
use std::ptr;

/// PROJ thread context
///
/// Every transformation call owns exactly one context, so nothing is shared between calls.
pub(crate) struct ThreadContext(ptr::NonNull<proj_sys::PJ_CONTEXT>);

impl ThreadContext {
    pub fn new() -> Self {
        // Safety: `proj_context_create` always returns a valid pointer to a thread context.
        let ctx = unsafe { ThreadContext::from_raw(proj_sys::proj_context_create()) };
        // `+init=` definitions keep their PROJ4 meaning (lon/lat order, no EPSG axis swap).
        unsafe { proj_sys::proj_context_use_proj4_init_rules(ctx.as_ptr(), 1) };
        ctx
    }

    /// # Safety
    ///
    /// Must provide a non-null pointer to a PROJ thread context.
    unsafe fn from_raw(ctx_ptr: *mut proj_sys::PJ_CONTEXT) -> Self {
        debug_assert!(!ctx_ptr.is_null());
        ThreadContext(unsafe { ptr::NonNull::new_unchecked(ctx_ptr) })
    }

    pub fn as_ptr(&self) -> *mut proj_sys::PJ_CONTEXT {
        self.0.as_ptr()
    }

    /// The error number of the last failed call made through this context.
    pub fn errno(&self) -> Errno {
        Errno(unsafe { proj_sys::proj_context_errno(self.as_ptr()) })
    }
}

impl Drop for ThreadContext {
    fn drop(&mut self) {
        // Safety: The pointer being provided to `proj_context_destroy` will always be a valid
        // thread context, so long as the same `ThreadContext` doesn't get dropped twice.
        unsafe { proj_sys::proj_context_destroy(self.0.as_ptr()) };
    }
}
