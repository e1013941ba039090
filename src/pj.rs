use crate::context::ThreadContext;
use crate::definition::ProjDefinition;
use crate::errno::Errno;
use std::{mem, ptr};
use thiserror::Error;
use tracing::debug;

/// A safe wrapper around `proj_sys::PJ`.
///
/// The handle borrows the context it was created in, so it is always destroyed first.
pub(crate) struct Pj<'ctx> {
    pj: ptr::NonNull<proj_sys::PJ>,
    ctx: &'ctx ThreadContext,
}

impl<'ctx> Pj<'ctx> {
    /// Initialize a coordinate reference system from a definition.
    pub fn from_definition(
        ctx: &'ctx ThreadContext,
        definition: &ProjDefinition,
    ) -> Result<Self, PjCreateError> {
        if definition.is_blank() {
            return Err(PjCreateError::EmptyDefinition);
        }
        let pj_ptr = unsafe { proj_sys::proj_create(ctx.as_ptr(), definition.as_ptr()) };
        let pj = Pj::from_pj_ptr(ctx, pj_ptr)?;
        if unsafe { proj_sys::proj_is_crs(pj.as_ptr()) } == 0 {
            return Err(PjCreateError::NotACrs);
        }
        debug!(definition = ?definition, "created projection");
        Ok(pj)
    }

    /// Create the operation transforming coordinates from `source` to `target`.
    ///
    /// Axis order is normalized so that x is always easting or longitude.
    pub fn crs_to_crs(
        ctx: &'ctx ThreadContext,
        source: &Pj<'_>,
        target: &Pj<'_>,
    ) -> Result<Self, PjCreateError> {
        let pj_ptr = unsafe {
            proj_sys::proj_create_crs_to_crs_from_pj(
                ctx.as_ptr(),
                source.as_ptr(),
                target.as_ptr(),
                ptr::null_mut(),
                ptr::null(),
            )
        };
        let operation = Pj::from_pj_ptr(ctx, pj_ptr)?;
        let normalized =
            unsafe { proj_sys::proj_normalize_for_visualization(ctx.as_ptr(), operation.as_ptr()) };
        Pj::from_pj_ptr(ctx, normalized)
    }

    fn from_pj_ptr(
        ctx: &'ctx ThreadContext,
        pj_ptr: *mut proj_sys::PJconsts,
    ) -> Result<Self, PjCreateError> {
        ptr::NonNull::new(pj_ptr)
            .ok_or_else(|| {
                let errno = ctx.errno();
                match errno.message(ctx) {
                    Ok(s) => PjCreateError::ProjError(errno.0, s),
                    Err(err) => PjCreateError::ProjErrorMessageUtf8Error(err),
                }
            })
            .map(|pj| Pj { pj, ctx })
    }

    pub fn as_ptr(&self) -> *mut proj_sys::PJ {
        self.pj.as_ptr()
    }

    pub fn errno_reset(&self) -> Errno {
        Errno(unsafe { proj_sys::proj_errno_reset(self.as_ptr()) })
    }

    pub fn errno(&self) -> Errno {
        Errno(unsafe { proj_sys::proj_errno(self.as_ptr()) })
    }

    pub fn error_message(&self, errno: Errno) -> Option<String> {
        errno.message(self.ctx).ok()
    }

    /// Whether the operation expects angular input in degrees rather than radians.
    pub fn degree_input(&self, direction: proj_sys::PJ_DIRECTION) -> bool {
        unsafe { proj_sys::proj_degree_input(self.as_ptr(), direction) != 0 }
    }

    /// Whether the operation produces angular output in degrees rather than radians.
    pub fn degree_output(&self, direction: proj_sys::PJ_DIRECTION) -> bool {
        unsafe { proj_sys::proj_degree_output(self.as_ptr(), direction) != 0 }
    }

    /// Transform `count` points spaced `offset` elements apart, in place.
    ///
    /// Returns the number of points PROJ reports as transformed.
    ///
    /// # Safety
    ///
    /// Each slice must hold at least `required_len(count, offset)` elements.
    pub unsafe fn trans_generic(
        &self,
        direction: proj_sys::PJ_DIRECTION,
        count: usize,
        offset: usize,
        x: &mut [f64],
        y: &mut [f64],
        z: &mut [f64],
    ) -> usize {
        let required = crate::transform::required_len(count, offset).unwrap_or(usize::MAX);
        debug_assert!(
            x.len() >= required && y.len() >= required && z.len() >= required,
            "coordinate storage holds fewer than {required} elements"
        );
        if count == 0 {
            return 0;
        }
        let stride = offset * mem::size_of::<f64>();
        unsafe {
            proj_sys::proj_trans_generic(
                self.as_ptr(),
                direction,
                x.as_mut_ptr(),
                stride,
                count,
                y.as_mut_ptr(),
                stride,
                count,
                z.as_mut_ptr(),
                stride,
                count,
                ptr::null_mut(),
                0,
                0,
            )
        }
    }
}

impl Drop for Pj<'_> {
    fn drop(&mut self) {
        unsafe {
            proj_sys::proj_destroy(self.as_ptr());
        }
    }
}

#[derive(Error, Debug)]
pub enum PjCreateError {
    #[error("The projection definition is empty")]
    EmptyDefinition,
    #[error("The projection definition does not describe a coordinate reference system")]
    NotACrs,
    #[error("The underlying PROJ call failed with error {0}: {1}")]
    ProjError(libc::c_int, String),
    #[error("A UTF8 error occurred when constructing a PROJ error message")]
    ProjErrorMessageUtf8Error(std::str::Utf8Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(s: &str) -> ProjDefinition {
        ProjDefinition::new(s).unwrap()
    }

    #[test]
    fn creates_crs_from_proj4_string() {
        let ctx = ThreadContext::new();
        let pj = Pj::from_definition(&ctx, &definition("+proj=longlat +datum=WGS84"));
        assert!(pj.is_ok());
    }

    #[test]
    fn rejects_garbage() {
        let ctx = ThreadContext::new();
        let err = Pj::from_definition(&ctx, &definition("+proj=this_is_not_a_projection"))
            .err()
            .unwrap();
        assert!(matches!(err, PjCreateError::ProjError(..)));
    }

    #[test]
    fn rejects_empty() {
        let ctx = ThreadContext::new();
        assert!(matches!(
            Pj::from_definition(&ctx, &definition("")),
            Err(PjCreateError::EmptyDefinition)
        ));
    }

    #[test]
    fn geographic_source_takes_degrees() {
        let ctx = ThreadContext::new();
        let source = Pj::from_definition(&ctx, &definition("+proj=longlat +datum=WGS84")).unwrap();
        let target =
            Pj::from_definition(&ctx, &definition("+proj=utm +zone=31 +datum=WGS84")).unwrap();
        let operation = Pj::crs_to_crs(&ctx, &source, &target).unwrap();
        assert!(operation.degree_input(proj_sys::PJ_DIRECTION_PJ_FWD));
        assert!(!operation.degree_output(proj_sys::PJ_DIRECTION_PJ_FWD));
    }

    #[test]
    fn trans_generic_reports_transformed_count() {
        let ctx = ThreadContext::new();
        let crs = Pj::from_definition(&ctx, &definition("+proj=longlat +datum=WGS84")).unwrap();
        let operation = Pj::crs_to_crs(&ctx, &crs, &crs).unwrap();
        let (mut x, mut y, mut z) = ([0.01, 0.02], [0.03, 0.04], [0.0; 2]);
        let transformed = unsafe {
            operation.trans_generic(proj_sys::PJ_DIRECTION_PJ_FWD, 2, 1, &mut x, &mut y, &mut z)
        };
        assert_eq!(transformed, 2);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "coordinate storage")]
    fn short_storage_is_caught_in_debug_builds() {
        let ctx = ThreadContext::new();
        let crs = Pj::from_definition(&ctx, &definition("+proj=longlat +datum=WGS84")).unwrap();
        let operation = Pj::crs_to_crs(&ctx, &crs, &crs).unwrap();
        let (mut x, mut y, mut z) = ([0.0; 2], [0.0; 2], [0.0; 1]);
        unsafe {
            operation.trans_generic(proj_sys::PJ_DIRECTION_PJ_FWD, 2, 1, &mut x, &mut y, &mut z);
        }
    }
}
