#![doc(html_logo_url = "https://raw.githubusercontent.com/georust/meta/master/logo/logo.png")]
//! `proj4_interop` exposes [PROJ](https://proj.org)'s point transformation behind the calling
//! convention of PROJ4's `pj_transform`.
//!
//! Each call takes a source and a destination PROJ4 definition string, initializes both
//! projections, transforms one point or a batch of points **in place**, and releases every
//! native resource before returning. Nothing is cached or shared between calls.
//!
//! # Usage
//!
//! There are two layers:
//!
//! 1. [`Proj4Api`] returns plain status codes and never fails or panics:
//!     - `0` (or any other non-negative value): PROJ's own status, passed through unchanged;
//!     - [`Proj4Api::INIT_FAILURE`] (`-1`): a projection definition could not be initialized;
//!     - [`Proj4Api::FAULT`] (`-2`): anything else went wrong, e.g. coordinate storage too
//!       short for the requested points, or a definition containing a nul byte.
//! 2. [`try_transform`] and [`try_transform_batch`] do the same work but return a
//!    [`TransformError`] describing what failed.
//!
//! With the `geo-types` feature (enabled by default), the [`Transform`] trait transforms
//! [`geo-types`](https://docs.rs/geo-types) geometries through the same calls.
//!
//! ## Conventions
//!
//! PROJ4 conventions are kept:
//!
//! - geographic coordinates are exchanged in **radians**;
//! - x is easting or longitude, y is northing or latitude;
//! - a batch addresses point `i` at index `i * point_offset` of each slice.
//!
//! Definitions such as `+proj=utm +zone=31 +datum=WGS84` are read as coordinate reference
//! systems. Anything PROJ's `proj_create` accepts as a CRS (`EPSG:4326`, WKT) works too.
//!
//! # Requirements
//!
//! `libproj` is linked through `proj-sys`. The `bundled_proj` feature builds it from source
//! instead of using the system installation.
//!
//! # Example
//!
//! ```
//! use approx::assert_relative_eq;
//! use proj4_interop::Proj4Api;
//!
//! let mut x = [2f64.to_radians(), 3f64.to_radians()];
//! let mut y = [48f64.to_radians(), 0.0];
//! let mut z = [0.0, 0.0];
//! let status = Proj4Api::transform_batch(
//!     "+proj=longlat +datum=WGS84",
//!     "+proj=utm +zone=31 +datum=WGS84",
//!     2,
//!     1,
//!     &mut x,
//!     &mut y,
//!     &mut z,
//! );
//! assert_eq!(status, 0);
//! assert_relative_eq!(x[0], 425404.89, epsilon = 1e-2);
//! assert_relative_eq!(y[0], 5316784.01, epsilon = 1e-2);
//! assert_relative_eq!(x[1], 500000.0, epsilon = 1e-6);
//! ```

use libc::c_char;
use std::ffi::CStr;
use std::str;

mod api;
mod context;
mod definition;
mod errno;
#[cfg(feature = "geo-types")]
mod geo_types;
mod pj;
mod transform;

pub use crate::api::Proj4Api;
pub use crate::definition::DefinitionError;
#[cfg(feature = "geo-types")]
pub use crate::geo_types::Transform;
pub use crate::pj::PjCreateError;
pub use crate::transform::{
    FAULT, INIT_FAILURE, Side, Status, TransformError, try_transform, try_transform_batch,
};

/// # Safety
///
/// `raw_ptr` must be null or point to a nul-terminated string that outlives the call.
pub(crate) unsafe fn _string(raw_ptr: *const c_char) -> Result<String, str::Utf8Error> {
    if raw_ptr.is_null() {
        return Ok(String::new());
    }
    let c_str = unsafe { CStr::from_ptr(raw_ptr) };
    Ok(str::from_utf8(c_str.to_bytes())?.to_string())
}
