use std::fmt;

use thiserror::Error;
use tracing::{debug, warn};

use crate::context::ThreadContext;
use crate::definition::{DefinitionError, ProjDefinition};
use crate::pj::{Pj, PjCreateError};

/// The status code of a transformation.
///
/// Non-negative values come straight from PROJ: `0` when every point was transformed,
/// otherwise PROJ's error number. The negative values [`INIT_FAILURE`] and [`FAULT`] are
/// produced by this crate.
pub type Status = i32;

/// Either projection definition failed to produce a handle.
pub const INIT_FAILURE: Status = -1;

/// Any other failure: bad arguments, unencodable strings, or a panic.
pub const FAULT: Status = -2;

const FORWARD: proj_sys::PJ_DIRECTION = proj_sys::PJ_DIRECTION_PJ_FWD;

/// Which of the two projection definitions an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Source,
    Destination,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Source => f.write_str("source"),
            Side::Destination => f.write_str("destination"),
        }
    }
}

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Could not initialize the {side} projection: {source}")]
    Init { side: Side, source: PjCreateError },
    #[error("No operation transforms between the two projections: {0}")]
    Operation(PjCreateError),
    #[error("The {side} projection definition cannot be passed to PROJ: {source}")]
    Marshal { side: Side, source: DefinitionError },
    #[error("The point count must not be negative, got {0}")]
    NegativePointCount(i64),
    #[error("The point offset must be at least 1, got {0}")]
    InvalidPointOffset(i32),
    #[error("A single coordinate triple holds one point, but {0} were requested")]
    ScalarPointCount(i64),
    #[error("The {axis} coordinates hold {len} values, but {required} are needed")]
    StorageTooShort {
        axis: &'static str,
        required: usize,
        len: usize,
    },
    #[error("The point count and offset address more values than fit in memory")]
    PointCountOverflow,
    #[error("A transformed coordinate cannot be represented in the geometry's numeric type")]
    Cast,
    #[error("PROJ reported error {0} while transforming")]
    Native(Status),
    #[error("The transformation panicked: {0}")]
    Panicked(String),
}

impl TransformError {
    /// The status code this error is reported as by [`Proj4Api`](crate::Proj4Api).
    pub fn status(&self) -> Status {
        match self {
            TransformError::Init { .. } | TransformError::Operation(_) => INIT_FAILURE,
            TransformError::Native(status) => *status,
            _ => FAULT,
        }
    }

    fn is_fault(&self) -> bool {
        self.status() == FAULT
    }
}

/// Number of elements needed to hold `count` points spaced `offset` elements apart.
pub(crate) fn required_len(count: usize, offset: usize) -> Option<usize> {
    match count {
        0 => Some(0),
        n => (n - 1).checked_mul(offset)?.checked_add(1),
    }
}

/// Transform a single point in place.
///
/// Returns PROJ's status for the transformation. The coordinates are only written back
/// once PROJ has returned, and are untouched when either projection fails to initialize.
///
/// Geographic coordinates are in radians, as with PROJ4's `pj_transform`.
///
/// ```
/// use approx::assert_relative_eq;
/// use proj4_interop::try_transform;
///
/// let (mut x, mut y, mut z) = (2f64.to_radians(), 48f64.to_radians(), 0.0);
/// let status = try_transform(
///     "+proj=longlat +datum=WGS84",
///     "+proj=utm +zone=31 +datum=WGS84",
///     1,
///     1,
///     &mut x,
///     &mut y,
///     &mut z,
/// )
/// .unwrap();
/// assert_eq!(status, 0);
/// assert_relative_eq!(x, 425404.89, epsilon = 1e-2);
/// assert_relative_eq!(y, 5316784.01, epsilon = 1e-2);
/// ```
pub fn try_transform(
    src: &str,
    dst: &str,
    point_count: i64,
    point_offset: i32,
    x: &mut f64,
    y: &mut f64,
    z: &mut f64,
) -> Result<Status, TransformError> {
    let ctx = ThreadContext::new();
    let operation = init_operation(&ctx, src, dst)?;

    let count = checked_point_count(point_count)?;
    if count > 1 {
        return Err(TransformError::ScalarPointCount(point_count));
    }
    let offset = checked_point_offset(count, point_offset)?;

    let (mut tx, mut ty, mut tz) = ([*x], [*y], [*z]);
    let status = run(&operation, count, offset, &mut tx, &mut ty, &mut tz);
    *x = tx[0];
    *y = ty[0];
    *z = tz[0];
    Ok(status)
}

/// Transform `point_count` points held in parallel slices, in place.
///
/// Point `i` lives at index `i * point_offset` of each slice.
///
/// ```
/// use proj4_interop::try_transform_batch;
///
/// let mut x = [2f64.to_radians(), 3f64.to_radians()];
/// let mut y = [48f64.to_radians(), 0.0];
/// let mut z = [0.0, 0.0];
/// let status = try_transform_batch(
///     "+proj=longlat +datum=WGS84",
///     "+proj=utm +zone=31 +datum=WGS84",
///     2,
///     1,
///     &mut x,
///     &mut y,
///     &mut z,
/// )
/// .unwrap();
/// assert_eq!(status, 0);
/// assert!((x[1] - 500000.0).abs() < 1e-6);
/// ```
pub fn try_transform_batch(
    src: &str,
    dst: &str,
    point_count: i64,
    point_offset: i32,
    x: &mut [f64],
    y: &mut [f64],
    z: &mut [f64],
) -> Result<Status, TransformError> {
    let ctx = ThreadContext::new();
    let operation = init_operation(&ctx, src, dst)?;

    let count = checked_point_count(point_count)?;
    let offset = checked_point_offset(count, point_offset)?;
    let required = required_len(count, offset).ok_or(TransformError::PointCountOverflow)?;
    for (axis, len) in [("x", x.len()), ("y", y.len()), ("z", z.len())] {
        if len < required {
            return Err(TransformError::StorageTooShort {
                axis,
                required,
                len,
            });
        }
    }

    Ok(run(&operation, count, offset, x, y, z))
}

/// Initialize both projections and the operation between them.
///
/// Both sides are always attempted. A marshaling fault on either side outranks an
/// initialization failure on the other.
fn init_operation<'ctx>(
    ctx: &'ctx ThreadContext,
    src: &str,
    dst: &str,
) -> Result<Pj<'ctx>, TransformError> {
    let source = init_projection(ctx, src, Side::Source);
    let target = init_projection(ctx, dst, Side::Destination);
    match (source, target) {
        (Ok(source), Ok(target)) => Pj::crs_to_crs(ctx, &source, &target)
            .map_err(TransformError::Operation)
            .inspect(|_| debug!(src, dst, "created transformation")),
        (Err(err), Ok(_)) | (Ok(_), Err(err)) => Err(err),
        (Err(src_err), Err(dst_err)) => {
            if dst_err.is_fault() && !src_err.is_fault() {
                Err(dst_err)
            } else {
                Err(src_err)
            }
        }
    }
}

fn init_projection<'ctx>(
    ctx: &'ctx ThreadContext,
    definition: &str,
    side: Side,
) -> Result<Pj<'ctx>, TransformError> {
    let result = ProjDefinition::new(definition)
        .map_err(|source| TransformError::Marshal { side, source })
        // the native buffer is released when it drops here, whatever the outcome
        .and_then(|c_definition| {
            Pj::from_definition(ctx, &c_definition)
                .map_err(|source| TransformError::Init { side, source })
        });
    if let Err(err) = &result {
        warn!(%side, definition, error = %err, "could not initialize projection");
    }
    result
}

fn checked_point_count(point_count: i64) -> Result<usize, TransformError> {
    usize::try_from(point_count).map_err(|_| TransformError::NegativePointCount(point_count))
}

/// The offset only spaces consecutive points, so it is ignored for fewer than two.
fn checked_point_offset(count: usize, point_offset: i32) -> Result<usize, TransformError> {
    if count <= 1 {
        return Ok(1);
    }
    match usize::try_from(point_offset) {
        Ok(offset) if offset > 0 => Ok(offset),
        _ => Err(TransformError::InvalidPointOffset(point_offset)),
    }
}

/// Run the operation over validated storage, converting angles between PROJ4's radians and
/// the degrees current PROJ operations work in.
fn run(
    operation: &Pj<'_>,
    count: usize,
    offset: usize,
    x: &mut [f64],
    y: &mut [f64],
    z: &mut [f64],
) -> Status {
    if operation.degree_input(FORWARD) {
        scale_angles(x, y, count, offset, f64::to_degrees);
    }
    operation.errno_reset();
    // Safety: both entry points checked the slices against `required_len(count, offset)`.
    let transformed = unsafe { operation.trans_generic(FORWARD, count, offset, x, y, z) };
    let errno = operation.errno();
    if operation.degree_output(FORWARD) {
        scale_angles(x, y, count, offset, f64::to_radians);
    }

    if errno.is_ok() {
        debug!(count, transformed, "transformed points");
    } else {
        warn!(
            count,
            transformed,
            errno = errno.0,
            message = %operation.error_message(errno).unwrap_or_default(),
            "PROJ failed to transform some points"
        );
    }
    errno.0
}

fn scale_angles(x: &mut [f64], y: &mut [f64], count: usize, offset: usize, f: fn(f64) -> f64) {
    for axis in [x, y] {
        for value in axis.iter_mut().step_by(offset).take(count) {
            if value.is_finite() {
                *value = f(*value);
            }
        }
    }
}
