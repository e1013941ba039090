use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::warn;

use crate::transform::{self, Status, TransformError, try_transform, try_transform_batch};

/// Status-code entry points for transforming coordinates between two PROJ4 definitions.
///
/// `Proj4Api` has no values; it only groups the two transformation functions. Every call
/// creates and releases its own native resources, and nothing escapes a call: errors and
/// panics are reported through the returned [`Status`].
///
/// | Status | Meaning |
/// |---|---|
/// | `0` | every point was transformed |
/// | `> 0` | PROJ's error number, passed through unchanged |
/// | [`Proj4Api::INIT_FAILURE`] | a projection definition could not be initialized |
/// | [`Proj4Api::FAULT`] | anything else went wrong |
pub enum Proj4Api {}

impl Proj4Api {
    pub const INIT_FAILURE: Status = transform::INIT_FAILURE;
    pub const FAULT: Status = transform::FAULT;

    /// Transform a single point in place.
    ///
    /// x, y and z are left untouched unless PROJ ran. Geographic coordinates are in radians.
    ///
    /// ```
    /// use proj4_interop::Proj4Api;
    ///
    /// let (mut x, mut y, mut z) = (1.0, 2.0, 3.0);
    /// let status = Proj4Api::transform(
    ///     "+proj=longlat +datum=WGS84",
    ///     "+proj=not_a_projection",
    ///     1,
    ///     1,
    ///     &mut x,
    ///     &mut y,
    ///     &mut z,
    /// );
    /// assert_eq!(status, Proj4Api::INIT_FAILURE);
    /// assert_eq!((x, y, z), (1.0, 2.0, 3.0));
    /// ```
    pub fn transform(
        src: &str,
        dst: &str,
        point_count: i64,
        point_offset: i32,
        x: &mut f64,
        y: &mut f64,
        z: &mut f64,
    ) -> Status {
        guarded(|| try_transform(src, dst, point_count, point_offset, x, y, z))
    }

    /// Transform `point_count` points held in parallel slices, in place.
    ///
    /// Point `i` lives at index `i * point_offset` of each slice, so every slice needs at
    /// least `(point_count - 1) * point_offset + 1` elements.
    pub fn transform_batch(
        src: &str,
        dst: &str,
        point_count: i64,
        point_offset: i32,
        x: &mut [f64],
        y: &mut [f64],
        z: &mut [f64],
    ) -> Status {
        guarded(|| try_transform_batch(src, dst, point_count, point_offset, x, y, z))
    }
}

fn guarded<F>(f: F) -> Status
where
    F: FnOnce() -> Result<Status, TransformError>,
{
    let err = match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(status)) => return status,
        Ok(Err(err)) => err,
        Err(payload) => TransformError::Panicked(panic_message(payload.as_ref())),
    };
    warn!(error = %err, status = err.status(), "transformation failed");
    err.status()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const WGS84: &str = "+proj=longlat +datum=WGS84";
    const UTM31: &str = "+proj=utm +zone=31 +datum=WGS84";

    #[test]
    fn invalid_source_returns_init_failure() {
        let (mut x, mut y, mut z) = (10.0, 20.0, 0.0);
        let status = Proj4Api::transform("+proj=bogus", WGS84, 1, 1, &mut x, &mut y, &mut z);
        assert_eq!(status, -1);
        assert_eq!((x, y, z), (10.0, 20.0, 0.0));
    }

    #[test]
    fn invalid_destination_returns_init_failure() {
        let (mut x, mut y, mut z) = (10.0, 20.0, 0.0);
        let status = Proj4Api::transform(WGS84, "", 1, 1, &mut x, &mut y, &mut z);
        assert_eq!(status, Proj4Api::INIT_FAILURE);
        assert_eq!((x, y, z), (10.0, 20.0, 0.0));
    }

    #[test]
    fn invalid_batch_definition_leaves_slices_alone() {
        let mut x = [1.0, 2.0];
        let mut y = [3.0, 4.0];
        let mut z = [5.0, 6.0];
        let status = Proj4Api::transform_batch(WGS84, "+proj=bogus", 2, 1, &mut x, &mut y, &mut z);
        assert_eq!(status, Proj4Api::INIT_FAILURE);
        assert_eq!((x, y, z), ([1.0, 2.0], [3.0, 4.0], [5.0, 6.0]));
    }

    #[test]
    fn identity_transform() {
        let (mut x, mut y, mut z) = (10.0, 20.0, 0.0);
        let status = Proj4Api::transform(WGS84, WGS84, 1, 1, &mut x, &mut y, &mut z);
        assert_eq!(status, 0);
        assert_relative_eq!(x, 10.0, epsilon = 1e-9);
        assert_relative_eq!(y, 20.0, epsilon = 1e-9);
        assert_relative_eq!(z, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn geographic_to_utm() {
        let (mut x, mut y, mut z) = (2f64.to_radians(), 48f64.to_radians(), 0.0);
        let status = Proj4Api::transform(WGS84, UTM31, 1, 1, &mut x, &mut y, &mut z);
        assert_eq!(status, 0);
        assert_relative_eq!(x, 425404.8875, epsilon = 1e-2);
        assert_relative_eq!(y, 5316784.0092, epsilon = 1e-2);
    }

    #[test]
    fn batch_matches_scalar_calls() {
        let lonlat = [(2.0f64, 48.0f64), (3.0, 0.0), (1.0, 45.0)];
        let mut x: Vec<f64> = lonlat.iter().map(|(lon, _)| lon.to_radians()).collect();
        let mut y: Vec<f64> = lonlat.iter().map(|(_, lat)| lat.to_radians()).collect();
        let mut z = vec![0.0; 3];
        let status = Proj4Api::transform_batch(WGS84, UTM31, 3, 1, &mut x, &mut y, &mut z);
        assert_eq!(status, 0);

        for (i, (lon, lat)) in lonlat.iter().enumerate() {
            let (mut sx, mut sy, mut sz) = (lon.to_radians(), lat.to_radians(), 0.0);
            let status = Proj4Api::transform(WGS84, UTM31, 1, 1, &mut sx, &mut sy, &mut sz);
            assert_eq!(status, 0);
            assert_relative_eq!(x[i], sx, epsilon = 1e-9);
            assert_relative_eq!(y[i], sy, epsilon = 1e-9);
            assert_relative_eq!(z[i], sz, epsilon = 1e-9);
        }
        assert_relative_eq!(x[2], 342369.3593, epsilon = 1e-2);
        assert_relative_eq!(y[2], 4984896.1713, epsilon = 1e-2);
    }

    #[test]
    fn out_of_domain_point_returns_native_status() {
        let (mut x, mut y, mut z) = (2f64.to_radians(), 2.0, 0.0);
        let status = Proj4Api::transform(WGS84, UTM31, 1, 1, &mut x, &mut y, &mut z);
        assert!(status > 0);
        assert_ne!(status, Proj4Api::INIT_FAILURE);
        assert_ne!(status, Proj4Api::FAULT);
        assert!(!x.is_finite());
        assert!(!y.is_finite());
    }

    #[test]
    fn batch_reports_native_status_for_bad_point() {
        let mut x = [2f64.to_radians(), 3f64.to_radians(), 1f64.to_radians()];
        let mut y = [48f64.to_radians(), 0.0, 2.0];
        let mut z = [0.0; 3];
        let status = Proj4Api::transform_batch(WGS84, UTM31, 3, 1, &mut x, &mut y, &mut z);
        assert!(status > 0);
        assert_relative_eq!(x[0], 425404.8875, epsilon = 1e-2);
        assert_relative_eq!(y[0], 5316784.0092, epsilon = 1e-2);
        assert_relative_eq!(x[1], 500000.0, epsilon = 1e-6);
        assert_relative_eq!(y[1], 0.0, epsilon = 1e-6);
        assert!(!x[2].is_finite());
        assert!(!y[2].is_finite());
    }

    #[test]
    fn offset_does_not_matter_for_one_point() {
        let (mut x, mut y, mut z) = (2f64.to_radians(), 48f64.to_radians(), 0.0);
        let status = Proj4Api::transform(WGS84, UTM31, 1, 0, &mut x, &mut y, &mut z);
        assert_eq!(status, 0);
        assert_relative_eq!(x, 425404.8875, epsilon = 1e-2);

        let (mut x, mut y, mut z) = ([3f64.to_radians()], [0.0], [0.0]);
        let status = Proj4Api::transform_batch(WGS84, UTM31, 1, 0, &mut x, &mut y, &mut z);
        assert_eq!(status, 0);
        assert_relative_eq!(x[0], 500000.0, epsilon = 1e-6);

        let (mut x, mut y, mut z) = ([0.0; 2], [0.0; 2], [0.0; 2]);
        let status = Proj4Api::transform_batch(WGS84, UTM31, 2, 0, &mut x, &mut y, &mut z);
        assert_eq!(status, Proj4Api::FAULT);
    }

    #[test]
    fn marshaling_fault_returns_fault() {
        let (mut x, mut y, mut z) = (10.0, 20.0, 0.0);
        let status = Proj4Api::transform("+proj=longlat\0", WGS84, 1, 1, &mut x, &mut y, &mut z);
        assert_eq!(status, Proj4Api::FAULT);
        assert_eq!((x, y, z), (10.0, 20.0, 0.0));
    }

    #[test]
    fn short_batch_storage_returns_fault() {
        let mut x = [0.0; 2];
        let mut y = [0.0; 2];
        let mut z = [0.0; 2];
        let status = Proj4Api::transform_batch(WGS84, UTM31, 3, 1, &mut x, &mut y, &mut z);
        assert_eq!(status, -2);
    }

    #[test]
    fn panics_are_reported_as_fault() {
        let status = guarded(|| panic!("boom"));
        assert_eq!(status, Proj4Api::FAULT);
    }

    #[test]
    fn panic_messages() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
