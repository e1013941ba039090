use geo_types::{Coord, CoordFloat, LineString, MultiPoint, Point};
use num_traits::{NumCast, ToPrimitive};

use crate::transform::{TransformError, try_transform, try_transform_batch};

/// Transform a geometry between two PROJ4 definitions.
///
/// Geographic coordinates are in radians. A geometry is only modified when PROJ transformed
/// every one of its coordinates; a non-zero PROJ status is returned as
/// [`TransformError::Native`].
pub trait Transform {
    /// Transform a geometry by mutating it in place.
    ///
    /// ```
    /// # use approx::assert_relative_eq;
    /// use geo_types::point;
    /// use proj4_interop::Transform;
    ///
    /// let mut point = point!(x: 2f64.to_radians(), y: 48f64.to_radians());
    /// point
    ///     .transform("+proj=longlat +datum=WGS84", "+proj=utm +zone=31 +datum=WGS84")
    ///     .unwrap();
    /// assert_relative_eq!(point, point!(x: 425404.89, y: 5316784.01), epsilon = 1e-2);
    /// ```
    fn transform(&mut self, src: &str, dst: &str) -> Result<(), TransformError>;

    /// Immutable flavor of [`Transform::transform`], which allocates a new geometry.
    fn transformed(&self, src: &str, dst: &str) -> Result<Self, TransformError>
    where
        Self: Clone,
    {
        let mut geometry = self.clone();
        geometry.transform(src, dst)?;
        Ok(geometry)
    }
}

impl<T: CoordFloat> Transform for Coord<T> {
    fn transform(&mut self, src: &str, dst: &str) -> Result<(), TransformError> {
        let (mut x, mut y, mut z) = (to_f64(self.x)?, to_f64(self.y)?, 0.0);
        match try_transform(src, dst, 1, 1, &mut x, &mut y, &mut z)? {
            0 => {
                *self = Coord {
                    x: from_f64(x)?,
                    y: from_f64(y)?,
                };
                Ok(())
            }
            status => Err(TransformError::Native(status)),
        }
    }
}

impl<T: CoordFloat> Transform for Point<T> {
    fn transform(&mut self, src: &str, dst: &str) -> Result<(), TransformError> {
        self.0.transform(src, dst)
    }
}

impl<T: CoordFloat> Transform for LineString<T> {
    fn transform(&mut self, src: &str, dst: &str) -> Result<(), TransformError> {
        transform_coords(&mut self.0, src, dst)
    }
}

impl<T: CoordFloat> Transform for MultiPoint<T> {
    fn transform(&mut self, src: &str, dst: &str) -> Result<(), TransformError> {
        let mut coords: Vec<Coord<T>> = self.0.iter().map(|point| point.0).collect();
        transform_coords(&mut coords, src, dst)?;
        for (point, coord) in self.0.iter_mut().zip(coords) {
            point.0 = coord;
        }
        Ok(())
    }
}

/// Copy the coordinates into contiguous buffers, transform them as one batch, and copy the
/// results back.
fn transform_coords<T: CoordFloat>(
    coords: &mut [Coord<T>],
    src: &str,
    dst: &str,
) -> Result<(), TransformError> {
    let count = i64::try_from(coords.len()).map_err(|_| TransformError::PointCountOverflow)?;
    let mut x = coords
        .iter()
        .map(|c| to_f64(c.x))
        .collect::<Result<Vec<_>, _>>()?;
    let mut y = coords
        .iter()
        .map(|c| to_f64(c.y))
        .collect::<Result<Vec<_>, _>>()?;
    let mut z = vec![0.0; coords.len()];

    let status = try_transform_batch(src, dst, count, 1, &mut x, &mut y, &mut z)?;
    if status != 0 {
        return Err(TransformError::Native(status));
    }

    let transformed = x
        .into_iter()
        .zip(y)
        .map(|(x, y)| {
            Ok(Coord {
                x: from_f64(x)?,
                y: from_f64(y)?,
            })
        })
        .collect::<Result<Vec<_>, TransformError>>()?;
    coords.copy_from_slice(&transformed);
    Ok(())
}

fn to_f64<T: CoordFloat>(value: T) -> Result<f64, TransformError> {
    value.to_f64().ok_or(TransformError::Cast)
}

fn from_f64<T: CoordFloat>(value: f64) -> Result<T, TransformError> {
    <T as NumCast>::from(value).ok_or(TransformError::Cast)
}
