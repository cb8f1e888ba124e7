#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Coordinate reprojection from projected UTM meters to geographic degrees.
//!
//! The accident register stores positions as UTM zone 30N (`EPSG:32630`)
//! easting/northing pairs. Maps are drawn in ETRS89 geographic coordinates
//! (`EPSG:4258`). The WGS 84 → ETRS89 datum shift is below one meter in
//! Spain and is treated as the identity, the same ballpark transformation
//! common GIS tooling applies for this pair.
//!
//! Axis order is fixed: input is `(x, y)` = `(easting, northing)` and output
//! is a [`geo::Point`] whose `x` is longitude and `y` is latitude.

pub mod transverse_mercator;

use geo::Point;

pub use transverse_mercator::{Ellipsoid, Hemisphere, TransverseMercator};

/// Identifier of the accident register's coordinate reference system.
pub const UTM_ZONE_30N: &str = "EPSG:32630";

/// Identifier of the geographic reference system used for rendering.
pub const ETRS89_GEOGRAPHIC: &str = "EPSG:4258";

/// Smallest easting accepted as part of a UTM zone, in meters.
const MIN_EASTING: f64 = 100_000.0;
/// Largest easting accepted as part of a UTM zone, in meters.
const MAX_EASTING: f64 = 900_000.0;
/// Largest northing in the northern hemisphere (84°N), in meters.
const MAX_NORTHING: f64 = 9_330_000.0;

/// Errors that can occur while reprojecting a single coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ProjectionError {
    /// One of the inputs is NaN or infinite.
    #[error("non-finite coordinate ({x}, {y})")]
    NonFinite {
        /// Input easting.
        x: f64,
        /// Input northing.
        y: f64,
    },

    /// The pair lies outside the valid extent of the source zone.
    #[error("coordinate ({x}, {y}) is outside the domain of {crs}")]
    OutOfDomain {
        /// Input easting.
        x: f64,
        /// Input northing.
        y: f64,
        /// Source reference system.
        crs: &'static str,
    },
}

/// Converts UTM zone 30N coordinates to ETRS89 longitude/latitude.
///
/// Deterministic and order-preserving: output `i` always corresponds to
/// input `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateTransformer {
    source_crs: &'static str,
    target_crs: &'static str,
    projection: TransverseMercator,
}

impl Default for CoordinateTransformer {
    fn default() -> Self {
        Self::utm30n_to_etrs89()
    }
}

impl CoordinateTransformer {
    /// The fixed `EPSG:32630` → `EPSG:4258` pair.
    #[must_use]
    pub fn utm30n_to_etrs89() -> Self {
        Self {
            source_crs: UTM_ZONE_30N,
            target_crs: ETRS89_GEOGRAPHIC,
            projection: TransverseMercator::utm(30, Hemisphere::North, Ellipsoid::WGS84),
        }
    }

    /// Source reference system identifier.
    #[must_use]
    pub const fn source_crs(&self) -> &'static str {
        self.source_crs
    }

    /// Target reference system identifier.
    #[must_use]
    pub const fn target_crs(&self) -> &'static str {
        self.target_crs
    }

    /// Reprojects one `(x, y)` pair.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError`] if either value is non-finite or the
    /// pair is outside the zone's extent.
    pub fn transform(&self, x: f64, y: f64) -> Result<Point<f64>, ProjectionError> {
        if !x.is_finite() || !y.is_finite() {
            return Err(ProjectionError::NonFinite { x, y });
        }
        if !(MIN_EASTING..=MAX_EASTING).contains(&x) || !(0.0..=MAX_NORTHING).contains(&y) {
            return Err(ProjectionError::OutOfDomain {
                x,
                y,
                crs: self.source_crs,
            });
        }

        let (longitude, latitude) = self.projection.inverse(x, y);
        Ok(Point::new(longitude, latitude))
    }

    /// Reprojects a batch, keeping one result per input in input order.
    ///
    /// Failing pairs do not abort the batch; callers decide whether to drop
    /// them.
    #[must_use]
    pub fn transform_all(&self, pairs: &[(f64, f64)]) -> Vec<Result<Point<f64>, ProjectionError>> {
        let results: Vec<_> = pairs.iter().map(|&(x, y)| self.transform(x, y)).collect();

        let failed = results.iter().filter(|r| r.is_err()).count();
        if failed > 0 {
            log::warn!(
                "{failed}/{} coordinate pairs could not be reprojected from {} to {}",
                pairs.len(),
                self.source_crs,
                self.target_crs
            );
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use geo::{Contains as _, Rect, coord};
    use proptest::prelude::*;

    use super::*;

    /// Generous box around the Madrid municipality.
    fn madrid_bounds() -> Rect<f64> {
        Rect::new(coord! { x: -3.95, y: 40.20 }, coord! { x: -3.45, y: 40.65 })
    }

    #[test]
    fn puerta_del_sol_inverse() {
        let point = CoordinateTransformer::utm30n_to_etrs89()
            .transform(440_290.458, 4_474_257.382)
            .unwrap();
        assert!((point.x() - -3.7038).abs() < 1e-6, "lon {}", point.x());
        assert!((point.y() - 40.4168).abs() < 1e-6, "lat {}", point.y());
    }

    #[test]
    fn keeps_longitude_before_latitude() {
        let point = CoordinateTransformer::default()
            .transform(440_000.0, 4_470_000.0)
            .unwrap();
        assert!(point.x() < 0.0, "x must be the (western) longitude");
        assert!(point.y() > 40.0, "y must be the latitude");
    }

    #[test]
    fn rejects_non_finite_input() {
        let transformer = CoordinateTransformer::default();
        assert!(matches!(
            transformer.transform(f64::NAN, 4_470_000.0),
            Err(ProjectionError::NonFinite { .. })
        ));
        assert!(matches!(
            transformer.transform(440_000.0, f64::INFINITY),
            Err(ProjectionError::NonFinite { .. })
        ));
    }

    #[test]
    fn rejects_out_of_domain_input() {
        let transformer = CoordinateTransformer::default();
        assert!(matches!(
            transformer.transform(0.0, 4_470_000.0),
            Err(ProjectionError::OutOfDomain { .. })
        ));
        assert!(matches!(
            transformer.transform(440_000.0, -5.0),
            Err(ProjectionError::OutOfDomain { .. })
        ));
    }

    #[test]
    fn batch_preserves_order_and_failures() {
        let pairs = [
            (440_000.0, 4_470_000.0),
            (f64::NAN, 0.0),
            (445_000.0, 4_475_000.0),
        ];
        let results = CoordinateTransformer::default().transform_all(&pairs);
        assert_eq!(results.len(), 3);
        assert!(results[1].is_err());
        let first = results[0].unwrap();
        let third = results[2].unwrap();
        assert!(first.x() < third.x());
        assert!(first.y() < third.y());
    }

    proptest! {
        #[test]
        fn reprojection_is_deterministic_and_lands_in_madrid(
            x in 430_000.0f64..450_000.0,
            y in 4_460_000.0f64..4_485_000.0,
        ) {
            let transformer = CoordinateTransformer::default();
            let a = transformer.transform(x, y).unwrap();
            let b = transformer.transform(x, y).unwrap();
            prop_assert!((a.x() - b.x()).abs() < 1e-12);
            prop_assert!((a.y() - b.y()).abs() < 1e-12);
            prop_assert!(madrid_bounds().contains(&a));
        }
    }
}
