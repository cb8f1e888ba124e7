//! Month-bucketed weighted points for the time-slider heatmap.
//!
//! Filtered accident rows are partitioned by calendar month; within a
//! month, rows at the same location collapse into one [`WeightedPoint`]
//! whose weight is the number of rows. Each [`MonthlyHeatFrame`] carries
//! its own month number and label, so sparse data (e.g. only March and
//! October) is labelled by the months actually present rather than by
//! position in the calendar.
//!
//! "Same location" means equal after rounding to a fixed number of decimal
//! places (6 places is roughly 0.1 m). With no precision, coordinates must
//! be bit-for-bit equal, which reprojection jitter can defeat.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use madrid_map_accident_models::{GeoAccidentRecord, month_label};
use serde::{Deserialize, Serialize};

/// Decimal places used when none is configured.
pub const DEFAULT_PRECISION: u32 = 6;

/// Largest accepted rounding precision.
pub const MAX_PRECISION: u32 = 12;

/// A location with a heat weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Number of rows merged into this point (≥ 1 for aggregated output).
    pub weight: f64,
}

impl WeightedPoint {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64, weight: f64) -> Self {
        Self {
            latitude,
            longitude,
            weight,
        }
    }

    /// A single unweighted observation.
    #[must_use]
    pub const fn unit(latitude: f64, longitude: f64) -> Self {
        Self::new(latitude, longitude, 1.0)
    }
}

/// All weighted points of one populated month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyHeatFrame {
    /// Month number, `1..=12`.
    pub month: u32,
    /// Spanish month name matching [`Self::month`].
    pub label: String,
    /// Points sorted by `(latitude, longitude)`.
    pub points: Vec<WeightedPoint>,
}

impl MonthlyHeatFrame {
    /// Sum of all point weights in the frame.
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.points.iter().map(|p| p.weight).sum()
    }
}

/// Grouping key ordered numerically by latitude, then longitude.
#[derive(Debug, Clone, Copy)]
struct CoordKey {
    latitude: f64,
    longitude: f64,
}

impl CoordKey {
    fn new(latitude: f64, longitude: f64, precision: Option<u32>) -> Self {
        // Adding 0.0 folds -0.0 into 0.0 so both land in one bucket.
        Self {
            latitude: round_to(latitude, precision) + 0.0,
            longitude: round_to(longitude, precision) + 0.0,
        }
    }
}

impl PartialEq for CoordKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CoordKey {}

impl PartialOrd for CoordKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CoordKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.latitude
            .total_cmp(&other.latitude)
            .then_with(|| self.longitude.total_cmp(&other.longitude))
    }
}

/// Rounds to `precision` decimal places; `None` leaves the value as is.
#[must_use]
pub fn round_to(value: f64, precision: Option<u32>) -> f64 {
    match precision {
        None => value,
        Some(places) => {
            let factor = 10f64.powi(i32::try_from(places.min(MAX_PRECISION)).unwrap_or(12));
            (value * factor).round() / factor
        }
    }
}

/// Merges points sharing a location, summing their weights.
///
/// Output is sorted by `(latitude, longitude)` and uses the rounded
/// coordinates. Total weight is conserved.
#[must_use]
pub fn group_points(
    points: impl IntoIterator<Item = WeightedPoint>,
    precision: Option<u32>,
) -> Vec<WeightedPoint> {
    let mut buckets: BTreeMap<CoordKey, f64> = BTreeMap::new();
    for point in points {
        *buckets
            .entry(CoordKey::new(point.latitude, point.longitude, precision))
            .or_insert(0.0) += point.weight;
    }

    buckets
        .into_iter()
        .map(|(key, weight)| WeightedPoint::new(key.latitude, key.longitude, weight))
        .collect()
}

/// Builds one frame per populated month, in ascending month order.
///
/// Months with no rows produce no frame.
#[must_use]
pub fn monthly_frames<'a>(
    records: impl IntoIterator<Item = &'a GeoAccidentRecord>,
    precision: Option<u32>,
) -> Vec<MonthlyHeatFrame> {
    let mut by_month: BTreeMap<u32, Vec<WeightedPoint>> = BTreeMap::new();
    for record in records {
        by_month
            .entry(record.month)
            .or_default()
            .push(WeightedPoint::unit(record.latitude, record.longitude));
    }

    by_month
        .into_iter()
        .filter_map(|(month, points)| {
            let Some(label) = month_label(month) else {
                log::warn!("Skipping {} rows with invalid month {month}", points.len());
                return None;
            };
            let rows = points.len();
            let points = group_points(points, precision);
            log::debug!("{label}: {rows} rows -> {} weighted points", points.len());
            Some(MonthlyHeatFrame {
                month,
                label: label.to_owned(),
                points,
            })
        })
        .collect()
}

/// Slider labels for `frames`, one per frame, in frame order.
#[must_use]
pub fn frame_labels(frames: &[MonthlyHeatFrame]) -> Vec<String> {
    frames.iter().map(|frame| frame.label.clone()).collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use madrid_map_accident_models::{AccidentRecord, PersonType, Sex, VehicleType};
    use proptest::prelude::*;

    use super::*;

    fn geo(month: u32, day: u32, latitude: f64, longitude: f64) -> GeoAccidentRecord {
        let source = AccidentRecord {
            x_utm: 440_000.0,
            y_utm: 4_470_000.0,
            person_type: PersonType::Conductor,
            vehicle_type: VehicleType::Bicicleta,
            sex: Sex::Mujer,
            date: NaiveDate::from_ymd_opt(2023, month, day).unwrap(),
            case_id: format!("2023S{month:02}{day:02}"),
        };
        GeoAccidentRecord::new(&source, longitude, latitude)
    }

    #[test]
    fn merges_identical_locations_within_a_month() {
        let records = vec![
            geo(3, 1, 40.41, -3.70),
            geo(3, 20, 40.41, -3.70),
            geo(3, 21, 40.42, -3.71),
        ];
        let frames = monthly_frames(&records, Some(DEFAULT_PRECISION));

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].month, 3);
        assert_eq!(frames[0].label, "Marzo");
        assert_eq!(
            frames[0].points,
            vec![
                WeightedPoint::new(40.41, -3.70, 2.0),
                WeightedPoint::new(40.42, -3.71, 1.0),
            ]
        );
    }

    #[test]
    fn sparse_months_keep_their_own_labels() {
        let records = vec![geo(10, 5, 40.40, -3.70), geo(3, 5, 40.40, -3.70)];
        let frames = monthly_frames(&records, None);

        assert_eq!(
            frames.iter().map(|f| f.month).collect::<Vec<_>>(),
            vec![3, 10]
        );
        assert_eq!(frame_labels(&frames), vec!["Marzo", "Octubre"]);
    }

    #[test]
    fn same_location_in_different_months_is_not_merged() {
        let records = vec![geo(1, 1, 40.4, -3.7), geo(2, 1, 40.4, -3.7)];
        let frames = monthly_frames(&records, None);
        assert_eq!(frames.len(), 2);
        assert!(frames.iter().all(|f| f.points.len() == 1));
    }

    #[test]
    fn rounding_merges_reprojection_jitter() {
        let a = WeightedPoint::unit(40.416_800_000_1, -3.703_800_000_2);
        let b = WeightedPoint::unit(40.416_800_000_3, -3.703_799_999_9);

        assert_eq!(group_points([a, b], None).len(), 2);

        let merged = group_points([a, b], Some(6));
        assert_eq!(merged.len(), 1);
        assert!((merged[0].weight - 2.0).abs() < f64::EPSILON);
        assert!((merged[0].latitude - 40.4168).abs() < 1e-12);
    }

    #[test]
    fn negative_zero_shares_a_bucket_with_zero() {
        let merged = group_points(
            [WeightedPoint::unit(0.0, -0.0), WeightedPoint::unit(-0.0, 0.0)],
            None,
        );
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn output_is_sorted_by_latitude_then_longitude() {
        let points = [
            WeightedPoint::unit(40.5, -3.6),
            WeightedPoint::unit(40.4, -3.5),
            WeightedPoint::unit(40.4, -3.9),
        ];
        let grouped = group_points(points, None);
        let coords: Vec<(f64, f64)> = grouped.iter().map(|p| (p.latitude, p.longitude)).collect();
        assert_eq!(coords, vec![(40.4, -3.9), (40.4, -3.5), (40.5, -3.6)]);
    }

    fn records_strategy() -> impl Strategy<Value = Vec<GeoAccidentRecord>> {
        // A small coordinate grid so collisions are frequent.
        prop::collection::vec((1u32..=12, 1u32..=28, 0u8..4, 0u8..4), 0..128).prop_map(|rows| {
            rows.into_iter()
                .map(|(month, day, i, j)| {
                    geo(
                        month,
                        day,
                        40.40 + f64::from(i) * 0.01,
                        -3.70 + f64::from(j) * 0.01,
                    )
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn weight_is_conserved_per_month(records in records_strategy()) {
            let frames = monthly_frames(&records, Some(DEFAULT_PRECISION));
            for frame in &frames {
                let rows = records.iter().filter(|r| r.month == frame.month).count();
                prop_assert!((frame.total_weight() - rows as f64).abs() < 1e-9);
                prop_assert!(frame.points.iter().all(|p| p.weight >= 1.0));
            }
        }

        #[test]
        fn labels_align_with_frames(records in records_strategy()) {
            let frames = monthly_frames(&records, None);
            let labels = frame_labels(&frames);

            let mut months: Vec<u32> = records.iter().map(|r| r.month).collect();
            months.sort_unstable();
            months.dedup();

            prop_assert_eq!(labels.len(), frames.len());
            prop_assert_eq!(frames.len(), months.len());
            for (frame, label) in frames.iter().zip(&labels) {
                prop_assert_eq!(month_label(frame.month), Some(label.as_str()));
            }
            prop_assert!(frames.windows(2).all(|w| w[0].month < w[1].month));
        }

        #[test]
        fn regrouping_is_idempotent(records in records_strategy()) {
            let points: Vec<WeightedPoint> = records
                .iter()
                .map(|r| WeightedPoint::unit(r.latitude, r.longitude))
                .collect();
            let once = group_points(points.clone(), Some(DEFAULT_PRECISION));
            let twice = group_points(once.clone(), Some(DEFAULT_PRECISION));

            let total: f64 = twice.iter().map(|p| p.weight).sum();
            prop_assert!((total - points.len() as f64).abs() < 1e-9);
            prop_assert_eq!(once, twice);
        }
    }
}
