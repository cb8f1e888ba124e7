//! Attribute predicate over accident rows.

use madrid_map_accident_models::{AccidentRecord, GeoAccidentRecord, PersonType, Sex, VehicleType};
use serde::{Deserialize, Serialize};

/// Conjunction of attribute clauses. An empty clause matches everything.
///
/// The default selects women involved with any vehicle other than a
/// passenger car (`sexo == "Mujer"` and `tipo_vehiculo != "Turismo"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccidentFilter {
    /// Required sex, if any.
    pub sex: Option<Sex>,
    /// Vehicle types that exclude a row.
    pub excluded_vehicle_types: Vec<VehicleType>,
    /// Allowed person types; empty allows all.
    pub person_types: Vec<PersonType>,
}

impl Default for AccidentFilter {
    fn default() -> Self {
        Self {
            sex: Some(Sex::Mujer),
            excluded_vehicle_types: vec![VehicleType::Turismo],
            person_types: Vec::new(),
        }
    }
}

impl AccidentFilter {
    /// A filter that keeps every row.
    #[must_use]
    pub const fn allow_all() -> Self {
        Self {
            sex: None,
            excluded_vehicle_types: Vec::new(),
            person_types: Vec::new(),
        }
    }

    #[must_use]
    pub fn matches(&self, record: &AccidentRecord) -> bool {
        if self.sex.is_some_and(|sex| sex != record.sex) {
            return false;
        }
        if self.excluded_vehicle_types.contains(&record.vehicle_type) {
            return false;
        }
        self.person_types.is_empty() || self.person_types.contains(&record.person_type)
    }

    /// Keeps the matching rows, preserving order.
    #[must_use]
    pub fn apply(&self, records: &[GeoAccidentRecord]) -> Vec<GeoAccidentRecord> {
        let selected: Vec<GeoAccidentRecord> = records
            .iter()
            .filter(|r| self.matches(&r.accident))
            .cloned()
            .collect();

        log::info!(
            "Filter kept {}/{} accident rows ({self})",
            selected.len(),
            records.len()
        );

        selected
    }
}

impl std::fmt::Display for AccidentFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut clauses = Vec::new();
        if let Some(sex) = self.sex {
            clauses.push(format!("sexo == {sex}"));
        }
        for vehicle in &self.excluded_vehicle_types {
            clauses.push(format!("tipo_vehiculo != {vehicle}"));
        }
        if !self.person_types.is_empty() {
            let names: Vec<&str> = self.person_types.iter().map(PersonType::as_str).collect();
            clauses.push(format!("tipo_persona in [{}]", names.join(", ")));
        }

        if clauses.is_empty() {
            f.write_str("all rows")
        } else {
            f.write_str(&clauses.join(" AND "))
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use proptest::prelude::*;

    use super::*;

    fn record(sex: Sex, vehicle: VehicleType, person: PersonType) -> AccidentRecord {
        AccidentRecord {
            x_utm: 440_000.0,
            y_utm: 4_470_000.0,
            person_type: person,
            vehicle_type: vehicle,
            sex,
            date: NaiveDate::from_ymd_opt(2023, 5, 1).unwrap(),
            case_id: "2023S0001".to_string(),
        }
    }

    #[test]
    fn default_selects_women_outside_cars() {
        let filter = AccidentFilter::default();
        assert!(filter.matches(&record(Sex::Mujer, VehicleType::Bicicleta, PersonType::Conductor)));
        assert!(!filter.matches(&record(Sex::Mujer, VehicleType::Turismo, PersonType::Conductor)));
        assert!(!filter.matches(&record(Sex::Hombre, VehicleType::Bicicleta, PersonType::Conductor)));
        assert!(!filter.matches(&record(Sex::Desconocido, VehicleType::Autobus, PersonType::Pasajero)));
    }

    #[test]
    fn person_type_clause_restricts_when_set() {
        let filter = AccidentFilter {
            person_types: vec![PersonType::Conductor],
            ..AccidentFilter::default()
        };
        assert!(filter.matches(&record(Sex::Mujer, VehicleType::Bicicleta, PersonType::Conductor)));
        assert!(!filter.matches(&record(Sex::Mujer, VehicleType::Bicicleta, PersonType::Peaton)));
    }

    #[test]
    fn allow_all_matches_everything() {
        let filter = AccidentFilter::allow_all();
        assert!(filter.matches(&record(Sex::Hombre, VehicleType::Turismo, PersonType::Testigo)));
        assert_eq!(filter.to_string(), "all rows");
    }

    #[test]
    fn describes_default_predicate() {
        assert_eq!(
            AccidentFilter::default().to_string(),
            "sexo == Mujer AND tipo_vehiculo != Turismo"
        );
    }

    fn sex_strategy() -> impl Strategy<Value = Sex> {
        prop_oneof![Just(Sex::Mujer), Just(Sex::Hombre), Just(Sex::Desconocido)]
    }

    fn vehicle_strategy() -> impl Strategy<Value = VehicleType> {
        prop_oneof![
            Just(VehicleType::Turismo),
            Just(VehicleType::Bicicleta),
            Just(VehicleType::Motocicleta),
            Just(VehicleType::Furgoneta),
            Just(VehicleType::Autobus),
            "[A-Za-z]{1,8}".prop_map(|s| VehicleType::from(s.as_str())),
        ]
    }

    proptest! {
        #[test]
        fn default_filter_keeps_exactly_the_matching_rows(
            rows in prop::collection::vec((sex_strategy(), vehicle_strategy()), 0..64),
        ) {
            let records: Vec<GeoAccidentRecord> = rows
                .iter()
                .map(|(sex, vehicle)| {
                    let source = record(*sex, vehicle.clone(), PersonType::Conductor);
                    GeoAccidentRecord::new(&source, -3.7, 40.4)
                })
                .collect();

            let kept = AccidentFilter::default().apply(&records);
            let expected: Vec<&GeoAccidentRecord> = records
                .iter()
                .filter(|r| r.accident.sex == Sex::Mujer && r.accident.vehicle_type != VehicleType::Turismo)
                .collect();

            prop_assert_eq!(kept.len(), expected.len());
            for (got, want) in kept.iter().zip(expected) {
                prop_assert_eq!(got, want);
            }
        }
    }
}
