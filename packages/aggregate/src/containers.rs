//! Partitioning of the container inventory by category.

use std::collections::BTreeMap;

use madrid_map_container_models::{ContainerRecord, ContainerType};

use crate::heat::WeightedPoint;

/// All containers of one category.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerGroup {
    pub container_type: ContainerType,
    pub records: Vec<ContainerRecord>,
}

impl ContainerGroup {
    /// Container positions as unit-weight heat points.
    #[must_use]
    pub fn heat_points(&self) -> Vec<WeightedPoint> {
        self.records
            .iter()
            .map(|r| WeightedPoint::unit(r.latitude, r.longitude))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// The inventory split into one group per known category.
///
/// Every [`ContainerType`] has a group, possibly empty. Rows whose category
/// is unknown go into no group and are counted in
/// [`ContainerPartition::unrecognized`].
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerPartition {
    pub groups: BTreeMap<ContainerType, ContainerGroup>,
    /// Unknown category label → number of rows excluded.
    pub unrecognized: BTreeMap<String, usize>,
}

impl ContainerPartition {
    #[must_use]
    pub fn group(&self, container_type: ContainerType) -> Option<&ContainerGroup> {
        self.groups.get(&container_type)
    }

    /// Rows placed in some group.
    #[must_use]
    pub fn grouped_count(&self) -> usize {
        self.groups.values().map(ContainerGroup::len).sum()
    }

    /// Rows excluded because of an unknown category.
    #[must_use]
    pub fn unrecognized_count(&self) -> usize {
        self.unrecognized.values().sum()
    }

    /// Total rows accounted for; always equals the input length.
    #[must_use]
    pub fn total(&self) -> usize {
        self.grouped_count() + self.unrecognized_count()
    }
}

/// Splits `records` by category, preserving input order inside each group.
#[must_use]
pub fn partition_containers(records: &[ContainerRecord]) -> ContainerPartition {
    let mut groups: BTreeMap<ContainerType, ContainerGroup> = ContainerType::all()
        .iter()
        .map(|&container_type| {
            (
                container_type,
                ContainerGroup {
                    container_type,
                    records: Vec::new(),
                },
            )
        })
        .collect();
    let mut unrecognized: BTreeMap<String, usize> = BTreeMap::new();

    for record in records {
        match record.container_type().and_then(|t| groups.get_mut(&t)) {
            Some(group) => group.records.push(record.clone()),
            None => *unrecognized.entry(record.type_label.clone()).or_insert(0) += 1,
        }
    }

    for group in groups.values() {
        log::debug!("{}: {} containers", group.container_type, group.len());
    }
    if !unrecognized.is_empty() {
        let labels: Vec<String> = unrecognized
            .iter()
            .map(|(label, count)| format!("{label:?} ({count})"))
            .collect();
        log::warn!(
            "Excluded {} containers with unrecognized type: {}",
            unrecognized.values().sum::<usize>(),
            labels.join(", ")
        );
    }

    ContainerPartition {
        groups,
        unrecognized,
    }
}
