#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Filtering and aggregation between loading and rendering.
//!
//! - [`filter`]: attribute predicates over accident rows.
//! - [`heat`]: month-bucketed weighted points for the time-slider heatmap.
//! - [`containers`]: partitioning of the container inventory by category.

pub mod containers;
pub mod filter;
pub mod heat;

pub use containers::{ContainerGroup, ContainerPartition, partition_containers};
pub use filter::AccidentFilter;
pub use heat::{MonthlyHeatFrame, WeightedPoint, frame_labels, group_points, monthly_frames};
