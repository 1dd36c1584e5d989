pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{cli::LocalStorage, toml_config::TomlConfig};

pub use adapters::http::{DesignDataClient, SourceSettings};
pub use core::assignment::associate;
pub use core::geometry::{distance_to_duct, distance_to_segment, SegmentDistance};
pub use core::{engine::AssociationEngine, pipeline::WorksheetPipeline};
pub use domain::model::{
    Assignment, AssignmentPolicy, AssociationSettings, Damper, Duct, Intersection, Mapping, Point,
    Segment,
};
pub use utils::error::{AssociationError, Result};
