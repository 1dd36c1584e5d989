pub mod assignment;
pub mod engine;
pub mod extraction;
pub mod geometry;
pub mod pipeline;

pub use crate::domain::model::{AssociationReport, FeatureSet, Record};
pub use crate::domain::ports::{
    ConfigProvider, DesignDataSource, Pipeline, Storage, WorksheetImageSource,
};
pub use crate::utils::error::Result;
