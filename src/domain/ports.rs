use crate::domain::model::{AssociationReport, AssociationSettings, FeatureSet, Record, WorksheetMeta};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn source_endpoint(&self) -> &str;
    fn worksheet_id(&self) -> &str;
    fn output_path(&self) -> &str;
    fn output_formats(&self) -> &[String];
    fn association_settings(&self) -> AssociationSettings;
}

/// Access to the design-data service holding the drawing features of a worksheet.
#[async_trait]
pub trait DesignDataSource: Send + Sync {
    async fn fetch_ducts(&self, worksheet_id: &str) -> Result<Vec<Record>>;
    async fn fetch_dampers(&self, worksheet_id: &str) -> Result<Vec<Record>>;
}

/// Worksheet imagery, used only for visual QA overlays.
#[async_trait]
pub trait WorksheetImageSource: Send + Sync {
    async fn fetch_image(&self, worksheet_id: &str, zoom: u32) -> Result<Vec<u8>>;
    async fn fetch_meta(&self, worksheet_id: &str) -> Result<WorksheetMeta>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<FeatureSet>;
    async fn transform(&self, features: FeatureSet) -> Result<AssociationReport>;
    async fn load(&self, report: AssociationReport) -> Result<String>;
}
