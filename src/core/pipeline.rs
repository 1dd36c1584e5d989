use crate::core::assignment::{build_candidates, resolve};
use crate::core::extraction::{extract_dampers, extract_ducts};
use crate::core::{ConfigProvider, DesignDataSource, Pipeline, Storage};
use crate::domain::model::{AssociationReport, FeatureSet};
use crate::utils::error::{AssociationError, Result};
use chrono::Utc;

/// Association pipeline for a single worksheet: fetch features, match
/// dampers to ducts, write the mapping.
pub struct WorksheetPipeline<D: DesignDataSource, S: Storage, C: ConfigProvider> {
    source: D,
    storage: S,
    config: C,
}

impl<D: DesignDataSource, S: Storage, C: ConfigProvider> WorksheetPipeline<D, S, C> {
    pub fn new(source: D, storage: S, config: C) -> Self {
        Self {
            source,
            storage,
            config,
        }
    }

    fn file_stem(&self) -> String {
        format!("damper_duct_mapping_{}", self.config.worksheet_id())
    }

    fn render_csv(report: &AssociationReport) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(["damper_id", "duct_id"])?;
        for (damper_id, assignment) in &report.mapping {
            let duct_id = assignment.to_string();
            writer.write_record([damper_id.as_str(), duct_id.as_str()])?;
        }
        writer
            .into_inner()
            .map_err(|e| AssociationError::ProcessingError {
                message: format!("Failed to finish CSV output: {}", e),
            })
    }
}

#[async_trait::async_trait]
impl<D: DesignDataSource, S: Storage, C: ConfigProvider> Pipeline for WorksheetPipeline<D, S, C> {
    async fn extract(&self) -> Result<FeatureSet> {
        let worksheet_id = self.config.worksheet_id();
        tracing::info!("📥 Fetching ducts and dampers for worksheet {}", worksheet_id);

        // 取資料失敗需與「沒有資料」區分
        let retrieval_error = |e: AssociationError| AssociationError::DataRetrievalError {
            worksheet_id: worksheet_id.to_string(),
            message: e.to_string(),
        };

        let duct_records = self
            .source
            .fetch_ducts(worksheet_id)
            .await
            .map_err(retrieval_error)?;
        let damper_records = self
            .source
            .fetch_dampers(worksheet_id)
            .await
            .map_err(retrieval_error)?;

        tracing::debug!(
            "Received {} duct records and {} damper records",
            duct_records.len(),
            damper_records.len()
        );

        Ok(FeatureSet {
            worksheet_id: worksheet_id.to_string(),
            ducts: extract_ducts(&duct_records),
            dampers: extract_dampers(&damper_records),
        })
    }

    async fn transform(&self, features: FeatureSet) -> Result<AssociationReport> {
        let settings = self.config.association_settings();
        tracing::info!(
            "🔗 Associating {} dampers with {} ducts (policy: {}, threshold: {}, extension: {})",
            features.dampers.len(),
            features.ducts.len(),
            settings.policy,
            settings.distance_threshold,
            settings.extension_distance
        );

        let candidates = build_candidates(&features.dampers, &features.ducts, &settings);
        let mapping = resolve(
            settings.policy,
            &features.dampers,
            &features.ducts,
            &candidates,
        );
        let unassigned_count = mapping.values().filter(|a| !a.is_assigned()).count();

        Ok(AssociationReport {
            worksheet_id: features.worksheet_id,
            settings,
            duct_count: features.ducts.len(),
            damper_count: features.dampers.len(),
            candidate_count: candidates.len(),
            unassigned_count,
            generated_at: Utc::now(),
            mapping,
        })
    }

    async fn load(&self, report: AssociationReport) -> Result<String> {
        let stem = self.file_stem();
        let mut written = Vec::new();

        for format in self.config.output_formats() {
            let (file_name, data) = match format.as_str() {
                "json" => (
                    format!("{}.json", stem),
                    serde_json::to_vec_pretty(&report)?,
                ),
                "csv" => (format!("{}.csv", stem), Self::render_csv(&report)?),
                other => {
                    return Err(AssociationError::InvalidConfigValueError {
                        field: "output.formats".to_string(),
                        value: other.to_string(),
                        reason: "Unsupported output format".to_string(),
                    })
                }
            };

            tracing::debug!("Writing {} ({} bytes)", file_name, data.len());
            self.storage.write_file(&file_name, &data).await?;
            written.push(format!("{}/{}", self.config.output_path(), file_name));
        }

        Ok(written.join(", "))
    }
}
