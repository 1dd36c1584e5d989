use crate::core::Pipeline;
use crate::utils::error::Result;
use std::time::Instant;

pub struct AssociationEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> AssociationEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<String> {
        let started = Instant::now();
        tracing::info!("Starting duct/damper association...");

        // Extract
        let features = self.pipeline.extract().await?;
        tracing::info!(
            "Extracted {} ducts and {} dampers",
            features.ducts.len(),
            features.dampers.len()
        );

        // Transform
        let report = self.pipeline.transform(features).await?;
        tracing::info!(
            "Associated {} of {} dampers ({} candidate pairs)",
            report.damper_count - report.unassigned_count,
            report.damper_count,
            report.candidate_count
        );

        // Load
        let output_path = self.pipeline.load(report).await?;
        tracing::info!("Output saved to: {} ({:?})", output_path, started.elapsed());

        Ok(output_path)
    }
}
