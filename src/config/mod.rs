pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::{
    adapters::http::SourceSettings,
    core::ConfigProvider,
    domain::model::{
        AssignmentPolicy, AssociationSettings, DEFAULT_DISTANCE_THRESHOLD,
        DEFAULT_EXTENSION_DISTANCE,
    },
    utils::error::Result,
    utils::logger::LogFormat,
    utils::validation::{self, Validate},
};
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "cli")]
use std::time::Duration;

pub const OUTPUT_FORMATS: [&str; 2] = ["json", "csv"];

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "duct-damper")]
#[command(about = "Associate damper symbols with duct runs on a worksheet")]
pub struct CliConfig {
    #[arg(long, default_value = "http://localhost:8080/api")]
    pub endpoint: String,

    #[arg(long)]
    pub worksheet_id: String,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    #[arg(long, value_delimiter = ',', default_value = "json")]
    pub formats: Vec<String>,

    #[arg(long, default_value_t = DEFAULT_DISTANCE_THRESHOLD)]
    pub distance_threshold: f64,

    #[arg(long, default_value_t = DEFAULT_EXTENSION_DISTANCE)]
    pub extension_distance: f64,

    #[arg(long, default_value = "exclusive")]
    pub policy: AssignmentPolicy,

    #[arg(long, help = "Bearer token for the design-data service")]
    pub api_token: Option<String>,

    #[arg(long, default_value = "30")]
    pub timeout_seconds: u64,

    #[arg(long, default_value = "2")]
    pub retry_attempts: u32,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, default_value = "compact", help = "Log output format: compact or json")]
    pub log_format: LogFormat,
}

#[cfg(feature = "cli")]
impl CliConfig {
    pub fn source_settings(&self) -> SourceSettings {
        let mut settings = SourceSettings::new(self.endpoint.clone());
        if let Some(token) = &self.api_token {
            settings
                .headers
                .insert("Authorization".to_string(), format!("Bearer {}", token));
        }
        settings.timeout = Some(Duration::from_secs(self.timeout_seconds));
        settings.retry_attempts = self.retry_attempts;
        settings
    }
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn source_endpoint(&self) -> &str {
        &self.endpoint
    }

    fn worksheet_id(&self) -> &str {
        &self.worksheet_id
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn output_formats(&self) -> &[String] {
        &self.formats
    }

    fn association_settings(&self) -> AssociationSettings {
        AssociationSettings {
            distance_threshold: self.distance_threshold,
            extension_distance: self.extension_distance,
            policy: self.policy,
        }
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("endpoint", &self.endpoint)?;
        validation::validate_non_empty_string("worksheet_id", &self.worksheet_id)?;
        validation::validate_path("output_path", &self.output_path)?;
        validation::validate_distance("distance_threshold", self.distance_threshold)?;
        validation::validate_distance("extension_distance", self.extension_distance)?;
        for format in &self.formats {
            validation::validate_one_of("formats", format, &OUTPUT_FORMATS)?;
        }
        Ok(())
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    fn config() -> CliConfig {
        CliConfig {
            endpoint: "https://design.example.com/api".to_string(),
            worksheet_id: "ws-1".to_string(),
            output_path: "./output".to_string(),
            formats: vec!["json".to_string(), "csv".to_string()],
            distance_threshold: 13.0,
            extension_distance: 13.0,
            policy: AssignmentPolicy::Exclusive,
            api_token: Some("secret".to_string()),
            timeout_seconds: 30,
            retry_attempts: 2,
            verbose: false,
            log_format: LogFormat::Compact,
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_rejects_negative_threshold_and_unknown_format() {
        let mut bad_threshold = config();
        bad_threshold.distance_threshold = -1.0;
        assert!(bad_threshold.validate().is_err());

        let mut bad_format = config();
        bad_format.formats = vec!["xml".to_string()];
        assert!(bad_format.validate().is_err());

        let mut blank_worksheet = config();
        blank_worksheet.worksheet_id = "  ".to_string();
        assert!(blank_worksheet.validate().is_err());
    }

    #[test]
    fn test_source_settings_carry_token() {
        let settings = config().source_settings();
        assert_eq!(
            settings.headers.get("Authorization").map(String::as_str),
            Some("Bearer secret")
        );
        assert_eq!(settings.retry_attempts, 2);
        assert_eq!(settings.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_parse_command_line() {
        let config = CliConfig::parse_from([
            "duct-damper",
            "--worksheet-id",
            "ws-9",
            "--policy",
            "shared",
            "--formats",
            "json,csv",
            "--distance-threshold",
            "20",
            "--log-format",
            "json",
        ]);
        assert_eq!(config.worksheet_id, "ws-9");
        assert_eq!(config.policy, AssignmentPolicy::Shared);
        assert_eq!(config.formats, vec!["json", "csv"]);
        assert_eq!(config.distance_threshold, 20.0);
        assert_eq!(config.extension_distance, DEFAULT_EXTENSION_DISTANCE);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_log_format_defaults_to_compact() {
        let config = CliConfig::parse_from(["duct-damper", "--worksheet-id", "ws-9"]);
        assert_eq!(config.log_format, LogFormat::Compact);
        assert!(CliConfig::try_parse_from([
            "duct-damper",
            "--worksheet-id",
            "ws-9",
            "--log-format",
            "xml"
        ])
        .is_err());
    }
}
