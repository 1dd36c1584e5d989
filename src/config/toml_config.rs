use crate::adapters::http::SourceSettings;
use crate::config::OUTPUT_FORMATS;
use crate::core::ConfigProvider;
use crate::domain::model::{
    AssignmentPolicy, AssociationSettings, DEFAULT_DISTANCE_THRESHOLD, DEFAULT_EXTENSION_DISTANCE,
};
use crate::utils::error::{AssociationError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub source: SourceConfig,
    pub worksheet: WorksheetConfig,
    pub association: Option<AssociationConfig>,
    pub output: OutputConfig,
    pub render: Option<RenderConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub endpoint: String,
    pub timeout_seconds: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_seconds: Option<u64>,
    pub headers: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorksheetConfig {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssociationConfig {
    pub distance_threshold: Option<f64>,
    pub extension_distance: Option<f64>,
    pub policy: Option<AssignmentPolicy>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub output_path: String,
    #[serde(default = "default_formats")]
    pub formats: Vec<String>,
}

fn default_formats() -> Vec<String> {
    vec!["json".to_string()]
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderConfig {
    pub zoom: Option<u32>,
    pub scale_down: Option<f64>,
    pub output_path: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(AssociationError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| AssociationError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${API_TOKEN})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| AssociationError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("source.endpoint", &self.source.endpoint)?;
        validation::validate_non_empty_string("worksheet.id", &self.worksheet.id)?;
        validation::validate_path("output.output_path", &self.output.output_path)?;

        let settings = self.association_settings();
        validation::validate_distance("association.distance_threshold", settings.distance_threshold)?;
        validation::validate_distance("association.extension_distance", settings.extension_distance)?;

        for format in &self.output.formats {
            validation::validate_one_of("output.formats", format, &OUTPUT_FORMATS)?;
        }

        if let Some(attempts) = self.source.retry_attempts {
            validation::validate_range("source.retry_attempts", attempts, 0, 10)?;
        }
        if let Some(timeout) = self.source.timeout_seconds {
            validation::validate_range("source.timeout_seconds", timeout, 1, 3600)?;
        }

        validation::validate_range("render.zoom", self.render_zoom(), 1, 8)?;
        validation::validate_range("render.scale_down", self.render_scale_down(), 0.05, 1.0)?;

        Ok(())
    }

    pub fn source_settings(&self) -> SourceSettings {
        let mut settings = SourceSettings::new(self.source.endpoint.clone());
        if let Some(headers) = &self.source.headers {
            settings.headers = headers.clone();
        }
        settings.timeout = self.source.timeout_seconds.map(Duration::from_secs);
        settings.retry_attempts = self.source.retry_attempts.unwrap_or(0);
        if let Some(delay) = self.source.retry_delay_seconds {
            settings.retry_delay = Duration::from_secs(delay);
        }
        settings
    }

    pub fn render_zoom(&self) -> u32 {
        self.render.as_ref().and_then(|r| r.zoom).unwrap_or(2)
    }

    pub fn render_scale_down(&self) -> f64 {
        self.render.as_ref().and_then(|r| r.scale_down).unwrap_or(0.5)
    }

    /// 圖片輸出目錄，未設定時沿用 output.output_path
    pub fn render_output_path(&self) -> &str {
        self.render
            .as_ref()
            .and_then(|r| r.output_path.as_deref())
            .unwrap_or(&self.output.output_path)
    }
}

impl ConfigProvider for TomlConfig {
    fn source_endpoint(&self) -> &str {
        &self.source.endpoint
    }

    fn worksheet_id(&self) -> &str {
        &self.worksheet.id
    }

    fn output_path(&self) -> &str {
        &self.output.output_path
    }

    fn output_formats(&self) -> &[String] {
        &self.output.formats
    }

    fn association_settings(&self) -> AssociationSettings {
        let association = self.association.as_ref();
        AssociationSettings {
            distance_threshold: association
                .and_then(|a| a.distance_threshold)
                .unwrap_or(DEFAULT_DISTANCE_THRESHOLD),
            extension_distance: association
                .and_then(|a| a.extension_distance)
                .unwrap_or(DEFAULT_EXTENSION_DISTANCE),
            policy: association.and_then(|a| a.policy).unwrap_or_default(),
        }
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
