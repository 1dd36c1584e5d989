use anyhow::Context;
use clap::Parser;
use duct_damper_association::adapters::render::{render_overlay, save_overlay, PageTransform};
use duct_damper_association::core::{ConfigProvider, Pipeline, WorksheetImageSource};
use duct_damper_association::utils::logger::{self, LogFormat};
use duct_damper_association::utils::validation::Validate;
use duct_damper_association::{DesignDataClient, LocalStorage, TomlConfig, WorksheetPipeline};
use std::path::Path;

#[derive(Parser)]
#[command(name = "visualize")]
#[command(about = "Render ducts, dampers and their associations over the worksheet image")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "association.toml")]
    config: String,

    /// Override the worksheet id from config
    #[arg(short, long)]
    worksheet: Option<String>,

    /// Override the image zoom factor from config
    #[arg(long)]
    zoom: Option<u32>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Log output format: compact or json
    #[arg(long, default_value = "compact")]
    log_format: LogFormat,

    /// Show what would be rendered without fetching anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    logger::init_logger(args.log_format, args.verbose);
    tracing::info!("📁 Loading configuration from: {}", args.config);

    let mut config = TomlConfig::from_file(&args.config)
        .with_context(|| format!("Failed to load config file '{}'", args.config))?;

    // 應用命令列覆蓋設定
    if let Some(worksheet) = args.worksheet {
        config.worksheet.id = worksheet;
    }
    if let Some(zoom) = args.zoom {
        config.render.get_or_insert_with(Default::default).zoom = Some(zoom);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        anyhow::bail!(e.user_friendly_message());
    }

    display_config_summary(&config);
    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - nothing fetched or rendered");
        return Ok(());
    }

    let worksheet_id = config.worksheet_id().to_string();
    let zoom = config.render_zoom();
    let scale_down = config.render_scale_down();
    let render_dir = config.render_output_path().to_string();
    let settings = config.association_settings();
    let source_settings = config.source_settings();

    let imagery = DesignDataClient::new(source_settings.clone());
    let storage = LocalStorage::new(config.output_path().to_string());
    let pipeline = WorksheetPipeline::new(DesignDataClient::new(source_settings), storage, config);

    let features = pipeline.extract().await?;
    let report = pipeline.transform(features.clone()).await?;

    tracing::info!("🖼️ Fetching worksheet image (zoom {})", zoom);
    let meta = imagery.fetch_meta(&worksheet_id).await?;
    let image_bytes = imagery.fetch_image(&worksheet_id, zoom).await?;
    let transform = PageTransform::from_meta(&meta, zoom)?;
    tracing::debug!(
        "Scale factors - X: {}, Y: {}",
        transform.scale_x,
        transform.scale_y
    );

    let image = render_overlay(
        &image_bytes,
        &features,
        &report.mapping,
        &transform,
        settings.extension_distance,
    )?;
    let (full_path, small_path) =
        save_overlay(&image, Path::new(&render_dir), &worksheet_id, scale_down)?;

    let assigned = report.damper_count - report.unassigned_count;
    let mapping_path = pipeline.load(report).await?;

    println!("✅ Visualization saved as: {}", full_path.display());
    println!("   Small version saved as: {}", small_path.display());
    println!("   Mapping saved to: {}", mapping_path);
    println!();
    println!("Summary:");
    println!("- {} ducts plotted as blue lines", features.ducts.len());
    println!(
        "- {} dampers plotted (red: CRD, green: MVD, orange: other)",
        features.dampers.len()
    );
    println!(
        "- {} associations drawn as yellow connectors, unassigned dampers ringed in magenta",
        assigned
    );

    Ok(())
}

fn display_config_summary(config: &TomlConfig) {
    let settings = config.association_settings();
    println!("📋 Configuration Summary:");
    println!("  Source: {}", config.source_endpoint());
    println!("  Worksheet: {}", config.worksheet_id());
    println!(
        "  Association: {} (threshold {}, extension {})",
        settings.policy, settings.distance_threshold, settings.extension_distance
    );
    println!(
        "  Render: zoom {}, scale-down {}",
        config.render_zoom(),
        config.render_scale_down()
    );
    println!("  Output: {}", config.render_output_path());
    println!();
}
