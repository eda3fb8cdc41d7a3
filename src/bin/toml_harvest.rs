use clap::Parser;
use relay_etl::config::catalog::Catalog;
use relay_etl::config::toml_config::TomlConfig;
use relay_etl::core::orchestrator::plan_pages;
use relay_etl::core::ConfigProvider;
use relay_etl::utils::{logger, validation::Validate};
use relay_etl::{EtlEngine, HarvestPipeline, LocalStorage};

#[derive(Parser)]
#[command(name = "toml-harvest")]
#[command(about = "Harvest tool with TOML configuration support")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "harvest.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Dry run - show the planned pages without fetching anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 初始化日誌
    logger::init_logger(args.verbose, args.log_json);

    tracing::info!("🚀 Starting TOML-based harvest");
    tracing::info!("📁 Loading configuration from: {}", args.config);

    let config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");
    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No requests will be sent");
        if let Err(e) = perform_dry_run(&config) {
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(e.exit_code());
        }
        return Ok(());
    }

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let storage = LocalStorage::new(config.output_path().to_string());
    let pipeline = HarvestPipeline::new(storage, config);
    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Harvest completed successfully!");
            tracing::info!("📁 Output saved to: {}", output_path);
            println!("✅ Harvest completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Harvest failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            std::process::exit(e.exit_code());
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!("  Pipeline: {}", config.pipeline_name());
    println!("  Catalog: {}", config.catalog_path());
    println!("  Relay: {}", config.relay_endpoint());
    println!("  API: {}", config.api_profile().base_url);
    println!(
        "  Output: {}/{}",
        config.output_path(),
        config.output_file()
    );
    println!("  Page Size: {}", config.page_size());
    println!("  Concurrent Pages: {}", config.max_concurrent_pages());
    match config.page_timeout() {
        Some(timeout) => println!("  Page Timeout: {}s", timeout.as_secs()),
        None => println!("  Page Timeout: none"),
    }

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

fn perform_dry_run(config: &TomlConfig) -> relay_etl::Result<()> {
    let catalog = Catalog::from_file(config.catalog_path())?;
    let page_size = config.page_size();

    println!("🔍 Dry Run Analysis:");
    println!();
    println!("📚 Data Sets ({}):", catalog.len());
    for dataset in &catalog.datasets {
        let pages = dataset.page_count(page_size as u64);
        if pages == 0 {
            println!("  ⏭️ {} ({}): no records, skipped", dataset.label, dataset.id);
        } else {
            println!(
                "  📄 {} ({}): {} records, {} pages",
                dataset.label, dataset.id, dataset.expected_count, pages
            );
        }
    }

    let plan = plan_pages(&catalog.datasets, page_size);
    println!();
    println!("⚙️ Fetch Plan:");
    println!("  Pages planned: {}", plan.pages_planned);
    println!("  Data sets skipped: {}", plan.skipped);
    println!("  Headers per request: {}", config.api_profile().headers.len());

    println!();
    println!("✅ Dry run analysis complete. No requests were sent.");

    Ok(())
}
