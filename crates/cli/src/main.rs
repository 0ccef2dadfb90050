//! verdex CLI - vegetation indices over a remote raster-analysis service

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use verdex_cloud::{
    BearerToken, CloudAuth, NoAuth, RemoteClientOptions, RemoteServiceBlocking, ENDPOINT_ENV,
    TOKEN_ENV,
};
use verdex_core::{AdminPath, BBox, DateRange, Error, Region};
use verdex_engine::{
    AnalysisReport, AnalysisRequest, EngineConfig, MemoryService, RasterService, Source,
    VegetationEngine, VegetationIndex,
};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "verdex")]
#[command(author, version, about = "Vegetation index analysis over remote satellite imagery", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute index means and a time series for a region
    Analyze(AnalyzeArgs),
    /// List supported vegetation indices
    Indices,
    /// List supported satellite sources
    Sources,
}

#[derive(clap::Args)]
struct AnalyzeArgs {
    /// Region boundary as a GeoJSON Polygon, MultiPolygon or Feature file
    #[arg(required_unless_present = "bbox", conflicts_with = "bbox")]
    region: Option<PathBuf>,
    /// Rectangular region instead of a file: west,south,east,north
    #[arg(long, allow_hyphen_values = true)]
    bbox: Option<String>,
    /// Region label (defaults to the feature's "name" property)
    #[arg(long)]
    label: Option<String>,
    /// Country of the administrative selection
    #[arg(long)]
    country: Option<String>,
    /// State / province of the administrative selection
    #[arg(long, requires = "country")]
    state: Option<String>,
    /// Municipality of the administrative selection
    #[arg(long, requires = "country")]
    municipality: Option<String>,
    /// First acquisition date (YYYY-MM-DD)
    #[arg(long)]
    start: String,
    /// Last acquisition date, inclusive (YYYY-MM-DD)
    #[arg(long)]
    end: String,
    /// Satellite source: Sentinel-2, Landsat-8 or MODIS
    #[arg(short, long, default_value = "Sentinel-2")]
    source: Source,
    /// Index to compute; repeat for several (default: all)
    #[arg(short, long = "index")]
    indices: Vec<VegetationIndex>,
    /// Index sampled over time (default: first requested)
    #[arg(long)]
    series_index: Option<VegetationIndex>,
    /// Service base URL
    #[arg(long, env = ENDPOINT_ENV)]
    endpoint: Option<String>,
    /// Bearer token for the service
    #[arg(long, env = TOKEN_ENV, hide_env_values = true)]
    token: Option<String>,
    /// Retries on timeouts and server errors
    #[arg(long, default_value = "0")]
    retries: u32,
    /// Run against synthetic in-memory imagery instead of a service
    #[arg(long)]
    demo: bool,
    /// Engine configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn parse_bbox(s: &str) -> Result<BBox> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .with_context(|| format!("Invalid bbox '{s}'"))?;
    if parts.len() != 4 {
        bail!("bbox must be 'west,south,east,north', got: {}", s);
    }
    Ok(BBox::new(parts[0], parts[1], parts[2], parts[3]))
}

fn read_region(path: &Path, label: Option<&str>) -> Result<Region> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read region file {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&text).context("Region file is not valid JSON")?;
    Region::from_geojson(label, &value).context("Invalid region geometry")
}

fn build_region(args: &AnalyzeArgs) -> Result<Region> {
    let region = match (&args.region, &args.bbox) {
        (Some(path), _) => read_region(path, args.label.as_deref())?,
        (None, Some(bbox)) => Region::from_bbox(
            args.label.clone().unwrap_or_else(|| "Bounding box".into()),
            parse_bbox(bbox)?,
        )
        .context("Invalid bbox region")?,
        (None, None) => bail!("Either a region file or --bbox is required"),
    };

    Ok(match &args.country {
        Some(country) => {
            let mut path = AdminPath::new(country);
            if let Some(state) = &args.state {
                path = path.with_state(state);
            }
            if let Some(municipality) = &args.municipality {
                path = path.with_municipality(municipality);
            }
            region.with_admin_path(path)
        }
        None => region,
    })
}

fn build_service(args: &AnalyzeArgs, region: &Region) -> Result<Box<dyn RasterService>> {
    if args.demo {
        let dates = DateRange::parse(&args.start, &args.end).context("Invalid date range")?;
        info!("Using synthetic demo imagery");
        return Ok(Box::new(MemoryService::demo(region, &dates)));
    }

    let Some(endpoint) = args.endpoint.as_deref() else {
        bail!("No service endpoint: pass --endpoint, set {ENDPOINT_ENV}, or use --demo");
    };
    let auth: Box<dyn CloudAuth> = match args.token.as_deref() {
        Some(token) => Box::new(BearerToken::new(token).context("Invalid token")?),
        None => Box::new(NoAuth),
    };
    let options = RemoteClientOptions {
        max_retries: args.retries,
        ..RemoteClientOptions::default()
    };
    let service = RemoteServiceBlocking::new(endpoint, auth, options)
        .with_context(|| format!("Failed to create client for {endpoint}"))?;
    Ok(Box::new(service))
}

fn fmt_range((lo, hi): (f64, f64)) -> String {
    format!("[{lo}, {hi}]")
}

fn print_report(report: &AnalysisReport) {
    println!("Region: {}", report.region);
    println!(
        "Source: {}  ({} to {})",
        report.source, report.start_date, report.end_date
    );

    if !report.has_imagery() {
        println!("\nno imagery found for this region, source and date range");
        return;
    }
    println!("Scenes: {}", report.scene_count);

    println!("\nIndices:");
    for (index, result) in &report.per_index {
        let value = match (result.mean, result.is_healthy()) {
            (Some(mean), Some(true)) => format!("{mean:>8.4}  healthy"),
            (Some(mean), _) => format!("{mean:>8.4}  outside healthy range"),
            (None, _) => format!("{:>8}", "no data"),
        };
        println!(
            "  {:<5} {}  valid {}  healthy {}",
            index.name(),
            value,
            fmt_range(result.valid_range),
            fmt_range(result.healthy_range)
        );
    }
    for (index, reason) in &report.unavailable {
        println!(
            "  {:<5} index unavailable for this source ({})",
            index.name(),
            reason
        );
    }

    if let Some(index) = report.series_index {
        println!("\n{index} time series:");
        if report.time_series.is_empty() {
            println!("  no usable scenes");
        }
        for point in &report.time_series {
            println!("  {}  {:.4}", point.timestamp.format("%Y-%m-%d"), point.value);
        }
        if let Some(s) = &report.series_summary {
            println!(
                "  mean {:.4}  min {:.4}  max {:.4}  trend {}",
                s.mean, s.min, s.max, s.trend
            );
        }
    }
}

// ─── Commands ───────────────────────────────────────────────────────────

fn run_analyze(args: AnalyzeArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => EngineConfig::from_file(path).context("Failed to load config")?,
        None => EngineConfig::default(),
    };
    let region = build_region(&args)?;
    let start = verdex_core::dates::parse_date("start", &args.start)?;
    let end = verdex_core::dates::parse_date("end", &args.end)?;
    let indices = if args.indices.is_empty() {
        VegetationIndex::ALL.to_vec()
    } else {
        args.indices.clone()
    };

    let mut request = AnalysisRequest::new(region.clone(), start, end, args.source, indices);
    if let Some(index) = args.series_index {
        request = request.with_series_index(index);
    }

    let service = build_service(&args, &region)?;
    let engine = VegetationEngine::new(service).with_config(config);

    let pb = spinner("Analyzing...");
    let started = Instant::now();
    let outcome = engine.analyze(&request);
    pb.finish_and_clear();

    let report = match outcome {
        Ok(report) => report,
        Err(e @ Error::DataSource { .. }) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
        Err(e) => return Err(e).context("Analysis request rejected"),
    };
    info!("Analysis finished in {:.2?}", started.elapsed());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn list_indices() {
    for index in VegetationIndex::ALL {
        let info = index.info();
        println!(
            "{:<5}  valid {:<12} healthy {:<12} {}",
            index.name(),
            fmt_range(info.valid_range),
            fmt_range(info.healthy_range),
            info.description
        );
    }
}

fn list_sources() {
    for source in Source::ALL {
        let p = source.profile();
        println!("{source}");
        println!("  collection: {}", p.collection_id);
        match p.cloud_cover {
            Some(cc) => println!("  cloud filter: {} < {}", cc.property, cc.max_percent),
            None => println!("  cloud filter: none"),
        }
        println!("  native scale: {} m", p.native_scale_m);
        println!(
            "  bands: nir={} red={} blue={} green={}",
            p.bands.nir,
            p.bands.red,
            p.bands.blue.unwrap_or("-"),
            p.bands.green.unwrap_or("-")
        );
        for pre in p.precomputed {
            println!("  pre-computed: {} (band {})", pre.index, pre.band);
        }
    }
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Analyze(args) => run_analyze(args)?,
        Commands::Indices => list_indices(),
        Commands::Sources => list_sources(),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bbox() {
        let b = parse_bbox("-47.1, -22.9, -47.0, -22.8").unwrap();
        assert_eq!(b.to_array(), [-47.1, -22.9, -47.0, -22.8]);
        assert!(parse_bbox("1,2,3").is_err());
        assert!(parse_bbox("a,b,c,d").is_err());
    }

    #[test]
    fn analyze_args_parse() {
        let cli = Cli::try_parse_from([
            "verdex",
            "analyze",
            "--bbox",
            "-47.1,-22.9,-47.0,-22.8",
            "--start",
            "2023-01-01",
            "--end",
            "2023-12-31",
            "--source",
            "modis",
            "-i",
            "ndvi",
            "-i",
            "EVI",
            "--demo",
        ])
        .unwrap();
        match cli.command {
            Commands::Analyze(args) => {
                assert_eq!(args.source, Source::Modis);
                assert_eq!(
                    args.indices,
                    vec![VegetationIndex::NDVI, VegetationIndex::EVI]
                );
                assert!(args.demo);
                let region = build_region(&args).unwrap();
                assert_eq!(region.label(), "Bounding box");
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn admin_path_labels_region() {
        let cli = Cli::try_parse_from([
            "verdex",
            "analyze",
            "--bbox",
            "-47.1,-22.9,-47.0,-22.8",
            "--country",
            "Brazil",
            "--state",
            "São Paulo",
            "--municipality",
            "Campinas",
            "--start",
            "2023-01-01",
            "--end",
            "2023-12-31",
        ])
        .unwrap();
        let Commands::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        let region = build_region(&args).unwrap();
        assert_eq!(region.label(), "Campinas, São Paulo, Brazil");
    }

    #[test]
    fn credentials_fall_back_to_environment() {
        use clap::CommandFactory;

        let cmd = Cli::command();
        let analyze = cmd
            .get_subcommands()
            .find(|c| c.get_name() == "analyze")
            .unwrap();
        let env_of = |id: &str| {
            analyze
                .get_arguments()
                .find(|a| a.get_id() == id)
                .and_then(|a| a.get_env())
                .map(|e| e.to_string_lossy().into_owned())
        };
        assert_eq!(env_of("endpoint").as_deref(), Some(ENDPOINT_ENV));
        assert_eq!(env_of("token").as_deref(), Some(TOKEN_ENV));
    }

    #[test]
    fn region_required() {
        assert!(Cli::try_parse_from([
            "verdex", "analyze", "--start", "2023-01-01", "--end", "2023-02-01"
        ])
        .is_err());
    }

    #[test]
    fn demo_analysis_end_to_end() {
        let cli = Cli::try_parse_from([
            "verdex",
            "analyze",
            "--bbox",
            "-47.1,-22.9,-47.0,-22.8",
            "--start",
            "2023-01-01",
            "--end",
            "2023-06-30",
            "--demo",
        ])
        .unwrap();
        let Commands::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        let region = build_region(&args).unwrap();
        let service = build_service(&args, &region).unwrap();
        let engine = VegetationEngine::new(service);
        let request = AnalysisRequest::new(
            region,
            "2023-01-01".parse().unwrap(),
            "2023-06-30".parse().unwrap(),
            args.source,
            VegetationIndex::ALL.to_vec(),
        );
        let report = engine.analyze(&request).unwrap();
        assert_eq!(report.per_index.len(), 4);
        assert!(report.time_series.len() <= 10);
    }

    #[test]
    fn missing_endpoint_is_reported() {
        let cli = Cli::try_parse_from([
            "verdex",
            "analyze",
            "--bbox",
            "0,0,1,1",
            "--start",
            "2023-01-01",
            "--end",
            "2023-06-30",
            "--endpoint",
            "",
        ])
        .unwrap();
        let Commands::Analyze(mut args) = cli.command else {
            panic!("expected analyze");
        };
        args.endpoint = None;
        let region = build_region(&args).unwrap();
        let err = build_service(&args, &region).err().unwrap();
        assert!(err.to_string().contains("No service endpoint"));
    }
}
