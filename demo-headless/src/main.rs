use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;
use urban_plume_core::{
    AqiAssessment, AqiEstimator, AqiFeatures, ComparisonMode, ConstantAqi,
    DispersionConfig, PlumeError, PlumeResult, Polygon, ScenarioComparator, ScenarioComparison,
    ScenarioComposer, ScenarioParameters, Services, SiteFeatures, Wind,
};

/// Urban plume scenario comparison with configurable parameters
#[derive(Parser, Debug)]
#[command(name = "urban-plume-demo")]
#[command(about = "Compare current and future urban air quality for a site", long_about = None)]
struct Args {
    /// Site west edge (degrees longitude)
    #[arg(long, default_value_t = 77.5730, allow_negative_numbers = true)]
    min_lon: f64,

    /// Site south edge (degrees latitude)
    #[arg(long, default_value_t = 12.9180, allow_negative_numbers = true)]
    min_lat: f64,

    /// Site east edge (degrees longitude)
    #[arg(long, default_value_t = 77.5900, allow_negative_numbers = true)]
    max_lon: f64,

    /// Site north edge (degrees latitude)
    #[arg(long, default_value_t = 12.9340, allow_negative_numbers = true)]
    max_lat: f64,

    /// Wind speed in m/s
    #[arg(short, long, default_value_t = 3.2)]
    wind_speed: f64,

    /// Wind direction in degrees, the direction the wind blows from (0=North, 90=East)
    #[arg(long, default_value_t = 240.0)]
    wind_direction: f64,

    /// Current built-up fraction (0-1)
    #[arg(long, default_value_t = 0.4)]
    base_built: f64,

    /// Current green fraction (0-1)
    #[arg(long, default_value_t = 0.2)]
    base_green: f64,

    /// Future built-up fraction (0-1)
    #[arg(long, default_value_t = 0.1)]
    future_built: f64,

    /// Future green fraction (0-1)
    #[arg(long, default_value_t = 0.1)]
    future_green: f64,

    /// Annual population growth in the future scenario (0.015 = 1.5%)
    #[arg(long, default_value_t = -0.025, allow_negative_numbers = true)]
    future_growth: f64,

    /// Future horizon in years
    #[arg(long, default_value_t = 5.0)]
    future_years: f64,

    /// Resident population of the site
    #[arg(short, long, default_value_t = 60_000.0)]
    population: f64,

    /// How the two scenarios are reported
    #[arg(short, long, value_enum, default_value_t = Mode::DeltaAnchored)]
    mode: Mode,

    /// JSON configuration overriding engine defaults
    #[arg(short, long)]
    config: Option<String>,

    /// JSON feature file (roads, industry, buildings, green)
    #[arg(short, long)]
    features: Option<String>,

    /// Feature coordinates are lon/lat degrees rather than projected metres
    #[arg(long)]
    features_lon_lat: bool,

    /// Constant AQI predictions to average, one per estimator
    #[arg(long, num_args = 1..)]
    aqi: Vec<f64>,

    /// City passed to AQI estimators
    #[arg(long, default_value = "Bengaluru")]
    city: String,

    /// Print the default configuration as JSON and exit
    #[arg(long)]
    dump_config: bool,

    /// Print the full comparison as JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Absolute,
    DeltaAnchored,
}

impl From<Mode> for ComparisonMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Absolute => ComparisonMode::Absolute,
            Mode::DeltaAnchored => ComparisonMode::DeltaAnchored,
        }
    }
}

fn main() -> PlumeResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if args.dump_config {
        println!("{}", DispersionConfig::default().to_json_string()?);
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {path}");
            DispersionConfig::load(path)?
        }
        None => DispersionConfig::default(),
    };

    let features = match &args.features {
        Some(path) => {
            let features = read_features(path)?;
            if args.features_lon_lat {
                features.project(&config.scenario.projection)
            } else {
                features
            }
        }
        None => SiteFeatures::default(),
    };
    info!(
        "Features: {} roads, {} industrial, {} buildings, {} green",
        features.roads.len(),
        features.industry.len(),
        features.buildings.len(),
        features.green.len()
    );

    let site = Polygon::from_coords(&[
        (args.min_lon, args.min_lat),
        (args.max_lon, args.min_lat),
        (args.max_lon, args.max_lat),
        (args.min_lon, args.max_lat),
        (args.min_lon, args.min_lat),
    ]);
    let wind = Wind::new(args.wind_speed, args.wind_direction);
    let base = ScenarioParameters::current(args.base_built, args.base_green);
    let future = ScenarioParameters::new(
        args.future_built,
        args.future_green,
        args.future_growth,
        args.future_years,
    );

    let services = Services::in_memory(
        args.population,
        config.scenario.fallback_background.clone(),
        features,
    );
    let composer = ScenarioComposer::new(config);
    let comparator = ScenarioComparator::new(&composer, args.mode.into());
    let comparison = comparator.run(&site, &base, &future, &wind, None, &services)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&comparison)?);
        return Ok(());
    }

    print_report(&args, &comparison);
    Ok(())
}

fn read_features(path: &str) -> PlumeResult<SiteFeatures> {
    let contents = std::fs::read_to_string(path).map_err(|source| PlumeError::Io {
        path: path.to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&contents)?)
}

fn print_report(args: &Args, comparison: &ScenarioComparison) {
    println!("=== Urban Plume Scenario Comparison ===\n");
    println!(
        "Wind: {:.1} m/s from {:.0}°, mode: {:?}",
        args.wind_speed, args.wind_direction, comparison.mode
    );
    println!(
        "Receptors: {}, sources (base): {} road / {} industry / {} building",
        comparison.grid.len(),
        comparison.base.source_counts.roads,
        comparison.base.source_counts.industry,
        comparison.base.source_counts.buildings
    );
    println!(
        "Population: {:.0} now, {:.0} in {:.0} years\n",
        comparison.base.population, comparison.future.population, args.future_years
    );

    println!("Gas    | Background |    Current |     Future |     Change");
    println!("-------|------------|------------|------------|-----------");
    let changes = comparison.mean_changes();
    for (gas, change) in &changes {
        println!(
            "{:<6} | {:10.2} | {:10.2} | {:10.2} | {:+10.2}",
            gas.as_str().to_uppercase(),
            comparison.background.level(*gas),
            comparison.base_means.get(gas).copied().unwrap_or(0.0),
            comparison.future_means.get(gas).copied().unwrap_or(0.0),
            change
        );
    }
    println!("(µg/m³)");

    let estimators: Vec<Box<dyn AqiEstimator>> = args
        .aqi
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            Box::new(ConstantAqi::new(format!("estimator-{}", i + 1), value))
                as Box<dyn AqiEstimator>
        })
        .collect();

    for (label, features) in [
        ("Current", comparison.base_aqi_features()),
        ("Future", comparison.future_aqi_features()),
    ] {
        println!("\n=== {label} ===");
        print_features(&features);
        if let Some(aqi) = AqiAssessment::assess(&estimators, &features, &args.city) {
            for (name, value) in &aqi.predictions {
                println!("  {name:<20}: {value:.2}");
            }
            println!("Average AQI: {:.2} ({})", aqi.average, aqi.status);
        }
    }

    if !comparison.warnings.is_empty() {
        println!("\nWarnings:");
        for w in &comparison.warnings {
            println!("  - {w}");
        }
    }
}

fn print_features(features: &AqiFeatures) {
    for (name, value) in features.columns() {
        println!("  {name:<8}: {value:.2}");
    }
}
