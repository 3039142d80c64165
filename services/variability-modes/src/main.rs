//! Variability mode metrics driver.
//!
//! Computes the leading EOF of a variability mode in observations and in
//! every configured model, compares the patterns and writes the statistics
//! as JSON.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use diagnostics::InterpolationRegridder;
use pmp_io::{FieldReader, ObsCatalog};
use pmp_metrics::pipeline::{MODEL_FREQUENCY, MODEL_REALM};
use pmp_metrics::{results, LandSeaMaskGenerator, ModePipeline, Parameter, RegriddedMaskGenerator};

#[derive(Parser, Debug)]
#[command(name = "variability-modes")]
#[command(about = "Leading-EOF variability mode metrics for climate models")]
struct Args {
    /// Parameter file (YAML)
    #[arg(short, long, env = "PMP_PARAMETER_FILE")]
    config: PathBuf,

    /// Observation catalog (JSON)
    #[arg(long, env = "PMP_OBS_CATALOG")]
    catalog: PathBuf,

    /// Variability mode, overrides the parameter file
    #[arg(short, long)]
    mode: Option<String>,

    /// Results directory, overrides the parameter file
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(args: &Args) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let builder = fmt().with_env_filter(filter).with_target(true).with_level(true);
    if args.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[cfg(feature = "netcdf")]
fn field_reader() -> Result<Box<dyn FieldReader>> {
    Ok(Box::new(pmp_io::NetCdfReader::new()))
}

#[cfg(not(feature = "netcdf"))]
fn field_reader() -> Result<Box<dyn FieldReader>> {
    anyhow::bail!("built without NetCDF support; rebuild with `--features netcdf`")
}

fn load_parameter(args: &Args) -> Result<Parameter> {
    let mut parameter = Parameter::load(&args.config)
        .with_context(|| format!("Failed to load parameters from {}", args.config.display()))?;
    if let Some(mode) = &args.mode {
        parameter.variability_mode = mode.clone();
    }
    if let Some(dir) = &args.output_dir {
        parameter.results_dir = dir.clone();
    }
    Ok(parameter)
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args);

    info!("Starting variability mode metrics");

    let parameter = load_parameter(&args)?;
    let catalog = ObsCatalog::load(&args.catalog)
        .with_context(|| format!("Failed to load observation catalog {}", args.catalog.display()))?;
    info!(
        mode = %parameter.variability_mode,
        models = ?parameter.model_versions,
        references = ?parameter.reference_data_set,
        "Loaded configuration"
    );

    let reader = field_reader()?;
    let regridder = InterpolationRegridder::new();
    let mask_generator = parameter
        .land_sea_mask_path
        .as_ref()
        .map(|path| RegriddedMaskGenerator::new(reader.as_ref(), &regridder, path));
    let generator = mask_generator.as_ref().map(|g| g as &dyn LandSeaMaskGenerator);

    let mut pipeline = ModePipeline::new(&parameter, &catalog, reader.as_ref(), &regridder, generator)?;
    let summary = pipeline.run().context("Variability mode run failed")?;

    let path = results::output_path(&parameter, MODEL_FREQUENCY, MODEL_REALM);
    summary
        .write(&path)
        .with_context(|| format!("Failed to write results to {}", path.display()))?;

    info!(path = ?path, models = summary.models().count(), "Variability mode metrics completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_minimal() {
        let args = Args::try_parse_from([
            "variability-modes",
            "--config",
            "params.yaml",
            "--catalog",
            "obs_catalog.json",
        ])
        .unwrap();
        assert_eq!(args.config, PathBuf::from("params.yaml"));
        assert!(args.mode.is_none());
        assert!(!args.json_logs);
    }

    #[test]
    fn test_args_overrides() {
        let args = Args::try_parse_from([
            "variability-modes",
            "-c",
            "params.yaml",
            "--catalog",
            "obs.json",
            "--mode",
            "nao",
            "--output-dir",
            "/tmp/results",
            "--json-logs",
        ])
        .unwrap();
        assert_eq!(args.mode.as_deref(), Some("nao"));
        assert_eq!(args.output_dir, Some(PathBuf::from("/tmp/results")));
        assert!(args.json_logs);
    }

    #[test]
    fn test_load_parameter_applies_cli_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("params.yaml");
        std::fs::write(
            &config,
            "obs_data_path: /obs\nmod_data_path: /models\nfilename_template: \"%(variable).nc\"\n",
        )
        .unwrap();

        let args = Args::try_parse_from([
            "variability-modes",
            "--config",
            config.to_str().unwrap(),
            "--catalog",
            "obs.json",
            "--mode",
            "sam",
        ])
        .unwrap();
        let parameter = load_parameter(&args).unwrap();
        assert_eq!(parameter.variability_mode, "sam");
        assert_eq!(parameter.results_dir, PathBuf::from("."));
    }
}
