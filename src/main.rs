use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use rusty_lightcurve::config::PipelineConfig;
use rusty_lightcurve::data::loader::{load_series, write_series};
use rusty_lightcurve::export::{write_arrays, LightCurveArrays};
use rusty_lightcurve::photometry::relative_photometry;
use rusty_lightcurve::pipeline::clean_file;
use rusty_lightcurve::weather::corrector::{correct_weather, Weighting};
use rusty_lightcurve::weather::database::{
    build_weather_database_from_paths, read_database, write_database,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Clean, weather-correct and difference photometric light curves"
)]
struct Args {
    /// JSON pipeline configuration; flags below override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Drop flagged/malformed rows, repair midnight wraps, sort, sigma-clip, smooth
    Clean {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Keep only this stack size
        #[arg(long)]
        stack: Option<f64>,
        /// Sigma for flux-jump rejection
        #[arg(long)]
        sigma: Option<f64>,
        /// Apply 3-point smoothing with default gap detection
        #[arg(long, default_value_t = false)]
        smooth: bool,
    },

    /// Build a weather database from cleaned alternate-source files
    BuildDb {
        #[arg(short, long)]
        output: PathBuf,
        #[arg(required = true)]
        alternates: Vec<PathBuf>,
    },

    /// Correct a cleaned source for weather using a database
    Correct {
        #[arg(long)]
        db: PathBuf,
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Weight alternates by inverse centroid distance
        #[arg(long, default_value_t = false)]
        weighted: bool,
        /// Widest alternate sampling gap to interpolate across (s)
        #[arg(long)]
        gap_threshold: Option<f64>,
    },

    /// Subtract a reference source's flux from a source at matching times
    Relative {
        source: PathBuf,
        reference: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Largest time difference (s) counted as a match
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Write time/flux arrays for spectral analysis (.parquet or .json)
    Export {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };

    match args.command {
        Command::Clean {
            input,
            output,
            stack,
            sigma,
            smooth,
        } => {
            config.apply_overrides(stack, sigma, smooth);
            let report = clean_file(&input, &output, &config)?;
            println!(
                "{} rows in, {} records out \
                 ({} flagged, {} malformed, {} wraps repaired, {} outliers)",
                report.raw_rows,
                report.series.len(),
                report.flagged,
                report.malformed,
                report.day_transitions,
                report.outliers
            );
        }

        Command::BuildDb { output, alternates } => {
            let db = build_weather_database_from_paths(&alternates)
                .context("building weather database")?;
            write_database(&output, &db)
                .with_context(|| format!("writing {}", output.display()))?;
            println!("Wrote {} alternate sources to {}", db.len(), output.display());
        }

        Command::Correct {
            db,
            input,
            output,
            weighted,
            gap_threshold,
        } => {
            let weather = &mut config.weather;
            weather.weighted |= weighted;
            if let Some(gap) = gap_threshold {
                weather.gap_threshold = gap;
            }
            let db = read_database(&db).with_context(|| format!("reading {}", db.display()))?;
            let target =
                load_series(&input).with_context(|| format!("reading {}", input.display()))?;
            let corrected = correct_weather(
                &db,
                &target,
                Weighting::from_flag(weather.weighted),
                weather.gap_threshold,
            )?;
            write_series(&output, &corrected)
                .with_context(|| format!("writing {}", output.display()))?;
            println!(
                "Corrected {} of {} records",
                corrected.len(),
                target.len()
            );
        }

        Command::Relative {
            source,
            reference,
            output,
            threshold,
        } => {
            let threshold = threshold.unwrap_or(config.relative.threshold);
            let src =
                load_series(&source).with_context(|| format!("reading {}", source.display()))?;
            let reference = load_series(&reference)
                .with_context(|| format!("reading {}", reference.display()))?;
            let diff = relative_photometry(threshold, &src, &reference);
            write_series(&output, &diff)
                .with_context(|| format!("writing {}", output.display()))?;
            println!("Wrote {} matched records to {}", diff.len(), output.display());
        }

        Command::Export { input, output } => {
            let series =
                load_series(&input).with_context(|| format!("reading {}", input.display()))?;
            let arrays = LightCurveArrays::from_series(&series);
            write_arrays(&output, &arrays)
                .with_context(|| format!("writing {}", output.display()))?;
            println!("Wrote {} points to {}", arrays.len(), output.display());
        }
    }

    Ok(())
}
