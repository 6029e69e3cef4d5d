use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use rusty_lightcurve::data::chrono::SECONDS_PER_DAY;
use rusty_lightcurve::data::loader::write_raw_table;
use rusty_lightcurve::data::model::{ObservationRecord, RawRow, RawTable};

#[derive(Parser, Debug)]
#[command(author, version, about = "Write a synthetic night of photometry for demos")]
struct Args {
    /// Output directory for target.txt and alt_*.txt
    #[arg(long, default_value = "sample_night")]
    output: PathBuf,

    /// Number of exposures per source
    #[arg(long, default_value_t = 600)]
    exposures: usize,

    /// Number of alternate (reference) sources
    #[arg(long, default_value_t = 2)]
    alternates: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Transparency shared by every source on a frame: slow cloud drift plus
/// one thicker passing cloud.
fn weather(t: f64) -> f64 {
    let drift = 0.9 + 0.08 * (t / 900.0).sin();
    let cloud = 0.3 * (-((t - 600.0) / 60.0).powi(2)).exp();
    drift - cloud
}

struct Source {
    x: f64,
    y: f64,
    flux: f64,
    /// Intrinsic variability (amplitude, period in s); zero for references.
    pulse: (f64, f64),
}

fn observe(src: &Source, t: f64, clock: f64, rng: &mut SimpleRng) -> ObservationRecord {
    let intrinsic = 1.0 + src.pulse.0 * (2.0 * std::f64::consts::PI * t / src.pulse.1).sin();
    let flux = src.flux * intrinsic * weather(t) + rng.gauss(0.0, src.flux.sqrt());
    let flux_error = flux.abs().sqrt();
    let magnitude = 25.0 - 2.5 * flux.abs().max(1.0).log10();
    ObservationRecord {
        stack_size: 4.0,
        exposure_mean: 500.0,
        exposure_stdev: rng.gauss(0.0, 0.2).abs(),
        time: clock,
        time_stdev: 0.01,
        centroid_x: src.x + rng.gauss(0.0, 0.3),
        centroid_y: src.y + rng.gauss(0.0, 0.3),
        pixel_area: 28.0,
        flux,
        flux_error,
        magnitude,
        magnitude_error: 1.0857 * flux_error / flux.abs().max(1.0),
        filter: "V".to_string(),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut rng = SimpleRng::new(args.seed);

    let mut sources = vec![Source {
        x: 512.0,
        y: 512.0,
        flux: 20_000.0,
        pulse: (0.05, 240.0),
    }];
    for i in 0..args.alternates {
        sources.push(Source {
            x: 300.0 + 150.0 * i as f64,
            y: 700.0 - 90.0 * i as f64,
            flux: 35_000.0 + 5_000.0 * i as f64,
            pulse: (0.0, 1.0),
        });
    }

    // Start shortly before midnight so the clock wraps mid-run.
    let start = SECONDS_PER_DAY - 300.0;
    let cadence = 2.0;

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;

    for (idx, src) in sources.iter().enumerate() {
        let mut rows = Vec::with_capacity(args.exposures);
        for n in 0..args.exposures {
            let t = n as f64 * cadence + rng.gauss(0.0, 0.05);
            let clock = (start + t).rem_euclid(SECONDS_PER_DAY);
            let line = n + 1;

            // Sprinkle in what the extraction pipeline really produces.
            let roll = rng.next_f64();
            let fields = if roll < 0.01 {
                vec!["4".into(), "500".into(), "0".into(), clock.to_string(), "NO SOURCE".into()]
            } else if roll < 0.015 {
                vec!["4".into(), "500".into(), clock.to_string()]
            } else {
                observe(src, t, clock, &mut rng).to_fields()
            };
            rows.push(RawRow::new(line, fields));
        }

        let name = if idx == 0 {
            "target.txt".to_string()
        } else {
            format!("alt_{idx}.txt")
        };
        let path = args.output.join(&name);
        write_raw_table(&path, &RawTable::from_rows(rows))
            .with_context(|| format!("writing {}", path.display()))?;
    }

    println!(
        "Wrote {} sources ({} exposures each) to {}",
        sources.len(),
        args.exposures,
        args.output.display()
    );
    Ok(())
}
