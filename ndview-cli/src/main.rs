use clap::Parser;
use ndview::convert::real_to_f32;
use ndview::fft::{forward, power_spectrum, FftConfig, FftConvolution};
use ndview::io::{load, save};
use ndview::ops::{self, GaussConfig};
use ndview::{
    materialize_par, AffineTransform, Boundary, Buffer, Interpolation, Layout, NdViewError,
    NdViewResult, RealPixel, RealViewExt, ThinPlateSpline, View, ViewExt,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "ndview CLI (JSON config driven image pipeline)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for performance profiling.
    #[arg(long)]
    trace: bool,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum BoundaryConfig {
    Zero,
    Mirror,
    Reflect,
    Periodic,
    Value(f64),
}

impl From<BoundaryConfig> for Boundary<f64> {
    fn from(value: BoundaryConfig) -> Self {
        match value {
            BoundaryConfig::Zero => Boundary::Zero,
            BoundaryConfig::Mirror => Boundary::Mirror,
            BoundaryConfig::Reflect => Boundary::Reflect,
            BoundaryConfig::Periodic => Boundary::Periodic,
            BoundaryConfig::Value(v) => Boundary::Value(v),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum InterpolationConfig {
    NearestNeighbor,
    Linear,
    Lanczos,
}

impl From<InterpolationConfig> for Interpolation {
    fn from(value: InterpolationConfig) -> Self {
        match value {
            InterpolationConfig::NearestNeighbor => Interpolation::NearestNeighbor,
            InterpolationConfig::Linear => Interpolation::NLinear,
            InterpolationConfig::Lanczos => Interpolation::lanczos(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum KernelConfig {
    /// Square (cube) box of the given edge length.
    Box { size: usize },
    /// Kernel read from a grey image.
    Image { path: String },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Step {
    Threshold { value: f32 },
    GradientMagnitude,
    MeanFilter,
    Gauss { sigma: f64 },
    DifferenceOfGaussian { sigma1: f64, sigma2: f64 },
    Convolve { kernel: KernelConfig },
    Deconvolve { kernel: KernelConfig },
    Rotate {
        angle_deg: f64,
        #[serde(default = "default_interpolation")]
        interpolation: InterpolationConfig,
    },
    /// Thin-plate spline warp; the output at `source[i]` shows the input at
    /// `target[i]`.
    Warp {
        source: Vec<Vec<f64>>,
        target: Vec<Vec<f64>>,
        #[serde(default = "default_interpolation")]
        interpolation: InterpolationConfig,
    },
    PowerSpectrum,
}

fn default_interpolation() -> InterpolationConfig {
    InterpolationConfig::Linear
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct FftConfigJson {
    boundary: BoundaryConfig,
    threads: usize,
}

impl Default for FftConfigJson {
    fn default() -> Self {
        Self {
            boundary: BoundaryConfig::Mirror,
            threads: FftConfig::default().threads,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    input_path: String,
    output_path: Option<String>,
    boundary: BoundaryConfig,
    fft: FftConfigJson,
    steps: Vec<Step>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: String::new(),
            output_path: None,
            boundary: BoundaryConfig::Mirror,
            fft: FftConfigJson::default(),
            steps: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Summary {
    dims: Vec<usize>,
    min: f64,
    max: f64,
    mean: f64,
    steps: usize,
}

/// Materializes any real view over its bounds as `f32`.
fn to_f32<V>(view: V) -> NdViewResult<Buffer<f32>>
where
    V: View + Sync,
    V::Item: RealPixel,
{
    let converted = real_to_f32(view);
    let bounds = converted
        .bounds()
        .cloned()
        .ok_or(NdViewError::InvalidInput("pipeline step produced an unbounded view"))?;
    materialize_par(&converted, &bounds, Layout::Array)
}

fn load_kernel(kernel: &KernelConfig, num_dims: usize) -> NdViewResult<Buffer<f32>> {
    match kernel {
        KernelConfig::Box { size } => {
            let dims = vec![*size; num_dims];
            Buffer::from_vec(vec![1.0; dims.iter().product()], &dims)
        }
        KernelConfig::Image { path } => load::<f32, _>(path),
    }
}

fn apply(step: &Step, image: Buffer<f32>, config: &Config) -> NdViewResult<Buffer<f32>> {
    let fft_config = FftConfig {
        boundary: config.fft.boundary.into(),
        threads: config.fft.threads,
    };
    let gauss_config = GaussConfig {
        boundary: config.boundary.into(),
        ..GaussConfig::default()
    };
    let n = Buffer::interval(&image).num_dims();
    match step {
        Step::Threshold { value } => {
            let mask = ops::threshold(&image, *value).convert(|b| if b { 255.0f32 } else { 0.0 });
            to_f32(mask)
        }
        Step::GradientMagnitude => to_f32(ops::gradient_magnitude(&image)?),
        Step::MeanFilter => to_f32(ops::mean_filter3(&image)?),
        Step::Gauss { sigma } => to_f32(ops::gauss(&image, &vec![*sigma; n], &gauss_config)?),
        Step::DifferenceOfGaussian { sigma1, sigma2 } => to_f32(ops::difference_of_gaussian(
            &image,
            &vec![*sigma1; n],
            &vec![*sigma2; n],
            &gauss_config,
        )?),
        Step::Convolve { kernel } | Step::Deconvolve { kernel } => {
            let kernel = load_kernel(kernel, n)?;
            FftConvolution::new(&image, &kernel)
                .with_config(fft_config)
                .deconvolve(matches!(step, Step::Deconvolve { .. }))
                .convolve()
        }
        Step::Rotate {
            angle_deg,
            interpolation,
        } => {
            let bounds = Buffer::interval(&image).clone();
            let center: Vec<f64> = bounds
                .min_slice()
                .iter()
                .zip(bounds.max_slice())
                .map(|(lo, hi)| (lo + hi) as f64 / 2.0)
                .collect();
            let neg: Vec<f64> = center.iter().map(|c| -c).collect();
            let transform = AffineTransform::translation(&neg)
                .then(&AffineTransform::rotation_2d(angle_deg.to_radians()))?
                .then(&AffineTransform::translation(&center))?;
            let rotated = (&image)
                .extend(Boundary::Zero)?
                .interpolate((*interpolation).into())
                .affine(transform)?
                .raster()
                .interval(bounds)?;
            to_f32(rotated)
        }
        Step::Warp {
            source,
            target,
            interpolation,
        } => {
            let tps = ThinPlateSpline::new(source, target)?;
            let warped = (&image)
                .extend(Boundary::Zero)?
                .interpolate((*interpolation).into())
                .transform(tps)?
                .raster()
                .interval(Buffer::interval(&image).clone())?;
            to_f32(warped)
        }
        Step::PowerSpectrum => {
            let spectrum = forward(&image, &fft_config)?;
            to_f32(power_spectrum(&spectrum))
        }
    }
}

fn summarize(image: &Buffer<f32>, steps: usize) -> Summary {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    for &v in image.values() {
        let v = v as f64;
        min = min.min(v);
        max = max.max(v);
        sum += v;
    }
    Summary {
        dims: image.dims(),
        min,
        max,
        mean: sum / image.len() as f64,
        steps,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("ndview=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.input_path.is_empty() {
        return Err("input_path must be set in the config".into());
    }

    let mut image: Buffer<f32> = load(&config.input_path)?;
    for step in &config.steps {
        tracing::info!(?step, "applying step");
        image = apply(step, image, &config)?;
    }

    if let Some(path) = &config.output_path {
        save(&image, path)?;
    }
    let summary = summarize(&image, config.steps.len());
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
