use clap::Parser;
use ridgeprint::enhance::{EnhanceConfig, PreprocessConfig};
use ridgeprint::image::io::{load_color_image, load_gray_image, save_gray_image};
use ridgeprint::template::ExtractConfig;
use ridgeprint::{
    check_liveness, extract_template, process_fingerprint, FingerprintTemplate, MatchConfig,
    Matcher, PipelineConfig, TemplateFormat, DEFAULT_PYRAMID_SCALES, VERSION,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "Ridgeprint CLI (JSON config driven)")]
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
    /// Enable tracing output for stage timings and quality signals.
    #[arg(long)]
    trace: bool,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum FormatConfig {
    #[default]
    Proprietary,
    Iso,
}

impl From<FormatConfig> for TemplateFormat {
    fn from(value: FormatConfig) -> Self {
        match value {
            FormatConfig::Proprietary => TemplateFormat::Proprietary,
            FormatConfig::Iso => TemplateFormat::Iso,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct PipelineConfigJson {
    sigma1: f32,
    sigma2: f32,
    orientations: usize,
    period_min: f32,
    period_max: f32,
    min_coherence: f32,
    energy_fraction: f32,
    mask_erosion: usize,
    mask_margin: usize,
    min_minutiae: usize,
    min_minutia_distance: f32,
    parallel: bool,
}

impl Default for PipelineConfigJson {
    fn default() -> Self {
        let pre = PreprocessConfig::default();
        let enh = EnhanceConfig::default();
        let ext = ExtractConfig::default();
        Self {
            sigma1: pre.sigma1,
            sigma2: pre.sigma2,
            orientations: enh.orientations,
            period_min: enh.period_range.0,
            period_max: enh.period_range.1,
            min_coherence: enh.min_coherence,
            energy_fraction: enh.energy_fraction,
            mask_erosion: enh.mask_erosion,
            mask_margin: enh.mask_margin,
            min_minutiae: ext.min_minutiae,
            min_minutia_distance: ext.min_minutia_distance,
            parallel: enh.parallel,
        }
    }
}

impl PipelineConfigJson {
    fn to_config(&self) -> PipelineConfig {
        PipelineConfig {
            preprocess: PreprocessConfig {
                sigma1: self.sigma1,
                sigma2: self.sigma2,
            },
            enhance: EnhanceConfig {
                orientations: self.orientations,
                period_range: (self.period_min, self.period_max),
                min_coherence: self.min_coherence,
                energy_fraction: self.energy_fraction,
                mask_erosion: self.mask_erosion,
                mask_margin: self.mask_margin,
                parallel: self.parallel,
                ..EnhanceConfig::default()
            },
            extract: ExtractConfig {
                min_minutiae: self.min_minutiae,
                min_minutia_distance: self.min_minutia_distance,
                ..ExtractConfig::default()
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct MatchConfigJson {
    distance_tolerance: f32,
    angle_tolerance_deg: f32,
    neighbors: usize,
    max_hypotheses: usize,
    refine_iterations: usize,
    flow_weight: f32,
    parallel: bool,
}

impl Default for MatchConfigJson {
    fn default() -> Self {
        let cfg = MatchConfig::default();
        Self {
            distance_tolerance: cfg.distance_tolerance,
            angle_tolerance_deg: cfg.angle_tolerance.to_degrees(),
            neighbors: cfg.neighbors,
            max_hypotheses: cfg.max_hypotheses,
            refine_iterations: cfg.refine_iterations,
            flow_weight: cfg.flow_weight,
            parallel: cfg.parallel,
        }
    }
}

impl From<&MatchConfigJson> for MatchConfig {
    fn from(value: &MatchConfigJson) -> Self {
        MatchConfig {
            distance_tolerance: value.distance_tolerance,
            angle_tolerance: value.angle_tolerance_deg.to_radians(),
            neighbors: value.neighbors,
            max_hypotheses: value.max_hypotheses,
            refine_iterations: value.refine_iterations,
            flow_weight: value.flow_weight,
            parallel: value.parallel,
        }
    }
}

/// A gallery entry is an image unless `format` names an encoded template.
#[derive(Debug, Deserialize)]
struct GalleryEntry {
    path: String,
    #[serde(default)]
    format: Option<FormatConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    probe_path: String,
    gallery: Vec<GalleryEntry>,
    scales: Vec<f64>,
    template_format: FormatConfig,
    template_output: Option<String>,
    liveness_model: Option<String>,
    debug_image_dir: Option<String>,
    output_path: Option<String>,
    pipeline: PipelineConfigJson,
    #[serde(rename = "match")]
    match_cfg: MatchConfigJson,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            probe_path: String::new(),
            gallery: Vec::new(),
            scales: DEFAULT_PYRAMID_SCALES.to_vec(),
            template_format: FormatConfig::default(),
            template_output: None,
            liveness_model: None,
            debug_image_dir: None,
            output_path: None,
            pipeline: PipelineConfigJson::default(),
            match_cfg: MatchConfigJson::default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CaptureRecord {
    quality: f64,
    good_quality: bool,
    minutiae: usize,
    mask_coverage: f64,
}

#[derive(Debug, Serialize)]
struct LivenessRecord {
    real: f32,
    fake: f32,
}

#[derive(Debug, Serialize)]
struct BestRecord {
    index: usize,
    path: String,
    score: f32,
}

#[derive(Debug, Serialize)]
struct Output {
    version: &'static str,
    capture: CaptureRecord,
    liveness: Option<LivenessRecord>,
    best: Option<BestRecord>,
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn load_gallery(
    entries: &[GalleryEntry],
    pipeline: &PipelineConfig,
) -> CliResult<Vec<FingerprintTemplate>> {
    entries
        .iter()
        .map(|entry| -> CliResult<FingerprintTemplate> {
            match entry.format {
                Some(format) => {
                    let bytes = fs::read(&entry.path)?;
                    Ok(FingerprintTemplate::decode(&bytes, format.into())?)
                }
                None => {
                    let image = load_gray_image(&entry.path)?;
                    Ok(extract_template(image.view(), TemplateFormat::Proprietary, pipeline)?)
                }
            }
        })
        .collect()
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();

    if cli.trace {
        let filter = EnvFilter::from_default_env().add_directive("ridgeprint=info".parse()?);
        tracing_subscriber::fmt()
            .with_env_filter(filter)
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
    if config.probe_path.is_empty() {
        return Err("probe_path must be set in the config".into());
    }
    if !config.gallery.is_empty() && config.scales.is_empty() {
        return Err("scales must not be empty when a gallery is given".into());
    }

    let pipeline = config.pipeline.to_config();
    let matcher = Matcher::with_pipeline((&config.match_cfg).into(), pipeline.clone())?;

    let probe = load_gray_image(&config.probe_path)?;
    let processed = process_fingerprint(probe.view(), &pipeline)?;
    let metrics = processed.metrics;

    if let Some(dir) = &config.debug_image_dir {
        let dir = Path::new(dir);
        fs::create_dir_all(dir)?;
        save_gray_image(&processed.preprocessed, dir.join("preprocessed.png"))?;
        save_gray_image(&processed.enhanced, dir.join("enhanced.png"))?;
        save_gray_image(&processed.binarized, dir.join("binarized.png"))?;
    }

    if let Some(path) = &config.template_output {
        let template = match TemplateFormat::from(config.template_format) {
            TemplateFormat::Proprietary => &processed.template,
            TemplateFormat::Iso => &processed.iso_template,
        };
        fs::write(path, template.to_bytes())?;
    }

    let liveness = match &config.liveness_model {
        Some(model) => {
            let color = load_color_image(&config.probe_path)?;
            let [real, fake] = check_liveness(&color, model)?;
            Some(LivenessRecord { real, fake })
        }
        None => None,
    };

    let best = if config.gallery.is_empty() {
        None
    } else {
        let gallery = load_gallery(&config.gallery, &pipeline)?;
        let result = matcher.pyramid_identify(&gallery, probe.view(), &config.scales)?;
        Some(BestRecord {
            index: result.index,
            path: config.gallery[result.index].path.clone(),
            score: result.score,
        })
    };

    let output = Output {
        version: VERSION,
        capture: CaptureRecord {
            quality: metrics.quality,
            good_quality: metrics.is_good_quality(),
            minutiae: metrics.minutiae_count,
            mask_coverage: metrics.mask_coverage,
        },
        liveness,
        best,
    };
    let json = serde_json::to_string_pretty(&output)?;

    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
