//! 1:1 verification and 1:N identification of minutiae templates.
//!
//! Scoring pairs minutiae under rigid alignment hypotheses seeded by local
//! descriptor similarity. With `n` and `m` minutiae and pair values `v`,
//! the score is `(sum v)^2 / (n * m)`, scaled by ridge flow agreement when
//! both templates carry ridge flow. Arguments are put in a canonical order
//! first, so `verify(a, b) == verify(b, a)` exactly.

mod align;
mod best;
mod descriptor;

pub use best::MatchResult;

use crate::image::pyramid::ScalePyramid;
use crate::image::ImageView;
use crate::matching::align::{flow_agreement, refine, total, Rigid};
use crate::matching::best::best_of;
#[cfg(feature = "rayon")]
use crate::matching::best::better;
use crate::matching::descriptor::{describe, SimilarityMatrix, Tolerance};
use crate::pipeline::{extract_template, PipelineConfig};
use crate::template::{FingerprintTemplate, Minutia, MinutiaKind, TemplateFormat};
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::{RidgeError, RidgeResult};
use std::cmp::Ordering;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Probe scale factors used when none are given.
pub const DEFAULT_PYRAMID_SCALES: [f64; 3] = [0.9, 1.0, 1.1];

/// Matching parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchConfig {
    /// Maximum distance in pixels between paired minutiae.
    pub distance_tolerance: f32,
    /// Maximum direction difference in radians between paired minutiae.
    pub angle_tolerance: f32,
    /// Neighbours per local descriptor.
    pub neighbors: usize,
    /// Alignment hypotheses tried per comparison.
    pub max_hypotheses: usize,
    /// Least-squares refinements per hypothesis.
    pub refine_iterations: usize,
    /// Weight of ridge flow disagreement; the score is multiplied by
    /// `1 - weight * (1 - agreement)`.
    pub flow_weight: f32,
    /// Score gallery entries in parallel when the `rayon` feature is enabled.
    pub parallel: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            distance_tolerance: 12.0,
            angle_tolerance: 20f32.to_radians(),
            neighbors: 4,
            max_hypotheses: 24,
            refine_iterations: 2,
            flow_weight: 0.25,
            parallel: true,
        }
    }
}

impl MatchConfig {
    fn validate(&self) -> RidgeResult<()> {
        let positive = |v: f32| v.is_finite() && v > 0.0;
        if !positive(self.distance_tolerance) || !positive(self.angle_tolerance) {
            return Err(RidgeError::InvalidParameter {
                name: "tolerance",
                reason: "distance and angle tolerances must be finite and > 0",
            });
        }
        if self.max_hypotheses == 0 {
            return Err(RidgeError::InvalidParameter {
                name: "max_hypotheses",
                reason: "must be >= 1",
            });
        }
        if !(0.0..=1.0).contains(&self.flow_weight) {
            return Err(RidgeError::InvalidParameter {
                name: "flow_weight",
                reason: "must be in [0, 1]",
            });
        }
        Ok(())
    }

    fn tolerance(&self) -> Tolerance {
        Tolerance {
            distance: self.distance_tolerance,
            angle: self.angle_tolerance,
        }
    }
}

/// Template matcher holding matching and probe-extraction parameters.
#[derive(Clone, Debug, Default)]
pub struct Matcher {
    cfg: MatchConfig,
    pipeline: PipelineConfig,
}

impl Matcher {
    /// Creates a matcher; probe images are processed with default settings.
    pub fn new(cfg: MatchConfig) -> RidgeResult<Self> {
        Self::with_pipeline(cfg, PipelineConfig::default())
    }

    /// Creates a matcher with explicit probe-extraction settings.
    pub fn with_pipeline(cfg: MatchConfig, pipeline: PipelineConfig) -> RidgeResult<Self> {
        cfg.validate()?;
        Ok(Self { cfg, pipeline })
    }

    /// Matching parameters.
    pub fn config(&self) -> &MatchConfig {
        &self.cfg
    }

    /// Probe-extraction parameters.
    pub fn pipeline(&self) -> &PipelineConfig {
        &self.pipeline
    }

    /// Similarity of two templates in [0, 1].
    pub fn verify(&self, reference: &FingerprintTemplate, probe: &FingerprintTemplate) -> f32 {
        let (a, b) = match canonical_cmp(reference, probe) {
            Ordering::Greater => (probe, reference),
            _ => (reference, probe),
        };
        score_pair(a, b, &self.cfg)
    }

    /// Best match of `probe` in `gallery`; ties go to the lowest index.
    pub fn identify(
        &self,
        gallery: &[FingerprintTemplate],
        probe: &FingerprintTemplate,
    ) -> RidgeResult<MatchResult> {
        let _span = trace_span!("identify", gallery = gallery.len()).entered();
        let best = self
            .reduce(gallery.len(), |i| self.verify(&gallery[i], probe))
            .ok_or_else(|| RidgeError::malformed("gallery is empty"))?;
        trace_event!("identify_best", score = best.score, index = best.index);
        Ok(best)
    }

    /// Highest similarity between `reference` and `probe` rescaled by each
    /// factor in `scales`.
    pub fn pyramid_verify(
        &self,
        reference: &FingerprintTemplate,
        probe: ImageView<'_, u8>,
        scales: &[f64],
    ) -> RidgeResult<f32> {
        let levels = self.level_templates(probe, scales)?;
        Ok(self.best_over_scales(reference, &levels))
    }

    /// [`Matcher::identify`] with [`Matcher::pyramid_verify`] per entry.
    pub fn pyramid_identify(
        &self,
        gallery: &[FingerprintTemplate],
        probe: ImageView<'_, u8>,
        scales: &[f64],
    ) -> RidgeResult<MatchResult> {
        if gallery.is_empty() {
            return Err(RidgeError::malformed("gallery is empty"));
        }
        let _span = trace_span!(
            "pyramid_identify",
            gallery = gallery.len(),
            scales = scales.len(),
        )
        .entered();
        let levels = self.level_templates(probe, scales)?;
        let best = self
            .reduce(gallery.len(), |i| self.best_over_scales(&gallery[i], &levels))
            .ok_or_else(|| RidgeError::malformed("gallery is empty"))?;
        trace_event!("identify_best", score = best.score, index = best.index);
        Ok(best)
    }

    fn reduce(&self, len: usize, score: impl Fn(usize) -> f32 + Sync) -> Option<MatchResult> {
        #[cfg(feature = "rayon")]
        {
            if self.cfg.parallel {
                return (0..len)
                    .into_par_iter()
                    .map(|index| MatchResult {
                        score: score(index),
                        index,
                    })
                    .reduce_with(better);
            }
        }
        best_of((0..len).map(score))
    }

    fn best_over_scales(&self, reference: &FingerprintTemplate, levels: &[ScaledTemplates]) -> f32 {
        levels
            .iter()
            .map(|t| match reference.format() {
                TemplateFormat::Proprietary => self.verify(reference, &t.native),
                TemplateFormat::Iso => self.verify(reference, &t.iso),
            })
            .fold(0.0f32, f32::max)
    }

    /// Templates of `probe` at every scale; failing scales are skipped.
    fn level_templates(
        &self,
        probe: ImageView<'_, u8>,
        scales: &[f64],
    ) -> RidgeResult<Vec<ScaledTemplates>> {
        let pyramid = ScalePyramid::build(probe, scales)?;
        let mut first_err = None;
        for (scale, err) in pyramid.skipped() {
            trace_warn!("pyramid_scale_skipped", scale = *scale);
            first_err.get_or_insert_with(|| err.clone());
        }
        let mut extracted = Vec::with_capacity(pyramid.levels().len());
        for level in pyramid.levels() {
            match self.templates_at(level.image.view()) {
                Ok(t) => extracted.push(t),
                Err(err) => {
                    trace_warn!("pyramid_scale_skipped", scale = level.scale);
                    first_err.get_or_insert(err);
                }
            }
        }
        match (extracted.is_empty(), first_err) {
            (true, Some(err)) => Err(err),
            _ => Ok(extracted),
        }
    }

    fn templates_at(&self, view: ImageView<'_, u8>) -> RidgeResult<ScaledTemplates> {
        let native = extract_template(view, TemplateFormat::Proprietary, &self.pipeline)?;
        let iso = native.to_format(TemplateFormat::Iso)?;
        Ok(ScaledTemplates { native, iso })
    }
}

/// Native and ISO templates extracted at one pyramid scale.
struct ScaledTemplates {
    native: FingerprintTemplate,
    iso: FingerprintTemplate,
}

/// Total order on template contents used to fix argument order.
fn canonical_cmp(a: &FingerprintTemplate, b: &FingerprintTemplate) -> Ordering {
    fn key(m: &Minutia) -> (u16, u16, u32, u8, u8) {
        let kind = match m.kind {
            MinutiaKind::Ending => 0,
            MinutiaKind::Bifurcation => 1,
            MinutiaKind::Other => 2,
        };
        (m.x, m.y, m.angle.to_bits(), kind, m.quality)
    }
    let flow = |t: &FingerprintTemplate| {
        t.ridge_flow()
            .map(|f| (f.block(), f.cols(), f.rows(), f.cells().to_vec()))
    };
    (a.minutiae().len(), a.width(), a.height())
        .cmp(&(b.minutiae().len(), b.width(), b.height()))
        .then_with(|| a.minutiae().iter().map(key).cmp(b.minutiae().iter().map(key)))
        .then_with(|| flow(a).cmp(&flow(b)))
}

/// Scores `probe` against `reference` without reordering.
fn score_pair(
    reference: &FingerprintTemplate,
    probe: &FingerprintTemplate,
    cfg: &MatchConfig,
) -> f32 {
    let a = reference.minutiae();
    let b = probe.minutiae();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let tol = cfg.tolerance();
    let sim = SimilarityMatrix::new(&describe(a, cfg.neighbors), &describe(b, cfg.neighbors), tol);

    let mut best_total = 0.0f32;
    let mut best_t = None;
    for (i, j) in sim.top_pairs(cfg.max_hypotheses) {
        let seed = Rigid::from_pair(&a[i], &b[j]);
        let (t, pairs) = refine(a, b, &sim, seed, tol, cfg.refine_iterations);
        let value = total(&pairs);
        if value > best_total {
            best_total = value;
            best_t = Some(t);
        }
    }
    let Some(t) = best_t else {
        return 0.0;
    };

    let mut score = best_total * best_total / (a.len() * b.len()) as f32;
    if let (Some(fa), Some(fb)) = (reference.ridge_flow(), probe.ridge_flow()) {
        if let Some(agreement) = flow_agreement(fa, fb, &t) {
            score *= 1.0 - cfg.flow_weight * (1.0 - agreement);
        }
    }
    score.clamp(0.0, 1.0)
}

/// Similarity of two templates with default parameters.
pub fn verify(reference: &FingerprintTemplate, probe: &FingerprintTemplate) -> f32 {
    Matcher::default().verify(reference, probe)
}

/// Best match of `probe` in `gallery` with default parameters.
pub fn identify(
    gallery: &[FingerprintTemplate],
    probe: &FingerprintTemplate,
) -> RidgeResult<MatchResult> {
    Matcher::default().identify(gallery, probe)
}

/// Multi-scale verification of a probe image with default parameters.
pub fn pyramid_verify(
    reference: &FingerprintTemplate,
    probe: ImageView<'_, u8>,
    scales: &[f64],
) -> RidgeResult<f32> {
    Matcher::default().pyramid_verify(reference, probe, scales)
}

/// Multi-scale identification of a probe image with default parameters.
pub fn pyramid_identify(
    gallery: &[FingerprintTemplate],
    probe: ImageView<'_, u8>,
    scales: &[f64],
) -> RidgeResult<MatchResult> {
    Matcher::default().pyramid_identify(gallery, probe, scales)
}

/// Decodes two templates in their stated formats and verifies them.
pub fn verify_encoded(
    reference: &[u8],
    reference_format: TemplateFormat,
    probe: &[u8],
    probe_format: TemplateFormat,
) -> RidgeResult<f32> {
    let reference = FingerprintTemplate::decode(reference, reference_format)?;
    let probe = FingerprintTemplate::decode(probe, probe_format)?;
    Ok(verify(&reference, &probe))
}
