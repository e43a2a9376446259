//! End-to-end processing of one grayscale fingerprint capture.

use crate::enhance::{
    binarize, enhance_fingerprint_with_config, preprocess_fingerprint, EnhanceConfig,
    PreprocessConfig, QUALITY_THRESHOLD,
};
use crate::image::{ImageView, Mask, OwnedImage};
use crate::template::{
    generate_fingerprint_template_with_config, ExtractConfig, FingerprintTemplate, TemplateFormat,
};
use crate::trace::{trace_event, trace_span};
use crate::util::RidgeResult;

/// Parameters for every stage of [`process_fingerprint`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PipelineConfig {
    /// Illumination normalization.
    pub preprocess: PreprocessConfig,
    /// Ridge enhancement and energy mask.
    pub enhance: EnhanceConfig,
    /// Minutia detection.
    pub extract: ExtractConfig,
}

/// Soft quality signals of a capture; none of them is an error.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CaptureMetrics {
    /// Preprocessing quality in [0, 100].
    pub quality: f64,
    /// Minutiae in the proprietary template.
    pub minutiae_count: usize,
    /// Fraction of the image covered by the energy mask.
    pub mask_coverage: f64,
}

impl CaptureMetrics {
    /// True when the quality reaches the recapture threshold.
    pub fn is_good_quality(&self) -> bool {
        self.quality >= QUALITY_THRESHOLD
    }
}

/// Every intermediate product of one capture.
#[derive(Clone, Debug)]
pub struct ProcessedFingerprint {
    /// Illumination-normalized image.
    pub preprocessed: OwnedImage,
    /// Ridge-enhanced image.
    pub enhanced: OwnedImage,
    /// Enhanced image split into ridges (0) and valleys (255).
    pub binarized: OwnedImage,
    /// Reliability mask used for extraction.
    pub energy_mask: Mask,
    /// Native template.
    pub template: FingerprintTemplate,
    /// ISO 19794-2 template from the same detection pass.
    pub iso_template: FingerprintTemplate,
    /// Quality signals for the caller's recapture policy.
    pub metrics: CaptureMetrics,
}

/// Runs preprocess, enhance, and extract on `gray`.
pub fn process_fingerprint(
    gray: ImageView<'_, u8>,
    cfg: &PipelineConfig,
) -> RidgeResult<ProcessedFingerprint> {
    let _span =
        trace_span!("process_fingerprint", width = gray.width(), height = gray.height()).entered();
    let pre = preprocess_fingerprint(gray, cfg.preprocess.sigma1, cfg.preprocess.sigma2)?;
    let enhanced = enhance_fingerprint_with_config(pre.image.view(), &cfg.enhance)?;
    let template = generate_fingerprint_template_with_config(
        enhanced.image.view(),
        &enhanced.energy_mask,
        &cfg.extract,
    )?;
    let iso_template = template.to_format(TemplateFormat::Iso)?;
    let metrics = CaptureMetrics {
        quality: pre.quality,
        minutiae_count: template.minutiae().len(),
        mask_coverage: enhanced.energy_mask.coverage(),
    };
    trace_event!(
        "capture_metrics",
        quality = metrics.quality,
        minutiae = metrics.minutiae_count,
        coverage = metrics.mask_coverage
    );

    Ok(ProcessedFingerprint {
        preprocessed: pre.image,
        binarized: binarize(enhanced.image.view()),
        enhanced: enhanced.image,
        energy_mask: enhanced.energy_mask,
        template,
        iso_template,
        metrics,
    })
}

/// Template of `gray` in `format`, skipping the intermediate outputs.
pub fn extract_template(
    gray: ImageView<'_, u8>,
    format: TemplateFormat,
    cfg: &PipelineConfig,
) -> RidgeResult<FingerprintTemplate> {
    let pre = preprocess_fingerprint(gray, cfg.preprocess.sigma1, cfg.preprocess.sigma2)?;
    let enhanced = enhance_fingerprint_with_config(pre.image.view(), &cfg.enhance)?;
    let template = generate_fingerprint_template_with_config(
        enhanced.image.view(),
        &enhanced.energy_mask,
        &cfg.extract,
    )?;
    template.to_format(format)
}
