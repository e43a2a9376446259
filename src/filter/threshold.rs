//! Global thresholding.

use crate::image::ImageView;

/// 256-bin histogram of an 8-bit view.
pub fn histogram(view: ImageView<'_, u8>) -> [u64; 256] {
    let mut hist = [0u64; 256];
    for row in view.rows() {
        for &v in row {
            hist[v as usize] += 1;
        }
    }
    hist
}

/// Otsu threshold: pixels `> t` form the foreground class.
///
/// Returns `None` when the histogram has a single populated bin.
pub fn otsu_threshold(hist: &[u64; 256]) -> Option<u8> {
    let total: u64 = hist.iter().sum();
    if total == 0 {
        return None;
    }
    let sum_all: f64 = hist
        .iter()
        .enumerate()
        .map(|(v, &c)| v as f64 * c as f64)
        .sum();

    let mut weight_bg = 0u64;
    let mut sum_bg = 0.0f64;
    let mut best: Option<(u8, f64)> = None;
    for t in 0..255usize {
        weight_bg += hist[t];
        sum_bg += t as f64 * hist[t] as f64;
        if weight_bg == 0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg == 0 {
            break;
        }
        let mean_bg = sum_bg / weight_bg as f64;
        let mean_fg = (sum_all - sum_bg) / weight_fg as f64;
        let between = weight_bg as f64 * weight_fg as f64 * (mean_bg - mean_fg).powi(2);
        if best.map_or(true, |(_, b)| between > b) {
            best = Some((t as u8, between));
        }
    }
    best.map(|(t, _)| t)
}
