//! Dense liveness network evaluated with candle.
//!
//! A model file is a safetensors archive with `normalize.mean` and
//! `normalize.std` (one value per RGB channel) and fully connected layers
//! `layers.{i}.weight` (`out x in`) plus `layers.{i}.bias`. Hidden layers
//! use ReLU and the last layer emits the `[real, fake]` logits. The input
//! width of the first layer fixes the square crop: `in = side * side * 3`.

use crate::image::ColorImage;
use crate::util::{RidgeError, RidgeResult};
use candle_core::{DType, Device, Tensor};
use candle_nn::{Linear, Module, VarBuilder};
use std::collections::HashMap;
use std::path::Path;

/// Smallest colour image accepted for inference.
pub const MIN_INPUT_SIDE: usize = 8;
const OUTPUTS: usize = 2;
const CHANNELS: usize = ColorImage::CHANNELS;

/// Two-class liveness classifier over a normalized square crop.
///
/// The input vector is the crop in row-major, channel-interleaved (RGB)
/// order, each value mapped to `(v / 255 - mean[c]) / std[c]`.
#[derive(Clone, Debug)]
pub struct LivenessModel {
    input_size: usize,
    mean: [f32; CHANNELS],
    std: [f32; CHANNELS],
    layers: Vec<Linear>,
    device: Device,
}

fn load_error(origin: &str, reason: impl ToString) -> RidgeError {
    RidgeError::ModelLoad {
        path: origin.to_string(),
        reason: reason.to_string(),
    }
}

/// Side of the square crop whose RGB pixels fill `width` inputs.
fn input_side(width: usize) -> Option<usize> {
    if width == 0 || width % CHANNELS != 0 {
        return None;
    }
    let pixels = width / CHANNELS;
    let side = (pixels as f64).sqrt().round() as usize;
    (side.checked_mul(side)? == pixels).then_some(side)
}

fn channel_stats(tensors: &HashMap<String, Tensor>, name: &str) -> Result<[f32; CHANNELS], String> {
    let tensor = tensors
        .get(name)
        .ok_or_else(|| format!("missing tensor {name}"))?;
    let values = tensor
        .to_dtype(DType::F32)
        .and_then(|t| t.flatten_all())
        .and_then(|t| t.to_vec1::<f32>())
        .map_err(|e| format!("{name}: {e}"))?;
    let values: [f32; CHANNELS] = values
        .try_into()
        .map_err(|v: Vec<f32>| format!("{name} needs {CHANNELS} values, got {}", v.len()))?;
    if values.iter().any(|v| !v.is_finite()) {
        return Err(format!("{name} must be finite"));
    }
    Ok(values)
}

impl LivenessModel {
    /// Reads and validates a safetensors model file on the CPU.
    pub fn load(path: &Path) -> RidgeResult<Self> {
        let origin = path.display().to_string();
        let tensors = candle_core::safetensors::load(path, &Device::Cpu)
            .map_err(|e| load_error(&origin, e))?;
        Self::from_tensors(tensors, &origin)
    }

    /// Validates named tensors and builds the network; `origin` names the
    /// model in errors.
    pub fn from_tensors(tensors: HashMap<String, Tensor>, origin: &str) -> RidgeResult<Self> {
        Self::build(tensors, &Device::Cpu).map_err(|reason| load_error(origin, reason))
    }

    fn build(tensors: HashMap<String, Tensor>, device: &Device) -> Result<Self, String> {
        let mean = channel_stats(&tensors, "normalize.mean")?;
        let std = channel_stats(&tensors, "normalize.std")?;
        if std.contains(&0.0) {
            return Err("normalize.std entries must be non-zero".into());
        }

        // (inputs, outputs) per layer, in evaluation order.
        let mut shapes: Vec<(usize, usize)> = Vec::new();
        while let Some(weight) = tensors.get(&format!("layers.{}.weight", shapes.len())) {
            let (outputs, inputs) = weight
                .dims2()
                .map_err(|e| format!("layer {}: {e}", shapes.len()))?;
            shapes.push((inputs, outputs));
        }
        let Some(&(input_width, _)) = shapes.first() else {
            return Err("model has no layers.0.weight".into());
        };
        let input_size = input_side(input_width).ok_or_else(|| {
            format!("first layer takes {input_width} inputs, not side * side * {CHANNELS}")
        })?;

        let mut width = input_width;
        for (idx, &(inputs, outputs)) in shapes.iter().enumerate() {
            if inputs != width {
                return Err(format!("layer {idx}: expected {width} inputs, got {inputs}"));
            }
            if outputs == 0 {
                return Err(format!("layer {idx} has no outputs"));
            }
            width = outputs;
        }
        if width != OUTPUTS {
            return Err(format!("network must end in {OUTPUTS} outputs, got {width}"));
        }

        let vb = VarBuilder::from_tensors(tensors, DType::F32, device);
        let layers = shapes
            .iter()
            .enumerate()
            .map(|(idx, &(inputs, outputs))| {
                candle_nn::linear(inputs, outputs, vb.pp(format!("layers.{idx}")))
            })
            .collect::<candle_core::Result<Vec<Linear>>>()
            .map_err(|e| e.to_string())?;

        Ok(Self {
            input_size,
            mean,
            std,
            layers,
            device: device.clone(),
        })
    }

    /// Side of the square network input.
    pub fn input_size(&self) -> usize {
        self.input_size
    }

    /// Number of dense layers.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Normalized input vector for `image`.
    fn input(&self, image: &ColorImage) -> RidgeResult<Vec<f32>> {
        if image.width() < MIN_INPUT_SIDE || image.height() < MIN_INPUT_SIDE {
            return Err(RidgeError::Inference {
                reason: format!(
                    "image {}x{} is smaller than {MIN_INPUT_SIDE}x{MIN_INPUT_SIDE}",
                    image.width(),
                    image.height()
                ),
            });
        }
        let side = image.width().min(image.height()) as f32;
        let ox = (image.width() as f32 - side) * 0.5;
        let oy = (image.height() as f32 - side) * 0.5;
        let step = side / self.input_size as f32;
        let planes: Vec<_> = (0..CHANNELS).map(|c| image.channel_plane(c)).collect();

        let mut input = Vec::with_capacity(self.input_size * self.input_size * CHANNELS);
        for y in 0..self.input_size {
            let sy = oy + (y as f32 + 0.5) * step - 0.5;
            for x in 0..self.input_size {
                let sx = ox + (x as f32 + 0.5) * step - 0.5;
                for (c, plane) in planes.iter().enumerate() {
                    let v = plane.sample_bilinear(sx, sy) / 255.0;
                    input.push((v - self.mean[c]) / self.std[c]);
                }
            }
        }
        Ok(input)
    }

    fn forward(&self, input: Vec<f32>) -> candle_core::Result<Vec<f32>> {
        let width = input.len();
        let mut x = Tensor::from_vec(input, (1, width), &self.device)?;
        for (idx, layer) in self.layers.iter().enumerate() {
            x = layer.forward(&x)?;
            if idx + 1 < self.layers.len() {
                x = x.relu()?;
            }
        }
        candle_nn::ops::softmax_last_dim(&x)?.squeeze(0)?.to_vec1::<f32>()
    }

    /// `[real, fake]` probabilities for `image`.
    pub fn predict(&self, image: &ColorImage) -> RidgeResult<[f32; 2]> {
        let input = self.input(image)?;
        let probs = self.forward(input).map_err(|e| RidgeError::Inference {
            reason: e.to_string(),
        })?;
        match probs[..] {
            [real, fake] if real.is_finite() && fake.is_finite() => Ok([real, fake]),
            _ => Err(RidgeError::Inference {
                reason: "network produced non-finite scores".into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{input_side, LivenessModel};
    use crate::image::ColorImage;
    use crate::util::ErrorKind;
    use candle_core::{Device, Tensor};
    use std::collections::HashMap;

    /// 1x1 input, one layer scoring red minus blue.
    fn red_is_real() -> HashMap<String, Tensor> {
        let dev = Device::Cpu;
        HashMap::from([
            ("normalize.mean".to_string(), Tensor::new(&[0f32, 0.0, 0.0], &dev).unwrap()),
            ("normalize.std".to_string(), Tensor::new(&[1f32, 1.0, 1.0], &dev).unwrap()),
            (
                "layers.0.weight".to_string(),
                Tensor::new(&[[4f32, 0.0, -4.0], [-4.0, 0.0, 4.0]], &dev).unwrap(),
            ),
            ("layers.0.bias".to_string(), Tensor::new(&[0f32, 0.0], &dev).unwrap()),
        ])
    }

    #[test]
    fn softmax_outputs_sum_to_one() {
        let model = LivenessModel::from_tensors(red_is_real(), "inline").unwrap();
        assert_eq!(model.input_size(), 1);
        let red = ColorImage::from_fn(16, 12, |_, _| [250, 10, 10]).unwrap();
        let [real, fake] = model.predict(&red).unwrap();
        assert!((real + fake - 1.0).abs() < 1e-6);
        assert!(real > 0.9);
        let blue = ColorImage::from_fn(16, 12, |_, _| [10, 10, 250]).unwrap();
        assert!(model.predict(&blue).unwrap()[1] > 0.9);
    }

    #[test]
    fn tiny_images_fail_inference() {
        let model = LivenessModel::from_tensors(red_is_real(), "inline").unwrap();
        let img = ColorImage::from_fn(4, 4, |_, _| [0, 0, 0]).unwrap();
        assert_eq!(model.predict(&img).unwrap_err().kind(), ErrorKind::Inference);
    }

    #[test]
    fn shape_errors_fail_loading() {
        let dev = Device::Cpu;

        let mut short_bias = red_is_real();
        short_bias.insert("layers.0.bias".into(), Tensor::new(&[0f32], &dev).unwrap());
        let err = LivenessModel::from_tensors(short_bias, "inline").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModelLoad);

        let mut no_std = red_is_real();
        no_std.remove("normalize.std");
        let err = LivenessModel::from_tensors(no_std, "inline").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModelLoad);

        let mut zero_std = red_is_real();
        zero_std.insert("normalize.std".into(), Tensor::new(&[1f32, 0.0, 1.0], &dev).unwrap());
        let err = LivenessModel::from_tensors(zero_std, "inline").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModelLoad);

        let mut no_layers = red_is_real();
        no_layers.remove("layers.0.weight");
        let err = LivenessModel::from_tensors(no_layers, "inline").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModelLoad);
    }

    #[test]
    fn first_layer_width_must_be_a_square_rgb_crop() {
        let dev = Device::Cpu;
        let mut model = red_is_real();
        model.insert(
            "layers.0.weight".into(),
            Tensor::new(&[[1f32, 0.0, 0.0, 0.0, 0.0, 0.0], [0.0; 6]], &dev).unwrap(),
        );
        let err = LivenessModel::from_tensors(model, "inline").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModelLoad);
    }

    #[test]
    fn input_side_inverts_square_rgb_widths() {
        assert_eq!(input_side(3), Some(1));
        assert_eq!(input_side(12), Some(2));
        assert_eq!(input_side(3 * 64 * 64), Some(64));
        assert_eq!(input_side(0), None);
        assert_eq!(input_side(10), None);
        assert_eq!(input_side(6), None);
        assert_eq!(input_side(usize::MAX - usize::MAX % 3), None);
    }
}
