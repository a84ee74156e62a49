//! Sampling and test-time evaluation
//!
//! Runs the generator's inference-mode forward pass on held-out or random
//! batches, rescales the synthesized target to the source's amplitude
//! range, and emits a raw tensor plus a composite visualization. At test
//! time the synthesized spectrogram is additionally handed to an external
//! waveform-reconstruction collaborator.

use std::path::Path;

use anyhow::{bail, Context, Result};
use tch::Tensor;
use tracing::info;

use super::viz;
use crate::data::{numeric_sorted_files, PairedDataset};
use crate::model::{join_pair, split_pair, Pix2Pix};
use crate::training::{d_loss_fake, d_loss_real, generator_loss};

/// External collaborator turning a spectrogram tensor back into audio.
///
/// Audio-domain signal processing is outside this crate; the trainer only
/// needs a place to hand the synthesized spectrogram at test time.
pub trait WaveformSink {
    /// Reconstruct a waveform from `specgram` and write it to `path`.
    fn write_waveform(&self, specgram: &Tensor, path: &Path) -> Result<()>;
}

/// Sink that records the delegation instead of reconstructing.
///
/// Used when no reconstruction backend is wired in; the raw tensors are
/// still written, so reconstruction can run as a separate pass.
pub struct NullWaveformSink;

impl WaveformSink for NullWaveformSink {
    fn write_waveform(&self, _specgram: &Tensor, path: &Path) -> Result<()> {
        info!(
            "waveform reconstruction delegated externally, skipping {}",
            path.display()
        );
        Ok(())
    }
}

/// Amplitudes at or below this are treated as silence.
const SILENCE_THRESHOLD: f64 = 1e-12;

/// Rescale `fake` so its maximum absolute value matches that of `source`.
///
/// Prevents runaway gain in the synthesized output. When `fake` is
/// numerically silent the ratio is undefined and the tensor is returned
/// unscaled; an all-zero `source` simply scales everything to zero.
/// Neither case divides by zero.
pub fn rescale_to_source(fake: &Tensor, source: &Tensor) -> Tensor {
    let max_fake = fake.abs().max().double_value(&[]);
    if max_fake <= SILENCE_THRESHOLD {
        return fake.shallow_clone();
    }
    let max_source = source.abs().max().double_value(&[]);
    fake * (max_source / max_fake)
}

/// First channel of the first batch element, as a 2-D plane.
fn first_plane(batch: &Tensor) -> Tensor {
    batch.get(0).select(2, 0)
}

/// Run one sampling pass on a random batch during training.
///
/// Writes the rescaled synthesized target as `.npy` and a three-row
/// composite visualization (source / real target / synthesized target),
/// then logs the sample-time losses.
#[allow(clippy::too_many_arguments)]
pub fn sample_model(
    model: &Pix2Pix,
    dataset: &PairedDataset,
    sample_dir: &Path,
    epoch: usize,
    idx: usize,
    batch_size: usize,
    l1_lambda: f64,
    l2_lambda: f64,
) -> Result<()> {
    let batch = dataset.random_batch(batch_size)?.to_device(model.device);
    let (source, real_target) = split_pair(&batch, model.input_c_dim(), model.output_c_dim());

    let (fake_target, d_loss, g_loss) = tch::no_grad(|| {
        let fake_target = model.translate(&source);

        let real_pair = join_pair(&source, &real_target);
        let fake_pair = join_pair(&source, &fake_target);
        let (_, real_logits) = model.discriminator.forward_t(&real_pair, false);
        let (_, fake_logits) = model.discriminator.forward_t(&fake_pair, false);

        let d_loss = d_loss_real(&real_logits).double_value(&[])
            + d_loss_fake(&fake_logits).double_value(&[]);
        let g_loss = generator_loss(&fake_logits, &real_target, &fake_target, l1_lambda, l2_lambda)
            .double_value(&[]);
        (fake_target, d_loss, g_loss)
    });

    let rescaled = rescale_to_source(&fake_target, &source);

    let tensor_path = sample_dir.join(format!("fake_target_{idx:06}.npy"));
    rescaled
        .write_npy(&tensor_path)
        .with_context(|| format!("failed to write sample tensor {}", tensor_path.display()))?;

    let image_path = sample_dir.join(format!("train_{epoch:02}_{idx:06}.png"));
    viz::write_composite(
        &[
            first_plane(&source),
            first_plane(&real_target),
            first_plane(&rescaled),
        ],
        &image_path,
    )?;

    info!("[sample] d_loss: {:.8}, g_loss: {:.8}", d_loss, g_loss);
    Ok(())
}

/// Evaluate the model on a directory of test inputs.
///
/// Test files are paired samples named `{n}.npy`; numeric sort order
/// determines processing order. Each batch yields a composite image of the
/// synthesized target and one call into the waveform collaborator.
pub fn run_test(
    model: &Pix2Pix,
    test_dir: &Path,
    batch_size: usize,
    sink: &dyn WaveformSink,
) -> Result<()> {
    let files = numeric_sorted_files(test_dir)?;
    if files.is_empty() {
        bail!(
            "test directory {} contains no numerically named .npy files",
            test_dir.display()
        );
    }

    let dataset = PairedDataset::from_dir(
        test_dir,
        model.output_size(),
        model.input_c_dim(),
        model.output_c_dim(),
    )?;

    info!("evaluating {} test inputs", files.len());

    for (i, chunk) in files.chunks(batch_size).enumerate() {
        let idx = i + 1;
        let batch = dataset.load_batch(chunk)?.to_device(model.device);
        let (source, _) = split_pair(&batch, model.input_c_dim(), model.output_c_dim());

        let fake_target = tch::no_grad(|| model.translate(&source));
        let rescaled = rescale_to_source(&fake_target, &source);

        let image_path = test_dir.join(format!("test_{idx:04}.png"));
        viz::write_composite(&[first_plane(&rescaled)], &image_path)?;

        let audio_path = test_dir.join(format!("test_{idx:04}.wav"));
        sink.write_waveform(&rescaled, &audio_path)?;

        info!("evaluated test batch {}", idx);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{Device, Kind};

    #[test]
    fn test_rescale_matches_source_amplitude() {
        let source = Tensor::from_slice(&[0.5f32, -4.0, 1.0]);
        let fake = Tensor::from_slice(&[0.1f32, 0.2, -0.4]);

        let rescaled = rescale_to_source(&fake, &source);
        let max = rescaled.abs().max().double_value(&[]);
        assert!((max - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_rescale_zero_fake_is_identity() {
        let source = Tensor::from_slice(&[1.0f32, 2.0]);
        let fake = Tensor::zeros([2], (Kind::Float, Device::Cpu));

        let rescaled = rescale_to_source(&fake, &source);
        assert_eq!(rescaled.abs().max().double_value(&[]), 0.0);
    }

    #[test]
    fn test_rescale_skips_sub_threshold_fake() {
        // Below the silence threshold the ratio is undefined, so the
        // tensor must come back unscaled rather than blown up.
        let source = Tensor::from_slice(&[1.0f64, 2.0]);
        let fake = Tensor::from_slice(&[1e-13f64, -5e-14]);

        let rescaled = rescale_to_source(&fake, &source);
        let diff = (&rescaled - &fake).abs().max().double_value(&[]);
        assert_eq!(diff, 0.0);
    }

    #[test]
    fn test_rescale_zero_source_yields_zero_output() {
        // All-zero source: the rescale factor is zero, not a division by zero.
        let source = Tensor::zeros([3], (Kind::Float, Device::Cpu));
        let fake = Tensor::from_slice(&[0.3f32, -0.8, 0.1]);

        let rescaled = rescale_to_source(&fake, &source);
        assert_eq!(rescaled.abs().max().double_value(&[]), 0.0);
    }

    #[test]
    fn test_first_plane_shape() {
        let batch = Tensor::randn([2, 8, 8, 3], (Kind::Float, Device::Cpu));
        let plane = first_plane(&batch);
        assert_eq!(plane.size(), vec![8, 8]);
    }

    #[test]
    fn test_null_sink_is_infallible() {
        let sink = NullWaveformSink;
        let specgram = Tensor::randn([1, 4, 4, 1], (Kind::Float, Device::Cpu));
        assert!(sink.write_waveform(&specgram, Path::new("unused.wav")).is_ok());
    }
}
