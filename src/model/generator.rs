//! U-Net generator translating source spectrograms into target spectrograms
//!
//! Nine encoder stages halve the spatial resolution down to the bottleneck,
//! nine decoder stages mirror them with transposed convolutions. Each decoder
//! stage (except the last) concatenates its normalized output with the
//! activation of the symmetric encoder stage, preserving high-resolution
//! detail across the bottleneck.

use anyhow::{ensure, Result};
use tch::{nn, nn::Module, nn::ModuleT, Tensor};

use super::ops::{self, lrelu};

/// Number of downsampling (and upsampling) stages.
pub const NUM_STAGES: usize = 9;

/// Spatial granularity the architecture requires: 2^9 halvings.
pub const SIZE_MULTIPLE: i64 = 1 << NUM_STAGES;

/// Generator network configuration
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Spatial resolution of inputs and outputs (square)
    pub output_size: i64,
    /// Channels in the source spectrogram
    pub input_c_dim: i64,
    /// Channels in the target spectrogram
    pub output_c_dim: i64,
    /// Filters in the first encoder stage
    pub gf_dim: i64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            output_size: 1024,
            input_c_dim: 1,
            output_c_dim: 1,
            gf_dim: 64,
        }
    }
}

impl GeneratorConfig {
    /// Encoder output channels, shallowest to deepest.
    fn encoder_channels(&self) -> [i64; NUM_STAGES] {
        let gf = self.gf_dim;
        [gf, gf * 2, gf * 4, gf * 8, gf * 8, gf * 8, gf * 8, gf * 8, gf * 8]
    }

    /// Decoder output channels, deepest to shallowest.
    fn decoder_channels(&self) -> [i64; NUM_STAGES] {
        let gf = self.gf_dim;
        [
            gf * 8,
            gf * 8,
            gf * 8,
            gf * 8,
            gf * 8,
            gf * 4,
            gf * 2,
            gf,
            self.output_c_dim,
        ]
    }

    /// Architecture validity check; fails rather than silently cropping.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.output_size > 0 && self.output_size % SIZE_MULTIPLE == 0,
            "output_size {} must be a positive multiple of {} (nine stride-2 stages)",
            self.output_size,
            SIZE_MULTIPLE
        );
        ensure!(
            self.input_c_dim > 0 && self.output_c_dim > 0,
            "channel dimensions must be positive (input_c_dim={}, output_c_dim={})",
            self.input_c_dim,
            self.output_c_dim
        );
        ensure!(self.gf_dim > 0, "gf_dim must be positive, got {}", self.gf_dim);
        Ok(())
    }
}

#[derive(Debug)]
struct EncoderStage {
    conv: nn::Conv2D,
    /// Every stage but the first is normalized.
    norm: Option<nn::BatchNorm>,
}

#[derive(Debug)]
struct DecoderStage {
    deconv: nn::ConvTranspose2D,
    /// The final stage emits the output directly, without normalization.
    norm: Option<nn::BatchNorm>,
    /// Dropout regularization on the three deepest decoder stages.
    dropout: bool,
}

/// U-Net generator
///
/// Both the training forward pass and the inference forward pass run through
/// this struct and therefore resolve to the same parameter set; inference
/// merely passes `train = false`, which disables dropout and switches batch
/// normalization to its running statistics.
#[derive(Debug)]
pub struct Generator {
    config: GeneratorConfig,
    encoder: Vec<EncoderStage>,
    decoder: Vec<DecoderStage>,
}

impl Generator {
    /// Build the generator under the given variable-store path.
    ///
    /// Fails when `output_size` is not a multiple of 2^9 or any channel
    /// dimension is invalid; skip-connection partners are guaranteed to have
    /// matching spatial dimensions once this succeeds.
    pub fn new(p: &nn::Path, config: GeneratorConfig) -> Result<Self> {
        config.validate()?;

        let enc_channels = config.encoder_channels();
        let dec_channels = config.decoder_channels();

        let mut encoder = Vec::with_capacity(NUM_STAGES);
        for (i, &c_out) in enc_channels.iter().enumerate() {
            let c_in = if i == 0 {
                config.input_c_dim
            } else {
                enc_channels[i - 1]
            };
            let conv = ops::conv2d_down(p, &format!("enc{}", i + 1), c_in, c_out);
            let norm = if i == 0 {
                None
            } else {
                Some(ops::batch_norm(p, &format!("enc{}_bn", i + 1), c_out))
            };
            encoder.push(EncoderStage { conv, norm });
        }

        let mut decoder = Vec::with_capacity(NUM_STAGES);
        for (j, &c_out) in dec_channels.iter().enumerate() {
            // Stage 0 consumes the bottleneck; later stages consume the
            // previous decoder output concatenated with its skip partner.
            let c_in = if j == 0 {
                enc_channels[NUM_STAGES - 1]
            } else {
                dec_channels[j - 1] + enc_channels[NUM_STAGES - 1 - j]
            };
            let deconv = ops::deconv2d_up(p, &format!("dec{}", j), c_in, c_out);
            let norm = if j + 1 == NUM_STAGES {
                None
            } else {
                Some(ops::batch_norm(p, &format!("dec{}_bn", j), c_out))
            };
            decoder.push(DecoderStage {
                deconv,
                norm,
                dropout: j < 3,
            });
        }

        Ok(Self {
            config,
            encoder,
            decoder,
        })
    }

    /// Forward pass.
    ///
    /// # Arguments
    ///
    /// * `source` - Tensor of shape `[N, S, S, input_c_dim]`
    /// * `train` - Enables dropout and batch-statistics normalization
    ///
    /// # Returns
    ///
    /// Tensor of shape `[N, S, S, output_c_dim]` with values in `[-1, 1]`.
    pub fn forward_t(&self, source: &Tensor, train: bool) -> Tensor {
        let mut x = ops::to_nchw(source);

        // Encoder: keep every stage's activation for the skip connections.
        let mut activations: Vec<Tensor> = Vec::with_capacity(NUM_STAGES);
        for (i, stage) in self.encoder.iter().enumerate() {
            let inp = if i == 0 { x.shallow_clone() } else { lrelu(&x, 0.2) };
            let mut y = stage.conv.forward(&inp);
            if let Some(norm) = &stage.norm {
                y = norm.forward_t(&y, train);
            }
            activations.push(y.shallow_clone());
            x = y;
        }

        // Decoder: rectify, upsample, normalize, then concatenate with the
        // symmetric encoder activation. The last stage emits tanh output.
        for (j, stage) in self.decoder.iter().enumerate() {
            let y = stage.deconv.forward(&x.relu());
            match &stage.norm {
                Some(norm) => {
                    let mut y = norm.forward_t(&y, train);
                    if stage.dropout {
                        y = y.dropout(0.5, train);
                    }
                    let skip = &activations[NUM_STAGES - 2 - j];
                    debug_assert_eq!(y.size()[2..], skip.size()[2..]);
                    x = Tensor::cat(&[&y, skip], 1);
                }
                None => {
                    x = y.tanh();
                }
            }
        }

        ops::to_nhwc(&x)
    }

    /// Inference-mode forward pass (dropout disabled, running statistics).
    pub fn translate(&self, source: &Tensor) -> Tensor {
        self.forward_t(source, false)
    }

    /// Get configuration
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }
}

impl ModuleT for Generator {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        Generator::forward_t(self, xs, train)
    }
}
