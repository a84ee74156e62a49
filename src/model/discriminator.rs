//! Patch discriminator judging (source, target) spectrogram pairs
//!
//! Three stride-2 stages and one stride-1 stage give a receptive field that
//! covers a local patch rather than the whole spectrogram; a final affine
//! projection reduces the feature map to one realism logit per sample.

use anyhow::{ensure, Result};
use tch::{nn, nn::Module, nn::ModuleT, Tensor};

use super::ops::{self, lrelu};

/// Discriminator network configuration
#[derive(Debug, Clone)]
pub struct DiscriminatorConfig {
    /// Spatial resolution of the paired input (square)
    pub output_size: i64,
    /// Channels in the source spectrogram
    pub input_c_dim: i64,
    /// Channels in the target spectrogram
    pub output_c_dim: i64,
    /// Filters in the first convolution stage
    pub df_dim: i64,
}

impl Default for DiscriminatorConfig {
    fn default() -> Self {
        Self {
            output_size: 1024,
            input_c_dim: 1,
            output_c_dim: 1,
            df_dim: 64,
        }
    }
}

/// Patch discriminator
///
/// Invoked twice per training step, once on the real pair and once on the
/// synthesized pair; both calls go through the same struct and the same
/// variable store, so they share every parameter by construction.
#[derive(Debug)]
pub struct Discriminator {
    config: DiscriminatorConfig,
    conv1: nn::Conv2D,
    conv2: nn::Conv2D,
    bn2: nn::BatchNorm,
    conv3: nn::Conv2D,
    bn3: nn::BatchNorm,
    conv4: nn::Conv2D,
    bn4: nn::BatchNorm,
    fc: nn::Linear,
}

impl Discriminator {
    /// Build the discriminator under the given variable-store path.
    pub fn new(p: &nn::Path, config: DiscriminatorConfig) -> Result<Self> {
        ensure!(
            config.output_size > 0 && config.output_size % 8 == 0,
            "output_size {} must be a positive multiple of 8 (three stride-2 stages)",
            config.output_size
        );
        ensure!(
            config.input_c_dim > 0 && config.output_c_dim > 0 && config.df_dim > 0,
            "discriminator dimensions must be positive"
        );

        let df = config.df_dim;
        let pair_c = config.input_c_dim + config.output_c_dim;

        let conv1 = ops::conv2d_down(p, "h1", pair_c, df);
        let conv2 = ops::conv2d_down(p, "h2", df, df * 2);
        let bn2 = ops::batch_norm(p, "h2_bn", df * 2);
        let conv3 = ops::conv2d_down(p, "h3", df * 2, df * 4);
        let bn3 = ops::batch_norm(p, "h3_bn", df * 4);
        let conv4 = ops::conv2d_same(p, "h4", df * 4, df * 8);
        let bn4 = ops::batch_norm(p, "h4_bn", df * 8);

        // Patch features flattened into a single realism logit per sample.
        let patch_size = config.output_size / 8;
        let flat = df * 8 * patch_size * patch_size;
        let fc = nn::linear(p / "logit", flat, 1, Default::default());

        Ok(Self {
            config,
            conv1,
            conv2,
            bn2,
            conv3,
            bn3,
            conv4,
            bn4,
            fc,
        })
    }

    /// Forward pass.
    ///
    /// # Arguments
    ///
    /// * `pair` - Tensor of shape `[N, S, S, input_c_dim + output_c_dim]`
    /// * `train` - Whether batch normalization uses batch statistics
    ///
    /// # Returns
    ///
    /// `(probability, logit)` tensors, each of shape `[N, 1]`.
    pub fn forward_t(&self, pair: &Tensor, train: bool) -> (Tensor, Tensor) {
        let x = ops::to_nchw(pair);

        let h1 = lrelu(&self.conv1.forward(&x), 0.2);
        let h2 = lrelu(&self.bn2.forward_t(&self.conv2.forward(&h1), train), 0.2);
        let h3 = lrelu(&self.bn3.forward_t(&self.conv3.forward(&h2), train), 0.2);
        let h4 = lrelu(&self.bn4.forward_t(&self.conv4.forward(&h3), train), 0.2);

        let batch_size = h4.size()[0];
        let logits = self.fc.forward(&h4.reshape([batch_size, -1]));

        (logits.sigmoid(), logits)
    }

    /// Realism probability for a pair (inference mode).
    pub fn classify(&self, pair: &Tensor) -> Tensor {
        self.forward_t(pair, false).0
    }

    /// Get configuration
    pub fn config(&self) -> &DiscriminatorConfig {
        &self.config
    }
}

impl ModuleT for Discriminator {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        Discriminator::forward_t(self, xs, train).1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{nn::VarStore, Device, Kind};

    fn tiny_config() -> DiscriminatorConfig {
        DiscriminatorConfig {
            output_size: 512,
            input_c_dim: 1,
            output_c_dim: 1,
            df_dim: 1,
        }
    }

    #[test]
    fn test_output_shape() {
        let vs = VarStore::new(Device::Cpu);
        let disc = Discriminator::new(&vs.root(), tiny_config()).unwrap();

        let pair = Tensor::randn([2, 512, 512, 2], (Kind::Float, Device::Cpu));
        let (probs, logits) = disc.forward_t(&pair, false);

        assert_eq!(probs.size(), vec![2, 1]);
        assert_eq!(logits.size(), vec![2, 1]);
    }

    #[test]
    fn test_probabilities_bounded() {
        let vs = VarStore::new(Device::Cpu);
        let disc = Discriminator::new(&vs.root(), tiny_config()).unwrap();

        let pair = Tensor::randn([2, 512, 512, 2], (Kind::Float, Device::Cpu));
        let probs = disc.classify(&pair);

        let min = probs.min().double_value(&[]);
        let max = probs.max().double_value(&[]);
        assert!(min >= 0.0 && max <= 1.0);
    }

    #[test]
    fn test_repeated_invocation_shares_weights() {
        // The two per-step invocations must resolve to the same parameters:
        // identical input, bit-identical logits.
        let vs = VarStore::new(Device::Cpu);
        let disc = Discriminator::new(&vs.root(), tiny_config()).unwrap();

        let pair = Tensor::randn([1, 512, 512, 2], (Kind::Float, Device::Cpu));
        let (_, first) = disc.forward_t(&pair, false);
        let (_, second) = disc.forward_t(&pair, false);

        let diff = (&first - &second).abs().max().double_value(&[]);
        assert_eq!(diff, 0.0);
    }

    #[test]
    fn test_invalid_size_rejected() {
        let vs = VarStore::new(Device::Cpu);
        let config = DiscriminatorConfig {
            output_size: 100,
            ..tiny_config()
        };
        assert!(Discriminator::new(&vs.root(), config).is_err());
    }
}
