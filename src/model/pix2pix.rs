//! Pix2Pix wrapper combining the generator and discriminator
//!
//! Owns one variable store per network. Optimizers are built against a
//! specific store, so each gradient step touches exactly one network's
//! parameter subset; partitioning is by ownership, never by variable name.

use anyhow::{Context, Result};
use tch::{nn, nn::OptimizerConfig, nn::VarStore, Device, Tensor};

use super::discriminator::{Discriminator, DiscriminatorConfig};
use super::generator::{Generator, GeneratorConfig};

/// Complete pix2pix model
pub struct Pix2Pix {
    /// Generator network
    pub generator: Generator,
    /// Discriminator network
    pub discriminator: Discriminator,
    /// Variable store holding only generator parameters
    pub gen_vs: VarStore,
    /// Variable store holding only discriminator parameters
    pub disc_vs: VarStore,
    /// Device (CPU/GPU)
    pub device: Device,
}

impl Pix2Pix {
    /// Create a new pix2pix model
    pub fn new(
        gen_config: GeneratorConfig,
        disc_config: DiscriminatorConfig,
        device: Device,
    ) -> Result<Self> {
        let gen_vs = VarStore::new(device);
        let disc_vs = VarStore::new(device);

        let generator = Generator::new(&gen_vs.root(), gen_config)?;
        let discriminator = Discriminator::new(&disc_vs.root(), disc_config)?;

        Ok(Self {
            generator,
            discriminator,
            gen_vs,
            disc_vs,
            device,
        })
    }

    /// Create a model from the shared dimension set used by both networks.
    pub fn from_dims(
        output_size: i64,
        input_c_dim: i64,
        output_c_dim: i64,
        gf_dim: i64,
        df_dim: i64,
        device: Device,
    ) -> Result<Self> {
        let gen_config = GeneratorConfig {
            output_size,
            input_c_dim,
            output_c_dim,
            gf_dim,
        };
        let disc_config = DiscriminatorConfig {
            output_size,
            input_c_dim,
            output_c_dim,
            df_dim,
        };
        Self::new(gen_config, disc_config, device)
    }

    /// Translate a batch of source spectrograms (inference mode).
    ///
    /// Runs the same parameter set as the training forward pass; only
    /// dropout and normalization statistics differ.
    pub fn translate(&self, source: &Tensor) -> Tensor {
        self.generator.translate(source)
    }

    /// Adam optimizer over the generator's parameter subset.
    pub fn gen_optimizer(&self, lr: f64, beta1: f64) -> Result<nn::Optimizer> {
        nn::Adam {
            beta1,
            ..Default::default()
        }
        .build(&self.gen_vs, lr)
        .context("failed to build generator optimizer")
    }

    /// Adam optimizer over the discriminator's parameter subset.
    pub fn disc_optimizer(&self, lr: f64, beta1: f64) -> Result<nn::Optimizer> {
        nn::Adam {
            beta1,
            ..Default::default()
        }
        .build(&self.disc_vs, lr)
        .context("failed to build discriminator optimizer")
    }

    /// Save both networks' parameters.
    pub fn save(&self, gen_path: &std::path::Path, disc_path: &std::path::Path) -> Result<()> {
        self.gen_vs.save(gen_path)?;
        self.disc_vs.save(disc_path)?;
        Ok(())
    }

    /// Restore both networks' parameters in place.
    pub fn load(&mut self, gen_path: &std::path::Path, disc_path: &std::path::Path) -> Result<()> {
        self.gen_vs.load(gen_path)?;
        self.disc_vs.load(disc_path)?;
        Ok(())
    }

    /// Spatial resolution the model was built for.
    pub fn output_size(&self) -> i64 {
        self.generator.config().output_size
    }

    /// Source channel count.
    pub fn input_c_dim(&self) -> i64 {
        self.generator.config().input_c_dim
    }

    /// Target channel count.
    pub fn output_c_dim(&self) -> i64 {
        self.generator.config().output_c_dim
    }
}

/// Split a paired batch `[N, S, S, C_in + C_out]` into source and target.
pub fn split_pair(batch: &Tensor, input_c_dim: i64, output_c_dim: i64) -> (Tensor, Tensor) {
    let source = batch.narrow(3, 0, input_c_dim);
    let target = batch.narrow(3, input_c_dim, output_c_dim);
    (source, target)
}

/// Concatenate a source with a (real or synthesized) target along channels.
pub fn join_pair(source: &Tensor, target: &Tensor) -> Tensor {
    Tensor::cat(&[source, target], 3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::Kind;

    fn tiny_model() -> Pix2Pix {
        Pix2Pix::from_dims(512, 1, 1, 1, 1, Device::Cpu).unwrap()
    }

    #[test]
    fn test_model_creation() {
        let model = tiny_model();
        assert_eq!(model.output_size(), 512);
        assert_eq!(model.input_c_dim(), 1);
        assert_eq!(model.output_c_dim(), 1);
    }

    #[test]
    fn test_translate_shape() {
        let model = tiny_model();
        let source = Tensor::randn([1, 512, 512, 1], (Kind::Float, Device::Cpu));
        let fake = model.translate(&source);
        assert_eq!(fake.size(), vec![1, 512, 512, 1]);
    }

    #[test]
    fn test_split_join_round_trip() {
        let batch = Tensor::randn([2, 8, 8, 3], (Kind::Float, Device::Cpu));
        let (source, target) = split_pair(&batch, 1, 2);

        assert_eq!(source.size(), vec![2, 8, 8, 1]);
        assert_eq!(target.size(), vec![2, 8, 8, 2]);

        let joined = join_pair(&source, &target);
        let diff = (&joined - &batch).abs().max().double_value(&[]);
        assert_eq!(diff, 0.0);
    }

    #[test]
    fn test_parameter_stores_are_disjoint() {
        let model = tiny_model();
        // Each network declares its parameters in its own store.
        assert!(!model.gen_vs.trainable_variables().is_empty());
        assert!(!model.disc_vs.trainable_variables().is_empty());
    }
}
