//! Loss functions for adversarial spectrogram translation
//!
//! Binary cross-entropy on the discriminator's logits, plus L1/L2
//! reconstruction penalties on the generator's output. All terms are
//! non-negative, so both composite losses are non-negative for finite
//! inputs.

use tch::{Kind, Reduction, Tensor};

/// Discriminator loss on the real pair: mean BCE against label 1.
pub fn d_loss_real(real_logits: &Tensor) -> Tensor {
    let targets = Tensor::ones_like(real_logits);
    real_logits.binary_cross_entropy_with_logits::<Tensor>(&targets, None, None, Reduction::Mean)
}

/// Discriminator loss on the synthesized pair: mean BCE against label 0.
pub fn d_loss_fake(fake_logits: &Tensor) -> Tensor {
    let targets = Tensor::zeros_like(fake_logits);
    fake_logits.binary_cross_entropy_with_logits::<Tensor>(&targets, None, None, Reduction::Mean)
}

/// Total discriminator loss: `d_loss_real + d_loss_fake`.
pub fn discriminator_loss(real_logits: &Tensor, fake_logits: &Tensor) -> Tensor {
    d_loss_real(real_logits) + d_loss_fake(fake_logits)
}

/// Generator loss: adversarial term plus weighted reconstruction penalties.
///
/// The adversarial term is mean BCE between the discriminator's fake-pair
/// logit and label 1 (the generator wants the discriminator fooled). The
/// reconstruction terms compare real and synthesized targets directly:
/// `l1_lambda * mean(|real - fake|) + l2_lambda * mean((real - fake)^2)`.
///
/// Defaults in the configuration are `l1_lambda = 100`, `l2_lambda = 0`;
/// both remain independently configurable.
pub fn generator_loss(
    fake_logits: &Tensor,
    real_target: &Tensor,
    fake_target: &Tensor,
    l1_lambda: f64,
    l2_lambda: f64,
) -> Tensor {
    let targets = Tensor::ones_like(fake_logits);
    let adversarial = fake_logits.binary_cross_entropy_with_logits::<Tensor>(
        &targets,
        None,
        None,
        Reduction::Mean,
    );

    let diff = real_target - fake_target;
    let l1 = diff.abs().mean(Kind::Float);
    let l2 = diff.square().mean(Kind::Float);

    adversarial + l1_lambda * l1 + l2_lambda * l2
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::Device;

    #[test]
    fn test_discriminator_loss_finite_and_nonnegative() {
        let real = Tensor::randn([4, 1], (Kind::Float, Device::Cpu));
        let fake = Tensor::randn([4, 1], (Kind::Float, Device::Cpu));
        let loss = discriminator_loss(&real, &fake).double_value(&[]);

        assert!(loss.is_finite());
        assert!(loss >= 0.0);
    }

    #[test]
    fn test_discriminator_loss_is_sum_of_parts() {
        let real = Tensor::randn([4, 1], (Kind::Float, Device::Cpu));
        let fake = Tensor::randn([4, 1], (Kind::Float, Device::Cpu));

        let total = discriminator_loss(&real, &fake).double_value(&[]);
        let parts =
            d_loss_real(&real).double_value(&[]) + d_loss_fake(&fake).double_value(&[]);
        assert!((total - parts).abs() < 1e-6);
    }

    #[test]
    fn test_confident_discriminator_has_small_loss() {
        let real = Tensor::full([4, 1], 10.0, (Kind::Float, Device::Cpu));
        let fake = Tensor::full([4, 1], -10.0, (Kind::Float, Device::Cpu));
        let loss = discriminator_loss(&real, &fake).double_value(&[]);
        assert!(loss < 0.1);
    }

    #[test]
    fn test_generator_loss_finite_and_nonnegative() {
        let logits = Tensor::randn([4, 1], (Kind::Float, Device::Cpu));
        let real = Tensor::randn([4, 8, 8, 1], (Kind::Float, Device::Cpu));
        let fake = Tensor::randn([4, 8, 8, 1], (Kind::Float, Device::Cpu));

        let loss = generator_loss(&logits, &real, &fake, 100.0, 0.0).double_value(&[]);
        assert!(loss.is_finite());
        assert!(loss >= 0.0);
    }

    #[test]
    fn test_reconstruction_weights_are_independent() {
        let logits = Tensor::zeros([4, 1], (Kind::Float, Device::Cpu));
        let real = Tensor::ones([4, 8, 8, 1], (Kind::Float, Device::Cpu));
        let fake = Tensor::zeros([4, 8, 8, 1], (Kind::Float, Device::Cpu));

        // |real - fake| = (real - fake)^2 = 1 everywhere.
        let base = generator_loss(&logits, &real, &fake, 0.0, 0.0).double_value(&[]);
        let with_l1 = generator_loss(&logits, &real, &fake, 100.0, 0.0).double_value(&[]);
        let with_l2 = generator_loss(&logits, &real, &fake, 0.0, 10.0).double_value(&[]);

        assert!((with_l1 - base - 100.0).abs() < 1e-4);
        assert!((with_l2 - base - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_perfect_reconstruction_leaves_adversarial_term() {
        let logits = Tensor::randn([4, 1], (Kind::Float, Device::Cpu));
        let real = Tensor::randn([4, 8, 8, 1], (Kind::Float, Device::Cpu));
        let fake = real.shallow_clone();

        let full = generator_loss(&logits, &real, &fake, 100.0, 50.0).double_value(&[]);
        let adversarial = generator_loss(&logits, &real, &fake, 0.0, 0.0).double_value(&[]);
        assert!((full - adversarial).abs() < 1e-6);
    }
}
