//! Layer primitives shared by the generator and discriminator
//!
//! All convolutions use 5x5 kernels with weights drawn from N(0, 0.02),
//! the standard pix2pix initialization. Strided variants halve or double
//! the spatial resolution; batch normalization is built with
//! `nn::batch_norm2d` and invoked with an explicit training flag.

use tch::{nn, Tensor};

/// Kernel size used by every convolution in the model.
pub const KERNEL_SIZE: i64 = 5;

/// Standard deviation of the normal weight initialization.
pub const WEIGHT_STDEV: f64 = 0.02;

fn weight_init() -> nn::Init {
    nn::Init::Randn {
        mean: 0.0,
        stdev: WEIGHT_STDEV,
    }
}

/// Strided convolution halving the spatial resolution.
///
/// 5x5 kernel, stride 2, padding 2: an even input of size `s` maps to `s/2`.
pub fn conv2d_down(p: &nn::Path, name: &str, c_in: i64, c_out: i64) -> nn::Conv2D {
    let config = nn::ConvConfig {
        stride: 2,
        padding: 2,
        ws_init: weight_init(),
        ..Default::default()
    };
    nn::conv2d(p / name, c_in, c_out, KERNEL_SIZE, config)
}

/// Resolution-preserving convolution (stride 1).
pub fn conv2d_same(p: &nn::Path, name: &str, c_in: i64, c_out: i64) -> nn::Conv2D {
    let config = nn::ConvConfig {
        stride: 1,
        padding: 2,
        ws_init: weight_init(),
        ..Default::default()
    };
    nn::conv2d(p / name, c_in, c_out, KERNEL_SIZE, config)
}

/// Transposed convolution doubling the spatial resolution.
///
/// 5x5 kernel, stride 2, padding 2, output padding 1: input `s` maps to `2s`.
pub fn deconv2d_up(p: &nn::Path, name: &str, c_in: i64, c_out: i64) -> nn::ConvTranspose2D {
    let config = nn::ConvTransposeConfig {
        stride: 2,
        padding: 2,
        output_padding: 1,
        ws_init: weight_init(),
        ..Default::default()
    };
    nn::conv_transpose2d(p / name, c_in, c_out, KERNEL_SIZE, config)
}

/// Batch normalization layer with learnable scale/shift.
pub fn batch_norm(p: &nn::Path, name: &str, dim: i64) -> nn::BatchNorm {
    nn::batch_norm2d(p / name, dim, Default::default())
}

/// Leaky rectifier: `max(x, slope * x)`.
///
/// The model uses slope 0.2 everywhere, steeper than torch's 0.01 default.
pub fn lrelu(x: &Tensor, slope: f64) -> Tensor {
    x.maximum(&(x * slope))
}

/// NHWC batch (the public tensor contract) to NCHW (what conv layers expect).
pub fn to_nchw(x: &Tensor) -> Tensor {
    x.permute([0, 3, 1, 2])
}

/// NCHW back to the NHWC public contract.
pub fn to_nhwc(x: &Tensor) -> Tensor {
    x.permute([0, 2, 3, 1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{nn::Module, nn::VarStore, Device, Kind};

    #[test]
    fn test_conv_down_halves_spatial() {
        let vs = VarStore::new(Device::Cpu);
        let conv = conv2d_down(&vs.root(), "c", 1, 4);

        let x = Tensor::randn([2, 1, 64, 64], (Kind::Float, Device::Cpu));
        let y = conv.forward(&x);
        assert_eq!(y.size(), vec![2, 4, 32, 32]);
    }

    #[test]
    fn test_deconv_up_doubles_spatial() {
        let vs = VarStore::new(Device::Cpu);
        let deconv = deconv2d_up(&vs.root(), "d", 4, 2);

        let x = Tensor::randn([2, 4, 16, 16], (Kind::Float, Device::Cpu));
        let y = deconv.forward(&x);
        assert_eq!(y.size(), vec![2, 2, 32, 32]);
    }

    #[test]
    fn test_lrelu_slope() {
        let x = Tensor::from_slice(&[-1.0f32, 0.0, 2.0]);
        let y = lrelu(&x, 0.2);
        let vals: Vec<f32> = Vec::try_from(y).unwrap();
        assert_eq!(vals, vec![-0.2, 0.0, 2.0]);
    }

    #[test]
    fn test_layout_round_trip() {
        let x = Tensor::randn([1, 8, 8, 3], (Kind::Float, Device::Cpu));
        let y = to_nhwc(&to_nchw(&x));
        assert_eq!(y.size(), x.size());
        let diff = (&y - &x).abs().max().double_value(&[]);
        assert!(diff < 1e-12);
    }
}
