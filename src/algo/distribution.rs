//! Diagonal Gaussian policy helpers
//!
//! Every function works elementwise on `[batch_size, action_dim]` tensors and
//! returns per-dimension values. Nothing is summed over the action dimension
//! here: the surrogate loss forms its ratio per dimension.
//!
//! For `N(μ, σ)`:
//! ```text
//! log p(x)        = -(x - μ)² / (2σ²) - log σ - ½ log 2π
//! H               = ½ + ½ log 2π + log σ
//! KL(N₁ ‖ N₂)     = log(σ₂/σ₁) + (σ₁² + (μ₁ - μ₂)²) / (2σ₂²) - ½
//! ```

use burn::tensor::{backend::Backend, Distribution, Tensor};

fn half_log_two_pi() -> f32 {
    0.5 * (2.0 * std::f32::consts::PI).ln()
}

/// Draw one action per row: `μ + σ · ε`, `ε ~ N(0, 1)`
pub fn sample<B: Backend>(mean: Tensor<B, 2>, std: Tensor<B, 2>) -> Tensor<B, 2> {
    let noise = Tensor::random(mean.dims(), Distribution::Normal(0.0, 1.0), &mean.device());
    mean + std * noise
}

/// Elementwise log-density of `value` under `N(mean, std)`
pub fn log_prob<B: Backend>(
    mean: Tensor<B, 2>,
    std: Tensor<B, 2>,
    value: Tensor<B, 2>,
) -> Tensor<B, 2> {
    let var = std.clone().powf_scalar(2.0);
    let sq = (value - mean).powf_scalar(2.0);
    (sq / var.mul_scalar(2.0)).neg() - std.log().add_scalar(half_log_two_pi())
}

/// Elementwise differential entropy; depends on the standard deviation only
pub fn entropy<B: Backend>(std: Tensor<B, 2>) -> Tensor<B, 2> {
    std.log().add_scalar(0.5 + half_log_two_pi())
}

/// Elementwise `KL(N(mean_a, std_a) ‖ N(mean_b, std_b))`
pub fn kl_divergence<B: Backend>(
    mean_a: Tensor<B, 2>,
    std_a: Tensor<B, 2>,
    mean_b: Tensor<B, 2>,
    std_b: Tensor<B, 2>,
) -> Tensor<B, 2> {
    let var_a = std_a.clone().powf_scalar(2.0);
    let var_b = std_b.clone().powf_scalar(2.0);
    let mean_sq = (mean_a - mean_b).powf_scalar(2.0);

    ((std_b / std_a).log() + (var_a + mean_sq) / var_b.mul_scalar(2.0)).sub_scalar(0.5)
}
