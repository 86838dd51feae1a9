//! KL-gated trust-region surrogate ("Truly PPO")
//!
//! Instead of clipping the probability ratio, each sample is penalised by
//! `policy_params · KL` when it has both left the trust region
//! (`KL ≥ policy_kl_range`) and become more likely (`ratio > 1`):
//!
//! ```text
//! L_pg = mean( KL ≥ δ ∧ r > 1 ? r·Â − β·KL : r·Â )
//! loss = c_v · L_critic − c_e · H − L_pg
//! ```
//!
//! Old-network outputs, returns and normalised advantages are constants for the
//! step: gradients reach the current actor through `r` and `KL`, and the current
//! critic through `L_critic`.

use burn::{prelude::*, tensor::backend::Backend};

use crate::{
    algo::{
        distribution,
        policy_function::{normalize_advantages, PolicyFunction},
    },
    error::{Result, TrulyPpoError},
    traits::to_tensor::{column, repeat_columns, to_host_vec},
};

/// Coefficients of the Truly PPO objective
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrulyPPO {
    /// KL threshold δ above which the penalty can apply
    pub policy_kl_range: f32,
    /// Penalty weight β
    pub policy_params: f32,
    /// Value-clip radius; `None` uses the plain squared error
    pub value_clip: Option<f32>,
    pub vf_loss_coef: f32,
    pub entropy_coef: f32,
    pub policy_function: PolicyFunction,
}

/// Network outputs for one minibatch
///
/// Policy tensors are `[batch, action_dim]`, value tensors `[batch, 1]`.
pub struct LossInputs<B: Backend> {
    pub action_mean: Tensor<B, 2>,
    pub action_std: Tensor<B, 2>,
    pub old_action_mean: Tensor<B, 2>,
    pub old_action_std: Tensor<B, 2>,
    pub values: Tensor<B, 2>,
    pub old_values: Tensor<B, 2>,
    pub next_values: Tensor<B, 2>,
    pub actions: Tensor<B, 2>,
    pub rewards: Vec<f32>,
    pub dones: Vec<f32>,
}

/// The scalar to descend plus its parts for logging
pub struct LossParts<B: Backend> {
    pub loss: Tensor<B, 1>,
    pub policy_loss: Tensor<B, 1>,
    pub critic_loss: Tensor<B, 1>,
    pub entropy: Tensor<B, 1>,
    pub mean_kl: Tensor<B, 1>,
    pub penalized_fraction: Tensor<B, 1>,
}

/// Per-sample KL-gated surrogate
///
/// All inputs are `[batch, action_dim]`. The gate is a boolean mask, so no
/// gradient flows through the branch condition.
pub fn gated_surrogate<B: Backend>(
    ratios: Tensor<B, 2>,
    advantages: Tensor<B, 2>,
    kl: Tensor<B, 2>,
    policy_kl_range: f32,
    policy_params: f32,
) -> Tensor<B, 2> {
    let gate = penalty_mask(ratios.clone(), kl.clone(), policy_kl_range);

    let plain = ratios * advantages;
    let penalized = plain.clone() - kl.mul_scalar(policy_params);

    plain.mask_where(gate, penalized)
}

/// `KL ≥ policy_kl_range ∧ ratio > 1`
pub fn penalty_mask<B: Backend>(
    ratios: Tensor<B, 2>,
    kl: Tensor<B, 2>,
    policy_kl_range: f32,
) -> Tensor<B, 2, Bool> {
    let outside_region = kl.greater_equal_elem(policy_kl_range);
    let more_likely = ratios.greater_elem(1.0);
    outside_region.bool_and(more_likely)
}

/// Per-sample critic loss `½ (R − V)²`, pessimistically clipped when `value_clip` is set
///
/// With a clip radius `c`, the prediction `V_old + clamp(V − V_old, −c, c)` is
/// scored too and the larger of the two squared errors is kept.
pub fn critic_losses<B: Backend>(
    returns: Tensor<B, 2>,
    values: Tensor<B, 2>,
    old_values: Tensor<B, 2>,
    value_clip: Option<f32>,
) -> Tensor<B, 2> {
    let unclipped = (returns.clone() - values.clone()).powf_scalar(2.0).mul_scalar(0.5);

    match value_clip {
        None => unclipped,
        Some(clip) => {
            let clipped_values =
                old_values.clone() + (values - old_values).clamp(-clip, clip);
            let clipped = (returns - clipped_values).powf_scalar(2.0).mul_scalar(0.5);
            unclipped.max_pair(clipped)
        }
    }
}

impl TrulyPPO {
    pub fn compute_loss<B: Backend>(&self, inputs: LossInputs<B>) -> Result<LossParts<B>> {
        let LossInputs {
            action_mean,
            action_std,
            old_action_mean,
            old_action_std,
            values,
            old_values,
            next_values,
            actions,
            rewards,
            dones,
        } = inputs;

        let device = action_mean.device();
        let action_dim = action_mean.dims()[1];

        // The reference policy and value are constants for this step.
        let old_action_mean = old_action_mean.detach();
        let old_action_std = old_action_std.detach();
        let old_values = old_values.detach();

        // Advantages and returns are fixed targets computed on the host.
        let values_host = to_host_vec(values.clone().detach())?;
        let next_values_host = to_host_vec(next_values.detach())?;
        for (what, actual) in [
            ("rewards", rewards.len()),
            ("dones", dones.len()),
            ("next values", next_values_host.len()),
        ] {
            if actual != values_host.len() {
                return Err(TrulyPpoError::DimensionMismatch {
                    what,
                    expected: values_host.len(),
                    actual,
                });
            }
        }
        let advantages = self.policy_function.generalized_advantage_estimation(
            &values_host,
            &rewards,
            &next_values_host,
            &dones,
        );
        let returns: Vec<f32> = advantages
            .iter()
            .zip(&values_host)
            .map(|(a, v)| a + v)
            .collect();
        let advantages = normalize_advantages(&advantages);

        let returns = column::<B>(&returns, &device);
        let advantages = repeat_columns::<B>(&advantages, action_dim, &device);

        let logprobs = distribution::log_prob(action_mean.clone(), action_std.clone(), actions.clone());
        let old_logprobs =
            distribution::log_prob(old_action_mean.clone(), old_action_std.clone(), actions).detach();

        let ratios = (logprobs - old_logprobs).exp();
        let kl = distribution::kl_divergence(
            old_action_mean,
            old_action_std,
            action_mean,
            action_std.clone(),
        );

        let penalized_fraction = penalty_mask(ratios.clone(), kl.clone(), self.policy_kl_range)
            .float()
            .mean();
        let mean_kl = kl.clone().detach().mean();

        let policy_loss = gated_surrogate(
            ratios,
            advantages,
            kl,
            self.policy_kl_range,
            self.policy_params,
        )
        .mean();

        let entropy = distribution::entropy(action_std).mean();

        let critic_loss = critic_losses(returns, values, old_values, self.value_clip).mean();

        let loss = critic_loss.clone().mul_scalar(self.vf_loss_coef)
            - entropy.clone().mul_scalar(self.entropy_coef)
            - policy_loss.clone();

        Ok(LossParts {
            loss,
            policy_loss,
            critic_loss,
            entropy,
            mean_kl,
            penalized_fraction,
        })
    }
}
