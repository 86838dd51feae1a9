//! Return and advantage estimation
//!
//! All estimators take one entry per transition in recording order and use a
//! `done` indicator in `{0, 1}` that cuts the bootstrap term at episode ends.
//!
//! ```text
//! TD target   y_t = r_t + (1 - d_t) γ V(s_{t+1})
//! TD residual δ_t = y_t - V(s_t)
//! GAE         A_t = δ_t + (1 - d_t) γλ A_{t+1},   A_T = 0
//! ```
//!
//! GAE is a reverse-time recurrence and is computed by an explicit backward scan.

/// Stateless estimator parameterised by the discount `gamma` and GAE decay `lam`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyFunction {
    pub gamma: f32,
    pub lam: f32,
}

impl Default for PolicyFunction {
    fn default() -> Self {
        Self {
            gamma: 0.99,
            lam: 0.95,
        }
    }
}

impl PolicyFunction {
    pub fn new(gamma: f32, lam: f32) -> Self {
        Self { gamma, lam }
    }

    /// One-step TD target `r + (1 - done) γ V(s')`
    #[inline]
    pub fn temporal_difference(&self, reward: f32, next_value: f32, done: f32) -> f32 {
        reward + (1.0 - done) * self.gamma * next_value
    }

    /// Discounted Monte-Carlo returns, restarted at every episode end
    pub fn monte_carlo_discounted(&self, rewards: &[f32], dones: &[f32]) -> Vec<f32> {
        assert_eq!(rewards.len(), dones.len());

        let mut returns = vec![0.0; rewards.len()];
        let mut running = 0.0;
        for t in (0..rewards.len()).rev() {
            running = rewards[t] + (1.0 - dones[t]) * self.gamma * running;
            returns[t] = running;
        }
        returns
    }

    /// Generalized Advantage Estimation over one contiguous sequence
    ///
    /// `next_values[t]` is the critic's estimate for the state reached after step
    /// `t`, so every step bootstraps from its own successor rather than from
    /// `values[t + 1]`.
    pub fn generalized_advantage_estimation(
        &self,
        values: &[f32],
        rewards: &[f32],
        next_values: &[f32],
        dones: &[f32],
    ) -> Vec<f32> {
        let n = rewards.len();
        assert_eq!(values.len(), n);
        assert_eq!(next_values.len(), n);
        assert_eq!(dones.len(), n);

        let mut advantages = vec![0.0; n];
        let mut gae = 0.0;

        for t in (0..n).rev() {
            let delta = self.temporal_difference(rewards[t], next_values[t], dones[t]) - values[t];
            gae = delta + (1.0 - dones[t]) * self.gamma * self.lam * gae;
            advantages[t] = gae;
        }

        advantages
    }
}

/// Shift to zero mean and scale by `std + 1e-6`
///
/// Uses the unbiased (n - 1) standard deviation; a single sample has std 0.
pub fn normalize_advantages(advantages: &[f32]) -> Vec<f32> {
    let n = advantages.len();
    if n == 0 {
        return Vec::new();
    }

    let mean = advantages.iter().sum::<f32>() / n as f32;
    let std = if n > 1 {
        let var = advantages.iter().map(|a| (a - mean).powi(2)).sum::<f32>() / (n - 1) as f32;
        var.sqrt()
    } else {
        0.0
    };

    advantages.iter().map(|a| (a - mean) / (std + 1e-6)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: &[f32], expected: &[f32]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-5, "expected {e}, got {a}");
        }
    }

    #[test]
    fn gae_matches_hand_computed_sequence() {
        let pf = PolicyFunction::new(0.99, 0.95);
        let adv = pf.generalized_advantage_estimation(
            &[0.0, 0.0, 0.0],
            &[1.0, 1.0, 1.0],
            &[0.0, 0.0, 0.0],
            &[0.0, 0.0, 1.0],
        );

        let a2 = 1.0;
        let a1 = 1.0 + 0.99 * 0.95 * a2;
        let a0 = 1.0 + 0.99 * 0.95 * a1;
        assert_close(&adv, &[a0, a1, a2]);
    }

    #[test]
    fn gae_with_zero_lambda_is_td_residual() {
        let pf = PolicyFunction::new(0.9, 0.0);
        let values = [0.5, 0.8, 1.0];
        let rewards = [1.0, 2.0, 3.0];
        let next_values = [0.8, 1.0, 1.2];
        let dones = [0.0, 0.0, 0.0];

        let adv = pf.generalized_advantage_estimation(&values, &rewards, &next_values, &dones);

        let expected: Vec<f32> = (0..3)
            .map(|t| rewards[t] + 0.9 * next_values[t] - values[t])
            .collect();
        assert_close(&adv, &expected);
    }

    #[test]
    fn done_masks_bootstrap_in_td_target() {
        let pf = PolicyFunction::default();
        assert_eq!(pf.temporal_difference(1.0, 1.0e6, 1.0), 1.0);
        assert!((pf.temporal_difference(1.0, 2.0, 0.0) - (1.0 + 0.99 * 2.0)).abs() < 1e-6);
    }

    #[test]
    fn done_masks_bootstrap_and_recurrence_in_gae() {
        let pf = PolicyFunction::new(0.99, 0.95);
        // A huge next value behind a terminal step must not leak into that step
        // nor into the step before it through the recurrence.
        let adv = pf.generalized_advantage_estimation(
            &[0.0, 0.0, 0.0],
            &[1.0, 1.0, 1.0],
            &[0.0, 1.0e6, 0.0],
            &[0.0, 1.0, 0.0],
        );

        assert_close(&adv[1..2], &[1.0]);
        assert_close(&adv[2..3], &[1.0]);
        assert_close(&adv[0..1], &[1.0 + 0.99 * 0.95 * 1.0]);
    }

    #[test]
    fn gae_of_empty_sequence() {
        let pf = PolicyFunction::default();
        assert!(pf.generalized_advantage_estimation(&[], &[], &[], &[]).is_empty());
    }

    #[test]
    fn monte_carlo_restarts_at_episode_end() {
        let pf = PolicyFunction::new(0.5, 0.95);
        let returns = pf.monte_carlo_discounted(&[1.0, 1.0, 1.0, 1.0], &[0.0, 1.0, 0.0, 0.0]);
        assert_close(&returns, &[1.5, 1.0, 1.5, 1.0]);
    }

    #[test]
    fn normalized_advantages_have_zero_mean_unit_std() {
        let normalized = normalize_advantages(&[1.0, 2.0, 3.0, 10.0, -4.0]);
        let n = normalized.len() as f32;

        let mean = normalized.iter().sum::<f32>() / n;
        let std = (normalized.iter().map(|a| (a - mean).powi(2)).sum::<f32>() / (n - 1.0)).sqrt();

        assert!(mean.abs() < 1e-5, "mean {mean}");
        assert!((std - 1.0).abs() < 1e-4, "std {std}");
    }

    #[test]
    fn constant_advantages_normalize_to_zero() {
        let normalized = normalize_advantages(&[3.0, 3.0, 3.0]);
        assert_close(&normalized, &[0.0, 0.0, 0.0]);
        assert!(normalized.iter().all(|a| a.is_finite()));
    }

    #[test]
    fn single_advantage_normalizes_to_zero() {
        assert_close(&normalize_advantages(&[7.0]), &[0.0]);
        assert!(normalize_advantages(&[]).is_empty());
    }
}
