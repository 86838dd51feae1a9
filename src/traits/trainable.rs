//! Trainable agent trait used by the runner
//!
//! The runner only needs to ask an agent for an action, hand it transitions and
//! tell it when to update. Keeping that behind a trait lets the rollout loop be
//! written once for any agent and any environment.

use crate::{env::Environment, error::Result};

/// Metrics averaged over every gradient step of one update cycle
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrainingMetrics {
    /// KL-gated surrogate objective (maximised)
    pub policy_loss: f32,

    /// Critic loss before the `vf_loss_coef` scaling
    pub value_loss: f32,

    /// Mean differential entropy of the current policy
    pub entropy: f32,

    /// Mean KL(old ‖ current) over every action dimension of every sample
    pub mean_kl: f32,

    /// Fraction of per-dimension samples that took the KL-penalised branch
    pub penalized_fraction: f32,

    /// Number of gradient steps performed
    pub n_updates: usize,
}

/// An agent that can be driven by [`Runner`](crate::runner::Runner)
pub trait TrainableAgent<E: Environment> {
    /// Choose an action for `state`
    ///
    /// Stochastic in training mode, the policy mean in evaluation mode.
    fn act(&self, state: &E::State) -> Result<E::Action>;

    /// Record one transition for the next update cycle
    fn save_transition(
        &mut self,
        state: E::State,
        action: E::Action,
        reward: f32,
        done: bool,
        next_state: E::State,
    );

    /// Optimise on everything recorded since the last update, then discard it
    fn update(&mut self) -> Result<TrainingMetrics>;

    /// Number of transitions waiting for the next update
    fn memory_len(&self) -> usize;

    /// Whether the agent explores and learns (`true`) or acts greedily (`false`)
    fn is_training(&self) -> bool;

    /// Make agent act deterministically and stop learning
    fn eval(&mut self);

    /// Make agent explore and learn
    fn train(&mut self);
}
