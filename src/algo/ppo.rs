//! Truly PPO agent for continuous action spaces
//!
//! The agent owns two actor/critic pairs. The *current* pair is optimised; the
//! *old* pair is a frozen snapshot used as the reference policy in the ratio and
//! KL terms. The snapshot is taken once per update cycle: at construction and
//! after every [`update`](TrulyPPOAgent::update), as a wholesale parameter copy.
//!
//! # Update cycle
//!
//! 1. For `ppo_epochs` repetitions, walk the trajectory buffer in contiguous,
//!    unshuffled minibatches of `max(1, len / minibatch)` transitions
//! 2. For each minibatch, evaluate current and old networks, build the
//!    KL-gated loss and step both optimizers from a single backward pass
//! 3. Clear the buffer and copy current parameters into the old networks
//!
//! The policy is Gaussian with a learned mean (the actor output) and a fixed,
//! non-learned standard deviation.
//!
//! # Usage Example
//!
//! ```ignore
//! use truly_ppo::algo::ppo::{TrulyPPOAgent, TrulyPPOAgentConfig};
//!
//! let config = TrulyPPOAgentConfig {
//!     minibatch: 4,
//!     ..Default::default()
//! };
//!
//! let agent: TrulyPPOAgent<B, _, _, Pendulum> =
//!     TrulyPPOAgent::new(actor, critic, action_dim, config, device);
//! ```

use burn::{
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    optim::{adaptor::OptimizerAdaptor, Adam, AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    algo::{
        distribution,
        memory::{Memory, MiniBatch},
        policy_function::PolicyFunction,
        truly_ppo::{LossInputs, TrulyPPO},
    },
    env::Environment,
    error::{Result, TrulyPpoError},
    nn::MLP,
    traits::{
        to_tensor::{tile_rows, to_host_vec},
        ToTensor, TrainableAgent, TrainingMetrics,
    },
};

/// Actor network: state batch → Gaussian mean
pub trait PPOActorModel<B: AutodiffBackend>: AutodiffModule<B> {
    /// `[batch, state_dim]` → `[batch, action_dim]`
    fn forward(&self, state: Tensor<B, 2>) -> Tensor<B, 2>;
}

/// Critic network: state batch → value estimate
pub trait PPOCriticModel<B: AutodiffBackend>: AutodiffModule<B> {
    /// `[batch, state_dim]` → `[batch, 1]`
    fn forward(&self, state: Tensor<B, 2>) -> Tensor<B, 2>;
}

/// Configuration for the Truly PPO agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrulyPPOAgentConfig {
    /// KL threshold above which the penalty may apply (default: 0.03)
    pub policy_kl_range: f32,
    /// KL penalty weight (default: 5.0)
    pub policy_params: f32,
    /// Critic clip radius, `None` for plain MSE (default: Some(1.0))
    pub value_clip: Option<f32>,
    /// Entropy bonus coefficient (default: 0.0)
    pub entropy_coef: f32,
    /// Critic loss coefficient (default: 1.0)
    pub vf_loss_coef: f32,
    /// Number of minibatches per epoch (default: 32)
    pub minibatch: usize,
    /// Optimisation epochs per update cycle (default: 10)
    pub ppo_epochs: usize,
    /// Discount factor γ (default: 0.99)
    pub gamma: f32,
    /// GAE λ (default: 0.95)
    pub lam: f32,
    /// Adam learning rate for both networks (default: 3e-4)
    pub learning_rate: f64,
    /// Every entry of the fixed policy standard deviation (default: 1.0)
    pub action_std: f32,
    /// Gradient norm clipping (default: None)
    pub gradient_clip: Option<f32>,
}

impl Default for TrulyPPOAgentConfig {
    fn default() -> Self {
        Self {
            policy_kl_range: 0.03,
            policy_params: 5.0,
            value_clip: Some(1.0),
            entropy_coef: 0.0,
            vf_loss_coef: 1.0,
            minibatch: 32,
            ppo_epochs: 10,
            gamma: 0.99,
            lam: 0.95,
            learning_rate: 3e-4,
            action_std: 1.0,
            gradient_clip: None,
        }
    }
}

impl TrulyPPOAgentConfig {
    fn loss(&self) -> TrulyPPO {
        TrulyPPO {
            policy_kl_range: self.policy_kl_range,
            policy_params: self.policy_params,
            value_clip: self.value_clip,
            vf_loss_coef: self.vf_loss_coef,
            entropy_coef: self.entropy_coef,
            policy_function: PolicyFunction::new(self.gamma, self.lam),
        }
    }

    fn optimizer<B: AutodiffBackend, M: AutodiffModule<B>>(&self) -> OptimizerAdaptor<Adam, M, B> {
        AdamConfig::new()
            .with_grad_clipping(self.gradient_clip.map(GradientClippingConfig::Norm))
            .init()
    }
}

/// Truly PPO agent
///
/// Generic over:
/// - `B`: autodiff backend (e.g. `Autodiff<NdArray>`)
/// - `Actor`: network implementing [`PPOActorModel`]
/// - `Critic`: network implementing [`PPOCriticModel`]
/// - `E`: environment whose states and actions are fixed-length float vectors
pub struct TrulyPPOAgent<B, Actor, Critic, E>
where
    B: AutodiffBackend,
    E: Environment,
    Actor: AutodiffModule<B>,
    Critic: AutodiffModule<B>,
{
    pub(crate) actor: Actor,
    pub(crate) actor_old: Actor,
    pub(crate) critic: Critic,
    pub(crate) critic_old: Critic,

    pub(crate) actor_optimizer: OptimizerAdaptor<Adam, Actor, B>,
    pub(crate) critic_optimizer: OptimizerAdaptor<Adam, Critic, B>,

    memory: Memory<E::State, E::Action>,

    /// Fixed per-dimension standard deviation of the policy
    std: Vec<f32>,

    pub(crate) device: B::Device,
    pub(crate) config: TrulyPPOAgentConfig,
    loss: TrulyPPO,

    total_steps: usize,
    updates_performed: usize,
    learn_mode: bool,
}

impl<B, Actor, Critic, E> TrulyPPOAgent<B, Actor, Critic, E>
where
    B: AutodiffBackend,
    Actor: PPOActorModel<B>,
    Critic: PPOCriticModel<B>,
    E: Environment,
    Vec<E::State>: ToTensor<B, 2, Float>,
    Vec<E::Action>: ToTensor<B, 2, Float>,
    E::Action: TryFrom<Vec<f32>>,
{
    /// Create an agent in training mode
    ///
    /// The old networks start as exact copies of `actor` and `critic`.
    pub fn new(
        actor: Actor,
        critic: Critic,
        action_dim: usize,
        config: TrulyPPOAgentConfig,
        device: B::Device,
    ) -> Self {
        let actor_old = actor.clone().no_grad();
        let critic_old = critic.clone().no_grad();

        Self {
            actor,
            actor_old,
            critic,
            critic_old,
            actor_optimizer: config.optimizer(),
            critic_optimizer: config.optimizer(),
            memory: Memory::new(),
            std: vec![config.action_std; action_dim],
            device,
            loss: config.loss(),
            config,
            total_steps: 0,
            updates_performed: 0,
            learn_mode: true,
        }
    }

    pub fn config(&self) -> &TrulyPPOAgentConfig {
        &self.config
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn actor_old(&self) -> &Actor {
        &self.actor_old
    }

    pub fn critic(&self) -> &Critic {
        &self.critic
    }

    pub fn critic_old(&self) -> &Critic {
        &self.critic_old
    }

    pub fn action_dim(&self) -> usize {
        self.std.len()
    }

    /// Transitions recorded since construction
    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Completed update cycles
    pub fn updates_performed(&self) -> usize {
        self.updates_performed
    }

    /// Minibatch size for the current buffer: `max(1, len / minibatch)`
    pub fn batch_size(&self) -> usize {
        (self.memory.len() / self.config.minibatch.max(1)).max(1)
    }

    /// Copy the current networks into the old networks
    pub fn sync_old_networks(&mut self) {
        self.actor_old = self.actor.clone().no_grad();
        self.critic_old = self.critic.clone().no_grad();
    }

    /// Run every epoch over the buffer without clearing it or syncing the old networks
    pub fn optimize_epochs(&mut self) -> Result<TrainingMetrics> {
        let mut metrics = TrainingMetrics::default();
        if self.memory.is_empty() {
            return Ok(metrics);
        }

        let batch_size = self.batch_size();
        // Moved out while the networks are replaced after every step.
        let memory = std::mem::take(&mut self.memory);

        let result = self.run_epochs(&memory, batch_size, &mut metrics);
        self.memory = memory;
        result?;

        if metrics.n_updates > 0 {
            let n = metrics.n_updates as f32;
            metrics.policy_loss /= n;
            metrics.value_loss /= n;
            metrics.entropy /= n;
            metrics.mean_kl /= n;
            metrics.penalized_fraction /= n;
        }

        Ok(metrics)
    }

    fn run_epochs(
        &mut self,
        memory: &Memory<E::State, E::Action>,
        batch_size: usize,
        metrics: &mut TrainingMetrics,
    ) -> Result<()> {
        for _epoch in 0..self.config.ppo_epochs {
            for batch in memory.iter_batches(batch_size) {
                self.train_on_batch(&batch, metrics)?;
            }
        }
        Ok(())
    }

    fn train_on_batch(
        &mut self,
        batch: &MiniBatch<'_, E::State, E::Action>,
        metrics: &mut TrainingMetrics,
    ) -> Result<()> {
        let n = batch.len();
        let states: Tensor<B, 2> = batch.states.to_vec().to_tensor(&self.device);
        let next_states: Tensor<B, 2> = batch.next_states.to_vec().to_tensor(&self.device);
        let actions: Tensor<B, 2> = batch.actions.to_vec().to_tensor(&self.device);

        let action_mean = self.actor.forward(states.clone());
        self.check_action_dim(action_mean.dims()[1])?;
        let std = tile_rows::<B>(&self.std, n, &self.device);

        let inputs = LossInputs {
            action_mean,
            action_std: std.clone(),
            old_action_mean: self.actor_old.forward(states.clone()),
            old_action_std: std,
            values: self.critic.forward(states.clone()),
            old_values: self.critic_old.forward(states),
            next_values: self.critic.forward(next_states),
            actions,
            rewards: batch.rewards.to_vec(),
            dones: batch.done_mask(),
        };

        let parts = self.loss.compute_loss(inputs)?;

        metrics.policy_loss += parts.policy_loss.into_scalar().elem::<f32>();
        metrics.value_loss += parts.critic_loss.into_scalar().elem::<f32>();
        metrics.entropy += parts.entropy.into_scalar().elem::<f32>();
        metrics.mean_kl += parts.mean_kl.into_scalar().elem::<f32>();
        metrics.penalized_fraction += parts.penalized_fraction.into_scalar().elem::<f32>();
        metrics.n_updates += 1;

        let mut grads = parts.loss.backward();
        let actor_grads = GradientsParams::from_module(&mut grads, &self.actor);
        let critic_grads = GradientsParams::from_module(&mut grads, &self.critic);

        let lr = self.config.learning_rate;
        self.actor = self
            .actor_optimizer
            .step(lr, self.actor.clone(), actor_grads);
        self.critic = self
            .critic_optimizer
            .step(lr, self.critic.clone(), critic_grads);

        Ok(())
    }

    fn check_action_dim(&self, actual: usize) -> Result<()> {
        if actual != self.std.len() {
            return Err(TrulyPpoError::DimensionMismatch {
                what: "actor output",
                expected: self.std.len(),
                actual,
            });
        }
        Ok(())
    }
}

impl<B, Actor, Critic, E> TrainableAgent<E> for TrulyPPOAgent<B, Actor, Critic, E>
where
    B: AutodiffBackend,
    Actor: PPOActorModel<B>,
    Critic: PPOCriticModel<B>,
    E: Environment,
    Vec<E::State>: ToTensor<B, 2, Float>,
    Vec<E::Action>: ToTensor<B, 2, Float>,
    E::Action: TryFrom<Vec<f32>>,
{
    fn act(&self, state: &E::State) -> Result<E::Action> {
        let state: Tensor<B, 2> = vec![state.clone()].to_tensor(&self.device);
        let mean = self.actor.forward(state).detach();
        self.check_action_dim(mean.dims()[1])?;

        let action = if self.learn_mode {
            let std = tile_rows::<B>(&self.std, 1, &self.device);
            distribution::sample(mean, std)
        } else {
            mean
        };

        let values = to_host_vec(action)?;
        let actual = values.len();
        <E::Action as TryFrom<Vec<f32>>>::try_from(values).map_err(|_| TrulyPpoError::DimensionMismatch {
            what: "action",
            expected: self.std.len(),
            actual,
        })
    }

    fn save_transition(
        &mut self,
        state: E::State,
        action: E::Action,
        reward: f32,
        done: bool,
        next_state: E::State,
    ) {
        self.memory.record(state, action, reward, done, next_state);
        self.total_steps += 1;
    }

    /// Optimise, clear the buffer, then sync the old networks
    fn update(&mut self) -> Result<TrainingMetrics> {
        let transitions = self.memory.len();
        let metrics = self.optimize_epochs()?;

        self.memory.clear();
        self.sync_old_networks();
        self.updates_performed += 1;

        debug!(
            category = "TRAINER",
            update = self.updates_performed,
            transitions,
            gradient_steps = metrics.n_updates,
            policy_loss = metrics.policy_loss,
            value_loss = metrics.value_loss,
            entropy = metrics.entropy,
            mean_kl = metrics.mean_kl,
            penalized_fraction = metrics.penalized_fraction,
            "update cycle finished"
        );

        Ok(metrics)
    }

    fn memory_len(&self) -> usize {
        self.memory.len()
    }

    fn is_training(&self) -> bool {
        self.learn_mode
    }

    fn eval(&mut self) {
        self.learn_mode = false;
    }

    fn train(&mut self) {
        self.learn_mode = true;
    }
}

/// `[batch, state_dim]` → `[batch, action_dim]`
impl<B: AutodiffBackend> PPOActorModel<B> for MLP<B> {
    fn forward(&self, state: Tensor<B, 2>) -> Tensor<B, 2> {
        MLP::forward(self, state)
    }
}

/// `[batch, state_dim]` → `[batch, 1]`
impl<B: AutodiffBackend> PPOCriticModel<B> for MLP<B> {
    fn forward(&self, state: Tensor<B, 2>) -> Tensor<B, 2> {
        MLP::forward(self, state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        env::{Report, Step},
        nn::MLPConfig,
    };
    use burn::backend::{
        ndarray::{NdArray, NdArrayDevice},
        Autodiff,
    };

    type B = Autodiff<NdArray>;

    struct Line;

    impl Environment for Line {
        type State = [f32; 2];
        type Action = [f32; 1];

        fn reset(&mut self) -> Self::State {
            [0.0, 0.0]
        }

        fn step(&mut self, _action: Self::Action) -> Step<Self::State> {
            Step {
                next_state: [0.0, 0.0],
                reward: 1.0,
                done: false,
                info: Report::default(),
            }
        }

        fn state_dim(&self) -> usize {
            2
        }
    }

    type Agent = TrulyPPOAgent<B, MLP<B>, MLP<B>, Line>;

    fn agent(config: TrulyPPOAgentConfig) -> Agent {
        let device = NdArrayDevice::default();
        let actor = MLPConfig::new(2, vec![8], 1)
            .with_use_tanh_output(true)
            .init::<B>(&device);
        let critic = MLPConfig::new(2, vec![8], 1).init::<B>(&device);
        TrulyPPOAgent::new(actor, critic, 1, config, device)
    }

    fn fill(agent: &mut Agent, n: usize) {
        for i in 0..n {
            let x = i as f32 / n as f32;
            let state = [x, 1.0 - x];
            let action = [if i % 2 == 0 { 0.5 } else { -0.5 }];
            agent.save_transition(state, action, (i % 3) as f32, i % 5 == 4, [x + 0.1, 0.9 - x]);
        }
    }

    fn inputs() -> Tensor<B, 2> {
        Tensor::from_floats([[0.1, 0.2], [0.7, -0.3], [-1.0, 0.5]], &NdArrayDevice::default())
    }

    fn outputs<M: PPOActorModel<B>>(model: &M) -> Vec<f32> {
        to_host_vec(model.forward(inputs())).unwrap()
    }

    fn values<M: PPOCriticModel<B>>(model: &M) -> Vec<f32> {
        to_host_vec(model.forward(inputs())).unwrap()
    }

    fn config() -> TrulyPPOAgentConfig {
        TrulyPPOAgentConfig {
            minibatch: 4,
            ppo_epochs: 3,
            learning_rate: 1e-2,
            ..Default::default()
        }
    }

    #[test]
    fn default_config_matches_reference_run() {
        let config = TrulyPPOAgentConfig::default();
        assert_eq!(config.policy_kl_range, 0.03);
        assert_eq!(config.policy_params, 5.0);
        assert_eq!(config.value_clip, Some(1.0));
        assert_eq!(config.minibatch, 32);
        assert_eq!(config.ppo_epochs, 10);
        assert_eq!(config.gradient_clip, None);
    }

    #[test]
    fn config_roundtrips_through_json_with_defaults() {
        let config: TrulyPPOAgentConfig = serde_json::from_str(r#"{"minibatch": 4}"#).unwrap();
        assert_eq!(config.minibatch, 4);
        assert_eq!(config.gamma, 0.99);
    }

    #[test]
    fn new_agent_starts_synced() {
        let agent = agent(config());
        assert_eq!(outputs(agent.actor()), outputs(agent.actor_old()));
        assert_eq!(values(agent.critic()), values(agent.critic_old()));
        assert!(agent.is_training());
    }

    #[test]
    fn batch_size_keeps_at_least_one_sample() {
        let mut agent = agent(config());
        fill(&mut agent, 3);
        assert_eq!(agent.batch_size(), 1);

        agent.memory.clear();
        fill(&mut agent, 20);
        assert_eq!(agent.batch_size(), 5);
    }

    #[test]
    fn old_networks_stay_frozen_during_optimisation() {
        let mut agent = agent(config());
        let actor_before = outputs(agent.actor_old());
        let critic_before = values(agent.critic_old());
        let current_before = outputs(agent.actor());

        fill(&mut agent, 16);
        let metrics = agent.optimize_epochs().unwrap();

        // 3 epochs × 4 minibatches of 4
        assert_eq!(metrics.n_updates, 12);
        assert_eq!(outputs(agent.actor_old()), actor_before);
        assert_eq!(values(agent.critic_old()), critic_before);
        assert_ne!(outputs(agent.actor()), current_before);
        assert_eq!(agent.memory_len(), 16);
    }

    #[test]
    fn update_clears_buffer_and_syncs_old_networks() {
        let mut agent = agent(config());
        fill(&mut agent, 16);

        let metrics = agent.update().unwrap();

        assert_eq!(metrics.n_updates, 12);
        assert!(metrics.policy_loss.is_finite());
        assert!(metrics.value_loss.is_finite());
        assert_eq!(agent.memory_len(), 0);
        assert_eq!(agent.updates_performed(), 1);
        assert_eq!(agent.total_steps(), 16);
        assert_eq!(outputs(agent.actor()), outputs(agent.actor_old()));
        assert_eq!(values(agent.critic()), values(agent.critic_old()));

        agent.save_transition([0.0, 0.0], [0.0], 1.0, false, [0.0, 0.0]);
        assert_eq!(agent.memory_len(), 1);
    }

    #[test]
    fn update_on_empty_buffer_is_a_noop_step() {
        let mut agent = agent(config());
        let before = outputs(agent.actor());

        let metrics = agent.update().unwrap();

        assert_eq!(metrics, TrainingMetrics::default());
        assert_eq!(outputs(agent.actor()), before);
    }

    #[test]
    fn eval_mode_returns_the_mean() {
        let mut agent = agent(config());
        agent.eval();
        assert!(!agent.is_training());

        let state = [0.3, -0.4];
        let a = agent.act(&state).unwrap();
        let b = agent.act(&state).unwrap();
        assert_eq!(a, b);

        let mean = to_host_vec(
            agent
                .actor()
                .forward::<2>(Tensor::from_floats([state], &NdArrayDevice::default())),
        )
        .unwrap();
        assert_eq!(a.to_vec(), mean);
    }

    #[test]
    fn training_mode_samples_around_the_mean() {
        let mut agent = agent(TrulyPPOAgentConfig {
            action_std: 1.0,
            ..config()
        });
        let state = [0.3, -0.4];
        let samples: Vec<f32> = (0..16).map(|_| agent.act(&state).unwrap()[0]).collect();
        assert!(samples.windows(2).any(|w| w[0] != w[1]));

        agent.train();
        assert!(agent.is_training());
    }

    #[test]
    fn mismatched_actor_output_is_a_dimension_error() {
        let device = NdArrayDevice::default();
        let actor = MLPConfig::new(2, vec![4], 3).init::<B>(&device);
        let critic = MLPConfig::new(2, vec![4], 1).init::<B>(&device);
        let agent: Agent = TrulyPPOAgent::new(actor, critic, 1, config(), device);

        match agent.act(&[0.0, 0.0]) {
            Err(TrulyPpoError::DimensionMismatch { expected, actual, .. }) => {
                assert_eq!((expected, actual), (1, 3));
            }
            other => panic!("expected a dimension mismatch, got {other:?}"),
        }
    }
}
