//! Episode rollout
//!
//! The runner owns an environment and an agent and plays one episode per
//! [`Runner::run_episode`] call. Updates are triggered either every `n_update`
//! recorded steps, counted across episodes and possibly mid-episode, or once at
//! the end of every episode when `n_update` is `None`.

use serde::{Deserialize, Serialize};

use crate::{
    env::Environment,
    error::Result,
    traits::{TrainableAgent, TrainingMetrics},
};

/// Rollout and update-trigger settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Update every this many recorded steps; `None` or `Some(0)` updates at episode end (default: Some(1024))
    pub n_update: Option<usize>,
    /// Hard cap on episode length (default: 10_000)
    pub max_episode_steps: usize,
}

impl RunnerConfig {
    /// Step count that triggers an update, if updates are step-driven
    pub fn step_threshold(&self) -> Option<usize> {
        self.n_update.filter(|&n| n > 0)
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            n_update: Some(1024),
            max_episode_steps: 10_000,
        }
    }
}

pub struct Runner<E, A> {
    env: E,
    agent: A,
    config: RunnerConfig,
    /// Steps recorded since the last step-triggered update
    t_updates: usize,
    updates: usize,
    last_metrics: Option<TrainingMetrics>,
}

impl<E, A> Runner<E, A>
where
    E: Environment,
    A: TrainableAgent<E>,
{
    pub fn new(env: E, agent: A, config: RunnerConfig) -> Self {
        Self {
            env,
            agent,
            config,
            t_updates: 0,
            updates: 0,
            last_metrics: None,
        }
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn agent(&self) -> &A {
        &self.agent
    }

    pub fn agent_mut(&mut self) -> &mut A {
        &mut self.agent
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Updates triggered by this runner
    pub fn updates(&self) -> usize {
        self.updates
    }

    /// Metrics of the most recent update, if any
    pub fn last_metrics(&self) -> Option<&TrainingMetrics> {
        self.last_metrics.as_ref()
    }

    /// Play one episode and return `(total_reward, episode_length)`
    ///
    /// Transitions are recorded and updates triggered only in training mode.
    pub fn run_episode(&mut self) -> Result<(f32, usize)> {
        let training = self.agent.is_training();
        let mut state = self.env.reset();
        let mut total_reward = 0.0;
        let mut episode_length = 0;

        while episode_length < self.config.max_episode_steps {
            let action = self.agent.act(&state)?;
            let step = self.env.step(action.clone());

            total_reward += step.reward;
            episode_length += 1;

            if training {
                self.agent.save_transition(
                    state,
                    action,
                    step.reward,
                    step.done,
                    step.next_state.clone(),
                );
            }
            state = step.next_state;

            if training {
                if let Some(n_update) = self.config.step_threshold() {
                    self.t_updates += 1;
                    if self.t_updates == n_update {
                        self.update()?;
                        self.t_updates = 0;
                    }
                }
            }

            if step.done {
                break;
            }
        }

        if training && self.config.step_threshold().is_none() {
            self.update()?;
        }

        Ok((total_reward, episode_length))
    }

    fn update(&mut self) -> Result<()> {
        let metrics = self.agent.update()?;
        self.updates += 1;
        self.last_metrics = Some(metrics);
        Ok(())
    }

    pub fn into_parts(self) -> (E, A) {
        (self.env, self.agent)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        algo::ppo::{TrulyPPOAgent, TrulyPPOAgentConfig},
        env::{Report, Step},
        nn::{MLPConfig, MLP},
    };
    use burn::backend::{
        ndarray::{NdArray, NdArrayDevice},
        Autodiff,
    };

    pub(crate) type B = Autodiff<NdArray>;

    /// Deterministic 5-step episodes, reward 1.0 per step
    #[derive(Debug, Clone, Default)]
    pub(crate) struct Scripted {
        pub t: usize,
        pub resets: usize,
        pub actions: Vec<[f32; 1]>,
    }

    pub(crate) const EPISODE_LENGTH: usize = 5;

    impl Environment for Scripted {
        type State = [f32; 2];
        type Action = [f32; 1];

        fn reset(&mut self) -> Self::State {
            self.t = 0;
            self.resets += 1;
            [0.0, 1.0]
        }

        fn step(&mut self, action: Self::Action) -> Step<Self::State> {
            self.t += 1;
            self.actions.push(action);
            let x = self.t as f32 / EPISODE_LENGTH as f32;
            Step {
                next_state: [x, 1.0 - x],
                reward: 1.0,
                done: self.t == EPISODE_LENGTH,
                info: Report::default(),
            }
        }

        fn state_dim(&self) -> usize {
            2
        }
    }

    pub(crate) type ScriptedAgent = TrulyPPOAgent<B, MLP<B>, MLP<B>, Scripted>;

    pub(crate) fn scripted_agent() -> ScriptedAgent {
        let device = NdArrayDevice::default();
        let actor = MLPConfig::new(2, vec![8], 1)
            .with_use_tanh_output(true)
            .init::<B>(&device);
        let critic = MLPConfig::new(2, vec![8], 1).init::<B>(&device);
        let config = TrulyPPOAgentConfig {
            minibatch: 2,
            ppo_epochs: 2,
            ..Default::default()
        };
        TrulyPPOAgent::new(actor, critic, 1, config, device)
    }

    #[test]
    fn episode_end_update_when_no_step_threshold() {
        let config = RunnerConfig {
            n_update: None,
            ..Default::default()
        };
        let mut runner = Runner::new(Scripted::default(), scripted_agent(), config);

        let (total_reward, episode_length) = runner.run_episode().unwrap();

        assert_eq!(total_reward, 5.0);
        assert_eq!(episode_length, 5);
        assert_eq!(runner.updates(), 1);
        assert_eq!(runner.agent().updates_performed(), 1);
        assert_eq!(runner.agent().memory_len(), 0);
        assert_eq!(runner.agent().total_steps(), 5);
        assert!(runner.last_metrics().is_some());
    }

    #[test]
    fn step_threshold_counts_across_episodes() {
        let config = RunnerConfig {
            n_update: Some(3),
            ..Default::default()
        };
        let mut runner = Runner::new(Scripted::default(), scripted_agent(), config);

        runner.run_episode().unwrap();
        // Fired at step 3; steps 4 and 5 are waiting.
        assert_eq!(runner.updates(), 1);
        assert_eq!(runner.agent().memory_len(), 2);

        runner.run_episode().unwrap();
        // Fired at global steps 6 and 9.
        assert_eq!(runner.updates(), 3);
        assert_eq!(runner.agent().memory_len(), 1);
        assert_eq!(runner.env().resets, 2);
    }

    #[test]
    fn episode_length_is_capped() {
        let config = RunnerConfig {
            n_update: None,
            max_episode_steps: 3,
        };
        let mut runner = Runner::new(Scripted::default(), scripted_agent(), config);

        let (total_reward, episode_length) = runner.run_episode().unwrap();

        assert_eq!(episode_length, 3);
        assert_eq!(total_reward, 3.0);
        assert_eq!(runner.updates(), 1);
        assert_eq!(runner.agent().memory_len(), 0);
    }

    #[test]
    fn zero_step_threshold_updates_at_episode_end() {
        let config = RunnerConfig {
            n_update: Some(0),
            ..Default::default()
        };
        assert_eq!(config.step_threshold(), None);
        let mut runner = Runner::new(Scripted::default(), scripted_agent(), config);

        let (_, episode_length) = runner.run_episode().unwrap();

        assert_eq!(episode_length, 5);
        assert_eq!(runner.updates(), 1);
        assert_eq!(runner.agent().memory_len(), 0);
    }

    #[test]
    fn evaluation_records_nothing() {
        let mut agent = scripted_agent();
        agent.eval();
        let mut runner = Runner::new(
            Scripted::default(),
            agent,
            RunnerConfig {
                n_update: Some(2),
                ..Default::default()
            },
        );

        let (total_reward, episode_length) = runner.run_episode().unwrap();

        assert_eq!((total_reward, episode_length), (5.0, 5));
        assert_eq!(runner.updates(), 0);
        assert_eq!(runner.agent().memory_len(), 0);
        assert_eq!(runner.agent().total_steps(), 0);

        // Deterministic policy: the same states produce the same actions.
        runner.run_episode().unwrap();
        let (env, _) = runner.into_parts();
        assert_eq!(env.actions[..5], env.actions[5..]);
    }
}
