//! Outer training loop
//!
//! Plays up to `n_episode` episodes through a [`Runner`], logging and recording
//! every result. The loop stops early when an episode reaches the reward
//! threshold or when the shutdown flag is raised. The flag is only checked
//! between episodes, so an in-flight update always completes.

use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    checkpoint::Checkpointable,
    env::Environment,
    error::Result,
    metrics::{EpisodeRecord, MetricsWriter},
    runner::Runner,
    traits::TrainableAgent,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum number of episodes (default: 100_000)
    pub n_episode: usize,
    /// Stop once an episode's total reward reaches this value (default: None)
    pub reward_threshold: Option<f32>,
    /// Save a checkpoint every N episodes while training (default: None)
    pub save_every: Option<usize>,
    /// Where checkpoints are written (default: "checkpoints")
    pub checkpoint_dir: PathBuf,
    /// Append per-episode JSON lines here (default: None)
    pub metrics_path: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            n_episode: 100_000,
            reward_threshold: None,
            save_every: None,
            checkpoint_dir: PathBuf::from("checkpoints"),
            metrics_path: None,
        }
    }
}

/// Raise `flag` and report whether it was already raised
///
/// A second request while the session is still finishing its episode means the
/// caller wants out immediately.
pub fn request_shutdown(flag: &AtomicBool) -> bool {
    flag.swap(true, Ordering::SeqCst)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// All `n_episode` episodes were played
    Completed,
    /// An episode reached `reward_threshold`
    RewardThreshold,
    /// The shutdown flag was raised
    Interrupted,
}

#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub episodes: usize,
    pub last_reward: Option<f32>,
    pub stop_reason: StopReason,
    pub elapsed: Duration,
}

pub struct Session<E, A> {
    runner: Runner<E, A>,
    config: SessionConfig,
    shutdown: Arc<AtomicBool>,
}

impl<E, A> Session<E, A>
where
    E: Environment,
    A: TrainableAgent<E> + Checkpointable,
{
    pub fn new(runner: Runner<E, A>, config: SessionConfig) -> Self {
        Self {
            runner,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that ends the loop before the next episode once set
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn runner(&self) -> &Runner<E, A> {
        &self.runner
    }

    pub fn into_runner(self) -> Runner<E, A> {
        self.runner
    }

    pub fn run(&mut self) -> Result<SessionSummary> {
        let start = Instant::now();
        let mut metrics = match &self.config.metrics_path {
            Some(path) => Some(MetricsWriter::append(path)?),
            None => None,
        };

        let training = self.runner.agent().is_training();
        let mut episodes = 0;
        let mut last_reward = None;
        let mut stop_reason = StopReason::Completed;

        info!(
            category = "MISC",
            training,
            n_episode = self.config.n_episode,
            "session started"
        );

        for episode in 1..=self.config.n_episode {
            if self.shutdown.load(Ordering::SeqCst) {
                stop_reason = StopReason::Interrupted;
                break;
            }

            let (total_reward, episode_length) = self.runner.run_episode()?;
            episodes = episode;
            last_reward = Some(total_reward);

            info!(
                category = "ACTOR",
                episode,
                total_reward,
                episode_length,
                "episode finished"
            );
            if let Some(writer) = metrics.as_mut() {
                writer.write(&EpisodeRecord {
                    episode,
                    total_reward,
                    episode_length,
                })?;
            }

            if training {
                if let Some(every) = self.config.save_every.filter(|&n| n > 0) {
                    if episode % every == 0 {
                        self.runner
                            .agent()
                            .save_checkpoint(&self.config.checkpoint_dir)?;
                    }
                }
            }

            if let Some(threshold) = self.config.reward_threshold {
                if total_reward >= threshold {
                    stop_reason = StopReason::RewardThreshold;
                    break;
                }
            }
        }

        if let Some(writer) = metrics.as_mut() {
            writer.flush()?;
        }

        let elapsed = start.elapsed();
        info!(
            category = "MISC",
            episodes,
            stop_reason = ?stop_reason,
            elapsed_secs = elapsed.as_secs_f64(),
            "session finished"
        );

        Ok(SessionSummary {
            episodes,
            last_reward,
            stop_reason,
            elapsed,
        })
    }
}
