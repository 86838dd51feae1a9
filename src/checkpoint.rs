//! Agent checkpoints
//!
//! A checkpoint directory holds the current actor and critic parameters, both
//! optimizer states and the agent configuration:
//!
//! ```text
//! <dir>/actor_model.bin
//! <dir>/actor_optimizer.bin
//! <dir>/critic_model.bin
//! <dir>/critic_optimizer.bin
//! <dir>/config.json
//! ```
//!
//! Files are written into `<dir>/.staging/` first and renamed into place, so an
//! interrupted save never leaves a truncated artifact under its final name.

use std::{
    fs,
    path::{Path, PathBuf},
};

use burn::{
    optim::Optimizer,
    record::{BinFileRecorder, FullPrecisionSettings, Recorder},
    tensor::backend::AutodiffBackend,
};
use tracing::info;

use crate::{
    algo::ppo::{PPOActorModel, PPOCriticModel, TrulyPPOAgent, TrulyPPOAgentConfig},
    env::Environment,
    error::{Result, TrulyPpoError},
    traits::ToTensor,
};

const ACTOR_MODEL: &str = "actor_model";
const ACTOR_OPTIMIZER: &str = "actor_optimizer";
const CRITIC_MODEL: &str = "critic_model";
const CRITIC_OPTIMIZER: &str = "critic_optimizer";
const CONFIG_FILE: &str = "config.json";
const STAGING_DIR: &str = ".staging";

/// Extension appended by [`BinFileRecorder`]
const RECORD_EXT: &str = "bin";

type CheckpointRecorder = BinFileRecorder<FullPrecisionSettings>;

/// Agents whose state can be written to a checkpoint directory
pub trait Checkpointable {
    fn save_checkpoint(&self, dir: &Path) -> Result<()>;
}

impl<B, Actor, Critic, E> Checkpointable for TrulyPPOAgent<B, Actor, Critic, E>
where
    B: AutodiffBackend,
    Actor: PPOActorModel<B>,
    Critic: PPOCriticModel<B>,
    E: Environment,
{
    fn save_checkpoint(&self, dir: &Path) -> Result<()> {
        save(self, dir)
    }
}

fn record_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.{RECORD_EXT}"))
}

fn recorder_error(what: &str, e: impl std::fmt::Display) -> TrulyPpoError {
    TrulyPpoError::Checkpoint(format!("{what}: {e}"))
}

/// Write every artifact of `agent` into `dir`
pub fn save<B, Actor, Critic, E>(agent: &TrulyPPOAgent<B, Actor, Critic, E>, dir: &Path) -> Result<()>
where
    B: AutodiffBackend,
    Actor: PPOActorModel<B>,
    Critic: PPOCriticModel<B>,
    E: Environment,
{
    let staging = dir.join(STAGING_DIR);
    fs::create_dir_all(&staging)?;
    let recorder = CheckpointRecorder::new();

    agent
        .actor
        .clone()
        .save_file(staging.join(ACTOR_MODEL), &recorder)
        .map_err(|e| recorder_error("failed to save actor", e))?;
    agent
        .critic
        .clone()
        .save_file(staging.join(CRITIC_MODEL), &recorder)
        .map_err(|e| recorder_error("failed to save critic", e))?;
    Recorder::<B>::record(
        &recorder,
        agent.actor_optimizer.to_record(),
        staging.join(ACTOR_OPTIMIZER),
    )
    .map_err(|e| recorder_error("failed to save actor optimizer", e))?;
    Recorder::<B>::record(
        &recorder,
        agent.critic_optimizer.to_record(),
        staging.join(CRITIC_OPTIMIZER),
    )
    .map_err(|e| recorder_error("failed to save critic optimizer", e))?;
    fs::write(
        staging.join(CONFIG_FILE),
        serde_json::to_string_pretty(&agent.config)?,
    )?;

    for name in [ACTOR_MODEL, ACTOR_OPTIMIZER, CRITIC_MODEL, CRITIC_OPTIMIZER] {
        fs::rename(record_path(&staging, name), record_path(dir, name))?;
    }
    fs::rename(staging.join(CONFIG_FILE), dir.join(CONFIG_FILE))?;
    fs::remove_dir(&staging)?;

    info!(category = "MISC", dir = %dir.display(), "checkpoint saved");
    Ok(())
}

/// Read the configuration stored next to a checkpoint
pub fn load_config(dir: &Path) -> Result<TrulyPPOAgentConfig> {
    let path = dir.join(CONFIG_FILE);
    if !path.exists() {
        return Err(TrulyPpoError::Checkpoint(format!(
            "missing {}",
            path.display()
        )));
    }
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

/// Restore parameters and optimizer state from `dir`, then sync the old networks
///
/// Every artifact is checked before anything is loaded, so a missing file
/// leaves the agent untouched.
pub fn load<B, Actor, Critic, E>(agent: &mut TrulyPPOAgent<B, Actor, Critic, E>, dir: &Path) -> Result<()>
where
    B: AutodiffBackend,
    Actor: PPOActorModel<B>,
    Critic: PPOCriticModel<B>,
    E: Environment,
    Vec<E::State>: ToTensor<B, 2, burn::tensor::Float>,
    Vec<E::Action>: ToTensor<B, 2, burn::tensor::Float>,
    E::Action: TryFrom<Vec<f32>>,
{
    for name in [ACTOR_MODEL, ACTOR_OPTIMIZER, CRITIC_MODEL, CRITIC_OPTIMIZER] {
        let path = record_path(dir, name);
        if !path.exists() {
            return Err(TrulyPpoError::Checkpoint(format!(
                "missing {}",
                path.display()
            )));
        }
    }

    let recorder = CheckpointRecorder::new();
    let device = agent.device.clone();

    let actor = agent
        .actor
        .clone()
        .load_file(dir.join(ACTOR_MODEL), &recorder, &device)
        .map_err(|e| recorder_error("failed to load actor", e))?;
    let critic = agent
        .critic
        .clone()
        .load_file(dir.join(CRITIC_MODEL), &recorder, &device)
        .map_err(|e| recorder_error("failed to load critic", e))?;
    let actor_record = Recorder::<B>::load(&recorder, dir.join(ACTOR_OPTIMIZER), &device)
        .map_err(|e| recorder_error("failed to load actor optimizer", e))?;
    let critic_record = Recorder::<B>::load(&recorder, dir.join(CRITIC_OPTIMIZER), &device)
        .map_err(|e| recorder_error("failed to load critic optimizer", e))?;

    agent.actor = actor;
    agent.critic = critic;
    agent.actor_optimizer = agent.actor_optimizer.clone().load_record(actor_record);
    agent.critic_optimizer = agent.critic_optimizer.clone().load_record(critic_record);
    agent.sync_old_networks();

    info!(category = "MISC", dir = %dir.display(), "checkpoint loaded");
    Ok(())
}
