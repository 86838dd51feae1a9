use std::{path::PathBuf, process};

use anyhow::{Context, Result};
use burn::backend::{
    ndarray::{NdArray, NdArrayDevice},
    Autodiff,
};
use clap::Parser;
use tracing::{info, warn};

use truly_ppo::{
    algo::ppo::{TrulyPPOAgent, TrulyPPOAgentConfig},
    checkpoint,
    env::{ContinuousActionSpace, Environment},
    gym::Pendulum,
    nn::{MLPConfig, MLP},
    runner::{Runner, RunnerConfig},
    session::{request_shutdown, Session, SessionConfig},
    telemetry,
    traits::TrainableAgent,
};

type Backend = Autodiff<NdArray>;

#[derive(Parser, Debug, Clone)]
#[command(name = "train_pendulum", about = "Truly PPO on the pendulum swing-up task")]
struct Args {
    /// Run the deterministic policy without learning
    #[arg(long)]
    eval: bool,

    /// Restore actor, critic and optimizer state from this checkpoint directory
    #[arg(long)]
    load: Option<PathBuf>,

    /// Episodes to play
    #[arg(long, default_value_t = 100_000)]
    n_episode: usize,

    /// Steps per pendulum episode
    #[arg(long, default_value_t = 200)]
    horizon: usize,

    /// Update every N recorded steps; 0 updates at the end of every episode
    #[arg(long, default_value_t = 1024)]
    n_update: usize,

    /// Stop once an episode's total reward reaches this value
    #[arg(long)]
    reward_threshold: Option<f32>,

    /// Save a checkpoint every N episodes
    #[arg(long)]
    save_every: Option<usize>,

    #[arg(long, default_value = "checkpoints/pendulum")]
    checkpoint_dir: PathBuf,

    /// Append per-episode JSON lines to this file
    #[arg(long)]
    metrics: Option<PathBuf>,

    #[arg(long, default_value_t = 0.03)]
    policy_kl_range: f32,

    #[arg(long, default_value_t = 5.0)]
    policy_params: f32,

    /// Critic clip radius; a negative value disables clipping
    #[arg(long, default_value_t = 1.0)]
    value_clip: f32,

    #[arg(long, default_value_t = 0.0)]
    entropy_coef: f32,

    #[arg(long, default_value_t = 1.0)]
    vf_loss_coef: f32,

    /// Minibatches per epoch
    #[arg(long, default_value_t = 32)]
    minibatch: usize,

    #[arg(long, default_value_t = 10)]
    ppo_epochs: usize,

    #[arg(long, default_value_t = 0.99)]
    gamma: f32,

    #[arg(long, default_value_t = 0.95)]
    lam: f32,

    #[arg(long, default_value_t = 3e-4)]
    learning_rate: f64,

    #[arg(long, default_value_t = 1.0)]
    action_std: f32,

    /// Global gradient norm clip
    #[arg(long)]
    max_grad_norm: Option<f32>,

    /// Tracing filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log: String,
}

impl Args {
    fn agent_config(&self) -> TrulyPPOAgentConfig {
        TrulyPPOAgentConfig {
            policy_kl_range: self.policy_kl_range,
            policy_params: self.policy_params,
            value_clip: (self.value_clip >= 0.0).then_some(self.value_clip),
            entropy_coef: self.entropy_coef,
            vf_loss_coef: self.vf_loss_coef,
            minibatch: self.minibatch,
            ppo_epochs: self.ppo_epochs,
            gamma: self.gamma,
            lam: self.lam,
            learning_rate: self.learning_rate,
            action_std: self.action_std,
            gradient_clip: self.max_grad_norm,
        }
    }

    fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            n_update: (self.n_update > 0).then_some(self.n_update),
            ..Default::default()
        }
    }

    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            n_episode: self.n_episode,
            reward_threshold: self.reward_threshold,
            save_every: self.save_every,
            checkpoint_dir: self.checkpoint_dir.clone(),
            metrics_path: self.metrics.clone(),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    telemetry::init(&args.log);

    let device = NdArrayDevice::default();
    let env = Pendulum::new(args.horizon);
    let state_dim = env.state_dim();
    let action_dim = env.action_dim();

    let actor: MLP<Backend> = MLPConfig::new(state_dim, vec![256, 64], action_dim)
        .with_use_tanh_output(true)
        .init(&device);
    let critic: MLP<Backend> = MLPConfig::new(state_dim, vec![256, 64], 1).init(&device);

    let mut agent: TrulyPPOAgent<Backend, _, _, Pendulum> =
        TrulyPPOAgent::new(actor, critic, action_dim, args.agent_config(), device);

    if let Some(dir) = &args.load {
        checkpoint::load(&mut agent, dir)
            .with_context(|| format!("failed to load checkpoint from {}", dir.display()))?;
    }
    if args.eval {
        agent.eval();
    }

    let runner = Runner::new(env, agent, args.runner_config());
    let mut session = Session::new(runner, args.session_config());

    let shutdown = session.shutdown_flag();
    ctrlc::set_handler(move || {
        if request_shutdown(&shutdown) {
            warn!(category = "MISC", "second interrupt, exiting without saving");
            process::exit(130);
        }
        info!(
            category = "MISC",
            "interrupt received, stopping after the current episode; press Ctrl-C again to exit now"
        );
    })
    .context("failed to install the interrupt handler")?;

    let summary = session.run().context("training session failed")?;

    info!(
        category = "MISC",
        episodes = summary.episodes,
        stop_reason = ?summary.stop_reason,
        "training stopped after {:.2}s",
        summary.elapsed.as_secs_f64()
    );
    Ok(())
}
