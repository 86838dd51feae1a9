//! Truly PPO for continuous action spaces
//!
//! A single-process, on-policy actor-critic trainer. The policy is a Gaussian
//! with a learned mean and a fixed standard deviation, and the trust region is
//! enforced by a KL-divergence gate on the surrogate objective instead of the
//! usual ratio clip.
//!
//! The pieces, leaves first:
//!
//! - [`algo::memory`]: on-policy trajectory buffer
//! - [`algo::distribution`]: diagonal Gaussian helpers (sample, log-prob, entropy, KL)
//! - [`algo::policy_function`]: TD targets, GAE and discounted returns
//! - [`algo::truly_ppo`]: the KL-gated surrogate loss
//! - [`algo::ppo`]: the agent owning current and old actor/critic pairs
//! - [`runner`]: episode rollout and update triggering
//! - [`session`]: the outer training loop (interruption, checkpoints, metrics)

pub mod algo;
pub mod checkpoint;
pub mod env;
pub mod error;
pub mod gym;
pub mod metrics;
pub mod nn;
pub mod runner;
pub mod session;
pub mod telemetry;
pub mod traits;

pub use error::{Result, TrulyPpoError};
