/// Diagonal Gaussian policy helpers
pub mod distribution;

/// On-policy trajectory buffer
pub mod memory;

/// TD targets, GAE and discounted returns
pub mod policy_function;

/// Truly PPO agent
pub mod ppo;

/// KL-gated surrogate loss
pub mod truly_ppo;
