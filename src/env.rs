//! Environment contract consumed by the runner
//!
//! An environment exposes `reset`/`step` and its state dimensionality. Continuous
//! control environments additionally implement [`ContinuousActionSpace`].

use std::collections::btree_map::{self, BTreeMap};

/// Free-form per-step (or per-episode) diagnostics keyed by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    values: BTreeMap<&'static str, f64>,
}

impl Report {
    /// Create a report with every key initialised to `0.0`
    pub fn new(keys: Vec<&'static str>) -> Self {
        Self {
            values: keys.into_iter().map(|k| (k, 0.0)).collect(),
        }
    }

    pub fn entry(&mut self, key: &'static str) -> btree_map::Entry<'_, &'static str, f64> {
        self.values.entry(key)
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Outcome of a single environment transition
#[derive(Debug, Clone)]
pub struct Step<S> {
    pub next_state: S,
    pub reward: f32,
    pub done: bool,
    pub info: Report,
}

/// A simulated environment with a step/reset interaction contract
pub trait Environment {
    /// Observation handed to the agent, a fixed-length float vector
    type State: Clone;
    /// Action expected by the environment, a fixed-length float vector
    type Action: Clone;

    /// Start a new episode and return its first state
    fn reset(&mut self) -> Self::State;

    /// Apply `action` and advance the simulation by one step
    fn step(&mut self, action: Self::Action) -> Step<Self::State>;

    /// Number of entries in a state vector
    fn state_dim(&self) -> usize;
}

/// Environments with a continuous, real-valued action vector
pub trait ContinuousActionSpace {
    /// Number of entries in an action vector
    fn action_dim(&self) -> usize;

    /// Optional `(low, high)` bounds per action dimension
    fn action_bounds(&self) -> Option<(Vec<f32>, Vec<f32>)> {
        None
    }
}
