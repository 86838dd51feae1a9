use rand::{thread_rng, Rng};
use std::f32::consts::PI;

use crate::env::{ContinuousActionSpace, Environment, Report, Step};

const MAX_SPEED: f32 = 8.0;
const MAX_TORQUE: f32 = 2.0;
const DT: f32 = 0.05;
const G: f32 = 10.0;
const M: f32 = 1.0;
const L: f32 = 1.0;

/// State representation: [cos(θ), sin(θ), θ_dot]
pub type PendulumState = [f32; 3];

/// Action: continuous torque in [-MAX_TORQUE, MAX_TORQUE]
pub type PendulumAction = [f32; 1];

/// Pendulum swing-up with a continuous torque action
///
/// The state is `[cos θ, sin θ, θ̇]` so the angle never wraps. Episodes have
/// a fixed horizon: `done` is raised on step `max_steps` and never earlier.
///
/// # Physics
/// - Mass: 1.0 kg
/// - Length: 1.0 m
/// - Gravity: 10.0 m/s²
/// - Time step: 0.05 s
/// - Max angular velocity: 8.0 rad/s
/// - Max torque: 2.0 N⋅m
///
/// # Reward
/// r = -θ² - 0.1⋅θ̇² - 0.001⋅u²
///
/// Where θ is the angle from vertical (0 = upright), θ̇ is angular velocity,
/// and u is the applied torque.
#[derive(Debug, Clone)]
pub struct Pendulum {
    theta: f32,
    theta_dot: f32,
    steps: usize,
    max_steps: usize,
    episode_return: f32,
}

impl Pendulum {
    /// Create a new Pendulum environment
    ///
    /// # Arguments
    /// * `max_steps` - Maximum number of steps per episode (typically 200)
    pub fn new(max_steps: usize) -> Self {
        Self {
            theta: 0.0,
            theta_dot: 0.0,
            steps: 0,
            max_steps,
            episode_return: 0.0,
        }
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    fn get_state(&self) -> PendulumState {
        [self.theta.cos(), self.theta.sin(), self.theta_dot]
    }

    fn angle_normalize(x: f32) -> f32 {
        (x + PI).rem_euclid(2.0 * PI) - PI
    }
}

impl Environment for Pendulum {
    type State = PendulumState;
    type Action = PendulumAction;

    fn step(&mut self, action: Self::Action) -> Step<Self::State> {
        let torque = action[0].clamp(-MAX_TORQUE, MAX_TORQUE);

        // θ̈ = (3g/2L)sin(θ) + (3/mL²)u
        let theta_acc =
            (3.0 * G / (2.0 * L)) * self.theta.sin() + (3.0 / (M * L * L)) * torque;

        self.theta_dot = (self.theta_dot + theta_acc * DT).clamp(-MAX_SPEED, MAX_SPEED);
        self.theta = Self::angle_normalize(self.theta + self.theta_dot * DT);

        let reward = -(self.theta.powi(2)
            + 0.1 * self.theta_dot.powi(2)
            + 0.001 * torque.powi(2));

        self.steps += 1;
        self.episode_return += reward;

        let mut info = Report::new(vec!["episode_return", "steps", "torque"]);
        info.entry("episode_return")
            .and_modify(|x| *x = self.episode_return as f64);
        info.entry("steps").and_modify(|x| *x = self.steps as f64);
        info.entry("torque").and_modify(|x| *x = torque as f64);

        Step {
            next_state: self.get_state(),
            reward,
            done: self.steps >= self.max_steps,
            info,
        }
    }

    fn reset(&mut self) -> Self::State {
        let mut rng = thread_rng();
        self.theta = rng.gen_range(-PI..PI);
        self.theta_dot = rng.gen_range(-1.0..1.0);
        self.steps = 0;
        self.episode_return = 0.0;
        self.get_state()
    }

    fn state_dim(&self) -> usize {
        3
    }
}

impl ContinuousActionSpace for Pendulum {
    fn action_dim(&self) -> usize {
        1
    }

    fn action_bounds(&self) -> Option<(Vec<f32>, Vec<f32>)> {
        Some((vec![-MAX_TORQUE], vec![MAX_TORQUE]))
    }
}
