//! Neural network building blocks for the actor and critic

pub mod mlp;

pub use mlp::{MLP, MLPConfig};
