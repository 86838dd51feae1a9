//! On-policy trajectory storage
//!
//! Transitions are kept as five parallel sequences in insertion order. Order
//! matters: advantages are computed by a reverse-time scan over each minibatch,
//! so minibatches are contiguous slices and are never shuffled.

/// Ordered, append-only store of `(state, action, reward, done, next_state)`
#[derive(Clone, Debug)]
pub struct Memory<S, A> {
    states: Vec<S>,
    actions: Vec<A>,
    rewards: Vec<f32>,
    dones: Vec<bool>,
    next_states: Vec<S>,
}

/// A contiguous slice of the memory, in recording order
#[derive(Clone, Copy, Debug)]
pub struct MiniBatch<'a, S, A> {
    pub states: &'a [S],
    pub actions: &'a [A],
    pub rewards: &'a [f32],
    pub dones: &'a [bool],
    pub next_states: &'a [S],
}

impl<S, A> MiniBatch<'_, S, A> {
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    /// Done flags as 0/1 indicators
    pub fn done_mask(&self) -> Vec<f32> {
        self.dones.iter().map(|&d| if d { 1.0 } else { 0.0 }).collect()
    }
}

impl<S, A> Default for Memory<S, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, A> Memory<S, A> {
    pub fn new() -> Self {
        Self {
            states: Vec::new(),
            actions: Vec::new(),
            rewards: Vec::new(),
            dones: Vec::new(),
            next_states: Vec::new(),
        }
    }

    pub fn record(&mut self, state: S, action: A, reward: f32, done: bool, next_state: S) {
        self.states.push(state);
        self.actions.push(action);
        self.rewards.push(reward);
        self.dones.push(done);
        self.next_states.push(next_state);
    }

    pub fn clear(&mut self) {
        self.states.clear();
        self.actions.clear();
        self.rewards.clear();
        self.dones.clear();
        self.next_states.clear();
    }

    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    /// Iterate over consecutive minibatches of at most `batch_size` transitions
    ///
    /// The partition and its order are the same on every call, so every epoch
    /// of an update cycle sees identical batches. The last batch may be short.
    ///
    /// # Panics
    /// If `batch_size` is zero.
    pub fn iter_batches(&self, batch_size: usize) -> impl Iterator<Item = MiniBatch<'_, S, A>> {
        assert!(batch_size > 0, "minibatch size must be positive");
        (0..self.len()).step_by(batch_size).map(move |start| {
            let end = (start + batch_size).min(self.len());
            MiniBatch {
                states: &self.states[start..end],
                actions: &self.actions[start..end],
                rewards: &self.rewards[start..end],
                dones: &self.dones[start..end],
                next_states: &self.next_states[start..end],
            }
        })
    }
}
