use candle_core::Tensor;
use rand::{rngs::StdRng, seq::index};
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct Transition {
    pub state: Tensor,
    pub action: Tensor,
    pub reward: f32,
    pub next_state: Tensor,
    pub done: bool,
}

/// Fixed-capacity replay memory with uniform minibatch sampling. The oldest
/// transition is dropped once the capacity is hit.
#[derive(Debug)]
pub struct ReplayBuffer {
    transitions: VecDeque<Transition>,
    capacity: usize,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            transitions: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, transition: Transition) {
        if self.transitions.len() == self.capacity {
            self.transitions.pop_front();
        }
        self.transitions.push_back(transition);
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Uniform sample without replacement; `batch_size` must not exceed the
    /// current length.
    pub fn sample(&self, rng: &mut StdRng, batch_size: usize) -> Vec<&Transition> {
        index::sample(rng, self.transitions.len(), batch_size)
            .iter()
            .map(|i| &self.transitions[i])
            .collect()
    }
}
