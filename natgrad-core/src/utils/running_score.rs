use std::collections::VecDeque;

/// Rolling average over the most recent episode scores.
#[derive(Debug)]
pub struct RunningScore {
    scores: VecDeque<f32>,
    window: usize,
    total_episodes: usize,
}

impl RunningScore {
    pub fn new(window: usize) -> Self {
        Self {
            scores: VecDeque::with_capacity(window),
            window,
            total_episodes: 0,
        }
    }

    pub fn push(&mut self, score: f32) {
        if self.scores.len() == self.window {
            self.scores.pop_front();
        }
        self.scores.push_back(score);
        self.total_episodes += 1;
    }

    /// `None` until the first episode completes.
    pub fn mean(&self) -> Option<f32> {
        if self.scores.is_empty() {
            return None;
        }
        Some(self.scores.iter().sum::<f32>() / self.scores.len() as f32)
    }

    pub fn episodes(&self) -> usize {
        self.total_episodes
    }
}
