use std::path::PathBuf;

/// Run-level settings, threaded explicitly through the training loops
/// instead of read from ambient globals. Read-only for the duration of a
/// run.
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    /// Discount factor for return computation.
    pub gamma: f32,
    /// Iteration budget (on-policy) or episode budget (off-policy).
    pub max_iterations: usize,
    /// Samples collected per on-policy iteration before one update runs.
    pub total_sample_size: usize,
    /// Hard per-episode step cap.
    pub max_episode_steps: usize,
    /// Telemetry cadence, in iterations.
    pub log_interval: usize,
    /// Rolling-average score that ends the run early with a checkpoint.
    pub goal_score: f32,
    /// Directory the goal-score checkpoint lands in.
    pub save_path: PathBuf,
    pub render: bool,
    pub seed: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            gamma: 0.99,
            max_iterations: 500,
            total_sample_size: 2048,
            max_episode_steps: 200,
            log_interval: 5,
            goal_score: -200.,
            save_path: PathBuf::from("./save_model"),
            render: false,
            seed: 500,
        }
    }
}
