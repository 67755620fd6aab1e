use crate::distributions::Policy;
use crate::utils::rollout_buffer::RolloutBuffer;
use candle_core::{Result, Tensor};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::cell::RefCell;

thread_local! {
    static RNG: RefCell<StdRng> = RefCell::new(StdRng::seed_from_u64(0));
}

/// Reseeds the thread-local rollout rng; env reset seeds derive from it.
pub fn seed_rollouts(seed: u64) {
    RNG.with_borrow_mut(|rng| *rng = StdRng::seed_from_u64(seed));
}

/// Draws the next episode seed.
pub fn rollout_seed() -> u64 {
    RNG.with_borrow_mut(|rng| rng.random::<u64>())
}

pub trait Env {
    fn reset(&mut self, seed: u64) -> Result<Tensor>;

    /// Returns `(next_state, reward, terminated, truncated)`.
    fn step(&mut self, action: &Tensor) -> Result<(Tensor, f32, bool, bool)>;

    /// Visualization hook; native environments default to nothing.
    fn render(&mut self) {}
}

/// Runs one episode under `policy`, appending transitions onto `buffer`.
///
/// The episode ends when the environment signals it or `max_steps` is hit;
/// either way the last transition is marked done so return computation stops
/// at the boundary. Returns the episode score.
pub fn run_episode<P: Policy, E: Env>(
    policy: &P,
    env: &mut E,
    max_steps: usize,
    render: bool,
    buffer: &mut RolloutBuffer,
) -> Result<f32> {
    let mut state = env.reset(rollout_seed())?;
    let mut score = 0.;
    for step in 0..max_steps {
        if render {
            env.render();
        }
        let action = policy.get_action(&state)?;
        let (next_state, reward, terminated, truncated) = env.step(&action)?;
        let done = terminated || truncated || step + 1 == max_steps;
        buffer.push_step(state, action, reward, done);
        score += reward;
        state = next_state;
        if done {
            break;
        }
    }
    Ok(score)
}
