pub mod noise;
pub mod replay;

use candle_core::{DType, Device, Result, Tensor};
use candle_nn::{AdamW, Module, Optimizer, ParamsAdamW, VarBuilder, VarMap};
use natgrad_core::{
    agents::OffPolicyAgent,
    flat::FlatView,
    net::{Mlp, build_mlp},
};
use noise::OuNoise;
use rand::{SeedableRng, rngs::StdRng};
use replay::{ReplayBuffer, Transition};

#[derive(Debug, Clone)]
pub struct DdpgConfig {
    pub gamma: f32,
    /// Soft-update mixing factor for the target networks.
    pub tau: f64,
    pub actor_lr: f64,
    pub critic_lr: f64,
    pub batch_size: usize,
    pub replay_capacity: usize,
    /// Stored transitions required before updates begin.
    pub warmup: usize,
    pub ou_theta: f32,
    pub ou_mu: f32,
    pub ou_sigma: f32,
    /// Actions are tanh-squashed into `[-max_action, max_action]`.
    pub max_action: f64,
}

impl Default for DdpgConfig {
    fn default() -> Self {
        Self {
            gamma: 0.99,
            tau: 1e-3,
            actor_lr: 1e-4,
            critic_lr: 1e-3,
            batch_size: 64,
            replay_capacity: 10_000,
            warmup: 64,
            ou_theta: 0.15,
            ou_mu: 0.,
            ou_sigma: 0.2,
            max_action: 2.0,
        }
    }
}

struct DeterministicActor {
    net: Mlp,
    max_action: f64,
}

impl DeterministicActor {
    fn build(
        obs_dim: usize,
        action_dim: usize,
        hidden_size: usize,
        max_action: f64,
        varmap: &VarMap,
        device: &Device,
    ) -> Result<Self> {
        let vb = VarBuilder::from_varmap(varmap, DType::F32, device);
        let net = build_mlp(obs_dim, &[hidden_size, hidden_size, action_dim], &vb, "actor")?;
        Ok(Self { net, max_action })
    }

    fn forward(&self, states: &Tensor) -> Result<Tensor> {
        self.net.forward(states)?.tanh()? * self.max_action
    }
}

struct Critic {
    net: Mlp,
}

impl Critic {
    fn build(
        obs_dim: usize,
        action_dim: usize,
        hidden_size: usize,
        varmap: &VarMap,
        device: &Device,
    ) -> Result<Self> {
        let vb = VarBuilder::from_varmap(varmap, DType::F32, device);
        let net = build_mlp(
            obs_dim + action_dim,
            &[hidden_size, hidden_size, 1],
            &vb,
            "critic",
        )?;
        Ok(Self { net })
    }

    fn forward(&self, states: &Tensor, actions: &Tensor) -> Result<Tensor> {
        let input = Tensor::cat(&[states, actions], 1)?;
        self.net.forward(&input)?.squeeze(1)
    }
}

/// Mixes the live parameters into the target copy:
/// `target <- tau * live + (1 - tau) * target`.
fn soft_update(target: &FlatView, live: &FlatView, tau: f64) -> Result<()> {
    let mixed = (&(live.flatten()? * tau)? + &(target.flatten()? * (1.0 - tau))?)?;
    target.unflatten_into(&mixed)
}

/// Deterministic actor-critic with target networks, replay and correlated
/// exploration noise. Updates run once per environment step from a uniform
/// replay minibatch.
pub struct Ddpg {
    actor: DeterministicActor,
    actor_target: DeterministicActor,
    critic: Critic,
    critic_target: Critic,
    actor_vars: VarMap,
    actor_view: FlatView,
    actor_target_view: FlatView,
    critic_view: FlatView,
    critic_target_view: FlatView,
    actor_opt: AdamW,
    critic_opt: AdamW,
    replay: ReplayBuffer,
    noise: OuNoise,
    rng: StdRng,
    config: DdpgConfig,
    device: Device,
}

impl Ddpg {
    pub fn new(
        obs_dim: usize,
        action_dim: usize,
        hidden_size: usize,
        config: DdpgConfig,
        seed: u64,
        device: Device,
    ) -> Result<Self> {
        let actor_vars = VarMap::new();
        let actor = DeterministicActor::build(
            obs_dim,
            action_dim,
            hidden_size,
            config.max_action,
            &actor_vars,
            &device,
        )?;
        let actor_target_vars = VarMap::new();
        let actor_target = DeterministicActor::build(
            obs_dim,
            action_dim,
            hidden_size,
            config.max_action,
            &actor_target_vars,
            &device,
        )?;
        let critic_vars = VarMap::new();
        let critic = Critic::build(obs_dim, action_dim, hidden_size, &critic_vars, &device)?;
        let critic_target_vars = VarMap::new();
        let critic_target =
            Critic::build(obs_dim, action_dim, hidden_size, &critic_target_vars, &device)?;

        let actor_view = FlatView::from_varmap(&actor_vars);
        let actor_target_view = FlatView::from_varmap(&actor_target_vars);
        let critic_view = FlatView::from_varmap(&critic_vars);
        let critic_target_view = FlatView::from_varmap(&critic_target_vars);
        // targets start as exact copies of the live networks
        actor_target_view.unflatten_into(&actor_view.flatten()?)?;
        critic_target_view.unflatten_into(&critic_view.flatten()?)?;

        let actor_opt = AdamW::new(
            actor_vars.all_vars(),
            ParamsAdamW {
                lr: config.actor_lr,
                weight_decay: 0.0,
                ..Default::default()
            },
        )?;
        let critic_opt = AdamW::new(
            critic_vars.all_vars(),
            ParamsAdamW {
                lr: config.critic_lr,
                weight_decay: 0.0,
                ..Default::default()
            },
        )?;

        let replay = ReplayBuffer::new(config.replay_capacity);
        let noise = OuNoise::new(
            action_dim,
            config.ou_theta,
            config.ou_mu,
            config.ou_sigma,
            &device,
        )?;
        Ok(Self {
            actor,
            actor_target,
            critic,
            critic_target,
            actor_vars,
            actor_view,
            actor_target_view,
            critic_view,
            critic_target_view,
            actor_opt,
            critic_opt,
            replay,
            noise,
            rng: StdRng::seed_from_u64(seed),
            config,
            device,
        })
    }

    pub fn replay_len(&self) -> usize {
        self.replay.len()
    }

    pub fn actor_view(&self) -> &FlatView {
        &self.actor_view
    }
}

impl OffPolicyAgent for Ddpg {
    fn act(&mut self, state: &Tensor) -> Result<Tensor> {
        let action = self.actor.forward(&state.unsqueeze(0)?)?.squeeze(0)?.detach();
        &action + &self.noise.sample()?
    }

    fn observe(
        &mut self,
        state: &Tensor,
        action: &Tensor,
        reward: f32,
        next_state: &Tensor,
        done: bool,
    ) {
        self.replay.push(Transition {
            state: state.clone(),
            action: action.clone(),
            reward,
            next_state: next_state.clone(),
            done,
        });
    }

    fn ready(&self) -> bool {
        self.replay.len() > self.config.warmup
    }

    fn update(&mut self) -> Result<()> {
        let samples = self.replay.sample(&mut self.rng, self.config.batch_size);
        let states = Tensor::stack(&samples.iter().map(|t| &t.state).collect::<Vec<_>>(), 0)?;
        let actions = Tensor::stack(&samples.iter().map(|t| &t.action).collect::<Vec<_>>(), 0)?;
        let next_states = Tensor::stack(
            &samples.iter().map(|t| &t.next_state).collect::<Vec<_>>(),
            0,
        )?;
        let rewards: Vec<f32> = samples.iter().map(|t| t.reward).collect();
        let rewards = Tensor::from_slice(&rewards, rewards.len(), &self.device)?;
        let masks: Vec<f32> = samples
            .iter()
            .map(|t| if t.done { 0. } else { 1. })
            .collect();
        let masks = Tensor::from_slice(&masks, masks.len(), &self.device)?;

        // critic regresses onto the bootstrapped target value
        let q = self.critic.forward(&states, &actions)?;
        let next_actions = self.actor_target.forward(&next_states)?;
        let next_q = self.critic_target.forward(&next_states, &next_actions)?;
        let target = (&rewards + &((masks * next_q)? * self.config.gamma as f64)?)?.detach();
        let critic_loss = (q - target)?.sqr()?.mean_all()?;
        self.critic_opt.step(&critic_loss.backward()?)?;

        // actor ascends the critic's value of its own actions
        let actions_pred = self.actor.forward(&states)?;
        let actor_loss = self.critic.forward(&states, &actions_pred)?.mean_all()?.neg()?;
        self.actor_opt.step(&actor_loss.backward()?)?;

        soft_update(&self.actor_target_view, &self.actor_view, self.config.tau)?;
        soft_update(&self.critic_target_view, &self.critic_view, self.config.tau)?;
        Ok(())
    }

    fn begin_episode(&mut self) -> Result<()> {
        self.noise.reset()
    }

    fn var_map(&self) -> &VarMap {
        &self.actor_vars
    }
}
