use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use hub_core::{cap::sensor::PowerReading, model::EntityId};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{error::DimmerError, logic::StepMapper};

/// The two services the controller needs from the physical switch. Both
/// return once the host reports the call as done.
#[async_trait]
pub trait SwitchActions: Send + Sync + 'static {
    async fn toggle(&self, switch: EntityId) -> anyhow::Result<()>;
    async fn turn_off(&self, switch: EntityId) -> anyhow::Result<()>;
}

/// Receives every accepted power reading together with the brightness it maps to.
/// Called synchronously from [`DimmerController::handle_sensor_update`].
pub trait BrightnessObserver: Send + Sync + 'static {
    fn on_update(&self, power: PowerReading, brightness: u8);
}

impl<F> BrightnessObserver for F
where
    F: Fn(PowerReading, u8) + Send + Sync + 'static,
{
    fn on_update(&self, power: PowerReading, brightness: u8) {
        self(power, brightness)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSettings {
    pub switch: EntityId,
    /// Pause after every toggle.
    pub toggle_delay: Duration,
    /// Pause after a whole sequence before the next target is looked at.
    pub settling_delay: Duration,
}

/// Drives a step lamp towards the most recently requested brightness.
///
/// At most one execution task runs per controller. Requests that arrive while
/// it runs only replace the pending target; the task picks the latest one up
/// after its current sequence has settled.
#[derive(Clone)]
pub struct DimmerController {
    inner: Arc<Inner>,
}

struct Inner {
    mapper: StepMapper,
    settings: ControllerSettings,
    actions: Arc<dyn SwitchActions>,
    observer: Arc<dyn BrightnessObserver>,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    current_power: PowerReading,
    pending: Option<u8>,
    running: Option<Execution>,
    /// Last cancelled task; a new execution waits for it so two tasks never
    /// drive the switch at once.
    cancelled: Option<JoinHandle<()>>,
    last_failure: Option<DimmerError>,
    next_id: u64,
}

struct Execution {
    id: u64,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

enum Stop {
    Cancelled,
    Failed(DimmerError),
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Toggle,
    TurnOff,
}

impl Action {
    fn name(self) -> &'static str {
        match self {
            Self::Toggle => "toggle",
            Self::TurnOff => "turn_off",
        }
    }
}

impl State {
    fn owned_by(&self, id: u64) -> bool {
        self.running.as_ref().is_some_and(|exec| exec.id == id)
    }
}

impl DimmerController {
    pub fn new(
        mapper: StepMapper,
        settings: ControllerSettings,
        actions: Arc<dyn SwitchActions>,
        observer: Arc<dyn BrightnessObserver>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                mapper,
                settings,
                actions,
                observer,
                state: Mutex::new(State::default()),
            }),
        }
    }

    pub fn mapper(&self) -> &StepMapper {
        &self.inner.mapper
    }

    /// Records `brightness` as the target, replacing any target not yet
    /// picked up, and starts an execution task if none is running.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn set_target_brightness(&self, brightness: u8) {
        let mut state = self.inner.state();
        state.pending = Some(brightness);
        if state.running.is_some() {
            debug!(brightness, "execution in progress, target coalesced");
            return;
        }

        let id = state.next_id;
        state.next_id += 1;
        let token = CancellationToken::new();
        let previous = state.cancelled.take();
        let handle = tokio::spawn(Arc::clone(&self.inner).run(id, token.clone(), previous));
        state.running = Some(Execution { id, token, handle });
        debug!(brightness, execution = id, "execution started");
    }

    /// Stores a new power reading and reports the matching brightness to the observer.
    pub fn handle_sensor_update(&self, power: PowerReading) {
        self.inner.state().current_power = power;
        let brightness = self.inner.mapper.power_to_brightness(power);
        self.inner.observer.on_update(power, brightness);
    }

    /// Stops the running execution before its next switch call and drops the
    /// pending target. Safe to call at any time, any number of times.
    pub fn cancel(&self) {
        let mut state = self.inner.state();
        state.pending = None;
        if let Some(exec) = state.running.take() {
            info!(execution = exec.id, "cancelling step execution");
            exec.token.cancel();
            state.cancelled = Some(exec.handle);
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.state().running.is_some()
    }

    pub fn pending_target(&self) -> Option<u8> {
        self.inner.state().pending
    }

    pub fn current_power(&self) -> PowerReading {
        self.inner.state().current_power
    }

    pub fn current_brightness(&self) -> u8 {
        self.inner.mapper.power_to_brightness(self.current_power())
    }

    /// The error that ended the last failed execution, if not taken yet.
    pub fn take_failure(&self) -> Option<DimmerError> {
        self.inner.state().last_failure.take()
    }
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run(
        self: Arc<Self>,
        id: u64,
        token: CancellationToken,
        previous: Option<JoinHandle<()>>,
    ) {
        if let Some(previous) = previous {
            let _ = previous.await;
        }

        loop {
            let (target, power) = {
                let mut state = self.state();
                if token.is_cancelled() {
                    return;
                }
                match state.pending.take() {
                    Some(target) => (target, state.current_power),
                    None => {
                        // Checking for a target and releasing the slot happen
                        // under one lock, so no request can slip in between.
                        state.running = None;
                        debug!(execution = id, "execution finished");
                        return;
                    }
                }
            };

            match self.drive(target, power, &token).await {
                Ok(()) => {}
                Err(Stop::Cancelled) => {
                    debug!(execution = id, "execution cancelled");
                    return;
                }
                Err(Stop::Failed(err)) => {
                    warn!(execution = id, "step execution aborted: {err}");
                    let mut state = self.state();
                    if state.owned_by(id) {
                        state.pending.get_or_insert(target);
                        state.running = None;
                    }
                    state.last_failure = Some(err);
                    return;
                }
            }
        }
    }

    async fn drive(
        &self,
        target: u8,
        power: PowerReading,
        token: &CancellationToken,
    ) -> Result<(), Stop> {
        let current_step = self.mapper.power_to_step(power);
        let target_step = self.mapper.brightness_to_step(i64::from(target));
        let actions = self.mapper.toggles_between(current_step, target_step);
        debug!(target, current_step, target_step, actions, "driving step lamp");

        if actions > 0 && target_step == 0 {
            self.act(Action::TurnOff, token).await?;
        } else {
            for _ in 0..actions {
                self.act(Action::Toggle, token).await?;
                self.pause(self.settings.toggle_delay, token).await?;
            }
        }

        self.pause(self.settings.settling_delay, token).await
    }

    async fn act(&self, action: Action, token: &CancellationToken) -> Result<(), Stop> {
        if token.is_cancelled() {
            return Err(Stop::Cancelled);
        }
        let switch = self.settings.switch;
        let outcome = match action {
            Action::Toggle => self.actions.toggle(switch).await,
            Action::TurnOff => self.actions.turn_off(switch).await,
        };
        outcome.map_err(|err| {
            Stop::Failed(DimmerError::ActionFailure {
                switch,
                action: action.name(),
                reason: format!("{err:#}"),
            })
        })
    }

    async fn pause(&self, delay: Duration, token: &CancellationToken) -> Result<(), Stop> {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(Stop::Cancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }
}
