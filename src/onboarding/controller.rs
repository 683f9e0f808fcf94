//! OnboardingController: coordinates wizard state, step timers, event
//! fan-out and the final profile write.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{Mutex, broadcast};
use tokio::time::{Instant, interval_at};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::WizardConfig;
use crate::error::{Error, Result, WizardError};
use crate::session::Route;
use crate::store::KeyValueStore;

use super::model::{ProfileDraft, UserProfile, storage_keys};
use super::state::{SelectionOutcome, StepStatus, TickOutcome, WizardState};
use super::step::{ProfileField, WizardStep, default_steps};
use super::timer::ScheduledTask;

/// Default broadcast channel capacity.
const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Something a renderer may want to react to.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WizardEvent {
    /// A step became current (including step 0 on start).
    StepEntered { index: usize, step: WizardStep },
    /// Auto-advance progress changed on the current step.
    Progress { index: usize, percent: u8 },
    /// A bound field changed.
    FieldUpdated { field: ProfileField },
    /// The profile was written to storage.
    Completed { profile: UserProfile },
    /// Sealing or writing the profile failed; the wizard stays on the last
    /// step and `complete()` may be retried.
    CompletionFailed { error: String },
    /// Go to another view.
    Navigate { route: Route },
}

/// Result of [`OnboardingController::complete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The profile was sealed and stored by this call.
    Completed(UserProfile),
    /// An earlier call already stored it; nothing was written.
    AlreadyComplete,
}

/// Owned view of the wizard for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct WizardSnapshot {
    pub index: usize,
    pub step_count: usize,
    pub step: WizardStep,
    pub draft: ProfileDraft,
    pub auto_progress: u8,
    pub overall_progress: u8,
    pub can_proceed: bool,
    pub statuses: Vec<StepStatus>,
    pub completed: bool,
    /// Why the last completion attempt failed, until one succeeds.
    pub completion_error: Option<String>,
}

impl WizardSnapshot {
    /// Completion was attempted and failed; calling `complete()` again
    /// retries it.
    pub fn awaiting_retry(&self) -> bool {
        !self.completed && self.completion_error.is_some()
    }
}

/// What a delayed task does when it fires.
#[derive(Debug, Clone, Copy)]
enum Deferred {
    /// Single-select choice made; move on.
    Advance,
    /// Auto step reached 100; move on, or finish on the last step.
    Settle,
}

/// Mutable flow, guarded by one mutex so transitions never interleave.
struct Flow {
    state: WizardState,
    /// Bumped whenever the step changes or a schedule is replaced. A timer
    /// only acts if the generation it was armed with is still current.
    generation: u64,
    schedule: Option<ScheduledTask>,
    started: bool,
    completed: bool,
    completion_error: Option<String>,
}

struct ControllerInner {
    flow: Mutex<Flow>,
    store: Arc<dyn KeyValueStore>,
    config: WizardConfig,
    events: broadcast::Sender<WizardEvent>,
    run_id: Uuid,
}

/// Drives the onboarding wizard from first step to stored profile.
///
/// Cheap to clone; all clones share one wizard. Timers hold only a weak
/// reference, so dropping the last clone stops them.
#[derive(Clone)]
pub struct OnboardingController {
    inner: Arc<ControllerInner>,
}

impl OnboardingController {
    /// Create a controller over the reference six-step catalogue.
    pub fn new(store: Arc<dyn KeyValueStore>, config: WizardConfig) -> Result<Self> {
        Self::with_steps(store, config, default_steps())
    }

    /// Create a controller over a custom catalogue.
    pub fn with_steps(
        store: Arc<dyn KeyValueStore>,
        config: WizardConfig,
        steps: &'static [WizardStep],
    ) -> Result<Self> {
        config.validate()?;
        let state = WizardState::with_steps(steps)?;
        let (events, _rx) = broadcast::channel(DEFAULT_EVENT_CAPACITY);
        Ok(Self {
            inner: Arc::new(ControllerInner {
                flow: Mutex::new(Flow {
                    state,
                    generation: 0,
                    schedule: None,
                    started: false,
                    completed: false,
                    completion_error: None,
                }),
                store,
                config,
                events,
                run_id: Uuid::new_v4(),
            }),
        })
    }

    /// Subscribe to wizard events. Subscribe before `start()` to see the
    /// first `StepEntered`.
    pub fn subscribe(&self) -> broadcast::Receiver<WizardEvent> {
        self.inner.events.subscribe()
    }

    /// Enter the first step and arm its timer. Calling again is a no-op.
    pub async fn start(&self) {
        let mut flow = self.inner.flow.lock().await;
        if flow.started {
            return;
        }
        flow.started = true;
        info!(run_id = %self.inner.run_id, "Onboarding started");
        self.inner.enter_step(&mut flow);
    }

    /// Throw away all progress and start again from the first step.
    pub async fn restart(&self) {
        let mut flow = self.inner.flow.lock().await;
        flow.state.reset();
        flow.completed = false;
        flow.completion_error = None;
        flow.started = true;
        info!(run_id = %self.inner.run_id, "Onboarding restarted");
        self.inner.enter_step(&mut flow);
    }

    /// The step currently shown.
    pub async fn current_step(&self) -> WizardStep {
        *self.inner.flow.lock().await.state.current_step()
    }

    pub async fn can_proceed(&self) -> bool {
        self.inner.flow.lock().await.state.can_proceed()
    }

    pub async fn is_completed(&self) -> bool {
        self.inner.flow.lock().await.completed
    }

    pub async fn snapshot(&self) -> WizardSnapshot {
        let flow = self.inner.flow.lock().await;
        let state = &flow.state;
        WizardSnapshot {
            index: state.index(),
            step_count: state.step_count(),
            step: *state.current_step(),
            draft: state.draft().clone(),
            auto_progress: state.auto_progress(),
            overall_progress: state.overall_progress(),
            can_proceed: state.can_proceed(),
            statuses: state.step_statuses(),
            completed: flow.completed,
            completion_error: flow.completion_error.clone(),
        }
    }

    /// Move to the next step. Returns the new index.
    ///
    /// Rejected on the last step (use [`complete`](Self::complete)) and while
    /// the current step's gate is closed.
    pub async fn advance(&self) -> Result<usize> {
        let mut flow = self.inner.flow.lock().await;
        self.inner.advance_locked(&mut flow)
    }

    /// Set the text field bound to the current free-text step.
    pub async fn set_field_value(&self, field: ProfileField, value: &str) -> Result<()> {
        let mut flow = self.inner.flow.lock().await;
        ensure_open(&flow)?;
        flow.state
            .set_field_value(field, value)
            .inspect_err(|e| warn!(error = %e, "Rejected field update"))?;
        let _ = self.inner.events.send(WizardEvent::FieldUpdated { field });
        Ok(())
    }

    /// Select an option on the current select step.
    ///
    /// On a single-select step the wizard moves on by itself after
    /// `select_delay`; choosing again before then restarts the delay.
    pub async fn toggle_selection(
        &self,
        field: ProfileField,
        option: &str,
    ) -> Result<SelectionOutcome> {
        let mut flow = self.inner.flow.lock().await;
        ensure_open(&flow)?;
        let outcome = flow
            .state
            .toggle_selection(field, option)
            .inspect_err(|e| warn!(error = %e, "Rejected selection"))?;
        let _ = self.inner.events.send(WizardEvent::FieldUpdated { field });

        if outcome == SelectionOutcome::Chosen {
            let delay = self.inner.config.select_delay;
            self.inner.arm_deferred(&mut flow, delay, Deferred::Advance);
        }
        Ok(outcome)
    }

    /// Add one tick of progress to the current auto step.
    ///
    /// The controller calls this on its own cadence; external callers may
    /// too. Only the tick that reaches 100 schedules the transition.
    pub async fn tick_auto_advance(&self) -> TickOutcome {
        let mut flow = self.inner.flow.lock().await;
        self.inner.tick_locked(&mut flow)
    }

    /// Seal the profile and write it to storage. Only valid on the last step.
    ///
    /// On success emits `Completed` then `Navigate` to the dashboard. A storage
    /// failure is returned and leaves the wizard on the last step so the
    /// call can be retried.
    pub async fn complete(&self) -> Result<Completion> {
        let mut flow = self.inner.flow.lock().await;
        self.inner.complete_locked(&mut flow).await
    }
}

fn ensure_open(flow: &Flow) -> Result<()> {
    if flow.completed {
        return Err(WizardError::AlreadyComplete.into());
    }
    Ok(())
}

impl ControllerInner {
    /// Make the current step live: drop the old schedule, announce the step
    /// and start ticking if it fills itself.
    fn enter_step(self: &Arc<Self>, flow: &mut Flow) {
        if let Some(previous) = flow.schedule.take() {
            debug!("Cancelled schedule from previous step");
            previous.cancel();
        }
        flow.generation += 1;

        let index = flow.state.index();
        let step = *flow.state.current_step();
        info!(run_id = %self.run_id, index, step = %step.id, "Entered onboarding step");
        let _ = self.events.send(WizardEvent::StepEntered { index, step });

        if step.kind.is_auto_advance() {
            flow.schedule = Some(self.spawn_ticker(flow.generation));
        }
    }

    fn advance_locked(self: &Arc<Self>, flow: &mut Flow) -> Result<usize> {
        ensure_open(flow)?;
        let index = flow.state.advance().inspect_err(|e| match e {
            WizardError::Gated { .. } | WizardError::AtTerminal { .. } => {
                debug!(error = %e, "Advance rejected");
            }
            _ => warn!(error = %e, "Advance rejected"),
        })?;
        self.enter_step(flow);
        Ok(index)
    }

    fn tick_locked(self: &Arc<Self>, flow: &mut Flow) -> TickOutcome {
        if flow.completed {
            return TickOutcome::Ignored;
        }
        let outcome = flow.state.tick_auto_advance(self.config.tick_increment);
        let index = flow.state.index();
        match outcome {
            TickOutcome::Progress(percent) => {
                let _ = self.events.send(WizardEvent::Progress { index, percent });
            }
            TickOutcome::Reached => {
                debug!(index, "Auto step reached 100%");
                let _ = self.events.send(WizardEvent::Progress {
                    index,
                    percent: 100,
                });
                let delay = self.config.settle_delay;
                self.arm_deferred(flow, delay, Deferred::Settle);
            }
            TickOutcome::Ignored => {}
        }
        outcome
    }

    async fn complete_locked(self: &Arc<Self>, flow: &mut Flow) -> Result<Completion> {
        if flow.completed {
            debug!("complete() called again; nothing to do");
            return Ok(Completion::AlreadyComplete);
        }
        if !flow.state.is_terminal() {
            return Err(WizardError::NotTerminal {
                step: flow.state.current_step().id,
            }
            .into());
        }

        let sealed = match flow.state.draft().seal() {
            Ok(profile) => self.persist(&profile).await.map(|()| profile),
            Err(e) => Err(e.into()),
        };
        let profile = match sealed {
            Ok(profile) => profile,
            Err(e) => {
                warn!(run_id = %self.run_id, error = %e, "Failed to complete onboarding");
                flow.completion_error = Some(e.to_string());
                let _ = self.events.send(WizardEvent::CompletionFailed {
                    error: e.to_string(),
                });
                return Err(e);
            }
        };

        flow.completed = true;
        flow.completion_error = None;
        flow.generation += 1;
        if let Some(schedule) = flow.schedule.take() {
            schedule.cancel();
        }

        info!(run_id = %self.run_id, name = %profile.name, "Onboarding complete");
        let _ = self.events.send(WizardEvent::Completed {
            profile: profile.clone(),
        });
        let _ = self.events.send(WizardEvent::Navigate {
            route: Route::Dashboard,
        });
        Ok(Completion::Completed(profile))
    }

    /// Write the profile, then the flag, so the flag never points at a
    /// missing profile.
    async fn persist(&self, profile: &UserProfile) -> Result<()> {
        let json = serde_json::to_string(profile)?;
        self.store.set(storage_keys::USER, &json).await?;
        self.store
            .set(storage_keys::ONBOARDING_COMPLETE, "true")
            .await?;
        self.store
            .set(
                storage_keys::ONBOARDING_COMPLETED_AT,
                &Utc::now().to_rfc3339(),
            )
            .await
            .map_err(Error::from)
    }

    /// Replace the current schedule with a one-shot delayed action.
    fn arm_deferred(self: &Arc<Self>, flow: &mut Flow, delay: Duration, action: Deferred) {
        flow.generation += 1;
        let generation = flow.generation;
        let weak = Arc::downgrade(self);
        // Assigning drops (and aborts) whatever was scheduled before.
        flow.schedule = Some(ScheduledTask::spawn(async move {
            tokio::time::sleep(delay).await;
            run_deferred(weak, generation, action).await;
        }));
    }

    fn spawn_ticker(self: &Arc<Self>, generation: u64) -> ScheduledTask {
        let weak = Arc::downgrade(self);
        let period = self.config.tick_interval;
        ScheduledTask::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                let mut flow = inner.flow.lock().await;
                if flow.generation != generation {
                    break;
                }
                if !matches!(inner.tick_locked(&mut flow), TickOutcome::Progress(_)) {
                    break;
                }
            }
        })
    }
}

async fn run_deferred(weak: Weak<ControllerInner>, generation: u64, action: Deferred) {
    let Some(inner) = weak.upgrade() else { return };
    let mut flow = inner.flow.lock().await;
    if flow.generation != generation {
        debug!(?action, "Stale timer ignored");
        return;
    }
    // This task is the current schedule; let go of it so the transition
    // below does not abort the task doing the transition.
    if let Some(own) = flow.schedule.take() {
        own.detach();
    }

    let result = match action {
        Deferred::Settle if flow.state.is_terminal() => {
            inner.complete_locked(&mut flow).await.map(|_| ())
        }
        Deferred::Settle | Deferred::Advance => inner.advance_locked(&mut flow).map(|_| ()),
    };
    if let Err(e) = result {
        warn!(?action, error = %e, "Timed transition failed");
    }
}
