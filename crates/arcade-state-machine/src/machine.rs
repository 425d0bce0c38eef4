//! The state machine instance.
//!
//! A transition runs, in order: the source state's `on_exit`, the
//! transition's action, the state swap, the target state's `on_enter`, then
//! every listener. Failures before the swap leave the state untouched. A
//! failure in `on_enter` leaves the machine in the target state and faulted
//! until [`StateMachine::reset`] succeeds.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use arcade_core::subscription::{Subscription, SubscriptionId, SubscriptionState};

use crate::config::{Hook, HookError, Label, StateMachineConfig};
use crate::error::{HookPhase, StateMachineError};

/// What caused a state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger<E> {
    /// A matching transition fired for this event.
    Event(E),
    /// [`StateMachine::reset`] forced the machine back to its initial state.
    Reset,
}

impl<E: fmt::Debug> fmt::Display for Trigger<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Event(event) => write!(f, "{event:?}"),
            Self::Reset => f.write_str("reset"),
        }
    }
}

/// Passed to listeners after every completed state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionNotice<S, E> {
    /// State before the change.
    pub from: S,
    /// State after the change.
    pub to: S,
    /// The event or reset that caused it.
    pub trigger: Trigger<E>,
}

type Listener<S, E, C> = Arc<dyn Fn(&TransitionNotice<S, E>, &C) + Send + Sync>;

struct ListenerEntry<S, E, C> {
    id: SubscriptionId,
    state: Arc<SubscriptionState>,
    listener: Listener<S, E, C>,
}

struct Listeners<S, E, C> {
    next_id: u64,
    entries: Vec<ListenerEntry<S, E, C>>,
}

/// One running instance: current state, owned context and listeners.
pub struct StateMachine<S, E, C, P = ()> {
    config: Arc<StateMachineConfig<S, E, C, P>>,
    current: S,
    context: C,
    faulted: bool,
    listeners: Arc<Mutex<Listeners<S, E, C>>>,
}

impl<S, E, C, P> StateMachine<S, E, C, P>
where
    S: Label,
    E: Label,
    C: Send + 'static,
    P: 'static,
{
    /// Creates an instance in the configured initial state. No hooks run.
    #[must_use]
    pub fn new(config: Arc<StateMachineConfig<S, E, C, P>>, context: C) -> Self {
        let current = config.initial_state.clone();
        Self::at(config, context, current)
    }

    /// Rehydrates an instance directly in `state`, without running hooks.
    ///
    /// # Errors
    ///
    /// Returns `StateMachineError::UnknownState` if `state` is not registered.
    pub fn restore(
        config: Arc<StateMachineConfig<S, E, C, P>>,
        context: C,
        state: S,
    ) -> Result<Self, StateMachineError> {
        if !config.has_state(&state) {
            return Err(StateMachineError::UnknownState(format!("{state:?}")));
        }
        Ok(Self::at(config, context, state))
    }

    fn at(config: Arc<StateMachineConfig<S, E, C, P>>, context: C, current: S) -> Self {
        Self {
            config,
            current,
            context,
            faulted: false,
            listeners: Arc::new(Mutex::new(Listeners {
                next_id: 1,
                entries: Vec::new(),
            })),
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn current_state(&self) -> &S {
        &self.current
    }

    /// Returns the shared configuration.
    #[must_use]
    pub fn config(&self) -> &Arc<StateMachineConfig<S, E, C, P>> {
        &self.config
    }

    /// Returns the context.
    #[must_use]
    pub fn context(&self) -> &C {
        &self.context
    }

    /// Returns the context for mutation (guards read it on the next `send`).
    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    /// Consumes the machine and returns its context.
    #[must_use]
    pub fn into_context(self) -> C {
        self.context
    }

    /// Returns `true` if the current state is final. Advisory only.
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.config.is_final(&self.current)
    }

    /// Returns `true` if an `on_enter` failure left the machine faulted.
    #[must_use]
    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    /// Returns `true` if `send(event, payload)` would fire a transition.
    /// Runs guards only.
    #[must_use]
    pub fn can_transition(&self, event: &E, payload: &P) -> bool {
        !self.faulted
            && self
                .config
                .select(&self.current, event, &self.context, payload)
                .is_some()
    }

    /// Distinct events with a transition leaving the current state, in
    /// registration order. Guards are not evaluated.
    #[must_use]
    pub fn available_events(&self) -> Vec<E> {
        let mut events: Vec<E> = Vec::new();
        for transition in self.config.transitions_from(&self.current) {
            if !events.contains(&transition.event) {
                events.push(transition.event.clone());
            }
        }
        events
    }

    /// Fires the first transition from the current state on `event` whose
    /// guard passes. Returns `Ok(false)` without side effects if none does.
    ///
    /// # Errors
    ///
    /// Returns `StateMachineError::Faulted` if a previous `on_enter` failed,
    /// and `StateMachineError::Hook` if a hook or the action fails.
    pub fn send(&mut self, event: E, payload: &P) -> Result<bool, StateMachineError> {
        if self.faulted {
            return Err(StateMachineError::Faulted {
                state: format!("{:?}", self.current),
            });
        }

        let config = Arc::clone(&self.config);
        let Some(transition) = config.select(&self.current, &event, &self.context, payload) else {
            tracing::trace!(state = ?self.current, event = ?event, "no transition matched");
            return Ok(false);
        };

        let from = self.current.clone();
        let to = transition.to.clone();
        let trigger = Trigger::Event(event);
        let fail = |phase, source| hook_error(phase, &from, &to, &trigger, source);

        if let Some(hook) = config.definition(&from).and_then(|d| d.on_exit.as_ref()) {
            hook(&mut self.context).map_err(|e| fail(HookPhase::Exit, e))?;
        }
        if let Some(action) = &transition.action {
            action(&mut self.context, payload).map_err(|e| fail(HookPhase::Action, e))?;
        }
        self.current = to.clone();
        self.enter(&config, &from, &to, &trigger)?;

        tracing::debug!(from = ?from, to = ?to, trigger = %trigger, "state transition");
        self.notify(&TransitionNotice { from, to, trigger });
        Ok(true)
    }

    /// Forces the machine back to its initial state through the current
    /// state's `on_exit` and the initial state's `on_enter`, bypassing guards.
    /// Clears a fault.
    ///
    /// # Errors
    ///
    /// Returns `StateMachineError::Hook` if either hook fails. An `on_exit`
    /// failure leaves the state (and any fault) unchanged.
    pub fn reset(&mut self) -> Result<(), StateMachineError> {
        let config = Arc::clone(&self.config);
        let from = self.current.clone();
        let to = config.initial_state.clone();
        let trigger = Trigger::Reset;

        if let Some(hook) = config.definition(&from).and_then(|d| d.on_exit.as_ref()) {
            hook(&mut self.context)
                .map_err(|e| hook_error(HookPhase::Exit, &from, &to, &trigger, e))?;
        }
        self.current = to.clone();
        self.faulted = false;
        self.enter(&config, &from, &to, &trigger)?;

        tracing::debug!(from = ?from, to = ?to, "state machine reset");
        self.notify(&TransitionNotice { from, to, trigger });
        Ok(())
    }

    /// Registers `listener` for every completed state change.
    pub fn subscribe(
        &self,
        listener: impl Fn(&TransitionNotice<S, E>, &C) + Send + Sync + 'static,
    ) -> Subscription {
        let state = Arc::new(SubscriptionState::new());
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let id = SubscriptionId::new(listeners.next_id);
        listeners.next_id += 1;
        listeners.entries.push(ListenerEntry {
            id,
            state: Arc::clone(&state),
            listener: Arc::new(listener),
        });
        drop(listeners);

        let registry: Weak<Mutex<Listeners<S, E, C>>> = Arc::downgrade(&self.listeners);
        Subscription::new(id, state, move || {
            if let Some(registry) = registry.upgrade() {
                registry
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .entries
                    .retain(|entry| entry.id != id);
            }
        })
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    fn enter(
        &mut self,
        config: &StateMachineConfig<S, E, C, P>,
        from: &S,
        to: &S,
        trigger: &Trigger<E>,
    ) -> Result<(), StateMachineError> {
        let hook: Option<&Hook<C>> = config.definition(to).and_then(|d| d.on_enter.as_ref());
        let Some(hook) = hook else {
            return Ok(());
        };
        hook(&mut self.context).map_err(|source| {
            self.faulted = true;
            tracing::warn!(state = ?to, trigger = %trigger, error = %source, "on_enter failed; machine faulted");
            hook_error(HookPhase::Enter, from, to, trigger, source)
        })
    }

    fn notify(&self, notice: &TransitionNotice<S, E>) {
        // Snapshot so listeners may subscribe or unsubscribe re-entrantly.
        let listeners: Vec<(Arc<SubscriptionState>, Listener<S, E, C>)> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .iter()
            .map(|entry| (Arc::clone(&entry.state), Arc::clone(&entry.listener)))
            .collect();

        for (state, listener) in listeners {
            if state.is_active() {
                state.record_delivery();
                listener(notice, &self.context);
            }
        }
    }
}

fn hook_error<S: fmt::Debug, E: fmt::Debug>(
    phase: HookPhase,
    from: &S,
    to: &S,
    trigger: &Trigger<E>,
    source: HookError,
) -> StateMachineError {
    StateMachineError::Hook {
        phase,
        from: format!("{from:?}"),
        to: format!("{to:?}"),
        trigger: trigger.to_string(),
        source,
    }
}

impl<S: fmt::Debug, E, C, P> fmt::Debug for StateMachine<S, E, C, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("current", &self.current)
            .field("faulted", &self.faulted)
            .finish_non_exhaustive()
    }
}
