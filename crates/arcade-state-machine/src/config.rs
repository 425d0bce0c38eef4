//! State machine configuration and its builder.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use crate::error::StateMachineError;

/// Bound for state and event identifiers.
pub trait Label: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T> Label for T where T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

/// Error type returned by hooks and actions.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Predicate gating a transition.
pub type Guard<C, P> = Box<dyn Fn(&C, &P) -> bool + Send + Sync>;

/// `on_enter` / `on_exit` hook.
pub type Hook<C> = Box<dyn Fn(&mut C) -> Result<(), HookError> + Send + Sync>;

/// Side effect run while a transition fires.
pub type Action<C, P> = Box<dyn Fn(&mut C, &P) -> Result<(), HookError> + Send + Sync>;

/// A state and its optional hooks.
pub struct StateDefinition<S, C> {
    pub(crate) id: S,
    pub(crate) on_enter: Option<Hook<C>>,
    pub(crate) on_exit: Option<Hook<C>>,
}

impl<S: Label, C> StateDefinition<S, C> {
    /// A state without hooks.
    #[must_use]
    pub fn new(id: S) -> Self {
        Self {
            id,
            on_enter: None,
            on_exit: None,
        }
    }

    /// Runs `hook` whenever the machine enters this state.
    #[must_use]
    pub fn on_enter(
        mut self,
        hook: impl Fn(&mut C) -> Result<(), HookError> + Send + Sync + 'static,
    ) -> Self {
        self.on_enter = Some(Box::new(hook));
        self
    }

    /// Runs `hook` whenever the machine leaves this state.
    #[must_use]
    pub fn on_exit(
        mut self,
        hook: impl Fn(&mut C) -> Result<(), HookError> + Send + Sync + 'static,
    ) -> Self {
        self.on_exit = Some(Box::new(hook));
        self
    }

    /// Returns the state identifier.
    #[must_use]
    pub fn id(&self) -> &S {
        &self.id
    }
}

/// An edge `from --event--> to` with optional guard and action.
pub struct TransitionDefinition<S, E, C, P> {
    pub(crate) from: S,
    pub(crate) to: S,
    pub(crate) event: E,
    pub(crate) guard: Option<Guard<C, P>>,
    pub(crate) action: Option<Action<C, P>>,
}

impl<S: Label, E: Label, C, P> TransitionDefinition<S, E, C, P> {
    /// An unguarded transition.
    #[must_use]
    pub fn new(from: S, event: E, to: S) -> Self {
        Self {
            from,
            to,
            event,
            guard: None,
            action: None,
        }
    }

    /// Fires only when `guard` returns `true`.
    #[must_use]
    pub fn guard(mut self, guard: impl Fn(&C, &P) -> bool + Send + Sync + 'static) -> Self {
        self.guard = Some(Box::new(guard));
        self
    }

    /// Runs `action` between the source's `on_exit` and the target's
    /// `on_enter`.
    #[must_use]
    pub fn action(
        mut self,
        action: impl Fn(&mut C, &P) -> Result<(), HookError> + Send + Sync + 'static,
    ) -> Self {
        self.action = Some(Box::new(action));
        self
    }

    /// Returns `true` if this transition's guard passes.
    pub(crate) fn allows(&self, context: &C, payload: &P) -> bool {
        self.guard.as_ref().is_none_or(|guard| guard(context, payload))
    }
}

/// Validated, immutable machine definition shared by all instances of an
/// aggregate kind.
pub struct StateMachineConfig<S, E, C, P = ()> {
    pub(crate) initial_state: S,
    pub(crate) states: HashMap<S, StateDefinition<S, C>>,
    pub(crate) transitions: HashMap<S, Vec<TransitionDefinition<S, E, C, P>>>,
    pub(crate) final_states: HashSet<S>,
}

impl<S: Label, E: Label, C, P> StateMachineConfig<S, E, C, P> {
    /// Starts a configuration whose machines begin in `initial_state`.
    #[must_use]
    pub fn builder(initial_state: S) -> StateMachineConfigBuilder<S, E, C, P> {
        StateMachineConfigBuilder {
            initial_state,
            states: Vec::new(),
            transitions: Vec::new(),
            final_states: Vec::new(),
        }
    }

    /// Returns the initial state.
    #[must_use]
    pub fn initial_state(&self) -> &S {
        &self.initial_state
    }

    /// Returns `true` if `state` was registered.
    #[must_use]
    pub fn has_state(&self, state: &S) -> bool {
        self.states.contains_key(state)
    }

    /// Returns `true` if `state` is one of the final states.
    #[must_use]
    pub fn is_final(&self, state: &S) -> bool {
        self.final_states.contains(state)
    }

    /// Transitions leaving `state`, in registration order.
    pub(crate) fn transitions_from(&self, state: &S) -> &[TransitionDefinition<S, E, C, P>] {
        self.transitions.get(state).map_or(&[][..], Vec::as_slice)
    }

    /// The first transition from `state` on `event` whose guard passes.
    pub(crate) fn select(
        &self,
        state: &S,
        event: &E,
        context: &C,
        payload: &P,
    ) -> Option<&TransitionDefinition<S, E, C, P>> {
        self.transitions_from(state)
            .iter()
            .filter(|t| &t.event == event)
            .find(|t| t.allows(context, payload))
    }

    pub(crate) fn definition(&self, state: &S) -> Option<&StateDefinition<S, C>> {
        self.states.get(state)
    }
}

impl<S: Label, E, C, P> fmt::Debug for StateMachineConfig<S, E, C, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachineConfig")
            .field("initial_state", &self.initial_state)
            .field("states", &self.states.len())
            .field(
                "transitions",
                &self.transitions.values().map(Vec::len).sum::<usize>(),
            )
            .field("final_states", &self.final_states)
            .finish()
    }
}

/// Collects states and transitions, validated by [`build`](Self::build).
pub struct StateMachineConfigBuilder<S, E, C, P> {
    initial_state: S,
    states: Vec<StateDefinition<S, C>>,
    transitions: Vec<TransitionDefinition<S, E, C, P>>,
    final_states: Vec<S>,
}

impl<S: Label, E: Label, C, P> StateMachineConfigBuilder<S, E, C, P> {
    /// Registers a state without hooks.
    #[must_use]
    pub fn state(self, id: S) -> Self {
        self.state_with(StateDefinition::new(id))
    }

    /// Registers a state with hooks.
    #[must_use]
    pub fn state_with(mut self, definition: StateDefinition<S, C>) -> Self {
        self.states.push(definition);
        self
    }

    /// Registers a transition. Transitions sharing `(from, event)` are tried
    /// in registration order.
    #[must_use]
    pub fn transition(mut self, transition: TransitionDefinition<S, E, C, P>) -> Self {
        self.transitions.push(transition);
        self
    }

    /// Marks `state` as final.
    #[must_use]
    pub fn final_state(mut self, state: S) -> Self {
        self.final_states.push(state);
        self
    }

    /// Validates and freezes the configuration.
    ///
    /// # Errors
    ///
    /// Returns `StateMachineError::DuplicateState` if a state was registered
    /// twice, and `StateMachineError::UnknownState` if the initial state, a
    /// final state or a transition endpoint was never registered.
    pub fn build(self) -> Result<Arc<StateMachineConfig<S, E, C, P>>, StateMachineError> {
        let mut states = HashMap::with_capacity(self.states.len());
        for definition in self.states {
            if states.contains_key(&definition.id) {
                return Err(StateMachineError::DuplicateState(format!(
                    "{:?}",
                    definition.id
                )));
            }
            states.insert(definition.id.clone(), definition);
        }

        let require = |state: &S| {
            if states.contains_key(state) {
                Ok(())
            } else {
                Err(StateMachineError::UnknownState(format!("{state:?}")))
            }
        };

        require(&self.initial_state)?;
        for state in &self.final_states {
            require(state)?;
        }
        for transition in &self.transitions {
            require(&transition.from)?;
            require(&transition.to)?;
        }

        let mut transitions: HashMap<S, Vec<TransitionDefinition<S, E, C, P>>> = HashMap::new();
        for transition in self.transitions {
            transitions
                .entry(transition.from.clone())
                .or_default()
                .push(transition);
        }

        Ok(Arc::new(StateMachineConfig {
            initial_state: self.initial_state,
            states,
            transitions,
            final_states: self.final_states.into_iter().collect(),
        }))
    }
}
