//! Aggregate roots for the Lobby context.

use std::sync::Arc;

use arcade_core::aggregate::AggregateRoot;
use arcade_core::clock::Clock;
use arcade_core::error::DomainError;
use arcade_core::event::{DomainEvent, EventMetadata};
use arcade_state_machine::{StateMachine, StateMachineError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::events::{GameStarted, LobbyClosed, LobbyCreated, LobbyEvent, PlayerJoined, PlayerLeft};
use super::lifecycle::{LobbyLifecycle, LobbyRoster, LobbyStatus, LobbyTrigger, MIN_PLAYERS};

/// Largest lobby the context accepts.
pub const MAX_PLAYERS_LIMIT: u32 = 16;

/// Serialized form of a lobby, stored in snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyState {
    /// Lifecycle state.
    pub status: LobbyStatus,
    /// Roster and settings.
    pub roster: LobbyRoster,
}

/// The aggregate root for a lobby.
#[derive(Debug)]
pub struct Lobby {
    /// Aggregate identifier.
    id: String,
    /// Current version (events applied, including uncommitted ones).
    version: u64,
    /// Lifecycle instance owning the roster.
    machine: StateMachine<LobbyStatus, LobbyTrigger, LobbyRoster>,
    /// Uncommitted events pending persistence.
    uncommitted_events: Vec<DomainEvent>,
}

fn lifecycle_error(err: &StateMachineError) -> DomainError {
    DomainError::Infrastructure(format!("lobby lifecycle failed: {err}"))
}

impl Lobby {
    /// Creates an empty, not yet opened lobby.
    #[must_use]
    pub fn new(id: impl Into<String>, lifecycle: Arc<LobbyLifecycle>) -> Self {
        Self {
            id: id.into(),
            version: 0,
            machine: StateMachine::new(lifecycle, LobbyRoster::default()),
            uncommitted_events: Vec::new(),
        }
    }

    /// Rehydrates a lobby from snapshot state taken at `version`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Serialization` if the snapshot's status is not a
    /// lifecycle state.
    pub fn from_state(
        id: impl Into<String>,
        version: u64,
        state: LobbyState,
        lifecycle: Arc<LobbyLifecycle>,
    ) -> Result<Self, DomainError> {
        let machine = StateMachine::restore(lifecycle, state.roster, state.status)
            .map_err(|e| DomainError::Serialization(format!("invalid lobby snapshot: {e}")))?;
        Ok(Self {
            id: id.into(),
            version,
            machine,
            uncommitted_events: Vec::new(),
        })
    }

    /// Captures the state for a snapshot.
    #[must_use]
    pub fn state(&self) -> LobbyState {
        LobbyState {
            status: self.status(),
            roster: self.roster().clone(),
        }
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn status(&self) -> LobbyStatus {
        *self.machine.current_state()
    }

    /// Returns the roster.
    #[must_use]
    pub fn roster(&self) -> &LobbyRoster {
        self.machine.context()
    }

    /// Returns `true` once a `lobby.created` event has been applied.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.version > 0
    }

    /// Returns `true` if the lobby no longer changes (in game or closed).
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.machine.is_final()
    }

    /// Opens the lobby with the host in the first seat.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the lobby already exists, the name
    /// or host is blank, or `max_players` is outside `2..=16`.
    pub fn create(
        &mut self,
        name: &str,
        host_id: &str,
        max_players: u32,
        metadata: EventMetadata,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if self.exists() {
            return Err(DomainError::Validation(format!(
                "lobby {} already exists",
                self.id
            )));
        }
        if name.trim().is_empty() {
            return Err(DomainError::Validation("lobby name must not be blank".into()));
        }
        if host_id.trim().is_empty() {
            return Err(DomainError::Validation("host id must not be blank".into()));
        }
        if !(MIN_PLAYERS..=MAX_PLAYERS_LIMIT).contains(&max_players) {
            return Err(DomainError::Validation(format!(
                "max players must be between {MIN_PLAYERS} and {MAX_PLAYERS_LIMIT}, got {max_players}"
            )));
        }
        self.record(
            LobbyEvent::Created(LobbyCreated {
                lobby_id: self.id.clone(),
                name: name.trim().to_owned(),
                host_id: host_id.to_owned(),
                max_players,
            }),
            metadata,
            clock,
        )
    }

    /// Seats `player_id`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the lobby is settled or full, or
    /// the player is already seated.
    pub fn join(
        &mut self,
        player_id: &str,
        metadata: EventMetadata,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_open()?;
        if self.roster().is_seated(player_id) {
            return Err(DomainError::Validation(format!(
                "player {player_id} is already in lobby {}",
                self.id
            )));
        }
        if self.status() == LobbyStatus::Full {
            return Err(DomainError::Validation(format!("lobby {} is full", self.id)));
        }
        self.record(
            LobbyEvent::PlayerJoined(PlayerJoined {
                lobby_id: self.id.clone(),
                player_id: player_id.to_owned(),
            }),
            metadata,
            clock,
        )
    }

    /// Frees `player_id`'s seat.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the lobby is settled or the player
    /// is not seated.
    pub fn leave(
        &mut self,
        player_id: &str,
        metadata: EventMetadata,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_open()?;
        if !self.roster().is_seated(player_id) {
            return Err(DomainError::Validation(format!(
                "player {player_id} is not in lobby {}",
                self.id
            )));
        }
        self.record(
            LobbyEvent::PlayerLeft(PlayerLeft {
                lobby_id: self.id.clone(),
                player_id: player_id.to_owned(),
            }),
            metadata,
            clock,
        )
    }

    /// Hands the seated players over to a new game.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if `requested_by` is not the host or
    /// the lobby is not ready or full.
    pub fn start_game(
        &mut self,
        requested_by: &str,
        game_id: Uuid,
        metadata: EventMetadata,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_open()?;
        if self.roster().host_id != requested_by {
            return Err(DomainError::Validation(format!(
                "only the host can start lobby {}",
                self.id
            )));
        }
        if !self.machine.can_transition(&LobbyTrigger::StartGame, &()) {
            return Err(DomainError::Validation(format!(
                "lobby {} is {} and cannot start",
                self.id,
                self.status()
            )));
        }
        self.record(
            LobbyEvent::GameStarted(GameStarted {
                lobby_id: self.id.clone(),
                game_id,
            }),
            metadata,
            clock,
        )
    }

    /// Closes the lobby without a game.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the lobby is settled.
    pub fn close(
        &mut self,
        reason: &str,
        metadata: EventMetadata,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_open()?;
        self.record(
            LobbyEvent::Closed(LobbyClosed {
                lobby_id: self.id.clone(),
                reason: reason.to_owned(),
            }),
            metadata,
            clock,
        )
    }

    fn ensure_open(&self) -> Result<(), DomainError> {
        if !self.exists() {
            return Err(DomainError::AggregateNotFound {
                aggregate_type: Self::AGGREGATE_TYPE.to_owned(),
                aggregate_id: self.id.clone(),
            });
        }
        if self.is_settled() {
            return Err(DomainError::Validation(format!(
                "lobby {} is {}",
                self.id,
                self.status()
            )));
        }
        Ok(())
    }

    fn record(
        &mut self,
        event: LobbyEvent,
        metadata: EventMetadata,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        let envelope = DomainEvent::from_payload(&event, metadata, clock)?;
        self.apply(&event)?;
        self.uncommitted_events.push(envelope);
        Ok(())
    }

    /// Fires `trigger` until no transition matches; a single roster change can
    /// cross more than one threshold (a two-seat lobby goes straight to full).
    fn settle(&mut self, trigger: LobbyTrigger) -> Result<(), DomainError> {
        for _ in 0..4 {
            if !self
                .machine
                .send(trigger, &())
                .map_err(|e| lifecycle_error(&e))?
            {
                break;
            }
        }
        Ok(())
    }

    fn require(&mut self, trigger: LobbyTrigger) -> Result<(), DomainError> {
        let from = self.status();
        if self
            .machine
            .send(trigger, &())
            .map_err(|e| lifecycle_error(&e))?
        {
            Ok(())
        } else {
            Err(DomainError::Validation(format!(
                "lobby {} cannot apply {trigger:?} while {from}",
                self.id
            )))
        }
    }
}

impl AggregateRoot for Lobby {
    type Event = LobbyEvent;

    const AGGREGATE_TYPE: &'static str = "Lobby";

    fn aggregate_id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) -> Result<(), DomainError> {
        match event {
            LobbyEvent::Created(payload) => {
                let roster = self.machine.context_mut();
                roster.name.clone_from(&payload.name);
                roster.host_id.clone_from(&payload.host_id);
                roster.max_players = payload.max_players;
                roster.players = vec![payload.host_id.clone()];
            }
            LobbyEvent::PlayerJoined(payload) => {
                self.machine
                    .context_mut()
                    .players
                    .push(payload.player_id.clone());
                self.settle(LobbyTrigger::PlayerJoined)?;
            }
            LobbyEvent::PlayerLeft(payload) => {
                let roster = self.machine.context_mut();
                roster.players.retain(|p| p != &payload.player_id);
                let departing_host = roster.host_id == payload.player_id;
                if let Some(next) = roster.players.first().filter(|_| departing_host) {
                    roster.host_id = next.clone();
                }
                self.settle(LobbyTrigger::PlayerLeft)?;
            }
            LobbyEvent::GameStarted(payload) => {
                self.require(LobbyTrigger::StartGame)?;
                self.machine.context_mut().game_id = Some(payload.game_id);
            }
            LobbyEvent::Closed(payload) => {
                self.require(LobbyTrigger::Close)?;
                self.machine.context_mut().close_reason = Some(payload.reason.clone());
            }
        }
        self.version += 1;
        Ok(())
    }

    fn uncommitted_events(&self) -> &[DomainEvent] {
        &self.uncommitted_events
    }

    fn clear_uncommitted_events(&mut self) {
        self.uncommitted_events.clear();
    }
}
