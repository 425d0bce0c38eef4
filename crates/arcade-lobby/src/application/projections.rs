//! Read-side projection of open lobbies, fed by the event bus.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arcade_core::callback::CallbackResult;
use arcade_core::error::DomainError;
use arcade_core::event::DomainEvent;
use arcade_core::handler::EventHandler;
use arcade_core::repository::EventStore;
use arcade_event_bus::EventBus;
use async_trait::async_trait;
use serde::Serialize;

use crate::domain::events::{LOBBY_EVENT_TYPES, LobbyEvent};

/// One open lobby as listed in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LobbyListing {
    /// Lobby identifier.
    pub lobby_id: String,
    /// Display name.
    pub name: String,
    /// Current host.
    pub host_id: String,
    /// Seated players in join order.
    pub players: Vec<String>,
    /// Seat count.
    pub max_players: u32,
}

impl LobbyListing {
    /// Returns the number of free seats.
    #[must_use]
    pub fn open_seats(&self) -> u32 {
        let seated = u32::try_from(self.players.len()).unwrap_or(u32::MAX);
        self.max_players.saturating_sub(seated)
    }
}

/// Directory of lobbies that can still be joined or started.
///
/// Lobbies leave the directory when their game starts or they close.
/// Applying the same event twice leaves the directory unchanged.
#[derive(Debug, Default)]
pub struct LobbyDirectory {
    listings: Mutex<BTreeMap<String, LobbyListing>>,
}

impl LobbyDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the directory on `bus` for every lobby event type.
    pub fn register(self: &Arc<Self>, bus: &EventBus) {
        let handler: Arc<dyn EventHandler> = Arc::clone(self) as Arc<dyn EventHandler>;
        for event_type in LOBBY_EVENT_TYPES {
            bus.register_handler(event_type, Arc::clone(&handler));
        }
    }

    /// Rebuilds the directory from the store's global stream.
    ///
    /// Returns the number of lobby events applied.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if the store fails or a lobby event cannot be
    /// decoded.
    pub async fn catch_up(&self, store: &dyn EventStore) -> Result<usize, DomainError> {
        let history = store.read_all(None, None).await?;
        let mut applied = 0;
        for stored in history
            .iter()
            .filter(|s| LOBBY_EVENT_TYPES.iter().any(|t| *t == s.event_type()))
        {
            self.apply(&stored.decode()?);
            applied += 1;
        }
        tracing::debug!(applied, listed = self.len(), "lobby directory caught up");
        Ok(applied)
    }

    /// Returns every open lobby, ordered by id.
    #[must_use]
    pub fn open_lobbies(&self) -> Vec<LobbyListing> {
        self.lock().values().cloned().collect()
    }

    /// Returns the listing for `lobby_id` if it is open.
    #[must_use]
    pub fn get(&self, lobby_id: &str) -> Option<LobbyListing> {
        self.lock().get(lobby_id).cloned()
    }

    /// Number of open lobbies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if no lobby is open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, LobbyListing>> {
        self.listings.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply(&self, event: &LobbyEvent) {
        let mut listings = self.lock();
        match event {
            LobbyEvent::Created(e) => {
                listings
                    .entry(e.lobby_id.clone())
                    .or_insert_with(|| LobbyListing {
                        lobby_id: e.lobby_id.clone(),
                        name: e.name.clone(),
                        host_id: e.host_id.clone(),
                        players: vec![e.host_id.clone()],
                        max_players: e.max_players,
                    });
            }
            LobbyEvent::PlayerJoined(e) => {
                if let Some(listing) = listings
                    .get_mut(&e.lobby_id)
                    .filter(|l| !l.players.contains(&e.player_id))
                {
                    listing.players.push(e.player_id.clone());
                }
            }
            LobbyEvent::PlayerLeft(e) => {
                if let Some(listing) = listings.get_mut(&e.lobby_id) {
                    listing.players.retain(|p| p != &e.player_id);
                    if let Some(next) = listing
                        .players
                        .first()
                        .filter(|_| listing.host_id == e.player_id)
                        .cloned()
                    {
                        listing.host_id = next;
                    }
                }
            }
            LobbyEvent::GameStarted(e) => {
                listings.remove(&e.lobby_id);
            }
            LobbyEvent::Closed(e) => {
                listings.remove(&e.lobby_id);
            }
        }
    }
}

#[async_trait]
impl EventHandler for LobbyDirectory {
    fn name(&self) -> &str {
        "lobby-directory"
    }

    async fn handle(&self, event: &DomainEvent) -> CallbackResult {
        let event: LobbyEvent = event.decode()?;
        self.apply(&event);
        Ok(())
    }
}
