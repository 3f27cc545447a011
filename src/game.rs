//! Games and the external store they are fetched from.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::identity::LookupError;

/// A saved game. Each user owns at most one.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub owner_id: String,
    pub name: String,
    pub turn: u32,
}

/// External game lookup, keyed by owner id.
#[async_trait]
pub trait GameStore: Send + Sync {
    async fn find_by_owner(&self, owner_id: &str) -> Result<Option<Game>, LookupError>;
}

/// In-memory [`GameStore`].
#[derive(Debug, Default)]
pub struct MemoryGameStore {
    games: RwLock<HashMap<String, Game>>,
    offline: AtomicBool,
}

impl MemoryGameStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_game(self, game: Game) -> Self {
        self.insert(game);
        self
    }

    pub fn insert(&self, game: Game) {
        let mut games = self.games.write().unwrap_or_else(|e| e.into_inner());
        games.insert(game.owner_id.clone(), game);
    }

    /// While offline every lookup fails with [`LookupError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }
}

#[async_trait]
impl GameStore for MemoryGameStore {
    async fn find_by_owner(&self, owner_id: &str) -> Result<Option<Game>, LookupError> {
        if self.offline.load(Ordering::Relaxed) {
            return Err(LookupError::Unavailable("game store offline".to_owned()));
        }
        let games = self.games.read().unwrap_or_else(|e| e.into_inner());
        Ok(games.get(owner_id).cloned())
    }
}
