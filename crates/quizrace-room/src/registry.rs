//! Room registry: get-or-create lookup of rooms by id.

use std::collections::HashMap;
use std::sync::Arc;

use quizrace_protocol::RoomId;

use crate::actor::spawn_room;
use crate::{Broadcaster, QuestionBank, RoomConfig, RoomHandle};

/// Owns every room in the process.
///
/// Created by the server entry point and passed to whatever dispatches
/// client requests. Rooms are spawned lazily the first time an id is
/// referenced and live as long as the registry.
///
/// Not thread-safe by itself; the server wraps it in a mutex held only
/// for the lookup.
pub struct RoomRegistry<B: Broadcaster> {
    rooms: HashMap<RoomId, RoomHandle>,
    config: Arc<RoomConfig>,
    questions: Arc<QuestionBank>,
    broadcaster: Arc<B>,
}

impl<B: Broadcaster> RoomRegistry<B> {
    /// Creates an empty registry. Every room it spawns shares `config`,
    /// `questions` and `broadcaster`.
    pub fn new(config: RoomConfig, questions: Arc<QuestionBank>, broadcaster: Arc<B>) -> Self {
        Self {
            rooms: HashMap::new(),
            config: Arc::new(config.validated()),
            questions,
            broadcaster,
        }
    }

    /// Returns the room with this id, spawning it on first use.
    ///
    /// A room whose actor has died is replaced by a fresh one.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn room(&mut self, room_id: &RoomId) -> RoomHandle {
        if let Some(handle) = self.rooms.get(room_id) {
            if !handle.is_closed() {
                return handle.clone();
            }
            tracing::warn!(%room_id, "room actor gone, respawning");
        }

        let handle = spawn_room(
            room_id.clone(),
            Arc::clone(&self.config),
            Arc::clone(&self.questions),
            Arc::clone(&self.broadcaster),
        );
        self.rooms.insert(room_id.clone(), handle.clone());
        tracing::info!(%room_id, rooms = self.rooms.len(), "room created");
        handle
    }

    /// Returns the room with this id if it already exists.
    pub fn get(&self, room_id: &RoomId) -> Option<RoomHandle> {
        self.rooms.get(room_id).cloned()
    }

    /// Number of rooms created so far.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Ids of every room, in no particular order.
    pub fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.keys().cloned().collect()
    }

    /// The configuration shared by all rooms.
    pub fn config(&self) -> &RoomConfig {
        &self.config
    }
}
