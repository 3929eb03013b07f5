//! Broadcast fan-out from room actors to connections.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use quizrace_protocol::{RoomId, Snapshot};
use quizrace_room::Broadcaster;
use tokio::sync::broadcast;

/// Snapshots buffered per room before a slow subscriber starts lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 32;

/// One `tokio::sync::broadcast` channel per room.
///
/// Room actors publish through the [`Broadcaster`] impl; connection tasks
/// [`subscribe`](Self::subscribe) when they join a room. A subscriber that
/// falls more than `capacity` snapshots behind loses the oldest ones and
/// picks up from the newest, which is fine because every snapshot is the
/// whole room state.
///
/// The map sits behind a `std` mutex: `send` is synchronous and the lock
/// is never held across an await.
pub struct RoomChannels {
    senders: Mutex<HashMap<RoomId, broadcast::Sender<Snapshot>>>,
    capacity: usize,
}

impl RoomChannels {
    /// Creates an empty set of channels. `capacity` is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            senders: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Subscribes to every snapshot `room_id` publishes from now on.
    pub fn subscribe(&self, room_id: &RoomId) -> broadcast::Receiver<Snapshot> {
        let mut senders = self.senders.lock().unwrap_or_else(PoisonError::into_inner);
        senders
            .entry(room_id.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Number of live subscribers for `room_id`.
    pub fn subscriber_count(&self, room_id: &RoomId) -> usize {
        let senders = self.senders.lock().unwrap_or_else(PoisonError::into_inner);
        senders.get(room_id).map_or(0, broadcast::Sender::receiver_count)
    }
}

impl Default for RoomChannels {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl Broadcaster for RoomChannels {
    fn send(&self, room_id: &RoomId, snapshot: Snapshot) {
        let senders = self.senders.lock().unwrap_or_else(PoisonError::into_inner);
        // No channel yet, or nobody listening: the snapshot is simply dropped.
        if let Some(sender) = senders.get(room_id) {
            let _ = sender.send(snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::{RecvError, TryRecvError};

    fn snapshot(time_left: u32) -> Snapshot {
        Snapshot {
            started: true,
            time_left,
            question: None,
            players: Vec::new(),
            finished: Vec::new(),
        }
    }

    #[test]
    fn test_send_without_subscribers_is_a_no_op() {
        let channels = RoomChannels::default();
        channels.send(&RoomId::default(), snapshot(20));
        assert_eq!(channels.subscriber_count(&RoomId::default()), 0);
    }

    #[test]
    fn test_subscribers_only_see_their_room() {
        let channels = RoomChannels::default();
        let mut main = channels.subscribe(&RoomId::default());
        let mut other = channels.subscribe(&RoomId::new("lobby-2"));

        channels.send(&RoomId::default(), snapshot(19));

        assert_eq!(main.try_recv().unwrap().time_left, 19);
        assert!(matches!(other.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_subscriber_count_tracks_receivers() {
        let channels = RoomChannels::default();
        let room = RoomId::default();
        let a = channels.subscribe(&room);
        let _b = channels.subscribe(&room);
        assert_eq!(channels.subscriber_count(&room), 2);
        drop(a);
        assert_eq!(channels.subscriber_count(&room), 1);
    }

    #[tokio::test]
    async fn test_lagging_subscriber_skips_to_newest() {
        let channels = RoomChannels::new(2);
        let room = RoomId::default();
        let mut rx = channels.subscribe(&room);

        for t in (15..=20).rev() {
            channels.send(&room, snapshot(t));
        }

        assert!(matches!(rx.recv().await, Err(RecvError::Lagged(4))));
        assert_eq!(rx.recv().await.unwrap().time_left, 16);
        assert_eq!(rx.recv().await.unwrap().time_left, 15);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let channels = RoomChannels::new(0);
        let mut rx = channels.subscribe(&RoomId::default());
        channels.send(&RoomId::default(), snapshot(5));
        assert_eq!(rx.try_recv().unwrap().time_left, 5);
    }
}
