//! The broadcaster seam between rooms and the transport layer.

use std::sync::Arc;

use quizrace_protocol::{RoomId, Snapshot};
use tokio::sync::mpsc;

/// Pushes a room's snapshot to every member of that room.
///
/// Implemented by the transport side. Fire-and-forget: `send` must not
/// block and nothing comes back, so a slow or vanished client can never
/// stall a room.
pub trait Broadcaster: Send + Sync + 'static {
    /// Delivers `snapshot` to every member of `room_id`.
    fn send(&self, room_id: &RoomId, snapshot: Snapshot);
}

impl<B: Broadcaster + ?Sized> Broadcaster for Arc<B> {
    fn send(&self, room_id: &RoomId, snapshot: Snapshot) {
        (**self).send(room_id, snapshot);
    }
}

/// Forwards every snapshot into an unbounded channel. Dropped silently
/// once the receiver is gone.
impl Broadcaster for mpsc::UnboundedSender<(RoomId, Snapshot)> {
    fn send(&self, room_id: &RoomId, snapshot: Snapshot) {
        let _ = mpsc::UnboundedSender::send(self, (room_id.clone(), snapshot));
    }
}
