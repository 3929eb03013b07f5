//! Room configuration and lifecycle phase.

use std::time::Duration;

use quizrace_tick::TickConfig;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Settings shared by every room in a registry.
///
/// Every field has an explicit default; callers override only what they
/// need with struct update syntax:
///
/// ```rust
/// use quizrace_room::RoomConfig;
///
/// let config = RoomConfig {
///     question_seconds: 10,
///     ..RoomConfig::default()
/// };
/// assert_eq!(config.finish_slots, 3);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Countdown length for each question, in seconds.
    pub question_seconds: u32,

    /// Countdown ticker settings. One tick takes one second off the clock.
    pub tick: TickConfig,

    /// Pause between the countdown hitting zero and the automatic advance,
    /// so clients can show "time's up".
    pub advance_delay: Duration,

    /// How many finishers are recorded.
    pub finish_slots: usize,

    /// Colors handed out to players who join without one.
    pub palette: Vec<String>,

    /// Avatar glyphs, one picked at random per player.
    pub avatars: Vec<String>,

    /// Capacity of each room's command channel.
    pub command_buffer: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            question_seconds: 20,
            tick: TickConfig::default(),
            advance_delay: Duration::from_millis(400),
            finish_slots: 3,
            palette: [
                "#ef4444", "#f97316", "#eab308", "#22c55e", "#06b6d4",
                "#3b82f6", "#8b5cf6", "#ec4899",
            ]
            .map(String::from)
            .to_vec(),
            avatars: [
                "🦊", "🐢", "🐇", "🦄", "🐙", "🐸", "🐼", "🦉", "🐝", "🐧",
            ]
            .map(String::from)
            .to_vec(),
            command_buffer: 64,
        }
    }
}

impl RoomConfig {
    /// Color used when the palette is empty.
    pub const FALLBACK_COLOR: &'static str = "#94a3b8";

    /// Avatar used when the avatar list is empty.
    pub const FALLBACK_AVATAR: &'static str = "🏁";

    /// Fix values that would break a room at runtime.
    ///
    /// A zero-capacity command channel panics on creation, so
    /// `command_buffer` is raised to 1.
    pub fn validated(mut self) -> Self {
        if self.command_buffer == 0 {
            tracing::warn!("command_buffer of 0 is invalid — using 1");
            self.command_buffer = 1;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// RoomPhase
// ---------------------------------------------------------------------------

/// Where a room is in its lifecycle.
///
/// ```text
/// Idle ──start()──→ Running ──next() past last question──→ Idle
///                      └──────────────reset()────────────→ Idle
/// ```
///
/// - **Idle**: players can join; answers are ignored; no timer runs.
/// - **Running**: the countdown ticks and answers are scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RoomPhase {
    #[default]
    Idle,
    Running,
}

impl RoomPhase {
    /// Returns `true` while a round is in progress.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl std::fmt::Display for RoomPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Running => write!(f, "Running"),
        }
    }
}
