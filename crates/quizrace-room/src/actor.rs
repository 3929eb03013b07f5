//! Room actor: a Tokio task that owns one [`Room`] and its timers.
//!
//! Every change to a room goes through this task: commands from the
//! outside arrive on an mpsc channel, while countdown ticks and the
//! delayed auto-advance are branches of the same `select!` loop. One task,
//! one event at a time, so the room needs no locking.

use std::sync::Arc;

use quizrace_protocol::{Player, PlayerId, RoomId, Snapshot};
use quizrace_tick::{Delay, TickInfo, TickScheduler};
use quizrace_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};

use crate::room::{AnswerOutcome, NextOutcome, Room, TickOutcome};
use crate::{Broadcaster, QuestionBank, Rejection, RoomConfig, RoomError};

/// Commands sent to a room actor through its channel.
///
/// Each carries a oneshot reply channel so the caller learns the outcome.
pub(crate) enum RoomCommand {
    Join {
        name: Option<String>,
        color: Option<String>,
        session: Option<ConnectionId>,
        reply: oneshot::Sender<Player>,
    },
    Start {
        reply: oneshot::Sender<Result<(), Rejection>>,
    },
    Next {
        reply: oneshot::Sender<Result<NextOutcome, Rejection>>,
    },
    Reset {
        reply: oneshot::Sender<()>,
    },
    Answer {
        player_id: PlayerId,
        choice: i64,
        reply: oneshot::Sender<Result<AnswerOutcome, Rejection>>,
    },
    Snapshot {
        reply: oneshot::Sender<Snapshot>,
    },
}

/// Handle to a running room actor.
///
/// Cheap to clone — it's just an `mpsc::Sender` wrapper. The registry
/// keeps one per room and hands out clones.
#[derive(Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// Returns the room's id.
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Returns `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Adds a player and returns it, generated id included.
    pub async fn join(
        &self,
        name: Option<String>,
        color: Option<String>,
        session: Option<ConnectionId>,
    ) -> Result<Player, RoomError> {
        self.request(|reply| RoomCommand::Join {
            name,
            color,
            session,
            reply,
        })
        .await
    }

    /// Starts the round.
    pub async fn start(&self) -> Result<(), RoomError> {
        Ok(self.request(|reply| RoomCommand::Start { reply }).await??)
    }

    /// Skips to the next question (or ends the round on the last one).
    pub async fn next(&self) -> Result<NextOutcome, RoomError> {
        Ok(self.request(|reply| RoomCommand::Next { reply }).await??)
    }

    /// Resets the room and every player.
    pub async fn reset(&self) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Reset { reply }).await
    }

    /// Submits `choice` on behalf of `player_id`.
    pub async fn answer(
        &self,
        player_id: PlayerId,
        choice: i64,
    ) -> Result<AnswerOutcome, RoomError> {
        Ok(self
            .request(|reply| RoomCommand::Answer {
                player_id,
                choice,
                reply,
            })
            .await??)
    }

    /// Reads the current snapshot without changing anything.
    pub async fn snapshot(&self) -> Result<Snapshot, RoomError> {
        self.request(|reply| RoomCommand::Snapshot { reply }).await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))
    }
}

/// The actor state. Runs inside a Tokio task.
struct RoomActor<B: Broadcaster> {
    room: Room,
    config: Arc<RoomConfig>,
    ticker: TickScheduler,
    advance: Delay,
    broadcaster: Arc<B>,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl<B: Broadcaster> RoomActor<B> {
    /// Runs until every handle is dropped.
    async fn run(mut self) {
        tracing::info!(room_id = %self.room.id(), "room actor started");

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
                info = self.ticker.wait_for_tick() => self.handle_tick(info),
                _ = self.advance.wait() => self.handle_advance(),
            }
        }

        tracing::info!(room_id = %self.room.id(), "room actor stopped");
    }

    fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join {
                name,
                color,
                session,
                reply,
            } => {
                let player = self.room.join(name.as_deref(), color.as_deref(), session);
                tracing::info!(
                    room_id = %self.room.id(),
                    player_id = %player.id,
                    name = %player.name,
                    players = self.room.players().len(),
                    "player joined"
                );
                self.broadcast();
                let _ = reply.send(player);
            }
            RoomCommand::Start { reply } => {
                let result = self.room.start();
                if result.is_ok() {
                    self.ticker.start();
                    self.advance.disarm();
                    tracing::info!(room_id = %self.room.id(), "round started");
                    self.broadcast();
                } else {
                    self.log_rejection("start", &result);
                }
                let _ = reply.send(result);
            }
            RoomCommand::Next { reply } => {
                let result = self.apply_next();
                self.log_rejection("next", &result);
                let _ = reply.send(result);
            }
            RoomCommand::Reset { reply } => {
                self.room.reset();
                self.ticker.stop();
                self.advance.disarm();
                tracing::info!(room_id = %self.room.id(), "room reset");
                self.broadcast();
                let _ = reply.send(());
            }
            RoomCommand::Answer {
                player_id,
                choice,
                reply,
            } => {
                let result = self.room.answer(&player_id, choice);
                match &result {
                    Ok(AnswerOutcome::Correct {
                        points,
                        place: Some(place),
                        ..
                    }) => {
                        tracing::info!(
                            room_id = %self.room.id(),
                            %player_id,
                            points,
                            place,
                            "player finished"
                        );
                    }
                    Ok(outcome) => {
                        tracing::debug!(
                            room_id = %self.room.id(),
                            %player_id,
                            ?outcome,
                            "answer scored"
                        );
                    }
                    Err(_) => self.log_rejection("answer", &result),
                }
                if result.is_ok() {
                    self.broadcast();
                }
                let _ = reply.send(result);
            }
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.room.snapshot());
            }
        }
    }

    /// One tick is one second. When the scheduler skipped intervals to
    /// catch up, those seconds come off the clock too.
    fn handle_tick(&mut self, info: TickInfo) {
        let seconds = u32::try_from(info.ticks_skipped)
            .unwrap_or(u32::MAX)
            .saturating_add(1);
        if info.overrun {
            tracing::debug!(
                room_id = %self.room.id(),
                tick = info.tick,
                skipped = info.ticks_skipped,
                "late tick"
            );
        }
        match self.room.elapse(seconds) {
            Ok(TickOutcome::TimeUp) => {
                tracing::debug!(room_id = %self.room.id(), "time up");
                self.advance.arm(self.config.advance_delay);
            }
            Ok(TickOutcome::Counting) => {}
            Err(_) => {
                // Unreachable while timers are kept in step with the phase.
                self.ticker.stop();
                return;
            }
        }
        tracing::trace!(
            room_id = %self.room.id(),
            time_left = self.room.time_left(),
            "tick"
        );
        self.broadcast();
    }

    fn handle_advance(&mut self) {
        let result = self.apply_next();
        self.log_rejection("auto-advance", &result);
    }

    /// Shared by manual skips and the automatic advance.
    fn apply_next(&mut self) -> Result<NextOutcome, Rejection> {
        let outcome = self.room.next()?;
        self.advance.disarm();
        match outcome {
            NextOutcome::Advanced(index) => {
                tracing::debug!(room_id = %self.room.id(), index, "next question");
            }
            NextOutcome::RoundOver => {
                self.ticker.stop();
                tracing::info!(room_id = %self.room.id(), "round over");
            }
        }
        self.broadcast();
        Ok(outcome)
    }

    fn broadcast(&self) {
        self.broadcaster.send(self.room.id(), self.room.snapshot());
    }

    fn log_rejection<T>(&self, op: &str, result: &Result<T, Rejection>) {
        if let Err(reason) = result {
            tracing::debug!(
                room_id = %self.room.id(),
                op,
                %reason,
                "request rejected"
            );
        }
    }
}

/// Spawns a room actor task and returns a handle to it.
pub(crate) fn spawn_room<B: Broadcaster>(
    room_id: RoomId,
    config: Arc<RoomConfig>,
    questions: Arc<QuestionBank>,
    broadcaster: Arc<B>,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.command_buffer);

    let actor = RoomActor {
        room: Room::new(room_id.clone(), Arc::clone(&config), questions),
        ticker: TickScheduler::new(config.tick.clone()),
        advance: Delay::new(),
        config,
        broadcaster,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        room_id,
        sender: tx,
    }
}
