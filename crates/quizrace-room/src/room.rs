//! The room engine: all game state for one room and the rules that
//! change it.
//!
//! [`Room`] is a plain synchronous state machine. It knows nothing about
//! tasks, channels or clocks — [`tick`](Room::tick) is called by whoever
//! owns the timer (the room actor), and the actor decides when to broadcast.
//! That keeps every rule testable without a runtime.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use quizrace_protocol::{Player, PlayerId, Question, RoomId, Snapshot};
use quizrace_transport::ConnectionId;
use rand::Rng;
use rand::distr::Alphanumeric;
use rand::seq::IndexedRandom;

use crate::scoring::{self, TRACK_LENGTH};
use crate::{QuestionBank, Rejection, RoomConfig, RoomPhase};

/// Length of generated player ids.
const PLAYER_ID_LEN: usize = 8;

/// Result of one countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The clock moved (or was already at zero with an advance pending).
    Counting,
    /// The clock just ran out. The owner should schedule one advance.
    TimeUp,
}

/// Result of [`Room::next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextOutcome {
    /// Moved on to the question at this index.
    Advanced(usize),
    /// The last question is done; the room is idle again.
    RoundOver,
}

/// Result of an accepted answer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnswerOutcome {
    /// Wrong choice. Streak is back to zero.
    Wrong,
    /// Right choice.
    Correct {
        /// Points added to the score.
        points: u64,
        /// Track position after the push.
        progress: f64,
        /// 1-based finishing place, if this answer crossed the line and a
        /// finish slot was still free.
        place: Option<usize>,
    },
}

/// One isolated game instance.
pub struct Room {
    id: RoomId,
    config: Arc<RoomConfig>,
    questions: Arc<QuestionBank>,
    phase: RoomPhase,
    index: usize,
    time_left: u32,
    /// Players in join order. Never shrinks, so positions in `lookup` stay valid.
    players: Vec<Player>,
    lookup: HashMap<PlayerId, usize>,
    finished: Vec<PlayerId>,
    answered: HashSet<PlayerId>,
    /// Set when the countdown hits zero, cleared whenever the question
    /// changes or the round starts or resets.
    advance_pending: bool,
}

impl Room {
    /// Creates an idle room with no players.
    pub fn new(id: RoomId, config: Arc<RoomConfig>, questions: Arc<QuestionBank>) -> Self {
        let time_left = config.question_seconds;
        Self {
            id,
            config,
            questions,
            phase: RoomPhase::Idle,
            index: 0,
            time_left,
            players: Vec::new(),
            lookup: HashMap::new(),
            finished: Vec::new(),
            answered: HashSet::new(),
            advance_pending: false,
        }
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Adds a new player at the starting line and returns it.
    ///
    /// A missing or blank `name` becomes "Racer N"; a missing or blank
    /// `color` is drawn from the configured palette. The avatar is always
    /// random. Joining is allowed in any phase.
    pub fn join(
        &mut self,
        name: Option<&str>,
        color: Option<&str>,
        session: Option<ConnectionId>,
    ) -> Player {
        let mut rng = rand::rng();
        let id = self.fresh_player_id(&mut rng);

        let name = match name.map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => format!("Racer {}", self.players.len() + 1),
        };
        let color = match color.map(str::trim) {
            Some(c) if !c.is_empty() => c.to_string(),
            _ => self
                .config
                .palette
                .choose(&mut rng)
                .cloned()
                .unwrap_or_else(|| RoomConfig::FALLBACK_COLOR.to_string()),
        };
        let avatar = self
            .config
            .avatars
            .choose(&mut rng)
            .cloned()
            .unwrap_or_else(|| RoomConfig::FALLBACK_AVATAR.to_string());

        let player = Player {
            id: id.clone(),
            name,
            color,
            avatar,
            progress: 0.0,
            score: 0,
            streak: 0,
            session,
        };
        self.lookup.insert(id, self.players.len());
        self.players.push(player.clone());
        player
    }

    /// Starts a round from the first question.
    ///
    /// Scores are kept; only [`reset`](Self::reset) clears them.
    pub fn start(&mut self) -> Result<(), Rejection> {
        if self.phase.is_running() {
            return Err(Rejection::AlreadyStarted);
        }
        self.phase = RoomPhase::Running;
        self.index = 0;
        self.time_left = self.config.question_seconds;
        self.finished.clear();
        self.answered.clear();
        self.advance_pending = false;
        Ok(())
    }

    /// Takes one second off the clock, stopping at zero.
    ///
    /// Reports [`TickOutcome::TimeUp`] exactly once per question: the
    /// first tick that finds the clock at zero. Later ticks at zero are
    /// plain [`TickOutcome::Counting`].
    pub fn tick(&mut self) -> Result<TickOutcome, Rejection> {
        self.elapse(1)
    }

    /// Takes `seconds` off the clock at once, for a ticker that fell
    /// behind. Same zero floor and single `TimeUp` as [`tick`](Self::tick).
    pub fn elapse(&mut self, seconds: u32) -> Result<TickOutcome, Rejection> {
        if !self.phase.is_running() {
            return Err(Rejection::NotStarted);
        }
        self.time_left = self.time_left.saturating_sub(seconds);
        if self.time_left == 0 && !self.advance_pending {
            self.advance_pending = true;
            return Ok(TickOutcome::TimeUp);
        }
        Ok(TickOutcome::Counting)
    }

    /// Moves to the next question, or ends the round after the last one.
    ///
    /// Players who let the outgoing question pass without answering lose
    /// their streak. At the end of the round the index stays on the last
    /// question.
    pub fn next(&mut self) -> Result<NextOutcome, Rejection> {
        if !self.phase.is_running() {
            return Err(Rejection::NotStarted);
        }
        for player in &mut self.players {
            if !self.answered.contains(&player.id) {
                player.streak = 0;
            }
        }
        self.advance_pending = false;

        if self.index + 1 < self.questions.len() {
            self.index += 1;
            self.time_left = self.config.question_seconds;
            self.answered.clear();
            Ok(NextOutcome::Advanced(self.index))
        } else {
            self.phase = RoomPhase::Idle;
            Ok(NextOutcome::RoundOver)
        }
    }

    /// Puts the room and every player back at the start. Always succeeds.
    pub fn reset(&mut self) {
        self.phase = RoomPhase::Idle;
        self.index = 0;
        self.time_left = self.config.question_seconds;
        self.finished.clear();
        self.answered.clear();
        self.advance_pending = false;
        for player in &mut self.players {
            player.progress = 0.0;
            player.score = 0;
            player.streak = 0;
        }
    }

    /// Scores `choice` for `player_id` on the current question.
    ///
    /// At most one answer per player per question is accepted. A choice
    /// outside the question's choices, negative included, is just wrong.
    pub fn answer(&mut self, player_id: &PlayerId, choice: i64) -> Result<AnswerOutcome, Rejection> {
        if !self.phase.is_running() {
            return Err(Rejection::NotStarted);
        }
        let correct = self
            .questions
            .get(self.index)
            .ok_or(Rejection::NoQuestion)?
            .answer;
        let slot = *self.lookup.get(player_id).ok_or(Rejection::UnknownPlayer)?;
        if !self.answered.insert(player_id.clone()) {
            return Err(Rejection::AlreadyAnswered);
        }

        let player = &mut self.players[slot];
        if usize::try_from(choice).ok() != Some(correct) {
            player.streak = 0;
            return Ok(AnswerOutcome::Wrong);
        }

        let award = scoring::award(self.time_left, player.streak);
        player.progress = scoring::advance(player.progress, award.push);
        player.score += award.points;
        player.streak += 1;
        let progress = player.progress;

        let mut place = None;
        if progress >= TRACK_LENGTH
            && self.finished.len() < self.config.finish_slots
            && !self.finished.contains(player_id)
        {
            self.finished.push(player_id.clone());
            place = Some(self.finished.len());
        }

        Ok(AnswerOutcome::Correct {
            points: award.points,
            progress,
            place,
        })
    }

    /// The externally visible state of the room.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            started: self.phase.is_running(),
            time_left: self.time_left,
            question: self.current_question().cloned(),
            players: self.players.clone(),
            finished: self
                .finished
                .iter()
                .take(self.config.finish_slots)
                .cloned()
                .collect(),
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn phase(&self) -> RoomPhase {
        self.phase
    }

    /// Index of the current question.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Seconds left on the current question.
    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.index)
    }

    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.lookup.get(id).map(|&slot| &self.players[slot])
    }

    /// Players in join order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Finishers in arrival order.
    pub fn finished(&self) -> &[PlayerId] {
        &self.finished
    }

    /// Whether `id` has answered the current question.
    pub fn has_answered(&self, id: &PlayerId) -> bool {
        self.answered.contains(id)
    }

    /// Whether the countdown ran out and an advance is still owed.
    pub fn advance_pending(&self) -> bool {
        self.advance_pending
    }

    fn fresh_player_id(&self, rng: &mut impl Rng) -> PlayerId {
        loop {
            let raw: String = (0..PLAYER_ID_LEN)
                .map(|_| char::from(rng.sample(Alphanumeric)))
                .collect();
            let id = PlayerId::new(raw);
            if !self.lookup.contains_key(&id) {
                return id;
            }
        }
    }
}
