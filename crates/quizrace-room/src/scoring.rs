//! Scoring rules for correct answers.
//!
//! A correct answer pushes the racer down the track and awards points.
//! Both grow with the time left on the clock (the speed bonus) and with
//! the racer's current streak.

/// Length of the track. Progress is clamped to `0.0..=TRACK_LENGTH`.
pub const TRACK_LENGTH: f64 = 100.0;

/// Seconds at the end of the countdown that earn no speed bonus.
pub const BONUS_GRACE_SECONDS: u32 = 5;

/// Speed bonus per second left beyond the grace window.
pub const BONUS_PER_SECOND: f64 = 0.8;

const BASE_PUSH: f64 = 18.0;
const STREAK_PUSH: f64 = 4.0;
const BASE_POINTS: f64 = 100.0;
const SPEED_POINTS: f64 = 5.0;
const STREAK_POINTS: f64 = 10.0;

/// What a correct answer is worth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Award {
    /// `max(0, time_left - 5) * 0.8`
    pub speed_bonus: f64,
    /// Track distance gained, before clamping.
    pub push: f64,
    /// Points added to the score.
    pub points: u64,
}

/// Computes the award for a correct answer with `time_left` seconds on the
/// clock by a racer whose streak (before this answer) is `streak`.
pub fn award(time_left: u32, streak: u32) -> Award {
    let speed_bonus = f64::from(time_left.saturating_sub(BONUS_GRACE_SECONDS)) * BONUS_PER_SECOND;
    let streak = f64::from(streak);
    let push = BASE_PUSH + speed_bonus + streak * STREAK_PUSH;
    let points = (BASE_POINTS + speed_bonus * SPEED_POINTS + streak * STREAK_POINTS).round() as u64;
    Award {
        speed_bonus,
        push,
        points,
    }
}

/// Adds `push` to `progress`, keeping the result on the track.
pub fn advance(progress: f64, push: f64) -> f64 {
    (progress + push).clamp(0.0, TRACK_LENGTH)
}
