use thiserror::Error;

use crate::domain::{LockState, TimestampMs};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStatus {
    Locked,
    Unlocked,
}

impl From<&LockState> for LockStatus {
    fn from(state: &LockState) -> Self {
        if state.is_locked {
            LockStatus::Locked
        } else {
            LockStatus::Unlocked
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockAction {
    Authenticate,
    Activity,
    InactivityElapsed,
    Restart,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransition {
    pub from: LockStatus,
    pub to: LockStatus,
    pub reason: &'static str,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("illegal lock transition: {from:?} on {action:?}")]
pub struct TransitionError {
    pub from: LockStatus,
    pub action: LockAction,
}

pub fn lock_transition(
    from: LockStatus,
    action: LockAction,
) -> Result<(LockStatus, StateTransition), TransitionError> {
    use LockAction as A;
    use LockStatus as S;

    let (to, reason) = match (from, action) {
        (S::Locked, A::Authenticate) => (S::Unlocked, "authenticated"),
        (S::Unlocked, A::Authenticate) => (S::Unlocked, "reauthenticated"),
        (S::Unlocked, A::Activity) => (S::Unlocked, "activity"),
        (S::Unlocked, A::InactivityElapsed) => (S::Locked, "inactivity_timeout"),
        (_, A::Restart) => (S::Locked, "restart"),
        (S::Locked, A::Activity) | (S::Locked, A::InactivityElapsed) => {
            return Err(TransitionError { from, action })
        }
    };
    Ok((to, StateTransition { from, to, reason }))
}

/// Applies `action` to a stored lock state. Authentication and activity stamp
/// `now`; locking keeps the previous activity timestamp.
pub fn apply_lock_action(
    state: LockState,
    action: LockAction,
    now: TimestampMs,
) -> Result<(LockState, StateTransition), TransitionError> {
    let (to, transition) = lock_transition(LockStatus::from(&state), action)?;
    let next = match action {
        LockAction::Authenticate | LockAction::Activity => LockState::unlocked_at(now),
        LockAction::InactivityElapsed | LockAction::Restart => LockState {
            is_locked: to == LockStatus::Locked,
            last_activity_timestamp: state.last_activity_timestamp,
        },
    };
    Ok((next, transition))
}

/// True once an unlocked session has been idle for at least `timeout_ms`.
pub fn inactivity_elapsed(state: &LockState, now: TimestampMs, timeout_ms: u64) -> bool {
    !state.is_locked && now.elapsed_since(state.last_activity_timestamp) >= timeout_ms
}
