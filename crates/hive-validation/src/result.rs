//! Validation outcomes.

use serde::{Deserialize, Serialize};

/// Why an intent was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The actor belongs to another user.
    NotOwner,
    /// The target is too far away.
    NotInRange,
    /// The actor lacks the energy the action needs.
    NotEnoughEnergy,
    /// The actor lacks a non-energy resource.
    NotEnoughResources,
    /// The user's balance cannot cover the cost.
    NotEnoughMoney,
    /// Another user's safe mode protects the room.
    SafeModeActive,
    /// The acting object does not exist.
    ActorNotFound,
    /// The target does not exist.
    TargetNotFound,
    /// The target exists but cannot receive this action.
    InvalidTarget,
    /// Arguments are missing or malformed.
    InvalidArgs,
    /// The intent is not known for this actor.
    UnknownIntent,
    /// The actor is occupied (spawning, cooling down).
    Busy,
    /// The creep has fatigue.
    Tired,
    /// The target has no free capacity.
    Full,
    /// The actor lacks the body part the action needs.
    NoBodyPart,
    /// The controller level does not permit the action.
    RclNotEnough,
    /// The requested name is already taken.
    NameExists,
}

impl ErrorCode {
    /// Every code, in declaration order.
    pub const ALL: [Self; 17] = [
        Self::NotOwner,
        Self::NotInRange,
        Self::NotEnoughEnergy,
        Self::NotEnoughResources,
        Self::NotEnoughMoney,
        Self::SafeModeActive,
        Self::ActorNotFound,
        Self::TargetNotFound,
        Self::InvalidTarget,
        Self::InvalidArgs,
        Self::UnknownIntent,
        Self::Busy,
        Self::Tired,
        Self::Full,
        Self::NoBodyPart,
        Self::RclNotEnough,
        Self::NameExists,
    ];

    /// Stable name used in logs and statistics.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotOwner => "NOT_OWNER",
            Self::NotInRange => "NOT_IN_RANGE",
            Self::NotEnoughEnergy => "NOT_ENOUGH_ENERGY",
            Self::NotEnoughResources => "NOT_ENOUGH_RESOURCES",
            Self::NotEnoughMoney => "NOT_ENOUGH_MONEY",
            Self::SafeModeActive => "SAFE_MODE_ACTIVE",
            Self::ActorNotFound => "ACTOR_NOT_FOUND",
            Self::TargetNotFound => "TARGET_NOT_FOUND",
            Self::InvalidTarget => "INVALID_TARGET",
            Self::InvalidArgs => "INVALID_ARGS",
            Self::UnknownIntent => "UNKNOWN_INTENT",
            Self::Busy => "BUSY",
            Self::Tired => "TIRED",
            Self::Full => "FULL",
            Self::NoBodyPart => "NO_BODY_PART",
            Self::RclNotEnough => "RCL_NOT_ENOUGH",
            Self::NameExists => "NAME_EXISTS",
        }
    }
}

impl core::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one validator for one intent. Never an error value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationResult {
    /// The intent passes.
    Success,
    /// The intent is rejected.
    Failure(ErrorCode),
}

impl ValidationResult {
    /// Whether the intent passed.
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// The rejection code, if any.
    pub const fn error_code(self) -> Option<ErrorCode> {
        match self {
            Self::Success => None,
            Self::Failure(code) => Some(code),
        }
    }

    /// `Success` when `condition` holds, `Failure(code)` otherwise.
    pub const fn check(condition: bool, code: ErrorCode) -> Self {
        if condition {
            Self::Success
        } else {
            Self::Failure(code)
        }
    }
}

impl From<Result<(), ErrorCode>> for ValidationResult {
    fn from(result: Result<(), ErrorCode>) -> Self {
        match result {
            Ok(()) => Self::Success,
            Err(code) => Self::Failure(code),
        }
    }
}
