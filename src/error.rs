//! Unified error handling for musterbot.
//!
//! Three layers, matching how errors propagate:
//! - `PlatformError`: chat-platform I/O (message edits, reaction queries,
//!   role changes).
//! - `SetupError`: administrative operations; always surfaced to the caller.
//! - `EngineError`: reaction reconciliation; logged and swallowed at the
//!   gateway boundary, never propagated to the event dispatcher.

use crate::db::DbError;
use thiserror::Error;

// ============================================================================
// Platform Errors (chat-platform I/O)
// ============================================================================

/// Errors from the chat platform.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("discord api error: {0}")]
    Http(#[from] serenity::Error),

    /// The platform refused or could not complete an operation.
    /// Carries a short description of what was attempted.
    #[error("platform unavailable: {0}")]
    Unavailable(String),
}

impl PlatformError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Http(_) => "discord_api",
            Self::Unavailable(_) => "unavailable",
        }
    }
}

// ============================================================================
// Setup Errors (administrative operations)
// ============================================================================

/// Errors from setup and registration operations.
///
/// These are user-facing: the caller invoked an explicit command and gets
/// the failure back, unlike reaction handling which degrades silently.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("this guild is already registered")]
    AlreadyRegistered(i64),

    #[error("this guild is not registered")]
    NotRegistered(i64),

    #[error("no recruiting channel has been designated")]
    NoRecruitChannel,

    #[error("a poll needs between 1 and {max} choices, got {got}")]
    InvalidChoiceCount { got: usize, max: usize },

    #[error("that reaction is already bound on this panel: {0}")]
    DuplicateToken(String),

    #[error("that role is already bound on this panel: {0}")]
    DuplicateRole(i64),

    #[error("no such panel: {0}")]
    NoSuchPanel(i64),

    #[error("that reaction is not bound on this panel: {0}")]
    NoSuchBinding(String),

    #[error("database error: {0}")]
    Db(DbError),

    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),
}

impl SetupError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AlreadyRegistered(_) => "already_registered",
            Self::NotRegistered(_) => "not_registered",
            Self::NoRecruitChannel => "no_recruit_channel",
            Self::InvalidChoiceCount { .. } => "invalid_choice_count",
            Self::DuplicateToken(_) => "duplicate_token",
            Self::DuplicateRole(_) => "duplicate_role",
            Self::NoSuchPanel(_) => "no_such_panel",
            Self::NoSuchBinding(_) => "no_such_binding",
            Self::Db(_) => "db_error",
            Self::Platform(_) => "platform_error",
        }
    }

    /// Whether the failure is the caller's mistake rather than an outage.
    /// Caller mistakes are logged at warn, outages at error.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, Self::Db(_) | Self::Platform(_))
    }
}

impl From<DbError> for SetupError {
    fn from(err: DbError) -> Self {
        // Duplicate-binding violations come out of the store; present them
        // as the setup-level rejection they are.
        match err {
            DbError::ServerExists(guild) => SetupError::AlreadyRegistered(guild),
            DbError::DuplicateBindingToken(label) => SetupError::DuplicateToken(label),
            DbError::DuplicateBindingRole(role) => SetupError::DuplicateRole(role),
            other => SetupError::Db(other),
        }
    }
}

/// Result type for setup operations.
pub type SetupResult<T> = Result<T, SetupError>;

// ============================================================================
// Engine Errors (reaction reconciliation)
// ============================================================================

/// Errors from a reconciliation pass.
///
/// A failed pass aborts its transaction and drops the event; the next event
/// on the same message re-derives everything from live state, so nothing is
/// retried here.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("database error: {0}")]
    Db(#[from] DbError),

    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),
}

impl EngineError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Db(_) => "db_error",
            Self::Platform(_) => "platform_error",
        }
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        // Transaction begin/commit hand back raw sqlx errors; fold them
        // into the store layer so they label as db_error like every other
        // store failure.
        EngineError::Db(DbError::from(err))
    }
}
