/// Core error type for the bot.
///
/// Adapter crates map their specific errors into this type so the core can
/// handle failures consistently. Token-validation variants double as the
/// user-facing chat text: the dispatcher renders them verbatim, so their
/// `Display` strings are part of the bot's observable behavior.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    /// Lookup miss (unknown username or unbound chat).
    #[error("could not get this chat")]
    NotFound,

    /// Presented token matches no current link.
    #[error("can't validate this token")]
    InvalidToken,

    /// Presented token matched a link but its window has passed.
    #[error("token has expired")]
    TokenExpired,

    /// Notification requested for a username with no bound chat.
    #[error("user has no linked chat")]
    UserNotLinked,

    /// The schedule collaborator has no schedule for this user.
    #[error("schedule not found")]
    ScheduleNotFound,

    /// Any other schedule collaborator failure.
    #[error("schedule error: {0}")]
    Schedule(String),

    #[error("registration failed: {0}")]
    Persistence(String),

    #[error("transport send failed: {0}")]
    TransportSend(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Persistence(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
