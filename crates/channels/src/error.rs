use std::error::Error as StdError;

/// Crate-wide result type for platform lookups.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed errors raised at the platform boundary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input payload or parameter is invalid.
    #[error("invalid platform input: {message}")]
    InvalidInput { message: String },

    /// The requested member is not part of the guild (or no longer is).
    #[error("unknown member {user_id} in guild {guild_id}")]
    UnknownMember { guild_id: String, user_id: String },

    /// Lookup did not complete in time.
    #[error("platform lookup timed out after {millis}ms")]
    Timeout { millis: u64 },

    /// Wrapped source error from the platform library.
    #[error("platform lookup failed: {context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// Integer parsing failed (snowflake ids).
    #[error(transparent)]
    ParseInt(#[from] std::num::ParseIntError),
}

impl Error {
    #[must_use]
    pub fn invalid_input(message: impl std::fmt::Display) -> Self {
        Self::InvalidInput {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn unknown_member(guild_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self::UnknownMember {
            guild_id: guild_id.into(),
            user_id: user_id.into(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }
}
