use thiserror::Error;

/// Failure categories of the interaction core. None of these are fatal: the
/// state machines turn them into sentinel returns and log lines.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InteractionError {
    #[error("{what} resolved to nothing")]
    InvalidReference { what: &'static str },
    #[error("mutation attempted off the authority side")]
    NotAuthority,
    #[error("interaction cooldown has not elapsed")]
    CooldownActive,
    #[error("config row `{row}` could not be found")]
    ConfigLookupFailure { row: String },
}
