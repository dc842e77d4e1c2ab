use std::{fmt, io};

/// Direction of a single core transition.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Transition {
    Offline,
    Online,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Offline => write!(f, "offline"),
            Transition::Online => write!(f, "online"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GovernorError {
    /// Malformed or out-of-range attribute write; nothing was mutated.
    #[error("invalid argument for {attr}: {value:?}")]
    InvalidArgument { attr: &'static str, value: String },

    #[error("unknown attribute: {0}")]
    UnknownAttribute(String),

    #[error("failed to allocate helper work queue: {0}")]
    QueueAlloc(#[source] io::Error),

    #[error("failed to register state notifier callback: {0}")]
    Register(String),

    /// The platform refused to move a core. Never fatal to a pass.
    #[error("cpu{core} could not be switched {action}: {reason}")]
    Transition {
        core: usize,
        action: Transition,
        reason: String,
    },
}

impl GovernorError {
    pub fn invalid(attr: &'static str, value: impl Into<String>) -> Self {
        GovernorError::InvalidArgument {
            attr,
            value: value.into(),
        }
    }

    pub fn transition(core: usize, action: Transition, reason: impl fmt::Display) -> Self {
        GovernorError::Transition {
            core,
            action,
            reason: reason.to_string(),
        }
    }

    /// True for failures surfaced to an attribute writer as EINVAL.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            GovernorError::InvalidArgument { .. } | GovernorError::UnknownAttribute(_)
        )
    }
}

pub type GovernorResult<T> = Result<T, GovernorError>;
