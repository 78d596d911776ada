//! Error types for the Lua runtime

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LuaBridgeError {
    #[error("Lua error: {0}")]
    Lua(#[from] mlua::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] osibridge_config::ConfigError),

    #[error("Osiris callback manager is no longer available")]
    ManagerUnavailable,

    #[error("Lua runtime has been shut down")]
    RuntimeShutDown,

    #[error(transparent)]
    InvalidPhase(#[from] osibridge_core::ParsePhaseError),
}

impl From<LuaBridgeError> for mlua::Error {
    fn from(err: LuaBridgeError) -> Self {
        match err {
            LuaBridgeError::Lua(inner) => inner,
            other => mlua::Error::runtime(other.to_string()),
        }
    }
}

pub type LuaBridgeResult<T> = Result<T, LuaBridgeError>;
