use thiserror::Error;

/// Everything that can go wrong between the HTTP boundary and a handler
/// script.
///
/// Load-time failures (`ScriptLoad`, `EntryPoint`, `NotFound`) are fatal to
/// the environment being created; request-time failures (`Execution`,
/// `MalformedReturn`, `Timeout`) are reported through an error envelope and
/// never escape the HTTP boundary. `Capability` is thrown back into the
/// script as a catchable value rather than propagated here, except when a
/// capability fails before any script is involved.
#[derive(Error, Debug)]
pub enum JsgateError {
    #[error("Script load error: {0}")]
    ScriptLoad(String),

    #[error("Entry point violation: {0}")]
    EntryPoint(String),

    #[error("Handler not found: {0}")]
    NotFound(String),

    #[error("Handler execution error: {0}")]
    Execution(String),

    #[error("Malformed return object: {0}")]
    MalformedReturn(String),

    #[error("Capability error: {0}")]
    Capability(String),

    #[error("Execution timeout after {0}ms")]
    Timeout(u64),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, JsgateError>;
