use thiserror::Error;

/// Failures at the inference-backend boundary. Anything in here means the
/// backend call itself went wrong; an empty generated string is not an error.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to Ollama failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Ollama returned HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("structured invocation failed: {0}")]
    Structured(String),
}
