use thiserror::Error;

#[derive(Debug, Error)]
pub enum PanelApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Panel request failed: {0}")]
    Transport(String),
    #[error("Panel request failed. HTTP {status}. {message}")]
    RequestFailed { status: u16, message: String },
    #[error("Could not deserialize panel response: {0}")]
    Json(String),
    #[error("Panel reported an error: {0}")]
    Upstream(String),
}
