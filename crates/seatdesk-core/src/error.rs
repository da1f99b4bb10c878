use thiserror::Error;

/// Errors returned by seatdesk-core operations.
#[derive(Debug, Error)]
pub enum SeatError {
    /// User input was rejected before any request was sent.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The request never produced a usable response (connect, timeout, TLS...).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The record store answered with a non-success status.
    #[error("record store rejected the request ({status}): {message}")]
    Store { status: u16, message: String },

    /// A response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The referenced record does not exist in the collection.
    #[error("record not found: {0}")]
    NotFound(String),

    /// A configured value (URL, collection name) is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SeatError {
    /// `true` when the failure is caused by the submitted values rather than
    /// the network or the store being unavailable.
    ///
    /// The store reports field-level rejections (duplicate names, missing
    /// required fields) as 400.
    pub fn is_validation(&self) -> bool {
        match self {
            SeatError::Validation(_) => true,
            SeatError::Store { status, .. } => *status == 400 || *status == 422,
            _ => false,
        }
    }

    /// `true` for failures reaching or talking to the record store.
    pub fn is_transport(&self) -> bool {
        match self {
            SeatError::Transport(_) | SeatError::Decode(_) => true,
            SeatError::Store { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<validator::ValidationErrors> for SeatError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(m) => m.to_string(),
                    None => format!("{field} is invalid"),
                })
            })
            .collect();
        messages.sort();
        SeatError::Validation(messages.join("; "))
    }
}
