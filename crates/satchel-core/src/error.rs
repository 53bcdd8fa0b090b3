//! Error types for the wallet collaborators.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreferencesError {
    #[error("preferences I/O: {0}")] Io(String),
    #[error("preferences serialization: {0}")] Serialization(String),
    #[error("preferences unavailable: {0}")] Unavailable(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("http: {0}")] Http(String),
    #[error("unexpected status {status}: {body}")] Status { status: u16, body: String },
    #[error("invalid response: {0}")] InvalidResponse(String),
    #[error("transaction rejected: {0}")] Rejected(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_status() {
        let e = LedgerError::Status {
            status: 429,
            body: "rate limited".into(),
        };
        assert_eq!(e.to_string(), "unexpected status 429: rate limited");
    }

    #[test]
    fn display_preferences_io() {
        let e = PreferencesError::Io("disk full".into());
        assert_eq!(e.to_string(), "preferences I/O: disk full");
    }
}
