use thiserror::Error;

#[derive(Debug, Error)]
pub enum UiError {
    #[error("Not enough screen width, min {min} characters required (have {actual}).")]
    TerminalTooNarrow { min: u16, actual: u16 },
    #[error("Not enough screen height, min {min} histogram lines required (have {actual}).")]
    TerminalTooShort { min: u16, actual: u16 },
    #[error("Failed to query terminal size: {source}")]
    TerminalSize {
        #[source]
        source: std::io::Error,
    },
}
