use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The output target could not be written, or an input file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record field could not be coerced into something displayable.
    #[error("invalid payslip record: {0}")]
    InvalidRecord(String),

    #[error("PDF error: {0}")]
    Pdf(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::InvalidRecord(e.to_string())
    }
}
