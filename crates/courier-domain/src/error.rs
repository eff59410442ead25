/// Validation failure while constructing a domain value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("invalid fiscal code")]
    InvalidFiscalCode,
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("{field} length {len} is outside {min}..={max}")]
    LengthOutOfBounds {
        field: &'static str,
        len: usize,
        min: usize,
        max: usize,
    },
    #[error("time to live {0}s is outside 3600..=31536000")]
    TimeToLiveOutOfBounds(u32),
}
