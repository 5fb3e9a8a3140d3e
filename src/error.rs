use thiserror::Error;

/// Error kinds raised by the aggregation and annotation pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// An external provider was unreachable or returned a malformed payload. Fatal.
    #[error("failed to fetch {what} from {location}: {reason}")]
    Download {
        what: &'static str,
        location: String,
        reason: String,
    },

    /// A metric column is non-numeric, empty, or a required field is absent.
    /// Fatal for that column or region only.
    #[error("data error in column {column:?}: {reason}")]
    Data { column: String, reason: String },

    /// A geometry feature or aggregate row found no counterpart during the join.
    #[error("no match for {side} {value:?}")]
    JoinMiss { side: &'static str, value: String },

    /// A combined column name has no registered translation.
    #[error("no label registered for {name:?}")]
    LabelMiss { name: String },

    /// The D90/D10 extreme ratio was requested with a zero D10.
    #[error("division by zero rendering the extreme ratio of {code:?}")]
    DivisionByZero { code: String },
}

impl PipelineError {
    pub(crate) fn data(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Data { column: column.into(), reason: reason.into() }
    }

    pub(crate) fn download(what: &'static str, location: impl Into<String>, reason: impl ToString) -> Self {
        Self::Download { what, location: location.into(), reason: reason.to_string() }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
