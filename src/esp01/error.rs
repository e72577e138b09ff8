#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AtError {
    /// Deadline passed without any marker showing up.
    Timeout,
    /// The modem answered `ERROR` or `FAIL`.
    ModemFailure,
    /// `+IPD` and `HTTP` were seen but the request line could not be extracted.
    MalformedRequest,
    /// The engine's cancel token fired during a wait.
    Cancelled,
    /// The byte link refused a write.
    Transport,
    /// A formatted command or payload did not fit its fixed buffer.
    CommandTooLong,
    /// `respond` was called without an inbound client to answer.
    NoClient,
    /// The operation needs a mode the modem is not in.
    InvalidMode,
}

impl AtError {
    /// Errors a server loop should swallow and poll again on.
    pub fn is_poll_miss(self) -> bool {
        matches!(self, AtError::Timeout | AtError::MalformedRequest)
    }
}

pub type AtResult<T> = Result<T, AtError>;
