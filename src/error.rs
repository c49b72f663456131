use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // I/O errors from the underlying source or sink
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The compressed stream is malformed. The payload is the byte offset
    /// into the input at which the corruption was detected.
    #[error("corrupt DEFLATE stream at input offset {0}")]
    CorruptInput(u64),

    /// The stream ended before the final block completed.
    #[error("unexpected end of DEFLATE stream")]
    UnexpectedEof,
}

impl Error {
    /// Map onto an `std::io::Error` without consuming the original, so a
    /// latched error can be reported from every subsequent call.
    pub(crate) fn to_io(&self) -> std::io::Error {
        match self {
            Error::Io(e) => std::io::Error::new(e.kind(), e.to_string()),
            Error::CorruptInput(_) => {
                std::io::Error::new(std::io::ErrorKind::InvalidData, self.to_string())
            }
            Error::UnexpectedEof => {
                std::io::Error::new(std::io::ErrorKind::UnexpectedEof, self.to_string())
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Internal decoder conditions. `EndInput` and `OutputOverflow` are
/// recovered locally (state is saved and the caller retries); the rest are
/// terminal and surface as [`Error::CorruptInput`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Status {
    /// The bit buffer cannot satisfy a read; buffer more input and retry.
    EndInput,
    /// The output target filled mid-token; overflow fields record the rest.
    OutputOverflow,
    /// Malformed block header, inconsistent lengths, or Kraft violation.
    InvalidBlock,
    /// A Huffman-decoded symbol fell outside its alphabet.
    InvalidSymbol,
    /// A back-reference distance exceeded the decoded history.
    InvalidLookBack,
}

impl Status {
    pub(crate) fn is_terminal(self) -> bool {
        matches!(self, Status::InvalidBlock | Status::InvalidSymbol | Status::InvalidLookBack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(Status::InvalidBlock.is_terminal());
        assert!(Status::InvalidSymbol.is_terminal());
        assert!(Status::InvalidLookBack.is_terminal());
        assert!(!Status::EndInput.is_terminal());
        assert!(!Status::OutputOverflow.is_terminal());
    }

    #[test]
    fn io_error_mapping_preserves_kind() {
        let err = Error::UnexpectedEof;
        assert_eq!(err.to_io().kind(), std::io::ErrorKind::UnexpectedEof);
        let err = Error::CorruptInput(42);
        assert_eq!(err.to_io().kind(), std::io::ErrorKind::InvalidData);
        assert!(err.to_io().to_string().contains("42"));
    }
}
