/// Failure categories surfaced to callers.
///
/// Each kind maps to a process exit code so the binary can stay a thin wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad tuple size, underdetermined system, malformed option value.
    InvalidArgument,
    /// The input file does not exist.
    FileNotFound,
    /// Any other I/O failure (input read, transient file, exports).
    Io,
    /// A malformed field under `ParseFailurePolicy::Abort`.
    Parse,
    /// The solver stopped without meeting its tolerances.
    SolverDivergence,
    /// The external renderer could not be run or reported failure.
    RendererFailure,
}

impl ErrorKind {
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::InvalidArgument | ErrorKind::FileNotFound | ErrorKind::Io => 2,
            ErrorKind::Parse => 3,
            ErrorKind::SolverDivergence => 4,
            ErrorKind::RendererFailure => 5,
        }
    }
}

#[derive(Clone, thiserror::Error)]
#[error("{message}")]
pub struct AppError {
    kind: ErrorKind,
    message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn exit_code(&self) -> u8 {
        self.kind.exit_code()
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .finish()
    }
}
