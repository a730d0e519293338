use std::collections::TryReserveError;
use std::path::{Path, PathBuf};

/// Crate-wide error type.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("file already exists: {}", .0.display())]
    FileAlreadyExists(PathBuf),
    #[error("invalid index file: {0}")]
    FileFormat(String),
    #[error("unsupported index version {found} (this build reads version {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("illegal position: {0}")]
    IllegalPosition(String),
    #[error("allocation failure: {0}")]
    AllocationFailure(String),
    #[error("no sequence or FASTA file was supplied to build the index from")]
    NoDataForIndex,
    #[error("the original sequence was not stored in this index")]
    SequenceNotStored,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Maps a failed open of `path`: a missing file becomes `FileNotFound`,
    /// anything else stays an I/O error.
    pub(crate) fn from_open(path: &Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Error::FileNotFound(path.to_path_buf()),
            _ => Error::Io(err),
        }
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        match *err {
            bincode::ErrorKind::Io(io) => Error::Io(io),
            other => Error::FileFormat(other.to_string()),
        }
    }
}

impl From<TryReserveError> for Error {
    fn from(err: TryReserveError) -> Self {
        Error::AllocationFailure(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bincode_io_errors_stay_io() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short read");
        let err: Error = Box::new(bincode::ErrorKind::Io(io)).into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn bincode_decode_errors_become_format_errors() {
        let err: Error = Box::new(bincode::ErrorKind::InvalidTagEncoding(9)).into();
        assert!(matches!(err, Error::FileFormat(_)));
    }

    #[test]
    fn open_failures_keep_their_kind() {
        let path = Path::new("/data/ref.fa");
        let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(matches!(Error::from_open(path, missing), Error::FileNotFound(p) if p == path));
        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(matches!(
            Error::from_open(path, denied),
            Error::Io(e) if e.kind() == std::io::ErrorKind::PermissionDenied
        ));
    }

    #[test]
    fn reserve_failure_maps_to_allocation_failure() {
        let mut v: Vec<u64> = Vec::new();
        let err: Error = v.try_reserve_exact(usize::MAX).unwrap_err().into();
        assert!(matches!(err, Error::AllocationFailure(_)));
    }
}
