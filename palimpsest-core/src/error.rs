use std::io;
use std::path::{Path, PathBuf};

use palimpsest_types::{DecodeError, Entity, WideId};

/// Errors returned by project and store operations.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("file access failed: {0}")]
    FileAccess(#[source] io::Error),

    #[error("permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("out of memory")]
    NoMem,

    #[error("system resources exhausted: {0}")]
    SystemResources(String),

    #[error("unimplemented: {0}")]
    Unimplemented(String),

    #[error("invalid project format: {0}")]
    InvalidFormat(String),

    #[error("storage error: {0}")]
    Storage(#[source] rusqlite::Error),

    #[error("{kind} {id} does not exist")]
    MissingEntity { kind: &'static str, id: WideId },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The command no longer fits the current state, typically an undo or
    /// redo after another user changed what it refers to.
    #[error("conflicts with current state: {0}")]
    Conflict(String),
}

pub type Result<T> = std::result::Result<T, ProjectError>;

impl ProjectError {
    /// Classify an I/O error raised while touching `path`.
    pub fn from_io(err: io::Error, path: &Path) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => ProjectError::FileNotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => ProjectError::PermissionDenied(path.to_path_buf()),
            io::ErrorKind::NotADirectory => ProjectError::NotADirectory(path.to_path_buf()),
            io::ErrorKind::OutOfMemory => ProjectError::NoMem,
            _ => ProjectError::FileAccess(err),
        }
    }

    pub fn missing<T: Entity>(id: WideId) -> Self {
        ProjectError::MissingEntity { kind: T::KIND, id }
    }

    /// Whether repeating the whole operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProjectError::FileAccess(_) | ProjectError::SystemResources(_) => true,
            ProjectError::Storage(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy
                    | rusqlite::ErrorCode::DatabaseLocked
                    | rusqlite::ErrorCode::SystemIoFailure
                    | rusqlite::ErrorCode::DiskFull
            ),
            _ => false,
        }
    }
}

impl From<DecodeError> for ProjectError {
    fn from(err: DecodeError) -> Self {
        ProjectError::InvalidFormat(err.to_string())
    }
}

impl From<rusqlite::Error> for ProjectError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(e, _) = &err {
            match e.code {
                rusqlite::ErrorCode::NotADatabase | rusqlite::ErrorCode::DatabaseCorrupt => {
                    return ProjectError::InvalidFormat(err.to_string());
                }
                rusqlite::ErrorCode::OutOfMemory => return ProjectError::NoMem,
                rusqlite::ErrorCode::PermissionDenied | rusqlite::ErrorCode::ReadOnly => {
                    return ProjectError::FileAccess(io::Error::new(
                        io::ErrorKind::PermissionDenied,
                        err.to_string(),
                    ));
                }
                _ => {}
            }
        }
        ProjectError::Storage(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_map_by_kind() {
        let path = Path::new("/nowhere/song.palimpsest");
        let err = ProjectError::from_io(io::Error::from(io::ErrorKind::NotFound), path);
        assert!(matches!(err, ProjectError::FileNotFound(p) if p == path));

        let err = ProjectError::from_io(io::Error::from(io::ErrorKind::PermissionDenied), path);
        assert!(matches!(err, ProjectError::PermissionDenied(_)));

        let err = ProjectError::from_io(io::Error::from(io::ErrorKind::Interrupted), path);
        assert!(matches!(err, ProjectError::FileAccess(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn decode_errors_become_invalid_format() {
        let err: ProjectError = DecodeError::Truncated.into();
        assert!(matches!(err, ProjectError::InvalidFormat(_)));
        assert!(!err.is_retryable());
    }
}
