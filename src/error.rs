// Error taxonomy for the glob engine core.

use std::path::PathBuf;

/// Errors that can surface from a `walk`/`walk_async`/`stream`/`iterate`/`compile` call.
///
/// Everything else the walker encounters (permission-denied on a descendant, a
/// vanished entry between readdir and stat, a broken symlink) is absorbed by the
/// error policy in `walker.rs` and never reaches this type.
#[derive(Debug, thiserror::Error)]
pub enum GlobError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("glob walk cancelled")]
    Cancelled,

    #[error(transparent)]
    WalkRoot(#[from] WalkRootError),
}

/// The walk root itself could not be read.
///
/// Per the error policy (NotFound/PermissionDenied on the walk root both yield an
/// empty result rather than an error), callers normally never see this variant:
/// `walk`/`walk_async` catch it at the boundary and return `Ok(vec![])`. It exists
/// for internal propagation and for a future strict mode.
#[derive(Debug, thiserror::Error)]
pub enum WalkRootError {
    #[error("walk root not found: {0}")]
    NotFound(PathBuf),
    #[error("permission denied reading walk root: {0}")]
    PermissionDenied(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_error_message() {
        let err = GlobError::Configuration("cannot set absolute and withFileTypes:true".into());
        assert_eq!(
            err.to_string(),
            "configuration error: cannot set absolute and withFileTypes:true"
        );
    }

    #[test]
    fn walk_root_error_converts() {
        let err: GlobError = WalkRootError::NotFound(PathBuf::from("/nope")).into();
        assert!(matches!(err, GlobError::WalkRoot(WalkRootError::NotFound(_))));
    }
}
