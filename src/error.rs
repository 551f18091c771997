//! Runner error types and error aggregation.
//!
//! # Taxonomy
//! ```text
//! NoDeadline              collaborator needed a deadline, context had none
//! InitializationDeadline  resource batch outlived the initialization budget
//! ShutdownDeadline        teardown outlived the termination budget
//! DeadlineExceeded        context-kind error returned by collaborators
//! Resource / Job          failures reported by collaborators
//! Multi                   several of the above collected in one pass
//! ```
//!
//! # Design Decisions
//! - Collaborator failures cross the trait boundary as `BoxError` and are
//!   held as `SharedError` so one teardown outcome can be handed to every
//!   caller of `Runner::shutdown`
//! - Nothing here is fatal to the process; callers decide whether to exit

use std::fmt;
use std::sync::Arc;

/// Boxed error returned by `Resource` and `Job` implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Collaborator error after it has crossed into the runner.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Error type for runner operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// A collaborator required a deadline-bearing context.
    #[error("deadline must be set")]
    NoDeadline,

    /// The initialization budget elapsed before every resource was ready.
    #[error("initialization deadline")]
    InitializationDeadline,

    /// The termination budget elapsed before teardown finished.
    #[error("graceful shutdown deadline")]
    ShutdownDeadline,

    /// The context handed to a collaborator reached its deadline.
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// The context handed to a collaborator was cancelled.
    #[error("context canceled")]
    Cancelled,

    /// A resource failed to initialize or release.
    #[error(transparent)]
    Resource(SharedError),

    /// A job failed while running or shutting down.
    #[error(transparent)]
    Job(SharedError),

    /// A job panicked inside `run`.
    #[error("job panicked: {message}")]
    JobPanicked { message: String },

    /// Several failures collected during one pass.
    #[error(transparent)]
    Multi(#[from] MultiError),

    /// Termination signal handlers could not be installed.
    #[error("failed to install signal handler: {0}")]
    Signal(#[source] Arc<std::io::Error>),

    /// `start` was called more than once.
    #[error("runner already started")]
    AlreadyStarted,

    /// A runner task could not be joined.
    #[error("runner task failed: {0}")]
    Task(String),
}

impl Error {
    /// Wrap a resource failure.
    pub fn resource(source: BoxError) -> Self {
        Error::Resource(Arc::from(source))
    }

    /// Wrap a job failure.
    pub fn job(source: BoxError) -> Self {
        Error::Job(Arc::from(source))
    }

    /// Whether this is one of the deadline kinds.
    pub fn is_deadline(&self) -> bool {
        matches!(
            self,
            Error::InitializationDeadline | Error::ShutdownDeadline | Error::DeadlineExceeded
        )
    }
}

/// An ordered collection of failures reported as one.
#[derive(Debug, Clone)]
pub struct MultiError {
    errors: Vec<Error>,
}

impl MultiError {
    /// The underlying failures, in the order they were collected.
    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Error> {
        self.errors.iter()
    }

    pub fn into_errors(self) -> Vec<Error> {
        self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for MultiError {}

impl<'a> IntoIterator for &'a MultiError {
    type Item = &'a Error;
    type IntoIter = std::slice::Iter<'a, Error>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

/// Combine the outcomes of a batch of operations.
///
/// Successful outcomes are discarded. Returns `Ok(())` when nothing failed,
/// otherwise a single `Error::Multi` holding every failure in order.
pub fn aggregate<I>(results: I) -> Result<(), Error>
where
    I: IntoIterator<Item = Result<(), Error>>,
{
    let errors: Vec<Error> = results.into_iter().filter_map(Result::err).collect();
    if errors.is_empty() {
        return Ok(());
    }
    Err(Error::Multi(MultiError { errors }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(msg: &str) -> Error {
        Error::job(msg.into())
    }

    #[test]
    fn test_aggregate_empty_is_ok() {
        assert!(aggregate(Vec::new()).is_ok());
        assert!(aggregate([Ok(()), Ok(())]).is_ok());
    }

    #[test]
    fn test_aggregate_single_keeps_message() {
        let err = aggregate([Ok(()), Err(failure("j1 fail"))]).unwrap_err();
        assert_eq!(err.to_string(), "j1 fail");
    }

    #[test]
    fn test_aggregate_preserves_order_and_members() {
        let err = aggregate([
            Err(failure("first")),
            Ok(()),
            Err(Error::ShutdownDeadline),
        ])
        .unwrap_err();

        let text = err.to_string();
        assert!(text.contains("first"));
        assert!(text.contains("graceful shutdown deadline"));
        assert!(text.find("first") < text.find("graceful"));

        match err {
            Error::Multi(multi) => {
                assert_eq!(multi.len(), 2);
                assert!(matches!(multi.errors()[1], Error::ShutdownDeadline));
            }
            other => panic!("expected multi error, got {:?}", other),
        }
    }

    #[test]
    fn test_transparent_collaborator_errors() {
        let err = Error::resource("fail init".into());
        assert_eq!(err.to_string(), "fail init");
        assert!(!err.is_deadline());
        assert!(Error::InitializationDeadline.is_deadline());
    }

    #[test]
    fn test_cloned_error_keeps_structure() {
        let err = aggregate([Err(Error::resource("fail release".into()))]).unwrap_err();
        let copy = err.clone();
        assert_eq!(copy.to_string(), "fail release");
        match copy {
            Error::Multi(multi) => assert!(matches!(multi.errors()[0], Error::Resource(_))),
            other => panic!("expected multi error, got {:?}", other),
        }
    }
}
