//! Job capability.

use async_trait::async_trait;

use crate::error::BoxError;
use crate::lifecycle::context::Context;

/// A long-running unit of work.
///
/// `run` blocks until the work completes, fails, or a `shutdown` request makes
/// it return. `shutdown` may be called more than once and must report
/// `Error::DeadlineExceeded` if `run` has not returned before `ctx` expires.
#[async_trait]
pub trait Job: Send + Sync {
    async fn run(&self) -> Result<(), BoxError>;

    async fn shutdown(&self, ctx: &Context) -> Result<(), BoxError>;

    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
