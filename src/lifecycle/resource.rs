//! Resource capability.

use async_trait::async_trait;

use crate::error::BoxError;
use crate::lifecycle::context::Context;

/// A collaborator that must be acquired before any job starts.
///
/// `init` is called at most once, in registration order. `release` is called
/// at most once, and only if `init` was invoked. Both must return promptly
/// once `ctx` is done, reporting a deadline-kind error instead of hanging.
#[async_trait]
pub trait Resource: Send + Sync {
    async fn init(&self, ctx: &Context) -> Result<(), BoxError>;

    async fn release(&self, ctx: &Context) -> Result<(), BoxError>;

    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
