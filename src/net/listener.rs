//! TCP listener resource.
//!
//! # Responsibilities
//! - Bind to the configured address during `init`, bounded by the context deadline
//! - Hand the bound socket to the job that serves on it
//! - Close the socket on `release` when configured to
//!
//! # Design Decisions
//! - `init` refuses a context without deadline (bind must not hang unbounded)
//! - The socket is taken, not shared: exactly one server owns it

use std::net::SocketAddr;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::net::TcpListener;

use crate::config::variables::{VariableError, VariableProvider};
use crate::error::{BoxError, Error};
use crate::lifecycle::{Context, Resource};

pub const ADDR: &str = "ADDR";
pub const PORT: &str = "PORT";

/// Error type for listener operations.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    /// The listener was taken before `init` ran or taken twice.
    #[error("listener is not bound")]
    NotBound,
}

/// Listener resource configuration.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    pub address: String,
    pub need_close: bool,
}

impl ListenerConfig {
    pub fn new(address: impl Into<String>, need_close: bool) -> Self {
        Self {
            address: address.into(),
            need_close,
        }
    }

    /// Read `{group}_ADDR` and `{group}_PORT` from `provider`.
    pub fn from_provider(
        provider: &dyn VariableProvider,
        group: &str,
        need_close: bool,
    ) -> Result<Self, VariableError> {
        provider.ensure(group, &[PORT, ADDR])?;
        let addr = provider.get(group, ADDR).unwrap_or_default();
        let port = provider.get(group, PORT).unwrap_or_default();
        Ok(Self::new(format!("{}:{}", addr, port), need_close))
    }
}

/// A TCP listener bound during resource initialization.
pub struct ListenerResource {
    config: ListenerConfig,
    inner: Mutex<Option<TcpListener>>,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl ListenerResource {
    pub fn new(config: ListenerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(None),
            local_addr: Mutex::new(None),
        }
    }

    /// Take ownership of the bound socket.
    pub fn take(&self) -> Result<TcpListener, ListenerError> {
        self.inner
            .lock()
            .map_err(|_| ListenerError::NotBound)?
            .take()
            .ok_or(ListenerError::NotBound)
    }

    /// Address the listener was bound to, once `init` succeeded.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.lock().ok().and_then(|addr| *addr)
    }
}

#[async_trait]
impl Resource for ListenerResource {
    async fn init(&self, ctx: &Context) -> Result<(), BoxError> {
        let deadline = ctx.deadline().ok_or(Error::NoDeadline)?;

        let listener = tokio::time::timeout_at(deadline, TcpListener::bind(&self.config.address))
            .await
            .map_err(|_| Error::DeadlineExceeded)?
            .map_err(|source| ListenerError::Bind {
                address: self.config.address.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        tracing::info!(address = %local_addr, "Listener bound");

        if let Ok(mut addr) = self.local_addr.lock() {
            *addr = Some(local_addr);
        }
        if let Ok(mut inner) = self.inner.lock() {
            *inner = Some(listener);
        }
        Ok(())
    }

    async fn release(&self, _ctx: &Context) -> Result<(), BoxError> {
        if self.config.need_close {
            let listener = self.inner.lock().ok().and_then(|mut inner| inner.take());
            if listener.is_some() {
                tracing::debug!(address = %self.config.address, "Listener closed");
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "listener"
    }
}
