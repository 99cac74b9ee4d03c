//! Function-or-value configuration fields.
//!
//! A field is either fixed at construction or resolved from the inbound
//! request each time a request is forwarded. Per-request state set by outer
//! middleware (tenant, auth principal, ...) is read from the request
//! extensions.

use std::fmt;
use std::sync::Arc;

use crate::error::BoxError;
use crate::relay::context::InboundRequest;

/// Resolver invoked once per request.
pub type Resolver<T> = Arc<dyn Fn(&InboundRequest) -> T + Send + Sync>;

/// A configuration value that may depend on the request.
pub enum Setting<T> {
    Fixed(T),
    Resolver(Resolver<T>),
}

impl<T: Clone> Setting<T> {
    pub fn fixed(value: T) -> Self {
        Setting::Fixed(value)
    }

    pub fn resolver<F>(resolve: F) -> Self
    where
        F: Fn(&InboundRequest) -> T + Send + Sync + 'static,
    {
        Setting::Resolver(Arc::new(resolve))
    }

    /// Produce the concrete value for this request.
    pub fn resolve(&self, request: &InboundRequest) -> T {
        match self {
            Setting::Fixed(value) => value.clone(),
            Setting::Resolver(resolve) => resolve(request),
        }
    }
}

impl<T> From<T> for Setting<T> {
    fn from(value: T) -> Self {
        Setting::Fixed(value)
    }
}

impl<T: Default> Default for Setting<T> {
    fn default() -> Self {
        Setting::Fixed(T::default())
    }
}

impl<T> Clone for Setting<T>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        match self {
            Setting::Fixed(value) => Setting::Fixed(value.clone()),
            Setting::Resolver(resolve) => Setting::Resolver(Arc::clone(resolve)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Setting<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Setting::Fixed(value) => f.debug_tuple("Fixed").field(value).finish(),
            Setting::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}

/// Resolver for the backend host. May fail, e.g. when no backend is known
/// for the caller.
pub type HostResolver = Arc<dyn Fn(&InboundRequest) -> Result<String, BoxError> + Send + Sync>;

/// Backend host, such as `http://orders.internal:8080`.
#[derive(Clone)]
pub enum TargetHost {
    Fixed(String),
    Resolver(HostResolver),
}

impl TargetHost {
    pub fn resolver<F>(resolve: F) -> Self
    where
        F: Fn(&InboundRequest) -> Result<String, BoxError> + Send + Sync + 'static,
    {
        TargetHost::Resolver(Arc::new(resolve))
    }
}

impl From<&str> for TargetHost {
    fn from(host: &str) -> Self {
        TargetHost::Fixed(host.to_string())
    }
}

impl From<String> for TargetHost {
    fn from(host: String) -> Self {
        TargetHost::Fixed(host)
    }
}

impl fmt::Debug for TargetHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetHost::Fixed(host) => f.debug_tuple("Fixed").field(host).finish(),
            TargetHost::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}
