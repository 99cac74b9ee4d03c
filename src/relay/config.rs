//! Per-rule relay configuration.

use std::fmt;
use std::sync::Arc;

use axum::http::HeaderMap;

use crate::observability::logging::RelayLogger;
use crate::relay::setting::{Setting, TargetHost};

/// Immutable configuration of one forwarding rule.
///
/// Built once at setup time and shared by every request the rule handles.
#[derive(Clone)]
pub struct RelayConfig {
    pub(crate) target_host: TargetHost,
    pub(crate) extra_headers: Setting<HeaderMap>,
    pub(crate) logger: Option<Arc<dyn RelayLogger>>,
    pub(crate) debug_header: Setting<bool>,
    pub(crate) annotation: Option<String>,
}

impl RelayConfig {
    pub fn new(target_host: impl Into<TargetHost>) -> Self {
        Self {
            target_host: target_host.into(),
            extra_headers: Setting::default(),
            logger: None,
            debug_header: Setting::default(),
            annotation: None,
        }
    }

    /// Headers merged over the default JSON headers. Same-named keys win.
    pub fn with_extra_headers(mut self, headers: impl Into<Setting<HeaderMap>>) -> Self {
        self.extra_headers = headers.into();
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn RelayLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Attach an `x-curl-command` header to responses.
    pub fn with_debug_header(mut self, enabled: impl Into<Setting<bool>>) -> Self {
        self.debug_header = enabled.into();
        self
    }

    /// Suffix appended to every log message of this rule.
    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }

    pub fn target_host(&self) -> &TargetHost {
        &self.target_host
    }

    pub fn annotation(&self) -> Option<&str> {
        self.annotation.as_deref()
    }

    pub fn has_logger(&self) -> bool {
        self.logger.is_some()
    }
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("target_host", &self.target_host)
            .field("extra_headers", &self.extra_headers)
            .field("logger", &self.logger.is_some())
            .field("debug_header", &self.debug_header)
            .field("annotation", &self.annotation)
            .finish()
    }
}
