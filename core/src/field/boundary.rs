use crate::error::Error;

use tracing::error;

/// Where handler failures get reported, besides being returned to the caller.
pub trait ErrorBoundary: Send + Sync + 'static {
	fn report(&self, field_name: &str, error: &Error);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorBoundary;

impl ErrorBoundary for TracingErrorBoundary {
	fn report(&self, field_name: &str, error: &Error) {
		error!(field_name, kind = ?error.kind(), "{error:#}");
	}
}
