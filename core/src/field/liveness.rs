use crate::error::{InvariantViolation, Result};

use std::future::Future;

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Whether the consumer of an image field is still around.
///
/// Unmounting never aborts in-flight store or worker operations, it only makes every later
/// [`Liveness::guard`] check fail so their results get discarded.
#[derive(Debug, Clone, Default)]
pub struct Liveness(CancellationToken);

impl Liveness {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn is_mounted(&self) -> bool {
		!self.0.is_cancelled()
	}

	pub fn ensure_mounted(&self) -> Result<()> {
		if self.is_mounted() {
			Ok(())
		} else {
			Err(InvariantViolation::Unmounted.into())
		}
	}

	pub fn unmount(&self) {
		self.0.cancel();
	}

	pub fn unmounted(&self) -> WaitForCancellationFuture<'_> {
		self.0.cancelled()
	}

	/// Awaits `fut`, then checks we are still mounted before handing its output back.
	pub async fn guard<T>(&self, fut: impl Future<Output = Result<T>> + Send) -> Result<T> {
		let out = fut.await;
		self.ensure_mounted()?;
		out
	}
}
