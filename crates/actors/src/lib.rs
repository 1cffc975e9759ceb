//!
//! # Actors
//!
//! Background workers that own their state and serve one request at a time. Each worker gets a
//! typed request channel and a typed response channel; posting a request is fire-and-forget and
//! every request gets exactly one response, even if handling it panicked.
//!
//! ```
//! use imf_actors::{spawn, Worker};
//!
//! struct Doubler;
//!
//! impl Worker for Doubler {
//!     const NAME: &'static str = "doubler";
//!     type Request = u32;
//!     type Response = Result<u32, String>;
//!
//!     async fn handle(&mut self, request: u32) -> Self::Response {
//!         Ok(request * 2)
//!     }
//!
//!     fn on_panic(&self, reason: String) -> Self::Response {
//!         Err(reason)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let (handle, responses) = spawn(Doubler);
//!
//!     handle.post(21).await.unwrap();
//!     assert_eq!(responses.recv().await.unwrap(), Ok(42));
//!
//!     handle.terminate().await;
//! }
//! ```

#![warn(
	clippy::all,
	clippy::pedantic,
	clippy::correctness,
	clippy::perf,
	clippy::style,
	clippy::suspicious,
	clippy::complexity,
	clippy::nursery,
	clippy::unwrap_used,
	unused_qualifications,
	rust_2018_idioms,
	trivial_casts,
	trivial_numeric_casts,
	unused_allocation,
	clippy::unnecessary_cast,
	clippy::cast_lossless,
	clippy::cast_possible_truncation,
	clippy::cast_possible_wrap,
	clippy::cast_precision_loss,
	clippy::cast_sign_loss,
	clippy::dbg_macro,
	clippy::deprecated_cfg_attr,
	clippy::separated_literal_suffix,
	deprecated
)]
#![forbid(deprecated_in_future)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

use std::{
	any::Any,
	fmt,
	future::{Future, IntoFuture},
	panic::{panic_any, AssertUnwindSafe},
	pin::Pin,
	sync::{
		atomic::{AtomicBool, Ordering},
		Arc,
	},
	task::{Context, Poll},
	time::Duration,
};

use async_channel as chan;
use futures::FutureExt;
use futures_concurrency::future::Race;
use tokio::{spawn as spawn_task, sync::Mutex, task::JoinHandle, time::timeout};
use tracing::{debug, error, instrument, trace, warn, Instrument};
use uuid::Uuid;

const ONE_MINUTE: Duration = Duration::from_secs(60);

/// How many requests can be queued on a worker before `post` starts waiting.
const REQUESTS_BUFFER: usize = 16;

/// Identifies a spawned worker, so foreground state can hold on to "which worker" without
/// holding the channels themselves.
pub type WorkerId = Uuid;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
	#[error("worker is gone, it was terminated or its task exited <name='{name}', id='{id}'>")]
	Gone { name: &'static str, id: WorkerId },
}

/// A background worker, processing its requests sequentially.
pub trait Worker: Send + 'static {
	const NAME: &'static str;

	type Request: Send + fmt::Debug + 'static;
	type Response: Send + 'static;

	fn handle(&mut self, request: Self::Request) -> impl Future<Output = Self::Response> + Send;

	/// Builds the failure response sent back when [`Worker::handle`] panicked.
	fn on_panic(&self, reason: String) -> Self::Response;
}

/// Main-side handle of a worker, cheap to clone.
pub struct WorkerHandle<Request> {
	id: WorkerId,
	name: &'static str,
	requests_tx: chan::Sender<Request>,
	stop_tx: chan::Sender<()>,
	is_running: Arc<AtomicBool>,
	maybe_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl<Request> Clone for WorkerHandle<Request> {
	fn clone(&self) -> Self {
		Self {
			id: self.id,
			name: self.name,
			requests_tx: self.requests_tx.clone(),
			stop_tx: self.stop_tx.clone(),
			is_running: Arc::clone(&self.is_running),
			maybe_handle: Arc::clone(&self.maybe_handle),
		}
	}
}

impl<Request: Send + 'static> fmt::Debug for WorkerHandle<Request> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WorkerHandle")
			.field("id", &self.id)
			.field("name", &self.name)
			.field("is_running", &self.is_running())
			.finish_non_exhaustive()
	}
}

impl<Request: Send + 'static> WorkerHandle<Request> {
	#[must_use]
	pub const fn id(&self) -> WorkerId {
		self.id
	}

	#[must_use]
	pub const fn name(&self) -> &'static str {
		self.name
	}

	#[must_use]
	pub fn is_running(&self) -> bool {
		self.is_running.load(Ordering::Acquire)
	}

	/// Enqueues a request. The response will show up on the worker's response channel.
	pub async fn post(&self, request: Request) -> Result<(), WorkerError> {
		self.requests_tx
			.send(request)
			.await
			.map_err(|_| WorkerError::Gone {
				name: self.name,
				id: self.id,
			})
	}

	/// Asks the worker to stop after its current request, aborting it if it takes too long.
	#[instrument(skip(self), fields(name = self.name, id = %self.id))]
	pub async fn terminate(&self) {
		if !self.is_running() {
			debug!("Worker already stopped");
			return;
		}

		self.requests_tx.close();

		if self.stop_tx.send(()).await.is_err() {
			error!("Failed to send stop signal to worker, will check if it's already stopped or abort otherwise");
		}

		wait_stop_or_abort(self.maybe_handle.lock().await.take()).await;
	}
}

/// Starts `worker` on its own task, returning the handle to post requests and the channel
/// where responses land.
pub fn spawn<W: Worker>(worker: W) -> (WorkerHandle<W::Request>, chan::Receiver<W::Response>) {
	let id = WorkerId::new_v4();

	let (requests_tx, requests_rx) = chan::bounded(REQUESTS_BUFFER);
	let (responses_tx, responses_rx) = chan::unbounded();
	let (stop_tx, stop_rx) = chan::bounded(1);

	let is_running = Arc::new(AtomicBool::new(true));

	let handle = spawn_task({
		let is_running = Arc::clone(&is_running);

		async move {
			run(worker, requests_rx, responses_tx, Stopper(stop_rx)).await;
			is_running.store(false, Ordering::Release);
		}
		.instrument(tracing::info_span!("worker", name = W::NAME, %id))
	});

	(
		WorkerHandle {
			id,
			name: W::NAME,
			requests_tx,
			stop_tx,
			is_running,
			maybe_handle: Arc::new(Mutex::new(Some(handle))),
		},
		responses_rx,
	)
}

async fn run<W: Worker>(
	mut worker: W,
	requests_rx: chan::Receiver<W::Request>,
	responses_tx: chan::Sender<W::Response>,
	stop: Stopper,
) {
	enum RaceOutput<Request> {
		Request(Request),
		Stop,
	}

	trace!("Worker starting...");

	loop {
		let output = (
			async {
				requests_rx
					.recv()
					.await
					.map_or(RaceOutput::Stop, RaceOutput::Request)
			},
			async {
				(&stop).await;
				RaceOutput::Stop
			},
		)
			.race()
			.await;

		let RaceOutput::Request(request) = output else {
			break;
		};

		trace!(?request, "Worker received a request");

		let result = AssertUnwindSafe(worker.handle(request))
			.catch_unwind()
			.await;

		let response = match result {
			Ok(response) => response,
			Err(panic) => {
				let reason = panic_reason(&*panic);
				error!(%reason, "Worker unexpectedly panicked while handling a request");
				worker.on_panic(reason)
			}
		};

		if responses_tx.send(response).await.is_err() {
			warn!("Responses receiver dropped, nobody is listening so the worker will stop");
			break;
		}

		if stop.check_stop() {
			break;
		}
	}

	trace!("Worker stopped");
}

fn panic_reason(panic: &(dyn Any + Send)) -> String {
	panic
		.downcast_ref::<&str>()
		.map(ToString::to_string)
		.or_else(|| panic.downcast_ref::<String>().cloned())
		.unwrap_or_else(|| "unknown panic payload".to_string())
}

pub struct Stopper(chan::Receiver<()>);

impl Stopper {
	#[must_use]
	pub fn check_stop(&self) -> bool {
		self.0.try_recv().is_ok()
	}
}

pin_project_lite::pin_project! {
	pub struct StopWorkerFuture<'recv> {
		#[pin]
		fut: chan::Recv<'recv, ()>,
	}
}

impl Future for StopWorkerFuture<'_> {
	type Output = ();

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		let this = self.project();

		match this.fut.poll(cx) {
			Poll::Ready(res) => {
				if res.is_err() {
					trace!("Stop channel closed, will stop worker");
				}
				Poll::Ready(())
			}
			Poll::Pending => Poll::Pending,
		}
	}
}

impl<'recv> IntoFuture for &'recv Stopper {
	type Output = ();
	type IntoFuture = StopWorkerFuture<'recv>;

	fn into_future(self) -> Self::IntoFuture {
		Self::IntoFuture { fut: self.0.recv() }
	}
}

async fn wait_stop_or_abort(maybe_handle: Option<JoinHandle<()>>) {
	if let Some(handle) = maybe_handle {
		let abort_handle = handle.abort_handle();

		match timeout(ONE_MINUTE, handle).await {
			Ok(Ok(())) => { /* Everything is Awesome! */ }
			Ok(Err(e)) => {
				// This should never happen, as we're catching panics of each request
				if e.is_panic() {
					let p = e.into_panic();
					error!("Worker unexpectedly panicked, we will pop up the panic!");
					panic_any(p);
				}
			}
			Err(_) => {
				error!("Worker failed to gracefully stop in the allotted time, will force abortion");
				abort_handle.abort();
			}
		}
	}
}
