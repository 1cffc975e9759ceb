use imf_actors::{spawn, Worker, WorkerError};

use std::time::Duration;

use tokio::time::sleep;
use tracing_test::traced_test;

#[derive(Debug)]
enum EchoRequest {
	Echo(String),
	Slow(Duration, String),
	Explode,
}

#[derive(Default)]
struct EchoWorker {
	handled: usize,
}

impl Worker for EchoWorker {
	const NAME: &'static str = "echo";

	type Request = EchoRequest;
	type Response = Result<(usize, String), String>;

	async fn handle(&mut self, request: Self::Request) -> Self::Response {
		self.handled += 1;

		match request {
			EchoRequest::Echo(msg) => Ok((self.handled, msg)),
			EchoRequest::Slow(duration, msg) => {
				sleep(duration).await;
				Ok((self.handled, msg))
			}
			EchoRequest::Explode => panic!("boom"),
		}
	}

	fn on_panic(&self, reason: String) -> Self::Response {
		Err(reason)
	}
}

#[tokio::test]
#[traced_test]
async fn responds_in_request_order() {
	let (handle, responses) = spawn(EchoWorker::default());

	handle
		.post(EchoRequest::Slow(Duration::from_millis(30), "first".into()))
		.await
		.unwrap();
	handle.post(EchoRequest::Echo("second".into())).await.unwrap();

	assert_eq!(responses.recv().await.unwrap(), Ok((1, "first".into())));
	assert_eq!(responses.recv().await.unwrap(), Ok((2, "second".into())));

	handle.terminate().await;
}

#[tokio::test]
#[traced_test]
async fn panic_becomes_failure_response_and_worker_keeps_serving() {
	let (handle, responses) = spawn(EchoWorker::default());

	handle.post(EchoRequest::Explode).await.unwrap();
	assert_eq!(responses.recv().await.unwrap(), Err("boom".into()));

	handle.post(EchoRequest::Echo("still here".into())).await.unwrap();
	assert_eq!(
		responses.recv().await.unwrap(),
		Ok((2, "still here".into()))
	);

	assert!(logs_contain("Worker unexpectedly panicked"));

	handle.terminate().await;
}

#[tokio::test]
#[traced_test]
async fn post_after_terminate_fails() {
	let (handle, _responses) = spawn(EchoWorker::default());
	let id = handle.id();

	assert!(handle.is_running());
	handle.terminate().await;
	assert!(!handle.is_running());

	assert!(matches!(
		handle.post(EchoRequest::Echo("late".into())).await,
		Err(WorkerError::Gone { name: "echo", id: gone_id }) if gone_id == id
	));

	// Terminating twice is harmless
	handle.terminate().await;
}

#[tokio::test]
#[traced_test]
async fn clones_share_the_same_worker() {
	let (handle, responses) = spawn(EchoWorker::default());
	let other = handle.clone();

	assert_eq!(handle.id(), other.id());

	other.post(EchoRequest::Echo("from clone".into())).await.unwrap();
	assert_eq!(
		responses.recv().await.unwrap(),
		Ok((1, "from clone".into()))
	);

	other.terminate().await;
	assert!(!handle.is_running());
}

#[tokio::test]
#[traced_test]
async fn debug_shows_name_and_running_state() {
	let (handle, _responses) = spawn(EchoWorker::default());

	let running = format!("{handle:?}");
	assert!(running.contains("\"echo\""));
	assert!(running.contains("is_running: true"));

	handle.terminate().await;

	assert!(format!("{handle:?}").contains("is_running: false"));
}
