use crate::form::FormBundle;

use async_channel as chan;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InvalidKind {
	IsError,
	NotError,
	Remove,
}

/// Notifications for the form that owns the image field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ParentAction {
	/// Every currently valid image.
	Valid { bundle: FormBundle },
	/// One image whose validity changed or that went away.
	Invalid { kind: InvalidKind, name: String },
}

#[derive(Debug, Clone)]
pub struct ParentDispatcher(chan::Sender<ParentAction>);

impl ParentDispatcher {
	#[must_use]
	pub const fn new(tx: chan::Sender<ParentAction>) -> Self {
		Self(tx)
	}

	#[must_use]
	pub fn channel() -> (Self, chan::Receiver<ParentAction>) {
		let (tx, rx) = chan::unbounded();
		(Self(tx), rx)
	}

	/// A parent that stopped listening is not our failure, the notification is dropped.
	pub async fn send(&self, action: ParentAction) {
		if self.0.send(action).await.is_err() {
			warn!("Parent stopped listening, dropping image field notification");
		}
	}
}
