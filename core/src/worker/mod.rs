//! Background workers of an image field: one loads persisted slots, the other runs codec
//! transforms. Both are plain async functions too, for callers without workers.

mod modify;
mod retrieve;

pub use modify::{modify_image, ModificationWorker, ModifiedImage, ModifyRequest, ModifyResponse};
pub use retrieve::{
	retrieve_images, RetrievalWorker, RetrieveRequest, RetrieveResponse, RetrievedImages,
	RetrievedSlot,
};
