use imf_core::{
	codec::ImagesCodec,
	field::{InvalidKind, ParentAction},
	slot::{ImageBlob, Orientation, Projections, Quality},
	store::{FieldKeys, FieldRepository, PersistentStore},
	worker::{retrieve_images, RetrieveRequest},
	Error, ErrorKind, InvariantViolation, ValidationError,
};

use std::io::Cursor;

use image::{DynamicImage, ImageOutputFormat};
use tracing_test::traced_test;

mod common;

use common::{bmp, memory_repository, png, FlakyStore, Harness, STORAGE_KEY};

fn invalid(kind: InvalidKind, name: &str) -> ParentAction {
	ParentAction::Invalid {
		kind,
		name: name.to_string(),
	}
}

fn valid_names(action: &ParentAction) -> Vec<String> {
	match action {
		ParentAction::Valid { bundle } => bundle.file_names().map(ToString::to_string).collect(),
		ParentAction::Invalid { .. } => panic!("expected a valid bundle, got {action:?}"),
	}
}

#[tokio::test]
#[traced_test]
async fn adding_a_valid_png() {
	let harness = Harness::inline(memory_repository());
	harness.field.mount().await.unwrap();
	harness.parent_actions();

	harness
		.field
		.handle_file_input_change(vec![png("a.png", 50_000)])
		.await
		.unwrap();

	let state = harness.field.state();
	assert_eq!(state.slots.len(), 1);
	assert!(!state.slots[0].is_error);
	assert_eq!(state.slots[0].file_name, "a.png");
	assert_eq!(state.slots.qualities(5)[0], Quality::default());
	assert_eq!(state.slots.orientations(5)[0], Orientation::default());

	let actions = harness.parent_actions();
	assert_eq!(actions[0], invalid(InvalidKind::NotError, "a.png"));
	assert_eq!(valid_names(&actions[1]), vec!["a.png"]);

	let persisted = harness.repository.load(STORAGE_KEY).await.unwrap();
	assert_eq!(persisted.len(), 1);
	assert_eq!(persisted[0].id, state.slots[0].id);
}

#[tokio::test]
#[traced_test]
async fn changing_quality_transforms_and_persists() {
	let harness = Harness::inline(memory_repository());
	harness.field.mount().await.unwrap();
	harness
		.field
		.handle_file_input_change(vec![png("a.png", 50_000)])
		.await
		.unwrap();
	harness.parent_actions();

	harness
		.field
		.handle_image_quality_orientation_slider_change(0, 5, 1)
		.await
		.unwrap();

	let state = harness.field.state();
	assert_eq!(state.current_image_index, 0);
	assert_eq!(state.slots[0].quality.get(), 5);
	assert_eq!(state.slots[0].blob.as_ref().unwrap().bytes.len(), 25_000);
	assert!(!state.is_modifying());

	let persisted = harness.repository.load(STORAGE_KEY).await.unwrap();
	assert_eq!(
		persisted
			.qualities(5)
			.into_iter()
			.map(Quality::get)
			.collect::<Vec<_>>(),
		vec![5, 10, 10, 10, 10]
	);
	assert_eq!(persisted[0].original.as_ref().unwrap().bytes.len(), 50_000);

	// Validity didn't change, the parent only gets the refreshed bundle.
	let actions = harness.parent_actions();
	assert_eq!(actions.len(), 1);
	assert_eq!(valid_names(&actions[0]), vec!["a.png"]);
}

#[tokio::test]
#[traced_test]
async fn removing_drops_the_whole_slot() {
	let harness = Harness::inline(memory_repository());
	harness.field.mount().await.unwrap();
	harness
		.field
		.handle_file_input_change(vec![png("a.png", 50_000), png("b.png", 10)])
		.await
		.unwrap();
	harness
		.field
		.handle_image_quality_orientation_slider_change(0, 5, 6)
		.await
		.unwrap();
	harness.parent_actions();

	harness.field.handle_remove_image_click(0).await.unwrap();

	let state = harness.field.state();
	assert_eq!(state.slots.len(), 1);
	assert_eq!(state.slots[0].file_name, "b.png");
	assert_eq!(state.slots.qualities(5), vec![Quality::default(); 5]);
	assert_eq!(state.slots.orientations(5), vec![Orientation::default(); 5]);

	let persisted = harness.repository.load(STORAGE_KEY).await.unwrap();
	assert_eq!(persisted.file_names(), vec!["b.png"]);

	let actions = harness.parent_actions();
	assert_eq!(actions[0], invalid(InvalidKind::Remove, "a.png"));
	assert_eq!(valid_names(&actions[1]), vec!["b.png"]);
}

#[tokio::test]
#[traced_test]
async fn retrieving_an_empty_field() {
	let retrieved = retrieve_images(
		&memory_repository(),
		RetrieveRequest {
			storage_key: STORAGE_KEY.to_string(),
			max_images: 5,
		},
	)
	.await
	.unwrap();

	assert!(retrieved.file_names().is_empty());
	assert!(retrieved.modified_files().is_empty());
	assert_eq!(retrieved.qualities(), vec![Quality::default(); 5]);
	assert_eq!(retrieved.orientations(), vec![Orientation::default(); 5]);

	let harness = Harness::inline(memory_repository());
	harness.field.mount().await.unwrap();

	let state = harness.field.state();
	assert!(state.slots.is_empty());
	assert!(!state.is_loading);
}

#[tokio::test]
#[traced_test]
async fn slots_survive_remounts() {
	let repository = memory_repository();

	let first = Harness::inline(repository.clone());
	first.field.mount().await.unwrap();
	first
		.field
		.handle_file_input_change(vec![png("a.png", 100), bmp("b.bmp", 100)])
		.await
		.unwrap();
	first
		.field
		.handle_image_quality_orientation_slider_change(0, 3, 8)
		.await
		.unwrap();
	first.field.unmount().await;

	let second = Harness::inline(repository);
	second.field.mount().await.unwrap();

	let state = second.field.state();
	assert_eq!(state.slots.file_names(), vec!["a.png", "b.bmp"]);
	assert_eq!(state.slots[0].quality.get(), 3);
	assert_eq!(state.slots[0].orientation.get(), 8);
	assert_eq!(state.slots[0].latest_revision, 1);
	assert_eq!(state.is_errors(), vec![false, true]);

	let actions = second.parent_actions();
	assert_eq!(actions[0], invalid(InvalidKind::IsError, "b.bmp"));
	assert_eq!(valid_names(&actions[1]), vec!["a.png"]);
}

#[tokio::test]
#[traced_test]
async fn invalid_files_are_flagged_and_left_out_of_the_bundle() {
	let harness = Harness::inline(memory_repository());
	harness.field.mount().await.unwrap();
	harness.parent_actions();

	harness
		.field
		.handle_file_input_change(vec![
			png("ok.png", 10),
			bmp("wrong-type.bmp", 10),
			png("too-big.png", 100_001),
		])
		.await
		.unwrap();

	assert_eq!(harness.field.state().is_errors(), vec![false, true, true]);

	let actions = harness.parent_actions();
	assert_eq!(
		&actions[..3],
		&[
			invalid(InvalidKind::NotError, "ok.png"),
			invalid(InvalidKind::IsError, "wrong-type.bmp"),
			invalid(InvalidKind::IsError, "too-big.png"),
		]
	);
	assert_eq!(valid_names(&actions[3]), vec!["ok.png"]);
}

#[tokio::test]
#[traced_test]
async fn too_many_files_are_rejected_before_persisting() {
	let harness = Harness::inline(memory_repository());
	harness.field.mount().await.unwrap();

	let files = (0..6).map(|i| png(&format!("{i}.png"), 10)).collect();
	let res = harness.field.handle_file_input_change(files).await;

	assert!(matches!(
		res,
		Err(Error::Validation(ValidationError::TooManyImages {
			max: 5,
			attempted: 6
		}))
	));
	assert_eq!(harness.boundary.kinds(), vec![ErrorKind::Parse]);
	assert!(harness.field.state().slots.is_empty());
	assert!(harness.repository.load(STORAGE_KEY).await.unwrap().is_empty());

	assert!(matches!(
		harness.field.handle_file_input_change(vec![]).await,
		Err(Error::Validation(ValidationError::NoFiles))
	));
}

#[tokio::test]
#[traced_test]
async fn reset_restores_the_original() {
	let harness = Harness::inline(memory_repository());
	harness.field.mount().await.unwrap();
	harness
		.field
		.handle_file_input_change(vec![png("a.png", 1_000)])
		.await
		.unwrap();
	harness
		.field
		.handle_image_quality_orientation_slider_change(0, 2, 3)
		.await
		.unwrap();

	harness.field.handle_reset_image_click(0).await.unwrap();

	let state = harness.field.state();
	assert_eq!(state.slots[0].quality, Quality::default());
	assert_eq!(state.slots[0].orientation, Orientation::default());
	assert_eq!(state.slots[0].blob.as_ref().unwrap().bytes.len(), 1_000);
	assert!(!state.is_modifying());

	let persisted = harness.repository.load(STORAGE_KEY).await.unwrap();
	assert_eq!(persisted[0].modified, persisted[0].original);
	assert_eq!(persisted[0].quality, Quality::default());
	assert_eq!(persisted[0].revision, 2);
}

#[tokio::test]
#[traced_test]
async fn bad_handler_input_leaves_state_alone() {
	let harness = Harness::inline(memory_repository());
	harness.field.mount().await.unwrap();
	harness
		.field
		.handle_file_input_change(vec![png("a.png", 10)])
		.await
		.unwrap();
	let before = harness.field.state();

	assert!(matches!(
		harness.field.handle_remove_image_click(-1).await,
		Err(Error::Validation(ValidationError::NegativeIndex(-1)))
	));
	assert!(matches!(
		harness.field.handle_reset_image_click(4).await,
		Err(Error::Validation(ValidationError::IndexOutOfBounds {
			index: 4,
			len: 1
		}))
	));
	assert!(matches!(
		harness
			.field
			.handle_image_quality_orientation_slider_change(0, 11, 1)
			.await,
		Err(Error::Validation(ValidationError::Quality(11)))
	));

	assert_eq!(harness.field.state(), before);
	assert_eq!(harness.boundary.kinds(), vec![ErrorKind::Parse; 3]);
}

#[tokio::test]
#[traced_test]
async fn unmounted_field_ignores_everything() {
	let harness = Harness::inline(memory_repository());
	harness.field.mount().await.unwrap();
	harness.field.toggle_modal(true).unwrap();
	harness.field.unmount().await;
	let before = harness.field.state();

	assert!(matches!(
		harness
			.field
			.handle_file_input_change(vec![png("late.png", 10)])
			.await,
		Err(Error::Invariant(InvariantViolation::Unmounted))
	));
	assert!(harness.field.toggle_modal(false).is_err());
	assert!(harness.field.mount().await.is_err());

	assert_eq!(harness.field.state(), before);
	assert!(harness.field.state().is_modal_open);
	assert!(harness.boundary.kinds().is_empty());
	assert!(harness.repository.load(STORAGE_KEY).await.unwrap().is_empty());
}

#[tokio::test]
#[traced_test]
async fn legacy_fields_are_upgraded_on_mount() {
	let store = PersistentStore::in_memory();
	let keys = FieldKeys::new(STORAGE_KEY);

	store
		.set(&keys.original_files(), &vec![Some(png("old.png", 10))])
		.await
		.unwrap();
	store
		.set(&keys.modified_files(), &vec![Some(png("old.png", 5))])
		.await
		.unwrap();
	store
		.set(&keys.file_names(), &vec!["old.png".to_string()])
		.await
		.unwrap();
	store
		.set(&keys.orientations(), &vec![6_i64, 1, 1, 1, 1])
		.await
		.unwrap();

	let harness = Harness::inline(FieldRepository::new(store.clone()));
	harness.field.mount().await.unwrap();

	let state = harness.field.state();
	assert_eq!(state.slots.file_names(), vec!["old.png"]);
	assert_eq!(state.slots[0].orientation.get(), 6);
	assert_eq!(state.slots[0].blob.as_ref().unwrap().bytes.len(), 5);

	harness
		.field
		.handle_image_quality_orientation_slider_change(0, 5, 6)
		.await
		.unwrap();

	let persisted = store
		.get::<Vec<imf_core::slot::ImageSlot>>(&keys.slots())
		.await
		.unwrap()
		.unwrap();
	assert_eq!(persisted[0].id, state.slots[0].id);
	assert_eq!(persisted[0].quality.get(), 5);
	assert_eq!(persisted[0].modified.as_ref().unwrap().bytes.len(), 5);

	let state = harness.field.state();
	assert_eq!(state.slots[0].blob.as_ref().unwrap().bytes.len(), 5);
	assert!(store
		.get::<Vec<String>>(&keys.file_names())
		.await
		.unwrap()
		.is_some());
}

#[tokio::test]
#[traced_test]
async fn removing_from_a_legacy_field_sticks() {
	let store = PersistentStore::in_memory();
	let keys = FieldKeys::new(STORAGE_KEY);

	store
		.set(
			&keys.original_files(),
			&vec![Some(png("a.png", 10)), Some(png("b.png", 10))],
		)
		.await
		.unwrap();
	store
		.set(&keys.file_names(), &vec!["a.png", "b.png"])
		.await
		.unwrap();

	let repository = FieldRepository::new(store);

	let harness = Harness::inline(repository.clone());
	harness.field.mount().await.unwrap();
	harness.field.handle_remove_image_click(0).await.unwrap();

	assert_eq!(harness.field.state().slots.file_names(), vec!["b.png"]);
	assert_eq!(
		repository.load(STORAGE_KEY).await.unwrap().file_names(),
		vec!["b.png"]
	);

	harness.field.unmount().await;

	let remounted = Harness::inline(repository);
	remounted.field.mount().await.unwrap();
	assert_eq!(remounted.field.state().slots.file_names(), vec!["b.png"]);
}

#[tokio::test]
#[traced_test]
async fn cache_write_failures_are_reported() {
	let (store, fail_writes) = FlakyStore::new();
	let harness = Harness::inline(FieldRepository::new(PersistentStore::new(store)));
	harness.field.mount().await.unwrap();
	harness
		.field
		.handle_file_input_change(vec![png("a.png", 10)])
		.await
		.unwrap();
	let before = harness.field.state();

	fail_writes.store(true, std::sync::atomic::Ordering::Release);

	assert!(matches!(
		harness
			.field
			.handle_file_input_change(vec![png("b.png", 10)])
			.await,
		Err(Error::CacheWrite { .. })
	));
	assert!(matches!(
		harness.field.handle_remove_image_click(0).await,
		Err(Error::CacheWrite { .. })
	));

	let after_slider = harness
		.field
		.handle_image_quality_orientation_slider_change(0, 4, 1)
		.await;
	assert!(matches!(after_slider, Err(Error::CacheWrite { .. })));

	let state = harness.field.state();
	assert_eq!(state.slots.len(), before.slots.len());
	assert!(!state.is_modifying());
	assert_eq!(
		harness.boundary.kinds(),
		vec![ErrorKind::CacheWrite; 3]
	);
}

#[tokio::test]
#[traced_test]
async fn re_encoded_webp_is_submitted_as_png() {
	let mut bytes = Cursor::new(vec![]);
	DynamicImage::new_rgba8(6, 4)
		.write_to(&mut bytes, ImageOutputFormat::WebP)
		.unwrap();

	let harness = Harness::inline_with_codec(memory_repository(), ImagesCodec);
	harness.field.mount().await.unwrap();
	harness
		.field
		.handle_file_input_change(vec![ImageBlob::new_file(
			"photo.webp",
			"image/webp",
			bytes.into_inner(),
		)])
		.await
		.unwrap();
	harness.parent_actions();

	harness
		.field
		.handle_image_quality_orientation_slider_change(0, 5, 1)
		.await
		.unwrap();

	let state = harness.field.state();
	assert_eq!(state.slots.file_names(), vec!["photo.webp"]);
	assert_eq!(state.slots[0].blob.as_ref().unwrap().mime_type, "image/png");

	let actions = harness.parent_actions();
	assert_eq!(valid_names(actions.last().unwrap()), vec!["photo.png"]);
}
