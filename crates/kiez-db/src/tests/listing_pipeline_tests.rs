//! Integration tests for the item / image / owner / job repositories.

use uuid::Uuid;

use crate::test_fixtures::TestDatabase;
use crate::{
    CreateImageRequest, Error, ImageRepository, ItemRepository, JobCompletion, JobStatus,
    OwnerRepository, OwnerRole, ProcessingJobRepository,
};

#[tokio::test]
#[ignore]
async fn test_draft_item_defaults() {
    let test_db = TestDatabase::new().await;
    let user = test_db.seed_user("draft-user").await;

    let item_id = test_db.db.items.insert_draft(user).await.unwrap();
    let item = test_db.db.items.get(item_id).await.unwrap();

    assert_eq!(item.title, "New Draft Item");
    assert_eq!(item.status.as_str(), "draft");
    assert_eq!(item.category.as_str(), "other");
    assert_eq!(item.condition.as_str(), "used");
    assert_eq!(item.listing_type.as_str(), "sell");

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore]
async fn test_category_values_match_enum() {
    let test_db = TestDatabase::new().await;
    let values = test_db.db.items.category_values().await.unwrap();
    assert!(values.contains(&"other".to_string()));
    assert!(values.contains(&"rooms".to_string()));
    assert_eq!(values.len(), 12);
}

#[tokio::test]
#[ignore]
async fn test_image_delete_renumbers_and_repaints_primary() {
    let test_db = TestDatabase::new().await;
    let user = test_db.seed_user("gallery-user").await;
    let item_id = test_db.db.items.insert_draft(user).await.unwrap();

    let mut ids = Vec::new();
    for i in 0..3 {
        let id = test_db
            .db
            .images
            .insert(CreateImageRequest {
                item_id,
                image_url: format!("http://store/{item_id}/{i}.png"),
                display_order: i,
                is_primary: i == 0,
            })
            .await
            .unwrap();
        ids.push(id);
    }

    // Delete the primary; former index 1 must become primary at order 0.
    test_db.db.images.delete_and_renumber(ids[0]).await.unwrap();
    let images = test_db.db.images.list_for_item(item_id).await.unwrap();

    assert_eq!(images.len(), 2);
    assert_eq!(images[0].id, ids[1]);
    assert_eq!(images[0].display_order, 0);
    assert!(images[0].is_primary);
    assert_eq!(images[1].display_order, 1);
    assert!(!images[1].is_primary);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore]
async fn test_image_reorder_permutation() {
    let test_db = TestDatabase::new().await;
    let user = test_db.seed_user("reorder-user").await;
    let item_id = test_db.db.items.insert_draft(user).await.unwrap();

    let mut ids = Vec::new();
    for i in 0..3 {
        ids.push(
            test_db
                .db
                .images
                .insert(CreateImageRequest {
                    item_id,
                    image_url: format!("http://store/{item_id}/{i}.png"),
                    display_order: i,
                    is_primary: i == 0,
                })
                .await
                .unwrap(),
        );
    }

    let proposed = vec![ids[2], ids[0], ids[1]];
    test_db.db.images.reorder(item_id, &proposed).await.unwrap();

    let images = test_db.db.images.list_for_item(item_id).await.unwrap();
    let got: Vec<Uuid> = images.iter().map(|i| i.id).collect();
    assert_eq!(got, proposed);
    assert!(images[0].is_primary);
    assert_eq!(images.iter().filter(|i| i.is_primary).count(), 1);

    // Non-permutation is rejected.
    let err = test_db
        .db
        .images
        .reorder(item_id, &[ids[0], ids[1]])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore]
async fn test_job_lifecycle_and_claim_once() {
    let test_db = TestDatabase::new().await;
    let user = test_db.seed_user("job-user").await;
    let item_id = test_db.db.items.insert_draft(user).await.unwrap();

    let job_id = test_db
        .db
        .jobs
        .create(item_id, vec!["http://store/a.png".into()], "en")
        .await
        .unwrap();

    let claimed = test_db.db.jobs.claim_next().await.unwrap().unwrap();
    assert_eq!(claimed.id, job_id);
    assert_eq!(claimed.status, JobStatus::Processing);

    // Already claimed; nothing pending remains for this test's data.
    test_db
        .db
        .jobs
        .complete(
            job_id,
            JobCompletion {
                thumbnail_images: vec!["http://store/a_thumb_300.png".into()],
                ai_generated_title: Some("Cordless Drill".into()),
                ai_generated_description: Some("A drill.".into()),
            },
        )
        .await
        .unwrap();

    let latest = test_db.db.jobs.latest_for_item(item_id).await.unwrap().unwrap();
    assert_eq!(latest.status, JobStatus::Completed);
    assert_eq!(latest.ai_generated_title.as_deref(), Some("Cordless Drill"));

    // Completing twice fails: the row is no longer processing.
    let err = test_db
        .db
        .jobs
        .complete(job_id, JobCompletion::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Job(_)));

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore]
async fn test_job_retry_appends_fresh_row() {
    let test_db = TestDatabase::new().await;
    let user = test_db.seed_user("retry-user").await;
    let item_id = test_db.db.items.insert_draft(user).await.unwrap();

    let job_id = test_db
        .db
        .jobs
        .create(item_id, vec!["http://store/a.png".into()], "en")
        .await
        .unwrap();
    test_db.db.jobs.claim_next().await.unwrap();
    test_db.db.jobs.fail(job_id, "model unavailable").await.unwrap();

    let retry_id = test_db.db.jobs.retry(job_id).await.unwrap();
    assert_ne!(retry_id, job_id);

    // The failed row keeps its history; the new pending row is latest.
    let failed = test_db.db.jobs.get(job_id).await.unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert_eq!(failed.error_message.as_deref(), Some("model unavailable"));

    let latest = test_db.db.jobs.latest_for_item(item_id).await.unwrap().unwrap();
    assert_eq!(latest.id, retry_id);
    assert_eq!(latest.status, JobStatus::Pending);
    assert_eq!(latest.original_images, failed.original_images);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore]
async fn test_repoint_moves_images_and_jobs() {
    let test_db = TestDatabase::new().await;
    let user = test_db.seed_user("repoint-user").await;
    let draft = test_db.db.items.insert_draft(user).await.unwrap();
    let final_item = test_db.db.items.insert_draft(user).await.unwrap();

    test_db
        .db
        .images
        .insert(CreateImageRequest {
            item_id: draft,
            image_url: "http://store/x.png".into(),
            display_order: 0,
            is_primary: true,
        })
        .await
        .unwrap();
    test_db
        .db
        .jobs
        .create(draft, vec!["http://store/x.png".into()], "en")
        .await
        .unwrap();

    assert_eq!(test_db.db.images.repoint(draft, final_item).await.unwrap(), 1);
    assert_eq!(test_db.db.jobs.repoint(draft, final_item).await.unwrap(), 1);

    assert!(test_db.db.images.list_for_item(draft).await.unwrap().is_empty());
    assert_eq!(
        test_db.db.images.list_for_item(final_item).await.unwrap().len(),
        1
    );
    assert!(test_db.db.jobs.latest_for_item(final_item).await.unwrap().is_some());

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore]
async fn test_last_owner_cannot_be_removed() {
    let test_db = TestDatabase::new().await;
    let alice = test_db.seed_user("alice").await;
    let bob = test_db.seed_user("bob").await;
    let item_id = test_db.db.items.insert_draft(alice).await.unwrap();

    test_db
        .db
        .owners
        .add(item_id, alice, OwnerRole::Owner, None)
        .await
        .unwrap();

    let err = test_db.db.owners.remove(item_id, alice).await.unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));

    test_db
        .db
        .owners
        .add(item_id, bob, OwnerRole::CoOwner, Some(alice))
        .await
        .unwrap();
    test_db.db.owners.remove(item_id, bob).await.unwrap();

    let owners = test_db.db.owners.list_for_item(item_id).await.unwrap();
    assert_eq!(owners.len(), 1);
    assert_eq!(owners[0].user_id, alice);

    test_db.cleanup().await;
}
