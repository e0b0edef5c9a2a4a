//! Integration tests for messages, conversations, and item requests.

use crate::test_fixtures::TestDatabase;
use crate::{
    Error, ItemRepository, MessageRepository, OwnerRepository, OwnerRole, RequestRepository,
    RequestStatus, SendMessageRequest,
};

#[tokio::test]
#[ignore]
async fn test_conversation_grouping_and_unread() {
    let test_db = TestDatabase::new().await;
    let alice = test_db.seed_user("alice").await;
    let bob = test_db.seed_user("bob").await;

    for content in ["hi", "is this available?"] {
        test_db
            .db
            .messages
            .send(SendMessageRequest {
                sender_id: bob,
                recipient_id: alice,
                item_id: None,
                request_id: None,
                content: content.into(),
            })
            .await
            .unwrap();
    }

    let conversations = test_db.db.messages.conversations(alice).await.unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].counterpart_id, bob);
    assert_eq!(conversations[0].unread_count, 2);
    assert_eq!(conversations[0].last_message.content, "is this available?");

    let marked = test_db.db.messages.mark_read(alice, bob).await.unwrap();
    assert_eq!(marked, 2);
    assert_eq!(test_db.db.messages.unread_count(alice).await.unwrap(), 0);

    let thread = test_db.db.messages.thread(alice, bob).await.unwrap();
    assert_eq!(thread.len(), 2);
    assert_eq!(thread[0].content, "hi");

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore]
async fn test_message_validation() {
    let test_db = TestDatabase::new().await;
    let alice = test_db.seed_user("alice").await;

    let err = test_db
        .db
        .messages
        .send(SendMessageRequest {
            sender_id: alice,
            recipient_id: alice,
            item_id: None,
            request_id: None,
            content: "note to self".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore]
async fn test_request_status_transitions() {
    let test_db = TestDatabase::new().await;
    let owner = test_db.seed_user("owner").await;
    let buyer = test_db.seed_user("buyer").await;
    let item_id = test_db.db.items.insert_draft(owner).await.unwrap();
    test_db
        .db
        .owners
        .add(item_id, owner, OwnerRole::Owner, None)
        .await
        .unwrap();

    let request_id = test_db
        .db
        .requests
        .create(item_id, buyer, Some("I'd like to buy this".into()))
        .await
        .unwrap();

    // The requester cannot accept their own request.
    let err = test_db
        .db
        .requests
        .set_status(request_id, buyer, RequestStatus::Accepted)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));

    test_db
        .db
        .requests
        .set_status(request_id, owner, RequestStatus::Accepted)
        .await
        .unwrap();

    // Terminal status; no further transitions.
    let err = test_db
        .db
        .requests
        .set_status(request_id, buyer, RequestStatus::Cancelled)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let listed = test_db.db.requests.list_for_user(owner).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].status, RequestStatus::Accepted);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore]
async fn test_cannot_request_own_item() {
    let test_db = TestDatabase::new().await;
    let owner = test_db.seed_user("owner").await;
    let item_id = test_db.db.items.insert_draft(owner).await.unwrap();
    test_db
        .db
        .owners
        .add(item_id, owner, OwnerRole::Owner, None)
        .await
        .unwrap();

    let err = test_db
        .db
        .requests
        .create(item_id, owner, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    test_db.cleanup().await;
}
