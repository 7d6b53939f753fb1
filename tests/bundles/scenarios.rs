//! Canonical request walkthroughs

use crate::common::*;
use wardendb::{CruflOp, Fail, Message, Permissions, RecordId};

#[tokio::test]
async fn create_with_new_permission() {
    let h = Harness::with_permissions(Permissions {
        new: true,
        ..Permissions::none()
    });
    let result = h
        .ask_one(user("u1"), crufl(CruflOp::Create, "r1", vec![new_note("u1", "first")]))
        .await;

    assert_eq!(result.error, None);
    assert_eq!(result.messages().len(), 1);
    let envelope = &result.messages()[0];
    assert_eq!(envelope.error(), None);
    assert_eq!(envelope.version(), Some(0));
    assert_eq!(h.notes.len(), 1);
}

#[tokio::test]
async fn update_foreign_note_without_grant() {
    let h = Harness::with_permissions(Permissions {
        change: true,
        ..Permissions::none()
    });
    let note = h.seed_note("u2", "theirs");
    let msg = note_ref(note).field("title", serde_json::json!("mine now"));

    let result = h
        .ask_one(user("u1"), crufl(CruflOp::Update, "r1", vec![msg]))
        .await;

    assert_eq!(result.error, None);
    assert_eq!(result.messages().len(), 1);
    assert_eq!(result.messages()[0].id(), Some(note.to_string().as_str()));
    assert_eq!(result.messages()[0].error(), Some(Fail::Permission));
    let stored = h.stored(note).await.unwrap();
    assert_eq!(stored.get("title"), Some(&serde_json::json!("theirs")));
    assert_eq!(stored.version, 0);
}

#[tokio::test]
async fn lookup_with_malformed_message_fails_whole_call() {
    let h = Harness::new();
    let note = h.seed_note("u1", "mine");
    let malformed = Message::draft(doc(serde_json::json!({"title": "no meta"})));

    let result = h
        .ask_one(
            user("u1"),
            crufl(CruflOp::Lookup, "r1", vec![malformed, note_ref(note)]),
        )
        .await;

    assert_eq!(result.error, Some(Fail::MalformedMessage));
    assert_eq!(
        result.error.map(|e| e.to_string()).as_deref(),
        Some("MessageFail: malformed message")
    );
    assert!(result.messages().is_empty());
}

#[tokio::test]
async fn remove_missing_and_existing() {
    let h = Harness::new();
    let missing = RecordId::new();
    let existing = h.seed_note("u1", "mine");

    let result = h
        .ask_one(
            user("u1"),
            crufl(CruflOp::Remove, "r1", vec![note_ref(missing), note_ref(existing)]),
        )
        .await;

    assert_eq!(result.error, None);
    let envelopes = result.messages();
    assert_eq!(envelopes.len(), 2);
    assert_eq!(envelopes[0].id(), Some(missing.to_string().as_str()));
    assert_eq!(envelopes[0].error(), Some(Fail::Id));
    assert!(!envelopes[0].is_removed());
    assert_eq!(envelopes[1].id(), Some(existing.to_string().as_str()));
    assert_eq!(envelopes[1].error(), None);
    assert!(envelopes[1].is_removed());
    assert!(h.stored(existing).await.is_none());
}

#[tokio::test]
async fn pack_serializes_with_error_tokens() {
    let h = Harness::new();
    let result = h
        .ask_one(user("u1"), crufl(CruflOp::Remove, "r1", vec![note_ref(RecordId::new())]))
        .await;
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["msgs"][0]["$meta"]["error"], "IdFail");
    assert_eq!(json["type"], "note");
}
