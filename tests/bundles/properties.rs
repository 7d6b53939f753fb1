//! Batch failure semantics and revision handling

use std::sync::Arc;

use proptest::prelude::*;
use serde_json::json;
use wardendb::storage::{DocumentStore, MemoryStore};
use wardendb::{
    Bundle, Collection, CruflOp, Fail, Message, Permissions, RecordId, StoredRecord, Warden,
    WardenConfig,
};

use crate::common::*;

// ============================================================================
// Create is all-or-nothing
// ============================================================================

#[tokio::test]
async fn create_denied_message_fails_batch() {
    let h = Harness::new();
    let batch = vec![
        new_note("u1", "a"),
        new_note("u2", "not mine"),
        new_note("u1", "b"),
    ];
    let result = h
        .ask_one(user("u1"), crufl(CruflOp::Create, "r1", batch))
        .await;
    assert_eq!(result.error, Some(Fail::Permission));
    assert!(result.messages().is_empty());
    assert!(h.notes.is_empty());
}

#[tokio::test]
async fn create_rejected_by_schema() {
    init_tracing();
    let notes = MemoryStore::new("note").with_validator(|doc| match doc.get("title") {
        Some(title) if title.is_string() => Ok(()),
        _ => Err("title must be a string".to_string()),
    });
    let notes = Arc::new(notes);
    let warden = Warden::new(WardenConfig::default())
        .unwrap()
        .collection_for("note", Collection::new(notes.clone()));
    let batch = vec![
        new_note("u1", "fine"),
        Message::draft(doc(json!({"title": 7, "owner": owned_by("u1")}))),
    ];
    let pack = warden
        .ask(user("u1"), &Bundle::new("b1", vec![crufl(CruflOp::Create, "r1", batch)]), json!({}))
        .await
        .unwrap();
    assert_eq!(pack.result("r1").unwrap().error, Some(Fail::Schema));
    assert!(notes.is_empty());
}

#[tokio::test]
async fn create_without_new_permission() {
    let h = Harness::with_permissions(Permissions::read_only());
    let result = h
        .ask_one(user("u1"), crufl(CruflOp::Create, "r1", vec![new_note("u1", "a")]))
        .await;
    assert_eq!(result.error, Some(Fail::Permission));
    assert!(h.notes.is_empty());
}

// ============================================================================
// Per-item independence
// ============================================================================

#[tokio::test]
async fn update_outcomes_are_per_item() {
    let h = Harness::new();
    let mine = h.seed_note("u1", "mine");
    let theirs = h.seed_note("u2", "theirs");
    let missing = RecordId::new();
    let batch = vec![
        note_ref(theirs).field("title", json!("x")),
        Message::draft(doc(json!({"title": "no meta"}))),
        note_ref(mine).field("title", json!("edited")),
        note_ref(missing).field("title", json!("x")),
        reference("task", mine).field("title", json!("wrong type")),
    ];

    let result = h
        .ask_one(user("u1"), crufl(CruflOp::Update, "r1", batch))
        .await;

    assert_eq!(result.error, None);
    let errors: Vec<_> = result.messages().iter().map(Message::error).collect();
    assert_eq!(
        errors,
        [Some(Fail::Permission), Some(Fail::Id), None, Some(Fail::Id), Some(Fail::Id)]
    );
    assert_eq!(result.messages()[2].version(), Some(1));
    assert_eq!(
        h.stored(mine).await.unwrap().get("title"),
        Some(&json!("edited"))
    );
    assert_eq!(
        h.stored(theirs).await.unwrap().get("title"),
        Some(&json!("theirs"))
    );
}

#[tokio::test]
async fn lookup_outcomes_are_per_item() {
    let h = Harness::new();
    let mine = h.seed_note("u1", "mine");
    let theirs = h.seed_note("u2", "theirs");
    let missing = RecordId::new();

    let result = h
        .ask_one(
            user("u1"),
            crufl(
                CruflOp::Lookup,
                "r1",
                vec![note_ref(theirs), note_ref(mine), note_ref(missing)],
            ),
        )
        .await;

    let envelopes = result.messages();
    assert_eq!(envelopes.len(), 3);
    assert_eq!(envelopes[0].error(), Some(Fail::Id));
    assert_eq!(envelopes[1].error(), None);
    assert_eq!(envelopes[1].payload.get("title"), Some(&json!("mine")));
    assert_eq!(envelopes[2].error(), Some(Fail::Id));
}

#[tokio::test]
async fn malformed_id_fails_request() {
    let h = Harness::new();
    let mine = h.seed_note("u1", "mine");
    let result = h
        .ask_one(
            user("u1"),
            crufl(
                CruflOp::Remove,
                "r1",
                vec![note_ref(mine), Message::reference("note", "not-an-id")],
            ),
        )
        .await;
    assert_eq!(result.error, Some(Fail::MalformedId));
    assert!(h.stored(mine).await.is_some());
}

#[derive(Debug, Clone, Copy)]
enum Item {
    Mine,
    Theirs,
    Missing,
}

fn item() -> impl Strategy<Value = Item> {
    prop_oneof![Just(Item::Mine), Just(Item::Theirs), Just(Item::Missing)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn remove_outcome_depends_only_on_own_item(items in prop::collection::vec(item(), 1..8)) {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        runtime.block_on(async {
            let h = Harness::new();
            let ids: Vec<RecordId> = items
                .iter()
                .map(|item| match item {
                    Item::Mine => h.seed_note("u1", "mine"),
                    Item::Theirs => h.seed_note("u2", "theirs"),
                    Item::Missing => RecordId::new(),
                })
                .collect();
            let batch = ids.iter().map(|id| note_ref(*id)).collect();
            let result = h.ask_one(user("u1"), crufl(CruflOp::Remove, "r1", batch)).await;

            let envelopes = result.messages();
            prop_assert_eq!(envelopes.len(), items.len());
            for ((item, id), envelope) in items.iter().zip(&ids).zip(envelopes) {
                let id_text = id.to_string();
                prop_assert_eq!(envelope.id(), Some(id_text.as_str()));
                match item {
                    Item::Mine => {
                        prop_assert!(envelope.is_removed());
                        prop_assert!(h.stored(*id).await.is_none());
                    }
                    Item::Theirs => {
                        prop_assert_eq!(envelope.error(), Some(Fail::Permission));
                        prop_assert!(h.stored(*id).await.is_some());
                    }
                    Item::Missing => prop_assert_eq!(envelope.error(), Some(Fail::Id)),
                }
            }
            Ok(())
        })?;
    }
}

// ============================================================================
// Revisions
// ============================================================================

#[tokio::test]
async fn sequential_updates_bump_revision_by_one() {
    let h = Harness::new();
    let mine = h.seed_note("u1", "v0");
    for expected in 1..=3u64 {
        let msg = note_ref(mine).field("title", json!(format!("v{expected}")));
        let result = h
            .ask_one(user("u1"), crufl(CruflOp::Update, "r1", vec![msg]))
            .await;
        assert_eq!(result.messages()[0].version(), Some(expected));
        assert_eq!(h.stored(mine).await.unwrap().version, expected);
    }
}

#[tokio::test]
async fn concurrent_write_is_not_overwritten() {
    init_tracing();
    let racing = Arc::new(RacingStore {
        inner: MemoryStore::new("note"),
    });
    let record = StoredRecord::new(
        RecordId::new(),
        doc(json!({"title": "original", "owner": owned_by("u1")})),
    );
    let id = record.id;
    racing.inner.put(record);
    let warden = Warden::new(WardenConfig::default())
        .unwrap()
        .collection_for("note", Collection::new(racing.clone()));

    let msg = note_ref(id).field("title", json!("stale write"));
    let pack = warden
        .ask(user("u1"), &Bundle::new("b1", vec![crufl(CruflOp::Update, "r1", vec![msg])]), json!({}))
        .await
        .unwrap();

    let result = pack.result("r1").unwrap();
    assert_eq!(result.messages()[0].error(), Some(Fail::Bouncer));
    let stored = racing.inner.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.version, 1);
    assert_eq!(stored.get("title"), Some(&json!("original")));
}
