//! ACL grants and filtered finds

use serde_json::json;
use wardendb::{
    Crufl, CruflOp, FieldPath, Fail, MatchExpr, Message, QuerySpec, SortSpec,
};

use crate::common::*;

fn acl_draft(note: &wardendb::RecordId, grantee: &str, actions: &[&str]) -> Message {
    Message::draft(doc(json!({
        "resource": {"type": "note", "id": note.to_string()},
        "grants": [{"actor": owned_by(grantee), "actions": actions}],
    })))
}

fn find(spec: QuerySpec) -> Crufl {
    Crufl::find("note", "q1", spec)
}

/// Stored titles of the records named in a result, in result order
async fn titles(result: &wardendb::FreshnessResult, h: &Harness) -> Vec<String> {
    let mut titles = Vec::new();
    for id in result.messages().iter().filter_map(|msg| msg.id()) {
        let Some(record) = h.stored(id.parse().unwrap()).await else {
            continue;
        };
        if let Some(title) = record.get("title").and_then(|t| t.as_str()) {
            titles.push(title.to_string());
        }
    }
    titles
}

#[tokio::test]
async fn read_grant_allows_lookup_only() {
    let h = Harness::new();
    let note = h.seed_note("u2", "shared");
    h.seed_grant(note, "u1", &["read"]);

    let lookup = h
        .ask_one(user("u1"), crufl(CruflOp::Lookup, "r1", vec![note_ref(note)]))
        .await;
    assert_eq!(lookup.messages()[0].error(), None);
    assert_eq!(lookup.messages()[0].payload.get("title"), Some(&json!("shared")));

    let update = h
        .ask_one(
            user("u1"),
            crufl(CruflOp::Update, "r2", vec![note_ref(note).field("title", json!("x"))]),
        )
        .await;
    assert_eq!(update.messages()[0].error(), Some(Fail::Permission));
}

#[tokio::test]
async fn change_grant_allows_update() {
    let h = Harness::new();
    let note = h.seed_note("u2", "shared");
    h.seed_grant(note, "u1", &["read", "change"]);

    let update = h
        .ask_one(
            user("u1"),
            crufl(CruflOp::Update, "r1", vec![note_ref(note).field("title", json!("edited"))]),
        )
        .await;
    assert_eq!(update.messages()[0].error(), None);
    assert_eq!(update.messages()[0].version(), Some(1));
    assert_eq!(h.stored(note).await.unwrap().get("title"), Some(&json!("edited")));
}

#[tokio::test]
async fn grant_to_subordinate_actor() {
    let h = Harness::new();
    let note = h.seed_note("u2", "shared");
    h.seed_grant(note, "u1", &["read"]);

    let lookup = h
        .ask_one(session_for("u1"), crufl(CruflOp::Lookup, "r1", vec![note_ref(note)]))
        .await;
    assert_eq!(lookup.messages()[0].error(), None);
}

#[tokio::test]
async fn owner_creates_acl() {
    let h = Harness::new();
    let note = h.seed_note("u1", "mine");
    let create = Crufl::with_msgs(CruflOp::Create, "acl", "r1", vec![acl_draft(&note, "u2", &["read"])]);
    let result = h.ask_one(user("u1"), create).await;
    assert_eq!(result.error, None);
    assert_eq!(h.acls.len(), 1);

    let lookup = h
        .ask_one(user("u2"), crufl(CruflOp::Lookup, "r2", vec![note_ref(note)]))
        .await;
    assert_eq!(lookup.messages()[0].error(), None);
}

#[tokio::test]
async fn one_batch_cannot_attach_two_acls_to_a_resource() {
    let h = Harness::new();
    let note = h.seed_note("u1", "mine");
    let other = h.seed_note("u1", "also mine");
    let batch = vec![
        acl_draft(&note, "u2", &["read"]),
        acl_draft(&other, "u2", &["read"]),
        acl_draft(&note, "u3", &["read", "change"]),
    ];
    let result = h
        .ask_one(user("u1"), Crufl::with_msgs(CruflOp::Create, "acl", "r1", batch))
        .await;

    assert_eq!(result.error, Some(Fail::Permission));
    assert!(result.messages().is_empty());
    assert!(h.acls.is_empty());
}

#[tokio::test]
async fn acl_creation_denied() {
    let h = Harness::new();
    let theirs = h.seed_note("u2", "theirs");
    let mine = h.seed_note("u1", "mine");
    h.seed_grant(mine, "u3", &["read"]);

    for (uuid, draft) in [
        ("not-owner", acl_draft(&theirs, "u1", &["read"])),
        ("duplicate", acl_draft(&mine, "u2", &["read"])),
        (
            "unregistered",
            Message::draft(doc(json!({
                "resource": {"type": "task", "id": mine.to_string()},
                "grants": [],
            }))),
        ),
        ("no-resource", Message::draft(doc(json!({"grants": []})))),
    ] {
        let create = Crufl::with_msgs(CruflOp::Create, "acl", uuid, vec![draft]);
        let result = h.ask_one(user("u1"), create).await;
        assert_eq!(result.error, Some(Fail::Permission), "{uuid}");
    }
    assert_eq!(h.acls.len(), 1);
}

#[tokio::test]
async fn acl_readable_by_resource_owner() {
    let h = Harness::new();
    let mine = h.seed_note("u1", "mine");
    let acl = h.seed_grant(mine, "u2", &["read"]);

    let by_owner = h
        .ask_one(user("u1"), Crufl::with_msgs(CruflOp::Lookup, "acl", "r1", vec![reference("acl", acl)]))
        .await;
    assert_eq!(by_owner.messages()[0].error(), None);

    let by_stranger = h
        .ask_one(user("u3"), Crufl::with_msgs(CruflOp::Lookup, "acl", "r2", vec![reference("acl", acl)]))
        .await;
    assert_eq!(by_stranger.messages()[0].error(), Some(Fail::Id));
}

#[tokio::test]
async fn find_without_subordinates_sees_own_notes() {
    let h = Harness::new();
    h.seed_note("u1", "a");
    h.seed_note("u2", "b");
    h.seed_note("u1", "c");

    let result = h.ask_one(user("u1"), find(QuerySpec::new())).await;
    assert_eq!(result.error, None);
    assert_eq!(titles(&result, &h).await, ["a", "c"]);
    assert!(result.messages()[0].payload.get("title").is_none());
}

#[tokio::test]
async fn find_intersects_caller_match_with_visibility() {
    let h = Harness::new();
    h.seed_note("u1", "keep");
    h.seed_note("u1", "skip");
    let shared = h.seed_note("u2", "keep");
    h.seed_grant(shared, "u1", &["read"]);
    h.seed_note("u2", "keep");

    let spec = QuerySpec::new()
        .with_match(MatchExpr::equals(FieldPath::root().key("title"), "keep"))
        .with_sort(SortSpec::descending(FieldPath::root().key("title")));
    let result = h.ask_one(session_for("u1"), find(spec)).await;

    assert_eq!(result.error, None);
    assert_eq!(titles(&result, &h).await, ["keep", "keep"]);
    let ids: Vec<_> = result.messages().iter().filter_map(|m| m.id()).collect();
    assert!(ids.contains(&shared.to_string().as_str()));
}

#[tokio::test]
async fn find_with_limit() {
    let h = Harness::new();
    for title in ["a", "b", "c"] {
        h.seed_note("u1", title);
    }
    let spec = QuerySpec::new()
        .with_sort(SortSpec::ascending(FieldPath::root().key("title")))
        .with_limit(2);
    let result = h.ask_one(user("u1"), find(spec)).await;
    assert_eq!(titles(&result, &h).await, ["a", "b"]);
}

#[tokio::test]
async fn find_with_bad_identity_is_query_fail() {
    let h = Harness::new();
    let spec = QuerySpec::new().with_match(MatchExpr::identity("not-an-id"));
    let result = h.ask_one(user("u1"), find(spec)).await;
    assert_eq!(result.error, Some(Fail::Query));
}
