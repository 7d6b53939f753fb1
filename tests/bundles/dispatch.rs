//! Bouncer selection, unknown types and timeouts

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wardendb::storage::MemoryStore;
use wardendb::{
    Actor, Bundle, Collection, Crufl, CruflOp, Error, Fail, FreshnessPack, Permissions,
    QuerySpec, Warden, WardenConfig,
};

use crate::common::*;

#[tokio::test]
async fn unknown_types_are_dropped() {
    let h = Harness::new();
    let bundle = Bundle::new(
        "b1",
        vec![
            crufl(CruflOp::Create, "r1", vec![new_note("u1", "a")]),
            Crufl::find("ghost", "r2", QuerySpec::new()),
        ],
    );
    let pack = h.warden.ask(user("u1"), &bundle, json!({})).await.unwrap();
    assert!(pack.complete);
    assert_eq!(pack.freshness.len(), 1);
    assert!(pack.result("r2").is_none());
}

#[tokio::test]
async fn sibling_requests_are_independent() {
    let h = Harness::new();
    let bundle = Bundle::new(
        "b1",
        vec![
            crufl(CruflOp::Create, "denied", vec![new_note("u2", "x")]),
            crufl(CruflOp::Create, "allowed", vec![new_note("u1", "y")]),
            crufl(CruflOp::Update, "empty", vec![]),
            Crufl {
                op: CruflOp::Unknown("explode".to_string()),
                ..Crufl::find("note", "odd", QuerySpec::new())
            },
            Crufl {
                spec: None,
                ..Crufl::find("note", "no-spec", QuerySpec::new())
            },
        ],
    );
    let pack = h.warden.ask(user("u1"), &bundle, json!({})).await.unwrap();

    let error = |uuid: &str| pack.result(uuid).and_then(|r| r.error);
    assert_eq!(error("denied"), Some(Fail::Permission));
    assert_eq!(error("allowed"), None);
    assert_eq!(error("empty"), Some(Fail::NoMessages));
    assert_eq!(error("odd"), Some(Fail::Check));
    assert_eq!(error("no-spec"), Some(Fail::Query));
    assert_eq!(h.notes.len(), 1);
}

#[tokio::test]
async fn pack_round_trips_through_json() {
    let h = Harness::new();
    let bundle: Bundle = serde_json::from_value(json!({
        "uuid": "b1",
        "crufls": [
            {"op": "create", "type": "note", "uuid": "r1",
             "msgs": [{"title": "a", "owner": {"type": "user", "id": "u1"}}]},
            {"op": "merge", "type": "note", "uuid": "r2", "msgs": [{}]},
        ],
    }))
    .unwrap();
    let pack = h.warden.ask(user("u1"), &bundle, json!({})).await.unwrap();
    let wire = serde_json::to_value(&pack).unwrap();
    let back: FreshnessPack = serde_json::from_value(wire).unwrap();
    assert_eq!(back, pack);
    assert_eq!(back.result("r2").and_then(|r| r.error), Some(Fail::Check));
    let echoed = back.result("r2").map(|r| r.op.to_string());
    assert_eq!(echoed.as_deref(), Some("merge"));
}

#[tokio::test]
async fn unidentified_actor_is_denied() {
    let h = Harness::new();
    let note = h.seed_note("u1", "mine");
    let bundle = Bundle::new(
        "b1",
        vec![
            crufl(CruflOp::Lookup, "r1", vec![note_ref(note)]),
            Crufl::find("note", "r2", QuerySpec::new()),
            crufl(CruflOp::Remove, "r3", vec![note_ref(note)]),
        ],
    );
    let pack = h
        .warden
        .ask(Actor::new("user", ""), &bundle, json!({}))
        .await
        .unwrap();
    assert_eq!(pack.result("r1").unwrap().messages()[0].error(), Some(Fail::Id));
    assert!(pack.result("r2").unwrap().messages().is_empty());
    assert_eq!(
        pack.result("r3").unwrap().messages()[0].error(),
        Some(Fail::Permission)
    );
    assert!(h.stored(note).await.is_some());
}

#[tokio::test]
async fn admin_bypasses_ownership() {
    let h = Harness::with_permissions(Permissions::none());
    let note = h.seed_note("u2", "theirs");
    let bundle = Bundle::new(
        "b1",
        vec![
            crufl(CruflOp::Update, "r1", vec![note_ref(note).field("title", json!("admin"))]),
            Crufl::find("note", "r2", QuerySpec::new()),
        ],
    );
    let pack = h.warden.admin_ask(&bundle, json!({})).await.unwrap();
    assert_eq!(pack.result("r1").unwrap().messages()[0].version(), Some(1));
    assert_eq!(pack.result("r2").unwrap().messages().len(), 1);
    assert_eq!(h.stored(note).await.unwrap().get("title"), Some(&json!("admin")));
}

#[tokio::test]
async fn slow_bundle_times_out() {
    init_tracing();
    let config = WardenConfig {
        request_timeout_ms: Some(20),
        ..Default::default()
    };
    let slow = SlowStore {
        inner: MemoryStore::new("note"),
        delay: Duration::from_millis(500),
    };
    let warden = Warden::new(config)
        .unwrap()
        .collection_for("note", Collection::new(Arc::new(slow)));
    let bundle = Bundle::new("b1", vec![Crufl::find("note", "r1", QuerySpec::new())]);

    let err = warden.ask(user("u1"), &bundle, json!({})).await.unwrap_err();
    assert_eq!(
        err,
        Error::Timeout {
            uuid: "b1".to_string(),
            timeout_ms: 20
        }
    );
}

#[tokio::test]
async fn fast_bundle_within_timeout() {
    let config = WardenConfig {
        request_timeout_ms: Some(5_000),
        ..Default::default()
    };
    let h = Harness::build(config, Permissions::all());
    let bundle = Bundle::new("b1", vec![Crufl::find("note", "r1", QuerySpec::new())]);
    let pack = h.warden.ask(user("u1"), &bundle, json!({})).await.unwrap();
    assert_eq!(pack.result("r1").unwrap().error, None);
}
