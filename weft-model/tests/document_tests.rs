use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::BTreeMap;
use uuid::Uuid;
use weft_model::{DocumentModel, Model};
use weft_types::{FeedKey, HybridTimestamp, MemberKey, MessageMeta};

fn meta_for(member: MemberKey, seq: u64) -> MessageMeta {
    MessageMeta::new(FeedKey::new(), member, seq)
}

fn set_at(field: &str, value: serde_json::Value, wall: u64) -> serde_json::Value {
    let mut fields = BTreeMap::new();
    fields.insert(field.to_string(), value);
    DocumentModel::set_mutation_at(fields, HybridTimestamp::new(wall, 0))
}

#[test]
fn empty_document() {
    let doc = DocumentModel::new();
    assert!(doc.is_empty());
    assert_eq!(doc.get("title"), None);
}

#[test]
fn apply_sets_fields() {
    let mut doc = DocumentModel::new();
    doc.apply(&set_at("title", json!("Hello"), 10), &meta_for(MemberKey::new(), 0))
        .unwrap();
    assert_eq!(doc.get("title"), Some(&json!("Hello")));
    assert_eq!(doc.len(), 1);
}

#[test]
fn later_write_wins() {
    let member = MemberKey::new();
    let mut doc = DocumentModel::new();
    doc.apply(&set_at("title", json!("old"), 10), &meta_for(member, 0))
        .unwrap();
    doc.apply(&set_at("title", json!("new"), 20), &meta_for(member, 1))
        .unwrap();
    assert_eq!(doc.get("title"), Some(&json!("new")));
}

#[test]
fn stale_write_is_dropped() {
    let member = MemberKey::new();
    let mut doc = DocumentModel::new();
    doc.apply(&set_at("title", json!("current"), 20), &meta_for(member, 0))
        .unwrap();
    doc.apply(&set_at("title", json!("stale"), 10), &meta_for(member, 1))
        .unwrap();
    assert_eq!(doc.get("title"), Some(&json!("current")));
}

#[test]
fn concurrent_writes_tiebreak_by_author() {
    let low = MemberKey::from_uuid(Uuid::from_u128(1));
    let high = MemberKey::from_uuid(Uuid::from_u128(2));

    // Same timestamp from two authors: the higher key wins, in either
    // arrival order.
    let mut first = DocumentModel::new();
    first.apply(&set_at("v", json!("low"), 10), &meta_for(low, 0)).unwrap();
    first.apply(&set_at("v", json!("high"), 10), &meta_for(high, 0)).unwrap();

    let mut second = DocumentModel::new();
    second.apply(&set_at("v", json!("high"), 10), &meta_for(high, 0)).unwrap();
    second.apply(&set_at("v", json!("low"), 10), &meta_for(low, 0)).unwrap();

    assert_eq!(first.get("v"), Some(&json!("high")));
    assert_eq!(first.snapshot(), second.snapshot());
}

#[test]
fn fields_merge_independently() {
    let member = MemberKey::new();
    let mut doc = DocumentModel::new();
    doc.apply(&set_at("a", json!(1), 10), &meta_for(member, 0)).unwrap();
    doc.apply(&set_at("b", json!(2), 5), &meta_for(member, 1)).unwrap();
    assert_eq!(doc.get("a"), Some(&json!(1)));
    assert_eq!(doc.get("b"), Some(&json!(2)));
}

#[test]
fn authored_write_supersedes_observed_remote_state() {
    let local = MemberKey::from_uuid(Uuid::from_u128(1));
    let remote = MemberKey::from_uuid(Uuid::from_u128(2));

    // Remote write stamped far in the future of the local wall clock.
    let mut doc = DocumentModel::new();
    doc.apply(
        &set_at("title", json!("remote"), u64::MAX - 10),
        &meta_for(remote, 0),
    )
    .unwrap();

    // The document clock advanced past what it observed, so a local write
    // authored now still orders after the remote one.
    let mut fields = BTreeMap::new();
    fields.insert("title".to_string(), json!("local"));
    let mutation = doc.author_set(fields);
    doc.apply(&mutation, &meta_for(local, 0)).unwrap();
    assert_eq!(doc.get("title"), Some(&json!("local")));
}

#[test]
fn restored_document_resumes_its_clock() {
    let member = MemberKey::new();
    let mut doc = DocumentModel::new();
    doc.apply(&set_at("title", json!("old"), u64::MAX - 10), &meta_for(member, 0))
        .unwrap();

    let mut restored = DocumentModel::new();
    restored.restore(&doc.snapshot()).unwrap();

    // Authoring after restore must still exceed the restored timestamps.
    let mut fields = BTreeMap::new();
    fields.insert("title".to_string(), json!("new"));
    let mutation = restored.author_set(fields);
    restored.apply(&mutation, &meta_for(member, 1)).unwrap();
    assert_eq!(restored.get("title"), Some(&json!("new")));
}

#[test]
fn snapshot_restore_round_trip() {
    let member = MemberKey::new();
    let mut doc = DocumentModel::new();
    doc.apply(&set_at("title", json!("Hello"), 10), &meta_for(member, 0))
        .unwrap();
    doc.apply(&set_at("count", json!(3), 11), &meta_for(member, 1))
        .unwrap();

    let snapshot = doc.snapshot();
    let mut restored = DocumentModel::new();
    restored.restore(&snapshot).unwrap();
    assert_eq!(restored.get("title"), Some(&json!("Hello")));
    assert_eq!(restored.get("count"), Some(&json!(3)));
    assert_eq!(restored.snapshot(), snapshot);
}

#[test]
fn invalid_mutation_keeps_state() {
    let member = MemberKey::new();
    let mut doc = DocumentModel::new();
    doc.apply(&set_at("title", json!("kept"), 10), &meta_for(member, 0))
        .unwrap();

    let err = doc.apply(&json!("not a mutation"), &meta_for(member, 1));
    assert!(err.is_err());
    assert_eq!(doc.get("title"), Some(&json!("kept")));
}

#[test]
fn invalid_snapshot_is_rejected() {
    let mut doc = DocumentModel::new();
    assert!(doc.restore(&json!(42)).is_err());
}
