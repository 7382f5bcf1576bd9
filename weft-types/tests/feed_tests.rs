use pretty_assertions::assert_eq;
use serde_json::json;
use weft_types::{EntityId, FeedKey, FeedMessage, ItemMutation, MemberKey, MessageMeta};

#[test]
fn genesis_item_record() {
    let msg = FeedMessage::genesis_item("org/1", "weft.document", Some("Org".into()));
    assert_eq!(msg.item_id, EntityId::from("org/1"));
    let genesis = msg.genesis.as_ref().unwrap();
    assert_eq!(genesis.model_type, "weft.document");
    assert_eq!(genesis.item_type.as_deref(), Some("Org"));
    assert!(genesis.link.is_none());
    assert!(msg.item_mutation.is_none());
    assert!(msg.mutation.is_none());
    assert!(msg.snapshot.is_none());
}

#[test]
fn genesis_link_record_carries_endpoints() {
    let msg = FeedMessage::genesis_link("edge/1", "weft.document", None, "a", "b");
    let link = msg.genesis.as_ref().unwrap().link.as_ref().unwrap();
    assert_eq!(link.source, EntityId::from("a"));
    assert_eq!(link.target, EntityId::from("b"));
}

#[test]
fn genesis_with_inline_first_mutation() {
    let msg = FeedMessage::genesis_item("org/1", "weft.document", None)
        .with_mutation(json!({"set": {"name": "Acme"}}));
    assert!(msg.genesis.is_some());
    assert!(msg.mutation.is_some());
}

#[test]
fn item_mutation_record() {
    let msg = FeedMessage::item_mutation(
        "proj/1",
        ItemMutation {
            parent_id: Some("org/1".into()),
            deleted: Some(true),
        },
    );
    let m = msg.item_mutation.as_ref().unwrap();
    assert_eq!(m.parent_id, Some(EntityId::from("org/1")));
    assert_eq!(m.deleted, Some(true));
}

#[test]
fn absent_fields_are_omitted_from_wire_form() {
    let msg = FeedMessage::model_mutation("org/1", json!({"set": {}}));
    let wire = serde_json::to_value(&msg).unwrap();
    assert_eq!(
        wire,
        json!({"item_id": "org/1", "mutation": {"set": {}}})
    );
}

#[test]
fn feed_message_serde_round_trip() {
    let msg = FeedMessage::genesis_link("edge/1", "weft.document", Some("Assignment".into()), "a", "b")
        .with_mutation(json!({"set": {"role": "owner"}}));
    let json = serde_json::to_string(&msg).unwrap();
    let back: FeedMessage = serde_json::from_str(&json).unwrap();
    assert_eq!(back, msg);
}

#[test]
fn message_meta_defaults_to_empty_timeframe() {
    let meta = MessageMeta::new(FeedKey::new(), MemberKey::new(), 7);
    assert_eq!(meta.seq, 7);
    assert!(meta.timeframe.is_empty());

    // Deserializing metadata without a timeframe yields an empty one.
    let wire = json!({
        "feed_key": meta.feed_key,
        "member_key": meta.member_key,
        "seq": 7
    });
    let parsed: MessageMeta = serde_json::from_value(wire).unwrap();
    assert_eq!(parsed, meta);
}
