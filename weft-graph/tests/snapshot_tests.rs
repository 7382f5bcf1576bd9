use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use weft_graph::{GraphError, ItemDemuxer, ItemManager};
use weft_model::{DocumentModel, Model, ModelFactory, DOCUMENT_MODEL_TYPE};
use weft_types::{
    DatabaseSnapshot, EntityId, FeedKey, FeedMessage, HybridTimestamp, ItemMutation, ItemSnapshot,
    LinkData, MemberKey, MessageMeta,
};

fn setup() -> ItemDemuxer {
    let factory = Arc::new(ModelFactory::new());
    factory
        .register_model(DOCUMENT_MODEL_TYPE, |_: &EntityId| -> Box<dyn Model> {
            Box::new(DocumentModel::new())
        })
        .unwrap();
    ItemDemuxer::new(Arc::new(ItemManager::new(factory)))
}

fn meta(seq: u64) -> MessageMeta {
    MessageMeta::new(FeedKey::new(), MemberKey::new(), seq)
}

fn set_field(field: &str, value: serde_json::Value, wall: u64) -> serde_json::Value {
    let mut fields = BTreeMap::new();
    fields.insert(field.to_string(), value);
    DocumentModel::set_mutation_at(fields, HybridTimestamp::new(wall, 0))
}

/// Builds a small populated graph: two orgs, a project under each, a task
/// under the first project, and an assignment link.
fn populate(demuxer: &ItemDemuxer) {
    let records = [
        FeedMessage::genesis_item("org/1", DOCUMENT_MODEL_TYPE, Some("Org".into()))
            .with_mutation(set_field("name", json!("Acme"), 10)),
        FeedMessage::genesis_item("org/2", DOCUMENT_MODEL_TYPE, Some("Org".into())),
        FeedMessage::genesis_item("proj/1", DOCUMENT_MODEL_TYPE, Some("Project".into())),
        FeedMessage::item_mutation(
            "proj/1",
            ItemMutation {
                parent_id: Some("org/1".into()),
                deleted: None,
            },
        ),
        FeedMessage::genesis_item("task/1", DOCUMENT_MODEL_TYPE, Some("Task".into())),
        FeedMessage::item_mutation(
            "task/1",
            ItemMutation {
                parent_id: Some("proj/1".into()),
                deleted: None,
            },
        ),
        FeedMessage::genesis_link("assign/1", DOCUMENT_MODEL_TYPE, Some("Assign".into()), "task/1", "org/2"),
    ];
    for (seq, record) in records.iter().enumerate() {
        demuxer.handle_message(record, &meta(seq as u64)).unwrap();
    }
}

#[test]
fn export_then_restore_reproduces_the_graph() {
    let source = setup();
    populate(&source);
    source.manager().set_deleted(&"org/2".into(), true).unwrap();

    let snapshot = source.export_snapshot().unwrap();

    let restored = setup();
    restored.restore_snapshot(&snapshot).unwrap();
    let manager = restored.manager();

    assert_eq!(manager.len(), source.manager().len());
    assert_eq!(manager.entity_ids(), source.manager().entity_ids());

    let org = manager.get_item(&"org/1".into()).unwrap();
    assert_eq!(org.item_type.as_deref(), Some("Org"));
    assert!(manager.get_item(&"org/2".into()).unwrap().deleted);

    let proj = manager.get_item(&"proj/1".into()).unwrap();
    assert_eq!(proj.parent_id, Some(EntityId::from("org/1")));
    assert_eq!(manager.children_of(&"proj/1".into()).len(), 1);

    let link = manager.get_link(&"assign/1".into()).unwrap();
    assert_eq!(link.source_id, EntityId::from("task/1"));
    assert_eq!(link.target_id, EntityId::from("org/2"));

    // Model state came across too.
    let model = manager.model_snapshot(&"org/1".into()).unwrap().unwrap();
    assert_eq!(model["name"]["value"], json!("Acme"));
}

#[test]
fn restore_orders_parents_before_children() {
    let snapshot = DatabaseSnapshot {
        items: vec![
            // Deliberately child-first.
            item_record("task/1", Some("proj/1")),
            item_record("proj/1", Some("org/1")),
            item_record("org/1", None),
        ],
    };
    let demuxer = setup();
    demuxer.restore_snapshot(&snapshot).unwrap();
    assert_eq!(demuxer.manager().len(), 3);
    assert_eq!(
        demuxer.manager().get_item(&"task/1".into()).unwrap().parent_id,
        Some(EntityId::from("proj/1"))
    );
}

#[test]
fn restore_orders_links_after_endpoints() {
    let snapshot = DatabaseSnapshot {
        items: vec![
            link_record("edge/1", "a", "b"),
            item_record("a", None),
            item_record("b", None),
        ],
    };
    let demuxer = setup();
    demuxer.restore_snapshot(&snapshot).unwrap();
    assert!(demuxer.manager().get_link(&"edge/1".into()).is_some());
}

#[test]
fn restore_with_missing_parent_fails() {
    let snapshot = DatabaseSnapshot {
        items: vec![item_record("proj/1", Some("org/ghost"))],
    };
    let demuxer = setup();
    let err = demuxer.restore_snapshot(&snapshot).unwrap_err();
    assert!(matches!(
        err,
        GraphError::TopologicalSort(stuck) if stuck == vec![EntityId::from("proj/1")]
    ));
}

#[test]
fn restore_with_dangling_link_fails() {
    let snapshot = DatabaseSnapshot {
        items: vec![item_record("a", None), link_record("edge/1", "a", "ghost")],
    };
    let demuxer = setup();
    let err = demuxer.restore_snapshot(&snapshot).unwrap_err();
    assert!(matches!(err, GraphError::TopologicalSort(_)));
}

#[test]
fn restore_preserves_unregistered_model_state() {
    let source = ItemDemuxer::new(Arc::new(ItemManager::new(Arc::new(ModelFactory::new()))));
    source
        .handle_message(
            &FeedMessage::genesis_item("note/1", "custom.notes", None),
            &meta(0),
        )
        .unwrap();
    source
        .manager()
        .reset_to_snapshot(&"note/1".into(), &json!({"held": true}))
        .unwrap();

    let snapshot = source.export_snapshot().unwrap();
    assert_eq!(snapshot.items[0].model_type, "custom.notes");

    let restored = ItemDemuxer::new(Arc::new(ItemManager::new(Arc::new(ModelFactory::new()))));
    restored.restore_snapshot(&snapshot).unwrap();
    assert_eq!(
        restored.manager().model_snapshot(&"note/1".into()).unwrap(),
        Some(json!({"held": true}))
    );
}

fn item_record(id: &str, parent: Option<&str>) -> ItemSnapshot {
    ItemSnapshot {
        item_id: id.into(),
        item_type: None,
        model_type: DOCUMENT_MODEL_TYPE.to_string(),
        parent_id: parent.map(EntityId::from),
        link: None,
        deleted: false,
        model: None,
    }
}

fn link_record(id: &str, source: &str, target: &str) -> ItemSnapshot {
    ItemSnapshot {
        item_id: id.into(),
        item_type: None,
        model_type: DOCUMENT_MODEL_TYPE.to_string(),
        parent_id: None,
        link: Some(LinkData {
            source: source.into(),
            target: target.into(),
        }),
        deleted: false,
        model: None,
    }
}

proptest! {
    /// Restore succeeds from any permutation of a valid snapshot and always
    /// reproduces the same graph shape.
    #[test]
    fn restore_is_order_independent(
        permutation in Just((0..6usize).collect::<Vec<_>>()).prop_shuffle(),
    ) {
        let base = vec![
            item_record("org/1", None),
            item_record("proj/1", Some("org/1")),
            item_record("proj/2", Some("org/1")),
            item_record("task/1", Some("proj/1")),
            link_record("edge/1", "task/1", "proj/2"),
            link_record("edge/2", "proj/1", "proj/2"),
        ];
        let items: Vec<ItemSnapshot> =
            permutation.into_iter().map(|i| base[i].clone()).collect();

        let demuxer = setup();
        demuxer.restore_snapshot(&DatabaseSnapshot { items }).unwrap();
        let manager = demuxer.manager();
        prop_assert_eq!(manager.len(), 6);
        prop_assert_eq!(manager.children_of(&"org/1".into()).len(), 2);
        prop_assert_eq!(manager.links_of(&"task/1".into()).len(), 1);
        prop_assert_eq!(manager.refs_of(&"proj/2".into()).len(), 2);
    }
}
