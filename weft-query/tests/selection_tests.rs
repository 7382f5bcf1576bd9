use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};
use weft_graph::{EntityRef, ItemManager};
use weft_model::{DocumentModel, Model, ModelFactory, DOCUMENT_MODEL_TYPE};
use weft_query::{select, select_item, ItemFilter, LinkFilter, QueryOptions, ShowDeleted};
use weft_types::EntityId;

fn manager() -> Arc<ItemManager> {
    let factory = Arc::new(ModelFactory::new());
    factory
        .register_model(DOCUMENT_MODEL_TYPE, |_: &EntityId| -> Box<dyn Model> {
            Box::new(DocumentModel::new())
        })
        .unwrap();
    Arc::new(ItemManager::new(factory))
}

/// Two orgs; the first has two projects, each project has a task; tasks are
/// assigned to people via links.
fn org_graph() -> Arc<ItemManager> {
    let manager = manager();
    let item = |id: &str, ty: &str, parent: Option<&str>| {
        manager
            .construct_item(id, DOCUMENT_MODEL_TYPE, Some(ty.into()), parent.map(EntityId::from))
            .unwrap();
    };
    item("org/1", "Org", None);
    item("org/2", "Org", None);
    item("proj/1", "Project", Some("org/1"));
    item("proj/2", "Project", Some("org/1"));
    item("task/1", "Task", Some("proj/1"));
    item("task/2", "Task", Some("proj/2"));
    item("person/1", "Person", Some("org/1"));
    item("person/2", "Person", Some("org/1"));
    let link = |id: &str, ty: &str, source: &str, target: &str| {
        manager
            .construct_link(id, DOCUMENT_MODEL_TYPE, Some(ty.into()), source, target)
            .unwrap();
    };
    link("assign/1", "Assigned", "task/1", "person/1");
    link("assign/2", "Assigned", "task/2", "person/2");
    link("review/1", "Reviewer", "task/1", "person/2");
    manager
}

fn ids(set: &[EntityRef]) -> Vec<&str> {
    set.iter().map(|entry| entry.id().as_str()).collect()
}

fn default_opts() -> QueryOptions {
    QueryOptions::default()
}

// ── Filters ──────────────────────────────────────────────────────

#[test]
fn database_root_yields_every_live_item() {
    let manager = org_graph();
    let result = select(&manager).execute(&default_opts());
    // Items only; links never appear without an explicit links() step.
    assert_eq!(result.len(), 8);
    assert!(result.iter().all(|entry| entry.as_item().is_some()));
}

#[test]
fn filter_by_type() {
    let manager = org_graph();
    let result = select(&manager)
        .filter(ItemFilter::by_type("Project"))
        .execute(&default_opts());
    assert_eq!(ids(&result), vec!["proj/1", "proj/2"]);
}

#[test]
fn filter_by_types_is_a_union() {
    let manager = org_graph();
    let result = select(&manager)
        .filter(ItemFilter::by_types(["Org", "Person"]))
        .execute(&default_opts());
    assert_eq!(result.len(), 4);
}

#[test]
fn filter_by_parent() {
    let manager = org_graph();
    let result = select(&manager)
        .filter(ItemFilter::by_type("Project").parent("org/1"))
        .execute(&default_opts());
    assert_eq!(ids(&result), vec!["proj/1", "proj/2"]);

    let none = select(&manager)
        .filter(ItemFilter::by_type("Project").parent("org/2"))
        .execute(&default_opts());
    assert!(none.is_empty());
}

#[test]
fn filter_by_predicate() {
    let manager = org_graph();
    let result = select(&manager)
        .filter_fn(|item| item.id.as_str().starts_with("task/"))
        .execute(&default_opts());
    assert_eq!(ids(&result), vec!["task/1", "task/2"]);
}

#[test]
fn item_root_selection() {
    let manager = org_graph();
    let result = select_item(&manager, "org/1").execute(&default_opts());
    assert_eq!(ids(&result), vec!["org/1"]);

    let absent = select_item(&manager, "ghost").execute(&default_opts());
    assert!(absent.is_empty());
}

// ── Traversals ───────────────────────────────────────────────────

#[test]
fn children_traversal() {
    let manager = org_graph();
    let result = select_item(&manager, "org/1")
        .children()
        .filter(ItemFilter::by_type("Project"))
        .execute(&default_opts());
    assert_eq!(ids(&result), vec!["proj/1", "proj/2"]);
}

#[test]
fn parent_traversal_dedupes() {
    let manager = org_graph();
    // Both projects share one parent; it appears once.
    let result = select(&manager)
        .filter(ItemFilter::by_type("Project"))
        .parent()
        .execute(&default_opts());
    assert_eq!(ids(&result), vec!["org/1"]);
}

#[test]
fn roots_have_no_parent() {
    let manager = org_graph();
    let result = select(&manager)
        .filter(ItemFilter::by_type("Org"))
        .parent()
        .execute(&default_opts());
    assert!(result.is_empty());
}

#[test]
fn links_then_target() {
    let manager = org_graph();
    let result = select_item(&manager, "task/1")
        .links(LinkFilter::by_type("Assigned"))
        .target()
        .execute(&default_opts());
    assert_eq!(ids(&result), vec!["person/1"]);
}

#[test]
fn refs_then_source() {
    let manager = org_graph();
    // Who points at person/2? An assignment and a review.
    let links = select_item(&manager, "person/2")
        .refs(LinkFilter::any())
        .execute(&default_opts());
    assert_eq!(links.len(), 2);
    assert!(links.iter().all(|entry| entry.as_link().is_some()));

    let sources = select_item(&manager, "person/2")
        .refs(LinkFilter::any())
        .source()
        .execute(&default_opts());
    // Back-reference order follows link-id order.
    assert_eq!(ids(&sources), vec!["task/2", "task/1"]);
}

#[test]
fn link_filter_narrows_by_type() {
    let manager = org_graph();
    let result = select_item(&manager, "task/1")
        .links(LinkFilter::by_type("Reviewer"))
        .target()
        .execute(&default_opts());
    assert_eq!(ids(&result), vec!["person/2"]);
}

#[test]
fn multi_hop_traversal() {
    let manager = org_graph();
    // Org → projects → tasks → assignees.
    let result = select_item(&manager, "org/1")
        .children()
        .filter(ItemFilter::by_type("Project"))
        .children()
        .links(LinkFilter::by_type("Assigned"))
        .target()
        .execute(&default_opts());
    assert_eq!(ids(&result), vec!["person/1", "person/2"]);
}

#[test]
fn call_observes_without_consuming() {
    let manager = org_graph();
    let observed = Arc::new(Mutex::new(0usize));
    let result = {
        let observed = Arc::clone(&observed);
        select(&manager)
            .filter(ItemFilter::by_type("Task"))
            .call(move |set| *observed.lock().unwrap() = set.len())
            .parent()
            .execute(&default_opts())
    };
    assert_eq!(*observed.lock().unwrap(), 2);
    assert_eq!(ids(&result), vec!["proj/1", "proj/2"]);
}

#[test]
fn composition_leaves_the_parent_selection_reusable() {
    let manager = org_graph();
    let base = select(&manager).filter(ItemFilter::by_type("Project"));
    let narrowed = base.filter(ItemFilter::by_id("proj/1"));

    assert_eq!(base.execute(&default_opts()).len(), 2);
    assert_eq!(ids(&narrowed.execute(&default_opts())), vec!["proj/1"]);
}

// ── Visibility ───────────────────────────────────────────────────

#[test]
fn deleted_items_hidden_by_default() {
    let manager = org_graph();
    manager.set_deleted(&"proj/2".into(), true).unwrap();

    let hidden = select(&manager)
        .filter(ItemFilter::by_type("Project"))
        .execute(&default_opts());
    assert_eq!(ids(&hidden), vec!["proj/1"]);

    let shown = select(&manager)
        .filter(ItemFilter::by_type("Project"))
        .execute(&QueryOptions::with_deleted(ShowDeleted::ShowDeleted));
    assert_eq!(shown.len(), 2);

    let only = select(&manager)
        .filter(ItemFilter::by_type("Project"))
        .execute(&QueryOptions::with_deleted(ShowDeleted::ShowDeletedOnly));
    assert_eq!(ids(&only), vec!["proj/2"]);
}

#[test]
fn deletion_policy_applies_at_every_hop() {
    let manager = org_graph();
    manager.set_deleted(&"task/2".into(), true).unwrap();

    let result = select_item(&manager, "proj/2").children().execute(&default_opts());
    assert!(result.is_empty());

    let shown = select_item(&manager, "proj/2")
        .children()
        .execute(&QueryOptions::with_deleted(ShowDeleted::ShowDeleted));
    assert_eq!(ids(&shown), vec!["task/2"]);
}

#[test]
fn uninitialized_items_are_always_invisible() {
    let manager = org_graph();
    manager
        .construct_item("pending/1", "custom.unregistered", Some("Org".into()), None)
        .unwrap();

    for policy in [
        ShowDeleted::HideDeleted,
        ShowDeleted::ShowDeleted,
        ShowDeleted::ShowDeletedOnly,
    ] {
        let result = select(&manager)
            .filter(ItemFilter::by_id("pending/1"))
            .execute(&QueryOptions::with_deleted(policy));
        assert!(result.is_empty());
    }
}
