//! Compiler tests over a small two-project catalog.


use crate::card_catalog::{InMemoryCatalog, Project, PropertyDescriptor, PropertyKind, Scope};
use crate::query_tree::{kinds, Node};

pub(super) const PLAN_ID: i64 = 7;

/// Properties shared by the fixture projects. Ids are offset per project so
/// enumeration joins differ between branches.
fn standard_properties(id_offset: i64) -> Vec<PropertyDescriptor> {
    vec![
        PropertyDescriptor::new(id_offset + 1, "Status", PropertyKind::Enumerated { numeric: false }, "cp_status"),
        PropertyDescriptor::new(id_offset + 2, "Size", PropertyKind::Numeric, "cp_size"),
        PropertyDescriptor::new(id_offset + 3, "Estimate", PropertyKind::Numeric, "cp_estimate"),
        PropertyDescriptor::new(id_offset + 4, "Owner", PropertyKind::User, "cp_owner_user_id"),
        PropertyDescriptor::new(id_offset + 5, "Tester", PropertyKind::User, "cp_tester_user_id"),
        PropertyDescriptor::new(id_offset + 6, "Parent", PropertyKind::CardRelationship, "cp_parent_card_id"),
        PropertyDescriptor::new(id_offset + 7, "Type", PropertyKind::CardType, "card_type_name"),
        PropertyDescriptor::new(id_offset + 8, "Created On", PropertyKind::PredefinedDate, "created_at"),
        PropertyDescriptor::new(id_offset + 9, "Due", PropertyKind::Date, "cp_due"),
        PropertyDescriptor::new(id_offset + 10, "Name", PropertyKind::Text, "name"),
        PropertyDescriptor::new(id_offset + 11, "Priority", PropertyKind::Enumerated { numeric: false }, "cp_priority"),
    ]
}

/// `alpha` and `beta` share every property; the plan covers both.
pub(super) fn fixture_catalog() -> InMemoryCatalog {
    let mut catalog = InMemoryCatalog::new();
    for (id, identifier) in [(1, "alpha"), (2, "beta")] {
        catalog.add_project(Project::new(id, identifier)).unwrap();
        for property in standard_properties(id * 100) {
            catalog.add_property(identifier, property).unwrap();
        }
    }
    catalog
        .add_scope(plan(), vec!["alpha".to_string(), "beta".to_string()])
        .unwrap();
    catalog
}

pub(super) fn plan() -> Scope {
    Scope::new(PLAN_ID, "Release 1")
}

pub(super) fn alpha(catalog: &InMemoryCatalog) -> Project {
    catalog.project("alpha").unwrap().clone()
}

/// `statements(select(columns...), where(condition)?)`
pub(super) fn query(columns: Vec<Node>, condition: Option<Node>) -> Node {
    let mut tree = Node::new(kinds::STATEMENTS).with_child(Node::new(kinds::SELECT).with_children(columns));
    if let Some(condition) = condition {
        tree = tree.with_child(Node::new(kinds::WHERE).with_child(condition));
    }
    tree
}
