//! Differ - Compare desired state with current state
//!
//! Compares the desired attributes declared by the operator with the state
//! last read from the provider and decides whether a create, an in-place
//! update or nothing is needed.

use crate::resource::{Attributes, Resource, ResourceId, State, Value};
use crate::schema::{AttributeMode, AttributeSchema, AttributeType, ResourceSchema};

/// Result of a diff operation
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Resource does not exist -> needs creation
    Create(Resource),
    /// Resource exists with differences -> needs update
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// Resource exists with no differences -> no action needed
    NoChange(ResourceId),
}

/// Compare desired state with current state to compute a Diff
pub fn diff(schema: &ResourceSchema, desired: &Resource, current: &State) -> Diff {
    if !current.exists {
        return Diff::Create(desired.clone());
    }

    let changed = changed_attributes(schema, &desired.attributes, &current.attributes);

    if changed.is_empty() {
        Diff::NoChange(desired.id.clone())
    } else {
        Diff::Update {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    }
}

/// Find the settable attributes whose desired value differs from the current one
///
/// Computed-only attributes never count. An optional+computed attribute left
/// unset by the operator keeps whatever the service chose. Nested blocks are
/// compared by the same rules, so computed sub-fields the service fills in do
/// not show up as changes. The result is sorted.
pub fn changed_attributes(
    schema: &ResourceSchema,
    desired: &Attributes,
    current: &Attributes,
) -> Vec<String> {
    let mut changed: Vec<String> = schema
        .attributes
        .values()
        .filter(|attr| attribute_changed(attr, desired.get(&attr.name), current.get(&attr.name)))
        .map(|attr| attr.name.clone())
        .collect();
    changed.sort();
    changed
}

fn attribute_changed(attr: &AttributeSchema, desired: Option<&Value>, current: Option<&Value>) -> bool {
    match (attr.mode, desired, current) {
        (AttributeMode::Computed, _, _) => false,
        (AttributeMode::OptionalComputed, None, _) => false,
        (_, Some(d), Some(c)) => !same_settable(&attr.attr_type, d, c),
        (_, None, None) => false,
        _ => true,
    }
}

fn same_settable(attr_type: &AttributeType, desired: &Value, current: &Value) -> bool {
    match (attr_type, desired, current) {
        (AttributeType::Block(block), Value::Map(d), Value::Map(c)) => block
            .attributes
            .values()
            .all(|attr| !attribute_changed(attr, d.get(&attr.name), c.get(&attr.name))),
        (AttributeType::List(inner), Value::List(d), Value::List(c)) => {
            d.len() == c.len() && d.iter().zip(c).all(|(d, c)| same_settable(inner, d, c))
        }
        _ => desired == current,
    }
}

/// Changed attributes that can only be applied by replacing the resource
pub fn replacement_attributes(schema: &ResourceSchema, changed: &[String]) -> Vec<String> {
    changed
        .iter()
        .filter(|name| schema.attributes.get(*name).is_some_and(|a| a.force_new))
        .cloned()
        .collect()
}

/// Copy local-only attributes from `previous` into a freshly read attribute map
///
/// The service never echoes these attributes, so a read alone would make
/// every later diff report them as changed.
pub fn carry_over_local(schema: &ResourceSchema, previous: &Attributes, refreshed: &mut Attributes) {
    for attr in schema.attributes.values().filter(|a| a.local_only) {
        if let Some(value) = previous.get(&attr.name) {
            refreshed
                .entry(attr.name.clone())
                .or_insert_with(|| value.clone());
        }
    }
}
