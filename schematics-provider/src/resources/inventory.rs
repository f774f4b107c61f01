//! ibm_schematics_inventory - static or query-driven host inventories

use schematics_core::provider::{ProviderError, ProviderResult};
use schematics_core::resource::{Attributes, Resource, ResourceId, State};
use schematics_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

use super::LOCATIONS;
use crate::convert::{AttrReader, AttrWriter, select_fields};
use crate::models::Inventory;
use crate::provider::{SchematicsProvider, api_error, unchanged};

pub const RESOURCE_TYPE: &str = "ibm_schematics_inventory";

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(RESOURCE_TYPE)
        .with_description("A resource inventory used by Schematics actions")
        .attribute(
            AttributeSchema::new("name", AttributeType::BoundedString { min: 1, max: 64 })
                .required(),
        )
        .attribute(AttributeSchema::new(
            "description",
            AttributeType::BoundedString { min: 0, max: 2048 },
        ))
        .attribute(
            AttributeSchema::new("location", AttributeType::enumeration(LOCATIONS))
                .optional_computed()
                .force_new(),
        )
        .attribute(AttributeSchema::new("resource_group", AttributeType::String).optional_computed())
        .attribute(
            AttributeSchema::new("inventories_ini", AttributeType::String)
                .with_description("Hosts in Ansible INI format"),
        )
        .attribute(
            AttributeSchema::new("resource_queries", AttributeType::string_list())
                .with_description("Resource query ids used to discover hosts"),
        )
        .attribute(AttributeSchema::new("created_at", AttributeType::String).computed())
        .attribute(AttributeSchema::new("created_by", AttributeType::String).computed())
        .attribute(AttributeSchema::new("updated_at", AttributeType::String).computed())
        .attribute(AttributeSchema::new("updated_by", AttributeType::String).computed())
}

pub fn to_request(attrs: &Attributes) -> ProviderResult<Inventory> {
    let r = AttrReader::new(attrs);
    Ok(Inventory {
        name: r.string("name")?,
        description: r.string("description")?,
        location: r.string("location")?,
        resource_group: r.string("resource_group")?,
        inventories_ini: r.string("inventories_ini")?,
        resource_queries: r.strings("resource_queries")?,
        ..Default::default()
    })
}

pub fn from_response(inventory: &Inventory) -> Attributes {
    AttrWriter::new()
        .string("name", &inventory.name)
        .string("description", &inventory.description)
        .string("location", &inventory.location)
        .string("resource_group", &inventory.resource_group)
        .string("inventories_ini", &inventory.inventories_ini)
        .strings("resource_queries", &inventory.resource_queries)
        .string("created_at", &inventory.created_at)
        .string("created_by", &inventory.created_by)
        .string("updated_at", &inventory.updated_at)
        .string("updated_by", &inventory.updated_by)
        .finish()
}

impl SchematicsProvider {
    pub(crate) async fn read_inventory(
        &self,
        id: &ResourceId,
        inventory_id: &str,
    ) -> ProviderResult<State> {
        match self.client.get_inventory(&self.endpoint(), inventory_id).await {
            Ok(inventory) => Ok(State::existing(id.clone(), from_response(&inventory))
                .with_identifier(inventory_id)),
            Err(e) if e.is_not_found() => {
                log::debug!("inventory {} is gone", inventory_id);
                Ok(State::not_found(id.clone()))
            }
            Err(e) => Err(api_error("GetInventory", id, e)),
        }
    }

    pub(crate) async fn create_inventory(&self, resource: &Resource) -> ProviderResult<State> {
        let id = &resource.id;
        let request = to_request(&resource.attributes).map_err(|e| e.for_resource(id.clone()))?;
        let created = self
            .client
            .create_inventory(&self.endpoint(), &request)
            .await
            .map_err(|e| api_error("CreateInventory", id, e))?;
        let inventory_id = created.id.ok_or_else(|| {
            ProviderError::new("create response carried no inventory id")
                .for_resource(id.clone())
                .during("CreateInventory")
        })?;
        log::info!("created inventory {} ({})", id.name, inventory_id);

        self.read_inventory(id, &inventory_id).await
    }

    pub(crate) async fn update_inventory(
        &self,
        id: &ResourceId,
        inventory_id: &str,
        from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        let changed = self.patch_changes(&schema(), id, from, to)?;
        if changed.is_empty() {
            return Ok(unchanged(id, inventory_id, from));
        }

        let desired = to_request(&to.attributes).map_err(|e| e.for_resource(id.clone()))?;
        let fields: Vec<&str> = changed.iter().map(String::as_str).collect();
        let patch = select_fields(&desired, &fields)?;
        self.client
            .update_inventory(&self.endpoint(), inventory_id, &patch)
            .await
            .map_err(|e| api_error("UpdateInventory", id, e))?;

        self.read_inventory(id, inventory_id).await
    }

    pub(crate) async fn delete_inventory(
        &self,
        id: &ResourceId,
        inventory_id: &str,
    ) -> ProviderResult<()> {
        self.client
            .delete_inventory(&self.endpoint(), inventory_id)
            .await
            .map_err(|e| api_error("DeleteInventory", id, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schematics_core::resource::Value;

    fn desired() -> Attributes {
        [
            ("name", Value::from("web-hosts")),
            ("location", Value::from("us-south")),
            ("inventories_ini", Value::from("[web]\n10.0.0.5\n")),
            (
                "resource_queries",
                Value::List(vec![Value::from("us-south.RESOURCEQUERY.vsi.9a8b")]),
            ),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    #[test]
    fn round_trip_restores_settable_attributes() {
        let attrs = desired();
        assert!(schema().validate(&attrs).is_ok());
        assert_eq!(from_response(&to_request(&attrs).unwrap()), attrs);
    }

    #[test]
    fn name_length_is_bounded() {
        let mut attrs = desired();
        attrs.insert("name".to_string(), Value::from("x".repeat(65)));
        assert!(schema().validate(&attrs).is_err());
    }

    #[test]
    fn type_mismatch_is_a_state_error() {
        let mut attrs = desired();
        attrs.insert("resource_queries".to_string(), Value::from("not-a-list"));
        let err = to_request(&attrs).unwrap_err();
        assert_eq!(err.kind, schematics_core::provider::ErrorKind::State);
    }
}
