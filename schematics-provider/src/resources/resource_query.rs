//! ibm_schematics_resource_query - stored queries that discover inventory hosts

use schematics_core::provider::{ProviderError, ProviderResult};
use schematics_core::resource::{Attributes, Resource, ResourceId, State};
use schematics_core::schema::{AttributeSchema, AttributeType, BlockSchema, ResourceSchema};

use crate::convert::{AttrReader, AttrWriter};
use crate::models::{QueryCondition, QueryDefinition, ResourceQuery};
use crate::provider::{SchematicsProvider, api_error, unchanged};

pub const RESOURCE_TYPE: &str = "ibm_schematics_resource_query";

pub fn schema() -> ResourceSchema {
    let condition = BlockSchema::new()
        .attribute(AttributeSchema::new("name", AttributeType::String))
        .attribute(AttributeSchema::new("value", AttributeType::String))
        .attribute(AttributeSchema::new("description", AttributeType::String));

    ResourceSchema::new(RESOURCE_TYPE)
        .with_description("A resource query definition")
        .attribute(
            AttributeSchema::new("type", AttributeType::enumeration(&["vsi"]))
                .with_description("Resource type (cluster, vsi, icd, vpc)"),
        )
        .attribute(AttributeSchema::new("name", AttributeType::String).required())
        .attribute(AttributeSchema::new(
            "queries",
            AttributeType::block_list(
                BlockSchema::new()
                    .attribute(AttributeSchema::new(
                        "query_type",
                        AttributeType::enumeration(&["workspaces"]),
                    ))
                    .attribute(AttributeSchema::new(
                        "query_condition",
                        AttributeType::block_list(condition),
                    ))
                    .attribute(AttributeSchema::new("query_select", AttributeType::string_list())),
            ),
        ))
        .attribute(AttributeSchema::new("created_at", AttributeType::String).computed())
        .attribute(AttributeSchema::new("created_by", AttributeType::String).computed())
        .attribute(AttributeSchema::new("updated_at", AttributeType::String).computed())
        .attribute(AttributeSchema::new("updated_by", AttributeType::String).computed())
}

pub fn to_request(attrs: &Attributes) -> ProviderResult<ResourceQuery> {
    let r = AttrReader::new(attrs);
    Ok(ResourceQuery {
        type_: r.string("type")?,
        name: r.string("name")?,
        queries: r.blocks("queries", |q| {
            Ok(QueryDefinition {
                query_type: q.string("query_type")?,
                query_condition: q.blocks("query_condition", |c| {
                    Ok(QueryCondition {
                        name: c.string("name")?,
                        value: c.string("value")?,
                        description: c.string("description")?,
                    })
                })?,
                query_select: q.strings("query_select")?,
            })
        })?,
        ..Default::default()
    })
}

pub fn from_response(query: &ResourceQuery) -> Attributes {
    AttrWriter::new()
        .string("type", &query.type_)
        .string("name", &query.name)
        .blocks("queries", &query.queries, |q| {
            AttrWriter::new()
                .string("query_type", &q.query_type)
                .blocks("query_condition", &q.query_condition, |c| {
                    AttrWriter::new()
                        .string("name", &c.name)
                        .string("value", &c.value)
                        .string("description", &c.description)
                        .finish()
                })
                .strings("query_select", &q.query_select)
                .finish()
        })
        .string("created_at", &query.created_at)
        .string("created_by", &query.created_by)
        .string("updated_at", &query.updated_at)
        .string("updated_by", &query.updated_by)
        .finish()
}

impl SchematicsProvider {
    pub(crate) async fn read_resource_query(
        &self,
        id: &ResourceId,
        query_id: &str,
    ) -> ProviderResult<State> {
        match self.client.get_resource_query(&self.endpoint(), query_id).await {
            Ok(query) => {
                Ok(State::existing(id.clone(), from_response(&query)).with_identifier(query_id))
            }
            Err(e) if e.is_not_found() => {
                log::debug!("resource query {} is gone", query_id);
                Ok(State::not_found(id.clone()))
            }
            Err(e) => Err(api_error("GetResourceQuery", id, e)),
        }
    }

    pub(crate) async fn create_resource_query(&self, resource: &Resource) -> ProviderResult<State> {
        let id = &resource.id;
        let request = to_request(&resource.attributes).map_err(|e| e.for_resource(id.clone()))?;
        let created = self
            .client
            .create_resource_query(&self.endpoint(), &request)
            .await
            .map_err(|e| api_error("CreateResourceQuery", id, e))?;
        let query_id = created.id.ok_or_else(|| {
            ProviderError::new("create response carried no query id")
                .for_resource(id.clone())
                .during("CreateResourceQuery")
        })?;
        log::info!("created resource query {} ({})", id.name, query_id);

        self.read_resource_query(id, &query_id).await
    }

    /// Replace the whole definition when anything changed
    pub(crate) async fn update_resource_query(
        &self,
        id: &ResourceId,
        query_id: &str,
        from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        let changed = self.changes(&schema(), id, from, to)?;
        if changed.is_empty() {
            return Ok(unchanged(id, query_id, from));
        }

        let request = to_request(&to.attributes).map_err(|e| e.for_resource(id.clone()))?;
        self.client
            .replace_resource_query(&self.endpoint(), query_id, &request)
            .await
            .map_err(|e| api_error("ReplaceResourceQuery", id, e))?;

        self.read_resource_query(id, query_id).await
    }

    pub(crate) async fn delete_resource_query(
        &self,
        id: &ResourceId,
        query_id: &str,
    ) -> ProviderResult<()> {
        self.client
            .delete_resource_query(&self.endpoint(), query_id)
            .await
            .map_err(|e| api_error("DeleteResourceQuery", id, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schematics_core::resource::Value;

    fn desired() -> Attributes {
        let mut condition = Attributes::new();
        condition.insert("name".to_string(), Value::from("workspace-id"));
        condition.insert("value".to_string(), Value::from("us-south.workspace.web.1234"));

        let mut query = Attributes::new();
        query.insert("query_type".to_string(), Value::from("workspaces"));
        query.insert(
            "query_condition".to_string(),
            Value::List(vec![Value::Map(condition)]),
        );
        query.insert(
            "query_select".to_string(),
            Value::List(vec![Value::from("ipv4_address")]),
        );

        [
            ("type", Value::from("vsi")),
            ("name", Value::from("web-vsis")),
            ("queries", Value::List(vec![Value::Map(query)])),
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
    fn type_is_renamed_on_the_wire() {
        let json = serde_json::to_value(to_request(&desired()).unwrap()).unwrap();
        assert_eq!(json["type"], "vsi");
        assert!(json["queries"][0]["query_condition"][0].get("description").is_none());
    }
}
