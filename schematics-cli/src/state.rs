//! State file structures for remembering what the CLI manages

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use schematics_core::resource::{Attributes, ResourceId, State, Value};

/// Default state file name
pub const DEFAULT_STATE_FILE: &str = "schematics.state.json";

/// The state file persisted next to the resource files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    /// State file format version
    pub version: u32,
    /// Monotonically increasing number for each state modification
    pub serial: u64,
    /// Version of the CLI that last modified this state
    pub cli_version: String,
    pub resources: Vec<ResourceState>,
}

impl StateFile {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            serial: 0,
            cli_version: env!("CARGO_PKG_VERSION").to_string(),
            resources: Vec::new(),
        }
    }

    /// Read the state at `path`; a missing file is an empty state
    pub fn load(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read state file {}: {}", path.display(), e))?;
        let state: StateFile = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse state file {}: {}", path.display(), e))?;
        if state.version > Self::CURRENT_VERSION {
            return Err(format!(
                "State file version {} is newer than supported version {}",
                state.version,
                Self::CURRENT_VERSION
            ));
        }
        Ok(state)
    }

    /// Bump the serial and write the state to `path`
    pub fn save(&mut self, path: &Path) -> Result<(), String> {
        self.serial += 1;
        self.cli_version = env!("CARGO_PKG_VERSION").to_string();
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize state: {}", e))?;
        std::fs::write(path, content)
            .map_err(|e| format!("Failed to write state file {}: {}", path.display(), e))
    }

    pub fn find(&self, id: &ResourceId) -> Option<&ResourceState> {
        self.resources
            .iter()
            .find(|r| r.resource_type == id.resource_type && r.name == id.name)
    }

    /// Add or replace the entry for a resource
    pub fn upsert(&mut self, resource: ResourceState) {
        match self
            .resources
            .iter_mut()
            .find(|r| r.resource_type == resource.resource_type && r.name == resource.name)
        {
            Some(existing) => *existing = resource,
            None => self.resources.push(resource),
        }
    }

    pub fn remove(&mut self, id: &ResourceId) -> Option<ResourceState> {
        let pos = self
            .resources
            .iter()
            .position(|r| r.resource_type == id.resource_type && r.name == id.name)?;
        Some(self.resources.remove(pos))
    }
}

impl Default for StateFile {
    fn default() -> Self {
        Self::new()
    }
}

/// State of a single managed resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceState {
    pub resource_type: String,
    pub name: String,
    /// Remote identity returned by the service
    pub identifier: String,
    pub attributes: HashMap<String, serde_json::Value>,
    pub updated_at: DateTime<Utc>,
}

impl ResourceState {
    /// Record a state read from the provider; `None` if it has no identity
    pub fn from_state(state: &State) -> Option<Self> {
        if !state.exists {
            return None;
        }
        let identifier = state.identifier.clone()?;
        Some(Self {
            resource_type: state.id.resource_type.clone(),
            name: state.id.name.clone(),
            identifier,
            attributes: state
                .attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
            updated_at: Utc::now(),
        })
    }

    pub fn id(&self) -> ResourceId {
        ResourceId::new(&self.resource_type, &self.name)
    }

    pub fn attributes(&self) -> Attributes {
        self.attributes
            .iter()
            .filter_map(|(k, v)| Value::from_json(v).map(|v| (k.clone(), v)))
            .collect()
    }

    /// The stored state as the provider expects it for an update
    pub fn to_state(&self) -> State {
        State::existing(self.id(), self.attributes()).with_identifier(&self.identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent_state() -> State {
        let mut attrs = Attributes::new();
        attrs.insert("name".to_string(), Value::from("agent-1"));
        attrs.insert("run_destroy_resources".to_string(), Value::Int(1));
        State::existing(ResourceId::new("ibm_schematics_agent", "a"), attrs)
            .with_identifier("agent-1234")
    }

    #[test]
    fn new_state_is_empty() {
        let state = StateFile::new();
        assert_eq!(state.version, StateFile::CURRENT_VERSION);
        assert_eq!(state.serial, 0);
        assert!(state.resources.is_empty());
    }

    #[test]
    fn missing_or_identity_less_states_are_not_recorded() {
        assert!(ResourceState::from_state(&State::not_found(ResourceId::new("t", "n"))).is_none());
        let no_identity = State::existing(ResourceId::new("t", "n"), Attributes::new());
        assert!(ResourceState::from_state(&no_identity).is_none());
    }

    #[test]
    fn stored_state_converts_back() {
        let entry = ResourceState::from_state(&agent_state()).unwrap();
        assert_eq!(entry.to_state(), agent_state());
    }

    #[test]
    fn upsert_replaces_and_remove_drops() {
        let mut state = StateFile::new();
        let entry = ResourceState::from_state(&agent_state()).unwrap();
        state.upsert(entry.clone());
        state.upsert(entry);
        assert_eq!(state.resources.len(), 1);

        let id = ResourceId::new("ibm_schematics_agent", "a");
        assert_eq!(state.find(&id).map(|r| r.identifier.as_str()), Some("agent-1234"));
        assert!(state.remove(&id).is_some());
        assert!(state.find(&id).is_none());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_STATE_FILE);

        let mut state = StateFile::load(&path).unwrap();
        state.upsert(ResourceState::from_state(&agent_state()).unwrap());
        state.save(&path).unwrap();

        let loaded = StateFile::load(&path).unwrap();
        assert_eq!(loaded.serial, 1);
        assert_eq!(loaded.resources.len(), 1);
        assert_eq!(loaded.resources[0].identifier, "agent-1234");
    }

    #[test]
    fn rejects_newer_versions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_STATE_FILE);
        std::fs::write(
            &path,
            r#"{"version": 99, "serial": 3, "cli_version": "9.9.9", "resources": []}"#,
        )
        .unwrap();
        assert!(StateFile::load(&path).unwrap_err().contains("newer"));
    }
}
