//! JSON file storage
//!
//! Each database `<name>` lives in two files under the data directory:
//! `<name>_nodes.json` and `<name>_rels.json`. Both hold a versioned
//! envelope `{"version": 1, "next_id": N, "records": [...]}` with records in
//! id order; `next_id` is the store's id counter at save time. Bare arrays
//! (the unversioned layout) load as version 0.
//!
//! Each file is replaced atomically, but the pair is not: a save interrupted
//! between the two renames leaves a new nodes file beside an old rels file.
//! Loading drops relationships whose endpoints are missing instead of
//! refusing the database.

use super::{PersistenceError, PersistenceResult};
use crate::graph::{
    GraphStore, Label, Node, NodeId, PropertyMap, Relationship, RelationshipId,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Current on-disk format version
pub const FORMAT_VERSION: u32 = 1;

/// Serialized node record
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredNode {
    id: u64,
    #[serde(default, deserialize_with = "non_null_labels")]
    labels: Vec<String>,
    #[serde(default)]
    properties: PropertyMap,
}

/// Serialized relationship record
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRelationship {
    id: u64,
    #[serde(rename = "type")]
    rel_type: String,
    start: u64,
    end: u64,
    #[serde(default)]
    properties: PropertyMap,
}

impl From<&Node> for StoredNode {
    fn from(node: &Node) -> Self {
        StoredNode {
            id: node.id.as_u64(),
            labels: node.labels.iter().map(|l| l.as_str().to_string()).collect(),
            properties: node.properties.clone(),
        }
    }
}

impl From<StoredNode> for Node {
    fn from(stored: StoredNode) -> Self {
        Node::new(
            NodeId::new(stored.id),
            stored.labels.into_iter().map(Label::new),
            stored.properties,
        )
    }
}

impl From<&Relationship> for StoredRelationship {
    fn from(rel: &Relationship) -> Self {
        StoredRelationship {
            id: rel.id.as_u64(),
            rel_type: rel.rel_type.as_str().to_string(),
            start: rel.start.as_u64(),
            end: rel.end.as_u64(),
            properties: rel.properties.clone(),
        }
    }
}

impl From<StoredRelationship> for Relationship {
    fn from(stored: StoredRelationship) -> Self {
        Relationship::new(
            RelationshipId::new(stored.id),
            stored.rel_type,
            NodeId::new(stored.start),
            NodeId::new(stored.end),
            stored.properties,
        )
    }
}

/// Unlabelled nodes in unversioned files were written as `[null]`
fn non_null_labels<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let labels: Vec<Option<String>> = Vec::deserialize(deserializer)?;
    Ok(labels.into_iter().flatten().collect())
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    version: u32,
    next_id: u64,
    records: &'a [T],
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope {
    Versioned {
        version: u32,
        #[serde(default)]
        next_id: Option<u64>,
        records: JsonValue,
    },
    Legacy(Vec<JsonValue>),
}

/// Records of one file plus its saved id counter, if any
struct Collection<T> {
    records: Vec<T>,
    next_id: Option<u64>,
}

/// Check a database name is usable as a file name prefix
///
/// Names must be non-empty and consist of ASCII letters, digits, `_` and `-`.
pub fn validate_database_name(name: &str) -> PersistenceResult<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(PersistenceError::InvalidName(name.to_string()))
    }
}

/// Directory of JSON-persisted databases
#[derive(Debug, Clone)]
pub struct JsonStorage {
    dir: PathBuf,
    pretty: bool,
}

impl JsonStorage {
    /// Open (creating if needed) a storage directory
    pub fn open(dir: impl AsRef<Path>, pretty: bool) -> PersistenceResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        info!("Opened graph storage at: {:?}", dir);
        Ok(Self { dir, pretty })
    }

    pub fn node_file(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}_nodes.json", name))
    }

    pub fn rel_file(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}_rels.json", name))
    }

    /// Load database `name`; a database with no files loads empty
    pub fn load(&self, name: &str) -> PersistenceResult<GraphStore> {
        validate_database_name(name)?;
        let mut store = GraphStore::new();

        let nodes: Collection<StoredNode> = self.read_collection(&self.node_file(name))?;
        for record in nodes.records {
            store.insert_recovered_node(record.into());
        }

        let relationships: Collection<StoredRelationship> =
            self.read_collection(&self.rel_file(name))?;
        let mut dropped = 0usize;
        for record in relationships.records {
            let relationship: Relationship = record.into();
            let rel_id = relationship.id;
            match store.insert_recovered_relationship(relationship) {
                Ok(()) => {}
                Err(e) if e.is_dangling_reference() => {
                    warn!("Database '{}': dropping relationship {}: {}", name, rel_id, e);
                    store.reserve_ids(NodeId::FIRST, rel_id.successor());
                    dropped += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        store.reserve_ids(
            nodes.next_id.map_or(NodeId::FIRST, NodeId::new),
            relationships
                .next_id
                .map_or(RelationshipId::FIRST, RelationshipId::new),
        );
        if dropped > 0 {
            warn!(
                "Database '{}' was saved incompletely; {} relationships dropped",
                name, dropped
            );
        }

        info!(
            "Loaded database '{}': {} nodes, {} relationships",
            name,
            store.node_count(),
            store.relationship_count()
        );
        Ok(store)
    }

    /// Persist `store` as database `name`
    ///
    /// Each file is replaced atomically; a failure leaves the previous file
    /// in place.
    pub fn save(&self, name: &str, store: &GraphStore) -> PersistenceResult<()> {
        validate_database_name(name)?;

        let nodes: Vec<StoredNode> = store.all_nodes().into_iter().map(StoredNode::from).collect();
        self.write_collection(&self.node_file(name), store.next_node_id().as_u64(), &nodes)?;

        let relationships: Vec<StoredRelationship> = store
            .all_relationships()
            .into_iter()
            .map(StoredRelationship::from)
            .collect();
        self.write_collection(
            &self.rel_file(name),
            store.next_relationship_id().as_u64(),
            &relationships,
        )?;

        debug!(
            "Saved database '{}': {} nodes, {} relationships",
            name,
            nodes.len(),
            relationships.len()
        );
        Ok(())
    }

    fn read_collection<T: DeserializeOwned>(
        &self,
        path: &Path,
    ) -> PersistenceResult<Collection<T>> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(Collection {
                    records: Vec::new(),
                    next_id: None,
                })
            }
            Err(e) => return Err(e.into()),
        };

        let envelope: Envelope = serde_json::from_reader(BufReader::new(file))?;
        match envelope {
            Envelope::Versioned { version, .. } if version > FORMAT_VERSION => {
                Err(PersistenceError::UnsupportedVersion {
                    found: version,
                    supported: FORMAT_VERSION,
                })
            }
            Envelope::Versioned {
                records, next_id, ..
            } => Ok(Collection {
                records: serde_json::from_value(records)?,
                next_id,
            }),
            Envelope::Legacy(records) => Ok(Collection {
                records: records
                    .into_iter()
                    .map(serde_json::from_value)
                    .collect::<Result<Vec<T>, _>>()?,
                next_id: None,
            }),
        }
    }

    fn write_collection<T: Serialize>(
        &self,
        path: &Path,
        next_id: u64,
        records: &[T],
    ) -> PersistenceResult<()> {
        let envelope = EnvelopeRef {
            version: FORMAT_VERSION,
            next_id,
            records,
        };
        let tmp_path = path.with_extension("json.tmp");

        let result = self.write_file(&tmp_path, &envelope).and_then(|_| {
            fs::rename(&tmp_path, path)?;
            Ok(())
        });
        if result.is_err() {
            let _ = fs::remove_file(&tmp_path);
        }
        result
    }

    fn write_file<T: Serialize>(&self, path: &Path, value: &T) -> PersistenceResult<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        if self.pretty {
            serde_json::to_writer_pretty(&mut writer, value)?;
        } else {
            serde_json::to_writer(&mut writer, value)?;
        }
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_store() -> GraphStore {
        let mut store = GraphStore::new();
        let mut props = PropertyMap::new();
        props.insert("name".to_string(), "Alice".into());
        props.insert("age".to_string(), 30i64.into());
        let a = store.add_node(vec![Label::new("Person"), Label::new("Admin")], props);
        let b = store.add_node(vec![Label::new("Person")], PropertyMap::new());
        let mut rel_props = PropertyMap::new();
        rel_props.insert("since".to_string(), 2.5.into());
        store.add_relationship("KNOWS", a, b, rel_props).unwrap();
        store
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let storage = JsonStorage::open(temp_dir.path(), true).unwrap();
        storage.save("social", &sample_store()).unwrap();

        let loaded = storage.load("social").unwrap();
        assert_eq!(loaded.node_count(), 2);
        assert_eq!(loaded.relationship_count(), 1);

        let alice = loaded.get_node(NodeId::new(1)).unwrap();
        assert!(alice.has_label(&Label::new("Admin")));
        assert_eq!(alice.get_property("age").unwrap().as_integer(), Some(30));

        let rel = loaded.get_relationship(RelationshipId::new(1)).unwrap();
        assert_eq!(rel.start, NodeId::new(1));
        assert_eq!(rel.end, NodeId::new(2));
        assert_eq!(rel.get_property("since").unwrap().as_float(), Some(2.5));
    }

    #[test]
    fn test_missing_database_loads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let storage = JsonStorage::open(temp_dir.path(), false).unwrap();
        let store = storage.load("nothing_here").unwrap();
        assert!(store.is_empty());
        assert_eq!(store.next_node_id(), NodeId::new(1));
    }

    #[test]
    fn test_file_layout() {
        let temp_dir = TempDir::new().unwrap();
        let storage = JsonStorage::open(temp_dir.path(), false).unwrap();
        storage.save("g", &sample_store()).unwrap();

        let text = fs::read_to_string(temp_dir.path().join("g_nodes.json")).unwrap();
        let value: JsonValue = serde_json::from_str(&text).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["records"][0]["labels"], serde_json::json!(["Admin", "Person"]));

        let text = fs::read_to_string(temp_dir.path().join("g_rels.json")).unwrap();
        let value: JsonValue = serde_json::from_str(&text).unwrap();
        assert_eq!(value["records"][0]["type"], "KNOWS");
        assert!(!temp_dir.path().join("g_rels.json.tmp").exists());
    }

    #[test]
    fn test_load_unversioned_arrays() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("old_nodes.json"),
            r#"[{"id": 3, "labels": ["Person"], "properties": {"name": "Ann"}},
                {"id": 5, "labels": [null], "properties": {}}]"#,
        )
        .unwrap();
        fs::write(
            temp_dir.path().join("old_rels.json"),
            r#"[{"id": 2, "type": "KNOWS", "start": 3, "end": 5, "properties": {}}]"#,
        )
        .unwrap();

        let storage = JsonStorage::open(temp_dir.path(), true).unwrap();
        let store = storage.load("old").unwrap();
        assert_eq!(store.node_count(), 2);
        assert_eq!(store.get_node(NodeId::new(5)).unwrap().label_count(), 0);
        assert_eq!(store.next_node_id(), NodeId::new(6));
        assert_eq!(store.next_relationship_id(), RelationshipId::new(3));
    }

    #[test]
    fn test_newer_version_rejected() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("future_nodes.json"),
            r#"{"version": 7, "records": [{"shape": "unknown"}]}"#,
        )
        .unwrap();

        let storage = JsonStorage::open(temp_dir.path(), true).unwrap();
        let result = storage.load("future");
        assert!(matches!(
            result,
            Err(PersistenceError::UnsupportedVersion { found: 7, supported: 1 })
        ));
    }

    #[test]
    fn test_dangling_relationships_dropped_on_load() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("half_nodes.json"),
            r#"{"version": 1, "next_id": 3, "records": [{"id": 1, "labels": [], "properties": {}}]}"#,
        )
        .unwrap();
        fs::write(
            temp_dir.path().join("half_rels.json"),
            r#"{"version": 1, "next_id": 2, "records": [
                {"id": 1, "type": "X", "start": 1, "end": 1},
                {"id": 4, "type": "X", "start": 1, "end": 2}]}"#,
        )
        .unwrap();

        let storage = JsonStorage::open(temp_dir.path(), true).unwrap();
        let store = storage.load("half").unwrap();
        assert_eq!(store.node_count(), 1);
        assert_eq!(store.relationship_count(), 1);
        assert!(store.has_relationship(RelationshipId::new(1)));
        // The dropped relationship's id stays retired
        assert_eq!(store.next_relationship_id(), RelationshipId::new(5));
        assert_eq!(store.next_node_id(), NodeId::new(3));
    }

    #[test]
    fn test_saved_counters_survive_deleting_highest_ids() {
        let temp_dir = TempDir::new().unwrap();
        let storage = JsonStorage::open(temp_dir.path(), false).unwrap();
        let mut store = sample_store();
        store.delete_node(NodeId::new(2));
        assert_eq!(store.relationship_count(), 0);
        storage.save("g", &store).unwrap();

        let text = fs::read_to_string(temp_dir.path().join("g_nodes.json")).unwrap();
        let value: JsonValue = serde_json::from_str(&text).unwrap();
        assert_eq!(value["next_id"], 3);

        let mut loaded = storage.load("g").unwrap();
        assert_eq!(loaded.next_relationship_id(), RelationshipId::new(2));
        assert_eq!(loaded.add_node(vec![], PropertyMap::new()), NodeId::new(3));
    }

    #[test]
    fn test_malformed_file_is_serialization_error() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("broken_nodes.json"), "{not json").unwrap();

        let storage = JsonStorage::open(temp_dir.path(), true).unwrap();
        assert!(matches!(
            storage.load("broken"),
            Err(PersistenceError::Serialization(_))
        ));
    }

    #[test]
    fn test_database_names() {
        assert!(validate_database_name("default").is_ok());
        assert!(validate_database_name("my-graph_2").is_ok());
        assert!(validate_database_name("").is_err());
        assert!(validate_database_name("../escape").is_err());
        assert!(validate_database_name("a b").is_err());
    }
}
