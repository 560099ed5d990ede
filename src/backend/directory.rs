//! Local directory backend
//!
//! Each object type gets its own directory. Remote objects are stored as
//! `<root>/<type>/<remote_id>.json`:
//!
//! ```json
//! {
//!   "local_id": "Alert.cpu",
//!   "updated_at": "2026-01-01T00:00:00Z",
//!   "object": { "type": "Alert", "key": "cpu", "spec": { "uid": "3f2a…" } }
//! }
//! ```
//!
//! Remote ids are assigned on creation and stamped into the object's spec as
//! `uid`, the way alerting backends hand out rule uids.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use reconcile::{
    Exclusions, Identified, LocalId, LocalResource, MappedResource, ObsoleteResource, RemoteId,
    ResourceHandler, SyncResult, SyncedResource,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::document::Document;

/// Spec field carrying the backend-assigned id
pub const UID_FIELD: &str = "uid";

/// Length of generated remote ids, in hex characters
const REMOTE_ID_LEN: usize = 16;

/// On-disk record of a remote object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredObject {
    pub local_id: String,
    pub updated_at: DateTime<Utc>,
    pub object: Document,
}

/// Handler for one object type, backed by a directory
pub struct DirectoryHandler {
    dir: PathBuf,
}

impl DirectoryHandler {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn object_path(&self, remote_id: &str) -> Result<PathBuf> {
        if remote_id.is_empty() || !remote_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            bail!("Invalid remote id '{remote_id}'");
        }
        Ok(self.dir.join(format!("{remote_id}.json")))
    }

    fn write(&self, local_id: &LocalId, remote_id: &str, object: &Document) -> Result<()> {
        let path = self.object_path(remote_id)?;
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let record = StoredObject {
            local_id: local_id.to_string(),
            updated_at: Utc::now(),
            object: object.clone(),
        };
        let mut content = serde_json::to_string_pretty(&record)?;
        content.push('\n');

        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))
    }
}

/// Derive a fresh remote id from the identifier and the creation time
pub fn new_remote_id(local_id: &LocalId, at: DateTime<Utc>) -> RemoteId {
    let seed = format!(
        "{local_id}\n{}",
        at.timestamp_nanos_opt().unwrap_or_else(|| at.timestamp())
    );
    let hash = blake3::hash(seed.as_bytes());
    hash.to_hex().as_str()[..REMOTE_ID_LEN].to_string()
}

/// Copy of `document` with the remote id stamped into its spec
pub fn stamp(document: &Document, remote_id: &str) -> Document {
    let mut stamped = document.clone();
    if stamped.spec.is_null() {
        stamped.spec = Value::Object(serde_json::Map::new());
    }
    if let Value::Object(map) = &mut stamped.spec {
        map.insert(UID_FIELD.to_string(), Value::String(remote_id.to_string()));
    }
    stamped
}

impl ResourceHandler<Document> for DirectoryHandler {
    fn read(&mut self, resource: MappedResource<Document>) -> Result<SyncResult<Document>> {
        let path = self.object_path(resource.remote_id())?;
        if !path.exists() {
            log::debug!("{} not found at {}", resource.local_id(), path.display());
            return Ok(SyncResult::Obsolete(resource.into_obsolete()));
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let record: StoredObject = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        Ok(SyncResult::Synced(resource.into_synced(record.object)))
    }

    fn create(&mut self, resource: LocalResource<Document>) -> Result<SyncedResource<Document>> {
        let remote_id = new_remote_id(resource.local_id(), Utc::now());
        let remote = stamp(resource.object(), &remote_id);
        self.write(resource.local_id(), &remote_id, &remote)?;
        log::debug!("Created {} as {remote_id}", resource.local_id());
        Ok(resource.into_synced(remote_id, remote))
    }

    fn update(&mut self, resource: SyncedResource<Document>) -> Result<SyncedResource<Document>> {
        let remote_id = resource.remote_id().to_string();
        let remote = stamp(resource.object(), &remote_id);
        self.write(resource.local_id(), &remote_id, &remote)?;
        log::debug!("Updated {} ({remote_id})", resource.local_id());
        Ok(resource.into_applied(remote_id, remote))
    }

    fn delete(&mut self, resource: ObsoleteResource) -> Result<()> {
        let path = self.object_path(resource.remote_id())?;
        match fs::remove_file(&path) {
            Ok(()) => {
                log::debug!("Deleted {} ({})", resource.local_id(), resource.remote_id());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to delete {}", path.display())),
        }
    }

    fn exclusions(&self) -> Exclusions {
        Exclusions::new([format!("spec.{UID_FIELD}")])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile::Provider;
    use serde_json::json;
    use tempfile::TempDir;

    fn folder(key: &str, title: &str) -> Document {
        Document::new("Folder", key, json!({ "title": title }))
    }

    fn local(doc: Document) -> LocalResource<Document> {
        LocalResource::new(doc).unwrap()
    }

    #[test]
    fn test_remote_id_shape() {
        let id = LocalId::new("Folder", "ops").unwrap();
        let at = Utc::now();
        let remote_id = new_remote_id(&id, at);
        assert_eq!(remote_id.len(), REMOTE_ID_LEN);
        assert!(remote_id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(remote_id, new_remote_id(&id, at));
    }

    #[test]
    fn test_stamp() {
        let stamped = stamp(&folder("ops", "Ops"), "abc");
        assert_eq!(stamped.spec, json!({"title": "Ops", "uid": "abc"}));

        let bare = Document::new("Folder", "bare", Value::Null);
        assert_eq!(stamp(&bare, "abc").spec, json!({"uid": "abc"}));
    }

    #[test]
    fn test_create_read_update_delete() {
        let dir = TempDir::new().unwrap();
        let mut handler = DirectoryHandler::new(dir.path().join("Folder"));

        let created = handler.create(local(folder("ops", "Ops"))).unwrap();
        let remote_id = created.remote_id().to_string();
        assert!(dir.path().join("Folder").join(format!("{remote_id}.json")).exists());
        assert_eq!(created.remote().spec["uid"], json!(remote_id));

        let mapped = local(folder("ops", "Operations")).into_mapped(remote_id.clone());
        let SyncResult::Synced(synced) = handler.read(mapped).unwrap() else {
            panic!("expected synced");
        };
        assert_eq!(synced.remote().spec["title"], json!("Ops"));

        let updated = handler.update(synced).unwrap();
        assert_eq!(updated.remote_id(), remote_id);
        assert_eq!(updated.remote().spec["title"], json!("Operations"));

        let obsolete = ObsoleteResource::new(LocalId::new("Folder", "ops").unwrap(), &remote_id);
        handler.delete(obsolete.clone()).unwrap();
        handler.delete(obsolete).unwrap();
        assert!(!dir.path().join("Folder").join(format!("{remote_id}.json")).exists());
    }

    #[test]
    fn test_read_missing_is_obsolete() {
        let dir = TempDir::new().unwrap();
        let mut handler = DirectoryHandler::new(dir.path().join("Folder"));
        let mapped = local(folder("ops", "Ops")).into_mapped("0123456789abcdef");
        assert!(matches!(
            handler.read(mapped).unwrap(),
            SyncResult::Obsolete(_)
        ));
    }

    #[test]
    fn test_path_like_remote_id_rejected() {
        let dir = TempDir::new().unwrap();
        let mut handler = DirectoryHandler::new(dir.path().join("Folder"));
        let mapped = local(folder("ops", "Ops")).into_mapped("../escape");
        assert!(handler.read(mapped).is_err());
    }

    #[test]
    fn test_uid_is_not_a_difference() {
        let dir = TempDir::new().unwrap();
        let provider = reconcile::HandlerProvider::new("local")
            .with_handler("Folder", Box::new(DirectoryHandler::new(dir.path())))
            .unwrap();

        let desired = folder("ops", "Ops");
        let synced = local(desired.clone())
            .into_mapped("abc")
            .into_synced(stamp(&desired, "abc"));
        assert!(provider.diff(&synced).unwrap().is_empty());
    }
}
