//! Schema discovery and loading from a directory of YAML files
//!
//! Files named `entities.yaml`/`entities.yml` are treated as manifests, not
//! entity definitions, and are skipped during directory discovery. A file
//! that fails to parse or validate is logged and skipped; it never aborts
//! its siblings.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_yaml::Value;

use super::cache::SchemaCache;
use super::field_parser::parse_fields;
use super::relation_parser::{parse_acl, parse_indexes, parse_relations};
use super::types::EntitySchema;
use super::validator::validate;
use crate::error::{DbalError, Result};

const MANIFEST_NAMES: &[&str] = &["entities.yaml", "entities.yml"];

fn get<'a>(map: &'a serde_yaml::Mapping, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|k| map.get(Value::String((*k).to_string())))
}

fn as_str(map: &serde_yaml::Mapping, keys: &[&str]) -> Option<String> {
    get(map, keys).and_then(Value::as_str).map(str::to_string)
}

/// Parse one entity schema document.
pub fn parse_schema(doc: &str) -> Result<EntitySchema> {
    let value: Value = serde_yaml::from_str(doc)
        .map_err(|e| DbalError::validation(format!("invalid YAML: {e}")))?;
    let map = value
        .as_mapping()
        .ok_or_else(|| DbalError::validation("schema document must be a mapping".to_string()))?;

    let name = as_str(map, &["entity", "name"])
        .ok_or_else(|| DbalError::validation("schema document is missing 'entity'".to_string()))?;

    let fields = match get(map, &["fields"]) {
        Some(f) => parse_fields(f)?,
        None => Vec::new(),
    };
    let indexes = match get(map, &["indexes"]) {
        Some(i) => parse_indexes(i)?,
        None => Vec::new(),
    };
    let relations = match get(map, &["relations"]) {
        Some(r) => parse_relations(r)?,
        None => Vec::new(),
    };
    let acl = match get(map, &["acl"]) {
        Some(a) => Some(parse_acl(a)?),
        None => None,
    };

    let mut metadata = HashMap::new();
    if let Some(m) = get(map, &["metadata"]).and_then(Value::as_mapping) {
        for (k, v) in m.iter() {
            if let (Some(k), Some(v)) = (k.as_str(), v.as_str()) {
                metadata.insert(k.to_string(), v.to_string());
            }
        }
    }

    let schema = EntitySchema {
        name,
        display_name: as_str(map, &["displayName", "display_name"]),
        description: as_str(map, &["description"]),
        version: as_str(map, &["version"]).unwrap_or_else(|| "1".to_string()),
        fields,
        indexes,
        relations,
        metadata,
        acl,
    };

    validate(&schema)?;
    Ok(schema)
}

/// Relative locations tried, in order, when no explicit search path is
/// configured — a deployment's working directory varies with how it was
/// launched, so several nesting depths are tried before giving up.
const DEFAULT_SEARCH_CANDIDATES: &[&str] =
    &["schemas", "../schemas", "../../schemas", "../../../schemas"];

/// The on-disk directory a deployment falls back to when no explicit search
/// path is configured: `DBAL_SCHEMA_DIR` if set, otherwise the first of
/// [`DEFAULT_SEARCH_CANDIDATES`] that exists and is a directory. Errors if
/// `DBAL_SCHEMA_DIR` is unset and none of the candidates exist.
pub fn default_search_path() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("DBAL_SCHEMA_DIR") {
        return Ok(PathBuf::from(dir));
    }

    for candidate in DEFAULT_SEARCH_CANDIDATES {
        let path = PathBuf::from(candidate);
        if path.is_dir() {
            return Ok(path);
        }
    }

    Err(DbalError::not_found(format!(
        "could not find a schema directory; tried {}",
        DEFAULT_SEARCH_CANDIDATES.join(", ")
    )))
}

fn is_manifest(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| MANIFEST_NAMES.contains(&n))
        .unwrap_or(false)
}

fn is_schema_file(path: &Path) -> bool {
    let ext_ok = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    ext_ok && !is_manifest(path)
}

fn discover(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            files.extend(discover(&path)?);
        } else if is_schema_file(&path) {
            files.push(path);
        }
    }
    Ok(files)
}

/// Parses and loads a single schema file into `cache`.
pub async fn load_one(cache: &SchemaCache, path: &Path) -> Result<EntitySchema> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| DbalError::not_found(format!("{}: {e}", path.display())))?;
    let schema = parse_schema(&contents)?;
    cache.put(schema.clone());
    Ok(schema)
}

/// Discover and load every schema file under `dir`, skipping files that fail
/// to parse or validate (each failure is logged, not propagated). A missing
/// or non-directory `dir` is logged and treated as an empty schema set
/// rather than an error.
pub async fn load_all(cache: &SchemaCache, dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        tracing::warn!(dir = %dir.display(), "schema directory does not exist or is not a directory");
        return Ok(Vec::new());
    }

    let paths = discover(dir)
        .map_err(|e| DbalError::not_found(format!("{}: {e}", dir.display())))?;

    let mut loaded = Vec::new();
    for path in paths {
        match load_one(cache, &path).await {
            Ok(schema) => loaded.push(schema.name),
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "skipping invalid schema file");
            }
        }
    }
    Ok(loaded)
}

/// Look up a schema the cache already holds without touching disk.
pub fn get_cached(cache: &SchemaCache, name: &str) -> Option<EntitySchema> {
    cache.get(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn load_all_skips_manifest_and_invalid_files() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("post.yaml"),
            "name: Post\nfields:\n  id:\n    type: uuid\n    primary: true\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("entities.yaml"), "not an entity, a manifest").unwrap();
        std::fs::write(dir.path().join("broken.yaml"), "name: \nfields: {}\n").unwrap();

        let cache = SchemaCache::new();
        let loaded = load_all(&cache, dir.path()).await.unwrap();

        assert_eq!(loaded, vec!["Post".to_string()]);
        assert!(cache.contains("Post"));
        assert!(!cache.contains("entities"));
    }

    #[test]
    fn parse_schema_rejects_missing_name() {
        let err = parse_schema("fields:\n  id:\n    type: uuid\n").unwrap_err();
        assert_eq!(err.status_code(), 422);
    }

    #[test]
    fn parse_schema_prefers_entity_key_over_name() {
        let schema = parse_schema(
            "entity: user\nname: ignored\nfields:\n  id:\n    type: uuid\n    primary: true\n",
        )
        .unwrap();
        assert_eq!(schema.name, "user");
    }

    #[test]
    fn parse_schema_falls_back_to_name_when_entity_absent() {
        let schema = parse_schema("name: user\nfields:\n  id:\n    type: uuid\n    primary: true\n").unwrap();
        assert_eq!(schema.name, "user");
    }

    #[tokio::test]
    async fn load_all_missing_directory_returns_empty() {
        let cache = SchemaCache::new();
        let loaded = load_all(&cache, Path::new("/no/such/schema/dir")).await.unwrap();
        assert!(loaded.is_empty());
    }
}
