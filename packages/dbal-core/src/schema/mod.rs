//! Entity schema loading, validation, and caching
//!
//! A `SchemaLoader` owns a [`cache::SchemaCache`] and exposes the directory
//! load + single-file load + cache lookup operations the rest of the crate
//! builds on: the SQL query builder resolves column lists and default sort
//! order from a schema, and the Prisma generator renders a schema straight
//! into a model block.

pub mod cache;
pub mod field_parser;
pub mod loader;
pub mod relation_parser;
pub mod types;
pub mod validator;

use std::path::{Path, PathBuf};

pub use cache::SchemaCache;
pub use types::{Acl, AclRule, EntitySchema, Field, FieldType, Index, Relation, RelationKind, ReferentialAction};

use crate::error::Result;

/// The entry point the rest of the crate depends on.
pub struct SchemaLoader {
    cache: SchemaCache,
    search_path: PathBuf,
}

impl SchemaLoader {
    pub fn new(search_path: impl Into<PathBuf>) -> Self {
        Self {
            cache: SchemaCache::new(),
            search_path: search_path.into(),
        }
    }

    /// A loader rooted at `DBAL_SCHEMA_DIR`, or the first well-known
    /// `./schemas`-relative directory that exists. Fails if neither is
    /// found.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(loader::default_search_path()?))
    }

    pub async fn load_all(&self) -> Result<Vec<String>> {
        loader::load_all(&self.cache, &self.search_path).await
    }

    pub async fn load_one(&self, path: &Path) -> Result<EntitySchema> {
        loader::load_one(&self.cache, path).await
    }

    pub fn get(&self, name: &str) -> Option<EntitySchema> {
        self.cache.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.cache.contains(name)
    }

    pub fn all(&self) -> Vec<EntitySchema> {
        self.cache.all()
    }

    pub fn entity_names(&self) -> Vec<String> {
        self.cache.entity_names()
    }

    pub fn remove(&self, name: &str) -> Option<EntitySchema> {
        self.cache.remove(name)
    }

    pub fn clear(&self) {
        self.cache.clear()
    }

    pub fn size(&self) -> usize {
        self.cache.size()
    }
}
