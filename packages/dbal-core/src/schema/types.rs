//! Entity schema types
//!
//! These are the canonical, validated shapes produced by [`super::loader`]
//! and consumed by every downstream component: the query builder, the type
//! converter, the result parser, and the Prisma fragment generator.

use std::collections::HashMap;

/// The closed set of field types a YAML schema may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    String,
    Text,
    Email,
    Uuid,
    Cuid,
    Number,
    Bigint,
    Boolean,
    Timestamp,
    Date,
    Datetime,
    Json,
    Enum,
    Integer,
    Float,
    Double,
}

impl FieldType {
    /// Parse a schema field type name, case-sensitive per the YAML contract.
    pub fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "string" => Self::String,
            "text" => Self::Text,
            "email" => Self::Email,
            "uuid" => Self::Uuid,
            "cuid" => Self::Cuid,
            "number" => Self::Number,
            "bigint" => Self::Bigint,
            "boolean" => Self::Boolean,
            "timestamp" => Self::Timestamp,
            "date" => Self::Date,
            "datetime" => Self::Datetime,
            "json" => Self::Json,
            "enum" => Self::Enum,
            "integer" => Self::Integer,
            "float" => Self::Float,
            "double" => Self::Double,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Text => "text",
            Self::Email => "email",
            Self::Uuid => "uuid",
            Self::Cuid => "cuid",
            Self::Number => "number",
            Self::Bigint => "bigint",
            Self::Boolean => "boolean",
            Self::Timestamp => "timestamp",
            Self::Date => "date",
            Self::Datetime => "datetime",
            Self::Json => "json",
            Self::Enum => "enum",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Double => "double",
        }
    }

    /// Row materialization groups columns by numeric-ness.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Number | Self::Bigint)
    }
}

/// A single field in an entity schema.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
    pub required: bool,
    pub unique: bool,
    pub primary: bool,
    pub generated: bool,
    pub nullable: bool,
    pub index: bool,
    pub default: Option<String>,
    pub references: Option<String>,
    pub min_length: Option<u32>,
    pub max_length: Option<u32>,
    pub pattern: Option<String>,
    pub description: Option<String>,
    /// Required and non-empty iff `field_type == FieldType::Enum`.
    pub enum_values: Option<Vec<String>>,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            unique: false,
            primary: false,
            generated: false,
            nullable: false,
            index: false,
            default: None,
            references: None,
            min_length: None,
            max_length: None,
            pattern: None,
            description: None,
            enum_values: None,
        }
    }
}

/// A database index on one or more fields.
#[derive(Debug, Clone)]
pub struct Index {
    pub fields: Vec<String>,
    pub unique: bool,
    pub name: Option<String>,
}

/// The kind of relationship a [`Relation`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    BelongsTo,
    HasOne,
    HasMany,
    ManyToMany,
    Polymorphic,
}

impl RelationKind {
    pub fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "belongs-to" => Self::BelongsTo,
            "has-one" => Self::HasOne,
            "has-many" => Self::HasMany,
            "many-to-many" => Self::ManyToMany,
            "polymorphic" => Self::Polymorphic,
            _ => return None,
        })
    }
}

/// `ON DELETE`/`ON UPDATE` referential action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferentialAction {
    Cascade,
    SetNull,
    Restrict,
    NoAction,
}

impl ReferentialAction {
    pub fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "cascade" => Self::Cascade,
            "set_null" => Self::SetNull,
            "restrict" => Self::Restrict,
            "no_action" => Self::NoAction,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Relation {
    pub name: String,
    pub kind: RelationKind,
    pub target: String,
    pub foreign_key: String,
    pub nullable: bool,
    pub on_delete: Option<ReferentialAction>,
    pub on_update: Option<ReferentialAction>,
}

/// Per-operation role → allowed mapping. Absence of a role means denied.
#[derive(Debug, Clone, Default)]
pub struct AclRule {
    pub roles: HashMap<String, bool>,
}

impl AclRule {
    pub fn is_allowed(&self, role: &str) -> bool {
        self.roles.get(role).copied().unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Acl {
    pub create: AclRule,
    pub read: AclRule,
    pub update: AclRule,
    pub delete: AclRule,
}

/// A complete, validated entity schema.
#[derive(Debug, Clone)]
pub struct EntitySchema {
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub version: String,
    pub fields: Vec<Field>,
    pub indexes: Vec<Index>,
    pub relations: Vec<Relation>,
    pub metadata: HashMap<String, String>,
    pub acl: Option<Acl>,
}

impl EntitySchema {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn primary_field(&self) -> Option<&Field> {
        self.fields.iter().find(|f| f.primary)
    }

    /// The field the query builder/list default order falls back on: the
    /// first field in schema order, or `"id"` for an (invalid) empty schema.
    pub fn first_field_name(&self) -> &str {
        self.fields.first().map(|f| f.name.as_str()).unwrap_or("id")
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }
}
