//! YAML relation, index, and ACL parsing

use serde_yaml::Value;

use super::types::{Acl, AclRule, Index, Relation, RelationKind, ReferentialAction};
use crate::error::{DbalError, Result};

fn get<'a>(map: &'a serde_yaml::Mapping, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|k| map.get(Value::String((*k).to_string())))
}

fn as_str(map: &serde_yaml::Mapping, keys: &[&str]) -> Option<String> {
    get(map, keys).and_then(Value::as_str).map(str::to_string)
}

fn as_bool(map: &serde_yaml::Mapping, keys: &[&str], default: bool) -> bool {
    get(map, keys).and_then(Value::as_bool).unwrap_or(default)
}

pub fn parse_relation(name: &str, value: &Value) -> Result<Relation> {
    let map = value
        .as_mapping()
        .ok_or_else(|| DbalError::validation(format!("relation '{name}' must be a mapping")))?;

    let kind_name = as_str(map, &["type"]).ok_or_else(|| {
        DbalError::validation(format!("relation '{name}' is missing a 'type'"))
    })?;
    let kind = RelationKind::parse(&kind_name).ok_or_else(|| {
        DbalError::validation(format!(
            "relation '{name}' has unknown type '{kind_name}'"
        ))
    })?;

    let target = as_str(map, &["target", "model"]).ok_or_else(|| {
        DbalError::validation(format!("relation '{name}' is missing a 'target'"))
    })?;
    let foreign_key = as_str(map, &["foreignKey", "foreign_key"])
        .unwrap_or_else(|| format!("{name}Id"));

    let on_delete = as_str(map, &["onDelete", "on_delete"])
        .map(|s| {
            ReferentialAction::parse(&s).ok_or_else(|| {
                DbalError::validation(format!(
                    "relation '{name}' has unknown onDelete action '{s}'"
                ))
            })
        })
        .transpose()?;
    let on_update = as_str(map, &["onUpdate", "on_update"])
        .map(|s| {
            ReferentialAction::parse(&s).ok_or_else(|| {
                DbalError::validation(format!(
                    "relation '{name}' has unknown onUpdate action '{s}'"
                ))
            })
        })
        .transpose()?;

    Ok(Relation {
        name: name.to_string(),
        kind,
        target,
        foreign_key,
        nullable: as_bool(map, &["nullable"], false),
        on_delete,
        on_update,
    })
}

pub fn parse_relations(value: &Value) -> Result<Vec<Relation>> {
    let map = match value.as_mapping() {
        Some(m) => m,
        None => return Ok(Vec::new()),
    };
    map.iter()
        .map(|(key, value)| {
            let name = key
                .as_str()
                .ok_or_else(|| DbalError::validation("relation names must be strings".to_string()))?;
            parse_relation(name, value)
        })
        .collect()
}

pub fn parse_index(value: &Value) -> Result<Index> {
    let map = value
        .as_mapping()
        .ok_or_else(|| DbalError::validation("index entry must be a mapping".to_string()))?;

    let fields = get(map, &["fields"])
        .and_then(Value::as_sequence)
        .ok_or_else(|| DbalError::validation("index entry is missing 'fields'".to_string()))?
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect::<Vec<_>>();
    if fields.is_empty() {
        return Err(DbalError::validation(
            "index entry declares an empty 'fields' list".to_string(),
        ));
    }

    Ok(Index {
        fields,
        unique: as_bool(map, &["unique"], false),
        name: as_str(map, &["name"]),
    })
}

pub fn parse_indexes(value: &Value) -> Result<Vec<Index>> {
    let seq = match value.as_sequence() {
        Some(s) => s,
        None => return Ok(Vec::new()),
    };
    seq.iter().map(parse_index).collect()
}

/// ACL rules are a mapping of role name to allowed/denied (`create: {owner:
/// true, admin: false}`), matching the `std::map<std::string, bool>` shape
/// of the original. A bare sequence of role names (`create: [owner, admin]`)
/// is also accepted as shorthand for granting all of them.
fn parse_acl_rule(value: Option<&Value>) -> AclRule {
    let mut rule = AclRule::default();
    match value {
        Some(Value::Mapping(map)) => {
            for (role, allowed) in map.iter() {
                if let (Some(role), Some(allowed)) = (role.as_str(), allowed.as_bool()) {
                    rule.roles.insert(role.to_string(), allowed);
                }
            }
        }
        Some(Value::Sequence(seq)) => {
            for role in seq.iter().filter_map(|v| v.as_str()) {
                rule.roles.insert(role.to_string(), true);
            }
        }
        _ => {}
    }
    rule
}

pub fn parse_acl(value: &Value) -> Result<Acl> {
    let map = value
        .as_mapping()
        .ok_or_else(|| DbalError::validation("'acl' must be a mapping".to_string()))?;

    Ok(Acl {
        create: parse_acl_rule(get(map, &["create"])),
        read: parse_acl_rule(get(map, &["read"])),
        update: parse_acl_rule(get(map, &["update"])),
        delete: parse_acl_rule(get(map, &["delete"])),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(src: &str) -> Value {
        serde_yaml::from_str(src).unwrap()
    }

    #[test]
    fn relation_defaults_foreign_key_from_name() {
        let v = yaml("type: belongs-to\ntarget: User\n");
        let r = parse_relation("author", &v).unwrap();
        assert_eq!(r.foreign_key, "authorId");
    }

    #[test]
    fn index_without_fields_is_rejected() {
        let v = yaml("unique: true\n");
        assert!(parse_index(&v).is_err());
    }

    #[test]
    fn acl_grants_named_roles_only() {
        let v = yaml("create:\n  - owner\n  - admin\nread:\n  - owner\n  - admin\n  - viewer\nupdate:\n  - owner\ndelete:\n  - owner\n");
        let acl = parse_acl(&v).unwrap();
        assert!(acl.read.is_allowed("viewer"));
        assert!(!acl.delete.is_allowed("viewer"));
    }

    #[test]
    fn acl_mapping_form_honors_explicit_denials() {
        let v = yaml(
            "create:\n  owner: true\n  admin: false\nread:\n  owner: true\n  viewer: true\nupdate:\n  owner: true\ndelete:\n  owner: true\n",
        );
        let acl = parse_acl(&v).unwrap();
        assert!(acl.create.is_allowed("owner"));
        assert!(!acl.create.is_allowed("admin"));
        assert!(acl.read.is_allowed("viewer"));
        assert!(!acl.delete.is_allowed("viewer"));
    }
}
