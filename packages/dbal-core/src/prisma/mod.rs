//! Prisma schema fragment generation
//!
//! Renders the `datasource`/`generator`/`model`/`enum` blocks a deployment
//! would splice into a `schema.prisma` file. Writing that file is out of
//! scope here; this module only ever returns strings.

use std::fmt::Write as _;

use crate::schema::types::{EntitySchema, Field, FieldType, RelationKind};

fn prisma_scalar(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::String | FieldType::Email | FieldType::Cuid => "String",
        FieldType::Text => "String",
        FieldType::Uuid => "String",
        FieldType::Number | FieldType::Integer => "Int",
        FieldType::Bigint => "BigInt",
        FieldType::Float | FieldType::Double => "Float",
        FieldType::Boolean => "Boolean",
        FieldType::Timestamp | FieldType::Date | FieldType::Datetime => "DateTime",
        FieldType::Json => "Json",
        FieldType::Enum => "String",
    }
}

/// `@map("snake_case")` is emitted for any field whose camelCase name
/// contains an embedded `Id` other than the bare primary key `id`.
fn needs_map_annotation(name: &str) -> bool {
    name != "id" && name.contains("Id")
}

fn to_snake_case(name: &str) -> String {
    let mut out = String::new();
    for (i, ch) in name.char_indices() {
        if ch.is_uppercase() && i > 0 {
            out.push('_');
        }
        out.extend(ch.to_lowercase());
    }
    out
}

fn render_field(out: &mut String, field: &Field) {
    let mut scalar = prisma_scalar(field.field_type).to_string();
    if !field.required && !field.primary {
        scalar.push('?');
    }

    write!(out, "  {} {}", field.name, scalar).unwrap();

    if field.primary {
        out.push_str(" @id");
        if field.generated {
            match field.field_type {
                FieldType::Uuid => out.push_str(" @default(uuid())"),
                FieldType::Cuid => out.push_str(" @default(cuid())"),
                _ => out.push_str(" @default(autoincrement())"),
            }
        }
    }
    if field.unique && !field.primary {
        out.push_str(" @unique");
    }
    if let Some(default) = &field.default {
        if !field.primary {
            write!(out, " @default(\"{default}\")").unwrap();
        }
    }
    if needs_map_annotation(&field.name) {
        write!(out, " @map(\"{}\")", to_snake_case(&field.name)).unwrap();
    }
    out.push('\n');
}

/// Render one entity schema as a `model` block, plus any trailing `enum`
/// blocks its enum-typed fields require.
pub fn render_model(schema: &EntitySchema) -> String {
    let mut out = String::new();
    writeln!(out, "model {} {{", schema.name).unwrap();
    for field in &schema.fields {
        render_field(&mut out, field);
    }
    for relation in &schema.relations {
        let scalar = match relation.kind {
            RelationKind::HasMany => format!("{}[]", relation.target),
            _ if relation.nullable => format!("{}?", relation.target),
            _ => relation.target.clone(),
        };
        writeln!(out, "  {} {}", relation.name, scalar).unwrap();
    }
    out.push_str("}\n");

    for field in &schema.fields {
        if field.field_type == FieldType::Enum {
            if let Some(values) = &field.enum_values {
                let enum_name = format!(
                    "{}{}",
                    schema.name,
                    field.name[..1].to_uppercase() + &field.name[1..]
                );
                out.push('\n');
                writeln!(out, "enum {enum_name} {{").unwrap();
                for value in values {
                    writeln!(out, "  {value}").unwrap();
                }
                out.push_str("}\n");
            }
        }
    }

    out
}

/// Render the fixed `datasource`/`generator` preamble for a given provider.
pub fn render_preamble(provider: &str, url_env: &str) -> String {
    format!(
        "datasource db {{\n  provider = \"{provider}\"\n  url      = env(\"{url_env}\")\n}}\n\ngenerator client {{\n  provider = \"prisma-client-js\"\n}}\n"
    )
}

/// Render a complete fragment: preamble followed by one model block per
/// schema, in the order given.
pub fn render_fragment(schemas: &[EntitySchema], provider: &str, url_env: &str) -> String {
    let mut out = render_preamble(provider, url_env);
    for schema in schemas {
        out.push('\n');
        out.push_str(&render_model(schema));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::Field;

    fn post_schema() -> EntitySchema {
        let mut id = Field::new("id", FieldType::Uuid);
        id.primary = true;
        id.generated = true;
        let mut author_id = Field::new("authorId", FieldType::Uuid);
        author_id.required = true;
        let mut status = Field::new("status", FieldType::Enum);
        status.required = true;
        status.enum_values = Some(vec!["draft".to_string(), "published".to_string()]);

        EntitySchema {
            name: "Post".to_string(),
            display_name: None,
            description: None,
            version: "1".to_string(),
            fields: vec![id, author_id, status],
            indexes: Vec::new(),
            relations: Vec::new(),
            metadata: Default::default(),
            acl: None,
        }
    }

    #[test]
    fn model_block_includes_id_and_map_annotation() {
        let rendered = render_model(&post_schema());
        assert!(rendered.contains("model Post {"));
        assert!(rendered.contains("@id"));
        assert!(rendered.contains("@map(\"author_id\")"));
    }

    #[test]
    fn enum_field_emits_trailing_enum_block() {
        let rendered = render_model(&post_schema());
        assert!(rendered.contains("enum PostStatus {"));
        assert!(rendered.contains("draft"));
        assert!(rendered.contains("published"));
    }

    #[test]
    fn bare_id_field_never_gets_map_annotation() {
        assert!(!needs_map_annotation("id"));
        assert!(needs_map_annotation("authorId"));
    }
}
