use dbal_core::schema::SchemaLoader;

#[tokio::test]
async fn loads_a_directory_of_entity_schemas() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("user.yaml"),
        r#"
name: User
fields:
  id:
    type: uuid
    primary: true
    generated: true
  email:
    type: email
    required: true
    unique: true
  role:
    type: enum
    values: [owner, admin, member, viewer]
"#,
    )
    .unwrap();
    std::fs::write(
        dir.path().join("post.yaml"),
        r#"
name: Post
fields:
  id:
    type: uuid
    primary: true
    generated: true
  authorId:
    type: uuid
    required: true
  title:
    type: string
    minLength: 1
    maxLength: 200
relations:
  author:
    type: belongs-to
    target: User
indexes:
  - fields: [authorId]
"#,
    )
    .unwrap();

    let loader = SchemaLoader::new(dir.path());
    let loaded = loader.load_all().await.unwrap();

    assert_eq!(loaded.len(), 2);
    assert!(loader.contains("User"));
    assert!(loader.contains("Post"));

    let post = loader.get("Post").unwrap();
    assert_eq!(post.relations.len(), 1);
    assert_eq!(post.indexes[0].fields, vec!["authorId".to_string()]);
}

#[tokio::test]
async fn invalid_schema_file_does_not_abort_sibling_loads() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("good.yaml"), "name: Good\nfields:\n  id:\n    type: uuid\n    primary: true\n").unwrap();
    std::fs::write(dir.path().join("bad.yaml"), "name: Bad\nfields: {}\n").unwrap();

    let loader = SchemaLoader::new(dir.path());
    let loaded = loader.load_all().await.unwrap();

    assert_eq!(loaded, vec!["Good".to_string()]);
    assert!(!loader.contains("Bad"));
}
