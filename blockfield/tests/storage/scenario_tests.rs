use super::support::*;

use std::io::Write;

use blockfield::runtime::Scenario;

const LESSON: &str = r#"
title = "Lesson"

[root]
type = "vertical"

[[root.children]]
type = "html"
fields = { content = "<p>Welcome</p>" }

[[root.children]]
type = "view_counter"
slug = "counter"

[[root.children]]
type = "thumbs"
fields = { upvotes = 4 }
"#;

fn runtime_for(store: &Arc<DictKeyValueStore>, config: RuntimeConfig) -> Runtime {
    config
        .runtime_builder(Arc::clone(store) as Arc<dyn KeyValueStore>)
        .unwrap()
        .build()
}

#[test]
fn lesson_renders_for_several_users() {
    let store = Arc::new(DictKeyValueStore::new());
    let runtime = runtime_for(&store, RuntimeConfig::default());
    let root = runtime.load_scenario(&Scenario::from_toml_str(LESSON).unwrap()).unwrap();

    let alice = runtime.for_user(Some("alice".to_string()));
    let mut block = alice.get_block(&root).unwrap();
    let fragment = alice.render(&mut block, "student_view", &Value::Null).unwrap();
    assert!(fragment.content.contains("<p>Welcome</p>"));
    assert!(fragment.content.contains("<span class=\"views\">1</span>"));
    assert!(fragment.content.contains("<span class=\"count\">4</span>"));
    assert!(fragment.resources.contains(&"thumbs.js".to_string()));

    let bob = runtime.for_user(Some("bob".to_string()));
    let mut block = bob.get_block(&root).unwrap();
    let fragment = bob.render(&mut block, "student_view", &Value::Null).unwrap();
    assert!(fragment.content.contains("<span class=\"views\">2</span>"));
}

#[test]
fn children_and_parents_are_linked() {
    let store = Arc::new(DictKeyValueStore::new());
    let runtime = runtime_for(&store, RuntimeConfig::default());
    let root = runtime.load_scenario(&Scenario::from_toml_str(LESSON).unwrap()).unwrap();

    let mut root_block = runtime.get_block(&root).unwrap();
    assert_eq!(root_block.parent().unwrap(), None);
    let children = root_block.children().unwrap();
    assert_eq!(children.len(), 3);

    let types: Vec<String> = children
        .iter()
        .map(|usage| {
            let mut child = runtime.get_block(usage).unwrap();
            assert_eq!(child.parent().unwrap().as_deref(), Some(root.as_str()));
            child.block_type().name().to_string()
        })
        .collect();
    assert_eq!(types, ["html", "view_counter", "thumbs"]);
    assert!(runtime.id_reader().get_definition_id(&children[1]).unwrap().starts_with("d_counter_"));
}

#[test]
fn invalid_trees_are_rejected() {
    let runtime = runtime_for(&Arc::new(DictKeyValueStore::new()), RuntimeConfig::default());

    let leaf_with_children = Scenario::from_toml_str(
        r#"
        [root]
        type = "html"
        [[root.children]]
        type = "html"
        "#,
    )
    .unwrap();
    assert!(matches!(
        runtime.load_scenario(&leaf_with_children),
        Err(BlockError::Config { .. })
    ));

    let unknown_field =
        Scenario::from_toml_str("[root]\ntype = \"html\"\nfields = { colour = \"red\" }").unwrap();
    assert!(matches!(
        runtime.load_scenario(&unknown_field),
        Err(BlockError::FieldData(FieldDataError::UnknownField { .. }))
    ));

    let unknown_type = Scenario::from_toml_str("[root]\ntype = \"mystery\"").unwrap();
    assert!(matches!(
        runtime.load_scenario(&unknown_type),
        Err(BlockError::NoSuchBlockType(_))
    ));
}

#[test]
fn config_file_sets_user_and_default_type() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"user_id = \"dana\"\ndefault_block_type = \"html\"\n").unwrap();
    let config = RuntimeConfig::load(file.path()).unwrap();

    let store = Arc::new(DictKeyValueStore::new());
    let runtime = runtime_for(&store, config);
    assert_eq!(runtime.user_id(), Some("dana"));

    let scenario =
        Scenario::from_toml_str("[root]\ntype = \"mystery\"\nfields = { content = \"odd\" }")
            .unwrap();
    let root = runtime.load_scenario(&scenario).unwrap();
    let mut block = runtime.get_block(&root).unwrap();
    assert_eq!(block.scope_ids().block_type, "mystery");
    assert_eq!(block.block_type().name(), "html");
    let fragment = runtime.render(&mut block, "student_view", &Value::Null).unwrap();
    assert!(fragment.content.contains("odd"));
}

#[test]
fn bundled_demos_load() {
    let demos = concat!(env!("CARGO_MANIFEST_DIR"), "/demos");
    let scenario = Scenario::load(format!("{demos}/lesson.toml")).unwrap();
    assert_eq!(scenario.block_count(), 6);
    let config = RuntimeConfig::load(format!("{demos}/runtime.toml")).unwrap();
    assert_eq!(config.user_id.as_deref(), Some("alice"));

    let store = Arc::new(DictKeyValueStore::new());
    let runtime = runtime_for(&store, config);
    let root = runtime.load_scenario(&scenario).unwrap();
    let mut block = runtime.get_block(&root).unwrap();
    let fragment = runtime.render(&mut block, "student_view", &Value::Null).unwrap();
    assert!(fragment.content.contains("Hello, world!"));
    assert!(fragment.content.contains("<div class=\"sidebar\">"));
}
