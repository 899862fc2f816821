use super::support::*;

use blockfield::blocks::{html, thumbs, vertical, view_counter};

fn standard_runtime(store: &Arc<DictKeyValueStore>, user: &str) -> Runtime {
    RuntimeConfig {
        user_id: Some(user.to_string()),
        ..RuntimeConfig::default()
    }
    .runtime_builder(Arc::clone(store) as Arc<dyn KeyValueStore>)
    .unwrap()
    .build()
}

#[test]
fn view_counter_counts_across_users() {
    let store = Arc::new(DictKeyValueStore::new());
    let alice = standard_runtime(&store, "alice");
    let mut counter = alice.create_block(view_counter::NAME, Some("counter")).unwrap();
    let usage = counter.usage_id().to_string();

    for expected in 1..=2 {
        let fragment = alice.render(&mut counter, "student_view", &Value::Null).unwrap();
        assert!(fragment.content.contains(&format!("<span class=\"views\">{expected}</span>")));
    }

    let bob = alice.for_user(Some("bob".to_string()));
    let mut seen_by_bob = bob.get_block(&usage).unwrap();
    let fragment = bob.render(&mut seen_by_bob, "student_view", &Value::Null).unwrap();
    assert!(fragment.content.contains("<span class=\"views\">3</span>"));
    assert_eq!(store.len(), 1);
}

#[test]
fn thumbs_totals_are_shared_and_votes_are_per_user() {
    let store = Arc::new(DictKeyValueStore::new());
    let alice = standard_runtime(&store, "alice");
    let usage = alice.create_block(thumbs::NAME, None).unwrap().usage_id().to_string();

    let vote = |user: &str, vote_type: &str| -> Value {
        let runtime = alice.for_user(Some(user.to_string()));
        let mut block = runtime.get_block(&usage).unwrap();
        runtime
            .handle(&mut block, "vote", &Request::json(json!({ "vote_type": vote_type })))
            .unwrap()
    };

    vote("alice", "up");
    vote("bob", "down");
    assert_eq!(vote("bob", "up"), json!({ "up": 2, "down": 1 }));
    assert_eq!(vote("carol", "sideways"), Value::Null);

    let voted = |user: &str| -> bool {
        let runtime = alice.for_user(Some(user.to_string()));
        let mut block = runtime.get_block(&usage).unwrap();
        *block.get(&thumbs::voted()).unwrap()
    };
    assert!(voted("alice"));
    assert!(voted("bob"));
    assert!(!voted("carol"));
}

#[test]
fn thumbs_views_link_to_the_vote_handler() {
    let store = Arc::new(DictKeyValueStore::new());
    let runtime = standard_runtime(&store, "alice");
    let mut block = runtime.create_block(thumbs::NAME, None).unwrap();
    let url = runtime.handler_url(&block, "vote");
    assert_eq!(url, format!("/handler/{}/vote", block.usage_id()));

    for view in ["student_view", "problem_view"] {
        let fragment = runtime.render(&mut block, view, &Value::Null).unwrap();
        assert!(fragment.content.contains(&url));
        assert_eq!(fragment.resources, ["thumbs.js"]);
    }
}

#[test]
fn missing_views_and_handlers() {
    let store = Arc::new(DictKeyValueStore::new());
    let runtime = standard_runtime(&store, "alice");
    let mut root = runtime.create_block(vertical::NAME, None).unwrap();
    let mut text = runtime.create_block(html::NAME, None).unwrap();
    text.set(&html::content(), Some("<p>$who</p>".to_string())).unwrap();
    text.set_parent(Some(root.usage_id().to_string())).unwrap();
    text.save().unwrap();
    let votes = runtime.create_block(thumbs::NAME, None).unwrap();
    root.add_child(text.usage_id()).unwrap();
    root.add_child(votes.usage_id()).unwrap();
    root.save().unwrap();

    let fragments = runtime
        .render_children(&mut root, "author_view", &json!({ "who": "me" }))
        .unwrap();
    assert_eq!(fragments.len(), 2);
    assert!(fragments[0].content.contains("<p>me</p>"));
    assert!(fragments[1].content.contains("block-error"));

    assert!(matches!(
        runtime.render(&mut root, "author_view", &Value::Null),
        Err(BlockError::NoSuchView { .. })
    ));
    assert!(matches!(
        runtime.handle(&mut root, "vote", &Request::default()),
        Err(BlockError::NoSuchHandler { .. })
    ));
    assert!(matches!(runtime.get_block("u_missing"), Err(BlockError::NoSuchUsage(_))));
}

#[test]
fn containers_merge_child_output() {
    let store = Arc::new(DictKeyValueStore::new());
    let runtime = standard_runtime(&store, "alice");
    let mut root = runtime.create_block(vertical::NAME, None).unwrap();
    let counter = runtime.create_block(view_counter::NAME, None).unwrap();
    let votes = runtime.create_block(thumbs::NAME, None).unwrap();
    root.add_child(counter.usage_id()).unwrap();
    root.add_child(votes.usage_id()).unwrap();

    let fragment = runtime.render(&mut root, "student_view", &Value::Null).unwrap();
    let opening = format!(
        "<div class=\"block block-student_view\" data-usage=\"{}\"",
        root.usage_id()
    );
    assert!(fragment.content.starts_with(&opening));
    assert!(fragment.content.contains("<div class=\"vertical\">"));
    assert!(fragment.content.contains("<span class=\"views\">1</span>"));
    assert!(fragment.resources.contains(&"thumbs.js".to_string()));
    assert_eq!(fragment.resources.len(), 2);
}

#[test]
fn mixins_add_fields_without_overriding() {
    let note: Field<Text> = Field::new("note").scope(Scope::SETTINGS);
    let shadow: Field<Text> = Field::new("content").scope(Scope::SETTINGS);
    let runtime = Runtime::builder(Arc::new(DictFieldData::new()))
        .mixin(BlockType::builder("annotated").field(note.clone()).field(shadow).build())
        .build();

    let mut block = runtime.create_block(html::NAME, None).unwrap();
    assert_eq!(block.block_type().name(), html::NAME);
    assert_eq!(block.block_type().field("content").unwrap().scope(), Scope::CONTENT);
    block.set(&note, Some("remember".to_string())).unwrap();
    assert_eq!(block.get(&note).unwrap().as_deref(), Some("remember"));

    let first = runtime.load_block_type(html::NAME).unwrap();
    let second = runtime.load_block_type(html::NAME).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn custom_wrapper_replaces_the_default() {
    let runtime = Runtime::builder(Arc::new(DictFieldData::new()))
        .wrapper(|block, view, mut fragment| {
            let name = block.block_type().name();
            fragment.content = format!("[{view}:{name}]{}", fragment.content);
            fragment
        })
        .build();
    let mut block = runtime.create_block(html::HELLO_WORLD, None).unwrap();
    let fragment = runtime.render(&mut block, "student_view", &Value::Null).unwrap();
    assert_eq!(fragment.content, "[student_view:hello_world]Hello, world!");
}
