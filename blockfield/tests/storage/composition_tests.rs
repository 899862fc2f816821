use super::support::*;

fn configuration_backend() -> Arc<dyn FieldData> {
    let per_type: HashMap<String, Arc<dyn FieldData>> = HashMap::from([(
        "sample".to_string(),
        Arc::new(DictFieldData::from_values([("limit", json!(5))])) as Arc<dyn FieldData>,
    )]);
    let layered = FieldDataList::new(vec![
        Arc::new(RoutedFieldData::by_block_type(per_type)),
        Arc::new(DictFieldData::from_values([("limit", json!(10))])),
    ])
    .unwrap();
    Arc::new(ReadOnlyFieldData::new(Arc::new(layered)))
}

#[test]
fn per_type_overrides_fall_back_to_global_values() {
    let data = configuration_backend();
    let mut sample_block = sample(Arc::clone(&data), None);
    let mut other_block = sample_of("other", Arc::clone(&data), None);

    assert_eq!(*sample_block.get(&limit()).unwrap(), Some(5));
    assert_eq!(*other_block.get(&limit()).unwrap(), Some(10));
    assert!(data.has(&other_block, "limit").unwrap());
    assert!(!data.has(&other_block, "title").unwrap());
}

#[test]
fn read_only_compound_rejects_writes() {
    let data = configuration_backend();
    let mut block = sample(Arc::clone(&data), None);

    assert!(matches!(
        data.set(&block, "limit", json!(1)),
        Err(FieldDataError::InvalidScope { .. })
    ));
    assert!(matches!(
        data.delete(&block, "limit"),
        Err(FieldDataError::InvalidScope { .. })
    ));

    block.set(&limit(), Some(2)).unwrap();
    assert!(matches!(
        block.save(),
        Err(BlockError::FieldData(FieldDataError::InvalidScope { .. }))
    ));
    assert_eq!(block.fields_to_save(), ["limit"]);
}

#[test]
fn fallback_reads_in_order_and_writes_to_the_first() {
    let first = Arc::new(DictFieldData::new());
    let second = Arc::new(DictFieldData::from_values([
        ("title", json!("from second")),
        ("score", json!(2)),
    ]));
    let list: Arc<dyn FieldData> = Arc::new(
        FieldDataList::new(vec![
            Arc::clone(&first) as Arc<dyn FieldData>,
            Arc::clone(&second) as Arc<dyn FieldData>,
        ])
        .unwrap(),
    );
    let mut block = sample(Arc::clone(&list), Some("alice"));

    assert_eq!(block.get(&title()).unwrap().as_deref(), Some("from second"));
    block.set(&score(), Some(3)).unwrap();
    block.save().unwrap();
    assert_eq!(first.get_raw("score"), Some(json!(3)));
    assert_eq!(second.get_raw("score"), Some(json!(2)));

    list.delete(&block, "score").unwrap();
    assert!(first.get_raw("score").is_none());
    assert!(second.get_raw("score").is_none());
    list.delete(&block, "score").unwrap();
}

#[test]
fn routing_miss_reads_empty_and_fails_writes() {
    let routed: Arc<dyn FieldData> = Arc::new(RoutedFieldData::by_block_type(HashMap::new()));
    let block = sample(Arc::clone(&routed), None);

    assert!(!routed.has(&block, "title").unwrap());
    assert!(routed.get(&block, "title").unwrap_err().is_not_found());
    assert!(matches!(
        routed.set(&block, "title", json!("x")),
        Err(FieldDataError::RoutingMiss { route }) if route == "sample"
    ));
}

#[test]
fn split_serves_aliases_of_a_scope() {
    let state = Arc::new(DictFieldData::new());
    let content = Arc::new(DictFieldData::new());
    let split: Arc<dyn FieldData> = Arc::new(
        SplitFieldData::new()
            .route(Scope::CONTENT, Arc::clone(&content) as Arc<dyn FieldData>)
            .route(
                Scope::data(UserScope::One, BlockScope::Usage, "answers"),
                Arc::clone(&state) as Arc<dyn FieldData>,
            ),
    );
    let mut block = sample(Arc::clone(&split), Some("alice"));
    block.set(&title(), Some("T".into())).unwrap();
    block.set(&score(), Some(4)).unwrap();
    block.save().unwrap();

    assert_eq!(content.get_raw("title"), Some(json!("T")));
    assert_eq!(state.get_raw("score"), Some(json!(4)));

    block.set(&total(), Some(1)).unwrap();
    assert!(matches!(
        block.save(),
        Err(BlockError::FieldData(FieldDataError::InvalidScope { .. }))
    ));
}

#[test]
fn store_keys_isolate_users_and_share_content() {
    let store = Arc::new(DictKeyValueStore::new());
    let data = RuntimeConfig::default()
        .build_field_data(Arc::clone(&store) as Arc<dyn KeyValueStore>)
        .unwrap();

    let mut alice = sample(Arc::clone(&data), Some("alice"));
    alice.set(&title(), Some("Shared".into())).unwrap();
    alice.set(&score(), Some(9)).unwrap();
    alice.save().unwrap();

    let mut bob = sample(Arc::clone(&data), Some("bob"));
    assert_eq!(bob.get(&title()).unwrap().as_deref(), Some("Shared"));
    assert_eq!(*bob.get(&score()).unwrap(), Some(0));

    let entries = store.entries();
    let score_entry = entries
        .iter()
        .find(|(key, _)| key.field_name == "score")
        .map(|(key, _)| key.clone())
        .unwrap();
    assert_eq!(score_entry.user_id.as_deref(), Some("alice"));
    assert_eq!(score_entry.block_scope_id.as_deref(), Some("u_sample"));
    let title_entry = entries.iter().find(|(key, _)| key.field_name == "title").unwrap();
    assert_eq!(title_entry.0.user_id, None);
    assert_eq!(title_entry.0.block_scope_id.as_deref(), Some("d_sample"));
}
