use super::support::*;

fn dirty_block(data: &Arc<RecordingFieldData>) -> Block {
    let mut block = sample(Arc::clone(data) as Arc<dyn FieldData>, Some("alice"));
    block.set(&score(), Some(1)).unwrap();
    block.set(&title(), Some("T".into())).unwrap();
    block.set(&total(), Some(3)).unwrap();
    block
}

#[test]
fn partial_save_reports_both_sides_and_retry_writes_the_rest() {
    let data = Arc::new(RecordingFieldData::new());
    let mut block = dirty_block(&data);
    data.fail_after(Some(1));

    match block.save() {
        Err(BlockError::Save(SaveError {
            saved_fields,
            dirty_fields,
        })) => {
            assert_eq!(saved_fields, ["score"]);
            assert_eq!(dirty_fields, ["title", "total"]);
        }
        other => panic!("expected a partial save, got {other:?}"),
    }
    assert_eq!(block.fields_to_save(), ["title", "total"]);
    assert_eq!(data.stored("score"), Some(json!(1)));

    data.fail_after(None);
    data.clear_calls();
    block.save().unwrap();
    assert_eq!(data.calls(), ["set_many:title,total"]);
    assert!(block.dirty_fields().is_empty());
}

#[test]
fn total_failure_keeps_everything_dirty() {
    let data = Arc::new(RecordingFieldData::new());
    let mut block = dirty_block(&data);
    data.fail_after(Some(0));

    assert!(matches!(
        block.save(),
        Err(BlockError::FieldData(FieldDataError::Backend { .. }))
    ));
    assert_eq!(block.fields_to_save(), ["score", "title", "total"]);
}

#[test]
fn split_reports_batches_saved_before_a_failing_backend() {
    let failing = Arc::new(RecordingFieldData::new());
    failing.fail_after(Some(0));
    let state = Arc::new(DictFieldData::new());
    let split: Arc<dyn FieldData> = Arc::new(
        SplitFieldData::new()
            .route(Scope::USER_STATE, Arc::clone(&state) as Arc<dyn FieldData>)
            .route(Scope::CONTENT, Arc::clone(&failing) as Arc<dyn FieldData>),
    );
    let mut block = sample(split, Some("alice"));
    block.set(&score(), Some(1)).unwrap();
    block.set(&title(), Some("T".into())).unwrap();

    match block.save() {
        Err(BlockError::Save(err)) => {
            assert_eq!(err.saved_fields, ["score"]);
            assert_eq!(err.dirty_fields, ["title"]);
        }
        other => panic!("expected a partial save, got {other:?}"),
    }
    assert_eq!(state.get_raw("score"), Some(json!(1)));
    assert_eq!(block.fields_to_save(), ["title"]);
}
