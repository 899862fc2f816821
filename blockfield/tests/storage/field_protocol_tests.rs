use super::support::*;
use blockfield::fields::{Boolean, DateTime, Float};
use chrono::{TimeZone, Timelike, Utc};
use serde_json::Map;

#[test]
fn first_read_loads_then_caches() {
    let data = Arc::new(RecordingFieldData::new());
    let mut block = sample(Arc::clone(&data) as Arc<dyn FieldData>, Some("alice"));

    assert_eq!(*block.get(&score()).unwrap(), Some(0));
    assert_eq!(data.calls(), ["has:score", "default:score"]);

    assert_eq!(*block.get(&score()).unwrap(), Some(0));
    assert_eq!(data.calls().len(), 2);
    assert!(block.is_cached("score"));
}

#[test]
fn stored_values_win_over_defaults() {
    let data = Arc::new(RecordingFieldData::new().with_default("score", json!(5)));
    let mut writer = sample(Arc::clone(&data) as Arc<dyn FieldData>, Some("alice"));
    assert_eq!(*writer.get(&score()).unwrap(), Some(5));

    writer.set(&score(), Some(8)).unwrap();
    writer.save().unwrap();

    data.clear_calls();
    let mut reader = sample(Arc::clone(&data) as Arc<dyn FieldData>, Some("alice"));
    assert_eq!(*reader.get(&score()).unwrap(), Some(8));
    assert_eq!(data.calls(), ["has:score", "get:score"]);
}

#[test]
fn backend_defaults_are_not_saved() {
    let data = Arc::new(RecordingFieldData::new().with_default("score", json!(5)));
    let mut block = sample(Arc::clone(&data) as Arc<dyn FieldData>, Some("alice"));
    assert_eq!(*block.get(&score()).unwrap(), Some(5));
    block.save().unwrap();
    assert!(data.stored("score").is_none());
    assert!(!data.calls().iter().any(|call| call.starts_with("set_many")));
}

#[test]
fn structural_fields_skip_backend_defaults() {
    let data = Arc::new(RecordingFieldData::new().with_default("parent", json!("u_elsewhere")));
    let mut block = sample(Arc::clone(&data) as Arc<dyn FieldData>, None);
    assert_eq!(block.parent().unwrap(), None);
    assert!(!data.calls().contains(&"default:parent".to_string()));
}

#[test]
fn writes_are_visible_before_save() {
    let data = Arc::new(RecordingFieldData::new());
    let mut block = sample(Arc::clone(&data) as Arc<dyn FieldData>, Some("alice"));
    block.set(&title(), Some("Quiz".into())).unwrap();
    assert_eq!(block.get(&title()).unwrap().as_deref(), Some("Quiz"));
    assert!(data.calls().is_empty());
    assert_eq!(block.fields_to_save(), ["title"]);
}

#[test]
fn mutable_defaults_are_not_shared() {
    let data: Arc<dyn FieldData> = Arc::new(DictFieldData::new());
    let mut first = sample(Arc::clone(&data), Some("alice"));
    let mut second = sample(Arc::clone(&data), Some("bob"));

    first.get_mut(&tags()).unwrap().push(json!("mine"));
    assert!(second.get(&tags()).unwrap().is_empty());
    assert!(tags().default_native().is_empty());
}

#[test]
fn in_place_changes_are_saved_once() {
    let data = Arc::new(RecordingFieldData::new());
    let mut block = sample(Arc::clone(&data) as Arc<dyn FieldData>, Some("alice"));

    block.get_mut(&tags()).unwrap().push(json!("a"));
    block.get_mut(&prefs()).unwrap().insert("theme".into(), json!("dark"));
    // read but untouched
    block.get(&score()).unwrap();
    block.save().unwrap();

    assert_eq!(data.calls().last().map(String::as_str), Some("set_many:prefs,tags"));
    assert_eq!(data.stored("tags"), Some(json!(["a"])));
    assert_eq!(data.stored("prefs"), Some(json!({ "theme": "dark" })));
    assert!(block.dirty_fields().is_empty());

    data.clear_calls();
    block.save().unwrap();
    assert!(data.calls().is_empty());
}

#[test]
fn mutating_back_to_the_baseline_is_not_a_change() {
    let data = Arc::new(RecordingFieldData::new());
    let mut block = sample(Arc::clone(&data) as Arc<dyn FieldData>, Some("alice"));
    let tags_ref = block.get_mut(&tags()).unwrap();
    tags_ref.push(json!("a"));
    tags_ref.pop();
    assert!(block.fields_to_save().is_empty());
}

#[test]
fn delete_resets_to_default_and_tolerates_missing_values() {
    let data = Arc::new(RecordingFieldData::new());
    let mut block = sample(Arc::clone(&data) as Arc<dyn FieldData>, Some("alice"));
    block.delete("score").unwrap();

    block.set(&score(), Some(3)).unwrap();
    block.save().unwrap();
    block.delete("score").unwrap();
    assert!(data.stored("score").is_none());
    assert_eq!(*block.get(&score()).unwrap(), Some(0));
    assert!(!block.is_set("score").unwrap());
}

#[test]
fn force_save_writes_unchanged_fields() {
    let data = Arc::new(RecordingFieldData::new());
    let mut block = sample(Arc::clone(&data) as Arc<dyn FieldData>, Some("alice"));
    block.force_save_fields(&["score".to_string()]).unwrap();
    assert_eq!(data.stored("score"), Some(json!(0)));
}

#[test]
fn string_and_json_write_paths() {
    let data: Arc<dyn FieldData> = Arc::new(DictFieldData::new());
    let mut block = sample(data, Some("alice"));

    block.set_from_string("score", "12").unwrap();
    assert_eq!(*block.get(&score()).unwrap(), Some(12));
    block.set_from_string("title", "plain text, not yaml: [").unwrap();
    assert_eq!(block.get(&title()).unwrap().as_deref(), Some("plain text, not yaml: ["));

    block.set_json("tags", json!(["x", 1])).unwrap();
    assert_eq!(block.get_json("tags").unwrap(), json!(["x", 1]));
    assert!(matches!(
        block.set_json("score", json!({ "not": "a number" })),
        Err(BlockError::TypeCoercion { .. })
    ));
    assert!(matches!(
        block.set_json("missing", json!(1)),
        Err(BlockError::FieldData(FieldDataError::UnknownField { .. }))
    ));
}

#[test]
fn repeated_reads_return_the_cached_value() {
    let data: Arc<dyn FieldData> = Arc::new(DictFieldData::new());
    let mut block = sample(data, Some("alice"));

    let first: *const Vec<Value> = block.get(&tags()).unwrap();
    let second: *const Vec<Value> = block.get(&tags()).unwrap();
    assert!(std::ptr::eq(first, second));

    block.get_mut(&tags()).unwrap().push(json!("kept"));
    let after_edit: *const Vec<Value> = block.get(&tags()).unwrap();
    assert!(std::ptr::eq(first, after_edit));
    assert_eq!(*block.get(&tags()).unwrap(), vec![json!("kept")]);
}

#[test]
fn writing_back_the_current_value_still_stores_it() {
    let data = Arc::new(RecordingFieldData::new());
    let mut block = sample(Arc::clone(&data) as Arc<dyn FieldData>, Some("alice"));

    let current = *block.get(&score()).unwrap();
    block.set(&score(), current).unwrap();
    block.save().unwrap();

    assert_eq!(data.stored("score"), Some(json!(0)));
    assert!(score().is_set_on(&block).unwrap());
}

fn ratio() -> Field<Float> {
    Field::new("ratio").scope(Scope::SETTINGS)
}

fn done() -> Field<Boolean> {
    Field::new("done").scope(Scope::USER_STATE)
}

fn layout() -> Field<Dict> {
    Field::new("layout").scope(Scope::SETTINGS)
}

fn due() -> Field<DateTime> {
    Field::new("due").scope(Scope::SETTINGS)
}

fn assignment(data: &Arc<dyn FieldData>) -> Block {
    let block_type = BlockType::builder("assignment")
        .field(ratio())
        .field(done())
        .field(layout())
        .field(due())
        .build();
    let ids = ScopeIds::new(Some("alice".into()), "assignment", "d_assignment", "u_assignment");
    Block::new(Arc::new(block_type), ids, Arc::clone(data))
}

#[test]
fn values_of_every_kind_survive_a_reload() {
    let data: Arc<dyn FieldData> = Arc::new(DictFieldData::new());
    let stamp = Utc
        .with_ymd_and_hms(2024, 2, 29, 12, 30, 5)
        .single()
        .and_then(|stamp| stamp.with_nanosecond(250_000_000));
    let mut layout_value = Map::new();
    layout_value.insert("columns".into(), json!(2));
    layout_value.insert("hidden".into(), json!(["hints"]));

    let mut writer = assignment(&data);
    writer.set(&ratio(), Some(0.75)).unwrap();
    writer.set(&done(), true).unwrap();
    writer.set(&layout(), layout_value.clone()).unwrap();
    writer.set(&due(), stamp).unwrap();
    writer.save().unwrap();

    let mut reader = assignment(&data);
    assert_eq!(*reader.get(&ratio()).unwrap(), Some(0.75));
    assert!(*reader.get(&done()).unwrap());
    assert_eq!(*reader.get(&layout()).unwrap(), layout_value);
    assert_eq!(*reader.get(&due()).unwrap(), stamp);
}

fn counter() -> Field<Integer> {
    Field::new("counter").scope(Scope::USER_STATE).default(Some(0))
}

fn counter_block(data: &Arc<dyn FieldData>) -> Block {
    let block_type = BlockType::builder("tally").field(counter()).build();
    let ids = ScopeIds::new(Some("alice".into()), "tally", "d_tally", "u_tally");
    Block::new(Arc::new(block_type), ids, Arc::clone(data))
}

#[test]
fn counter_persists_across_block_instances() {
    let data: Arc<dyn FieldData> = Arc::new(DictFieldData::new());

    let mut first = counter_block(&data);
    assert_eq!(*counter().read_from(&mut first).unwrap(), Some(0));
    assert!(!counter().is_set_on(&first).unwrap());
    counter().write_to(&mut first, Some(5)).unwrap();
    assert!(counter().is_set_on(&first).unwrap());
    first.save().unwrap();

    let mut second = counter_block(&data);
    assert!(counter().is_set_on(&second).unwrap());
    assert_eq!(*counter().read_from(&mut second).unwrap(), Some(5));

    counter().delete_from(&mut second).unwrap();
    assert!(!counter().is_set_on(&second).unwrap());
    assert!(!counter().is_set_on(&counter_block(&data)).unwrap());
}
