use std::cell::RefCell;
use std::rc::Rc;

use chrono::{TimeZone, Utc};
use serde_json::json;
use statetree::{
    accessor, action, path, tracked_action, AccessorOptions, Change, Field, Observer, Proxy,
    Relation, Store, Value,
};

fn invalidations(observer: &Observer) -> Rc<RefCell<Vec<(Change, Relation)>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    observer.on_invalidate(move |change, relation| {
        sink.borrow_mut().push((change.clone(), relation.clone()));
    });
    seen
}

fn node(proxy: &Proxy, prop: &str) -> Proxy {
    proxy
        .get(prop)
        .unwrap()
        .into_node()
        .expect("expected a container")
}

#[test]
fn test_count_scenario() {
    let store = Store::new();
    store.replace_state(json!({"count": 0})).unwrap();

    let observer = store.observe();
    let seen = invalidations(&observer);
    let state = observer.begin().unwrap();
    assert_eq!(state.get("count").unwrap().as_i64(), Some(0));
    assert_eq!(observer.paths(), vec![path!("count")]);

    store.state().set("count", 1).unwrap();

    assert!(observer.is_stale());
    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    let (change, relation) = &seen[0];
    assert_eq!(change.path, path!("count"));
    assert_eq!(change.previous, Some(Value::from(0)));
    assert_eq!(change.value, Some(Value::from(1)));
    assert_eq!(*relation, Relation::Exact);
}

#[test]
fn test_unrelated_writes_do_not_invalidate() {
    let store = Store::new();
    store.replace_state(json!({"count": 0, "other": 0})).unwrap();

    let observer = store.observe();
    observer.begin().unwrap().get("count").unwrap();
    store.state().set("other", 1).unwrap();

    assert!(!observer.is_stale());
}

#[test]
fn test_reassigned_parent_compares_watched_descendants() {
    let store = Store::new();
    store.replace_state(json!({"a": {"b": {"c": 1}}})).unwrap();

    let observer = store.observe();
    let seen = invalidations(&observer);
    let state = observer.begin().unwrap();
    let c = node(&node(&state, "a"), "b").get("c").unwrap();
    assert_eq!(c.as_i64(), Some(1));
    assert_eq!(observer.paths(), vec![path!("a.b.c")]);

    let a = node(&store.state(), "a");
    a.set("b", json!({"c": 1, "d": 2})).unwrap();
    assert!(!observer.is_stale());

    a.set("b", json!({"c": 2})).unwrap();
    assert!(observer.is_stale());
    assert_eq!(seen.borrow()[0].1, Relation::Descendant(path!("a.b.c")));
}

#[test]
fn test_watched_ancestor_invalidates_on_any_nested_write() {
    let store = Store::new();
    store.replace_state(json!({"a": {"b": {"c": 1}}})).unwrap();

    let observer = store.observe();
    let seen = invalidations(&observer);
    let state = observer.begin().unwrap();
    let b = node(&node(&state, "a"), "b");
    assert_eq!(b.keys().unwrap(), vec!["c".to_string()]);
    assert_eq!(observer.paths(), vec![path!("a.b")]);

    node(&node(&store.state(), "a"), "b").set("c", 5).unwrap();
    assert_eq!(seen.borrow()[0].1, Relation::Ancestor(path!("a.b")));
}

#[test]
fn test_list_length_is_tracked() {
    let store = Store::new();
    store.replace_state(json!({"items": [1, 2, 3]})).unwrap();

    let observer = store.observe();
    let seen = invalidations(&observer);
    let items = node(&observer.begin().unwrap(), "items");
    assert_eq!(items.get("length").unwrap().as_i64(), Some(3));

    node(&store.state(), "items").push(4).unwrap();

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0.path, path!("items.length"));
}

#[test]
fn test_deleting_a_list_element_invalidates_shifted_reads() {
    let store = Store::new();
    store.replace_state(json!({"list": ["a", "b", "c"]})).unwrap();

    let observer = store.observe();
    let seen = invalidations(&observer);
    let list = node(&observer.begin().unwrap(), "list");
    assert_eq!(list.get("1").unwrap().as_str(), Some("b"));

    assert!(node(&store.state(), "list").delete("0").unwrap());

    assert_eq!(list.get("1").unwrap().as_str(), Some("c"));
    assert!(observer.is_stale());
    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    let (change, relation) = &seen[0];
    assert_eq!(change.path, path!("list.1"));
    assert_eq!(change.previous, Some(Value::from("b")));
    assert_eq!(change.value, Some(Value::from("c")));
    assert_eq!(*relation, Relation::Exact);
}

#[test]
fn test_deleting_a_list_element_compares_shifted_descendants() {
    let store = Store::new();
    store
        .replace_state(json!({"rows": [
            {"name": "a"}, {"name": "b"}, {"name": "c"}, {"name": "d"}
        ]}))
        .unwrap();

    let observer = store.observe();
    let rows = node(&observer.begin().unwrap(), "rows");
    node(&rows, "0").get("name").unwrap();
    node(&store.state(), "rows").delete("3").unwrap();
    assert!(!observer.is_stale());

    let rows = node(&observer.begin().unwrap(), "rows");
    assert_eq!(node(&rows, "1").get("name").unwrap().as_str(), Some("b"));
    node(&store.state(), "rows").delete("0").unwrap();
    assert!(observer.is_stale());
    assert_eq!(node(&rows, "1").get("name").unwrap().as_str(), Some("c"));
}

#[test]
fn test_begin_starts_a_fresh_pass() {
    let store = Store::new();
    store.replace_state(json!({"a": 1, "b": 2})).unwrap();

    let observer = store.observe();
    observer.begin().unwrap().get("a").unwrap();
    store.state().set("a", 10).unwrap();
    assert!(observer.is_stale());

    let state = observer.begin().unwrap();
    assert!(!observer.is_stale());
    assert!(observer.paths().is_empty());

    state.get("b").unwrap();
    store.state().set("a", 20).unwrap();
    assert!(!observer.is_stale());
}

#[test]
fn test_observer_handles_are_stable_across_passes() {
    let store = Store::new();
    store.replace_state(json!({"user": {"name": "Joel"}})).unwrap();

    let observer = store.observe();
    let first = node(&observer.begin().unwrap(), "user");
    let second = node(&observer.begin().unwrap(), "user");
    assert!(first.ptr_eq(&second));

    let untracked = node(&store.state(), "user");
    assert!(!untracked.ptr_eq(&first));

    untracked.get("name").unwrap();
    assert!(observer.paths().is_empty());
}

#[test]
fn test_actions_are_only_tracked_when_marked() {
    let store = Store::new();
    store
        .replace_state(Field::map([
            ("plain", action(|_, _, _| Ok(Value::Null))),
            ("tracked", tracked_action(|_, _, _| Ok(Value::Null))),
        ]))
        .unwrap();

    let observer = store.observe();
    let state = observer.begin().unwrap();
    assert!(state.get("plain").unwrap().action().is_some());
    assert!(observer.paths().is_empty());

    state.get("tracked").unwrap();
    assert_eq!(observer.paths(), vec![path!("tracked")]);
}

#[test]
fn test_accessor_reads_track_what_they_touch() {
    let store = Store::new();
    store
        .replace_state(Field::map([
            ("first", Field::from("joel")),
            (
                "greeting",
                accessor(AccessorOptions::new().on_get(|root, _| {
                    let first = root.get("first")?;
                    Ok(format!("hi {}", first.as_str().unwrap_or_default()).into())
                })),
            ),
        ]))
        .unwrap();

    let observer = store.observe();
    let state = observer.begin().unwrap();
    assert_eq!(state.get("greeting").unwrap().as_str(), Some("hi joel"));
    assert_eq!(observer.paths(), vec![path!("first"), path!("greeting")]);

    store.state().set("first", "ann").unwrap();
    assert!(observer.is_stale());
}

#[test]
fn test_mixed_numbers_and_dates_compare_by_value() {
    let at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
    let later = Utc.timestamp_millis_opt(1_700_000_000_001).unwrap();

    let store = Store::new();
    store
        .replace_state(Field::map([(
            "event",
            Field::from(Value::from_iter([
                ("at", Value::from(at)),
                ("count", Value::from(1)),
            ])),
        )]))
        .unwrap();

    let observer = store.observe();
    let event = node(&observer.begin().unwrap(), "event");
    event.get("at").unwrap();
    event.get("count").unwrap();

    let state = store.state();
    state
        .set(
            "event",
            Value::from_iter([("at", Value::from(at)), ("count", Value::from(1.0))]),
        )
        .unwrap();
    assert!(!observer.is_stale());

    state
        .set(
            "event",
            Value::from_iter([("at", Value::from(later)), ("count", Value::from(1))]),
        )
        .unwrap();
    assert!(observer.is_stale());
}

#[test]
fn test_custom_equivalence() {
    let store = Store::new();
    store.replace_state(json!({"user": {"name": "Joel"}})).unwrap();

    let observer = store
        .observe()
        .with_equivalence(|_: Option<&Value>, _: Option<&Value>| true);
    let user = node(&observer.begin().unwrap(), "user");
    user.get("name").unwrap();

    store
        .state()
        .set("user", json!({"name": "Ann"}))
        .unwrap();
    assert!(!observer.is_stale());

    node(&store.state(), "user").set("name", "Bob").unwrap();
    assert!(observer.is_stale());
}

#[test]
fn test_lenient_slice_reads_leaves() {
    let store = Store::new();
    store.replace_state(json!({"user": {"name": "Joel"}})).unwrap();

    let observer = store.observe();
    let name = observer.slice("user.name").unwrap();
    assert_eq!(name.as_str(), Some("Joel"));
    assert!(observer.slice("user").unwrap().node().is_some());
    assert!(observer.slice("nope").unwrap().is_absent());
    assert_eq!(observer.paths(), vec![path!("user.name"), path!("nope")]);
}

#[test]
fn test_dropped_observer_stops_listening() {
    let store = Store::new();
    store.replace_state(json!({"count": 0})).unwrap();

    let observer = store.observe();
    let seen = invalidations(&observer);
    observer.begin().unwrap().get("count").unwrap();
    drop(observer);

    store.state().set("count", 1).unwrap();
    assert!(seen.borrow().is_empty());
}
