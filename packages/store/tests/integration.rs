use std::cell::RefCell;
use std::rc::Rc;

use serde_json::json;
use statetree::{
    accessor, action, path, AccessorOptions, Change, Error, Field, Proxy, Read, Store, Value,
};

fn recorded(store: &Store) -> Rc<RefCell<Vec<Change>>> {
    let changes = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&changes);
    // Listener handles are only needed to unlisten.
    let _ = store.listen(move |change| sink.borrow_mut().push(change.clone()));
    changes
}

fn node(read: Result<Read, Error>) -> Proxy {
    read.unwrap().into_node().expect("expected a container")
}

#[test]
fn test_handles_are_cached_per_container() {
    let store = Store::new();
    store
        .replace_state(json!({"user": {"name": "Joel"}, "list": [{"a": 1}]}))
        .unwrap();

    let state = store.state();
    assert!(state.ptr_eq(&store.state()));

    let a = node(state.get("user"));
    let b = node(state.get("user"));
    assert!(a.ptr_eq(&b));
    assert_eq!(a.path(), path!("user"));

    let item = node(node(state.get("list")).get("0"));
    assert!(item.ptr_eq(&node(store.get_path("list.0"))));
}

#[test]
fn test_same_value_writes_do_not_publish() {
    let store = Store::new();
    store
        .replace_state(Field::map([
            ("count", Field::from(0)),
            ("ratio", Field::from(f64::NAN)),
            ("user", Field::from(json!({"name": "Joel"}))),
        ]))
        .unwrap();
    let changes = recorded(&store);
    let state = store.state();

    state.set("count", 0).unwrap();
    state.set("ratio", f64::NAN).unwrap();
    assert!(changes.borrow().is_empty());

    state.set("count", 1).unwrap();
    state.set("count", 1.0).unwrap();
    assert_eq!(changes.borrow().len(), 1);

    let change = changes.borrow()[0].clone();
    assert_eq!(change.path, path!("count"));
    assert_eq!(change.prop, "count");
    assert_eq!(change.previous, Some(Value::from(0)));
    assert_eq!(change.value, Some(Value::from(1)));

    // A fresh container is always a change, even with equal contents.
    state.set("user", json!({"name": "Joel"})).unwrap();
    assert_eq!(changes.borrow().len(), 2);
}

#[test]
fn test_replaced_container_detaches_old_handle() {
    let store = Store::new();
    store.replace_state(json!({"user": {"name": "Joel"}})).unwrap();

    let state = store.state();
    let user = node(state.get("user"));
    state.set("user", json!({"name": "Ann"})).unwrap();

    assert!(matches!(user.get("name"), Err(Error::Detached)));
    let fresh = node(state.get("user"));
    assert!(!fresh.ptr_eq(&user));
    assert_eq!(fresh.get("name").unwrap().as_str(), Some("Ann"));
}

#[test]
fn test_frozen_subtree_rejects_writes() {
    let store = Store::new();
    store
        .replace_state(json!({"deep": {"name": {"first": "Joel"}}, "other": 1}))
        .unwrap();

    let state = store.state();
    let deep = node(state.get("deep"));
    let name = node(deep.get("name"));
    store.freeze("deep").unwrap();

    assert!(deep.is_frozen());
    assert!(name.is_frozen());
    assert!(!state.is_frozen());

    match name.set("first", "Ann") {
        Err(Error::Frozen { path }) => assert_eq!(path, path!("deep.name.first")),
        other => panic!("expected frozen error, got {:?}", other),
    }
    assert!(matches!(deep.set("extra", 1), Err(Error::Frozen { .. })));
    assert!(matches!(name.delete("first"), Err(Error::Frozen { .. })));

    // Frozen containers read as plain values.
    assert_eq!(
        state.get("deep").unwrap(),
        Read::Value(json!({"name": {"first": "Joel"}}).into())
    );
    assert_eq!(
        store.get_path("deep.name.first").unwrap().as_str(),
        Some("Joel")
    );

    // Freezing twice is fine; freezing a leaf does nothing.
    store.freeze("deep").unwrap();
    store.freeze("other").unwrap();
    state.set("other", 2).unwrap();
}

#[test]
fn test_frozen_fields_import_frozen() {
    let store = Store::new();
    store
        .replace_state(Field::map([
            ("config", Field::from(json!({"tags": ["a"]})).frozen()),
            ("count", Field::from(0)),
        ]))
        .unwrap();

    let state = store.state();
    assert_eq!(
        state.get("config").unwrap().into_value(),
        Some(json!({"tags": ["a"]}).into())
    );
    assert!(matches!(
        store.set_path("config.tags", 1),
        Err(Error::NotAContainer { .. })
    ));
    state.set("count", 1).unwrap();
}

#[test]
fn test_list_operations_publish_index_and_length() {
    let store = Store::new();
    store.replace_state(json!({"items": [1, 2, 3]})).unwrap();
    let changes = recorded(&store);

    let items = node(store.state().get("items"));
    assert!(items.is_list().unwrap());

    items.push(4).unwrap();
    {
        let changes = changes.borrow();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].path, path!("items.3"));
        assert_eq!(changes[0].previous, None);
        assert_eq!(changes[1].path, path!("items.length"));
        assert_eq!(changes[1].previous, Some(Value::from(3)));
        assert_eq!(changes[1].value, Some(Value::from(4)));
    }

    items.set("length", 2).unwrap();
    assert_eq!(items.len().unwrap(), 2);
    assert_eq!(changes.borrow().len(), 3);

    // Length writes always publish.
    items.set("length", 2).unwrap();
    assert_eq!(changes.borrow().len(), 4);

    assert!(items.delete("0").unwrap());
    {
        let changes = changes.borrow();
        assert_eq!(changes[4].path, path!("items.0"));
        assert_eq!(changes[4].previous, Some(Value::from(1)));
        assert_eq!(changes[4].value, Some(Value::from(2)));
        assert_eq!(changes[5].path, path!("items.1"));
        assert_eq!(changes[5].previous, Some(Value::from(2)));
        assert!(changes[5].is_delete());
        assert_eq!(changes[6].path, path!("items.length"));
        assert_eq!(changes[6].value, Some(Value::from(1)));
    }
    assert_eq!(store.raw_state(), json!({"items": [2]}).into());

    assert!(!items.delete("5").unwrap());
    assert_eq!(changes.borrow().len(), 7);
    assert!(matches!(items.set("name", 1), Err(Error::Path(_))));
    assert!(matches!(
        store.state().push(1),
        Err(Error::NotAList { .. })
    ));
}

#[test]
fn test_deleting_list_elements_readdresses_the_rest() {
    let store = Store::new();
    store
        .replace_state(json!({"rows": [{"id": 1}, {"id": 2}, {"id": 3}]}))
        .unwrap();

    let rows = node(store.state().get("rows"));
    let third = node(rows.get("2"));
    assert!(rows.delete("0").unwrap());

    assert_eq!(third.path(), path!("rows.1"));
    assert!(third.ptr_eq(&node(rows.get("1"))));
    assert_eq!(third.get("id").unwrap().as_i64(), Some(3));
}

#[test]
fn test_delete_missing_key_is_silent() {
    let store = Store::new();
    store.replace_state(json!({"a": 1})).unwrap();
    let changes = recorded(&store);

    let state = store.state();
    assert!(!state.delete("b").unwrap());
    assert!(state.delete("a").unwrap());
    assert_eq!(changes.borrow().len(), 1);
    assert_eq!(changes.borrow()[0].previous, Some(Value::from(1)));
    assert!(state.get("a").unwrap().is_absent());
}

#[test]
fn test_merge_recurses_into_maps() {
    let store = Store::new();
    store
        .replace_state(json!({"user": {"name": "Joel", "tags": ["a"]}, "count": 1}))
        .unwrap();
    let user = node(store.state().get("user"));
    let changes = recorded(&store);

    store
        .merge(json!({"user": {"age": 40, "tags": ["b", "c"]}, "extra": true}))
        .unwrap();

    assert_eq!(
        store.raw_state(),
        json!({
            "user": {"name": "Joel", "age": 40, "tags": ["b", "c"]},
            "count": 1,
            "extra": true
        })
        .into()
    );
    assert!(user.ptr_eq(&node(store.state().get("user"))));
    assert_eq!(changes.borrow().len(), 3);
}

#[test]
fn test_merge_rejects_non_maps_before_mutating() {
    let store = Store::new();
    store.replace_state(json!({"a": 1})).unwrap();

    assert!(matches!(store.merge(json!([1, 2])), Err(Error::InvalidMerge)));
    assert!(matches!(store.merge(1), Err(Error::InvalidMerge)));
    assert!(matches!(
        store.merge(json!({"b": 1, "c.d": 2})),
        Err(Error::Path(_))
    ));
    assert!(matches!(
        store.merge(json!({"b": 1, "c": {"list": [{"e.f": 2}]}})),
        Err(Error::Path(_))
    ));
    assert_eq!(store.raw_state(), json!({"a": 1}).into());
}

#[test]
fn test_get_path_and_set_path() {
    let store = Store::new();

    store.set_path("a.b.c", 1).unwrap();
    assert_eq!(store.get_path("a.b.c").unwrap().as_i64(), Some(1));
    assert_eq!(store.raw_state(), json!({"a": {"b": {"c": 1}}}).into());

    match store.set_path("a.b.c.d", 2) {
        Err(Error::NotAContainer { path }) => assert_eq!(path, path!("a.b.c")),
        other => panic!("expected NotAContainer, got {:?}", other),
    }

    store.set_path("list", json!([0, 0])).unwrap();
    store.set_path("list.1", 5).unwrap();
    assert_eq!(store.get_path("list.1").unwrap().as_i64(), Some(5));
    assert_eq!(store.get_path("list.length").unwrap().as_i64(), Some(2));
    assert!(store.get_path("missing.deeper").unwrap().is_absent());
}

#[test]
fn test_slice_is_strict() {
    let store = Store::new();
    store.replace_state(json!({"user": {"name": "Joel"}})).unwrap();

    let user = store.slice("user").unwrap();
    assert_eq!(user.path(), path!("user"));
    assert!(matches!(
        store.slice("user.name"),
        Err(Error::UnsupportedSlice { .. })
    ));
    assert!(matches!(
        store.slice("missing"),
        Err(Error::UnsupportedSlice { .. })
    ));
}

#[test]
fn test_pseudo_properties() {
    let store = Store::new();
    store
        .replace_state(json!({"user": {"address": {"city": "Leeds"}}}))
        .unwrap();

    let state = store.state();
    let user = node(state.get("user"));
    let address = node(user.get("address"));

    assert!(node(address.get("$root")).ptr_eq(&state));
    assert!(node(address.get("$model")).ptr_eq(&user));
    assert_eq!(
        address.get("$raw").unwrap(),
        Read::Value(json!({"city": "Leeds"}).into())
    );
    assert_eq!(address.unwrap().unwrap(), json!({"city": "Leeds"}).into());

    assert!(matches!(
        state.set("$root", 1),
        Err(Error::Protected { .. })
    ));
    assert!(matches!(
        user.delete("$model"),
        Err(Error::Protected { .. })
    ));
}

#[test]
fn test_accessor_callbacks() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let after = Rc::clone(&log);

    let store = Store::new();
    store
        .replace_state(Field::map([
            ("first", Field::from("joel")),
            (
                "name",
                accessor(
                    AccessorOptions::new()
                        .initial_value("joel")
                        .on_get(|_, v| Ok(v.as_str().unwrap_or_default().to_uppercase().into()))
                        .on_set(|_, _, new, manual| {
                            if new.as_str() == Some("") {
                                manual.set("anonymous");
                            }
                            Ok(())
                        })
                        .after_set(move |_, old, new| {
                            after.borrow_mut().push((old.clone(), new.clone()));
                            Ok(())
                        }),
                ),
            ),
            (
                "greeting",
                accessor(AccessorOptions::new().on_get(|root, _| {
                    let first = root.get("first")?;
                    Ok(format!("hi {}", first.as_str().unwrap_or_default()).into())
                })),
            ),
        ]))
        .unwrap();
    let changes = recorded(&store);
    let state = store.state();

    assert_eq!(state.get("name").unwrap().as_str(), Some("JOEL"));
    assert_eq!(state.get("greeting").unwrap().as_str(), Some("hi joel"));

    state.set("name", "ann").unwrap();
    assert_eq!(state.get("name").unwrap().as_str(), Some("ANN"));

    state.set("name", "").unwrap();
    assert_eq!(state.get("name").unwrap().as_str(), Some("ANONYMOUS"));

    // Storing the same value again runs after_set but publishes nothing.
    state.set("name", "anonymous").unwrap();

    assert_eq!(
        *log.borrow(),
        vec![
            (Value::from("joel"), Value::from("ann")),
            (Value::from("ann"), Value::from("anonymous")),
            (Value::from("anonymous"), Value::from("anonymous")),
        ]
    );
    assert_eq!(changes.borrow().len(), 2);
    assert_eq!(changes.borrow()[1].value, Some(Value::from("anonymous")));

    assert_eq!(
        store.raw_state().get(&path!("name")),
        Some(&Value::from("anonymous"))
    );
}

#[test]
fn test_actions_are_bound_to_their_container() {
    let store = Store::new();
    store
        .replace_state(Field::map([(
            "counter",
            Field::map([
                ("count", Field::from(0)),
                (
                    "increment",
                    action(|this, _root, args| {
                        let by = args.first().and_then(Value::as_i64).unwrap_or(1);
                        let count = this.get("count")?.as_i64().unwrap_or_default();
                        this.set("count", count + by)?;
                        Ok(Value::Null)
                    }),
                ),
            ]),
        )]))
        .unwrap();

    let counter = node(store.state().get("counter"));
    let read = counter.get("increment").unwrap();
    let increment = read.action().unwrap();
    assert!(increment.this().ptr_eq(&counter));

    increment.call(&[]).unwrap();
    increment.call(&[Value::from(5)]).unwrap();
    assert_eq!(counter.get("count").unwrap().as_i64(), Some(6));
}

#[test]
fn test_replace_state_requires_a_container() {
    let store = Store::new();
    let changes = recorded(&store);

    assert!(matches!(
        store.replace_state(1),
        Err(Error::NotAContainer { .. })
    ));
    store.replace_state(json!([1, 2])).unwrap();
    assert!(store.state().is_list().unwrap());
    assert!(changes.borrow().is_empty());
}

#[test]
fn test_reset_wipes_everything() {
    let store = Store::new();
    store.replace_state(json!({"a": {"b": 1}})).unwrap();
    let changes = recorded(&store);
    let old_root = store.state();
    let a = node(old_root.get("a"));

    store.reset();

    assert_eq!(store.raw_state(), Value::map());
    assert!(matches!(a.get("b"), Err(Error::Detached)));
    assert!(matches!(old_root.get("a"), Err(Error::Detached)));
    assert!(!old_root.ptr_eq(&store.state()));

    store.state().set("x", 1).unwrap();
    assert!(changes.borrow().is_empty());
}

#[test]
fn test_unlisten_stops_delivery() {
    let store = Store::new();
    let seen = Rc::new(RefCell::new(Vec::new()));

    let first = {
        let seen = Rc::clone(&seen);
        store.listen(move |change| seen.borrow_mut().push(("first", change.prop.clone())))
    };
    let _second = {
        let seen = Rc::clone(&seen);
        store.listen(move |change| seen.borrow_mut().push(("second", change.prop.clone())))
    };

    store.state().set("a", 1).unwrap();
    assert!(first.unlisten());
    store.state().set("b", 1).unwrap();

    assert_eq!(
        *seen.borrow(),
        vec![
            ("first", "a".to_string()),
            ("second", "a".to_string()),
            ("second", "b".to_string()),
        ]
    );
}

#[test]
fn test_typed_reads() {
    #[derive(Debug, PartialEq, serde::Deserialize)]
    struct User {
        name: String,
        tags: Vec<String>,
    }

    let store = Store::new();
    store
        .replace_state(Field::map([(
            "user",
            Field::serialize(&json!({"name": "Joel", "tags": ["a"]})).unwrap(),
        )]))
        .unwrap();

    let user: User = store.get_path("user").unwrap().deserialize().unwrap();
    assert_eq!(
        user,
        User {
            name: "Joel".to_string(),
            tags: vec!["a".to_string()],
        }
    );
}
