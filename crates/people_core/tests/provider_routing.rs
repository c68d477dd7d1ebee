use people_core::{
    ChangeNotifier, DeleteSelector, NewPerson, PersonProvider, PersonStore, ProviderError,
    ProviderRequest, ProviderResponse, RecordValues, ResourceScope, DEFAULT_AUTHORITY,
};
use std::sync::Arc;

fn provider() -> PersonProvider {
    PersonProvider::new(
        Arc::new(PersonStore::open_in_memory().unwrap()),
        ChangeNotifier::new(),
        DEFAULT_AUTHORITY,
    )
}

fn insert_values(name: &str, age: i64) -> RecordValues {
    RecordValues::for_insert(&NewPerson::new(name, age))
}

#[test]
fn table_query_lists_everything_and_name_query_filters() {
    let provider = provider();
    provider.insert("/person", insert_values("Ada", 36)).unwrap();
    provider.insert("/person", insert_values("Bob", 40)).unwrap();
    provider.insert("/person", insert_values("Ada", 12)).unwrap();

    assert_eq!(provider.query("/person").unwrap().len(), 3);

    let adas = provider.query("/person/Ada").unwrap();
    assert_eq!(adas.len(), 2);
    assert!(adas.iter().all(|person| person.name == "Ada"));

    let authority_path = format!("content://{DEFAULT_AUTHORITY}/person/Bob");
    assert_eq!(provider.query(&authority_path).unwrap().len(), 1);
}

#[test]
fn unroutable_paths_are_empty_or_no_op() {
    let provider = provider();
    let mut subscription = provider.subscribe(&PersonProvider::table_scope(), true);

    assert!(provider.query("/pets").unwrap().is_empty());
    assert_eq!(provider.insert("/pets", insert_values("Rex", 3)).unwrap(), None);
    assert_eq!(
        provider.insert("/person/Ada", insert_values("Ada", 3)).unwrap(),
        None
    );
    assert_eq!(
        provider
            .delete("/pets", &DeleteSelector::by_id(1))
            .unwrap(),
        0
    );
    assert_eq!(
        provider
            .query("content://someone.else/person")
            .unwrap()
            .len(),
        0
    );

    assert!(provider.store().select_all().unwrap().is_empty());
    assert!(subscription.try_changed().is_none());
}

#[test]
fn insert_rejects_missing_fields_and_supplied_id() {
    let provider = provider();

    let missing_name = RecordValues {
        age: Some(3),
        ..RecordValues::default()
    };
    assert!(matches!(
        provider.insert("/person", missing_name),
        Err(ProviderError::InvalidValues(_))
    ));

    let mut with_id = insert_values("Ada", 3);
    with_id.id = Some(5);
    assert!(matches!(
        provider.insert("/person", with_id),
        Err(ProviderError::InvalidValues(_))
    ));
}

#[test]
fn update_replaces_only_supplied_fields() {
    let provider = provider();
    let id = provider
        .insert("/person", insert_values("Ada", 36))
        .unwrap()
        .unwrap();

    let count = provider
        .update(
            "/person",
            RecordValues {
                id: Some(id),
                age: Some(37),
                ..RecordValues::default()
            },
        )
        .unwrap();
    assert_eq!(count, 1);

    let stored = provider.store().get_by_id(id).unwrap().unwrap();
    assert_eq!(stored.name, "Ada");
    assert_eq!(stored.age, 37);
}

#[test]
fn update_of_missing_id_fails_with_not_found() {
    let provider = provider();
    let err = provider
        .update(
            "/person",
            RecordValues {
                id: Some(77),
                name: Some("Nobody".to_string()),
                ..RecordValues::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, ProviderError::NotFound(77)));
}

#[test]
fn delete_is_by_id_and_ignores_other_fields() {
    let provider = provider();
    let id = provider
        .insert("/person", insert_values("Ada", 36))
        .unwrap()
        .unwrap();

    let mismatching = DeleteSelector::by_id(id)
        .with("name", "Someone else")
        .with("age", "99");
    assert_eq!(provider.delete("/person", &mismatching).unwrap(), 1);
    assert_eq!(provider.delete("/person", &mismatching).unwrap(), 0);
}

#[test]
fn legacy_selector_deletes_by_id() {
    let provider = provider();
    let id = provider
        .insert("/person", insert_values("Ada", 36))
        .unwrap()
        .unwrap();

    let selector = DeleteSelector::from_legacy(
        "id=?&name=?&age=?",
        &[id.to_string(), "Ada".to_string(), "36".to_string()],
    )
    .unwrap();
    assert_eq!(provider.delete("/person", &selector).unwrap(), 1);

    let without_id = DeleteSelector::from_legacy("name=?", &["Ada".to_string()]).unwrap();
    assert!(matches!(
        provider.delete("/person", &without_id),
        Err(ProviderError::MalformedSelector(_))
    ));
}

#[test]
fn effective_mutations_publish_on_the_table_scope() {
    let provider = provider();
    let mut table = provider.subscribe(&ResourceScope::parse("/person"), true);
    let mut item = provider.subscribe(&ResourceScope::parse("/person/Ada"), false);
    let mut other = provider.subscribe(&ResourceScope::parse("/pets"), true);

    let id = provider
        .insert("/person", insert_values("Ada", 36))
        .unwrap()
        .unwrap();
    assert!(table.try_changed().is_some());
    assert!(item.try_changed().is_some());
    assert!(other.try_changed().is_none());

    provider.delete("/person", &DeleteSelector::by_id(id)).unwrap();
    assert!(table.try_changed().is_some());

    provider.delete("/person", &DeleteSelector::by_id(id)).unwrap();
    let _ = provider.update(
        "/person",
        RecordValues {
            id: Some(id),
            age: Some(1),
            ..RecordValues::default()
        },
    );
    assert!(table.try_changed().is_none());
}

#[test]
fn handle_wraps_results_in_responses() {
    let provider = provider();
    let inserted = provider
        .handle(ProviderRequest::Insert {
            path: "person".to_string(),
            values: insert_values("Ada", 36),
        })
        .unwrap();
    assert_eq!(
        inserted,
        ProviderResponse::Inserted {
            id: Some(1),
            path: Some("/person/1".to_string()),
        }
    );

    let deleted = provider
        .handle(ProviderRequest::Delete {
            path: "person".to_string(),
            selector: DeleteSelector::by_id(1),
        })
        .unwrap();
    assert_eq!(deleted, ProviderResponse::Affected { count: 1 });
}

#[test]
fn content_type_follows_routes() {
    let provider = provider();
    assert_eq!(provider.content_type("/person"), Some("vnd.people.dir/person"));
    assert_eq!(
        provider.content_type("/person/Ada"),
        Some("vnd.people.item/person")
    );
    assert_eq!(provider.content_type("/pets"), None);
}
