use crate::categories::{BackendCsv, CategoryCreate, CategoryManager, CategoryUpdate};

fn create_store() -> (BackendCsv, tempfile::TempDir) {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let store =
        BackendCsv::load(&tmp.path().join("categories.csv")).expect("failed to load store");
    (store, tmp)
}

#[test]
fn test_create_applies_default_color_and_order() {
    let (store, _tmp) = create_store();

    let first = store
        .create(
            "user-a",
            CategoryCreate {
                name: "reading".to_string(),
                color: None,
            },
        )
        .unwrap();
    assert_eq!(first.color, "#3B82F6");
    assert_eq!(first.order_index, 0);

    let second = store
        .create(
            "user-a",
            CategoryCreate {
                name: "work".to_string(),
                color: Some("#FF0000".to_string()),
            },
        )
        .unwrap();
    assert_eq!(second.color, "#FF0000");
    assert_eq!(second.order_index, 1);
}

#[test]
fn test_update_and_delete_are_scoped_to_owner() {
    let (store, _tmp) = create_store();

    let category = store
        .create(
            "user-a",
            CategoryCreate {
                name: "reading".to_string(),
                color: None,
            },
        )
        .unwrap();

    assert!(store
        .update(
            "user-b",
            &category.id,
            CategoryUpdate {
                name: Some("stolen".to_string()),
                color: None,
            },
        )
        .unwrap()
        .is_none());
    assert!(!store.delete("user-b", &category.id).unwrap());

    let updated = store
        .update(
            "user-a",
            &category.id,
            CategoryUpdate {
                name: Some("renamed".to_string()),
                color: None,
            },
        )
        .unwrap()
        .unwrap();
    assert_eq!(updated.name, "renamed");
    assert_eq!(updated.color, "#3B82F6");

    assert!(store.delete("user-a", &category.id).unwrap());
    assert!(store.list("user-a").unwrap().is_empty());
}

#[test]
fn test_reorder_by_position() {
    let (store, _tmp) = create_store();

    let mut ids = vec![];
    for name in ["a", "b", "c"] {
        let category = store
            .create(
                "user-a",
                CategoryCreate {
                    name: name.to_string(),
                    color: None,
                },
            )
            .unwrap();
        ids.push(category.id);
    }

    ids.reverse();
    assert_eq!(store.reorder("user-a", &ids).unwrap(), 3);

    let listed = store.list("user-a").unwrap();
    let names = listed
        .iter()
        .map(|category| category.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, ["c", "b", "a"]);
}

#[test]
fn test_rows_survive_reload() {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let path = tmp.path().join("categories.csv");

    let created = {
        let store = BackendCsv::load(&path).unwrap();
        store
            .create(
                "user-a",
                CategoryCreate {
                    name: "reading, later".to_string(),
                    color: None,
                },
            )
            .unwrap()
    };

    let reloaded = BackendCsv::load(&path).unwrap();
    let stored = reloaded.get("user-a", &created.id).unwrap().unwrap();
    assert_eq!(stored.name, "reading, later");
    assert_eq!(stored.color, created.color);
    assert_eq!(stored.updated_at, created.updated_at);
}
