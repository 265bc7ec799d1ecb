use crate::links::{BackendCsv, LinkCreate, LinkManager, LinkUpdate};

fn create_store() -> (BackendCsv, tempfile::TempDir) {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let store = BackendCsv::load(&tmp.path().join("links.csv")).expect("failed to load store");
    (store, tmp)
}

fn placeholder(host: &str) -> String {
    format!("https://www.google.com/s2/favicons?domain={host}&sz=64")
}

#[test]
fn test_create_assigns_sequential_order_per_user() {
    let (store, _tmp) = create_store();

    for n in 0..3 {
        let link = store
            .create(
                "user-a",
                LinkCreate {
                    url: format!("https://example.com/{n}"),
                    ..Default::default()
                },
                placeholder("example.com"),
            )
            .unwrap();
        assert_eq!(link.order_index, n);
    }

    // another user's sequence starts from zero
    let link = store
        .create(
            "user-b",
            LinkCreate {
                url: "https://other.org/".to_string(),
                ..Default::default()
            },
            placeholder("other.org"),
        )
        .unwrap();
    assert_eq!(link.order_index, 0);
}

#[test]
fn test_list_is_scoped_and_ordered() {
    let (store, _tmp) = create_store();

    for n in 0..3 {
        store
            .create(
                "user-a",
                LinkCreate {
                    url: format!("https://example.com/{n}"),
                    category_id: if n == 1 {
                        Some("cat-1".to_string())
                    } else {
                        None
                    },
                    ..Default::default()
                },
                placeholder("example.com"),
            )
            .unwrap();
    }
    store
        .create(
            "user-b",
            LinkCreate {
                url: "https://other.org/".to_string(),
                ..Default::default()
            },
            placeholder("other.org"),
        )
        .unwrap();

    assert_eq!(store.list("user-a", None).unwrap().len(), 3);
    assert_eq!(store.list("user-b", None).unwrap().len(), 1);

    let filtered = store.list("user-a", Some("cat-1")).unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].url, "https://example.com/1");
}

#[test]
fn test_update_clears_category_with_empty_string() {
    let (store, _tmp) = create_store();

    let link = store
        .create(
            "user-a",
            LinkCreate {
                url: "https://example.com/".to_string(),
                category_id: Some("cat-1".to_string()),
                ..Default::default()
            },
            placeholder("example.com"),
        )
        .unwrap();

    let updated = store
        .update(
            "user-a",
            &link.id,
            LinkUpdate {
                category_id: Some("".to_string()),
                ..Default::default()
            },
        )
        .unwrap()
        .unwrap();
    assert_eq!(updated.category_id, None);
}

#[test]
fn test_update_is_scoped_to_owner() {
    let (store, _tmp) = create_store();

    let link = store
        .create(
            "user-a",
            LinkCreate {
                url: "https://example.com/".to_string(),
                ..Default::default()
            },
            placeholder("example.com"),
        )
        .unwrap();

    // a different user can neither see nor touch the row
    assert!(store.get("user-b", &link.id).unwrap().is_none());
    assert!(store
        .update(
            "user-b",
            &link.id,
            LinkUpdate {
                title: Some("stolen".to_string()),
                ..Default::default()
            },
        )
        .unwrap()
        .is_none());
    assert!(!store.delete("user-b", &link.id).unwrap());
}

#[test]
fn test_rows_survive_reload() {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let path = tmp.path().join("links.csv");

    let created = {
        let store = BackendCsv::load(&path).unwrap();
        store
            .create(
                "user-a",
                LinkCreate {
                    title: Some("example, with commas".to_string()),
                    url: "https://example.com/".to_string(),
                    category_id: Some("cat-1".to_string()),
                },
                placeholder("example.com"),
            )
            .unwrap()
    };

    let reloaded = BackendCsv::load(&path).unwrap();
    let stored = reloaded.get("user-a", &created.id).unwrap().unwrap();

    assert_eq!(stored.title, "example, with commas");
    assert_eq!(stored.url, created.url);
    assert_eq!(stored.favicon_url, created.favicon_url);
    assert_eq!(stored.category_id.as_deref(), Some("cat-1"));
    assert_eq!(stored.order_index, 0);
    assert_eq!(stored.created_at, created.created_at);
}

#[test]
fn test_reorder_skips_foreign_ids() {
    let (store, _tmp) = create_store();

    let mine = store
        .create(
            "user-a",
            LinkCreate {
                url: "https://example.com/".to_string(),
                ..Default::default()
            },
            placeholder("example.com"),
        )
        .unwrap();
    let theirs = store
        .create(
            "user-b",
            LinkCreate {
                url: "https://other.org/".to_string(),
                ..Default::default()
            },
            placeholder("other.org"),
        )
        .unwrap();

    // only the caller's own row is renumbered
    let touched = store
        .reorder("user-a", &[theirs.id.clone(), mine.id.clone()])
        .unwrap();
    assert_eq!(touched, 1);

    let stored = store.get("user-a", &mine.id).unwrap().unwrap();
    assert_eq!(stored.order_index, 1);

    let untouched = store.get("user-b", &theirs.id).unwrap().unwrap();
    assert_eq!(untouched.order_index, 0);
}

#[test]
fn test_detach_category() {
    let (store, _tmp) = create_store();

    for n in 0..2 {
        store
            .create(
                "user-a",
                LinkCreate {
                    url: format!("https://example.com/{n}"),
                    category_id: Some("cat-1".to_string()),
                    ..Default::default()
                },
                placeholder("example.com"),
            )
            .unwrap();
    }

    assert_eq!(store.detach_category("user-a", "cat-1").unwrap(), 2);
    assert!(store.list("user-a", Some("cat-1")).unwrap().is_empty());
    assert_eq!(store.list("user-a", None).unwrap().len(), 2);
}
