use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, RwLock,
};

use crate::app::task_runner::{self, Status, Task};
use crate::config::Config;
use crate::links::{Link, LinkCreate, LinkManager, LinkUpdate};
use crate::storage::BackendLocal;

#[test]
fn test_queue_dump_lifecycle() {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let store = BackendLocal::new(tmp.path()).unwrap();

    assert!(task_runner::read_queue_dump(&store).queue.is_empty());

    let id = task_runner::save_task(
        &store,
        Task::ResolveFavicon {
            link_id: "link-1".to_string(),
            url: "https://example.com/".to_string(),
        },
        Status::Pending,
    );

    let dump = task_runner::read_queue_dump(&store);
    assert_eq!(dump.queue.len(), 1);
    assert!(matches!(dump.queue[0].status, Status::Pending));

    task_runner::set_status(&store, id.clone(), Status::Done);
    let dump = task_runner::read_queue_dump(&store);
    assert!(matches!(dump.queue[0].status, Status::Done));

    task_runner::remove_task(&store, id);
    assert!(task_runner::read_queue_dump(&store).queue.is_empty());
}

/// LinkManager stub that records whether the favicon guard was invoked.
struct RecordingStore {
    wrote: AtomicBool,
}

impl LinkManager for RecordingStore {
    fn list(&self, _user_id: &str, _category_id: Option<&str>) -> anyhow::Result<Vec<Link>> {
        Ok(vec![])
    }

    fn get(&self, _user_id: &str, _id: &str) -> anyhow::Result<Option<Link>> {
        Ok(None)
    }

    fn create(
        &self,
        _user_id: &str,
        _create: LinkCreate,
        _favicon_url: String,
    ) -> anyhow::Result<Link> {
        unreachable!()
    }

    fn update(
        &self,
        _user_id: &str,
        _id: &str,
        _update: LinkUpdate,
    ) -> anyhow::Result<Option<Link>> {
        Ok(None)
    }

    fn delete(&self, _user_id: &str, _id: &str) -> anyhow::Result<bool> {
        Ok(false)
    }

    fn reorder(&self, _user_id: &str, _ids: &[String]) -> anyhow::Result<usize> {
        Ok(0)
    }

    fn detach_category(&self, _user_id: &str, _category_id: &str) -> anyhow::Result<usize> {
        Ok(0)
    }

    fn set_favicon_if_current(
        &self,
        _id: &str,
        _resolved_for: &str,
        _favicon_url: &str,
    ) -> anyhow::Result<bool> {
        self.wrote.store(true, Ordering::Relaxed);
        Ok(true)
    }
}

#[test]
fn test_resolve_task_keeps_placeholder_when_nothing_better_exists() {
    // an unparseable url resolves to the none tier with zero network
    // traffic, which must not touch the stored favicon
    let link_mgr = Arc::new(RecordingStore {
        wrote: AtomicBool::new(false),
    });
    let config = Arc::new(RwLock::new(Config::default()));

    let task = Task::ResolveFavicon {
        link_id: "link-1".to_string(),
        url: "not a url".to_string(),
    };

    let status = task.run(link_mgr.clone(), config);
    assert!(matches!(status, Status::Done));
    assert!(!link_mgr.wrote.load(Ordering::Relaxed));
}
