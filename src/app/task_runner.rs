use std::{
    sync::{
        atomic::{AtomicU16, Ordering},
        mpsc, Arc, RwLock,
    },
    thread::sleep,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    eid::Eid,
    favicon::{self, IconSource},
    links,
    storage::{BackendLocal, StorageManager},
};

const QUEUE_DUMP_FILE: &str = "task-queue.json";

pub fn now() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis()
}

pub fn throttle(counter: Arc<AtomicU16>, config: Arc<RwLock<Config>>) {
    while counter.load(Ordering::Relaxed) >= config.read().unwrap().task_queue_max_threads {
        sleep(Duration::from_millis(100));
    }
}

/// Consumes background tasks until a `Shutdown` arrives, then drains
/// in-flight workers before returning.
pub fn start_queue(
    task_rx: mpsc::Receiver<Task>,
    link_mgr: Arc<dyn links::LinkManager>,
    config: Arc<RwLock<Config>>,
    store: BackendLocal,
) {
    let thread_ctr = Arc::new(AtomicU16::new(0));

    log::debug!("waiting for job");
    while let Ok(task) = task_rx.recv() {
        log::debug!("got the job");
        let link_mgr = link_mgr.clone();
        let thread_counter = thread_ctr.clone();
        let config = config.clone();

        // graceful shutdown
        if let Task::Shutdown = &task {
            while thread_counter.load(Ordering::Relaxed) > 0 {
                sleep(Duration::from_millis(100));
            }
            return;
        };

        let id = save_task(&store, task.clone(), Status::Pending);
        let task_handle = std::thread::spawn({
            let thread_counter = thread_counter.clone();
            let id = id.clone();
            let store = store.clone();
            move || {
                throttle(thread_counter.clone(), config.clone());

                thread_counter.fetch_add(1, Ordering::Relaxed);
                set_status(&store, id.clone(), Status::InProgress);

                // failures are recorded and dropped; resolution is never retried
                let status = task.run(link_mgr, config);
                set_status(&store, id.clone(), status);

                // remove task a bit later to give clients an opportunity to react
                std::thread::spawn(move || {
                    sleep(Duration::from_secs(10));
                    remove_task(&store, id);
                });
            }
        });

        // handle thread panics
        let store = store.clone();
        std::thread::spawn(move || {
            if let Err(err) = task_handle.join() {
                log::error!("task_handle panicked: {err:?}");
                remove_task(&store, id);
            }

            thread_counter.fetch_sub(1, Ordering::Relaxed);
        });
    }
}

pub fn read_queue_dump(store: &BackendLocal) -> QueueDump {
    let empty = || QueueDump {
        queue: vec![],
        now: now(),
    };

    if !store.exists(QUEUE_DUMP_FILE) {
        return empty();
    }

    match store.read(QUEUE_DUMP_FILE) {
        Ok(data) => serde_json::from_slice(&data).unwrap_or_else(|err| {
            log::error!("queue dump is malformed, resetting: {err}");
            empty()
        }),
        Err(err) => {
            log::error!("failed to read queue dump: {err}");
            empty()
        }
    }
}

pub fn write_queue_dump(store: &BackendLocal, queue_dump: &QueueDump) {
    let queue_dump_str = match serde_json::to_string_pretty(&queue_dump) {
        Ok(s) => s,
        Err(err) => {
            log::error!("failed to serialize queue dump: {err}");
            return;
        }
    };

    if let Err(err) = store.write(QUEUE_DUMP_FILE, queue_dump_str.as_bytes()) {
        log::error!("failed to write queue dump: {err}");
    }
}

pub fn remove_task(store: &BackendLocal, id: Eid) {
    let mut queue_dump = read_queue_dump(store);
    queue_dump.queue.retain(|td| td.id != id);
    queue_dump.now = now();
    write_queue_dump(store, &queue_dump);
}

pub fn set_status(store: &BackendLocal, id: Eid, status: Status) {
    let mut queue_dump = read_queue_dump(store);
    if let Some(task_dump) = queue_dump.queue.iter_mut().find(|td| td.id == id) {
        task_dump.status = status;
    }

    queue_dump.now = now();
    write_queue_dump(store, &queue_dump);
}

pub fn save_task(store: &BackendLocal, task: Task, status: Status) -> Eid {
    let eid = Eid::new();

    let task_dump = TaskDump {
        id: eid.clone(),
        task,
        status,
    };

    let mut queue_dump = read_queue_dump(store);

    queue_dump.queue.push(task_dump);
    queue_dump.now = now();
    write_queue_dump(store, &queue_dump);

    eid
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Status {
    Pending,
    InProgress,
    Done,
    Error(String),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueueDump {
    pub queue: Vec<TaskDump>,
    pub now: u128,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskDump {
    pub id: Eid,
    pub task: Task,
    pub status: Status,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Task {
    /// request to resolve the authoritative favicon for a stored link
    ResolveFavicon { link_id: String, url: String },

    /// request to gracefully shutdown task queue
    Shutdown,
}

impl Task {
    pub fn run(&self, link_mgr: Arc<dyn links::LinkManager>, config: Arc<RwLock<Config>>) -> Status {
        match self {
            Task::ResolveFavicon { link_id, url } => {
                let http = config.read().unwrap().http.clone();
                let result = favicon::resolve(&http, url);

                // the service tier equals the placeholder already stored in
                // phase 1; only a better tier is worth a write
                let icon_url = match (&result.url, result.source) {
                    (Some(icon_url), IconSource::Html | IconSource::Root) => icon_url.clone(),
                    _ => {
                        log::debug!(
                            "{url}: keeping placeholder favicon (resolved tier: {})",
                            result.source.as_str()
                        );
                        return Status::Done;
                    }
                };

                match link_mgr.set_favicon_if_current(link_id, url, &icon_url) {
                    Ok(true) => {
                        log::info!("favicon updated for {url}: {}", result.source.as_str());
                        Status::Done
                    }
                    Ok(false) => {
                        log::debug!("{link_id}: url changed during resolution, dropping result");
                        Status::Done
                    }
                    Err(err) => Status::Error(err.to_string()),
                }
            }
            Task::Shutdown => unreachable!(),
        }
    }
}
