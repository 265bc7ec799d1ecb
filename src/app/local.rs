use std::{
    collections::HashMap,
    path::Path,
    sync::{mpsc, Arc, RwLock},
};

use chrono::{DateTime, Duration, Utc};

use crate::{
    app::{
        errors::AppError,
        task_runner::{self, Task},
    },
    auth,
    categories::{self, Category, CategoryCreate, CategoryManager, CategoryUpdate},
    config::Config,
    favicon::{self, IconResult},
    links::{self, Link, LinkCreate, LinkManager, LinkUpdate},
    storage,
    users::{self, PublicUser, UserManager},
};

struct Session {
    user_id: String,
    expires_at: DateTime<Utc>,
}

pub struct AppLocal {
    pub user_mgr: Arc<dyn UserManager>,
    pub category_mgr: Arc<dyn CategoryManager>,
    pub link_mgr: Arc<dyn LinkManager>,

    /// token -> session; tokens are opaque and die with the process
    sessions: Arc<RwLock<HashMap<String, Session>>>,

    task_tx: Option<Arc<mpsc::Sender<Task>>>,
    task_queue_handle: Option<std::thread::JoinHandle<()>>,

    config: Arc<RwLock<Config>>,
    store: storage::BackendLocal,
}

impl AppLocal {
    pub fn new(config: Arc<RwLock<Config>>, data_dir: &Path) -> anyhow::Result<Self> {
        let store = storage::BackendLocal::new(data_dir)?;

        let user_mgr: Arc<dyn UserManager> =
            Arc::new(users::BackendCsv::load(&data_dir.join("users.csv"))?);
        let category_mgr: Arc<dyn CategoryManager> =
            Arc::new(categories::BackendCsv::load(&data_dir.join("categories.csv"))?);
        let link_mgr: Arc<dyn LinkManager> =
            Arc::new(links::BackendCsv::load(&data_dir.join("links.csv"))?);

        Ok(Self {
            user_mgr,
            category_mgr,
            link_mgr,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            task_tx: None,
            task_queue_handle: None,
            config,
            store,
        })
    }

    pub fn run_queue(&mut self) {
        let (task_tx, task_rx) = mpsc::channel::<Task>();
        let handle = std::thread::spawn({
            let link_mgr = self.link_mgr.clone();
            let config = self.config.clone();
            let store = self.store.clone();

            move || {
                task_runner::start_queue(task_rx, link_mgr, config, store);
            }
        });

        self.task_queue_handle = Some(handle);
        self.task_tx = Some(Arc::new(task_tx));
    }

    pub fn shutdown(&self) {
        if let Some(task_tx) = self.task_tx.as_ref() {
            if let Err(err) = task_tx.send(Task::Shutdown) {
                log::error!("{err}");
            }
        }
    }

    pub fn wait_task_queue_finish(&mut self) {
        if let Some(handle) = self.task_queue_handle.take() {
            if let Err(err) = handle.join() {
                log::error!("task queue panicked: {err:?}");
            }
        }
    }

    pub fn config(&self) -> Arc<RwLock<Config>> {
        self.config.clone()
    }
}

// --- accounts & sessions ---

impl AppLocal {
    pub fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(PublicUser, String), AppError> {
        if username.is_empty() || email.is_empty() || password.is_empty() {
            return Err(AppError::Validation("all fields are required".to_string()));
        }

        if self.user_mgr.taken(username, email)? {
            return Err(AppError::Conflict(
                "username or email already exists".to_string(),
            ));
        }

        let user = self.user_mgr.create(users::new_user(
            username.to_string(),
            email.to_string(),
            auth::hash_password(password),
        ))?;

        let token = self.issue_session(&user.id);

        Ok((user.public(), token))
    }

    pub fn login(&self, username: &str, password: &str) -> Result<(PublicUser, String), AppError> {
        let user = self
            .user_mgr
            .find_by_username(username)?
            .ok_or(AppError::InvalidCredentials)?;

        if !auth::verify_password(password, &user.password_hash) {
            return Err(AppError::InvalidCredentials);
        }

        let token = self.issue_session(&user.id);

        Ok((user.public(), token))
    }

    pub fn logout(&self, token: &str) {
        self.sessions.write().unwrap().remove(token);
    }

    /// Maps a bearer token to a user id, expiring stale sessions as a
    /// side effect.
    pub fn authenticate(&self, token: &str) -> Result<String, AppError> {
        let mut sessions = self.sessions.write().unwrap();

        let Some(session) = sessions.get(token) else {
            return Err(AppError::Unauthorized);
        };

        if session.expires_at < Utc::now() {
            sessions.remove(token);
            return Err(AppError::Unauthorized);
        }

        Ok(session.user_id.clone())
    }

    pub fn me(&self, user_id: &str) -> Result<PublicUser, AppError> {
        self.user_mgr
            .get(user_id)?
            .map(|user| user.public())
            .ok_or(AppError::NotFound("user"))
    }

    pub fn set_theme(&self, user_id: &str, theme: &str) -> Result<PublicUser, AppError> {
        if !["light", "dark"].contains(&theme) {
            return Err(AppError::Validation("invalid theme".to_string()));
        }

        self.user_mgr
            .set_theme(user_id, theme)?
            .map(|user| user.public())
            .ok_or(AppError::NotFound("user"))
    }

    fn issue_session(&self, user_id: &str) -> String {
        let token = auth::generate_token();
        let ttl_days = self.config.read().unwrap().session_ttl_days;

        self.sessions.write().unwrap().insert(
            token.clone(),
            Session {
                user_id: user_id.to_string(),
                expires_at: Utc::now() + Duration::days(ttl_days),
            },
        );

        token
    }
}

// --- categories ---

impl AppLocal {
    pub fn list_categories(&self, user_id: &str) -> Result<Vec<Category>, AppError> {
        Ok(self.category_mgr.list(user_id)?)
    }

    pub fn create_category(
        &self,
        user_id: &str,
        create: CategoryCreate,
    ) -> Result<Category, AppError> {
        if create.name.is_empty() {
            return Err(AppError::Validation("name is required".to_string()));
        }

        Ok(self.category_mgr.create(user_id, create)?)
    }

    pub fn update_category(
        &self,
        user_id: &str,
        id: &str,
        update: CategoryUpdate,
    ) -> Result<Category, AppError> {
        self.category_mgr
            .update(user_id, id, update)?
            .ok_or(AppError::NotFound("category"))
    }

    /// Deletes a category; its links survive uncategorized.
    pub fn delete_category(&self, user_id: &str, id: &str) -> Result<(), AppError> {
        if !self.category_mgr.delete(user_id, id)? {
            return Err(AppError::NotFound("category"));
        }

        let detached = self.link_mgr.detach_category(user_id, id)?;
        if detached > 0 {
            log::debug!("category {id}: detached {detached} links");
        }

        Ok(())
    }

    pub fn reorder_categories(&self, user_id: &str, ids: &[String]) -> Result<usize, AppError> {
        Ok(self.category_mgr.reorder(user_id, ids)?)
    }
}

// --- links & the two-phase favicon coordinator ---

impl AppLocal {
    pub fn list_links(
        &self,
        user_id: &str,
        category_id: Option<&str>,
    ) -> Result<Vec<Link>, AppError> {
        Ok(self.link_mgr.list(user_id, category_id)?)
    }

    /// Creates a link. Phase 1 of favicon resolution happens here: the
    /// deterministic service placeholder is computed without network I/O
    /// and stored before this call returns. Phase 2 (the full three-tier
    /// resolution) is handed to the task queue and never awaited.
    pub fn create_link(&self, user_id: &str, create: LinkCreate) -> Result<Link, AppError> {
        if create.url.is_empty() {
            return Err(AppError::Validation("url is required".to_string()));
        }

        let http = self.config.read().unwrap().http.clone();
        let placeholder = favicon::resolve_placeholder(&http, &create.url)
            .ok_or_else(|| favicon::InvalidUrl(create.url.clone()))?;

        if let Some(category_id) = create.category_id.as_deref().filter(|id| !id.is_empty()) {
            self.category_mgr
                .get(user_id, category_id)?
                .ok_or(AppError::NotFound("category"))?;
        }

        let link = self.link_mgr.create(user_id, create, placeholder)?;

        self.schedule_resolve(&link.id, &link.url);

        Ok(link)
    }

    /// Updates a link. A URL change re-runs both favicon phases exactly
    /// as a create does; anything else leaves the stored favicon alone.
    pub fn update_link(
        &self,
        user_id: &str,
        id: &str,
        mut update: LinkUpdate,
    ) -> Result<Link, AppError> {
        let existing = self
            .link_mgr
            .get(user_id, id)?
            .ok_or(AppError::NotFound("link"))?;

        let url_changed = update
            .url
            .as_deref()
            .map_or(false, |url| !url.is_empty() && url != existing.url);

        if url_changed {
            let url = update.url.clone().unwrap_or_default();
            let http = self.config.read().unwrap().http.clone();
            update.favicon_url = Some(
                favicon::resolve_placeholder(&http, &url)
                    .ok_or_else(|| favicon::InvalidUrl(url.clone()))?,
            );
        } else {
            update.url = None;
            update.favicon_url = None;
        }

        if let Some(category_id) = update.category_id.as_deref().filter(|id| !id.is_empty()) {
            self.category_mgr
                .get(user_id, category_id)?
                .ok_or(AppError::NotFound("category"))?;
        }

        let link = self
            .link_mgr
            .update(user_id, id, update)?
            .ok_or(AppError::NotFound("link"))?;

        if url_changed {
            self.schedule_resolve(&link.id, &link.url);
        }

        Ok(link)
    }

    pub fn delete_link(&self, user_id: &str, id: &str) -> Result<(), AppError> {
        if !self.link_mgr.delete(user_id, id)? {
            return Err(AppError::NotFound("link"));
        }

        Ok(())
    }

    pub fn reorder_links(&self, user_id: &str, ids: &[String]) -> Result<usize, AppError> {
        Ok(self.link_mgr.reorder(user_id, ids)?)
    }

    /// On-demand re-resolution: runs the full orchestrator in the request
    /// path and reports which tier produced the icon. A total failure
    /// (`url: null`) keeps the stored favicon instead of erasing it.
    pub fn refresh_favicon(
        &self,
        user_id: &str,
        id: &str,
    ) -> Result<(Link, IconResult), AppError> {
        let existing = self
            .link_mgr
            .get(user_id, id)?
            .ok_or(AppError::NotFound("link"))?;

        let http = self.config.read().unwrap().http.clone();
        let result = favicon::resolve(&http, &existing.url);

        let link = match result.url.clone() {
            Some(icon_url) => self
                .link_mgr
                .update(
                    user_id,
                    id,
                    LinkUpdate {
                        favicon_url: Some(icon_url),
                        ..Default::default()
                    },
                )?
                .ok_or(AppError::NotFound("link"))?,
            None => existing,
        };

        Ok((link, result))
    }

    fn schedule_resolve(&self, link_id: &str, url: &str) {
        let Some(task_tx) = self.task_tx.as_ref() else {
            log::debug!("task queue not running; favicon for {url} stays at the placeholder");
            return;
        };

        if let Err(err) = task_tx.send(Task::ResolveFavicon {
            link_id: link_id.to_string(),
            url: url.to_string(),
        }) {
            log::error!("{err}");
        }
    }
}
