use crate::eid::Eid;
use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,

    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub theme: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Serialization surface for API responses. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub theme: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            theme: self.theme.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

pub trait UserManager: Send + Sync {
    fn create(&self, user: User) -> anyhow::Result<User>;
    fn get(&self, id: &str) -> anyhow::Result<Option<User>>;
    fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;
    fn taken(&self, username: &str, email: &str) -> anyhow::Result<bool>;
    fn set_theme(&self, id: &str, theme: &str) -> anyhow::Result<Option<User>>;
}

#[derive(Debug, Clone, Default)]
pub struct BackendCsv {
    list: Arc<RwLock<Vec<User>>>,
    path: PathBuf,
}

const CSV_HEADERS: [&str; 7] = [
    "id",
    "username",
    "email",
    "password_hash",
    "theme",
    "created_at",
    "updated_at",
];

fn parse_ts(value: &str) -> anyhow::Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}

impl BackendCsv {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if let Err(err) = std::fs::metadata(path) {
            match err.kind() {
                ErrorKind::NotFound => {
                    log::info!("creating new user database at {}", path.display());
                    let mut csv_wrt = csv::Writer::from_path(path)?;
                    csv_wrt.write_record(CSV_HEADERS)?;
                    csv_wrt.flush()?;
                }
                _ => Err(err)?,
            }
        }

        let mut csv_reader = csv::Reader::from_path(path)?;

        let mut users = vec![];
        for record in csv_reader.records() {
            let record = record?;
            let field = |idx: usize, name: &str| {
                record
                    .get(idx)
                    .map(str::to_string)
                    .ok_or_else(|| anyhow!("couldnt get user {name}"))
            };

            users.push(User {
                id: field(0, "id")?,
                username: field(1, "username")?,
                email: field(2, "email")?,
                password_hash: field(3, "password_hash")?,
                theme: field(4, "theme")?,
                created_at: parse_ts(&field(5, "created_at")?)?,
                updated_at: parse_ts(&field(6, "updated_at")?)?,
            });
        }

        Ok(BackendCsv {
            list: Arc::new(RwLock::new(users)),
            path: path.to_path_buf(),
        })
    }

    fn save(&self) -> anyhow::Result<()> {
        let users = self.list.read().unwrap();

        let temp_path = self.path.with_extension("csv-tmp");
        let mut csv_wrt = csv::Writer::from_path(&temp_path)?;
        csv_wrt.write_record(CSV_HEADERS)?;
        for user in users.iter() {
            csv_wrt.write_record([
                &user.id,
                &user.username,
                &user.email,
                &user.password_hash,
                &user.theme,
                &user.created_at.to_rfc3339(),
                &user.updated_at.to_rfc3339(),
            ])?;
        }
        csv_wrt.flush()?;
        std::fs::rename(&temp_path, &self.path)?;

        Ok(())
    }
}

impl UserManager for BackendCsv {
    fn create(&self, user: User) -> anyhow::Result<User> {
        self.list.write().unwrap().push(user.clone());
        self.save()?;

        Ok(user)
    }

    fn get(&self, id: &str) -> anyhow::Result<Option<User>> {
        let users = self.list.read().unwrap();
        Ok(users.iter().find(|user| user.id == id).cloned())
    }

    fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let users = self.list.read().unwrap();
        Ok(users.iter().find(|user| user.username == username).cloned())
    }

    fn taken(&self, username: &str, email: &str) -> anyhow::Result<bool> {
        let users = self.list.read().unwrap();
        Ok(users
            .iter()
            .any(|user| user.username == username || user.email == email))
    }

    fn set_theme(&self, id: &str, theme: &str) -> anyhow::Result<Option<User>> {
        let mut users = self.list.write().unwrap();

        let Some(user) = users.iter_mut().find(|user| user.id == id) else {
            return Ok(None);
        };

        user.theme = theme.to_string();
        user.updated_at = Utc::now();
        let result = user.clone();
        drop(users);

        self.save()?;

        Ok(Some(result))
    }
}

/// Builds a new user row; the caller supplies an already-hashed password.
pub fn new_user(username: String, email: String, password_hash: String) -> User {
    let now = Utc::now();
    User {
        id: Eid::new().into(),
        username,
        email,
        password_hash,
        theme: "light".to_string(),
        created_at: now,
        updated_at: now,
    }
}
