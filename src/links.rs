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
pub struct Link {
    pub id: String,
    pub user_id: String,

    pub category_id: Option<String>,
    pub title: String,
    pub url: String,
    pub favicon_url: Option<String>,
    pub order_index: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LinkCreate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LinkUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// `Some("")` detaches the link from its category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub favicon_url: Option<String>,
}

pub trait LinkManager: Send + Sync {
    /// Links for one user, optionally narrowed to a category, ordered by
    /// their sequence position.
    fn list(&self, user_id: &str, category_id: Option<&str>) -> anyhow::Result<Vec<Link>>;
    fn get(&self, user_id: &str, id: &str) -> anyhow::Result<Option<Link>>;
    fn create(
        &self,
        user_id: &str,
        create: LinkCreate,
        favicon_url: String,
    ) -> anyhow::Result<Link>;
    fn update(&self, user_id: &str, id: &str, update: LinkUpdate)
        -> anyhow::Result<Option<Link>>;
    fn delete(&self, user_id: &str, id: &str) -> anyhow::Result<bool>;
    /// Reassigns order indexes by position in `ids`; unknown or foreign
    /// ids are skipped. Returns the number of rows touched.
    fn reorder(&self, user_id: &str, ids: &[String]) -> anyhow::Result<usize>;
    /// Clears the category of every link in it. Used when a category is
    /// deleted; its links survive uncategorized.
    fn detach_category(&self, user_id: &str, category_id: &str) -> anyhow::Result<usize>;
    /// Writes a favicon only if the link's URL still equals the URL the
    /// resolution ran against. Guards the detached second phase against
    /// overwriting a newer URL's placeholder.
    fn set_favicon_if_current(
        &self,
        id: &str,
        resolved_for: &str,
        favicon_url: &str,
    ) -> anyhow::Result<bool>;
}

#[derive(Debug, Clone, Default)]
pub struct BackendCsv {
    list: Arc<RwLock<Vec<Link>>>,
    path: PathBuf,
}

const CSV_HEADERS: [&str; 9] = [
    "id",
    "user_id",
    "category_id",
    "title",
    "url",
    "favicon_url",
    "order_index",
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
                    log::info!("creating new link database at {}", path.display());
                    let mut csv_wrt = csv::Writer::from_path(path)?;
                    csv_wrt.write_record(CSV_HEADERS)?;
                    csv_wrt.flush()?;
                }
                _ => Err(err)?,
            }
        }

        let mut csv_reader = csv::Reader::from_path(path)?;

        let mut links = vec![];
        for record in csv_reader.records() {
            let record = record?;
            let field = |idx: usize, name: &str| {
                record
                    .get(idx)
                    .map(str::to_string)
                    .ok_or_else(|| anyhow!("couldnt get link {name}"))
            };

            let category_id = field(2, "category_id")?;
            let favicon_url = field(5, "favicon_url")?;

            links.push(Link {
                id: field(0, "id")?,
                user_id: field(1, "user_id")?,
                category_id: if category_id.is_empty() {
                    None
                } else {
                    Some(category_id)
                },
                title: field(3, "title")?,
                url: field(4, "url")?,
                favicon_url: if favicon_url.is_empty() {
                    None
                } else {
                    Some(favicon_url)
                },
                order_index: field(6, "order_index")?.parse()?,
                created_at: parse_ts(&field(7, "created_at")?)?,
                updated_at: parse_ts(&field(8, "updated_at")?)?,
            });
        }

        Ok(BackendCsv {
            list: Arc::new(RwLock::new(links)),
            path: path.to_path_buf(),
        })
    }

    fn save(&self) -> anyhow::Result<()> {
        let links = self.list.read().unwrap();

        let temp_path = self.path.with_extension("csv-tmp");
        let mut csv_wrt = csv::Writer::from_path(&temp_path)?;
        csv_wrt.write_record(CSV_HEADERS)?;
        for link in links.iter() {
            csv_wrt.write_record([
                &link.id,
                &link.user_id,
                &link.category_id.clone().unwrap_or_default(),
                &link.title,
                &link.url,
                &link.favicon_url.clone().unwrap_or_default(),
                &link.order_index.to_string(),
                &link.created_at.to_rfc3339(),
                &link.updated_at.to_rfc3339(),
            ])?;
        }
        csv_wrt.flush()?;
        std::fs::rename(&temp_path, &self.path)?;

        Ok(())
    }
}

impl LinkManager for BackendCsv {
    fn list(&self, user_id: &str, category_id: Option<&str>) -> anyhow::Result<Vec<Link>> {
        let links = self.list.read().unwrap();

        let mut output = links
            .iter()
            .filter(|link| link.user_id == user_id)
            .filter(|link| {
                category_id.map_or(true, |category| {
                    link.category_id.as_deref() == Some(category)
                })
            })
            .cloned()
            .collect::<Vec<_>>();
        output.sort_by_key(|link| link.order_index);

        Ok(output)
    }

    fn get(&self, user_id: &str, id: &str) -> anyhow::Result<Option<Link>> {
        let links = self.list.read().unwrap();
        Ok(links
            .iter()
            .find(|link| link.user_id == user_id && link.id == id)
            .cloned())
    }

    fn create(
        &self,
        user_id: &str,
        create: LinkCreate,
        favicon_url: String,
    ) -> anyhow::Result<Link> {
        let mut links = self.list.write().unwrap();

        let next_order = links
            .iter()
            .filter(|link| link.user_id == user_id)
            .map(|link| link.order_index)
            .max()
            .map_or(0, |max| max + 1);

        let now = Utc::now();
        let link = Link {
            id: Eid::new().into(),
            user_id: user_id.to_string(),
            category_id: create.category_id.filter(|category| !category.is_empty()),
            title: create.title.unwrap_or_else(|| create.url.clone()),
            url: create.url,
            favicon_url: Some(favicon_url),
            order_index: next_order,
            created_at: now,
            updated_at: now,
        };

        links.push(link.clone());
        drop(links);

        self.save()?;

        Ok(link)
    }

    fn update(
        &self,
        user_id: &str,
        id: &str,
        update: LinkUpdate,
    ) -> anyhow::Result<Option<Link>> {
        let mut links = self.list.write().unwrap();

        let Some(link) = links
            .iter_mut()
            .find(|link| link.user_id == user_id && link.id == id)
        else {
            return Ok(None);
        };

        if let Some(title) = update.title {
            link.title = title;
        }
        if let Some(url) = update.url {
            link.url = url;
        }
        if let Some(category_id) = update.category_id {
            link.category_id = if category_id.is_empty() {
                None
            } else {
                Some(category_id)
            };
        }
        if let Some(favicon_url) = update.favicon_url {
            link.favicon_url = Some(favicon_url);
        }
        link.updated_at = Utc::now();

        let result = link.clone();
        drop(links);

        self.save()?;

        Ok(Some(result))
    }

    fn delete(&self, user_id: &str, id: &str) -> anyhow::Result<bool> {
        let mut links = self.list.write().unwrap();

        let before = links.len();
        links.retain(|link| !(link.user_id == user_id && link.id == id));
        let removed = links.len() != before;
        drop(links);

        if removed {
            self.save()?;
        }

        Ok(removed)
    }

    fn reorder(&self, user_id: &str, ids: &[String]) -> anyhow::Result<usize> {
        let mut links = self.list.write().unwrap();

        let mut count = 0;
        for (position, id) in ids.iter().enumerate() {
            if let Some(link) = links
                .iter_mut()
                .find(|link| link.user_id == user_id && &link.id == id)
            {
                link.order_index = position as i64;
                link.updated_at = Utc::now();
                count += 1;
            }
        }
        drop(links);

        if count > 0 {
            self.save()?;
        }

        Ok(count)
    }

    fn detach_category(&self, user_id: &str, category_id: &str) -> anyhow::Result<usize> {
        let mut links = self.list.write().unwrap();

        let mut count = 0;
        for link in links.iter_mut() {
            if link.user_id == user_id && link.category_id.as_deref() == Some(category_id) {
                link.category_id = None;
                link.updated_at = Utc::now();
                count += 1;
            }
        }
        drop(links);

        if count > 0 {
            self.save()?;
        }

        Ok(count)
    }

    fn set_favicon_if_current(
        &self,
        id: &str,
        resolved_for: &str,
        favicon_url: &str,
    ) -> anyhow::Result<bool> {
        let mut links = self.list.write().unwrap();

        let Some(link) = links.iter_mut().find(|link| link.id == id) else {
            return Ok(false);
        };

        // the URL changed while resolution was in flight; a newer
        // placeholder (and resolution) owns the field now
        if link.url != resolved_for {
            return Ok(false);
        }

        link.favicon_url = Some(favicon_url.to_string());
        link.updated_at = Utc::now();
        drop(links);

        self.save()?;

        Ok(true)
    }
}
