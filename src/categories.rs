use crate::eid::Eid;
use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

const DEFAULT_COLOR: &str = "#3B82F6";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub user_id: String,

    pub name: String,
    pub color: String,
    pub order_index: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CategoryCreate {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CategoryUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

pub trait CategoryManager: Send + Sync {
    /// Categories for one user, ordered by their sequence position.
    fn list(&self, user_id: &str) -> anyhow::Result<Vec<Category>>;
    fn get(&self, user_id: &str, id: &str) -> anyhow::Result<Option<Category>>;
    fn create(&self, user_id: &str, create: CategoryCreate) -> anyhow::Result<Category>;
    fn update(
        &self,
        user_id: &str,
        id: &str,
        update: CategoryUpdate,
    ) -> anyhow::Result<Option<Category>>;
    fn delete(&self, user_id: &str, id: &str) -> anyhow::Result<bool>;
    /// Reassigns order indexes by position in `ids`; unknown or foreign
    /// ids are skipped. Returns the number of rows touched.
    fn reorder(&self, user_id: &str, ids: &[String]) -> anyhow::Result<usize>;
}

#[derive(Debug, Clone, Default)]
pub struct BackendCsv {
    list: Arc<RwLock<Vec<Category>>>,
    path: PathBuf,
}

const CSV_HEADERS: [&str; 7] = [
    "id",
    "user_id",
    "name",
    "color",
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
                    log::info!("creating new category database at {}", path.display());
                    let mut csv_wrt = csv::Writer::from_path(path)?;
                    csv_wrt.write_record(CSV_HEADERS)?;
                    csv_wrt.flush()?;
                }
                _ => Err(err)?,
            }
        }

        let mut csv_reader = csv::Reader::from_path(path)?;

        let mut categories = vec![];
        for record in csv_reader.records() {
            let record = record?;
            let field = |idx: usize, name: &str| {
                record
                    .get(idx)
                    .map(str::to_string)
                    .ok_or_else(|| anyhow!("couldnt get category {name}"))
            };

            categories.push(Category {
                id: field(0, "id")?,
                user_id: field(1, "user_id")?,
                name: field(2, "name")?,
                color: field(3, "color")?,
                order_index: field(4, "order_index")?.parse()?,
                created_at: parse_ts(&field(5, "created_at")?)?,
                updated_at: parse_ts(&field(6, "updated_at")?)?,
            });
        }

        Ok(BackendCsv {
            list: Arc::new(RwLock::new(categories)),
            path: path.to_path_buf(),
        })
    }

    fn save(&self) -> anyhow::Result<()> {
        let categories = self.list.read().unwrap();

        let temp_path = self.path.with_extension("csv-tmp");
        let mut csv_wrt = csv::Writer::from_path(&temp_path)?;
        csv_wrt.write_record(CSV_HEADERS)?;
        for category in categories.iter() {
            csv_wrt.write_record([
                &category.id,
                &category.user_id,
                &category.name,
                &category.color,
                &category.order_index.to_string(),
                &category.created_at.to_rfc3339(),
                &category.updated_at.to_rfc3339(),
            ])?;
        }
        csv_wrt.flush()?;
        std::fs::rename(&temp_path, &self.path)?;

        Ok(())
    }
}

impl CategoryManager for BackendCsv {
    fn list(&self, user_id: &str) -> anyhow::Result<Vec<Category>> {
        let categories = self.list.read().unwrap();

        let mut output = categories
            .iter()
            .filter(|category| category.user_id == user_id)
            .cloned()
            .collect::<Vec<_>>();
        output.sort_by_key(|category| category.order_index);

        Ok(output)
    }

    fn get(&self, user_id: &str, id: &str) -> anyhow::Result<Option<Category>> {
        let categories = self.list.read().unwrap();
        Ok(categories
            .iter()
            .find(|category| category.user_id == user_id && category.id == id)
            .cloned())
    }

    fn create(&self, user_id: &str, create: CategoryCreate) -> anyhow::Result<Category> {
        let mut categories = self.list.write().unwrap();

        // new entries go to the end of the user's sequence
        let next_order = categories
            .iter()
            .filter(|category| category.user_id == user_id)
            .map(|category| category.order_index)
            .max()
            .map_or(0, |max| max + 1);

        let now = Utc::now();
        let category = Category {
            id: Eid::new().into(),
            user_id: user_id.to_string(),
            name: create.name,
            color: create.color.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
            order_index: next_order,
            created_at: now,
            updated_at: now,
        };

        categories.push(category.clone());
        drop(categories);

        self.save()?;

        Ok(category)
    }

    fn update(
        &self,
        user_id: &str,
        id: &str,
        update: CategoryUpdate,
    ) -> anyhow::Result<Option<Category>> {
        let mut categories = self.list.write().unwrap();

        let Some(category) = categories
            .iter_mut()
            .find(|category| category.user_id == user_id && category.id == id)
        else {
            return Ok(None);
        };

        if let Some(name) = update.name {
            category.name = name;
        }
        if let Some(color) = update.color {
            category.color = color;
        }
        category.updated_at = Utc::now();

        let result = category.clone();
        drop(categories);

        self.save()?;

        Ok(Some(result))
    }

    fn delete(&self, user_id: &str, id: &str) -> anyhow::Result<bool> {
        let mut categories = self.list.write().unwrap();

        let before = categories.len();
        categories.retain(|category| !(category.user_id == user_id && category.id == id));
        let removed = categories.len() != before;
        drop(categories);

        if removed {
            self.save()?;
        }

        Ok(removed)
    }

    fn reorder(&self, user_id: &str, ids: &[String]) -> anyhow::Result<usize> {
        let mut categories = self.list.write().unwrap();

        let mut count = 0;
        for (position, id) in ids.iter().enumerate() {
            if let Some(category) = categories
                .iter_mut()
                .find(|category| category.user_id == user_id && &category.id == id)
            {
                category.order_index = position as i64;
                category.updated_at = Utc::now();
                count += 1;
            }
        }
        drop(categories);

        if count > 0 {
            self.save()?;
        }

        Ok(count)
    }
}
