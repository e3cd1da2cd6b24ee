use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

use crate::error::AppError;

pub const DEFAULT_CATEGORY: &str = "general";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackingItem {
    pub id: String,
    pub name: String,
    pub category: String,
    pub packed: bool,
}

impl PackingItem {
    pub fn new(name: &str, category: Option<&str>) -> Result<Self, AppError> {
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            name: clean_name(name)?,
            category: clean_category(category),
            packed: false,
        })
    }
}

/// Partial update for a single item; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemChanges {
    pub name: Option<String>,
    pub category: Option<String>,
    pub packed: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PackingProgress {
    pub packed: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PackingList {
    pub id: String,
    pub trip_id: String,
    #[serde(skip)]
    pub owner_id: i64,
    pub items: Json<Vec<PackingItem>>,
    pub updated_at: DateTime<Utc>,
}

impl PackingList {
    pub fn empty(trip_id: impl Into<String>, owner_id: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            trip_id: trip_id.into(),
            owner_id,
            items: Json(Vec::new()),
            updated_at: Utc::now(),
        }
    }

    pub fn items(&self) -> &[PackingItem] {
        &self.items.0
    }

    fn position(&self, item_id: &str) -> Result<usize, AppError> {
        self.items
            .0
            .iter()
            .position(|item| item.id == item_id)
            .ok_or(AppError::NotFound)
    }

    pub fn add_item(&mut self, name: &str, category: Option<&str>) -> Result<&PackingItem, AppError> {
        let item = PackingItem::new(name, category)?;
        self.items.0.push(item);
        self.touch();
        Ok(&self.items.0[self.items.0.len() - 1])
    }

    pub fn toggle_item(&mut self, item_id: &str) -> Result<&PackingItem, AppError> {
        let idx = self.position(item_id)?;
        self.items.0[idx].packed = !self.items.0[idx].packed;
        self.touch();
        Ok(&self.items.0[idx])
    }

    pub fn update_item(&mut self, item_id: &str, changes: ItemChanges) -> Result<&PackingItem, AppError> {
        let idx = self.position(item_id)?;
        let name = changes.name.as_deref().map(clean_name).transpose()?;
        let item = &mut self.items.0[idx];
        if let Some(name) = name {
            item.name = name;
        }
        if let Some(category) = changes.category {
            item.category = clean_category(Some(&category));
        }
        if let Some(packed) = changes.packed {
            item.packed = packed;
        }
        self.touch();
        Ok(&self.items.0[idx])
    }

    pub fn remove_item(&mut self, item_id: &str) -> Result<PackingItem, AppError> {
        let idx = self.position(item_id)?;
        let removed = self.items.0.remove(idx);
        self.touch();
        Ok(removed)
    }

    /// Moves an item to `position`, clamped to the end of the list.
    pub fn move_item(&mut self, item_id: &str, position: usize) -> Result<(), AppError> {
        let idx = self.position(item_id)?;
        let item = self.items.0.remove(idx);
        let target = position.min(self.items.0.len());
        self.items.0.insert(target, item);
        self.touch();
        Ok(())
    }

    /// Drops every packed item and returns how many were removed.
    pub fn clear_packed(&mut self) -> usize {
        let before = self.items.0.len();
        self.items.0.retain(|item| !item.packed);
        let removed = before - self.items.0.len();
        if removed > 0 {
            self.touch();
        }
        removed
    }

    /// Replaces the whole list. Items keep their id when one is supplied.
    pub fn replace_items(&mut self, items: Vec<ItemInput>) -> Result<(), AppError> {
        let mut next = Vec::with_capacity(items.len());
        for input in items {
            let mut item = PackingItem::new(&input.name, input.category.as_deref())?;
            if let Some(id) = input.id.filter(|id| !id.trim().is_empty()) {
                if next.iter().any(|existing: &PackingItem| existing.id == id) {
                    return Err(AppError::Validation(format!("duplicate item id {id}")));
                }
                item.id = id;
            }
            item.packed = input.packed;
            next.push(item);
        }
        self.items = Json(next);
        self.touch();
        Ok(())
    }

    pub fn progress(&self) -> PackingProgress {
        PackingProgress {
            packed: self.items.0.iter().filter(|item| item.packed).count(),
            total: self.items.0.len(),
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemInput {
    pub id: Option<String>,
    pub name: String,
    pub category: Option<String>,
    #[serde(default)]
    pub packed: bool,
}

fn clean_name(name: &str) -> Result<String, AppError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("item name must not be empty".into()));
    }
    if trimmed.chars().count() > 100 {
        return Err(AppError::Validation("item name is too long".into()));
    }
    Ok(trimmed.to_string())
}

fn clean_category(category: Option<&str>) -> String {
    category
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_lowercase)
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string())
}
