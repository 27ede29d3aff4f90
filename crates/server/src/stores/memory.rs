//! In-memory store implementations.
//!
//! These back the service-level and HTTP-level tests with the same contracts
//! as the Postgres stores: unique emails and item names, newest-first
//! listings, and compare-and-swap cart saves.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use bodega_core::{Email, ItemId, UserId};

use crate::models::{Cart, Item, Role, User};

use super::{
    CartStore, CatalogReader, CatalogStore, CredentialStore, ItemFilter, NewItem, NewUser, Page,
    RepositoryError,
};

/// In-memory credential store.
#[derive(Default)]
pub struct InMemoryUsers {
    users: Mutex<Vec<(User, String)>>,
}

impl InMemoryUsers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user directly, bypassing registration (test seeding).
    pub fn seed(&self, user: User, password_hash: String) {
        self.users
            .lock()
            .expect("users lock poisoned")
            .push((user, password_hash));
    }
}

#[async_trait]
impl CredentialStore for InMemoryUsers {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let users = self.users.lock().expect("users lock poisoned");
        Ok(users.iter().find(|(u, _)| u.id == id).map(|(u, _)| u.clone()))
    }

    async fn find_with_password(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let users = self.users.lock().expect("users lock poisoned");
        Ok(users.iter().find(|(u, _)| &u.email == email).cloned())
    }

    async fn create(&self, new_user: NewUser) -> Result<User, RepositoryError> {
        let mut users = self.users.lock().expect("users lock poisoned");
        if users.iter().any(|(u, _)| u.email == new_user.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }
        let user = User {
            id: UserId::generate(),
            email: new_user.email,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            role: Role::User,
            created_at: Utc::now(),
        };
        users.push((user.clone(), new_user.password_hash));
        Ok(user)
    }
}

/// In-memory catalog store.
#[derive(Default)]
pub struct InMemoryCatalog {
    items: Mutex<Vec<Item>>,
}

impl InMemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an item directly (test seeding).
    pub fn seed(&self, item: Item) {
        self.items
            .lock()
            .expect("items lock poisoned")
            .push(item);
    }
}

#[async_trait]
impl CatalogReader for InMemoryCatalog {
    async fn find_by_id(&self, id: ItemId) -> Result<Option<Item>, RepositoryError> {
        let items = self.items.lock().expect("items lock poisoned");
        Ok(items.iter().find(|i| i.id == id).cloned())
    }
}

fn matches(filter: &ItemFilter, item: &Item) -> bool {
    if let Some(category) = filter.category
        && item.category != category
    {
        return false;
    }
    if let Some(min) = filter.min_price
        && item.price.amount() < min
    {
        return false;
    }
    if let Some(max) = filter.max_price
        && item.price.amount() > max
    {
        return false;
    }
    if let Some(search) = &filter.search
        && !item.name.to_lowercase().contains(&search.to_lowercase())
    {
        return false;
    }
    true
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn find_by_name(&self, name: &str) -> Result<Option<Item>, RepositoryError> {
        let items = self.items.lock().expect("items lock poisoned");
        Ok(items.iter().find(|i| i.name == name).cloned())
    }

    async fn create(&self, new_item: NewItem) -> Result<Item, RepositoryError> {
        let mut items = self.items.lock().expect("items lock poisoned");
        if items.iter().any(|i| i.name == new_item.name) {
            return Err(RepositoryError::Conflict(
                "item name already exists".to_owned(),
            ));
        }
        let now = Utc::now();
        let item = Item {
            id: ItemId::generate(),
            name: new_item.name,
            description: new_item.description,
            price: new_item.price,
            category: new_item.category,
            image_url: new_item.image_url,
            image_public_id: None,
            stock: new_item.stock,
            created_at: now,
            updated_at: now,
        };
        items.push(item.clone());
        Ok(item)
    }

    async fn update(&self, item: &Item) -> Result<bool, RepositoryError> {
        let mut items = self.items.lock().expect("items lock poisoned");
        if items
            .iter()
            .any(|i| i.id != item.id && i.name == item.name)
        {
            return Err(RepositoryError::Conflict(
                "item name already exists".to_owned(),
            ));
        }
        match items.iter_mut().find(|i| i.id == item.id) {
            Some(stored) => {
                *stored = Item {
                    updated_at: Utc::now(),
                    ..item.clone()
                };
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: ItemId) -> Result<Option<Item>, RepositoryError> {
        let mut items = self.items.lock().expect("items lock poisoned");
        let pos = items.iter().position(|i| i.id == id);
        Ok(pos.map(|p| items.remove(p)))
    }

    async fn list(
        &self,
        filter: &ItemFilter,
        page: Page,
    ) -> Result<(Vec<Item>, u64), RepositoryError> {
        let items = self.items.lock().expect("items lock poisoned");
        let mut matching: Vec<Item> = items.iter().filter(|i| matches(filter, i)).cloned().collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = matching.len() as u64;
        let page_items = matching
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.size as usize)
            .collect();
        Ok((page_items, total))
    }
}

/// In-memory cart store with compare-and-swap saves.
#[derive(Default)]
pub struct InMemoryCarts {
    carts: Mutex<HashMap<UserId, Cart>>,
}

impl InMemoryCarts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CartStore for InMemoryCarts {
    async fn find_by_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let carts = self.carts.lock().expect("carts lock poisoned");
        Ok(carts.get(&user_id).cloned())
    }

    async fn save(&self, cart: &Cart) -> Result<(), RepositoryError> {
        let mut carts = self.carts.lock().expect("carts lock poisoned");
        let stored_version = carts.get(&cart.user_id).map(|c| c.version);
        match stored_version {
            None if cart.version == 0 => {}
            Some(v) if v == cart.version => {}
            _ => return Err(RepositoryError::VersionConflict),
        }
        let mut saved = cart.clone();
        saved.version = cart.version + 1;
        saved.updated_at = Utc::now();
        carts.insert(cart.user_id, saved);
        Ok(())
    }
}
