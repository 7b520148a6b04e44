//! Per-user favorite dishes.

use std::sync::Arc;

use crate::backend::{Backend, BackendResult};
use crate::cart::{CartError, CartStore};
use crate::catalog::Catalog;
use crate::model::Dish;

pub struct Favorites {
    backend: Arc<dyn Backend>,
    user_id: String,
}

impl Favorites {
    pub fn new(backend: Arc<dyn Backend>, user_id: impl Into<String>) -> Self {
        Self {
            backend,
            user_id: user_id.into(),
        }
    }

    pub async fn ids(&self) -> BackendResult<Vec<String>> {
        self.backend.favorites(&self.user_id).await
    }

    /// Favorite dishes still present in `catalog`, in favorite order.
    pub async fn dishes<'a>(&self, catalog: &'a Catalog) -> BackendResult<Vec<&'a Dish>> {
        let ids = self.ids().await?;
        Ok(ids.iter().filter_map(|id| catalog.find(id)).collect())
    }

    /// Flips the favorite flag and returns the new state.
    pub async fn toggle(&self, dish_id: &str) -> BackendResult<bool> {
        let is_favorite = self.ids().await?.iter().any(|id| id == dish_id);
        if is_favorite {
            self.backend.remove_favorite(&self.user_id, dish_id).await?;
        } else {
            self.backend.add_favorite(&self.user_id, dish_id).await?;
        }
        tracing::debug!(dish_id, favorite = !is_favorite, "favorite toggled");
        Ok(!is_favorite)
    }
}

/// Adds one of each dish to the cart. Returns how many were added.
pub fn add_all_to_cart(dishes: &[&Dish], store: &mut CartStore) -> Result<usize, CartError> {
    for dish in dishes {
        store.add(dish)?;
    }
    Ok(dishes.len())
}
