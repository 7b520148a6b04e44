//! Client-held cart persisted as JSON.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Dish;

/// Largest quantity a single cart line can hold.
pub const MAX_LINE_QUANTITY: u32 = 99;

#[derive(Debug, Error)]
pub enum CartError {
    #[error("cart storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cart encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One dish in the cart. Stored flattened as the dish record plus `quantity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    #[serde(flatten)]
    pub dish: Dish,
    pub quantity: u32,
}

impl CartLine {
    pub fn line_total(&self) -> u64 {
        u64::from(self.dish.price) * u64::from(self.quantity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// New line with quantity 1.
    Added,
    /// Existing line bumped to `quantity`.
    Incremented { quantity: u32 },
}

/// Ordered cart lines. Totals are always derived from the lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn get(&self, dish_id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.dish.id == dish_id)
    }

    pub fn add(&mut self, dish: &Dish) -> AddOutcome {
        match self.lines.iter_mut().find(|line| line.dish.id == dish.id) {
            Some(line) => {
                line.quantity = line.quantity.saturating_add(1).min(MAX_LINE_QUANTITY);
                AddOutcome::Incremented {
                    quantity: line.quantity,
                }
            }
            None => {
                self.lines.push(CartLine {
                    dish: dish.clone(),
                    quantity: 1,
                });
                AddOutcome::Added
            }
        }
    }

    /// Returns whether a line was removed.
    pub fn remove(&mut self, dish_id: &str) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| line.dish.id != dish_id);
        self.lines.len() != before
    }

    /// Sets the quantity of an existing line. Zero or less removes it and
    /// larger values are capped at [`MAX_LINE_QUANTITY`]; unknown ids are
    /// ignored. Returns whether the cart changed.
    pub fn update_quantity(&mut self, dish_id: &str, quantity: i64) -> bool {
        if quantity <= 0 {
            return self.remove(dish_id);
        }
        let quantity = u32::try_from(quantity)
            .unwrap_or(u32::MAX)
            .min(MAX_LINE_QUANTITY);
        match self.lines.iter_mut().find(|line| line.dish.id == dish_id) {
            Some(line) if line.quantity != quantity => {
                line.quantity = quantity;
                true
            }
            _ => false,
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn total_price(&self) -> u64 {
        self.lines
            .iter()
            .map(CartLine::line_total)
            .fold(0, u64::saturating_add)
    }

    pub fn total_items(&self) -> u32 {
        self.lines
            .iter()
            .map(|line| line.quantity)
            .fold(0, u32::saturating_add)
    }
}

/// A [`Cart`] written back to disk after every change.
#[derive(Debug)]
pub struct CartStore {
    path: PathBuf,
    cart: Cart,
}

impl CartStore {
    /// Opens the cart file. A missing file is an empty cart; an unreadable
    /// one is logged and replaced on the next write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CartError> {
        let path = path.into();
        let cart = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(cart) => cart,
                Err(e) => {
                    tracing::warn!("discarding unreadable cart at {}: {e}", path.display());
                    Cart::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Cart::default(),
            Err(e) => return Err(CartError::Io(e)),
        };
        Ok(Self { path, cart })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn lines(&self) -> &[CartLine] {
        self.cart.lines()
    }

    pub fn is_empty(&self) -> bool {
        self.cart.is_empty()
    }

    pub fn total_price(&self) -> u64 {
        self.cart.total_price()
    }

    pub fn total_items(&self) -> u32 {
        self.cart.total_items()
    }

    pub fn add(&mut self, dish: &Dish) -> Result<AddOutcome, CartError> {
        let outcome = self.cart.add(dish);
        self.save()?;
        tracing::debug!(dish_id = %dish.id, ?outcome, "cart add");
        Ok(outcome)
    }

    pub fn remove(&mut self, dish_id: &str) -> Result<bool, CartError> {
        let removed = self.cart.remove(dish_id);
        self.save()?;
        Ok(removed)
    }

    pub fn update_quantity(&mut self, dish_id: &str, quantity: i64) -> Result<bool, CartError> {
        let changed = self.cart.update_quantity(dish_id, quantity);
        self.save()?;
        Ok(changed)
    }

    pub fn clear(&mut self) -> Result<(), CartError> {
        self.cart.clear();
        self.save()
    }

    fn save(&self) -> Result<(), CartError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.cart)?;
        atomic_write(&self.path, json.as_bytes())
    }
}

fn atomic_write(path: &Path, data: &[u8]) -> Result<(), CartError> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
