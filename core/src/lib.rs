//! Core library for the Vantalu storefront: menu, cart, checkout, order
//! tracking, favorites, profiles and the admin console, all on top of the
//! [`backend::Backend`] seam.

pub mod admin;
pub mod backend;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod favorites;
pub mod history;
pub mod model;
pub mod profile;
pub mod session;
pub mod tracking;

pub use backend::{Backend, BackendError, MemoryBackend, RestBackend};
pub use config::{ConfigLoader, StoreConfig};
