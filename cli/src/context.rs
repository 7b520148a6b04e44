//! Per-invocation state: merged config, persisted session and the backend
//! handle built from them.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use vantalu_core::backend::{Backend, RestBackend};
use vantalu_core::cart::CartStore;
use vantalu_core::catalog::Catalog;
use vantalu_core::config::CatalogSource;
use vantalu_core::session::{AuthClient, Session, SessionStorage};
use vantalu_core::{ConfigLoader, StoreConfig};

use crate::output::Palette;

pub struct App {
    pub config: StoreConfig,
    pub palette: Palette,
    pub json: bool,
    sessions: SessionStorage,
}

impl App {
    pub fn load(home: Option<PathBuf>, json: bool) -> anyhow::Result<Self> {
        let mut loader = ConfigLoader::new();
        if let Some(home) = home {
            loader = loader.with_home(home);
        }
        let config = loader.load().context("failed to load configuration")?;
        Ok(Self::with_config(config, json, Palette::detect()))
    }

    pub fn with_config(config: StoreConfig, json: bool, palette: Palette) -> Self {
        let sessions = SessionStorage::with_path(config.session_path());
        Self {
            config,
            palette,
            json,
            sessions,
        }
    }

    pub fn sessions(&self) -> &SessionStorage {
        &self.sessions
    }

    pub fn cart(&self) -> anyhow::Result<CartStore> {
        let path = self.config.cart_path();
        CartStore::open(&path).with_context(|| format!("failed to open cart at {}", path.display()))
    }

    pub fn auth(&self) -> anyhow::Result<AuthClient> {
        Ok(AuthClient::from_config(&self.config)?)
    }

    /// Backend acting as `session`'s user, or anonymously.
    pub fn backend(&self, session: Option<&Session>) -> anyhow::Result<Arc<dyn Backend>> {
        let backend = RestBackend::from_config(&self.config)?
            .with_access_token(session.map(|s| s.access_token.clone()));
        Ok(Arc::new(backend))
    }

    /// Stored session, refreshed first when it has expired. `None` when
    /// nobody is signed in.
    pub async fn current_session(&self) -> anyhow::Result<Option<Session>> {
        let Some(session) = self.sessions.load()? else {
            return Ok(None);
        };
        if !session.is_expired() {
            return Ok(Some(session));
        }
        if !session.can_refresh() {
            tracing::debug!(user_id = %session.user.id, "stored session expired");
            return Ok(None);
        }
        let fresh = self
            .auth()?
            .refresh(&session)
            .await
            .context("session expired and could not be refreshed; run `vantalu login`")?;
        self.sessions.save(&fresh)?;
        tracing::debug!(user_id = %fresh.user.id, "session refreshed");
        Ok(Some(fresh))
    }

    pub async fn require_session(&self) -> anyhow::Result<Session> {
        self.current_session()
            .await?
            .context("not signed in; run `vantalu login` first")
    }

    /// Menu for customers. The built-in catalog needs no backend.
    pub async fn catalog(&self) -> anyhow::Result<Catalog> {
        match self.config.catalog {
            CatalogSource::Static => Ok(Catalog::builtin()),
            CatalogSource::Remote => {
                let backend = self.backend(None)?;
                Catalog::load(CatalogSource::Remote, backend.as_ref())
                    .await
                    .context("failed to load menu")
            }
        }
    }
}
