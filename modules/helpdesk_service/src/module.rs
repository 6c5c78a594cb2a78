//! Module wiring: repositories, services, router and native client

use crate::api::native::NativeClient;
use crate::api::rest::{routes, AppState};
use crate::config::Config;
use crate::contract::{HelpdeskApi, IdentityProvider, ObjectStorage};
use crate::domain::repository::{RowStore, TableRepository};
use crate::domain::{AccountService, ChatActivityStore, ChatService, ProfileService, TicketService};
use crate::infra::storage::migrations::Migrator;
use crate::infra::storage::QueryExecutor;
use anyhow::Result;
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;

/// Helpdesk service module
pub struct HelpdeskServiceModule {
    state: AppState,
}

impl HelpdeskServiceModule {
    /// Build the service graph over one connection pool and the external collaborators
    pub fn new(
        config: Config,
        db: Arc<DatabaseConnection>,
        identity: Arc<dyn IdentityProvider>,
        storage: Arc<dyn ObjectStorage>,
        public_domain: impl Into<String>,
    ) -> Self {
        let config = Arc::new(config);
        let executor = Arc::new(QueryExecutor::new(db));
        let store: Arc<dyn RowStore> = executor.clone();
        let activity: Arc<dyn ChatActivityStore> = executor;

        let tickets = Arc::new(TicketService::new(
            TableRepository::new(store.clone()),
            TableRepository::new(store.clone()),
        ));
        let chats = Arc::new(ChatService::new(
            TableRepository::new(store.clone()),
            TableRepository::new(store.clone()),
            TableRepository::new(store.clone()),
            TableRepository::new(store.clone()),
            TableRepository::new(store.clone()),
            activity,
            config.clone(),
        ));
        let profiles = Arc::new(ProfileService::new(
            TableRepository::new(store.clone()),
            storage,
            config.clone(),
        ));
        let account = Arc::new(AccountService::new(
            identity.clone(),
            TableRepository::new(store.clone()),
            TableRepository::new(store),
            config.clone(),
            public_domain,
        ));

        tracing::info!("Helpdesk service initialized");
        Self {
            state: AppState {
                tickets,
                chats,
                profiles,
                account,
                identity,
                config,
            },
        }
    }

    /// Apply pending schema migrations
    pub async fn migrate(db: &DatabaseConnection) -> Result<()> {
        Migrator::up(db, None).await?;
        tracing::info!("Helpdesk service migrations completed");
        Ok(())
    }

    /// All page and action routes behind the session guard
    pub fn router(&self) -> axum::Router {
        tracing::info!("Registering helpdesk REST routes");
        routes::register_routes(self.state.clone())
    }

    /// In-process client over the same services as the router
    pub fn native_client(&self) -> Arc<dyn HelpdeskApi> {
        Arc::new(NativeClient::new(
            self.state.tickets.clone(),
            self.state.profiles.clone(),
        ))
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }
}
