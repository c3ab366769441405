use std::sync::Arc;

use crate::auth::AuthService;
use crate::cache::LocalCache;
use crate::list::{ListController, ListView, RowBuffer};
use crate::models::Collection;
use crate::profile::ProfileService;
use crate::store::RemoteStore;

/// A live list and the rows it last rendered.
pub struct ListHandle {
    pub controller: ListController,
    pub view: Arc<RowBuffer>,
}

impl ListHandle {
    async fn start(
        collection: Collection,
        store: Arc<dyn RemoteStore>,
        cache: Arc<dyn LocalCache>,
    ) -> Self {
        let view = Arc::new(RowBuffer::new());
        let controller =
            ListController::start(collection, store, cache, view.clone() as Arc<dyn ListView>)
                .await;
        Self { controller, view }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RemoteStore>,
    pub cache: Arc<dyn LocalCache>,
    pub auth: Arc<AuthService>,
    pub profile: Arc<ProfileService>,
    goals: Arc<ListHandle>,
    reminders: Arc<ListHandle>,
}

impl AppState {
    /// Wire the services and start both list subscriptions.
    pub async fn start(store: Arc<dyn RemoteStore>, cache: Arc<dyn LocalCache>) -> Self {
        let auth = Arc::new(AuthService::new(store.clone(), cache.clone()));
        let profile = Arc::new(ProfileService::new(store.clone(), auth.clone()));
        let goals = ListHandle::start(Collection::Goals, store.clone(), cache.clone()).await;
        let reminders =
            ListHandle::start(Collection::Reminders, store.clone(), cache.clone()).await;

        Self {
            store,
            cache,
            auth,
            profile,
            goals: Arc::new(goals),
            reminders: Arc::new(reminders),
        }
    }

    pub fn list(&self, collection: Collection) -> &ListHandle {
        match collection {
            Collection::Goals => &self.goals,
            Collection::Reminders => &self.reminders,
        }
    }

    /// Release both subscriptions.
    pub fn shutdown(&self) {
        for collection in Collection::ALL {
            self.list(collection).controller.stop();
        }
    }
}
