//! In-memory registry of live sessions keyed by id.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::Services;
use crate::workflow::controller::WorkflowController;

#[derive(Clone)]
pub struct SessionStore {
    services: Services,
    max_idle: Duration,
    sessions: Arc<RwLock<HashMap<Uuid, Arc<WorkflowController>>>>,
}

impl SessionStore {
    pub fn new(services: Services, max_idle: Duration) -> Self {
        SessionStore { services, max_idle, sessions: Arc::new(RwLock::new(HashMap::new())) }
    }

    pub async fn create(&self) -> (Uuid, Arc<WorkflowController>) {
        self.prune_idle().await;
        let id = Uuid::new_v4();
        let controller = Arc::new(WorkflowController::new(self.services.clone()));
        self.sessions.write().await.insert(id, controller.clone());
        tracing::info!(%id, "session created");
        (id, controller)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Arc<WorkflowController>> {
        self.sessions.read().await.get(&id).cloned().ok_or(AppError::SessionNotFound)
    }

    pub async fn remove(&self, id: Uuid) -> AppResult<()> {
        self.sessions.write().await.remove(&id).map(|_| ()).ok_or(AppError::SessionNotFound)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop sessions untouched for longer than `max_idle`, unless they are
    /// waiting on a service call.
    pub async fn prune_idle(&self) -> usize {
        let snapshot: Vec<(Uuid, Arc<WorkflowController>)> =
            self.sessions.read().await.iter().map(|(id, c)| (*id, c.clone())).collect();
        let mut expired = Vec::new();
        for (id, controller) in snapshot {
            let idle = controller.last_touched().await.elapsed();
            if idle > self.max_idle && !controller.is_processing().await {
                expired.push(id);
            }
        }
        if !expired.is_empty() {
            let mut sessions = self.sessions.write().await;
            for id in &expired {
                sessions.remove(id);
            }
            tracing::info!(count = expired.len(), "pruned idle sessions");
        }
        expired.len()
    }
}
