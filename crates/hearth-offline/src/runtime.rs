//! Worker startup and event dispatch

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::{
    CacheCoordinator, FetchEvent, FetchOutcome, MessageEvent, OfflineError, Request, Result,
    WorkerCommand, WorkerData, WorkerServices, WORKER_DATA_PATH,
};

/// Handles the lifecycle events of a worker
#[async_trait]
pub trait LifecycleHandler: Send + Sync {
    /// Worker installation
    async fn install(&self) -> Result<()>;

    /// Worker activation
    async fn activate(&self) -> Result<()>;

    /// Intercepted fetch
    async fn fetch(&self, event: FetchEvent) -> Result<FetchOutcome>;

    /// Posted message
    async fn message(&self, event: MessageEvent) -> Result<Option<WorkerCommand>>;
}

#[async_trait]
impl LifecycleHandler for CacheCoordinator {
    async fn install(&self) -> Result<()> {
        CacheCoordinator::install(self).await
    }

    async fn activate(&self) -> Result<()> {
        CacheCoordinator::activate(self).await.map(|_| ())
    }

    async fn fetch(&self, event: FetchEvent) -> Result<FetchOutcome> {
        self.handle_fetch(event).await
    }

    async fn message(&self, event: MessageEvent) -> Result<Option<WorkerCommand>> {
        self.handle_message(event).await
    }
}

/// Event delivered to a worker
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    Install,
    Activate,
    Fetch(FetchEvent),
    Message(MessageEvent),
}

/// Result of dispatching a [`WorkerEvent`]
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    /// Install or activate finished
    Completed,
    /// Answer to a fetch
    Fetch(FetchOutcome),
    /// Command run for a message, if any
    Command(Option<WorkerCommand>),
    /// No handler is registered
    Unhandled,
}

/// Fetch and parse the worker data file under `services.scope`
pub async fn load_worker_data(services: &WorkerServices) -> Result<WorkerData> {
    let url = services.scope.join(WORKER_DATA_PATH)?;
    let response = services.network.fetch(&Request::new(url)).await?;
    if !response.is_ok() {
        return Err(OfflineError::Http {
            status: response.status,
            message: format!("failed to load {WORKER_DATA_PATH}"),
        });
    }
    WorkerData::from_slice(&response.body)
}

/// A worker instance: a handler, or nothing when startup failed
#[derive(Clone, Default)]
pub struct WorkerRuntime {
    handler: Option<Arc<dyn LifecycleHandler>>,
}

impl WorkerRuntime {
    /// Runtime with a handler registered
    pub fn with_handler(handler: Arc<dyn LifecycleHandler>) -> Self {
        Self {
            handler: Some(handler),
        }
    }

    /// Runtime coordinating the given worker data
    pub fn with_data(data: WorkerData, services: WorkerServices) -> Self {
        Self::with_handler(Arc::new(CacheCoordinator::new(data, services)))
    }

    /// Load the worker data and register a coordinator.
    ///
    /// When the data cannot be loaded the failure is logged and the
    /// returned runtime handles no events.
    pub async fn start(services: WorkerServices) -> Self {
        match load_worker_data(&services).await {
            Ok(data) => {
                info!("Loaded worker data for cache {}", data.cache.name);
                Self::with_data(data, services)
            }
            Err(e) => {
                error!("Could not get worker data, no handlers registered: {}", e);
                Self::default()
            }
        }
    }

    /// Check if a handler is registered
    pub fn is_registered(&self) -> bool {
        self.handler.is_some()
    }

    /// Deliver an event.
    ///
    /// Install, activate and fetch failures are returned; message failures
    /// are logged and reported as no command.
    pub async fn dispatch(&self, event: WorkerEvent) -> Result<EventOutcome> {
        let Some(handler) = &self.handler else {
            debug!("No handler registered, ignoring event");
            return Ok(EventOutcome::Unhandled);
        };

        match event {
            WorkerEvent::Install => {
                handler.install().await?;
                Ok(EventOutcome::Completed)
            }
            WorkerEvent::Activate => {
                handler.activate().await?;
                Ok(EventOutcome::Completed)
            }
            WorkerEvent::Fetch(event) => Ok(EventOutcome::Fetch(handler.fetch(event).await?)),
            WorkerEvent::Message(event) => match handler.message(event).await {
                Ok(command) => Ok(EventOutcome::Command(command)),
                Err(e) => {
                    error!("Error while handling a message: {}", e);
                    Ok(EventOutcome::Command(None))
                }
            },
        }
    }
}
