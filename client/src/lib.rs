//! # Inventory Client
//!
//! Device-side runtime around [`inventory_engine`]: a keyed local store,
//! a service that serializes every mutation behind one writer lock, and
//! the coordinator that pulls server state into the store.
//!
//! ```rust,no_run
//! use inventory_client::{HttpTransport, InventoryService, MemoryStore, SyncCoordinator};
//! use std::time::Duration;
//!
//! # async fn run() -> inventory_client::Result<()> {
//! let service = InventoryService::new(MemoryStore::new());
//! let item = service.create_item("Cordless drill", 10).await?;
//! let project = service.create_project("Deck").await?;
//! service.reserve(&item.id, &project.id, 3).await?;
//!
//! let transport = HttpTransport::new("http://localhost:3000", "session-token");
//! let sync = SyncCoordinator::new(service, transport, Duration::from_secs(30));
//! let report = sync.sync().await?;
//! println!("{} records changed", report.changed());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod service;
pub mod store;
pub mod sync;
pub mod transport;

pub use config::{Config, ConfigError};
pub use error::{Error, Result, SyncFailure};
pub use service::{AppliedPull, InventoryService, SYNC_STATE_KEY};
pub use store::{KeyedStore, MemoryStore, SqliteStore, StoreError};
pub use sync::{SyncCoordinator, SyncReport};
pub use transport::{HttpTransport, Transport};
