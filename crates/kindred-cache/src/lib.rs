//! # kindred-cache
//!
//! In-process state owned by a realtime session.
//!
//! ## Features
//!
//! - **Clock**: pluggable time source so expiry logic is testable without timers
//! - **Presence**: TTL-bounded status cache and the status subscription set
//! - **Dedup**: capped record of notifications already surfaced
//! - **Store**: key-value persistence (in-memory and JSON file)
//! - **Devices**: persisted set of registered device identifiers
//! - **Auth**: credential provider backed by the key-value store
//!
//! ## Example
//!
//! ```ignore
//! use kindred_cache::{DeviceRegistry, FileStore, PresenceCache, SystemClock};
//!
//! let store = Arc::new(FileStore::open("./kindred-store.json").await?);
//! let registry = DeviceRegistry::load(store.clone()).await?;
//!
//! let presence = PresenceCache::new(PresenceCache::DEFAULT_TTL, Arc::new(SystemClock));
//! presence.insert(user_id, PresenceStatus::Online);
//! ```

pub mod auth;
pub mod clock;
pub mod dedup;
pub mod devices;
pub mod presence;
pub mod store;

pub use auth::StoredAuthProvider;
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use dedup::{DedupKey, DedupRecord};
pub use devices::DeviceRegistry;
pub use presence::{PresenceCache, PresenceEntry, StatusSubscriptions};
pub use store::{keys, FileStore, MemoryStore};
