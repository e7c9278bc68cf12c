//! chainwatch-core: the synchronization engine behind ChainWatch.
//!
//! # Architecture
//!
//! ```text
//! ChainHeadMonitor ──(height, 1-slot channel)──► SyncEngine
//!                                                   ├── LedgerSource       (block / tx fetches)
//!                                                   ├── TransactionStore   (tx hash → Transaction)
//!                                                   ├── matcher            (tx → subscribed addresses)
//!                                                   └── SubscriptionIndex  (address → tx hashes)
//!
//! QueryFacade ──► TransactionStore + SubscriptionIndex (concurrent readers)
//! ```
//!
//! [`ChainWatch::start`] wires everything together and spawns the background
//! monitor and engine tasks.

pub mod config;
pub mod cursor;
pub mod engine;
pub mod error;
pub mod facade;
pub mod matcher;
pub mod monitor;
pub mod service;
pub mod source;
pub mod store;
pub mod subscription;
pub mod types;

pub use config::{WatchConfig, WatchConfigBuilder};
pub use cursor::Cursor;
pub use engine::{FetchPath, SyncEngine, SyncStatus};
pub use error::WatchError;
pub use facade::{QueryFacade, WatchStatus};
pub use monitor::ChainHeadMonitor;
pub use service::ChainWatch;
pub use source::LedgerSource;
pub use store::TransactionStore;
pub use subscription::SubscriptionIndex;
pub use types::{Address, Transaction};
