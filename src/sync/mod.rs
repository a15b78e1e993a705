//! Optimistic sync - local mutations first, remote confirmation second.
//!
//! ## Lifecycle
//!
//! ```text
//!              mutate(action)
//!   Idle ─────────────────────────▶ Syncing ──── request ok ────▶ Synced
//!    ▲                               │  ▲                           │
//!    │ clear_error()                 │  └──── mutate(action) ───────┘
//!    │                        request failed
//!    │                               ▼
//!    └────────────────────────── RolledBack
//! ```
//!
//! While `Syncing`, the published state is ahead of the remote. Requests are
//! sent one at a time, and a rollback restores the state left by the last
//! confirmed request.

mod config;
mod state;
mod store;

pub use config::{PayloadMode, StoreConfig};
pub use state::{MutationOutcome, SyncPhase, SyncState};
pub use store::SyncStore;
