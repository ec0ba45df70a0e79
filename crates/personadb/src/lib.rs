//! ## Crate layout
//! - `core`: runtime store, entity model, duplicate detection, integrity
//!   diagnostics, event bus, and reactive views.
//!
//! The `prelude` module mirrors the runtime surface consumed by page and
//! webhook glue code; everything else stays addressable through `core`.

pub use personadb_core as core;

pub use personadb_core::error::Error;

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Prelude
/// using _ brings traits into scope and avoids name conflicts
///

pub mod prelude {
    pub use personadb_core::{
        bus::{EventBus, Subscription, Topic},
        db::{Collection, Db},
        error::Error,
        ingest::{IngestOutcome, WebhookPayload, ingest},
        integrity::IntegrityReport,
        model::{Avatar, EntityKind, Product},
        normalize::FieldComparison,
        store::{FileBackend, MemoryBackend, StorageBackend},
        view::{DataSnapshot, DataView},
    };
    pub use serde::{Deserialize, Serialize};
}
