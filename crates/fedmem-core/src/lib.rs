//! Federated long-term memory service for LLM agents.
//!
//! Modules (C3) own homogeneous memory tables; the Central Memory Index
//! (C4) routes queries and runs federated search across modules; the
//! write pipeline (C5) keeps the two eventually consistent; domain
//! services (C6) project typed objects (Project, Task, Person, ...) onto
//! the same substrate; the change notifier (C7) fans out write events to
//! subscribers.

pub mod auth;
pub mod cmi;
pub mod config;
pub mod domain;
pub mod embeddings;
pub mod error;
pub mod models;
pub mod module;
pub mod notifier;
pub mod pipeline;
pub mod storage;

pub use config::Config;
pub use error::{FedMemError, Result};

/// Common imports for constructing a running instance of the service.
pub mod prelude {
    pub use crate::auth::{Authenticator, InMemoryAuthenticator};
    pub use crate::cmi::{Cmi, SearchOptions, SearchResult};
    pub use crate::config::Config;
    pub use crate::domain::{PeopleService, ProjectService};
    pub use crate::embeddings::{DeterministicEmbeddingProvider, EmbeddingProvider};
    pub use crate::error::{FedMemError, Result};
    pub use crate::module::ModuleRegistry;
    pub use crate::notifier::{ChangeEvent, ChangeNotifier};
    pub use crate::pipeline::{ReconciliationJob, TenantDirectory, WritePipeline};
    pub use crate::storage::sqlite::SqliteVectorStore;
}
