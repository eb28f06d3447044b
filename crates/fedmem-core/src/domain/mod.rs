//! C6 — Domain Services (spec §4.4).
//!
//! Project typed domain objects onto the generic memory substrate without a
//! second storage model: a domain type is a memory whose metadata carries
//! `type=<kind>` plus the typed fields; retrieval by id is a direct module
//! `get` (the memory's own id doubles as the domain id), listing is
//! `search_by_metadata({type})`. Both services below register their own
//! module through `ModuleRegistry::register` rather than introducing new
//! Rust types for "is a module" (Design Notes §9).

pub mod people;
pub mod project;

pub use people::{CustomFieldDefinition, CustomFieldType, PeopleService};
pub use project::ProjectService;
