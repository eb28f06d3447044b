use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;
use fedmem_core::prelude::*;

/// A fully wired, in-memory instance of the federated memory service.
/// Mirrors `fedmem-server::build_backend`, but skips auth and transport —
/// tests call `pipeline`/`projects`/`people`/`notifier` directly.
pub struct TestBackend {
    pub pipeline: Arc<WritePipeline>,
    pub cmi: Arc<Cmi>,
    pub registry: Arc<ModuleRegistry>,
    pub provider: Arc<dyn EmbeddingProvider>,
    pub notifier: Arc<ChangeNotifier>,
    pub tenants: TenantDirectory,
    pub projects: Arc<ProjectService>,
    pub people: Arc<PeopleService>,
    pub config: Config,
}

impl TestBackend {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let store = SqliteVectorStore::open_in_memory().expect("open in-memory store");

        let cmi_table = Arc::new(store.cmi_table());
        let relationship_table = Arc::new(store.relationship_table());
        let cmi = Arc::new(Cmi::new(cmi_table, relationship_table, &config));

        let registry = Arc::new(ModuleRegistry::new(store));
        registry.register_builtins().expect("register built-in modules");
        registry
            .register(fedmem_core::domain::project::module_config())
            .expect("register projects module");
        registry
            .register(fedmem_core::domain::people::module_config())
            .expect("register people module");

        let provider: Arc<dyn EmbeddingProvider> = Arc::new(DeterministicEmbeddingProvider::new(&config));
        let notifier = Arc::new(ChangeNotifier::new());
        let tenants: TenantDirectory = Arc::new(DashSet::new());

        let pipeline = Arc::new(WritePipeline::new(
            registry.clone(),
            cmi.clone(),
            provider.clone(),
            notifier.clone(),
            tenants.clone(),
            config.clone(),
        ));

        let projects = Arc::new(ProjectService::new(pipeline.clone()));
        let people = Arc::new(PeopleService::new(pipeline.clone()));

        Self {
            pipeline,
            cmi,
            registry,
            provider,
            notifier,
            tenants,
            projects,
            people,
            config,
        }
    }

    /// Runs one reconciliation sweep synchronously, for tests that assert on
    /// convergence rather than waiting out the background job's interval.
    pub async fn reconcile_once(&self) -> fedmem_core::pipeline::ReconciliationReport {
        let job = ReconciliationJob::new(
            self.registry.clone(),
            self.cmi.clone(),
            self.provider.clone(),
            self.tenants.clone(),
            Duration::from_secs(3600),
        );
        job.run_once().await
    }
}

impl Default for TestBackend {
    fn default() -> Self {
        Self::new()
    }
}
