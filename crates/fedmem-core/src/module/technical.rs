//! `technical` module: bug/feature/architecture/devops/performance/security.

use super::{EntityField, ImportanceWeights, ModuleConfig, ProcessingPolicy, SignalLexicon};

pub fn config() -> ModuleConfig {
    let taxonomy = vec![
        ("bug".to_string(), vec!["bug".into(), "crash".into(), "error".into(), "broken".into()]),
        ("feature".to_string(), vec!["feature".into(), "add".into(), "implement".into(), "new".into()]),
        ("architecture".to_string(), vec!["architecture".into(), "design".into(), "refactor".into()]),
        ("devops".to_string(), vec!["deploy".into(), "pipeline".into(), "ci".into(), "infra".into()]),
        ("performance".to_string(), vec!["slow".into(), "latency".into(), "performance".into(), "optimize".into()]),
        ("security".to_string(), vec!["vulnerability".into(), "security".into(), "exploit".into(), "cve".into()]),
    ];

    ModuleConfig {
        id: "technical".to_string(),
        display_name: "Technical".to_string(),
        description: "Engineering notes: bugs, features, architecture decisions.".to_string(),
        searchable_fields: vec!["category".to_string(), "action_items".to_string()],
        policy: ProcessingPolicy {
            default_type: "technical".to_string(),
            taxonomy,
            entity_fields: vec![EntityField::ActionItems, EntityField::Decisions],
            lexicon: SignalLexicon::generic(),
            importance_weights: ImportanceWeights::default(),
        },
    }
}
