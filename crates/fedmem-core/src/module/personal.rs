//! `personal` module: health/finance/hobby/reflection/goal. Canonical
//! fallback bucket for module determination when a caller does not pick
//! one (spec §4.2).

use super::{ImportanceWeights, ModuleConfig, ProcessingPolicy, SignalLexicon};

pub fn config() -> ModuleConfig {
    let taxonomy = vec![
        ("health".to_string(), vec!["health".into(), "doctor".into(), "sleep".into(), "exercise".into()]),
        ("finance".to_string(), vec!["budget".into(), "money".into(), "expense".into(), "savings".into()]),
        ("hobby".to_string(), vec!["hobby".into(), "project".into(), "guitar".into(), "painting".into()]),
        ("reflection".to_string(), vec!["feel".into(), "think".into(), "realized".into(), "grateful".into()]),
        ("goal".to_string(), vec!["goal".into(), "plan".into(), "resolution".into(), "target".into()]),
    ];

    ModuleConfig {
        id: "personal".to_string(),
        display_name: "Personal".to_string(),
        description: "Personal notes: health, finances, hobbies, reflections, goals.".to_string(),
        searchable_fields: vec!["category".to_string()],
        policy: ProcessingPolicy {
            default_type: "personal".to_string(),
            taxonomy,
            entity_fields: vec![],
            lexicon: SignalLexicon::generic(),
            importance_weights: ImportanceWeights::default(),
        },
    }
}
