//! `learning` module: concept/course/book/skill/question.

use super::{EntityField, ImportanceWeights, ModuleConfig, ProcessingPolicy, SignalLexicon};

pub fn config() -> ModuleConfig {
    let taxonomy = vec![
        ("concept".to_string(), vec!["concept".into(), "theory".into(), "principle".into()]),
        ("course".to_string(), vec!["course".into(), "lecture".into(), "class".into()]),
        ("book".to_string(), vec!["book".into(), "chapter".into(), "read".into()]),
        ("skill".to_string(), vec!["skill".into(), "practice".into(), "exercise".into()]),
        ("question".to_string(), vec!["question".into(), "wonder".into(), "unclear".into()]),
    ];

    ModuleConfig {
        id: "learning".to_string(),
        display_name: "Learning".to_string(),
        description: "Learning notes: concepts, courses, books, skills, open questions.".to_string(),
        searchable_fields: vec!["category".to_string(), "questions".to_string()],
        policy: ProcessingPolicy {
            default_type: "learning".to_string(),
            taxonomy,
            entity_fields: vec![EntityField::Questions],
            lexicon: SignalLexicon::generic(),
            importance_weights: ImportanceWeights::default(),
        },
    }
}
