//! `work` module: meeting/project/deadline/report/review.

use super::{EntityField, ImportanceWeights, ModuleConfig, ProcessingPolicy, SignalLexicon};

pub fn config() -> ModuleConfig {
    let taxonomy = vec![
        ("meeting".to_string(), vec!["meeting".into(), "call".into(), "sync".into(), "standup".into()]),
        ("project".to_string(), vec!["project".into(), "milestone".into(), "initiative".into()]),
        ("deadline".to_string(), vec!["deadline".into(), "due".into(), "overdue".into()]),
        ("report".to_string(), vec!["report".into(), "summary".into(), "status".into()]),
        ("review".to_string(), vec!["review".into(), "feedback".into(), "retro".into()]),
    ];

    ModuleConfig {
        id: "work".to_string(),
        display_name: "Work".to_string(),
        description: "Workplace notes: meetings, projects, deadlines, reports, reviews.".to_string(),
        searchable_fields: vec!["category".to_string(), "participants".to_string(), "deadlines".to_string()],
        policy: ProcessingPolicy {
            default_type: "work".to_string(),
            taxonomy,
            entity_fields: vec![EntityField::Participants, EntityField::Deadlines, EntityField::Projects],
            lexicon: SignalLexicon::generic(),
            importance_weights: ImportanceWeights::default(),
        },
    }
}
