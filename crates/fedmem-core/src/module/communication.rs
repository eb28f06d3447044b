//! `communication` module: email/message/call/meeting-note.

use super::{EntityField, ImportanceWeights, ModuleConfig, ProcessingPolicy, SignalLexicon};

pub fn config() -> ModuleConfig {
    let taxonomy = vec![
        ("email".to_string(), vec!["email".into(), "inbox".into(), "reply".into()]),
        ("message".to_string(), vec!["message".into(), "text".into(), "chat".into()]),
        ("call".to_string(), vec!["call".into(), "phone".into(), "voicemail".into()]),
        ("meeting-note".to_string(), vec!["meeting".into(), "notes".into(), "minutes".into()]),
    ];

    ModuleConfig {
        id: "communication".to_string(),
        display_name: "Communication".to_string(),
        description: "Communication log: emails, messages, calls, meeting notes.".to_string(),
        searchable_fields: vec!["category".to_string(), "participants".to_string(), "people".to_string()],
        policy: ProcessingPolicy {
            default_type: "communication".to_string(),
            taxonomy,
            entity_fields: vec![EntityField::Participants, EntityField::People],
            lexicon: SignalLexicon::generic(),
            importance_weights: ImportanceWeights::default(),
        },
    }
}
