//! `creative` module: idea/draft/inspiration/critique. Signal analysis here
//! leans on tone/valence more than priority (spec §4.1 supplemented list).

use super::{ImportanceWeights, ModuleConfig, ProcessingPolicy, SignalLexicon};

pub fn config() -> ModuleConfig {
    let taxonomy = vec![
        ("idea".to_string(), vec!["idea".into(), "concept".into(), "what if".into()]),
        ("draft".to_string(), vec!["draft".into(), "outline".into(), "sketch".into()]),
        ("inspiration".to_string(), vec!["inspired".into(), "inspiration".into(), "muse".into()]),
        ("critique".to_string(), vec!["critique".into(), "feedback".into(), "revise".into()]),
    ];

    ModuleConfig {
        id: "creative".to_string(),
        display_name: "Creative".to_string(),
        description: "Creative notes: ideas, drafts, inspiration, critique.".to_string(),
        searchable_fields: vec!["category".to_string(), "tone".to_string()],
        policy: ProcessingPolicy {
            default_type: "creative".to_string(),
            taxonomy,
            entity_fields: vec![],
            lexicon: SignalLexicon::generic(),
            importance_weights: ImportanceWeights {
                base: 0.25,
                priority: 0.1,
                deadline: 0.1,
                breadth: 0.15,
            },
        },
    }
}
