//! The four `processMetadata` buckets (spec §4.1): auto-categorization,
//! entity extraction, signal analysis, importance scoring. Each is a pure
//! function of `(content, policy)`; `process_metadata` composes them and
//! never overwrites a key the caller already supplied.

use crate::models::Metadata;
use serde_json::json;
use std::collections::HashMap;

use super::contract::ProcessedMetadata;

const MAX_ENTITY_LEN: usize = 15;
const MAX_KEYWORDS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityField {
    Participants,
    People,
    Projects,
    Deadlines,
    ActionItems,
    Questions,
    Decisions,
}

impl EntityField {
    pub fn key(&self) -> &'static str {
        match self {
            EntityField::Participants => "participants",
            EntityField::People => "people",
            EntityField::Projects => "projects",
            EntityField::Deadlines => "deadlines",
            EntityField::ActionItems => "action_items",
            EntityField::Questions => "questions",
            EntityField::Decisions => "decisions",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SignalLexicon {
    pub positive: Vec<String>,
    pub negative: Vec<String>,
    pub high_priority: Vec<String>,
    pub response_markers: Vec<String>,
}

impl SignalLexicon {
    pub fn generic() -> Self {
        Self {
            positive: vec_of(&["great", "good", "success", "happy", "resolved", "excited", "win"]),
            negative: vec_of(&["bad", "fail", "blocked", "issue", "problem", "concerned", "worried"]),
            high_priority: vec_of(&["urgent", "asap", "critical", "immediately", "deadline", "today"]),
            response_markers: vec_of(&["please respond", "let me know", "asap", "rsvp", "waiting on you"]),
        }
    }
}

fn vec_of(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone)]
pub struct ImportanceWeights {
    pub base: f32,
    pub priority: f32,
    pub deadline: f32,
    pub breadth: f32,
}

impl Default for ImportanceWeights {
    fn default() -> Self {
        Self {
            base: 0.2,
            priority: 0.3,
            deadline: 0.25,
            breadth: 0.25,
        }
    }
}

/// Per-module composition of the four buckets plus its auto-categorization
/// taxonomy (category name -> keywords that vote for it).
#[derive(Debug, Clone)]
pub struct ProcessingPolicy {
    pub default_type: String,
    pub taxonomy: Vec<(String, Vec<String>)>,
    pub entity_fields: Vec<EntityField>,
    pub lexicon: SignalLexicon,
    pub importance_weights: ImportanceWeights,
}

#[derive(Debug, Clone)]
pub struct SignalAnalysis {
    pub valence: f32,
    pub sentiment: String,
    pub tone: String,
    pub priority: String,
    pub response_required: bool,
}

fn lower(content: &str) -> String {
    content.to_lowercase()
}

/// Keyword-count scoring over content; ties keep the taxonomy's declared
/// order, empty matches fall back to `"general"`.
pub fn auto_categorize(content: &str, taxonomy: &[(String, Vec<String>)]) -> String {
    let haystack = lower(content);
    let mut best: Option<(&str, usize)> = None;
    for (category, keywords) in taxonomy {
        let count: usize = keywords
            .iter()
            .map(|kw| haystack.matches(kw.as_str()).count())
            .sum();
        if count == 0 {
            continue;
        }
        if best.map(|(_, best_count)| count > best_count).unwrap_or(true) {
            best = Some((category.as_str(), count));
        }
    }
    best.map(|(c, _)| c.to_string()).unwrap_or_else(|| "general".to_string())
}

/// All taxonomy categories whose keywords matched at least once, in
/// descending match-count order — feeds the memory's `categories` list and
/// CMI keyword voting.
fn matched_categories(content: &str, taxonomy: &[(String, Vec<String>)]) -> Vec<String> {
    let haystack = lower(content);
    let mut scored: Vec<(String, usize)> = taxonomy
        .iter()
        .filter_map(|(category, keywords)| {
            let count: usize = keywords.iter().map(|kw| haystack.matches(kw.as_str()).count()).sum();
            (count > 0).then_some((category.clone(), count))
        })
        .collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored.into_iter().map(|(c, _)| c).collect()
}

/// Capitalized-run heuristic for name-like tokens (no regex dependency —
/// matches the teacher's hand-rolled parsing style). Each run of
/// consecutive capitalized words becomes one candidate entity.
fn capitalized_runs(content: &str) -> Vec<String> {
    const SENTENCE_STARTERS: &[&str] = &["The", "A", "An", "This", "That", "It", "I", "We", "They"];
    let mut runs = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for word in content.split_whitespace() {
        let trimmed = word.trim_matches(|c: char| !c.is_alphanumeric());
        let is_capitalized = trimmed
            .chars()
            .next()
            .map(|c| c.is_uppercase())
            .unwrap_or(false)
            && trimmed.len() > 1;
        if is_capitalized && !SENTENCE_STARTERS.contains(&trimmed) {
            current.push(trimmed);
        } else if !current.is_empty() {
            runs.push(current.join(" "));
            current.clear();
        }
    }
    if !current.is_empty() {
        runs.push(current.join(" "));
    }
    runs
}

fn sentences(content: &str) -> Vec<&str> {
    content
        .split(['.', '!', '?'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect()
}

const DEADLINE_MARKERS: &[&str] = &[
    "today", "tomorrow", "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday",
    "next week", "by end of", "due",
];

const ACTION_MARKERS: &[&str] = &["todo", "need to", "should", "must", "action item", "follow up"];

const DECISION_MARKERS: &[&str] = &["decided", "agreed", "will proceed", "concluded", "resolved to"];

/// Extracts the configured entity fields from free text, each bounded to
/// `MAX_ENTITY_LEN` items to prevent index bloat (spec §4.1).
pub fn extract_entities(content: &str, fields: &[EntityField]) -> HashMap<String, Vec<String>> {
    let haystack = lower(content);
    let mut out = HashMap::new();
    let names = capitalized_runs(content);

    for field in fields {
        let values: Vec<String> = match field {
            EntityField::Participants | EntityField::People => dedup_bounded(names.clone()),
            EntityField::Projects => dedup_bounded(
                names
                    .iter()
                    .filter(|n| haystack.contains(&n.to_lowercase()) && n.split(' ').count() <= 3)
                    .cloned()
                    .collect(),
            ),
            EntityField::Deadlines => dedup_bounded(
                sentences(content)
                    .into_iter()
                    .filter(|s| {
                        let lower_s = s.to_lowercase();
                        DEADLINE_MARKERS.iter().any(|m| lower_s.contains(m))
                    })
                    .map(|s| s.to_string())
                    .collect(),
            ),
            EntityField::ActionItems => dedup_bounded(
                sentences(content)
                    .into_iter()
                    .filter(|s| {
                        let lower_s = s.to_lowercase();
                        ACTION_MARKERS.iter().any(|m| lower_s.contains(m))
                    })
                    .map(|s| s.to_string())
                    .collect(),
            ),
            EntityField::Questions => dedup_bounded(
                content
                    .split('?')
                    .take(content.matches('?').count())
                    .map(|s| format!("{}?", s.trim()))
                    .filter(|s| s.len() > 1)
                    .collect(),
            ),
            EntityField::Decisions => dedup_bounded(
                sentences(content)
                    .into_iter()
                    .filter(|s| {
                        let lower_s = s.to_lowercase();
                        DECISION_MARKERS.iter().any(|m| lower_s.contains(m))
                    })
                    .map(|s| s.to_string())
                    .collect(),
            ),
        };
        if !values.is_empty() {
            out.insert(field.key().to_string(), values);
        }
    }
    out
}

fn dedup_bounded(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for item in items {
        if seen.insert(item.clone()) {
            out.push(item);
        }
        if out.len() >= MAX_ENTITY_LEN {
            break;
        }
    }
    out
}

/// Valence by ±-lexicon scoring, bucketed into sentiment/tone/priority, plus
/// a response-required flag from interrogatives and response markers.
pub fn analyze_signals(content: &str, lexicon: &SignalLexicon) -> SignalAnalysis {
    let haystack = lower(content);
    let words: Vec<&str> = content.split_whitespace().collect();
    let word_count = words.len().max(1) as f32;

    let pos: usize = lexicon.positive.iter().map(|w| haystack.matches(w.as_str()).count()).sum();
    let neg: usize = lexicon.negative.iter().map(|w| haystack.matches(w.as_str()).count()).sum();
    let valence = ((pos as f32 - neg as f32) / word_count).clamp(-1.0, 1.0);

    let sentiment = if valence > 0.05 {
        "positive"
    } else if valence < -0.05 {
        "negative"
    } else {
        "neutral"
    }
    .to_string();

    let high_priority_hits: usize = lexicon
        .high_priority
        .iter()
        .map(|w| haystack.matches(w.as_str()).count())
        .sum();
    let exclamations = content.matches('!').count();

    let tone = if high_priority_hits > 0 || exclamations > 1 {
        "urgent"
    } else if valence.abs() < 0.05 {
        "neutral"
    } else {
        "casual"
    }
    .to_string();

    let priority = if high_priority_hits >= 2 {
        "high"
    } else if high_priority_hits == 1 {
        "medium"
    } else {
        "low"
    }
    .to_string();

    let response_required = content.contains('?')
        || lexicon.response_markers.iter().any(|m| haystack.contains(m.as_str()));

    SignalAnalysis {
        valence,
        sentiment,
        tone,
        priority,
        response_required,
    }
}

/// Weighted combination of priority bucket, deadline presence, and
/// involvement breadth, clamped to `[0, 1]` (spec §4.1).
pub fn score_importance(
    signals: &SignalAnalysis,
    entities: &HashMap<String, Vec<String>>,
    weights: &ImportanceWeights,
) -> f32 {
    let priority_component = match signals.priority.as_str() {
        "high" => 1.0,
        "medium" => 0.5,
        _ => 0.0,
    };
    let has_deadline = entities
        .get(EntityField::Deadlines.key())
        .map(|v| !v.is_empty())
        .unwrap_or(false);
    let breadth = entities
        .get(EntityField::Participants.key())
        .or_else(|| entities.get(EntityField::People.key()))
        .map(|v| (v.len() as f32 / 5.0).min(1.0))
        .unwrap_or(0.0);

    (weights.base
        + weights.priority * priority_component
        + weights.deadline * if has_deadline { 1.0 } else { 0.0 }
        + weights.breadth * breadth)
        .clamp(0.0, 1.0)
}

fn derive_title(content: &str) -> String {
    let first_line = content.lines().next().unwrap_or(content).trim();
    first_line.chars().take(80).collect()
}

fn derive_summary(content: &str) -> String {
    content.chars().take(240).collect()
}

/// Every key `process_metadata` may fill via `fill_if_absent`, other than
/// `type` (which comes from the module's policy, not the content). Used to
/// drop stale values before re-deriving them from changed content, since
/// `fill_if_absent` would otherwise leave the old content's category,
/// signals, or entities stuck on the row forever (spec §4.1: re-embedding on
/// content change implies the derived fields are re-derived too).
pub fn auto_computed_keys() -> Vec<&'static str> {
    let mut keys = vec![
        "category",
        "categories",
        "importance",
        "keywords",
        "valence",
        "sentiment",
        "tone",
        "priority",
        "response_required",
        "title",
        "summary",
    ];
    keys.extend([
        EntityField::Participants.key(),
        EntityField::People.key(),
        EntityField::Projects.key(),
        EntityField::Deadlines.key(),
        EntityField::ActionItems.key(),
        EntityField::Questions.key(),
        EntityField::Decisions.key(),
    ]);
    keys
}

/// Composes the four buckets. Caller-supplied metadata keys always win; a
/// computed field only fills an absent key (spec §4.1).
pub fn process_metadata(content: &str, mut metadata: Metadata, policy: &ProcessingPolicy) -> ProcessedMetadata {
    metadata.fill_if_absent("type", json!(policy.default_type));

    let category = auto_categorize(content, &policy.taxonomy);
    metadata.fill_if_absent("category", json!(category));

    let mut categories = matched_categories(content, &policy.taxonomy);
    if categories.is_empty() {
        categories.push(category.clone());
    }
    metadata.fill_if_absent("categories", json!(categories));

    let entities = extract_entities(content, &policy.entity_fields);
    for (key, values) in &entities {
        metadata.fill_if_absent(key, json!(values));
    }

    let signals = analyze_signals(content, &policy.lexicon);
    metadata.fill_if_absent("valence", json!(signals.valence));
    metadata.fill_if_absent("sentiment", json!(signals.sentiment));
    metadata.fill_if_absent("tone", json!(signals.tone));
    metadata.fill_if_absent("priority", json!(signals.priority));
    metadata.fill_if_absent("response_required", json!(signals.response_required));

    let importance = score_importance(&signals, &entities, &policy.importance_weights);
    metadata.fill_if_absent("importance", json!(importance));

    metadata.fill_if_absent("title", json!(derive_title(content)));
    metadata.fill_if_absent("summary", json!(derive_summary(content)));

    let title = metadata
        .get("title")
        .and_then(|v| v.as_str())
        .unwrap_or(&derive_title(content))
        .to_string();
    let summary = metadata
        .get("summary")
        .and_then(|v| v.as_str())
        .unwrap_or(&derive_summary(content))
        .to_string();

    let mut keywords: Vec<String> = categories.clone();
    for values in entities.values() {
        keywords.extend(values.iter().cloned());
    }
    let keywords = dedup_bounded_n(keywords, MAX_KEYWORDS);
    // Persisted alongside the row so the reconciliation job can rebuild a
    // CMI entry from the stored metadata alone, without recomputing the
    // per-module taxonomy (spec §4.5 back-fill).
    metadata.fill_if_absent("keywords", json!(keywords));

    let final_categories = metadata.categories();
    let final_categories = if final_categories.is_empty() { categories } else { final_categories };

    ProcessedMetadata {
        metadata,
        title,
        summary,
        keywords,
        categories: final_categories,
        importance,
    }
}

fn dedup_bounded_n(items: Vec<String>, max: usize) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for item in items {
        if item.trim().is_empty() {
            continue;
        }
        if seen.insert(item.clone()) {
            out.push(item);
        }
        if out.len() >= max {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn technical_policy() -> ProcessingPolicy {
        ProcessingPolicy {
            default_type: "technical".to_string(),
            taxonomy: vec![
                ("bug".to_string(), vec_of(&["bug", "crash", "error"])),
                ("feature".to_string(), vec_of(&["feature", "add"])),
            ],
            entity_fields: vec![EntityField::ActionItems, EntityField::Deadlines],
            lexicon: SignalLexicon::generic(),
            importance_weights: ImportanceWeights::default(),
        }
    }

    #[test]
    fn auto_categorize_picks_highest_scoring_bucket() {
        let category = auto_categorize("there is a crash, a bug, another bug", &technical_policy().taxonomy);
        assert_eq!(category, "bug");
    }

    #[test]
    fn auto_categorize_falls_back_to_general() {
        let category = auto_categorize("nothing relevant here", &technical_policy().taxonomy);
        assert_eq!(category, "general");
    }

    #[test]
    fn caller_supplied_category_is_not_overwritten() {
        let mut metadata = Metadata::new();
        metadata.set("category", json!("custom"));
        let processed = process_metadata("this is a bug", metadata, &technical_policy());
        assert_eq!(processed.metadata.get("category"), Some(&json!("custom")));
    }

    #[test]
    fn entities_are_bounded() {
        let mut content = String::new();
        for i in 0..30 {
            content.push_str(&format!("TODO item number {} should happen. ", i));
        }
        let entities = extract_entities(&content, &[EntityField::ActionItems]);
        assert!(entities.get("action_items").unwrap().len() <= MAX_ENTITY_LEN);
    }

    #[test]
    fn response_required_detected_from_question_mark() {
        let signals = analyze_signals("Can you send this by Friday?", &SignalLexicon::generic());
        assert!(signals.response_required);
    }

    #[test]
    fn importance_is_clamped_to_unit_interval() {
        let signals = SignalAnalysis {
            valence: 1.0,
            sentiment: "positive".into(),
            tone: "urgent".into(),
            priority: "high".into(),
            response_required: true,
        };
        let mut entities = HashMap::new();
        entities.insert("deadlines".to_string(), vec!["today".to_string()]);
        entities.insert("participants".to_string(), vec!["a".into(), "b".into(), "c".into(), "d".into(), "e".into(), "f".into()]);
        let weights = ImportanceWeights::default();
        let score = score_importance(&signals, &entities, &weights);
        assert!((0.0..=1.0).contains(&score));
    }
}
