//! Adding a genre or tag to many items at once

use regex::Regex;
use std::str::FromStr;
use thiserror::Error;

use crate::abs::models::BatchUpdate;
use crate::abs::LibraryItem;
use crate::genres::{with_value, GenreTarget};

/// Tag that makes the server refresh an item's metadata on the next scan
pub const FORCE_METADATA_TAG: &str = "force-metadata";

/// Batch entries adding `value` to every item that does not carry it yet
pub fn add_value_updates(items: &[LibraryItem], target: GenreTarget, value: &str) -> Vec<BatchUpdate> {
    items
        .iter()
        .filter_map(|item| {
            let values = with_value(target.values(item), value)?;
            Some(BatchUpdate {
                id: item.id.clone(),
                media_payload: target.patch_payload(&values),
            })
        })
        .collect()
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleError {
    #[error("expected <regex>:<value>, got {0:?}")]
    MissingSeparator(String),

    #[error("empty regex in {0:?}")]
    EmptyPattern(String),

    #[error("empty value in {0:?}")]
    EmptyValue(String),

    #[error("invalid regex {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// `<regex>:<value>`: items whose path matches get `value`.
///
/// The regex may itself contain colons; the value starts after the last one.
#[derive(Debug, Clone)]
pub struct PathTagRule {
    pub pattern: Regex,
    pub value: String,
}

impl FromStr for PathTagRule {
    type Err = RuleError;

    fn from_str(rule: &str) -> Result<Self, Self::Err> {
        let (pattern, value) = rule
            .rsplit_once(':')
            .ok_or_else(|| RuleError::MissingSeparator(rule.to_string()))?;
        if pattern.is_empty() {
            return Err(RuleError::EmptyPattern(rule.to_string()));
        }
        let value = value.trim();
        if value.is_empty() {
            return Err(RuleError::EmptyValue(rule.to_string()));
        }

        let pattern = Regex::new(pattern).map_err(|e| RuleError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            pattern,
            value: value.to_string(),
        })
    }
}

impl PathTagRule {
    /// Items without a path never match
    pub fn matches(&self, item: &LibraryItem) -> bool {
        item.path
            .as_deref()
            .is_some_and(|path| self.pattern.is_match(path))
    }
}

/// Outcome of applying all rules to a library
#[derive(Debug, Default)]
pub struct RulePlan {
    /// One entry per changed item, carrying every value its rules added
    pub updates: Vec<BatchUpdate>,
    /// Matching item ids per rule, in rule order
    pub matched: Vec<Vec<String>>,
}

/// Apply every rule to every item.
///
/// Rules stack: an item matched by two rules gets both values in a single
/// update. Items already carrying all their values are not updated.
pub fn plan_rules(items: &[LibraryItem], rules: &[PathTagRule], target: GenreTarget) -> RulePlan {
    let mut plan = RulePlan {
        matched: vec![Vec::new(); rules.len()],
        ..Default::default()
    };

    for item in items {
        let mut values: Vec<String> = target.values(item).to_vec();
        let mut changed = false;

        for (rule, matched) in rules.iter().zip(plan.matched.iter_mut()) {
            if !rule.matches(item) {
                continue;
            }
            matched.push(item.id.clone());
            if let Some(next) = with_value(&values, &rule.value) {
                values = next;
                changed = true;
            }
        }

        if changed {
            plan.updates.push(BatchUpdate {
                id: item.id.clone(),
                media_payload: target.patch_payload(&values),
            });
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(id: &str, path: Option<&str>, tags: &[&str]) -> LibraryItem {
        let mut item = LibraryItem {
            id: id.to_string(),
            path: path.map(String::from),
            ..Default::default()
        };
        item.media.tags = tags.iter().map(|t| t.to_string()).collect();
        item
    }

    fn rule(text: &str) -> PathTagRule {
        text.parse().unwrap()
    }

    #[test]
    fn test_add_value_updates_skips_tagged_items() {
        let items = vec![
            item("li_1", None, &["fav"]),
            item("li_2", None, &[FORCE_METADATA_TAG]),
            item("li_3", None, &[]),
        ];

        let updates = add_value_updates(&items, GenreTarget::Tags, FORCE_METADATA_TAG);

        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].id, "li_1");
        assert_eq!(
            updates[0].media_payload,
            json!({"tags": ["fav", "force-metadata"]})
        );
        assert_eq!(updates[1].id, "li_3");
    }

    #[test]
    fn test_rule_splits_at_last_colon() {
        let parsed = rule(r"^C:\\Books\\Kids:children");
        assert_eq!(parsed.value, "children");
        assert_eq!(parsed.pattern.as_str(), r"^C:\\Books\\Kids");

        let parsed = rule("/sci-fi/: Science Fiction ");
        assert_eq!(parsed.value, "Science Fiction");
    }

    #[test]
    fn test_invalid_rules() {
        assert_eq!(
            "no separator".parse::<PathTagRule>().unwrap_err(),
            RuleError::MissingSeparator("no separator".to_string())
        );
        assert!(matches!(
            ":tag".parse::<PathTagRule>(),
            Err(RuleError::EmptyPattern(_))
        ));
        assert!(matches!(
            "/books/:".parse::<PathTagRule>(),
            Err(RuleError::EmptyValue(_))
        ));
        assert!(matches!(
            "/books/(:tag".parse::<PathTagRule>(),
            Err(RuleError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_rule_matches_path_only() {
        let kids = rule("/audiobooks/Kids/:children");
        assert!(kids.matches(&item("li_1", Some("/audiobooks/Kids/Matilda"), &[])));
        assert!(!kids.matches(&item("li_2", Some("/audiobooks/Adult/Dune"), &[])));
        assert!(!kids.matches(&item("li_3", None, &[])));
    }

    #[test]
    fn test_plan_rules_stacks_values_per_item() {
        let items = vec![
            item("li_1", Some("/audiobooks/Kids/Dahl/Matilda"), &["fav"]),
            item("li_2", Some("/audiobooks/Adult/Herbert/Dune"), &[]),
            item("li_3", Some("/audiobooks/Kids/Rowling/HP1"), &["children"]),
        ];
        let rules = vec![
            rule("/Kids/:children"),
            rule("/Dahl/:dahl"),
            rule("/Poetry/:poetry"),
        ];

        let plan = plan_rules(&items, &rules, GenreTarget::Tags);

        assert_eq!(plan.matched[0], vec!["li_1", "li_3"]);
        assert_eq!(plan.matched[1], vec!["li_1"]);
        assert!(plan.matched[2].is_empty());

        // li_3 matched but already had the tag
        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].id, "li_1");
        assert_eq!(
            plan.updates[0].media_payload,
            json!({"tags": ["fav", "children", "dahl"]})
        );
    }

    #[test]
    fn test_plan_rules_for_genres() {
        let mut book = item("li_1", Some("/audiobooks/Horror/It"), &["fav"]);
        book.media.metadata.genres = vec!["Fiction".to_string()];

        let plan = plan_rules(&[book], &[rule("(?i)/horror/:Horror")], GenreTarget::Genres);

        assert_eq!(
            plan.updates[0].media_payload,
            json!({"metadata": {"genres": ["Fiction", "Horror"]}})
        );
    }
}
