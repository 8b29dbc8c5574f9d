//! Prompt rules and the prompt builder.
//!
//! Prompt rules (by default `config/prompt-rules.json`) describe per-page
//! topics and per-container styles:
//!
//! ```json
//! {
//!   "negatives": "text, logos, people",
//!   "topics": {
//!     "bongs": { "subject": "glass water pipes", "materials": "borosilicate glass", "details": "studio reflections" }
//!   },
//!   "containers": {
//!     "hero": { "style": "wide editorial banner", "avoid": "clutter" },
//!     "slider": { "style": "lifestyle scene" }
//!   }
//! }
//! ```
//!
//! [`PromptBuilder::build`] turns a page/container target into a
//! [`PromptMeta`], the same JSON the generation workflow accepts as metadata.

use crate::config::ConfigError;
use crate::naming;
use crate::schema::{self, Violations};
use crate::types::Container;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Topic {
    pub subject: String,
    pub materials: String,
    pub details: String,
}

impl Default for Topic {
    fn default() -> Self {
        Self {
            subject: "shop interior".to_string(),
            materials: "modern fixtures".to_string(),
            details: "clean lighting".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContainerRule {
    pub style: String,
    #[serde(default)]
    pub avoid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PromptRules {
    #[serde(default)]
    pub negatives: Option<String>,
    #[serde(default)]
    pub topics: BTreeMap<String, Topic>,
    pub containers: BTreeMap<Container, ContainerRule>,
}

impl PromptRules {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text, path)
    }

    pub fn from_json_str(text: &str, file: &Path) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(text).map_err(|source| ConfigError::Json {
            path: file.to_path_buf(),
            source,
        })?;
        let mut violations = Violations::new();
        check_rules(&value, &mut violations);
        violations.into_result(file)?;

        serde_json::from_value(value).map_err(|source| ConfigError::Json {
            path: file.to_path_buf(),
            source,
        })
    }

    /// Topic for a page: by its last path segment, else the neutral default.
    pub fn topic_for(&self, page: &str) -> Topic {
        naming::page_slug(page)
            .and_then(|slug| self.topics.get(slug))
            .cloned()
            .unwrap_or_default()
    }

    /// Rule for a container, falling back to the hero rule.
    pub fn container_rule(&self, container: Container) -> Option<&ContainerRule> {
        self.containers
            .get(&container)
            .or_else(|| self.containers.get(&Container::Hero))
    }
}

fn check_rules(root: &Value, v: &mut Violations) {
    let Some(rules) = v.object(root, "") else {
        return;
    };
    v.known_keys(rules, &["negatives", "topics", "containers"], "");

    if let Some(negatives) = rules.get("negatives") {
        v.string(negatives, "negatives");
    }

    if let Some(topics) = rules.get("topics") {
        if let Some(topics) = v.object(topics, "topics") {
            for (slug, topic) in topics {
                let path = schema::field("topics", slug);
                let Some(topic) = v.object(topic, &path) else {
                    continue;
                };
                v.known_keys(topic, &["subject", "materials", "details"], &path);
                for key in ["subject", "materials", "details"] {
                    if let Some(value) = v.required(topic, key, &path) {
                        v.non_empty_string(value, &schema::field(&path, key));
                    }
                }
            }
        }
    }

    let Some(containers) = v.required(rules, "containers", "") else {
        return;
    };
    let Some(containers) = v.object(containers, "containers") else {
        return;
    };
    if !containers.contains_key(Container::Hero.as_str()) {
        v.push("containers.hero", "missing required field");
    }
    for (name, rule) in containers {
        let path = schema::field("containers", name);
        if name.parse::<Container>().is_err() {
            v.push(&path, "unknown container (expected hero, slider or product)");
            continue;
        }
        let Some(rule) = v.object(rule, &path) else {
            continue;
        };
        v.known_keys(rule, &["style", "avoid"], &path);
        if let Some(style) = v.required(rule, "style", &path) {
            v.non_empty_string(style, &schema::field(&path, "style"));
        }
        if let Some(avoid) = rule.get("avoid") {
            v.string(avoid, &schema::field(&path, "avoid"));
        }
    }
}

/// Prompt plus the metadata recorded with the generated images.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptMeta {
    pub prompt: String,
    pub page: Option<String>,
    pub container: Option<String>,
    pub alt: Option<String>,
    pub description: Option<String>,
    pub keywords: Vec<String>,
}

/// Inputs for one prompt.
#[derive(Debug, Clone)]
pub struct PromptRequest<'a> {
    pub page: &'a str,
    pub container: Container,
    pub brand: &'a str,
    /// Comma-separated keywords.
    pub keywords: &'a str,
    pub description: &'a str,
    pub alt: &'a str,
}

pub struct PromptBuilder<'r> {
    rules: &'r PromptRules,
}

impl<'r> PromptBuilder<'r> {
    pub fn new(rules: &'r PromptRules) -> Self {
        Self { rules }
    }

    /// Compose the prompt text for a page/container target.
    pub fn prompt_text(&self, request: &PromptRequest<'_>) -> String {
        let topic = self.rules.topic_for(request.page);
        let rule = self.rules.container_rule(request.container);
        let style = rule.map(|r| r.style.as_str()).unwrap_or_default();
        let avoid = [
            self.rules.negatives.as_deref(),
            rule.and_then(|r| r.avoid.as_deref()),
        ]
        .into_iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .collect::<Vec<_>>()
        .join(", ");

        let mut parts = vec![format!(
            "{}, {}, {}. Brand mood: {}.",
            topic.subject, topic.materials, topic.details, request.brand
        )];
        if !request.keywords.trim().is_empty() {
            parts.push(format!("Keywords: {}", request.keywords.trim()));
        }
        if !request.description.trim().is_empty() {
            parts.push(format!("Context: {}", request.description.trim()));
        }
        parts.push(format!("Style: {}. Avoid: {}.", style, avoid));
        parts.join(" ")
    }

    pub fn build(&self, request: &PromptRequest<'_>) -> PromptMeta {
        let alt = if request.alt.trim().is_empty() {
            format!("{} {} visual", request.brand, request.container)
        } else {
            request.alt.to_string()
        };
        PromptMeta {
            prompt: self.prompt_text(request),
            page: Some(request.page.to_string()),
            container: Some(request.container.to_string()),
            alt: Some(alt),
            description: Some(request.description.to_string()).filter(|d| !d.is_empty()),
            keywords: split_keywords(request.keywords),
        }
    }
}

/// Split on commas, trim, drop empties.
pub fn split_keywords(keywords: &str) -> Vec<String> {
    keywords
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::PROMPT_RULES_JSON;

    fn rules() -> PromptRules {
        PromptRules::from_json_str(PROMPT_RULES_JSON, Path::new("prompt-rules.json")).unwrap()
    }

    fn request(page: &'static str, container: Container) -> PromptRequest<'static> {
        PromptRequest {
            page,
            container,
            brand: "Acme",
            keywords: "",
            description: "",
            alt: "",
        }
    }

    #[test]
    fn known_topic_and_container_compose_prompt() {
        let rules = rules();
        let text = PromptBuilder::new(&rules).prompt_text(&request("/shop/bongs/", Container::Hero));
        assert_eq!(
            text,
            "glass water pipes, borosilicate glass, studio reflections. Brand mood: Acme. \
             Style: wide editorial banner. Avoid: text, logos, clutter."
        );
    }

    #[test]
    fn unknown_page_uses_neutral_topic() {
        let rules = rules();
        let text = PromptBuilder::new(&rules).prompt_text(&request("/about", Container::Slider));
        assert!(text.starts_with("shop interior, modern fixtures, clean lighting."));
        assert!(text.ends_with("Style: lifestyle scene. Avoid: text, logos."));
    }

    #[test]
    fn missing_container_rule_falls_back_to_hero() {
        let rules = rules();
        let text = PromptBuilder::new(&rules).prompt_text(&request("/", Container::Product));
        assert!(text.contains("Style: wide editorial banner."));
    }

    #[test]
    fn keywords_and_context_fragments_only_when_present() {
        let rules = rules();
        let mut req = request("/", Container::Hero);
        req.keywords = "glass, steel";
        req.description = "spring sale";
        let text = PromptBuilder::new(&rules).prompt_text(&req);
        assert!(text.contains("Brand mood: Acme. Keywords: glass, steel Context: spring sale Style:"));
        assert!(!text.contains("  "));
    }

    #[test]
    fn meta_defaults_alt_and_splits_keywords() {
        let rules = rules();
        let mut req = request("/shop", Container::Slider);
        req.keywords = " glass ,, steel ,";
        let meta = PromptBuilder::new(&rules).build(&req);
        assert_eq!(meta.alt.as_deref(), Some("Acme slider visual"));
        assert_eq!(meta.keywords, vec!["glass", "steel"]);
        assert_eq!(meta.page.as_deref(), Some("/shop"));
        assert_eq!(meta.container.as_deref(), Some("slider"));
        assert_eq!(meta.description, None);
    }

    #[test]
    fn explicit_alt_is_kept() {
        let rules = rules();
        let mut req = request("/", Container::Hero);
        req.alt = "Our counter";
        assert_eq!(PromptBuilder::new(&rules).build(&req).alt.as_deref(), Some("Our counter"));
    }

    #[test]
    fn meta_json_round_trips_through_generate_input() {
        let rules = rules();
        let meta = PromptBuilder::new(&rules).build(&request("/shop", Container::Hero));
        let json = serde_json::to_string(&meta).unwrap();
        let back: PromptMeta = serde_json::from_str(&json).unwrap();
        assert_eq!(back, meta);
        let sparse: PromptMeta = serde_json::from_str(r#"{"prompt":"only"}"#).unwrap();
        assert_eq!(sparse.prompt, "only");
        assert!(sparse.keywords.is_empty());
    }

    #[test]
    fn rules_validation_reports_all_problems() {
        let err = PromptRules::from_json_str(
            r#"{
                "topics": { "x": { "subject": "s", "materials": "" } },
                "containers": { "slider": { "avoid": 3 }, "gallery": { "style": "g" } },
                "extra": 1
            }"#,
            Path::new("rules.json"),
        )
        .unwrap_err();
        match err {
            ConfigError::Invalid { violations, .. } => assert_eq!(
                violations,
                vec![
                    "extra: unknown field",
                    "topics.x.materials: must not be empty",
                    "topics.x.details: missing required field",
                    "containers.hero: missing required field",
                    "containers.gallery: unknown container (expected hero, slider or product)",
                    "containers.slider.style: missing required field",
                    "containers.slider.avoid: must be a string",
                ]
            ),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
