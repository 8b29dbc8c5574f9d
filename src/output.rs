//! CLI output formatting for every command.
//!
//! Output leads with what was produced (image index, edited source, linked
//! slot) and shows file paths as indented context lines.
//!
//! # Output Format
//!
//! ## Generate
//!
//! ```text
//! hero_main: 2 images
//! 001 hero_main-sunlit-shop-counter-2026-03-01T10-15-00-000Z-01
//!     public/img/hero/hero_main-...-01-1920x1080.jpg
//!     public/img/hero/hero_main-...-01-1920x1080.webp
//! 002 hero_main-sunlit-shop-counter-2026-03-01T10-15-00-000Z-02
//!     ...
//! First manifest index: 4 (link --from-index 4)
//! ```
//!
//! ## Edit
//!
//! ```text
//! 001 bong.png (remote edit)
//!     public/img/product/product_edit-bong-...-1200x1200.jpg
//! 002 pipe.jpg (local cut-out)
//!     after remote edit: request failed: timeout
//!     public/img/product/product_edit-pipe-...-1200x1200.jpg
//! Skipped
//!     broken.webp: every tier failed: ...
//! Edited 2, skipped 1
//! ```
//!
//! ## Link
//!
//! ```text
//! /shop slider ← 3 items (3 candidates)
//!     public/img/slider/a-1600x900.jpg
//!     ...
//! ```
//!
//! ## Logo
//!
//! ```text
//! brand.webp
//!     public/img/logos/brand.png
//!     public/img/logos/brand.svg
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure.

use crate::edit::EditReport;
use crate::generate::GenerationReport;
use crate::linker::{LinkOutcome, SlotValue};
use crate::logo::LogoReport;
use crate::presets::PresetCatalog;
use crate::prompt::PromptRules;
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn plural(n: usize, one: &str, many: &str) -> String {
    format!("{} {}", n, if n == 1 { one } else { many })
}

// ============================================================================
// Generate
// ============================================================================

pub fn format_generation_report(report: &GenerationReport) -> Vec<String> {
    let mut lines = vec![format!(
        "{}: {}",
        report.preset,
        plural(report.images.len(), "image", "images")
    )];
    for (i, image) in report.images.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), image.base_name));
        for file in &image.files {
            lines.push(format!("{}{}", indent(1), file.display()));
        }
    }
    lines.push(format!(
        "First manifest index: {} (link --from-index {})",
        report.first_index, report.first_index
    ));
    lines
}

pub fn print_generation_report(report: &GenerationReport) {
    for line in format_generation_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Edit
// ============================================================================

pub fn format_edit_report(report: &EditReport) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, item) in report.edited.iter().enumerate() {
        lines.push(format!(
            "{} {} ({})",
            format_index(i + 1),
            file_name(&item.source),
            item.tier
        ));
        for failure in &item.fell_through {
            lines.push(format!("{}after {}: {}", indent(1), failure.tier, failure.reason));
        }
        for file in &item.files {
            lines.push(format!("{}{}", indent(1), file.display()));
        }
    }
    if !report.skipped.is_empty() {
        lines.push("Skipped".to_string());
        for item in &report.skipped {
            lines.push(format!("{}{}: {}", indent(1), file_name(&item.source), item.reason));
        }
    }
    lines.push(format!(
        "Edited {}, skipped {}",
        report.edited.len(),
        report.skipped.len()
    ));
    if let Some(index) = report.first_index {
        lines.push(format!("First manifest index: {}", index));
    }
    lines
}

pub fn print_edit_report(report: &EditReport) {
    for line in format_edit_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Link
// ============================================================================

pub fn format_link_outcome(outcome: &LinkOutcome) -> Vec<String> {
    let page = if outcome.page_key.is_empty() {
        "/"
    } else {
        outcome.page_key.as_str()
    };
    let what = match &outcome.value {
        SlotValue::List(items) => plural(items.len(), "item", "items"),
        SlotValue::Single(_) => "1 item".to_string(),
    };
    let mut lines = vec![format!(
        "{} {} \u{2190} {} ({})",
        page,
        outcome.container,
        what,
        plural(outcome.candidates, "candidate", "candidates")
    )];
    for item in outcome.value.items() {
        lines.push(format!("{}{}", indent(1), item.file));
    }
    lines
}

pub fn print_link_outcome(outcome: &LinkOutcome) {
    for line in format_link_outcome(outcome) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Summary of the documents `check` validated.
pub fn format_check_summary(presets: &PresetCatalog, rules: &PromptRules) -> Vec<String> {
    let mut lines = vec![format!(
        "Presets: {}",
        plural(presets.len(), "preset", "presets")
    )];
    for name in presets.names() {
        lines.push(format!("{}{}", indent(1), name));
    }
    lines.push(format!(
        "Prompt rules: {}, {}",
        plural(rules.topics.len(), "topic", "topics"),
        plural(rules.containers.len(), "container rule", "container rules")
    ));
    lines.push("Config OK".to_string());
    lines
}

pub fn print_check_summary(presets: &PresetCatalog, rules: &PromptRules) {
    for line in format_check_summary(presets, rules) {
        println!("{}", line);
    }
}

// ============================================================================
// Logo
// ============================================================================

pub fn format_logo_report(report: &LogoReport) -> Vec<String> {
    let mut lines = vec![report.source_name.clone()];
    lines.push(format!("{}{}", indent(1), report.png.display()));
    if let Some(svg) = &report.svg {
        lines.push(format!("{}{}", indent(1), svg.display()));
    }
    lines
}

pub fn print_logo_report(report: &LogoReport) {
    for line in format_logo_report(report) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::{EditedItem, SkippedItem, Tier, TierFailure};
    use crate::generate::GeneratedImage;
    use crate::linker::ContentItem;
    use crate::test_helpers::{PRESETS_JSON, PROMPT_RULES_JSON, entry};
    use crate::types::Container;
    use std::path::PathBuf;

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1234), "1234");
    }

    #[test]
    fn generation_report_lists_images_and_index() {
        let report = GenerationReport {
            preset: "hero_main".into(),
            final_prompt: "p".into(),
            images: vec![GeneratedImage {
                base_name: "hero_main-p-01".into(),
                files: vec![PathBuf::from("out/hero_main-p-01-100x100.jpg")],
            }],
            first_index: 4,
        };
        assert_eq!(
            format_generation_report(&report),
            vec![
                "hero_main: 1 image",
                "001 hero_main-p-01",
                "    out/hero_main-p-01-100x100.jpg",
                "First manifest index: 4 (link --from-index 4)",
            ]
        );
    }

    #[test]
    fn edit_report_shows_tiers_and_skips() {
        let report = EditReport {
            edited: vec![EditedItem {
                source: PathBuf::from("in/pipe.jpg"),
                tier: Tier::LocalCutout,
                fell_through: vec![TierFailure {
                    tier: Tier::RemoteEdit,
                    reason: "timeout".into(),
                }],
                files: vec![PathBuf::from("out/pipe-800x800.jpg")],
            }],
            skipped: vec![SkippedItem {
                source: PathBuf::from("in/broken.webp"),
                reason: "every tier failed".into(),
            }],
            first_index: Some(0),
        };
        assert_eq!(
            format_edit_report(&report),
            vec![
                "001 pipe.jpg (local cut-out)",
                "    after remote edit: timeout",
                "    out/pipe-800x800.jpg",
                "Skipped",
                "    broken.webp: every tier failed",
                "Edited 1, skipped 1",
                "First manifest index: 0",
            ]
        );
    }

    #[test]
    fn empty_edit_report_only_counts() {
        assert_eq!(format_edit_report(&EditReport::default()), vec!["Edited 0, skipped 0"]);
    }

    #[test]
    fn link_outcome_lists_files() {
        let items: Vec<ContentItem> = ["a.jpg", "b.jpg"]
            .iter()
            .map(|f| ContentItem::from_entry(&entry("slider_x", f)).unwrap())
            .collect();
        let outcome = LinkOutcome {
            page_key: "/shop".into(),
            container: Container::Slider,
            candidates: 2,
            value: SlotValue::List(items),
        };
        assert_eq!(
            format_link_outcome(&outcome),
            vec!["/shop slider \u{2190} 2 items (2 candidates)", "    a.jpg", "    b.jpg"]
        );
    }

    #[test]
    fn link_outcome_for_root_page() {
        let item = ContentItem::from_entry(&entry("hero_x", "h.jpg")).unwrap();
        let outcome = LinkOutcome {
            page_key: String::new(),
            container: Container::Hero,
            candidates: 1,
            value: SlotValue::Single(item),
        };
        assert_eq!(format_link_outcome(&outcome)[0], "/ hero \u{2190} 1 item (1 candidate)");
    }

    #[test]
    fn check_summary_counts_documents() {
        let presets = PresetCatalog::from_json_str(PRESETS_JSON, Path::new("p.json")).unwrap();
        let rules = PromptRules::from_json_str(PROMPT_RULES_JSON, Path::new("r.json")).unwrap();
        assert_eq!(
            format_check_summary(&presets, &rules),
            vec![
                "Presets: 3 presets",
                "    hero_main",
                "    product_edit",
                "    slider_emotion",
                "Prompt rules: 1 topic, 2 container rules",
                "Config OK",
            ]
        );
    }

    #[test]
    fn logo_report_lists_outputs() {
        let report = LogoReport {
            source_name: "brand.webp".into(),
            png: PathBuf::from("logos/brand.png"),
            svg: Some(PathBuf::from("logos/brand.svg")),
        };
        assert_eq!(
            format_logo_report(&report),
            vec!["brand.webp", "    logos/brand.png", "    logos/brand.svg"]
        );
        let png_only = LogoReport { svg: None, ..report };
        assert_eq!(format_logo_report(&png_only).len(), 2);
    }
}
