//! # Pixpress
//!
//! Produces visual assets for a content site and binds them to page slots.
//! Images come from a remote image model (generated from a prompt, or edited
//! from a product photo), get encoded into every size and format the site
//! needs, are recorded in an append-only manifest, and are finally linked
//! into the content database the site build reads.
//!
//! # Architecture: Produce, Record, Link
//!
//! ```text
//! 1. Produce   prompt / photo  →  provider  →  encoder  →  public/img/**     (files)
//! 2. Record    files + metadata               →  public/img/manifest.json     (append-only)
//! 3. Link      manifest window / latest match →  content/images.json          (page → slots)
//! ```
//!
//! Producing and linking are separate commands. The generate report prints
//! the manifest index of its first entry; passing it to `link --from-index`
//! links exactly what that run produced.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`provider`] | `ImageProvider` trait, OpenAI HTTP client, retry decorator |
//! | [`imaging`] | Pure-Rust encoding: cover crop, multi-format output, previews, background cut-out |
//! | [`generate`] | Preset + prompt → provider → encoder → manifest |
//! | [`edit`] | Per-file product edits with remote edit → local cut-out → neutral generate fallback |
//! | [`logo`] | Logo cleanup to PNG with an optional traced SVG |
//! | [`manifest`] | Append-only record of every produced image |
//! | [`linker`] | Windowed and latest-match selection into the content database |
//! | [`presets`] | Preset catalogue loaded from JSON and validated |
//! | [`prompt`] | Prompt rules and the prompt builder |
//! | [`config`] | `pixpress.toml` loading, merging over stock defaults, env overrides |
//! | [`store`] | Whole-document JSON read and temp-file-then-rename write |
//! | [`schema`] | Violation collector used by the JSON document validators |
//! | [`types`] | `Container` and provider `ImageSize` |
//! | [`naming`] | Slugs, timestamped stems, variant and sidecar file names, page keys |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## The Manifest Is Append-Only
//!
//! Entries are never edited, removed or deduplicated, and their order is the
//! append order. That makes a manifest index a stable handle on "what one run
//! produced", which is what windowed linking is built on.
//!
//! ## No Locking
//!
//! The manifest and content database are rewritten whole. Writes go through a
//! temp file and a rename, so readers never see a half-written document, but
//! two concurrent invocations can still lose one update. Serialize runs that
//! touch the same files.
//!
//! ## Retries Live in the Provider
//!
//! Workflows call the provider once per operation. Retry with exponential
//! backoff is a decorator ([`provider::Retrying`]) wrapped around the HTTP
//! client, so the edit fallback chain only sees a tier fail after its retries
//! are exhausted.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, resizing (Lanczos3) and encoding to JPEG, PNG, WebP and AVIF all
//! use the `image` crate, so the binary has no system image dependencies.

pub mod config;
pub mod edit;
pub mod generate;
pub mod imaging;
pub mod linker;
pub mod logo;
pub mod manifest;
pub mod naming;
pub mod output;
pub mod presets;
pub mod prompt;
pub mod provider;
pub mod schema;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
