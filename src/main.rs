use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use pixpress::config::{self, PipelineConfig};
use pixpress::edit::{self, EditJob, EditMode};
use pixpress::generate::{self, GenerateRequest};
use pixpress::imaging::{LogoParams, RustBackend};
use pixpress::linker::{self, LinkRequest, Selection};
use pixpress::logo::{self, LogoJob, LogoSource};
use pixpress::presets::PresetCatalog;
use pixpress::prompt::{PromptBuilder, PromptMeta, PromptRequest, PromptRules};
use pixpress::provider::{OpenAiProvider, Retrying};
use pixpress::types::Container;
use pixpress::{output, store};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    if env!("PIXPRESS_RELEASED") == "true" {
        return env!("CARGO_PKG_VERSION");
    }
    let hash = env!("PIXPRESS_GIT_HASH");
    if hash.is_empty() {
        "dev@unknown"
    } else {
        Box::leak(format!("dev@{hash}").into_boxed_str())
    }
}

#[derive(Parser)]
#[command(name = "pixpress")]
#[command(about = "Generate, encode, record and link AI-produced images for a content site")]
#[command(long_about = "\
Generate, encode, record and link AI-produced images for a content site

Typical flow:

  pixpress generate --preset hero_main --prompt \"sunlit shop counter\"
      → public/img/hero/*.jpg|webp + manifest entry, prints its index N
  pixpress link --page /shop --container hero --from-index N
      → content/images.json[\"/shop\"].hero

  pixpress prompt --page /shop/bongs --container slider > meta.json
  pixpress generate --preset slider_emotion --meta meta.json
  pixpress edit --input input/product --mode isolate-white
  pixpress logo --file brand.webp

Environment:
  OPENAI_API_KEY       provider key (required for generate/edit)
  OPENAI_TIMEOUT_MS    per-request timeout
  OPENAI_MAX_RETRIES   retries after the first attempt
  OPENAI_BASE_URL      API base URL
  LOG_LEVEL, RUST_LOG  log filter (default info)

Run 'pixpress gen-config' to generate a documented pixpress.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (default: pixpress.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Strategy {
    /// Entries from --from-index on (default: last entry only)
    Windowed,
    /// Last entry recorded for this page and container
    Latest,
}

#[derive(Subcommand)]
enum Command {
    /// Generate images from a preset and record them in the manifest
    Generate {
        /// Preset name from the presets file
        #[arg(long)]
        preset: String,
        /// Prompt text (or use --meta)
        #[arg(long)]
        prompt: Option<String>,
        /// Number of images (default: preset count, else 1)
        #[arg(long)]
        count: Option<u32>,
        /// JSON file with {prompt, page, container, alt, description, keywords}
        #[arg(long)]
        meta: Option<PathBuf>,
    },
    /// Edit every product photo in a directory
    Edit {
        #[arg(long, default_value = "input/product")]
        input: PathBuf,
        /// isolate-white, transparent or enhance
        #[arg(long, default_value = "isolate-white")]
        mode: EditMode,
    },
    /// Bind manifest entries to a page container in the content database
    Link {
        #[arg(long)]
        page: String,
        /// hero, slider or product
        #[arg(long)]
        container: Container,
        /// Only entries of this preset (latest: fallback preset)
        #[arg(long)]
        preset: Option<String>,
        /// Manifest index to start from
        #[arg(long)]
        from_index: Option<usize>,
        #[arg(long, value_enum, default_value = "windowed")]
        strategy: Strategy,
        /// Manifest file (default from config)
        #[arg(long)]
        manifest: Option<PathBuf>,
        /// Content database file (default from config)
        #[arg(long)]
        target: Option<PathBuf>,
    },
    /// Build a prompt and its metadata for a page container
    Prompt {
        #[arg(long)]
        page: String,
        #[arg(long)]
        container: Container,
        /// Brand mood (default from config)
        #[arg(long)]
        brand: Option<String>,
        /// Comma-separated keywords
        #[arg(long, default_value = "")]
        keywords: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        alt: String,
        /// Write the meta JSON here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Clean a logo to PNG and trace it to SVG
    Logo {
        /// Local logo file
        #[arg(long, conflicts_with = "url")]
        file: Option<PathBuf>,
        /// Download the logo from this URL
        #[arg(long)]
        url: Option<String>,
        /// Output directory (default from config)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Minimum width; narrower logos are upscaled (default from config)
        #[arg(long)]
        size: Option<u32>,
        /// Write the PNG only
        #[arg(long)]
        no_vectorize: bool,
    },
    /// Validate config, presets and prompt rules
    Check,
    /// Print a stock pixpress.toml with all options documented
    GenConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "pixpress failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config = config::load_config(cli.config.as_deref(), config::process_env)?;
    init_thread_pool(&config.processing);

    match cli.command {
        Command::Generate {
            preset,
            prompt,
            count,
            meta,
        } => {
            let catalog = PresetCatalog::load(&config.paths.presets)?;
            let chosen = catalog.get(&preset)?;
            let mut meta = match meta {
                Some(path) => generate::load_meta(&path)?,
                None => PromptMeta::default(),
            };
            if let Some(prompt) = prompt {
                meta.prompt = prompt;
            }
            let provider = build_provider(&config)?;
            let request = GenerateRequest {
                preset_name: &preset,
                preset: chosen,
                meta,
                count,
            };
            let report = generate::run_generation(
                &provider,
                &RustBackend::new(),
                &request,
                &config.paths.output_root,
                &config.paths.manifest,
                Utc::now(),
            )
            .await?;
            output::print_generation_report(&report);
        }
        Command::Edit { input, mode } => {
            let provider = build_provider(&config)?;
            let job = EditJob {
                input_dir: &input,
                output_root: &config.paths.output_root,
                manifest_path: &config.paths.manifest,
                mode,
                profile: &config.edit,
                now: Utc::now(),
            };
            let report = edit::run_edit_batch(&provider, &RustBackend::new(), &job).await?;
            output::print_edit_report(&report);
        }
        Command::Link {
            page,
            container,
            preset,
            from_index,
            strategy,
            manifest,
            target,
        } => {
            let selection = match strategy {
                Strategy::Windowed => Selection::Windowed { from_index, preset },
                Strategy::Latest => Selection::LatestMatch {
                    default_preset: preset.unwrap_or_else(|| {
                        config.linker.default_preset(container).to_string()
                    }),
                },
            };
            let request = LinkRequest {
                page,
                container,
                selection,
            };
            let manifest_path = manifest.unwrap_or_else(|| config.paths.manifest.clone());
            let db_path = target.unwrap_or_else(|| config.paths.content_db.clone());
            let outcome = linker::link_files(&manifest_path, &db_path, &request)?;
            output::print_link_outcome(&outcome);
        }
        Command::Prompt {
            page,
            container,
            brand,
            keywords,
            description,
            alt,
            out,
        } => {
            let rules = PromptRules::load(&config.paths.prompt_rules)?;
            let brand = brand.unwrap_or_else(|| config.prompt.brand.clone());
            let meta = PromptBuilder::new(&rules).build(&PromptRequest {
                page: &page,
                container,
                brand: &brand,
                keywords: &keywords,
                description: &description,
                alt: &alt,
            });
            match out {
                Some(path) => store::write_json(&path, &meta)?,
                None => println!("{}", serde_json::to_string_pretty(&meta)?),
            }
        }
        Command::Logo {
            file,
            url,
            out,
            size,
            no_vectorize,
        } => {
            let source = match (file, url) {
                (Some(path), _) => LogoSource::File(path),
                (None, Some(url)) => LogoSource::Url(url),
                (None, None) => LogoSource::Dir(config.logo.input_dir.clone()),
            };
            let output_dir = out.unwrap_or_else(|| config.logo.output_dir.clone());
            let job = LogoJob {
                source,
                output_dir: &output_dir,
                params: LogoParams {
                    min_width: size.unwrap_or(config.logo.min_width).max(1),
                },
                vectorize: config.logo.vectorize && !no_vectorize,
            };
            let report = logo::run_logo(&RustBackend::new(), &job).await?;
            output::print_logo_report(&report);
        }
        Command::Check => {
            let catalog = PresetCatalog::load(&config.paths.presets)?;
            let rules = PromptRules::load(&config.paths.prompt_rules)?;
            output::print_check_summary(&catalog, &rules);
        }
        // printed before the config is loaded
        Command::GenConfig => {}
    }

    Ok(())
}

fn build_provider(
    config: &PipelineConfig,
) -> Result<Retrying<OpenAiProvider>, Box<dyn std::error::Error>> {
    let client = OpenAiProvider::new(config.provider.openai_config())?;
    Ok(Retrying::new(client, config.provider.retry_policy()))
}

/// Install the fmt subscriber. `LOG_LEVEL` wins over `RUST_LOG`; both fall
/// back to `info`. Logs go to stderr so reports on stdout stay clean.
fn init_tracing() {
    let filter = std::env::var("LOG_LEVEL")
        .ok()
        .and_then(|level| EnvFilter::try_new(level).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
