//! nix-src: source fetching and pinning for Nix build descriptions.
//!
//! nix-src turns a human reference such as `NixOS/nixpkgs`,
//! `owner/repo@v1.2.0` or a plain URL into a pinned descriptor: an exact
//! revision plus the content hash Nix will verify, rendered as JSON or as a
//! ready-to-paste Nix expression.
//!
//! # Modules
//!
//! - [`source`]: reference parsing, locators and resolved descriptors
//! - [`fetch`]: fetcher backends producing content hashes
//! - [`revision`]: branch-head lookup
//! - [`update`]: updater backends listing and pinning versions
//! - [`version`]: version ordering
//! - [`serialize`]: descriptor rendering
//! - [`registry`]: backend name lookup
//! - [`resolve`]: the resolution orchestrator
//! - [`error`]: error types for nix-src operations

pub mod archive;
pub mod config;
pub mod error;
pub mod fetch;
pub mod hash;
pub mod registry;
pub mod remote;
pub mod resolve;
pub mod revision;
pub mod serialize;
pub mod source;
pub mod tracked;
pub mod update;
pub mod version;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use error::NixSrcError;
pub use resolve::Resolver;
pub use source::{ResolvedDescriptor, SourceLocator};
pub use version::Version;

use config::{
    HashStrategy, ResolverConfig, DEFAULT_BRANCH, DEFAULT_RETRIES, DEFAULT_TIMEOUT_SECS,
};
use remote::github::{DEFAULT_API_BASE, DEFAULT_ARCHIVE_BASE};
use serialize::Format;
use tracked::{path_to_src_json, TrackedSource};

const DEFAULT_REPO: &str = "NixOS/nixpkgs";
const STDOUT_SINK: &str = "-";

/// The nix-src CLI application.
#[derive(Parser)]
#[command(name = "nix-src")]
#[command(version, author, about)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Settings shared by all subcommands.
#[derive(clap::Args)]
struct GlobalArgs {
    /// GitHub API base URL.
    #[arg(long, global = true, env = "NIX_SRC_API_URL", default_value = DEFAULT_API_BASE)]
    api_url: String,

    /// Base URL serving repository archives.
    #[arg(long, global = true, env = "NIX_SRC_ARCHIVE_URL", default_value = DEFAULT_ARCHIVE_BASE)]
    archive_url: String,

    /// Per-request timeout in seconds.
    #[arg(long, global = true, env = "NIX_SRC_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Extra attempts after a network failure.
    #[arg(long, global = true, env = "NIX_SRC_RETRIES", default_value_t = DEFAULT_RETRIES)]
    retries: u32,

    /// How to compute hashes ('builtin' or 'nix-prefetch-url').
    #[arg(long, global = true, env = "NIX_SRC_HASHER", default_value = "builtin")]
    hasher: HashStrategy,

    /// Log debug details to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
}

impl GlobalArgs {
    fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            api_url: self.api_url.clone(),
            archive_url: self.archive_url.clone(),
            timeout: Duration::from_secs(self.timeout),
            retries: self.retries,
            hash_strategy: self.hasher,
        }
    }
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Resolve a source and print its pinned descriptor.
    Dump(DumpArgs),
    /// Resolve a source and write it to a tracked .src.json file.
    Init(InitArgs),
    /// Re-pin tracked .src.json files in place.
    Update(UpdateArgs),
    /// List the versions available for a tracked source, newest first.
    Versions(VersionsArgs),
}

/// Which source to resolve.
#[derive(clap::Args)]
struct SourceArgs {
    /// Source reference: owner/repo[@rev] or a URL.
    #[arg(short, long, value_name = "owner/repo[@rev]", default_value = DEFAULT_REPO)]
    repo: String,

    /// Branch whose head is pinned when the reference has no revision.
    #[arg(short, long, default_value = DEFAULT_BRANCH)]
    branch: String,
}

/// Arguments for the dump subcommand.
#[derive(clap::Args)]
struct DumpArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Output format ('nix' or 'json').
    #[arg(short, long, default_value = "nix")]
    format: Format,

    /// Output file; '-' is stdout.
    #[arg(short, long, default_value = STDOUT_SINK)]
    out: String,

    /// Fail unless the computed hash equals this one.
    #[arg(long, value_name = "HASH")]
    expect_hash: Option<String>,
}

/// Arguments for the init subcommand.
#[derive(clap::Args)]
struct InitArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// A .src.json file, a .nix file next to it, or a directory.
    #[arg(default_value = ".")]
    path: PathBuf,
}

/// Arguments for the update subcommand.
#[derive(clap::Args)]
struct UpdateArgs {
    /// Pin this version instead of the newest one.
    #[arg(long)]
    version: Option<Version>,

    /// Tracked sources (.src.json files, .nix files or directories).
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

/// Arguments for the versions subcommand.
#[derive(clap::Args)]
struct VersionsArgs {
    /// Tracked source (.src.json file, .nix file or directory).
    path: PathBuf,
}

/// Run the nix-src CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), NixSrcError> {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    let Some(command) = cli.command else {
        println!("nix-src {}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("Nix source fetcher and pinning tool.");
        println!();
        println!("Run 'nix-src --help' for usage information.");
        return Ok(());
    };

    let resolver = Resolver::from_config(&cli.global.resolver_config());
    match command {
        Commands::Dump(args) => run_dump(&resolver, args),
        Commands::Init(args) => run_init(&resolver, args),
        Commands::Update(args) => run_update(&resolver, args),
        Commands::Versions(args) => run_versions(&resolver, args),
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "nix_src=debug,info"
    } else {
        "nix_src=info,warn"
    };
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Execute the dump subcommand.
fn run_dump(resolver: &Resolver, args: DumpArgs) -> Result<(), NixSrcError> {
    let descriptor = resolver.resolve(
        &args.source.repo,
        &args.source.branch,
        args.expect_hash.as_deref(),
    )?;
    let rendered = serialize::serialize(&descriptor, args.format);

    if args.out == STDOUT_SINK {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&rendered)?;
        stdout.flush()?;
    } else {
        let path = Path::new(&args.out);
        fs::write(path, rendered).map_err(|source| NixSrcError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

/// Execute the init subcommand.
fn run_init(resolver: &Resolver, args: InitArgs) -> Result<(), NixSrcError> {
    let locator = source::parse_reference(&args.source.repo)?;
    let follows_branch = matches!(locator, SourceLocator::Repository { revision: None, .. });

    let descriptor = resolver.resolve_locator(locator.clone(), &args.source.branch, None)?;

    let mut tracked = TrackedSource::new(locator);
    if follows_branch {
        tracked.branch = Some(args.source.branch);
    }
    let target = path_to_src_json(&args.path);
    tracked.repinned(&descriptor).store(&target)?;

    println!("{}: {}", target.display(), descriptor);
    Ok(())
}

/// Execute the update subcommand.
///
/// Every path is attempted; failures are reported and counted.
fn run_update(resolver: &Resolver, args: UpdateArgs) -> Result<(), NixSrcError> {
    let total = args.paths.len();
    let mut failed = 0;
    let mut loaded = Vec::new();

    for path in &args.paths {
        let target = path_to_src_json(path);
        match TrackedSource::load(&target) {
            Ok(tracked) => loaded.push((target, tracked)),
            Err(err) => {
                eprintln!("{}: {}", target.display(), err);
                failed += 1;
            }
        }
    }

    let sources: Vec<TrackedSource> = loaded.iter().map(|(_, tracked)| tracked.clone()).collect();
    let results = resolver.update_many(&sources, args.version.as_ref());

    for ((target, tracked), result) in loaded.iter().zip(results) {
        let outcome = result
            .map_err(NixSrcError::from)
            .and_then(|descriptor| {
                tracked.repinned(&descriptor).store(target)?;
                Ok(descriptor)
            });
        match outcome {
            Ok(descriptor) => println!("{}: {}", target.display(), descriptor),
            Err(err) => {
                eprintln!("{}: {}", target.display(), err);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(NixSrcError::UpdatesFailed { failed, total });
    }
    Ok(())
}

/// Execute the versions subcommand.
fn run_versions(resolver: &Resolver, args: VersionsArgs) -> Result<(), NixSrcError> {
    let tracked = TrackedSource::load(&path_to_src_json(&args.path))?;
    for version in resolver.versions(&tracked)? {
        println!("{version}");
    }
    Ok(())
}
