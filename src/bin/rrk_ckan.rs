use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use rrk_ckan_sync::app::{App, CatalogQuery, SyncAction, SyncOptions, SyncReport};
use rrk_ckan_sync::catalog::CatalogHttpClient;
use rrk_ckan_sync::config::{ConfigLoader, LookupTables, ResolvedConfig};
use rrk_ckan_sync::error::SyncError;
use rrk_ckan_sync::ogc::OgcHttpClient;
use rrk_ckan_sync::output::{ConsoleSink, JsonOutput, OutputMode};
use rrk_ckan_sync::package::PackageAssembler;
use rrk_ckan_sync::registry::{CkanHttpClient, OfflineRegistry, RegistryClient};
use rrk_ckan_sync::store::SnapshotStore;

#[derive(Parser)]
#[command(name = "rrk-ckan")]
#[command(about = "Publish RRK California Landscape Metrics and ITS datasets to CKAN")]
#[command(version, author)]
struct Cli {
    /// JSON config file (default: ./rrk-ckan.json when present)
    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true)]
    non_interactive: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Create CKAN packages from RRK")]
    Sync(SyncArgs),
    #[command(about = "Delete every clm- and its- package from CKAN")]
    Purge(PurgeArgs),
    #[command(about = "Print the package one RRK dataset would become")]
    Inspect(InspectArgs),
    #[command(about = "Check whether a dataset name is unique in the RRK taxonomy")]
    CheckTitle(CheckTitleArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FamilyArg {
    Clm,
    Its,
    All,
}

#[derive(Args)]
struct SyncArgs {
    #[arg(long, value_enum, default_value = "all")]
    family: FamilyArg,

    #[arg(long)]
    dry_run: bool,

    #[arg(long)]
    skip_existing: bool,
}

#[derive(Args)]
struct PurgeArgs {
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args)]
struct InspectArgs {
    dataset_id: i64,
}

#[derive(Args)]
struct CheckTitleArgs {
    name: String,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        match report.downcast_ref::<SyncError>() {
            Some(SyncError::DuplicateName(name)) => {
                eprintln!("Error: a dataset with the same name exists in CKAN: {name}");
            }
            Some(SyncError::OrganizationNotFound(org)) => {
                eprintln!("Error: no organization in CKAN has the name: {org}");
            }
            Some(SyncError::RegistryStatus { message, .. }) => {
                eprintln!("Error: {message}");
            }
            _ => eprintln!("{report:?}"),
        }
        if let Some(error) = report.downcast_ref::<SyncError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &SyncError) -> u8 {
    match error {
        SyncError::MissingSetting(_)
        | SyncError::ConfigRead(_)
        | SyncError::ConfigParse(_)
        | SyncError::LookupTable { .. } => 2,
        SyncError::DatasetNotFound(_) => 2,
        SyncError::CatalogHttp(_)
        | SyncError::CatalogStatus { .. }
        | SyncError::RegistryHttp(_)
        | SyncError::RegistryStatus { .. }
        | SyncError::OgcHttp(_) => 3,
        SyncError::DuplicateName(_) | SyncError::OrganizationNotFound(_) => 4,
        SyncError::MissingNotes(_) | SyncError::MissingGisService(_) => 5,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let config = ConfigLoader::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Sync(args) => {
            let lookups = LookupTables::load(&config.download_urls, &config.keywords)?;
            if args.dry_run {
                let org = config.org.clone().unwrap_or_default();
                let app = build_app(&config, OfflineRegistry, org, lookups)?;
                return run_sync(args, &app, output_mode);
            }
            let registry = config.registry()?;
            let ckan = CkanHttpClient::new(&registry)?;
            let app = build_app(&config, ckan, registry.org, lookups)?;
            run_sync(args, &app, output_mode)
        }
        Commands::Purge(args) => {
            let registry = config.registry()?;
            let ckan = CkanHttpClient::new(&registry)?;
            let app = build_app(&config, ckan, registry.org, LookupTables::default())?;
            let report = match output_mode {
                OutputMode::Interactive => app.purge(args.dry_run, &ConsoleSink)?,
                OutputMode::NonInteractive => app.purge(args.dry_run, &JsonOutput)?,
            };
            if matches!(output_mode, OutputMode::NonInteractive) {
                JsonOutput::print_purge(&report).into_diagnostic()?;
            } else if !report.failed.is_empty() {
                println!("not deleted: {}", report.failed.join(", "));
            }
            Ok(())
        }
        Commands::Inspect(args) => {
            let org = config.org.clone().unwrap_or_default();
            let lookups = LookupTables::load(&config.download_urls, &config.keywords)?;
            let app = build_app(&config, OfflineRegistry, org, lookups)?;
            let package = app.inspect(args.dataset_id)?;
            JsonOutput::print_package(&package).into_diagnostic()
        }
        Commands::CheckTitle(args) => {
            let app = build_app(&config, OfflineRegistry, String::new(), LookupTables::default())?;
            let check = app.check_title(&args.name)?;
            match output_mode {
                OutputMode::NonInteractive => JsonOutput::print_title_check(&check).into_diagnostic(),
                OutputMode::Interactive => {
                    let verdict = if check.unique { "unique" } else { "not unique" };
                    println!("{}: {verdict} {:?}", check.name, check.dataset_ids);
                    Ok(())
                }
            }
        }
    }
}

fn build_app<R: RegistryClient>(
    config: &ResolvedConfig,
    registry: R,
    org: String,
    lookups: LookupTables,
) -> Result<App<CatalogHttpClient, R, OgcHttpClient>, SyncError> {
    let catalog = CatalogHttpClient::new(&config.rrk_api_url)?;
    let ogc = OgcHttpClient::new()?;
    let assembler = PackageAssembler::new(
        org,
        config.endpoints.clone(),
        config.disambiguated_labels.clone(),
        lookups,
    );
    let query = CatalogQuery {
        collection_id: config.collection_id,
        taxonomy_id: config.taxonomy_id,
        page_limit: config.page_limit,
    };
    Ok(App::new(
        catalog,
        registry,
        ogc,
        assembler,
        query,
        SnapshotStore::new(config.snapshot.clone()),
    ))
}

fn run_sync<R: RegistryClient>(
    args: SyncArgs,
    app: &App<CatalogHttpClient, R, OgcHttpClient>,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let options = SyncOptions {
        dry_run: args.dry_run,
        skip_existing: args.skip_existing,
    };
    let report = match output_mode {
        OutputMode::Interactive => sync_family(app, args.family, options, &ConsoleSink)?,
        OutputMode::NonInteractive => sync_family(app, args.family, options, &JsonOutput)?,
    };
    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_sync(&report).into_diagnostic(),
        OutputMode::Interactive => {
            print_sync_summary(&report);
            Ok(())
        }
    }
}

fn sync_family<R: RegistryClient>(
    app: &App<CatalogHttpClient, R, OgcHttpClient>,
    family: FamilyArg,
    options: SyncOptions,
    sink: &dyn rrk_ckan_sync::app::ProgressSink,
) -> Result<SyncReport, SyncError> {
    match family {
        FamilyArg::Clm => app.sync_clm(options, sink),
        FamilyArg::Its => app.sync_its(options, sink),
        FamilyArg::All => app.sync_all(options, sink),
    }
}

fn print_sync_summary(report: &SyncReport) {
    let count = |action| {
        report
            .items
            .iter()
            .filter(|item| item.action == action)
            .count()
    };
    println!(
        "created: {}, planned: {}, already present: {}",
        count(SyncAction::Created),
        count(SyncAction::Planned),
        count(SyncAction::Existing)
    );
    if let Some(path) = &report.snapshot {
        println!("snapshot: {path}");
    }
}
