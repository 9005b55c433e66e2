use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use rds_port_adapter::app::App;
use rds_port_adapter::config::{DescriptorLoader, PortDescriptor, PortSettings};
use rds_port_adapter::error::PortError;
use rds_port_adapter::http::PortHttpClient;
use rds_port_adapter::output::{JsonOutput, LogSink};
use rds_port_adapter::transport::StaticToken;

#[derive(Parser)]
#[command(name = "rds-port")]
#[command(about = "Inspect and drive research-data ports through their adapter")]
#[command(version, author)]
struct Cli {
    #[command(flatten)]
    binding: BindingArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct BindingArgs {
    #[arg(long, global = true, help = "JSON file holding one port descriptor or a list of them")]
    descriptor: Option<PathBuf>,

    #[arg(long, global = true, default_value_t = 0, help = "Which descriptor to use when the file holds several")]
    select: usize,

    #[arg(long, global = true)]
    user: Option<String>,

    #[arg(long, global = true, default_value_t = 0)]
    research_index: u64,

    #[arg(long, global = true, help = "Port base address, instead of the one derived from the port name")]
    address: Option<String>,

    #[arg(long, global = true, help = "Bearer token sent with every port request")]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "List the cached file listing of the port")]
    List,
    #[command(about = "Show capabilities and transfer settings")]
    Info,
    #[command(about = "Download one cached file")]
    Fetch(FetchArgs),
    #[command(about = "Remove one cached file from the port")]
    Remove(IndexArgs),
    #[command(about = "Remove every file of the project from the port")]
    RemoveAll,
    #[command(about = "Ask a metadata port to pull a folder")]
    Passive(PassiveArgs),
    #[command(about = "Export every file into another port")]
    Copy(CopyArgs),
}

#[derive(Args)]
struct IndexArgs {
    index: usize,
}

#[derive(Args)]
struct FetchArgs {
    index: usize,

    #[arg(long, default_value = ".")]
    out: Utf8PathBuf,
}

#[derive(Args)]
struct PassiveArgs {
    folder: String,
}

#[derive(Args)]
struct CopyArgs {
    #[arg(long, help = "Descriptor file of the target port")]
    to: PathBuf,

    #[arg(long, default_value_t = 0)]
    to_select: usize,

    #[arg(long)]
    to_address: Option<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<PortError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &PortError) -> u8 {
    match error {
        PortError::InvalidPortName(_)
        | PortError::InvalidDescriptor(_)
        | PortError::DescriptorRead(_)
        | PortError::FileIndexOutOfRange { .. } => 2,
        PortError::BackendUnavailable { .. } | PortError::Transport(_) => 3,
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
    let settings = PortSettings::from_env();
    let transport = PortHttpClient::new(&settings)?;

    let binding = cli.binding;
    let user = binding
        .user
        .ok_or_else(|| miette::Report::msg("--user is required"))?;
    let descriptor_path = binding
        .descriptor
        .ok_or_else(|| miette::Report::msg("--descriptor is required"))?;
    let descriptor = select_descriptor(&descriptor_path, binding.select)?;

    let mut app = App::new(transport, settings, user, binding.research_index);
    if let Some(token) = binding.token {
        app = app.with_credentials(Arc::new(StaticToken::new(token)));
    }
    let mut adapter = app.open(&descriptor, binding.address.as_deref())?;

    match cli.command {
        Commands::List => JsonOutput::print(&app.list(&adapter)).into_diagnostic(),
        Commands::Info => JsonOutput::print(&app.info(&adapter)).into_diagnostic(),
        Commands::Fetch(args) => {
            let result = app.fetch(&adapter, args.index, &args.out, &LogSink)?;
            JsonOutput::print(&result).into_diagnostic()
        }
        Commands::Remove(args) => {
            let result = app.remove(&mut adapter, args.index)?;
            JsonOutput::print(&result).into_diagnostic()
        }
        Commands::RemoveAll => {
            let result = app.remove_all(&mut adapter)?;
            JsonOutput::print(&result).into_diagnostic()
        }
        Commands::Passive(args) => JsonOutput::print(&app.passive(&adapter, &args.folder)).into_diagnostic(),
        Commands::Copy(args) => {
            let target_descriptor = select_descriptor(&args.to, args.to_select)?;
            let mut target = app.open(&target_descriptor, args.to_address.as_deref())?;
            let result = app.copy(&adapter, &mut target, &LogSink)?;
            JsonOutput::print(&result).into_diagnostic()?;
            if !result.is_complete() {
                return Err(miette::Report::msg(format!(
                    "{} of {} file(s) were rejected by {}",
                    result.failed.len(),
                    result.failed.len() + result.transferred.len(),
                    result.target
                )));
            }
            Ok(())
        }
    }
}

fn select_descriptor(path: &Path, select: usize) -> Result<PortDescriptor, PortError> {
    let descriptors = DescriptorLoader::resolve(path)?;
    let count = descriptors.len();
    descriptors.into_iter().nth(select).ok_or_else(|| {
        PortError::InvalidDescriptor(format!(
            "descriptor #{select} requested but {} holds {count}",
            path.display()
        ))
    })
}
