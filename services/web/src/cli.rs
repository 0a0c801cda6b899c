use accredited_programmes::error::AppError;
use accredited_programmes::workflows::referrals::pni;
use accredited_programmes::workflows::referrals::{PniIntensity, ProgrammePathway};
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::server;

#[derive(Parser, Debug)]
#[command(
    name = "Accredited Programmes",
    about = "Run the accredited programmes referral service or inspect its decision tables",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print the PNI content shown for a pathway and course intensity
    Pni(PniArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PathwayArg {
    High,
    Moderate,
    Alternative,
    Missing,
    Unknown,
}

impl From<PathwayArg> for ProgrammePathway {
    fn from(value: PathwayArg) -> Self {
        match value {
            PathwayArg::High => Self::HighIntensityBc,
            PathwayArg::Moderate => Self::ModerateIntensityBc,
            PathwayArg::Alternative => Self::AlternativePathway,
            PathwayArg::Missing => Self::MissingInformation,
            PathwayArg::Unknown => Self::Unknown,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum IntensityArg {
    High,
    Moderate,
}

impl From<IntensityArg> for PniIntensity {
    fn from(value: IntensityArg) -> Self {
        match value {
            IntensityArg::High => Self::High,
            IntensityArg::Moderate => Self::Moderate,
        }
    }
}

#[derive(Args, Debug)]
struct PniArgs {
    /// Programme pathway from the PNI score
    #[arg(long, value_enum)]
    pathway: PathwayArg,
    /// Intensity of the course being referred to
    #[arg(long, value_enum)]
    intensity: IntensityArg,
    /// Show the content after the referrer chose to override the recommendation
    #[arg(long)]
    overriding: bool,
}

fn print_pni(args: PniArgs) -> Result<(), AppError> {
    let content = pni::content(args.pathway.into(), args.intensity.into(), args.overriding);

    println!("{}", content.heading);
    for line in &content.body {
        println!("  {line}");
    }
    if let Some(warning) = &content.warning {
        println!("  Warning: {warning}");
    }
    if let Some(label) = content.override_button_label {
        println!("  Action: {label}");
    }
    if content.justification_required {
        println!("  A reason for the override is required before submission.");
    }
    Ok(())
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Pni(args) => print_pni(args),
    }
}
