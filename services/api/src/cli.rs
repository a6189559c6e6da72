use crate::demo::{run_demo, run_eligibility_check, DemoArgs, EligibilityCheckArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use courseflow::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Courseflow Submission Service",
    about = "Demonstrate and run the assignment submission workflow from the command line",
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
    /// Inspect submission eligibility without starting the service
    Eligibility {
        #[command(subcommand)]
        command: EligibilityCommand,
    },
    /// Run an end-to-end CLI demo covering the submission and late-fee workflows
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum EligibilityCommand {
    /// Evaluate the submission window for an ad-hoc assignment fixture
    Check(EligibilityCheckArgs),
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

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Eligibility {
            command: EligibilityCommand::Check(args),
        } => run_eligibility_check(args),
        Command::Demo(args) => run_demo(args),
    }
}
