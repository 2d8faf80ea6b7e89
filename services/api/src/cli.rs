use crate::demo::{run_demo, run_evaluation, DemoArgs, EvaluateArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use feasibility_screening::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Solar Feasibility Screening",
    about = "Run and demonstrate the solar site screening questionnaire from the command line",
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
    /// Work with exported screening responses
    Screening {
        #[command(subcommand)]
        command: ScreeningCommand,
    },
    /// Walk through a scripted screening session end to end
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum ScreeningCommand {
    /// Score a CSV export of answers and print the feasibility decision
    Evaluate(EvaluateArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Serve a questionnaire template from this JSON file instead of the bundled one
    #[arg(long)]
    pub(crate) template: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Screening {
            command: ScreeningCommand::Evaluate(args),
        } => run_evaluation(args),
        Command::Demo(args) => run_demo(args),
    }
}
