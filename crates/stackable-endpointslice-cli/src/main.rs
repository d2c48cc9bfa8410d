use std::{io::Write, path::PathBuf};

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use snafu::{ResultExt, Snafu};
use stackable_endpointslice::{
    ExpandOptions, Expander, expand, flatten::flatten_endpoint_slice,
    k8s_openapi::api::discovery::v1::EndpointSlice,
};

use crate::document::OutputFormat;

mod document;
mod logging;

const APP_NAME: &str = "endpointslice-convert";
const LOG_ENV: &str = "ENDPOINTSLICE_LOG";

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to initialize logging"))]
    InitializeLogging { source: logging::Error },

    #[snafu(display("failed to read input document"))]
    ReadInput { source: document::Error },

    #[snafu(display("failed to expand endpoint slice configuration"))]
    Expand { source: expand::Error },

    #[snafu(display("failed to write output document"))]
    WriteOutput { source: document::Error },
}

#[derive(Debug, Parser)]
#[command(
    name = APP_NAME,
    author,
    version,
    about = "Converts between EndpointSlice configuration and Kubernetes manifests"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Expand EndpointSlice configuration into a Kubernetes manifest.
    Expand {
        #[command(flatten)]
        io: IoArgs,

        #[command(flatten)]
        options: ExpandOptions,
    },

    /// Flatten a Kubernetes EndpointSlice manifest into configuration.
    Flatten {
        #[command(flatten)]
        io: IoArgs,
    },
}

#[derive(Debug, Args)]
struct IoArgs {
    /// Path of the input document (YAML or JSON), `-` reads from stdin.
    #[arg(long, short, default_value = document::STDIN)]
    input: PathBuf,

    /// Format of the document written to stdout.
    #[arg(
        long,
        short,
        env = "ENDPOINTSLICE_OUTPUT",
        value_enum,
        default_value_t = OutputFormat::Yaml
    )]
    output: OutputFormat,
}

#[snafu::report]
fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::initialize_logging(LOG_ENV, APP_NAME).context(InitializeLoggingSnafu)?;

    run(cli.command, std::io::stdout().lock())
}

fn run(command: Command, writer: impl Write) -> Result<()> {
    match command {
        Command::Expand { io, options } => {
            tracing::debug!(input = %io.input.display(), ?options, "expanding configuration");

            let config: Value = document::read(&io.input).context(ReadInputSnafu)?;
            let slice = Expander::new(options)
                .expand_endpoint_slice(&config)
                .context(ExpandSnafu)?;

            document::write(writer, &slice, io.output).context(WriteOutputSnafu)
        }
        Command::Flatten { io } => {
            tracing::debug!(input = %io.input.display(), "flattening manifest");

            let slice: EndpointSlice = document::read(&io.input).context(ReadInputSnafu)?;
            let config = flatten_endpoint_slice(&slice);

            document::write(writer, &config, io.output).context(WriteOutputSnafu)
        }
    }
}
