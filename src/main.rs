use clap::{Parser, Subcommand};

use fabricnet::commands::call;
use fabricnet::commands::version;
use fabricnet::commands::Config;

#[derive(Parser, Debug)]
#[clap(version = env!("CARGO_PKG_VERSION"))]
struct Opts {
    #[clap(flatten)]
    config: Config,
    /// Driver operation to run
    #[clap(subcommand)]
    subcmd: SubCommand,
}

#[derive(Subcommand, Debug)]
enum SubCommand {
    /// Handle one network or IPAM driver request, the response is written to STDOUT.
    Call(call::Call),
    /// Display info about fabricnet.
    Version(version::Version),
}

fn main() {
    env_logger::builder().format_timestamp(None).init();
    let opts = Opts::parse();

    let result = match opts.subcmd {
        SubCommand::Call(call) => call.exec(&opts.config),
        SubCommand::Version(version) => version.exec(),
    };

    match result {
        Ok(_) => {}
        Err(err) => {
            err.print_json();
            std::process::exit(1);
        }
    }
}
