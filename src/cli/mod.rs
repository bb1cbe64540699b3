use clap::{Parser, Subcommand};

pub mod config;
pub mod dataset;
pub mod init_config;
pub mod logging;
pub mod run;
pub mod version;

#[derive(Parser)]
#[command(name = "psi-sum")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run a Private Intersection-Sum between two local datasets", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the protocol on the datasets named in a config file
    Run {
        /// Path to config file (default: ~/.config/psi-sum/config.toml)
        #[arg(long)]
        config: Option<String>,

        /// Run each party on its own task, exchanging messages over channels
        #[arg(long = "async")]
        use_async: bool,
    },

    /// Write a demo configuration file
    InitConfig {
        /// Output path (default: ~/.config/psi-sum/config.toml)
        #[arg(long)]
        output: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Display version information
    Version,
}

pub async fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Run { config, use_async } => run::execute(config, use_async).await,
        Commands::InitConfig { output, force } => init_config::execute(output, force),
        Commands::Version => {
            version::execute();
            Ok(())
        }
    }
}
