//! CLI command implementations for neuromap

use clap::{Parser, Subcommand};
use std::path::Path;

use neuromap_connect::{DistanceDependentProbabilityConnector, Population, Projection};

use crate::config::ProjectionConfig;
use crate::error::CliResult;

pub mod bounds;
pub mod generate;
pub mod init;
pub mod inspect;

/// neuromap - distance-dependent synaptic block generation
#[derive(Parser, Debug)]
#[command(
    name = "neuromap",
    version,
    about = "Distance-dependent synaptic block generation",
    long_about = "neuromap turns a distance expression over two spatially arranged populations \
                  into per-core synaptic blocks, with capacity bounds sized before generation."
)]
pub struct NeuromapCli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write an example projection file
    #[command(alias = "new")]
    Init(init::InitCommand),

    /// Print capacity bounds per post slice
    Bounds(bounds::BoundsCommand),

    /// Generate every slice pair's synaptic block
    #[command(alias = "gen")]
    Generate(generate::GenerateCommand),

    /// Decode and verify a block file
    Inspect(inspect::InspectCommand),
}

impl NeuromapCli {
    /// Execute the CLI command
    pub fn execute(self) -> CliResult<()> {
        match self.command {
            Commands::Init(cmd) => cmd.execute(),
            Commands::Bounds(cmd) => cmd.execute(),
            Commands::Generate(cmd) => cmd.execute(),
            Commands::Inspect(cmd) => cmd.execute(),
        }
    }
}

/// Populations of a loaded projection file, kept alive for the projection borrowing them
pub(crate) struct Network {
    config: ProjectionConfig,
    pre: Population,
    post: Option<Population>,
}

impl Network {
    pub(crate) fn load(path: &Path) -> CliResult<Self> {
        let config = ProjectionConfig::load(path)?;
        let (pre, post) = config.populations()?;
        Ok(Self { config, pre, post })
    }

    pub(crate) fn config(&self) -> &ProjectionConfig {
        &self.config
    }

    /// Configure the connector against the populations
    pub(crate) fn projection(&self) -> CliResult<Projection<'_, DistanceDependentProbabilityConnector>> {
        let post = self.post.as_ref().unwrap_or(&self.pre);
        Ok(Projection::new(
            self.config.projection_id(),
            &self.pre,
            post,
            self.config.connector()?,
            self.config.synapse_type()?,
            self.config.simulation.seed,
            self.config.simulation.machine_time_step_us,
        )?)
    }
}
