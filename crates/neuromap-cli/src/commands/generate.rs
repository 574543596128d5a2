//! Synaptic block generation

use anyhow::Context;
use clap::{Args, ValueEnum};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::{debug, info};

use neuromap_storage::{BlockFileWriter, SynapticBlock};

use super::Network;
use crate::error::CliResult;

/// Output encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Device block file with checksums
    Binary,
    /// Pretty-printed JSON array of blocks
    Json,
    /// bincode-encoded array of blocks
    Bincode,
}

/// Generate every slice pair's synaptic block
#[derive(Args, Debug)]
pub struct GenerateCommand {
    /// Projection file
    pub config: PathBuf,

    /// Output file
    #[arg(short, long)]
    pub output: PathBuf,

    /// Output encoding
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Binary)]
    pub format: OutputFormat,

    /// Draw each slice pair from its own random stream, in parallel
    #[arg(long)]
    pub parallel: bool,
}

impl GenerateCommand {
    pub fn execute(self) -> CliResult<()> {
        let network = Network::load(&self.config)?;
        let mut projection = network.projection()?;
        let plan = projection.plan(&network.config().partitioner()?)?;
        info!(
            "Generating {} blocks ({} pre x {} post slices)",
            plan.pairs.len(),
            plan.pre_slices.len(),
            plan.post_slices.len()
        );

        let blocks = if self.parallel {
            projection.generate_independent(&plan)?
        } else {
            projection.generate(&plan)?
        };
        for block in &blocks {
            debug!(
                "pre [{}, {}) post [{}, {}): {} records",
                block.header.pre.lo,
                block.header.pre.hi,
                block.header.post.lo,
                block.header.post.hi,
                block.len()
            );
        }

        self.write(&blocks)?;
        let records: usize = blocks.iter().map(SynapticBlock::len).sum();
        info!(
            "Wrote {} blocks ({} records) to {}",
            blocks.len(),
            records,
            self.output.display()
        );
        Ok(())
    }

    fn write(&self, blocks: &[SynapticBlock]) -> CliResult<()> {
        match self.format {
            OutputFormat::Binary => {
                let mut writer = BlockFileWriter::create(&self.output)?;
                for block in blocks {
                    writer.append(block)?;
                }
                writer.finish()?;
            }
            OutputFormat::Json => {
                let file = File::create(&self.output)
                    .with_context(|| format!("creating {}", self.output.display()))?;
                serde_json::to_writer_pretty(BufWriter::new(file), blocks)?;
            }
            OutputFormat::Bincode => {
                let bytes = bincode::serialize(blocks)?;
                std::fs::write(&self.output, bytes)
                    .with_context(|| format!("writing {}", self.output.display()))?;
            }
        }
        Ok(())
    }
}
