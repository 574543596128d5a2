//! Block file inspection

use clap::Args;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

use neuromap_storage::{read_block_file, ProjectionId, SynapticBlock};

use crate::error::{CliError, CliResult};

/// Decode a block file, verify its checksums and print a summary
#[derive(Args, Debug)]
pub struct InspectCommand {
    /// Block file
    pub file: PathBuf,

    /// One line per block
    #[arg(short, long)]
    pub detailed: bool,
}

#[derive(Default)]
struct ProjectionSummary {
    blocks: usize,
    records: usize,
    max_delay: u16,
    synapse_types: BTreeMap<u8, usize>,
}

impl ProjectionSummary {
    fn add(&mut self, block: &SynapticBlock) {
        self.blocks += 1;
        self.records += block.len();
        for record in &block.records {
            self.max_delay = self.max_delay.max(record.delay);
            *self.synapse_types.entry(record.synapse_type).or_default() += 1;
        }
    }
}

impl InspectCommand {
    pub fn execute(self) -> CliResult<()> {
        if !self.file.exists() {
            return Err(CliError::invalid_args(format!("{} does not exist", self.file.display())));
        }
        let blocks = read_block_file(&self.file)?;
        info!("Checksums verified for {} blocks", blocks.len());

        let mut summaries: BTreeMap<ProjectionId, ProjectionSummary> = BTreeMap::new();
        for block in &blocks {
            summaries.entry(block.header.projection).or_default().add(block);
        }

        let records: usize = blocks.iter().map(SynapticBlock::len).sum();
        println!("blocks: {}", blocks.len());
        println!("records: {}", records);
        for (projection, summary) in &summaries {
            println!(
                "{}: {} blocks, {} records, max delay {} steps, synapse types {:?}",
                projection, summary.blocks, summary.records, summary.max_delay, summary.synapse_types
            );
        }

        if self.detailed {
            for block in &blocks {
                println!(
                    "  {} pre [{}, {}) post [{}, {}): {} records",
                    block.header.projection,
                    block.header.pre.lo,
                    block.header.pre.hi,
                    block.header.post.lo,
                    block.header.post.hi,
                    block.len()
                );
            }
        }
        Ok(())
    }
}
