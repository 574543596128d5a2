//! Example projection file

use clap::Args;
use std::path::PathBuf;
use tracing::info;

use crate::error::{CliError, CliResult};

/// Example projection: a 16x16 sheet projecting onto itself with a Gaussian kernel
pub const EXAMPLE_CONFIG: &str = r#"# neuromap projection
[simulation]
machine_time_step_us = 1000   # 1 ms
seed = 42

[partitioning]
max_atoms_per_core = 64

[pre]
label = "sheet"
size = 256
structure = { type = "grid_2d", aspect_ratio = 1.0, dx = 1.0, dy = 1.0, x0 = 0.0, y0 = 0.0, z = 0.0, fill_order = { order = "sequential" } }

# Omit [post] to connect the sheet to itself
# [post]
# label = "target"
# size = 64

[space]
axes = "xy"
scale_factor = 1.0
offset = 0.0

[projection]
id = 0
expression = "exp(-(d * d) / 8)"
allow_self_connections = false
synapse_target = "AMPA"
field_policy = "dense"
weights = { distribution = "normal_clipped", mu = 0.5, sigma = 0.1, low = 0.0, high = 1.0 }
delays = { distribution = "uniform", low = 1.0, high = 10.0 }
"#;

/// Write an example projection file
#[derive(Args, Debug)]
pub struct InitCommand {
    /// Output path
    #[arg(default_value = "projection.toml")]
    pub path: PathBuf,

    /// Overwrite an existing file
    #[arg(short, long)]
    pub force: bool,
}

impl InitCommand {
    pub fn execute(self) -> CliResult<()> {
        if self.path.exists() && !self.force {
            return Err(CliError::invalid_args(format!(
                "{} already exists (use --force to overwrite)",
                self.path.display()
            )));
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, EXAMPLE_CONFIG)?;
        info!("Wrote example projection to {}", self.path.display());
        Ok(())
    }
}
