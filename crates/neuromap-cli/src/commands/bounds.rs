//! Capacity bounds report

use clap::Args;
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

use neuromap_connect::{Connector, DelayWindow};

use super::Network;
use crate::error::{CliError, CliResult};

/// Print capacity bounds per post slice as JSON
#[derive(Args, Debug)]
pub struct BoundsCommand {
    /// Projection file
    pub config: PathBuf,

    /// Shortest delay (steps) of a fan-out window
    #[arg(long, requires = "max_delay")]
    pub min_delay: Option<u32>,

    /// Longest delay (steps) of a fan-out window
    #[arg(long, requires = "min_delay")]
    pub max_delay: Option<u32>,
}

impl BoundsCommand {
    fn window(&self) -> CliResult<Option<DelayWindow>> {
        match (self.min_delay, self.max_delay) {
            (Some(min), Some(max)) => Ok(Some(DelayWindow::new(min, max)?)),
            (None, None) => Ok(None),
            _ => Err(CliError::invalid_args("--min-delay and --max-delay go together")),
        }
    }

    pub fn execute(self) -> CliResult<()> {
        let window = self.window()?;
        let network = Network::load(&self.config)?;
        let projection = network.projection()?;
        let plan = projection.plan(&network.config().partitioner()?)?;
        let connector = projection.connector();

        let mut slices = Vec::with_capacity(plan.post_slices.len());
        for bound in projection.bounds(&plan)? {
            let mut entry = json!({
                "post_slice": [bound.post_slice.lo_atom(), bound.post_slice.hi_atom()],
                "max_from_one_pre": bound.bound.max_from_one_pre,
                "max_to_one_post": bound.bound.max_to_one_post,
                "max_total": bound.bound.max_total,
            });
            if let Some(window) = window {
                entry["max_from_one_pre_in_window"] =
                    json!(connector.get_n_connections_from_pre_vertex_maximum(&bound.post_slice, Some(window))?);
            }
            slices.push(entry);
        }

        let report = json!({
            "connector": connector.to_string(),
            "projection": projection.id().raw(),
            "pre_size": projection.pre().size(),
            "post_size": projection.post().size(),
            "pre_slices": plan.pre_slices.len(),
            "max_total": connector.get_n_connections_maximum()?,
            "max_to_one_post": connector.get_n_connections_to_post_vertex_maximum()?,
            "weight_maximum": connector.get_weight_maximum()?,
            "delay_maximum": connector.get_delay_maximum()?,
            "delay_window": window.map(|w| w.to_string()),
            "post_slices": slices,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        info!("Reported bounds for {} post slices", plan.post_slices.len());
        Ok(())
    }
}
