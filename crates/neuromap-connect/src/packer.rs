//! Packing sampled pairs into device connection records

use crate::error::{ConnectError, Result};
use crate::fixed_point::S1615;
use crate::slice::Slice;
use neuromap_storage::{ConnectionRecord, NeuronId, ProjectionId, SynapticBlock};

/// Build one record per pair, in pair order
///
/// `weights` and `delays` hold one entry per pair, already converted to the
/// device domain.
pub fn pack_records(
    pairs: &[(usize, usize)],
    weights: &[S1615],
    delays: &[u16],
    synapse_type: u8,
) -> Result<Vec<ConnectionRecord>> {
    if weights.len() != pairs.len() || delays.len() != pairs.len() {
        return Err(ConnectError::invalid_config(format!(
            "{} pairs but {} weights and {} delays",
            pairs.len(),
            weights.len(),
            delays.len()
        )));
    }
    pairs
        .iter()
        .zip(weights)
        .zip(delays)
        .map(|((&(source, target), weight), &delay)| {
            Ok(ConnectionRecord::new(
                neuron_id(source, "source")?,
                neuron_id(target, "target")?,
                weight.to_raw(),
                delay,
                synapse_type,
            ))
        })
        .collect()
}

fn neuron_id(index: usize, what: &str) -> Result<NeuronId> {
    u32::try_from(index)
        .map(NeuronId::new)
        .map_err(|_| ConnectError::invalid_parameter(what, index.to_string(), "<= u32::MAX"))
}

/// Wrap the records of one slice pair in a checksummed block
pub fn into_block(
    projection: ProjectionId,
    pre_slice: &Slice,
    post_slice: &Slice,
    records: Vec<ConnectionRecord>,
) -> Result<SynapticBlock> {
    let block = SynapticBlock::from_records(
        projection,
        pre_slice.to_atom_range()?,
        post_slice.to_atom_range()?,
        records,
    )?;
    block.validate_records()?;
    Ok(block)
}
