//! Dual-exponential synapse types with four receptor channels

use crate::error::{ConnectError, Result};
use crate::fixed_point::{S1615, U032};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Per-step decay and initial-input multipliers for an exponential with time constant `tau` ms
pub fn get_exponential_decay_and_init(tau: f64, machine_time_step_us: u32) -> Result<(U032, U032)> {
    if !(tau.is_finite() && tau > 0.0) {
        return Err(ConnectError::invalid_parameter("tau", tau.to_string(), "finite and > 0"));
    }
    if machine_time_step_us == 0 {
        return Err(ConnectError::invalid_parameter("machine_time_step", "0", "> 0"));
    }
    let step = machine_time_step_us as f64;
    let decay = (-step / (1000.0 * tau)).exp();
    let init = tau * (1.0 - decay) * (1000.0 / step);
    Ok((U032::try_from_f64(decay)?, U032::try_from_f64(init.min(1.0))?))
}

/// Time of the peak of `exp(-t/tau_b) - exp(-t/tau_a)`
pub fn rise_time(tau_a: f64, tau_b: f64) -> Result<f64> {
    if !(tau_a > 0.0 && tau_b > 0.0) || tau_a == tau_b {
        return Err(ConnectError::invalid_config(format!(
            "rise time needs distinct positive time constants, got tau_a={} tau_b={}",
            tau_a, tau_b
        )));
    }
    Ok(unchecked_rise_time(tau_a, tau_b))
}

/// Scalar normalising the dual exponential so its peak is one
pub fn peak_scalar(tau_a: f64, tau_b: f64) -> Result<f64> {
    rise_time(tau_a, tau_b)?;
    Ok(unchecked_peak_scalar(tau_a, tau_b))
}

fn unchecked_rise_time(tau_a: f64, tau_b: f64) -> f64 {
    (tau_b / tau_a).ln() * (tau_a * tau_b) / (tau_b - tau_a)
}

fn unchecked_peak_scalar(tau_a: f64, tau_b: f64) -> f64 {
    let t_rise = unchecked_rise_time(tau_a, tau_b);
    1.0 / ((-t_rise / tau_a).exp() - (-t_rise / tau_b).exp())
}

/// Receptor channel, in synapse-type tag order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Receptor {
    /// Fast excitatory
    Ampa = 0,
    /// Slow excitatory
    Nmda = 1,
    /// Fast inhibitory
    GabaA = 2,
    /// Slow inhibitory
    GabaB = 3,
}

impl Receptor {
    /// All receptors in tag order
    pub const ALL: [Receptor; 4] = [Self::Ampa, Self::Nmda, Self::GabaA, Self::GabaB];

    /// Target name used by projections
    pub fn target_name(self) -> &'static str {
        match self {
            Self::Ampa => "AMPA",
            Self::Nmda => "NMDA",
            Self::GabaA => "GABA_A",
            Self::GabaB => "GABA_B",
        }
    }

    /// Synapse-type tag written to connection records
    pub fn synapse_type(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Receptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.target_name())
    }
}

/// One exponential component of a receptor
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Component {
    /// Initial response
    pub response: f64,
    /// Time constant (ms)
    pub tau: f64,
}

/// Rise (`a`) and decay (`b`) components of one receptor
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReceptorParams {
    /// Rising component
    pub a: Component,
    /// Decaying component
    pub b: Component,
}

impl ReceptorParams {
    /// Components with zero initial response
    pub fn new(tau_a: f64, tau_b: f64) -> Self {
        Self {
            a: Component { response: 0.0, tau: tau_a },
            b: Component { response: 0.0, tau: tau_b },
        }
    }
}

/// Device data type of a synapse parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// Signed 16.15 fixed point
    S1615,
    /// Unsigned 32-bit integer
    Uint32,
}

/// One synapse parameter in device form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynapseParameter {
    /// Fixed-point value
    S1615(S1615),
    /// Unsigned fraction stored as a 32-bit integer
    Uint32(U032),
}

impl SynapseParameter {
    /// Data type
    pub fn data_type(&self) -> DataType {
        match self {
            Self::S1615(_) => DataType::S1615,
            Self::Uint32(_) => DataType::Uint32,
        }
    }

    /// Raw 32-bit word
    pub fn to_word(&self) -> u32 {
        match self {
            Self::S1615(v) => v.to_raw() as u32,
            Self::Uint32(v) => v.to_raw(),
        }
    }
}

/// Parameters emitted per receptor
const PARAMETERS_PER_RECEPTOR: usize = 6;

/// Hill-Tononi style synapse type: dual exponentials on AMPA, NMDA, GABA_A and GABA_B
#[derive(Debug, Clone, PartialEq)]
pub struct SynapseTypeHt {
    receptors: [ReceptorParams; 4],
    scalars: [(f64, f64); 4],
}

impl Default for SynapseTypeHt {
    fn default() -> Self {
        let receptors = [
            ReceptorParams::new(0.5, 2.4),
            ReceptorParams::new(4.0, 40.0),
            ReceptorParams::new(1.0, 7.0),
            ReceptorParams::new(60.0, 200.0),
        ];
        // defaults have distinct positive taus
        let scalars = receptors.map(|params| {
            let sf = unchecked_peak_scalar(params.a.tau, params.b.tau);
            (sf, -sf)
        });
        Self { receptors, scalars }
    }
}

impl SynapseTypeHt {
    /// Create from per-receptor parameters in tag order
    pub fn new(receptors: [ReceptorParams; 4]) -> Result<Self> {
        let mut ht = Self {
            receptors,
            scalars: [(0.0, 0.0); 4],
        };
        ht.rebuild_derived()?;
        Ok(ht)
    }

    /// Recompute the derived `A`/`B` scalars from the time constants
    ///
    /// Called by every setter that changes a time constant.
    pub fn rebuild_derived(&mut self) -> Result<()> {
        for (i, params) in self.receptors.iter().enumerate() {
            let sf = peak_scalar(params.a.tau, params.b.tau).map_err(|e| {
                ConnectError::invalid_config(format!("receptor {}: {}", Receptor::ALL[i], e))
            })?;
            self.scalars[i] = (sf, -sf);
        }
        Ok(())
    }

    /// Parameters of one receptor
    pub fn receptor(&self, receptor: Receptor) -> &ReceptorParams {
        &self.receptors[receptor as usize]
    }

    /// Derived `(A, B)` scalars of one receptor
    pub fn scalars(&self, receptor: Receptor) -> (f64, f64) {
        self.scalars[receptor as usize]
    }

    /// Set both time constants of a receptor
    pub fn set_taus(&mut self, receptor: Receptor, tau_a: f64, tau_b: f64) -> Result<()> {
        let previous = self.receptors[receptor as usize];
        self.receptors[receptor as usize].a.tau = tau_a;
        self.receptors[receptor as usize].b.tau = tau_b;
        if let Err(e) = self.rebuild_derived() {
            self.receptors[receptor as usize] = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Set the initial responses of a receptor
    pub fn set_responses(&mut self, receptor: Receptor, a_response: f64, b_response: f64) {
        self.receptors[receptor as usize].a.response = a_response;
        self.receptors[receptor as usize].b.response = b_response;
    }

    /// Number of synapse types
    pub fn get_n_synapse_types(&self) -> usize {
        Receptor::ALL.len()
    }

    /// Synapse-type tag for a target name
    pub fn get_synapse_id_by_target(&self, target: &str) -> Option<u8> {
        Receptor::ALL
            .iter()
            .find(|r| r.target_name() == target)
            .map(|r| r.synapse_type())
    }

    /// Target names in tag order
    pub fn get_synapse_targets(&self) -> [&'static str; 4] {
        Receptor::ALL.map(Receptor::target_name)
    }

    /// Number of device parameters
    pub fn get_n_synapse_type_parameters(&self) -> usize {
        self.get_n_synapse_types() * PARAMETERS_PER_RECEPTOR
    }

    /// Data types of one receptor's parameters
    pub fn get_synapse_type_parameter_types(&self) -> [DataType; PARAMETERS_PER_RECEPTOR] {
        [
            DataType::S1615,
            DataType::S1615,
            DataType::Uint32,
            DataType::S1615,
            DataType::S1615,
            DataType::Uint32,
        ]
    }

    /// Device parameters for every receptor
    ///
    /// Per receptor: `a` response, `A`, `a` decay, `b` response, `B`, `b` decay.
    pub fn get_synapse_type_parameters(&self, machine_time_step_us: u32) -> Result<Vec<SynapseParameter>> {
        let mut out = Vec::with_capacity(self.get_n_synapse_type_parameters());
        for (params, &(a_scalar, b_scalar)) in self.receptors.iter().zip(&self.scalars) {
            let (a_decay, _) = get_exponential_decay_and_init(params.a.tau, machine_time_step_us)?;
            let (b_decay, _) = get_exponential_decay_and_init(params.b.tau, machine_time_step_us)?;
            out.push(SynapseParameter::S1615(S1615::try_from_f64(params.a.response)?));
            out.push(SynapseParameter::S1615(S1615::try_from_f64(a_scalar)?));
            out.push(SynapseParameter::Uint32(a_decay));
            out.push(SynapseParameter::S1615(S1615::try_from_f64(params.b.response)?));
            out.push(SynapseParameter::S1615(S1615::try_from_f64(b_scalar)?));
            out.push(SynapseParameter::Uint32(b_decay));
        }
        Ok(out)
    }

    /// Rough per-neuron processing cost
    pub fn get_n_cpu_cycles_per_neuron(&self) -> u32 {
        100
    }
}
