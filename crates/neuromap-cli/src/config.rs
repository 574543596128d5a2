//! Projection description files
//!
//! A projection file names the populations on both sides, the metric space,
//! the connector parameters and how populations are split across cores:
//!
//! ```toml
//! [simulation]
//! machine_time_step_us = 1000
//! seed = 42
//!
//! [partitioning]
//! max_atoms_per_core = 64
//!
//! [pre]
//! label = "layer"
//! size = 100
//! structure = { type = "line", dx = 1.0, x0 = 0.0, y = 0.0, z = 0.0 }
//!
//! [projection]
//! expression = "exp(-d / 4)"
//! weights = { distribution = "normal", mu = 0.5, sigma = 0.1 }
//! delays = 2.0
//! ```
//!
//! Without a `[post]` table the projection connects `pre` to itself.

use std::path::Path;

use serde::{Deserialize, Serialize};

use neuromap_connect::{
    DistanceDependentProbabilityConnector, FieldPolicy, FixedAtomsPartitioner, ParameterSource,
    Population, PopulationId, ProjectionId, RandomDistribution, Space, Structure, SynapseTypeHt,
    DEFAULT_MACHINE_TIME_STEP_US,
};

use crate::error::{CliError, CliResult};

/// Timing and seeding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Machine time step in microseconds
    pub machine_time_step_us: u32,
    /// Projection seed
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            machine_time_step_us: DEFAULT_MACHINE_TIME_STEP_US,
            seed: 0,
        }
    }
}

/// Core partitioning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitioningConfig {
    /// Atoms per core
    pub max_atoms_per_core: usize,
}

impl Default for PartitioningConfig {
    fn default() -> Self {
        Self { max_atoms_per_core: 256 }
    }
}

/// One population
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Label
    pub label: String,
    /// Number of neurons
    pub size: usize,
    /// Spatial arrangement, a unit-spaced line when omitted
    #[serde(default = "Structure::line")]
    pub structure: Structure,
}

impl PopulationConfig {
    fn build(&self, id: PopulationId) -> CliResult<Population> {
        Ok(Population::new(id, self.label.clone(), self.size)?.with_structure(self.structure.clone()))
    }
}

/// A weight or delay: one number, or a distribution table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueConfig {
    /// Same value for every connection
    Fixed(f64),
    /// Independent draws
    Random(RandomDistribution),
}

impl From<&ValueConfig> for ParameterSource {
    fn from(value: &ValueConfig) -> Self {
        match value {
            ValueConfig::Fixed(v) => ParameterSource::Fixed(*v),
            ValueConfig::Random(dist) => ParameterSource::Random(*dist),
        }
    }
}

fn default_target() -> String {
    "AMPA".to_string()
}

/// Connector parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// Projection id written into block headers
    #[serde(default)]
    pub id: u32,
    /// Distance expression
    pub expression: String,
    /// Keep the diagonal when pre and post are the same population
    #[serde(default)]
    pub allow_self_connections: bool,
    /// Fixed connection count; not supported by this connector
    #[serde(default)]
    pub n_connections: Option<u32>,
    /// Receptor name resolved to a synapse-type tag
    #[serde(default = "default_target")]
    pub synapse_target: String,
    /// Weights, 0 when omitted
    #[serde(default)]
    pub weights: Option<ValueConfig>,
    /// Delays in ms, one time step when omitted
    #[serde(default)]
    pub delays: Option<ValueConfig>,
    /// Distance field evaluation policy
    #[serde(default)]
    pub field_policy: FieldPolicy,
    /// Overflow probability accepted by the bounds
    #[serde(default)]
    pub chance: Option<f64>,
}

/// A complete projection description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionConfig {
    /// Timing and seeding
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Core partitioning
    #[serde(default)]
    pub partitioning: PartitioningConfig,
    /// Pre-synaptic population
    pub pre: PopulationConfig,
    /// Post-synaptic population, `pre` itself when omitted
    #[serde(default)]
    pub post: Option<PopulationConfig>,
    /// Metric space
    #[serde(default)]
    pub space: Space,
    /// Connector parameters
    pub projection: ConnectorConfig,
}

impl ProjectionConfig {
    /// Load and validate a projection file
    pub fn load(path: &Path) -> CliResult<Self> {
        if !path.exists() {
            return Err(CliError::config(format!("{} does not exist", path.display())));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a projection description
    pub fn from_toml_str(content: &str) -> CliResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values the library cannot see until generation
    pub fn validate(&self) -> CliResult<()> {
        if self.simulation.machine_time_step_us == 0 {
            return Err(CliError::config("simulation.machine_time_step_us must be > 0"));
        }
        if self.partitioning.max_atoms_per_core == 0 {
            return Err(CliError::config("partitioning.max_atoms_per_core must be > 0"));
        }
        for population in std::iter::once(&self.pre).chain(self.post.as_ref()) {
            if population.size == 0 {
                return Err(CliError::config(format!("population '{}' is empty", population.label)));
            }
        }
        if let Some(chance) = self.projection.chance {
            if !(chance > 0.0 && chance < 1.0) {
                return Err(CliError::config(format!("projection.chance {} not in (0, 1)", chance)));
            }
        }
        self.synapse_type()?;
        Ok(())
    }

    /// Synapse-type tag of the configured receptor
    pub fn synapse_type(&self) -> CliResult<u8> {
        let synapse_type = SynapseTypeHt::default();
        synapse_type
            .get_synapse_id_by_target(&self.projection.synapse_target)
            .ok_or_else(|| {
                CliError::config(format!(
                    "unknown synapse target '{}', expected one of {:?}",
                    self.projection.synapse_target,
                    synapse_type.get_synapse_targets()
                ))
            })
    }

    /// Projection id written into block headers
    pub fn projection_id(&self) -> ProjectionId {
        ProjectionId::new(self.projection.id)
    }

    /// Build the pre population and, when configured, a distinct post population
    pub fn populations(&self) -> CliResult<(Population, Option<Population>)> {
        let pre = self.pre.build(PopulationId::new(0))?;
        let post = self
            .post
            .as_ref()
            .map(|post| post.build(PopulationId::new(1)))
            .transpose()?;
        Ok((pre, post))
    }

    /// Build the unconfigured connector
    pub fn connector(&self) -> CliResult<DistanceDependentProbabilityConnector> {
        let p = &self.projection;
        let mut connector =
            DistanceDependentProbabilityConnector::new(&p.expression, p.allow_self_connections, p.n_connections)?
                .with_space(self.space.clone())?
                .with_field_policy(p.field_policy);
        if let Some(weights) = &p.weights {
            connector = connector.with_weights(weights.into());
        }
        if let Some(delays) = &p.delays {
            connector = connector.with_delays(delays.into());
        }
        if let Some(chance) = p.chance {
            connector = connector.with_chance(chance)?;
        }
        Ok(connector)
    }

    /// Partitioner for both populations
    pub fn partitioner(&self) -> CliResult<FixedAtomsPartitioner> {
        Ok(FixedAtomsPartitioner::new(self.partitioning.max_atoms_per_core)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[pre]
label = "line"
size = 10

[projection]
expression = "exp(-d)"
"#;

    #[test]
    fn test_minimal_defaults() {
        let config = ProjectionConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.simulation, SimulationConfig::default());
        assert_eq!(config.partitioning.max_atoms_per_core, 256);
        assert_eq!(config.pre.structure, Structure::line());
        assert!(config.post.is_none());
        assert_eq!(config.space, Space::default());
        assert_eq!(config.synapse_type().unwrap(), 0);
        assert_eq!(config.projection.field_policy, FieldPolicy::Dense);
    }

    #[test]
    fn test_value_forms() {
        let text = format!(
            "{}weights = 2\ndelays = {{ distribution = \"uniform\", low = 1.0, high = 4.0 }}\n",
            MINIMAL
        );
        let config = ProjectionConfig::from_toml_str(&text).unwrap();
        assert_eq!(config.projection.weights, Some(ValueConfig::Fixed(2.0)));
        assert_eq!(
            config.projection.delays,
            Some(ValueConfig::Random(RandomDistribution::Uniform { low: 1.0, high: 4.0 }))
        );
    }

    #[test]
    fn test_grid_structure_and_post() {
        let text = r#"
[pre]
label = "sheet"
size = 16
structure = { type = "grid_2d", aspect_ratio = 1.0, dx = 1.0, dy = 1.0, x0 = 0.0, y0 = 0.0, z = 0.0, fill_order = { order = "sequential" } }

[post]
label = "out"
size = 4

[space]
axes = "xy"

[projection]
expression = "d < 2"
synapse_target = "GABA_A"
field_policy = "per_slice"
"#;
        let config = ProjectionConfig::from_toml_str(text).unwrap();
        assert_eq!(config.pre.structure, Structure::grid_2d(1.0));
        assert_eq!(config.space.axes, "xy");
        assert_eq!(config.synapse_type().unwrap(), 2);
        assert_eq!(config.projection.field_policy, FieldPolicy::PerSlice);

        let (pre, post) = config.populations().unwrap();
        assert_eq!(pre.id(), PopulationId::new(0));
        assert_eq!(post.unwrap().id(), PopulationId::new(1));
    }

    #[test]
    fn test_rejections() {
        let unknown_target = format!("{}synapse_target = \"GLU\"\n", MINIMAL);
        assert!(matches!(
            ProjectionConfig::from_toml_str(&unknown_target),
            Err(CliError::Config(_))
        ));

        let bad_partition = format!("[partitioning]\nmax_atoms_per_core = 0\n{}", MINIMAL);
        assert!(matches!(
            ProjectionConfig::from_toml_str(&bad_partition),
            Err(CliError::Config(_))
        ));

        let empty = MINIMAL.replace("size = 10", "size = 0");
        assert!(matches!(ProjectionConfig::from_toml_str(&empty), Err(CliError::Config(_))));

        assert!(matches!(
            ProjectionConfig::from_toml_str("[pre]\nlabel = \"x\"\n"),
            Err(CliError::Toml(_))
        ));
    }

    #[test]
    fn test_fixed_count_is_rejected_by_connector() {
        let text = format!("{}n_connections = 5\n", MINIMAL);
        let config = ProjectionConfig::from_toml_str(&text).unwrap();
        assert!(matches!(config.connector(), Err(CliError::Connect(_))));
    }
}
