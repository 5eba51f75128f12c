//! Scenario configuration loading.
//!
//! A scenario file describes the node pool, the placement weights, the
//! per-category sensor weights, the mobile devices whose average position is
//! the placement reference point, and the VMs / work units to run.
//!
//! The expected YAML structure is:
//! ```yaml
//! simulation:
//!   min_time_between_events: 0.1
//!   storage_rate_mb_per_s: 100.0
//! placement:
//!   pe_weight: 1.0
//!   dist_weight: 0.5
//! sensor_weights:
//!   temperature: 2
//!   camera: 3
//! nodes:
//!   - name: edge01
//!     pes: 4
//!     mips_per_pe: 1000
//!     memory_mb: 4096
//!     location: { x: 1.0, y: 2.0, z: 0.0 }
//! devices:
//!   - name: thermo01
//!     location: { x: 0.0, y: 0.0, z: 0.0 }
//!     velocity: 1.0
//!     range: { begin_x: 0, end_x: 10, begin_y: 0, end_y: 10, begin_z: 0, end_z: 10 }
//! vms:
//!   - id: 0
//!     user_id: 1
//!     pes: 2
//!     mips: 500
//!     memory_mb: 512
//! work_units:
//!   - id: 0
//!     user_id: 1
//!     vm_id: 0
//!     length: 10000
//!     pes: 1
//!     category: temperature
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{bail, ensure, Context, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::mobility::{centroid, Location, Mobility, MovingRange};
use crate::node::EdgeNode;
use crate::scheduler::{CategoryWeights, DEFAULT_MIN_TIME_BETWEEN_EVENTS};
use crate::vm::{VmSpec, VmUid};
use crate::work_unit::WorkUnit;

/// Default cap on driver iterations before a run is declared stalled.
pub const DEFAULT_MAX_STEPS: usize = 1_000_000;

// ── Private YAML deserialization types ────────────────────────────────────────

/// Top-level wrapper that maps directly onto the YAML file layout.
#[derive(Debug, Deserialize)]
struct ScenarioFile {
    #[serde(default)]
    simulation: SimulationEntry,
    #[serde(default)]
    placement: PlacementEntry,
    #[serde(default)]
    sensor_weights: BTreeMap<String, u32>,
    #[serde(default)]
    nodes: Vec<NodeEntry>,
    #[serde(default)]
    devices: Vec<DeviceEntry>,
    #[serde(default)]
    vms: Vec<VmEntry>,
    #[serde(default)]
    work_units: Vec<WorkUnitEntry>,
}

#[derive(Debug, Deserialize)]
struct SimulationEntry {
    #[serde(default = "default_min_time_between_events")]
    min_time_between_events: f64,
    #[serde(default)]
    storage_rate_mb_per_s: f64,
    #[serde(default = "default_max_steps")]
    max_steps: usize,
}

impl Default for SimulationEntry {
    fn default() -> Self {
        Self {
            min_time_between_events: default_min_time_between_events(),
            storage_rate_mb_per_s: 0.0,
            max_steps: default_max_steps(),
        }
    }
}

fn default_min_time_between_events() -> f64 {
    DEFAULT_MIN_TIME_BETWEEN_EVENTS
}

fn default_max_steps() -> usize {
    DEFAULT_MAX_STEPS
}

/// Defaults to pure load balancing.
#[derive(Debug, Deserialize)]
struct PlacementEntry {
    #[serde(default = "default_pe_weight")]
    pe_weight: f64,
    #[serde(default)]
    dist_weight: f64,
    reference: Option<Location>,
}

impl Default for PlacementEntry {
    fn default() -> Self {
        Self {
            pe_weight: default_pe_weight(),
            dist_weight: 0.0,
            reference: None,
        }
    }
}

fn default_pe_weight() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
struct NodeEntry {
    name: String,
    pes: u32,
    mips_per_pe: f64,
    /// Defaults to `u64::MAX` (unconstrained) when absent from YAML.
    #[serde(default = "default_memory_mb")]
    memory_mb: u64,
    #[serde(default)]
    location: Location,
}

fn default_memory_mb() -> u64 {
    u64::MAX
}

#[derive(Debug, Deserialize)]
struct DeviceEntry {
    name: String,
    #[serde(default)]
    location: Location,
    #[serde(default)]
    velocity: f64,
    range: Option<MovingRange>,
}

#[derive(Debug, Deserialize)]
struct VmEntry {
    id: u32,
    #[serde(default)]
    user_id: u32,
    pes: u32,
    mips: f64,
    #[serde(default)]
    memory_mb: u64,
}

#[derive(Debug, Deserialize)]
struct WorkUnitEntry {
    id: u32,
    #[serde(default)]
    user_id: u32,
    vm_id: u32,
    length: f64,
    #[serde(default = "default_work_unit_pes")]
    pes: u32,
    category: String,
    #[serde(default)]
    input_size_mb: f64,
}

fn default_work_unit_pes() -> u32 {
    1
}

// ── Public data structures ────────────────────────────────────────────────────

/// Driver-level timing parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Minimum gap between two wakeups of one scheduler.
    pub min_time_between_events: f64,
    /// Storage read rate used to turn input size into transfer time.
    /// `0.0` disables transfer delays.
    pub storage_rate_mb_per_s: f64,
    pub max_steps: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacementConfig {
    pub pe_weight: f64,
    pub dist_weight: f64,
    /// Explicit reference point; `None` means "centroid of the devices".
    pub reference: Option<Location>,
}

/// Hardware description of one edge node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeConfig {
    pub name: String,
    pub pes: u32,
    pub mips_per_pe: f64,
    /// `u64::MAX` means unconstrained (no YAML value supplied).
    pub memory_mb: u64,
    pub location: Location,
}

impl NodeConfig {
    pub fn to_edge_node(&self) -> EdgeNode {
        EdgeNode::new(
            self.name.clone(),
            self.location,
            self.pes,
            self.mips_per_pe,
            self.memory_mb,
        )
    }
}

/// A mobile (or fixed) sensor-emitting device.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceConfig {
    pub name: String,
    pub mobility: Mobility,
}

/// A fully validated scenario.
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    pub simulation: SimulationConfig,
    pub placement: PlacementConfig,
    pub sensor_weights: CategoryWeights,
    pub nodes: Vec<NodeConfig>,
    pub devices: Vec<DeviceConfig>,
    pub vms: Vec<VmSpec>,
    pub work_units: Vec<WorkUnit>,
}

impl ScenarioConfig {
    /// Read and validate the scenario at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, if the YAML is
    /// structurally invalid, or if a value fails validation.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading scenario from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open scenario file: {}", path.display()))?;

        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid scenario file: {}", path.display()))
    }

    /// Parse and validate a scenario from YAML text.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let file: ScenarioFile =
            serde_yaml::from_str(content).context("Failed to parse scenario YAML")?;

        let simulation = convert_simulation(file.simulation)?;
        let placement = convert_placement(file.placement)?;

        for (category, &weight) in &file.sensor_weights {
            ensure!(weight > 0, "sensor weight for '{}' must be positive", category);
        }
        let sensor_weights: CategoryWeights = file.sensor_weights.into_iter().collect();

        let nodes = file
            .nodes
            .into_iter()
            .map(convert_node)
            .collect::<Result<Vec<_>>>()?;
        if nodes.is_empty() {
            warn!("Scenario declares no nodes; every VM placement will fail");
        }

        let devices = file.devices.into_iter().map(convert_device).collect();

        let vms = file
            .vms
            .into_iter()
            .map(convert_vm)
            .collect::<Result<Vec<_>>>()?;
        let mut seen = BTreeSet::new();
        for vm in &vms {
            ensure!(seen.insert(vm.uid), "VM {} declared twice", vm.uid);
        }

        let work_units = file
            .work_units
            .into_iter()
            .map(|entry| convert_work_unit(entry, &seen))
            .collect::<Result<Vec<_>>>()?;

        for unit in &work_units {
            if !sensor_weights.contains(&unit.category) {
                warn!(
                    unit = unit.id,
                    category = %unit.category,
                    "work unit category has no sensor weight; it will not progress"
                );
            }
        }

        let scenario = Self {
            simulation,
            placement,
            sensor_weights,
            nodes,
            devices,
            vms,
            work_units,
        };

        info!(
            nodes = scenario.nodes.len(),
            devices = scenario.devices.len(),
            vms = scenario.vms.len(),
            work_units = scenario.work_units.len(),
            categories = scenario.sensor_weights.len(),
            "Scenario loaded"
        );
        for node in &scenario.nodes {
            debug!(
                "  Node: {} | PEs: {} | MIPS/PE: {} | Memory: {}MB | at ({}, {}, {})",
                node.name,
                node.pes,
                node.mips_per_pe,
                node.memory_mb,
                node.location.x,
                node.location.y,
                node.location.z,
            );
        }

        Ok(scenario)
    }

    /// Reference point for proximity scoring: the explicit one if configured,
    /// else the centroid of the devices, else the origin.
    pub fn reference_location(&self) -> Location {
        if let Some(reference) = self.placement.reference {
            return reference;
        }
        let positions: Vec<Location> = self.devices.iter().map(|d| d.mobility.location).collect();
        centroid(&positions).unwrap_or_else(|| {
            warn!("No devices and no explicit reference point; using the origin");
            Location::default()
        })
    }

    pub fn edge_nodes(&self) -> Vec<EdgeNode> {
        self.nodes.iter().map(NodeConfig::to_edge_node).collect()
    }
}

// ── Conversion / validation ───────────────────────────────────────────────────

fn convert_simulation(entry: SimulationEntry) -> Result<SimulationConfig> {
    ensure!(
        entry.min_time_between_events >= 0.0,
        "min_time_between_events must not be negative (got {})",
        entry.min_time_between_events
    );
    ensure!(
        entry.storage_rate_mb_per_s >= 0.0,
        "storage_rate_mb_per_s must not be negative (got {})",
        entry.storage_rate_mb_per_s
    );
    ensure!(entry.max_steps > 0, "max_steps must be positive");
    Ok(SimulationConfig {
        min_time_between_events: entry.min_time_between_events,
        storage_rate_mb_per_s: entry.storage_rate_mb_per_s,
        max_steps: entry.max_steps,
    })
}

fn convert_placement(entry: PlacementEntry) -> Result<PlacementConfig> {
    if entry.pe_weight < 0.0 || entry.dist_weight < 0.0 {
        bail!(
            "placement weights must be non-negative (pe_weight = {}, dist_weight = {})",
            entry.pe_weight,
            entry.dist_weight
        );
    }
    Ok(PlacementConfig {
        pe_weight: entry.pe_weight,
        dist_weight: entry.dist_weight,
        reference: entry.reference,
    })
}

fn convert_node(entry: NodeEntry) -> Result<NodeConfig> {
    ensure!(entry.pes > 0, "node '{}' must have at least one PE", entry.name);
    ensure!(
        entry.mips_per_pe > 0.0,
        "node '{}' must have positive mips_per_pe",
        entry.name
    );
    Ok(NodeConfig {
        name: entry.name,
        pes: entry.pes,
        mips_per_pe: entry.mips_per_pe,
        memory_mb: entry.memory_mb,
        location: entry.location,
    })
}

fn convert_device(entry: DeviceEntry) -> DeviceConfig {
    let mobility = match entry.range {
        Some(range) if entry.velocity != 0.0 => Mobility::moving(entry.location, entry.velocity, range),
        _ => Mobility::fixed(entry.location),
    };
    DeviceConfig {
        name: entry.name,
        mobility,
    }
}

fn convert_vm(entry: VmEntry) -> Result<VmSpec> {
    let uid = VmUid::new(entry.user_id, entry.id);
    ensure!(entry.pes > 0, "VM {} must have at least one PE", uid);
    ensure!(entry.mips > 0.0, "VM {} must have positive mips", uid);
    Ok(VmSpec::new(uid, entry.pes, entry.mips, entry.memory_mb))
}

fn convert_work_unit(entry: WorkUnitEntry, vms: &BTreeSet<VmUid>) -> Result<WorkUnit> {
    let uid = VmUid::new(entry.user_id, entry.vm_id);
    ensure!(
        vms.contains(&uid),
        "work unit {} targets undeclared VM {}",
        entry.id,
        uid
    );
    ensure!(entry.pes > 0, "work unit {} must have at least one PE", entry.id);
    ensure!(
        entry.length >= 0.0 && entry.input_size_mb >= 0.0,
        "work unit {} must have non-negative length and input size",
        entry.id
    );
    Ok(WorkUnit {
        id: entry.id,
        user_id: entry.user_id,
        vm_id: entry.vm_id,
        length: entry.length,
        pes: entry.pes,
        category: entry.category,
        input_size_mb: entry.input_size_mb,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
