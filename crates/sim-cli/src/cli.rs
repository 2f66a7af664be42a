use std::collections::HashMap;

use clap::{Parser, ValueEnum};
use sim_core::{ArrivalModel, NodeSpec, SchedulerKind, SimulationConfig};

fn parse_range_f64(input: &str) -> Result<(f64, f64), String> {
    let (lo, hi) = input
        .split_once(':')
        .ok_or_else(|| format!("expected MIN:MAX, got {input:?}"))?;
    let lo: f64 = lo.trim().parse().map_err(|_| format!("invalid min in {input:?}"))?;
    let hi: f64 = hi.trim().parse().map_err(|_| format!("invalid max in {input:?}"))?;
    Ok((lo, hi))
}

fn parse_range_u32(input: &str) -> Result<(u32, u32), String> {
    let (lo, hi) = input
        .split_once(':')
        .ok_or_else(|| format!("expected MIN:MAX, got {input:?}"))?;
    let lo: u32 = lo.trim().parse().map_err(|_| format!("invalid min in {input:?}"))?;
    let hi: u32 = hi.trim().parse().map_err(|_| format!("invalid max in {input:?}"))?;
    Ok((lo, hi))
}

/// `priority=weight`, e.g. `high=0.5`.
fn parse_priority_weight(input: &str) -> Result<(String, f64), String> {
    let (name, weight) = input
        .split_once('=')
        .ok_or_else(|| format!("expected PRIORITY=WEIGHT, got {input:?}"))?;
    let weight: f64 = weight.trim().parse().map_err(|_| format!("invalid weight in {input:?}"))?;
    Ok((name.trim().to_string(), weight))
}

/// `id:cpu:ram_mb:gpus`, e.g. `n0:8:16384:1`.
fn parse_node_spec(input: &str) -> Result<NodeSpec, String> {
    let parts: Vec<&str> = input.split(':').collect();
    let [id, cpu, ram, gpu] = parts.as_slice() else {
        return Err(format!("expected ID:CPU:RAM_MB:GPUS, got {input:?}"));
    };
    Ok(NodeSpec {
        id: id.to_string(),
        cpu_capacity: cpu.parse().map_err(|_| format!("invalid cpu in {input:?}"))?,
        ram_capacity_mb: ram.parse().map_err(|_| format!("invalid ram_mb in {input:?}"))?,
        gpu_capacity: gpu.parse().map_err(|_| format!("invalid gpus in {input:?}"))?,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SchedulerChoiceArg {
    Fifo,
    Stf,
    Rl,
}

impl From<SchedulerChoiceArg> for SchedulerKind {
    fn from(value: SchedulerChoiceArg) -> Self {
        match value {
            SchedulerChoiceArg::Fifo => SchedulerKind::Fifo,
            SchedulerChoiceArg::Stf => SchedulerKind::Stf,
            SchedulerChoiceArg::Rl => SchedulerKind::Rl,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ArrivalModelArg {
    Fixed,
    Poisson,
}

impl From<ArrivalModelArg> for ArrivalModel {
    fn from(value: ArrivalModelArg) -> Self {
        match value {
            ArrivalModelArg::Fixed => ArrivalModel::Fixed,
            ArrivalModelArg::Poisson => ArrivalModel::Poisson,
        }
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "sim-cli", version, about = "Multi-tenant cluster scheduling simulator")]
pub struct Cli {
    #[arg(long, env = "SIM_RUNTIME_SECONDS", default_value_t = 300.0)]
    pub runtime_seconds: f64,

    /// Mean job arrivals per minute.
    #[arg(long, env = "SIM_ARRIVAL_RATE", default_value_t = 2.0)]
    pub arrival_rate: f64,

    #[arg(long, env = "SIM_ARRIVAL_MODEL", value_enum, default_value_t = ArrivalModelArg::Poisson)]
    pub arrival_model: ArrivalModelArg,

    /// Job duration range in minutes, `MIN:MAX`.
    #[arg(long, env = "SIM_DURATION_RANGE", default_value = "1:10", value_parser = parse_range_f64)]
    pub duration_range: (f64, f64),

    /// Per-job CPU request range, `MIN:MAX`.
    #[arg(long, env = "SIM_CPU_RANGE", default_value = "1:4", value_parser = parse_range_u32)]
    pub cpu_range: (u32, u32),

    /// Per-job RAM request range in MB, `MIN:MAX`.
    #[arg(long, env = "SIM_RAM_RANGE_MB", default_value = "512:4096", value_parser = parse_range_u32)]
    pub ram_range_mb: (u32, u32),

    /// Per-job GPU request range, `MIN:MAX`.
    #[arg(long, env = "SIM_GPU_RANGE", default_value = "0:1", value_parser = parse_range_u32)]
    pub gpu_range: (u32, u32),

    /// Priority weight, repeatable: `--priority low=1 --priority high=2`.
    #[arg(long = "priority", value_parser = parse_priority_weight)]
    pub priority: Vec<(String, f64)>,

    /// Tenant id, repeatable: `--tenant acme --tenant globex`.
    #[arg(long = "tenant", required = true)]
    pub tenant: Vec<String>,

    /// Node spec, repeatable: `--node n0:8:16384:1`.
    #[arg(long = "node", required = true, value_parser = parse_node_spec)]
    pub node: Vec<NodeSpec>,

    #[arg(long, env = "SIM_SCHEDULER", value_enum, default_value_t = SchedulerChoiceArg::Fifo)]
    pub scheduler: SchedulerChoiceArg,

    #[arg(long, env = "SIM_PREEMPTION", default_value_t = true)]
    pub preemption: bool,

    #[arg(long, env = "SIM_SEED")]
    pub seed: Option<u64>,

    /// Stream live snapshots to stdout instead of only printing final results.
    #[arg(long, env = "SIM_LIVE", default_value_t = false)]
    pub live: bool,

    /// Persist snapshots and results under `$XDG_STATE_HOME/sim/<run-id>`.
    #[arg(long, env = "SIM_PERSIST", default_value_t = false)]
    pub persist: bool,

    /// Identifier used for the persisted run directory when `--persist` is set.
    #[arg(long, env = "SIM_RUN_ID", default_value = "default")]
    pub run_id: String,
}

impl Cli {
    pub fn into_config(self) -> SimulationConfig {
        let mut priority_distribution: HashMap<String, f64> = self.priority.into_iter().collect();
        if priority_distribution.is_empty() {
            priority_distribution.insert("low".to_string(), 1.0);
            priority_distribution.insert("med".to_string(), 1.0);
            priority_distribution.insert("high".to_string(), 1.0);
        }

        SimulationConfig {
            runtime_seconds: self.runtime_seconds,
            arrival_rate: self.arrival_rate,
            arrival_model: self.arrival_model.into(),
            duration_range: self.duration_range,
            cpu_range: self.cpu_range,
            ram_range_mb: self.ram_range_mb,
            gpu_range: self.gpu_range,
            priority_distribution,
            tenants: self.tenant,
            nodes: self.node,
            scheduler_choice: self.scheduler.into(),
            preemption_enabled: self.preemption,
            seed: self.seed,
        }
    }
}
