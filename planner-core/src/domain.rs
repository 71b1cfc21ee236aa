//! Pure data: resources, processes, goals, and the indexes derived from them.
//!
//! Everything here is immutable after [`ConfigBuilder::build`]. The core never
//! revalidates a [`Config`]; that is the job of the external config validator
//! (see `planner-config`).

use ahash::AHashMap;

/// Index into [`Config::resource_name`]. Resource identity is positional, not
/// textual, once a config is built.
pub type ResourceId = u32;

/// Index into [`Config::process`]. Candidate schedules are sequences of
/// these, not of process names.
pub type ProcessId = u32;

/// The reserved pseudo-resource name that means "finish as fast as possible".
pub const TIME_RESOURCE: &str = "time";

/// One transformation: debit `inputs`, wait `duration` cycles, credit `outputs`.
#[derive(Debug, Clone)]
pub struct Process {
    pub name: String,
    pub inputs: Vec<(ResourceId, i64)>,
    pub outputs: Vec<(ResourceId, i64)>,
    pub duration: u32,
}

/// A single optimization target: either the pseudo-resource `time`, or a
/// concrete resource to maximize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Goal {
    Time,
    Resource(ResourceId),
}

/// A validated, immutable production-planning problem.
#[derive(Debug, Clone)]
pub struct Config {
    resource_names: Vec<String>,
    resource_index: AHashMap<String, ResourceId>,
    initial_stock: Vec<i64>,
    processes: Vec<Process>,
    process_index: AHashMap<String, ProcessId>,
    goals: Vec<Goal>,
    producers: Vec<Vec<ProcessId>>,
    consumers: Vec<Vec<ProcessId>>,
}

impl Config {
    pub fn resource_count(&self) -> usize {
        self.resource_names.len()
    }

    pub fn resource_name(&self, id: ResourceId) -> &str {
        &self.resource_names[id as usize]
    }

    pub fn resource_id(&self, name: &str) -> Option<ResourceId> {
        self.resource_index.get(name).copied()
    }

    pub fn initial_stock(&self, id: ResourceId) -> i64 {
        self.initial_stock[id as usize]
    }

    pub fn initial_stocks(&self) -> &[i64] {
        &self.initial_stock
    }

    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    pub fn process(&self, id: ProcessId) -> &Process {
        &self.processes[id as usize]
    }

    pub fn process_id(&self, name: &str) -> Option<ProcessId> {
        self.process_index.get(name).copied()
    }

    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    /// Processes whose outputs contain `resource`.
    pub fn producers_of(&self, resource: ResourceId) -> &[ProcessId] {
        &self.producers[resource as usize]
    }

    /// Processes whose inputs contain `resource`.
    pub fn consumers_of(&self, resource: ResourceId) -> &[ProcessId] {
        &self.consumers[resource as usize]
    }
}

/// Assembles a [`Config`] from trusted data. Resource names are interned on
/// first reference; a name that only ever appears as a process output
/// implicitly starts at stock 0, matching the config format's rule for
/// missing stock lines.
#[derive(Default)]
pub struct ConfigBuilder {
    resource_names: Vec<String>,
    resource_index: AHashMap<String, ResourceId>,
    initial_stock: Vec<i64>,
    processes: Vec<Process>,
    process_index: AHashMap<String, ProcessId>,
    goals: Vec<Goal>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `name`, returning its id. Repeated calls with the same name
    /// return the same id; the first call establishes the initial stock.
    pub fn intern(&mut self, name: &str) -> ResourceId {
        if let Some(&id) = self.resource_index.get(name) {
            return id;
        }
        let id = self.resource_names.len() as ResourceId;
        self.resource_names.push(name.to_string());
        self.resource_index.insert(name.to_string(), id);
        self.initial_stock.push(0);
        id
    }

    pub fn stock(&mut self, name: &str, qty: i64) -> ResourceId {
        let id = self.intern(name);
        self.initial_stock[id as usize] = qty;
        id
    }

    pub fn process(
        &mut self,
        name: impl Into<String>,
        inputs: &[(&str, i64)],
        outputs: &[(&str, i64)],
        duration: u32,
    ) -> ProcessId {
        let name = name.into();
        let inputs = inputs
            .iter()
            .map(|&(res, qty)| (self.intern(res), qty))
            .collect();
        let outputs = outputs
            .iter()
            .map(|&(res, qty)| (self.intern(res), qty))
            .collect();
        let id = self.processes.len() as ProcessId;
        self.process_index.insert(name.clone(), id);
        self.processes.push(Process {
            name,
            inputs,
            outputs,
            duration,
        });
        id
    }

    pub fn goal_time(&mut self) {
        self.goals.push(Goal::Time);
    }

    pub fn goal_resource(&mut self, name: &str) {
        let id = self.intern(name);
        self.goals.push(Goal::Resource(id));
    }

    pub fn build(self) -> Config {
        let mut producers = vec![Vec::new(); self.resource_names.len()];
        let mut consumers = vec![Vec::new(); self.resource_names.len()];
        for (pid, process) in self.processes.iter().enumerate() {
            let pid = pid as ProcessId;
            for &(res, _) in &process.outputs {
                producers[res as usize].push(pid);
            }
            for &(res, _) in &process.inputs {
                consumers[res as usize].push(pid);
            }
        }
        Config {
            resource_names: self.resource_names,
            resource_index: self.resource_index,
            initial_stock: self.initial_stock,
            processes: self.processes,
            process_index: self.process_index,
            goals: self.goals,
            producers,
            consumers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_stable() {
        let mut b = ConfigBuilder::new();
        let a = b.intern("euro");
        let c = b.intern("euro");
        assert_eq!(a, c);
    }

    #[test]
    fn producers_and_consumers_are_indexed() {
        let mut b = ConfigBuilder::new();
        b.stock("euro", 10);
        b.process("buy_fruit", &[("euro", 5)], &[("fruit", 1)], 1);
        let config = b.build();
        let fruit = config.resource_id("fruit").unwrap();
        let euro = config.resource_id("euro").unwrap();
        assert_eq!(config.producers_of(fruit), &[0]);
        assert_eq!(config.consumers_of(euro), &[0]);
        assert!(config.producers_of(euro).is_empty());
    }

    #[test]
    fn output_only_resource_starts_at_zero() {
        let mut b = ConfigBuilder::new();
        b.process("buy_fruit", &[], &[("fruit", 1)], 1);
        let config = b.build();
        let fruit = config.resource_id("fruit").unwrap();
        assert_eq!(config.initial_stock(fruit), 0);
    }
}
