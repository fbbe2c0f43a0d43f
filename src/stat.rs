use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Default, Serialize)]
pub struct Stats {
    pub path_costs: f64,
    pub path_length: usize,
    pub time_us: u128,
    pub expanded_nodes: usize,
    pub enqueued_nodes: usize,
}

impl Stats {
    pub fn print(&self) {
        info!(
            "Costs {:?} Path length {:?} Time(microseconds) {:?} Expanded nodes number: {:?} Enqueued nodes number: {:?}",
            self.path_costs, self.path_length, self.time_us, self.expanded_nodes, self.enqueued_nodes
        );
    }
}
