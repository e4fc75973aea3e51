//! Run statistics.

use std::time::Duration;

use ingestion::SubscriberStats;
use observability::CycleMetricsAggregator;

/// Statistics from one agent run
#[derive(Debug, Clone, Default)]
pub struct AgentStats {
    /// Wall time from start to shutdown
    pub duration: Duration,

    /// Bus subscriber counters (None if the task did not stop in time)
    pub subscriber: Option<SubscriberStats>,

    /// Cycle aggregate (None if the task did not stop in time)
    pub cycles: Option<CycleMetricsAggregator>,
}

impl AgentStats {
    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Capture Agent Statistics ===\n");
        println!("Duration: {:.2}s", self.duration.as_secs_f64());

        match &self.subscriber {
            Some(sub) => {
                println!("\nBus subscriber");
                println!("  Connects: {}", sub.connects);
                println!("  Readings applied: {}", sub.messages_applied);
                println!("  Messages ignored: {}", sub.messages_ignored);
                println!("  Messages rejected: {}", sub.messages_rejected);
                println!("  Connection errors: {}", sub.connection_errors);
            }
            None => println!("\nBus subscriber: did not stop in time"),
        }

        match &self.cycles {
            Some(cycles) => println!("\n{}", cycles.summary()),
            None => println!("\nScheduler: did not stop in time"),
        }
    }
}
