use crate::domains::fleet::PriorityLabel;
use crate::domains::scheduler::{FleetHandle, TaskSubmission};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::interval;

const LABELS: [PriorityLabel; 4] = [
    PriorityLabel::Urgent,
    PriorityLabel::High,
    PriorityLabel::Medium,
    PriorityLabel::Low,
];

/// Feeds random delivery requests into the fleet at a fixed pace.
pub struct RandomTaskSource {
    handle: FleetHandle,
    destinations: Vec<String>,
    period: Duration,
    rng: StdRng,
}

impl RandomTaskSource {
    pub fn new(handle: FleetHandle, destinations: Vec<String>, period: Duration, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            handle,
            destinations,
            period,
            rng,
        }
    }

    /// One in four requests leaves the label out so the waypoint default applies.
    pub fn next_submission(&mut self) -> Option<TaskSubmission> {
        let destination = self.destinations.choose(&mut self.rng)?.clone();
        let mut submission = TaskSubmission::new(destination);
        if self.rng.gen_bool(0.75) {
            submission.priority = LABELS.choose(&mut self.rng).copied();
        }
        Some(submission)
    }

    /// Submits until `shutdown` flips to true. Returns how many were accepted.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> usize {
        let mut ticker = interval(self.period);
        let mut accepted = 0;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let Some(submission) = self.next_submission() else {
                        tracing::warn!("Demo source has no destinations, stopping");
                        break;
                    };
                    match self.handle.submit(submission) {
                        Ok(ticket) => {
                            accepted += 1;
                            tracing::info!(
                                task_id = %ticket.task_id,
                                destination = %ticket.destination,
                                priority = ticket.priority.value(),
                                "Demo task submitted"
                            );
                        }
                        Err(e) => tracing::warn!("Demo task rejected: {}", e),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        accepted
    }
}
