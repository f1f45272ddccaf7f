//! Order progress as shown to the customer.
//!
//! An order moves through a fixed sequence of steps unless it is cancelled, in which case
//! no progress is shown at all.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Fulfillment state of an order
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Placed,
    Confirmed,
    Preparing,
    OutForDelivery,
    Delivered,
    Cancelled,
}

/// The progression an order follows, barring cancellation
pub const STEPS: [OrderStatus; 5] = [
    OrderStatus::Placed,
    OrderStatus::Confirmed,
    OrderStatus::Preparing,
    OrderStatus::OutForDelivery,
    OrderStatus::Delivered,
];

impl OrderStatus {
    pub fn tag(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "placed",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_tag(tag: &str) -> Option<OrderStatus> {
        STEPS
            .into_iter()
            .chain(std::iter::once(OrderStatus::Cancelled))
            .find(|s| s.tag() == tag)
    }

    /// Label of the step in the tracker
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "Order Placed",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Preparing => "Preparing",
            OrderStatus::OutForDelivery => "Out for Delivery",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

/// Position of a status tag in STEPS.
///
/// Returns -1 for "cancelled" and for any tag this client does not know.
pub fn step_index(status: &str) -> i32 {
    STEPS
        .iter()
        .position(|s| s.tag() == status)
        .map(|i| i as i32)
        .unwrap_or(-1)
}

/// Text shown for a status in order lists
pub fn status_text(status: &str) -> String {
    match OrderStatus::from_tag(status) {
        Some(s) => s.label().to_string(),
        None => status.replace('_', " "),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Completed,
    /// Completed, and the step the order is at right now
    Current,
    Pending,
}

impl StepState {
    pub fn is_completed(&self) -> bool {
        matches!(self, StepState::Completed | StepState::Current)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub status: OrderStatus,
    pub state: StepState,
    /// Whether the connector towards the next step is filled. Always false on the last step.
    pub connector_filled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Tracker {
    Cancelled,
    Progress(Vec<Step>),
}

impl Tracker {
    /// Build the tracker for a raw status tag
    pub fn for_status(status: &str) -> Tracker {
        if status == OrderStatus::Cancelled.tag() {
            return Tracker::Cancelled;
        }

        let current = step_index(status);
        if current < 0 {
            warn!(status, "Unknown order status, showing no progress");
        }

        let steps = STEPS
            .iter()
            .enumerate()
            .map(|(index, status)| {
                let index = index as i32;
                let state = if index == current {
                    StepState::Current
                } else if index < current {
                    StepState::Completed
                } else {
                    StepState::Pending
                };
                Step {
                    status: *status,
                    state,
                    connector_filled: index < current,
                }
            })
            .collect();

        Tracker::Progress(steps)
    }

    /// Number of completed steps, the current one included
    pub fn completed(&self) -> usize {
        match self {
            Tracker::Cancelled => 0,
            Tracker::Progress(steps) => steps.iter().filter(|s| s.state.is_completed()).count(),
        }
    }

    /// One line per step, for terminal output
    pub fn render(&self) -> String {
        match self {
            Tracker::Cancelled => {
                "This order has been cancelled. If you have any questions, please contact support."
                    .to_string()
            }
            Tracker::Progress(steps) => steps
                .iter()
                .map(|step| {
                    let mark = match step.state {
                        StepState::Current => "[>]",
                        StepState::Completed => "[x]",
                        StepState::Pending => "[ ]",
                    };
                    format!("{} {}", mark, step.status.label())
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn states(tracker: &Tracker) -> Vec<StepState> {
        match tracker {
            Tracker::Progress(steps) => steps.iter().map(|s| s.state).collect(),
            Tracker::Cancelled => panic!("Unexpected cancelled tracker"),
        }
    }

    #[test]
    fn test_step_index() {
        assert_eq!(step_index("placed"), 0);
        assert_eq!(step_index("out_for_delivery"), 3);
        assert_eq!(step_index("delivered"), 4);
        assert_eq!(step_index("cancelled"), -1);
        assert_eq!(step_index("lost"), -1);
    }

    #[test]
    fn test_preparing_progress() {
        let tracker = Tracker::for_status("preparing");
        assert_eq!(
            states(&tracker),
            vec![
                StepState::Completed,
                StepState::Completed,
                StepState::Current,
                StepState::Pending,
                StepState::Pending,
            ]
        );
        assert_eq!(tracker.completed(), 3);
    }

    #[test]
    fn test_connectors_follow_progress() {
        match Tracker::for_status("preparing") {
            Tracker::Progress(steps) => {
                let filled: Vec<bool> = steps.iter().map(|s| s.connector_filled).collect();
                assert_eq!(filled, vec![true, true, false, false, false]);
            }
            Tracker::Cancelled => panic!("Unexpected cancelled tracker"),
        }

        match Tracker::for_status("delivered") {
            Tracker::Progress(steps) => assert!(!steps[4].connector_filled),
            Tracker::Cancelled => panic!("Unexpected cancelled tracker"),
        }
    }

    #[test]
    fn test_cancelled_shows_no_progress() {
        let tracker = Tracker::for_status("cancelled");
        assert_eq!(tracker, Tracker::Cancelled);
        assert_eq!(tracker.completed(), 0);
        assert!(tracker.render().contains("cancelled"));
    }

    #[test]
    fn test_unknown_status_completes_nothing() {
        let tracker = Tracker::for_status("refunded");
        assert!(states(&tracker).iter().all(|s| *s == StepState::Pending));
    }

    #[test]
    fn test_status_text() {
        assert_eq!(status_text("out_for_delivery"), "Out for Delivery");
        assert_eq!(status_text("on_hold"), "on hold");
    }

    #[test]
    fn test_render() {
        let rendered = Tracker::for_status("confirmed").render();
        assert_eq!(
            rendered,
            "[x] Order Placed\n[>] Confirmed\n[ ] Preparing\n[ ] Out for Delivery\n[ ] Delivered"
        );
    }
}
