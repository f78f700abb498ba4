use serde::Serialize;

use forgeroute_core::SellerId;
use forgeroute_orders::{AssignmentStatus, FallbackReason};

/// Result of one routing attempt.
///
/// `success()` / `reason()` give the flat `(success, reason)` view used by
/// the HTTP layer and logs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AssignmentOutcome {
    /// Stock reserved and the order handed to a seller.
    Assigned {
        seller_id: SellerId,
        business_name: String,
        distance_km: Option<f64>,
        attempt: u32,
        auto_accepted: bool,
    },
    /// Order moved to centralized fulfillment; central stock was deducted.
    FellBackToAdmin {
        reason: FallbackReason,
        out_of_stock_alerts: usize,
    },
    /// Nothing to do: the order is not in a routable state.
    NotRoutable { status: AssignmentStatus },
    /// Another writer changed the order first; any reservation taken by this
    /// attempt was released.
    Superseded,
}

impl AssignmentOutcome {
    pub fn success(&self) -> bool {
        matches!(
            self,
            AssignmentOutcome::Assigned { .. } | AssignmentOutcome::FellBackToAdmin { .. }
        )
    }

    pub fn reason(&self) -> String {
        match self {
            AssignmentOutcome::Assigned {
                business_name,
                attempt,
                auto_accepted,
                ..
            } => {
                let accepted = if *auto_accepted { ", auto-accepted" } else { "" };
                format!("assigned to {business_name} (attempt {attempt}{accepted})")
            }
            AssignmentOutcome::FellBackToAdmin { reason, .. } => {
                format!("assigned to admin direct fulfillment ({})", reason.as_str())
            }
            AssignmentOutcome::NotRoutable { status } => format!("order already {status}"),
            AssignmentOutcome::Superseded => "order was modified concurrently".to_string(),
        }
    }

    pub fn assigned_seller(&self) -> Option<SellerId> {
        match self {
            AssignmentOutcome::Assigned { seller_id, .. } => Some(*seller_id),
            _ => None,
        }
    }
}
