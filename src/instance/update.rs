//! Auto-update operation kinds and the pluggable reasoner contract.

use crate::error::KbResult;
use crate::ident::InstanceId;

use super::graph::InstanceGraph;

/// Independently toggleable update operation kinds.
///
/// The auto-update engine requests a set of kinds; the reasoner returns the
/// subset that actually produced a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateOps {
    pub inferred_types: bool,
    pub suggested_types: bool,
    pub slot_set: bool,
    pub slot_values: bool,
}

impl UpdateOps {
    pub const NONE: UpdateOps = UpdateOps {
        inferred_types: false,
        suggested_types: false,
        slot_set: false,
        slot_values: false,
    };

    pub const ALL: UpdateOps = UpdateOps {
        inferred_types: true,
        suggested_types: true,
        slot_set: true,
        slot_values: true,
    };

    /// Whether any operation kind is requested/reported.
    pub fn any(&self) -> bool {
        self.inferred_types || self.suggested_types || self.slot_set || self.slot_values
    }
}

/// The pluggable type-inference engine driven by the auto-update loop.
///
/// Called repeatedly on the same frame until it reports no further change.
/// The contract requires monotonic progress or a no-op fixed point; a
/// reasoner that never converges is a contract violation, not handled here.
pub trait Reasoner: Send + Sync {
    /// Apply the requested operation kinds to one instance frame, returning
    /// the subset that changed anything.
    fn update(
        &self,
        graph: &mut InstanceGraph,
        frame: InstanceId,
        ops: UpdateOps,
    ) -> KbResult<UpdateOps>;
}
