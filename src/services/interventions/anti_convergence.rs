//! Anti-convergence: push back when agents agree without debate.

use crate::domain::models::{first_target_of, InterventionTarget, TargetKind};
use crate::services::intervention::InterventionBuilder;
use crate::services::interventions::nudges::devils_advocate_nudge;

pub const ANTI_CONVERGENCE_TYPE: &str = "anti_convergence";

pub const CONVERGENCE_CLAIM: &str = "The agents in this conversation are converging on the same opinion without anyone pushing back, questioning it or offering a different perspective.";

/// Builder for the anti-convergence intervention.
///
/// Pass no agent for a batch template; [`InterventionBatch`](crate::services::InterventionBatch)
/// adds one agent target per intervention.
pub fn anti_convergence(agent_id: Option<&str>, channel_id: Option<&str>) -> InterventionBuilder {
    let mut builder = InterventionBuilder::new(ANTI_CONVERGENCE_TYPE)
        .textual(CONVERGENCE_CLAIM)
        .window(5, 15)
        .effect(|targets| nudge_for(targets, devils_advocate_nudge));

    if let Some(agent) = agent_id {
        builder = builder.target(InterventionTarget::agent(agent));
    }
    if let Some(channel) = channel_id {
        builder = builder.target(InterventionTarget::channel(channel));
    }
    builder
}

pub(crate) fn nudge_for(targets: &[InterventionTarget], lookup: fn(&str) -> &'static str) -> String {
    let agent = first_target_of(targets, TargetKind::Agent).map_or("", |t| t.id.as_str());
    lookup(agent).to_string()
}
