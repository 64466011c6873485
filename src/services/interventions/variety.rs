//! Variety: ask an agent for new ideas once the conversation is long enough
//! and it starts repeating itself.

use crate::domain::models::InterventionTarget;
use crate::services::intervention::InterventionBuilder;
use crate::services::interventions::anti_convergence::nudge_for;
use crate::services::interventions::nudges::new_ideas_nudge;

pub const VARIETY_TYPE: &str = "variety";

pub const RECYCLING_CLAIM: &str = "The agent is recycling ideas: its recent messages repeat points, arguments or suggestions it has already made instead of introducing new ones.";

pub fn variety(
    agent_id: Option<&str>,
    channel_id: Option<&str>,
    message_threshold: usize,
) -> InterventionBuilder {
    let mut builder = InterventionBuilder::new(VARIETY_TYPE)
        .functional(move |_, context| context.trajectory.len() >= message_threshold)
        .textual(RECYCLING_CLAIM)
        .window(5, 20)
        .effect(|targets| nudge_for(targets, new_ideas_nudge));

    if let Some(agent) = agent_id {
        builder = builder.target(InterventionTarget::agent(agent));
    }
    if let Some(channel) = channel_id {
        builder = builder.target(InterventionTarget::channel(channel));
    }
    builder
}
