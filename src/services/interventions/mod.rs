//! Concrete interventions built on the intervention framework.

pub mod anti_convergence;
pub mod nudges;
pub mod variety;

pub use anti_convergence::{anti_convergence, ANTI_CONVERGENCE_TYPE, CONVERGENCE_CLAIM};
pub use nudges::{devils_advocate_nudge, new_ideas_nudge};
pub use variety::{variety, RECYCLING_CLAIM, VARIETY_TYPE};
