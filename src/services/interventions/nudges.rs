//! Static per-character nudge text.

/// Nudge pair for one character archetype.
struct NudgeSet {
    devils_advocate: &'static str,
    new_ideas: &'static str,
}

const NUDGES: &[(&str, NudgeSet)] = &[
    (
        "skeptic",
        NudgeSet {
            devils_advocate: "Everyone seems to agree a little too quickly. Ask for the evidence behind the consensus and point out what could go wrong.",
            new_ideas: "You have been questioning the same points. Find a different assumption nobody has examined yet and challenge that instead.",
        },
    ),
    (
        "optimist",
        NudgeSet {
            devils_advocate: "The group has settled on one view. Champion an alternative you find exciting, even if it is the unpopular option.",
            new_ideas: "Bring in a fresh possibility you have not mentioned before: a new opportunity, a person to involve, or an unexpected upside.",
        },
    ),
    (
        "pragmatist",
        NudgeSet {
            devils_advocate: "The others agree, but has anyone checked whether it is practical? Raise the cost, the timeline or the logistics that make it harder than it sounds.",
            new_ideas: "Stop restating the plan. Propose a concrete next step or a different approach that nobody has put on the table.",
        },
    ),
    (
        "idealist",
        NudgeSet {
            devils_advocate: "The group is converging on a compromise. Say which of your principles it gives up and argue for the option that keeps them.",
            new_ideas: "Connect the discussion to a value or a bigger picture you have not talked about yet.",
        },
    ),
    (
        "contrarian",
        NudgeSet {
            devils_advocate: "Nobody is pushing back. Take the opposite position and defend it as strongly as you can.",
            new_ideas: "Your objections are getting repetitive. Find a completely new angle to disagree from.",
        },
    ),
];

const GENERIC_DEVILS_ADVOCATE: &str = "The conversation is converging on one opinion without much pushback. Play devil's advocate: raise a counterargument or a perspective the others have not considered.";

const GENERIC_NEW_IDEAS: &str = "You have been repeating ideas you already shared. Introduce something new: a different topic, a fresh argument, or a question nobody has asked.";

fn lookup(agent: &str) -> Option<&'static NudgeSet> {
    let key = agent.trim().to_lowercase();
    NUDGES
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, set)| set)
}

/// Devil's-advocate nudge for an agent, or the generic one.
pub fn devils_advocate_nudge(agent: &str) -> &'static str {
    lookup(agent).map_or(GENERIC_DEVILS_ADVOCATE, |set| set.devils_advocate)
}

/// New-ideas nudge for an agent, or the generic one.
pub fn new_ideas_nudge(agent: &str) -> &'static str {
    lookup(agent).map_or(GENERIC_NEW_IDEAS, |set| set.new_ideas)
}
