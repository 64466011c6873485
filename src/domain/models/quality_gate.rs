//! Quality gate configuration and results.

use serde::{Deserialize, Serialize};

use super::proposition::TokenUsage;

/// A behavioral dimension the gate can score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityDimension {
    PersonaAdherence,
    SelfConsistency,
    Fluency,
    Suitability,
}

impl QualityDimension {
    pub const ALL: [Self; 4] = [
        Self::PersonaAdherence,
        Self::SelfConsistency,
        Self::Fluency,
        Self::Suitability,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PersonaAdherence => "persona_adherence",
            Self::SelfConsistency => "self_consistency",
            Self::Fluency => "fluency",
            Self::Suitability => "suitability",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "persona_adherence" => Some(Self::PersonaAdherence),
            "self_consistency" => Some(Self::SelfConsistency),
            "fluency" => Some(Self::Fluency),
            "suitability" => Some(Self::Suitability),
            _ => None,
        }
    }

    /// Whether the judge sees the persona when scoring this dimension.
    pub fn uses_persona(&self) -> bool {
        matches!(self, Self::PersonaAdherence | Self::Suitability)
    }

    /// The fixed claim the judge scores for this dimension.
    pub fn claim(&self, agent_name: &str) -> String {
        match self {
            Self::PersonaAdherence => format!(
                "{agent_name}'s latest action is consistent with the persona description: it reflects their stated personality, values, background and speaking style."
            ),
            Self::SelfConsistency => format!(
                "{agent_name}'s latest action is consistent with their own earlier statements and behavior in this conversation and does not contradict positions they have already taken."
            ),
            Self::Fluency => format!(
                "{agent_name}'s latest action is fluent: it reads naturally, is grammatical, and is free of repetitive phrasing, formatting artifacts or meta-commentary."
            ),
            Self::Suitability => format!(
                "{agent_name}'s latest action is suitable for the conversation: it responds to what others said, stays on topic and fits the social situation."
            ),
        }
    }

    /// Instruction handed back to the acting agent when this dimension fails.
    pub fn recommendation(&self) -> &'static str {
        match self {
            Self::PersonaAdherence => {
                "Rewrite the message so it sounds like your character: use their voice, values and typical concerns."
            }
            Self::SelfConsistency => {
                "Make the message consistent with what you said earlier; do not contradict your previous positions without acknowledging the change."
            }
            Self::Fluency => {
                "Make the message read naturally: fix grammar, remove repeated phrases and drop any formatting or meta-commentary."
            }
            Self::Suitability => {
                "Respond directly to what the others just said and keep the message on topic and appropriate for the situation."
            }
        }
    }

    /// Corrective rule used by the direct rewrite prompt.
    pub fn correction_rule(&self) -> &'static str {
        match self {
            Self::PersonaAdherence => "Match the persona's voice, vocabulary, values and attitudes.",
            Self::SelfConsistency => "Do not contradict anything the speaker said earlier in the conversation.",
            Self::Fluency => "Use natural, grammatical phrasing with no repetition, markup or meta-commentary.",
            Self::Suitability => "Address the most recent messages directly and stay on topic.",
        }
    }
}

impl std::fmt::Display for QualityDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-dimension gate settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DimensionConfig {
    pub enabled: bool,
    /// Minimum passing score on the 0-9 rubric.
    pub threshold: u8,
}

impl Default for DimensionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 7,
        }
    }
}

impl DimensionConfig {
    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            threshold: 7,
        }
    }

    pub const fn enabled_with(threshold: u8) -> Self {
        Self {
            enabled: true,
            threshold,
        }
    }
}

/// Similarity check settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    pub enabled: bool,
    /// Maximum Jaccard similarity allowed against recent messages.
    pub threshold: f64,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 0.6,
        }
    }
}

impl SimilarityConfig {
    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            threshold: 0.6,
        }
    }
}

/// Full gate configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub persona_adherence: DimensionConfig,
    pub self_consistency: DimensionConfig,
    pub fluency: DimensionConfig,
    pub suitability: DimensionConfig,
    pub similarity: SimilarityConfig,
}

impl GateConfig {
    /// A config with every check switched off.
    pub const fn disabled() -> Self {
        Self {
            persona_adherence: DimensionConfig::disabled(),
            self_consistency: DimensionConfig::disabled(),
            fluency: DimensionConfig::disabled(),
            suitability: DimensionConfig::disabled(),
            similarity: SimilarityConfig::disabled(),
        }
    }

    pub fn dimension(&self, dimension: QualityDimension) -> DimensionConfig {
        match dimension {
            QualityDimension::PersonaAdherence => self.persona_adherence,
            QualityDimension::SelfConsistency => self.self_consistency,
            QualityDimension::Fluency => self.fluency,
            QualityDimension::Suitability => self.suitability,
        }
    }

    pub fn with_dimension(mut self, dimension: QualityDimension, config: DimensionConfig) -> Self {
        match dimension {
            QualityDimension::PersonaAdherence => self.persona_adherence = config,
            QualityDimension::SelfConsistency => self.self_consistency = config,
            QualityDimension::Fluency => self.fluency = config,
            QualityDimension::Suitability => self.suitability = config,
        }
        self
    }

    pub fn with_similarity(mut self, similarity: SimilarityConfig) -> Self {
        self.similarity = similarity;
        self
    }

    /// Enabled dimensions in canonical order.
    pub fn enabled_dimensions(&self) -> Vec<(QualityDimension, u8)> {
        QualityDimension::ALL
            .iter()
            .filter_map(|d| {
                let cfg = self.dimension(*d);
                cfg.enabled.then_some((*d, cfg.threshold))
            })
            .collect()
    }

    /// True when the gate would not evaluate anything.
    pub fn is_noop(&self) -> bool {
        !self.similarity.enabled && self.enabled_dimensions().is_empty()
    }
}

/// Caller-supplied options for a gate evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateOptions {
    pub agent_name: Option<String>,
    pub persona: Option<String>,
    /// Candidates for the similarity check.
    pub recent_messages: Vec<String>,
}

impl GateOptions {
    pub fn with_agent_name(mut self, name: impl Into<String>) -> Self {
        self.agent_name = Some(name.into());
        self
    }

    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = Some(persona.into());
        self
    }

    pub fn with_recent_messages(mut self, messages: Vec<String>) -> Self {
        self.recent_messages = messages;
        self
    }
}

/// Score for one dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionResult {
    pub dimension: QualityDimension,
    pub score: u8,
    pub reasoning: String,
    pub passed: bool,
    pub threshold: u8,
}

/// Outcome of the similarity check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    /// Maximum Jaccard similarity over all candidates.
    pub score: f64,
    pub passed: bool,
    pub threshold: f64,
    pub most_similar_message: Option<String>,
}

/// Aggregate gate verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateResult {
    pub passed: bool,
    pub dimension_results: Vec<DimensionResult>,
    pub similarity_result: Option<SimilarityResult>,
    /// Sum of dimension scores, used to rank correction attempts.
    pub total_score: u32,
    pub token_usage: TokenUsage,
}

impl GateResult {
    /// Verdict returned when nothing is evaluated.
    pub fn trivial_pass() -> Self {
        Self {
            passed: true,
            dimension_results: Vec::new(),
            similarity_result: None,
            total_score: 0,
            token_usage: TokenUsage::zero(),
        }
    }

    pub fn failed_dimensions(&self) -> impl Iterator<Item = &DimensionResult> {
        self.dimension_results.iter().filter(|d| !d.passed)
    }

    pub fn similarity_score(&self) -> Option<f64> {
        self.similarity_result.as_ref().map(|s| s.score)
    }

    /// The similarity check, if it ran and failed.
    pub fn failed_similarity(&self) -> Option<&SimilarityResult> {
        self.similarity_result.as_ref().filter(|s| !s.passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_round_trip_names() {
        for dimension in QualityDimension::ALL {
            assert_eq!(QualityDimension::parse_str(dimension.as_str()), Some(dimension));
        }
        assert_eq!(QualityDimension::parse_str("charisma"), None);
    }

    #[test]
    fn test_persona_usage_per_dimension() {
        assert!(QualityDimension::PersonaAdherence.uses_persona());
        assert!(QualityDimension::Suitability.uses_persona());
        assert!(!QualityDimension::SelfConsistency.uses_persona());
        assert!(!QualityDimension::Fluency.uses_persona());
    }

    #[test]
    fn test_enabled_dimensions_and_noop() {
        let config = GateConfig::disabled();
        assert!(config.is_noop());

        let config = config.with_dimension(QualityDimension::Fluency, DimensionConfig::enabled_with(5));
        assert_eq!(config.enabled_dimensions(), vec![(QualityDimension::Fluency, 5)]);
        assert!(!config.is_noop());

        let similarity_only = GateConfig::disabled().with_similarity(SimilarityConfig::default());
        assert!(!similarity_only.is_noop());
    }

    #[test]
    fn test_gate_config_yaml_defaults() {
        let config: GateConfig = serde_yaml::from_str("fluency:\n  threshold: 4\n").expect("yaml");
        assert_eq!(config.fluency.threshold, 4);
        assert!(config.fluency.enabled);
        assert_eq!(config.persona_adherence, DimensionConfig::default());
        assert!((config.similarity.threshold - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn test_claim_mentions_agent() {
        assert!(QualityDimension::Fluency.claim("Mira").starts_with("Mira's"));
    }
}
