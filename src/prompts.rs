//! Guidance templates and prompt composition
//!
//! Each [`Topic`] owns exactly one guidance template with a single `{query}`
//! slot. When trend data is available the guidance is wrapped with an
//! indicator/country/trend block before it is sent to the model.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Write as _;

use crate::trend::Trend;

/// Placeholder replaced by the user's query
pub const QUERY_SLOT: &str = "{query}";

const HEALTH_TEMPLATE: &str = "
You are a compassionate and knowledgeable mental wellness assistant for women, specializing in emotional and mental health. Please follow these guidelines when responding:

1. Always be empathetic, calm, and respectful in your tone.
2. Provide supportive and science-backed insights for emotional well-being, stress, anxiety, or lifestyle struggles.
3. Avoid giving any medical diagnoses or prescribing treatments.
4. Encourage users to seek help from mental health professionals when necessary.
5. Reassure without judgment; normalize emotions like burnout or overwhelm.
6. Keep responses concise, soothing, and actionable.

User's concern: {query}
";

const CAREER_TEMPLATE: &str = "
You are a compassionate and knowledgeable mental wellness assistant for women, focused on career-related support. Please follow these guidelines when responding:

1. Always be empathetic, calm, and respectful in your tone.
2. Offer thoughtful encouragement and career advice to help women navigate confusion, imposter syndrome, or work-life balance.
3. Avoid prescriptive actions like telling users exactly what job to take.
4. Help them build confidence and clarity around their professional goals.
5. Celebrate small wins, and encourage them to take agency in their career journey.
6. Keep responses concise, optimistic, and empowering.

User's concern: {query}
";

const EDUCATION_TEMPLATE: &str = "
You are a compassionate and knowledgeable mental wellness assistant for women, focusing on education and personal growth. Please follow these guidelines when responding:

1. Always be empathetic, calm, and respectful in your tone.
2. Provide encouragement and advice to help users overcome doubts, fears, or barriers in pursuing education or learning.
3. Avoid assuming user capability or pushing specific academic paths.
4. Uplift their confidence, remind them it's never too late to learn, and offer small first steps they can take.
5. Address emotional blocks like shame, anxiety, or family pressure with understanding.
6. Keep responses concise, motivating, and reassuring.

User's concern: {query}
";

/// Neutral template used for `general` and anything without a dedicated topic
pub const GENERAL_TEMPLATE: &str = "
You are a compassionate and knowledgeable mental wellness assistant for women. Please follow these guidelines when responding:

1. Always be empathetic, calm, and respectful in your tone.
2. Offer supportive, practical, and non-judgmental guidance.
3. Avoid medical diagnoses, legal rulings, or prescriptive instructions.
4. Encourage users to reach out to qualified professionals when appropriate.
5. Keep responses concise, warm, and actionable.

User's concern: {query}
";

/// Support domain selected by a message's command prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Health,
    Career,
    Education,
    General,
}

impl Topic {
    pub const ALL: [Topic; 4] = [Topic::Health, Topic::Career, Topic::Education, Topic::General];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Health => "health",
            Topic::Career => "career",
            Topic::Education => "education",
            Topic::General => "general",
        }
    }

    /// Lenient lookup; unknown names fall back to `General`.
    pub fn from_name(name: &str) -> Topic {
        match name.trim().to_ascii_lowercase().as_str() {
            "health" => Topic::Health,
            "career" => Topic::Career,
            "education" => Topic::Education,
            _ => Topic::General,
        }
    }

    pub fn template(&self) -> &'static str {
        match self {
            Topic::Health => HEALTH_TEMPLATE,
            Topic::Career => CAREER_TEMPLATE,
            Topic::Education => EDUCATION_TEMPLATE,
            Topic::General => GENERAL_TEMPLATE,
        }
    }

    /// File name of the topic's dataset inside the data directory
    pub fn dataset_file_name(&self) -> String {
        format!("{}.csv", self.as_str())
    }

    fn command_prefix(&self) -> Option<&'static str> {
        match self {
            Topic::Health => Some("/health "),
            Topic::Career => Some("/career "),
            Topic::Education => Some("/education "),
            Topic::General => None,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Split `/topic query` into its parts. Messages without a known command
/// prefix are `General` with the whole message as the query.
pub fn split_topic_and_query(message: &str) -> (Topic, &str) {
    for topic in Topic::ALL {
        if let Some(prefix) = topic.command_prefix()
            && let Some(query) = message.strip_prefix(prefix)
        {
            return (topic, query);
        }
    }
    (Topic::General, message)
}

/// Render the topic's template with `query` inserted verbatim.
pub fn compose_guidance(topic: Topic, query: &str) -> String {
    topic.template().replacen(QUERY_SLOT, query, 1)
}

/// Same as [`compose_guidance`] but for a topic given by name.
pub fn compose_guidance_for(topic_name: &str, query: &str) -> String {
    compose_guidance(Topic::from_name(topic_name), query)
}

/// One `year: value` line per observation, ascending by year, one decimal.
pub fn format_trend(trend: &Trend) -> String {
    let mut out = String::new();
    for (year, value) in trend.sorted_points() {
        let _ = writeln!(out, "{}: {:.1}", year, value);
    }
    out
}

/// Wrap `base_guidance` with the indicator, country and trend block.
///
/// An empty trend returns the guidance unchanged. Inputs are written through
/// `{}` arguments only, so `%` or brace characters in the indicator name are
/// emitted as-is.
pub fn compose_enriched_prompt(
    base_guidance: &str,
    country: &str,
    indicator_name: &str,
    trend: &Trend,
) -> String {
    if trend.is_empty() {
        return base_guidance.to_string();
    }
    format!(
        "\n{}\n\nUse the following indicator to provide a response:\nIndicator: {}\n\nData for {}:\n\nTrend: {}\n\nBased on the indicator and trend, generate a helpful and empathetic response including stats and data insights that we are passing as Trend.\n",
        base_guidance,
        indicator_name,
        country,
        format_trend(trend)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trend() -> Trend {
        let mut trend = Trend::default();
        trend.insert("2019", 12.3);
        trend.insert("2018", 9.75);
        trend
    }

    #[test]
    fn test_split_topic_prefixes() {
        assert_eq!(
            split_topic_and_query("/health I feel tired"),
            (Topic::Health, "I feel tired")
        );
        assert_eq!(
            split_topic_and_query("/education can I go back to school"),
            (Topic::Education, "can I go back to school")
        );
        assert_eq!(split_topic_and_query("/career"), (Topic::General, "/career"));
        assert_eq!(
            split_topic_and_query("/unknown hello"),
            (Topic::General, "/unknown hello")
        );
    }

    #[test]
    fn test_guidance_inserts_query_verbatim() {
        let text = compose_guidance(Topic::Career, "100% stuck {query} %s");
        assert!(text.contains("User's concern: 100% stuck {query} %s\n"));
        assert!(text.contains("focused on career-related support"));
        assert!(!text.contains("User's concern: {query}"));
    }

    #[test]
    fn test_unknown_topic_name_uses_general_template() {
        let text = compose_guidance_for("astrology", "hello");
        assert_eq!(text, GENERAL_TEMPLATE.replace(QUERY_SLOT, "hello"));
    }

    #[test]
    fn test_empty_trend_passes_guidance_through() {
        let base = compose_guidance(Topic::Health, "stress");
        let out = compose_enriched_prompt(&base, "India", "Some indicator", &Trend::default());
        assert_eq!(out, base);
    }

    #[test]
    fn test_trend_block_sorted_with_one_decimal() {
        let formatted = format_trend(&sample_trend());
        assert_eq!(formatted, "2018: 9.8\n2019: 12.3\n");

        let out = compose_enriched_prompt("guidance", "India", "Literacy", &sample_trend());
        let first = out.find("2018: 9.8").unwrap();
        let second = out.find("2019: 12.3").unwrap();
        assert!(first < second);
        assert!(out.starts_with("\nguidance\n"));
        assert!(out.contains("Indicator: Literacy\n"));
        assert!(out.contains("Data for India:\n"));
        assert!(out.trim_end().ends_with("that we are passing as Trend."));
    }

    #[test]
    fn test_percent_in_indicator_is_verbatim() {
        let indicator = "Gross graduation ratio, tertiary, female (%)";
        let out = compose_enriched_prompt("g", "Kenya", indicator, &sample_trend());
        assert!(out.contains("Indicator: Gross graduation ratio, tertiary, female (%)\n"));
        assert!(!out.contains("%%"));
    }

    #[test]
    fn test_composition_is_deterministic() {
        let a = compose_enriched_prompt("g", "Peru", "X", &sample_trend());
        let b = compose_enriched_prompt("g", "Peru", "X", &sample_trend());
        assert_eq!(a, b);
    }
}
