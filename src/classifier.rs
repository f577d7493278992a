//! Indicator classification for chat messages
//!
//! Maps free text to the canonical name of a World Bank indicator using an
//! ordered list of substring rules. Evaluation is first-match-wins: the
//! position of a rule in the list is part of its behavior, not just its
//! triggers.

pub const ICT_GRADUATES: &str = "Female share of graduates in Information and Communication Technologies programmes, tertiary (%)";
pub const CHILDREN_OUT_OF_SCHOOL: &str = "Children out of school, primary, female";
pub const LITERACY_RATE: &str = "Literacy rate, adult total (% of people ages 15 and above)";
pub const TERTIARY_GRADUATION: &str = "Gross graduation ratio, tertiary, female (%)";
pub const STEM_GRADUATES: &str = "Female share of graduates from Science, Technology, Engineering and Mathematics (STEM) programmes, tertiary (%)";
pub const SCHOOL_GENDER_PARITY: &str =
    "School enrollment, primary and secondary (gross), gender parity index (GPI)";
pub const MATERNAL_MORTALITY: &str =
    "Maternal mortality ratio (modeled estimate, per 100,000 live births)";
pub const ADOLESCENT_MORTALITY: &str =
    "Mortality rate, adolescent female (per 1,000 female adolescents)";
pub const CONTRACEPTIVE_PREVALENCE: &str =
    "Contraceptive prevalence, any methods (% of women ages 15-49)";
pub const ADOLESCENT_FERTILITY: &str =
    "Adolescent fertility rate (births per 1,000 women ages 15-19)";
pub const LIFE_EXPECTANCY: &str = "Life expectancy at birth, female (years)";
/// Spelling used by the trailing ICT rule; differs from [`ICT_GRADUATES`] by one word.
pub const ICT_GRADUATES_ALT: &str = "Female share of graduates from Information and Communication Technologies programmes, tertiary (%)";

/// How a rule's triggers combine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// At least one trigger is a substring of the text
    Any,
    /// Every trigger is a substring of the text
    All,
}

/// One entry of the ordered rule set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRule {
    pub triggers: Vec<String>,
    pub mode: MatchMode,
    pub indicator: String,
}

impl ClassificationRule {
    pub fn any(triggers: &[&str], indicator: &str) -> Self {
        Self::new(triggers, MatchMode::Any, indicator)
    }

    pub fn all(triggers: &[&str], indicator: &str) -> Self {
        Self::new(triggers, MatchMode::All, indicator)
    }

    fn new(triggers: &[&str], mode: MatchMode, indicator: &str) -> Self {
        Self {
            triggers: triggers.iter().map(|t| t.to_lowercase()).collect(),
            mode,
            indicator: indicator.to_string(),
        }
    }

    /// Returns the trigger that satisfied the rule, if any.
    ///
    /// `lowered` must already be case-folded. For `All` rules the first
    /// trigger is reported.
    pub fn matched_trigger(&self, lowered: &str) -> Option<&str> {
        match self.mode {
            MatchMode::Any => self
                .triggers
                .iter()
                .find(|t| lowered.contains(t.as_str()))
                .map(String::as_str),
            MatchMode::All => {
                if !self.triggers.is_empty()
                    && self.triggers.iter().all(|t| lowered.contains(t.as_str()))
                {
                    self.triggers.first().map(String::as_str)
                } else {
                    None
                }
            }
        }
    }
}

/// The default rule set, in priority order.
///
/// Known classification bug: the ICT rule sits above the STEM rule and both
/// list "technology" and "engineering", so those words alone always classify
/// as ICT and the STEM indicator is reachable only through "stem" or
/// "science". The contraception rule's "birth control" trigger is shadowed by
/// the maternal rule's "birth", and the trailing ICT rule can never fire.
/// These outcomes are kept so existing clients see the same indicators.
pub fn default_rules() -> Vec<ClassificationRule> {
    vec![
        // education
        ClassificationRule::any(
            &[
                "tech",
                "ict",
                "computer science",
                "it field",
                "programming",
                "technology",
                "engineering",
            ],
            ICT_GRADUATES,
        ),
        ClassificationRule::any(&["dropout", "out of school"], CHILDREN_OUT_OF_SCHOOL),
        ClassificationRule::any(&["literacy", "read", "write"], LITERACY_RATE),
        ClassificationRule::any(&["college", "university", "graduate"], TERTIARY_GRADUATION),
        ClassificationRule::any(
            &["stem", "science", "technology", "engineering"],
            STEM_GRADUATES,
        ),
        ClassificationRule::any(&["gender parity", "equal"], SCHOOL_GENDER_PARITY),
        ClassificationRule::all(&["boys", "girls"], SCHOOL_GENDER_PARITY),
        // health
        ClassificationRule::any(&["health", "sick"], MATERNAL_MORTALITY),
        ClassificationRule::all(&["mortality", "adolescent"], ADOLESCENT_MORTALITY),
        ClassificationRule::any(&["maternal", "birth", "pregnancy"], MATERNAL_MORTALITY),
        ClassificationRule::any(
            &["contraception", "birth control"],
            CONTRACEPTIVE_PREVALENCE,
        ),
        ClassificationRule::any(&["fertility"], ADOLESCENT_FERTILITY),
        ClassificationRule::any(&["life expectancy", "live longer"], LIFE_EXPECTANCY),
        ClassificationRule::any(&["ict", "tech"], ICT_GRADUATES_ALT),
    ]
}

/// Result of a successful classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorMatch<'a> {
    pub indicator: &'a str,
    pub trigger: &'a str,
    pub rule_index: usize,
}

/// First-match-wins classifier over an explicit rule set
#[derive(Debug, Clone)]
pub struct IndicatorClassifier {
    rules: Vec<ClassificationRule>,
}

impl Default for IndicatorClassifier {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl IndicatorClassifier {
    pub fn new(rules: Vec<ClassificationRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    /// Canonical indicator for `text`, or `None` when no rule applies.
    pub fn classify(&self, text: &str) -> Option<&str> {
        self.classify_with_trigger(text).map(|m| m.indicator)
    }

    /// Like [`classify`](Self::classify) but also reports which rule and trigger fired.
    pub fn classify_with_trigger(&self, text: &str) -> Option<IndicatorMatch<'_>> {
        let lowered = text.to_lowercase();
        self.rules.iter().enumerate().find_map(|(rule_index, rule)| {
            rule.matched_trigger(&lowered).map(|trigger| IndicatorMatch {
                indicator: rule.indicator.as_str(),
                trigger,
                rule_index,
            })
        })
    }
}
