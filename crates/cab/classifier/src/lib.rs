//! CAB Classifier - blast-radius classification
//!
//! Maps a deployment's attributes to one of the closed set of blast-radius
//! classes through an explicit, ordered rule table. Manual overrides are
//! validated and always logged with both the automatic and proposed class.

#![deny(unsafe_code)]

mod rules;

pub use rules::{
    default_rules, matches_keyword_table, ClassificationRule, RuleCondition,
    ADMIN_SENSITIVE_CATEGORIES, CRITICAL_KEYWORDS, FINANCIAL_KEYWORDS, NON_CRITICAL_KEYWORDS,
    PRODUCTIVITY_CATEGORIES, PRODUCTIVITY_KEYWORDS,
};

use cab_types::{BlastRadiusClass, BusinessCriticality};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Attributes of a proposed deployment, as supplied by the pipeline.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeploymentAttributes {
    pub app_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub requires_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_user_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_criticality: Option<BusinessCriticality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cmdb: Option<CmdbAttributes>,
}

impl DeploymentAttributes {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            category: None,
            requires_admin: false,
            target_user_count: None,
            business_criticality: None,
            cmdb: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_admin(mut self) -> Self {
        self.requires_admin = true;
        self
    }

    pub fn with_user_count(mut self, count: u32) -> Self {
        self.target_user_count = Some(count);
        self
    }

    pub fn with_criticality(mut self, criticality: BusinessCriticality) -> Self {
        self.business_criticality = Some(criticality);
        self
    }

    pub fn with_cmdb(mut self, cmdb: CmdbAttributes) -> Self {
        self.cmdb = Some(cmdb);
        self
    }
}

/// CMDB attributes, when the app is registered there.
///
/// Values arrive as free-form strings from the CMDB sync; comparisons are
/// case-insensitive and unrecognized shapes fall through to rule-based
/// classification.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CmdbAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_tier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_criticality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact_scope: Option<String>,
}

/// Outcome of classification, with the rule that produced it for audit.
#[derive(Clone, Debug, Serialize)]
pub struct Classification {
    pub class: BlastRadiusClass,
    pub rule_id: &'static str,
    pub rationale: String,
}

/// Outcome of manual-override validation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OverrideValidation {
    pub valid: bool,
    pub auto_class: BlastRadiusClass,
    pub proposed_class: BlastRadiusClass,
    pub requires_justification: bool,
}

/// User-count floors feeding the rule table.
#[derive(Clone, Copy, Debug)]
pub struct ClassifierConfig {
    /// At or above this count a deployment is business critical (default 10 000).
    pub enterprise_user_floor: u32,
    /// At or above this count a deployment is at least a productivity tool
    /// (default 100).
    pub productivity_user_floor: u32,
    /// Financial keyword matches are reinforced at this count (default 1 000).
    pub financial_user_floor: u32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            enterprise_user_floor: 10_000,
            productivity_user_floor: 100,
            financial_user_floor: 1_000,
        }
    }
}

/// The blast-radius classifier.
pub struct BlastRadiusClassifier {
    rules: Vec<ClassificationRule>,
    config: ClassifierConfig,
}

impl BlastRadiusClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            rules: default_rules(
                config.enterprise_user_floor,
                config.productivity_user_floor,
            ),
            config,
        }
    }

    /// The ordered rule table, for inspection and rule-by-rule testing.
    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    /// Resolve the blast-radius class. Always returns a class; the fallback
    /// is NonCritical when no rule fires.
    pub fn classify(&self, attrs: &DeploymentAttributes) -> Classification {
        for rule in &self.rules {
            if self.condition_matches(rule.condition, attrs) {
                return Classification {
                    class: rule.class,
                    rule_id: rule.rule_id,
                    rationale: format!("{} ({})", rule.description, rule.rule_id),
                };
            }
        }
        Classification {
            class: BlastRadiusClass::NonCritical,
            rule_id: "default-non-critical",
            rationale: "no classification rule matched".to_string(),
        }
    }

    /// Evaluate a single rule condition. Public through `rules()` + this so
    /// each table entry can be unit-tested in isolation.
    pub fn condition_matches(
        &self,
        condition: RuleCondition,
        attrs: &DeploymentAttributes,
    ) -> bool {
        match condition {
            RuleCondition::CmdbCriticalTier => attrs
                .cmdb
                .as_ref()
                .and_then(|c| c.service_tier.as_deref())
                .map(|tier| {
                    let tier = tier.to_uppercase();
                    tier == "TIER0" || tier == "TIER1"
                })
                .unwrap_or(false),
            RuleCondition::CmdbEnterpriseHigh => attrs
                .cmdb
                .as_ref()
                .map(|c| {
                    cmdb_field_is(&c.business_criticality, "HIGH")
                        && cmdb_field_is(&c.impact_scope, "ENTERPRISE")
                })
                .unwrap_or(false),
            RuleCondition::CmdbDepartmentScope => attrs
                .cmdb
                .as_ref()
                .map(|c| {
                    cmdb_field_is(&c.impact_scope, "DEPARTMENT")
                        || cmdb_field_is(&c.impact_scope, "TEAM")
                })
                .unwrap_or(false),
            RuleCondition::CriticalKeyword => {
                matches_keyword_table(&attrs.app_name, CRITICAL_KEYWORDS)
            }
            RuleCondition::AdminSensitiveCategory => {
                attrs.requires_admin
                    && attrs
                        .category
                        .as_deref()
                        .map(|c| {
                            let c = c.to_lowercase();
                            ADMIN_SENSITIVE_CATEGORIES.contains(&c.as_str())
                        })
                        .unwrap_or(false)
            }
            RuleCondition::HighBusinessCriticality => {
                attrs.business_criticality == Some(BusinessCriticality::High)
            }
            RuleCondition::UserCountAtLeast(floor) => {
                attrs.target_user_count.map(|n| n >= floor).unwrap_or(false)
            }
            RuleCondition::FinancialKeyword => {
                matches_keyword_table(&attrs.app_name, FINANCIAL_KEYWORDS)
            }
            RuleCondition::ProductivityMatch { user_floor } => {
                let keyword = matches_keyword_table(&attrs.app_name, PRODUCTIVITY_KEYWORDS);
                let category = attrs
                    .category
                    .as_deref()
                    .map(|c| {
                        let c = c.to_lowercase();
                        PRODUCTIVITY_CATEGORIES.contains(&c.as_str())
                    })
                    .unwrap_or(false);
                let user_count = attrs
                    .target_user_count
                    .map(|n| n >= user_floor)
                    .unwrap_or(false);
                if !(keyword || category || user_count) {
                    return false;
                }
                // More specific match wins: a non-critical keyword below the
                // user floor demotes an otherwise-productivity app.
                let non_critical =
                    matches_keyword_table(&attrs.app_name, NON_CRITICAL_KEYWORDS);
                let below_floor = attrs
                    .target_user_count
                    .map(|n| n < user_floor)
                    .unwrap_or(true);
                !(non_critical && below_floor)
            }
        }
    }

    /// Validate a proposed manual override of the automatic classification.
    ///
    /// Valid when the proposal agrees with the automatic class, or a
    /// non-empty justification is supplied. Every attempt is logged with
    /// both classes regardless of validity.
    pub fn validate_manual_override(
        &self,
        attrs: &DeploymentAttributes,
        proposed_class: BlastRadiusClass,
        justification: Option<&str>,
    ) -> OverrideValidation {
        let auto = self.classify(attrs);
        let requires_justification = proposed_class != auto.class;
        let justified = justification
            .map(|j| !j.trim().is_empty())
            .unwrap_or(false);
        let valid = !requires_justification || justified;

        if valid {
            info!(
                app = %attrs.app_name,
                auto_class = %auto.class,
                proposed_class = %proposed_class,
                justified,
                "manual blast-radius override accepted"
            );
        } else {
            warn!(
                app = %attrs.app_name,
                auto_class = %auto.class,
                proposed_class = %proposed_class,
                "manual blast-radius override rejected: justification required"
            );
        }

        OverrideValidation {
            valid,
            auto_class: auto.class,
            proposed_class,
            requires_justification,
        }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }
}

impl Default for BlastRadiusClassifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}

fn cmdb_field_is(field: &Option<String>, expected: &str) -> bool {
    field
        .as_deref()
        .map(|value| value.eq_ignore_ascii_case(expected))
        .unwrap_or(false)
}
