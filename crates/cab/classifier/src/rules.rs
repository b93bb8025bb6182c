//! The ordered classification rule table.
//!
//! Rules are typed predicates evaluated in a fixed sequence; the first match
//! wins. Keeping the table explicit makes each step testable on its own and
//! keeps the priority between steps visible instead of implicit.

use cab_types::BlastRadiusClass;
use serde::{Deserialize, Serialize};

/// Security, identity, and OS-kernel terms that always mean critical
/// infrastructure regardless of declared category.
pub const CRITICAL_KEYWORDS: &[&str] = &[
    "antivirus",
    "endpoint protection",
    "edr",
    "firewall",
    "vpn",
    "identity",
    "active directory",
    "authenticator",
    "certificate",
    "encryption",
    "kernel",
    "driver",
    "bios",
    "firmware",
    "hypervisor",
];

/// Financial / ERP / CRM systems.
pub const FINANCIAL_KEYWORDS: &[&str] = &[
    "erp",
    "sap",
    "oracle financials",
    "netsuite",
    "crm",
    "salesforce",
    "payroll",
    "billing",
    "general ledger",
    "treasury",
    "banking",
];

pub const PRODUCTIVITY_KEYWORDS: &[&str] = &[
    "office",
    "outlook",
    "slack",
    "teams",
    "zoom",
    "mail",
    "calendar",
    "browser",
    "chrome",
    "firefox",
    "sharepoint",
    "confluence",
];

pub const NON_CRITICAL_KEYWORDS: &[&str] = &[
    "screensaver",
    "wallpaper",
    "game",
    "media player",
    "font",
    "widget",
    "sticky notes",
    "clock",
];

/// Categories that, combined with admin rights, imply critical infrastructure.
pub const ADMIN_SENSITIVE_CATEGORIES: &[&str] = &["security", "os", "system"];

pub const PRODUCTIVITY_CATEGORIES: &[&str] = &["productivity", "collaboration", "communication"];

/// Typed predicate evaluated against the deployment attributes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleCondition {
    /// CMDB service tier is TIER0 or TIER1.
    CmdbCriticalTier,
    /// CMDB declares HIGH business criticality with ENTERPRISE impact scope.
    CmdbEnterpriseHigh,
    /// CMDB impact scope is DEPARTMENT or TEAM.
    CmdbDepartmentScope,
    /// App name matches the critical-infrastructure keyword table.
    CriticalKeyword,
    /// Admin rights required and category is security/os/system.
    AdminSensitiveCategory,
    /// Submitter declared HIGH business criticality.
    HighBusinessCriticality,
    /// Target user count at or above the given floor.
    UserCountAtLeast(u32),
    /// App name matches the financial/ERP/CRM keyword table.
    FinancialKeyword,
    /// Productivity keyword, category, or user-count match, unless the app
    /// also matches the non-critical table below the user floor (the more
    /// specific match wins).
    ProductivityMatch { user_floor: u32 },
}

/// One entry in the ordered rule table.
#[derive(Clone, Debug, Serialize)]
pub struct ClassificationRule {
    pub rule_id: &'static str,
    pub description: &'static str,
    pub condition: RuleCondition,
    pub class: BlastRadiusClass,
}

/// Build the default rule table for the given thresholds.
///
/// Order is load-bearing: CMDB rules take precedence over rule-based
/// classification, and critical rules over business rules.
pub fn default_rules(
    enterprise_user_floor: u32,
    productivity_user_floor: u32,
) -> Vec<ClassificationRule> {
    vec![
        ClassificationRule {
            rule_id: "cmdb-critical-tier",
            description: "CMDB service tier TIER0/TIER1",
            condition: RuleCondition::CmdbCriticalTier,
            class: BlastRadiusClass::CriticalInfrastructure,
        },
        ClassificationRule {
            rule_id: "cmdb-enterprise-high",
            description: "CMDB HIGH criticality with ENTERPRISE scope",
            condition: RuleCondition::CmdbEnterpriseHigh,
            class: BlastRadiusClass::BusinessCritical,
        },
        ClassificationRule {
            rule_id: "cmdb-department-scope",
            description: "CMDB DEPARTMENT/TEAM impact scope",
            condition: RuleCondition::CmdbDepartmentScope,
            class: BlastRadiusClass::ProductivityTools,
        },
        ClassificationRule {
            rule_id: "critical-keyword",
            description: "security/identity/OS-kernel keyword match",
            condition: RuleCondition::CriticalKeyword,
            class: BlastRadiusClass::CriticalInfrastructure,
        },
        ClassificationRule {
            rule_id: "admin-sensitive-category",
            description: "admin rights in a security/os/system category",
            condition: RuleCondition::AdminSensitiveCategory,
            class: BlastRadiusClass::CriticalInfrastructure,
        },
        ClassificationRule {
            rule_id: "declared-high-criticality",
            description: "submitter declared HIGH business criticality",
            condition: RuleCondition::HighBusinessCriticality,
            class: BlastRadiusClass::BusinessCritical,
        },
        ClassificationRule {
            rule_id: "enterprise-user-base",
            description: "enterprise-scale target user count",
            condition: RuleCondition::UserCountAtLeast(enterprise_user_floor),
            class: BlastRadiusClass::BusinessCritical,
        },
        ClassificationRule {
            rule_id: "financial-keyword",
            description: "financial/ERP/CRM keyword match",
            condition: RuleCondition::FinancialKeyword,
            class: BlastRadiusClass::BusinessCritical,
        },
        ClassificationRule {
            rule_id: "productivity-match",
            description: "productivity keyword, category, or user-count match",
            condition: RuleCondition::ProductivityMatch {
                user_floor: productivity_user_floor,
            },
            class: BlastRadiusClass::ProductivityTools,
        },
    ]
}

/// Case-insensitive containment against a keyword table.
pub fn matches_keyword_table(app_name: &str, table: &[&str]) -> bool {
    let lowered = app_name.to_lowercase();
    table.iter().any(|keyword| lowered.contains(keyword))
}
