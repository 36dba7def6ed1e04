use crate::cli::EnforcementMode;
use crate::domain::models::PolicyDefinition;

/// Reference to a published package: what the policy service needs to fetch
/// and verify the content on each evaluated machine.
#[derive(Debug, Clone)]
pub struct PackageRef {
    pub name: String,
    pub version: String,
    pub content_uri: String,
    pub content_hash: String,
}

#[derive(Debug, Clone)]
pub struct DefinitionMetadata {
    pub display_name: String,
    pub description: String,
}

/// Translate a package reference plus display metadata into a policy
/// definition document. Pure and deterministic: same inputs, same document.
pub fn generate_definition(
    package: &PackageRef,
    meta: &DefinitionMetadata,
    mode: EnforcementMode,
) -> PolicyDefinition {
    let effect = match mode {
        EnforcementMode::Audit => "auditIfNotExists",
        EnforcementMode::ApplyAndAutoCorrect => "deployIfNotExists",
    };

    let policy_rule = serde_json::json!({
        "if": {
            "allOf": [
                { "field": "type", "equals": "Machine" }
            ]
        },
        "then": {
            "effect": effect,
            "details": {
                "type": "ConfigurationAssignment",
                "name": package.name,
                "version": package.version,
                "contentUri": package.content_uri,
                "contentHash": package.content_hash,
                "existenceCondition": {
                    "field": "complianceStatus",
                    "equals": "Compliant"
                }
            }
        }
    });

    PolicyDefinition {
        name: package.name.clone(),
        display_name: meta.display_name.clone(),
        description: meta.description.clone(),
        version: package.version.clone(),
        mode: "Indexed".to_string(),
        policy_rule,
        parameters: serde_json::json!({}),
    }
}

#[cfg(test)]
mod tests {
    use super::{generate_definition, DefinitionMetadata, PackageRef};
    use crate::cli::EnforcementMode;

    fn package() -> PackageRef {
        PackageRef {
            name: "svc-audit".to_string(),
            version: "1.0.0".to_string(),
            content_uri: "https://store.example/artifacts/svc-audit-1.0.0.tar.gz".to_string(),
            content_hash: "ab12".to_string(),
        }
    }

    fn meta() -> DefinitionMetadata {
        DefinitionMetadata {
            display_name: "Audit backup service account".to_string(),
            description: "Audits that svc-backup exists and is enabled".to_string(),
        }
    }

    #[test]
    fn embeds_content_reference_and_hash() {
        let def = generate_definition(&package(), &meta(), EnforcementMode::Audit);
        let details = &def.policy_rule["then"]["details"];
        assert_eq!(
            details["contentUri"],
            "https://store.example/artifacts/svc-audit-1.0.0.tar.gz"
        );
        assert_eq!(details["contentHash"], "ab12");
        assert_eq!(def.policy_rule["then"]["effect"], "auditIfNotExists");
    }

    #[test]
    fn enforcement_mode_selects_effect() {
        let def = generate_definition(&package(), &meta(), EnforcementMode::ApplyAndAutoCorrect);
        assert_eq!(def.policy_rule["then"]["effect"], "deployIfNotExists");
    }

    #[test]
    fn generation_is_deterministic() {
        let a = generate_definition(&package(), &meta(), EnforcementMode::Audit);
        let b = generate_definition(&package(), &meta(), EnforcementMode::Audit);
        assert_eq!(a, b);
    }
}
