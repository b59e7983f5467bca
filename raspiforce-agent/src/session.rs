//! Session bootstrap: demo configuration lookup and asset resolution

use crate::crm::{
    AssetName, CrmBackend, Credentials, DemoConfiguration, DemoRegistration, NewAsset, NewCase,
};
use crate::error::{AgentError, Result};
use chrono::Local;
use tracing::{info, warn};

/// Threshold used when the demo row leaves `Alarm_Threshold__c` empty
pub const DEFAULT_ALARM_THRESHOLD: f64 = 25.0;

/// Parameters fetched once from the active demo row
#[derive(Debug, Clone)]
pub struct SessionParams {
    pub demo_id: String,
    pub demo_credentials: Credentials,
    pub owner_id: String,
    pub account_id: String,
    pub contact_id: String,
    pub asset_id: Option<String>,
    pub asset_prefix: String,
    pub asset_description: Option<String>,
    pub case_subject: Option<String>,
    pub case_status: Option<String>,
    pub case_type: Option<String>,
    pub alarm_threshold: f64,
}

impl From<DemoConfiguration> for SessionParams {
    fn from(row: DemoConfiguration) -> Self {
        let owner_id = row.case_owner.unwrap_or_else(|| {
            warn!("OwnerId is empty");
            String::new()
        });
        let account_id = row.case_account_id.unwrap_or_else(|| {
            warn!("AccountId is empty");
            String::new()
        });
        let contact_id = row.case_contact_id.unwrap_or_else(|| {
            warn!("ContactId is empty");
            String::new()
        });

        Self {
            demo_id: row.id,
            demo_credentials: Credentials {
                username: row.username.unwrap_or_default(),
                password: row.password.unwrap_or_default(),
                security_token: row.security_token.unwrap_or_default(),
            },
            owner_id,
            account_id,
            contact_id,
            asset_id: row.case_asset_id.filter(|id| !id.is_empty()),
            asset_prefix: row.asset_prefix.unwrap_or_default(),
            asset_description: row.asset_description,
            case_subject: row.case_subject,
            case_status: row.case_status,
            case_type: row.case_type,
            alarm_threshold: row.alarm_threshold.unwrap_or(DEFAULT_ALARM_THRESHOLD),
        }
    }
}

impl SessionParams {
    /// Look up the active demo row for `hostname` and register this run
    pub async fn bootstrap<C: CrmBackend>(crm: &C, hostname: &str) -> Result<Self> {
        info!("Looking up active demo configuration for {}", hostname);

        let row = crm
            .query_as::<DemoConfiguration>(&DemoConfiguration::lookup_soql(hostname))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::NoActiveDemo {
                hostname: hostname.to_string(),
            })?;

        crm.insert(&DemoRegistration::connected(&row.id)).await?;
        info!("Registered demo run for {}", row.id);

        Ok(row.into())
    }

    /// Case record for the resolved asset
    pub fn new_case(&self, asset: &Asset) -> NewCase {
        NewCase {
            subject: self.case_subject.clone(),
            status: self.case_status.clone(),
            owner_id: self.owner_id.clone(),
            account_id: self.account_id.clone(),
            contact_id: self.contact_id.clone(),
            asset_id: asset.id.clone(),
            case_type: self.case_type.clone(),
        }
    }

    fn new_asset(&self, name: String) -> NewAsset {
        NewAsset {
            name,
            account_id: self.account_id.clone(),
            contact_id: self.contact_id.clone(),
            description: self.asset_description.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetOrigin {
    Found,
    Created,
}

/// The CRM asset representing this device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub id: String,
    pub name: String,
    pub origin: AssetOrigin,
}

/// Name for a newly created asset: `<prefix>-<YYYYMMDD_HHMMSS>`
pub fn asset_name(prefix: &str) -> String {
    format!("{}-{}", prefix, Local::now().format("%Y%m%d_%H%M%S"))
}

/// Look up the configured asset, or create one when none is configured
pub async fn resolve_asset<C: CrmBackend>(crm: &C, session: &SessionParams) -> Result<Asset> {
    match &session.asset_id {
        Some(id) => {
            let found = crm
                .query_as::<AssetName>(&AssetName::lookup_soql(id))
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| AgentError::AssetNotFound { id: id.clone() })?;
            info!("Asset found: {} ({})", found.name, id);
            Ok(Asset {
                id: id.clone(),
                name: found.name,
                origin: AssetOrigin::Found,
            })
        }
        None => {
            let name = asset_name(&session.asset_prefix);
            let id = crm.insert(&session.new_asset(name.clone())).await?;
            info!("Asset created: {} ({})", name, id);
            Ok(Asset {
                id,
                name,
                origin: AssetOrigin::Created,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(extra: serde_json::Value) -> DemoConfiguration {
        let mut base = json!({
            "Id": "a00",
            "Username__c": "demo@example.com",
            "Password__c": "pw",
            "Security_Token__c": "tok",
            "Asset_Prefix__c": "RPI",
            "Case_Subject__c": "Temperature alarm"
        });
        if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        serde_json::from_value(base).unwrap()
    }

    #[test]
    fn test_null_ids_become_empty_strings() {
        let params = SessionParams::from(row(json!({})));
        assert_eq!(params.owner_id, "");
        assert_eq!(params.account_id, "");
        assert_eq!(params.contact_id, "");
    }

    #[test]
    fn test_threshold_default() {
        let params = SessionParams::from(row(json!({ "Alarm_Threshold__c": null })));
        assert_eq!(params.alarm_threshold, 25.0);

        let params = SessionParams::from(row(json!({ "Alarm_Threshold__c": 30.5 })));
        assert_eq!(params.alarm_threshold, 30.5);
    }

    #[test]
    fn test_demo_credentials_taken_from_row() {
        let params = SessionParams::from(row(json!({})));
        assert_eq!(params.demo_credentials.username, "demo@example.com");
        assert_eq!(params.demo_credentials.security_token, "tok");
    }

    #[test]
    fn test_case_references_session_and_asset() {
        let params = SessionParams::from(row(json!({
            "Case_Owner__c": "005",
            "Case_Status__c": "New",
            "Case_Type__c": "Problem"
        })));
        let asset = Asset {
            id: "02i".into(),
            name: "RPI-1".into(),
            origin: AssetOrigin::Found,
        };
        let case = params.new_case(&asset);
        assert_eq!(case.owner_id, "005");
        assert_eq!(case.asset_id, "02i");
        assert_eq!(case.subject.as_deref(), Some("Temperature alarm"));
        assert_eq!(case.case_type.as_deref(), Some("Problem"));
    }

    #[test]
    fn test_asset_name_format() {
        let name = asset_name("RPI");
        let (prefix, stamp) = name.split_once('-').unwrap();
        assert_eq!(prefix, "RPI");
        assert_eq!(stamp.len(), "20261018_120000".len());
        assert_eq!(stamp.as_bytes()[8], b'_');
    }
}
