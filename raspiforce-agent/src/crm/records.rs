//! Typed Salesforce records exchanged by the agent

use super::{soql_quote, SObject};
use serde::{Deserialize, Serialize};

/// Active demo configuration row (`Raspberry_Pi_Demo__c`)
#[derive(Debug, Clone, Deserialize)]
pub struct DemoConfiguration {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Username__c")]
    pub username: Option<String>,
    #[serde(rename = "Password__c")]
    pub password: Option<String>,
    #[serde(rename = "Security_Token__c")]
    pub security_token: Option<String>,
    #[serde(rename = "Case_Owner__c")]
    pub case_owner: Option<String>,
    #[serde(rename = "Case_Account_Id__c")]
    pub case_account_id: Option<String>,
    #[serde(rename = "Case_Contact_Id__c")]
    pub case_contact_id: Option<String>,
    #[serde(rename = "Case_Asset_Id__c")]
    pub case_asset_id: Option<String>,
    #[serde(rename = "Asset_Prefix__c")]
    pub asset_prefix: Option<String>,
    #[serde(rename = "Asset_Description__c")]
    pub asset_description: Option<String>,
    #[serde(rename = "Case_Status__c")]
    pub case_status: Option<String>,
    #[serde(rename = "Case_Type__c")]
    pub case_type: Option<String>,
    #[serde(rename = "Case_Subject__c")]
    pub case_subject: Option<String>,
    #[serde(rename = "Alarm_Threshold__c")]
    pub alarm_threshold: Option<f64>,
}

impl DemoConfiguration {
    /// Lookup of the active demo row for a host
    pub fn lookup_soql(hostname: &str) -> String {
        format!(
            "SELECT Id, Username__c, Password__c, Security_Token__c, Case_Owner__c, \
             Case_Account_Id__c, Case_Contact_Id__c, Case_Asset_Id__c, Asset_Prefix__c, \
             Case_Status__c, Case_Type__c, Case_Subject__c, Alarm_Threshold__c, \
             Asset_Description__c FROM Raspberry_Pi_Demo__c \
             WHERE Active__c = true AND Raspi_Hostname__c = {}",
            soql_quote(hostname)
        )
    }
}

/// Run registration event (`Raspberry_Pi_Demo_Registration__c`)
#[derive(Debug, Clone, Serialize)]
pub struct DemoRegistration {
    #[serde(rename = "Raspberry_Pi_Demo__c")]
    pub demo_id: String,
    #[serde(rename = "Status__c")]
    pub status: String,
}

impl DemoRegistration {
    pub fn connected(demo_id: &str) -> Self {
        Self {
            demo_id: demo_id.to_string(),
            status: "connected".to_string(),
        }
    }
}

impl SObject for DemoRegistration {
    const NAME: &'static str = "Raspberry_Pi_Demo_Registration__c";
}

/// Asset created for the simulated device
#[derive(Debug, Clone, Serialize)]
pub struct NewAsset {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "AccountId")]
    pub account_id: String,
    #[serde(rename = "ContactId")]
    pub contact_id: String,
    #[serde(rename = "Description")]
    pub description: Option<String>,
}

impl SObject for NewAsset {
    const NAME: &'static str = "Asset";
}

/// Name lookup of a pre-configured asset
#[derive(Debug, Clone, Deserialize)]
pub struct AssetName {
    #[serde(rename = "Name")]
    pub name: String,
}

impl AssetName {
    pub fn lookup_soql(asset_id: &str) -> String {
        format!("SELECT Name FROM Asset WHERE Id = {}", soql_quote(asset_id))
    }
}

/// Support case filed on alarm
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewCase {
    #[serde(rename = "Subject")]
    pub subject: Option<String>,
    #[serde(rename = "Status")]
    pub status: Option<String>,
    #[serde(rename = "OwnerId")]
    pub owner_id: String,
    #[serde(rename = "AccountId")]
    pub account_id: String,
    #[serde(rename = "ContactId")]
    pub contact_id: String,
    #[serde(rename = "AssetId")]
    pub asset_id: String,
    #[serde(rename = "Type")]
    pub case_type: Option<String>,
}

impl SObject for NewCase {
    const NAME: &'static str = "Case";
}
