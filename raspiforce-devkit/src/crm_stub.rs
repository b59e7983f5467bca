/*!
Mock CRM pour développement sans org Salesforce

Enregistre toutes les requêtes SOQL et toutes les créations, et répond aux
requêtes avec des lignes scriptées à l'avance.
*/

use parking_lot::Mutex;
use raspiforce_agent::crm::CrmBackend;
use raspiforce_agent::error::CrmError;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct CreatedRecord {
    pub sobject: String,
    pub id: String,
    pub fields: Value,
}

#[derive(Default)]
struct Inner {
    responses: Vec<(String, Vec<Value>)>,
    queries: Vec<String>,
    created: Vec<CreatedRecord>,
    failing: Vec<String>,
}

/// Mock CRM qui simule une org Salesforce
#[derive(Clone, Default)]
pub struct MockCrm {
    inner: Arc<Mutex<Inner>>,
}

impl MockCrm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Les requêtes contenant `pattern` renvoient `rows`
    pub fn respond(&self, pattern: &str, rows: Vec<Value>) -> &Self {
        self.inner.lock().responses.push((pattern.to_string(), rows));
        self
    }

    /// Toute création de `sobject` échoue
    pub fn fail_creates_of(&self, sobject: &str) -> &Self {
        self.inner.lock().failing.push(sobject.to_string());
        self
    }

    /// Requêtes reçues (pour assertions de tests)
    pub fn queries(&self) -> Vec<String> {
        self.inner.lock().queries.clone()
    }

    /// Enregistrements créés, dans l'ordre
    pub fn created(&self) -> Vec<CreatedRecord> {
        self.inner.lock().created.clone()
    }

    /// Enregistrements créés pour un type d'objet donné
    pub fn created_of(&self, sobject: &str) -> Vec<CreatedRecord> {
        self.inner
            .lock()
            .created
            .iter()
            .filter(|r| r.sobject == sobject)
            .cloned()
            .collect()
    }
}

impl CrmBackend for MockCrm {
    async fn query(&self, soql: &str) -> Result<Vec<Value>, CrmError> {
        let mut inner = self.inner.lock();
        inner.queries.push(soql.to_string());
        tracing::debug!("[MOCK] SOQL {}", soql);

        Ok(inner
            .responses
            .iter()
            .find(|(pattern, _)| soql.contains(pattern.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }

    async fn create(&self, sobject: &str, fields: Value) -> Result<String, CrmError> {
        let mut inner = self.inner.lock();
        if inner.failing.iter().any(|s| s == sobject) {
            return Err(CrmError::Api {
                status: 503,
                message: format!("{sobject} creation unavailable"),
            });
        }

        let id = format!("{}{:04}", id_prefix(sobject), inner.created.len() + 1);
        inner.created.push(CreatedRecord {
            sobject: sobject.to_string(),
            id: id.clone(),
            fields,
        });
        tracing::debug!("[MOCK] created {} {}", sobject, id);
        Ok(id)
    }
}

/// Préfixe d'identifiant à la Salesforce
fn id_prefix(sobject: &str) -> &'static str {
    match sobject {
        "Case" => "500",
        "Asset" => "02i",
        _ => "a01",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_scripted_query() {
        let crm = MockCrm::new();
        crm.respond("FROM Asset", vec![json!({"Name": "RPI-1"})]);

        let rows = crm.query("SELECT Name FROM Asset WHERE Id = '02i'").await.unwrap();
        assert_eq!(rows, vec![json!({"Name": "RPI-1"})]);
        assert!(crm.query("SELECT Id FROM Contact").await.unwrap().is_empty());
        assert_eq!(crm.queries().len(), 2);
    }

    #[tokio::test]
    async fn test_create_records_and_ids() {
        let crm = MockCrm::new();
        let case_id = crm.create("Case", json!({"Subject": "Hot"})).await.unwrap();
        let asset_id = crm.create("Asset", json!({"Name": "RPI"})).await.unwrap();

        assert_eq!(case_id, "5000001");
        assert_eq!(asset_id, "02i0002");
        assert_eq!(crm.created_of("Case").len(), 1);
        assert_eq!(crm.created()[1].fields["Name"], "RPI");
    }

    #[tokio::test]
    async fn test_failing_create() {
        let crm = MockCrm::new();
        crm.fail_creates_of("Case");
        assert!(matches!(
            crm.create("Case", json!({})).await,
            Err(CrmError::Api { status: 503, .. })
        ));
        assert!(crm.created().is_empty());
    }
}
