//! CRM backend interface
//!
//! The agent only needs two primitives from the CRM: a SOQL query returning
//! raw rows and a record creation returning the new record id. Typed records
//! (see [`records`]) are layered on top through the provided methods.

pub mod records;
pub mod salesforce;

use crate::error::CrmError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

pub use records::{AssetName, DemoConfiguration, DemoRegistration, NewAsset, NewCase};
pub use salesforce::{Credentials, SalesforceClient};

/// A record type that can be created through [`CrmBackend::insert`]
pub trait SObject: Serialize {
    /// API name of the object, e.g. `Case`
    const NAME: &'static str;
}

/// Query/create access to a CRM org
#[allow(async_fn_in_trait)]
pub trait CrmBackend {
    /// Run a SOQL query and return every matching row
    async fn query(&self, soql: &str) -> Result<Vec<Value>, CrmError>;

    /// Create a record of `sobject` type and return its id
    async fn create(&self, sobject: &str, fields: Value) -> Result<String, CrmError>;

    /// Query and decode rows into `T`
    async fn query_as<T: DeserializeOwned>(&self, soql: &str) -> Result<Vec<T>, CrmError> {
        self.query(soql)
            .await?
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(CrmError::from))
            .collect()
    }

    /// Create a typed record
    async fn insert<R: SObject>(&self, record: &R) -> Result<String, CrmError> {
        let fields = serde_json::to_value(record)?;
        self.create(R::NAME, fields).await
    }
}

/// Quote a value as a SOQL string literal
pub fn soql_quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}
