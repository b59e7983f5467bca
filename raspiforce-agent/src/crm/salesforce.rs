//! Salesforce REST backend
//!
//! Login uses the OAuth 2.0 username-password flow; queries and record
//! creation go through the versioned REST data API.

use super::CrmBackend;
use crate::config::SalesforceConfig;
use crate::error::CrmError;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

/// Username/password/token triple for one org
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub security_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Authenticated session against one org
#[derive(Debug, Clone)]
pub struct SalesforceClient {
    http: reqwest::Client,
    instance_url: String,
    access_token: String,
    api_version: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    instance_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    done: bool,
    records: Vec<Value>,
    next_records_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    id: Option<String>,
    success: bool,
    #[serde(default)]
    errors: Vec<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiError {
    message: String,
    #[serde(default, alias = "statusCode")]
    error_code: Option<String>,
}

/// OAuth errors use a different body than the data API
#[derive(Debug, Deserialize)]
struct OAuthError {
    error: String,
    error_description: Option<String>,
}

impl SalesforceClient {
    /// Open a session with the given credentials
    pub async fn login(
        config: &SalesforceConfig,
        credentials: &Credentials,
    ) -> Result<Self, CrmError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("raspiforce-agent/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let url = format!(
            "{}/services/oauth2/token",
            config.login_url.trim_end_matches('/')
        );
        let password = format!("{}{}", credentials.password, credentials.security_token);
        let form = [
            ("grant_type", "password"),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("username", credentials.username.as_str()),
            ("password", password.as_str()),
        ];

        let response = http.post(&url).form(&form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OAuthError>(&body)
                .map(|e| match e.error_description {
                    Some(desc) => format!("{}: {}", e.error, desc),
                    None => e.error,
                })
                .unwrap_or(body);
            return Err(CrmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let token: TokenResponse = response.json().await?;
        info!(
            "Salesforce session opened for {} on {}",
            credentials.username, token.instance_url
        );

        Ok(Self {
            http,
            instance_url: token.instance_url.trim_end_matches('/').to_string(),
            access_token: token.access_token,
            api_version: config.api_version.clone(),
        })
    }

    fn data_url(&self, path: &str) -> String {
        format!(
            "{}/services/data/v{}/{}",
            self.instance_url, self.api_version, path
        )
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, CrmError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(CrmError::Api {
            status: status.as_u16(),
            message: api_error_message(&body),
        })
    }
}

impl CrmBackend for SalesforceClient {
    async fn query(&self, soql: &str) -> Result<Vec<Value>, CrmError> {
        debug!("SOQL: {}", soql);

        let response = self
            .http
            .get(self.data_url("query"))
            .bearer_auth(&self.access_token)
            .query(&[("q", soql)])
            .send()
            .await?;
        let mut page: QueryResponse = Self::check(response).await?.json().await?;
        let mut records = std::mem::take(&mut page.records);

        while !page.done {
            let Some(next) = page.next_records_url.take() else {
                break;
            };
            let response = self
                .http
                .get(format!("{}{}", self.instance_url, next))
                .bearer_auth(&self.access_token)
                .send()
                .await?;
            page = Self::check(response).await?.json().await?;
            records.append(&mut page.records);
        }

        Ok(records)
    }

    async fn create(&self, sobject: &str, fields: Value) -> Result<String, CrmError> {
        debug!("Creating {} record", sobject);

        let response = self
            .http
            .post(self.data_url(&format!("sobjects/{sobject}/")))
            .bearer_auth(&self.access_token)
            .json(&fields)
            .send()
            .await?;
        let created: CreateResponse = Self::check(response).await?.json().await?;

        match created.id {
            Some(id) if created.success => Ok(id),
            _ => Err(CrmError::Rejected {
                sobject: sobject.to_string(),
                message: created
                    .errors
                    .first()
                    .map(|e| e.message.clone())
                    .unwrap_or_else(|| "no id returned".to_string()),
            }),
        }
    }
}

/// First message of a data API error array, or the raw body
fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<Vec<ApiError>>(body) {
        Ok(errors) => match errors.into_iter().next() {
            Some(ApiError {
                message,
                error_code: Some(code),
            }) => format!("{code}: {message}"),
            Some(ApiError { message, .. }) => message,
            None => body.to_string(),
        },
        Err(_) => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_message() {
        let body = r#"[{"message":"Required fields are missing: [Name]","errorCode":"REQUIRED_FIELD_MISSING","fields":["Name"]}]"#;
        assert_eq!(
            api_error_message(body),
            "REQUIRED_FIELD_MISSING: Required fields are missing: [Name]"
        );
        assert_eq!(api_error_message("Service Unavailable"), "Service Unavailable");
        assert_eq!(api_error_message("[]"), "[]");
    }

    #[test]
    fn test_query_response_decoding() {
        let body = r#"{"totalSize":1,"done":false,"nextRecordsUrl":"/services/data/v59.0/query/01g-2000","records":[{"Name":"RPI-1"}]}"#;
        let page: QueryResponse = serde_json::from_str(body).unwrap();
        assert!(!page.done);
        assert_eq!(page.records.len(), 1);
        assert_eq!(
            page.next_records_url.as_deref(),
            Some("/services/data/v59.0/query/01g-2000")
        );
    }

    #[test]
    fn test_create_response_decoding() {
        let ok: CreateResponse =
            serde_json::from_str(r#"{"id":"500xx","success":true,"errors":[]}"#).unwrap();
        assert_eq!(ok.id.as_deref(), Some("500xx"));
        assert!(ok.success);
    }

    mod http {
        use super::*;
        use mockito::{Matcher, Server, ServerGuard};
        use serde_json::json;

        fn config(server: &ServerGuard) -> SalesforceConfig {
            SalesforceConfig {
                login_url: server.url(),
                api_version: "59.0".to_string(),
                client_id: "cid".to_string(),
                client_secret: "csecret".to_string(),
                username: "setup@example.com".to_string(),
                password: None,
                security_token: String::new(),
                use_keyring: false,
            }
        }

        fn credentials() -> Credentials {
            Credentials {
                username: "demo@example.com".to_string(),
                password: "pw".to_string(),
                security_token: "tok".to_string(),
            }
        }

        async fn logged_in(server: &mut ServerGuard) -> SalesforceClient {
            let body = json!({
                "access_token": "00Dxx!token",
                "instance_url": server.url(),
            });
            server
                .mock("POST", "/services/oauth2/token")
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(body.to_string())
                .create_async()
                .await;
            SalesforceClient::login(&config(server), &credentials())
                .await
                .unwrap()
        }

        #[tokio::test]
        async fn test_login_posts_password_grant() {
            let mut server = Server::new_async().await;
            let body = json!({
                "access_token": "00Dxx!token",
                "instance_url": format!("{}/", server.url()),
            });
            let token = server
                .mock("POST", "/services/oauth2/token")
                .match_body(Matcher::AllOf(vec![
                    Matcher::UrlEncoded("grant_type".into(), "password".into()),
                    Matcher::UrlEncoded("client_id".into(), "cid".into()),
                    Matcher::UrlEncoded("username".into(), "demo@example.com".into()),
                    Matcher::UrlEncoded("password".into(), "pwtok".into()),
                ]))
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(body.to_string())
                .create_async()
                .await;

            let client = SalesforceClient::login(&config(&server), &credentials())
                .await
                .unwrap();

            token.assert_async().await;
            assert_eq!(client.instance_url, server.url());
            assert_eq!(
                client.data_url("query"),
                format!("{}/services/data/v59.0/query", server.url())
            );
        }

        #[tokio::test]
        async fn test_login_failure_maps_oauth_error() {
            let mut server = Server::new_async().await;
            server
                .mock("POST", "/services/oauth2/token")
                .with_status(400)
                .with_body(r#"{"error":"invalid_grant","error_description":"authentication failure"}"#)
                .create_async()
                .await;

            match SalesforceClient::login(&config(&server), &credentials()).await {
                Err(CrmError::Api { status, message }) => {
                    assert_eq!(status, 400);
                    assert_eq!(message, "invalid_grant: authentication failure");
                }
                other => panic!("unexpected: {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_query_follows_next_records_url() {
            let mut server = Server::new_async().await;
            let client = logged_in(&mut server).await;
            let soql = "SELECT Name FROM Asset";

            let first = server
                .mock("GET", Matcher::Regex(r"^/services/data/v59\.0/query(\?.*)?$".into()))
                .match_query(Matcher::UrlEncoded("q".into(), soql.into()))
                .match_header("authorization", "Bearer 00Dxx!token")
                .with_status(200)
                .with_body(
                    json!({
                        "totalSize": 3,
                        "done": false,
                        "nextRecordsUrl": "/services/data/v59.0/query/01g-2000",
                        "records": [{"Name": "RPI-1"}, {"Name": "RPI-2"}]
                    })
                    .to_string(),
                )
                .create_async()
                .await;
            let second = server
                .mock("GET", "/services/data/v59.0/query/01g-2000")
                .with_status(200)
                .with_body(
                    json!({
                        "totalSize": 3,
                        "done": true,
                        "records": [{"Name": "RPI-3"}]
                    })
                    .to_string(),
                )
                .create_async()
                .await;

            let rows = client.query(soql).await.unwrap();

            first.assert_async().await;
            second.assert_async().await;
            let names: Vec<_> = rows.iter().map(|r| r["Name"].as_str().unwrap()).collect();
            assert_eq!(names, ["RPI-1", "RPI-2", "RPI-3"]);
        }

        #[tokio::test]
        async fn test_query_error_status_is_api_error() {
            let mut server = Server::new_async().await;
            let client = logged_in(&mut server).await;
            server
                .mock("GET", Matcher::Regex(r"^/services/data/v59\.0/query".into()))
                .with_status(400)
                .with_body(r#"[{"message":"unexpected token: FORM","errorCode":"MALFORMED_QUERY"}]"#)
                .create_async()
                .await;

            match client.query("SELECT Id FORM Case").await {
                Err(CrmError::Api { status, message }) => {
                    assert_eq!(status, 400);
                    assert_eq!(message, "MALFORMED_QUERY: unexpected token: FORM");
                }
                other => panic!("unexpected: {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_create_returns_new_id() {
            let mut server = Server::new_async().await;
            let client = logged_in(&mut server).await;
            let create = server
                .mock("POST", "/services/data/v59.0/sobjects/Case/")
                .match_body(Matcher::PartialJson(json!({"Subject": "Temperature alarm"})))
                .with_status(201)
                .with_body(r#"{"id":"5005g00000AbCdE","success":true,"errors":[]}"#)
                .create_async()
                .await;

            let id = client
                .create("Case", json!({"Subject": "Temperature alarm", "Status": "New"}))
                .await
                .unwrap();

            create.assert_async().await;
            assert_eq!(id, "5005g00000AbCdE");
        }

        #[tokio::test]
        async fn test_create_rejected_without_success() {
            let mut server = Server::new_async().await;
            let client = logged_in(&mut server).await;
            server
                .mock("POST", "/services/data/v59.0/sobjects/Asset/")
                .with_status(201)
                .with_body(
                    r#"{"id":null,"success":false,"errors":[{"message":"Account does not exist","statusCode":"INVALID_CROSS_REFERENCE_KEY"}]}"#,
                )
                .create_async()
                .await;

            match client.create("Asset", json!({"Name": "RPI"})).await {
                Err(CrmError::Rejected { sobject, message }) => {
                    assert_eq!(sobject, "Asset");
                    assert_eq!(message, "Account does not exist");
                }
                other => panic!("unexpected: {other:?}"),
            }
        }
    }

    #[test]
    fn test_credentials_debug_hides_secrets() {
        let creds = Credentials {
            username: "demo@example.com".into(),
            password: "hunter2".into(),
            security_token: "tok".into(),
        };
        let printed = format!("{creds:?}");
        assert!(printed.contains("demo@example.com"));
        assert!(!printed.contains("hunter2"));
    }
}
