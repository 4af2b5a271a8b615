//! External collaborators of the upload pipeline: the token service handing
//! out upload credentials and the registration service recording stored
//! objects.

use anyhow::{Context, Result};
use async_trait::async_trait;
use pixelframe_core::{MediaKind, RegistrationServiceConfig, ServicesConfig, UploadError};
use pixelframe_storage::UploadCredentials;
use reqwest::{Client, Response};
use serde_json::{Map, Value as JsonValue};

/// Fallback message when a service fails without saying why.
pub const DEFAULT_SERVICE_ERROR: &str = "Network response was not ok.";

/// Issues short-lived credentials for one storage upload.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn fetch_credentials(&self) -> Result<UploadCredentials, UploadError>;
}

/// Records a stored object and returns the service's opaque result.
#[async_trait]
pub trait AssetRegistrar: Send + Sync {
    async fn register(&self, kind: MediaKind, location: &str) -> Result<JsonValue, UploadError>;
}

fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    }
}

/// Split a service reply into its payload and its `error` field.
///
/// Services report failure in-band: a truthy `error` field means the call
/// failed, whatever the HTTP status. The message is `error.message` when
/// present, the error itself when it is a string, and
/// [`DEFAULT_SERVICE_ERROR`] otherwise.
pub fn split_service_error(
    mut body: Map<String, JsonValue>,
) -> Result<Map<String, JsonValue>, String> {
    match body.remove("error") {
        Some(error) if is_truthy(&error) => {
            let message = match &error {
                JsonValue::Object(obj) => obj
                    .get("message")
                    .and_then(JsonValue::as_str)
                    .filter(|m| !m.is_empty())
                    .map(str::to_string),
                JsonValue::String(s) => Some(s.clone()),
                _ => None,
            };
            Err(message.unwrap_or_else(|| DEFAULT_SERVICE_ERROR.to_string()))
        }
        _ => Ok(body),
    }
}

/// HTTP client for the token and registration services.
#[derive(Clone, Debug)]
pub struct HttpServiceClient {
    client: Client,
    token_url: String,
    registration: RegistrationServiceConfig,
}

impl HttpServiceClient {
    pub fn new(config: &ServicesConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            token_url: config.token.url.clone(),
            registration: config.upload.clone(),
        })
    }

    /// Read a JSON object reply and apply the in-band error convention.
    async fn read_reply(response: Response) -> Result<Map<String, JsonValue>, String> {
        let status = response.status();
        let body = response.json::<Map<String, JsonValue>>().await;

        match body {
            Ok(body) => {
                let payload = split_service_error(body)?;
                if !status.is_success() {
                    return Err(DEFAULT_SERVICE_ERROR.to_string());
                }
                Ok(payload)
            }
            Err(e) => {
                tracing::debug!(status = %status, error = %e, "Service reply is not a JSON object");
                Err(DEFAULT_SERVICE_ERROR.to_string())
            }
        }
    }
}

#[async_trait]
impl CredentialProvider for HttpServiceClient {
    async fn fetch_credentials(&self) -> Result<UploadCredentials, UploadError> {
        let response = self
            .client
            .get(&self.token_url)
            .header("content-type", "application/json")
            .send()
            .await
            .map_err(|e| UploadError::Credential(e.to_string()))?;

        let body = Self::read_reply(response)
            .await
            .map_err(UploadError::Credential)?;

        serde_json::from_value(JsonValue::Object(body))
            .map_err(|e| UploadError::Credential(format!("Invalid upload credentials: {}", e)))
    }
}

#[async_trait]
impl AssetRegistrar for HttpServiceClient {
    async fn register(&self, kind: MediaKind, location: &str) -> Result<JsonValue, UploadError> {
        let url = urlencoding::decode(location)
            .map(|u| u.into_owned())
            .unwrap_or_else(|_| location.to_string());

        let mut body = self.registration.params.clone();
        body.insert("url".to_string(), JsonValue::String(url));

        let response = self
            .client
            .post(self.registration.url_for(kind))
            .json(&body)
            .send()
            .await
            .map_err(|e| UploadError::Registration(e.to_string()))?;

        let result = Self::read_reply(response)
            .await
            .map_err(UploadError::Registration)?;

        Ok(JsonValue::Object(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixelframe_core::TokenServiceConfig;
    use serde_json::json;

    fn object(value: JsonValue) -> Map<String, JsonValue> {
        match value {
            JsonValue::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn services(server: &mockito::Server) -> ServicesConfig {
        let mut config = ServicesConfig {
            token: TokenServiceConfig {
                url: format!("{}/credentials", server.url()),
            },
            ..Default::default()
        };
        config.upload.urls.image = format!("{}/register/image", server.url());
        config.upload.urls.video = format!("{}/register/video", server.url());
        config
            .upload
            .params
            .insert("tenant".to_string(), json!("news"));
        config
    }

    #[test]
    fn test_split_service_error() {
        assert_eq!(
            split_service_error(object(json!({"error": {"message": "quota exceeded"}}))),
            Err("quota exceeded".to_string())
        );
        assert_eq!(
            split_service_error(object(json!({"error": "denied"}))),
            Err("denied".to_string())
        );
        assert_eq!(
            split_service_error(object(json!({"error": true}))),
            Err(DEFAULT_SERVICE_ERROR.to_string())
        );
        assert_eq!(
            split_service_error(object(json!({"error": {}}))),
            Err(DEFAULT_SERVICE_ERROR.to_string())
        );
    }

    #[test]
    fn test_falsy_error_is_success() {
        let body = split_service_error(object(json!({"error": null, "id": 7}))).unwrap();
        assert_eq!(body.get("id"), Some(&json!(7)));
        assert!(!body.contains_key("error"));

        assert!(split_service_error(object(json!({"error": "", "id": 7}))).is_ok());
        assert!(split_service_error(object(json!({"error": 0}))).is_ok());
    }

    #[tokio::test]
    async fn test_fetch_credentials() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/credentials")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "bucketName": "bucket",
                    "region": "us-east-1",
                    "path": "uploads/x",
                    "credentials": {
                        "accessKeyId": "AKIA",
                        "secretAccessKey": "secret",
                        "sessionToken": "token"
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = HttpServiceClient::new(&services(&server)).unwrap();
        let creds = client.fetch_credentials().await.unwrap();

        assert_eq!(creds.bucket_name, "bucket");
        assert_eq!(creds.path, "uploads/x");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_credentials_reported_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/credentials")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": {"message": "not signed in"}}"#)
            .create_async()
            .await;

        let client = HttpServiceClient::new(&services(&server)).unwrap();
        assert_eq!(
            client.fetch_credentials().await.unwrap_err(),
            UploadError::Credential("not signed in".to_string())
        );
    }

    #[tokio::test]
    async fn test_non_success_status_without_error_field() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/credentials")
            .with_status(502)
            .with_body("Bad Gateway")
            .create_async()
            .await;

        let client = HttpServiceClient::new(&services(&server)).unwrap();
        let err = client.fetch_credentials().await.unwrap_err();
        assert_eq!(err.to_string(), DEFAULT_SERVICE_ERROR);
    }

    #[tokio::test]
    async fn test_register_posts_params_and_decoded_url() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/register/video")
            .match_body(mockito::Matcher::Json(json!({
                "tenant": "news",
                "url": "https://bucket.s3.us-east-1.amazonaws.com/uploads/a b"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"assetId": "abc", "error": null}"#)
            .create_async()
            .await;

        let client = HttpServiceClient::new(&services(&server)).unwrap();
        let result = client
            .register(
                MediaKind::Video,
                "https://bucket.s3.us-east-1.amazonaws.com/uploads/a%20b",
            )
            .await
            .unwrap();

        assert_eq!(result, json!({"assetId": "abc"}));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_register_transport_error() {
        let mut config = ServicesConfig::default();
        config.upload.urls.image = "http://127.0.0.1:9/register".to_string();

        let client = HttpServiceClient::new(&config).unwrap();
        let err = client
            .register(MediaKind::Image, "https://example.com/x")
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Registration(_)));
    }
}
