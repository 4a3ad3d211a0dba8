//! AWS Secrets Manager integration.

use aws_sdk_secretsmanager::Client as SecretsClient;
use std::collections::HashMap;
use std::sync::OnceLock;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::{CredentialSource, SecretSource};
use crate::google_auth::ServiceAccountKey;
use crate::{Error, Result};

/// Cached secrets with lazy initialization.
static SECRETS_CACHE: OnceLock<RwLock<HashMap<String, String>>> = OnceLock::new();

fn get_cache() -> &'static RwLock<HashMap<String, String>> {
    SECRETS_CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Fetch a string secret from Secrets Manager, cached for the life of the
/// execution environment.
///
/// Used when the Gemini API key or the service-account key is deployed as a
/// secret ARN instead of an environment value or a bundled key file.
pub async fn get_secret(client: &SecretsClient, secret_arn: &str) -> Result<String> {
    if let Some(value) = get_cache().read().await.get(secret_arn) {
        debug!(secret_arn, "Secret served from cache");
        return Ok(value.clone());
    }

    let response = client
        .get_secret_value()
        .secret_id(secret_arn)
        .send()
        .await
        .map_err(|e| Error::Aws(format!("Failed to get secret {}: {}", secret_arn, e)))?;

    let secret_string = response
        .secret_string()
        .ok_or_else(|| Error::Aws(format!("Secret {} has no string value", secret_arn)))?
        .to_string();

    get_cache()
        .write()
        .await
        .insert(secret_arn.to_string(), secret_string.clone());

    Ok(secret_string)
}

/// Resolve a secret that may be given inline or stored in Secrets Manager.
pub async fn resolve_secret(client: &SecretsClient, source: &SecretSource) -> Result<String> {
    match source {
        SecretSource::Value(value) => Ok(value.clone()),
        SecretSource::SecretArn(arn) => get_secret(client, arn).await,
    }
}

/// Load the service-account key from a file or from Secrets Manager.
pub async fn load_service_account_key(
    client: &SecretsClient,
    source: &CredentialSource,
) -> Result<ServiceAccountKey> {
    match source {
        CredentialSource::File(path) => ServiceAccountKey::from_file(path).await,
        CredentialSource::SecretArn(arn) => {
            let json = get_secret(client, arn).await?;
            ServiceAccountKey::from_json(&json)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_client() -> SecretsClient {
        let config = aws_sdk_secretsmanager::Config::builder()
            .behavior_version(aws_sdk_secretsmanager::config::BehaviorVersion::latest())
            .region(aws_sdk_secretsmanager::config::Region::new("us-west-1"))
            .build();
        SecretsClient::from_conf(config)
    }

    #[tokio::test]
    async fn test_inline_secret_skips_secrets_manager() {
        let value = resolve_secret(&offline_client(), &SecretSource::Value("abc".to_string()))
            .await
            .unwrap();
        assert_eq!(value, "abc");
    }

    #[tokio::test]
    async fn test_cached_secret_served_from_cache() {
        let arn = "arn:aws:secretsmanager:us-west-1:000000000000:secret:cached-test";
        get_cache()
            .write()
            .await
            .insert(arn.to_string(), "from-cache".to_string());

        let value = resolve_secret(&offline_client(), &SecretSource::SecretArn(arn.to_string()))
            .await
            .unwrap();
        assert_eq!(value, "from-cache");
    }

    #[tokio::test]
    async fn test_service_account_key_from_secret_arn() {
        let arn = "arn:aws:secretsmanager:us-west-1:000000000000:secret:sa-key-test";
        get_cache().write().await.insert(
            arn.to_string(),
            include_str!("../testdata/service_account.json").to_string(),
        );

        let key = load_service_account_key(
            &offline_client(),
            &CredentialSource::SecretArn(arn.to_string()),
        )
        .await
        .unwrap();
        assert!(!key.client_email.is_empty());
    }

    #[tokio::test]
    async fn test_missing_key_file_is_config_error() {
        let err = load_service_account_key(
            &offline_client(),
            &CredentialSource::File("/nonexistent/credentials.json".into()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
