use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use hmac::{Hmac, Mac};
use relay_core::speech::{BlobStore, SpeechError};
use secrecy::{ExposeSecret, SecretSlice, SecretString};
use sha2::Sha256;
use std::path::Path;

/// REST API version the SharedKey signature is computed for.
pub const STORAGE_API_VERSION: &str = "2021-08-06";
const BLOB_CONTENT_TYPE: &str = "audio/wav";

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum StorageConfigError {
    #[error("connection string is missing {0}")]
    MissingField(&'static str),
    #[error("malformed connection string segment: {0}")]
    Malformed(String),
    #[error("AccountKey is not valid base64")]
    InvalidKey,
}

/// How requests to the storage account are authorized.
#[derive(Debug)]
pub enum StorageCredential {
    /// `AccountKey`: every request is signed with HMAC-SHA256.
    SharedKey(SecretSlice<u8>),
    /// `SharedAccessSignature`: the token is appended to the request URL.
    Sas(SecretString),
}

/// The parts of an Azure Storage connection string the blob store needs.
#[derive(Debug)]
pub struct StorageAccount {
    pub account_name: String,
    pub blob_endpoint: String,
    pub credential: StorageCredential,
}

impl StorageAccount {
    /// Parses `Key=Value;Key=Value` pairs. `AccountKey` wins over
    /// `SharedAccessSignature` when both are present; `BlobEndpoint` defaults
    /// to the public cloud host.
    pub fn from_connection_string(raw: &str) -> Result<Self, StorageConfigError> {
        let mut account_name = None;
        let mut blob_endpoint = None;
        let mut account_key = None;
        let mut sas_token = None;

        for segment in raw.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            // Base64 keys end in `=`, so only the first one separates key and value.
            let (key, value) = segment
                .split_once('=')
                .ok_or_else(|| StorageConfigError::Malformed(segment.to_string()))?;
            match key {
                "AccountName" => account_name = Some(value.to_string()),
                "BlobEndpoint" => blob_endpoint = Some(value.trim_end_matches('/').to_string()),
                "AccountKey" => account_key = Some(value.to_string()),
                "SharedAccessSignature" => {
                    sas_token = Some(value.trim_start_matches('?').to_string())
                }
                _ => {}
            }
        }

        let account_name = account_name.ok_or(StorageConfigError::MissingField("AccountName"))?;
        let credential = match (account_key, sas_token) {
            (Some(key), _) => {
                let key = general_purpose::STANDARD
                    .decode(key.as_bytes())
                    .map_err(|_| StorageConfigError::InvalidKey)?;
                StorageCredential::SharedKey(SecretSlice::from(key))
            }
            (None, Some(sas)) => StorageCredential::Sas(SecretString::from(sas)),
            (None, None) => {
                return Err(StorageConfigError::MissingField(
                    "AccountKey or SharedAccessSignature",
                ));
            }
        };
        let blob_endpoint = blob_endpoint
            .unwrap_or_else(|| format!("https://{account_name}.blob.core.windows.net"));

        Ok(Self {
            account_name,
            blob_endpoint,
            credential,
        })
    }
}

/// Builds the SharedKey string-to-sign for a Put Blob request.
///
/// Only the headers this store sends take part: `Content-Length`,
/// `Content-Type` and the `x-ms-*` set. `Date` stays empty because
/// `x-ms-date` is sent instead.
pub fn put_blob_string_to_sign(
    account_name: &str,
    blob_path: &str,
    content_length: usize,
    ms_date: &str,
) -> String {
    let content_length = if content_length == 0 {
        String::new()
    } else {
        content_length.to_string()
    };
    format!(
        "PUT\n\n\n{content_length}\n\n{BLOB_CONTENT_TYPE}\n\n\n\n\n\n\n\
         x-ms-blob-type:BlockBlob\nx-ms-date:{ms_date}\nx-ms-version:{STORAGE_API_VERSION}\n\
         /{account_name}{blob_path}"
    )
}

/// Base64 HMAC-SHA256 of `string_to_sign` under the decoded account key.
pub fn sign(key: &[u8], string_to_sign: &str) -> Result<String, SpeechError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key)
        .map_err(|e| SpeechError::UploadFailed(format!("unusable account key: {e}")))?;
    mac.update(string_to_sign.as_bytes());
    Ok(general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

/// Uploads clips as block blobs into one container.
pub struct AzureBlobStore {
    http: reqwest::Client,
    account: StorageAccount,
    container: String,
}

impl AzureBlobStore {
    pub fn new(account: StorageAccount, container: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            account,
            container: container.to_string(),
        }
    }

    /// Public address of a blob, without any credential.
    pub fn blob_url(&self, object_name: &str) -> String {
        format!(
            "{}/{}/{}",
            self.account.blob_endpoint, self.container, object_name
        )
    }

    /// URL path of a blob, including any path carried by the endpoint
    /// (path-style emulator endpoints put the account name there).
    fn blob_path(&self, object_name: &str) -> String {
        let endpoint = &self.account.blob_endpoint;
        let after_scheme = endpoint.split_once("://").map_or(endpoint.as_str(), |(_, rest)| rest);
        let endpoint_path = after_scheme.find('/').map_or("", |i| &after_scheme[i..]);
        format!("{}/{}/{}", endpoint_path, self.container, object_name)
    }
}

#[async_trait]
impl BlobStore for AzureBlobStore {
    async fn upload(&self, path: &Path, object_name: &str) -> Result<String, SpeechError> {
        let data = tokio::fs::read(path).await?;
        let url = self.blob_url(object_name);
        let ms_date = chrono::Utc::now()
            .format("%a, %d %b %Y %H:%M:%S GMT")
            .to_string();

        let request = match &self.account.credential {
            StorageCredential::SharedKey(key) => {
                let string_to_sign = put_blob_string_to_sign(
                    &self.account.account_name,
                    &self.blob_path(object_name),
                    data.len(),
                    &ms_date,
                );
                let signature = sign(key.expose_secret(), &string_to_sign)?;
                self.http.put(&url).header(
                    reqwest::header::AUTHORIZATION,
                    format!("SharedKey {}:{}", self.account.account_name, signature),
                )
            }
            StorageCredential::Sas(token) => self
                .http
                .put(format!("{url}?{}", token.expose_secret())),
        };

        let resp = request
            .header("x-ms-blob-type", "BlockBlob")
            .header("x-ms-date", &ms_date)
            .header("x-ms-version", STORAGE_API_VERSION)
            .header(reqwest::header::CONTENT_TYPE, BLOB_CONTENT_TYPE)
            .body(data)
            .send()
            .await
            .map_err(|e| SpeechError::UploadFailed(e.without_url().to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            tracing::error!("Blob upload of {} failed ({}): {}", object_name, status, detail);
            return Err(SpeechError::UploadFailed(status.to_string()));
        }

        tracing::info!("Published {}", url);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAS_CONNECTION_STRING: &str = "BlobEndpoint=https://relay.blob.core.windows.net/;\
        SharedAccessSignature=?sv=2022-11-02&ss=b&sig=abc;AccountName=relay";
    // AccountKey is base64("relay-test-account-key").
    const KEY_CONNECTION_STRING: &str = "DefaultEndpointsProtocol=https;AccountName=relay;\
        AccountKey=cmVsYXktdGVzdC1hY2NvdW50LWtleQ==;EndpointSuffix=core.windows.net";

    #[test]
    fn test_parse_sas_connection_string() {
        let account = StorageAccount::from_connection_string(SAS_CONNECTION_STRING).unwrap();

        assert_eq!(account.account_name, "relay");
        assert_eq!(account.blob_endpoint, "https://relay.blob.core.windows.net");
        match account.credential {
            StorageCredential::Sas(token) => {
                assert_eq!(token.expose_secret(), "sv=2022-11-02&ss=b&sig=abc")
            }
            other => panic!("expected a SAS credential, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_account_key_connection_string() {
        let account = StorageAccount::from_connection_string(KEY_CONNECTION_STRING).unwrap();

        assert_eq!(account.account_name, "relay");
        assert_eq!(account.blob_endpoint, "https://relay.blob.core.windows.net");
        match account.credential {
            StorageCredential::SharedKey(key) => {
                assert_eq!(key.expose_secret(), b"relay-test-account-key")
            }
            other => panic!("expected a SharedKey credential, got {other:?}"),
        }
    }

    #[test]
    fn test_account_key_preferred_over_sas() {
        let account = StorageAccount::from_connection_string(
            "AccountName=relay;AccountKey=cmVsYXktdGVzdC1hY2NvdW50LWtleQ==;SharedAccessSignature=sig=1",
        )
        .unwrap();

        assert!(matches!(account.credential, StorageCredential::SharedKey(_)));
    }

    #[test]
    fn test_missing_credential_is_rejected() {
        let result = StorageAccount::from_connection_string("AccountName=menus");

        assert_eq!(
            result.unwrap_err(),
            StorageConfigError::MissingField("AccountKey or SharedAccessSignature")
        );
    }

    #[test]
    fn test_invalid_account_key_is_rejected() {
        let result = StorageAccount::from_connection_string("AccountName=menus;AccountKey=not base64!");

        assert_eq!(result.unwrap_err(), StorageConfigError::InvalidKey);
    }

    #[test]
    fn test_malformed_segment() {
        let result = StorageAccount::from_connection_string("AccountName=menus;garbage");
        assert_eq!(
            result.unwrap_err(),
            StorageConfigError::Malformed("garbage".to_string())
        );
    }

    #[test]
    fn test_put_blob_string_to_sign_layout() {
        let string_to_sign = put_blob_string_to_sign(
            "relay",
            "/static-tmp/output.wav",
            4,
            "Mon, 19 Oct 2026 08:00:00 GMT",
        );

        assert_eq!(
            string_to_sign,
            "PUT\n\n\n4\n\naudio/wav\n\n\n\n\n\n\n\
             x-ms-blob-type:BlockBlob\n\
             x-ms-date:Mon, 19 Oct 2026 08:00:00 GMT\n\
             x-ms-version:2021-08-06\n\
             /relay/static-tmp/output.wav"
        );
    }

    #[test]
    fn test_empty_body_leaves_content_length_blank() {
        let string_to_sign = put_blob_string_to_sign("relay", "/c/b.wav", 0, "d");
        assert!(string_to_sign.starts_with("PUT\n\n\n\n\naudio/wav\n"));
    }

    #[test]
    fn test_shared_key_signature_matches_known_vector() {
        // --- 1. Arrange ---
        let string_to_sign = put_blob_string_to_sign(
            "relay",
            "/static-tmp/output.wav",
            4,
            "Mon, 19 Oct 2026 08:00:00 GMT",
        );

        // --- 2. Act ---
        let signature = sign(b"relay-test-account-key", &string_to_sign).unwrap();

        // --- 3. Assert ---
        assert_eq!(signature, "RO8g0xRrVlf5/P0+FOkRdW6KOaqo+el+kv6uQPdwB9c=");
    }

    #[test]
    fn test_public_url_has_no_signature() {
        let account = StorageAccount::from_connection_string(SAS_CONNECTION_STRING).unwrap();
        let store = AzureBlobStore::new(account, "static-tmp");

        assert_eq!(
            store.blob_url("output.wav"),
            "https://relay.blob.core.windows.net/static-tmp/output.wav"
        );
        assert_eq!(store.blob_path("output.wav"), "/static-tmp/output.wav");
    }

    #[test]
    fn test_path_style_endpoint_is_part_of_the_signed_path() {
        let account = StorageAccount::from_connection_string(
            "AccountName=devstoreaccount1;AccountKey=cmVsYXktdGVzdC1hY2NvdW50LWtleQ==;\
             BlobEndpoint=http://127.0.0.1:10000/devstoreaccount1;",
        )
        .unwrap();
        let store = AzureBlobStore::new(account, "static-tmp");

        assert_eq!(
            store.blob_path("output.wav"),
            "/devstoreaccount1/static-tmp/output.wav"
        );
    }

    #[tokio::test]
    async fn test_missing_artifact_is_a_scratch_error() {
        let dir = tempdir().unwrap();
        let account = StorageAccount::from_connection_string(SAS_CONNECTION_STRING).unwrap();
        let store = AzureBlobStore::new(account, "static-tmp");

        let result = store.upload(&dir.path().join("gone.wav"), "output.wav").await;

        assert!(matches!(result, Err(SpeechError::Scratch(_))));
    }

    #[tokio::test]
    async fn test_unreachable_storage_is_an_upload_failure() {
        let dir = tempdir().unwrap();
        let artifact = dir.path().join("output.wav");
        std::fs::write(&artifact, b"RIFF").unwrap();
        let account = StorageAccount::from_connection_string(
            "AccountName=relay;BlobEndpoint=http://127.0.0.1:9;SharedAccessSignature=sig=secret",
        )
        .unwrap();
        let store = AzureBlobStore::new(account, "static-tmp");

        let result = store.upload(&artifact, "output.wav").await;

        match result {
            Err(SpeechError::UploadFailed(msg)) => assert!(!msg.contains("secret")),
            other => panic!("expected upload failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_storage_with_account_key_is_an_upload_failure() {
        let dir = tempdir().unwrap();
        let artifact = dir.path().join("output.wav");
        std::fs::write(&artifact, b"RIFF").unwrap();
        let account = StorageAccount::from_connection_string(
            "AccountName=relay;BlobEndpoint=http://127.0.0.1:9;AccountKey=cmVsYXktdGVzdC1hY2NvdW50LWtleQ==",
        )
        .unwrap();
        let store = AzureBlobStore::new(account, "static-tmp");

        let result = store.upload(&artifact, "output.wav").await;

        assert!(matches!(result, Err(SpeechError::UploadFailed(_))));
    }
}
