//! Audio object-storage collaborator.
//!
//! Thin wrapper over an [`ObjectStore`]: generated audio is persisted at a
//! unique key under an optional prefix and handed back as a publicly
//! fetchable URL under the configured base.

use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions, PutPayload};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::ServerConfig;

const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid object path: {0}")]
    InvalidPath(#[from] object_store::path::Error),

    #[error("object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("audio storage misconfigured: {0}")]
    Config(String),
}

/// Build an audio object key: `{prefix}/{file_name}` or `{file_name}`
fn build_audio_object_key(prefix: Option<&String>, file_name: &str) -> String {
    let normalized_prefix = prefix
        .map(|p| p.trim().trim_end_matches('/'))
        .filter(|p| !p.is_empty());

    match normalized_prefix {
        Some(prefix) => format!("{}/{}", prefix, file_name),
        None => file_name.to_string(),
    }
}

/// Wrapper over the object store holding the key prefix and public URL base.
#[derive(Clone)]
pub struct AudioStorage {
    store: Arc<dyn ObjectStore>,
    prefix: Option<String>,
    public_base_url: String,
}

impl AudioStorage {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        prefix: Option<String>,
        public_base_url: String,
    ) -> Self {
        Self {
            store,
            prefix,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Persist MP3 bytes at a unique key and return the public URL.
    pub async fn put_audio(&self, data: Bytes) -> Result<String, StorageError> {
        let file_name = format!("{}.mp3", Uuid::new_v4().simple());
        let key = build_audio_object_key(self.prefix.as_ref(), &file_name);
        let path = ObjectPath::parse(&key)?;

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, AUDIO_CONTENT_TYPE.into());
        let options = PutOptions {
            attributes,
            ..Default::default()
        };

        let size = data.len();
        self.store
            .put_opts(&path, PutPayload::from(data), options)
            .await?;

        debug!(key = %key, bytes = size, "Audio object stored");
        Ok(format!("{}/{}", self.public_base_url, key))
    }
}

/// Build the configured audio storage, or `None` when no bucket is set.
pub fn build_audio_storage(config: &ServerConfig) -> Result<Option<AudioStorage>, StorageError> {
    let Some(ref bucket) = config.audio_s3_bucket else {
        return Ok(None);
    };

    let mut builder = AmazonS3Builder::new().with_bucket_name(bucket);
    if let Some(ref region) = config.audio_s3_region {
        builder = builder.with_region(region);
    }
    if let Some(ref endpoint) = config.audio_s3_endpoint {
        builder = builder.with_endpoint(endpoint);
        if endpoint.starts_with("http://") {
            builder = builder.with_allow_http(true);
        }
    }
    if let Some(ref access_key) = config.audio_s3_access_key {
        builder = builder.with_access_key_id(access_key);
    }
    if let Some(ref secret_key) = config.audio_s3_secret_key {
        builder = builder.with_secret_access_key(secret_key);
    }

    let store = builder
        .build()
        .map_err(|e| StorageError::Config(format!("failed to build S3 store: {e}")))?;

    let public_base = config
        .audio_public_base()
        .ok_or_else(|| StorageError::Config("audio public base URL not derivable".to_string()))?;

    info!(bucket = %bucket, "Audio storage configured");
    Ok(Some(AudioStorage::new(
        Arc::new(store),
        config.audio_s3_prefix.clone(),
        public_base,
    )))
}
