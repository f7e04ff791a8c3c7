#![doc = "S3-compatible object store for the CLI: bridges the core `ObjectStore` trait to aws-sdk-s3."]
//
//! # Object store integration (CLI <-> Core)
//!
//! This module wires the [`ObjectStore`] abstraction from
//! [`bucket_mirror_core::contract`] to a real S3-compatible server (MinIO, AWS S3,
//! R2, ...) and provides the [`S3ObjectStore`] used by the CLI.
//!
//! - Path-style addressing is always used, so `host:port` endpoints work without
//!   wildcard DNS.
//! - Listings are paginated with continuation tokens and exposed as a stream; a
//!   failed page ends the stream with an error.
//! - All SDK errors are boxed into [`StoreError`]; the core decides what is fatal.

use std::collections::VecDeque;

use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::Client as S3Client;
use bucket_mirror_core::config::StorageConfig;
use bucket_mirror_core::contract::{
    ObjectInfo, ObjectListing, ObjectReader, ObjectStat, ObjectStore, StoreError,
};
use futures::StreamExt;

pub struct S3ObjectStore {
    client: S3Client,
}

impl S3ObjectStore {
    /// Builds a client from static credentials. No network traffic happens here.
    pub fn from_config(config: &StorageConfig) -> Result<Self, StoreError> {
        if config.endpoint.trim().is_empty() {
            tracing::error!("Storage endpoint is empty");
            return Err("storage endpoint must not be empty".into());
        }

        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "bucket-mirror",
        );
        let endpoint = config.endpoint_url();
        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .endpoint_url(&endpoint)
            .force_path_style(true)
            .build();

        tracing::info!(
            endpoint = %endpoint,
            region = %config.region,
            access_key_set = !config.access_key.is_empty(),
            "Initialized S3 client"
        );
        Ok(S3ObjectStore {
            client: S3Client::from_conf(s3_config),
        })
    }
}

/// Pagination state for [`S3ObjectStore::list_objects`].
struct ListState {
    client: S3Client,
    bucket: String,
    continuation_token: Option<String>,
    buffered: VecDeque<ObjectInfo>,
    exhausted: bool,
}

impl ListState {
    async fn next_page(&mut self) -> Result<(), StoreError> {
        let mut request = self.client.list_objects_v2().bucket(&self.bucket);
        if let Some(token) = self.continuation_token.take() {
            request = request.continuation_token(token);
        }

        let output = request.send().await.map_err(|e| {
            tracing::error!(bucket = %self.bucket, error = ?e, "S3 list_objects_v2 failed");
            Box::new(e.into_service_error()) as StoreError
        })?;

        for object in output.contents() {
            match object.key() {
                Some(key) => self.buffered.push_back(ObjectInfo {
                    key: key.to_string(),
                    size: object.size().unwrap_or(0).max(0) as u64,
                }),
                None => {
                    tracing::debug!(bucket = %self.bucket, "Skipping listed object without a key")
                }
            }
        }

        if output.is_truncated().unwrap_or(false) {
            self.continuation_token = output.next_continuation_token().map(str::to_string);
            self.exhausted = self.continuation_token.is_none();
        } else {
            self.exhausted = true;
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn list_objects(&self, bucket: &str) -> ObjectListing {
        let state = ListState {
            client: self.client.clone(),
            bucket: bucket.to_string(),
            continuation_token: None,
            buffered: VecDeque::new(),
            exhausted: false,
        };

        futures::stream::unfold(state, |mut state| async move {
            loop {
                if let Some(object) = state.buffered.pop_front() {
                    return Some((Ok(object), state));
                }
                if state.exhausted {
                    return None;
                }
                if let Err(e) = state.next_page().await {
                    state.exhausted = true;
                    return Some((Err(e), state));
                }
            }
        })
        .boxed()
    }

    async fn stat_object(&self, bucket: &str, key: &str) -> Result<ObjectStat, StoreError> {
        let output = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                tracing::debug!(bucket, key, error = ?e, "S3 head_object failed");
                Box::new(e.into_service_error()) as StoreError
            })?;

        Ok(ObjectStat {
            key: key.to_string(),
            size: output.content_length().unwrap_or(0).max(0) as u64,
        })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectReader, StoreError> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                tracing::debug!(bucket, key, error = ?e, "S3 get_object failed");
                Box::new(e.into_service_error()) as StoreError
            })?;

        Ok(Box::pin(output.body.into_async_read()))
    }
}
