//! Remote image embedding for self-contained artifacts.
//!
//! An [`AssetEmbedder`] lives for one render. It memoizes every image it
//! successfully fetched, so a URL used on several slides costs one request.
//! Failures are logged and reported as "embedding unavailable"; they never
//! fail the export.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{debug, warn};

use crate::error::AssetEmbedError;

// == Fetched Asset ==
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedAsset {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

// == Asset Fetcher ==
/// Source of remote asset bytes.
#[async_trait]
pub trait AssetFetcher: fmt::Debug + Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedAsset, AssetEmbedError>;
}

/// Fetches assets over HTTP.
#[derive(Debug, Clone)]
pub struct HttpAssetFetcher {
    client: reqwest::Client,
}

impl HttpAssetFetcher {
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|err| {
                warn!(error = %err, "Falling back to default HTTP client for asset fetching");
                reqwest::Client::new()
            });
        Self { client }
    }
}

#[async_trait]
impl AssetFetcher for HttpAssetFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedAsset, AssetEmbedError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AssetEmbedError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AssetEmbedError::Status(response.status().as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AssetEmbedError::Request(e.to_string()))?;

        Ok(FetchedAsset {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

/// Serves assets from memory and counts fetches. Unknown URLs answer 404.
#[derive(Debug, Default)]
pub struct StaticAssetFetcher {
    assets: HashMap<String, FetchedAsset>,
    fetches: AtomicUsize,
}

impl StaticAssetFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_asset(
        mut self,
        url: impl Into<String>,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Self {
        self.assets.insert(
            url.into(),
            FetchedAsset {
                bytes,
                content_type: content_type.map(str::to_string),
            },
        );
        self
    }

    /// Number of fetches served or refused so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssetFetcher for StaticAssetFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedAsset, AssetEmbedError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.assets
            .get(url)
            .cloned()
            .ok_or(AssetEmbedError::Status(404))
    }
}

// == Embedded Image ==
/// A fetched image in both raw and base64 form.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedImage {
    pub mime: String,
    pub base64: String,
    pub bytes: Arc<[u8]>,
}

impl EmbeddedImage {
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.base64)
    }
}

// == Asset Embedder ==
pub struct AssetEmbedder {
    fetcher: Arc<dyn AssetFetcher>,
    memo: Mutex<HashMap<String, EmbeddedImage>>,
}

impl AssetEmbedder {
    pub fn new(fetcher: Arc<dyn AssetFetcher>) -> Self {
        Self {
            fetcher,
            memo: Mutex::new(HashMap::new()),
        }
    }

    /// Base64 of the image at `url`, or `""` when it cannot be embedded.
    pub async fn embed_image(&self, url: &str) -> String {
        self.load(url)
            .await
            .map(|image| image.base64)
            .unwrap_or_default()
    }

    /// `data:` URI for the image at `url`, if it could be embedded.
    pub async fn embed_data_uri(&self, url: &str) -> Option<String> {
        self.load(url).await.map(|image| image.data_uri())
    }

    /// Full image record, used by writers that need the raw bytes.
    pub async fn embedded(&self, url: &str) -> Option<EmbeddedImage> {
        self.load(url).await
    }

    /// Number of distinct images memoized so far.
    pub fn memoized_count(&self) -> usize {
        self.memo
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    async fn load(&self, url: &str) -> Option<EmbeddedImage> {
        let url = url.trim();
        if url.is_empty() {
            return None;
        }

        let cached = self
            .memo
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned();
        if let Some(image) = cached {
            return Some(image);
        }

        match self.fetch_image(url).await {
            Ok(image) => {
                debug!(url, bytes = image.bytes.len(), mime = %image.mime, "Embedded image");
                self.memo
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(url.to_string(), image.clone());
                Some(image)
            }
            Err(err) => {
                warn!(url, error = %err, "Image embedding failed, keeping original URL");
                None
            }
        }
    }

    async fn fetch_image(&self, url: &str) -> Result<EmbeddedImage, AssetEmbedError> {
        let asset = self.fetcher.fetch(url).await?;
        if asset.bytes.is_empty() {
            return Err(AssetEmbedError::EmptyBody);
        }

        let mime = match asset.content_type.as_deref() {
            Some(content_type) => {
                let mime = content_type
                    .split(';')
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_ascii_lowercase();
                if !mime.starts_with("image/") {
                    return Err(AssetEmbedError::NotAnImage(content_type.to_string()));
                }
                mime
            }
            None => guess_mime(url).to_string(),
        };

        Ok(EmbeddedImage {
            mime,
            base64: STANDARD.encode(&asset.bytes),
            bytes: Arc::from(asset.bytes),
        })
    }
}

impl fmt::Debug for AssetEmbedder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetEmbedder")
            .field("fetcher", &self.fetcher)
            .field("memoized", &self.memoized_count())
            .finish()
    }
}

/// Image MIME type from a URL's extension, PNG when unknown.
fn guess_mime(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let extension = path
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        _ => "image/png",
    }
}
