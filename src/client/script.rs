//! Single-flight loading of the Snap payment script.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::ClientError;

pub const SANDBOX_SNAP_SCRIPT_URL: &str = "https://app.sandbox.midtrans.com/snap/snap.js";
pub const PRODUCTION_SNAP_SCRIPT_URL: &str = "https://app.midtrans.com/snap/snap.js";

/// A loaded copy of the payment script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapScript {
    pub url: String,
    pub client_key: Option<String>,
    pub size: usize,
}

#[async_trait]
pub trait ScriptSource: Send + Sync {
    async fn fetch(&self) -> Result<SnapScript, ClientError>;
}

/// Fetches snap.js over HTTP, tagging it with the Midtrans client key
#[derive(Debug, Clone)]
pub struct HttpScriptSource {
    client: reqwest::Client,
    url: String,
    client_key: Option<String>,
}

impl HttpScriptSource {
    pub fn new(url: impl Into<String>, client_key: Option<String>) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
            client_key,
        })
    }
}

#[async_trait]
impl ScriptSource for HttpScriptSource {
    async fn fetch(&self) -> Result<SnapScript, ClientError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| ClientError::ScriptLoadFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ClientError::ScriptLoadFailed(format!(
                "{} returned {}",
                self.url,
                response.status()
            )));
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::ScriptLoadFailed(e.to_string()))?;

        Ok(SnapScript {
            url: self.url.clone(),
            client_key: self.client_key.clone(),
            size: body.len(),
        })
    }
}

/// Loads the script at most once per process. Callers that arrive while a
/// load is in flight wait for it; a failed load lets the next caller retry.
pub struct SnapLoader {
    source: Arc<dyn ScriptSource>,
    script: OnceCell<SnapScript>,
}

impl SnapLoader {
    pub fn new(source: Arc<dyn ScriptSource>) -> Self {
        Self {
            source,
            script: OnceCell::new(),
        }
    }

    pub async fn ensure_loaded(&self) -> Result<&SnapScript, ClientError> {
        if let Some(script) = self.script.get() {
            return Ok(script);
        }
        self.script
            .get_or_try_init(|| async {
                debug!("Loading Snap payment script");
                let script = self.source.fetch().await?;
                info!(url = %script.url, bytes = script.size, "Snap payment script loaded");
                Ok::<_, ClientError>(script)
            })
            .await
    }

    pub fn is_loaded(&self) -> bool {
        self.script.initialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        fetches: AtomicUsize,
        fail_first: bool,
    }

    #[async_trait]
    impl ScriptSource for CountingSource {
        async fn fetch(&self) -> Result<SnapScript, ClientError> {
            let n = self.fetches.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.fail_first && n == 0 {
                return Err(ClientError::ScriptLoadFailed("offline".into()));
            }
            Ok(SnapScript {
                url: SANDBOX_SNAP_SCRIPT_URL.into(),
                client_key: Some("SB-Mid-client-x".into()),
                size: 1024,
            })
        }
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_load() {
        let source = Arc::new(CountingSource {
            fetches: AtomicUsize::new(0),
            fail_first: false,
        });
        let loader = Arc::new(SnapLoader::new(source.clone()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let loader = loader.clone();
            handles.push(tokio::spawn(async move {
                loader.ensure_loaded().await.map(|s| s.size)
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(1024));
        }

        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
        assert!(loader.is_loaded());
        loader.ensure_loaded().await.unwrap();
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_load_can_be_retried() {
        let source = Arc::new(CountingSource {
            fetches: AtomicUsize::new(0),
            fail_first: true,
        });
        let loader = SnapLoader::new(source.clone());

        assert!(matches!(
            loader.ensure_loaded().await,
            Err(ClientError::ScriptLoadFailed(_))
        ));
        assert!(!loader.is_loaded());
        assert!(loader.ensure_loaded().await.is_ok());
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }
}
