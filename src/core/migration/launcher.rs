use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::MigrationError;

/// Host able to create the support document that reads legacy data.
#[async_trait]
pub trait SupportDocumentHost: Send + Sync {
    async fn exists(&self, url: &str) -> Result<bool, MigrationError>;
    async fn create(&self, url: &str) -> Result<(), MigrationError>;
}

type CreationFuture = Shared<BoxFuture<'static, Result<(), MigrationError>>>;

/// Creates the compat support document at most once at a time.
///
/// The first caller that finds no document starts the creation and parks a
/// shared handle to it; callers arriving while it runs await that same
/// handle. The handle is dropped once the creation settles, so a failed
/// attempt can be retried by the next call. A caller that finds the slot
/// empty checks the host again under the lock, since a creation may have
/// finished while it was waiting.
pub struct CompatDocumentLauncher {
    host: Arc<dyn SupportDocumentHost>,
    url: String,
    creating: Mutex<Option<CreationFuture>>,
}

impl CompatDocumentLauncher {
    pub fn new(host: Arc<dyn SupportDocumentHost>, url: &str) -> Self {
        Self {
            host,
            url: url.to_string(),
            creating: Mutex::new(None),
        }
    }

    pub async fn ensure_created(&self) -> Result<(), MigrationError> {
        if self.host.exists(&self.url).await? {
            debug!(url = %self.url, "support document already open");
            return Ok(());
        }

        let (creation, started_here) = {
            let mut slot = self.creating.lock().await;
            match slot.as_ref() {
                Some(in_flight) => (in_flight.clone(), false),
                None => {
                    if self.host.exists(&self.url).await? {
                        debug!(url = %self.url, "support document opened meanwhile");
                        return Ok(());
                    }
                    let host = self.host.clone();
                    let url = self.url.clone();
                    let creation = async move { host.create(&url).await }.boxed().shared();
                    *slot = Some(creation.clone());
                    (creation, true)
                }
            }
        };

        let result = creation.await;
        if started_here {
            self.creating.lock().await.take();
            info!(url = %self.url, ok = result.is_ok(), "support document creation settled");
        }
        result
    }
}
