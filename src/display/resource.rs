use super::surface::RenderSurface;
use crate::config::DisplayView;
use crate::error::RenderError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::warn;

/// The one shared display, serialized by a single mutex.
///
/// Every mutation goes through [`DisplayResource::apply`], which holds the
/// lock for exactly one synchronous update.
#[derive(Clone)]
pub struct DisplayResource {
    surface: Arc<Mutex<Box<dyn RenderSurface>>>,
    lock_timeout: Duration,
}

impl DisplayResource {
    pub fn new<S: RenderSurface + 'static>(surface: S, lock_timeout: Duration) -> Self {
        Self::from_boxed(Box::new(surface), lock_timeout)
    }

    pub fn from_boxed(surface: Box<dyn RenderSurface>, lock_timeout: Duration) -> Self {
        Self {
            surface: Arc::new(Mutex::new(surface)),
            lock_timeout,
        }
    }

    /// Run `update` with exclusive access to the surface.
    ///
    /// Gives up with [`RenderError::LockTimeout`] if the lock is not free
    /// within the configured timeout.
    pub async fn apply<T, F>(&self, update: F) -> Result<T, RenderError>
    where
        F: FnOnce(&mut dyn RenderSurface) -> Result<T, RenderError>,
    {
        let mut surface = match timeout(self.lock_timeout, self.surface.lock()).await {
            Ok(guard) => guard,
            Err(_) => {
                warn!("Display lock not acquired within {:?}", self.lock_timeout);
                return Err(RenderError::LockTimeout {
                    waited_ms: self.lock_timeout.as_millis() as u64,
                });
            }
        };

        update(surface.as_mut())
    }

    pub async fn view(&self) -> Result<DisplayView, RenderError> {
        self.apply(|surface| Ok(surface.view())).await
    }

    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }
}
