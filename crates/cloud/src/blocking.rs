//! Blocking [`RasterService`] over [`RemoteClient`].
//!
//! Wraps the async client with a Tokio runtime so the engine can drive it
//! synchronously.

use chrono::{DateTime, Utc};
use verdex_core::Region;
use verdex_engine::{
    CollectionHandle, CollectionQuery, Expr, ImageHandle, RasterService, ReductionPolicy,
};

use crate::auth::CloudAuth;
use crate::client::{RemoteClient, RemoteClientOptions};
use crate::error::{CloudError, Result};

/// Blocking wrapper around [`RemoteClient`].
///
/// Uses an internal single-threaded Tokio runtime, which may be entered from
/// several threads at once. Must not be called from inside another runtime.
pub struct RemoteServiceBlocking {
    rt: tokio::runtime::Runtime,
    inner: RemoteClient,
}

impl RemoteServiceBlocking {
    pub fn new(
        base_url: &str,
        auth: Box<dyn CloudAuth>,
        options: RemoteClientOptions,
    ) -> Result<Self> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| CloudError::Network(e.to_string()))?;

        let inner = RemoteClient::new(base_url, auth, options)?;
        Ok(Self { rt, inner })
    }

    pub fn client(&self) -> &RemoteClient {
        &self.inner
    }
}

impl RasterService for RemoteServiceBlocking {
    fn filter_collection(&self, query: &CollectionQuery) -> verdex_core::Result<CollectionHandle> {
        Ok(self.rt.block_on(self.inner.filter_collection(query))?)
    }

    fn collection_size(&self, collection: &CollectionHandle) -> verdex_core::Result<usize> {
        Ok(self.rt.block_on(self.inner.collection_size(collection))?)
    }

    fn composite(&self, collection: &CollectionHandle) -> verdex_core::Result<ImageHandle> {
        Ok(self.rt.block_on(self.inner.composite(collection))?)
    }

    fn band_names(&self, image: &ImageHandle) -> verdex_core::Result<Vec<String>> {
        Ok(self.rt.block_on(self.inner.band_names(image))?)
    }

    fn evaluate(&self, image: &ImageHandle, expression: &Expr) -> verdex_core::Result<ImageHandle> {
        Ok(self.rt.block_on(self.inner.evaluate(image, expression))?)
    }

    fn reduce_mean(
        &self,
        image: &ImageHandle,
        region: &Region,
        policy: &ReductionPolicy,
    ) -> verdex_core::Result<Option<f64>> {
        Ok(self.rt.block_on(self.inner.reduce_mean(image, region, policy))?)
    }

    fn scene_timestamps(
        &self,
        collection: &CollectionHandle,
    ) -> verdex_core::Result<Vec<DateTime<Utc>>> {
        Ok(self.rt.block_on(self.inner.scene_timestamps(collection))?)
    }

    fn image_at(
        &self,
        collection: &CollectionHandle,
        position: usize,
    ) -> verdex_core::Result<ImageHandle> {
        Ok(self.rt.block_on(self.inner.image_at(collection, position))?)
    }
}
