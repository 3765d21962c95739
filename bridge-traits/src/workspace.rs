//! Workspace Abstraction
//!
//! The workspace holds the working copies of media package element files and
//! fronts the shared file repository they are published to.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use url::Url;

use crate::error::Result;

/// Storage for element files
///
/// Files are addressed by media package id and element id when stored and by
/// the returned URI afterwards.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::workspace::Workspace;
///
/// async fn duplicate(ws: &dyn Workspace, uri: &Url, mp: &str, id: &str) -> Result<Url> {
///     let data = ws.read(uri).await?;
///     ws.put(mp, id, "copy.mp4", data).await
/// }
/// ```
#[async_trait]
pub trait Workspace: Send + Sync {
    /// Store `data` for element `element_id` of media package `media_package_id`
    /// and return the URI under which it is reachable.
    async fn put(
        &self,
        media_package_id: &str,
        element_id: &str,
        filename: &str,
        data: Bytes,
    ) -> Result<Url>;

    /// Local path of the file behind `uri`, fetching it into the workspace if
    /// needed.
    async fn get(&self, uri: &Url) -> Result<PathBuf>;

    /// Read the complete file behind `uri`.
    async fn read(&self, uri: &Url) -> Result<Bytes> {
        let path = self.get(uri).await?;
        let data = tokio::fs::read(&path).await?;
        Ok(Bytes::from(data))
    }

    /// Delete the working copy behind `uri` and the stored file it was
    /// made from. URIs that the workspace did not hand out are left alone.
    async fn delete(&self, uri: &Url) -> Result<()>;

    /// Delete the file of an element from the shared repository.
    async fn delete_from_repository(&self, media_package_id: &str, element_id: &str) -> Result<()>;

    /// Remove everything the workspace holds for a media package.
    async fn cleanup(&self, media_package_id: &str) -> Result<()>;
}
