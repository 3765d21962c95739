//! Workspace Implementation using Tokio

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    workspace::Workspace,
};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use url::Url;

/// Filesystem-backed workspace
///
/// Layout:
/// - `<repository>/<media package>/<element>/<filename>`: stored files, the
///   URIs handed out by [`Workspace::put`] point here
/// - `<workspace>/<media package>/<element>/<filename>`: working copies
///   created by [`Workspace::get`]
pub struct FilesystemWorkspace {
    workspace_dir: PathBuf,
    repository_dir: PathBuf,
}

impl FilesystemWorkspace {
    pub fn new(workspace_dir: PathBuf, repository_dir: PathBuf) -> Self {
        Self {
            workspace_dir,
            repository_dir,
        }
    }

    /// Workspace and repository as sibling directories below `root`.
    pub fn in_directory(root: &Path) -> Self {
        Self::new(root.join("workspace"), root.join("repository"))
    }

    pub fn workspace_dir(&self) -> &Path {
        &self.workspace_dir
    }

    pub fn repository_dir(&self) -> &Path {
        &self.repository_dir
    }

    fn path_of(uri: &Url) -> Result<PathBuf> {
        if uri.scheme() != "file" {
            return Err(BridgeError::NotAvailable(format!(
                "Only file URIs can be resolved locally: {}",
                uri
            )));
        }
        uri.to_file_path()
            .map_err(|_| BridgeError::OperationFailed(format!("Invalid file URI: {}", uri)))
    }

    fn working_copy_of(&self, path: &Path) -> Option<PathBuf> {
        path.strip_prefix(&self.repository_dir)
            .ok()
            .map(|relative| self.workspace_dir.join(relative))
    }

    fn map_io_error(e: std::io::Error) -> BridgeError {
        BridgeError::Io(e)
    }
}

#[async_trait]
impl Workspace for FilesystemWorkspace {
    async fn put(
        &self,
        media_package_id: &str,
        element_id: &str,
        filename: &str,
        data: Bytes,
    ) -> Result<Url> {
        let dir = self.repository_dir.join(media_package_id).join(element_id);
        fs::create_dir_all(&dir).await.map_err(Self::map_io_error)?;
        let path = dir.join(filename);
        fs::write(&path, data.as_ref())
            .await
            .map_err(Self::map_io_error)?;
        debug!(path = ?path, size = data.len(), "Stored element file");

        Url::from_file_path(&path).map_err(|_| {
            BridgeError::OperationFailed(format!("Cannot build URI for {}", path.display()))
        })
    }

    async fn get(&self, uri: &Url) -> Result<PathBuf> {
        let path = Self::path_of(uri)?;
        if !fs::try_exists(&path).await.map_err(Self::map_io_error)? {
            return Err(BridgeError::NotFound(uri.to_string()));
        }

        let Some(working_copy) = self.working_copy_of(&path) else {
            return Ok(path);
        };
        if !fs::try_exists(&working_copy)
            .await
            .map_err(Self::map_io_error)?
        {
            if let Some(parent) = working_copy.parent() {
                fs::create_dir_all(parent).await.map_err(Self::map_io_error)?;
            }
            fs::copy(&path, &working_copy)
                .await
                .map_err(Self::map_io_error)?;
            debug!(path = ?working_copy, "Created working copy");
        }
        Ok(working_copy)
    }

    async fn delete(&self, uri: &Url) -> Result<()> {
        let path = Self::path_of(uri)?;
        // files outside the repository belong to someone else
        let Some(working_copy) = self.working_copy_of(&path) else {
            debug!(path = ?path, "Not deleting file outside the repository");
            return Ok(());
        };
        if fs::try_exists(&working_copy)
            .await
            .map_err(Self::map_io_error)?
        {
            fs::remove_file(&working_copy)
                .await
                .map_err(Self::map_io_error)?;
        }
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = ?path, "Deleted file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BridgeError::NotFound(uri.to_string()))
            }
            Err(e) => Err(Self::map_io_error(e)),
        }
    }

    async fn delete_from_repository(&self, media_package_id: &str, element_id: &str) -> Result<()> {
        let dir = self.repository_dir.join(media_package_id).join(element_id);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                debug!(path = ?dir, "Deleted element from repository");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(BridgeError::NotFound(
                format!("{}/{}", media_package_id, element_id),
            )),
            Err(e) => Err(Self::map_io_error(e)),
        }
    }

    async fn cleanup(&self, media_package_id: &str) -> Result<()> {
        let dir = self.workspace_dir.join(media_package_id);
        if fs::try_exists(&dir).await.map_err(Self::map_io_error)? {
            fs::remove_dir_all(&dir).await.map_err(Self::map_io_error)?;
            debug!(path = ?dir, "Cleaned up workspace");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn test_workspace(name: &str) -> FilesystemWorkspace {
        let root = env::temp_dir()
            .join("bridge-local-tests")
            .join(format!("{}-{}", name, uuid::Uuid::new_v4()));
        FilesystemWorkspace::in_directory(&root)
    }

    #[tokio::test]
    async fn test_put_and_read() {
        let ws = test_workspace("put");
        let data = Bytes::from("Hello, World!");

        let uri = ws.put("mp", "element", "hello.txt", data.clone()).await.unwrap();
        assert_eq!(uri.scheme(), "file");
        assert!(uri.path().ends_with("mp/element/hello.txt"));

        let read = ws.read(&uri).await.unwrap();
        assert_eq!(read, data);

        let working_copy = ws.get(&uri).await.unwrap();
        assert!(working_copy.starts_with(ws.workspace_dir()));
    }

    #[tokio::test]
    async fn test_delete_and_cleanup() {
        let ws = test_workspace("delete");
        let uri = ws
            .put("mp", "element", "a.txt", Bytes::from("a"))
            .await
            .unwrap();
        ws.get(&uri).await.unwrap();

        ws.delete(&uri).await.unwrap();
        assert!(matches!(ws.get(&uri).await, Err(BridgeError::NotFound(_))));
        assert!(matches!(ws.delete(&uri).await, Err(BridgeError::NotFound(_))));

        ws.cleanup("mp").await.unwrap();
        assert!(!ws.workspace_dir().join("mp").exists());
    }

    #[tokio::test]
    async fn test_delete_keeps_files_outside_repository() {
        let ws = test_workspace("external");
        let outside = ws.workspace_dir().parent().unwrap().join("ingest");
        fs::create_dir_all(&outside).await.unwrap();
        let original = outside.join("lecture.mp4");
        fs::write(&original, b"video").await.unwrap();
        let uri = Url::from_file_path(&original).unwrap();

        assert_eq!(ws.get(&uri).await.unwrap(), original);
        ws.delete(&uri).await.unwrap();
        assert!(original.exists());
    }

    #[tokio::test]
    async fn test_delete_from_repository() {
        let ws = test_workspace("repository");
        ws.put("mp", "element", "a.txt", Bytes::from("a"))
            .await
            .unwrap();

        ws.delete_from_repository("mp", "element").await.unwrap();
        assert!(matches!(
            ws.delete_from_repository("mp", "element").await,
            Err(BridgeError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_non_file_uri_is_not_available() {
        let ws = test_workspace("http");
        let uri = Url::parse("http://localhost/video.mp4").unwrap();
        assert!(matches!(ws.get(&uri).await, Err(BridgeError::NotAvailable(_))));
    }
}
