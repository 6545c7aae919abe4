use bytes::Bytes;
use hyper::Method;

use crate::client::Client;
use crate::error::Result;
use crate::models::File;

impl Client {
    /// Attachment metadata
    pub async fn file(&self, id: &str) -> Result<File> {
        let req = self.user_request(Method::GET, &format!("/files/{}", id))?;
        self.execute_json(req, "file").await
    }

    /// Attachment contents, read fully into memory
    pub async fn download_file(&self, id: &str) -> Result<Bytes> {
        let req = self.user_request(Method::GET, &format!("/files/{}/download", id))?;
        self.execute_bytes(req).await
    }

    pub async fn delete_file(&self, id: &str) -> Result<()> {
        let req = self.user_request(Method::DELETE, &format!("/files/{}", id))?;
        self.execute(req).await
    }
}
