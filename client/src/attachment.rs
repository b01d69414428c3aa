use std::path::{Path, PathBuf};
use thiserror::Error;

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];
pub const UPLOAD_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "pdf", "txt"];

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unsupported file type for {} (accepted: {accepted})", path.display())]
    Unsupported { path: PathBuf, accepted: String },
}

/// A local file loaded into memory for a multipart upload.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
    pub source: Option<PathBuf>,
}

impl Attachment {
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let mime = mime_guess::from_path(&name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            name,
            mime,
            bytes,
            source: None,
        }
    }

    pub async fn load(path: &Path, accepted: &[&str]) -> Result<Self, AttachmentError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        if !extension.is_some_and(|ext| accepted.contains(&ext.as_str())) {
            return Err(AttachmentError::Unsupported {
                path: path.to_path_buf(),
                accepted: accepted.join(", "),
            });
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| AttachmentError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let mut attachment = Self::from_bytes(name, bytes);
        attachment.source = Some(path.to_path_buf());
        Ok(attachment)
    }

    /// Reference shown in the message pane before the backend has seen the file.
    pub fn local_uri(&self) -> String {
        match &self.source {
            Some(path) => format!("file://{}", path.display()),
            None => format!("blob:{}", self.name),
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}
