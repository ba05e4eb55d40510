//! File attachments.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::MailError;

/// An email attachment.
///
/// Either holds its bytes, or references a file on disk that is read when
/// the message is delivered.
///
/// ```
/// use careers_mailer::Attachment;
///
/// let cover = Attachment::from_bytes("cover-letter.pdf", b"%PDF".to_vec());
/// assert_eq!(cover.content_type, "application/pdf");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    /// Filename shown to the recipient
    pub filename: String,
    /// MIME content type (e.g., "application/pdf")
    pub content_type: String,
    /// Raw attachment data (empty for path-based attachments)
    pub data: Vec<u8>,
    /// File read at delivery time, if set.
    #[serde(default)]
    pub path: Option<String>,
}

impl Attachment {
    /// Create an attachment from raw bytes.
    ///
    /// Content type is guessed from the filename extension.
    pub fn from_bytes(filename: impl Into<String>, data: Vec<u8>) -> Self {
        let filename = filename.into();
        let content_type = guess_content_type(Path::new(&filename));

        Self {
            filename,
            content_type,
            data,
            path: None,
        }
    }

    /// Reference a file on disk, attached under its own file name.
    ///
    /// The file must exist now; its contents are read at delivery time.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, MailError> {
        let path = path.as_ref();

        if !path.is_file() {
            return Err(MailError::AttachmentFileNotFound(path.display().to_string()));
        }

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("attachment")
            .to_string();

        Ok(Self {
            filename,
            content_type: guess_content_type(path),
            data: Vec::new(),
            path: Some(path.to_string_lossy().into_owned()),
        })
    }

    /// Get the attachment data, reading the file for path-based attachments.
    ///
    /// # Errors
    ///
    /// - `AttachmentFileNotFound` - the file disappeared since construction
    /// - `AttachmentReadError` - the file could not be read
    /// - `AttachmentMissingContent` - no data and no path
    pub fn get_data(&self) -> Result<Vec<u8>, MailError> {
        match &self.path {
            Some(path) => std::fs::read(path).map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    MailError::AttachmentFileNotFound(path.clone())
                } else {
                    MailError::AttachmentReadError(format!("{}: {}", path, e))
                }
            }),
            None if self.data.is_empty() => {
                Err(MailError::AttachmentMissingContent(self.filename.clone()))
            }
            None => Ok(self.data.clone()),
        }
    }

    /// Check if this attachment is read from disk at delivery time.
    pub fn is_lazy(&self) -> bool {
        self.path.is_some()
    }
}

fn guess_content_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string()
}
