use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Handle to an uploaded file, as returned by the attachment store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub id: String,
    pub label: String,
}

/// A stored attachment bound to a property.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub property_id: String,
    pub label: String,
    #[serde(default)]
    pub content_type: Option<String>,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

impl Attachment {
    pub fn to_ref(&self) -> AttachmentRef {
        AttachmentRef {
            id: self.id.clone(),
            label: self.label.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadUrl {
    pub url: String,
}

/// A file selected by the caller, held in memory until it is uploaded.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let file_name = file_name.into();
        let content_type = guess_content_type(&file_name).to_string();
        Self {
            file_name,
            content_type,
            data: data.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn size_bytes(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Best-effort MIME type from the file extension. Scanned documents are
/// almost always PDFs or phone photos.
pub fn guess_content_type(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "heic" => "image/heic",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_from_extension() {
        assert_eq!(guess_content_type("bill.pdf"), "application/pdf");
        assert_eq!(guess_content_type("Receipt.JPG"), "image/jpeg");
        assert_eq!(guess_content_type("scan.png"), "image/png");
        assert_eq!(guess_content_type("noext"), "application/octet-stream");
        assert_eq!(guess_content_type("archive.tar.gz"), "application/octet-stream");
    }

    #[test]
    fn upload_file_size_and_override() {
        let file = UploadFile::new("bill.pdf", vec![0u8; 1024]);
        assert_eq!(file.size_bytes(), 1024);
        assert_eq!(file.content_type, "application/pdf");

        let file = file.with_content_type("image/tiff");
        assert_eq!(file.content_type, "image/tiff");
    }

    #[test]
    fn attachment_to_ref() {
        let attachment = Attachment {
            id: "a1".into(),
            property_id: "p1".into(),
            label: "bill.pdf".into(),
            content_type: None,
            size_bytes: 10,
            created_at: Utc::now(),
        };
        assert_eq!(
            attachment.to_ref(),
            AttachmentRef {
                id: "a1".into(),
                label: "bill.pdf".into()
            }
        );
    }
}
