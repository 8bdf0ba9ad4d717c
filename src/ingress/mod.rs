/// Upload ingress
///
/// Decodes multipart form data and enforces per-file constraints before
/// any domain logic runs: one file per slot, extension and declared
/// content type must agree, and the size ceiling is checked while the
/// body streams in. A rejected request writes nothing to the blob store.
use crate::{
    blob_store::{BlobMetadata, BlobStore},
    error::{CmsError, CmsResult},
};
use axum::extract::multipart::{Field, Multipart};
use std::collections::HashMap;

/// Attachment slot names accepted in multipart requests
const IMAGE_SLOT: &str = "image";
const PDF_SLOT: &str = "pdf";

/// Extension -> expected declared content type, per slot
const IMAGE_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("webp", "image/webp"),
];
const PDF_TYPES: &[(&str, &str)] = &[("pdf", "application/pdf")];

/// A decoded, validated file from a multipart request, not yet stored
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Everything a content endpoint receives in one multipart request
#[derive(Debug, Default)]
pub struct UploadForm {
    pub fields: HashMap<String, String>,
    pub image: Option<IncomingFile>,
    pub pdf: Option<IncomingFile>,
}

/// Blob handles for files staged into the store for one request
///
/// The lifecycle manager either commits these into a record or discards
/// them; they never outlive the request unreferenced (beyond what the
/// orphan sweep covers after a crash).
#[derive(Debug, Default, Clone)]
pub struct StagedUploads {
    pub image: Option<BlobMetadata>,
    pub pdf: Option<BlobMetadata>,
}

impl UploadForm {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Store the decoded files, yielding blob handles
    ///
    /// If the second put fails the first is rolled back, so a failed
    /// request stages either both files or none.
    pub async fn stage(&self, store: &BlobStore) -> CmsResult<StagedUploads> {
        let mut staged = StagedUploads::default();

        if let Some(file) = &self.image {
            staged.image = Some(
                store
                    .put(file.data.clone(), &file.filename, &file.content_type)
                    .await?,
            );
        }

        if let Some(file) = &self.pdf {
            match store
                .put(file.data.clone(), &file.filename, &file.content_type)
                .await
            {
                Ok(meta) => staged.pdf = Some(meta),
                Err(e) => {
                    if let Some(image) = &staged.image {
                        if let Err(del_err) = store.delete(&image.id).await {
                            tracing::warn!(
                                "failed to roll back staged image {}: {}",
                                image.id,
                                del_err
                            );
                        }
                    }
                    return Err(e);
                }
            }
        }

        Ok(staged)
    }
}

/// Read and validate a multipart request
///
/// `max_file_size` applies per file and is enforced as chunks arrive, so
/// an oversized upload is rejected without buffering the whole body.
pub async fn read_multipart(mut multipart: Multipart, max_file_size: usize) -> CmsResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        CmsError::Validation(format!("Malformed multipart request: {}", e))
    })? {
        let Some(name) = field.name().map(String::from) else {
            continue;
        };

        match name.as_str() {
            IMAGE_SLOT => {
                if form.image.is_some() {
                    return Err(CmsError::Validation(
                        "Only one file allowed in the image slot".to_string(),
                    ));
                }
                form.image = Some(read_file(field, IMAGE_TYPES, max_file_size).await?);
            }
            PDF_SLOT => {
                if form.pdf.is_some() {
                    return Err(CmsError::Validation(
                        "Only one file allowed in the pdf slot".to_string(),
                    ));
                }
                form.pdf = Some(read_file(field, PDF_TYPES, max_file_size).await?);
            }
            _ => {
                if field.file_name().is_some() {
                    return Err(CmsError::Validation(format!(
                        "Unexpected file field: {}",
                        name
                    )));
                }
                let value = field.text().await.map_err(|e| {
                    CmsError::Validation(format!("Unreadable field {}: {}", name, e))
                })?;
                form.fields.insert(name, value);
            }
        }
    }

    Ok(form)
}

/// Read one file field, checking type agreement before the body and the
/// size ceiling while it streams
async fn read_file(
    mut field: Field<'_>,
    allowed: &[(&str, &str)],
    max_file_size: usize,
) -> CmsResult<IncomingFile> {
    let filename = field
        .file_name()
        .map(String::from)
        .ok_or_else(|| CmsError::Validation("File field is missing a filename".to_string()))?;
    let content_type = field
        .content_type()
        .map(String::from)
        .ok_or_else(|| CmsError::Validation("File field is missing a content type".to_string()))?;

    check_file_type(&filename, &content_type, allowed)?;

    let mut data = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| CmsError::Validation(format!("Upload aborted: {}", e)))?
    {
        if data.len() + chunk.len() > max_file_size {
            return Err(CmsError::TooLarge(format!(
                "{} exceeds the {} byte limit",
                filename, max_file_size
            )));
        }
        data.extend_from_slice(&chunk);
    }

    Ok(IncomingFile {
        filename,
        content_type,
        data,
    })
}

/// Combined check: the file extension must be known for this slot AND the
/// declared content type must be the one that extension maps to.
/// Extension-only checks are spoofable; requiring agreement is the
/// stricter contract.
fn check_file_type(filename: &str, content_type: &str, allowed: &[(&str, &str)]) -> CmsResult<()> {
    let extension = filename
        .rsplit('.')
        .next()
        .filter(|ext| *ext != filename)
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| {
            CmsError::InvalidFileType(format!("{} has no file extension", filename))
        })?;

    let expected = allowed
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime)| *mime)
        .ok_or_else(|| {
            CmsError::InvalidFileType(format!(
                "Extension .{} is not allowed in this slot",
                extension
            ))
        })?;

    if !content_type.eq_ignore_ascii_case(expected) {
        return Err(CmsError::InvalidFileType(format!(
            "Declared type {} does not match extension .{}",
            content_type, extension
        )));
    }

    Ok(())
}
