use std::collections::HashMap;

use axum::extract::Multipart;

use crate::error::AppResult;
use crate::social::content::Upload;

/// A multipart body split into text fields and at most one file.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    pub file: Option<Upload>,
}

impl MultipartForm {
    /// Drain `multipart`. The first part carrying a filename under `file_field`
    /// becomes the upload; an empty file input is treated as absent.
    pub async fn read(mut multipart: Multipart, file_field: &str) -> AppResult<Self> {
        let mut form = MultipartForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(filename) if name == file_field => {
                    let bytes = field.bytes().await?;
                    if form.file.is_none() && !filename.is_empty() && !bytes.is_empty() {
                        form.file = Some(Upload {
                            filename,
                            bytes: bytes.to_vec(),
                        });
                    }
                }
                Some(_) => {
                    // Unexpected file part: consume and ignore.
                    field.bytes().await?;
                }
                None => {
                    let value = field.text().await?;
                    form.fields.insert(name, value);
                }
            }
        }

        Ok(form)
    }

    /// A text field, or empty when it was not submitted.
    pub fn text(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }
}
