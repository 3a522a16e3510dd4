//! Form generation endpoint
//!
//! Accepts a multipart upload with a `csv_file` roster and a `form_type`
//! selection, fills the form in batches and answers with the zip archive.
//! Generation is CPU-bound and runs on the blocking pool.

use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use formfill_common::package::{create_run_dir, package_archive, write_outputs, ARCHIVE_NAME};
use formfill_common::pipeline::FormRunner;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Multipart field carrying the roster file
pub const FIELD_CSV_FILE: &str = "csv_file";
/// Multipart field carrying the form type key
pub const FIELD_FORM_TYPE: &str = "form_type";

/// Parsed upload
#[derive(Debug, Default)]
struct GenerateRequest {
    /// `None` when the part is absent; `Some(None)` when no file was chosen
    csv_file: Option<Option<Vec<u8>>>,
    form_type: Option<String>,
}

impl GenerateRequest {
    async fn from_multipart(multipart: &mut Multipart) -> ApiResult<Self> {
        let mut request = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Malformed upload: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                FIELD_CSV_FILE => {
                    let chosen = field.file_name().is_some_and(|n| !n.is_empty());
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::BadRequest(format!("Malformed upload: {}", e)))?;
                    // Browsers send an empty, unnamed part when no file is chosen
                    let file = (chosen || !bytes.is_empty()).then(|| bytes.to_vec());
                    request.csv_file = Some(file);
                }
                FIELD_FORM_TYPE => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| ApiError::BadRequest(format!("Malformed upload: {}", e)))?;
                    let text = text.trim();
                    if !text.is_empty() {
                        request.form_type = Some(text.to_string());
                    }
                }
                _ => {}
            }
        }

        Ok(request)
    }

    fn into_parts(self) -> ApiResult<(Vec<u8>, String)> {
        match (self.csv_file, self.form_type) {
            (None, _) => Err(ApiError::BadRequest("No file uploaded".to_string())),
            (Some(Some(csv)), Some(form_type)) => Ok((csv, form_type)),
            _ => Err(ApiError::BadRequest("Missing file or selection".to_string())),
        }
    }
}

/// POST / and POST /api/generate
pub async fn generate_forms(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Response> {
    let (csv, form_type) = GenerateRequest::from_multipart(&mut multipart)
        .await?
        .into_parts()?;
    info!(form = %form_type, bytes = csv.len(), "Roster received");

    let catalog = state.catalog.clone();
    let settings = state.settings.clone();
    let archive = tokio::task::spawn_blocking(move || -> formfill_common::Result<Vec<u8>> {
        let files = FormRunner::new(&catalog, settings.template_dir.clone())
            .strict_audit(settings.strict_template_audit)
            .run_csv(&form_type, csv.as_slice())?;
        let archive = package_archive(&files)?;

        let run_dir = create_run_dir(&settings.output_dir)?;
        write_outputs(&run_dir, &files)?;
        std::fs::write(run_dir.join(ARCHIVE_NAME), &archive)?;
        info!(
            form = %form_type,
            files = files.len(),
            run_dir = %run_dir.display(),
            "Forms generated"
        );

        Ok(archive)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Generation task failed: {}", e)))??;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", ARCHIVE_NAME),
            ),
        ],
        archive,
    )
        .into_response())
}
