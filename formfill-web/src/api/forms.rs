//! Form type listing
//!
//! Reports every form the service knows about and whether its template is
//! installed, so operators can spot a missing PDF before anyone uploads.

use axum::{extract::State, Json};
use formfill_common::catalog::FormSummary;
use serde::Serialize;

use crate::AppState;

/// One entry of GET /api/forms
#[derive(Debug, Serialize)]
pub struct FormEntry {
    #[serde(flatten)]
    pub summary: FormSummary,
    pub template_present: bool,
}

/// GET /api/forms
pub async fn list_forms(State(state): State<AppState>) -> Json<Vec<FormEntry>> {
    let template_dir = &state.settings.template_dir;
    let forms = state
        .catalog
        .iter()
        .map(|spec| FormEntry {
            summary: spec.summary(),
            template_present: template_dir.join(spec.template_file()).is_file(),
        })
        .collect();
    Json(forms)
}
