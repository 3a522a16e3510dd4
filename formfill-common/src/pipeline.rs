//! End-to-end generation run
//!
//! [`FormRunner`] ties the stages together for one uploaded roster:
//! look up the form, load and audit its template, normalize the rows, plan
//! batches, map and materialize each batch. Any failure aborts the run; no
//! partial output is returned.

use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::batch::plan_layout;
use crate::catalog::{FormCatalog, FormTypeSpec};
use crate::mapper::build_field_mapping;
use crate::materialize::{audit_template, FormTemplate};
use crate::package::GeneratedFile;
use crate::roster::{normalize, read_roster, AttendeeRecord, RosterRow};
use crate::{Error, Result};

/// Runs roster → filled PDF generation against one template directory
pub struct FormRunner<'a> {
    catalog: &'a FormCatalog,
    template_dir: PathBuf,
    strict_audit: bool,
}

impl<'a> FormRunner<'a> {
    pub fn new(catalog: &'a FormCatalog, template_dir: impl Into<PathBuf>) -> Self {
        Self {
            catalog,
            template_dir: template_dir.into(),
            strict_audit: false,
        }
    }

    /// Treat dead fan-out groups and missing fields as fatal
    pub fn strict_audit(mut self, strict: bool) -> Self {
        self.strict_audit = strict;
        self
    }

    /// Path of the template used by `spec`
    pub fn template_path(&self, spec: &FormTypeSpec) -> PathBuf {
        self.template_dir.join(spec.template_file())
    }

    /// Generate the filled documents for `form_key` from already-parsed rows
    pub fn run(&self, form_key: &str, rows: &[RosterRow]) -> Result<Vec<GeneratedFile>> {
        let spec = self.catalog.lookup(form_key)?;
        let template_path = self.template_path(spec);
        if !template_path.is_file() {
            return Err(Error::TemplateNotFound(template_path.display().to_string()));
        }

        let template = FormTemplate::load(&template_path)?;
        self.check_template(spec, &template, &template_path)?;

        let records: Vec<AttendeeRecord> = rows
            .iter()
            .map(|row| normalize(row, spec.year_width))
            .collect();

        let batches = plan_layout(&records, &spec.layout);
        info!(
            form = spec.label(),
            records = records.len(),
            batches = batches.len(),
            "Generating forms"
        );

        let mut files = Vec::with_capacity(batches.len());
        for batch in batches {
            let mapping = build_field_mapping(spec, &batch);
            let page = spec.layout.page(batch.page);
            let bytes = template
                .materialize(&mapping, spec.render, page.pages.as_deref())
                .map_err(|e| {
                    Error::Internal(format!(
                        "{} batch {} could not be written: {}",
                        spec.label(),
                        batch.index,
                        e
                    ))
                })?;
            debug!(
                form = spec.label(),
                batch = batch.index,
                records = batch.len(),
                bytes = bytes.len(),
                "Batch materialized"
            );
            files.push(GeneratedFile::new(spec.output_file_name(batch.index), bytes));
        }

        Ok(files)
    }

    /// Parse a CSV roster and run it
    pub fn run_csv<R: Read>(&self, form_key: &str, reader: R) -> Result<Vec<GeneratedFile>> {
        // Resolve the form first so a bad selection is reported before a bad file
        self.catalog.lookup(form_key)?;
        let rows = read_roster(reader)?;
        self.run(form_key, &rows)
    }

    fn check_template(&self, spec: &FormTypeSpec, template: &FormTemplate, path: &Path) -> Result<()> {
        let names = template.field_names()?;
        let audit = audit_template(spec, &names, template.page_count());

        if !audit.invalid_pages.is_empty() {
            return Err(Error::Config(format!(
                "{}: template {} has {} page(s), layout needs pages {:?}",
                spec.label(),
                path.display(),
                template.page_count(),
                audit.invalid_pages
            )));
        }

        for dead in &audit.dead_fan_outs {
            warn!(
                form = spec.label(),
                page = dead.page,
                slot = dead.slot,
                "No address field of the fan-out group exists in the template"
            );
        }
        if !audit.missing.is_empty() {
            warn!(
                form = spec.label(),
                missing = audit.missing.len(),
                "Template lacks fields the form writes: {}",
                audit.missing.join(", ")
            );
        }

        if self.strict_audit && !audit.is_clean() {
            return Err(Error::Config(format!(
                "{}: template {} failed the field audit ({} missing field(s), {} dead fan-out group(s))",
                spec.label(),
                path.display(),
                audit.missing.len(),
                audit.dead_fan_outs.len()
            )));
        }
        Ok(())
    }
}
