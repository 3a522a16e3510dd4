//! Form materialization
//!
//! Applies a [`FieldMapping`] to a copy of a fillable PDF template. The
//! template is parsed once; every batch works on its own clone, so batches
//! share nothing mutable.
//!
//! Fields are matched by fully qualified name first, then by partial name.
//! Mapping keys without a matching field are ignored, and template fields
//! absent from the mapping keep their shipped (blank) value.

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

use crate::catalog::FormTypeSpec;
use crate::mapper::FieldMapping;
use crate::slots::Attribute;
use crate::{Error, Result};

/// Field tree nesting deeper than this is treated as malformed
const MAX_FIELD_DEPTH: usize = 32;

/// Text style used when neither the widget, the field nor the form sets `/DA`
const FALLBACK_DA: &str = "/Helv 0 Tf 0 g";

/// Font size used for auto-sized (`0 Tf`) fields
const AUTO_FONT_SIZE: f32 = 10.0;

/// Horizontal inset of field text from the widget edge
const TEXT_INSET: f32 = 2.0;

/// Per-form rendering quirks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RenderOptions {
    /// Ask viewers to regenerate field appearances (`/NeedAppearances`)
    pub need_appearances: bool,
    /// Keep the template's optional-content (layer) configuration
    pub preserve_optional_content: bool,
}

/// One terminal form field found in the template
#[derive(Debug, Clone)]
struct FieldNode {
    id: ObjectId,
    qualified_name: String,
    partial_name: String,
    widgets: Vec<ObjectId>,
}

/// Parsed fillable template
#[derive(Debug, Clone)]
pub struct FormTemplate {
    document: Document,
}

impl FormTemplate {
    /// Load a template from disk
    ///
    /// A missing file is reported as [`Error::TemplateNotFound`].
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::TemplateNotFound(path.display().to_string()));
        }
        let bytes = std::fs::read(path)?;
        let template = Self::from_bytes(&bytes)?;
        tracing::debug!(
            path = %path.display(),
            pages = template.page_count(),
            "Template loaded"
        );
        Ok(template)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self {
            document: Document::load_mem(bytes)?,
        })
    }

    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Every qualified and partial field name in the template
    pub fn field_names(&self) -> Result<BTreeSet<String>> {
        let mut names = BTreeSet::new();
        for node in collect_fields(&self.document)? {
            names.insert(node.partial_name);
            names.insert(node.qualified_name);
        }
        Ok(names)
    }

    /// Current `/V` text of every terminal field, keyed by qualified name
    pub fn field_values(&self) -> Result<BTreeMap<String, String>> {
        let mut values = BTreeMap::new();
        for node in collect_fields(&self.document)? {
            let dict = self.document.get_dictionary(node.id)?;
            let value = match dict.get(b"V") {
                Ok(Object::String(bytes, _)) => decode_text_string(bytes),
                _ => String::new(),
            };
            values.insert(node.qualified_name, value);
        }
        Ok(values)
    }

    /// Whether the document catalog carries an `/OCProperties` entry
    pub fn has_optional_content(&self) -> bool {
        catalog_id(&self.document)
            .and_then(|id| self.document.get_dictionary(id).map_err(Error::from))
            .map(|catalog| catalog.has(b"OCProperties"))
            .unwrap_or(false)
    }

    /// Whether the AcroForm dictionary sets `/NeedAppearances true`
    pub fn needs_appearances(&self) -> bool {
        acroform(&self.document)
            .ok()
            .and_then(|form| form.get(b"NeedAppearances").ok().cloned())
            .map(|flag| matches!(flag, Object::Boolean(true)))
            .unwrap_or(false)
    }

    /// Fill a clone of the template and serialize it
    pub fn materialize(
        &self,
        mapping: &FieldMapping,
        render: RenderOptions,
        pages: Option<&[u32]>,
    ) -> Result<Vec<u8>> {
        let mut document = self.document.clone();

        let filled = fill_fields(&mut document, mapping)?;
        tracing::trace!(filled, mapped = mapping.len(), "Fields filled");

        if render.need_appearances {
            set_need_appearances(&mut document)?;
        }
        if !render.preserve_optional_content {
            let root = catalog_id(&document)?;
            document.get_dictionary_mut(root)?.remove(b"OCProperties");
        }
        if let Some(keep) = pages {
            keep_pages(&mut document, keep)?;
        }

        let mut bytes = Vec::new();
        document.save_to(&mut bytes)?;
        Ok(bytes)
    }
}

/// Apply `mapping` onto a copy of `template`
pub fn materialize(
    template: &FormTemplate,
    mapping: &FieldMapping,
    render: RenderOptions,
) -> Result<Vec<u8>> {
    template.materialize(mapping, render, None)
}

fn catalog_id(document: &Document) -> Result<ObjectId> {
    Ok(document.trailer.get(b"Root")?.as_reference()?)
}

fn acroform(document: &Document) -> Result<&Dictionary> {
    let catalog = document.get_dictionary(catalog_id(document)?)?;
    match catalog.get(b"AcroForm")? {
        Object::Reference(id) => Ok(document.get_dictionary(*id)?),
        Object::Dictionary(dict) => Ok(dict),
        _ => Err(Error::Internal("AcroForm entry is not a dictionary".to_string())),
    }
}

fn set_need_appearances(document: &mut Document) -> Result<()> {
    let root = catalog_id(document)?;
    let form_ref = match document.get_dictionary(root)?.get(b"AcroForm") {
        Ok(Object::Reference(id)) => Some(*id),
        Ok(Object::Dictionary(_)) => None,
        // Templates without a form have nothing to regenerate
        _ => return Ok(()),
    };

    let form = match form_ref {
        Some(id) => document.get_dictionary_mut(id)?,
        None => document
            .get_dictionary_mut(root)?
            .get_mut(b"AcroForm")?
            .as_dict_mut()?,
    };
    form.set("NeedAppearances", Object::Boolean(true));
    Ok(())
}

fn keep_pages(document: &mut Document, keep: &[u32]) -> Result<()> {
    let keep: HashSet<u32> = keep.iter().copied().collect();
    let drop: Vec<u32> = document
        .get_pages()
        .keys()
        .copied()
        .filter(|n| !keep.contains(n))
        .collect();
    if !drop.is_empty() {
        document.delete_pages(&drop);
    }
    Ok(())
}

/// Walk the AcroForm field tree and return its terminal fields
fn collect_fields(document: &Document) -> Result<Vec<FieldNode>> {
    let form = match acroform(document) {
        Ok(form) => form,
        Err(_) => return Ok(Vec::new()),
    };
    let roots = match form.get(b"Fields") {
        Ok(Object::Array(items)) => items.clone(),
        Ok(Object::Reference(id)) => document.get_object(*id)?.as_array()?.clone(),
        _ => return Ok(Vec::new()),
    };

    let mut fields = Vec::new();
    let mut seen = HashSet::new();
    for item in roots {
        if let Object::Reference(id) = item {
            visit_field(document, id, "", 0, &mut seen, &mut fields)?;
        }
    }
    Ok(fields)
}

fn visit_field(
    document: &Document,
    id: ObjectId,
    parent_name: &str,
    depth: usize,
    seen: &mut HashSet<ObjectId>,
    out: &mut Vec<FieldNode>,
) -> Result<()> {
    if depth > MAX_FIELD_DEPTH || !seen.insert(id) {
        tracing::warn!(object = ?id, "Skipping cyclic or over-deep form field");
        return Ok(());
    }

    let dict = document.get_dictionary(id)?;
    let partial_name = match dict.get(b"T") {
        Ok(Object::String(bytes, _)) => decode_text_string(bytes),
        _ => String::new(),
    };
    let qualified_name = match (parent_name.is_empty(), partial_name.is_empty()) {
        (true, _) => partial_name.clone(),
        (false, true) => parent_name.to_string(),
        (false, false) => format!("{parent_name}.{partial_name}"),
    };

    let kids: Vec<ObjectId> = match dict.get(b"Kids") {
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|kid| kid.as_reference().ok())
            .collect(),
        _ => Vec::new(),
    };

    // Kids carrying a /T are child fields; the rest are widget annotations
    let (child_fields, widgets): (Vec<ObjectId>, Vec<ObjectId>) =
        kids.into_iter().partition(|kid| {
            document
                .get_dictionary(*kid)
                .map(|d| d.has(b"T"))
                .unwrap_or(false)
        });

    if child_fields.is_empty() {
        if !qualified_name.is_empty() {
            out.push(FieldNode {
                id,
                qualified_name,
                partial_name,
                widgets: if widgets.is_empty() { vec![id] } else { widgets },
            });
        }
        return Ok(());
    }

    for child in child_fields {
        visit_field(document, child, &qualified_name, depth + 1, seen, out)?;
    }
    Ok(())
}

/// Set `/V` on every mapped field and redraw its widgets
///
/// Returns how many fields were filled.
fn fill_fields(document: &mut Document, mapping: &FieldMapping) -> Result<usize> {
    let fields = collect_fields(document)?;
    let (form_da, form_resources) = match acroform(document) {
        Ok(form) => (
            text_entry(form, b"DA"),
            form.get(b"DR").ok().cloned(),
        ),
        Err(_) => (None, None),
    };
    let mut filled = 0;

    for node in fields {
        let value = mapping
            .get(&node.qualified_name)
            .or_else(|| mapping.get(&node.partial_name));
        let Some(value) = value else {
            continue;
        };

        let field_da = text_entry(document.get_dictionary(node.id)?, b"DA");
        document
            .get_dictionary_mut(node.id)?
            .set("V", text_string(value));

        for widget in &node.widgets {
            let widget_dict = document.get_dictionary(*widget)?;
            let da = text_entry(widget_dict, b"DA")
                .or_else(|| field_da.clone())
                .or_else(|| form_da.clone())
                .unwrap_or_else(|| FALLBACK_DA.to_string());
            let rect = widget_rect(widget_dict);

            // The shipped appearance shows the blank template value
            let appearance = rect.map(|(width, height)| {
                appearance_stream(value, &da, width, height, form_resources.as_ref())
            });
            match appearance {
                Some(stream) => {
                    let stream_id = document.add_object(stream);
                    document
                        .get_dictionary_mut(*widget)?
                        .set("AP", dictionary! { "N" => stream_id });
                }
                None => {
                    document.get_dictionary_mut(*widget)?.remove(b"AP");
                }
            }
        }
        filled += 1;
    }

    Ok(filled)
}

fn text_entry(dict: &Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key) {
        Ok(Object::String(bytes, _)) => Some(decode_text_string(bytes)),
        _ => None,
    }
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value as f32),
        _ => None,
    }
}

/// Width and height of a widget's `/Rect`
fn widget_rect(widget: &Dictionary) -> Option<(f32, f32)> {
    let corners: Vec<f32> = match widget.get(b"Rect") {
        Ok(Object::Array(items)) => items.iter().filter_map(number).collect(),
        _ => return None,
    };
    match corners.as_slice() {
        [x1, y1, x2, y2] => Some(((x2 - x1).abs(), (y2 - y1).abs())),
        _ => None,
    }
}

/// Single-line text appearance (`/Tx` form XObject) for `value`
///
/// The `/DA` font size is kept unless it is 0 (auto), which is replaced by a
/// size that fits the widget height.
fn appearance_stream(
    value: &str,
    da: &str,
    width: f32,
    height: f32,
    resources: Option<&Object>,
) -> Stream {
    let mut tokens: Vec<String> = da.split_whitespace().map(str::to_string).collect();
    let mut size = AUTO_FONT_SIZE;
    if let Some(tf) = tokens.iter().position(|t| t == "Tf") {
        if tf > 0 {
            let declared = tokens[tf - 1].parse::<f32>().unwrap_or(0.0);
            size = if declared > 0.0 {
                declared
            } else {
                AUTO_FONT_SIZE.min((height - 2.0 * TEXT_INSET).max(1.0))
            };
            tokens[tf - 1] = format_number(size);
        }
    }
    let baseline = ((height - size) / 2.0).max(0.0) + size * 0.22;

    let mut content = Vec::new();
    content.extend_from_slice(b"/Tx BMC\nq\nBT\n");
    content.extend_from_slice(tokens.join(" ").as_bytes());
    content.extend_from_slice(
        format!(
            "\n{} {} Td\n",
            format_number(TEXT_INSET),
            format_number(baseline)
        )
        .as_bytes(),
    );
    content.push(b'(');
    content.extend(escape_literal(value));
    content.extend_from_slice(b") Tj\nET\nQ\nEMC\n");

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Form",
        "BBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(width.round() as i64),
            Object::Integer(height.round() as i64),
        ],
    };
    if let Some(resources) = resources {
        dict.set("Resources", resources.clone());
    }
    Stream::new(dict, content)
}

fn format_number(value: f32) -> String {
    let text = format!("{value:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Latin-1 bytes of `value` escaped for a PDF literal string; other
/// characters become `?`
fn escape_literal(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '(' | ')' | '\\' => {
                out.push(b'\\');
                out.push(ch as u8);
            }
            '\u{0}'..='\u{ff}' => out.push(ch as u8),
            _ => out.push(b'?'),
        }
    }
    out
}

/// Encode a PDF text string; non-ASCII text is written as UTF-16BE
fn text_string(value: &str) -> Object {
    if value.is_ascii() {
        Object::string_literal(value)
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in value.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        Object::String(bytes, StringFormat::Hexadecimal)
    }
}

fn decode_text_string(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => bytes.iter().map(|&b| b as char).collect(),
    }
}

// ============================================================================
// Template audit
// ============================================================================

/// Fan-out group with no field present in the template
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeadFanOut {
    pub page: usize,
    pub slot: usize,
    pub candidates: Vec<String>,
}

/// Result of checking a form's slot table against its template
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TemplateAudit {
    /// Slot or host targets the template does not define
    pub missing: Vec<String>,
    pub dead_fan_outs: Vec<DeadFanOut>,
    /// Declared output pages beyond the template's page count
    pub invalid_pages: Vec<u32>,
}

impl TemplateAudit {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.dead_fan_outs.is_empty() && self.invalid_pages.is_empty()
    }
}

/// Compare the fields a form writes against the fields a template defines
///
/// Fan-out targets are expected to be partly missing; a fan-out group is only
/// reported when none of its candidates exists.
pub fn audit_template(
    spec: &FormTypeSpec,
    field_names: &BTreeSet<String>,
    page_count: usize,
) -> TemplateAudit {
    let mut audit = TemplateAudit::default();
    let mut missing = BTreeSet::new();

    for (field, _) in &spec.host_values {
        if !field_names.contains(field) {
            missing.insert(field.clone());
        }
    }

    for (page_idx, page) in spec.layout.pages().into_iter().enumerate() {
        for slot in &page.slots {
            for attribute in Attribute::ALL {
                let targets = slot.targets(attribute);
                if attribute == Attribute::Street && slot.has_address_fan_out() {
                    if !targets.iter().any(|t| field_names.contains(t)) {
                        audit.dead_fan_outs.push(DeadFanOut {
                            page: page_idx + 1,
                            slot: slot.ordinal,
                            candidates: targets.to_vec(),
                        });
                    }
                    continue;
                }
                missing.extend(targets.iter().filter(|t| !field_names.contains(*t)).cloned());
            }
            missing.extend(
                slot.clears
                    .iter()
                    .chain(slot.literals.iter().map(|(f, _)| f))
                    .chain(slot.ordinal_field.iter())
                    .filter(|t| !field_names.contains(*t))
                    .cloned(),
            );
        }
        if let Some(pages) = &page.pages {
            audit.invalid_pages.extend(
                pages
                    .iter()
                    .copied()
                    .filter(|&p| p as usize > page_count),
            );
        }
    }

    audit.missing = missing.into_iter().collect();
    audit
}
