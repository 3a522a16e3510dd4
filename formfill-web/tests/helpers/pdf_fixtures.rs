//! Synthetic fillable templates and rosters
//!
//! Real certification templates are not redistributable, so tests build
//! minimal AcroForm PDFs carrying exactly the fields a form writes.

use formfill_common::FormTypeSpec;
use lopdf::{dictionary, Document, Object, Stream};
use std::path::Path;

/// Write a template for `spec` into `dir`, one PDF page per layout page
pub fn install_template(dir: &Path, spec: &FormTypeSpec) {
    let mut pages: Vec<Vec<String>> = Vec::new();
    for (idx, layout) in spec.layout.pages().into_iter().enumerate() {
        let mut fields: Vec<String> = layout
            .slots
            .iter()
            .flat_map(|slot| slot.all_fields().map(str::to_string))
            .collect();
        if idx == 0 {
            fields.extend(spec.host_values.iter().map(|(f, _)| f.clone()));
        }
        fields.sort();
        fields.dedup();
        pages.push(fields);
    }
    std::fs::write(dir.join(spec.template_file()), build_pdf(&pages)).unwrap();
}

/// Flat text fields only; dotted names are kept as literal partial names
fn build_pdf(pages: &[Vec<String>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut page_refs = Vec::new();
    let mut field_refs = Vec::new();

    for names in pages {
        let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
        let page_id = doc.new_object_id();
        let mut annots = Vec::new();
        for (row, name) in names.iter().enumerate() {
            let top = 780 - (row as i64 % 38) * 20;
            let widget = doc.add_object(dictionary! {
                "Type" => "Annot",
                "Subtype" => "Widget",
                "FT" => "Tx",
                "T" => Object::string_literal(name.as_str()),
                "Rect" => vec![
                    Object::Integer(40),
                    Object::Integer(top - 15),
                    Object::Integer(280),
                    Object::Integer(top),
                ],
                "P" => page_id,
            });
            field_refs.push(Object::Reference(widget));
            annots.push(Object::Reference(widget));
        }
        doc.objects.insert(
            page_id,
            Object::Dictionary(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ],
                "Contents" => content_id,
                "Annots" => annots,
            }),
        );
        page_refs.push(Object::Reference(page_id));
    }

    let count = page_refs.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => page_refs,
            "Count" => count,
        }),
    );
    let acroform_id = doc.add_object(dictionary! { "Fields" => field_refs });
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
        "AcroForm" => acroform_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Value of the text field named `name` in a filled PDF
pub fn field_value(pdf: &[u8], name: &str) -> Option<String> {
    let doc = Document::load_mem(pdf).unwrap();
    doc.objects.values().find_map(|object| {
        let dict = object.as_dict().ok()?;
        match dict.get(b"T").ok()? {
            Object::String(title, _) if title.as_slice() == name.as_bytes() => {}
            _ => return None,
        }
        match dict.get(b"V") {
            Ok(Object::String(value, _)) => Some(String::from_utf8_lossy(value).into_owned()),
            _ => Some(String::new()),
        }
    })
}

/// Roster CSV with `count` attendees named "Last<n>, First<n>"
pub fn roster_csv(count: usize) -> Vec<u8> {
    let mut csv =
        String::from("AttendeeName,DateOfBirth,Street,City,PostalCode,E-mail,AttendeePhone\n");
    for n in 1..=count {
        csv.push_str(&format!(
            "\"Last{n}, First{n}\",03/04/2009,{n} Main St,Markham,L3P 3M2,p{n}@example.com,905-555-0100\n"
        ));
    }
    csv.into_bytes()
}
