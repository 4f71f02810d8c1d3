//! Filling the AcroForm text fields of a fillable application PDF.
//!
//! Field names are matched with or without the surrounding parentheses that
//! PDF string literals carry, so both `City` and `(City)` address the same
//! field.

use std::collections::HashSet;

use lopdf::{Dictionary, Document, Object, ObjectId};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::BusinessDetails;
use crate::FillError;

/// One fillable field found on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormField {
    pub name: String,
    /// Current value, if the field has one.
    pub value: Option<String>,
    /// Field type (`Tx`, `Btn`, `Ch`, `Sig`), or `Unknown`.
    pub kind: String,
}

/// A widget annotation and the object holding its field entries. For
/// fields with several widgets the holder is the shared parent.
struct WidgetField {
    holder: ObjectId,
    field: FormField,
}

fn bare(name: &str) -> &str {
    name.strip_prefix('(')
        .and_then(|n| n.strip_suffix(')'))
        .unwrap_or(name)
}

fn decode_text(bytes: &[u8]) -> String {
    match bytes.strip_prefix(&[0xFE, 0xFF]) {
        Some(utf16) => {
            let units: Vec<u16> = utf16
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        None => String::from_utf8_lossy(bytes).into_owned(),
    }
}

fn text_entry(dict: &Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key).ok()? {
        Object::String(bytes, _) => Some(decode_text(bytes)),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

fn is_widget(dict: &Dictionary) -> bool {
    dict.get(b"Subtype")
        .and_then(Object::as_name)
        .is_ok_and(|name| name == b"Widget")
}

/// Resolve the field entries of a widget, falling back to its parent when
/// the widget itself carries no `T`.
fn widget_field(doc: &Document, id: ObjectId, widget: &Dictionary) -> Option<WidgetField> {
    let (holder, dict) = if widget.has(b"T") {
        (id, widget)
    } else {
        let parent = widget.get(b"Parent").and_then(Object::as_reference).ok()?;
        (parent, doc.get_dictionary(parent).ok()?)
    };
    let name = text_entry(dict, b"T")?;
    let kind = text_entry(dict, b"FT")
        .or_else(|| text_entry(widget, b"FT"))
        .unwrap_or_else(|| "Unknown".to_string());
    Some(WidgetField {
        holder,
        field: FormField {
            name,
            value: text_entry(dict, b"V"),
            kind,
        },
    })
}

fn widget_fields(doc: &Document) -> Vec<WidgetField> {
    let mut found = Vec::new();
    for (page_number, page_id) in doc.get_pages() {
        let Ok(page) = doc.get_dictionary(page_id) else {
            continue;
        };
        let Ok(annots) = page.get(b"Annots") else {
            debug!(page = page_number, "no annotations on page");
            continue;
        };
        let annots = match doc.dereference(annots) {
            Ok((_, Object::Array(items))) => items,
            _ => {
                warn!(page = page_number, "annotations entry is not an array");
                continue;
            }
        };
        for annot in annots {
            let Ok(id) = annot.as_reference() else {
                continue;
            };
            let Ok(dict) = doc.get_dictionary(id) else {
                continue;
            };
            if is_widget(dict)
                && let Some(field) = widget_field(doc, id, dict)
            {
                found.push(field);
            }
        }
    }
    found
}

/// Every fillable field, in page order. A field with several widgets is
/// listed once.
pub fn list_fields(doc: &Document) -> Vec<FormField> {
    let mut holders = HashSet::new();
    widget_fields(doc)
        .into_iter()
        .filter(|w| holders.insert(w.holder))
        .map(|w| w.field)
        .collect()
}

/// Set the value of every field named in `values` and return how many
/// fields were written. Names the document does not have are logged and
/// skipped.
pub fn fill_fields(doc: &mut Document, values: &[(&str, &str)]) -> Result<usize, FillError> {
    let widgets = widget_fields(doc);
    for (name, _) in values {
        if !widgets.iter().any(|w| w.field.name == bare(name)) {
            warn!(field = %name, "field not found in PDF form");
        }
    }

    let mut written = HashSet::new();
    for widget in &widgets {
        let Some((_, value)) = values.iter().find(|(name, _)| bare(name) == widget.field.name) else {
            continue;
        };
        let holder = doc.get_object_mut(widget.holder)?.as_dict_mut()?;
        if widget.field.kind == "Btn" {
            holder.set("V", Object::Name(value.as_bytes().to_vec()));
            holder.set("AS", Object::Name(value.as_bytes().to_vec()));
        } else {
            holder.set("V", Object::string_literal(*value));
        }
        debug!(field = %widget.field.name, kind = %widget.field.kind, "filled field");
        written.insert(widget.holder);
    }

    if !written.is_empty() {
        request_appearances(doc)?;
    }
    info!(filled = written.len(), requested = values.len(), "filled PDF form");
    Ok(written.len())
}

/// Ask viewers to redraw field appearances from the new values.
fn request_appearances(doc: &mut Document) -> Result<(), FillError> {
    let root = doc.trailer.get(b"Root")?.as_reference()?;
    match doc.get_dictionary(root)?.get(b"AcroForm").ok().cloned() {
        Some(Object::Reference(id)) => {
            doc.get_object_mut(id)?
                .as_dict_mut()?
                .set("NeedAppearances", Object::Boolean(true));
        }
        Some(Object::Dictionary(_)) => {
            doc.get_object_mut(root)?
                .as_dict_mut()?
                .get_mut(b"AcroForm")?
                .as_dict_mut()?
                .set("NeedAppearances", Object::Boolean(true));
        }
        _ => warn!("document has no AcroForm dictionary"),
    }
    Ok(())
}

/// Load a PDF from bytes and list its fillable fields.
pub fn read_fields(template: &[u8]) -> Result<Vec<FormField>, FillError> {
    Ok(list_fields(&Document::load_mem(template)?))
}

/// Fill a business application PDF from extracted details and return the
/// new document bytes with the number of fields written.
pub fn fill_business_form(template: &[u8], details: &BusinessDetails) -> Result<(Vec<u8>, usize), FillError> {
    let mut doc = Document::load_mem(template)?;
    let filled = fill_fields(&mut doc, &details.pdf_field_values())?;
    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok((out, filled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    /// A one-page form with a plain text field, a text field split into a
    /// parent and one widget, and a checkbox.
    fn sample_form() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let rect = || Object::Array(vec![0.into(), 0.into(), 100.into(), 20.into()]);

        let owner = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "FT" => "Tx",
            "T" => Object::string_literal("Business Owner"),
            "Rect" => rect(),
        });
        let city = doc.add_object(dictionary! {
            "FT" => "Tx",
            "T" => Object::string_literal("City"),
        });
        let city_widget = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "Parent" => city,
            "Rect" => rect(),
        });
        doc.get_object_mut(city)
            .unwrap()
            .as_dict_mut()
            .unwrap()
            .set("Kids", vec![Object::from(city_widget)]);
        let llc = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "FT" => "Btn",
            "T" => Object::string_literal("LLC"),
            "Rect" => rect(),
        });
        let link = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Link",
            "Rect" => rect(),
        });

        let page = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Annots" => vec![owner.into(), city_widget.into(), llc.into(), link.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page.into()],
                "Count" => 1,
            }),
        );
        let acroform = doc.add_object(dictionary! {
            "Fields" => vec![owner.into(), city.into(), llc.into()],
        });
        let catalog = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
            "AcroForm" => acroform,
        });
        doc.trailer.set("Root", catalog);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    fn value_of(fields: &[FormField], name: &str) -> Option<String> {
        fields.iter().find(|f| f.name == name).and_then(|f| f.value.clone())
    }

    #[test]
    fn lists_widgets_and_skips_other_annotations() {
        let doc = Document::load_mem(&sample_form()).unwrap();
        let fields = list_fields(&doc);
        let summary: Vec<(&str, &str)> = fields.iter().map(|f| (f.name.as_str(), f.kind.as_str())).collect();
        assert_eq!(summary, [("Business Owner", "Tx"), ("City", "Tx"), ("LLC", "Btn")]);
        assert!(fields.iter().all(|f| f.value.is_none()));
    }

    #[test]
    fn fills_by_bare_or_parenthesised_name() {
        let mut doc = Document::load_mem(&sample_form()).unwrap();
        let filled = fill_fields(
            &mut doc,
            &[
                ("(Business Owner)", "John Smith"),
                ("City", "Los Angeles"),
                ("LLC", "Yes"),
                ("(Square Footage)", "2000"),
            ],
        )
        .unwrap();
        assert_eq!(filled, 3);

        let fields = list_fields(&doc);
        assert_eq!(value_of(&fields, "Business Owner").as_deref(), Some("John Smith"));
        assert_eq!(value_of(&fields, "City").as_deref(), Some("Los Angeles"));
        assert_eq!(value_of(&fields, "LLC").as_deref(), Some("Yes"));
    }

    #[test]
    fn business_details_survive_a_save_and_reload() {
        let details = BusinessDetails {
            business_owner_name: "John Smith".into(),
            city: "Los Angeles".into(),
            zip_code: "90001".into(),
            ..BusinessDetails::default()
        };
        let (bytes, filled) = fill_business_form(&sample_form(), &details).unwrap();
        // The sample has no Zip field.
        assert_eq!(filled, 2);

        let doc = Document::load_mem(&bytes).unwrap();
        let fields = list_fields(&doc);
        assert_eq!(value_of(&fields, "Business Owner").as_deref(), Some("John Smith"));
        assert_eq!(value_of(&fields, "City").as_deref(), Some("Los Angeles"));

        let root = doc.trailer.get(b"Root").unwrap().as_reference().unwrap();
        let acroform = doc
            .get_dictionary(root)
            .unwrap()
            .get(b"AcroForm")
            .unwrap()
            .as_reference()
            .unwrap();
        let needs = doc.get_dictionary(acroform).unwrap().get(b"NeedAppearances").unwrap();
        assert!(needs.as_bool().unwrap());
    }

    #[test]
    fn unreadable_template_is_an_error() {
        let err = fill_business_form(b"not a pdf", &BusinessDetails::default()).unwrap_err();
        assert!(matches!(err, FillError::Pdf(_)));
        assert!(matches!(read_fields(b""), Err(FillError::Pdf(_))));
    }

    #[test]
    fn utf16_names_are_decoded() {
        assert_eq!(decode_text(&[0xFE, 0xFF, 0x00, b'Z', 0x00, b'i', 0x00, b'p']), "Zip");
        assert_eq!(decode_text(b"City"), "City");
        assert_eq!(bare("(City)"), "City");
        assert_eq!(bare("City"), "City");
    }
}
