//! lopdf object lookups shared by the structural pass and the embedded-image
//! renderer. Nothing here decompresses a stream.

use lopdf::{Dictionary, Document, Object, Stream};

use super::pdf_error;
use crate::error::LoadError;

/// US Letter in points, used when no MediaBox can be found
const DEFAULT_PAGE_SIZE: (f64, f64) = (612.0, 792.0);
const MAX_INHERITANCE_DEPTH: usize = 32;

/// An image XObject on the page with its declared size
pub(super) struct PageImage<'a> {
    pub stream: &'a Stream,
    pub width: u32,
    pub height: u32,
}

impl PageImage<'_> {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Page one's dictionary. Later pages are never looked at.
pub(super) fn first_page(doc: &Document) -> Result<&Dictionary, LoadError> {
    let pages = doc.get_pages();
    let &page_id = pages.values().next().ok_or(LoadError::NoPages)?;
    tracing::debug!(page_count = pages.len(), "opened PDF");

    doc.get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|e| pdf_error(format!("page object error: {e}")))
}

/// Page size in points from the (possibly inherited) MediaBox
pub(super) fn page_box(doc: &Document, page: &Dictionary) -> (f64, f64) {
    let Some(Object::Array(values)) = inherited(doc, page, b"MediaBox") else {
        return DEFAULT_PAGE_SIZE;
    };
    let coords: Vec<f64> = values
        .iter()
        .filter_map(|v| number(resolve(doc, v)))
        .collect();
    match coords.as_slice() {
        [x0, y0, x1, y1] if (x1 - x0).abs() > 0.0 && (y1 - y0).abs() > 0.0 => {
            ((x1 - x0).abs(), (y1 - y0).abs())
        }
        _ => DEFAULT_PAGE_SIZE,
    }
}

/// Image XObjects in the page resources, masks excluded
pub(super) fn page_images<'a>(doc: &'a Document, page: &'a Dictionary) -> Vec<PageImage<'a>> {
    let Some(xobjects) = inherited(doc, page, b"Resources")
        .and_then(|r| r.as_dict().ok())
        .and_then(|r| r.get(b"XObject").ok())
        .and_then(|x| resolve(doc, x).as_dict().ok())
    else {
        return Vec::new();
    };

    xobjects
        .iter()
        .filter_map(|(_name, entry)| {
            let Object::Stream(stream) = resolve(doc, entry) else {
                return None;
            };
            if !has_name(&stream.dict, b"Subtype", b"Image") || is_image_mask(&stream.dict) {
                return None;
            }
            Some(PageImage {
                stream,
                width: dict_u32(doc, &stream.dict, b"Width")?,
                height: dict_u32(doc, &stream.dict, b"Height")?,
            })
        })
        .collect()
}

/// The image with the most pixels. Ties keep the first in resource order.
pub(super) fn largest<'i, 'a>(images: &'i [PageImage<'a>]) -> Option<&'i PageImage<'a>> {
    images
        .iter()
        .reduce(|best, image| if image.area() > best.area() { image } else { best })
}

/// Look `key` up on the page, walking /Parent for inheritable attributes
fn inherited<'a>(doc: &'a Document, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut current = page;
    for _ in 0..MAX_INHERITANCE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(resolve(doc, value));
        }
        let parent = current.get(b"Parent").ok()?;
        current = resolve(doc, parent).as_dict().ok()?;
    }
    None
}

pub(super) fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        other => other,
    }
}

fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

pub(super) fn dict_u32(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<u32> {
    let value = number(resolve(doc, dict.get(key).ok()?))?;
    (value >= 0.0 && value <= u32::MAX as f64).then_some(value as u32)
}

fn has_name(dict: &Dictionary, key: &[u8], expected: &[u8]) -> bool {
    matches!(dict.get(key), Ok(Object::Name(name)) if name == expected)
}

fn is_image_mask(dict: &Dictionary) -> bool {
    matches!(dict.get(b"ImageMask"), Ok(Object::Boolean(true)))
}

/// Stream filters in application order
pub(super) fn filter_names(dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|o| o.as_name().ok().map(|n| n.to_vec()))
            .collect(),
        _ => Vec::new(),
    }
}
