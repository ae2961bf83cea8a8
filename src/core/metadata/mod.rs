//! # Metadata Module
//!
//! Reads the embedded EXIF block of an uploaded file.
//!
//! ## Extracted Fields
//! - Every primary-image tag, as a name → display-value map
//! - Camera make and model
//! - Software (used to spot generator signatures)
//! - Date taken (DateTimeOriginal)
//!
//! ## Supported Containers
//! JPEG, PNG and WEBP as understood by kamadak-exif. A missing or malformed
//! block yields an empty [`EmbeddedMetadata`]; it is never an error.

use chrono::{DateTime, NaiveDateTime, Utc};
use exif::{Exif, In, Reader, Tag, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Cursor;

/// Metadata embedded in the uploaded file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedMetadata {
    /// Primary-image EXIF tags keyed by tag name
    pub fields: BTreeMap<String, String>,
    /// Camera make (e.g., "Canon")
    pub camera_make: Option<String>,
    /// Camera model (e.g., "EOS R5")
    pub camera_model: Option<String>,
    /// Software that last wrote the file
    pub software: Option<String>,
    /// Original capture date/time
    pub date_taken: Option<DateTime<Utc>>,
}

impl EmbeddedMetadata {
    /// Whether any EXIF tag was found
    pub fn has_exif(&self) -> bool {
        !self.fields.is_empty()
    }

    /// Number of distinct EXIF tags
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Whether the block names the capturing device
    pub fn has_capture_device(&self) -> bool {
        self.camera_make.is_some() || self.camera_model.is_some()
    }

    /// Get a display string for the camera
    pub fn camera_display(&self) -> Option<String> {
        match (&self.camera_make, &self.camera_model) {
            (Some(make), Some(model)) => {
                // Avoid duplication like "Apple Apple iPhone"
                if model.starts_with(make.as_str()) {
                    Some(model.clone())
                } else {
                    Some(format!("{} {}", make, model))
                }
            }
            (None, Some(model)) => Some(model.clone()),
            (Some(make), None) => Some(make.clone()),
            (None, None) => None,
        }
    }
}

/// Extract EXIF metadata from an in-memory file
pub fn extract_metadata(bytes: &[u8]) -> EmbeddedMetadata {
    let mut cursor = Cursor::new(bytes);
    match Reader::new().read_from_container(&mut cursor) {
        Ok(exif) => from_exif(&exif),
        Err(e) => {
            tracing::trace!(error = %e, "no readable EXIF block");
            EmbeddedMetadata::default()
        }
    }
}

fn from_exif(exif: &Exif) -> EmbeddedMetadata {
    let mut metadata = EmbeddedMetadata::default();

    for field in exif.fields().filter(|f| f.ifd_num == In::PRIMARY) {
        metadata.fields.insert(
            field.tag.to_string(),
            field.display_value().with_unit(exif).to_string(),
        );
    }

    if let Some(field) = exif.get_field(Tag::Make, In::PRIMARY) {
        metadata.camera_make = get_string_value(&field.value);
    }
    if let Some(field) = exif.get_field(Tag::Model, In::PRIMARY) {
        metadata.camera_model = get_string_value(&field.value);
    }
    if let Some(field) = exif.get_field(Tag::Software, In::PRIMARY) {
        metadata.software = get_string_value(&field.value);
    }

    // EXIF date format: "YYYY:MM:DD HH:MM:SS"
    if let Some(field) = exif.get_field(Tag::DateTimeOriginal, In::PRIMARY) {
        metadata.date_taken = get_string_value(&field.value)
            .and_then(|s| NaiveDateTime::parse_from_str(&s, "%Y:%m:%d %H:%M:%S").ok())
            .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc));
    }

    metadata
}

/// Helper to extract string from EXIF ASCII value
fn get_string_value(value: &Value) -> Option<String> {
    if let Value::Ascii(ref vec) = value {
        let bytes = vec.first()?;
        let s = std::str::from_utf8(bytes).ok()?;
        let trimmed = s.trim_end_matches('\0').trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_no_exif() {
        let meta = EmbeddedMetadata::default();
        assert!(!meta.has_exif());
        assert_eq!(meta.field_count(), 0);
        assert!(!meta.has_capture_device());
    }

    #[test]
    fn camera_display_combines_make_model() {
        let meta = EmbeddedMetadata {
            camera_make: Some("Canon".to_string()),
            camera_model: Some("EOS R5".to_string()),
            ..Default::default()
        };
        assert_eq!(meta.camera_display(), Some("Canon EOS R5".to_string()));
        assert!(meta.has_capture_device());
    }

    #[test]
    fn camera_display_avoids_duplication() {
        let meta = EmbeddedMetadata {
            camera_make: Some("Apple".to_string()),
            camera_model: Some("Apple iPhone 15 Pro".to_string()),
            ..Default::default()
        };
        assert_eq!(
            meta.camera_display(),
            Some("Apple iPhone 15 Pro".to_string())
        );
    }

    #[test]
    fn garbage_bytes_yield_empty_metadata() {
        let meta = extract_metadata(b"definitely not an image container");
        assert_eq!(meta, EmbeddedMetadata::default());
    }

    #[test]
    fn ascii_value_is_trimmed() {
        let value = Value::Ascii(vec![b"Nikon\0\0".to_vec()]);
        assert_eq!(get_string_value(&value), Some("Nikon".to_string()));

        let empty = Value::Ascii(vec![b"\0".to_vec()]);
        assert_eq!(get_string_value(&empty), None);
    }

    /// Little-endian TIFF: Software in IFD0, DateTimeOriginal in the Exif IFD
    fn software_tiff(software: &str, taken: &str) -> Vec<u8> {
        fn ifd(out: &mut Vec<u8>, entries: &[(u16, u16, u32, u32)]) {
            out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
            for &(tag, kind, count, value) in entries {
                out.extend_from_slice(&tag.to_le_bytes());
                out.extend_from_slice(&kind.to_le_bytes());
                out.extend_from_slice(&count.to_le_bytes());
                out.extend_from_slice(&value.to_le_bytes());
            }
            out.extend_from_slice(&0u32.to_le_bytes());
        }

        let software = [software.as_bytes(), b"\0"].concat();
        let taken = [taken.as_bytes(), b"\0"].concat();
        let exif_ifd: u32 = 8 + 2 + 2 * 12 + 4;
        let software_at = exif_ifd + 2 + 12 + 4;
        let taken_at = software_at + software.len() as u32;

        let mut tiff = b"II\x2a\x00\x08\x00\x00\x00".to_vec();
        ifd(
            &mut tiff,
            &[(0x0131, 2, software.len() as u32, software_at), (0x8769, 4, 1, exif_ifd)],
        );
        ifd(&mut tiff, &[(0x9003, 2, taken.len() as u32, taken_at)]);
        tiff.extend_from_slice(&software);
        tiff.extend_from_slice(&taken);
        tiff
    }

    #[test]
    fn reads_software_and_capture_date() {
        let tiff = software_tiff("Stable Diffusion XL", "2023:11:20 08:15:42");
        let exif = Reader::new().read_raw(tiff).unwrap();
        let meta = from_exif(&exif);

        assert!(meta.has_exif());
        assert!(meta.fields.contains_key("Software"));
        assert_eq!(meta.software.as_deref(), Some("Stable Diffusion XL"));
        assert!(!meta.has_capture_device());
        assert_eq!(
            meta.date_taken.map(|d| d.to_rfc3339()),
            Some("2023-11-20T08:15:42+00:00".to_string())
        );
    }

    #[test]
    fn unparseable_capture_date_is_dropped() {
        let tiff = software_tiff("GIMP 2.10", "sometime last week");
        let meta = from_exif(&Reader::new().read_raw(tiff).unwrap());
        assert_eq!(meta.software.as_deref(), Some("GIMP 2.10"));
        assert_eq!(meta.date_taken, None);
    }
}
