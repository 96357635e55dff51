//! Content classification: decides whether submitted bytes are structured
//! imaging content and extracts the identifiers that shape the mount layout.
//!
//! Classification never fails. Anything the classifier cannot make sense of
//! is reported as unrecognised, or as recognised with missing fields, and the
//! layout falls back accordingly.

use chrono::NaiveDate;
use tracing::debug;

/// Outcome of classifying a blob's content.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Classification {
    /// Whether the bytes are a recognised imaging format.
    pub recognized: bool,
    /// Acquisition date used for the date hierarchy.
    pub date: Option<NaiveDate>,
    /// Outer hierarchical identifier (study).
    pub study: Option<String>,
    /// Inner hierarchical identifier (series).
    pub series: Option<String>,
}

impl Classification {
    pub fn unrecognized() -> Self {
        Self::default()
    }

    /// Study and series, when both were extracted.
    pub fn hierarchy(&self) -> Option<(&str, &str)> {
        match (&self.study, &self.series) {
            (Some(study), Some(series)) => Some((study.as_str(), series.as_str())),
            _ => None,
        }
    }
}

/// Host capability that classifies content and extracts hierarchy metadata.
pub trait ContentClassifier: Send + Sync {
    fn classify(&self, content: &[u8]) -> Classification;
}

/// Classifier that never recognises anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopClassifier;

impl ContentClassifier for NoopClassifier {
    fn classify(&self, _content: &[u8]) -> Classification {
        Classification::unrecognized()
    }
}

/// Recognises DICOM Part 10 files and reads StudyDate, StudyInstanceUID and
/// SeriesInstanceUID from the top-level dataset.
///
/// Only little-endian transfer syntaxes are walked. Big-endian and deflated
/// datasets are recognised but yield no metadata.
#[derive(Clone, Copy, Debug, Default)]
pub struct DicomClassifier;

const PREAMBLE_LEN: usize = 128;
const MAGIC: &[u8; 4] = b"DICM";
const MAX_UID_LEN: usize = 64;

const TS_IMPLICIT_LE: &str = "1.2.840.10008.1.2";
const TS_EXPLICIT_BE: &str = "1.2.840.10008.1.2.2";
const TS_DEFLATED_LE: &str = "1.2.840.10008.1.2.1.99";

type Tag = (u16, u16);

const META_GROUP: u16 = 0x0002;
const TRANSFER_SYNTAX: Tag = (0x0002, 0x0010);
const STUDY_DATE: Tag = (0x0008, 0x0020);
const STUDY_INSTANCE_UID: Tag = (0x0020, 0x000D);
const SERIES_INSTANCE_UID: Tag = (0x0020, 0x000E);

const UNDEFINED_LENGTH: u32 = 0xFFFF_FFFF;

/// Explicit VRs that use a reserved 2-byte field and a 4-byte length.
const LONG_VRS: &[&[u8; 2]] = &[
    b"OB", b"OD", b"OF", b"OL", b"OV", b"OW", b"SQ", b"SV", b"UC", b"UN", b"UR", b"UT", b"UV",
];

impl DicomClassifier {
    pub fn is_dicom(content: &[u8]) -> bool {
        content.len() >= PREAMBLE_LEN + MAGIC.len()
            && &content[PREAMBLE_LEN..PREAMBLE_LEN + MAGIC.len()] == MAGIC
    }
}

impl ContentClassifier for DicomClassifier {
    fn classify(&self, content: &[u8]) -> Classification {
        if !Self::is_dicom(content) {
            return Classification::unrecognized();
        }

        let mut result = Classification {
            recognized: true,
            ..Classification::default()
        };

        let mut reader = ElementReader::new(content, PREAMBLE_LEN + MAGIC.len());
        let mut transfer_syntax = None;

        // The meta group is always explicit VR little endian.
        while reader.peek_group() == Some(META_GROUP) {
            let Some(element) = reader.next(true) else {
                return result;
            };
            if element.tag == TRANSFER_SYNTAX {
                transfer_syntax = Some(text_value(element.value));
            }
        }

        let explicit = match transfer_syntax.as_deref() {
            Some(TS_EXPLICIT_BE) | Some(TS_DEFLATED_LE) => {
                debug!("dataset encoding not walked; skipping metadata extraction");
                return result;
            }
            Some(TS_IMPLICIT_LE) => false,
            _ => true,
        };

        while let Some(element) = reader.next(explicit) {
            match element.tag {
                STUDY_DATE => {
                    result.date =
                        NaiveDate::parse_from_str(&text_value(element.value), "%Y%m%d").ok();
                }
                STUDY_INSTANCE_UID => result.study = safe_uid(element.value),
                SERIES_INSTANCE_UID => {
                    result.series = safe_uid(element.value);
                    break;
                }
                tag if tag > SERIES_INSTANCE_UID => break,
                _ => {}
            }
        }

        result
    }
}

struct Element<'a> {
    tag: Tag,
    value: &'a [u8],
}

struct ElementReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ElementReader<'a> {
    fn new(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    fn u16_at(&self, pos: usize) -> Option<u16> {
        let bytes = self.data.get(pos..pos + 2)?;
        Some(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn u32_at(&self, pos: usize) -> Option<u32> {
        let bytes = self.data.get(pos..pos + 4)?;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn peek_group(&self) -> Option<u16> {
        self.u16_at(self.pos)
    }

    /// Read the next element. Returns `None` at end of data, on truncation,
    /// and on undefined-length elements (sequences we do not descend into).
    fn next(&mut self, explicit: bool) -> Option<Element<'a>> {
        let group = self.u16_at(self.pos)?;
        let element = self.u16_at(self.pos + 2)?;
        let mut pos = self.pos + 4;

        let length = if explicit && group != 0xFFFE {
            let vr: &[u8; 2] = self.data.get(pos..pos + 2)?.try_into().ok()?;
            pos += 2;
            if LONG_VRS.contains(&vr) {
                let length = self.u32_at(pos + 2)?;
                pos += 6;
                length
            } else {
                let length = u32::from(self.u16_at(pos)?);
                pos += 2;
                length
            }
        } else {
            let length = self.u32_at(pos)?;
            pos += 4;
            length
        };

        if length == UNDEFINED_LENGTH {
            return None;
        }

        let end = pos.checked_add(usize::try_from(length).ok()?)?;
        let value = self.data.get(pos..end)?;
        self.pos = end;
        Some(Element {
            tag: (group, element),
            value,
        })
    }
}

fn text_value(value: &[u8]) -> String {
    String::from_utf8_lossy(value)
        .trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .to_string()
}

/// UIDs become path components, so only digits and dots are accepted.
fn safe_uid(value: &[u8]) -> Option<String> {
    let uid = text_value(value);
    let well_formed = !uid.is_empty()
        && uid.len() <= MAX_UID_LEN
        && uid.starts_with(|c: char| c.is_ascii_digit())
        && uid.chars().all(|c| c.is_ascii_digit() || c == '.');
    well_formed.then_some(uid)
}
