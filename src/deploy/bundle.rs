//! The set of files published for one task.
//!
//! A bundle is the merge of generated app files (from the generation service
//! or a fallback template) and the request's attachments. Generated content
//! always wins: an attachment only lands in the bundle when no generated
//! file has the same path.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use regex::Regex;

use super::models::Attachment;
use crate::errors::InputError;

static DATA_URI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^data:([\w/\-+.]+)((?:;[\w\-+.]+=[^;,]*)*)(;base64)?,(.*)$")
        .expect("data URI pattern is valid")
});

/// Standard alphabet, tolerant of missing padding.
const BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// An attachment after its data URI has been decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedAttachment {
    pub name: String,
    pub mime: String,
    pub content: Vec<u8>,
}

/// Where a bundle file came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOrigin {
    Generated,
    Attachment,
}

/// A file in the bundle, borrowed for iteration.
#[derive(Debug, Clone, Copy)]
pub struct BundleFile<'a> {
    pub path: &'a str,
    pub content: &'a [u8],
    pub origin: FileOrigin,
}

/// Decode a `data:` URI into its media type and raw bytes.
pub fn decode_data_uri(name: &str, uri: &str) -> Result<(String, Vec<u8>), InputError> {
    let caps = DATA_URI_RE
        .captures(uri.trim())
        .ok_or_else(|| InputError::InvalidDataUri {
            name: name.to_string(),
        })?;
    let mime = caps[1].to_lowercase();
    let payload = &caps[4];

    let content = if caps.get(3).is_some() {
        let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        BASE64
            .decode(compact.as_bytes())
            .map_err(|source| InputError::InvalidBase64 {
                name: name.to_string(),
                source,
            })?
    } else {
        urlencoding::decode_binary(payload.as_bytes()).into_owned()
    };
    Ok((mime, content))
}

/// Whether `path` stays inside the repository it is written to: non-empty,
/// `/`-separated, with no empty, `.` or `..` segments and no backslashes.
pub fn is_safe_relative_path(path: &str) -> bool {
    !path.is_empty()
        && !path.contains('\\')
        && path
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}

/// Decode every attachment, preserving request order. A repeated name keeps
/// its first position and takes the later content.
pub fn decode_attachments(attachments: &[Attachment]) -> Result<Vec<DecodedAttachment>, InputError> {
    let mut decoded: Vec<DecodedAttachment> = Vec::with_capacity(attachments.len());
    for attachment in attachments {
        let name = attachment.name.trim().trim_start_matches('/');
        if name.is_empty() {
            return Err(InputError::EmptyAttachmentName);
        }
        if !is_safe_relative_path(name) {
            return Err(InputError::InvalidAttachmentPath {
                name: name.to_string(),
            });
        }
        let (mime, content) = decode_data_uri(name, &attachment.url)?;
        match decoded.iter_mut().find(|d| d.name == name) {
            Some(existing) => {
                existing.mime = mime;
                existing.content = content;
            }
            None => decoded.push(DecodedAttachment {
                name: name.to_string(),
                mime,
                content,
            }),
        }
    }
    Ok(decoded)
}

/// Files to publish, keyed by case-sensitive relative path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileBundle {
    generated: BTreeMap<String, Vec<u8>>,
    attachments: Vec<(String, Vec<u8>)>,
}

impl FileBundle {
    /// Merge generated files with decoded attachments.
    pub fn merge(generated: BTreeMap<String, Vec<u8>>, attachments: Vec<DecodedAttachment>) -> Self {
        let attachments = attachments
            .into_iter()
            .filter(|a| !generated.contains_key(&a.name))
            .map(|a| (a.name, a.content))
            .collect();
        Self {
            generated,
            attachments,
        }
    }

    /// Generated files in path order, then attachment-only files in request order.
    pub fn iter(&self) -> impl Iterator<Item = BundleFile<'_>> {
        let generated = self.generated.iter().map(|(path, content)| BundleFile {
            path,
            content,
            origin: FileOrigin::Generated,
        });
        let attachments = self.attachments.iter().map(|(path, content)| BundleFile {
            path,
            content,
            origin: FileOrigin::Attachment,
        });
        generated.chain(attachments)
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.generated
            .get(path)
            .map(Vec::as_slice)
            .or_else(|| {
                self.attachments
                    .iter()
                    .find(|(p, _)| p == path)
                    .map(|(_, c)| c.as_slice())
            })
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn paths(&self) -> Vec<&str> {
        self.iter().map(|f| f.path).collect()
    }

    pub fn len(&self) -> usize {
        self.generated.len() + self.attachments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
