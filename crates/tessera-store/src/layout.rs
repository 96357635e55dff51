//! Mount-address layout: where the bytes of a blob actually live.

use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use tessera_types::{BlobId, LayoutPolicy};

use crate::address::sharded_path;
use crate::classify::Classification;

/// Namespace for recognised imaging content.
pub const IMAGING_NAMESPACE: &str = "dicom";

/// Namespace for everything else.
pub const ATTACHMENTS_NAMESPACE: &str = "attachments";

/// Flat sharded path used for unrecognised content.
pub fn attachment_path(mount: &Path, id: &BlobId) -> PathBuf {
    sharded_path(&mount.join(ATTACHMENTS_NAMESPACE), id)
}

/// Compute the mount address for a blob.
///
/// Recognised content goes under a `YYYY/MM/DD` hierarchy, using the
/// extracted date or `today` when none was found. With the full policy and
/// both hierarchical identifiers available the date is followed by
/// `study/series`; otherwise by the id shards.
pub fn mount_path(
    mount: &Path,
    id: &BlobId,
    classification: &Classification,
    policy: LayoutPolicy,
    today: NaiveDate,
) -> PathBuf {
    if !classification.recognized {
        return attachment_path(mount, id);
    }

    let date = classification.date.unwrap_or(today);
    let dated = mount
        .join(IMAGING_NAMESPACE)
        .join(format!("{:04}", date.year()))
        .join(format!("{:02}", date.month()))
        .join(format!("{:02}", date.day()));

    match classification.hierarchy() {
        Some((study, series)) if policy.is_full() => {
            dated.join(study).join(series).join(id.as_str())
        }
        _ => sharded_path(&dated, id),
    }
}
