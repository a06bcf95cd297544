//! Image upload buckets.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum UploadBucket {
    CategoryImages,
    StaffAvatars,
}

impl UploadBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadBucket::CategoryImages => "category-images",
            UploadBucket::StaffAvatars => "staff-avatars",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "category-images" => Some(UploadBucket::CategoryImages),
            "staff-avatars" => Some(UploadBucket::StaffAvatars),
            _ => None,
        }
    }

    /// Category artwork is managed by admins only.
    pub fn requires_admin(&self) -> bool {
        matches!(self, UploadBucket::CategoryImages)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedImage {
    pub bucket: UploadBucket,
    /// Path relative to the bucket root.
    pub path: String,
    pub url: String,
}
