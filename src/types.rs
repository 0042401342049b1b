use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct FamilyRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub members: Vec<FamilyMember>,
    #[serde(default)]
    pub members_text: String,
    #[serde(default)]
    pub photo: String,
    #[serde(default)]
    pub detail_url: String,
    #[serde(default)]
    pub contact: Contact,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct FamilyMember {
    pub name: String,
    #[serde(default)]
    pub role: String,
    pub age: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Contact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct StaffRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default)]
    pub photo: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct GroupRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub leaders: Vec<String>,
    #[serde(default)]
    pub photo: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct BirthdayRecord {
    pub name: String,
    pub date: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct AnniversaryRecord {
    pub family: String,
    pub date: String,
}

/// Both event lists, serialized side by side under their own keys.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct EventsExport {
    pub birthdays: Vec<BirthdayRecord>,
    pub anniversaries: Vec<AnniversaryRecord>,
}

impl EventsExport {
    pub fn total(&self) -> usize {
        self.birthdays.len() + self.anniversaries.len()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct PageRecord {
    pub id: String,
    pub title: String,
    pub url: String,
    pub content: String,
    #[serde(default)]
    pub asset_urls: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ExportMetadata {
    pub export_date: String,
    pub total_records: usize,
    pub source: String,
}

/// Per-category record counts plus every error collected during a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub families: usize,
    pub staff: usize,
    pub groups: usize,
    pub birthdays: usize,
    pub anniversaries: usize,
    pub pages: usize,
    pub errors: Vec<String>,
}

/// Anything carrying a single photo field that the downloader may rewrite.
pub trait HasPhoto {
    fn photo_mut(&mut self) -> &mut String;
}

impl HasPhoto for FamilyRecord {
    fn photo_mut(&mut self) -> &mut String {
        &mut self.photo
    }
}

impl HasPhoto for StaffRecord {
    fn photo_mut(&mut self) -> &mut String {
        &mut self.photo
    }
}

impl HasPhoto for GroupRecord {
    fn photo_mut(&mut self) -> &mut String {
        &mut self.photo
    }
}
