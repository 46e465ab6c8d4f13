//! The closed set of field data types.

use crate::error::SieveError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Data type of a field. Decides which filter steps and which validator apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DataType {
    #[default]
    Text,
    Email,
    Url,
    Password,
    PhoneNumber,
    Date,
    Choice,
    Range,
    Int,
    PInt,
    NInt,
    Number,
    PNumber,
    NNumber,
    Money,
    Boolean,
    Checkbox,
    File,
    Image,
    Audio,
    Video,
    Media,
    Document,
    Archive,
}

/// Content category enforced by the file type presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileCategory {
    Image,
    Audio,
    Video,
    /// Union of image, audio and video.
    Media,
    Document,
    Archive,
}

impl FileCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileCategory::Image => "image",
            FileCategory::Audio => "audio",
            FileCategory::Video => "video",
            FileCategory::Media => "media",
            FileCategory::Document => "document",
            FileCategory::Archive => "archive",
        }
    }
}

impl DataType {
    pub const ALL: [DataType; 24] = [
        DataType::Text,
        DataType::Email,
        DataType::Url,
        DataType::Password,
        DataType::PhoneNumber,
        DataType::Date,
        DataType::Choice,
        DataType::Range,
        DataType::Int,
        DataType::PInt,
        DataType::NInt,
        DataType::Number,
        DataType::PNumber,
        DataType::NNumber,
        DataType::Money,
        DataType::Boolean,
        DataType::Checkbox,
        DataType::File,
        DataType::Image,
        DataType::Audio,
        DataType::Video,
        DataType::Media,
        DataType::Document,
        DataType::Archive,
    ];

    /// Name used in rule declarations.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Text => "text",
            DataType::Email => "email",
            DataType::Url => "url",
            DataType::Password => "password",
            DataType::PhoneNumber => "phoneNumber",
            DataType::Date => "date",
            DataType::Choice => "choice",
            DataType::Range => "range",
            DataType::Int => "int",
            DataType::PInt => "pInt",
            DataType::NInt => "nInt",
            DataType::Number => "number",
            DataType::PNumber => "pNumber",
            DataType::NNumber => "nNumber",
            DataType::Money => "money",
            DataType::Boolean => "boolean",
            DataType::Checkbox => "checkbox",
            DataType::File => "file",
            DataType::Image => "image",
            DataType::Audio => "audio",
            DataType::Video => "video",
            DataType::Media => "media",
            DataType::Document => "document",
            DataType::Archive => "archive",
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(
            self,
            DataType::File
                | DataType::Image
                | DataType::Audio
                | DataType::Video
                | DataType::Media
                | DataType::Document
                | DataType::Archive
        )
    }

    /// Category preset for file types; `None` for the generic file type.
    pub fn file_category(&self) -> Option<FileCategory> {
        match self {
            DataType::Image => Some(FileCategory::Image),
            DataType::Audio => Some(FileCategory::Audio),
            DataType::Video => Some(FileCategory::Video),
            DataType::Media => Some(FileCategory::Media),
            DataType::Document => Some(FileCategory::Document),
            DataType::Archive => Some(FileCategory::Archive),
            _ => None,
        }
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, DataType::Boolean | DataType::Checkbox)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, DataType::Int | DataType::PInt | DataType::NInt)
    }

    pub fn is_float(&self) -> bool {
        matches!(
            self,
            DataType::Number | DataType::PNumber | DataType::NNumber | DataType::Money
        )
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }
}

impl FromStr for DataType {
    type Err = SieveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim();
        DataType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(normalized))
            .or(match normalized {
                "bool" => Some(DataType::Boolean),
                "phone" => Some(DataType::PhoneNumber),
                "float" => Some(DataType::Number),
                _ => None,
            })
            .ok_or_else(|| SieveError::UnknownType(s.to_string()))
    }
}

impl TryFrom<String> for DataType {
    type Error = SieveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DataType> for String {
    fn from(value: DataType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
