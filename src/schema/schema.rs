use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};
use crate::analysis::analyzer::{KEYWORD_ANALYZER, STANDARD_ANALYZER};

/// Field holding the record identifier; always indexed as an exact keyword
pub const ID_FIELD: &str = "id";

/// Marker field name meaning "every text and keyword field"
pub const ALL_FIELDS: &str = "_all";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    /// Tokenized free text
    Text,
    /// Exact, untokenized string
    Keyword,
    Number,
    Date,
    Geometry,
}

impl FieldType {
    pub fn is_textual(&self) -> bool {
        matches!(self, FieldType::Text | FieldType::Keyword)
    }

    pub fn is_point(&self) -> bool {
        matches!(self, FieldType::Number | FieldType::Date)
    }
}

/// Field definition with analyzer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    pub field_type: FieldType,
    pub analyzer: Option<String>,  // Only meaningful for textual fields
}

impl FieldDefinition {
    pub fn analyzer_name(&self) -> &str {
        match (&self.analyzer, self.field_type) {
            (Some(name), _) => name,
            (None, FieldType::Keyword) => KEYWORD_ANALYZER,
            (None, _) => STANDARD_ANALYZER,
        }
    }
}

/// Declared field types, fixed when the index is built
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    pub fields: BTreeMap<String, FieldDefinition>,
    pub default_type: FieldType,
}

impl Schema {
    pub fn new() -> Self {
        Schema {
            fields: BTreeMap::new(),
            default_type: FieldType::Text,
        }
        .add_field(ID_FIELD, FieldType::Keyword, None)
    }

    /// Common fields of a metadata catalog (Dublin Core / ISO queryables)
    pub fn catalog_default() -> Self {
        Schema::new()
            .add_text_field("title")
            .add_text_field("abstract")
            .add_text_field("subject")
            .add_text_field("creator")
            .add_keyword_field("type")
            .add_keyword_field("format")
            .add_keyword_field("language")
            .add_keyword_field("parentidentifier")
            .add_date_field("modified")
            .add_date_field("date")
            .add_date_field("tempextent_begin")
            .add_date_field("tempextent_end")
            .add_number_field("denominator")
            .add_number_field("distancevalue")
            .add_geometry_field("boundingbox")
    }

    pub fn add_field(mut self, name: &str, field_type: FieldType, analyzer: Option<String>) -> Self {
        self.fields.insert(name.to_string(), FieldDefinition {
            name: name.to_string(),
            field_type,
            analyzer,
        });
        self
    }

    pub fn add_text_field(self, name: &str) -> Self {
        self.add_field(name, FieldType::Text, None)
    }

    pub fn add_keyword_field(self, name: &str) -> Self {
        self.add_field(name, FieldType::Keyword, None)
    }

    pub fn add_number_field(self, name: &str) -> Self {
        self.add_field(name, FieldType::Number, None)
    }

    pub fn add_date_field(self, name: &str) -> Self {
        self.add_field(name, FieldType::Date, None)
    }

    pub fn add_geometry_field(self, name: &str) -> Self {
        self.add_field(name, FieldType::Geometry, None)
    }

    pub fn get(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.get(name)
    }

    /// Declared type, or the default type for undeclared fields
    pub fn field_type(&self, name: &str) -> FieldType {
        self.fields
            .get(name)
            .map(|f| f.field_type)
            .unwrap_or(self.default_type)
    }

    pub fn analyzer_for(&self, name: &str) -> &str {
        match self.fields.get(name) {
            Some(def) => def.analyzer_name(),
            None if self.default_type == FieldType::Keyword => KEYWORD_ANALYZER,
            None => STANDARD_ANALYZER,
        }
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}
