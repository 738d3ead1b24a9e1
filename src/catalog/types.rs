use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lower-cased state name -> absolute state catalog URL.
pub type StateIndex = BTreeMap<String, String>;

/// Placeholders substituted when a site page lacks the corresponding element.
/// The values carry no meaning beyond "not found on the page".
pub const DEFAULT_CITY: &str = "Yosemite";
pub const DEFAULT_REGION: &str = "CA";
pub const DEFAULT_ZIPCODE: &str = "95389";
pub const DEFAULT_PHONE: &str = "no phone";

/// Secondary site fields that may be filled from a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteField {
    Category,
    City,
    Region,
    Zipcode,
    Phone,
}

impl fmt::Display for SiteField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SiteField::Category => "category",
            SiteField::City => "city",
            SiteField::Region => "region",
            SiteField::Zipcode => "zipcode",
            SiteField::Phone => "phone",
        };
        f.write_str(name)
    }
}

/// Why a field could not be read from the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultedReason {
    /// The enclosing block (e.g. the mailing address) is absent.
    MissingSection(&'static str),
    /// The block exists but the element inside it does not.
    MissingElement(&'static str),
    /// The element exists but holds no usable text.
    Empty(&'static str),
}

impl fmt::Display for DefaultedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultedReason::MissingSection(s) => write!(f, "missing section {}", s),
            DefaultedReason::MissingElement(s) => write!(f, "missing element {}", s),
            DefaultedReason::Empty(s) => write!(f, "empty element {}", s),
        }
    }
}

/// Outcome of extracting one optional field.
pub type Extracted = Result<String, DefaultedReason>;

/// A national park site as shown in listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub name: String,
    /// e.g. "National Park"; some sites carry a blank designation.
    pub category: Option<String>,
    /// "City, ST"
    pub address: String,
    pub zipcode: String,
    pub phone: String,
    /// Fields filled from a placeholder rather than the page.
    pub defaulted: BTreeSet<SiteField>,
}

impl Site {
    pub fn info(&self) -> String {
        format!(
            "{} ({}): {} {}",
            self.name,
            self.category.as_deref().unwrap_or(""),
            self.address,
            self.zipcode
        )
    }

    pub fn is_defaulted(&self, field: SiteField) -> bool {
        self.defaulted.contains(&field)
    }

    /// Cache record: `[name, address, zipcode, phone, category, defaulted]`.
    /// The trailing defaulted list is optional when reading.
    pub fn to_record(&self) -> Value {
        Value::Array(vec![
            Value::String(self.name.clone()),
            Value::String(self.address.clone()),
            Value::String(self.zipcode.clone()),
            Value::String(self.phone.clone()),
            self.category
                .as_ref()
                .map(|c| Value::String(c.clone()))
                .unwrap_or(Value::Null),
            serde_json::to_value(&self.defaulted).unwrap_or(Value::Array(vec![])),
        ])
    }

    pub fn from_record(record: &Value) -> Option<Self> {
        let fields = record.as_array()?;
        if fields.len() < 5 {
            return None;
        }
        let text = |i: usize| fields[i].as_str().map(str::to_string);

        let category = match &fields[4] {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            _ => return None,
        };
        let defaulted = fields
            .get(5)
            .and_then(|v| serde_json::from_value::<BTreeSet<SiteField>>(v.clone()).ok())
            .unwrap_or_default();

        Some(Site {
            name: text(0)?,
            address: text(1)?,
            zipcode: text(2)?,
            phone: text(3)?,
            category,
            defaulted,
        })
    }
}

/// Sites of one state, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSites {
    /// Display title of the state page, e.g. "Michigan".
    pub name: String,
    pub sites: Vec<Site>,
}
