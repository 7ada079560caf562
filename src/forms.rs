use serde::Deserialize;
use time::Date;

use crate::domain::TeeShirtSize;
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileForm {
    pub display_name: Option<String>,
    pub tee_shirt_size: Option<TeeShirtSize>,
}

/// Absent fields leave the stored value untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub topics: Option<Vec<String>>,
    pub city: Option<String>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub max_attendees: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceQueryForm {
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub order: Vec<SortField>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    pub field: FilterField,
    pub operator: FilterOp,
    pub value: serde_json::Value,
}

impl Filter {
    pub fn string_value(&self) -> ApiResult<String> {
        self.value
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| ApiError::BadRequest(format!("{:?} filter needs a string value", self.field)))
    }

    pub fn int_value(&self) -> ApiResult<i64> {
        self.value
            .as_i64()
            .ok_or_else(|| ApiError::BadRequest(format!("{:?} filter needs an integer value", self.field)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterField {
    City,
    Topic,
    Month,
    MaxAttendees,
    SeatsAvailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gteq,
    Lt,
    Lteq,
}

impl FilterOp {
    pub fn sql(self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Ne => "!=",
            FilterOp::Gt => ">",
            FilterOp::Gteq => ">=",
            FilterOp::Lt => "<",
            FilterOp::Lteq => "<=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortField {
    Name,
    City,
    Month,
    MaxAttendees,
    SeatsAvailable,
    StartDate,
}

impl SortField {
    pub fn column(self) -> &'static str {
        match self {
            SortField::Name => "name",
            SortField::City => "city",
            SortField::Month => "month",
            SortField::MaxAttendees => "max_attendees",
            SortField::SeatsAvailable => "seats_available",
            SortField::StartDate => "start_date",
        }
    }
}
