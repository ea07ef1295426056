use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::errors::AppError;
use crate::utils::validation::{parse_date, validate_payload};

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Address {
    pub city: Option<String>,
    pub district: Option<String>,
    pub state: Option<String>,
}

/// A stored employee record.
///
/// `_id` is the store's internal identifier; `employeeId` is the derived
/// human-readable one that every route addresses records by.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub employee_id: String,
    pub name: String,
    pub phone: String,
    pub date_of_birth: NaiveDate,
    pub date_of_joining: NaiveDate,
    pub department: String,
    pub employment_status: String,
    pub marital: Option<String>,
    pub gender: String,
    #[serde(default)]
    pub address: Address,
    pub profile_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated record ready for insertion.
#[derive(Debug, Clone)]
pub struct NewEmployee {
    pub employee_id: String,
    pub name: String,
    pub phone: String,
    pub date_of_birth: NaiveDate,
    pub date_of_joining: NaiveDate,
    pub department: String,
    pub employment_status: String,
    pub marital: Option<String>,
    pub gender: String,
    pub address: Address,
    pub profile_image: Option<String>,
}

#[derive(Serialize, Deserialize, Validate, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateEmployeeRequest {
    #[validate(required, length(min = 1))]
    pub name: Option<String>,
    #[validate(required, length(min = 1))]
    #[serde(default, deserialize_with = "string_or_number")]
    pub phone: Option<String>,
    #[validate(required, length(min = 1))]
    pub date_of_birth: Option<String>,
    #[validate(required, length(min = 1))]
    pub date_of_joining: Option<String>,
    #[validate(required, length(min = 1))]
    pub department: Option<String>,
    #[validate(required, length(min = 1))]
    pub employment_status: Option<String>,
    pub marital: Option<String>,
    #[validate(required, length(min = 1))]
    pub gender: Option<String>,
    pub address: Option<Address>,
    #[serde(alias = "profileImage")]
    pub image_id: Option<String>,
}

impl CreateEmployeeRequest {
    /// Checks presence of the required fields, parses both dates and derives
    /// the external employee id.
    pub fn into_new_employee(self) -> Result<NewEmployee, AppError> {
        validate_payload(&self)?;

        // validate_payload guarantees every required field is Some
        let required = |field: Option<String>| field.unwrap_or_default();

        let date_of_birth = parse_date("dateOfBirth", &required(self.date_of_birth))?;
        let date_of_joining = parse_date("dateOfJoining", &required(self.date_of_joining))?;
        let department = required(self.department);

        Ok(NewEmployee {
            employee_id: derive_employee_id(&department, date_of_joining),
            name: required(self.name),
            phone: required(self.phone),
            date_of_birth,
            date_of_joining,
            department,
            employment_status: required(self.employment_status),
            marital: self.marital,
            gender: required(self.gender),
            address: self.address.unwrap_or_default(),
            profile_image: self.image_id.filter(|id| !id.is_empty()),
        })
    }
}

/// Partial update over the fixed allow-list. Absent fields are left alone;
/// `employeeId` and `profileImage` are never touched.
#[derive(Serialize, Deserialize, Validate, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeUpdate {
    #[validate(length(min = 1))]
    pub name: Option<String>,
    #[validate(length(min = 1))]
    #[serde(default, deserialize_with = "string_or_number")]
    pub phone: Option<String>,
    #[validate(length(min = 1))]
    pub department: Option<String>,
    #[validate(length(min = 1))]
    pub employment_status: Option<String>,
    pub marital: Option<String>,
    pub address: Option<Address>,
}

impl EmployeeUpdate {
    pub fn apply(&self, employee: &mut Employee) {
        if let Some(name) = &self.name {
            employee.name = name.clone();
        }
        if let Some(phone) = &self.phone {
            employee.phone = phone.clone();
        }
        if let Some(department) = &self.department {
            employee.department = department.clone();
        }
        if let Some(status) = &self.employment_status {
            employee.employment_status = status.clone();
        }
        if let Some(marital) = &self.marital {
            employee.marital = Some(marital.clone());
        }
        if let Some(address) = &self.address {
            if let Some(city) = &address.city {
                employee.address.city = Some(city.clone());
            }
            if let Some(district) = &address.district {
                employee.address.district = Some(district.clone());
            }
            if let Some(state) = &address.state {
                employee.address.state = Some(state.clone());
            }
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct UpdateResponse {
    pub message: String,
    pub data: Employee,
}

/// `<first letter of department, uppercased>-<year of joining>`.
///
/// Not unique: two employees in departments sharing an initial who joined in
/// the same year get the same id.
pub fn derive_employee_id(department: &str, date_of_joining: NaiveDate) -> String {
    let initial: String = department
        .chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_default();
    format!("{}-{:04}", initial, date_of_joining.year())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    }))
}
