use chrono::{DateTime, NaiveDate, Utc};
use hearth_shared::Masked;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::PropertyError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IdType {
    Passport,
    NationalId,
    DriversLicense,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfo {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<Masked<String>>,
    #[serde(default)]
    pub phone: Option<Masked<String>>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub id_type: Option<IdType>,
    #[serde(default)]
    pub id_number: Option<Masked<String>>,
    #[serde(default)]
    pub nationality: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
}

impl PersonalInfo {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Summary of a completed stay, appended at checkout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StaySummary {
    pub booking_id: Uuid,
    pub room_number: String,
    pub check_in: DateTime<Utc>,
    pub check_out: DateTime<Utc>,
    pub nights: u32,
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BillingRecord {
    pub invoice_id: Uuid,
    pub amount: Decimal,
    pub method: String,
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GuestNote {
    pub text: String,
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guest {
    pub id: Uuid,
    pub hotel_id: Uuid,
    pub personal_info: PersonalInfo,
    pub is_corporate: bool,
    pub company_name: Option<String>,
    pub past_stays: Vec<StaySummary>,
    pub billing_history: Vec<BillingRecord>,
    pub notes: Vec<GuestNote>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGuest {
    pub hotel_id: Uuid,
    pub personal_info: PersonalInfo,
    #[serde(default)]
    pub is_corporate: bool,
    #[serde(default)]
    pub company_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestPatch {
    pub personal_info: Option<PersonalInfo>,
    pub is_corporate: Option<bool>,
    pub company_name: Option<String>,
}

/// Identity keys used to spot an already registered guest.
#[derive(Debug, Clone, Default)]
pub struct GuestIdentity {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub id_number: Option<String>,
}

impl GuestIdentity {
    pub fn of(info: &PersonalInfo) -> Self {
        fn clean(value: &Option<Masked<String>>) -> Option<String> {
            value
                .as_ref()
                .map(|v| v.expose().trim().to_string())
                .filter(|v| !v.is_empty())
        }
        Self {
            email: clean(&info.email).map(|e| e.to_lowercase()),
            phone: clean(&info.phone),
            id_number: clean(&info.id_number),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.phone.is_none() && self.id_number.is_none()
    }
}

impl Guest {
    pub fn new(input: NewGuest) -> Result<Self, PropertyError> {
        validate_info(&input.personal_info)?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            hotel_id: input.hotel_id,
            personal_info: input.personal_info,
            is_corporate: input.is_corporate,
            company_name: input.company_name,
            past_stays: Vec::new(),
            billing_history: Vec::new(),
            notes: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_patch(&mut self, patch: GuestPatch) -> Result<(), PropertyError> {
        if let Some(info) = patch.personal_info {
            validate_info(&info)?;
            self.personal_info = info;
        }
        if let Some(corporate) = patch.is_corporate {
            self.is_corporate = corporate;
        }
        if let Some(company) = patch.company_name {
            self.company_name = Some(company);
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Email (case-insensitive), phone or ID number match.
    pub fn matches_identity(&self, identity: &GuestIdentity) -> bool {
        let mine = GuestIdentity::of(&self.personal_info);
        let same = |a: &Option<String>, b: &Option<String>| matches!((a, b), (Some(x), Some(y)) if x == y);
        same(&mine.email, &identity.email)
            || same(&mine.phone, &identity.phone)
            || same(&mine.id_number, &identity.id_number)
    }

    /// Case-insensitive substring match over name, email, phone and ID number.
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        let info = &self.personal_info;
        let mut haystacks = vec![
            info.first_name.to_lowercase(),
            info.last_name.to_lowercase(),
            info.full_name().to_lowercase(),
        ];
        for field in [&info.email, &info.phone, &info.id_number].into_iter().flatten() {
            haystacks.push(field.expose().to_lowercase());
        }
        haystacks.iter().any(|h| h.contains(&needle))
    }

    pub fn add_note(&mut self, text: String, author: Option<String>) -> Result<(), PropertyError> {
        if text.trim().is_empty() {
            return Err(PropertyError::InvalidGuest("note text is required".to_string()));
        }
        let now = Utc::now();
        self.notes.push(GuestNote { text, author, created_at: now });
        self.updated_at = now;
        Ok(())
    }

    pub fn record_stay(&mut self, stay: StaySummary, billing: BillingRecord) {
        self.updated_at = billing.paid_at;
        self.past_stays.push(stay);
        self.billing_history.push(billing);
    }
}

fn validate_info(info: &PersonalInfo) -> Result<(), PropertyError> {
    if info.first_name.trim().is_empty() || info.last_name.trim().is_empty() {
        return Err(PropertyError::InvalidGuest(
            "first and last name are required".to_string(),
        ));
    }
    if let Some(email) = &info.email {
        let e = email.expose();
        if !e.is_empty() && !e.contains('@') {
            return Err(PropertyError::InvalidGuest("email address is malformed".to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(email: Option<&str>, phone: Option<&str>, id_number: Option<&str>) -> PersonalInfo {
        PersonalInfo {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: email.map(Masked::from),
            phone: phone.map(Masked::from),
            address: None,
            id_type: Some(IdType::Passport),
            id_number: id_number.map(Masked::from),
            nationality: Some("GB".to_string()),
            date_of_birth: None,
        }
    }

    fn guest(email: Option<&str>, phone: Option<&str>, id_number: Option<&str>) -> Guest {
        Guest::new(NewGuest {
            hotel_id: Uuid::new_v4(),
            personal_info: info(email, phone, id_number),
            is_corporate: false,
            company_name: None,
        })
        .unwrap()
    }

    #[test]
    fn test_identity_matches_any_key() {
        let g = guest(Some("Ada@Example.com"), Some("+441234"), Some("P123"));
        assert!(g.matches_identity(&GuestIdentity::of(&info(Some("ada@example.com"), None, None))));
        assert!(g.matches_identity(&GuestIdentity::of(&info(None, Some("+441234"), None))));
        assert!(g.matches_identity(&GuestIdentity::of(&info(None, None, Some("P123")))));
        assert!(!g.matches_identity(&GuestIdentity::of(&info(Some("other@example.com"), None, None))));
    }

    #[test]
    fn test_missing_keys_never_match() {
        let g = guest(None, None, None);
        assert!(!g.matches_identity(&GuestIdentity::of(&info(None, None, None))));
        assert!(GuestIdentity::of(&info(Some("  "), None, None)).is_empty());
    }

    #[test]
    fn test_query_matching() {
        let g = guest(Some("ada@example.com"), Some("555-0101"), Some("X99"));
        assert!(g.matches_query("love"));
        assert!(g.matches_query("ADA LOVE"));
        assert!(g.matches_query("example.com"));
        assert!(g.matches_query("0101"));
        assert!(g.matches_query("x99"));
        assert!(!g.matches_query("babbage"));
    }

    #[test]
    fn test_requires_names() {
        let mut bad = info(None, None, None);
        bad.last_name = String::new();
        let result = Guest::new(NewGuest {
            hotel_id: Uuid::new_v4(),
            personal_info: bad,
            is_corporate: false,
            company_name: None,
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_notes() {
        let mut g = guest(None, None, None);
        assert!(g.add_note(" ".to_string(), None).is_err());
        g.add_note("Prefers quiet rooms".to_string(), Some("front-desk".to_string())).unwrap();
        assert_eq!(g.notes.len(), 1);
    }
}
