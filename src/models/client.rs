use std::fmt;

use crate::db::query::{Column, Fields, Value};

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct Client {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// One row of `clients LEFT JOIN phones`. A client without phones yields a
/// single row with `phone` set to `None`.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct ClientPhone {
    pub client_id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
}

impl fmt::Display for ClientPhone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>4}  {:<20} {:<20} {:<30} {}",
            self.client_id,
            self.first_name,
            self.last_name,
            self.email,
            self.phone.as_deref().unwrap_or("-")
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewClient {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phones: Vec<String>,
}

impl NewClient {
    pub fn new(first_name: &str, last_name: &str, email: &str) -> Self {
        Self {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
            phones: Vec::new(),
        }
    }

    pub fn with_phones<I, S>(mut self, phones: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.phones = phones.into_iter().map(Into::into).collect();
        self
    }

    pub(crate) fn insert_fields(&self) -> Vec<(Column, Value)> {
        vec![
            (Column::FirstName, Value::from(self.first_name.as_str())),
            (Column::LastName, Value::from(self.last_name.as_str())),
            (Column::Email, Value::from(self.email.as_str())),
        ]
    }
}

/// Partial update of a client. `None` leaves the field untouched; `phones`,
/// when present, replaces every phone the client has.
#[derive(Debug, Clone, Default)]
pub struct ClientChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phones: Option<Vec<String>>,
}

impl ClientChanges {
    pub(crate) fn client_fields(&self) -> Fields {
        vec![
            (Column::FirstName, self.first_name.as_deref().map(Value::from)),
            (Column::LastName, self.last_name.as_deref().map(Value::from)),
            (Column::Email, self.email.as_deref().map(Value::from)),
        ]
    }

    pub(crate) fn touches_client_row(&self) -> bool {
        self.first_name.is_some() || self.last_name.is_some() || self.email.is_some()
    }

    pub fn is_empty(&self) -> bool {
        !self.touches_client_row() && self.phones.is_none()
    }
}

/// Search criteria for `find_client`; supplied fields are ANDed together.
#[derive(Debug, Clone, Default)]
pub struct ClientSearch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl ClientSearch {
    pub fn by_email(email: &str) -> Self {
        Self {
            email: Some(email.to_string()),
            ..Self::default()
        }
    }

    pub fn by_phone(phone: &str) -> Self {
        Self {
            phone: Some(phone.to_string()),
            ..Self::default()
        }
    }

    pub(crate) fn filters(&self) -> Fields {
        vec![
            (Column::FirstName, self.first_name.as_deref().map(Value::from)),
            (Column::LastName, self.last_name.as_deref().map(Value::from)),
            (Column::Email, self.email.as_deref().map(Value::from)),
            (Column::Phone, self.phone.as_deref().map(Value::from)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_changes_keep_only_supplied_fields() {
        let changes = ClientChanges {
            first_name: Some("Sergey".to_string()),
            ..ClientChanges::default()
        };
        let present: Vec<_> = changes
            .client_fields()
            .into_iter()
            .filter_map(|(col, val)| val.map(|v| (col, v)))
            .collect();
        assert_eq!(present, vec![(Column::FirstName, Value::from("Sergey"))]);
        assert!(changes.touches_client_row());
        assert!(!changes.is_empty());
    }

    #[test]
    fn test_phone_only_changes_do_not_touch_client_row() {
        let changes = ClientChanges {
            phones: Some(vec![]),
            ..ClientChanges::default()
        };
        assert!(!changes.touches_client_row());
        assert!(!changes.is_empty());
        assert!(ClientChanges::default().is_empty());
    }

    #[test]
    fn test_search_by_phone() {
        let filters = ClientSearch::by_phone("88005553555").filters();
        assert_eq!(filters.len(), 4);
        assert_eq!(
            filters[3],
            (Column::Phone, Some(Value::from("88005553555")))
        );
        assert!(filters[..3].iter().all(|(_, v)| v.is_none()));
    }

    #[test]
    fn test_display_marks_missing_phone() {
        let row = ClientPhone {
            client_id: 1,
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            email: "a@b.com".to_string(),
            phone: None,
        };
        assert!(row.to_string().trim_end().ends_with('-'));
    }
}
