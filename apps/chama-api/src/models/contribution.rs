use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::db::schema::contributions;

/// A member's payment, recorded against their membership. The chama is
/// reached through the membership.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, ToSchema)]
#[diesel(table_name = contributions)]
pub struct Contribution {
    pub id: i64,
    pub membership_id: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = contributions)]
pub struct NewContribution<'a> {
    pub id: i64,
    pub membership_id: &'a str,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub notes: &'a str,
    pub created_at: DateTime<Utc>,
}

/// Contribution with who made it and where.
#[derive(Debug, Serialize, ToSchema)]
pub struct ContributionEntry {
    #[serde(flatten)]
    pub contribution: Contribution,
    pub chama_id: String,
    pub user_id: String,
    pub username: String,
}

/// Sum of a slice of contributions.
pub fn total<'a>(amounts: impl IntoIterator<Item = &'a Decimal>) -> Decimal {
    amounts.into_iter().copied().sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn total_of_nothing_is_zero() {
        assert_eq!(total(&[]), Decimal::ZERO);
    }

    #[test]
    fn total_keeps_cents() {
        assert_eq!(total(&[dec!(500.00), dec!(0.10), dec!(0.20)]), dec!(500.30));
    }
}
