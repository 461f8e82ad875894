use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{ListingRecord, ListingStatus, PropertyType, check_price_bound};
use crate::search::pagination::PageRequest;

/// Predicate
///
/// One condition over the listing collection. A `ListingQuery` is the conjunction of its
/// predicates. Each variant has two interpretations that must agree: `matches` (in process)
/// and `push_sql` (Postgres).
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Case-insensitive substring of `location`.
    LocationContains(String),
    PropertyTypeIs(PropertyType),
    /// Inclusive lower price bound.
    PriceAtLeast(Decimal),
    /// Inclusive upper price bound.
    PriceAtMost(Decimal),
    /// Minimum bedroom count. Listings without a bedroom count never match.
    BedroomsAtLeast(i32),
    StatusIs(ListingStatus),
    Verified,
    OwnedBy(Uuid),
}

impl Predicate {
    pub fn matches(&self, record: &ListingRecord) -> bool {
        match self {
            Predicate::LocationContains(needle) => record
                .location
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            Predicate::PropertyTypeIs(t) => record.property_type == *t,
            Predicate::PriceAtLeast(min) => record.price >= *min,
            Predicate::PriceAtMost(max) => record.price <= *max,
            Predicate::BedroomsAtLeast(n) => record.bedrooms.is_some_and(|b| b >= *n),
            Predicate::StatusIs(s) => record.status == *s,
            Predicate::Verified => record.is_verified,
            Predicate::OwnedBy(owner) => record.owner_id == Some(*owner),
        }
    }

    /// Appends this predicate as a parameterized SQL condition on the `l` (listings) alias.
    fn push_sql(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        match self {
            Predicate::LocationContains(needle) => {
                builder.push("l.location ILIKE ");
                builder.push_bind(format!("%{}%", escape_like(needle)));
            }
            Predicate::PropertyTypeIs(t) => {
                builder.push("l.property_type = ");
                builder.push_bind(*t);
            }
            Predicate::PriceAtLeast(min) => {
                builder.push("l.price >= ");
                builder.push_bind(*min);
            }
            Predicate::PriceAtMost(max) => {
                builder.push("l.price <= ");
                builder.push_bind(*max);
            }
            Predicate::BedroomsAtLeast(n) => {
                builder.push("l.bedrooms >= ");
                builder.push_bind(*n);
            }
            Predicate::StatusIs(s) => {
                builder.push("l.status = ");
                builder.push_bind(*s);
            }
            Predicate::Verified => {
                builder.push("l.is_verified = TRUE");
            }
            Predicate::OwnedBy(owner) => {
                builder.push("l.owner_id = ");
                builder.push_bind(*owner);
            }
        }
    }
}

/// Escapes the LIKE metacharacters so user input is matched literally.
pub(crate) fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// ListingQuery
///
/// A side-effect-free, composable filter over listings. Building one never touches the store;
/// the repository decides how to evaluate it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingQuery {
    predicates: Vec<Predicate>,
}

impl ListingQuery {
    /// The unconstrained query.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn contains(&self, predicate: &Predicate) -> bool {
        self.predicates.contains(predicate)
    }

    pub fn matches(&self, record: &ListingRecord) -> bool {
        self.predicates.iter().all(|p| p.matches(record))
    }

    /// Appends ` WHERE a AND b ...`, or nothing for the unconstrained query.
    pub fn push_where(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        for (i, predicate) in self.predicates.iter().enumerate() {
            builder.push(if i == 0 { " WHERE " } else { " AND " });
            predicate.push_sql(builder);
        }
    }
}

/// ListingFilters
///
/// Query string accepted by `GET /api/properties` and `GET /api/properties/search`. Every
/// field is optional; an absent filter imposes no constraint, except `status`, which defaults
/// to `available`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, IntoParams, ToSchema, TS)]
#[into_params(parameter_in = Query)]
#[ts(export)]
pub struct ListingFilters {
    /// Case-insensitive substring of the listing location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Also accepted as `category`.
    #[serde(default, alias = "category", skip_serializing_if = "Option::is_none")]
    pub property_type: Option<PropertyType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | null")]
    #[schema(value_type = Option<String>)]
    #[param(value_type = Option<String>)]
    pub min_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | null")]
    #[schema(value_type = Option<String>)]
    #[param(value_type = Option<String>)]
    pub max_price: Option<Decimal>,
    /// Minimum bedroom count. Also accepted as `min_rooms`.
    #[serde(default, alias = "min_rooms", skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ListingStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<i64>,
    /// Reveal unverified listings. Honoured only for callers allowed to view all listings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_all: Option<bool>,
}

impl ListingFilters {
    /// The status actually filtered on.
    pub fn effective_status(&self) -> ListingStatus {
        self.status.unwrap_or_default()
    }

    pub fn show_all(&self) -> bool {
        self.show_all.unwrap_or(false)
    }

    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.per_page)
    }

    /// to_query
    ///
    /// Builds the filter conjunction. Negative bounds and price bounds no listing could
    /// store are rejected; `min_price > max_price` is accepted and simply matches nothing.
    pub fn to_query(&self) -> Result<ListingQuery, ApiError> {
        let mut query = ListingQuery::new();

        if let Some(location) = self.location.as_deref().map(str::trim) {
            if !location.is_empty() {
                query = query.and(Predicate::LocationContains(location.to_string()));
            }
        }
        if let Some(t) = self.property_type {
            query = query.and(Predicate::PropertyTypeIs(t));
        }
        if let Some(min) = self.min_price {
            check_price_bound("min_price", min)?;
            query = query.and(Predicate::PriceAtLeast(min));
        }
        if let Some(max) = self.max_price {
            check_price_bound("max_price", max)?;
            query = query.and(Predicate::PriceAtMost(max));
        }
        if let Some(n) = self.bedrooms {
            if n < 0 {
                return Err(ApiError::validation("bedrooms must not be negative"));
            }
            query = query.and(Predicate::BedroomsAtLeast(n));
        }

        Ok(query.and(Predicate::StatusIs(self.effective_status())))
    }

    /// The filters as applied, echoed back by the search endpoint.
    pub fn applied(&self) -> ListingFilters {
        let page = self.page_request();
        ListingFilters {
            status: Some(self.effective_status()),
            page: Some(page.page()),
            per_page: Some(page.per_page()),
            show_all: Some(self.show_all()),
            ..self.clone()
        }
    }
}
