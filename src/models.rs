use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::search::pagination::PageMeta;
use crate::search::predicate::ListingFilters;

// --- Closed Enumerations (Postgres enum types) ---

/// Role
///
/// Account role. Capabilities are derived from it in `auth::Permission`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "account_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    #[default]
    Client,
    Admin,
}

/// ListingStatus
///
/// `Available` is the "currently offered" status applied when a search names none.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "listing_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ListingStatus {
    #[default]
    Available,
    Sold,
    Pending,
}

/// PropertyType
///
/// The listing category.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "property_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PropertyType {
    #[default]
    House,
    Apartment,
    Condo,
    Townhouse,
    Land,
    Commercial,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "inquiry_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum InquiryStatus {
    #[default]
    Unread,
    Read,
    Replied,
}

// --- Accounts ---

/// Account
///
/// Row of the `accounts` table. Never serialized directly: the password hash stays inside
/// the process. Use `AccountProfile` for responses.
#[derive(Debug, Clone, FromRow, Default)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
    pub is_main_admin: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// "First Last", falling back to the username when both are empty.
    pub fn display_name(&self) -> String {
        display_name(
            &self.username,
            self.first_name.as_deref(),
            self.last_name.as_deref(),
        )
    }
}

pub(crate) fn display_name(username: &str, first: Option<&str>, last: Option<&str>) -> String {
    let full = format!("{} {}", first.unwrap_or(""), last.unwrap_or(""));
    let full = full.trim();
    if full.is_empty() {
        username.to_string()
    } else {
        full.to_string()
    }
}

/// AccountProfile
///
/// Public representation of an account.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AccountProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
    pub is_main_admin: bool,
    pub is_active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountProfile {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            username: account.username,
            email: account.email,
            first_name: account.first_name,
            last_name: account.last_name,
            role: account.role,
            is_main_admin: account.is_main_admin,
            is_active: account.is_active,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// NewAccount
///
/// Repository input for account creation. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
    pub is_main_admin: bool,
}

/// AccountChanges
///
/// Partial account update. `None` leaves the column unchanged.
#[derive(Debug, Clone, Default)]
pub struct AccountChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: Option<bool>,
    pub password_hash: Option<String>,
}

/// RegisterRequest
///
/// Payload for public registration (POST /api/auth/register) and for admin provisioning
/// (POST /api/auth/admins).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterRequest {
    #[schema(example = "jdoe")]
    pub username: String,
    #[schema(example = "jdoe@example.com")]
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        check_len("username", &self.username, 3, 80)?;
        check_email(&self.email)?;
        check_password(&self.password)?;
        check_optional_len("first_name", self.first_name.as_deref(), 50)?;
        check_optional_len("last_name", self.last_name.as_deref(), 50)
    }
}

/// LoginRequest
///
/// `username` accepts either the username or the email address.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub user: AccountProfile,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AccessTokenResponse {
    pub access_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

impl ChangePasswordRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        check_password(&self.new_password)
    }
}

/// UpdateAccountRequest
///
/// Partial update (PUT /api/users/{id}). `username` and `is_active` are honoured only for
/// callers holding `Permission::ManageAccounts`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateAccountRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl UpdateAccountRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if let Some(username) = &self.username {
            check_len("username", username, 3, 80)?;
        }
        if let Some(email) = &self.email {
            check_email(email)?;
        }
        if let Some(password) = &self.password {
            check_password(password)?;
        }
        check_optional_len("first_name", self.first_name.as_deref(), 50)?;
        check_optional_len("last_name", self.last_name.as_deref(), 50)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AccountsPage {
    pub users: Vec<AccountProfile>,
    pub pagination: PageMeta,
}

// --- Listings ---

/// ListingRecord
///
/// Raw listing row joined with its owner's name columns. `features` and `images` hold the
/// JSON-encoded storage form and are decoded by `search::assembler`.
#[derive(Debug, Clone, FromRow, Default)]
pub struct ListingRecord {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub property_type: PropertyType,
    pub location: String,
    pub address: Option<String>,
    pub price: Decimal,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub square_feet: Option<i32>,
    pub lot_size: Option<String>,
    pub year_built: Option<i32>,
    pub status: ListingStatus,
    pub features: Option<String>,
    pub images: Option<String>,
    pub owner_id: Option<Uuid>,
    pub is_verified: bool,
    pub verification_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    // Loaded via LEFT JOIN on accounts.
    pub owner_username: Option<String>,
    pub owner_first_name: Option<String>,
    pub owner_last_name: Option<String>,
}

/// OwnerSummary
///
/// Minimal embedded view of the account owning a listing.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct OwnerSummary {
    pub id: Uuid,
    pub username: String,
    pub name: String,
}

/// ListingResponse
///
/// Public representation of a listing produced by `search::assembler::assemble`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ListingResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub property_type: PropertyType,
    pub location: String,
    pub address: Option<String>,
    #[ts(type = "string")]
    #[schema(value_type = String, example = "250000.00")]
    pub price: Decimal,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub square_feet: Option<i32>,
    pub lot_size: Option<String>,
    pub year_built: Option<i32>,
    pub status: ListingStatus,
    pub features: Vec<String>,
    pub images: Vec<String>,
    pub owner: Option<OwnerSummary>,
    pub is_verified: bool,
    pub verification_notes: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// ListingsPage
///
/// Response of the listing, favorites and "my listings" endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ListingsPage {
    pub properties: Vec<ListingResponse>,
    pub pagination: PageMeta,
}

/// ListingSearchResponse
///
/// `GET /api/properties/search`: a page of listings plus the filters as applied, defaults
/// included.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ListingSearchResponse {
    pub properties: Vec<ListingResponse>,
    pub pagination: PageMeta,
    pub search_criteria: ListingFilters,
}

/// CreateListingRequest
///
/// Payload for POST /api/properties.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateListingRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub property_type: PropertyType,
    pub location: String,
    #[serde(default)]
    pub address: Option<String>,
    #[ts(type = "string")]
    #[schema(value_type = String, example = "250000.00")]
    pub price: Decimal,
    #[serde(default)]
    pub bedrooms: Option<i32>,
    #[serde(default)]
    pub bathrooms: Option<i32>,
    #[serde(default)]
    pub square_feet: Option<i32>,
    #[serde(default)]
    pub lot_size: Option<String>,
    #[serde(default)]
    pub year_built: Option<i32>,
    #[serde(default)]
    pub status: Option<ListingStatus>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

impl CreateListingRequest {
    /// validate
    ///
    /// Checks every field against the column limits and normalizes in place:
    /// 1. `title` and `location` are trimmed before their length is checked, so the stored
    ///    value is the one that was measured.
    /// 2. Blank optional text becomes `None`.
    /// 3. The price is rounded to two decimal places, then bounded by `MAX_PRICE`.
    pub fn validate(&mut self) -> Result<(), ApiError> {
        self.title = self.title.trim().to_string();
        self.location = self.location.trim().to_string();
        check_len("title", &self.title, 1, 200)?;
        check_len("location", &self.location, 1, 200)?;

        for field in [&mut self.description, &mut self.address, &mut self.lot_size] {
            if field.as_deref().is_some_and(|v| v.trim().is_empty()) {
                *field = None;
            }
        }
        check_optional_len("address", self.address.as_deref(), 300)?;
        check_optional_len("lot_size", self.lot_size.as_deref(), 50)?;

        self.price.rescale(2);
        check_price(self.price)?;
        check_counts(self.bedrooms, self.bathrooms, self.square_feet)?;
        check_year_built(self.year_built)
    }
}

/// UpdateListingRequest
///
/// Partial update (PUT /api/properties/{id}). `None` leaves a field unchanged; a blank
/// `description`, `address` or `lot_size` clears it. Unless `is_verified` is given, the
/// listing becomes unverified: edited content must be re-verified.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateListingRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_type: Option<PropertyType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | null")]
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub square_feet: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lot_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_built: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ListingStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_verified: Option<bool>,
}

impl UpdateListingRequest {
    /// Same rules as `CreateListingRequest::validate`, applied to the fields present. A blank
    /// `description`, `address` or `lot_size` is kept as `Some("")`: it clears the column.
    pub fn validate(&mut self) -> Result<(), ApiError> {
        if let Some(title) = self.title.as_mut() {
            *title = title.trim().to_string();
            check_len("title", title, 1, 200)?;
        }
        if let Some(location) = self.location.as_mut() {
            *location = location.trim().to_string();
            check_len("location", location, 1, 200)?;
        }
        for field in [&mut self.description, &mut self.address, &mut self.lot_size] {
            if let Some(value) = field.as_mut() {
                if value.trim().is_empty() {
                    value.clear();
                }
            }
        }
        check_optional_len("address", self.address.as_deref(), 300)?;
        check_optional_len("lot_size", self.lot_size.as_deref(), 50)?;
        if let Some(price) = self.price.as_mut() {
            price.rescale(2);
            check_price(*price)?;
        }
        check_counts(self.bedrooms, self.bathrooms, self.square_feet)?;
        check_year_built(self.year_built)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct VerifyListingRequest {
    pub is_verified: bool,
    #[serde(default)]
    pub verification_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AddImagesRequest {
    pub image_urls: Vec<String>,
}

impl AddImagesRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.image_urls.is_empty() {
            return Err(ApiError::validation("image_urls must not be empty"));
        }
        if self.image_urls.iter().any(|u| u.trim().is_empty()) {
            return Err(ApiError::validation("image_urls must not contain empty values"));
        }
        Ok(())
    }
}

// --- Favorites ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AddFavoriteRequest {
    pub property_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct FavoriteAdded {
    pub property_id: Uuid,
    pub property_title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct FavoriteStatus {
    pub property_id: Uuid,
    pub is_favorite: bool,
}

// --- Inquiries ---

/// Inquiry
///
/// Row of the `inquiries` table, joined with the referenced listing's title. The listing
/// reference is exposed as `property_id` on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Inquiry {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: String,
    #[serde(rename = "property_id")]
    pub listing_id: Option<Uuid>,
    #[serde(rename = "property_title")]
    pub listing_title: Option<String>,
    #[serde(rename = "user_id")]
    pub sender_id: Option<Uuid>,
    pub status: InquiryStatus,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// CreateInquiryRequest
///
/// Payload for POST /api/contact. Sender details are free text and are not matched
/// against accounts.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateInquiryRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    pub message: String,
    #[serde(default)]
    pub property_id: Option<Uuid>,
}

impl CreateInquiryRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        check_len("name", &self.name, 1, 100)?;
        check_email(&self.email)?;
        check_optional_len("phone", self.phone.as_deref(), 20)?;
        check_optional_len("subject", self.subject.as_deref(), 200)?;
        if self.message.trim().is_empty() {
            return Err(ApiError::validation("message must not be empty"));
        }
        Ok(())
    }
}

/// NewInquiry
///
/// Repository input: the validated request plus the optional authenticated sender.
#[derive(Debug, Clone)]
pub struct NewInquiry {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: String,
    pub listing_id: Option<Uuid>,
    pub sender_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdateInquiryStatusRequest {
    pub status: InquiryStatus,
}

/// InquiryFilter
///
/// Conjunctive filter over the inquiry collection. `None` imposes no constraint.
#[derive(Debug, Clone, Default)]
pub struct InquiryFilter {
    pub status: Option<InquiryStatus>,
    pub listing_id: Option<Uuid>,
    pub sender_id: Option<Uuid>,
}

impl InquiryFilter {
    pub fn matches(&self, inquiry: &Inquiry) -> bool {
        self.status.is_none_or(|s| inquiry.status == s)
            && self.listing_id.is_none_or(|l| inquiry.listing_id == Some(l))
            && self.sender_id.is_none_or(|s| inquiry.sender_id == Some(s))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct InquiriesPage {
    pub messages: Vec<Inquiry>,
    pub pagination: PageMeta,
}

// --- Uploads ---

/// UploadedFile
///
/// A stored image: its object key, public URL and original metadata.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UploadedFile {
    pub file_url: String,
    pub key: String,
    pub filename: String,
    pub size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UploadedFiles {
    pub files: Vec<UploadedFile>,
    pub total_files: usize,
    pub total_size: u64,
}

// --- Dashboard ---

/// DashboardStats
///
/// Output of GET /api/admin/stats.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct DashboardStats {
    pub total_listings: i64,
    pub verified_listings: i64,
    /// Listings with `is_verified = false`.
    pub pending_verification: i64,
    pub total_accounts: i64,
    pub total_favorites: i64,
    pub unread_inquiries: i64,
}

/// A plain acknowledgement body.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// --- Field validation ---

pub const MIN_YEAR_BUILT: i32 = 1800;
pub const MAX_YEAR_BUILT: i32 = 2030;
/// The largest price a listing can store: 9,999,999,999.99.
pub const MAX_PRICE: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2); // 999_999_999_999 scale 2

fn check_len(field: &str, value: &str, min: usize, max: usize) -> Result<(), ApiError> {
    let len = value.trim().chars().count();
    if len < min || len > max {
        return Err(ApiError::validation(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    Ok(())
}

fn check_optional_len(field: &str, value: Option<&str>, max: usize) -> Result<(), ApiError> {
    match value {
        Some(v) if v.chars().count() > max => Err(ApiError::validation(format!(
            "{field} must be at most {max} characters"
        ))),
        _ => Ok(()),
    }
}

fn check_email(email: &str) -> Result<(), ApiError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if !valid || email.len() > 120 {
        return Err(ApiError::validation("email must be a valid email address"));
    }
    Ok(())
}

fn check_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < 6 {
        return Err(ApiError::validation(
            "password must be at least 6 characters",
        ));
    }
    Ok(())
}

/// check_price_bound
///
/// A price or price filter must be representable in `NUMERIC(12, 2)`: not negative and at
/// most `MAX_PRICE`.
pub fn check_price_bound(field: &str, price: Decimal) -> Result<(), ApiError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(ApiError::validation(format!("{field} must not be negative")));
    }
    if price > MAX_PRICE {
        return Err(ApiError::validation(format!(
            "{field} must not exceed {MAX_PRICE}"
        )));
    }
    Ok(())
}

fn check_price(price: Decimal) -> Result<(), ApiError> {
    check_price_bound("price", price)
}

fn check_counts(
    bedrooms: Option<i32>,
    bathrooms: Option<i32>,
    square_feet: Option<i32>,
) -> Result<(), ApiError> {
    for (field, value) in [
        ("bedrooms", bedrooms),
        ("bathrooms", bathrooms),
        ("square_feet", square_feet),
    ] {
        if value.is_some_and(|v| v < 0) {
            return Err(ApiError::validation(format!("{field} must not be negative")));
        }
    }
    Ok(())
}

fn check_year_built(year: Option<i32>) -> Result<(), ApiError> {
    match year {
        Some(y) if !(MIN_YEAR_BUILT..=MAX_YEAR_BUILT).contains(&y) => {
            Err(ApiError::validation(format!(
                "year_built must be between {MIN_YEAR_BUILT} and {MAX_YEAR_BUILT}"
            )))
        }
        _ => Ok(()),
    }
}
