use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::Repository;
use crate::error::StoreError;
use crate::models::{
    Account, AccountChanges, CreateListingRequest, DashboardStats, Inquiry, InquiryFilter,
    InquiryStatus, ListingRecord, NewAccount, NewInquiry, Role, UpdateListingRequest,
};
use crate::search::assembler::{decode_string_list, encode_string_list};
use crate::search::pagination::{Page, PageRequest};
use crate::search::predicate::{ListingQuery, escape_like};

const ACCOUNT_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, role, \
     is_main_admin, is_active, created_at, updated_at";

// Listing columns on alias `l`, owner name columns on alias `o`.
const LISTING_COLUMNS: &str = "l.id, l.title, l.description, l.property_type, l.location, \
     l.address, l.price, l.bedrooms, l.bathrooms, l.square_feet, l.lot_size, l.year_built, \
     l.status, l.features, l.images, l.owner_id, l.is_verified, l.verification_notes, \
     l.created_at, l.updated_at, o.username AS owner_username, \
     o.first_name AS owner_first_name, o.last_name AS owner_last_name";

const LISTING_ORDER: &str = " ORDER BY l.created_at DESC, l.id DESC";

const INQUIRY_SELECT: &str = "SELECT i.id, i.name, i.email, i.phone, i.subject, i.message, \
     i.listing_id, l.title AS listing_title, i.sender_id, i.status, i.created_at \
     FROM inquiries i LEFT JOIN listings l ON l.id = i.listing_id";

/// PostgresRepository
///
/// The `Repository` backed by Postgres. Dynamic filters go through `QueryBuilder` so every
/// user-supplied value is a bound parameter. Multi-statement mutations run in a transaction
/// that rolls back when dropped on an early `?` return.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// fetch_listing_page
    ///
    /// Shared by every paginated listing read:
    /// 1. `from_and_where` pushes the FROM/JOIN/WHERE tail; it runs twice, once for the
    ///    `COUNT(*)` and once for the page itself.
    /// 2. The page is ordered by `LISTING_ORDER` and limited by `page`.
    ///
    /// *Note*: the two statements are not in one snapshot, so `total` can drift from the
    /// page under concurrent writes.
    async fn fetch_listing_page(
        &self,
        from_and_where: impl Fn(&mut QueryBuilder<'_, Postgres>),
        page: PageRequest,
    ) -> Result<Page<ListingRecord>, StoreError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*)");
        from_and_where(&mut count);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT ");
        select.push(LISTING_COLUMNS);
        from_and_where(&mut select);
        select.push(LISTING_ORDER);
        select.push(" LIMIT ");
        select.push_bind(page.limit());
        select.push(" OFFSET ");
        select.push_bind(page.offset());
        let items = select
            .build_query_as::<ListingRecord>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            items,
            meta: page.meta(total),
        })
    }
}

/// `lock` adds `FOR UPDATE OF l` for use inside a transaction.
fn listing_by_id_sql(lock: bool) -> String {
    format!(
        "SELECT {LISTING_COLUMNS} FROM listings l LEFT JOIN accounts o ON o.id = l.owner_id \
         WHERE l.id = $1{}",
        if lock { " FOR UPDATE OF l" } else { "" }
    )
}

/// Wraps a listing mutation so the joined row comes back in one round trip.
fn listing_cte_sql(mutation: &str) -> String {
    format!(
        "WITH changed AS ({mutation} RETURNING *) \
         SELECT {LISTING_COLUMNS} FROM changed l LEFT JOIN accounts o ON o.id = l.owner_id"
    )
}

fn inquiry_cte_sql(mutation: &str) -> String {
    format!(
        "WITH changed AS ({mutation} RETURNING *) \
         SELECT i.id, i.name, i.email, i.phone, i.subject, i.message, i.listing_id, \
         l.title AS listing_title, i.sender_id, i.status, i.created_at \
         FROM changed i LEFT JOIN listings l ON l.id = i.listing_id"
    )
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- Accounts ---

    async fn create_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        let sql = format!(
            "INSERT INTO accounts (id, username, email, password_hash, first_name, last_name, \
             role, is_main_admin) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {ACCOUNT_COLUMNS}"
        );
        let created = sqlx::query_as::<_, Account>(&sql)
            .bind(Uuid::new_v4())
            .bind(account.username)
            .bind(account.email)
            .bind(account.password_hash)
            .bind(account.first_name)
            .bind(account.last_name)
            .bind(account.role)
            .bind(account.is_main_admin)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn get_account(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        Ok(sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_account_by_login(&self, login: &str) -> Result<Option<Account>, StoreError> {
        // A username match wins over an email match.
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE username = $1 OR email = $1 \
             ORDER BY (username = $1) DESC LIMIT 1"
        );
        Ok(sqlx::query_as::<_, Account>(&sql)
            .bind(login)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_accounts(
        &self,
        search: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Account>, StoreError> {
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s)));

        let push_where = |builder: &mut QueryBuilder<'_, Postgres>| {
            if let Some(p) = &pattern {
                builder.push(" WHERE (username ILIKE ");
                builder.push_bind(p.clone());
                builder.push(" OR email ILIKE ");
                builder.push_bind(p.clone());
                builder.push(" OR first_name ILIKE ");
                builder.push_bind(p.clone());
                builder.push(" OR last_name ILIKE ");
                builder.push_bind(p.clone());
                builder.push(")");
            }
        };

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM accounts");
        push_where(&mut count);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts"
        ));
        push_where(&mut select);
        select.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        select.push_bind(page.limit());
        select.push(" OFFSET ");
        select.push_bind(page.offset());
        let items = select
            .build_query_as::<Account>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            items,
            meta: page.meta(total),
        })
    }

    async fn list_admins(&self) -> Result<Vec<Account>, StoreError> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE role = $1 \
             ORDER BY is_main_admin DESC, created_at ASC"
        );
        Ok(sqlx::query_as::<_, Account>(&sql)
            .bind(Role::Admin)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_account(
        &self,
        id: Uuid,
        changes: AccountChanges,
    ) -> Result<Option<Account>, StoreError> {
        let sql = format!(
            "UPDATE accounts SET \
                username = COALESCE($2, username), \
                email = COALESCE($3, email), \
                first_name = COALESCE($4, first_name), \
                last_name = COALESCE($5, last_name), \
                is_active = COALESCE($6, is_active), \
                password_hash = COALESCE($7, password_hash), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {ACCOUNT_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .bind(changes.username)
            .bind(changes.email)
            .bind(changes.first_name)
            .bind(changes.last_name)
            .bind(changes.is_active)
            .bind(changes.password_hash)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// delete_account
    ///
    /// Locks every admin row before counting, so two concurrent deletions cannot both pass
    /// the last-admin check.
    async fn delete_account(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let admin_ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT id FROM accounts WHERE role = $1 FOR UPDATE")
                .bind(Role::Admin)
                .fetch_all(&mut *tx)
                .await?;

        let role: Option<Role> = sqlx::query_scalar("SELECT role FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        match role {
            None => return Ok(false),
            Some(Role::Admin) if admin_ids.len() <= 1 => return Err(StoreError::LastAdmin),
            Some(_) => {}
        }

        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    // --- Listings ---

    /// search_listings
    ///
    /// The `ListingQuery` renders its own WHERE clause with bound values.
    /// **Security**: the predicates never splice caller text into the SQL.
    async fn search_listings(
        &self,
        query: &ListingQuery,
        page: PageRequest,
    ) -> Result<Page<ListingRecord>, StoreError> {
        self.fetch_listing_page(
            |builder| {
                builder.push(" FROM listings l LEFT JOIN accounts o ON o.id = l.owner_id");
                query.push_where(builder);
            },
            page,
        )
        .await
    }

    async fn get_listing(&self, id: Uuid) -> Result<Option<ListingRecord>, StoreError> {
        Ok(sqlx::query_as::<_, ListingRecord>(&listing_by_id_sql(false))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// create_listing
    ///
    /// `features` and `images` are stored as JSON text. An unknown owner trips
    /// `listings_owner_id_fkey`, reported as `StoreError::MissingReference`.
    async fn create_listing(
        &self,
        owner_id: Uuid,
        listing: CreateListingRequest,
    ) -> Result<ListingRecord, StoreError> {
        let sql = listing_cte_sql(
            "INSERT INTO listings (id, title, description, property_type, location, address, \
             price, bedrooms, bathrooms, square_feet, lot_size, year_built, status, features, \
             images, owner_id, is_verified) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, FALSE)",
        );
        let created = sqlx::query_as::<_, ListingRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(listing.title)
            .bind(listing.description)
            .bind(listing.property_type)
            .bind(listing.location)
            .bind(listing.address)
            .bind(listing.price)
            .bind(listing.bedrooms)
            .bind(listing.bathrooms)
            .bind(listing.square_feet)
            .bind(listing.lot_size)
            .bind(listing.year_built)
            .bind(listing.status.unwrap_or_default())
            .bind(encode_string_list(&listing.features))
            .bind(encode_string_list(&listing.images))
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    /// update_listing
    ///
    /// A single UPDATE statement: every column changes together or not at all. `COALESCE`
    /// keeps the stored value for absent fields.
    ///
    /// *Note*: `description`, `address` and `lot_size` arrive as `""` when the caller
    /// blanked them; `NULLIF` stores that as NULL.
    async fn update_listing(
        &self,
        id: Uuid,
        changes: UpdateListingRequest,
    ) -> Result<Option<ListingRecord>, StoreError> {
        let sql = listing_cte_sql(
            "UPDATE listings SET \
                title = COALESCE($2, title), \
                description = NULLIF(COALESCE($3, description), ''), \
                property_type = COALESCE($4, property_type), \
                location = COALESCE($5, location), \
                address = NULLIF(COALESCE($6, address), ''), \
                price = COALESCE($7, price), \
                bedrooms = COALESCE($8, bedrooms), \
                bathrooms = COALESCE($9, bathrooms), \
                square_feet = COALESCE($10, square_feet), \
                lot_size = NULLIF(COALESCE($11, lot_size), ''), \
                year_built = COALESCE($12, year_built), \
                status = COALESCE($13, status), \
                features = COALESCE($14, features), \
                images = COALESCE($15, images), \
                is_verified = COALESCE($16, FALSE), \
                updated_at = NOW() \
             WHERE id = $1",
        );
        Ok(sqlx::query_as::<_, ListingRecord>(&sql)
            .bind(id)
            .bind(changes.title)
            .bind(changes.description)
            .bind(changes.property_type)
            .bind(changes.location)
            .bind(changes.address)
            .bind(changes.price)
            .bind(changes.bedrooms)
            .bind(changes.bathrooms)
            .bind(changes.square_feet)
            .bind(changes.lot_size)
            .bind(changes.year_built)
            .bind(changes.status)
            .bind(changes.features.as_deref().map(encode_string_list))
            .bind(changes.images.as_deref().map(encode_string_list))
            .bind(changes.is_verified)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn set_verification(
        &self,
        id: Uuid,
        is_verified: bool,
        notes: Option<String>,
    ) -> Result<Option<ListingRecord>, StoreError> {
        let sql = listing_cte_sql(
            "UPDATE listings SET is_verified = $2, verification_notes = $3, updated_at = NOW() \
             WHERE id = $1",
        );
        Ok(sqlx::query_as::<_, ListingRecord>(&sql)
            .bind(id)
            .bind(is_verified)
            .bind(notes)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// append_images
    ///
    /// Read-modify-write of the encoded image list under `FOR UPDATE`, so concurrent
    /// appends serialize instead of overwriting each other.
    async fn append_images(
        &self,
        id: Uuid,
        images: Vec<String>,
    ) -> Result<Option<ListingRecord>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let stored: Option<Option<String>> =
            sqlx::query_scalar("SELECT images FROM listings WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(stored) = stored else {
            return Ok(None);
        };

        let mut merged = decode_string_list(stored.as_deref(), "images", id);
        merged.extend(images);

        sqlx::query(
            "UPDATE listings SET images = $2, is_verified = FALSE, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(encode_string_list(&merged))
        .execute(&mut *tx)
        .await?;

        let updated = sqlx::query_as::<_, ListingRecord>(&listing_by_id_sql(false))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(Some(updated))
    }

    /// Returns the row as it was before the delete, owner join included.
    async fn delete_listing(&self, id: Uuid) -> Result<Option<ListingRecord>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, ListingRecord>(&listing_by_id_sql(true))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if existing.is_none() {
            return Ok(None);
        }

        // Favorites cascade and inquiries are set to NULL by the foreign keys.
        sqlx::query("DELETE FROM listings WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(existing)
    }

    // --- Favorites ---

    /// add_favorite
    ///
    /// `ON CONFLICT DO NOTHING` turns a duplicate into `Ok(false)`. A listing deleted
    /// between the handler's lookup and this insert fails `favorites_listing_id_fkey`
    /// instead, which maps to `MissingReference`.
    async fn add_favorite(&self, account_id: Uuid, listing_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT INTO favorites (account_id, listing_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(account_id)
        .bind(listing_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_favorite(
        &self,
        account_id: Uuid,
        listing_id: Uuid,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM favorites WHERE account_id = $1 AND listing_id = $2")
            .bind(account_id)
            .bind(listing_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn is_favorite(&self, account_id: Uuid, listing_id: Uuid) -> Result<bool, StoreError> {
        Ok(sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM favorites WHERE account_id = $1 AND listing_id = $2)",
        )
        .bind(account_id)
        .bind(listing_id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn favorite_listings(
        &self,
        account_id: Uuid,
        verified_only: bool,
        page: PageRequest,
    ) -> Result<Page<ListingRecord>, StoreError> {
        self.fetch_listing_page(
            |builder| {
                builder.push(
                    " FROM favorites f JOIN listings l ON l.id = f.listing_id \
                     LEFT JOIN accounts o ON o.id = l.owner_id WHERE f.account_id = ",
                );
                builder.push_bind(account_id);
                if verified_only {
                    builder.push(" AND l.is_verified = TRUE");
                }
            },
            page,
        )
        .await
    }

    // --- Inquiries ---

    async fn create_inquiry(&self, inquiry: NewInquiry) -> Result<Inquiry, StoreError> {
        let sql = inquiry_cte_sql(
            "INSERT INTO inquiries (id, name, email, phone, subject, message, listing_id, \
             sender_id) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        );
        Ok(sqlx::query_as::<_, Inquiry>(&sql)
            .bind(Uuid::new_v4())
            .bind(inquiry.name)
            .bind(inquiry.email)
            .bind(inquiry.phone)
            .bind(inquiry.subject)
            .bind(inquiry.message)
            .bind(inquiry.listing_id)
            .bind(inquiry.sender_id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn get_inquiry(&self, id: Uuid) -> Result<Option<Inquiry>, StoreError> {
        let sql = format!("{INQUIRY_SELECT} WHERE i.id = $1");
        Ok(sqlx::query_as::<_, Inquiry>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_inquiries(
        &self,
        filter: &InquiryFilter,
        page: PageRequest,
    ) -> Result<Page<Inquiry>, StoreError> {
        let push_where = |builder: &mut QueryBuilder<'_, Postgres>| {
            builder.push(" WHERE TRUE");
            if let Some(status) = filter.status {
                builder.push(" AND i.status = ");
                builder.push_bind(status);
            }
            if let Some(listing_id) = filter.listing_id {
                builder.push(" AND i.listing_id = ");
                builder.push_bind(listing_id);
            }
            if let Some(sender_id) = filter.sender_id {
                builder.push(" AND i.sender_id = ");
                builder.push_bind(sender_id);
            }
        };

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM inquiries i");
        push_where(&mut count);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(INQUIRY_SELECT);
        push_where(&mut select);
        select.push(" ORDER BY i.created_at DESC, i.id DESC LIMIT ");
        select.push_bind(page.limit());
        select.push(" OFFSET ");
        select.push_bind(page.offset());
        let items = select
            .build_query_as::<Inquiry>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            items,
            meta: page.meta(total),
        })
    }

    async fn set_inquiry_status(
        &self,
        id: Uuid,
        status: InquiryStatus,
    ) -> Result<Option<Inquiry>, StoreError> {
        let sql = inquiry_cte_sql("UPDATE inquiries SET status = $2 WHERE id = $1");
        Ok(sqlx::query_as::<_, Inquiry>(&sql)
            .bind(id)
            .bind(status)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_inquiry(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM inquiries WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- Dashboard ---

    /// Scalar subqueries, one round trip.
    async fn get_stats(&self) -> Result<DashboardStats, StoreError> {
        Ok(sqlx::query_as::<_, DashboardStats>(
            "SELECT \
                (SELECT COUNT(*) FROM listings) AS total_listings, \
                (SELECT COUNT(*) FROM listings WHERE is_verified) AS verified_listings, \
                (SELECT COUNT(*) FROM listings WHERE NOT is_verified) AS pending_verification, \
                (SELECT COUNT(*) FROM accounts) AS total_accounts, \
                (SELECT COUNT(*) FROM favorites) AS total_favorites, \
                (SELECT COUNT(*) FROM inquiries WHERE status = 'unread') AS unread_inquiries",
        )
        .fetch_one(&self.pool)
        .await?)
    }
}
