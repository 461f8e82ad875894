//! Which listings a caller may see.
//!
//! Unverified listings are revealed only when the caller holds `ViewAllListings` *and*
//! explicitly asks with `show_all`. Any other combination sees verified listings only, and a
//! hidden listing fetched by id is reported as not found.

use crate::auth::{AuthUser, Permission, caller_can};
use crate::models::ListingRecord;
use crate::search::predicate::{ListingQuery, Predicate};

pub fn reveals_unverified(caller: Option<&AuthUser>, show_all: bool) -> bool {
    show_all && caller_can(caller, Permission::ViewAllListings)
}

/// Narrows `query` to verified listings unless the caller may see everything.
pub fn apply(query: ListingQuery, caller: Option<&AuthUser>, show_all: bool) -> ListingQuery {
    if reveals_unverified(caller, show_all) {
        query
    } else {
        query.and(Predicate::Verified)
    }
}

/// The single-record form of `apply`.
pub fn is_visible(record: &ListingRecord, caller: Option<&AuthUser>, show_all: bool) -> bool {
    record.is_verified || reveals_unverified(caller, show_all)
}
