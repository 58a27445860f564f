use crate::database::ListingStore;
use crate::error::StoreError;
use crate::models::{Listing, Platform};
use std::collections::HashSet;
use std::sync::Arc;

/// Trim and lower-case a field before it takes part in a signature
pub fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Natural identity of a listing: normalized title and company plus source.
/// Distinct from the generated id, which is only a persistence handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    pub title: String,
    pub company: String,
    pub source: Platform,
}

impl Signature {
    pub fn new(title: &str, company: &str, source: Platform) -> Self {
        Self {
            title: normalize(title),
            company: normalize(company),
            source,
        }
    }

    pub fn of(listing: &Listing) -> Self {
        Self::new(&listing.title, &listing.company, listing.source)
    }
}

/// Filters out listings that are already stored and records the rest
pub struct Deduplicator {
    store: Arc<dyn ListingStore>,
}

impl Deduplicator {
    pub fn new(store: Arc<dyn ListingStore>) -> Self {
        Self { store }
    }

    pub fn is_duplicate(&self, signature: &Signature) -> Result<bool, StoreError> {
        Ok(self.store.find_by_signature(signature)?.is_some())
    }

    /// Insert one listing unless its signature is known.
    ///
    /// Returns `Ok(false)` for a duplicate, including one that lost an insert
    /// race against a concurrent pass.
    pub fn record(&self, listing: &Listing) -> Result<bool, StoreError> {
        let signature = Signature::of(listing);
        if self.is_duplicate(&signature)? {
            tracing::debug!("Listing already stored: {} at {}", listing.title, listing.company);
            return Ok(false);
        }

        match self.store.insert(listing) {
            Ok(()) => Ok(true),
            Err(e) if e.is_duplicate() => {
                tracing::debug!("Lost insert race for: {} at {}", listing.title, listing.company);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Records each listing in order and returns the ones that were new.
    /// Listings repeated inside the batch are only considered once. A store
    /// failure drops that one listing and is logged.
    pub fn filter_new(&self, listings: Vec<Listing>) -> Vec<Listing> {
        let mut seen: HashSet<Signature> = HashSet::new();
        let mut new_listings = Vec::new();

        for listing in listings {
            if !seen.insert(Signature::of(&listing)) {
                continue;
            }
            match self.record(&listing) {
                Ok(true) => new_listings.push(listing),
                Ok(false) => {}
                Err(e) => {
                    tracing::error!("Failed to save {} at {}: {}", listing.title, listing.company, e);
                }
            }
        }

        new_listings
    }
}
