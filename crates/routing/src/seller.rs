use std::collections::BTreeMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use forgeroute_core::{Coordinates, SellerId};

use crate::store::StoreError;

/// A physical seller location that can pick, pack and ship orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seller {
    pub id: SellerId,
    pub business_name: String,
    pub active: bool,
    /// Assignments to this seller are accepted immediately.
    pub auto_accept: bool,
    pub coordinates: Option<Coordinates>,
}

/// Read/write access to seller profiles (owned by the seller onboarding
/// collaborator; the engine only reads them).
pub trait SellerDirectory: Send + Sync {
    fn active_sellers(&self) -> Result<Vec<Seller>, StoreError>;

    fn get(&self, id: SellerId) -> Result<Option<Seller>, StoreError>;

    fn upsert(&self, seller: Seller) -> Result<(), StoreError>;
}

impl<D> SellerDirectory for std::sync::Arc<D>
where
    D: SellerDirectory + ?Sized,
{
    fn active_sellers(&self) -> Result<Vec<Seller>, StoreError> {
        (**self).active_sellers()
    }

    fn get(&self, id: SellerId) -> Result<Option<Seller>, StoreError> {
        (**self).get(id)
    }

    fn upsert(&self, seller: Seller) -> Result<(), StoreError> {
        (**self).upsert(seller)
    }
}

/// In-memory seller directory.
///
/// Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemorySellerDirectory {
    sellers: RwLock<BTreeMap<SellerId, Seller>>,
}

impl InMemorySellerDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SellerDirectory for InMemorySellerDirectory {
    fn active_sellers(&self) -> Result<Vec<Seller>, StoreError> {
        let sellers = self
            .sellers
            .read()
            .map_err(|_| StoreError::backend("lock poisoned"))?;
        Ok(sellers.values().filter(|s| s.active).cloned().collect())
    }

    fn get(&self, id: SellerId) -> Result<Option<Seller>, StoreError> {
        let sellers = self
            .sellers
            .read()
            .map_err(|_| StoreError::backend("lock poisoned"))?;
        Ok(sellers.get(&id).cloned())
    }

    fn upsert(&self, seller: Seller) -> Result<(), StoreError> {
        let mut sellers = self
            .sellers
            .write()
            .map_err(|_| StoreError::backend("lock poisoned"))?;
        sellers.insert(seller.id, seller);
        Ok(())
    }
}
