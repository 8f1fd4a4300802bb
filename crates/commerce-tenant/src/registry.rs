//! Store registry and lifecycle

use crate::model::Store;
use chrono::Utc;
use commerce_billing::ConnectedAccountStatus;
use commerce_common::{CommerceError, CommerceResult, StoreId, UserId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Fields a store owner may change after creation.
#[derive(Debug, Clone, Default)]
pub struct TenantUpdate {
    pub name: Option<String>,
    pub subdomain: Option<String>,
    pub custom_domain: Option<String>,
}

/// Store registry
pub struct TenantRegistry {
    stores: Arc<RwLock<HashMap<StoreId, Store>>>,
}

impl TenantRegistry {
    pub fn new() -> Self {
        Self {
            stores: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create a store. One store per owner; subdomains are unique.
    pub fn create(&self, name: &str, subdomain: &str, owner_id: UserId) -> CommerceResult<Store> {
        let mut stores = self.stores.write();
        if stores
            .values()
            .any(|s| s.subdomain.as_deref() == Some(subdomain))
        {
            return Err(CommerceError::AlreadyInUse("subdomain"));
        }
        if stores.values().any(|s| s.owner_id == owner_id) {
            return Err(CommerceError::Invalid("user already owns a store".into()));
        }

        let store = Store::new(name, subdomain, owner_id);
        stores.insert(store.id.clone(), store.clone());
        Ok(store)
    }

    /// Get store by id.
    pub fn get(&self, id: &StoreId) -> Option<Store> {
        self.stores.read().get(id).cloned()
    }

    /// Exact subdomain lookup.
    pub fn get_by_subdomain(&self, subdomain: &str) -> Option<Store> {
        self.stores
            .read()
            .values()
            .find(|s| s.subdomain.as_deref() == Some(subdomain))
            .cloned()
    }

    /// Exact custom-domain lookup.
    pub fn get_by_custom_domain(&self, domain: &str) -> Option<Store> {
        self.stores
            .read()
            .values()
            .find(|s| s.custom_domain.as_deref() == Some(domain))
            .cloned()
    }

    /// Update identity fields, enforcing cross-store uniqueness.
    pub fn update(&self, id: &StoreId, update: TenantUpdate) -> CommerceResult<Store> {
        let mut stores = self.stores.write();

        if let Some(subdomain) = &update.subdomain {
            if stores
                .values()
                .any(|s| s.id != *id && s.subdomain.as_deref() == Some(subdomain.as_str()))
            {
                return Err(CommerceError::AlreadyInUse("subdomain"));
            }
        }
        if let Some(domain) = &update.custom_domain {
            if stores
                .values()
                .any(|s| s.id != *id && s.custom_domain.as_deref() == Some(domain.as_str()))
            {
                return Err(CommerceError::AlreadyInUse("custom domain"));
            }
        }

        let store = stores.get_mut(id).ok_or(CommerceError::TenantNotFound)?;
        if let Some(name) = update.name {
            store.name = name;
        }
        if let Some(subdomain) = update.subdomain {
            store.subdomain = Some(subdomain);
        }
        if let Some(domain) = update.custom_domain {
            store.custom_domain = Some(domain);
        }
        store.updated_at = Utc::now();
        Ok(store.clone())
    }

    /// Activate or deactivate a store.
    pub fn set_active(&self, id: &StoreId, is_active: bool) -> CommerceResult<Store> {
        let mut stores = self.stores.write();
        let store = stores.get_mut(id).ok_or(CommerceError::TenantNotFound)?;
        store.is_active = is_active;
        store.updated_at = Utc::now();
        Ok(store.clone())
    }

    /// Mark onboarding finished.
    pub fn complete_setup(&self, id: &StoreId) -> CommerceResult<Store> {
        let mut stores = self.stores.write();
        let store = stores.get_mut(id).ok_or(CommerceError::TenantNotFound)?;
        store.setup_completed = true;
        store.updated_at = Utc::now();
        Ok(store.clone())
    }

    /// Soft delete: deactivate and scramble the subdomain so it frees up
    /// immediately. The row itself is never removed.
    pub fn soft_delete(&self, id: &StoreId) -> CommerceResult<()> {
        let mut stores = self.stores.write();
        let store = stores.get_mut(id).ok_or(CommerceError::TenantNotFound)?;
        store.is_active = false;
        store.subdomain = Some(format!("deleted_{}_{}", id, Utc::now().timestamp()));
        store.custom_domain = None;
        store.updated_at = Utc::now();
        Ok(())
    }

    /// Record a freshly created connected payout account.
    pub fn attach_connected_account(&self, id: &StoreId, account_id: &str) -> CommerceResult<Store> {
        let mut stores = self.stores.write();
        let store = stores.get_mut(id).ok_or(CommerceError::TenantNotFound)?;
        if store.processor_account_id.is_some() {
            return Err(CommerceError::AlreadyInUse("connected account"));
        }
        store.processor_account_id = Some(account_id.to_string());
        store.processor_account_status = Some(ConnectedAccountStatus::Pending);
        store.updated_at = Utc::now();
        Ok(store.clone())
    }

    /// Mirror processor capability flags onto the store.
    pub fn update_account_status(
        &self,
        id: &StoreId,
        status: ConnectedAccountStatus,
        charges_enabled: bool,
        payouts_enabled: bool,
    ) -> CommerceResult<Store> {
        let mut stores = self.stores.write();
        let store = stores.get_mut(id).ok_or(CommerceError::TenantNotFound)?;
        store.processor_account_status = Some(status);
        store.charges_enabled = charges_enabled;
        store.payouts_enabled = payouts_enabled;
        store.updated_at = Utc::now();
        Ok(store.clone())
    }

    /// Whether a subdomain is free.
    pub fn subdomain_available(&self, subdomain: &str) -> bool {
        self.get_by_subdomain(subdomain).is_none()
    }

    /// Whether a custom domain is free.
    pub fn custom_domain_available(&self, domain: &str) -> bool {
        self.get_by_custom_domain(domain).is_none()
    }

    /// Number of registered stores (active or not).
    pub fn count(&self) -> usize {
        self.stores.read().len()
    }
}

impl Default for TenantRegistry {
    fn default() -> Self {
        Self::new()
    }
}
