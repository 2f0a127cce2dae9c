//! Registry of organizations, products, and lots.
//!
//! Holds the static attributes of the entities the ledger moves around.
//! Lots and virtual codes are never deleted; medical traceability
//! requires permanent retention.

use std::collections::HashMap;

use chrono::NaiveDate;

use medtrace_core::{
    DeactivationReason, Lot, LotId, OrgId, OrgKind, OrgStatus, Organization, Product, ProductId,
};

use crate::error::LedgerError;

/// In-memory registry. Lives inside the ledger's lock, so it has no
/// synchronization of its own.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    orgs: HashMap<OrgId, Organization>,
    products: HashMap<ProductId, Product>,
    lots: HashMap<LotId, Lot>,
    lots_by_product: HashMap<ProductId, Vec<LotId>>,
    /// Per-manufacturer production counter, feeds lot-number derivation.
    production_seq: HashMap<OrgId, u32>,
    next_org: u64,
    next_product: u64,
    next_lot: u64,
}

impl Registry {
    pub fn register_organization(
        &mut self,
        name: impl Into<String>,
        kind: OrgKind,
        prefix: impl Into<String>,
    ) -> OrgId {
        self.next_org += 1;
        let id = OrgId(self.next_org);
        self.orgs.insert(id, Organization::new(id, name, kind, prefix));
        id
    }

    pub fn set_organization_status(
        &mut self,
        id: OrgId,
        status: OrgStatus,
    ) -> Result<(), LedgerError> {
        let org = self
            .orgs
            .get_mut(&id)
            .ok_or(LedgerError::UnknownOrganization(id))?;
        org.status = status;
        Ok(())
    }

    pub fn organization(&self, id: OrgId) -> Result<&Organization, LedgerError> {
        self.orgs.get(&id).ok_or(LedgerError::UnknownOrganization(id))
    }

    pub fn register_product(
        &mut self,
        manufacturer: OrgId,
        udi_di: impl Into<String>,
        model_name: impl Into<String>,
    ) -> Result<ProductId, LedgerError> {
        let org = self.organization(manufacturer)?;
        if org.kind != OrgKind::Manufacturer {
            return Err(LedgerError::NotAManufacturer(manufacturer));
        }
        self.next_product += 1;
        let id = ProductId(self.next_product);
        self.products
            .insert(id, Product::new(id, manufacturer, udi_di, model_name));
        Ok(id)
    }

    pub fn deactivate_product(
        &mut self,
        id: ProductId,
        reason: DeactivationReason,
    ) -> Result<(), LedgerError> {
        let product = self
            .products
            .get_mut(&id)
            .ok_or(LedgerError::UnknownProduct(id))?;
        product.deactivate(reason);
        Ok(())
    }

    pub fn product(&self, id: ProductId) -> Result<&Product, LedgerError> {
        self.products.get(&id).ok_or(LedgerError::UnknownProduct(id))
    }

    pub fn lot(&self, id: LotId) -> Result<&Lot, LedgerError> {
        self.lots.get(&id).ok_or(LedgerError::UnknownLot(id))
    }

    pub fn lots_of(&self, product: ProductId) -> Vec<&Lot> {
        self.lots_by_product
            .get(&product)
            .map(|ids| ids.iter().filter_map(|id| self.lots.get(id)).collect())
            .unwrap_or_default()
    }

    /// Create a lot for a product. Fails if the product is deactivated:
    /// deactivation blocks new production, not circulation of existing
    /// codes.
    pub fn register_lot(
        &mut self,
        product_id: ProductId,
        manufacture_date: NaiveDate,
        expiry_date: NaiveDate,
        quantity: u32,
    ) -> Result<Lot, LedgerError> {
        let product = self.product(product_id)?;
        if !product.is_active {
            return Err(LedgerError::ProductInactive(product_id));
        }
        let manufacturer = product.manufacturer;
        let prefix = self.organization(manufacturer)?.prefix.clone();

        let seq = self.production_seq.entry(manufacturer).or_insert(0);
        *seq += 1;
        let lot_number = Lot::derive_lot_number(&prefix, manufacture_date, *seq);

        self.next_lot += 1;
        let id = LotId(self.next_lot);
        let lot = Lot {
            id,
            product: product_id,
            lot_number,
            manufacture_date,
            expiry_date,
            quantity,
        };
        self.lots.insert(id, lot.clone());
        self.lots_by_product.entry(product_id).or_default().push(id);
        Ok(lot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn registry_with_product() -> (Registry, OrgId, ProductId) {
        let mut registry = Registry::default();
        let maker = registry.register_organization("Acme", OrgKind::Manufacturer, "ACM");
        let product = registry.register_product(maker, "UDI-0001", "Stent X2").unwrap();
        (registry, maker, product)
    }

    #[test]
    fn product_registration_requires_manufacturer() {
        let mut registry = Registry::default();
        let hospital = registry.register_organization("St. Jude", OrgKind::Hospital, "SJH");
        assert_eq!(
            registry.register_product(hospital, "UDI-0002", "X"),
            Err(LedgerError::NotAManufacturer(hospital))
        );
    }

    #[test]
    fn lot_numbers_sequence_per_manufacturer() {
        let (mut registry, _, product) = registry_with_product();
        let l1 = registry
            .register_lot(product, date(2026, 1, 10), date(2028, 1, 10), 100)
            .unwrap();
        let l2 = registry
            .register_lot(product, date(2026, 1, 12), date(2028, 1, 12), 50)
            .unwrap();

        assert_eq!(l1.lot_number, "ACM-260110-001");
        assert_eq!(l2.lot_number, "ACM-260112-002");
        assert_eq!(registry.lots_of(product).len(), 2);
    }

    #[test]
    fn deactivated_product_rejects_new_lots() {
        let (mut registry, _, product) = registry_with_product();
        registry
            .deactivate_product(product, DeactivationReason::QualityIssue)
            .unwrap();

        assert_eq!(
            registry.register_lot(product, date(2026, 2, 1), date(2028, 2, 1), 10),
            Err(LedgerError::ProductInactive(product))
        );
    }
}
