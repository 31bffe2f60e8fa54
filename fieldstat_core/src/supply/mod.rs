//! Unified supply item-entity projection.
//!
//! Heterogeneous item records - on-hand stock, incoming shipments, and
//! planned procurement - are exposed through one read-only virtual entity.
//! A [`SupplyCatalog`] holds the reference tables (items, categories,
//! sites, offices, organisations, regions) and the tagged instances; an
//! [`ItemEntity`] resolves its derived attributes on demand by walking the
//! lookup joins. A missing join row yields `"Unknown"` or `None`, never an
//! error, and nothing is materialized.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

/// Opaque identifier of one item instance.
pub type EntityId = Uuid;
pub type ItemId = Uuid;
pub type CategoryId = Uuid;
pub type SiteId = Uuid;
pub type OfficeId = Uuid;
pub type OrganisationId = Uuid;
pub type RegionId = Uuid;

/// Default calendar format used in status strings.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Placeholder for a country that cannot be resolved.
pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, Serialize)]
pub struct Item {
    pub name: String,
    pub category: Option<CategoryId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemCategory {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Site {
    pub name: String,
    pub office: Option<OfficeId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Office {
    pub name: String,
    pub organisation: Option<OrganisationId>,
    pub region: Option<RegionId>,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Organisation {
    pub name: String,
    /// Suppressed in the projection; the full name is authoritative
    pub acronym: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Region {
    pub name: String,
    /// 0 marks a country; deeper levels chain to a parent
    pub level: u8,
    pub parent: Option<RegionId>,
}

/// The discriminator of an item instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceType {
    Stock,
    Receiving,
    Planned,
}

impl InstanceType {
    pub fn label(&self) -> &'static str {
        match self {
            InstanceType::Stock => "stock",
            InstanceType::Receiving => "receiving",
            InstanceType::Planned => "planned",
        }
    }
}

/// One concrete item record, tagged by kind.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "instance_type", rename_all = "snake_case")]
pub enum ItemInstance {
    /// On-hand stock at a site, optionally with an expiry date
    Stock {
        item: ItemId,
        site: SiteId,
        quantity: f64,
        expiry: Option<NaiveDate>,
    },
    /// An incoming shipment, optionally with an arrival estimate
    Receiving {
        item: ItemId,
        site: SiteId,
        quantity: f64,
        eta: Option<NaiveDate>,
    },
    /// Planned procurement, optionally with a target date
    Planned {
        item: ItemId,
        site: SiteId,
        quantity: f64,
        eta: Option<NaiveDate>,
    },
}

impl ItemInstance {
    pub fn instance_type(&self) -> InstanceType {
        match self {
            ItemInstance::Stock { .. } => InstanceType::Stock,
            ItemInstance::Receiving { .. } => InstanceType::Receiving,
            ItemInstance::Planned { .. } => InstanceType::Planned,
        }
    }

    fn item(&self) -> ItemId {
        match self {
            ItemInstance::Stock { item, .. }
            | ItemInstance::Receiving { item, .. }
            | ItemInstance::Planned { item, .. } => *item,
        }
    }

    fn site(&self) -> SiteId {
        match self {
            ItemInstance::Stock { site, .. }
            | ItemInstance::Receiving { site, .. }
            | ItemInstance::Planned { site, .. } => *site,
        }
    }

    pub fn quantity(&self) -> f64 {
        match self {
            ItemInstance::Stock { quantity, .. }
            | ItemInstance::Receiving { quantity, .. }
            | ItemInstance::Planned { quantity, .. } => *quantity,
        }
    }
}

/// Reference tables plus the tagged instances.
///
/// Backed by ordered maps so iteration (and therefore filtering and
/// export) is deterministic.
#[derive(Debug, Clone, Default)]
pub struct SupplyCatalog {
    items: BTreeMap<ItemId, Item>,
    categories: BTreeMap<CategoryId, ItemCategory>,
    sites: BTreeMap<SiteId, Site>,
    offices: BTreeMap<OfficeId, Office>,
    organisations: BTreeMap<OrganisationId, Organisation>,
    regions: BTreeMap<RegionId, Region>,
    instances: BTreeMap<EntityId, ItemInstance>,
}

impl SupplyCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_category(&mut self, category: ItemCategory) -> CategoryId {
        let id = Uuid::new_v4();
        self.categories.insert(id, category);
        id
    }

    pub fn add_item(&mut self, item: Item) -> ItemId {
        let id = Uuid::new_v4();
        self.items.insert(id, item);
        id
    }

    pub fn add_region(&mut self, region: Region) -> RegionId {
        let id = Uuid::new_v4();
        self.regions.insert(id, region);
        id
    }

    pub fn add_organisation(&mut self, organisation: Organisation) -> OrganisationId {
        let id = Uuid::new_v4();
        self.organisations.insert(id, organisation);
        id
    }

    pub fn add_office(&mut self, office: Office) -> OfficeId {
        let id = Uuid::new_v4();
        self.offices.insert(id, office);
        id
    }

    pub fn add_site(&mut self, site: Site) -> SiteId {
        let id = Uuid::new_v4();
        self.sites.insert(id, site);
        id
    }

    pub fn add_instance(&mut self, instance: ItemInstance) -> EntityId {
        let id = Uuid::new_v4();
        self.instances.insert(id, instance);
        id
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Resolve one entity by id.
    pub fn entity(&self, id: EntityId) -> Option<ItemEntity<'_>> {
        self.instances.get(&id).map(|instance| ItemEntity {
            catalog: self,
            id,
            instance,
        })
    }

    /// All entities, in stable id order.
    pub fn entities(&self) -> impl Iterator<Item = ItemEntity<'_>> {
        self.instances.iter().map(|(&id, instance)| ItemEntity {
            catalog: self,
            id,
            instance,
        })
    }

    /// Entities passing a filter, in stable id order.
    pub fn filter<'a>(&'a self, filter: &'a EntityFilter) -> Vec<ItemEntity<'a>> {
        self.entities().filter(|e| filter.matches(e)).collect()
    }

    /// Serializable rows of the filtered view.
    pub fn export(&self, filter: &EntityFilter, date_format: &str) -> Vec<EntityRow> {
        self.filter(filter)
            .into_iter()
            .map(|e| e.row(date_format))
            .collect()
    }
}

/// Read-only virtual entity over one item instance.
///
/// Every attribute is a lookup join computed on demand.
#[derive(Debug, Clone, Copy)]
pub struct ItemEntity<'a> {
    catalog: &'a SupplyCatalog,
    id: EntityId,
    instance: &'a ItemInstance,
}

impl<'a> ItemEntity<'a> {
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn instance_type(&self) -> InstanceType {
        self.instance.instance_type()
    }

    pub fn quantity(&self) -> f64 {
        self.instance.quantity()
    }

    /// Item name, when the item row exists.
    pub fn item_name(&self) -> Option<&'a str> {
        self.catalog
            .items
            .get(&self.instance.item())
            .map(|i| i.name.as_str())
    }

    /// Item category name: item -> category -> name.
    pub fn category(&self) -> Option<&'a str> {
        let item = self.catalog.items.get(&self.instance.item())?;
        let category = self.catalog.categories.get(&item.category?)?;
        Some(category.name.as_str())
    }

    /// Country name: site -> office -> level-0 region, `"Unknown"` when any
    /// join is missing.
    pub fn country(&self) -> &'a str {
        self.resolve_country().unwrap_or(UNKNOWN)
    }

    fn resolve_country(&self) -> Option<&'a str> {
        let office = self.office()?;
        let mut region = self.catalog.regions.get(&office.region?)?;
        // walk up until the country level; bounded by the region chain
        let mut hops = 0;
        while region.level != 0 {
            region = self.catalog.regions.get(&region.parent?)?;
            hops += 1;
            if hops > self.catalog.regions.len() {
                return None;
            }
        }
        Some(region.name.as_str())
    }

    /// Organisation name (acronym suppressed): site -> office -> organisation.
    pub fn organisation(&self) -> Option<&'a str> {
        let office = self.office()?;
        let organisation = self.catalog.organisations.get(&office.organisation?)?;
        Some(organisation.name.as_str())
    }

    /// Contact text: office comments.
    pub fn contacts(&self) -> Option<&'a str> {
        self.office()?.comments.as_deref()
    }

    /// Type-specific status string with the default date format.
    pub fn status(&self) -> String {
        self.status_with(DEFAULT_DATE_FORMAT)
    }

    /// Type-specific status string.
    pub fn status_with(&self, date_format: &str) -> String {
        match self.instance {
            ItemInstance::Stock { expiry, .. } => match expiry {
                Some(date) => format!("Stock Expires {}", date.format(date_format)),
                None => "In Stock".to_string(),
            },
            ItemInstance::Receiving { eta, .. } => match eta {
                Some(date) => format!("Order Due {}", date.format(date_format)),
                None => "On Order".to_string(),
            },
            ItemInstance::Planned { eta, .. } => match eta {
                Some(date) => format!("Planned {}", date.format(date_format)),
                None => "Planned Procurement".to_string(),
            },
        }
    }

    fn office(&self) -> Option<&'a Office> {
        let site = self.catalog.sites.get(&self.instance.site())?;
        self.catalog.offices.get(&site.office?)
    }

    /// Flatten the derived attributes into an export row.
    pub fn row(&self, date_format: &str) -> EntityRow {
        EntityRow {
            id: self.id,
            instance_type: self.instance_type(),
            item: self.item_name().map(str::to_string),
            category: self.category().map(str::to_string),
            country: self.country().to_string(),
            organisation: self.organisation().map(str::to_string),
            status: self.status_with(date_format),
            contacts: self.contacts().map(str::to_string),
            quantity: self.quantity(),
        }
    }
}

/// Flat, serializable view of one entity.
#[derive(Debug, Clone, Serialize)]
pub struct EntityRow {
    pub id: EntityId,
    pub instance_type: InstanceType,
    pub item: Option<String>,
    pub category: Option<String>,
    pub country: String,
    pub organisation: Option<String>,
    pub status: String,
    pub contacts: Option<String>,
    pub quantity: f64,
}

/// Predicates over the derived attributes; unset fields match everything.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EntityFilter {
    pub instance_type: Option<InstanceType>,
    pub category: Option<String>,
    pub country: Option<String>,
    pub organisation: Option<String>,
    /// Matched as a prefix so dated statuses can be selected by family,
    /// e.g. `"Stock Expires"`
    pub status: Option<String>,
}

impl EntityFilter {
    pub fn matches(&self, entity: &ItemEntity<'_>) -> bool {
        if let Some(kind) = self.instance_type {
            if entity.instance_type() != kind {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if entity.category() != Some(category.as_str()) {
                return false;
            }
        }
        if let Some(country) = &self.country {
            if entity.country() != country {
                return false;
            }
        }
        if let Some(organisation) = &self.organisation {
            if entity.organisation() != Some(organisation.as_str()) {
                return false;
            }
        }
        if let Some(status) = &self.status {
            if !entity.status().starts_with(status.as_str()) {
                return false;
            }
        }
        true
    }

    /// Compact description used by the export log.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(kind) = self.instance_type {
            parts.push(format!("type={}", kind.label()));
        }
        if let Some(c) = &self.category {
            parts.push(format!("category={}", c));
        }
        if let Some(c) = &self.country {
            parts.push(format!("country={}", c));
        }
        if let Some(o) = &self.organisation {
            parts.push(format!("organisation={}", o));
        }
        if let Some(s) = &self.status {
            parts.push(format!("status={}", s));
        }
        if parts.is_empty() {
            "all".to_string()
        } else {
            parts.join(", ")
        }
    }
}
