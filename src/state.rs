//! # Application State
//!
//! Domain records and the in-memory stores shared across requests. The
//! stores are the authoritative working set; when `DATABASE_URL` is set they
//! are hydrated from Postgres on startup and every mutation is written
//! through (see the route handlers and `db::*`).
//!
//! All stores are cheap-to-clone handles over `parking_lot` locks. Lock
//! scopes are kept short and never cross an `.await`.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPool;
use utoipa::ToSchema;

use crate::matrix::reconcile::EdgeOp;
use crate::matrix::{CapabilityFlags, EdgeKey, InterfaceId, RoleId};

// ── Domain records ──────────────────────────────────────────────────────────

/// A named permission group assignable to users. Soft-deactivated, never
/// hard-deleted; the capability engine only reads roles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Role {
    pub role_id: RoleId,
    pub name: String,
    pub description: String,
    pub active: bool,
}

/// A functional module (screen or API area) that capability edges can gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Interface {
    pub interface_id: InterfaceId,
    pub name: String,
    pub description: String,
    pub active: bool,
}

/// Reference geography: country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Country {
    pub country_id: i32,
    pub name: String,
    /// Three-letter uppercase ISO code, e.g. "NIC".
    pub iso_code: String,
    pub active: bool,
}

/// Reference geography: department, belongs to a country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Department {
    pub department_id: i32,
    pub name: String,
    pub country_id: i32,
    pub active: bool,
}

/// Reference geography: municipality, belongs to a department.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Municipality {
    pub municipality_id: i32,
    pub name: String,
    pub department_id: i32,
    pub active: bool,
}

/// Soil-chemistry catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChemicalElement {
    pub element_id: i32,
    pub symbol: String,
    pub name: String,
    pub equivalent_weight: f64,
    pub active: bool,
}

/// A registered land parcel. Located by municipality; owner contact fields
/// are free-form and bounded at the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LandParcel {
    pub parcel_id: i32,
    pub code: String,
    pub owner_identification: String,
    pub owner_name: String,
    pub owner_phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_email: Option<String>,
    pub address: String,
    /// Surface area in manzanas, the unit the deeds use.
    pub area_manzanas: f64,
    pub registered_on: NaiveDate,
    pub municipality_id: i32,
    /// Expected yield in quintales oro.
    pub yield_quintals: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub active: bool,
}

/// A laboratory soil analysis. The identifier is the laboratory's own
/// reference and stays reserved even after deactivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SoilAnalysis {
    pub analysis_id: i32,
    pub sampled_on: NaiveDate,
    pub laboratory: String,
    pub identifier: String,
    pub active: bool,
}

/// One element reading inside a soil analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AnalysisMeasurement {
    pub measurement_id: i32,
    pub analysis_id: i32,
    pub element_id: i32,
    pub quantity: f64,
    /// Reporting unit as printed on the lab sheet, e.g. "meq/100g" or "ppm".
    pub unit: String,
    pub active: bool,
}

/// Errors shared by the directory-style stores.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    #[error("record not found or not active")]
    NotFound,
    /// Another ACTIVE record already carries this name (or symbol/ISO code).
    #[error("an active record with that name already exists")]
    Duplicate,
}

fn trimmed_lower(name: &str) -> String {
    name.trim().to_lowercase()
}

// ── Role directory ──────────────────────────────────────────────────────────

/// Authoritative list of roles. Name uniqueness is enforced among ACTIVE
/// roles only, case-insensitively; inactive roles may share a name with a
/// newer active one.
#[derive(Clone, Default)]
pub struct RoleDirectory {
    inner: Arc<RwLock<BTreeMap<RoleId, Role>>>,
    next_id: Arc<AtomicI32>,
}

impl RoleDirectory {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: Arc::new(AtomicI32::new(1)),
        }
    }

    /// Replace the working set with rows loaded from the database.
    pub fn hydrate(&self, records: Vec<Role>) {
        let mut map = self.inner.write();
        let max_id = records.iter().map(|r| r.role_id).max().unwrap_or(0);
        *map = records.into_iter().map(|r| (r.role_id, r)).collect();
        self.next_id.store(max_id + 1, Ordering::SeqCst);
    }

    /// Create a new active role. Fails if an active role already has the name.
    pub fn create(&self, name: &str, description: &str) -> Result<Role, DirectoryError> {
        let name = name.trim().to_string();
        let key = trimmed_lower(&name);
        let mut map = self.inner.write();
        if map.values().any(|r| r.active && trimmed_lower(&r.name) == key) {
            return Err(DirectoryError::Duplicate);
        }
        let role_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let role = Role {
            role_id,
            name,
            description: description.to_string(),
            active: true,
        };
        map.insert(role_id, role.clone());
        Ok(role)
    }

    /// Whether a role with this id exists at all, active or not. The batch
    /// reconciler checks existence permissively.
    pub fn exists(&self, id: RoleId) -> bool {
        self.inner.read().contains_key(&id)
    }

    pub fn find_active_by_id(&self, id: RoleId) -> Option<Role> {
        self.inner.read().get(&id).filter(|r| r.active).cloned()
    }

    /// Exact-match lookup by trimmed name among active roles.
    pub fn find_active_by_name(&self, name: &str) -> Option<Role> {
        let wanted = name.trim();
        self.inner
            .read()
            .values()
            .find(|r| r.active && r.name == wanted)
            .cloned()
    }

    /// Every role, active or not. The projector filters at read time.
    pub fn list_all(&self) -> Vec<Role> {
        self.inner.read().values().cloned().collect()
    }

    /// Active roles sorted by name.
    pub fn list_active(&self) -> Vec<Role> {
        let mut roles: Vec<Role> = self.inner.read().values().filter(|r| r.active).cloned().collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        roles
    }

    /// Every known role id, for permissive existence checks.
    pub fn ids(&self) -> BTreeSet<RoleId> {
        self.inner.read().keys().copied().collect()
    }

    /// Rename/redescribe an active role.
    pub fn update(&self, id: RoleId, name: &str, description: &str) -> Result<Role, DirectoryError> {
        let name = name.trim().to_string();
        let key = trimmed_lower(&name);
        let mut map = self.inner.write();
        if map
            .values()
            .any(|r| r.active && r.role_id != id && trimmed_lower(&r.name) == key)
        {
            return Err(DirectoryError::Duplicate);
        }
        let role = map.get_mut(&id).filter(|r| r.active).ok_or(DirectoryError::NotFound)?;
        role.name = name;
        role.description = description.to_string();
        Ok(role.clone())
    }

    /// Soft-deactivate. The record stays; its capability edges stay too and
    /// are filtered out of the dense matrix at read time.
    pub fn deactivate(&self, id: RoleId) -> Result<Role, DirectoryError> {
        let mut map = self.inner.write();
        let role = map.get_mut(&id).filter(|r| r.active).ok_or(DirectoryError::NotFound)?;
        role.active = false;
        Ok(role.clone())
    }

    /// Re-flip the active flag. Idempotent for an already-active role; fails
    /// with `Duplicate` when another active role took the name meanwhile.
    pub fn reactivate(&self, id: RoleId) -> Result<Role, DirectoryError> {
        let mut map = self.inner.write();
        let key = {
            let role = map.get(&id).ok_or(DirectoryError::NotFound)?;
            if role.active {
                return Ok(role.clone());
            }
            trimmed_lower(&role.name)
        };
        if map
            .values()
            .any(|r| r.active && r.role_id != id && trimmed_lower(&r.name) == key)
        {
            return Err(DirectoryError::Duplicate);
        }
        let role = map.get_mut(&id).expect("checked above");
        role.active = true;
        Ok(role.clone())
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn active_len(&self) -> usize {
        self.inner.read().values().filter(|r| r.active).count()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

// ── Interface directory ─────────────────────────────────────────────────────

/// Authoritative list of capability domains. Same lifecycle discipline as
/// the role directory.
#[derive(Clone, Default)]
pub struct InterfaceDirectory {
    inner: Arc<RwLock<BTreeMap<InterfaceId, Interface>>>,
    next_id: Arc<AtomicI32>,
}

impl InterfaceDirectory {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: Arc::new(AtomicI32::new(1)),
        }
    }

    pub fn hydrate(&self, records: Vec<Interface>) {
        let mut map = self.inner.write();
        let max_id = records.iter().map(|r| r.interface_id).max().unwrap_or(0);
        *map = records.into_iter().map(|r| (r.interface_id, r)).collect();
        self.next_id.store(max_id + 1, Ordering::SeqCst);
    }

    pub fn create(&self, name: &str, description: &str) -> Result<Interface, DirectoryError> {
        let name = name.trim().to_string();
        let key = trimmed_lower(&name);
        let mut map = self.inner.write();
        if map.values().any(|i| i.active && trimmed_lower(&i.name) == key) {
            return Err(DirectoryError::Duplicate);
        }
        let interface_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let interface = Interface {
            interface_id,
            name,
            description: description.to_string(),
            active: true,
        };
        map.insert(interface_id, interface.clone());
        Ok(interface)
    }

    pub fn exists(&self, id: InterfaceId) -> bool {
        self.inner.read().contains_key(&id)
    }

    pub fn find_active_by_id(&self, id: InterfaceId) -> Option<Interface> {
        self.inner.read().get(&id).filter(|i| i.active).cloned()
    }

    pub fn find_active_by_name(&self, name: &str) -> Option<Interface> {
        let wanted = name.trim();
        self.inner
            .read()
            .values()
            .find(|i| i.active && i.name == wanted)
            .cloned()
    }

    pub fn list_all(&self) -> Vec<Interface> {
        self.inner.read().values().cloned().collect()
    }

    pub fn list_active(&self) -> Vec<Interface> {
        let mut interfaces: Vec<Interface> =
            self.inner.read().values().filter(|i| i.active).cloned().collect();
        interfaces.sort_by(|a, b| a.name.cmp(&b.name));
        interfaces
    }

    pub fn ids(&self) -> BTreeSet<InterfaceId> {
        self.inner.read().keys().copied().collect()
    }

    pub fn update(
        &self,
        id: InterfaceId,
        name: &str,
        description: &str,
    ) -> Result<Interface, DirectoryError> {
        let name = name.trim().to_string();
        let key = trimmed_lower(&name);
        let mut map = self.inner.write();
        if map
            .values()
            .any(|i| i.active && i.interface_id != id && trimmed_lower(&i.name) == key)
        {
            return Err(DirectoryError::Duplicate);
        }
        let interface = map.get_mut(&id).filter(|i| i.active).ok_or(DirectoryError::NotFound)?;
        interface.name = name;
        interface.description = description.to_string();
        Ok(interface.clone())
    }

    pub fn deactivate(&self, id: InterfaceId) -> Result<Interface, DirectoryError> {
        let mut map = self.inner.write();
        let interface = map.get_mut(&id).filter(|i| i.active).ok_or(DirectoryError::NotFound)?;
        interface.active = false;
        Ok(interface.clone())
    }

    pub fn reactivate(&self, id: InterfaceId) -> Result<Interface, DirectoryError> {
        let mut map = self.inner.write();
        let key = {
            let interface = map.get(&id).ok_or(DirectoryError::NotFound)?;
            if interface.active {
                return Ok(interface.clone());
            }
            trimmed_lower(&interface.name)
        };
        if map
            .values()
            .any(|i| i.active && i.interface_id != id && trimmed_lower(&i.name) == key)
        {
            return Err(DirectoryError::Duplicate);
        }
        let interface = map.get_mut(&id).expect("checked above");
        interface.active = true;
        Ok(interface.clone())
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn active_len(&self) -> usize {
        self.inner.read().values().filter(|i| i.active).count()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

// ── Capability store ────────────────────────────────────────────────────────

/// The sparse edge set `(role_id, interface_id) → flags`. Exclusively owned
/// here; only the reconciler and the name-resolution adapter mutate it, the
/// projector only reads. The BTreeMap key enforces edge uniqueness.
#[derive(Clone, Default)]
pub struct CapabilityStore {
    inner: Arc<RwLock<BTreeMap<EdgeKey, CapabilityFlags>>>,
}

impl CapabilityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hydrate(&self, edges: Vec<(EdgeKey, CapabilityFlags)>) {
        *self.inner.write() = edges.into_iter().collect();
    }

    pub fn get(&self, key: EdgeKey) -> Option<CapabilityFlags> {
        self.inner.read().get(&key).copied()
    }

    /// Snapshot of the full edge map, for planning and projection.
    pub fn snapshot(&self) -> BTreeMap<EdgeKey, CapabilityFlags> {
        self.inner.read().clone()
    }

    /// Apply a reconciliation plan under a single write lock, so concurrent
    /// readers observe either none or all of the batch.
    pub fn apply(&self, ops: &[(EdgeKey, EdgeOp)]) {
        let mut map = self.inner.write();
        for (key, op) in ops {
            match op {
                EdgeOp::Insert(flags) | EdgeOp::Update(flags) => {
                    map.insert(*key, *flags);
                }
                EdgeOp::Delete => {
                    map.remove(key);
                }
            }
        }
    }

    pub fn upsert(&self, key: EdgeKey, flags: CapabilityFlags) {
        self.inner.write().insert(key, flags);
    }

    /// Remove an edge; returns whether one existed.
    pub fn remove(&self, key: EdgeKey) -> bool {
        self.inner.write().remove(&key).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

// ── Geography stores ────────────────────────────────────────────────────────

/// Countries, keyed by id. ISO code and name are unique among active rows.
#[derive(Clone, Default)]
pub struct CountryStore {
    inner: Arc<RwLock<BTreeMap<i32, Country>>>,
    next_id: Arc<AtomicI32>,
}

impl CountryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: Arc::new(AtomicI32::new(1)),
        }
    }

    pub fn hydrate(&self, records: Vec<Country>) {
        let mut map = self.inner.write();
        let max_id = records.iter().map(|r| r.country_id).max().unwrap_or(0);
        *map = records.into_iter().map(|r| (r.country_id, r)).collect();
        self.next_id.store(max_id + 1, Ordering::SeqCst);
    }

    pub fn create(&self, name: &str, iso_code: &str) -> Result<Country, DirectoryError> {
        let name = name.trim().to_string();
        let iso_code = iso_code.trim().to_uppercase();
        let name_key = trimmed_lower(&name);
        let mut map = self.inner.write();
        if map
            .values()
            .any(|c| c.active && (c.iso_code == iso_code || trimmed_lower(&c.name) == name_key))
        {
            return Err(DirectoryError::Duplicate);
        }
        let country_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let country = Country {
            country_id,
            name,
            iso_code,
            active: true,
        };
        map.insert(country_id, country.clone());
        Ok(country)
    }

    pub fn find_active_by_id(&self, id: i32) -> Option<Country> {
        self.inner.read().get(&id).filter(|c| c.active).cloned()
    }

    /// Lookup regardless of the active flag, for resolving historical links.
    pub fn find_by_id(&self, id: i32) -> Option<Country> {
        self.inner.read().get(&id).cloned()
    }

    pub fn list_active(&self) -> Vec<Country> {
        let mut countries: Vec<Country> =
            self.inner.read().values().filter(|c| c.active).cloned().collect();
        countries.sort_by(|a, b| a.name.cmp(&b.name));
        countries
    }

    pub fn update(&self, id: i32, name: &str, iso_code: &str) -> Result<Country, DirectoryError> {
        let name = name.trim().to_string();
        let iso_code = iso_code.trim().to_uppercase();
        let name_key = trimmed_lower(&name);
        let mut map = self.inner.write();
        if map.values().any(|c| {
            c.active
                && c.country_id != id
                && (c.iso_code == iso_code || trimmed_lower(&c.name) == name_key)
        }) {
            return Err(DirectoryError::Duplicate);
        }
        let country = map.get_mut(&id).filter(|c| c.active).ok_or(DirectoryError::NotFound)?;
        country.name = name;
        country.iso_code = iso_code;
        Ok(country.clone())
    }

    pub fn deactivate(&self, id: i32) -> Result<Country, DirectoryError> {
        let mut map = self.inner.write();
        let country = map.get_mut(&id).filter(|c| c.active).ok_or(DirectoryError::NotFound)?;
        country.active = false;
        Ok(country.clone())
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }
}

/// Departments, each belonging to a country. No cascade on country
/// deactivation; existence of the parent is checked at create time only.
#[derive(Clone, Default)]
pub struct DepartmentStore {
    inner: Arc<RwLock<BTreeMap<i32, Department>>>,
    next_id: Arc<AtomicI32>,
}

impl DepartmentStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: Arc::new(AtomicI32::new(1)),
        }
    }

    pub fn hydrate(&self, records: Vec<Department>) {
        let mut map = self.inner.write();
        let max_id = records.iter().map(|r| r.department_id).max().unwrap_or(0);
        *map = records.into_iter().map(|r| (r.department_id, r)).collect();
        self.next_id.store(max_id + 1, Ordering::SeqCst);
    }

    pub fn create(&self, name: &str, country_id: i32) -> Result<Department, DirectoryError> {
        let name = name.trim().to_string();
        let key = trimmed_lower(&name);
        let mut map = self.inner.write();
        if map
            .values()
            .any(|d| d.active && d.country_id == country_id && trimmed_lower(&d.name) == key)
        {
            return Err(DirectoryError::Duplicate);
        }
        let department_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let department = Department {
            department_id,
            name,
            country_id,
            active: true,
        };
        map.insert(department_id, department.clone());
        Ok(department)
    }

    pub fn find_active_by_id(&self, id: i32) -> Option<Department> {
        self.inner.read().get(&id).filter(|d| d.active).cloned()
    }

    /// Lookup regardless of the active flag, for resolving historical links.
    pub fn find_by_id(&self, id: i32) -> Option<Department> {
        self.inner.read().get(&id).cloned()
    }

    /// Active departments, optionally limited to one country, sorted by name.
    pub fn list_active(&self, country_id: Option<i32>) -> Vec<Department> {
        let mut departments: Vec<Department> = self
            .inner
            .read()
            .values()
            .filter(|d| d.active && country_id.map_or(true, |c| d.country_id == c))
            .cloned()
            .collect();
        departments.sort_by(|a, b| a.name.cmp(&b.name));
        departments
    }

    pub fn update(&self, id: i32, name: &str) -> Result<Department, DirectoryError> {
        let name = name.trim().to_string();
        let mut map = self.inner.write();
        let country_id = map.get(&id).map(|d| d.country_id).ok_or(DirectoryError::NotFound)?;
        let key = trimmed_lower(&name);
        if map.values().any(|d| {
            d.active
                && d.department_id != id
                && d.country_id == country_id
                && trimmed_lower(&d.name) == key
        }) {
            return Err(DirectoryError::Duplicate);
        }
        let department = map.get_mut(&id).filter(|d| d.active).ok_or(DirectoryError::NotFound)?;
        department.name = name;
        Ok(department.clone())
    }

    pub fn deactivate(&self, id: i32) -> Result<Department, DirectoryError> {
        let mut map = self.inner.write();
        let department = map.get_mut(&id).filter(|d| d.active).ok_or(DirectoryError::NotFound)?;
        department.active = false;
        Ok(department.clone())
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }
}

/// Municipalities, each belonging to a department.
#[derive(Clone, Default)]
pub struct MunicipalityStore {
    inner: Arc<RwLock<BTreeMap<i32, Municipality>>>,
    next_id: Arc<AtomicI32>,
}

impl MunicipalityStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: Arc::new(AtomicI32::new(1)),
        }
    }

    pub fn hydrate(&self, records: Vec<Municipality>) {
        let mut map = self.inner.write();
        let max_id = records.iter().map(|r| r.municipality_id).max().unwrap_or(0);
        *map = records.into_iter().map(|r| (r.municipality_id, r)).collect();
        self.next_id.store(max_id + 1, Ordering::SeqCst);
    }

    pub fn create(&self, name: &str, department_id: i32) -> Result<Municipality, DirectoryError> {
        let name = name.trim().to_string();
        let key = trimmed_lower(&name);
        let mut map = self.inner.write();
        if map
            .values()
            .any(|m| m.active && m.department_id == department_id && trimmed_lower(&m.name) == key)
        {
            return Err(DirectoryError::Duplicate);
        }
        let municipality_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let municipality = Municipality {
            municipality_id,
            name,
            department_id,
            active: true,
        };
        map.insert(municipality_id, municipality.clone());
        Ok(municipality)
    }

    pub fn find_active_by_id(&self, id: i32) -> Option<Municipality> {
        self.inner.read().get(&id).filter(|m| m.active).cloned()
    }

    /// Lookup regardless of the active flag, for resolving historical links.
    pub fn find_by_id(&self, id: i32) -> Option<Municipality> {
        self.inner.read().get(&id).cloned()
    }

    pub fn list_active(&self, department_id: Option<i32>) -> Vec<Municipality> {
        let mut municipalities: Vec<Municipality> = self
            .inner
            .read()
            .values()
            .filter(|m| m.active && department_id.map_or(true, |d| m.department_id == d))
            .cloned()
            .collect();
        municipalities.sort_by(|a, b| a.name.cmp(&b.name));
        municipalities
    }

    pub fn update(&self, id: i32, name: &str) -> Result<Municipality, DirectoryError> {
        let name = name.trim().to_string();
        let mut map = self.inner.write();
        let department_id = map.get(&id).map(|m| m.department_id).ok_or(DirectoryError::NotFound)?;
        let key = trimmed_lower(&name);
        if map.values().any(|m| {
            m.active
                && m.municipality_id != id
                && m.department_id == department_id
                && trimmed_lower(&m.name) == key
        }) {
            return Err(DirectoryError::Duplicate);
        }
        let municipality = map.get_mut(&id).filter(|m| m.active).ok_or(DirectoryError::NotFound)?;
        municipality.name = name;
        Ok(municipality.clone())
    }

    pub fn deactivate(&self, id: i32) -> Result<Municipality, DirectoryError> {
        let mut map = self.inner.write();
        let municipality = map.get_mut(&id).filter(|m| m.active).ok_or(DirectoryError::NotFound)?;
        municipality.active = false;
        Ok(municipality.clone())
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }
}

// ── Soil-chemistry catalog ──────────────────────────────────────────────────

/// Chemical elements referenced by soil analyses. Symbol is unique among
/// active entries.
#[derive(Clone, Default)]
pub struct ElementStore {
    inner: Arc<RwLock<BTreeMap<i32, ChemicalElement>>>,
    next_id: Arc<AtomicI32>,
}

impl ElementStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: Arc::new(AtomicI32::new(1)),
        }
    }

    pub fn hydrate(&self, records: Vec<ChemicalElement>) {
        let mut map = self.inner.write();
        let max_id = records.iter().map(|r| r.element_id).max().unwrap_or(0);
        *map = records.into_iter().map(|r| (r.element_id, r)).collect();
        self.next_id.store(max_id + 1, Ordering::SeqCst);
    }

    pub fn create(
        &self,
        symbol: &str,
        name: &str,
        equivalent_weight: f64,
    ) -> Result<ChemicalElement, DirectoryError> {
        let symbol = symbol.trim().to_string();
        let mut map = self.inner.write();
        if map.values().any(|e| e.active && e.symbol == symbol) {
            return Err(DirectoryError::Duplicate);
        }
        let element_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let element = ChemicalElement {
            element_id,
            symbol,
            name: name.trim().to_string(),
            equivalent_weight,
            active: true,
        };
        map.insert(element_id, element.clone());
        Ok(element)
    }

    pub fn find_active_by_id(&self, id: i32) -> Option<ChemicalElement> {
        self.inner.read().get(&id).filter(|e| e.active).cloned()
    }

    /// Lookup regardless of the active flag. Historical measurements keep
    /// referencing deactivated elements.
    pub fn find_by_id(&self, id: i32) -> Option<ChemicalElement> {
        self.inner.read().get(&id).cloned()
    }

    pub fn list_active(&self) -> Vec<ChemicalElement> {
        let mut elements: Vec<ChemicalElement> =
            self.inner.read().values().filter(|e| e.active).cloned().collect();
        elements.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        elements
    }

    pub fn update(
        &self,
        id: i32,
        symbol: &str,
        name: &str,
        equivalent_weight: f64,
    ) -> Result<ChemicalElement, DirectoryError> {
        let symbol = symbol.trim().to_string();
        let mut map = self.inner.write();
        if map
            .values()
            .any(|e| e.active && e.element_id != id && e.symbol == symbol)
        {
            return Err(DirectoryError::Duplicate);
        }
        let element = map.get_mut(&id).filter(|e| e.active).ok_or(DirectoryError::NotFound)?;
        element.symbol = symbol;
        element.name = name.trim().to_string();
        element.equivalent_weight = equivalent_weight;
        Ok(element.clone())
    }

    pub fn deactivate(&self, id: i32) -> Result<ChemicalElement, DirectoryError> {
        let mut map = self.inner.write();
        let element = map.get_mut(&id).filter(|e| e.active).ok_or(DirectoryError::NotFound)?;
        element.active = false;
        Ok(element.clone())
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }
}

// ── Land parcel registry ────────────────────────────────────────────────────

/// Field set shared by parcel create and update.
#[derive(Debug, Clone)]
pub struct ParcelDraft {
    pub code: String,
    pub owner_identification: String,
    pub owner_name: String,
    pub owner_phone: String,
    pub owner_email: Option<String>,
    pub address: String,
    pub area_manzanas: f64,
    pub registered_on: NaiveDate,
    pub municipality_id: i32,
    pub yield_quintals: f64,
    pub latitude: f64,
    pub longitude: f64,
}

/// Registered land parcels. Codes are not unique: the same cadastral code
/// can legitimately reappear after a re-registration, so duplicates are
/// accepted here and sorted out administratively.
#[derive(Clone, Default)]
pub struct ParcelStore {
    inner: Arc<RwLock<BTreeMap<i32, LandParcel>>>,
    next_id: Arc<AtomicI32>,
}

impl ParcelStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: Arc::new(AtomicI32::new(1)),
        }
    }

    pub fn hydrate(&self, records: Vec<LandParcel>) {
        let mut map = self.inner.write();
        let max_id = records.iter().map(|r| r.parcel_id).max().unwrap_or(0);
        *map = records.into_iter().map(|r| (r.parcel_id, r)).collect();
        self.next_id.store(max_id + 1, Ordering::SeqCst);
    }

    pub fn create(&self, draft: ParcelDraft) -> LandParcel {
        let mut map = self.inner.write();
        let parcel_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let parcel = LandParcel {
            parcel_id,
            code: draft.code.trim().to_string(),
            owner_identification: draft.owner_identification.trim().to_string(),
            owner_name: draft.owner_name.trim().to_string(),
            owner_phone: draft.owner_phone.trim().to_string(),
            owner_email: draft.owner_email.map(|e| e.trim().to_string()),
            address: draft.address.trim().to_string(),
            area_manzanas: draft.area_manzanas,
            registered_on: draft.registered_on,
            municipality_id: draft.municipality_id,
            yield_quintals: draft.yield_quintals,
            latitude: draft.latitude,
            longitude: draft.longitude,
            active: true,
        };
        map.insert(parcel_id, parcel.clone());
        parcel
    }

    pub fn find_active_by_id(&self, id: i32) -> Option<LandParcel> {
        self.inner.read().get(&id).filter(|p| p.active).cloned()
    }

    /// Active parcels sorted by code, then id for ties.
    pub fn list_active(&self) -> Vec<LandParcel> {
        let mut parcels: Vec<LandParcel> =
            self.inner.read().values().filter(|p| p.active).cloned().collect();
        parcels.sort_by(|a, b| a.code.cmp(&b.code).then(a.parcel_id.cmp(&b.parcel_id)));
        parcels
    }

    /// Replace every field of an active parcel.
    pub fn update(&self, id: i32, draft: ParcelDraft) -> Result<LandParcel, DirectoryError> {
        let mut map = self.inner.write();
        let parcel = map.get_mut(&id).filter(|p| p.active).ok_or(DirectoryError::NotFound)?;
        parcel.code = draft.code.trim().to_string();
        parcel.owner_identification = draft.owner_identification.trim().to_string();
        parcel.owner_name = draft.owner_name.trim().to_string();
        parcel.owner_phone = draft.owner_phone.trim().to_string();
        parcel.owner_email = draft.owner_email.map(|e| e.trim().to_string());
        parcel.address = draft.address.trim().to_string();
        parcel.area_manzanas = draft.area_manzanas;
        parcel.registered_on = draft.registered_on;
        parcel.municipality_id = draft.municipality_id;
        parcel.yield_quintals = draft.yield_quintals;
        parcel.latitude = draft.latitude;
        parcel.longitude = draft.longitude;
        Ok(parcel.clone())
    }

    pub fn deactivate(&self, id: i32) -> Result<LandParcel, DirectoryError> {
        let mut map = self.inner.write();
        let parcel = map.get_mut(&id).filter(|p| p.active).ok_or(DirectoryError::NotFound)?;
        parcel.active = false;
        Ok(parcel.clone())
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }
}

// ── Soil analysis log ───────────────────────────────────────────────────────

/// Laboratory analyses and their element readings. The laboratory identifier
/// is unique across ALL analyses, active or not — a retired analysis keeps
/// its identifier reserved.
#[derive(Clone, Default)]
pub struct AnalysisStore {
    analyses: Arc<RwLock<BTreeMap<i32, SoilAnalysis>>>,
    measurements: Arc<RwLock<BTreeMap<i32, AnalysisMeasurement>>>,
    next_analysis_id: Arc<AtomicI32>,
    next_measurement_id: Arc<AtomicI32>,
}

impl AnalysisStore {
    pub fn new() -> Self {
        Self {
            analyses: Arc::new(RwLock::new(BTreeMap::new())),
            measurements: Arc::new(RwLock::new(BTreeMap::new())),
            next_analysis_id: Arc::new(AtomicI32::new(1)),
            next_measurement_id: Arc::new(AtomicI32::new(1)),
        }
    }

    pub fn hydrate(&self, analyses: Vec<SoilAnalysis>, measurements: Vec<AnalysisMeasurement>) {
        let mut amap = self.analyses.write();
        let max_a = analyses.iter().map(|a| a.analysis_id).max().unwrap_or(0);
        *amap = analyses.into_iter().map(|a| (a.analysis_id, a)).collect();
        self.next_analysis_id.store(max_a + 1, Ordering::SeqCst);

        let mut mmap = self.measurements.write();
        let max_m = measurements.iter().map(|m| m.measurement_id).max().unwrap_or(0);
        *mmap = measurements.into_iter().map(|m| (m.measurement_id, m)).collect();
        self.next_measurement_id.store(max_m + 1, Ordering::SeqCst);
    }

    /// Record a new analysis. Laboratory and identifier are stored trimmed
    /// and uppercased, the form the lab sheets carry.
    pub fn create(
        &self,
        sampled_on: NaiveDate,
        laboratory: &str,
        identifier: &str,
    ) -> Result<SoilAnalysis, DirectoryError> {
        let laboratory = laboratory.trim().to_uppercase();
        let identifier = identifier.trim().to_uppercase();
        let mut map = self.analyses.write();
        if map.values().any(|a| a.identifier == identifier) {
            return Err(DirectoryError::Duplicate);
        }
        let analysis_id = self.next_analysis_id.fetch_add(1, Ordering::SeqCst);
        let analysis = SoilAnalysis {
            analysis_id,
            sampled_on,
            laboratory,
            identifier,
            active: true,
        };
        map.insert(analysis_id, analysis.clone());
        Ok(analysis)
    }

    pub fn find_active_by_id(&self, id: i32) -> Option<SoilAnalysis> {
        self.analyses.read().get(&id).filter(|a| a.active).cloned()
    }

    /// Active analyses sorted by identifier. Measurements are not included;
    /// the detail lookup joins them.
    pub fn list_active(&self) -> Vec<SoilAnalysis> {
        let mut analyses: Vec<SoilAnalysis> =
            self.analyses.read().values().filter(|a| a.active).cloned().collect();
        analyses.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        analyses
    }

    /// Attach an element reading to an ACTIVE analysis. Element existence is
    /// checked by the route against the element catalog before calling this.
    pub fn add_measurement(
        &self,
        analysis_id: i32,
        element_id: i32,
        quantity: f64,
        unit: &str,
    ) -> Result<AnalysisMeasurement, DirectoryError> {
        if self.find_active_by_id(analysis_id).is_none() {
            return Err(DirectoryError::NotFound);
        }
        let mut map = self.measurements.write();
        let measurement_id = self.next_measurement_id.fetch_add(1, Ordering::SeqCst);
        let measurement = AnalysisMeasurement {
            measurement_id,
            analysis_id,
            element_id,
            quantity,
            unit: unit.trim().to_string(),
            active: true,
        };
        map.insert(measurement_id, measurement.clone());
        Ok(measurement)
    }

    /// Active readings of one analysis, in insertion order.
    pub fn measurements_for(&self, analysis_id: i32) -> Vec<AnalysisMeasurement> {
        self.measurements
            .read()
            .values()
            .filter(|m| m.active && m.analysis_id == analysis_id)
            .cloned()
            .collect()
    }

    /// Soft-deactivate an analysis. Its measurements stay attached and
    /// reappear if the row is ever reactivated in the database directly.
    pub fn deactivate(&self, id: i32) -> Result<SoilAnalysis, DirectoryError> {
        let mut map = self.analyses.write();
        let analysis = map.get_mut(&id).filter(|a| a.active).ok_or(DirectoryError::NotFound)?;
        analysis.active = false;
        Ok(analysis.clone())
    }

    pub fn len(&self) -> usize {
        self.analyses.read().len()
    }

    pub fn measurement_len(&self) -> usize {
        self.measurements.read().len()
    }
}

// ── App config & state ──────────────────────────────────────────────────────

/// Runtime configuration, read from the environment once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

impl AppConfig {
    /// Read configuration from `AGROSUELO_PORT` (default 8080).
    pub fn from_env() -> Self {
        let port = std::env::var("AGROSUELO_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8080);
        Self { port }
    }
}

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    /// Optional write-through persistence; `None` means in-memory-only mode.
    pub db_pool: Option<PgPool>,
    pub roles: RoleDirectory,
    pub interfaces: InterfaceDirectory,
    pub capabilities: CapabilityStore,
    pub countries: CountryStore,
    pub departments: DepartmentStore,
    pub municipalities: MunicipalityStore,
    pub elements: ElementStore,
    pub parcels: ParcelStore,
    pub analyses: AnalysisStore,
}

impl AppState {
    /// In-memory-only state with default config. Used by tests and by the
    /// server when `DATABASE_URL` is absent.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), None)
    }

    pub fn with_config(config: AppConfig, db_pool: Option<PgPool>) -> Self {
        Self {
            config,
            db_pool,
            roles: RoleDirectory::new(),
            interfaces: InterfaceDirectory::new(),
            capabilities: CapabilityStore::new(),
            countries: CountryStore::new(),
            departments: DepartmentStore::new(),
            municipalities: MunicipalityStore::new(),
            elements: ElementStore::new(),
            parcels: ParcelStore::new(),
            analyses: AnalysisStore::new(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
