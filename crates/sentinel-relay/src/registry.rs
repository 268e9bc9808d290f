//! In-memory fleet registry.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use sentinel_domain::{NewUnit, Unit, UnitStatus};
use tracing::info;
use uuid::Uuid;

use crate::error::{RelayError, RelayResult};

/// Partial update of a registered unit; absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitPatch {
    #[serde(default)]
    pub call_sign: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub status: Option<UnitStatus>,
}

/// Registered units in enlistment order. Call signs are unique.
#[derive(Debug, Default)]
pub struct FleetStore {
    units: RwLock<Vec<Unit>>,
}

impl FleetStore {
    pub fn list(&self) -> Vec<Unit> {
        self.read().clone()
    }

    pub fn get(&self, id: Uuid) -> RelayResult<Unit> {
        self.read()
            .iter()
            .find(|unit| unit.id == id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    /// Register a unit. It starts `OFFLINE` whatever the request says.
    pub fn enlist(&self, request: NewUnit) -> RelayResult<Unit> {
        let unit = Unit::enlist(request)?;

        let mut units = self.write();
        ensure_unique(&units, &unit.call_sign, None)?;
        units.push(unit.clone());
        drop(units);

        info!(id = %unit.id, call_sign = %unit.call_sign, "Unit enlisted");
        Ok(unit)
    }

    pub fn update(&self, id: Uuid, patch: UnitPatch) -> RelayResult<Unit> {
        let mut units = self.write();

        let call_sign = match patch.call_sign {
            Some(call_sign) if call_sign.trim().is_empty() => {
                return Err(RelayError::InvalidInput("call sign is mandatory".to_string()));
            }
            Some(call_sign) => {
                let call_sign = call_sign.trim().to_string();
                ensure_unique(&units, &call_sign, Some(id))?;
                Some(call_sign)
            }
            None => None,
        };

        let unit = units
            .iter_mut()
            .find(|unit| unit.id == id)
            .ok_or_else(|| not_found(id))?;

        if let Some(call_sign) = call_sign {
            unit.call_sign = call_sign;
        }
        if let Some(model) = patch.model {
            unit.model = model;
        }
        if let Some(status) = patch.status {
            unit.status = status;
        }

        Ok(unit.clone())
    }

    /// Remove a unit, returning it so callers can clean up by call sign.
    pub fn decommission(&self, id: Uuid) -> RelayResult<Unit> {
        let mut units = self.write();
        let index = units
            .iter()
            .position(|unit| unit.id == id)
            .ok_or_else(|| not_found(id))?;
        let unit = units.remove(index);
        drop(units);

        info!(id = %unit.id, call_sign = %unit.call_sign, "Unit decommissioned");
        Ok(unit)
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Unit>> {
        self.units.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Unit>> {
        self.units.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn ensure_unique(units: &[Unit], call_sign: &str, except: Option<Uuid>) -> RelayResult<()> {
    let taken = units
        .iter()
        .any(|unit| unit.call_sign == call_sign && Some(unit.id) != except);
    if taken {
        return Err(RelayError::Conflict(format!(
            "call sign {call_sign} already enlisted"
        )));
    }
    Ok(())
}

fn not_found(id: Uuid) -> RelayError {
    RelayError::NotFound {
        entity_type: "Unit".to_string(),
        id: id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(call_sign: &str) -> NewUnit {
        NewUnit {
            call_sign: call_sign.to_string(),
            model: "Reaper".to_string(),
            battery_capacity: Some(5000),
        }
    }

    #[test]
    fn test_enlist_starts_offline_and_keeps_order() {
        let store = FleetStore::default();
        let first = store.enlist(request("EAGLE-01")).unwrap();
        store.enlist(request("HAWK-02")).unwrap();

        assert_eq!(first.status, UnitStatus::Offline);
        let call_signs: Vec<_> = store.list().into_iter().map(|u| u.call_sign).collect();
        assert_eq!(call_signs, vec!["EAGLE-01", "HAWK-02"]);
    }

    #[test]
    fn test_enlist_rejects_missing_and_duplicate_call_signs() {
        let store = FleetStore::default();
        assert!(matches!(
            store.enlist(request("  ")),
            Err(RelayError::InvalidInput(_))
        ));

        store.enlist(request("EAGLE-01")).unwrap();
        assert!(matches!(
            store.enlist(request(" EAGLE-01 ")),
            Err(RelayError::Conflict(_))
        ));
    }

    #[test]
    fn test_update_patches_selected_fields() {
        let store = FleetStore::default();
        let unit = store.enlist(request("EAGLE-01")).unwrap();
        let updated = store
            .update(
                unit.id,
                UnitPatch {
                    status: Some(UnitStatus::Active),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.status, UnitStatus::Active);
        assert_eq!(updated.call_sign, "EAGLE-01");
        assert_eq!(store.get(unit.id).unwrap(), updated);
    }

    #[test]
    fn test_update_rename_conflict() {
        let store = FleetStore::default();
        store.enlist(request("EAGLE-01")).unwrap();
        let hawk = store.enlist(request("HAWK-02")).unwrap();

        let err = store
            .update(
                hawk.id,
                UnitPatch {
                    call_sign: Some("EAGLE-01".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, RelayError::Conflict(_)));
    }

    #[test]
    fn test_decommission_unknown_is_not_found() {
        let store = FleetStore::default();
        let unit = store.enlist(request("EAGLE-01")).unwrap();

        assert_eq!(store.decommission(unit.id).unwrap().call_sign, "EAGLE-01");
        assert!(matches!(
            store.decommission(unit.id),
            Err(RelayError::NotFound { .. })
        ));
    }
}
