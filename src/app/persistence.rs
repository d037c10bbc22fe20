//! Settings and schedule persistence over the blob [`StoragePort`].
//!
//! Blobs are `postcard`-encoded.  Loading never fails: a missing,
//! unreadable or invalid blob falls back to compiled-in defaults with a
//! warning so the siren keeps working on a blank or damaged flash.

use log::{info, warn};

use crate::app::ports::{StorageError, StoragePort};
use crate::config::TimerSettings;
use crate::error::Result;
use crate::scheduler::ScheduleStore;

/// Namespace holding [`TimerSettings`].
pub const SETTINGS_NAMESPACE: &str = "timer";
/// Namespace holding the [`ScheduleStore`].
pub const SCHEDULES_NAMESPACE: &str = "schedules";

pub fn load_settings(storage: &impl StoragePort) -> TimerSettings {
    let decoded = storage.load_blob(SETTINGS_NAMESPACE).and_then(|bytes| {
        postcard::from_bytes::<TimerSettings>(&bytes).map_err(|_| StorageError::Corrupted)
    });
    match decoded {
        Ok(settings) => match settings.validate() {
            Ok(()) => {
                info!("persistence: settings loaded");
                settings
            }
            Err(e) => {
                warn!("persistence: stored settings rejected ({e}), using defaults");
                TimerSettings::default()
            }
        },
        Err(StorageError::NotFound) => {
            info!("persistence: no stored settings, using defaults");
            TimerSettings::default()
        }
        Err(e) => {
            warn!("persistence: settings unavailable ({e}), using defaults");
            TimerSettings::default()
        }
    }
}

/// Validate and persist settings.
pub fn save_settings(storage: &mut impl StoragePort, settings: &TimerSettings) -> Result<()> {
    settings.validate()?;
    let bytes = postcard::to_allocvec(settings).map_err(|_| StorageError::Corrupted)?;
    storage.save_blob(SETTINGS_NAMESPACE, &bytes)?;
    Ok(())
}

/// Raw stored table.  Record validation happens when the engine is rebuilt.
pub fn load_schedules(storage: &impl StoragePort) -> ScheduleStore {
    let decoded = storage.load_blob(SCHEDULES_NAMESPACE).and_then(|bytes| {
        postcard::from_bytes::<ScheduleStore>(&bytes).map_err(|_| StorageError::Corrupted)
    });
    match decoded {
        Ok(store) => {
            info!("persistence: {} schedule(s) loaded", store.schedules.len());
            store
        }
        Err(StorageError::NotFound) => ScheduleStore::default(),
        Err(e) => {
            warn!("persistence: schedules unavailable ({e}), starting empty");
            ScheduleStore::default()
        }
    }
}

pub fn save_schedules(storage: &mut impl StoragePort, store: &ScheduleStore) -> Result<()> {
    let bytes = postcard::to_allocvec(store).map_err(|_| StorageError::Corrupted)?;
    storage.save_blob(SCHEDULES_NAMESPACE, &bytes)?;
    Ok(())
}
