use crate::error::AppError;
use caricature_pipeline::SqliteStore;
use rusqlite::Connection;
use std::path::PathBuf;

/// Returns the app data directory (database, exports)
pub fn get_app_directory() -> PathBuf {
    #[cfg(target_os = "android")]
    {
        PathBuf::from("/storage/emulated/0/Android/data/de.teilgedanken.caricaturestudio/files")
    }

    #[cfg(not(target_os = "android"))]
    {
        PathBuf::from("./data")
    }
}

fn get_database_path() -> PathBuf {
    get_app_directory().join("caricature-studio.db")
}

/// Directory where exported PNGs are written
pub fn get_exports_directory() -> PathBuf {
    get_app_directory().join("exports")
}

/// Opens the key-value store backing the durable last-result and
/// last-input records
pub fn open_store() -> Result<SqliteStore, AppError> {
    let db_path = get_database_path();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(&db_path).map_err(|e| {
        AppError::Store(caricature_pipeline::StoreError::Database(e))
    })?;
    let store = SqliteStore::new(conn)?;
    Ok(store)
}
