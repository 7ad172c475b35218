use crate::db;
use crate::db::scan_dirs::ScanDirectoryRecord;
use crate::error::Error;
use crate::state::AppState;

pub async fn all_directories(state: &AppState) -> Result<Vec<ScanDirectoryRecord>, Error> {
    db::scan_dirs::list_directories(&state.db)
        .await
        .map_err(Error::db("list scan directories"))
}

pub async fn add_directory(
    state: &AppState,
    path: &str,
    alias: &str,
) -> Result<ScanDirectoryRecord, Error> {
    let id = db::scan_dirs::insert_directory(&state.db, path, alias)
        .await
        .map_err(Error::db("insert scan directory"))?;
    log::info!("add_directory path={path} alias={alias} id={id}");

    db::scan_dirs::get_directory(&state.db, id)
        .await
        .map_err(Error::db("load inserted scan directory"))?
        .ok_or(Error::NotFound {
            what: "scan directory",
            id,
        })
}

pub async fn update_directory(
    state: &AppState,
    id: i64,
    path: &str,
    alias: &str,
) -> Result<(), Error> {
    let updated = db::scan_dirs::update_directory(&state.db, id, path, alias)
        .await
        .map_err(Error::db("update scan directory"))?;
    if !updated {
        return Err(Error::NotFound {
            what: "scan directory",
            id,
        });
    }
    log::info!("update_directory id={id} path={path} alias={alias}");
    Ok(())
}

pub async fn delete_directory(state: &AppState, id: i64) -> Result<(), Error> {
    db::scan_dirs::delete_directory(&state.db, id)
        .await
        .map_err(Error::db("delete scan directory"))?;
    log::info!("delete_directory id={id}");
    Ok(())
}
