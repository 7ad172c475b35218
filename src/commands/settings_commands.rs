use crate::db;
use crate::db::settings::Settings;
use crate::error::Error;
use crate::state::AppState;

pub async fn get_settings(state: &AppState) -> Result<Settings, Error> {
    db::settings::get_settings(&state.db)
        .await
        .map_err(Error::db("read settings"))
}

pub async fn update_settings(state: &AppState, settings: &Settings) -> Result<(), Error> {
    db::settings::update_settings(&state.db, settings)
        .await
        .map_err(Error::db("update settings"))?;
    log::info!(
        "update_settings play_weight={} auto_scan={} log_enabled={}",
        settings.play_weight,
        settings.auto_scan_on_startup,
        settings.log_enabled
    );
    Ok(())
}
