pub mod commands;
pub mod db;
pub mod error;
pub mod ranking;
pub mod scan;
pub mod shell_open;
pub mod state;

pub use error::Error;
pub use state::AppState;

/// Process entry point: logging, data directory, database bring-up, optional
/// startup scan.
///
/// Database init (migrations → duplicate reconciliation → unique index →
/// settings seed) must finish before `AppState` exists — nothing serves
/// queries over an unreconciled store. A failed init is fatal.
pub fn run() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let app_data_dir = compute_app_data_dir();
    std::fs::create_dir_all(&app_data_dir).expect("Failed to create app data dir");
    let db_path = format!("{app_data_dir}/library.db");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build Tokio runtime");

    runtime.block_on(async {
        let pool = match db::local::init_db(&db_path).await {
            Ok(pool) => pool,
            Err(err) => {
                log::error!("startup aborted: {err}");
                std::process::exit(1);
            }
        };

        let state = AppState::new(pool);

        match db::settings::get_settings(&state.db).await {
            Ok(settings) => {
                if !settings.log_enabled {
                    log::set_max_level(log::LevelFilter::Warn);
                }
                if settings.auto_scan_on_startup {
                    auto_scan(&state).await;
                }
            }
            Err(err) => log::warn!("failed to read settings at startup: {err}"),
        }

        match db::videos::active_video_count(&state.db).await {
            Ok(count) => log::info!("library ready: {count} active videos ({db_path})"),
            Err(err) => log::warn!("library ready, count unavailable: {err}"),
        }
    });
}

/// Incremental scan of every registered directory: new files get registered,
/// already-known paths are skipped.
async fn auto_scan(state: &AppState) {
    let dirs = match commands::directory_commands::all_directories(state).await {
        Ok(dirs) => dirs,
        Err(err) => {
            log::warn!("auto-scan: failed to list scan directories: {err}");
            return;
        }
    };

    for dir in dirs {
        let files = match commands::video_commands::scan_directory(state, &dir.path).await {
            Ok(files) => files,
            Err(err) => {
                log::warn!("auto-scan: failed to scan {}: {err}", dir.path);
                continue;
            }
        };

        let mut added = 0usize;
        for file in files {
            match commands::video_commands::add_video(state, &file).await {
                Ok(_) => added += 1,
                Err(Error::VideoExists { .. }) => {}
                Err(err) => log::warn!("auto-scan: failed to register {file}: {err}"),
            }
        }
        log::info!("auto-scan {}: {added} new video(s)", dir.path);
    }
}

/// Return the platform-specific application data directory.
fn compute_app_data_dir() -> String {
    const IDENTIFIER: &str = "com.videovault.app";

    #[cfg(target_os = "macos")]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        format!("{home}/Library/Application Support/{IDENTIFIER}")
    }

    #[cfg(target_os = "windows")]
    {
        let appdata = std::env::var("APPDATA").unwrap_or_else(|_| ".".into());
        format!("{appdata}\\{IDENTIFIER}")
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        format!("{home}/.config/{IDENTIFIER}")
    }
}
