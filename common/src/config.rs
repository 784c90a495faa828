use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::{env, fs};

/// Process-wide configuration for the grading engine, loaded once from the
/// environment. Values that tune scoring (rounding precision) and the
/// re-evaluation worker pool live here so deployments can adjust them without
/// a rebuild.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub project_name: String,
    pub log_level: String,
    pub log_file: String,
    /// Decimal places kept when rounding a final score percentage.
    pub score_precision: u32,
    /// Upper bound on concurrently re-evaluated participations.
    pub reevaluation_workers: usize,
}

static CONFIG: OnceCell<Config> = OnceCell::new();

impl Config {
    pub fn init(env_path: &str) -> &'static Self {
        dotenvy::from_filename(env_path).ok();

        CONFIG.get_or_init(|| {
            let project_name = env::var("PROJECT_NAME").unwrap_or_else(|_| "grading-core".into());
            let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "debug".into());
            let log_file = env::var("LOG_FILE").unwrap_or_else(|_| "logs/grading.log".into());
            let score_precision = env::var("SCORE_PRECISION")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(1);
            let reevaluation_workers = env::var("REEVALUATION_WORKERS")
                .ok()
                .and_then(|w| w.parse().ok())
                .unwrap_or(4);

            if let Some(parent) = std::path::Path::new(&log_file).parent() {
                fs::create_dir_all(parent).expect("Failed to create log directory");
            }

            Config {
                project_name,
                log_level,
                log_file,
                score_precision,
                reevaluation_workers,
            }
        })
    }

    pub fn get() -> &'static Self {
        CONFIG.get().expect("Config not initialized")
    }

    /// Like [`Config::get`], but falls back to defaults when no environment
    /// was loaded. Convenient for tests and ad-hoc tooling.
    pub fn get_or_default() -> &'static Self {
        CONFIG.get_or_init(|| Config {
            project_name: "grading-core".into(),
            log_level: "debug".into(),
            log_file: "logs/grading.log".into(),
            score_precision: 1,
            reevaluation_workers: 4,
        })
    }
}
