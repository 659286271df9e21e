use pizzaops::config::ConfigLoader;
use std::{
    env, fs,
    path::PathBuf,
    sync::{Mutex, MutexGuard, OnceLock},
};
use tempfile::TempDir;

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

fn env_guard() -> MutexGuard<'static, ()> {
    env_lock()
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
}

fn clear_env() {
    unsafe {
        env::remove_var("PIZZAOPS_PROFILE");
        env::remove_var("PIZZAOPS_LOG_LEVEL");
        env::remove_var("PIZZAOPS_LOG_FORMAT");
        env::remove_var("PIZZAOPS_INTEGRATION_BASE_URL");
        env::remove_var("PIZZAOPS_API_TOKEN");
        env::remove_var("PIZZAOPS_WEBHOOK_POLL_SECONDS");
        env::remove_var("PIZZAOPS_NOTICE_TTL_SECONDS");
    }
}

fn write_env_file(dir: &TempDir, name: &str, contents: &str) {
    let path = dir.path().join(name);
    fs::write(path, contents).unwrap();
}

#[test]
fn loads_defaults_when_no_env_present() {
    let _guard = env_guard();
    clear_env();

    // An empty directory keeps stray workspace .env files out of the test
    let temp_dir = TempDir::new().unwrap();
    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let cfg = loader.load().expect("config loads with defaults");

    assert_eq!(cfg.profile, "local");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(
        cfg.integration_base_url,
        "http://localhost:8080/api/integrations"
    );
    assert_eq!(cfg.api_token, None);
    assert_eq!(cfg.webhook_poll_seconds, 15);
    assert_eq!(cfg.notice_ttl_seconds, 5);
    cfg.base_url().expect("default base url parses");
    clear_env();
}

#[test]
fn layered_env_files_apply_in_order() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "PIZZAOPS_WEBHOOK_POLL_SECONDS=20\n");
    write_env_file(&temp_dir, ".env.test", "PIZZAOPS_WEBHOOK_POLL_SECONDS=25\n");
    write_env_file(
        &temp_dir,
        ".env.test.local",
        "PIZZAOPS_WEBHOOK_POLL_SECONDS=30\nPIZZAOPS_LOG_LEVEL=debug\n",
    );

    // Select profile via .env.local before profile-specific files load.
    write_env_file(
        &temp_dir,
        ".env.local",
        "PIZZAOPS_PROFILE=test\nPIZZAOPS_WEBHOOK_POLL_SECONDS=22\n",
    );

    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let cfg = loader.load().expect("config loads with layered env files");

    assert_eq!(cfg.profile, "test");
    assert_eq!(cfg.webhook_poll_seconds, 30);
    assert_eq!(cfg.log_level, "debug");
    clear_env();
}

#[test]
fn os_environment_has_highest_precedence() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        "PIZZAOPS_INTEGRATION_BASE_URL=http://hub.internal:8080/api/integrations\n",
    );

    unsafe {
        env::set_var(
            "PIZZAOPS_INTEGRATION_BASE_URL",
            "http://10.0.0.5:9090/api/integrations",
        );
    }

    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let cfg = loader.load().expect("config loads with env override");
    assert_eq!(
        cfg.integration_base_url,
        "http://10.0.0.5:9090/api/integrations"
    );

    clear_env();
}

#[test]
fn invalid_base_url_returns_error() {
    let _guard = env_guard();
    clear_env();

    unsafe {
        env::set_var("PIZZAOPS_INTEGRATION_BASE_URL", "not a url");
    }

    let temp_dir = TempDir::new().unwrap();
    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let err = loader.load().expect_err("invalid base url should fail");
    assert!(format!("{}", err).contains("invalid integration base url"));

    clear_env();
}

#[test]
fn blank_api_token_counts_as_missing() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "PIZZAOPS_API_TOKEN=   \n");

    // Fine under the local profile
    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let cfg = loader.load().expect("local profile tolerates a blank token");
    assert_eq!(cfg.api_token, None);

    // Fatal anywhere else
    unsafe {
        env::set_var("PIZZAOPS_PROFILE", "production");
    }
    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let err = loader.load().expect_err("production requires a token");
    assert!(format!("{}", err).contains("PIZZAOPS_API_TOKEN"));

    clear_env();
}

#[test]
fn unparsable_poll_seconds_fall_back_to_the_default() {
    let _guard = env_guard();
    clear_env();

    unsafe {
        env::set_var("PIZZAOPS_WEBHOOK_POLL_SECONDS", "often");
    }

    let temp_dir = TempDir::new().unwrap();
    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let cfg = loader.load().expect("config loads despite the bad value");
    assert_eq!(cfg.webhook_poll_seconds, 15);

    clear_env();
}

#[test]
fn out_of_bounds_poll_interval_is_rejected() {
    let _guard = env_guard();
    clear_env();

    unsafe {
        env::set_var("PIZZAOPS_WEBHOOK_POLL_SECONDS", "2");
    }

    let temp_dir = TempDir::new().unwrap();
    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let err = loader.load().expect_err("a 2 second poll is out of bounds");
    assert!(format!("{}", err).contains("webhook poll interval"));

    clear_env();
}
