use jobboard::config::ConfigLoader;
use std::{
    env, fs,
    path::PathBuf,
    sync::{Mutex, MutexGuard, OnceLock},
};
use tempfile::TempDir;

const SECRET: &str = "config-loader-secret-config-loader-secret";

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
        env::remove_var("JOBBOARD_PROFILE");
        env::remove_var("JOBBOARD_API_BIND_ADDR");
        env::remove_var("JOBBOARD_LOG_LEVEL");
        env::remove_var("JOBBOARD_JWT_SECRET");
        env::remove_var("JOBBOARD_MAIL_RELAY_URL");
        env::remove_var("JOBBOARD_EMPLOYERS_MAY_APPLY");
    }
}

fn write_env_file(dir: &TempDir, name: &str, contents: &str) {
    let path = dir.path().join(name);
    fs::write(path, contents).unwrap();
}

fn loader_for(dir: &TempDir) -> ConfigLoader {
    ConfigLoader::with_base_dir(PathBuf::from(dir.path()))
}

#[test]
fn loads_defaults_when_no_env_present() {
    let _guard = env_guard();
    clear_env();

    unsafe {
        env::set_var("JOBBOARD_JWT_SECRET", SECRET);
    }

    let temp_dir = TempDir::new().unwrap();
    let cfg = loader_for(&temp_dir)
        .load()
        .expect("config loads with defaults");

    assert_eq!(cfg.profile, "local");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:8080");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.access_token_ttl_seconds, 300);
    assert_eq!(cfg.refresh_token_ttl_seconds, 86400);
    assert_eq!(cfg.mail.max_attempts, 3);
    assert!(cfg.mail.relay_url.is_none());
    assert!(!cfg.employers_may_apply);
    cfg.bind_addr().expect("default bind addr parses");
    clear_env();
}

#[test]
fn layered_env_files_apply_in_order() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "JOBBOARD_API_BIND_ADDR=127.0.0.1:3000\n");
    write_env_file(
        &temp_dir,
        ".env.test",
        "JOBBOARD_API_BIND_ADDR=192.168.0.10:5000\nJOBBOARD_EMPLOYERS_MAY_APPLY=true\n",
    );
    write_env_file(
        &temp_dir,
        ".env.test.local",
        "JOBBOARD_API_BIND_ADDR=10.0.0.5:6000\n",
    );

    // Select profile via .env.local before profile-specific files load.
    write_env_file(
        &temp_dir,
        ".env.local",
        &format!(
            "JOBBOARD_PROFILE=test\nJOBBOARD_API_BIND_ADDR=127.0.0.1:4000\nJOBBOARD_JWT_SECRET={SECRET}\n"
        ),
    );

    let cfg = loader_for(&temp_dir)
        .load()
        .expect("config loads with layered env files");

    assert_eq!(cfg.profile, "test");
    assert_eq!(cfg.api_bind_addr, "10.0.0.5:6000");
    assert!(cfg.employers_may_apply);
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
        "JOBBOARD_API_BIND_ADDR=127.0.0.1:3000\nJOBBOARD_JWT_SECRET=from-dotenv\n",
    );

    unsafe {
        env::set_var("JOBBOARD_API_BIND_ADDR", "0.0.0.0:9090");
        env::set_var("JOBBOARD_JWT_SECRET", SECRET);
    }

    let cfg = loader_for(&temp_dir)
        .load()
        .expect("config loads with env override");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:9090");
    assert_eq!(cfg.jwt_secret.as_deref(), Some(SECRET));

    clear_env();
}

#[test]
fn invalid_bind_addr_returns_error() {
    let _guard = env_guard();
    clear_env();

    unsafe {
        env::set_var("JOBBOARD_API_BIND_ADDR", "not-an-addr");
        env::set_var("JOBBOARD_JWT_SECRET", SECRET);
    }
    let temp_dir = TempDir::new().unwrap();
    let err = loader_for(&temp_dir)
        .load()
        .expect_err("invalid bind addr should fail");
    assert!(format!("{}", err).contains("invalid api bind address"));

    clear_env();
}

#[test]
fn missing_jwt_secret_is_rejected() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    let err = loader_for(&temp_dir)
        .load()
        .expect_err("missing secret should fail");
    assert!(format!("{}", err).contains("JOBBOARD_JWT_SECRET"));
}

#[test]
fn production_profile_requires_strong_secret_and_https_relay() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    unsafe {
        env::set_var("JOBBOARD_PROFILE", "production");
        env::set_var("JOBBOARD_JWT_SECRET", "short");
    }
    let err = loader_for(&temp_dir)
        .load()
        .expect_err("weak secret should fail");
    assert!(format!("{}", err).contains("at least 32 bytes"));

    unsafe {
        env::set_var("JOBBOARD_JWT_SECRET", SECRET);
        env::set_var("JOBBOARD_MAIL_RELAY_URL", "http://relay.example.com/send");
    }
    let err = loader_for(&temp_dir)
        .load()
        .expect_err("plain http relay should fail");
    assert!(format!("{}", err).contains("invalid mail relay url"));

    unsafe {
        env::set_var("JOBBOARD_MAIL_RELAY_URL", "https://relay.example.com/send");
    }
    let cfg = loader_for(&temp_dir).load().expect("valid production config");
    assert_eq!(
        cfg.mail.relay_url.as_deref(),
        Some("https://relay.example.com/send")
    );
    let redacted = cfg.redacted_json().unwrap();
    assert!(!redacted.contains(SECRET));
    assert!(!redacted.contains("relay.example.com"));

    clear_env();
}
