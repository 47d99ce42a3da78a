use meetings::config::{ConfigError, ConfigLoader};
use std::{
    env, fs,
    path::PathBuf,
    sync::{Mutex, MutexGuard, OnceLock},
};
use tempfile::TempDir;

const KEYS: &[&str] = &[
    "MEETINGS_PROFILE",
    "MEETINGS_API_BIND_ADDR",
    "MEETINGS_LOG_LEVEL",
    "MEETINGS_OPERATOR_TOKEN",
    "MEETINGS_OPERATOR_TOKENS",
    "MEETINGS_PAST_MEETINGS_PAGE_SIZE",
    "MEETINGS_RUN_MIGRATIONS",
];

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
    for key in KEYS {
        unsafe {
            env::remove_var(key);
        }
    }
}

fn set_env(key: &str, value: &str) {
    unsafe {
        env::set_var(key, value);
    }
}

fn write_env_file(dir: &TempDir, name: &str, contents: &str) {
    fs::write(dir.path().join(name), contents).unwrap();
}

fn loader(dir: &TempDir) -> ConfigLoader {
    ConfigLoader::with_base_dir(PathBuf::from(dir.path()))
}

#[test]
fn loads_defaults_when_no_env_files_present() {
    let _guard = env_guard();
    clear_env();
    set_env("MEETINGS_OPERATOR_TOKEN", "token");

    let dir = TempDir::new().unwrap();
    let cfg = loader(&dir).load().expect("config loads with defaults");

    assert_eq!(cfg.profile, "local");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:8080");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.past_meetings_page_size, 10);
    assert!(cfg.run_migrations);
    assert_eq!(cfg.operator_tokens, vec!["token".to_string()]);
    cfg.bind_addr().expect("default bind addr parses");
    clear_env();
}

#[test]
fn layered_env_files_apply_in_order() {
    let _guard = env_guard();
    clear_env();

    let dir = TempDir::new().unwrap();
    write_env_file(&dir, ".env", "MEETINGS_API_BIND_ADDR=127.0.0.1:3000\n");
    write_env_file(
        &dir,
        ".env.local",
        "MEETINGS_PROFILE=test\nMEETINGS_API_BIND_ADDR=127.0.0.1:4000\nMEETINGS_OPERATOR_TOKEN=layered\n",
    );
    write_env_file(&dir, ".env.test", "MEETINGS_API_BIND_ADDR=192.168.0.10:5000\n");
    write_env_file(
        &dir,
        ".env.test.local",
        "MEETINGS_API_BIND_ADDR=10.0.0.5:6000\nMEETINGS_PAST_MEETINGS_PAGE_SIZE=25\n",
    );

    let cfg = loader(&dir).load().expect("config loads with layered env files");

    assert_eq!(cfg.profile, "test");
    assert_eq!(cfg.api_bind_addr, "10.0.0.5:6000");
    assert_eq!(cfg.past_meetings_page_size, 25);
    clear_env();
}

#[test]
fn os_environment_has_highest_precedence() {
    let _guard = env_guard();
    clear_env();

    let dir = TempDir::new().unwrap();
    write_env_file(
        &dir,
        ".env",
        "MEETINGS_API_BIND_ADDR=127.0.0.1:3000\nMEETINGS_OPERATOR_TOKEN=from-file\n",
    );
    set_env("MEETINGS_API_BIND_ADDR", "0.0.0.0:9090");

    let cfg = loader(&dir).load().expect("config loads with env override");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:9090");
    assert_eq!(cfg.operator_tokens, vec!["from-file".to_string()]);

    clear_env();
}

#[test]
fn token_list_wins_over_single_token() {
    let _guard = env_guard();
    clear_env();
    set_env("MEETINGS_OPERATOR_TOKEN", "single");
    set_env("MEETINGS_OPERATOR_TOKENS", "first, second,,");

    let dir = TempDir::new().unwrap();
    let cfg = loader(&dir).load().unwrap();
    assert_eq!(
        cfg.operator_tokens,
        vec!["first".to_string(), "second".to_string()]
    );

    clear_env();
}

#[test]
fn missing_operator_token_is_rejected() {
    let _guard = env_guard();
    clear_env();

    let dir = TempDir::new().unwrap();
    let err = loader(&dir).load().expect_err("tokens are required");
    assert!(matches!(err, ConfigError::MissingOperatorTokens));
}

#[test]
fn invalid_values_return_errors() {
    let _guard = env_guard();
    clear_env();
    set_env("MEETINGS_OPERATOR_TOKEN", "token");
    let dir = TempDir::new().unwrap();

    set_env("MEETINGS_API_BIND_ADDR", "not-an-addr");
    let err = loader(&dir).load().expect_err("invalid bind addr should fail");
    assert!(err.to_string().contains("invalid api bind address"));
    unsafe {
        env::remove_var("MEETINGS_API_BIND_ADDR");
    }

    set_env("MEETINGS_PAST_MEETINGS_PAGE_SIZE", "ten");
    let err = loader(&dir).load().expect_err("non-numeric page size should fail");
    assert!(matches!(
        err,
        ConfigError::InvalidValue {
            key: "PAST_MEETINGS_PAGE_SIZE",
            ..
        }
    ));

    set_env("MEETINGS_PAST_MEETINGS_PAGE_SIZE", "0");
    let err = loader(&dir).load().expect_err("page size out of range should fail");
    assert!(matches!(err, ConfigError::InvalidPageSize { value: 0 }));

    clear_env();
}
