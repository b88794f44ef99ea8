use super::*;
use crate::state::test_helpers::env_lock;

/// # Safety
/// Callers hold `env_lock()`.
unsafe fn clear_server_env() {
    unsafe {
        for key in [
            "DATABASE_URL",
            "PORT",
            "UPLOADS_DIR",
            "UPLOAD_MAX_BYTES",
            "CHAT_MAX_TOKENS",
            "CHAT_HISTORY_LIMIT",
        ] {
            std::env::remove_var(key);
        }
    }
}

#[test]
fn defaults_apply_when_only_database_url_is_set() {
    let _guard = env_lock();
    unsafe {
        clear_server_env();
        std::env::set_var("DATABASE_URL", "postgres://localhost/garden");
    }

    let cfg = ServerConfig::from_env().unwrap();
    assert_eq!(cfg.port, DEFAULT_PORT);
    assert_eq!(cfg.uploads_dir, PathBuf::from("uploads"));
    assert_eq!(cfg.upload_max_bytes, 5 * 1024 * 1024);
    assert_eq!(cfg.chat, ChatConfig::default());

    unsafe { clear_server_env() };
}

#[test]
fn overrides_are_parsed() {
    let _guard = env_lock();
    unsafe {
        clear_server_env();
        std::env::set_var("DATABASE_URL", "postgres://localhost/garden");
        std::env::set_var("PORT", "8080");
        std::env::set_var("UPLOADS_DIR", "/var/lib/garden/uploads");
        std::env::set_var("CHAT_HISTORY_LIMIT", " 10 ");
    }

    let cfg = ServerConfig::from_env().unwrap();
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.uploads_dir, PathBuf::from("/var/lib/garden/uploads"));
    assert_eq!(cfg.chat.history_limit, 10);

    unsafe { clear_server_env() };
}

#[test]
fn missing_database_url_is_an_error() {
    let _guard = env_lock();
    unsafe { clear_server_env() };

    assert!(matches!(ServerConfig::from_env(), Err(ConfigError::MissingDatabaseUrl)));
}

#[test]
fn invalid_port_is_an_error() {
    let _guard = env_lock();
    unsafe {
        clear_server_env();
        std::env::set_var("DATABASE_URL", "postgres://localhost/garden");
        std::env::set_var("PORT", "seventy");
    }

    assert!(matches!(ServerConfig::from_env(), Err(ConfigError::InvalidPort(ref p)) if p == "seventy"));

    unsafe { clear_server_env() };
}

#[test]
fn env_parse_falls_back_on_garbage() {
    let _guard = env_lock();
    unsafe { std::env::set_var("__GARDEN_ENV_PARSE_BAD__", "lots") };
    let val: usize = env_parse("__GARDEN_ENV_PARSE_BAD__", 7);
    assert_eq!(val, 7);
    unsafe { std::env::remove_var("__GARDEN_ENV_PARSE_BAD__") };
}
