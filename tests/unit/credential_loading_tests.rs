//! Credential loading falls back from the OS keychain to env vars; in
//! the test environment the keychain is unavailable, so the env path is
//! what gets exercised.

use serial_test::serial;

use doorman::config::GlobalConfig;
use doorman::AppError;

fn base_toml(chat_id: Option<i64>) -> String {
    let telegram = chat_id.map_or(String::new(), |id| format!("\n[telegram]\nchat_id = {id}\n"));
    format!(
        r#"
[platform]
base_url = "https://platform.example"
username = "astra"
{telegram}
"#
    )
}

#[tokio::test]
#[serial]
async fn password_loads_from_env() {
    std::env::set_var("DOORMAN_PASSWORD", "hunter2");
    std::env::remove_var("TELEGRAM_BOT_TOKEN");

    let mut config = GlobalConfig::from_toml_str(&base_toml(None)).expect("config parses");
    config.load_credentials().await.expect("credentials load");

    assert_eq!(config.platform.password, "hunter2");
    std::env::remove_var("DOORMAN_PASSWORD");
}

#[tokio::test]
#[serial]
async fn missing_password_is_a_config_error() {
    std::env::remove_var("DOORMAN_PASSWORD");

    let mut config = GlobalConfig::from_toml_str(&base_toml(None)).expect("config parses");
    let err = config
        .load_credentials()
        .await
        .expect_err("missing password fails");
    assert!(matches!(err, AppError::Config(_)), "got {err:?}");
}

#[tokio::test]
#[serial]
async fn missing_telegram_token_disables_remote_backend() {
    std::env::set_var("DOORMAN_PASSWORD", "hunter2");
    std::env::remove_var("TELEGRAM_BOT_TOKEN");

    let mut config = GlobalConfig::from_toml_str(&base_toml(Some(4242))).expect("config parses");
    config.load_credentials().await.expect("credentials load");

    assert!(!config.telegram_enabled());
    std::env::remove_var("DOORMAN_PASSWORD");
}

#[tokio::test]
#[serial]
async fn telegram_token_activates_remote_backend() {
    std::env::set_var("DOORMAN_PASSWORD", "hunter2");
    std::env::set_var("TELEGRAM_BOT_TOKEN", "123:abc");

    let mut config = GlobalConfig::from_toml_str(&base_toml(Some(4242))).expect("config parses");
    config.load_credentials().await.expect("credentials load");

    assert!(config.telegram_enabled());
    std::env::remove_var("DOORMAN_PASSWORD");
    std::env::remove_var("TELEGRAM_BOT_TOKEN");
}
