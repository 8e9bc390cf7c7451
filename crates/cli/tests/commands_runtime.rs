use std::env;
use std::sync::{Mutex, OnceLock};

use kitfinder_cli::commands::{config, doctor, fetch, models, search};
use serde_json::Value;

#[test]
fn models_lists_default_registry() {
    with_env(&[], || {
        let result = models::run();
        assert_eq!(result.exit_code, 0, "expected models to succeed with defaults");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "models");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["data"].as_array().map(Vec::len), Some(6));
        assert_eq!(payload["data"][1]["key"], "i20");
        assert_eq!(payload["data"][1]["latest_year"], 2024);
    });
}

#[test]
fn models_reports_config_failure() {
    with_env(&[("KITFINDER_CATALOG_STRATEGY", "scatter")], || {
        let result = models::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn fetch_summarizes_demo_listing() {
    with_env(&[], || {
        let result = fetch::run(true, "Creta", Some(2024));
        assert_eq!(result.exit_code, 0, "expected demo fetch to succeed");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "fetch");
        assert_eq!(payload["message"], "17 accessories across 2 types for CRETA 2024");
        assert_eq!(payload["data"]["totalAccessories"], 17);
        assert_eq!(payload["data"]["categories"]["Exteriors"]["count"], 5);
    });
}

#[test]
fn fetch_rejects_unknown_year_without_calling_backend() {
    with_env(&[], || {
        let result = fetch::run(true, "alcazar", Some(2019));
        assert_eq!(result.exit_code, 6, "expected invalid selection exit code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "year_unavailable");
    });
}

#[test]
fn fetch_reports_unreachable_backend() {
    with_env(
        &[
            ("KITFINDER_CATALOG_BASE_URL", "http://127.0.0.1:9"),
            ("KITFINDER_CATALOG_TIMEOUT_SECS", "2"),
        ],
        || {
            let result = fetch::run(false, "venue", Some(2023));
            assert_eq!(result.exit_code, 4, "expected backend unavailable exit code");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["error_class"], "backend_unavailable");
        },
    );
}

#[test]
fn search_finds_dash_cameras_across_models() {
    with_env(&[], || {
        let result = search::run(true, "dash camera", None, Some(2023));
        assert_eq!(result.exit_code, 0, "expected demo search to succeed");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["model"], "All Models");
        assert_eq!(payload["data"]["totalResults"], 1);
        assert_eq!(payload["data"]["accessories"][0]["accessoryName"], "Dual Channel Dash Camera");

        let empty = search::run(true, "  ", None, None);
        assert_eq!(empty.exit_code, 6, "blank terms are rejected");
    });
}

#[test]
fn config_redacts_api_key() {
    with_env(
        &[("KITFINDER_LLM_PROVIDER", "openai"), ("KITFINDER_LLM_API_KEY", "sk-live-secret")],
        || {
            let human = config::run(false);
            assert!(human
                .contains("- llm.api_key = <redacted> (source: env (KITFINDER_LLM_API_KEY))"));
            assert!(human
                .contains("- llm.provider = openai (source: env (KITFINDER_LLM_PROVIDER))"));
            assert!(!human.contains("sk-live-secret"));

            let json = config::run(true);
            assert!(!json.contains("sk-live-secret"));
            assert!(json.contains("[redacted]"));
        },
    );
}

#[test]
fn doctor_passes_in_demo_mode() {
    with_env(&[], || {
        let report = parse_payload(&doctor::run(true, true));

        assert_eq!(report["overall_status"], "pass");
        assert_eq!(report["checks"][1]["name"], "catalog_connectivity");
        assert_eq!(report["checks"][1]["status"], "pass");
        assert_eq!(report["checks"][2]["status"], "skipped");
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "KITFINDER_CATALOG_BASE_URL",
        "KITFINDER_CATALOG_TIMEOUT_SECS",
        "KITFINDER_CATALOG_CACHE_TTL_SECS",
        "KITFINDER_CATALOG_STRATEGY",
        "KITFINDER_CATALOG_IMAGE_BASE_URL",
        "KITFINDER_CATALOG_DESCRIPTION_LIMIT",
        "KITFINDER_SESSIONS_IDLE_TTL_SECS",
        "KITFINDER_SESSIONS_SWEEP_INTERVAL_SECS",
        "KITFINDER_LLM_PROVIDER",
        "KITFINDER_LLM_API_KEY",
        "KITFINDER_LLM_BASE_URL",
        "KITFINDER_LLM_MODEL",
        "KITFINDER_LLM_TIMEOUT_SECS",
        "KITFINDER_LLM_MAX_RETRIES",
        "KITFINDER_SERVER_BIND_ADDRESS",
        "KITFINDER_SERVER_PORT",
        "KITFINDER_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "KITFINDER_LOGGING_LEVEL",
        "KITFINDER_LOGGING_FORMAT",
        "KITFINDER_LOG_LEVEL",
        "KITFINDER_LOG_FORMAT",
        "PORT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
