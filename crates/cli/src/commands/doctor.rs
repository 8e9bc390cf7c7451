use kitfinder_agent::build_llm_client;
use kitfinder_core::config::{AppConfig, LlmProvider};
use serde::Serialize;

use crate::commands::{runtime, CommandContext};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
pub struct DoctorCheck {
    pub name: &'static str,
    pub status: CheckStatus,
    pub details: String,
}

#[derive(Debug, Serialize)]
pub struct DoctorReport {
    pub overall_status: CheckStatus,
    pub summary: String,
    pub checks: Vec<DoctorCheck>,
}

pub fn run(demo: bool, json_output: bool) -> String {
    let report = build_report(demo);

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

pub fn build_report(demo: bool) -> DoctorReport {
    let mut checks = Vec::new();

    match CommandContext::load("doctor", demo) {
        Ok(context) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_catalog(&context));
            checks.push(check_llm(&context.config));
        }
        Err(result) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: result.output,
            });
            for name in ["catalog_connectivity", "llm_client"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if failed {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

/// Fetches the newest year of the first configured model.
fn check_catalog(context: &CommandContext) -> DoctorCheck {
    let Some((model, year)) = context
        .config
        .catalog
        .models
        .first()
        .and_then(|model| model.latest_year().map(|year| (model.key.clone(), year)))
    else {
        return DoctorCheck {
            name: "catalog_connectivity",
            status: CheckStatus::Skipped,
            details: "no models configured".to_string(),
        };
    };

    let runtime = match runtime("doctor") {
        Ok(runtime) => runtime,
        Err(result) => {
            return DoctorCheck {
                name: "catalog_connectivity",
                status: CheckStatus::Fail,
                details: result.output,
            };
        }
    };

    let catalog = context.catalog();
    match runtime.block_on(catalog.fetch(&model, year)) {
        Ok(records) => DoctorCheck {
            name: "catalog_connectivity",
            status: CheckStatus::Pass,
            details: format!(
                "{} catalog returned {} records for {model} {year}",
                if context.demo { "demo" } else { context.config.catalog.base_url.as_str() },
                records.len()
            ),
        },
        Err(error) => DoctorCheck {
            name: "catalog_connectivity",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn check_llm(config: &AppConfig) -> DoctorCheck {
    if config.llm.provider == LlmProvider::Disabled {
        return DoctorCheck {
            name: "llm_client",
            status: CheckStatus::Skipped,
            details: "provider disabled; replies use templates".to_string(),
        };
    }

    match build_llm_client(&config.llm) {
        Ok(_) => DoctorCheck {
            name: "llm_client",
            status: CheckStatus::Pass,
            details: format!(
                "{} client configured for `{}`",
                config.llm.provider.as_str(),
                config.llm.model
            ),
        },
        Err(error) => DoctorCheck {
            name: "llm_client",
            status: CheckStatus::Fail,
            details: format!("{error:#}"),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
