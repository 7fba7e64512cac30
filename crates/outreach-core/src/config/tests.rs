use super::*;

#[test]
fn test_defaults_when_sections_missing() {
    let cfg: Config = toml::from_str("").unwrap();
    assert_eq!(cfg.monitor.poll_interval_secs, 10);
    assert_eq!(cfg.monitor.history_cap, 20);
    assert_eq!(cfg.monitor.context_turns, 10);
    assert_eq!(cfg.monitor.ledger_cap, 100);
    assert_eq!(cfg.bulk.daily_limit, 40);
    assert_eq!(cfg.transport.default_country_code, "966");
    assert_eq!(cfg.responder.max_tokens, 200);
    assert!(cfg.responder.system_prompt.contains("[LEAD_CONFIRMED:"));
    assert!(cfg.directory.contacts_csv.is_none());
    assert_eq!(cfg.bulk.short_break_every, 5);
    assert_eq!(cfg.bulk.long_break_every, 10);
    assert_eq!(cfg.bulk.random_pause_chance, 0.05);
    assert!(!cfg.api.enabled);
    assert_eq!(cfg.api.host, "127.0.0.1");
}

#[test]
fn test_partial_sections_from_toml() {
    let toml_str = r#"
        [monitor]
        poll_interval_secs = 30
        contacts = ["+966501234567", "0500990167"]

        [bulk]
        daily_limit = 10
        min_delay_secs = 1
        max_delay_secs = 2
    "#;
    let cfg: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(cfg.monitor.poll_interval_secs, 30);
    assert_eq!(cfg.monitor.history_cap, 20);
    assert_eq!(cfg.monitor.contacts.len(), 2);
    assert_eq!(cfg.bulk.daily_limit, 10);
}

#[test]
fn test_load_missing_file_uses_defaults() {
    let cfg = load("/nonexistent/__outreach_config__.toml").unwrap();
    assert_eq!(cfg.outreach.name, "Outreach");
    assert!(!cfg.responder.model.is_empty());
}

#[test]
fn test_load_rejects_inverted_delays() {
    let tmp = std::env::temp_dir().join("__outreach_test_bad_delays__.toml");
    std::fs::write(&tmp, "[bulk]\nmin_delay_secs = 10\nmax_delay_secs = 5\n").unwrap();
    let err = load(tmp.to_str().unwrap()).unwrap_err();
    assert!(err.to_string().contains("min_delay_secs"));
    let _ = std::fs::remove_file(&tmp);
}

#[test]
fn test_load_rejects_zero_poll_interval() {
    let tmp = std::env::temp_dir().join("__outreach_test_zero_poll__.toml");
    std::fs::write(&tmp, "[monitor]\npoll_interval_secs = 0\n").unwrap();
    assert!(load(tmp.to_str().unwrap()).is_err());
    let _ = std::fs::remove_file(&tmp);
}

#[test]
fn test_load_rejects_zero_gate_recheck() {
    let tmp = std::env::temp_dir().join("__outreach_test_zero_gate__.toml");
    std::fs::write(&tmp, "[monitor]\ngate_recheck_ms = 0\n").unwrap();
    let err = load(tmp.to_str().unwrap()).unwrap_err();
    assert!(err.to_string().contains("gate_recheck_ms"));
    let _ = std::fs::remove_file(&tmp);
}

#[test]
fn test_load_rejects_bad_break_settings() {
    let tmp = std::env::temp_dir().join("__outreach_test_bad_breaks__.toml");
    std::fs::write(
        &tmp,
        "[bulk]\nlong_break_min_secs = 300\nlong_break_max_secs = 200\n",
    )
    .unwrap();
    let err = load(tmp.to_str().unwrap()).unwrap_err();
    assert!(err.to_string().contains("long_break_min_secs"));

    std::fs::write(&tmp, "[bulk]\nrandom_pause_chance = 1.5\n").unwrap();
    let err = load(tmp.to_str().unwrap()).unwrap_err();
    assert!(err.to_string().contains("random_pause_chance"));
    let _ = std::fs::remove_file(&tmp);
}

#[test]
fn test_api_section_from_toml() {
    let cfg: Config = toml::from_str(
        "[api]\nenabled = true\nport = 9000\napi_key = \"s3cret\"\n",
    )
    .unwrap();
    assert!(cfg.api.enabled);
    assert_eq!(cfg.api.port, 9000);
    assert_eq!(cfg.api.api_key, "s3cret");
    assert_eq!(cfg.api.host, "127.0.0.1");
}

#[test]
fn test_load_keeps_explicit_model() {
    let tmp = std::env::temp_dir().join("__outreach_test_model__.toml");
    std::fs::write(&tmp, "[responder]\nmodel = \"gpt-4o\"\n").unwrap();
    let cfg = load(tmp.to_str().unwrap()).unwrap();
    assert_eq!(cfg.responder.model, "gpt-4o");
    let _ = std::fs::remove_file(&tmp);
}

#[test]
fn test_resolve_system_prompt_prefers_file() {
    let tmp = std::env::temp_dir().join("__outreach_test_prompt__.md");
    std::fs::write(&tmp, "You are Noura.\n").unwrap();

    let mut cfg = ResponderConfig {
        system_prompt_file: Some(tmp.to_str().unwrap().to_string()),
        ..Default::default()
    };
    assert_eq!(cfg.resolve_system_prompt(), "You are Noura.");

    cfg.system_prompt_file = Some("/nonexistent/__prompt__.md".into());
    assert_eq!(cfg.resolve_system_prompt(), cfg.system_prompt);

    let _ = std::fs::remove_file(&tmp);
}

#[test]
fn test_shellexpand_home() {
    if let Some(home) = std::env::var_os("HOME") {
        let expanded = shellexpand("~/.outreach/data/leads.db");
        assert_eq!(
            expanded,
            format!("{}/.outreach/data/leads.db", home.to_string_lossy())
        );
    }
    assert_eq!(shellexpand("/abs/path"), "/abs/path");
}
