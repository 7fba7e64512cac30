//! Default value functions used by serde for config deserialization.

pub fn default_name() -> String {
    "Outreach".to_string()
}

pub fn default_data_dir() -> String {
    "~/.outreach".to_string()
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_transport_base_url() -> String {
    "http://127.0.0.1:4780".to_string()
}

pub fn default_country_code() -> String {
    "966".to_string()
}

pub fn default_transport_timeout() -> u64 {
    60
}

pub fn default_responder_provider() -> String {
    "openai".to_string()
}

pub fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

pub fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

pub fn default_max_tokens() -> u32 {
    200
}

pub fn default_temperature() -> f32 {
    0.7
}

pub fn default_responder_timeout() -> u64 {
    60
}

pub fn default_fallback_reply() -> String {
    "Thank you for your message. We'll get back to you soon.".to_string()
}

pub fn default_system_prompt() -> String {
    "You are a helpful customer service representative.\n\
     Respond professionally in the customer's language (Arabic or English).\n\
     Keep responses concise and helpful.\n\n\
     When the customer has confirmed which product they want and told you their city, \
     put this marker on its own line, then confirm briefly and stop:\n\
     [LEAD_CONFIRMED: <product>]\n\
     The marker is removed before the customer sees your reply."
        .to_string()
}

pub fn default_poll_interval() -> u64 {
    10
}

pub fn default_gate_recheck_ms() -> u64 {
    500
}

pub fn default_stop_timeout() -> u64 {
    30
}

pub fn default_history_cap() -> usize {
    20
}

pub fn default_context_turns() -> usize {
    10
}

pub fn default_ledger_cap() -> usize {
    100
}

pub fn default_daily_limit() -> u32 {
    40
}

pub fn default_min_delay() -> u64 {
    25
}

pub fn default_max_delay() -> u64 {
    40
}

pub fn default_short_break_every() -> usize {
    5
}

pub fn default_short_break_min() -> u64 {
    60
}

pub fn default_short_break_max() -> u64 {
    90
}

pub fn default_long_break_every() -> usize {
    10
}

pub fn default_long_break_min() -> u64 {
    120
}

pub fn default_long_break_max() -> u64 {
    180
}

pub fn default_random_pause_chance() -> f64 {
    0.05
}

pub fn default_random_pause_min() -> u64 {
    45
}

pub fn default_random_pause_max() -> u64 {
    75
}

pub fn default_api_host() -> String {
    "127.0.0.1".to_string()
}

pub fn default_api_port() -> u16 {
    4781
}

pub fn default_db_path() -> String {
    "~/.outreach/data/leads.db".to_string()
}
