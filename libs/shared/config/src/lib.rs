use std::env;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub server_port: u16,
    pub scheduling: SchedulingConfig,
}

/// Tunables for the scheduling engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulingConfig {
    pub max_slot_days: u32,
    pub min_slot_minutes: u32,
    pub max_slot_minutes: u32,
    pub default_slot_days: u32,
    pub default_slot_minutes: u32,
    pub notification_timeout_ms: u64,
    pub max_text_length: usize,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            max_slot_days: 366,
            min_slot_minutes: 5,
            // No availability window is longer than a day.
            max_slot_minutes: 1_440,
            default_slot_days: 7,
            default_slot_minutes: 30,
            notification_timeout_ms: 2_000,
            max_text_length: 500,
        }
    }
}

impl SchedulingConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            max_slot_days: parse_var("SCHEDULING_MAX_SLOT_DAYS", defaults.max_slot_days),
            // Slots shorter than five minutes are never allowed.
            min_slot_minutes: parse_var("SCHEDULING_MIN_SLOT_MINUTES", defaults.min_slot_minutes)
                .max(defaults.min_slot_minutes),
            max_slot_minutes: parse_var("SCHEDULING_MAX_SLOT_MINUTES", defaults.max_slot_minutes)
                .min(defaults.max_slot_minutes),
            default_slot_days: parse_var("SCHEDULING_DEFAULT_SLOT_DAYS", defaults.default_slot_days),
            default_slot_minutes: parse_var("SCHEDULING_DEFAULT_SLOT_MINUTES", defaults.default_slot_minutes),
            notification_timeout_ms: parse_var(
                "SCHEDULING_NOTIFICATION_TIMEOUT_MS",
                defaults.notification_timeout_ms,
            ),
            max_text_length: parse_var("SCHEDULING_MAX_TEXT_LENGTH", defaults.max_text_length),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, falling back to in-memory storage");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, falling back to in-memory storage");
                    String::new()
                }),
            server_port: parse_var("PORT", 3000),
            scheduling: SchedulingConfig::from_env(),
        };

        if !config.is_configured() {
            warn!("Supabase not configured - appointments will not survive a restart");
        }

        config
    }

    /// In-memory configuration, used by tests and local runs.
    pub fn in_memory() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            server_port: 3000,
            scheduling: SchedulingConfig::default(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }
}

fn parse_var<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
