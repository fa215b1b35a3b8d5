use std::env;

/// Settings read from the environment. Command-line flags take precedence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub candidate_limit: Option<usize>,
    pub span: Option<String>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            candidate_limit: None,
            span: None,
            log_level: "cqpt_lang=warn,cqpt_run=warn".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(limit_str) = lookup("CQPT_CANDIDATE_LIMIT") {
            if let Ok(limit) = limit_str.parse::<usize>() {
                config.candidate_limit = Some(limit);
            } else {
                eprintln!(
                    "Warning: Invalid CQPT_CANDIDATE_LIMIT value '{}', using no limit",
                    limit_str
                );
            }
        }

        if let Some(span) = lookup("CQPT_SPAN") {
            let span = span.trim();
            if is_valid_span(span) {
                config.span = Some(span.to_string());
            } else {
                eprintln!("Warning: Invalid CQPT_SPAN value '{}', ignoring it", span);
            }
        }

        if let Some(log_level) = lookup("CQPT_LOG") {
            config.log_level = log_level;
        } else if let Some(log_level) = lookup("RUST_LOG") {
            config.log_level = log_level;
        }

        config
    }
}

/// Whether `span` can name a structural attribute in ` within {span}`.
pub(crate) fn is_valid_span(span: &str) -> bool {
    !span.is_empty() && span.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
