use vacancy_core::AppError;

/// Server settings read from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub api_key: String,
    pub port: u16,
    pub token_secret: String,
    /// Comma-separated allow-list of submitters that skip review.
    pub approved_submitters: String,
    /// Public base URL used in approve/reject links.
    pub server_domain: String,
    pub approval_webhook_url: String,
    pub llm_api_key: String,
    pub llm_model: Option<String>,
    pub llm_base_url: Option<String>,
    pub text_domains: Vec<String>,
    pub vacancy_queue: String,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AppError::ConfigError(format!("{key} must be set")))
        };

        let port = match lookup("VACANCY_SERVER_PORT") {
            None => 3000,
            Some(raw) => raw.trim().parse().map_err(|_| {
                AppError::ConfigError(format!("Invalid VACANCY_SERVER_PORT '{raw}'"))
            })?,
        };

        Ok(Self {
            api_key: required("VACANCY_SERVER_API_KEY")?,
            port,
            token_secret: required("VACANCY_TOKEN_SECRET")?,
            approved_submitters: lookup("VACANCY_APPROVED_SUBMITTERS").unwrap_or_default(),
            server_domain: required("VACANCY_SERVER_DOMAIN")?,
            approval_webhook_url: required("VACANCY_APPROVAL_WEBHOOK_URL")?,
            llm_api_key: required("VACANCY_LLM_API_KEY")?,
            llm_model: lookup("VACANCY_LLM_MODEL"),
            llm_base_url: lookup("VACANCY_LLM_BASE_URL"),
            text_domains: split_list(&lookup("VACANCY_TEXT_DOMAINS").unwrap_or_default()),
            vacancy_queue: lookup("VACANCY_VACANCY_QUEUE").unwrap_or_else(|| "vacancies".into()),
        })
    }
}

pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
