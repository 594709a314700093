use anyhow::{Context, Result, anyhow};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_LLM_MODEL: &str = "openai/gpt-4o-mini";
pub const DEFAULT_INSTABRAIN_API_URL: &str = "https://api.instabrainsandbox.io/api";
pub const DEFAULT_ORIGIN_SUFFIX: &str = ".gohighlevel.com";

#[derive(Clone)]
pub struct ServiceConfig {
    pub port: u16,
    pub openrouter_api_key: String,
    pub llm_model: String,
    pub instabrain_api_url: String,
    pub instabrain_user_id: String,
    pub instabrain_access_token: String,
    pub allowed_origin_suffixes: Vec<String>,
}

// Credentials stay out of debug output.
impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("port", &self.port)
            .field("llm_model", &self.llm_model)
            .field("instabrain_api_url", &self.instabrain_api_url)
            .field("allowed_origin_suffixes", &self.allowed_origin_suffixes)
            .finish_non_exhaustive()
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let required = |name: &str| var(name).ok_or_else(|| anyhow!("{name} not set"));

        let port = match var("PORT") {
            Some(port) => port
                .trim()
                .parse::<u16>()
                .with_context(|| format!("PORT must be a port number, got {port:?}"))?,
            None => DEFAULT_PORT,
        };

        let allowed_origin_suffixes: Vec<String> = var("ALLOWED_ORIGIN_SUFFIXES")
            .unwrap_or_else(|| DEFAULT_ORIGIN_SUFFIX.to_string())
            .split(',')
            .map(str::trim)
            .filter(|suffix| !suffix.is_empty())
            .map(str::to_string)
            .collect();
        if allowed_origin_suffixes.is_empty() {
            return Err(anyhow!("ALLOWED_ORIGIN_SUFFIXES lists no origins"));
        }

        Ok(Self {
            port,
            openrouter_api_key: required("OPENROUTER_API_KEY")?,
            llm_model: var("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            instabrain_api_url: var("INSTABRAIN_API_URL")
                .unwrap_or_else(|| DEFAULT_INSTABRAIN_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            instabrain_user_id: required("INSTABRAIN_USER_ID")?,
            instabrain_access_token: required("INSTABRAIN_ACCESS_TOKEN")?,
            allowed_origin_suffixes,
        })
    }
}
