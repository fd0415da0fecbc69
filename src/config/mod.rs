pub(crate) const DEFAULT_FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// Connection parameters for the hosted document store.
///
/// Supplied at startup through `window.ENV`. Nothing here is validated: a
/// missing or wrong value surfaces later as a subscription error.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct StoreConfig {
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
    pub storage_bucket: String,
    pub messaging_sender_id: String,
    pub app_id: String,
    pub base_url: String,
}

impl StoreConfig {
    /// Reads each parameter from `lookup`, preferring the documented
    /// `FIREBASE_*` keys and falling back to their snake_case aliases.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .or_else(|| lookup(&key.trim_start_matches("FIREBASE_").to_lowercase()))
                .unwrap_or_default()
        };

        let base_url = lookup("FIRESTORE_BASE_URL")
            .or_else(|| lookup("firestore_base_url"))
            .map(|v| v.trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_FIRESTORE_BASE_URL.to_string());

        Self {
            api_key: read("FIREBASE_API_KEY"),
            auth_domain: read("FIREBASE_AUTH_DOMAIN"),
            project_id: read("FIREBASE_PROJECT_ID"),
            storage_bucket: read("FIREBASE_STORAGE_BUCKET"),
            messaging_sender_id: read("FIREBASE_MESSAGING_SENDER_ID"),
            app_id: read("FIREBASE_APP_ID"),
            base_url,
        }
    }

    /// Loads from `window.ENV`; outside a browser every value is empty.
    pub fn from_window() -> Self {
        let env = web_sys::window()
            .and_then(|w| w.get("ENV"))
            .filter(|env| !env.is_undefined() && env.is_object());

        Self::from_lookup(|key| {
            let env = env.as_ref()?;
            js_sys::Reflect::get(env, &key.into())
                .ok()
                .and_then(|v| v.as_string())
        })
    }

    /// `projects/{id}/databases/(default)/documents` under the REST base.
    pub fn documents_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents",
            self.base_url,
            urlencoding::encode(&self.project_id)
        )
    }
}
