use reqwest::Client;

const APP_USER_AGENT: &str = "beatsync/0.1.0";

/// Shared HTTP client for catalog queries and archive downloads.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder().user_agent(APP_USER_AGENT).build()
}
