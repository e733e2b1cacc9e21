use oauth2::{
    AccessToken, EndpointNotSet, EndpointSet, TokenResponse,
    basic::BasicClient,
};
use url::Url;

use crate::error::Result;

/// Stores the OAuth 2 client ID and client secret.
#[derive(Debug, Clone)]
pub struct KeyPair(
    pub(crate) oauth2::ClientId,
    pub(crate) Option<oauth2::ClientSecret>,
);

impl KeyPair {
    /// Creates a new `KeyPair` from the provided `client_id` and `client_secret` strings.
    #[must_use]
    pub fn new(client_id: String, client_secret: Option<String>) -> Self {
        Self(
            oauth2::ClientId::new(client_id),
            client_secret.map(oauth2::ClientSecret::new),
        )
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        self.0.as_str()
    }
}

/// An OAuth2 client that only knows the token endpoint.
pub type OAuthClient =
    BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

#[instrument(skip(key_pair), fields(client_id = key_pair.client_id()))]
pub(crate) fn build_oauth_client(key_pair: KeyPair, token_url: &Url) -> OAuthClient {
    let client = BasicClient::new(key_pair.0)
        .set_token_uri(oauth2::TokenUrl::from_url(token_url.clone()));

    match key_pair.1 {
        Some(secret) => client.set_client_secret(secret),
        None => client,
    }
}

/// Exchanges the client credentials for an access token. The credentials travel as HTTP basic
/// auth, which is the `oauth2` default.
///
/// `http_client` is the mutual-TLS client built by [`crate::transport`], so the token endpoint
/// sees the same client certificate as the API.
#[instrument(skip(key_pair, http_client))]
pub async fn exchange_client_credentials(
    key_pair: KeyPair,
    token_url: &Url,
    http_client: &reqwest::Client,
) -> Result<AccessToken> {
    let token = build_oauth_client(key_pair, token_url)
        .exchange_client_credentials()
        .request_async(http_client)
        .await?;

    debug!(expires_in = ?token.expires_in(), "obtained access token");
    Ok(token.access_token().clone())
}
