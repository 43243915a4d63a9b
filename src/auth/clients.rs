use std::fmt;

use oauth2::{basic::BasicClient, AuthUrl, Client, ClientId, ClientSecret, RedirectUrl, TokenUrl};
use serde::Deserialize;

use crate::{config::{AppConfig, OAuthKeys}, error::ChatError, users::NewUser, AppResult, GetField};

type HappyClient = Client<oauth2::StandardErrorResponse<oauth2::basic::BasicErrorResponseType>, oauth2::StandardTokenResponse<oauth2::EmptyExtraTokenFields, oauth2::basic::BasicTokenType>, oauth2::StandardTokenIntrospectionResponse<oauth2::EmptyExtraTokenFields, oauth2::basic::BasicTokenType>, oauth2::StandardRevocableToken, oauth2::StandardErrorResponse<oauth2::RevocationErrorResponseType>, oauth2::EndpointSet, oauth2::EndpointNotSet, oauth2::EndpointNotSet, oauth2::EndpointNotSet, oauth2::EndpointSet>;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClientProvider {
    Google,
    Github,
}

impl ClientProvider {
    pub fn id(&self) -> &str {
        use ClientProvider::*;
        match self {
            Google => "google.com",
            Github => "github.com",
        }
    }

    fn path(&self) -> &str {
        use ClientProvider::*;
        match self {
            Google => "google",
            Github => "github",
        }
    }

    fn endpoints(&self) -> (&'static str, &'static str) {
        use ClientProvider::*;
        match self {
            Google => (
                "https://accounts.google.com/o/oauth2/auth",
                "https://oauth2.googleapis.com/token",
            ),
            Github => (
                "https://github.com/login/oauth/authorize",
                "https://github.com/login/oauth/access_token",
            ),
        }
    }

    pub(crate) fn scopes(&self) -> &'static [&'static str] {
        use ClientProvider::*;
        match self {
            Google => &["openid", "email", "profile"],
            Github => &["read:user", "user:email"],
        }
    }

    pub(crate) fn userinfo_url(&self) -> &'static str {
        use ClientProvider::*;
        match self {
            Google => "https://www.googleapis.com/oauth2/v2/userinfo",
            Github => "https://api.github.com/user",
        }
    }

    /// Maps a provider user-info document onto the fields of a new account.
    pub(crate) fn new_user(&self, body: &serde_json::Value) -> AppResult<NewUser> {
        use ClientProvider::*;
        let subject = match body.get("id") {
            Some(serde_json::Value::Number(id)) => id.to_string(),
            _ => body.get_str_field("id")?,
        };
        let text = |field: &str| body.get(field).and_then(|v| v.as_str()).map(str::to_owned);

        let (first_name, last_name) = match self {
            Google => (text("given_name"), text("family_name")),
            Github => match text("name") {
                Some(name) => match name.split_once(' ') {
                    Some((first, last)) => (Some(first.to_owned()), Some(last.to_owned())),
                    None => (Some(name), None),
                },
                None => (text("login"), None),
            },
        };

        Ok(NewUser {
            first_name,
            last_name,
            email: text("email"),
            external_id: Some(format!("{}:{subject}", self.id())),
        })
    }
}

impl fmt::Display for ClientProvider {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Clone)]
pub struct Clients {
    google_client: Option<HappyClient>,
    github_client: Option<HappyClient>,
}

impl Clients {
    pub fn from_config(config: &AppConfig) -> AppResult<Clients> {
        let build = |provider: ClientProvider, keys: &Option<OAuthKeys>| -> AppResult<Option<HappyClient>> {
            let Some(keys) = keys else {
                return Ok(None);
            };
            let (auth_url, token_url) = provider.endpoints();
            let redirect_url = format!("{}/lockin/{}", config.public_url, provider.path());

            Ok(Some(
                BasicClient::new(ClientId::new(keys.client_id.clone()))
                    .set_client_secret(ClientSecret::new(keys.client_secret.clone()))
                    .set_auth_uri(AuthUrl::new(auth_url.to_owned())?)
                    .set_token_uri(TokenUrl::new(token_url.to_owned())?)
                    .set_redirect_uri(RedirectUrl::new(redirect_url)?)
            ))
        };

        Ok(Clients {
            google_client: build(ClientProvider::Google, &config.google)?,
            github_client: build(ClientProvider::Github, &config.github)?,
        })
    }

    pub fn get_client(&self, provider: ClientProvider) -> AppResult<HappyClient> {
        use ClientProvider::*;
        match provider {
            Google => self.google_client.clone(),
            Github => self.github_client.clone(),
        }.ok_or_else(|| {
            tracing::warn!(%provider, "login attempted with unconfigured provider");
            ChatError::NotFound("login provider").into()
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn only_configured_providers_have_clients() {
        let config = AppConfig {
            github: Some(OAuthKeys { client_id: "id".into(), client_secret: "secret".into() }),
            ..Default::default()
        };
        let clients = Clients::from_config(&config).unwrap();

        assert!(clients.get_client(ClientProvider::Github).is_ok());
        assert!(clients.get_client(ClientProvider::Google).is_err());
    }

    #[test]
    fn github_profile_splits_display_name() {
        let body = json!({ "id": 42, "login": "octo", "name": "Mona Lisa", "email": null });
        let user = ClientProvider::Github.new_user(&body).unwrap();

        assert_eq!(user.external_id.as_deref(), Some("github.com:42"));
        assert_eq!(user.first_name.as_deref(), Some("Mona"));
        assert_eq!(user.last_name.as_deref(), Some("Lisa"));
        assert_eq!(user.email, None);
    }

    #[test]
    fn google_profile_uses_given_and_family_name() {
        let body = json!({
            "id": "1234",
            "given_name": "Ada",
            "family_name": "Lovelace",
            "email": "ada@example.com",
        });
        let user = ClientProvider::Google.new_user(&body).unwrap();

        assert_eq!(user.external_id.as_deref(), Some("google.com:1234"));
        assert_eq!(user.first_name.as_deref(), Some("Ada"));
        assert_eq!(user.email.as_deref(), Some("ada@example.com"));
    }
}
