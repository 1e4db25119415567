//! OAuth 1.0a three-legged authorization flow.
//!
//! 1. Browser calls GET /api/request_token → signed POST to the request-token
//!    endpoint, secret kept in the temporary credential store
//! 2. Browser is sent to the upstream authorize page with the request token
//! 3. Upstream redirects to GET /api/callback with `oauth_token` and `oauth_verifier`
//! 4. Request token is taken (single-use), exchanged for an access credential,
//!    and the credential is bound to a fresh session
//! 5. Browser lands on the app with a one-time handoff code, never the token

mod error;
mod exchange;
mod provider;

pub use error::FlowError;
pub use provider::OAuthProvider;

use crate::credentials::{AccessCredential, CredentialStore};
use crate::oauth1::{signing_key, OAuthParams};
use crate::upstream::UpstreamClient;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Result of the first leg: where to send the user next.
#[derive(Debug, Clone, PartialEq)]
pub struct TemporaryToken {
    pub oauth_token: String,
    pub authorize_url: String,
}

/// Result of the third leg.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizedSession {
    pub session_id: String,
    /// One-time code the browser trades for the session cookie
    pub handoff_code: String,
}

/// Orchestrates the three OAuth legs against one upstream provider.
#[derive(Clone)]
pub struct OAuthFlowController {
    provider: Arc<OAuthProvider>,
    store: CredentialStore,
    upstream: UpstreamClient,
}

impl OAuthFlowController {
    pub fn new(provider: OAuthProvider, store: CredentialStore, upstream: UpstreamClient) -> Self {
        Self {
            provider: Arc::new(provider),
            store,
            upstream,
        }
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn upstream(&self) -> &UpstreamClient {
        &self.upstream
    }

    pub fn provider(&self) -> &OAuthProvider {
        &self.provider
    }

    /// Leg 1: obtain a request token and remember its secret.
    pub async fn acquire_temporary_credential(&self) -> Result<TemporaryToken, FlowError> {
        let params = OAuthParams::fresh(&self.provider.consumer_key)
            .with("oauth_callback", &self.provider.callback_url);
        let secret = signing_key(&self.provider.consumer_secret, "");

        let pair = exchange::request_token_pair(
            &self.upstream,
            &self.provider.request_token_url,
            &params,
            &secret,
        )
        .await
        .map_err(|e| {
            error!(error = %e, "Request token acquisition failed");
            e
        })?;

        if pair.callback_confirmed != Some(true) {
            warn!(
                callback_confirmed = ?pair.callback_confirmed,
                "Upstream did not confirm oauth_callback"
            );
        }

        self.store.temporary.put(&pair.token, &pair.secret);
        debug!(
            pending_request_tokens = self.store.temporary.count(),
            "Request token stored"
        );

        Ok(TemporaryToken {
            authorize_url: self.provider.build_authorize_url(&pair.token),
            oauth_token: pair.token,
        })
    }

    /// Leg 3: trade an authorized request token and its verifier for an access credential.
    ///
    /// The request token is consumed before the upstream call, so a replayed
    /// callback fails with [`FlowError::UnknownToken`] without any outbound
    /// request. The session is only created once the exchange succeeded.
    pub async fn complete_authorization(
        &self,
        oauth_token: Option<&str>,
        oauth_verifier: Option<&str>,
    ) -> Result<AuthorizedSession, FlowError> {
        let oauth_token = oauth_token
            .filter(|t| !t.is_empty())
            .ok_or(FlowError::MissingParameter("oauth_token"))?;
        let oauth_verifier = oauth_verifier
            .filter(|v| !v.is_empty())
            .ok_or(FlowError::MissingParameter("oauth_verifier"))?;

        let temporary = self.store.temporary.take(oauth_token).ok_or_else(|| {
            warn!("Callback with unknown, expired or consumed request token");
            FlowError::UnknownToken
        })?;

        let params = OAuthParams::fresh(&self.provider.consumer_key)
            .with("oauth_token", oauth_token)
            .with("oauth_verifier", oauth_verifier);
        let secret = signing_key(&self.provider.consumer_secret, &temporary.secret);

        let pair = exchange::request_token_pair(
            &self.upstream,
            &self.provider.access_token_url,
            &params,
            &secret,
        )
        .await
        .map_err(|e| {
            error!(error = %e, "Access token exchange failed");
            e
        })?;

        let session_id = self
            .store
            .sessions
            .create(AccessCredential::new(&pair.token, &pair.secret));
        let handoff_code = self.store.sessions.issue_handoff(&session_id);

        info!(
            sessions = self.store.sessions.count(),
            "OAuth flow completed successfully"
        );

        Ok(AuthorizedSession {
            session_id,
            handoff_code,
        })
    }

    /// Access credential bound to a session, for the resource proxy.
    pub fn current_access_token(&self, session_id: &str) -> Option<AccessCredential> {
        self.store.current_access_token(session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrelloConfig;
    use crate::oauth1::{percent_decode, sign};
    use mockito::{Matcher, Server};
    use std::time::Duration;

    fn controller(server_url: &str) -> OAuthFlowController {
        let mut config = TrelloConfig::default();
        config.consumer_key = "consumer-key".to_string();
        config.consumer_secret = "consumer-secret".to_string();
        config.callback_url = "http://localhost:3000/api/callback".to_string();
        config.request_token_url = format!("{}/1/OAuthGetRequestToken", server_url);
        config.access_token_url = format!("{}/1/OAuthGetAccessToken", server_url);

        OAuthFlowController::new(
            OAuthProvider::from(&config),
            CredentialStore::default(),
            UpstreamClient::new(Duration::from_secs(5)).unwrap(),
        )
    }

    /// Parse `OAuth k="v", ...` back into decoded pairs.
    fn parse_header(header: &str) -> Vec<(String, String)> {
        header
            .trim_start_matches("OAuth ")
            .split(", ")
            .map(|part| {
                let (k, v) = part.split_once('=').unwrap();
                (
                    percent_decode(k).unwrap(),
                    percent_decode(v.trim_matches('"')).unwrap(),
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_acquire_stores_secret() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/1/OAuthGetRequestToken")
            .match_header(
                "authorization",
                Matcher::AllOf(vec![
                    Matcher::Regex(r#"^OAuth "#.to_string()),
                    Matcher::Regex(
                        r#"oauth_callback="http%3A%2F%2Flocalhost%3A3000%2Fapi%2Fcallback""#
                            .to_string(),
                    ),
                    Matcher::Regex(r#"oauth_consumer_key="consumer-key""#.to_string()),
                    Matcher::Regex(r#"oauth_signature_method="HMAC-SHA1""#.to_string()),
                    Matcher::Regex(r#"oauth_version="1.0""#.to_string()),
                    Matcher::Regex(r#"oauth_signature=""#.to_string()),
                ]),
            )
            .with_status(200)
            .with_body("oauth_token=T1&oauth_token_secret=S1&oauth_callback_confirmed=true")
            .create_async()
            .await;

        let controller = controller(&server.url());
        let token = controller.acquire_temporary_credential().await.unwrap();

        assert_eq!(token.oauth_token, "T1");
        assert!(token.authorize_url.contains("oauth_token=T1"));
        assert_eq!(controller.store().temporary.get("T1"), Some("S1".to_string()));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_acquire_upstream_rejection() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/1/OAuthGetRequestToken")
            .with_status(401)
            .with_body("invalid signature")
            .create_async()
            .await;

        let controller = controller(&server.url());
        let result = controller.acquire_temporary_credential().await;

        assert!(matches!(result, Err(FlowError::UpstreamAuth(_))));
        assert_eq!(controller.store().temporary.count(), 0);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_acquire_missing_secret_in_response() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/1/OAuthGetRequestToken")
            .with_status(200)
            .with_body("oauth_token=T1")
            .create_async()
            .await;

        let controller = controller(&server.url());
        let result = controller.acquire_temporary_credential().await;

        assert!(matches!(result, Err(FlowError::UpstreamAuth(_))));
        assert_eq!(controller.store().temporary.count(), 0);
    }

    #[tokio::test]
    async fn test_complete_requires_parameters() {
        let controller = controller("http://127.0.0.1:9");

        assert_eq!(
            controller.complete_authorization(None, Some("V1")).await,
            Err(FlowError::MissingParameter("oauth_token"))
        );
        assert_eq!(
            controller.complete_authorization(Some("T1"), None).await,
            Err(FlowError::MissingParameter("oauth_verifier"))
        );
        assert_eq!(
            controller.complete_authorization(Some(""), Some("V1")).await,
            Err(FlowError::MissingParameter("oauth_token"))
        );
    }

    #[tokio::test]
    async fn test_complete_unknown_token_makes_no_outbound_call() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let controller = controller(&server.url());
        let result = controller
            .complete_authorization(Some("never-issued"), Some("V1"))
            .await;

        assert_eq!(result, Err(FlowError::UnknownToken));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_complete_is_single_use() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/1/OAuthGetAccessToken")
            .with_status(200)
            .with_body("oauth_token=ACCESS1&oauth_token_secret=ASECRET1")
            .expect(1)
            .create_async()
            .await;

        let controller = controller(&server.url());
        controller.store().temporary.put("T1", "S1");

        assert!(controller
            .complete_authorization(Some("T1"), Some("V1"))
            .await
            .is_ok());
        assert_eq!(
            controller
                .complete_authorization(Some("T1"), Some("V1"))
                .await,
            Err(FlowError::UnknownToken)
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_complete_failure_creates_no_session() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/1/OAuthGetAccessToken")
            .with_status(401)
            .with_body("verifier rejected")
            .create_async()
            .await;

        let controller = controller(&server.url());
        controller.store().temporary.put("T1", "S1");

        let result = controller.complete_authorization(Some("T1"), Some("V1")).await;

        assert!(matches!(
            result,
            Err(FlowError::UpstreamAuth(crate::upstream::UpstreamError::Status { status: 401, .. }))
        ));
        assert_eq!(controller.store().sessions.count(), 0);
    }

    #[tokio::test]
    async fn test_end_to_end_flow() {
        let mut server = Server::new_async().await;
        let controller = controller(&server.url());
        let access_url = controller.provider().access_token_url.clone();

        let request_mock = server
            .mock("POST", "/1/OAuthGetRequestToken")
            .with_status(200)
            .with_body("oauth_token=T1&oauth_token_secret=S1&oauth_callback_confirmed=true")
            .create_async()
            .await;

        let access_mock = server
            .mock("POST", "/1/OAuthGetAccessToken")
            .match_request(move |request| {
                let header = match request.header("authorization").first() {
                    Some(value) => value.to_str().unwrap_or_default().to_string(),
                    None => return false,
                };
                let params = parse_header(&header);
                let get = |key: &str| {
                    params
                        .iter()
                        .find(|(k, _)| k == key)
                        .map(|(_, v)| v.clone())
                };

                let Some(signature) = get("oauth_signature") else {
                    return false;
                };
                let signed: Vec<(&str, Option<&str>)> = params
                    .iter()
                    .filter(|(k, _)| k != "oauth_signature")
                    .map(|(k, v)| (k.as_str(), Some(v.as_str())))
                    .collect();
                let expected = sign("POST", &access_url, signed, "consumer-secret&S1").unwrap();

                get("oauth_token").as_deref() == Some("T1")
                    && get("oauth_verifier").as_deref() == Some("V1")
                    && get("oauth_callback").is_none()
                    && signature == expected
            })
            .with_status(200)
            .with_body("oauth_token=ACCESS1&oauth_token_secret=ASECRET1")
            .create_async()
            .await;

        let token = controller.acquire_temporary_credential().await.unwrap();
        assert_eq!(token.oauth_token, "T1");

        let session = controller
            .complete_authorization(Some("T1"), Some("V1"))
            .await
            .unwrap();

        let credential = controller.current_access_token(&session.session_id).unwrap();
        assert_eq!(credential.token, "ACCESS1");
        assert_eq!(credential.secret, "ASECRET1");
        assert_eq!(
            controller.store().sessions.redeem_handoff(&session.handoff_code),
            Some(session.session_id.clone())
        );

        request_mock.assert_async().await;
        access_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_concurrent_flows_do_not_share_credentials() {
        let mut server = Server::new_async().await;
        let controller = controller(&server.url());

        let _alice = server
            .mock("POST", "/1/OAuthGetAccessToken")
            .match_header("authorization", Matcher::Regex(r#"oauth_token="TA""#.to_string()))
            .with_status(200)
            .with_body("oauth_token=ACCESS_A&oauth_token_secret=SA2")
            .create_async()
            .await;
        let _bob = server
            .mock("POST", "/1/OAuthGetAccessToken")
            .match_header("authorization", Matcher::Regex(r#"oauth_token="TB""#.to_string()))
            .with_status(200)
            .with_body("oauth_token=ACCESS_B&oauth_token_secret=SB2")
            .create_async()
            .await;

        controller.store().temporary.put("TA", "SA");
        controller.store().temporary.put("TB", "SB");

        let (alice, bob) = tokio::join!(
            controller.complete_authorization(Some("TA"), Some("VA")),
            controller.complete_authorization(Some("TB"), Some("VB")),
        );
        let (alice, bob) = (alice.unwrap(), bob.unwrap());

        assert_eq!(
            controller.current_access_token(&alice.session_id).unwrap().token,
            "ACCESS_A"
        );
        assert_eq!(
            controller.current_access_token(&bob.session_id).unwrap().token,
            "ACCESS_B"
        );
    }
}
