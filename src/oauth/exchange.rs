//! Signed token-endpoint calls shared by the first and third leg.

use super::FlowError;
use crate::oauth1::OAuthParams;
use crate::upstream::{TokenPair, UpstreamClient};

/// Sign `params` for `POST url` and exchange them for a token pair.
///
/// # Arguments
/// * `upstream` - Transport to the authorization server
/// * `url` - Request-token or access-token endpoint
/// * `params` - Protocol parameters, without `oauth_signature`
/// * `secret` - Full signing key (`consumer_secret&token_secret`)
pub(crate) async fn request_token_pair(
    upstream: &UpstreamClient,
    url: &str,
    params: &OAuthParams,
    secret: &str,
) -> Result<TokenPair, FlowError> {
    let authorization = params.authorization("POST", url, secret)?;
    let pair = upstream.post_signed(url, &authorization).await?;
    Ok(pair)
}
