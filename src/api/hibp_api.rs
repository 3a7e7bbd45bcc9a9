use crate::error::MazeError;
use crate::types::breach::HibpBreach;
use backon::{ExponentialBuilder, Retryable};
use reqwest::StatusCode;
use tracing::warn;
use url::Url;

pub struct HibpApi;

impl HibpApi {
    /// `GET {base}/breachedaccount/{account}?truncateResponse=false`.
    ///
    /// HIBP answers 404 for an account with no breaches, which maps to an
    /// empty list here.
    pub async fn breached_account(
        client: &reqwest::Client,
        base: &Url,
        api_key: &str,
        account: &str,
        retry_policy: ExponentialBuilder,
    ) -> Result<Vec<HibpBreach>, MazeError> {
        let url = breached_account_url(base, account)?;

        (|| async {
            let resp = client
                .get(url.clone())
                .header("hibp-api-key", api_key)
                .send()
                .await?;
            let status = resp.status();
            if status == StatusCode::NOT_FOUND {
                return Ok(Vec::new());
            }
            if !status.is_success() {
                return Err(MazeError::UpstreamStatus(status));
            }
            Ok(resp.json::<Vec<HibpBreach>>().await?)
        })
        .retry(retry_policy)
        .when(MazeError::is_retryable)
        .notify(|err, dur| {
            warn!(error = %err, retry_in = ?dur, "HIBP request failed, retrying");
        })
        .await
    }
}

fn breached_account_url(base: &Url, account: &str) -> Result<Url, MazeError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| MazeError::UrlParse(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
        .pop_if_empty()
        .push("breachedaccount")
        .push(account);
    url.query_pairs_mut()
        .append_pair("truncateResponse", "false");
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_is_a_single_escaped_segment() {
        let base = Url::parse("https://haveibeenpwned.com/api/v3").expect("valid url");
        let url = breached_account_url(&base, "a+b@example.com").expect("url");
        assert_eq!(
            url.as_str(),
            "https://haveibeenpwned.com/api/v3/breachedaccount/a+b@example.com?truncateResponse=false"
        );

        let trailing = Url::parse("http://127.0.0.1:9/api/").expect("valid url");
        let url = breached_account_url(&trailing, "x/y@z.io").expect("url");
        assert_eq!(url.path(), "/api/breachedaccount/x%2Fy@z.io");
    }
}
