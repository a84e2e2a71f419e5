//! HTTP 执行器 - 基础设施层
//!
//! 持有唯一的 HTTP 客户端和访问令牌，只暴露"发请求"的能力

use crate::config::Config;
use crate::error::{ApiError, AppError, AppResult};
use reqwest::header::{HeaderMap, LINK};
use reqwest::{Client, RequestBuilder};
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("accommodation-roster/", env!("CARGO_PKG_VERSION"));

/// 单次请求失败的原因
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("请求失败 ({url}): {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("HTTP {status} ({url}): {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("响应解析失败 ({url}): {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("分页响应不是数组 ({url})")]
    NotAList { url: String },
}

impl FetchError {
    /// 是否可能是暂时性故障（网络、限流、服务端错误）
    ///
    /// 用来区分"取不到数据"和"确实没有数据"。
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Transport { .. } => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            FetchError::Decode { .. } | FetchError::NotAList { .. } => false,
        }
    }
}

/// HTTP 执行器
///
/// 职责：
/// - 持有唯一的 reqwest Client 和 Bearer token
/// - 暴露 GET / 分页 GET / POST 能力
/// - 不认识课程、学生、测验
/// - 不吞掉错误，由上层决定如何降级
pub struct HttpExecutor {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpExecutor {
    /// 根据配置创建执行器
    pub fn new(config: &Config) -> AppResult<Self> {
        Self::build(
            &config.api_base_url,
            &config.access_token,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// 指定根地址创建（测试时指向 mock 服务）
    pub fn with_base_url(base_url: impl Into<String>, token: impl Into<String>) -> AppResult<Self> {
        Self::build(&base_url.into(), &token.into(), Duration::from_secs(30))
    }

    fn build(base_url: &str, token: &str, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::Api(ApiError::ClientBuildFailed { source: Box::new(e) }))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// 拼接完整 URL，已是绝对地址时原样返回
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    fn authorized_get(&self, url: &str) -> RequestBuilder {
        self.client.get(url).bearer_auth(&self.token)
    }

    /// GET 单个 JSON 资源
    pub async fn get_json(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<JsonValue, FetchError> {
        let url = self.url(path);
        debug!("GET {}", url);
        let (body, _) = send_json(self.authorized_get(&url).query(query), &url).await?;
        Ok(body)
    }

    /// GET 列表资源，沿着 `Link: rel="next"` 一直翻页
    ///
    /// 第一页失败返回错误；后续页失败时保留已取到的数据并记录警告。
    pub async fn get_paginated(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<JsonValue>, FetchError> {
        let first_url = self.url(path);
        debug!("GET {} (分页)", first_url);

        let request = self.authorized_get(&first_url).query(query);
        let (body, headers) = send_json(request, &first_url).await?;
        let mut results = into_items(body, &first_url)?;

        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(first_url);
        let mut next = next_link(&headers);

        while let Some(next_url) = next {
            if !visited.insert(next_url.clone()) {
                warn!("分页链接重复，停止翻页: {}", next_url);
                break;
            }

            // next 链接已带上全部查询参数
            let page = match send_json(self.authorized_get(&next_url), &next_url).await {
                Ok((body, headers)) => into_items(body, &next_url).map(|items| (items, headers)),
                Err(e) => Err(e),
            };

            match page {
                Ok((items, headers)) => {
                    results.extend(items);
                    next = next_link(&headers);
                }
                Err(e) => {
                    warn!("翻页失败，保留已获取的 {} 条: {}", results.len(), e);
                    break;
                }
            }
        }

        debug!("共获取 {} 条结果", results.len());
        Ok(results)
    }

    /// POST JSON，返回响应 JSON
    ///
    /// 只以状态码判断成败：2xx 时响应体为空或不是 JSON 都返回 Null。
    pub async fn post_json(&self, path: &str, body: &JsonValue) -> Result<JsonValue, FetchError> {
        let url = self.url(path);
        debug!("POST {}", url);
        let request = self.client.post(&url).bearer_auth(&self.token).json(body);
        let (text, _) = send(request, &url).await?;
        match decode_json(&text, &url) {
            Ok(body) => Ok(body),
            Err(e) => {
                debug!("POST 响应不是 JSON，按成功处理: {}", e);
                Ok(JsonValue::Null)
            }
        }
    }
}

/// 发送请求并解析 JSON
async fn send_json(
    request: RequestBuilder,
    url: &str,
) -> Result<(JsonValue, HeaderMap), FetchError> {
    let (text, headers) = send(request, url).await?;
    Ok((decode_json(&text, url)?, headers))
}

/// 发送请求，非 2xx 视为失败
async fn send(request: RequestBuilder, url: &str) -> Result<(String, HeaderMap), FetchError> {
    let response = request.send().await.map_err(|e| FetchError::Transport {
        url: url.to_string(),
        source: e,
    })?;

    let status = response.status();
    let headers = response.headers().clone();
    let text = response.text().await.map_err(|e| FetchError::Transport {
        url: url.to_string(),
        source: e,
    })?;

    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            body: text.chars().take(200).collect(),
        });
    }

    Ok((text, headers))
}

/// 空响应为 Null
fn decode_json(text: &str, url: &str) -> Result<JsonValue, FetchError> {
    let trimmed = text.trim_start_matches('\u{feff}').trim();
    if trimmed.is_empty() {
        return Ok(JsonValue::Null);
    }
    serde_json::from_str(trimmed).map_err(|e| FetchError::Decode {
        url: url.to_string(),
        source: e,
    })
}

fn into_items(body: JsonValue, url: &str) -> Result<Vec<JsonValue>, FetchError> {
    match body {
        JsonValue::Array(items) => Ok(items),
        JsonValue::Null => Ok(Vec::new()),
        _ => Err(FetchError::NotAList {
            url: url.to_string(),
        }),
    }
}

/// 从 Link 头中取出 rel="next" 的地址
pub fn next_link(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .find_map(|entry| {
            let mut parts = entry.split(';');
            let target = parts.next()?.trim();
            let is_next = parts.any(|p| {
                let p = p.trim().replace(' ', "");
                p == "rel=\"next\"" || p == "rel=next"
            });
            if is_next && target.starts_with('<') && target.ends_with('>') {
                Some(target[1..target.len() - 1].to_string())
            } else {
                None
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use reqwest::header::HeaderValue;
    use serde_json::json;

    fn link_headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(LINK, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_next_link_parsing() {
        let headers = link_headers(
            r#"<https://x/api/v1/courses?page=1>; rel="current", <https://x/api/v1/courses?page=2&per_page=100>; rel="next", <https://x/api/v1/courses?page=5>; rel="last""#,
        );
        assert_eq!(
            next_link(&headers).as_deref(),
            Some("https://x/api/v1/courses?page=2&per_page=100")
        );

        let last_page = link_headers(r#"<https://x/api/v1/courses?page=1>; rel="first""#);
        assert_eq!(next_link(&last_page), None);
        assert_eq!(next_link(&HeaderMap::new()), None);
    }

    #[test]
    fn test_transient_classification() {
        let status = |code| FetchError::Status {
            url: "u".into(),
            status: code,
            body: String::new(),
        };
        assert!(status(503).is_transient());
        assert!(status(429).is_transient());
        assert!(!status(404).is_transient());
        assert!(!FetchError::NotAList { url: "u".into() }.is_transient());
    }

    #[test]
    fn test_url_join() {
        let executor = HttpExecutor::with_base_url("https://lms.example.edu/", "t").unwrap();
        assert_eq!(
            executor.url("/api/v1/courses"),
            "https://lms.example.edu/api/v1/courses"
        );
        assert_eq!(executor.url("https://other/x"), "https://other/x");
    }

    #[tokio::test]
    async fn test_paginated_follows_next_links() {
        let server = MockServer::start_async().await;

        let page1 = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/v1/items")
                    .query_param("per_page", "2")
                    .header("authorization", "Bearer secret");
                then.status(200)
                    .header(
                        "link",
                        format!(
                            "<{}>; rel=\"next\"",
                            server.url("/api/v1/items/p2?page=2&per_page=2")
                        ),
                    )
                    .json_body(json!([{"id": 1}, {"id": 2}]));
            })
            .await;

        let page2 = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/v1/items/p2")
                    .query_param("page", "2")
                    .header("authorization", "Bearer secret");
                then.status(200).json_body(json!([{"id": 3}]));
            })
            .await;

        let executor = HttpExecutor::with_base_url(server.base_url(), "secret").unwrap();
        let items = executor
            .get_paginated("/api/v1/items", &[("per_page", "2".to_string())])
            .await
            .unwrap();

        page1.assert_async().await;
        page2.assert_async().await;
        let ids: Vec<i64> = items.iter().map(|v| v["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_paginated_first_page_failure_is_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/items");
                then.status(401).body("unauthorized");
            })
            .await;

        let executor = HttpExecutor::with_base_url(server.base_url(), "bad").unwrap();
        let err = executor.get_paginated("/api/v1/items", &[]).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 401, .. }));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_paginated_later_failure_keeps_partial() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/items");
                then.status(200)
                    .header(
                        "link",
                        format!("<{}>; rel=\"next\"", server.url("/api/v1/items/p2")),
                    )
                    .json_body(json!([{"id": 1}]));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/items/p2");
                then.status(500);
            })
            .await;

        let executor = HttpExecutor::with_base_url(server.base_url(), "t").unwrap();
        let items = executor.get_paginated("/api/v1/items", &[]).await.unwrap();
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn test_paginated_stops_on_repeated_link() {
        let server = MockServer::start_async().await;
        let looping = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/items");
                then.status(200)
                    .header("link", format!("<{}>; rel=\"next\"", server.url("/api/v1/items")))
                    .json_body(json!([{"id": 1}]));
            })
            .await;

        let executor = HttpExecutor::with_base_url(server.base_url(), "t").unwrap();
        let items = executor.get_paginated("/api/v1/items", &[]).await.unwrap();
        assert_eq!(items.len(), 1);
        looping.assert_calls_async(1).await;
    }

    #[tokio::test]
    async fn test_post_json_empty_body_is_null() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/v1/things")
                    .json_body(json!({"a": 1}));
                then.status(200);
            })
            .await;

        let executor = HttpExecutor::with_base_url(server.base_url(), "t").unwrap();
        let body = executor
            .post_json("/api/v1/things", &json!({"a": 1}))
            .await
            .unwrap();
        mock.assert_async().await;
        assert!(body.is_null());
    }

    #[tokio::test]
    async fn test_post_json_plain_text_success_is_null() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v1/things");
                then.status(200).body("OK");
            })
            .await;

        let executor = HttpExecutor::with_base_url(server.base_url(), "t").unwrap();
        let body = executor
            .post_json("/api/v1/things", &json!({"a": 1}))
            .await
            .unwrap();
        assert!(body.is_null());

        // GET 仍然要求 JSON
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/plain");
                then.status(200).body("OK");
            })
            .await;
        let err = executor.get_json("/api/v1/plain", &[]).await.unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }));
    }
}
