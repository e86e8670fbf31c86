// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::engines::traits::{FetchError, HttpConfig};
use crate::utils::retry_policy::RetryPolicy;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};

/// HTTP 抓取引擎
///
/// 基于 reqwest 的 JSON 抓取，带有限次数的指数退避重试
pub struct HttpEngine {
    client: reqwest::Client,
    retry_policy: RetryPolicy,
}

impl HttpEngine {
    /// 根据配置创建引擎
    ///
    /// # 参数
    ///
    /// * `config` - HTTP 配置
    ///
    /// # 返回值
    ///
    /// * `Ok(HttpEngine)` - 引擎实例
    /// * `Err(FetchError)` - 客户端构建失败
    pub fn new(config: &HttpConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        for (k, v) in &config.headers {
            if let (Ok(k), Ok(v)) = (
                HeaderName::from_bytes(k.as_bytes()),
                HeaderValue::from_str(v),
            ) {
                headers.insert(k, v);
            }
        }

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            retry_policy: RetryPolicy::new(config.retries, config.retry_backoff),
        })
    }

    /// 获取 JSON 文档
    ///
    /// # 返回值
    ///
    /// * `Ok(Some(Value))` - 文档内容
    /// * `Ok(None)` - 远端返回 404
    /// * `Err(FetchError)` - 重试耗尽后仍然失败
    pub async fn get_json(&self, url: &str) -> Result<Option<Value>, FetchError> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(url).await {
                Err(e) if e.is_retryable() && self.retry_policy.should_retry(attempt) => {
                    attempt += 1;
                    let backoff = self.retry_policy.calculate_backoff(attempt);
                    warn!(
                        "Fetch of {} failed ({}), retry {}/{} in {:?}",
                        url, e, attempt, self.retry_policy.max_retries, backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
                other => return other,
            }
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<Option<Value>, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        debug!("GET {} -> {}", url, status);

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| FetchError::Parse(format!("{} at {}", e, url)))
    }
}
