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

use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// 抓取错误类型
#[derive(Error, Debug)]
pub enum FetchError {
    /// 请求失败
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    /// 非成功状态码
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
    /// 超时
    #[error("Timeout")]
    Timeout,
    /// 连接失败
    #[error("Connection error: {0}")]
    Connection(String),
    /// 响应无法解析
    #[error("Parse error: {0}")]
    Parse(String),
}

impl FetchError {
    /// 判断错误是否属于传输层失败（连接、超时、服务端错误、限流）
    ///
    /// 传输层失败意味着整个数据源不可用，批次会整体失败；
    /// 解码错误与 4xx 只影响单个条目。
    pub fn is_transport_failure(&self) -> bool {
        match self {
            FetchError::RequestFailed(e) => match e.status() {
                Some(s) => s.is_server_error() || s.as_u16() == 429,
                // 没有状态码：连接被拒绝、重置或提前关闭
                None => e.is_timeout() || e.is_connect() || e.is_request(),
            },
            FetchError::Status { status, .. } => *status >= 500 || *status == 429,
            FetchError::Timeout | FetchError::Connection(_) => true,
            FetchError::Parse(_) => false,
        }
    }

    /// 判断错误是否可重试
    pub fn is_retryable(&self) -> bool {
        self.is_transport_failure()
    }
}

/// HTTP 请求配置
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// 单次请求超时
    pub timeout: Duration,
    /// User-Agent
    pub user_agent: String,
    /// 失败后的重试次数
    pub retries: u32,
    /// 首次重试前的等待时间，之后指数增长
    pub retry_backoff: Duration,
    /// 基础请求头
    pub headers: HashMap<String, String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: "Mozilla/5.0 (compatible; dime-scraper/1.0)".to_string(),
            retries: 3,
            retry_backoff: Duration::from_millis(500),
            headers: HashMap::from([("Accept".to_string(), "application/json".to_string())]),
        }
    }
}
