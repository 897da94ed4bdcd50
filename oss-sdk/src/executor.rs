//! 一次请求的完整过程：补齐公共请求头 -> 签名 -> 发送 -> 按状态码分类响应
//!
//! 所有api最终都通过[Executor]发送请求，api本身只负责把参数转为header/query和解析响应。

use crate::config::ClientConfig;
use crate::error::{ClientError, Error};
use crate::sign_v4::{
    HTTPVerb, SignV4Param, UNSIGNED_PAYLOAD, canonical_query_string, canonical_request,
    headers_to_sign, request_uri, sign_v4, string_to_sign,
};
use crate::utils::{validate_bucket_name, validate_object_name};
use async_trait::async_trait;
use bon::Builder;
use bytes::Bytes;
use oss_sdk_common::helper::{gmt_format, into_header_map, utc_date_time_str};
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tracing::debug;
use url::Url;

const USER_AGENT: &str = concat!("oss-sdk-rust/", env!("CARGO_PKG_VERSION"));

/// 发送http请求的实现，默认使用`reqwest::Client`
///
/// 只负责发送，不做签名和重试
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: reqwest::Request)
    -> Result<reqwest::Response, reqwest::Error>;
}

#[async_trait]
impl HttpTransport for reqwest::Client {
    async fn execute(
        &self,
        request: reqwest::Request,
    ) -> Result<reqwest::Response, reqwest::Error> {
        reqwest::Client::execute(self, request).await
    }
}

#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// 成功时必须要有响应体（如下载object），没有则返回[Error::NullResponseBody]
    pub expect_body: bool,
    /// 覆盖[ClientConfig]中的超时设置
    pub timeout: Option<Duration>,
}

/// 一次请求的参数，每次调用单独构建
#[derive(Builder)]
pub struct RequestConfig {
    #[builder(field)]
    pub(crate) headers: HashMap<String, String>,
    #[builder(field)]
    pub(crate) query: BTreeMap<String, Option<String>>,
    pub(crate) method: HTTPVerb,
    #[builder(into)]
    pub(crate) bucket_name: Option<String>,
    #[builder(into)]
    pub(crate) object_key: Option<String>,
    pub(crate) body: Option<reqwest::Body>,
    #[builder(default)]
    pub(crate) options: RequestOptions,
}

impl<S: request_config_builder::State> RequestConfigBuilder<S> {
    /// key会被转为小写，同名header后添加的覆盖先添加的
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into().to_lowercase(), value.into());
        self
    }

    pub fn headers(mut self, headers: HashMap<String, String>) -> Self {
        for (k, v) in headers {
            self.headers.insert(k.to_lowercase(), v);
        }
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), Some(value.into()));
        self
    }

    /// 只有key的参数，如`?acl`
    pub fn query_key(mut self, key: impl Into<String>) -> Self {
        self.query.insert(key.into(), None);
        self
    }

    pub fn queries(mut self, query: BTreeMap<String, Option<String>>) -> Self {
        self.query.extend(query);
        self
    }
}

/// 响应头的key均为小写
#[derive(Debug, Clone)]
pub struct ResponseResult {
    status: u16,
    headers: BTreeMap<String, String>,
    content: Option<Bytes>,
}

impl ResponseResult {
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn content(&self) -> Option<&Bytes> {
        self.content.as_ref()
    }

    pub fn into_content(self) -> Option<Bytes> {
        self.content
    }

    /// 响应体按utf-8解析，没有响应体时为空字符串
    pub fn text(&self) -> Result<&str, Error> {
        match &self.content {
            Some(bytes) => std::str::from_utf8(bytes)
                .map_err(|e| Error::Common(format!("response body is not utf-8: {}", e))),
            None => Ok(""),
        }
    }
}

#[derive(Clone)]
pub(crate) struct Executor {
    config: Arc<ClientConfig>,
    transport: Arc<dyn HttpTransport>,
}

impl Executor {
    pub(crate) fn new(config: Arc<ClientConfig>, transport: Arc<dyn HttpTransport>) -> Self {
        Self { config, transport }
    }

    pub(crate) fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// 补齐公共请求头并签名，得到可以直接发送的请求
    pub(crate) fn build_request(
        &self,
        req: RequestConfig,
        now: &OffsetDateTime,
    ) -> Result<reqwest::Request, Error> {
        let config = &*self.config;
        let RequestConfig {
            headers,
            query,
            method,
            bucket_name,
            object_key,
            body,
            options,
        } = req;

        // Url::parse会折叠`.`和`..`，签名和实际请求的路径就对不上了
        if let Some(bucket) = bucket_name.as_deref() {
            validate_bucket_name(bucket)?;
        }
        if let Some(key) = object_key.as_deref() {
            validate_object_name(key)?;
        }

        let domain_name = config.domain_name(bucket_name.as_deref());

        let mut header_map: HashMap<String, String> = HashMap::with_capacity(headers.len() + 8);
        header_map.insert("date".to_owned(), gmt_format(now)?);
        header_map.insert("host".to_owned(), domain_name.clone());
        header_map.insert("user-agent".to_owned(), USER_AGENT.to_owned());
        header_map.insert(
            "x-oss-content-sha256".to_owned(),
            UNSIGNED_PAYLOAD.to_owned(),
        );
        header_map.insert("x-oss-date".to_owned(), utc_date_time_str(now)?);
        if let Some(token) = config.security_token() {
            header_map.insert("x-oss-security-token".to_owned(), token.to_owned());
        }
        // 调用者传入的header优先
        for (k, v) in headers {
            header_map.insert(k.to_lowercase(), v);
        }
        if method == HTTPVerb::Put && body.is_none() {
            header_map.insert("content-length".to_owned(), "0".to_owned());
        }

        let signed_headers =
            headers_to_sign(header_map.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        let param = SignV4Param {
            signing_region: config.region(),
            http_verb: method,
            bucket: bucket_name.as_deref(),
            object_key: object_key.as_deref(),
            query: &query,
            signed_headers: &signed_headers,
            date_time: now,
        };
        if config.debug() {
            let sign_str = string_to_sign(&param)?;
            debug!(
                canonical_request = %canonical_request(&param),
                string_to_sign = %sign_str,
                "signing oss request"
            );
        }
        let authorization = sign_v4(config.access_key_id(), config.access_key_secret(), &param)?;
        header_map.insert("authorization".to_owned(), authorization);

        // query使用和签名相同的排序和编码
        let mut raw_url = format!(
            "{}://{}{}",
            config.scheme(),
            domain_name,
            request_uri(object_key.as_deref())
        );
        let query_string = canonical_query_string(&query);
        if !query_string.is_empty() {
            raw_url.push('?');
            raw_url.push_str(&query_string);
        }
        let url = Url::parse(&raw_url)
            .map_err(|e| Error::Common(format!("invalid request url `{}`: {}", raw_url, e)))?;

        let mut request = reqwest::Request::new(method.into(), url);
        *request.headers_mut() =
            into_header_map(header_map.iter().map(|(k, v)| (k.as_str(), v.as_str())))?;
        *request.body_mut() = body;
        *request.timeout_mut() = options.timeout.or(config.timeout());

        Ok(request)
    }

    async fn dispatch(
        &self,
        request: reqwest::Request,
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response, Error> {
        let fut = self.transport.execute(request);
        let resp = match timeout {
            Some(t) => tokio::time::timeout(t, fut)
                .await
                .map_err(|_| Error::Timeout)??,
            None => fut.await?,
        };
        Ok(resp)
    }

    /// 返回原始响应，响应体没有被读取，可以流式读取
    ///
    /// 状态码的检查和[Executor::request]相同
    pub(crate) async fn request_raw(&self, req: RequestConfig) -> Result<reqwest::Response, Error> {
        let expect_body = req.options.expect_body;
        let timeout = req.options.timeout.or(self.config.timeout());
        let request = self.build_request(req, &OffsetDateTime::now_utc())?;
        debug!(method = %request.method(), url = %request.url(), "sending oss request");

        let resp = self.dispatch(request, timeout).await?;
        debug!(
            status = resp.status().as_u16(),
            request_id = resp
                .headers()
                .get("x-oss-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default(),
            "received oss response"
        );

        check_response(resp, expect_body).await
    }

    pub(crate) async fn request(&self, req: RequestConfig) -> Result<ResponseResult, Error> {
        let resp = self.request_raw(req).await?;
        let status = resp.status();
        let headers = lower_case_headers(resp.headers());
        let content = if is_null_body_status(status) {
            None
        } else {
            Some(resp.bytes().await?)
        };

        Ok(ResponseResult {
            status: status.as_u16(),
            headers,
            content,
        })
    }
}

// 这些状态码的响应没有响应体
fn is_null_body_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::NO_CONTENT | StatusCode::RESET_CONTENT | StatusCode::NOT_MODIFIED
    )
}

pub(crate) async fn check_response(
    resp: reqwest::Response,
    expect_body: bool,
) -> Result<reqwest::Response, Error> {
    let status = resp.status();
    if status.is_server_error() {
        return Err(Error::Server {
            status: status.as_u16(),
        });
    }
    if status.is_client_error() {
        // 读取失败和没有响应体一样处理
        let body = resp.text().await.unwrap_or_default();
        return Err(parse_error_body(status.as_u16(), &body));
    }
    if expect_body && is_null_body_status(status) {
        return Err(Error::NullResponseBody);
    }
    Ok(resp)
}

pub(crate) fn parse_error_body(status: u16, body: &str) -> Error {
    match ClientError::from_xml(status, body) {
        Some(e) => Error::Client(e),
        None => Error::Unknown { status },
    }
}

pub(crate) fn lower_case_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        // 自定义元数据可能是utf-8编码的非ascii字符
        let value = String::from_utf8_lossy(value.as_bytes());
        map.entry(name.as_str().to_lowercase())
            .and_modify(|v| {
                v.push_str(", ");
                v.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }
    map
}
