//! 生成预签名URL（Presigned URL）
//!
//! [在URL中包含签名](https://help.aliyun.com/zh/oss/developer-reference/add-signatures-to-urls)

use crate::sign_v4::{
    HTTPVerb, SIGNATURE_VERSION, SignV4Param, additional_headers, canonical_query_string,
    generate_v4_signature, headers_to_sign, request_uri, scope,
};
use crate::utils::{to_query_map, validate_bucket_name, validate_object_name};
use crate::{Client, Error};
use bon::Builder;
use oss_sdk_common::helper::utc_date_time_str;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use time::OffsetDateTime;
use tracing::debug;

/// `x-oss-expires`的最大值，7天
pub const MAX_EXPIRES_SECS: u64 = 604_800;

/// 签名中不包含`host`，生成的url可以替换为CDN或自定义域名
///
/// 使用STS临时凭证时`x-oss-security-token`会作为query参数添加到url中
#[derive(Builder)]
pub struct PresignUrl<'a> {
    #[builder(start_fn)]
    pub(crate) client: &'a Client,
    // 调用者额外添加的query参数
    #[builder(field)]
    pub(crate) queries: BTreeMap<String, Option<String>>,
    // 使用url时必须携带的请求头，会参与签名
    #[builder(field)]
    pub(crate) headers: HashMap<String, String>,

    #[builder(default = HTTPVerb::Get)]
    pub(crate) method: HTTPVerb,
    pub(crate) bucket: &'a str,
    pub(crate) object_key: &'a str,
    /// 有效期，单位秒。长期密钥最大为604800（7天），STS临时凭证最大为43200（12小时）
    pub(crate) expires: u64,
    /// 图片处理，如：`image/resize,w_100`
    pub(crate) process: Option<&'a str>,

    // 覆盖响应头
    pub(crate) response_content_type: Option<&'a str>,
    pub(crate) response_content_language: Option<&'a str>,
    pub(crate) response_expires: Option<&'a str>,
    pub(crate) response_cache_control: Option<&'a str>,
    pub(crate) response_content_disposition: Option<&'a str>,
    pub(crate) response_content_encoding: Option<&'a str>,
}

impl<S: presign_url_builder::State> PresignUrlBuilder<'_, S> {
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.queries.insert(key.into(), Some(value.into()));
        self
    }

    pub fn query_key(mut self, key: impl Into<String>) -> Self {
        self.queries.insert(key.into(), None);
        self
    }

    /// 如`content-type`，使用url发送请求时必须带上相同的值
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into().to_lowercase(), value.into());
        self
    }
}

#[serde_with::skip_serializing_none]
#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct ResponseOverrides<'a> {
    response_content_type: Option<&'a str>,
    response_content_language: Option<&'a str>,
    response_expires: Option<&'a str>,
    response_cache_control: Option<&'a str>,
    response_content_disposition: Option<&'a str>,
    response_content_encoding: Option<&'a str>,
    x_oss_process: Option<&'a str>,
}

impl PresignUrl<'_> {
    pub fn generate(&self) -> Result<String, Error> {
        self.generate_at(&OffsetDateTime::now_utc())
    }

    pub(crate) fn generate_at(&self, now: &OffsetDateTime) -> Result<String, Error> {
        validate_bucket_name(self.bucket)?;
        validate_object_name(self.object_key)?;
        if !(1..=MAX_EXPIRES_SECS).contains(&self.expires) {
            return Err(Error::Validation(format!(
                "expires must be between 1 and {} seconds",
                MAX_EXPIRES_SECS
            )));
        }

        let config = self.client.config();
        // host不参与签名
        let signed_headers: BTreeMap<String, String> = headers_to_sign(
            self.headers
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str())),
        )
        .into_iter()
        .filter(|(k, _)| k != "host")
        .collect();

        let mut query = self.queries.clone();
        query.extend(to_query_map(&ResponseOverrides {
            response_content_type: self.response_content_type,
            response_content_language: self.response_content_language,
            response_expires: self.response_expires,
            response_cache_control: self.response_cache_control,
            response_content_disposition: self.response_content_disposition,
            response_content_encoding: self.response_content_encoding,
            x_oss_process: self.process,
        })?);
        query.insert(
            "x-oss-signature-version".to_owned(),
            Some(SIGNATURE_VERSION.to_owned()),
        );
        query.insert(
            "x-oss-credential".to_owned(),
            Some(format!(
                "{}/{}",
                config.access_key_id(),
                scope(now, config.region())?
            )),
        );
        query.insert("x-oss-date".to_owned(), Some(utc_date_time_str(now)?));
        query.insert("x-oss-expires".to_owned(), Some(self.expires.to_string()));
        let additional = additional_headers(&signed_headers);
        if !additional.is_empty() {
            query.insert("x-oss-additional-headers".to_owned(), Some(additional));
        }
        if let Some(token) = config.security_token() {
            query.insert("x-oss-security-token".to_owned(), Some(token.to_owned()));
        }

        let param = SignV4Param {
            signing_region: config.region(),
            http_verb: self.method,
            bucket: Some(self.bucket),
            object_key: Some(self.object_key),
            query: &query,
            signed_headers: &signed_headers,
            date_time: now,
        };
        let signature = generate_v4_signature(config.access_key_secret(), &param)?;

        // x-oss-signature放在最后
        let url = format!(
            "{}://{}{}?{}&x-oss-signature={}",
            config.scheme(),
            config.domain_name(Some(self.bucket)),
            request_uri(Some(self.object_key)),
            canonical_query_string(&query),
            signature
        );
        debug!(
            bucket = self.bucket,
            object = self.object_key,
            expires = self.expires,
            "presigned url generated"
        );
        Ok(url)
    }
}

impl Client {
    pub fn presign_url(&self) -> PresignUrlBuilder<'_> {
        PresignUrl::builder(self)
    }
}
