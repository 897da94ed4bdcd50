//! OSS V4签名
//!
//! 签名文档：<https://help.aliyun.com/zh/oss/developer-reference/recommend-to-use-signature-version-4>
//!
//! 这里的函数都没有副作用，构造请求时用同一份输入同时得到签名用的字符串和实际发送请求用的uri/query，
//! 保证两者不会不一致。

use crate::Error;
use oss_sdk_common::helper::{hmac_sha256, sha256_hex, utc_date_str, utc_date_time_str};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use time::OffsetDateTime;

pub const SIGNATURE_VERSION: &str = "OSS4-HMAC-SHA256";
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";
const EXTENSION_HEADER_PREFIX: &str = "x-oss-";

// RFC 3986 unreserved: A-Z a-z 0-9 - _ . ~
const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HTTPVerb {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
}

impl Display for HTTPVerb {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            HTTPVerb::Get => write!(f, "GET"),
            HTTPVerb::Post => write!(f, "POST"),
            HTTPVerb::Put => write!(f, "PUT"),
            HTTPVerb::Delete => write!(f, "DELETE"),
            HTTPVerb::Head => write!(f, "HEAD"),
            HTTPVerb::Options => write!(f, "OPTIONS"),
        }
    }
}

impl From<HTTPVerb> for reqwest::Method {
    fn from(verb: HTTPVerb) -> Self {
        match verb {
            HTTPVerb::Get => reqwest::Method::GET,
            HTTPVerb::Post => reqwest::Method::POST,
            HTTPVerb::Put => reqwest::Method::PUT,
            HTTPVerb::Delete => reqwest::Method::DELETE,
            HTTPVerb::Head => reqwest::Method::HEAD,
            HTTPVerb::Options => reqwest::Method::OPTIONS,
        }
    }
}

pub fn uri_encode(s: &str) -> String {
    utf8_percent_encode(s, URI_ENCODE_SET).to_string()
}

// object名称按`/`分段，每段单独编码，保留分隔符`/`
fn encode_object_key(object_key: &str) -> String {
    object_key
        .split('/')
        .map(uri_encode)
        .collect::<Vec<_>>()
        .join("/")
}

/// 签名用的CanonicalURI
///
/// - bucket和object都有：`/bucket/object`
/// - 只有bucket：`/bucket/`
/// - 其它：`/`
pub fn canonical_uri(bucket: Option<&str>, object_key: Option<&str>) -> String {
    match (bucket, object_key) {
        (Some(bucket), Some(key)) => {
            format!("/{}/{}", uri_encode(bucket), encode_object_key(key))
        }
        (Some(bucket), None) => format!("/{}/", uri_encode(bucket)),
        _ => "/".to_owned(),
    }
}

/// 实际请求的path，bucket在host中，所以这里不包含bucket
pub fn request_uri(object_key: Option<&str>) -> String {
    match object_key {
        Some(key) => format!("/{}", encode_object_key(key)),
        None => "/".to_owned(),
    }
}

/// 值为`None`或trim后为空的参数只保留key，如：`acl&max-keys=100`
///
/// 请求url的query部分也使用这个结果，保证和签名时的顺序一致
pub fn canonical_query_string(query: &BTreeMap<String, Option<String>>) -> String {
    query
        .iter()
        .map(|(k, v)| match v.as_deref() {
            Some(v) if !v.trim().is_empty() => format!("{}={}", uri_encode(k), uri_encode(v)),
            _ => uri_encode(k),
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn is_signed_header(lower_key: &str) -> bool {
    lower_key == "content-type"
        || lower_key == "content-md5"
        || lower_key == "host"
        || lower_key.starts_with(EXTENSION_HEADER_PREFIX)
}

/// 从所有请求头中选出参与签名的header，key转为小写，value去掉首尾空白
pub fn headers_to_sign<'a>(
    headers: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> BTreeMap<String, String> {
    headers
        .into_iter()
        .map(|(k, v)| (k.to_lowercase(), v))
        .filter(|(k, _)| is_signed_header(k))
        .map(|(k, v)| (k, v.trim().to_owned()))
        .collect()
}

/// 每行`key:value\n`，空集合的结果为`\n`
pub fn canonical_headers(headers: &BTreeMap<String, String>) -> String {
    if headers.is_empty() {
        return "\n".to_owned();
    }
    let mut s = String::new();
    for (k, v) in headers {
        s.push_str(&k.to_lowercase());
        s.push(':');
        s.push_str(v.trim());
        s.push('\n');
    }
    s
}

pub fn additional_headers(headers: &BTreeMap<String, String>) -> String {
    headers
        .keys()
        .map(|k| k.to_lowercase())
        .collect::<Vec<_>>()
        .join(";")
}

pub struct SignV4Param<'a> {
    pub signing_region: &'a str,
    pub http_verb: HTTPVerb,
    pub bucket: Option<&'a str>,
    pub object_key: Option<&'a str>,
    pub query: &'a BTreeMap<String, Option<String>>,
    /// 已经过[headers_to_sign]筛选的header
    pub signed_headers: &'a BTreeMap<String, String>,
    pub date_time: &'a OffsetDateTime,
}

pub fn canonical_request(param: &SignV4Param<'_>) -> String {
    format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        param.http_verb,
        canonical_uri(param.bucket, param.object_key),
        canonical_query_string(param.query),
        canonical_headers(param.signed_headers),
        additional_headers(param.signed_headers),
        UNSIGNED_PAYLOAD
    )
}

/// `{date}/{region}/oss/aliyun_v4_request`
pub fn scope(date_time: &OffsetDateTime, signing_region: &str) -> Result<String, Error> {
    Ok(format!(
        "{}/{}/oss/aliyun_v4_request",
        utc_date_str(date_time)?,
        signing_region
    ))
}

pub fn string_to_sign(param: &SignV4Param<'_>) -> Result<String, Error> {
    Ok(format!(
        "{}\n{}\n{}\n{}",
        SIGNATURE_VERSION,
        utc_date_time_str(param.date_time)?,
        scope(param.date_time, param.signing_region)?,
        sha256_hex(canonical_request(param).as_bytes())
    ))
}

pub fn signing_key(access_key_secret: &str, date: &str, signing_region: &str) -> Vec<u8> {
    let date_key = hmac_sha256(
        format!("aliyun_v4{}", access_key_secret).as_bytes(),
        date.as_bytes(),
    );
    let date_region_key = hmac_sha256(&date_key, signing_region.as_bytes());
    let date_region_service_key = hmac_sha256(&date_region_key, b"oss");
    hmac_sha256(&date_region_service_key, b"aliyun_v4_request")
}

/// 返回hex编码的签名
pub fn generate_v4_signature(
    access_key_secret: &str,
    param: &SignV4Param<'_>,
) -> Result<String, Error> {
    let key = signing_key(
        access_key_secret,
        &utc_date_str(param.date_time)?,
        param.signing_region,
    );
    Ok(hex::encode(hmac_sha256(
        &key,
        string_to_sign(param)?.as_bytes(),
    )))
}

/// 返回`Authorization`头的值
pub fn sign_v4(
    access_key_id: &str,
    access_key_secret: &str,
    param: &SignV4Param<'_>,
) -> Result<String, Error> {
    let signature = generate_v4_signature(access_key_secret, param)?;
    Ok(format!(
        "{} Credential={}/{},AdditionalHeaders={},Signature={}",
        SIGNATURE_VERSION,
        access_key_id,
        scope(param.date_time, param.signing_region)?,
        additional_headers(param.signed_headers),
        signature
    ))
}
