use crate::Error;
use base64::{Engine, engine::general_purpose};
use md5::{Digest, Md5};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tokio::io::AsyncReadExt;

pub(crate) fn get_content_md5(bytes: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(bytes);
    general_purpose::STANDARD.encode(hasher.finalize())
}

// 用 buffer 读文件并计算MD5，文件在函数返回时关闭
pub(crate) async fn compute_md5_from_file(path: &Path) -> Result<String, Error> {
    let mut file = open_file(path).await?;
    let mut hasher = Md5::new();
    let mut buf = vec![0u8; 64 * 1024];

    loop {
        let n = file
            .read(&mut buf)
            .await
            .map_err(|e| Error::io(format!("read file {} failed", path.display()), e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(general_purpose::STANDARD.encode(hasher.finalize()))
}

pub(crate) async fn open_file(path: &Path) -> Result<tokio::fs::File, Error> {
    tokio::fs::File::open(path)
        .await
        .map_err(|e| Error::io(format!("open file {} failed", path.display()), e))
}

pub(crate) fn validate_file_path(path: &Path) -> Result<(), Error> {
    if path.as_os_str().is_empty() || path.to_string_lossy().trim().is_empty() {
        return Err(Error::Validation("file path cannot be empty".to_owned()));
    }
    Ok(())
}

/// [Bucket命名规范](https://help.aliyun.com/zh/oss/user-guide/bucket-naming-conventions)
pub(crate) fn validate_bucket_name(name: &str) -> Result<(), Error> {
    if name.trim().is_empty() {
        return Err(Error::Validation("bucket name cannot be empty".to_owned()));
    }
    if !(3..=63).contains(&name.len()) {
        return Err(Error::Validation(
            "bucket name must be 3 to 63 characters long".to_owned(),
        ));
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    {
        return Err(Error::Validation(
            "bucket name can only contain lowercase letters, digits and '-'".to_owned(),
        ));
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(Error::Validation(
            "bucket name cannot start or end with '-'".to_owned(),
        ));
    }
    Ok(())
}

/// [Object命名规范](https://help.aliyun.com/zh/oss/user-guide/object-naming-conventions)
pub(crate) fn validate_object_name(name: &str) -> Result<(), Error> {
    let len = name.len();
    if len == 0 || name.trim().is_empty() {
        return Err(Error::Validation("object_name cannot be empty".to_owned()));
    }
    if len > 1023 {
        return Err(Error::Validation(
            "object_name is too long, max is 1023 bytes".to_owned(),
        ));
    }

    if name.starts_with('/') || name.starts_with('\\') {
        return Err(Error::Validation(
            "object_name cannot start with '/' or '\\'".to_owned(),
        ));
    }

    if name.bytes().any(|b| b == b'\r' || b == b'\n') {
        return Err(Error::Validation(
            "object_name cannot contain control characters".to_owned(),
        ));
    }

    // 忽略末尾`/`产生的空段，中间不能有空段
    let segments: Vec<&str> = name.split('/').collect();
    let to_check = if name.ends_with('/') {
        &segments[..segments.len() - 1]
    } else {
        &segments[..]
    };
    if to_check.iter().any(|seg| seg.is_empty()) {
        return Err(Error::Validation(
            "object_name cannot contain empty path segments".to_owned(),
        ));
    }
    if to_check.iter().any(|seg| *seg == "." || *seg == "..") {
        return Err(Error::Validation(
            "object_name cannot contain relative path segments '.' or '..'".to_owned(),
        ));
    }

    Ok(())
}

fn to_object(value: &impl Serialize) -> Result<Map<String, Value>, Error> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Err(Error::Common("value is not serialized as an object".to_owned())),
    }
}

fn value_to_string(v: Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// 把请求头结构体（`skip_serializing_none`）转为`HashMap`，值为`None`的字段不会出现
pub(crate) fn to_header_map(value: &impl Serialize) -> Result<HashMap<String, String>, Error> {
    Ok(to_object(value)?
        .into_iter()
        .filter_map(|(k, v)| value_to_string(v).map(|v| (k, v)))
        .collect())
}

/// 把请求参数结构体转为query，数字、bool转为字符串，`null`保留为只有key的参数
pub(crate) fn to_query_map(
    value: &impl Serialize,
) -> Result<BTreeMap<String, Option<String>>, Error> {
    Ok(to_object(value)?
        .into_iter()
        .map(|(k, v)| (k, value_to_string(v)))
        .collect())
}

/// 把响应头（key均为小写）解析为指定结构体，同时返回所有`x-oss-meta-*`
///
/// 返回的meta的key去掉了`x-oss-meta-`前缀
pub(crate) fn parse_response_header<T: DeserializeOwned>(
    headers: &BTreeMap<String, String>,
) -> Result<(T, HashMap<String, String>), Error> {
    let mut map = Map::new();
    let mut metas = HashMap::new();
    for (k, v) in headers {
        if let Some(meta_key) = k.strip_prefix("x-oss-meta-") {
            metas.insert(meta_key.to_owned(), v.clone());
        }
        map.insert(k.clone(), Value::String(v.clone()));
    }
    let data = serde_json::from_value(Value::Object(map))?;
    Ok((data, metas))
}
