use serde::Deserialize;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// 参数检查失败，请求没有发出
    #[error("validation error: {0}")]
    Validation(String),
    #[error("server error, status: {status}")]
    Server { status: u16 },
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("unknown error, status: {status}")]
    Unknown { status: u16 },
    #[error("null response body")]
    NullResponseBody,
    #[error("request timed out")]
    Timeout,
    #[error("{message}: {source}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
    #[error("reqwest error: {0}")]
    Reqwest(reqwest::Error),
    #[error("xml error: {0}")]
    Xml(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Helper(#[from] oss_sdk_common::Error),
    #[error("error: {0}")]
    Common(String),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout
        } else {
            Error::Reqwest(e)
        }
    }
}

impl Error {
    pub(crate) fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            message: message.into(),
            source,
        }
    }

    /// 服务端返回的`Code`，只有[`Error::Client`]才有
    pub fn code(&self) -> Option<&str> {
        match self {
            Error::Client(e) => Some(e.code()),
            _ => None,
        }
    }
}

/// OSS返回4xx时响应体中的错误信息
///
/// [错误响应](https://help.aliyun.com/zh/oss/developer-reference/error-responses)
#[derive(thiserror::Error, Debug, Clone)]
#[error("{code}: {message} (status: {status}, request id: {request_id})")]
pub struct ClientError {
    message: String,
    code: String,
    request_id: String,
    host_id: String,
    ec: Option<String>,
    recommend_doc: Option<String>,
    bucket_name: Option<String>,
    status: u16,
}

// <Error><Code>NoSuchKey</Code>...</Error>
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorEnvelope {
    code: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    request_id: String,
    #[serde(default)]
    host_id: String,
    #[serde(rename = "EC")]
    ec: Option<String>,
    recommend_doc: Option<String>,
    bucket_name: Option<String>,
}

impl ClientError {
    /// 解析失败返回`None`
    pub(crate) fn from_xml(status: u16, body: &str) -> Option<Self> {
        let envelope: ErrorEnvelope = quick_xml::de::from_str(body).ok()?;
        Some(Self {
            message: envelope.message,
            code: envelope.code,
            request_id: envelope.request_id,
            host_id: envelope.host_id,
            ec: envelope.ec,
            recommend_doc: envelope.recommend_doc,
            bucket_name: envelope.bucket_name,
            status,
        })
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn host_id(&self) -> &str {
        &self.host_id
    }

    pub fn ec(&self) -> Option<&str> {
        self.ec.as_deref()
    }

    pub fn recommend_doc(&self) -> Option<&str> {
        self.recommend_doc.as_deref()
    }

    pub fn bucket_name(&self) -> Option<&str> {
        self.bucket_name.as_deref()
    }

    pub fn status(&self) -> u16 {
        self.status
    }
}

#[test]
fn client_error_from_xml_test() {
    let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<Error>
  <Code>NoSuchKey</Code>
  <Message>The specified key does not exist.</Message>
  <RequestId>5C3D9175B6FC201293AD****</RequestId>
  <HostId>examplebucket.oss-cn-hangzhou.aliyuncs.com</HostId>
  <Key>example.txt</Key>
  <EC>0026-00000001</EC>
  <RecommendDoc>https://api.aliyun.com/troubleshoot?q=0026-00000001</RecommendDoc>
</Error>"#;
    let e = ClientError::from_xml(404, body).unwrap();
    assert_eq!(e.code(), "NoSuchKey");
    assert_eq!(e.request_id(), "5C3D9175B6FC201293AD****");
    assert_eq!(e.ec(), Some("0026-00000001"));
    assert_eq!(e.bucket_name(), None);
    assert_eq!(e.status(), 404);

    assert!(ClientError::from_xml(404, "").is_none());
    assert!(ClientError::from_xml(404, "not xml").is_none());
}
