use bon::Builder;
use serde::Deserialize;
use std::time::Duration;

/// 客户端配置，构建后不可修改
///
/// region和endpoint：<https://help.aliyun.com/zh/oss/user-guide/regions-and-endpoints>
///
/// 也可以从配置文件反序列化得到：
/// ```toml
/// region = "cn-hangzhou"
/// endpoint = "oss-cn-hangzhou.aliyuncs.com"
/// access_key_id = "..."
/// access_key_secret = "..."
/// ```
#[derive(Builder, Deserialize, Clone)]
#[builder(on(String, into))]
pub struct ClientConfig {
    /// 签名使用的region，如`cn-hangzhou`，不带`oss-`前缀
    region: String,
    endpoint: String,
    access_key_id: String,
    access_key_secret: String,
    /// `true`使用https
    #[builder(default = true)]
    #[serde(default = "default_secure")]
    secure: bool,
    /// endpoint为已绑定bucket的自定义域名时设为`true`，此时host中不再拼接bucket
    #[builder(default)]
    #[serde(default)]
    cname: bool,
    timeout_ms: Option<u64>,
    /// STS临时凭证
    security_token: Option<String>,
    /// 打开后会在debug级别输出CanonicalRequest和StringToSign
    #[builder(default)]
    #[serde(default)]
    debug: bool,
}

fn default_secure() -> bool {
    true
}

impl ClientConfig {
    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub(crate) fn access_key_secret(&self) -> &str {
        &self.access_key_secret
    }

    pub fn secure(&self) -> bool {
        self.secure
    }

    pub fn cname(&self) -> bool {
        self.cname
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn security_token(&self) -> Option<&str> {
        self.security_token.as_deref()
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub(crate) fn scheme(&self) -> &'static str {
        if self.secure { "https" } else { "http" }
    }

    /// 虚拟主机风格的域名：`{bucket}.{endpoint}`
    pub(crate) fn domain_name(&self, bucket: Option<&str>) -> String {
        match bucket {
            Some(bucket) if !self.cname => format!("{}.{}", bucket, self.endpoint),
            _ => self.endpoint.clone(),
        }
    }
}

// 不输出secret
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field("secure", &self.secure)
            .field("cname", &self.cname)
            .field("timeout_ms", &self.timeout_ms)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}
