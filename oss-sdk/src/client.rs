use crate::Error;
use crate::config::ClientConfig;
use crate::executor::{Executor, HttpTransport, RequestConfig, ResponseResult};
use bon::bon;
use std::sync::Arc;

/// oss客户端，可以`clone`后在多个任务中并发使用
#[derive(Clone)]
pub struct Client {
    pub(crate) executor: Executor,
}

/// 创建oss客户端
#[bon]
impl Client {
    /// - `transport`：为`None`时使用`reqwest::Client`，超时时间取自`config`
    #[builder]
    pub fn new(
        config: ClientConfig,
        transport: Option<Arc<dyn HttpTransport>>,
    ) -> Result<Self, Error> {
        let transport = match transport {
            Some(t) => t,
            None => {
                let mut builder = reqwest::Client::builder();
                if let Some(timeout) = config.timeout() {
                    builder = builder.timeout(timeout);
                }
                Arc::new(builder.build()?)
            }
        };

        Ok(Self {
            executor: Executor::new(Arc::new(config), transport),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        self.executor.config()
    }

    /// 发送自定义请求，签名和错误处理与其它api相同
    ///
    /// 用于sdk还没有实现的api，如分片上传
    pub async fn request(&self, req: RequestConfig) -> Result<ResponseResult, Error> {
        self.executor.request(req).await
    }

    /// 同[Client::request]，但不读取响应体
    pub async fn request_raw(&self, req: RequestConfig) -> Result<reqwest::Response, Error> {
        self.executor.request_raw(req).await
    }
}
