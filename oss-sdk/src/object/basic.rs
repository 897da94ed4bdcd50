//! 关于Object操作/基础操作
//!
//! [官方文档](https://help.aliyun.com/zh/oss/developer-reference/basic-operations-1/)

use super::types_rs::*;
use crate::executor::lower_case_headers;
use crate::sign_v4::{HTTPVerb, request_uri};
use crate::utils::{
    compute_md5_from_file, get_content_md5, open_file, parse_response_header, to_header_map,
    to_query_map, validate_bucket_name, validate_file_path, validate_object_name,
};
use crate::xml::from_xml;
use crate::{Client, Error, RequestConfig, RequestOptions};
use bytes::Bytes;
use reqwest::Body;
use std::collections::HashMap;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tokio_stream::{Stream, StreamExt};
use tokio_util::io::ReaderStream;
use tracing::debug;

async fn write_body(
    resp: &mut reqwest::Response,
    file: &mut tokio::fs::File,
    file_path: &Path,
) -> Result<(), Error> {
    let write_err =
        |e: std::io::Error| Error::io(format!("write file {} failed", file_path.display()), e);
    while let Some(chunk) = resp.chunk().await? {
        file.write_all(&chunk).await.map_err(write_err)?;
    }
    file.flush().await.map_err(write_err)
}

fn validate_target(bucket: &str, object_name: &str) -> Result<(), Error> {
    validate_bucket_name(bucket)?;
    validate_object_name(object_name)
}

impl<'a> PutObject<'a> {
    /// - `content_type`，不会进行MIME合法性检查
    /// - `object_name`：遵守OSS的Object[命名规则](https://help.aliyun.com/zh/oss/user-guide/object-naming-conventions)
    /// - `object`：如果需要创建文件夹，object_name以`/`结尾，`Vec`大小为0即可
    pub async fn send(
        &self,
        object_name: &str,
        object: PutObjectBody<'a>,
    ) -> Result<PutObjectResponseHeader, Error> {
        validate_target(self.bucket, object_name)?;

        let mut req_header_map = to_header_map(self)?;
        // 添加api剩下的请求头
        let body = match object {
            PutObjectBody::Bytes(bytes) => {
                req_header_map.insert("content-md5".to_owned(), get_content_md5(&bytes));
                req_header_map.insert("content-length".to_owned(), bytes.len().to_string());
                Body::from(bytes)
            }
            PutObjectBody::FilePath(path) => {
                validate_file_path(path)?;
                let file_size = tokio::fs::metadata(path)
                    .await
                    .map_err(|e| Error::io(format!("stat file {} failed", path.display()), e))?
                    .len();
                // 第一遍读取计算MD5，第二遍上传
                let md5_str = compute_md5_from_file(path).await?;
                req_header_map.insert("content-md5".to_owned(), md5_str);
                req_header_map.insert("content-length".to_owned(), file_size.to_string());
                debug!(path = %path.display(), size = file_size, "uploading file");

                let file = open_file(path).await?;
                Body::wrap_stream(ReaderStream::new(file))
            }
            PutObjectBody::Stream {
                body,
                content_length,
            } => {
                if let Some(len) = content_length {
                    req_header_map.insert("content-length".to_owned(), len.to_string());
                }
                body
            }
        };

        // 如果有x-meta-*，将其添加到请求头中
        req_header_map.extend(self.custom_metas.clone());

        let req = RequestConfig::builder()
            .method(HTTPVerb::Put)
            .bucket_name(self.bucket)
            .object_key(object_name)
            .headers(req_header_map)
            .body(body)
            .build();

        let resp = self.client.executor.request(req).await?;
        let (data, _) = parse_response_header(resp.headers())?;
        Ok(data)
    }
}

impl GetObject<'_> {
    /// 返回文件数据和响应头
    pub async fn receive_bytes(
        &self,
        object_name: &str,
    ) -> Result<(Bytes, GetObjectResponseHeader), Error> {
        let (resp, response_header) = self.get_response(object_name).await?;
        let data = resp.bytes().await?;

        Ok((data, response_header))
    }

    /// 返回的流不会把整个文件读入内存
    pub async fn receive_bytes_stream(
        &self,
        object_name: &str,
    ) -> Result<
        (
            impl Stream<Item = Result<Bytes, Error>> + use<>,
            GetObjectResponseHeader,
        ),
        Error,
    > {
        let (resp, response_header) = self.get_response(object_name).await?;
        let byte_stream = resp.bytes_stream().map(|item| item.map_err(Error::from));
        Ok((byte_stream, response_header))
    }

    /// 文件不存在时创建，存在时覆盖
    pub async fn download_to_file(
        &self,
        object_name: &str,
        file_path: &Path,
    ) -> Result<GetObjectResponseHeader, Error> {
        validate_file_path(file_path)?;
        let (mut resp, response_header) = self.get_response(object_name).await?;

        let mut file = tokio::fs::File::create(file_path)
            .await
            .map_err(|e| Error::io(format!("create file {} failed", file_path.display()), e))?;
        if let Err(e) = write_body(&mut resp, &mut file, file_path).await {
            drop(file);
            // 不保留只写了一半的文件
            if let Err(remove_err) = tokio::fs::remove_file(file_path).await {
                debug!(
                    path = %file_path.display(),
                    error = %remove_err,
                    "remove partial download failed"
                );
            }
            return Err(e);
        }

        Ok(response_header)
    }

    async fn get_response(
        &self,
        object_name: &str,
    ) -> Result<(reqwest::Response, GetObjectResponseHeader), Error> {
        validate_target(self.bucket, object_name)?;

        let req = RequestConfig::builder()
            .method(HTTPVerb::Get)
            .bucket_name(self.bucket)
            .object_key(object_name)
            .headers(to_header_map(&self.headers_part())?)
            .queries(to_query_map(&self.queries_part())?)
            .options(RequestOptions {
                expect_body: true,
                ..Default::default()
            })
            .build();

        let resp = self.client.executor.request_raw(req).await?;

        let headers = lower_case_headers(resp.headers());
        let (mut response_header, custom_meta_map) =
            parse_response_header::<GetObjectResponseHeader>(&headers)?;
        response_header.custom_x_oss_meta = custom_meta_map;

        Ok((resp, response_header))
    }
}

impl CopyObject<'_> {
    /// 复制到当前builder中`bucket`下的`dest_object_name`
    pub async fn send(&self, dest_object_name: &str) -> Result<CopyObjectResult, Error> {
        validate_target(self.bucket, dest_object_name)?;
        validate_target(self.source_bucket, self.source_key)?;

        let mut req_header_map = to_header_map(self)?;
        let mut copy_source = format!("/{}{}", self.source_bucket, request_uri(Some(self.source_key)));
        if let Some(version_id) = self.source_version_id {
            copy_source.push_str("?versionId=");
            copy_source.push_str(version_id);
        }
        req_header_map.insert("x-oss-copy-source".to_owned(), copy_source);

        let req = RequestConfig::builder()
            .method(HTTPVerb::Put)
            .bucket_name(self.bucket)
            .object_key(dest_object_name)
            .headers(req_header_map)
            .build();

        let resp = self.client.executor.request(req).await?;
        from_xml(resp.text()?)
    }
}

impl AppendObject<'_> {
    /// - 当创建一个新的Appendable Object的时候，`position`设为`0`
    /// - 如果该object已存在，则`position`为该Object的字节大小，即此次append object的起始位置
    pub async fn send(
        &self,
        object_name: &str,
        position: u64,
        data: Vec<u8>,
    ) -> Result<AppendObjectResponseHeader, Error> {
        validate_target(self.bucket, object_name)?;

        let mut req_header_map = to_header_map(self)?;
        req_header_map.extend(self.custom_metas.clone());
        req_header_map.insert("content-md5".to_owned(), get_content_md5(&data));
        req_header_map.insert("content-length".to_owned(), data.len().to_string());

        let req = RequestConfig::builder()
            .method(HTTPVerb::Post)
            .bucket_name(self.bucket)
            .object_key(object_name)
            .query_key("append")
            .query("position", position.to_string())
            .headers(req_header_map)
            .body(data.into())
            .build();

        let resp = self.client.executor.request(req).await?;
        let (data, _) = parse_response_header(resp.headers())?;
        Ok(data)
    }
}

impl DeleteMultipleObjects<'_> {
    /// `quiet`为`true`时，返回结果中的`deleted`为空
    pub async fn send(&self) -> Result<DeleteResult, Error> {
        validate_bucket_name(self.bucket)?;
        if self.objects.is_empty() {
            return Err(Error::Validation("objects to delete cannot be empty".to_owned()));
        }
        for object in &self.objects {
            validate_object_name(object.key)?;
        }

        let delete_req = DeleteMultipleObjectsRequest {
            quiet: self.quiet,
            object: &self.objects,
        };
        let req_body = quick_xml::se::to_string_with_root("Delete", &delete_req)
            .map_err(|e| Error::Xml(e.to_string()))?;

        let mut req = RequestConfig::builder()
            .method(HTTPVerb::Post)
            .bucket_name(self.bucket)
            .query_key("delete")
            .header("content-type", "application/xml")
            .header("content-md5", get_content_md5(req_body.as_bytes()))
            .header("content-length", req_body.len().to_string());
        if let Some(encoding_type) = self.encoding_type {
            req = req.header("encoding-type", encoding_type);
        }

        let resp = self.client.executor.request(req.body(req_body.into()).build()).await?;
        let text = resp.text()?;
        // quiet模式下响应体可能为空
        if text.trim().is_empty() {
            return Ok(DeleteResult {
                deleted: Vec::new(),
                encoding_type: None,
            });
        }
        from_xml(text)
    }
}

impl HeadObject<'_> {
    pub async fn send(&self, object_name: &str) -> Result<HeadObjectResponseHeader, Error> {
        validate_target(self.bucket, object_name)?;

        let req = RequestConfig::builder()
            .method(HTTPVerb::Head)
            .bucket_name(self.bucket)
            .object_key(object_name)
            .headers(to_header_map(self)?)
            .build();

        let resp = self.client.executor.request(req).await?;
        let (mut response_header, custom_meta_map) =
            parse_response_header::<HeadObjectResponseHeader>(resp.headers())?;
        response_header.custom_x_oss_meta = custom_meta_map;
        Ok(response_header)
    }
}

/// Object基础操作
impl Client {
    pub fn put_object(&self) -> PutObjectBuilder<'_> {
        PutObject::builder(self)
    }

    pub fn get_object(&self) -> GetObjectBuilder<'_> {
        GetObject::builder(self)
    }

    pub fn copy_object(&self) -> CopyObjectBuilder<'_> {
        CopyObject::builder(self)
    }

    pub fn append_object(&self) -> AppendObjectBuilder<'_> {
        AppendObject::builder(self)
    }

    /// 无论object是否存在都会执行删除操作并返回成功
    pub async fn delete_object(
        &self,
        bucket: &str,
        object_name: &str,
    ) -> Result<DeleteObjectResponseHeader, Error> {
        validate_target(bucket, object_name)?;

        let req = RequestConfig::builder()
            .method(HTTPVerb::Delete)
            .bucket_name(bucket)
            .object_key(object_name)
            .build();

        let resp = self.executor.request(req).await?;
        let (data, _) = parse_response_header(resp.headers())?;
        Ok(data)
    }

    pub fn delete_multiple_objects(&self) -> DeleteMultipleObjectsBuilder<'_> {
        DeleteMultipleObjects::builder(self)
    }

    pub fn head_object(&self) -> HeadObjectBuilder<'_> {
        HeadObject::builder(self)
    }

    /// 只返回object的基本元信息，比[Client::head_object]更轻量
    ///
    /// 第二个返回值为所有响应头，key均为小写
    pub async fn get_object_meta(
        &self,
        bucket: &str,
        object_name: &str,
    ) -> Result<(GetObjectMetaResponseHeader, HashMap<String, String>), Error> {
        validate_target(bucket, object_name)?;

        let req = RequestConfig::builder()
            .method(HTTPVerb::Head)
            .bucket_name(bucket)
            .object_key(object_name)
            .query_key("objectMeta")
            .build();

        let resp = self.executor.request(req).await?;
        let (data, _) = parse_response_header(resp.headers())?;
        let all_headers = resp
            .headers()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok((data, all_headers))
    }
}
