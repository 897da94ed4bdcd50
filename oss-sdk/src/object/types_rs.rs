use crate::Client;
use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use std::collections::HashMap;
use std::path::Path;

// region:    --- put object
/// Header字段中：
/// - content_md5: 由程序自动添加
/// - content_length：由程序自动添加
/// - e_tag：不添加
#[serde_with::skip_serializing_none]
#[derive(Builder, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PutObject<'a> {
    #[builder(start_fn)]
    #[serde(skip_serializing)]
    pub(crate) client: &'a Client,
    // x-meta-* Header，不序列化，收集到map中以供访问
    #[builder(field)]
    #[serde(skip_serializing)]
    pub(crate) custom_metas: HashMap<String, String>,

    #[serde(skip_serializing)]
    pub(crate) bucket: &'a str,

    // region 公共请求头
    /// 对于MIME不会进行检查合法性检查
    content_type: Option<&'a str>,
    // content_length  自动添加
    // date, host, x-oss-security-token 由executor添加
    // endregion

    // region api请求头
    cache_control: Option<&'a str>,
    content_disposition: Option<&'a str>,
    content_encoding: Option<&'a str>,
    // content_md5  自动添加
    expires: Option<&'a str>,
    x_oss_forbid_overwrite: Option<&'a str>,
    x_oss_server_side_encryption: Option<&'a str>,
    x_oss_server_side_data_encryption: Option<&'a str>,
    x_oss_server_side_encryption_key_id: Option<&'a str>,
    x_oss_object_acl: Option<&'a str>,
    x_oss_storage_class: Option<&'a str>,
    // x-oss-meta-*  将由custom_metas转换为`x-oss-meta-key: value`形式添加
    x_oss_tagging: Option<&'a str>,
    // endregion
}

pub trait OssMetaExt<'a>: Sized {
    /// 需要让实现者返回对内部 custom_metas 的可变引用
    fn custom_metas_mut(&mut self) -> &mut HashMap<String, String>;

    fn x_meta(mut self, key: &'a str, val: &'a str) -> Self {
        self.custom_metas_mut()
            .insert(format!("x-oss-meta-{}", key.to_lowercase()), val.to_owned());
        self
    }

    fn x_metas(mut self, metas: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        for (key, val) in metas {
            self.custom_metas_mut()
                .insert(format!("x-oss-meta-{}", key.to_lowercase()), val.to_owned());
        }
        self
    }
}

// 对于`x_meta`中的key: value，会自动转换为: `x-oss-meta-key: value`，并添加到请求的Header
impl<'a, S: put_object_builder::State> OssMetaExt<'a> for PutObjectBuilder<'a, S> {
    fn custom_metas_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.custom_metas
    }
}

pub enum PutObjectBody<'a> {
    Bytes(Vec<u8>),
    /// 先读一遍文件计算MD5，再以流的方式上传
    FilePath(&'a Path),
    /// 调用者提供的流，不计算`content-md5`，长度未知时使用chunked编码
    Stream {
        body: reqwest::Body,
        content_length: Option<u64>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PutObjectResponseHeader {
    pub content_md5: Option<String>,
    pub etag: Option<String>,
    pub x_oss_hash_crc64ecma: Option<String>,
    pub x_oss_version_id: Option<String>,
}
// endregion: --- put object

// region:    --- get object
/* 想做成嵌套的builder的，即类似于：
    GetObject::builder()
    .header_range("bytes=0-9")
    .query_response_content_language("en-US")
    .build();
    但bon不支持嵌套builder，所以只能把请求头和请求参数都放在同一个builder里，然后手动区分
*/

#[serde_with::skip_serializing_none]
#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct GetObjectHeaders<'a> {
    pub(crate) range: Option<&'a str>,
    pub(crate) if_modified_since: Option<&'a str>,
    pub(crate) if_unmodified_since: Option<&'a str>,
    pub(crate) if_match: Option<&'a str>,
    pub(crate) if_none_match: Option<&'a str>,
    pub(crate) accept_encoding: Option<&'a str>,
}

#[serde_with::skip_serializing_none]
#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct GetObjectQueries<'a> {
    pub(crate) response_content_type: Option<&'a str>,
    pub(crate) response_content_language: Option<&'a str>,
    pub(crate) response_expires: Option<&'a str>,
    pub(crate) response_cache_control: Option<&'a str>,
    pub(crate) response_content_disposition: Option<&'a str>,
    pub(crate) response_content_encoding: Option<&'a str>,
    pub(crate) x_oss_process: Option<&'a str>,
}

#[derive(Builder)]
pub struct GetObject<'a> {
    #[builder(start_fn)]
    pub(crate) client: &'a Client,
    pub(crate) bucket: &'a str,

    // GetObject API的请求头
    pub(crate) range: Option<&'a str>,
    pub(crate) if_modified_since: Option<&'a str>,
    pub(crate) if_unmodified_since: Option<&'a str>,
    pub(crate) if_match: Option<&'a str>,
    pub(crate) if_none_match: Option<&'a str>,
    pub(crate) accept_encoding: Option<&'a str>,

    // GetObject API的请求参数
    pub(crate) response_content_type: Option<&'a str>,
    pub(crate) response_content_language: Option<&'a str>,
    pub(crate) response_expires: Option<&'a str>,
    pub(crate) response_cache_control: Option<&'a str>,
    pub(crate) response_content_disposition: Option<&'a str>,
    pub(crate) response_content_encoding: Option<&'a str>,
    /// 图片处理，如：`image/resize,w_100`
    pub(crate) x_oss_process: Option<&'a str>,
}

impl GetObject<'_> {
    pub(crate) fn headers_part(&self) -> GetObjectHeaders<'_> {
        GetObjectHeaders {
            range: self.range,
            if_modified_since: self.if_modified_since,
            if_unmodified_since: self.if_unmodified_since,
            if_match: self.if_match,
            if_none_match: self.if_none_match,
            accept_encoding: self.accept_encoding,
        }
    }

    pub(crate) fn queries_part(&self) -> GetObjectQueries<'_> {
        GetObjectQueries {
            response_content_type: self.response_content_type,
            response_content_language: self.response_content_language,
            response_expires: self.response_expires,
            response_cache_control: self.response_cache_control,
            response_content_disposition: self.response_content_disposition,
            response_content_encoding: self.response_content_encoding,
            x_oss_process: self.x_oss_process,
        }
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GetObjectResponseHeader {
    /// key不含`x-oss-meta-`前缀
    #[serde(default, skip_deserializing)]
    pub custom_x_oss_meta: HashMap<String, String>,
    pub x_oss_server_side_encryption: Option<String>,
    pub x_oss_tagging_count: Option<String>,
    pub x_oss_expiration: Option<String>,
    pub x_oss_hash_crc64ecma: Option<String>,
    pub x_oss_object_type: Option<String>,
    // chunked响应没有content-length
    #[serde(default)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub content_length: Option<u64>,
    pub content_range: Option<String>,
    pub accept_ranges: Option<String>,
    pub content_type: Option<String>,
    pub last_modified: Option<String>,
    pub etag: String,
}
// endregion: --- get object

// region:    --- copy object
#[serde_with::skip_serializing_none]
#[derive(Builder, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct CopyObject<'a> {
    #[builder(start_fn)]
    #[serde(skip_serializing)]
    pub(crate) client: &'a Client,

    /// 目标bucket
    #[serde(skip_serializing)]
    pub(crate) bucket: &'a str,
    // 组成`x-oss-copy-source: /{source_bucket}/{source_key}`
    #[serde(skip_serializing)]
    pub(crate) source_bucket: &'a str,
    #[serde(skip_serializing)]
    pub(crate) source_key: &'a str,
    #[serde(skip_serializing)]
    pub(crate) source_version_id: Option<&'a str>,

    x_oss_forbid_overwrite: Option<&'a str>,
    x_oss_copy_source_if_match: Option<&'a str>,
    x_oss_copy_source_if_none_match: Option<&'a str>,
    x_oss_copy_source_if_unmodified_since: Option<&'a str>,
    x_oss_copy_source_if_modified_since: Option<&'a str>,
    /// `COPY`（默认）或`REPLACE`
    x_oss_metadata_directive: Option<&'a str>,
    x_oss_server_side_encryption: Option<&'a str>,
    x_oss_server_side_encryption_key_id: Option<&'a str>,
    x_oss_object_acl: Option<&'a str>,
    x_oss_storage_class: Option<&'a str>,
    x_oss_tagging: Option<&'a str>,
    x_oss_tagging_directive: Option<&'a str>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct CopyObjectResult {
    pub e_tag: String,
    pub last_modified: String,
}
// endregion: --- copy object

// region:    --- append object
#[serde_with::skip_serializing_none]
#[derive(Builder, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct AppendObject<'a> {
    #[serde(skip_serializing)]
    #[builder(start_fn)]
    pub(crate) client: &'a Client,

    // x-oss-meta-* Header
    #[serde(skip_serializing)]
    #[builder(field)]
    pub(crate) custom_metas: HashMap<String, String>,

    #[serde(skip_serializing)]
    pub(crate) bucket: &'a str,

    // append, position添加到url的query中
    cache_control: Option<&'a str>,
    content_disposition: Option<&'a str>,
    content_encoding: Option<&'a str>,
    // content_md5 自动添加
    expires: Option<&'a str>,
    x_oss_server_side_encryption: Option<&'a str>,
    x_oss_object_acl: Option<&'a str>,
    x_oss_storage_class: Option<&'a str>,
    x_oss_tagging: Option<&'a str>,

    // 公共请求头
    content_type: Option<&'a str>,
    // content_length  自动添加
}

impl<'a, S: append_object_builder::State> OssMetaExt<'a> for AppendObjectBuilder<'a, S> {
    fn custom_metas_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.custom_metas
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AppendObjectResponseHeader {
    /// 下一次append的`position`
    #[serde_as(as = "DisplayFromStr")]
    pub x_oss_next_append_position: u64,
    pub x_oss_hash_crc64ecma: Option<String>,
}
// endregion: --- append object

// region:    --- delete object
#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeleteObjectResponseHeader {
    #[serde(default)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub x_oss_delete_marker: Option<bool>,
    pub x_oss_version_id: Option<String>,
}
// endregion

// region:    --- delete_multiple_objects
#[derive(Builder)]
pub struct DeleteMultipleObjects<'a> {
    #[builder(start_fn)]
    pub(crate) client: &'a Client,
    pub(crate) bucket: &'a str,

    // api请求头
    pub(crate) encoding_type: Option<&'a str>,
    // Content-Length 自动添加
    // Content-MD5 自动添加

    // 请求元素
    pub(crate) objects: Vec<ObjectToDelete<'a>>,
    /// 为`true`时响应中不返回删除成功的object
    #[builder(default)]
    pub(crate) quiet: bool,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct DeleteMultipleObjectsRequest<'a> {
    pub quiet: bool,
    pub object: &'a [ObjectToDelete<'a>],
}

#[serde_with::skip_serializing_none]
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectToDelete<'a> {
    pub key: &'a str,
    pub version_id: Option<&'a str>,
}

impl<'a> From<&'a str> for ObjectToDelete<'a> {
    fn from(key: &'a str) -> Self {
        Self {
            key,
            version_id: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteResult {
    // quiet模式下没有<Deleted>
    #[serde(default)]
    pub deleted: Vec<Deleted>,
    pub encoding_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Deleted {
    pub key: String,
    pub delete_marker: Option<bool>,
    pub delete_marker_version_id: Option<String>,
    pub version_id: Option<String>,
}
// endregion: --- delete_multiple_objects

// region:    --- head object
#[serde_with::skip_serializing_none]
#[derive(Builder, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct HeadObject<'a> {
    #[builder(start_fn)]
    #[serde(skip_serializing)]
    pub(crate) client: &'a Client,
    #[serde(skip_serializing)]
    pub(crate) bucket: &'a str,

    pub if_modified_since: Option<&'a str>,
    pub if_unmodified_since: Option<&'a str>,
    pub if_match: Option<&'a str>,
    pub if_none_match: Option<&'a str>,
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HeadObjectResponseHeader {
    #[serde(default, skip_deserializing)]
    pub custom_x_oss_meta: HashMap<String, String>,
    pub x_oss_server_side_encryption: Option<String>,
    pub x_oss_server_side_encryption_key_id: Option<String>,
    pub x_oss_storage_class: Option<String>,
    pub x_oss_object_type: Option<String>,
    #[serde(default)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub x_oss_next_append_position: Option<u64>,
    pub x_oss_hash_crc64ecma: Option<String>,
    pub x_oss_transition_time: Option<String>,
    pub x_oss_expiration: Option<String>,
    pub x_oss_restore: Option<String>,
    pub x_oss_process_status: Option<String>,
    pub x_oss_request_charged: Option<String>,
    pub content_md5: Option<String>,
    pub last_modified: Option<String>,
    pub access_control_allow_origin: Option<String>,
    pub access_control_allow_methods: Option<String>,
    pub access_control_max_age: Option<String>,
    pub access_control_allow_headers: Option<String>,
    pub access_control_expose_headers: Option<String>,
    pub x_oss_tagging_count: Option<String>,
    pub content_type: Option<String>,
    #[serde(default)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub content_length: Option<u64>,
    pub etag: Option<String>,
}
// endregion: --- head object

// region get object meta
#[serde_as]
#[derive(Deserialize, Debug)]
#[serde(rename_all = "kebab-case")]
pub struct GetObjectMetaResponseHeader {
    #[serde_as(as = "DisplayFromStr")]
    pub content_length: u64,
    pub etag: String,
    pub x_oss_transition_time: Option<String>,
    pub x_oss_last_access_time: Option<String>,
    pub last_modified: Option<String>,
    pub x_oss_version_id: Option<String>,
}
// endregion
