//! 只实现了常用的部分API
//!
//! [阿里云API文档](https://help.aliyun.com/zh/oss/developer-reference/bucket-operations/)

use crate::sign_v4::HTTPVerb;
use crate::utils::{to_header_map, to_query_map, validate_bucket_name};
use crate::xml::from_xml;
use crate::{Client, Error, RequestConfig};
use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use tracing::debug;

// region:    --- put bucket
#[serde_with::skip_serializing_none]
#[derive(Builder, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PutBucket<'a> {
    #[builder(start_fn)]
    #[serde(skip_serializing)]
    pub(crate) client: &'a Client,
    #[serde(skip_serializing)]
    pub(crate) bucket: &'a str,
    // 请求元素
    #[serde(skip_serializing)]
    pub(crate) storage_class: Option<&'a str>,
    #[serde(skip_serializing)]
    pub(crate) data_redundancy_type: Option<&'a str>,
    // header
    x_oss_acl: Option<&'a str>,
    x_oss_resource_group_id: Option<&'a str>,
    x_oss_bucket_tagging: Option<&'a str>,
}

#[serde_with::skip_serializing_none]
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateBucketConfiguration<'a> {
    /// 默认为`Standard`
    storage_class: Option<&'a str>,
    /// 默认为`LRS`
    data_redundancy_type: Option<&'a str>,
}

impl PutBucket<'_> {
    pub async fn send(&self) -> Result<(), Error> {
        validate_bucket_name(self.bucket)?;

        let req_xml = quick_xml::se::to_string(&CreateBucketConfiguration {
            storage_class: self.storage_class,
            data_redundancy_type: self.data_redundancy_type,
        })
        .map_err(|e| Error::Xml(e.to_string()))?;

        let req = RequestConfig::builder()
            .method(HTTPVerb::Put)
            .bucket_name(self.bucket)
            .headers(to_header_map(self)?)
            .header("content-type", "application/xml")
            .body(req_xml.into())
            .build();

        self.client.executor.request(req).await?;
        Ok(())
    }
}
// endregion: --- put bucket

// region:    --- list objects v2
/// `list-type`将自动设为2
#[serde_as]
#[serde_with::skip_serializing_none]
#[derive(Builder, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ListObjectsV2<'a> {
    #[builder(start_fn)]
    #[serde(skip_serializing)]
    pub(crate) client: &'a Client,
    #[serde(skip_serializing)]
    pub(crate) bucket: &'a str,
    // list-type: 2  固定的，自动添加
    delimiter: Option<&'a str>,
    start_after: Option<&'a str>,
    continuation_token: Option<&'a str>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    max_keys: Option<u16>,
    prefix: Option<&'a str>,
    encoding_type: Option<&'a str>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    fetch_owner: Option<bool>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct ListBucketResult {
    // <Contents>直接重复出现
    #[serde(default)]
    pub contents: Vec<Content>,
    #[serde(default)]
    pub common_prefixes: Vec<CommonPrefixes>,
    pub delimiter: Option<String>,
    pub encoding_type: Option<String>,
    #[serde(default)]
    pub is_truncated: bool,
    pub start_after: Option<String>,
    pub max_keys: Option<u32>,
    pub name: String,
    pub prefix: Option<String>,
    pub continuation_token: Option<String>,
    pub key_count: Option<u32>,
    pub next_continuation_token: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct CommonPrefixes {
    pub prefix: String,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct Content {
    pub owner: Option<Owner>,
    pub e_tag: String,
    pub key: String,
    pub last_modified: String,
    pub size: u64,
    pub storage_class: Option<String>,
    pub restore_info: Option<String>,
    pub r#type: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct Owner {
    pub display_name: String,
    #[serde(rename = "ID")]
    pub id: String,
}

/// [ListObjectsV2::send_all]的结果，按页的顺序合并
#[derive(Debug, Default)]
pub struct ObjectListing {
    pub contents: Vec<Content>,
    pub common_prefixes: Vec<String>,
}

impl ListObjectsV2<'_> {
    async fn send_page(&self, continuation_token: Option<&str>) -> Result<ListBucketResult, Error> {
        validate_bucket_name(self.bucket)?;

        let mut query = to_query_map(self)?;
        // 添加固定的query参数
        query.insert("list-type".to_owned(), Some("2".to_owned()));
        match continuation_token {
            Some(token) => {
                query.insert("continuation-token".to_owned(), Some(token.to_owned()));
            }
            None => {
                query.remove("continuation-token");
            }
        }

        let req = RequestConfig::builder()
            .method(HTTPVerb::Get)
            .bucket_name(self.bucket)
            .queries(query)
            .build();

        let resp = self.client.executor.request(req).await?;
        from_xml(resp.text()?)
    }

    pub async fn send(&self) -> Result<ListBucketResult, Error> {
        self.send_page(self.continuation_token).await
    }

    /// 按顺序逐页请求直到`IsTruncated`为`false`
    pub async fn send_all(&self) -> Result<ObjectListing, Error> {
        let mut listing = ObjectListing::default();
        let mut token = self.continuation_token.map(str::to_owned);
        loop {
            let page = self.send_page(token.as_deref()).await?;
            debug!(
                bucket = self.bucket,
                count = page.contents.len(),
                is_truncated = page.is_truncated,
                "listed object page"
            );
            listing.contents.extend(page.contents);
            listing
                .common_prefixes
                .extend(page.common_prefixes.into_iter().map(|p| p.prefix));
            match page.next_continuation_token {
                Some(next) if page.is_truncated && !next.is_empty() => token = Some(next),
                _ => break,
            }
        }
        Ok(listing)
    }
}
// endregion: --- list objects v2

// region:    --- get bucket info
#[derive(Builder)]
pub struct GetBucketInfo<'a> {
    #[builder(start_fn)]
    pub(crate) client: &'a Client,
    pub(crate) bucket: &'a str,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct BucketInfo {
    pub bucket: Bucket,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct Bucket {
    pub creation_date: String,
    pub extranet_endpoint: String,
    pub intranet_endpoint: String,
    pub location: String,
    pub storage_class: String,
    pub name: String,
    pub resource_group_id: Option<String>,
    pub owner: Owner,
    pub access_control_list: AccessControlList,
    pub data_redundancy_type: Option<String>,
    pub versioning: Option<String>,
    pub cross_region_replication: Option<String>,
    pub transfer_acceleration: Option<String>,
    pub access_monitor: Option<String>,
    pub bucket_policy: Option<BucketPolicy>,
    pub comment: Option<String>,
    pub server_side_encryption_rule: Option<ServerSideEncryptionRule>,
    pub block_public_access: Option<bool>,
}

#[derive(Deserialize, Debug)]
pub struct ServerSideEncryptionRule {
    #[serde(rename = "SSEAlgorithm")]
    pub sse_algorithm: String,
    #[serde(rename = "KMSMasterKeyID")]
    pub kms_master_key_id: Option<String>,
    #[serde(rename = "KMSDataEncryption")]
    pub kms_data_encryption: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct AccessControlList {
    pub grant: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct BucketPolicy {
    pub log_bucket: Option<String>,
    pub log_prefix: Option<String>,
}

impl GetBucketInfo<'_> {
    pub async fn send(&self) -> Result<BucketInfo, Error> {
        validate_bucket_name(self.bucket)?;

        let req = RequestConfig::builder()
            .method(HTTPVerb::Get)
            .bucket_name(self.bucket)
            .query_key("bucketInfo")
            .build();

        let resp = self.client.executor.request(req).await?;
        from_xml(resp.text()?)
    }
}
// endregion: --- get bucket info

//region get bucket location
#[derive(Builder)]
pub struct GetBucketLocation<'a> {
    #[builder(start_fn)]
    pub(crate) client: &'a Client,
    pub(crate) bucket: &'a str,
}
// xml数据为："<LocationConstraint>oss-cn-hangzhou</LocationConstraint>"，
// 这种情况下使用xml反序列化比较特殊，写法得类似于下面这样：
#[derive(Deserialize)]
struct LocationConstraint {
    #[serde(rename = "$text")]
    field: String,
}

impl GetBucketLocation<'_> {
    pub async fn send(&self) -> Result<String, Error> {
        validate_bucket_name(self.bucket)?;

        let req = RequestConfig::builder()
            .method(HTTPVerb::Get)
            .bucket_name(self.bucket)
            .query_key("location")
            .build();

        let resp = self.client.executor.request(req).await?;
        let res: LocationConstraint = from_xml(resp.text()?)?;
        Ok(res.field)
    }
}
//endregion

// region:    --- get bucket stat
#[derive(Builder)]
pub struct GetBucketStat<'a> {
    #[builder(start_fn)]
    pub(crate) client: &'a Client,
    pub(crate) bucket: &'a str,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct BucketStat {
    pub storage: u64,
    pub object_count: u64,
    pub multipart_upload_count: u64,
    pub live_channel_count: u64,
    pub last_modified_time: u64,
    pub standard_storage: u64,
    pub standard_object_count: u64,
    pub infrequent_access_storage: u64,
    pub infrequent_access_real_storage: u64,
    pub infrequent_access_object_count: u64,
    pub archive_storage: u64,
    pub archive_real_storage: u64,
    pub archive_object_count: u64,
    pub cold_archive_storage: u64,
    pub cold_archive_real_storage: u64,
    pub cold_archive_object_count: u64,
    pub delete_marker_count: Option<u64>,
    pub deep_cold_archive_storage: Option<u64>,
    pub deep_cold_archive_real_storage: Option<u64>,
    pub deep_cold_archive_object_count: Option<u64>,
}

impl GetBucketStat<'_> {
    pub async fn send(&self) -> Result<BucketStat, Error> {
        validate_bucket_name(self.bucket)?;

        let req = RequestConfig::builder()
            .method(HTTPVerb::Get)
            .bucket_name(self.bucket)
            .query_key("stat")
            .build();

        let resp = self.client.executor.request(req).await?;
        from_xml(resp.text()?)
    }
}
// endregion: --- get bucket stat

impl Client {
    pub fn put_bucket(&self) -> PutBucketBuilder<'_> {
        PutBucket::builder(self)
    }

    /// 删除空的bucket，bucket中还有object时返回`BucketNotEmpty`错误
    pub async fn delete_bucket(&self, bucket: &str) -> Result<(), Error> {
        validate_bucket_name(bucket)?;

        let req = RequestConfig::builder()
            .method(HTTPVerb::Delete)
            .bucket_name(bucket)
            .build();

        self.executor.request(req).await?;
        Ok(())
    }

    pub fn list_objects_v2(&self) -> ListObjectsV2Builder<'_> {
        ListObjectsV2::builder(self)
    }

    pub fn get_bucket_info(&self) -> GetBucketInfoBuilder<'_> {
        GetBucketInfo::builder(self)
    }

    pub fn get_bucket_location(&self) -> GetBucketLocationBuilder<'_> {
        GetBucketLocation::builder(self)
    }

    pub fn get_bucket_stat(&self) -> GetBucketStatBuilder<'_> {
        GetBucketStat::builder(self)
    }
}

#[test]
fn list_bucket_result_single_content_test() {
    let xml = r#"<ListBucketResult>
  <Name>examplebucket</Name>
  <Prefix>a/</Prefix>
  <MaxKeys>100</MaxKeys>
  <Delimiter>/</Delimiter>
  <IsTruncated>false</IsTruncated>
  <Contents>
    <Key>a/b.txt</Key>
    <LastModified>2020-06-22T11:42:32.000Z</LastModified>
    <ETag>"5B3C1A2E053D763E1B002CC607C5A0FE1****"</ETag>
    <Type>Normal</Type>
    <Size>344606</Size>
    <StorageClass>Standard</StorageClass>
  </Contents>
  <CommonPrefixes>
    <Prefix>a/c/</Prefix>
  </CommonPrefixes>
  <KeyCount>2</KeyCount>
</ListBucketResult>"#;
    let res: ListBucketResult = from_xml(xml).unwrap();
    assert_eq!(res.contents.len(), 1);
    assert_eq!(res.contents[0].key, "a/b.txt");
    assert_eq!(res.contents[0].size, 344606);
    assert_eq!(res.common_prefixes.len(), 1);
    assert_eq!(res.common_prefixes[0].prefix, "a/c/");
    assert!(!res.is_truncated);
}
