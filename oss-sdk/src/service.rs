//! [ListBuckets](https://help.aliyun.com/zh/oss/developer-reference/listbuckets)

use crate::sign_v4::HTTPVerb;
use crate::utils::to_query_map;
use crate::xml::{from_xml, xml_list};
use crate::{Client, Error, RequestConfig};
use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use tracing::debug;

#[serde_as]
#[serde_with::skip_serializing_none]
#[derive(Builder, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ListBuckets<'a> {
    #[builder(start_fn)]
    #[serde(skip_serializing)]
    pub(crate) client: &'a Client,
    // 请求头
    #[serde(skip_serializing)]
    pub(crate) x_oss_resource_group_id: Option<&'a str>,
    // 请求参数
    pub(crate) prefix: Option<&'a str>,
    pub(crate) marker: Option<&'a str>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub(crate) max_keys: Option<u16>,
}

// region:    --- ListBucketResult
/// 如果属性值为`None`，如：`prefix: None`，表示返回的xml中没有该标签`<Prefix/>`。
#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct ListAllMyBucketsResult {
    pub prefix: Option<String>,
    pub marker: Option<String>,
    pub max_keys: Option<u32>,
    #[serde(default)]
    pub is_truncated: bool,
    pub next_marker: Option<String>,
    pub owner: Option<Owner>,
    // xml中为<Buckets><Bucket/>...</Buckets>，这里去掉一层嵌套
    #[serde(default, deserialize_with = "unwrap_buckets")]
    pub buckets: Vec<Bucket>,
}

xml_list!(unwrap_buckets, Bucket, "Bucket");

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct Owner {
    #[serde(rename = "ID")]
    pub id: String,
    pub display_name: String,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct Bucket {
    pub name: String,
    pub creation_date: String,
    pub location: String,
    pub extranet_endpoint: Option<String>,
    pub intranet_endpoint: Option<String>,
    pub region: Option<String>,
    pub storage_class: Option<String>,
    pub resource_group_id: Option<String>,
}
// endregion: --- ListBucketResult

impl ListBuckets<'_> {
    async fn send_page(&self, marker: Option<&str>) -> Result<ListAllMyBucketsResult, Error> {
        let mut query = to_query_map(self)?;
        match marker {
            Some(m) => {
                query.insert("marker".to_owned(), Some(m.to_owned()));
            }
            None => {
                query.remove("marker");
            }
        }

        let mut req = RequestConfig::builder()
            .method(HTTPVerb::Get)
            .queries(query);
        if let Some(s) = self.x_oss_resource_group_id {
            req = req.header("x-oss-resource-group-id", s);
        }

        let resp = self.client.executor.request(req.build()).await?;
        from_xml(resp.text()?)
    }

    /// 只请求一页
    pub async fn send(&self) -> Result<ListAllMyBucketsResult, Error> {
        self.send_page(self.marker).await
    }

    /// 从`marker`开始按顺序逐页请求，直到`IsTruncated`为`false`，返回所有页的bucket
    pub async fn send_all(&self) -> Result<Vec<Bucket>, Error> {
        let mut buckets = Vec::new();
        let mut marker = self.marker.map(str::to_owned);
        loop {
            let page = self.send_page(marker.as_deref()).await?;
            debug!(
                count = page.buckets.len(),
                is_truncated = page.is_truncated,
                "listed bucket page"
            );
            buckets.extend(page.buckets);
            match page.next_marker {
                Some(next) if page.is_truncated && !next.is_empty() => marker = Some(next),
                _ => break,
            }
        }
        Ok(buckets)
    }
}

impl Client {
    pub fn list_buckets(&self) -> ListBucketsBuilder<'_> {
        ListBuckets::builder(self)
    }
}

#[test]
fn list_all_my_buckets_result_test() {
    let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListAllMyBucketsResult>
  <Prefix>my</Prefix>
  <Marker>mybucket</Marker>
  <MaxKeys>10</MaxKeys>
  <IsTruncated>true</IsTruncated>
  <NextMarker>mybucket10</NextMarker>
  <Owner>
    <ID>512**</ID>
    <DisplayName>51264</DisplayName>
  </Owner>
  <Buckets>
    <Bucket>
      <CreationDate>2014-05-14T11:18:32.000Z</CreationDate>
      <ExtranetEndpoint>oss-cn-hangzhou.aliyuncs.com</ExtranetEndpoint>
      <IntranetEndpoint>oss-cn-hangzhou-internal.aliyuncs.com</IntranetEndpoint>
      <Location>oss-cn-hangzhou</Location>
      <Name>mybucket01</Name>
      <Region>cn-hangzhou</Region>
      <StorageClass>Standard</StorageClass>
    </Bucket>
  </Buckets>
</ListAllMyBucketsResult>"#;
    let res: ListAllMyBucketsResult = from_xml(xml).unwrap();
    assert!(res.is_truncated);
    assert_eq!(res.next_marker.as_deref(), Some("mybucket10"));
    assert_eq!(res.buckets.len(), 1);
    assert_eq!(res.buckets[0].name, "mybucket01");
    assert_eq!(res.owner.unwrap().id, "512**");
}
