//! [DescribeRegions](https://help.aliyun.com/zh/oss/developer-reference/describeregions)

use crate::sign_v4::HTTPVerb;
use crate::xml::from_xml;
use crate::{Client, Error, RequestConfig};
use bon::Builder;
use serde::Deserialize;

#[derive(Builder)]
pub struct DescribeRegions<'a> {
    #[builder(start_fn)]
    pub(crate) client: &'a Client,
    /// 如：`oss-cn-hangzhou`
    pub(crate) region: Option<&'a str>,
}

// <RegionInfoList><RegionInfo/>...</RegionInfoList>
#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct RegionInfoList {
    #[serde(default)]
    region_info: Vec<RegionInfo>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct RegionInfo {
    pub region: String,
    pub internet_endpoint: String,
    pub internal_endpoint: String,
    pub accelerate_endpoint: String,
}

impl DescribeRegions<'_> {
    /// - `region`: 如果为`None`，则查询所有支持地域对应的Endpoint信息
    pub async fn send(&self) -> Result<Vec<RegionInfo>, Error> {
        let req = RequestConfig::builder()
            .method(HTTPVerb::Get)
            .query("regions", self.region.unwrap_or_default())
            .build();

        let resp = self.client.executor.request(req).await?;
        let res: RegionInfoList = from_xml(resp.text()?)?;
        Ok(res.region_info)
    }
}

impl Client {
    pub fn describe_regions(&self) -> DescribeRegionsBuilder<'_> {
        DescribeRegions::builder(self)
    }
}

#[test]
fn region_info_list_test() {
    let xml = r#"<RegionInfoList>
  <RegionInfo>
     <Region>oss-cn-hangzhou</Region>
     <InternetEndpoint>oss-cn-hangzhou.aliyuncs.com</InternetEndpoint>
     <InternalEndpoint>oss-cn-hangzhou-internal.aliyuncs.com</InternalEndpoint>
     <AccelerateEndpoint>oss-accelerate.aliyuncs.com</AccelerateEndpoint>
  </RegionInfo>
</RegionInfoList>"#;
    let res: RegionInfoList = from_xml(xml).unwrap();
    assert_eq!(res.region_info.len(), 1);
    assert_eq!(res.region_info[0].region, "oss-cn-hangzhou");
}
