use crate::Error;
use serde::de::DeserializeOwned;

pub(crate) fn from_xml<T: DeserializeOwned>(text: &str) -> Result<T, Error> {
    quick_xml::de::from_str(text).map_err(|e| Error::Xml(format!("XML parse error: {}", e)))
}

/// 生成一个`deserialize_with`函数，把`<Wrapper><Tag/>...</Wrapper>`展开为`Vec<Item>`
///
/// 不论子元素出现0次、1次还是多次都得到`Vec`，字段上需要同时加`#[serde(default)]`以处理外层元素不存在的情况。
/// 直接重复出现的元素（没有外层包裹，如`<Contents>`）用`#[serde(default)] Vec<T>`即可。
macro_rules! xml_list {
    ($fn_name:ident, $item:ty, $tag:literal) => {
        fn $fn_name<'de, D>(deserializer: D) -> Result<Vec<$item>, D::Error>
        where
            D: serde::Deserializer<'de>,
        {
            #[derive(serde::Deserialize)]
            struct Wrapper {
                #[serde(rename = $tag, default)]
                items: Vec<$item>,
            }
            let helper = <Wrapper as serde::Deserialize>::deserialize(deserializer)?;
            Ok(helper.items)
        }
    };
}

pub(crate) use xml_list;
