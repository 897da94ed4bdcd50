use crate::Error;
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use sha2::{Digest, Sha256};
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

/// 输出格式: Day, DD Mon YYYY hh:mm:ss GMT
///
/// eg: Thu, 13 Nov 2025 13:32:03 GMT
pub fn gmt_format(date_time: &OffsetDateTime) -> Result<String, Error> {
    // Rfc2822输出的是`+0000`，http头需要`GMT`
    let format = format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
    );
    Ok(date_time.to_offset(UtcOffset::UTC).format(&format)?)
}

/// 输出格式: YYYYMMDD
pub fn utc_date_str(date_time: &OffsetDateTime) -> Result<String, Error> {
    Ok(date_time
        .to_offset(UtcOffset::UTC)
        .format(&format_description!("[year][month][day]"))?)
}

/// 输出格式: YYYYMMDDTHHMMSSZ
///
/// eg: 20240101T000000Z
pub fn utc_date_time_str(date_time: &OffsetDateTime) -> Result<String, Error> {
    Ok(date_time
        .to_offset(UtcOffset::UTC)
        .format(&format_description!("[year][month][day]T[hour][minute][second]Z"))?)
}

pub fn into_header_map<'a>(
    map: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Result<HeaderMap, Error> {
    let mut header_map = HeaderMap::new();
    for (k, v) in map {
        let name = HeaderName::from_bytes(k.as_bytes())
            .map_err(|_| Error::InvalidHeaderName(k.to_owned()))?;
        let value = HeaderValue::from_str(v).map_err(|_| Error::InvalidHeaderValue {
            name: k.to_owned(),
        })?;
        header_map.insert(name, value);
    }
    Ok(header_map)
}

pub fn hmac_sha256(key: &[u8], msg: &[u8]) -> Vec<u8> {
    type HmacSha256 = Hmac<Sha256>;
    // hmac接受任意长度的key
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(msg);
    mac.finalize().into_bytes().to_vec()
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
