use async_trait::async_trait;
use oss_sdk::object::{OssMetaExt, PutObjectBody};
use oss_sdk::{Client, ClientConfig, Error, HTTPVerb, HttpTransport, RequestConfig};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_stream::StreamExt;

struct RecordedRequest {
    method: String,
    url: String,
    headers: BTreeMap<String, String>,
    body: Option<Vec<u8>>,
}

impl RecordedRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

struct StubResponse {
    status: u16,
    headers: Vec<(&'static str, &'static str)>,
    body: Vec<u8>,
}

fn stub_response(status: u16, body: &str) -> StubResponse {
    StubResponse {
        status,
        headers: Vec::new(),
        body: body.as_bytes().to_vec(),
    }
}

/// 记录收到的请求，按顺序返回预先设置的响应
#[derive(Default)]
struct StubTransport {
    requests: Mutex<Vec<RecordedRequest>>,
    responses: Mutex<VecDeque<StubResponse>>,
    delay: Option<Duration>,
    // 响应体发送完后返回一个连接错误
    broken_body: bool,
}

impl StubTransport {
    fn new(responses: Vec<StubResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            ..Default::default()
        })
    }

    fn requests(&self) -> std::sync::MutexGuard<'_, Vec<RecordedRequest>> {
        self.requests.lock().unwrap()
    }
}

#[async_trait]
impl HttpTransport for StubTransport {
    async fn execute(
        &self,
        request: reqwest::Request,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let headers = request
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().to_owned(), v.to_str().unwrap().to_owned()))
            .collect();
        self.requests.lock().unwrap().push(RecordedRequest {
            method: request.method().to_string(),
            url: request.url().to_string(),
            headers,
            body: request
                .body()
                .and_then(|b| b.as_bytes())
                .map(|b| b.to_vec()),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let stub = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("no stub response left");
        let mut builder = http::Response::builder().status(stub.status);
        for (k, v) in stub.headers {
            builder = builder.header(k, v);
        }
        let body = if self.broken_body {
            reqwest::Body::wrap_stream(tokio_stream::iter(vec![
                Ok(bytes::Bytes::from(stub.body)),
                Err(std::io::Error::other("connection reset")),
            ]))
        } else {
            reqwest::Body::from(stub.body)
        };
        Ok(reqwest::Response::from(builder.body(body).unwrap()))
    }
}

fn get_conf() -> ClientConfig {
    let file_str = std::fs::read_to_string("tests/oss/config.sample.toml").unwrap();
    toml::from_str(&file_str).unwrap()
}

fn get_oss_client(transport: Arc<StubTransport>) -> Client {
    Client::builder()
        .config(get_conf())
        .transport(transport)
        .build()
        .unwrap()
}

#[test]
fn config_from_toml_test() {
    let conf = get_conf();
    assert_eq!(conf.region(), "cn-hangzhou");
    assert_eq!(conf.endpoint(), "oss-cn-hangzhou.aliyuncs.com");
    assert_eq!(conf.timeout(), Some(Duration::from_millis(5000)));
    assert!(conf.secure());
    assert!(!conf.cname());
    assert_eq!(conf.security_token(), None);
}

// region:    --- 状态码分类
#[tokio::test]
async fn server_error_test() {
    let stub = StubTransport::new(vec![stub_response(503, "")]);
    let client = get_oss_client(stub.clone());

    let res = client.get_bucket_location().bucket("examplebucket").build().send().await;
    assert!(matches!(res, Err(Error::Server { status: 503 })));
    assert_eq!(stub.requests().len(), 1);
}

#[tokio::test]
async fn client_error_test() {
    let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<Error>
  <Code>NoSuchKey</Code>
  <Message>The specified key does not exist.</Message>
  <RequestId>5C3D9175B6FC201293AD****</RequestId>
  <HostId>examplebucket.oss-cn-hangzhou.aliyuncs.com</HostId>
</Error>"#;
    let stub = StubTransport::new(vec![stub_response(404, body)]);
    let client = get_oss_client(stub.clone());

    let res = client
        .get_object()
        .bucket("examplebucket")
        .build()
        .receive_bytes("missing.txt")
        .await;
    match res {
        Err(Error::Client(e)) => {
            assert_eq!(e.code(), "NoSuchKey");
            assert_eq!(e.request_id(), "5C3D9175B6FC201293AD****");
            assert_eq!(e.status(), 404);
        }
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("expected error"),
    }
}

#[tokio::test]
async fn unknown_error_test() {
    let stub = StubTransport::new(vec![stub_response(404, "")]);
    let client = get_oss_client(stub.clone());

    let res = client.delete_object("examplebucket", "a.txt").await;
    assert!(matches!(res, Err(Error::Unknown { status: 404 })));
}

#[tokio::test]
async fn null_response_body_test() {
    let stub = StubTransport::new(vec![stub_response(204, "")]);
    let client = get_oss_client(stub.clone());

    let res = client
        .get_object()
        .bucket("examplebucket")
        .build()
        .receive_bytes("a.txt")
        .await;
    assert!(matches!(res, Err(Error::NullResponseBody)));
}

#[tokio::test]
async fn timeout_test() {
    let stub = Arc::new(StubTransport {
        responses: Mutex::new(vec![stub_response(200, "")].into()),
        delay: Some(Duration::from_millis(500)),
        ..Default::default()
    });
    let conf: ClientConfig = toml::from_str(
        r#"
region = "cn-hangzhou"
endpoint = "oss-cn-hangzhou.aliyuncs.com"
access_key_id = "ak"
access_key_secret = "sk"
timeout_ms = 20
"#,
    )
    .unwrap();
    let client = Client::builder()
        .config(conf)
        .transport(stub.clone())
        .build()
        .unwrap();

    let res = client.delete_bucket("examplebucket").await;
    assert!(matches!(res, Err(Error::Timeout)));
}
// endregion: --- 状态码分类

#[tokio::test]
async fn validation_before_network_test() {
    let stub = StubTransport::new(Vec::new());
    let client = get_oss_client(stub.clone());

    let res = client.delete_bucket("Bad_Bucket").await;
    assert!(matches!(res, Err(Error::Validation(_))));

    let res = client.delete_object("examplebucket", "").await;
    assert!(matches!(res, Err(Error::Validation(_))));

    let res = client
        .put_object()
        .bucket("examplebucket")
        .build()
        .send("a.txt", PutObjectBody::FilePath(std::path::Path::new("  ")))
        .await;
    assert!(matches!(res, Err(Error::Validation(_))));

    let res = client
        .put_object()
        .bucket("examplebucket")
        .build()
        .send(
            "a.txt",
            PutObjectBody::FilePath(std::path::Path::new("/no/such/file.txt")),
        )
        .await;
    assert!(matches!(res, Err(Error::Io { .. })));

    assert_eq!(stub.requests().len(), 0);
}

#[tokio::test]
async fn list_buckets_send_all_test() {
    let page1 = r#"<ListAllMyBucketsResult>
  <IsTruncated>true</IsTruncated>
  <NextMarker>m1</NextMarker>
  <Buckets>
    <Bucket>
      <CreationDate>2014-05-14T11:18:32.000Z</CreationDate>
      <Location>oss-cn-hangzhou</Location>
      <Name>bucket-a</Name>
    </Bucket>
  </Buckets>
</ListAllMyBucketsResult>"#;
    let page2 = r#"<ListAllMyBucketsResult>
  <IsTruncated>false</IsTruncated>
  <Buckets>
    <Bucket>
      <CreationDate>2014-05-14T11:18:32.000Z</CreationDate>
      <Location>oss-cn-hangzhou</Location>
      <Name>bucket-b</Name>
    </Bucket>
    <Bucket>
      <CreationDate>2014-05-14T11:18:32.000Z</CreationDate>
      <Location>oss-cn-beijing</Location>
      <Name>bucket-c</Name>
    </Bucket>
  </Buckets>
</ListAllMyBucketsResult>"#;
    let stub = StubTransport::new(vec![stub_response(200, page1), stub_response(200, page2)]);
    let client = get_oss_client(stub.clone());

    let buckets = client.list_buckets().build().send_all().await.unwrap();
    let names: Vec<&str> = buckets.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, ["bucket-a", "bucket-b", "bucket-c"]);

    let requests = stub.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].url, "https://oss-cn-hangzhou.aliyuncs.com/");
    assert_eq!(
        requests[1].url,
        "https://oss-cn-hangzhou.aliyuncs.com/?marker=m1"
    );
}

#[tokio::test]
async fn list_objects_v2_send_all_test() {
    let page1 = r#"<ListBucketResult>
  <Name>examplebucket</Name>
  <IsTruncated>true</IsTruncated>
  <NextContinuationToken>token-1</NextContinuationToken>
  <Contents>
    <Key>a.txt</Key>
    <LastModified>2020-06-22T11:42:32.000Z</LastModified>
    <ETag>"A"</ETag>
    <Size>1</Size>
  </Contents>
</ListBucketResult>"#;
    let page2 = r#"<ListBucketResult>
  <Name>examplebucket</Name>
  <IsTruncated>false</IsTruncated>
  <Contents>
    <Key>b.txt</Key>
    <LastModified>2020-06-22T11:42:32.000Z</LastModified>
    <ETag>"B"</ETag>
    <Size>2</Size>
  </Contents>
  <CommonPrefixes>
    <Prefix>dir/</Prefix>
  </CommonPrefixes>
</ListBucketResult>"#;
    let stub = StubTransport::new(vec![stub_response(200, page1), stub_response(200, page2)]);
    let client = get_oss_client(stub.clone());

    let listing = client
        .list_objects_v2()
        .bucket("examplebucket")
        .delimiter("/")
        .max_keys(1)
        .build()
        .send_all()
        .await
        .unwrap();
    let keys: Vec<&str> = listing.contents.iter().map(|c| c.key.as_str()).collect();
    assert_eq!(keys, ["a.txt", "b.txt"]);
    assert_eq!(listing.common_prefixes, ["dir/"]);

    let requests = stub.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[0].url,
        "https://examplebucket.oss-cn-hangzhou.aliyuncs.com/?delimiter=%2F&list-type=2&max-keys=1"
    );
    assert_eq!(
        requests[1].url,
        "https://examplebucket.oss-cn-hangzhou.aliyuncs.com/?continuation-token=token-1&delimiter=%2F&list-type=2&max-keys=1"
    );
}

#[tokio::test]
async fn put_object_from_file_test() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("upload.txt");
    std::fs::write(&path, b"0123456789").unwrap();

    let stub = StubTransport::new(vec![StubResponse {
        status: 200,
        headers: vec![("etag", "\"781E5E245D69B566979B86E28D23F2C7\"")],
        body: Vec::new(),
    }]);
    let client = get_oss_client(stub.clone());

    let res = client
        .put_object()
        .bucket("examplebucket")
        .content_type("text/plain")
        .x_meta("author", "alice")
        .build()
        .send("dir/upload.txt", PutObjectBody::FilePath(&path))
        .await
        .unwrap();
    assert_eq!(
        res.etag.as_deref(),
        Some("\"781E5E245D69B566979B86E28D23F2C7\"")
    );

    let requests = stub.requests();
    let req = &requests[0];
    assert_eq!(req.method, "PUT");
    assert_eq!(
        req.url,
        "https://examplebucket.oss-cn-hangzhou.aliyuncs.com/dir/upload.txt"
    );
    assert_eq!(req.header("content-md5"), Some("eB5eJF1ptWaXm4bijSPyxw=="));
    assert_eq!(req.header("content-length"), Some("10"));
    assert_eq!(req.header("x-oss-meta-author"), Some("alice"));
    let auth = req.header("authorization").unwrap();
    assert!(auth.contains(
        "AdditionalHeaders=content-md5;content-type;host;x-oss-content-sha256;x-oss-date;x-oss-meta-author,"
    ));
    // 文件以流的方式上传
    assert!(req.body.is_none());
}

#[tokio::test]
async fn put_object_bytes_test() {
    let stub = StubTransport::new(vec![stub_response(200, "")]);
    let client = get_oss_client(stub.clone());

    client
        .put_object()
        .bucket("examplebucket")
        .build()
        .send("a.txt", PutObjectBody::Bytes(b"0123456789".to_vec()))
        .await
        .unwrap();

    let requests = stub.requests();
    assert_eq!(requests[0].body.as_deref(), Some(&b"0123456789"[..]));
    assert_eq!(
        requests[0].header("content-md5"),
        Some("eB5eJF1ptWaXm4bijSPyxw==")
    );
}

#[tokio::test]
async fn download_to_file_test() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("download.txt");

    let stub = StubTransport::new(vec![StubResponse {
        status: 200,
        headers: vec![
            ("etag", "\"abc\""),
            ("content-length", "11"),
            ("content-type", "text/plain"),
            ("x-oss-meta-author", "alice"),
        ],
        body: b"hello world".to_vec(),
    }]);
    let client = get_oss_client(stub.clone());

    let header = client
        .get_object()
        .bucket("examplebucket")
        .range("bytes=0-10")
        .response_content_type("text/plain")
        .build()
        .download_to_file("dir/hello.txt", &path)
        .await
        .unwrap();
    assert_eq!(header.etag, "\"abc\"");
    assert_eq!(header.content_length, Some(11));
    assert_eq!(header.custom_x_oss_meta["author"], "alice");
    assert_eq!(std::fs::read(&path).unwrap(), b"hello world");

    let requests = stub.requests();
    assert_eq!(requests[0].header("range"), Some("bytes=0-10"));
    assert_eq!(
        requests[0].url,
        "https://examplebucket.oss-cn-hangzhou.aliyuncs.com/dir/hello.txt?response-content-type=text%2Fplain"
    );
}

#[tokio::test]
async fn download_to_file_removes_partial_file_test() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("partial.txt");

    let stub = Arc::new(StubTransport {
        responses: Mutex::new(VecDeque::from([StubResponse {
            status: 200,
            headers: vec![("etag", "\"abc\""), ("content-length", "100")],
            body: b"first half".to_vec(),
        }])),
        broken_body: true,
        ..Default::default()
    });
    let client = get_oss_client(stub.clone());

    let res = client
        .get_object()
        .bucket("examplebucket")
        .build()
        .download_to_file("dir/hello.txt", &path)
        .await;
    assert!(res.is_err());
    assert!(!path.exists());
}

#[tokio::test]
async fn receive_bytes_stream_test() {
    let stub = StubTransport::new(vec![StubResponse {
        status: 200,
        headers: vec![("etag", "\"abc\"")],
        body: b"streamed".to_vec(),
    }]);
    let client = get_oss_client(stub.clone());

    let (mut stream, header) = client
        .get_object()
        .bucket("examplebucket")
        .build()
        .receive_bytes_stream("a.txt")
        .await
        .unwrap();
    assert_eq!(header.etag, "\"abc\"");

    let mut data = Vec::new();
    while let Some(chunk) = stream.next().await {
        data.extend_from_slice(&chunk.unwrap());
    }
    assert_eq!(data, b"streamed");
}

#[tokio::test]
async fn head_object_test() {
    let stub = StubTransport::new(vec![StubResponse {
        status: 200,
        headers: vec![
            ("etag", "\"abc\""),
            ("content-length", "344606"),
            ("x-oss-object-type", "Normal"),
            ("x-oss-storage-class", "Standard"),
            ("x-oss-meta-author", "alice"),
            ("x-oss-meta-owner", "张三"),
        ],
        body: Vec::new(),
    }]);
    let client = get_oss_client(stub.clone());

    let header = client
        .head_object()
        .bucket("examplebucket")
        .build()
        .send("a.txt")
        .await
        .unwrap();
    assert_eq!(header.content_length, Some(344606));
    assert_eq!(header.x_oss_object_type.as_deref(), Some("Normal"));
    assert_eq!(header.custom_x_oss_meta["author"], "alice");
    assert_eq!(header.custom_x_oss_meta["owner"], "张三");
    assert_eq!(stub.requests()[0].method, "HEAD");
}

#[tokio::test]
async fn append_object_test() {
    let stub = StubTransport::new(vec![StubResponse {
        status: 200,
        headers: vec![("x-oss-next-append-position", "10")],
        body: Vec::new(),
    }]);
    let client = get_oss_client(stub.clone());

    let res = client
        .append_object()
        .bucket("examplebucket")
        .build()
        .send("log.txt", 0, b"0123456789".to_vec())
        .await
        .unwrap();
    assert_eq!(res.x_oss_next_append_position, 10);

    let requests = stub.requests();
    assert_eq!(requests[0].method, "POST");
    assert_eq!(
        requests[0].url,
        "https://examplebucket.oss-cn-hangzhou.aliyuncs.com/log.txt?append&position=0"
    );
}

#[tokio::test]
async fn copy_object_test() {
    let body = r#"<CopyObjectResult>
  <ETag>"5B3C1A2E053D763E1B002CC607C5****"</ETag>
  <LastModified>2019-04-09T03:45:32.000Z</LastModified>
</CopyObjectResult>"#;
    let stub = StubTransport::new(vec![stub_response(200, body)]);
    let client = get_oss_client(stub.clone());

    let res = client
        .copy_object()
        .bucket("dest-bucket")
        .source_bucket("src-bucket")
        .source_key("dir/a b.txt")
        .build()
        .send("copy.txt")
        .await
        .unwrap();
    assert_eq!(res.last_modified, "2019-04-09T03:45:32.000Z");
    assert_eq!(
        stub.requests()[0].header("x-oss-copy-source"),
        Some("/src-bucket/dir/a%20b.txt")
    );
}

#[tokio::test]
async fn delete_multiple_objects_test() {
    let body = r#"<DeleteResult>
  <Deleted><Key>a.txt</Key></Deleted>
  <Deleted><Key>b.txt</Key></Deleted>
</DeleteResult>"#;
    let stub = StubTransport::new(vec![stub_response(200, body)]);
    let client = get_oss_client(stub.clone());

    let res = client
        .delete_multiple_objects()
        .bucket("examplebucket")
        .objects(vec!["a.txt".into(), "b.txt".into()])
        .build()
        .send()
        .await
        .unwrap();
    assert_eq!(res.deleted.len(), 2);

    let requests = stub.requests();
    assert_eq!(
        requests[0].url,
        "https://examplebucket.oss-cn-hangzhou.aliyuncs.com/?delete"
    );
    let sent = String::from_utf8(requests[0].body.clone().unwrap()).unwrap();
    assert!(sent.contains("<Object><Key>a.txt</Key></Object>"));
    assert!(requests[0].header("content-md5").is_some());
}

#[tokio::test]
async fn security_token_header_test() {
    let mut conf = get_conf_toml();
    conf.push_str("security_token = \"sts-token\"\n");
    let conf: ClientConfig = toml::from_str(&conf).unwrap();
    let stub = StubTransport::new(vec![stub_response(200, "")]);
    let client = Client::builder()
        .config(conf)
        .transport(stub.clone())
        .build()
        .unwrap();

    client.delete_object("examplebucket", "a.txt").await.unwrap();
    let requests = stub.requests();
    assert_eq!(requests[0].header("x-oss-security-token"), Some("sts-token"));
    assert!(
        requests[0]
            .header("authorization")
            .unwrap()
            .contains(";x-oss-security-token,")
    );
}

fn get_conf_toml() -> String {
    std::fs::read_to_string("tests/oss/config.sample.toml").unwrap()
}

#[tokio::test]
async fn request_rejects_relative_object_key_test() {
    let stub = StubTransport::new(Vec::new());
    let client = get_oss_client(stub.clone());

    for key in ["a/../b.txt", "a/./b.txt", "a//b.txt"] {
        let req = RequestConfig::builder()
            .method(HTTPVerb::Get)
            .bucket_name("examplebucket")
            .object_key(key)
            .build();
        let res = client.request(req).await;
        assert!(matches!(res, Err(Error::Validation(_))), "{key}");
    }

    let req = RequestConfig::builder()
        .method(HTTPVerb::Get)
        .bucket_name("")
        .build();
    let res = client.request(req).await;
    assert!(matches!(res, Err(Error::Validation(_))));

    assert!(stub.requests().is_empty());
}

#[tokio::test]
async fn raw_request_test() {
    let stub = StubTransport::new(vec![stub_response(200, "<Ok/>")]);
    let client = get_oss_client(stub.clone());

    let req = RequestConfig::builder()
        .method(HTTPVerb::Get)
        .bucket_name("examplebucket")
        .query_key("acl")
        .build();
    let resp = client.request(req).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().unwrap(), "<Ok/>");
    assert_eq!(
        stub.requests()[0].url,
        "https://examplebucket.oss-cn-hangzhou.aliyuncs.com/?acl"
    );
}

#[tokio::test]
async fn concurrent_requests_are_independent_test() {
    let stub = StubTransport::new(vec![stub_response(200, ""), stub_response(200, "")]);
    let client = get_oss_client(stub.clone());
    let other = client.clone();

    let (a, b) = tokio::join!(
        client.delete_object("examplebucket", "a.txt"),
        other.delete_object("examplebucket", "b.txt")
    );
    assert!(a.is_ok() && b.is_ok());
    assert_eq!(stub.requests().len(), 2);
}

#[test]
fn presign_url_test() {
    let stub = StubTransport::new(Vec::new());
    let client = get_oss_client(stub);

    let url = client
        .presign_url()
        .bucket("examplebucket")
        .object_key("a.txt")
        .expires(600)
        .query("versionId", "v1")
        .build()
        .generate()
        .unwrap();
    assert!(url.starts_with("https://examplebucket.oss-cn-hangzhou.aliyuncs.com/a.txt?versionId=v1&x-oss-credential=LTAI5tExampleKeyId%2F"));
    assert!(url.contains("&x-oss-expires=600&"));
    assert!(url.contains("&x-oss-signature-version=OSS4-HMAC-SHA256&x-oss-signature="));
}
