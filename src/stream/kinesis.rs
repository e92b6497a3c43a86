//! Kinesis JSON protocol client
//!
//! Talks to a Kinesis-compatible endpoint (LocalStack or similar) with plain
//! HTTP POSTs. Requests carry a credential scope so the endpoint can route by
//! region, but are not signed.

use super::{PutRecordOutput, PutRecordsOutput, RecordEntry, StreamService, StreamStatus};
use crate::error::ServiceError;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const TARGET_PREFIX: &str = "Kinesis_20131202";
const AMZ_JSON: &str = "application/x-amz-json-1.1";

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeStreamInput<'a> {
    stream_name: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeStreamOutput {
    stream_description: StreamDescription,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StreamDescription {
    stream_status: StreamStatus,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateStreamInput<'a> {
    stream_name: &'a str,
    shard_count: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct PutRecordInput<'a> {
    stream_name: &'a str,
    data: String,
    partition_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct PutRecordsInput<'a> {
    stream_name: &'a str,
    records: Vec<PutRecordsRequestEntry>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct PutRecordsRequestEntry {
    data: String,
    partition_key: String,
}

impl From<RecordEntry> for PutRecordsRequestEntry {
    fn from(entry: RecordEntry) -> Self {
        Self {
            data: BASE64.encode(&entry.data),
            partition_key: entry.partition_key,
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(rename = "__type", default)]
    error_type: Option<String>,
    #[serde(alias = "Message", default)]
    message: Option<String>,
}

/// HTTP client for a Kinesis-compatible endpoint
#[derive(Clone)]
pub struct KinesisClient {
    http: reqwest::Client,
    endpoint: String,
    region: String,
    access_key_id: String,
}

impl KinesisClient {
    /// Create a client for `endpoint` with a per-request timeout
    pub fn new(
        endpoint: &str,
        region: &str,
        access_key_id: &str,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            region: region.to_string(),
            access_key_id: access_key_id.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn authorization(&self) -> String {
        format!(
            "AWS4-HMAC-SHA256 Credential={}/{}/{}/kinesis/aws4_request, \
             SignedHeaders=content-type;host;x-amz-target, Signature=unsigned",
            self.access_key_id,
            Utc::now().format("%Y%m%d"),
            self.region
        )
    }

    async fn call<I: Serialize, O: DeserializeOwned>(
        &self,
        operation: &str,
        input: &I,
    ) -> Result<O, ServiceError> {
        let body = self.send(operation, input).await?;
        serde_json::from_slice(&body).map_err(|e| ServiceError::Codec(e.to_string()))
    }

    async fn send<I: Serialize>(&self, operation: &str, input: &I) -> Result<Vec<u8>, ServiceError> {
        let payload = serde_json::to_vec(input).map_err(|e| ServiceError::Codec(e.to_string()))?;

        let response = self
            .http
            .post(&self.endpoint)
            .header("X-Amz-Target", format!("{}.{}", TARGET_PREFIX, operation))
            .header("X-Amz-Date", Utc::now().format("%Y%m%dT%H%M%SZ").to_string())
            .header(CONTENT_TYPE, AMZ_JSON)
            .header(AUTHORIZATION, self.authorization())
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        debug!(operation, status = status.as_u16(), "Kinesis call completed");

        if status.is_success() {
            Ok(body.to_vec())
        } else {
            Err(decode_error(status.as_u16(), &body))
        }
    }
}

/// Turn an error response into a typed service error.
fn decode_error(status: u16, body: &[u8]) -> ServiceError {
    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(ErrorBody {
            error_type: Some(error_type),
            message,
        }) => {
            // "com.amazonaws.kinesis.v20131202#ResourceNotFoundException"
            let code = error_type.rsplit('#').next().unwrap_or(&error_type);
            ServiceError::from_code(code, message.unwrap_or_default())
        }
        _ => ServiceError::Api {
            code: format!("HTTP{}", status),
            message: String::from_utf8_lossy(body).into_owned(),
        },
    }
}

#[async_trait]
impl StreamService for KinesisClient {
    async fn describe_stream(&self, stream_name: &str) -> Result<StreamStatus, ServiceError> {
        let output: DescribeStreamOutput = self
            .call("DescribeStream", &DescribeStreamInput { stream_name })
            .await?;
        Ok(output.stream_description.stream_status)
    }

    async fn create_stream(&self, stream_name: &str, shard_count: u32) -> Result<(), ServiceError> {
        // CreateStream answers with an empty body
        self.send(
            "CreateStream",
            &CreateStreamInput {
                stream_name,
                shard_count,
            },
        )
        .await?;
        Ok(())
    }

    async fn put_record(
        &self,
        stream_name: &str,
        entry: RecordEntry,
    ) -> Result<PutRecordOutput, ServiceError> {
        let input = PutRecordInput {
            stream_name,
            data: BASE64.encode(&entry.data),
            partition_key: entry.partition_key,
        };
        self.call("PutRecord", &input).await
    }

    async fn put_records(
        &self,
        stream_name: &str,
        entries: Vec<RecordEntry>,
    ) -> Result<PutRecordsOutput, ServiceError> {
        let input = PutRecordsInput {
            stream_name,
            records: entries.into_iter().map(PutRecordsRequestEntry::from).collect(),
        };
        self.call("PutRecords", &input).await
    }

    fn service_name(&self) -> &'static str {
        "kinesis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Answer one request with a canned response and return the raw request
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            while !request_complete(&request) {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                AMZ_JSON,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;

            String::from_utf8_lossy(&request).into_owned()
        });

        (endpoint, handle)
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        request.len() >= header_end + 4 + content_length
    }

    fn client(endpoint: &str) -> KinesisClient {
        KinesisClient::new(endpoint, "us-east-1", "test", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_describe_stream_request() {
        let (endpoint, server) = serve_once(
            "200 OK",
            r#"{"StreamDescription":{"StreamName":"fraud","StreamStatus":"ACTIVE"}}"#,
        )
        .await;

        let status = client(&endpoint).describe_stream("fraud").await.unwrap();
        assert_eq!(status, StreamStatus::Active);

        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with("post / http/1.1"), "{}", request);
        assert!(request.contains("x-amz-target: kinesis_20131202.describestream"));
        assert!(request.contains("content-type: application/x-amz-json-1.1"));
        assert!(request.contains("credential=test/"));
        assert!(request.contains("/us-east-1/kinesis/aws4_request"));
        assert!(request.ends_with(r#"{"streamname":"fraud"}"#));
    }

    #[tokio::test]
    async fn test_error_response_maps_to_typed_error() {
        let (endpoint, server) = serve_once(
            "400 Bad Request",
            r#"{"__type":"ResourceNotFoundException","message":"Stream fraud not found"}"#,
        )
        .await;

        let err = client(&endpoint).describe_stream("fraud").await.unwrap_err();
        assert_eq!(
            err,
            ServiceError::ResourceNotFound("Stream fraud not found".to_string())
        );
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_create_stream_accepts_empty_body() {
        let (endpoint, server) = serve_once("200 OK", "").await;

        client(&endpoint).create_stream("fraud", 2).await.unwrap();

        let request = server.await.unwrap().to_lowercase();
        assert!(request.contains("x-amz-target: kinesis_20131202.createstream"));
        assert!(request.ends_with(r#"{"streamname":"fraud","shardcount":2}"#));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let err = client(&endpoint).describe_stream("fraud").await.unwrap_err();
        assert!(matches!(err, ServiceError::Transport(_)));
    }

    #[test]
    fn test_decode_typed_errors() {
        let body = br#"{"__type":"com.amazonaws.kinesis.v20131202#ResourceNotFoundException","message":"Stream fraud not found"}"#;
        assert_eq!(
            decode_error(400, body),
            ServiceError::ResourceNotFound("Stream fraud not found".to_string())
        );

        let body = br#"{"__type":"ResourceInUseException","Message":"Stream fraud already exists"}"#;
        assert_eq!(
            decode_error(400, body),
            ServiceError::ResourceInUse("Stream fraud already exists".to_string())
        );
    }

    #[test]
    fn test_decode_untyped_error() {
        let err = decode_error(502, b"Bad Gateway");
        assert_eq!(
            err,
            ServiceError::Api {
                code: "HTTP502".to_string(),
                message: "Bad Gateway".to_string(),
            }
        );
    }

    #[test]
    fn test_put_records_request_body() {
        let input = PutRecordsInput {
            stream_name: "fraud-transactions",
            records: vec![PutRecordsRequestEntry::from(RecordEntry {
                data: b"{\"a\":1}".to_vec(),
                partition_key: "T1".to_string(),
            })],
        };

        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["StreamName"], "fraud-transactions");
        assert_eq!(json["Records"][0]["Data"], "eyJhIjoxfQ==");
        assert_eq!(json["Records"][0]["PartitionKey"], "T1");
    }

    #[test]
    fn test_put_records_response() {
        let body = r#"{
            "FailedRecordCount": 1,
            "Records": [
                {"SequenceNumber": "1", "ShardId": "shardId-000000000000"},
                {"ErrorCode": "ProvisionedThroughputExceededException", "ErrorMessage": "Rate exceeded"}
            ]
        }"#;

        let output: PutRecordsOutput = serde_json::from_str(body).unwrap();
        assert_eq!(output.failed_record_count, 1);
        assert!(!output.records[0].is_failed());
        assert!(output.records[1].is_failed());
    }

    #[test]
    fn test_describe_stream_response() {
        let body = r#"{"StreamDescription": {"StreamName": "s", "StreamStatus": "CREATING", "Shards": []}}"#;
        let output: DescribeStreamOutput = serde_json::from_str(body).unwrap();
        assert_eq!(output.stream_description.stream_status, StreamStatus::Creating);
    }
}
