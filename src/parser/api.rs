use std::collections::HashMap;

/// Client for the external PDF parsing service. Text extraction is delegated
/// entirely to this API; only chunking happens locally.
pub struct ApiParser {
    parse_api_url: String,
    http_client: reqwest::Client,
}

impl ApiParser {
    pub fn new(parse_api_url: &str, timeout_secs: u64) -> Self {
        Self {
            parse_api_url: parse_api_url.trim_end_matches('/').to_string(),
            http_client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Send document bytes to the parse endpoint; returns extracted text and
    /// document-level metadata.
    pub async fn parse_document(
        &self,
        file_bytes: &[u8],
        filename: &str,
    ) -> anyhow::Result<(String, HashMap<String, serde_json::Value>)> {
        let url = format!("{}/parse", self.parse_api_url);

        let part =
            reqwest::multipart::Part::bytes(file_bytes.to_vec()).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let resp = self.http_client.post(&url).multipart(form).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Parser API error ({status}): {body}");
        }

        let result: serde_json::Value = resp.json().await?;
        let text = result
            .get("text")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let metadata: HashMap<String, serde_json::Value> = result
            .get("metadata")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();

        Ok((text, metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_parse_document() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/parse"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "text": "Extracted page text.",
                "metadata": {"pages": 3}
            })))
            .mount(&server)
            .await;

        let parser = ApiParser::new(&server.uri(), 30);
        let (text, metadata) = parser.parse_document(b"%PDF-1.4", "doc.pdf").await.unwrap();
        assert_eq!(text, "Extracted page text.");
        assert_eq!(metadata.get("pages").unwrap(), 3);
    }

    #[tokio::test]
    async fn test_parse_document_error_surfaces_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/parse"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let parser = ApiParser::new(&server.uri(), 30);
        let err = parser
            .parse_document(b"%PDF-1.4", "doc.pdf")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Parser API error"));
    }
}
