//! DNS domains and their records

use super::{ApiError, Client};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Domain {
    pub domain: String,
    #[serde(default)]
    pub date_created: String,
    /// "enabled" or "disabled"
    #[serde(default)]
    pub dns_sec: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DomainCreateRequest {
    pub domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_sec: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DomainUpdateRequest {
    pub dns_sec: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub data: String,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub ttl: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DomainRecordRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub record_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct DomainWrapper {
    domain: Domain,
}

#[derive(Debug, Deserialize)]
struct RecordWrapper {
    record: DomainRecord,
}

pub struct DomainsApi<'a> {
    client: &'a Client,
}

impl<'a> DomainsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /domains, every page
    pub async fn list(&self) -> Result<Vec<Domain>, ApiError> {
        self.client.list_all("/domains", "domains").await
    }

    /// GET /domains/{domain}
    pub async fn get(&self, domain: &str) -> Result<Domain, ApiError> {
        let wrapper: DomainWrapper = self.client.get(&format!("/domains/{}", domain)).await?;
        Ok(wrapper.domain)
    }

    /// POST /domains
    pub async fn create(&self, request: &DomainCreateRequest) -> Result<Domain, ApiError> {
        let wrapper: DomainWrapper = self.client.post("/domains", request).await?;
        Ok(wrapper.domain)
    }

    /// PUT /domains/{domain}
    pub async fn update(&self, domain: &str, request: &DomainUpdateRequest) -> Result<(), ApiError> {
        self.client
            .put(&format!("/domains/{}", domain), request)
            .await
    }

    /// DELETE /domains/{domain}
    pub async fn delete(&self, domain: &str) -> Result<(), ApiError> {
        self.client.delete(&format!("/domains/{}", domain)).await
    }

    /// GET /domains/{domain}/records, every page
    pub async fn list_records(&self, domain: &str) -> Result<Vec<DomainRecord>, ApiError> {
        self.client
            .list_all(&format!("/domains/{}/records", domain), "records")
            .await
    }

    /// GET /domains/{domain}/records/{id}
    pub async fn get_record(&self, domain: &str, id: &str) -> Result<DomainRecord, ApiError> {
        let wrapper: RecordWrapper = self
            .client
            .get(&format!("/domains/{}/records/{}", domain, id))
            .await?;
        Ok(wrapper.record)
    }

    /// POST /domains/{domain}/records
    pub async fn create_record(
        &self,
        domain: &str,
        request: &DomainRecordRequest,
    ) -> Result<DomainRecord, ApiError> {
        let wrapper: RecordWrapper = self
            .client
            .post(&format!("/domains/{}/records", domain), request)
            .await?;
        Ok(wrapper.record)
    }

    /// PATCH /domains/{domain}/records/{id}
    pub async fn update_record(
        &self,
        domain: &str,
        id: &str,
        request: &DomainRecordRequest,
    ) -> Result<(), ApiError> {
        self.client
            .patch(&format!("/domains/{}/records/{}", domain, id), request)
            .await
    }

    /// DELETE /domains/{domain}/records/{id}
    pub async fn delete_record(&self, domain: &str, id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&format!("/domains/{}/records/{}", domain, id))
            .await
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::api::test_helpers::{create_test_client, json_response};
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn create_domain_with_default_ip() {
        let mut server = Server::new_async().await;
        let mock = json_response(
            &mut server,
            "POST",
            "/domains",
            201,
            r#"{"domain": {"domain": "example.com", "date_created": "2020-10-10T01:56:20+00:00",
                "dns_sec": "disabled"}}"#,
        )
        .match_body(Matcher::Json(serde_json::json!({
            "domain": "example.com",
            "ip": "192.0.2.10"
        })))
        .create_async()
        .await;

        let client = create_test_client(&server.url());
        let domain = client
            .domains()
            .create(&DomainCreateRequest {
                domain: "example.com".to_string(),
                ip: Some("192.0.2.10".to_string()),
                dns_sec: None,
            })
            .await
            .unwrap();

        assert_eq!(domain.dns_sec, "disabled");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn get_record() {
        let mut server = Server::new_async().await;
        let _m = json_response(
            &mut server,
            "GET",
            "/domains/example.com/records/dc4bc4e1",
            200,
            r#"{"record": {"id": "dc4bc4e1", "type": "MX", "name": "", "data": "mail.example.com",
                "priority": 10, "ttl": 300}}"#,
        )
        .create_async()
        .await;

        let client = create_test_client(&server.url());
        let record = client
            .domains()
            .get_record("example.com", "dc4bc4e1")
            .await
            .unwrap();

        assert_eq!(record.record_type, "MX");
        assert_eq!(record.priority, 10);
    }
}
