use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::db::enums::CheckStatus;
use crate::db::models::{Client, NewClient, StatusRecordDetails, UpdateClient};

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ClientResponse {
    pub id: i64,
    pub name: String,
    pub pattern: String,
    pub wildcard: bool,
    pub failure_keyword: String,
    pub warning_keyword: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Client> for ClientResponse {
    fn from(client: Client) -> Self {
        Self {
            id: client.id,
            name: client.name,
            pattern: client.pattern,
            wildcard: client.wildcard,
            failure_keyword: client.failure_keyword,
            warning_keyword: client.warning_keyword,
            active: client.active,
            created_at: client.created_at,
            updated_at: client.updated_at,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientRequest {
    pub name: String,
    pub pattern: String,
    pub wildcard: Option<bool>,
    pub failure_keyword: Option<String>,
    pub warning_keyword: Option<String>,
    pub active: Option<bool>,
}

impl CreateClientRequest {
    pub fn into_new_client(self) -> NewClient {
        let mut new_client = NewClient::new(self.name, self.pattern);
        if let Some(wildcard) = self.wildcard {
            new_client.wildcard = wildcard;
        }
        if let Some(keyword) = self.failure_keyword {
            new_client.failure_keyword = keyword;
        }
        if let Some(keyword) = self.warning_keyword {
            new_client.warning_keyword = keyword;
        }
        if let Some(active) = self.active {
            new_client.active = active;
        }
        new_client
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClientRequest {
    pub name: Option<String>,
    pub pattern: Option<String>,
    pub wildcard: Option<bool>,
    pub failure_keyword: Option<String>,
    pub warning_keyword: Option<String>,
    pub active: Option<bool>,
}

impl From<UpdateClientRequest> for UpdateClient {
    fn from(request: UpdateClientRequest) -> Self {
        Self {
            name: request.name,
            pattern: request.pattern,
            wildcard: request.wildcard,
            failure_keyword: request.failure_keyword,
            warning_keyword: request.warning_keyword,
            active: request.active,
        }
    }
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecordResponse {
    pub client_id: i64,
    pub client_name: String,
    pub day: NaiveDate,
    pub status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_subject: Option<String>,
    pub evaluated_at: DateTime<Utc>,
}

impl From<StatusRecordDetails> for StatusRecordResponse {
    fn from(details: StatusRecordDetails) -> Self {
        Self {
            client_id: details.client_id,
            client_name: details.client_name,
            day: details.day,
            status: details.status,
            matched_subject: details.matched_subject,
            evaluated_at: details.evaluated_at,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct RunRequest {
    pub day: Option<NaiveDate>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RunResponse {
    pub day: NaiveDate,
    pub records: Vec<StatusRecordResponse>,
}

#[derive(Deserialize, Debug)]
pub struct StatusQuery {
    pub day: Option<NaiveDate>,
}
