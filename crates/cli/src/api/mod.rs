use async_trait::async_trait;
use bytes::Bytes;
use common::api::{ApiError, MachinePage, ServerTokenResponse};
use reqwest::header::{HeaderMap, HeaderName, CONTENT_DISPOSITION};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::FleetError;
use crate::fleet::dump::default_dump_file_name;
use crate::fleet::query::MachineQuery;
use crate::transport::{DumpArtifact, FleetTransport};

pub const MACHINES_PATH: &str = "/api/machines";
pub const SERVER_TOKEN_PATH: &str = "/api/machines-server-token";

/// reqwest client for the monitoring server's REST API.
#[derive(Clone)]
pub struct ServerApi {
    client: Client,
    base: String,
    session_header: String,
    session_token: Option<String>,
}

impl ServerApi {
    pub fn new(
        client: Client,
        base: impl Into<String>,
        session_header: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            client,
            base: base.into(),
            session_header: session_header.into(),
            session_token,
        }
    }

    fn url(&self, path: &str) -> String {
        let trimmed = path.trim_start_matches('/');
        format!("{}/{}", self.base.trim_end_matches('/'), trimmed)
    }

    fn apply_session(&self, req: RequestBuilder) -> Result<RequestBuilder, FleetError> {
        let Some(token) = &self.session_token else {
            return Ok(req);
        };
        let header = HeaderName::from_bytes(self.session_header.as_bytes()).map_err(|err| {
            FleetError::Transport(format!(
                "invalid session header name '{}': {}",
                self.session_header, err
            ))
        })?;
        Ok(req.header(header, format!("Bearer {token}")))
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, FleetError> {
        let req = self.apply_session(req)?;
        let res = req.send().await?;
        handle_server_response(res).await
    }

    pub async fn get_with_query<Q, T>(&self, path: &str, query: &Q) -> Result<T, FleetError>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let req = self.client.get(self.url(path)).query(query);
        let res = self.send(req).await?;
        Ok(res.json().await?)
    }

    pub async fn get<T>(&self, path: &str) -> Result<T, FleetError>
    where
        T: DeserializeOwned,
    {
        let res = self.send(self.client.get(self.url(path))).await?;
        Ok(res.json().await?)
    }

    pub async fn put_empty<T>(&self, path: &str) -> Result<T, FleetError>
    where
        T: DeserializeOwned,
    {
        let res = self.send(self.client.put(self.url(path))).await?;
        Ok(res.json().await?)
    }

    pub async fn get_bytes(&self, path: &str) -> Result<(HeaderMap, Bytes), FleetError> {
        let res = self.send(self.client.get(self.url(path))).await?;
        let headers = res.headers().clone();
        Ok((headers, res.bytes().await?))
    }
}

#[async_trait]
impl FleetTransport for ServerApi {
    async fn list_machines(&self, query: &MachineQuery) -> Result<MachinePage, FleetError> {
        self.get_with_query(MACHINES_PATH, query).await
    }

    async fn fetch_installation_token(&self) -> Result<String, FleetError> {
        let body: ServerTokenResponse = self.get(SERVER_TOKEN_PATH).await?;
        Ok(body.token)
    }

    async fn regenerate_installation_token(&self) -> Result<String, FleetError> {
        let body: ServerTokenResponse = self.put_empty(SERVER_TOKEN_PATH).await?;
        Ok(body.token)
    }

    async fn export_machine_dump(&self, machine_id: i64) -> Result<DumpArtifact, FleetError> {
        let path = format!("{MACHINES_PATH}/{machine_id}/dump");
        let (headers, bytes) = self.get_bytes(&path).await?;
        let file_name = headers
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(attachment_file_name)
            .unwrap_or_else(|| default_dump_file_name(machine_id));
        Ok(DumpArtifact {
            machine_id,
            file_name,
            bytes,
        })
    }
}

async fn handle_server_response(res: Response) -> Result<Response, FleetError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().await.unwrap_or_default();
    Err(FleetError::Server {
        status: status.as_u16(),
        message: render_server_error(status, &body),
    })
}

/// Reason shown to the operator: the payload's `message`, else the body,
/// else the HTTP status text.
pub(crate) fn render_server_error(status: StatusCode, body: &str) -> String {
    if let Some(message) = extract_error_message(body) {
        return message;
    }
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("request failed with status {}", status.as_u16()))
}

pub(crate) fn extract_error_message(body: &str) -> Option<String> {
    if let Ok(err) = serde_json::from_str::<ApiError>(body) {
        return Some(err.message);
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// `attachment; filename="dump.tar.gz"` -> `dump.tar.gz`.
pub(crate) fn attachment_file_name(value: &str) -> Option<String> {
    value
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .filter(|name| !name.is_empty())
}
