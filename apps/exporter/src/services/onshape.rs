// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Onshape REST API client.

use crate::config::{Config, StlExportOptions};
use crate::error::ExportError;
use crate::types::{AssemblyDefinitionResponse, DocumentResponse, ElementDto, PartMetadataDto};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use onshape_lite_core::{
    AssemblyDefinition, CadService, DocumentInfo, ElementPath, PartInfo, PartMetadata,
};
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION, LOCATION};
use reqwest::{Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

const API_VERSION: &str = "v6";

/// Authenticated client for one Onshape server.
///
/// Redirects are never followed automatically: the STL export endpoint
/// answers with a redirect to a download on another host, and the caller
/// receives that location explicitly from [`OnshapeClient::export_stl_location`].
pub struct OnshapeClient {
    server: Url,
    authorization: HeaderValue,
    http: reqwest::Client,
}

/// `Basic base64(access:secret)` header value.
pub fn basic_auth(access_key: &str, secret_key: &str) -> Result<HeaderValue, ExportError> {
    let token = STANDARD.encode(format!("{}:{}", access_key, secret_key));
    let mut value = HeaderValue::from_str(&format!("Basic {}", token))?;
    value.set_sensitive(true);
    Ok(value)
}

async fn check_status(operation: &'static str, resp: Response) -> Result<Response, ExportError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    Err(ExportError::Status {
        operation,
        status,
        body,
    })
}

impl OnshapeClient {
    /// Create a client for the server named in the configuration.
    pub fn new(config: &Config) -> Result<Self, ExportError> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("onshape-lite/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            server: config.root.server.clone(),
            authorization: basic_auth(&config.client.access_key, &config.client.secret_key)?,
            http,
        })
    }

    /// `https://host/api/v6/<segments>`, each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ExportError> {
        let mut url = self.server.clone();
        url.path_segments_mut()
            .map_err(|_| ExportError::InvalidUrl {
                url: self.server.to_string(),
                reason: "server URL cannot have a path".into(),
            })?
            .clear()
            .push("api")
            .push(API_VERSION)
            .extend(segments);
        Ok(url)
    }

    fn element_endpoint(
        &self,
        resource: &str,
        path: &ElementPath,
        tail: &[&str],
    ) -> Result<Url, ExportError> {
        let mut segments = vec![
            resource,
            "d",
            path.document_id.as_str(),
            path.version_kind.as_str(),
            path.version_id.as_str(),
            "e",
            path.element_id.as_str(),
        ];
        segments.extend_from_slice(tail);
        self.endpoint(&segments)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        url: Url,
    ) -> Result<T, ExportError> {
        tracing::debug!(operation, url = %url, "GET");
        let resp = self
            .http
            .get(url)
            .header(AUTHORIZATION, self.authorization.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let resp = check_status(operation, resp).await?;
        Ok(resp.json().await?)
    }

    pub async fn fetch_assembly_definition(
        &self,
        path: &ElementPath,
    ) -> Result<AssemblyDefinition, ExportError> {
        let mut url = self.element_endpoint("assemblies", path, &[])?;
        url.query_pairs_mut()
            .append_pair("includeMateFeatures", "true")
            .append_pair("includeMateConnectors", "true");
        let response: AssemblyDefinitionResponse =
            self.get_json("assembly definition", url).await?;
        Ok(response.into())
    }

    pub async fn fetch_document(&self, document_id: &str) -> Result<DocumentInfo, ExportError> {
        let url = self.endpoint(&["documents", document_id])?;
        let response: DocumentResponse = self.get_json("document", url).await?;
        Ok(response.into())
    }

    pub async fn fetch_parts(&self, path: &ElementPath) -> Result<Vec<PartMetadata>, ExportError> {
        let url = self.element_endpoint("parts", path, &[])?;
        let parts: Vec<PartMetadataDto> = self.get_json("part metadata", url).await?;
        Ok(parts.into_iter().map(PartMetadata::from).collect())
    }

    pub async fn fetch_element_name(&self, path: &ElementPath) -> Result<String, ExportError> {
        let mut url = self.endpoint(&[
            "documents",
            "d",
            &path.document_id,
            path.version_kind.as_str(),
            &path.version_id,
            "elements",
        ])?;
        url.query_pairs_mut().append_pair("elementId", &path.element_id);

        let elements: Vec<ElementDto> = self.get_json("element info", url).await?;
        elements
            .into_iter()
            .find(|element| element.id == path.element_id)
            .map(|element| element.name)
            .ok_or_else(|| ExportError::NotFound(format!("element {}", path)))
    }

    /// Request an STL export and return the download location it redirects to.
    pub async fn export_stl_location(
        &self,
        part: &PartInfo,
        options: &StlExportOptions,
    ) -> Result<Url, ExportError> {
        let mut url = self.element_endpoint("parts", &part.path, &["partid", &part.id, "stl"])?;
        url.query_pairs_mut()
            .append_pair("mode", &options.mode)
            .append_pair("units", &options.units);

        tracing::debug!(part = %part.id, url = %url, "Requesting STL export");
        let resp = self
            .http
            .get(url.clone())
            .header(AUTHORIZATION, self.authorization.clone())
            .header(ACCEPT, "application/octet-stream")
            .send()
            .await?;

        if !resp.status().is_redirection() {
            check_status("STL export", resp).await?;
            return Err(ExportError::MissingRedirect {
                part_id: part.id.clone(),
            });
        }

        let location = resp
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ExportError::MissingRedirect {
                part_id: part.id.clone(),
            })?;
        // Location may be relative to the request URL.
        url.join(location).map_err(|e| ExportError::InvalidUrl {
            url: location.to_string(),
            reason: e.to_string(),
        })
    }

    /// Download an STL payload from a location returned by
    /// [`OnshapeClient::export_stl_location`].
    pub async fn download_stl(&self, location: Url) -> Result<Bytes, ExportError> {
        let resp = self
            .http
            .get(location)
            .header(AUTHORIZATION, self.authorization.clone())
            .header(ACCEPT, "application/octet-stream")
            .send()
            .await?;
        let resp = check_status("STL download", resp).await?;
        Ok(resp.bytes().await?)
    }
}

#[async_trait]
impl CadService for OnshapeClient {
    async fn assembly_definition(
        &self,
        path: &ElementPath,
    ) -> onshape_lite_core::Result<AssemblyDefinition> {
        self.fetch_assembly_definition(path)
            .await
            .map_err(|e| onshape_lite_core::Error::fetch("assembly definition", e))
    }

    async fn document_info(&self, document_id: &str) -> onshape_lite_core::Result<DocumentInfo> {
        self.fetch_document(document_id)
            .await
            .map_err(|e| onshape_lite_core::Error::fetch("document info", e))
    }

    async fn part_metadata(
        &self,
        path: &ElementPath,
    ) -> onshape_lite_core::Result<Vec<PartMetadata>> {
        self.fetch_parts(path)
            .await
            .map_err(|e| onshape_lite_core::Error::fetch("part metadata", e))
    }

    async fn element_name(&self, path: &ElementPath) -> onshape_lite_core::Result<String> {
        self.fetch_element_name(path)
            .await
            .map_err(|e| onshape_lite_core::Error::fetch("element info", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use onshape_lite_core::Color;

    fn client() -> OnshapeClient {
        let config = Config::from_json(
            r#"{"onshape_client": {
                "base_url": "https://cad.onshape.com/documents/d1/w/w1/e/e1",
                "access_key": "access",
                "secret_key": "secret"
            }}"#,
        )
        .unwrap();
        OnshapeClient::new(&config).unwrap()
    }

    #[test]
    fn basic_auth_header() {
        let value = basic_auth("access", "secret").unwrap();
        assert_eq!(value.to_str().unwrap(), "Basic YWNjZXNzOnNlY3JldA==");
        assert!(value.is_sensitive());
    }

    #[test]
    fn assembly_endpoint() {
        let path = ElementPath::microversion("d1", "mv1", "e1");
        let url = client().element_endpoint("assemblies", &path, &[]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://cad.onshape.com/api/v6/assemblies/d/d1/m/mv1/e/e1"
        );
    }

    #[test]
    fn part_ids_are_percent_encoded() {
        let part = PartInfo {
            id: "J/D".into(),
            name: "Bracket".into(),
            path: ElementPath::microversion("d1", "mv1", "ps1"),
            appearance: Color::WHITE,
        };
        let url = client()
            .element_endpoint("parts", &part.path, &["partid", &part.id, "stl"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://cad.onshape.com/api/v6/parts/d/d1/m/mv1/e/ps1/partid/J%2FD/stl"
        );
    }
}
