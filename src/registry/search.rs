// Copyright 2025 SpecHub (https://github.com/spechub)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Cross-service keyword search over summarized endpoints.

use crate::registry::summary::EndpointSummary;
use crate::registry::ServiceSummary;
use serde::Serialize;

/// One search hit: an endpoint plus its owning service
#[derive(Debug, Clone, Serialize)]
pub struct SearchMatch {
    pub service: String,
    #[serde(rename = "baseUrl")]
    pub base_url: String,
    #[serde(flatten)]
    pub endpoint: EndpointSummary,
}

/// Case-insensitive substring search across path, summary, and body fields.
///
/// Services whose fetch failed carry no endpoints and are skipped silently.
/// Order follows the input: directory order, then path-table order, then the
/// fixed method order the summarizer emits.
pub fn search_summaries(summaries: &[ServiceSummary], keyword: &str) -> Vec<SearchMatch> {
    let needle = keyword.to_lowercase();
    let mut matches = Vec::new();

    for service in summaries {
        for endpoint in &service.endpoints {
            if endpoint_matches(endpoint, &needle) {
                matches.push(SearchMatch {
                    service: service.service.clone(),
                    base_url: service.base_url.clone(),
                    endpoint: endpoint.clone(),
                });
            }
        }
    }

    matches
}

fn endpoint_matches(endpoint: &EndpointSummary, needle: &str) -> bool {
    let mut haystack = format!("{} {}", endpoint.path, endpoint.summary);
    if let Some(fields) = &endpoint.body_fields {
        haystack.push(' ');
        haystack.push_str(&fields.join(" "));
    }
    haystack.to_lowercase().contains(needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(method: &str, path: &str, summary: &str, fields: Option<Vec<&str>>) -> EndpointSummary {
        EndpointSummary {
            method: method.to_string(),
            path: path.to_string(),
            summary: summary.to_string(),
            parameters: Vec::new(),
            body_fields: fields.map(|f| f.iter().map(|s| s.to_string()).collect()),
        }
    }

    fn service(name: &str, endpoints: Vec<EndpointSummary>, error: Option<&str>) -> ServiceSummary {
        ServiceSummary {
            service: name.to_string(),
            base_url: format!("http://{name}:8080"),
            title: None,
            description: None,
            endpoints,
            error: error.map(String::from),
        }
    }

    #[test]
    fn test_matches_path_case_insensitively() {
        let summaries = vec![service(
            "ads",
            vec![endpoint("GET", "/v1/Campaigns", "", None)],
            None,
        )];
        let hits = search_summaries(&summaries, "campaign");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].service, "ads");
        assert_eq!(hits[0].endpoint.path, "/v1/Campaigns");
    }

    #[test]
    fn test_matches_body_fields() {
        let summaries = vec![service(
            "ads",
            vec![endpoint(
                "POST",
                "/v1/orders",
                "Create order",
                Some(vec!["campaignId", "budget"]),
            )],
            None,
        )];
        assert_eq!(search_summaries(&summaries, "CAMPAIGN").len(), 1);
        assert_eq!(search_summaries(&summaries, "budget").len(), 1);
        assert!(search_summaries(&summaries, "missing").is_empty());
    }

    #[test]
    fn test_failed_services_are_skipped() {
        let summaries = vec![
            service("down", Vec::new(), Some("HTTP 503")),
            service("up", vec![endpoint("GET", "/v1/campaigns", "", None)], None),
        ];
        let hits = search_summaries(&summaries, "campaign");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].service, "up");
    }

    #[test]
    fn test_directory_order_preserved() {
        let summaries = vec![
            service("a", vec![endpoint("GET", "/x", "", None)], None),
            service("b", vec![endpoint("GET", "/x", "", None)], None),
        ];
        let hits = search_summaries(&summaries, "/x");
        let order: Vec<&str> = hits.iter().map(|h| h.service.as_str()).collect();
        assert_eq!(order, vec!["a", "b"]);
    }
}
