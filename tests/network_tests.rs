/// End-to-end network analysis against a mocked Companies House
use std::time::Duration;

use osint_toolkit::companies_house::CompaniesHouseClient;
use osint_toolkit::http::HttpClient;
use osint_toolkit::models::CandidateOrigin;
use osint_toolkit::network::NetworkAnalyzer;
use osint_toolkit::overlap::OverlapScorer;
use osint_toolkit::pagination::Thresholds;
use osint_toolkit::retry::RetryPolicy;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn analyzer(server: &MockServer) -> NetworkAnalyzer<CompaniesHouseClient> {
    let http = HttpClient::new(Duration::from_secs(5), RetryPolicy::none()).unwrap();
    let client = CompaniesHouseClient::new(http, server.uri(), "test_key");
    NetworkAnalyzer::new(client.clone(), client, OverlapScorer::default(), Thresholds::default())
}

async fn mount_search(server: &MockServer, query: &str, limit: &str, items: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/search/companies"))
        .and(query_param("q", query))
        .and(query_param("items_per_page", limit))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": items })))
        .mount(server)
        .await;
}

async fn mount_company(server: &MockServer, number: &str, name: &str, address_line: &str, directors: &[&str]) {
    Mock::given(method("GET"))
        .and(path(format!("/company/{}", number)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "company_name": name,
            "company_number": number,
            "registered_office_address": {"address_line_1": address_line, "locality": "London"}
        })))
        .expect(1)
        .mount(server)
        .await;

    let officers: Vec<_> = directors
        .iter()
        .map(|d| json!({"name": d, "officer_role": "director"}))
        .collect();
    Mock::given(method("GET"))
        .and(path(format!("/company/{}/officers", number)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": officers })))
        .mount(server)
        .await;
}

async fn mount_officer_search(server: &MockServer, name: &str, numbers: &[&str]) {
    let items: Vec<_> = numbers
        .iter()
        .map(|n| json!({"title": name, "appointed_to": {"company_number": n}}))
        .collect();
    Mock::given(method("GET"))
        .and(path("/search/officers"))
        .and(query_param("q", name))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": items })))
        .mount(server)
        .await;
}

/// Target ACME LTD at "1 High Street, London" run by "SMITH, John".
async fn mount_acme_network(server: &MockServer) {
    mount_search(
        server,
        "Acme Ltd",
        "5",
        json!([{"company_number": "00000001", "title": "ACME LTD"}]),
    )
    .await;
    mount_company(server, "00000001", "ACME LTD", "1 High Street", &["SMITH, John"]).await;
    mount_company(server, "00000002", "ACME TRADING LTD", "1 High Street", &["SMITH, John"]).await;
    mount_company(server, "00000003", "OTHER CO LTD", "2 Low Road", &[]).await;

    mount_search(
        server,
        "1 High Street, London",
        "20",
        json!([{"company_number": "00000003", "title": "OTHER CO LTD"}]),
    )
    .await;
    mount_officer_search(server, "SMITH, John", &["00000002", "00000001"]).await;
    mount_officer_search(server, "John SMITH", &[]).await;

    Mock::given(method("GET"))
        .and(path("/company/00000001/persons-with-significant-control"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{
                "name": "ACME PARENT LIMITED",
                "kind": "corporate-entity-person-with-significant-control",
                "natures_of_control": ["ownership-of-shares-75-to-100-percent"]
            }]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_network_analysis_scores_and_ranks_candidates() {
    let mock_server = MockServer::start().await;
    mount_acme_network(&mock_server).await;
    mount_search(
        &mock_server,
        "ACME",
        "20",
        json!([
            {"company_number": "00000001", "title": "ACME LTD"},
            {"company_number": "00000002", "title": "ACME TRADING LTD"}
        ]),
    )
    .await;

    let report = analyzer(&mock_server).analyze("Acme Ltd", None).await.unwrap().unwrap();

    assert_eq!(report.target.number, "00000001");
    assert_eq!(report.brand.as_deref(), Some("ACME"));
    assert_eq!(report.beneficial_owners.len(), 1);
    assert_eq!(report.beneficial_owners[0].percentage.as_deref(), Some("75-100%"));

    let ranked: Vec<(&str, u32)> = report
        .candidates
        .iter()
        .map(|c| (c.company.number.as_str(), c.score))
        .collect();
    assert_eq!(ranked, vec![("00000002", 3), ("00000003", 0)]);

    let top = &report.candidates[0];
    assert_eq!(top.origin, CandidateOrigin::Brand);
    assert!(top.priority);
    assert_eq!(report.priority_candidates().count(), 1);
    assert_eq!(report.candidates[1].origin, CandidateOrigin::Address);
}

#[tokio::test]
async fn test_network_analysis_without_brand() {
    let mock_server = MockServer::start().await;
    mount_acme_network(&mock_server).await;

    let report = analyzer(&mock_server)
        .analyze("Acme Ltd", Some("none"))
        .await
        .unwrap()
        .unwrap();

    assert!(report.brand.is_none());
    let director_hit = report
        .candidates
        .iter()
        .find(|c| c.company.number == "00000002")
        .unwrap();
    assert_eq!(director_hit.origin, CandidateOrigin::Director);
    assert_eq!(director_hit.score, 2);
    assert!(director_hit.priority);
}

#[tokio::test]
async fn test_network_analysis_with_no_results() {
    let mock_server = MockServer::start().await;
    mount_search(&mock_server, "Nothing Here", "5", json!([])).await;

    let report = analyzer(&mock_server).analyze("Nothing Here", None).await.unwrap();
    assert!(report.is_none());
}

#[tokio::test]
async fn test_network_analysis_search_failure_carries_context() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/companies"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;

    let err = analyzer(&mock_server).analyze("Acme Ltd", None).await.unwrap_err();
    assert!(err.is_rate_limited());
    assert!(err.to_string().starts_with("initial company search: "));
}
