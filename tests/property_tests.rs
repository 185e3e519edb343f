/// Property-based tests using proptest
/// Tests invariants that should hold for all inputs
use proptest::prelude::*;
use osint_toolkit::domain::{clean_domain, strip_html, url_key};
use osint_toolkit::models::{CompanyRecord, RegistrySource};
use osint_toolkit::overlap::OverlapScorer;
use osint_toolkit::pagination::EnrichmentPolicy;

fn company(name: &str, address: &str, directors: &[String]) -> CompanyRecord {
    let mut record = CompanyRecord::stub(name, "00000001", RegistrySource::CompaniesHouse);
    record.address = address.to_string();
    record.directors = directors.to_vec();
    record
}

// Property: domain cleaning is idempotent and leaves no known prefix
proptest! {
    #[test]
    fn clean_domain_is_idempotent(input in "\\PC*") {
        let once = clean_domain(&input);
        prop_assert_eq!(clean_domain(&once), once);
    }

    #[test]
    fn clean_domain_strips_stacked_prefixes(
        prefixes in prop::collection::vec(prop::sample::select(vec!["http://", "HTTPS://", "www.", "WwW."]), 0..5),
        host in "[a-v0-9]{1,12}\\.[a-v]{2,4}"
    ) {
        let input = format!("{}{}", prefixes.concat(), host);
        prop_assert_eq!(clean_domain(&input), host);
    }

    #[test]
    fn url_key_never_panics(input in "\\PC*") {
        let _ = url_key(&input);
    }

    #[test]
    fn strip_html_removes_markup(body in "[a-zA-Z ]{0,40}") {
        let html = format!("<div><script>var x = 1;</script><p>{}</p></div>", body);
        let text = strip_html(&html);
        prop_assert!(!text.contains("<p>"));
        prop_assert!(!text.contains("var x"));
    }
}

// Property: overlap scoring
proptest! {
    #[test]
    fn overlap_is_symmetric_without_brand(
        address_a in "[a-z ]{0,10}",
        address_b in "[a-z ]{0,10}",
        directors_a in prop::collection::vec("[a-c]{1,2}", 0..5),
        directors_b in prop::collection::vec("[a-c]{1,2}", 0..5)
    ) {
        let scorer = OverlapScorer::default();
        let a = company("Alpha", &address_a, &directors_a);
        let b = company("Beta", &address_b, &directors_b);
        prop_assert_eq!(scorer.score(&a, &b, None), scorer.score(&b, &a, None));
    }

    #[test]
    fn overlap_is_bounded(
        directors_a in prop::collection::vec("[a-c]{1,2}", 0..8),
        directors_b in prop::collection::vec("[a-c]{1,2}", 0..8),
        brand in prop::option::of("[a-z]{0,4}")
    ) {
        let scorer = OverlapScorer::default();
        let a = company("abc holdings", "1 High St", &directors_a);
        let b = company("xyz", "1 High St", &directors_b);
        let distinct: std::collections::HashSet<_> = directors_a.iter().collect();
        let score = scorer.score(&a, &b, brand.as_deref());
        prop_assert!(score as usize <= 2 + distinct.len());
    }

    #[test]
    fn disjoint_records_score_zero(
        directors in prop::collection::vec("[a-m]{3,6}", 0..5),
        other in prop::collection::vec("[n-z]{3,6}", 0..5)
    ) {
        let scorer = OverlapScorer::default();
        let a = company("Alpha", "1 High St", &directors);
        let b = company("Beta", "2 Low Rd", &other);
        prop_assert_eq!(scorer.score(&a, &b, Some("none")), 0);
    }
}

// Property: enrichment happens strictly below the threshold
proptest! {
    #[test]
    fn should_enrich_matches_threshold(threshold in 0usize..100, len in 0usize..200) {
        let policy = EnrichmentPolicy::new(threshold);
        prop_assert_eq!(policy.should_enrich(len), len < threshold);
    }
}

// Property: subdomain filtering only keeps hosts under the target domain
proptest! {
    #[test]
    fn host_within_keeps_only_target_hosts(label in "[a-v0-9]{1,10}", input in "\\PC*") {
        let domain = "example.com";
        let expected = format!("{}.{}", label, domain);
        prop_assert_eq!(
            osint_toolkit::subdomains::host_within(&format!("*.{}", expected), domain),
            Some(expected.clone())
        );
        if let Some(host) = osint_toolkit::subdomains::host_within(&input, domain) {
            prop_assert!(host == domain || host.ends_with(".example.com"));
        }
    }
}
