// Unit tests for the remote classifier boundary.
//
// parse_response is the only place provider output is trusted; everything
// it lets through must be a well-formed ClassifierResponse.

use chatguard::moderation::openai::parse_response;
use chatguard::moderation::ClassifierError;

#[test]
fn parses_a_flagged_response() {
    let body = r#"{
        "id": "modr-123",
        "model": "omni-moderation-latest",
        "results": [{
            "flagged": true,
            "categories": {"harassment": true, "hate": false},
            "category_scores": {"harassment": 0.91, "hate": 0.12}
        }]
    }"#;
    let r = parse_response(body).unwrap();
    assert!(r.flagged);
    assert_eq!(r.flagged_categories(), vec!["harassment".to_string()]);
    assert!((r.max_score() - 0.91).abs() < 1e-9);
}

#[test]
fn missing_score_maps_default_to_empty() {
    let r = parse_response(r#"{"results": [{"flagged": false}]}"#).unwrap();
    assert!(!r.flagged);
    assert_eq!(r.max_score(), 0.0);
    assert!(r.flagged_categories().is_empty());
}

#[test]
fn invalid_json_is_malformed() {
    assert!(matches!(
        parse_response("<html>Bad Gateway</html>"),
        Err(ClassifierError::Malformed(_))
    ));
}

#[test]
fn empty_results_are_malformed() {
    assert!(matches!(
        parse_response(r#"{"results": []}"#),
        Err(ClassifierError::Malformed(_))
    ));
}

#[test]
fn missing_flagged_is_malformed() {
    assert!(matches!(
        parse_response(r#"{"results": [{"category_scores": {"hate": 0.2}}]}"#),
        Err(ClassifierError::Malformed(_))
    ));
}

#[test]
fn out_of_range_scores_are_malformed() {
    let body = r#"{"results": [{"flagged": false, "category_scores": {"hate": 1.7}}]}"#;
    assert!(matches!(parse_response(body), Err(ClassifierError::Malformed(_))));
}
