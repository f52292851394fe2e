use super::*;
use crate::config::ApiTimeouts;
use crate::error::ErrorCode;

#[test]
fn not_found_maps_to_subject() {
    let err = check_status(StatusCode::NOT_FOUND, "gone".into(), "board-1").unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "not found: board-1");
}

#[test]
fn server_errors_are_retryable_client_errors_are_not() {
    let err = check_status(StatusCode::BAD_GATEWAY, "upstream".into(), "b").unwrap_err();
    assert!(matches!(err, RemoteError::Response { status: 502, .. }));
    assert!(err.retryable());

    let err = check_status(StatusCode::FORBIDDEN, String::new(), "b").unwrap_err();
    assert_eq!(err.error_code(), "E_API_RESPONSE");
    assert!(!err.retryable());

    let err = check_status(StatusCode::TOO_MANY_REQUESTS, String::new(), "b").unwrap_err();
    assert!(err.retryable());
}

#[test]
fn success_passes_body_through() {
    let body = check_status(StatusCode::OK, "{}".into(), "b").unwrap();
    assert_eq!(body, "{}");
}

#[test]
fn parse_board_reads_wire_shape() {
    let board = parse_board(
        r#"{"id":"pub-board-1","name":"Public","author":"Grace","email":"grace@example.org","isPublic":true,
            "tiles":[{"id":"t","type":"folder","label":"child","loadBoard":"child-1"}]}"#,
    )
    .unwrap();
    assert_eq!(board.id, "pub-board-1");
    assert!(board.is_public);
    assert_eq!(board.owned_references().collect::<Vec<_>>(), vec!["child-1"]);
}

#[test]
fn parse_board_rejects_garbage() {
    let err = parse_board("not json").unwrap_err();
    assert!(matches!(err, RemoteError::Parse(_)));
    assert_eq!(err.error_code(), "E_API_PARSE");
}

#[test]
fn parse_created_id_requires_non_empty_id() {
    assert_eq!(parse_created_id(r#"{"id":"remote-00000001","name":"x"}"#).unwrap(), "remote-00000001");
    assert!(matches!(parse_created_id(r#"{"id":""}"#), Err(RemoteError::Parse(_))));
    assert!(matches!(parse_created_id("{}"), Err(RemoteError::Parse(_))));
}

#[test]
fn client_joins_paths_onto_base_url() {
    let config = ApiConfig::new("https://api.example.org/", Some("tok".into()), ApiTimeouts::default()).unwrap();
    let client = HttpBoardClient::new(config).unwrap();
    assert_eq!(client.url(&["board", "abc"]).unwrap().as_str(), "https://api.example.org/board/abc");
}

#[test]
fn ids_are_percent_encoded_as_one_segment() {
    let base = Url::parse("https://api.example.org/v1").unwrap();
    let url = endpoint(&base, &["board", "a/b?c#d"]).unwrap();
    assert_eq!(url.as_str(), "https://api.example.org/v1/board/a%2Fb%3Fc%23d");
    assert_eq!(url.path_segments().unwrap().count(), 3);
    assert_eq!(url.query(), None);
    assert_eq!(url.fragment(), None);
}

#[test]
fn client_builds_with_and_without_request_timeout() {
    let timeouts = ApiTimeouts { request_secs: Some(5), connect_secs: 2 };
    let config = ApiConfig::new("http://localhost:8080", None, timeouts).unwrap();
    assert!(HttpBoardClient::new(config).is_ok());

    let config = ApiConfig::new("http://localhost:8080", None, ApiTimeouts::default()).unwrap();
    assert!(HttpBoardClient::new(config).is_ok());
}

#[tokio::test]
async fn offline_client_reports_network_errors() {
    let client = super::super::OfflineClient;
    let err = client.fetch_board("x").await.unwrap_err();
    assert!(matches!(err, RemoteError::Network(_)));
    assert!(err.retryable());
}
