use std::time::Duration;

use mockito::Matcher;
use naukri_scrap::fetch::{HttpFetcher, PageFetcher};
use naukri_scrap::request::{ObservedPattern, PageRequest};
use naukri_scrap::token::StaticToken;
use naukri_scrap::{Error, Scraper, Settings, Termination};

const PATH: &str = "/jobapi/v3/search";

fn request(page: u32) -> PageRequest {
    PageRequest::new(
        &Settings::default(),
        &ObservedPattern,
        &StaticToken::new("captured-token"),
        "25to50",
        page,
    )
    .expect("request builds")
}

fn fetcher(server: &mockito::Server) -> HttpFetcher {
    HttpFetcher::new(format!("{}{PATH}", server.url()), Duration::from_secs(5)).expect("client")
}

#[tokio::test]
async fn sends_params_and_token_and_parses_json() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", PATH)
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("pageNo".into(), "3".into()),
            Matcher::UrlEncoded("ctcFilter".into(), "25to50".into()),
            Matcher::UrlEncoded("seoKey".into(), "sre-jobs-in-bangalore-3".into()),
            Matcher::UrlEncoded("sid".into(), "17457332530584631_3".into()),
        ]))
        .match_header("nkparam", "captured-token")
        .match_header("appid", "109")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"jobDetails": [{"jobId": "1"}], "noOfJobs": 1}"#)
        .create_async()
        .await;

    let body = fetcher(&server).fetch(&request(3)).await.expect("page");

    mock.assert_async().await;
    assert_eq!(body["jobDetails"][0]["jobId"], "1");
}

#[tokio::test]
async fn rate_limit_keeps_a_body_snippet() {
    let mut server = mockito::Server::new_async().await;
    let body = format!("{{\"message\": \"slow down\", \"pad\": \"{}\"}}", "x".repeat(1000));
    server
        .mock("GET", PATH)
        .match_query(Matcher::Any)
        .with_status(429)
        .with_body(body)
        .create_async()
        .await;

    let err = fetcher(&server).fetch(&request(1)).await.unwrap_err();

    match &err {
        Error::HttpStatus { status, snippet } => {
            assert_eq!(*status, 429);
            assert!(snippet.starts_with("{\"message\": \"slow down\""));
            assert_eq!(snippet.len(), 500);
        }
        other => panic!("expected HttpStatus, got {other:?}"),
    }
    assert!(err.is_auth_or_rate_limit());
}

#[tokio::test]
async fn forbidden_without_body_keeps_status() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", PATH)
        .match_query(Matcher::Any)
        .with_status(403)
        .create_async()
        .await;

    let err = fetcher(&server).fetch(&request(1)).await.unwrap_err();

    match &err {
        Error::HttpStatus { status, snippet } => {
            assert_eq!(*status, 403);
            assert!(snippet.is_empty(), "{snippet}");
        }
        other => panic!("expected HttpStatus, got {other:?}"),
    }
    assert!(err.is_auth_or_rate_limit());
}

#[tokio::test]
async fn non_json_body_is_malformed() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("<html>captcha</html>")
        .create_async()
        .await;

    let err = fetcher(&server).fetch(&request(1)).await.unwrap_err();
    assert!(matches!(err, Error::MalformedResponse(_)), "{err:?}");
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    // Nothing listens on port 9 of localhost in the test environment.
    let fetcher = HttpFetcher::new("http://127.0.0.1:9/search", Duration::from_secs(2)).unwrap();
    let err = fetcher.fetch(&request(1)).await.unwrap_err();
    assert!(matches!(err, Error::TransientNetwork(_)), "{err:?}");
}

#[tokio::test]
async fn campaign_over_http_persists_until_empty_page() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", PATH)
        .match_query(Matcher::UrlEncoded("pageNo".into(), "1".into()))
        .with_status(200)
        .with_body(
            r#"{"jobDetails": [
                {"jobId": "11", "title": "SRE", "placeholders": [{"type": "location", "label": "Bengaluru"}]},
                {"jobId": "11", "title": "SRE again"},
                {"jobId": "12", "experienceText": "6-10 Yrs"}
            ]}"#,
        )
        .create_async()
        .await;
    server
        .mock("GET", PATH)
        .match_query(Matcher::UrlEncoded("pageNo".into(), "2".into()))
        .with_status(200)
        .with_body(r#"{"jobDetails": []}"#)
        .create_async()
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let settings = Settings {
        base_url: format!("{}{PATH}", server.url()),
        output_dir: tmp.path().into(),
        fetch_delay_base: 0.0,
        fetch_delay_random: 0.0,
        max_pages: 5,
        ..Settings::default()
    };
    let scraper = Scraper::new(
        settings.clone(),
        Box::new(HttpFetcher::new(&settings.base_url, settings.request_timeout()).unwrap()),
        Box::new(StaticToken::new("captured-token")),
    );

    let reports = scraper.process_campaign().await;

    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert!(matches!(report.termination, Termination::EndOfResults { page: 2 }));
    assert_eq!(report.raw_jobs, 3);
    assert_eq!(report.unique_jobs, 2);

    let output = report.output.as_ref().unwrap();
    let csv = std::fs::read_to_string(&output.csv).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("jobId,title,companyName,experience,salary,location,tagsAndSkills,jobDescription,jdURL,fetchTimestamp")
    );
    let first = lines.next().unwrap();
    assert!(first.starts_with("11,SRE,,Not Specified,Not Specified,Bengaluru,"), "{first}");
    assert!(first.ends_with(&output.timestamp), "{first}");
    let second = lines.next().unwrap();
    assert!(second.starts_with("12,,,6-10 Yrs,"), "{second}");
    assert!(lines.next().is_none());
}
