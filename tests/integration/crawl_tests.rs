//! Integration tests for the harvester
//!
//! These tests use wiremock to serve a miniature course calendar and run
//! the full harvest-and-load cycle end-to-end.

use calendar_harvest::config::{Config, DatabaseConfig, FetcherConfig, SiteConfig};
use calendar_harvest::crawler::{run_harvest, Harvester};
use calendar_harvest::storage::{SqliteStorage, Storage};
use calendar_harvest::{FetchError, HarvestError, LoadError, SequenceState};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing both seeds at the mock server
fn create_test_config(base_url: &str, db_path: &str) -> Config {
    let domain = url::Url::parse(base_url)
        .expect("Failed to parse base URL")
        .host_str()
        .expect("Failed to extract host")
        .to_string();

    Config {
        site: SiteConfig {
            allowed_domain: domain,
            course_seed: format!("{}/search-courses", base_url),
            subject_area_seed: format!("{}/listing-program-areas", base_url),
        },
        fetcher: FetcherConfig {
            base_delay_ms: 10, // Very short for testing
            jitter_ms: 5,
            timeout_secs: 5,
            user_agent: "TestBot/1.0".to_string(),
            proxies: vec![],
        },
        database: DatabaseConfig {
            path: db_path.to_string(),
            course_table: "courses".to_string(),
            program_table: "programs".to_string(),
            max_lifetime_secs: 180,
            max_open: 1,
            max_idle: 1,
        },
    }
}

fn db_path(dir: &TempDir) -> String {
    dir.path().join("calendar.db").to_string_lossy().to_string()
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!("<html><body>{}</body></html>", body))
        .insert_header("content-type", "text/html")
}

fn course_row(header: &str) -> String {
    format!(
        r#"<div class="views-row"><h3><div aria-label="{0}">{0}</div></h3></div>"#,
        header
    )
}

fn program_row(header: &str) -> String {
    format!(
        r#"<article><div class="w3-row"><h3>{}</h3><p>Enrolment requirements</p></div></article>"#,
        header
    )
}

fn next_link(href: &str) -> String {
    format!(
        r#"<ul class="pager"><li class="pager__item pager__item--next"><a href="{}">Next</a></li></ul>"#,
        href
    )
}

/// Mounts a single-page course listing
async fn mount_courses(server: &MockServer, rows: &[&str]) {
    let body: String = rows.iter().map(|row| course_row(row)).collect();
    Mock::given(method("GET"))
        .and(path("/search-courses"))
        .respond_with(html(&body))
        .mount(server)
        .await;
}

/// Mounts a subject area index and one listing page per area
async fn mount_programs(server: &MockServer, areas: &[(&str, &str, Vec<&str>)]) {
    let index: String = areas
        .iter()
        .map(|(slug, name, _)| format!(r#"<a href="/section/{}">{}</a>"#, slug, name))
        .collect();

    Mock::given(method("GET"))
        .and(path("/listing-program-areas"))
        .respond_with(html(&format!(
            r#"<a href="/about">About</a>{}"#,
            index
        )))
        .mount(server)
        .await;

    for (slug, _, headers) in areas {
        let body: String = headers.iter().map(|header| program_row(header)).collect();
        Mock::given(method("GET"))
            .and(path(format!("/section/{}", slug)))
            .respond_with(html(&body))
            .mount(server)
            .await;
    }
}

#[tokio::test]
async fn test_full_harvest_and_load() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // Page 2 of the course listing; mounted first so it wins over the
    // path-only matcher below
    Mock::given(method("GET"))
        .and(path("/search-courses"))
        .and(query_param("page", "1"))
        .respond_with(html(&course_row(
            "CSC148H1 - Introduction to Computer Science",
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search-courses"))
        .respond_with(html(&format!(
            "{}{}",
            course_row("CSC108H1 - Introduction to Computer Programming"),
            next_link("?page=1")
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    mount_programs(
        &mock_server,
        &[(
            "computer-science",
            "Computer Science",
            vec![
                "Computer Science (Specialist) - ASSPE1689",
                "Computer Science (Major) - ASMAJ1689",
                "Admission to Computer Science",
            ],
        )],
    )
    .await;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(&base_url, &db_path(&temp_dir));

    let summary = run_harvest(&config, "test-hash")
        .await
        .expect("Harvest failed");

    assert!(summary.report.is_complete());
    assert_eq!(summary.report.courses.pages_fetched, 2);
    assert_eq!(summary.report.subject_areas.len(), 1);
    assert_eq!(summary.report.program_sequences_done, 1);
    assert_eq!(summary.load.courses, 2);
    assert_eq!(summary.load.programs, 2);

    let storage = SqliteStorage::open(&config.database).expect("Failed to open DB");
    assert_eq!(storage.count_courses().expect("Failed to count courses"), 2);
    assert_eq!(storage.count_programs().expect("Failed to count programs"), 2);

    let run = storage
        .get_latest_run()
        .expect("Failed to read run ledger")
        .expect("No run recorded");
    assert_eq!(run.id, summary.load.run_id);
    assert_eq!(run.config_hash, "test-hash");
    assert_eq!(run.course_count, 2);
    assert_eq!(run.program_count, 2);
    assert_eq!(run.failed_subject_areas, 0);
}

#[tokio::test]
async fn test_failed_subject_area_is_isolated() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_courses(&mock_server, &["MAT137Y1 - Calculus with Proofs"]).await;

    // The broken area comes first in the index; the loop must still reach
    // the second one
    Mock::given(method("GET"))
        .and(path("/section/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    mount_programs(
        &mock_server,
        &[
            ("broken", "Broken Area", vec![]),
            (
                "mathematics",
                "Mathematics",
                vec!["Mathematics (Minor) - ASMIN1540"],
            ),
        ],
    )
    .await;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(&base_url, &db_path(&temp_dir));

    let summary = run_harvest(&config, "test-hash")
        .await
        .expect("Harvest failed");

    let report = &summary.report;
    assert!(!report.is_complete());
    assert_eq!(report.subject_areas.len(), 2);
    assert_eq!(report.program_sequences_done, 1);
    assert_eq!(report.failed_subject_areas.len(), 1);
    assert_eq!(report.failed_subject_areas[0].name, "Broken Area");
    assert!(report.failed_subject_areas[0].url.ends_with("/section/broken"));

    assert_eq!(summary.load.courses, 1);
    assert_eq!(summary.load.programs, 1);

    let storage = SqliteStorage::open(&config.database).expect("Failed to open DB");
    let run = storage
        .get_latest_run()
        .expect("Failed to read run ledger")
        .expect("No run recorded");
    assert_eq!(run.failed_subject_areas, 1);
}

#[tokio::test]
async fn test_course_failure_aborts_only_course_sequence() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/search-courses"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;

    mount_programs(
        &mock_server,
        &[(
            "statistics",
            "Statistics",
            vec!["Statistical Science (Focus) - ASFOC2020"],
        )],
    )
    .await;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(&base_url, &db_path(&temp_dir));

    let harvester = Harvester::new(&config).expect("Failed to create harvester");
    let report = harvester.run().await.expect("Harvest failed");

    assert_eq!(report.courses.state, SequenceState::Aborted);
    assert_eq!(report.courses.pages_fetched, 0);
    match &report.courses.error {
        Some(FetchError::Status { status, .. }) => assert_eq!(*status, 503),
        other => panic!("Expected status error, got {:?}", other),
    }

    assert!(report.subject_index.is_success());
    assert_eq!(report.program_count, 1);

    let snapshot = harvester.snapshot();
    assert!(snapshot.courses.is_empty());
    assert_eq!(snapshot.programs[0].code, "ASFOC2020");
}

#[tokio::test]
async fn test_out_of_scope_next_link_is_not_followed() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let port = url::Url::parse(&base_url)
        .expect("Failed to parse base URL")
        .port()
        .expect("Mock server has no port");

    // Same server, different host name: must never be requested
    Mock::given(method("GET"))
        .and(path("/elsewhere"))
        .respond_with(html(&course_row("EVL101H1 - Should Not Appear")))
        .expect(0)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search-courses"))
        .respond_with(html(&format!(
            "{}{}",
            course_row("PHY131H1 - Introduction to Physics I"),
            next_link(&format!("http://localhost:{}/elsewhere", port))
        )))
        .mount(&mock_server)
        .await;

    mount_programs(&mock_server, &[]).await;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(&base_url, &db_path(&temp_dir));

    let harvester = Harvester::new(&config).expect("Failed to create harvester");
    let report = harvester.run().await.expect("Harvest failed");

    assert!(report.courses.is_success());
    assert_eq!(report.courses.pages_fetched, 1);

    let snapshot = harvester.snapshot();
    assert_eq!(snapshot.courses.len(), 1);
    assert_eq!(snapshot.courses[0].code.as_str(), "PHY131H1");
}

#[tokio::test]
async fn test_repeated_records_are_deduplicated() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/search-courses"))
        .and(query_param("page", "1"))
        .respond_with(html(&format!(
            "{}{}",
            course_row("CSC108H1 - Introduction to Computer Programming"),
            course_row("CSC165H1 - Mathematical Expression and Reasoning")
        )))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search-courses"))
        .respond_with(html(&format!(
            "{}{}",
            course_row("CSC108H1 - Introduction to Computer Programming"),
            next_link("/search-courses?page=1")
        )))
        .mount(&mock_server)
        .await;

    // The same program listed under two subject areas
    mount_programs(
        &mock_server,
        &[
            (
                "computer-science",
                "Computer Science",
                vec!["Data Science (Specialist) - ASSPE2431"],
            ),
            (
                "statistics",
                "Statistics",
                vec!["Data Science (Specialist) - ASSPE2431"],
            ),
        ],
    )
    .await;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(&base_url, &db_path(&temp_dir));

    let summary = run_harvest(&config, "test-hash")
        .await
        .expect("Harvest failed");

    assert_eq!(summary.report.courses.records, 3);
    assert_eq!(summary.report.course_count, 2);
    assert_eq!(summary.report.program_count, 1);
    assert_eq!(summary.load.courses, 2);
    assert_eq!(summary.load.programs, 1);
}

#[tokio::test]
async fn test_second_load_into_same_tables_rolls_back() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_courses(
        &mock_server,
        &[
            "CSC108H1 - Introduction to Computer Programming",
            "CSC148H1 - Introduction to Computer Science",
        ],
    )
    .await;
    mount_programs(&mock_server, &[]).await;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(&base_url, &db_path(&temp_dir));

    let first = run_harvest(&config, "first")
        .await
        .expect("First harvest failed");
    assert_eq!(first.load.courses, 2);

    // Plain inserts: the same keys conflict on the second run
    let result = run_harvest(&config, "second").await;
    match result {
        Err(HarvestError::Load(LoadError::Conflict { table, key })) => {
            assert_eq!(table, "courses");
            assert!(key.starts_with("CSC"));
        }
        other => panic!("Expected load conflict, got {:?}", other.map(|s| s.load)),
    }

    let storage = SqliteStorage::open(&config.database).expect("Failed to open DB");
    assert_eq!(storage.count_courses().expect("Failed to count courses"), 2);

    let run = storage
        .get_latest_run()
        .expect("Failed to read run ledger")
        .expect("No run recorded");
    assert_eq!(run.config_hash, "first");
}

#[tokio::test]
async fn test_unusable_proxy_fails_before_any_request() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .respond_with(html(""))
        .expect(0)
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = create_test_config(&base_url, &db_path(&temp_dir));
    config.fetcher.proxies = vec!["ftp://proxy.example.com:21".to_string()];

    let result = run_harvest(&config, "test-hash").await;
    assert!(matches!(result, Err(HarvestError::FatalInit(_))));
}

#[tokio::test]
async fn test_pager_cycle_ends_sequence() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // page=1 links to page=0, which links back to page=1
    Mock::given(method("GET"))
        .and(path("/search-courses"))
        .and(query_param("page", "1"))
        .respond_with(html(&format!(
            "{}{}",
            course_row("CSC148H1 - Introduction to Computer Science"),
            next_link("?page=0")
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search-courses"))
        .respond_with(html(&format!(
            "{}{}",
            course_row("CSC108H1 - Introduction to Computer Programming"),
            next_link("?page=1")
        )))
        .expect(2)
        .mount(&mock_server)
        .await;

    mount_programs(&mock_server, &[]).await;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(&base_url, &db_path(&temp_dir));

    let harvester = Harvester::new(&config).expect("Failed to create harvester");
    let report = tokio::time::timeout(std::time::Duration::from_secs(10), harvester.run())
        .await
        .expect("Pagination did not terminate")
        .expect("Harvest failed");

    assert!(report.courses.is_success());
    assert_eq!(report.courses.pages_fetched, 3);
    assert_eq!(report.course_count, 2);
}

#[tokio::test]
async fn test_unreachable_proxy_is_fatal() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .respond_with(html(""))
        .expect(0)
        .mount(&mock_server)
        .await;

    // Nothing listens on the port once the listener is dropped
    let closed_port = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind listener");
        listener.local_addr().expect("No local address").port()
    };

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = create_test_config(&base_url, &db_path(&temp_dir));
    config.fetcher.proxies = vec![format!("http://127.0.0.1:{}", closed_port)];

    let result = run_harvest(&config, "test-hash").await;
    assert!(matches!(result, Err(HarvestError::FatalInit(_))));

    let storage = SqliteStorage::open(&config.database).expect("Failed to open DB");
    assert!(storage
        .get_latest_run()
        .expect("Failed to read run ledger")
        .is_none());
}

#[tokio::test]
async fn test_duplicate_subject_area_links_are_harvested_once() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_courses(&mock_server, &["MAT137Y1 - Calculus with Proofs"]).await;

    // Relative and absolute links to the same listing
    Mock::given(method("GET"))
        .and(path("/listing-program-areas"))
        .respond_with(html(&format!(
            r#"<a href="/section/mathematics">Mathematics</a>
            <a href="{}/section/mathematics">Mathematics</a>"#,
            base_url
        )))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/section/mathematics"))
        .respond_with(html(&program_row("Mathematics (Major) - ASMAJ1788")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(&base_url, &db_path(&temp_dir));

    let harvester = Harvester::new(&config).expect("Failed to create harvester");
    let report = harvester.run().await.expect("Harvest failed");

    assert!(report.is_complete());
    assert_eq!(report.subject_areas.len(), 1);
    assert_eq!(report.program_sequences_done, 1);
    assert_eq!(report.program_count, 1);
}
