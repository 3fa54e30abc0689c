//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a small catalog and drive the full
//! search, detail, cross-reference chain end-to-end over HTTP.

use discogs_chain::config::{
    parse_config, Config, CrawlConfig, FetchConfig, OutputConfig, SiteConfig, UserAgentConfig,
};
use discogs_chain::crawler::{run_crawl, Coordinator, CrawlOutcome, HttpFetcher, ScraperExtractor};
use discogs_chain::output::load_statistics;
use discogs_chain::storage::{JsonlLinkQueue, JsonlRecordSink, LinkQueue, RecordSink};
use discogs_chain::{ChainError, Record};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, dir: &TempDir, crawl: CrawlConfig) -> Config {
    Config {
        site: SiteConfig {
            base_url: base_url.to_string(),
            search_path: "/search/".to_string(),
            category_filter: "Rock".to_string(),
            page_size: 250,
            start_page: 1,
        },
        fetch: FetchConfig {
            wait_for_load: false,
            settle_delay_ms: 0,
            timeout_ms: 5000,
            max_retries: 0,
            retry_base_delay_ms: 1,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            queue_path: dir.path().join("links.jsonl").display().to_string(),
            records_path: dir.path().join("albums.jsonl").display().to_string(),
            cursor_path: Some(dir.path().join("cursor.json").display().to_string()),
        },
        crawl,
    }
}

fn search_page(links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|l| format!(r#"<li><a class="search_result_title" href="{}">x</a></li>"#, l))
        .collect();
    format!("<html><body><ul>{}</ul></body></html>", anchors)
}

fn detail_page(title: &str, year: &str) -> String {
    format!(
        r#"<html><body>
           <a href="/genre/Rock">Rock</a>
           <h1><span><a href="/artist/1-Danzig">Danzig</a></span> – {title}</h1>
           <a href="/search/?year={year}"><time datetime="{year}">{year}</time></a>
           <table>
             <tr><th><h2>Label:</h2></th><td><a href="/label/1">Def American</a></td></tr>
             <tr><th><h2>Style:</h2></th><td><a href="/style/Heavy+Metal">Heavy Metal</a></td></tr>
           </table>
           <table>
             <tr>
               <td class="trackPos_a"><span>1</span></td>
               <td><span class="trackTitle_b">Twist of Cain</span></td>
               <td class="duration_c"><span><span>4:19</span></span></td>
             </tr>
             <tr>
               <td class="trackPos_a"><span>2</span></td>
               <td><span class="trackTitle_b">Not of This World</span></td>
               <td class="duration_c"><span><span>4:04</span></span></td>
             </tr>
           </table>
           </body></html>"#
    )
}

fn artist_page() -> String {
    r#"<html><body><table>
         <tr><th><h2>Sites:</h2></th><td><a href="https://danzig.example">danzig.example</a></td></tr>
         <tr><th><h2>Members:</h2></th>
             <td><a href="/artist/2"><span>Glenn Danzig</span></a>,
                 <a href="/artist/3"><span>John Christ</span></a></td></tr>
       </table></body></html>"#
        .to_string()
}

/// Mounts a catalog with three releases on page 1 and nothing on page 2
async fn mount_catalog(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/search/"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(search_page(&[
            "/release/111",
            "/release/222",
            "/release/333",
        ])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search/"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(search_page(&[])))
        .mount(server)
        .await;

    for (release, title, year) in [
        ("/release/111", "Danzig", "1988"),
        ("/release/222", "Lucifuge", "1990"),
        ("/release/333", "How the Gods Kill", "1992"),
    ] {
        Mock::given(method("GET"))
            .and(path(release))
            .respond_with(ResponseTemplate::new(200).set_body_string(detail_page(title, year)))
            .mount(server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/artist/1-Danzig"))
        .respond_with(ResponseTemplate::new(200).set_body_string(artist_page()))
        .mount(server)
        .await;
}

fn limits(max_empty_pages: Option<u32>, max_records: Option<u64>) -> CrawlConfig {
    CrawlConfig {
        max_empty_pages,
        max_records,
    }
}

fn records_on_disk(config: &Config) -> Vec<Record> {
    JsonlRecordSink::open(Path::new(&config.output.records_path))
        .expect("Failed to open record file")
        .read_all()
        .expect("Failed to read records")
}

fn queue_on_disk(config: &Config) -> Vec<String> {
    JsonlLinkQueue::open(Path::new(&config.output.queue_path))
        .expect("Failed to open link queue")
        .pending()
        .into_iter()
        .map(|e| e.reference)
        .collect()
}

fn coordinator(config: &Config, fresh: bool) -> Coordinator<HttpFetcher, ScraperExtractor> {
    let fetcher = HttpFetcher::new(config).expect("Failed to build fetcher");
    Coordinator::new(config, fetcher, ScraperExtractor::new(), fresh)
        .expect("Failed to create coordinator")
}

#[tokio::test]
async fn test_full_crawl_until_exhausted() {
    let mock_server = MockServer::start().await;
    mount_catalog(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), &dir, limits(Some(1), None));

    let report = coordinator(&config, false).run().await.unwrap();

    assert_eq!(report.outcome, CrawlOutcome::Exhausted);
    assert_eq!(report.records_emitted, 3);
    assert_eq!(report.page_number, 2);
    assert_eq!(report.pending_links, 0);

    let records = records_on_disk(&config);
    let ids: Vec<u64> = records.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);

    let titles: Vec<&str> = records
        .iter()
        .filter_map(|r| r.album_title.as_deref())
        .collect();
    assert_eq!(titles, vec!["Danzig", "Lucifuge", "How the Gods Kill"]);

    let first = &records[0];
    assert_eq!(first.genre.as_deref(), Some("Rock"));
    assert_eq!(first.artist_name.as_deref(), Some("Danzig"));
    assert_eq!(first.album_release_year.as_deref(), Some("1988"));
    assert!(first.album_record_label.contains("Def American"));
    assert!(first.album_styles.contains("Heavy Metal"));
    assert!(first.artist_members.contains("Glenn Danzig"));
    assert!(first.artist_members.contains("John Christ"));
    assert!(first.artist_websites.contains("https://danzig.example"));
    assert_eq!(first.album_tracks.len(), 2);
    assert_eq!(first.album_tracks[1].name, "Not of This World");

    assert!(queue_on_disk(&config).is_empty());
}

#[tokio::test]
async fn test_search_request_carries_paging_and_category() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/"))
        .and(query_param("limit", "250"))
        .and(query_param("genre_exact", "Rock"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(search_page(&[])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), &dir, limits(Some(1), None));

    let report = coordinator(&config, false).run().await.unwrap();

    assert_eq!(report.outcome, CrawlOutcome::Exhausted);
    assert_eq!(report.records_emitted, 0);
}

#[tokio::test]
async fn test_record_limit_leaves_rest_of_page_queued() {
    let mock_server = MockServer::start().await;
    mount_catalog(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), &dir, limits(Some(1), Some(1)));

    let report = coordinator(&config, false).run().await.unwrap();

    assert_eq!(report.outcome, CrawlOutcome::RecordLimitReached);
    assert_eq!(report.pending_links, 2);
    assert_eq!(queue_on_disk(&config), vec!["/release/222", "/release/333"]);

    let records = records_on_disk(&config);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, 1);
    assert_eq!(records[0].album_title.as_deref(), Some("Danzig"));
}

#[tokio::test]
async fn test_resume_continues_queue_and_ids() {
    let mock_server = MockServer::start().await;
    mount_catalog(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let first_run = create_test_config(&mock_server.uri(), &dir, limits(Some(1), Some(1)));
    coordinator(&first_run, false).run().await.unwrap();

    let second_run = create_test_config(&mock_server.uri(), &dir, limits(Some(1), None));
    let report = coordinator(&second_run, false).run().await.unwrap();

    assert_eq!(report.outcome, CrawlOutcome::Exhausted);
    assert_eq!(report.records_emitted, 2);

    let records = records_on_disk(&second_run);
    let ids: Vec<u64> = records.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(records[2].album_title.as_deref(), Some("How the Gods Kill"));
}

#[tokio::test]
async fn test_fresh_run_keeps_records_and_continues_ids() {
    let mock_server = MockServer::start().await;
    mount_catalog(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), &dir, limits(Some(1), Some(1)));
    coordinator(&config, false).run().await.unwrap();

    let report = coordinator(&config, true).run().await.unwrap();

    assert_eq!(report.outcome, CrawlOutcome::RecordLimitReached);

    let records = records_on_disk(&config);
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].id, 2);
    assert_eq!(records[1].album_title.as_deref(), Some("Danzig"));
    assert_eq!(queue_on_disk(&config), vec!["/release/222", "/release/333"]);
}

#[tokio::test]
async fn test_failed_detail_fetch_is_fatal() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/"))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(search_page(&["/release/404", "/release/222"])),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/release/404"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), &dir, limits(Some(1), None));

    let result = coordinator(&config, false).run().await;

    assert!(matches!(result, Err(ChainError::Fetch(_))));
    assert!(records_on_disk(&config).is_empty());
    assert_eq!(queue_on_disk(&config), vec!["/release/222"]);
}

#[tokio::test]
async fn test_crawl_from_toml_config() {
    let mock_server = MockServer::start().await;
    mount_catalog(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let toml = format!(
        r#"
[site]
base-url = "{base}"
category-filter = "Rock"
page-size = 250

[fetch]
wait-for-load = false
timeout-ms = 5000

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[output]
queue-path = "{queue}"
records-path = "{records}"

[crawl]
max-empty-pages = 1
"#,
        base = mock_server.uri(),
        queue = dir.path().join("links.jsonl").display(),
        records = dir.path().join("albums.jsonl").display(),
    );
    let config = parse_config(&toml).expect("Failed to parse config");

    let report = run_crawl(&config, false, None).await.unwrap();
    assert_eq!(report.outcome, CrawlOutcome::Exhausted);

    let queue = JsonlLinkQueue::open(Path::new(&config.output.queue_path)).unwrap();
    let sink = JsonlRecordSink::open(Path::new(&config.output.records_path)).unwrap();
    assert!(queue.is_empty());
    assert_eq!(sink.count(), 3);

    let stats = load_statistics(&queue, &sink).unwrap();
    assert_eq!(stats.records_written, 3);
    assert_eq!(stats.last_record_id, Some(3));
    assert_eq!(stats.total_tracks, 6);
    assert_eq!(stats.records_without_members, 0);
}
