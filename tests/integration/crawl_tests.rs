//! Integration tests for the crawler
//!
//! Most tests drive the coordinator over an in-process fake site so that
//! fetch order, timing and call counts can be observed. The last test uses
//! wiremock to run the production HTTP fetcher end-to-end.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tidewalk::config::{Config, CrawlerConfig, OutputConfig, ScopeConfig, UserAgentConfig};
use tidewalk::crawler::{
    run_crawl, Coordinator, FetchResponse, Fetcher, HtmlAnchorParser, MarkupParser, ParseError,
};
use tidewalk::output::{LinkSink, MemoryLinkSink, OutputError, OutputResult, RunSummary};
use tidewalk::state::EntryState;
use tidewalk::storage::{FrontierStore, RunStatus, SqliteStorage};
use tidewalk::CrawlerError;
use tokio::time::{Duration, Instant};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds an HTML page large enough to pass the dead-page check
fn page(words: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">link</a> "#, href))
        .collect();
    format!(
        "<html><head><title>Fixture</title></head><body><p>{}</p>{}\
         <p>padding padding padding padding padding padding padding padding</p></body></html>",
        words, anchors
    )
}

/// Serves canned responses and records every fetch
#[derive(Default)]
struct FakeSite {
    pages: HashMap<String, FetchResponse>,
    fetches: Mutex<Vec<(String, Instant)>>,
}

impl FakeSite {
    fn new() -> Self {
        Self::default()
    }

    fn html(mut self, url: &str, body: String) -> Self {
        self.pages
            .insert(url.to_string(), FetchResponse::ok(200, body));
        self
    }

    fn response(mut self, url: &str, response: FetchResponse) -> Self {
        self.pages.insert(url.to_string(), response);
        self
    }

    fn fetched(&self) -> Vec<String> {
        self.fetches
            .lock()
            .unwrap()
            .iter()
            .map(|(u, _)| u.clone())
            .collect()
    }

    fn fetch_count(&self, url: &str) -> usize {
        self.fetched().iter().filter(|u| u.as_str() == url).count()
    }

    fn fetch_times(&self, host: &str) -> Vec<Instant> {
        self.fetches
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| Url::parse(u).unwrap().host_str() == Some(host))
            .map(|(_, at)| *at)
            .collect()
    }
}

#[async_trait]
impl Fetcher for FakeSite {
    async fn fetch(&self, url: &Url) -> FetchResponse {
        self.fetches
            .lock()
            .unwrap()
            .push((url.to_string(), Instant::now()));
        self.pages
            .get(url.as_str())
            .cloned()
            .unwrap_or_else(|| FetchResponse::failed(0, "no such page"))
    }
}

/// Panics when asked for any path containing `/boom`, otherwise serves the site
struct PanickingSite {
    site: FakeSite,
}

#[async_trait]
impl Fetcher for PanickingSite {
    async fn fetch(&self, url: &Url) -> FetchResponse {
        if url.path().contains("/boom") {
            panic!("fetcher blew up on {}", url);
        }
        self.site.fetch(url).await
    }
}

/// Delegates to the HTML parser and counts calls
#[derive(Default)]
struct CountingParser {
    calls: AtomicUsize,
}

impl MarkupParser for CountingParser {
    fn parse(&self, content: &[u8]) -> Result<Vec<String>, ParseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        HtmlAnchorParser::new().parse(content)
    }
}

/// Fails the first write, then behaves like a memory sink
#[derive(Default)]
struct FlakySink {
    failed: AtomicUsize,
    inner: MemoryLinkSink,
}

impl LinkSink for FlakySink {
    fn record(&self, url: &Url) -> OutputResult<()> {
        if self.failed.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(OutputError::Write("disk full".to_string()));
        }
        self.inner.record(url)
    }
}

fn create_test_config(seeds: &[&str], workers: usize, delay_ms: u64) -> Config {
    Config {
        crawler: CrawlerConfig {
            workers,
            politeness_delay_ms: delay_ms,
            max_page_bytes: 64 * 1024,
            top_words: 10,
            max_worker_restarts: 3,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        scope: ScopeConfig {
            allowed_suffixes: vec!["ics.uci.edu".to_string(), "stat.uci.edu".to_string()],
            root_domain: "uci.edu".to_string(),
        },
        output: OutputConfig {
            database_path: ":memory:".to_string(),
            discovered_links_path: "links.txt".to_string(),
            summary_path: "summary.md".to_string(),
        },
        seeds: seeds.iter().map(|s| s.to_string()).collect(),
    }
}

async fn crawl_with(
    config: Config,
    store: Box<dyn FrontierStore>,
    fresh: bool,
    site: Arc<FakeSite>,
    parser: Arc<dyn MarkupParser>,
    links: Arc<dyn LinkSink>,
) -> RunSummary {
    let coordinator =
        Coordinator::with_components(config, "test", fresh, store, site, parser, links)
            .expect("Failed to create coordinator");
    coordinator.run().await.expect("Crawl failed")
}

async fn crawl(config: Config, site: Arc<FakeSite>) -> RunSummary {
    crawl_with(
        config,
        Box::new(SqliteStorage::new_in_memory().unwrap()),
        true,
        site,
        Arc::new(HtmlAnchorParser::new()),
        Arc::new(MemoryLinkSink::new()),
    )
    .await
}

/// A small two-host site with a cycle and a few filtered links
fn two_host_site() -> FakeSite {
    FakeSite::new()
        .html(
            "https://www.ics.uci.edu/",
            page(
                "welcome research",
                &[
                    "/people",
                    "/research#top",
                    "https://www.stat.uci.edu/",
                    "/syllabus.pdf",
                    "/search?q=x",
                    "https://evil.com/",
                ],
            ),
        )
        .html(
            "https://www.ics.uci.edu/people",
            page("faculty students research", &["/", "/research"]),
        )
        .html(
            "https://www.ics.uci.edu/research",
            page("machine learning research", &["/people"]),
        )
        .html(
            "https://www.stat.uci.edu/",
            page("statistics research data", &["https://www.ics.uci.edu/"]),
        )
}

#[tokio::test]
async fn test_crawl_fetches_each_reachable_page_once() {
    let site = Arc::new(two_host_site());
    let summary = crawl(
        create_test_config(&["https://www.ics.uci.edu/"], 3, 0),
        Arc::clone(&site),
    )
    .await;

    let mut fetched = site.fetched();
    fetched.sort();
    assert_eq!(
        fetched,
        vec![
            "https://www.ics.uci.edu/",
            "https://www.ics.uci.edu/people",
            "https://www.ics.uci.edu/research",
            "https://www.stat.uci.edu/",
        ]
    );

    assert_eq!(summary.stats.unique_pages, 4);
    assert_eq!(summary.completed, 4);
    assert_eq!(summary.queued, 0);
    assert_eq!(summary.worker_faults, 0);
}

#[tokio::test]
async fn test_discovered_links_are_filtered() {
    let site = Arc::new(two_host_site());
    let links = Arc::new(MemoryLinkSink::new());
    crawl_with(
        create_test_config(&["https://www.ics.uci.edu/"], 1, 0),
        Box::new(SqliteStorage::new_in_memory().unwrap()),
        true,
        Arc::clone(&site),
        Arc::new(HtmlAnchorParser::new()),
        Arc::clone(&links) as Arc<dyn LinkSink>,
    )
    .await;

    let recorded = links.urls();
    assert!(recorded.contains(&"https://www.ics.uci.edu/research".to_string()));
    assert!(recorded.iter().all(|u| !u.contains("evil.com")));
    assert!(recorded.iter().all(|u| !u.ends_with(".pdf")));
    assert!(recorded.iter().all(|u| !u.contains('?')));
    assert!(recorded.iter().all(|u| !u.contains('#')));
}

#[tokio::test]
async fn test_summary_statistics() {
    let site = Arc::new(two_host_site());
    let summary = crawl(
        create_test_config(&["https://www.ics.uci.edu/"], 2, 0),
        site,
    )
    .await;

    let stats = &summary.stats;
    assert_eq!(stats.top_words[0], ("padding".to_string(), 32));
    assert_eq!(stats.top_words[1].0, "link");
    assert!(stats
        .top_words
        .iter()
        .any(|(w, c)| w == "research" && *c == 4));

    let subdomains: Vec<(&str, u64)> = stats
        .subdomains
        .iter()
        .map(|(k, v)| (k.as_str(), *v))
        .collect();
    assert_eq!(
        subdomains,
        vec![("www.ics.uci.edu", 3), ("www.stat.uci.edu", 1)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_same_host_requests_are_spaced() {
    let mut site = FakeSite::new();
    let mut links = Vec::new();
    for i in 0..6 {
        links.push(format!("/p{}", i));
        site = site.html(
            &format!("https://www.ics.uci.edu/p{}", i),
            page(&format!("page number{}", i), &[]),
        );
    }
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();
    site = site
        .html("https://www.ics.uci.edu/", page("index", &link_refs))
        .html("https://www.stat.uci.edu/", page("statistics", &[]));
    let site = Arc::new(site);

    crawl(
        create_test_config(&["https://www.ics.uci.edu/", "https://www.stat.uci.edu/"], 4, 1000),
        Arc::clone(&site),
    )
    .await;

    let times = site.fetch_times("www.ics.uci.edu");
    assert_eq!(times.len(), 7);
    for pair in times.windows(2) {
        assert!(
            pair[1] - pair[0] >= Duration::from_millis(1000),
            "requests {:?} apart",
            pair[1] - pair[0]
        );
    }

    // The other host was served without waiting for the busy one
    let stat = site.fetch_times("www.stat.uci.edu");
    assert_eq!(stat.len(), 1);
    assert!(stat[0] - times[0] < Duration::from_millis(1000));
}

#[tokio::test]
async fn test_duplicate_content_is_not_parsed_again() {
    let same = page("mirror content", &["/unique"]);
    let site = Arc::new(
        FakeSite::new()
            .html(
                "https://www.ics.uci.edu/",
                page("index", &["/mirror-a", "/mirror-b"]),
            )
            .html("https://www.ics.uci.edu/mirror-a", same.clone())
            .html("https://www.ics.uci.edu/mirror-b", same)
            .html("https://www.ics.uci.edu/unique", page("unique", &[])),
    );
    let parser = Arc::new(CountingParser::default());

    let summary = crawl_with(
        create_test_config(&["https://www.ics.uci.edu/"], 2, 0),
        Box::new(SqliteStorage::new_in_memory().unwrap()),
        true,
        Arc::clone(&site),
        Arc::clone(&parser) as Arc<dyn MarkupParser>,
        Arc::new(MemoryLinkSink::new()),
    )
    .await;

    // index, one of the mirrors, unique
    assert_eq!(parser.calls.load(Ordering::SeqCst), 3);
    assert_eq!(site.fetch_count("https://www.ics.uci.edu/unique"), 1);
    assert_eq!(summary.stats.unique_pages, 4);
}

#[tokio::test]
async fn test_classified_pages_are_not_expanded() {
    let site = Arc::new(
        FakeSite::new()
            .html(
                "https://www.ics.uci.edu/",
                page("index", &["/dead", "/missing", "/huge", "/broken"]),
            )
            .response(
                "https://www.ics.uci.edu/dead",
                FetchResponse::ok(200, r#"<a href="/from-dead">x</a>"#),
            )
            .response(
                "https://www.ics.uci.edu/missing",
                FetchResponse::ok(404, page("not found", &["/from-404"])),
            )
            .response(
                "https://www.ics.uci.edu/huge",
                FetchResponse::ok(200, page(&"word ".repeat(20_000), &["/from-huge"])),
            )
            .response(
                "https://www.ics.uci.edu/broken",
                FetchResponse::failed(0, "connection reset"),
            ),
    );

    let summary = crawl(
        create_test_config(&["https://www.ics.uci.edu/"], 2, 0),
        Arc::clone(&site),
    )
    .await;

    assert!(site.fetched().iter().all(|u| !u.contains("/from-")));
    assert_eq!(summary.completed, 5);
    assert_eq!(summary.stats.unique_pages, 1);
}

#[tokio::test]
async fn test_restart_skips_completed_urls() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("frontier.db");

    {
        let mut store = SqliteStorage::new(&db_path).unwrap();
        store.mark_complete("https://www.ics.uci.edu/a").unwrap();
        store.insert_queued("https://www.ics.uci.edu/b").unwrap();
    }

    let site = Arc::new(
        FakeSite::new()
            .html("https://www.ics.uci.edu/a", page("alpha", &["/b"]))
            .html("https://www.ics.uci.edu/b", page("beta", &["/a"])),
    );

    let summary = crawl_with(
        create_test_config(&["https://www.ics.uci.edu/a"], 2, 0),
        Box::new(SqliteStorage::new(&db_path).unwrap()),
        false,
        Arc::clone(&site),
        Arc::new(HtmlAnchorParser::new()),
        Arc::new(MemoryLinkSink::new()),
    )
    .await;

    assert_eq!(site.fetch_count("https://www.ics.uci.edu/a"), 0);
    assert_eq!(site.fetch_count("https://www.ics.uci.edu/b"), 1);
    assert_eq!(summary.completed, 2);

    let store = SqliteStorage::new(&db_path).unwrap();
    assert_eq!(store.count_by_state(EntryState::Queued).unwrap(), 0);
    assert_eq!(store.count_by_state(EntryState::Complete).unwrap(), 2);
}

#[tokio::test]
async fn test_fresh_start_ignores_saved_state() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("frontier.db");

    {
        let mut store = SqliteStorage::new(&db_path).unwrap();
        store.mark_complete("https://www.ics.uci.edu/a").unwrap();
    }

    let site = Arc::new(FakeSite::new().html("https://www.ics.uci.edu/a", page("alpha", &[])));

    crawl_with(
        create_test_config(&["https://www.ics.uci.edu/a"], 1, 0),
        Box::new(SqliteStorage::new(&db_path).unwrap()),
        true,
        Arc::clone(&site),
        Arc::new(HtmlAnchorParser::new()),
        Arc::new(MemoryLinkSink::new()),
    )
    .await;

    assert_eq!(site.fetch_count("https://www.ics.uci.edu/a"), 1);
}

#[tokio::test]
async fn test_statistics_independent_of_worker_count() {
    let seeds = ["https://www.ics.uci.edu/"];

    let single = crawl(create_test_config(&seeds, 1, 0), Arc::new(two_host_site())).await;
    let pooled = crawl(create_test_config(&seeds, 4, 0), Arc::new(two_host_site())).await;

    assert_eq!(single.stats, pooled.stats);
    assert_eq!(single.completed, pooled.completed);
}

#[tokio::test]
async fn test_faulted_worker_is_replaced() {
    let site = Arc::new(
        FakeSite::new()
            .html("https://www.ics.uci.edu/", page("first", &["/lost"]))
            .html("https://www.stat.uci.edu/", page("second", &["/found"]))
            .html("https://www.stat.uci.edu/found", page("found", &[]))
            .html("https://www.ics.uci.edu/lost", page("lost", &[])),
    );
    let sink = Arc::new(FlakySink::default());

    let summary = crawl_with(
        create_test_config(&["https://www.ics.uci.edu/", "https://www.stat.uci.edu/"], 1, 0),
        Box::new(SqliteStorage::new_in_memory().unwrap()),
        true,
        Arc::clone(&site),
        Arc::new(HtmlAnchorParser::new()),
        Arc::clone(&sink) as Arc<dyn LinkSink>,
    )
    .await;

    assert_eq!(summary.worker_faults, 1);
    assert_eq!(site.fetch_count("https://www.ics.uci.edu/lost"), 0);
    assert_eq!(site.fetch_count("https://www.stat.uci.edu/found"), 1);
    assert_eq!(summary.queued, 0);
}

#[tokio::test]
async fn test_panicking_worker_does_not_stall_the_pool() {
    let site = Arc::new(PanickingSite {
        site: FakeSite::new()
            .html("https://www.ics.uci.edu/ok", page("fine", &["/after"]))
            .html("https://www.ics.uci.edu/after", page("later", &[])),
    });
    let config = create_test_config(
        &["https://www.ics.uci.edu/boom", "https://www.ics.uci.edu/ok"],
        2,
        0,
    );

    let coordinator = Coordinator::with_components(
        config,
        "test",
        true,
        Box::new(SqliteStorage::new_in_memory().unwrap()),
        Arc::clone(&site) as Arc<dyn Fetcher>,
        Arc::new(HtmlAnchorParser::new()),
        Arc::new(MemoryLinkSink::new()),
    )
    .expect("Failed to create coordinator");
    let frontier = Arc::clone(coordinator.frontier());

    let summary = tokio::time::timeout(Duration::from_secs(10), coordinator.run())
        .await
        .expect("Pool did not finish after a worker panic")
        .expect("Crawl failed");

    assert_eq!(summary.worker_faults, 1);
    assert_eq!(summary.queued, 0);
    assert_eq!(summary.completed, 3);
    assert_eq!(frontier.in_flight_len(), 0);
    assert_eq!(
        frontier.state_of("https://www.ics.uci.edu/boom"),
        Some(EntryState::Complete)
    );
    assert_eq!(site.site.fetch_count("https://www.ics.uci.edu/after"), 1);
}

#[tokio::test]
async fn test_run_marked_failed_when_restarts_run_out() {
    let site = Arc::new(
        FakeSite::new()
            .html("https://www.ics.uci.edu/", page("first", &["/lost"]))
            .html("https://www.stat.uci.edu/", page("second", &[])),
    );
    let mut config =
        create_test_config(&["https://www.ics.uci.edu/", "https://www.stat.uci.edu/"], 1, 0);
    config.crawler.max_worker_restarts = 0;

    let coordinator = Coordinator::with_components(
        config,
        "test",
        true,
        Box::new(SqliteStorage::new_in_memory().unwrap()),
        Arc::clone(&site) as Arc<dyn Fetcher>,
        Arc::new(HtmlAnchorParser::new()),
        Arc::new(FlakySink::default()),
    )
    .expect("Failed to create coordinator");
    let run_id = coordinator.run_id();
    let frontier = Arc::clone(coordinator.frontier());

    let summary = coordinator.run().await.expect("Crawl failed");

    assert_eq!(summary.worker_faults, 1);
    assert_eq!(summary.queued, 1);
    let run = frontier.with_store(|store| store.get_run(run_id)).unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.finished_at.is_some());
}

#[tokio::test]
async fn test_unopenable_database_fails_before_fetching() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page("home", &[])))
        .mount(&mock_server)
        .await;

    // A regular file where a directory is expected
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "x").unwrap();

    let seed = format!("{}/", mock_server.uri());
    let mut config = create_test_config(&[seed.as_str()], 2, 0);
    config.output.database_path = blocker.join("crawl.db").display().to_string();
    config.output.discovered_links_path = dir.path().join("links.txt").display().to_string();
    config.output.summary_path = dir.path().join("summary.md").display().to_string();

    let result = run_crawl(config, "test", true).await;

    assert!(matches!(result, Err(CrawlerError::Storage(_))));
    let requests = mock_server.received_requests().await.unwrap_or_default();
    assert!(requests.is_empty());
    assert!(!dir.path().join("summary.md").exists());
}

#[tokio::test]
async fn test_full_crawl_over_http() {
    // Start a mock server
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let host = Url::parse(&base_url)
        .expect("Failed to parse base URL")
        .host_str()
        .expect("Failed to extract host")
        .to_string();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(page("home", &["/page1", "/page2"]))
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(page("first", &["/", "/report.pdf"]))
                .insert_header("content-type", "text/html"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(page("second", &["/page1"]))
                .insert_header("content-type", "text/html"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    // Filtered out by extension, never requested
    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let seed = format!("{}/", base_url);
    let mut config = create_test_config(&[seed.as_str()], 2, 10);
    config.scope.allowed_suffixes = vec![host.clone()];
    config.scope.root_domain = host;
    config.output.database_path = dir.path().join("crawl.db").display().to_string();
    config.output.discovered_links_path = dir.path().join("links.txt").display().to_string();
    config.output.summary_path = dir.path().join("summary.md").display().to_string();
    let summary_path = config.output.summary_path.clone();
    let links_path = config.output.discovered_links_path.clone();
    let db_path = config.output.database_path.clone();

    let summary = run_crawl(config, "test", true).await.expect("Crawl failed");

    assert_eq!(summary.stats.unique_pages, 3);
    assert_eq!(summary.completed, 3);

    let markdown = std::fs::read_to_string(&summary_path).expect("Summary not written");
    assert!(markdown.contains("- **Unique Pages**: 3"));

    let links = std::fs::read_to_string(&links_path).expect("Links not written");
    assert!(links.contains(&format!("{}/page1", base_url)));
    assert!(links.contains(&format!("{}/page2", base_url)));
    assert!(!links.contains("report.pdf"));

    let store = SqliteStorage::new(std::path::Path::new(&db_path)).expect("Failed to open DB");
    assert_eq!(store.count_by_state(EntryState::Complete).unwrap(), 3);
    let run = store.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status.to_db_string(), "completed");

    // Wiremock verifies expectations when mock_server drops
}
