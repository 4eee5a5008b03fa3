//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end: catalog, fetch, extraction, outputs,
//! cache archives and resume.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use title_trawler::cache::{CacheStore, ZipCacheStore};
use title_trawler::config::{load_config, Config};
use title_trawler::crawler::run_crawl;
use title_trawler::{FileNaming, ShardAddressor};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REFERENCES_PAGE: &str = r#"<html><body>
<div id="connections_content"><div class="list">
    <a class="li_group">Follows </a>
    <div class="soda"><a href="/title/tt0000001">Earlier</a><br/>Prequel</div>
    <a class="li_group">References </a>
    <div class="soda"><a href="/title/tt0000777">Other</a><br/>Shown on TV</div>
    <div class="soda"><a href="/title/tt0000888">Another</a><br/>Poster seen</div>
    <a class="li_group">Referenced in </a>
    <div class="soda"><a href="/title/tt0000999">Later</a><br/>Mentioned</div>
</div></div>
</body></html>"#;

const NO_REFERENCES_PAGE: &str = r#"<html><body>
<div id="connections_content"><div class="list">
    <a class="li_group">Follows </a>
    <div class="soda"><a href="/title/tt0000001">Earlier</a><br/>Prequel</div>
</div></div>
</body></html>"#;

const DETAILS_PAGE: &str = r#"<html><body>
<main class="dDUGgO">
    <span class="iTLWoV">6.1</span>
    <section data-testid="title-details-origin">
        <a class="ipc-metadata-list-item__list-content-item--link">France</a>
    </section>
    <section data-testid="title-techspec_runtime">
        <span class="ipc-metadata-list-item__list-content-item">1m</span>
    </section>
</main>
</body></html>"#;

/// Test workspace with a catalog and output locations under a temp dir
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new(catalog: &str) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(dir.path().join("catalog.tsv"), catalog).expect("Failed to write catalog");
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn base_toml(&self, server: &MockServer, page: &str, profile: &str) -> String {
        format!(
            r#"
[crawler]
profile = "{profile}"
url-template = "{base}/title/{{id}}/{page}"
max-concurrent-fetches = 3
drain-interval = 4

[catalog]
path = '{catalog}'
delimiter = "\t"
has-header = true

[cache]
prefix = '{cache}'

[fetch]
max-retries = 1
retry-delay-ms = 1
timeout-secs = 5
"#,
            base = server.uri(),
            catalog = self.path("catalog.tsv").display(),
            cache = self.path("imdb_cache").display(),
        )
    }

    /// References crawl writing JSON documents and a process log
    fn json_config(&self, server: &MockServer) -> Config {
        let toml = format!(
            r#"{}
[output]
format = "json"
json-prefix = '{}'
process-log = '{}'
"#,
            self.base_toml(server, "movieconnections/", "references"),
            self.path("reference_data").display(),
            self.path("var/references.txt").display(),
        );
        self.load(&toml)
    }

    fn csv_config(&self, server: &MockServer, page: &str, profile: &str) -> Config {
        let toml = format!(
            r#"{}
[output]
format = "csv"
csv-path = '{}'
"#,
            self.base_toml(server, page, profile),
            self.path("out/records.csv").display(),
        );
        self.load(&toml)
    }

    fn load(&self, toml: &str) -> Config {
        let config_path = self.path("config.toml");
        fs::write(&config_path, toml).expect("Failed to write config");
        load_config(&config_path).expect("Failed to load config")
    }

    fn archive_exists(&self, id: &str) -> bool {
        let addressor = ShardAddressor::new(self.path("imdb_cache"), 5000);
        let address = addressor.address(id).unwrap();
        ZipCacheStore::default().exists(&address)
    }

    fn process_log_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = fs::read_to_string(self.path("var/references.txt"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect();
        lines.sort();
        lines
    }
}

fn catalog(ids: &[&str]) -> String {
    let mut content = String::from("tconst\ttitleType\n");
    for id in ids {
        content.push_str(id);
        content.push_str("\tmovie\n");
    }
    content
}

async fn mount_page(server: &MockServer, id: &str, status: u16, body: &str, expected: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/title/{}/movieconnections/", id)))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_writes_outputs_and_archives() {
    let server = MockServer::start().await;
    mount_page(&server, "tt0000005", 200, REFERENCES_PAGE, 1).await;
    mount_page(&server, "tt0000100", 200, REFERENCES_PAGE, 1).await;

    let workspace = Workspace::new(&catalog(&["tt0000005", "tt0000100"]));
    let config = workspace.json_config(&server);

    let summary = run_crawl(config, CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert_eq!(summary.rows_read, 2);
    assert_eq!(summary.dispatched, 2);
    assert_eq!(summary.persisted, 2);
    assert_eq!(summary.records_written, 4);
    assert!(!summary.interrupted);

    // Both identifiers share shard 0 and use the space-prefixed layout
    let shard = workspace.path("imdb_cache").join("0");
    assert!(shard.join(" tt0000005.zip").is_file());
    assert!(shard.join(" tt0000100.zip").is_file());

    let document = workspace
        .path("reference_data")
        .join("0")
        .join(" tt0000005.json");
    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&document).unwrap()).unwrap();
    assert_eq!(
        value["Link"],
        format!("{}/title/tt0000005/movieconnections/", server.uri())
    );
    let references = value["References"].as_array().unwrap();
    assert_eq!(references.len(), 2);
    assert_eq!(references[0]["Subject"], "/title/tt0000777");
    assert_eq!(references[0]["Description"], "Shown on TV");
    assert_eq!(references[1]["Subject"], "/title/tt0000888");

    assert_eq!(workspace.process_log_lines(), vec!["tt0000005", "tt0000100"]);
}

#[tokio::test]
async fn test_archive_holds_full_page() {
    let server = MockServer::start().await;
    mount_page(&server, "tt0000005", 200, REFERENCES_PAGE, 1).await;

    let workspace = Workspace::new(&catalog(&["tt0000005"]));
    run_crawl(workspace.json_config(&server), CancellationToken::new())
        .await
        .unwrap();

    let addressor = ShardAddressor::new(workspace.path("imdb_cache"), 5000);
    let address = addressor.address("tt0000005").unwrap();
    let payload = ZipCacheStore::new(FileNaming::Legacy, "data.txt")
        .read(&address)
        .unwrap();
    assert_eq!(payload, REFERENCES_PAGE.as_bytes());
}

#[tokio::test]
async fn test_resume_skips_cached_titles() {
    let workspace = Workspace::new(&catalog(&["tt0000005", "tt0000100", "tt0035000"]));

    {
        let server = MockServer::start().await;
        for id in ["tt0000005", "tt0000100", "tt0035000"] {
            mount_page(&server, id, 200, REFERENCES_PAGE, 1).await;
        }
        let summary = run_crawl(workspace.json_config(&server), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(summary.dispatched, 3);
    }

    // A second run against a fresh server must not fetch anything
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(REFERENCES_PAGE))
        .expect(0)
        .mount(&server)
        .await;

    let summary = run_crawl(workspace.json_config(&server), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.cache_hits, 3);
    assert_eq!(summary.dispatched, 0);
    assert!(workspace.path("imdb_cache").join("7").join(" tt0035000.zip").is_file());
}

#[tokio::test]
async fn test_failed_fetch_is_isolated_and_retried_next_run() {
    let ids: Vec<String> = (1..=10).map(|n| format!("tt{:07}", n)).collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let workspace = Workspace::new(&catalog(&id_refs));

    {
        let server = MockServer::start().await;
        for id in &ids {
            if id == "tt0000005" {
                // One attempt plus one retry
                mount_page(&server, id, 500, "upstream down", 2).await;
            } else {
                mount_page(&server, id, 200, REFERENCES_PAGE, 1).await;
            }
        }

        let summary = run_crawl(workspace.json_config(&server), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.dispatched, 10);
        assert_eq!(summary.fetch_failures, 1);
        assert_eq!(summary.persisted, 9);
        assert!(!workspace.archive_exists("tt0000005"));
        assert!(workspace.archive_exists("tt0000006"));
        assert_eq!(workspace.process_log_lines().len(), 9);
    }

    let server = MockServer::start().await;
    mount_page(&server, "tt0000005", 200, REFERENCES_PAGE, 1).await;

    let summary = run_crawl(workspace.json_config(&server), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.cache_hits, 9);
    assert_eq!(summary.dispatched, 1);
    assert!(workspace.archive_exists("tt0000005"));
}

#[tokio::test]
async fn test_page_without_references_is_archived_only() {
    let server = MockServer::start().await;
    mount_page(&server, "tt0000005", 200, NO_REFERENCES_PAGE, 1).await;

    let workspace = Workspace::new(&catalog(&["tt0000005"]));
    let summary = run_crawl(workspace.json_config(&server), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.empty, 1);
    assert_eq!(summary.persisted, 0);
    assert!(!workspace
        .path("reference_data")
        .join("0")
        .join(" tt0000005.json")
        .exists());
    assert!(workspace.process_log_lines().is_empty());
    assert!(workspace.archive_exists("tt0000005"));
}

#[tokio::test]
async fn test_csv_output_appends_rows() {
    let server = MockServer::start().await;
    mount_page(&server, "tt0000005", 200, REFERENCES_PAGE, 1).await;

    let workspace = Workspace::new(&catalog(&["tt0000005", "garbage"]));
    let config = workspace.csv_config(&server, "movieconnections/", "references");

    let summary = run_crawl(config, CancellationToken::new()).await.unwrap();
    assert_eq!(summary.malformed, 1);

    let content = fs::read_to_string(workspace.path("out/records.csv")).unwrap();
    assert_eq!(
        content,
        "tt0000005,/title/tt0000777,Shown on TV\ntt0000005,/title/tt0000888,Poster seen\n"
    );
}

#[tokio::test]
async fn test_details_profile_to_csv() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/title/tt0000005/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(DETAILS_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let workspace = Workspace::new(&catalog(&["tt0000005"]));
    let config = workspace.csv_config(&server, "", "details");

    let summary = run_crawl(config, CancellationToken::new()).await.unwrap();
    assert_eq!(summary.persisted, 1);

    let content = fs::read_to_string(workspace.path("out/records.csv")).unwrap();
    assert_eq!(content, "tt0000005,6.1,France,1m,,,,\n");
}

#[tokio::test]
async fn test_cancelled_crawl_dispatches_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(REFERENCES_PAGE))
        .expect(0)
        .mount(&server)
        .await;

    let workspace = Workspace::new(&catalog(&["tt0000005", "tt0000100"]));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let summary = run_crawl(workspace.json_config(&server), cancel)
        .await
        .unwrap();

    assert!(summary.interrupted);
    assert_eq!(summary.dispatched, 0);
}

#[tokio::test]
async fn test_missing_proxy_list_is_fatal() {
    let server = MockServer::start().await;
    let workspace = Workspace::new(&catalog(&["tt0000005"]));
    let mut config = workspace.json_config(&server);
    config.fetch.proxies_path = Some(
        Path::new("/nonexistent/proxies.txt")
            .to_string_lossy()
            .into_owned(),
    );

    assert!(run_crawl(config, CancellationToken::new()).await.is_err());
}
