//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use mkto_crawl::config::{Config, CrawlScope, EventsConfig, SeedKind};
use mkto_crawl::crawler::Coordinator;
use mkto_crawl::output::{CsvSink, FormId, FormRecord, CSV_HEADER};
use mkto_crawl::state::PageState;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with throttling off so tests run fast
fn create_test_config() -> Config {
    let mut config = Config::default();
    config.throttle.enabled = false;
    config.throttle.min_delay = 0.0;
    config
}

fn html(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body.into())
}

async fn mount_page(server: &MockServer, page_path: &str, body: impl Into<String>) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(html(body))
        .mount(server)
        .await;
}

async fn crawl(
    config: Config,
    seed: &str,
    kind: SeedKind,
) -> (Vec<FormRecord>, mkto_crawl::output::CrawlStatistics) {
    let scope = CrawlScope::from_seed(seed, kind).expect("valid seed");
    let mut coordinator = Coordinator::new(config, scope).expect("coordinator");
    let mut records: Vec<FormRecord> = Vec::new();
    let stats = coordinator.run(&mut records).await.expect("crawl completes");
    (records, stats)
}

fn records_for<'a>(records: &'a [FormRecord], url: &str) -> Vec<&'a FormRecord> {
    records.iter().filter(|r| r.url == url).collect()
}

#[tokio::test]
async fn test_full_crawl_extracts_forms() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/us/en/",
        r#"<html><head><title>Home</title>
            <meta name="description" content="Welcome">
        </head><body>
            <h1>Welcome
                home</h1>
            <script>MktoForms2.loadForm("//app-ab12.marketo.com", "123-ABC-456", "1234");</script>
            <a href="/us/en/contact">Contact</a>
            <a href="/us/en/plain">Plain</a>
        </body></html>"#,
    )
    .await;

    mount_page(
        &server,
        "/us/en/contact",
        r#"<html><head><title>Contact</title>
            <script src="//cdn.marketo.com/js/forms2/js/forms2.min.js"></script>
            <script>Munchkin.init('111-AAA-111');</script>
            <script>Munchkin.init('222-BBB-222');</script>
        </head><body>
            <form id="mktoForm_501"></form>
            <form id="mktoForm_502"></form>
        </body></html>"#,
    )
    .await;

    mount_page(&server, "/us/en/plain", "<html><body><p>No forms here</p></body></html>").await;

    let (records, stats) = crawl(
        create_test_config(),
        &format!("{}/us/en/", base),
        SeedKind::StartPage,
    )
    .await;

    assert_eq!(records.len(), 3);

    let home = records_for(&records, &format!("{}/us/en/", base));
    assert_eq!(home.len(), 1);
    assert_eq!(home[0].status, 200);
    assert_eq!(home[0].form_id, Some(FormId::Numeric(1234)));
    assert_eq!(home[0].marketo_domain.as_deref(), Some("app-ab12.marketo.com"));
    assert_eq!(home[0].munchkin_id.as_deref(), Some("123-ABC-456"));
    assert_eq!(home[0].title.as_deref(), Some("Home"));
    assert_eq!(home[0].meta_description.as_deref(), Some("Welcome"));
    assert_eq!(home[0].h1.as_deref(), Some("Welcome home"));
    assert!(home[0].from_experience_fragment.is_none());

    let mut contact = records_for(&records, &format!("{}/us/en/contact", base));
    contact.sort_by_key(|r| r.form_id.as_ref().and_then(FormId::as_numeric));
    assert_eq!(contact.len(), 2);
    assert_eq!(contact[0].form_id, Some(FormId::Numeric(501)));
    assert_eq!(contact[1].form_id, Some(FormId::Numeric(502)));
    for record in contact {
        assert_eq!(record.marketo_domain.as_deref(), Some("cdn.marketo.com"));
        assert_eq!(record.munchkin_id.as_deref(), Some("111-AAA-111; 222-BBB-222"));
    }

    assert_eq!(stats.count(PageState::Processed), 3);
    assert_eq!(stats.records_written, 3);
}

#[tokio::test]
async fn test_not_found_page_yields_error_record() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/us/en/",
        r#"<a href="/us/en/gone">Gone</a>"#,
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/us/en/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_string(
            r#"<script>MktoForms2.loadForm("//a.marketo.com", "1-A-1", 9);</script>
               <a href="/us/en/never">Never</a>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/us/en/never"))
        .respond_with(html("never"))
        .expect(0)
        .mount(&server)
        .await;

    let (records, stats) = crawl(
        create_test_config(),
        &format!("{}/us/en/", base),
        SeedKind::StartPage,
    )
    .await;

    assert_eq!(
        records,
        vec![FormRecord::not_found(format!("{}/us/en/gone", base), 404)]
    );
    assert_eq!(stats.count(PageState::NotFound), 1);
}

#[tokio::test]
async fn test_duplicate_links_fetched_once() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/us/en/"))
        .respond_with(html(
            r#"<a href="/us/en/a">A</a>
               <a href="/us/en/a#top">A again</a>
               <a href="/us/en/a">A once more</a>
               <a href="/us/en/b">B</a>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/us/en/a"))
        .respond_with(html(r#"<a href="/us/en/b">B</a><a href="/us/en/">Home</a>"#))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/us/en/b"))
        .respond_with(html(r#"<a href="/us/en/a">A</a>"#))
        .expect(1)
        .mount(&server)
        .await;

    let (_, stats) = crawl(
        create_test_config(),
        &format!("{}/us/en/", base),
        SeedKind::StartPage,
    )
    .await;

    assert_eq!(stats.total_fetched(), 3);
    assert_eq!(stats.requests_enqueued, 3);
    assert!(stats.duplicates_filtered >= 4);
}

#[tokio::test]
async fn test_redirect_target_goes_through_dedup() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/us/en/",
        r#"<a href="/us/en/old">Old</a><a href="/us/en/new">New</a><a href="/us/en/away">Away</a>"#,
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/us/en/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/us/en/new"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/us/en/away"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", "https://elsewhere.example.com/us/en/"),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/us/en/new"))
        .respond_with(html(
            r#"<script>MktoForms2.loadForm("//app-ab12.marketo.com", "123-ABC-456", 42);</script>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let (records, stats) = crawl(
        create_test_config(),
        &format!("{}/us/en/", base),
        SeedKind::StartPage,
    )
    .await;

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].url, format!("{}/us/en/new", base));
    assert_eq!(records[0].form_id, Some(FormId::Numeric(42)));
    assert_eq!(stats.count(PageState::Redirected), 2);
    assert_eq!(stats.count(PageState::Processed), 2);
}

#[tokio::test]
async fn test_allow_list_enforced() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/us/en/",
        r#"<a href="/fr/fr/contact">French</a>
           <a href="/us/english">Prefix only</a>
           <a href="https://other.example.com/us/en/page">Other host</a>
           <a href="/us/en/brochure.pdf">Brochure</a>
           <a href="/us/en/ok">OK</a>"#,
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/us/en/ok"))
        .respond_with(html("<p>ok</p>"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/(fr/fr/contact|us/english|us/en/brochure\.pdf)$"))
        .respond_with(html("<p>outside</p>"))
        .expect(0)
        .mount(&server)
        .await;

    let (records, stats) = crawl(
        create_test_config(),
        &format!("{}/us/en/", base),
        SeedKind::StartPage,
    )
    .await;

    assert!(records.is_empty());
    assert_eq!(stats.total_fetched(), 2);
}

#[tokio::test]
async fn test_experience_fragment_attribution() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/us/en/product",
        r##"<html><head><title>Product</title></head><body>
            <h1>The   Product</h1>
            <span id="ProgramName">Spring Campaign</span>
            <a data-target="#cta-modal" data-modal="/content/experience-fragments/cta/">Contact us</a>
        </body></html>"##,
    )
    .await;

    Mock::given(method("GET"))
        .and(path(
            "/content/experience-fragments/cta/jcr:content/root/responsivegrid.html",
        ))
        .respond_with(html(
            r#"<div class="modal"><script>
                MktoForms2.loadForm("//app-cd34.marketo.com", "999-ZZZ-999", 4321);
            </script></div>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let page_url = format!("{}/us/en/product", base);
    let (records, stats) = crawl(create_test_config(), &page_url, SeedKind::StartPage).await;

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.url, page_url);
    assert_eq!(record.status, 200);
    assert_eq!(record.form_id, Some(FormId::Numeric(4321)));
    assert_eq!(record.marketo_domain.as_deref(), Some("app-cd34.marketo.com"));
    assert_eq!(record.munchkin_id.as_deref(), Some("999-ZZZ-999"));
    assert_eq!(record.title.as_deref(), Some("Product"));
    assert_eq!(record.h1.as_deref(), Some("The Product"));
    assert_eq!(record.program_name.as_deref(), Some("Spring Campaign"));
    assert_eq!(record.from_experience_fragment, Some(true));
    assert_eq!(stats.fragment_records, 1);
}

#[tokio::test]
async fn test_shared_fragment_resolved_per_page() {
    let server = MockServer::start().await;
    let base = server.uri();
    let trigger = r##"<a data-target="#cta-modal" data-modal="/content/xf/shared">CTA</a>"##;

    mount_page(
        &server,
        "/us/en/",
        format!(r#"{}<a href="/us/en/second">Second</a>"#, trigger),
    )
    .await;
    mount_page(&server, "/us/en/second", trigger).await;

    Mock::given(method("GET"))
        .and(path("/content/xf/shared/jcr:content/root/responsivegrid.html"))
        .respond_with(html(
            r#"<script>MktoForms2.loadForm("//app-ab12.marketo.com", "123-ABC-456", 77);</script>"#,
        ))
        .expect(2)
        .mount(&server)
        .await;

    let (records, _) = crawl(
        create_test_config(),
        &format!("{}/us/en/", base),
        SeedKind::StartPage,
    )
    .await;

    let mut urls: Vec<&str> = records.iter().map(|r| r.url.as_str()).collect();
    urls.sort();
    assert_eq!(
        urls,
        vec![format!("{}/us/en/", base), format!("{}/us/en/second", base)]
    );
    assert!(records.iter().all(|r| r.from_experience_fragment == Some(true)));
}

#[tokio::test]
async fn test_failed_fragment_is_silent() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/us/en/",
        r##"<a data-target="#cta-modal" data-modal="/content/xf/broken">CTA</a>"##,
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/content/xf/broken/jcr:content/root/responsivegrid.html"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let (records, stats) = crawl(
        create_test_config(),
        &format!("{}/us/en/", base),
        SeedKind::StartPage,
    )
    .await;

    assert!(records.is_empty());
    assert_eq!(stats.count(PageState::Skipped), 1);
}

#[tokio::test]
async fn test_unexpected_status_is_skipped() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/us/en/",
        r#"<a href="/us/en/broken">Broken</a><a href="/us/en/fine">Fine</a>"#,
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/us/en/broken"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    mount_page(
        &server,
        "/us/en/fine",
        r#"<script>MktoForms2.loadForm("//app-ab12.marketo.com", "123-ABC-456", 5);</script>"#,
    )
    .await;

    let (records, stats) = crawl(
        create_test_config(),
        &format!("{}/us/en/", base),
        SeedKind::StartPage,
    )
    .await;

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].url, format!("{}/us/en/fine", base));
    assert_eq!(stats.count(PageState::Skipped), 1);
}

#[tokio::test]
async fn test_events_pagination() {
    let server = MockServer::start().await;
    let base = server.uri();
    let total = 37;

    let mut config = create_test_config();
    config.events = Some(EventsConfig::new(
        format!("{}/us/en/events", base),
        format!("{}/api/search/v1/search?appId=81", base),
    ));

    mount_page(&server, "/us/en/events", "<div id=\"events-app\"></div>").await;

    Mock::given(method("POST"))
        .and(path("/api/search/v1/search"))
        .and(body_partial_json(json!({
            "filters": {"all": [{"document_type": ["events"]}, {"language": "en_us"}]},
            "sort": [{"start_date": "desc"}],
            "page": {"current": 1, "size": 1}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": {"page": {"current": 1, "size": 1, "total_results": total}},
            "results": [{"url": {"raw": format!("{}/us/en/events/e0", base)}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let results: Vec<_> = (0..total)
        .map(|i| json!({"url": {"raw": format!("{}/us/en/events/e{}", base, i)}}))
        .collect();
    Mock::given(method("POST"))
        .and(path("/api/search/v1/search"))
        .and(body_partial_json(json!({"page": {"current": 1, "size": total}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": {"page": {"current": 1, "size": total, "total_results": total}},
            "results": results
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/us/en/events/e\d+$"))
        .respond_with(html(
            r#"<script>MktoForms2.loadForm("//app-ab12.marketo.com", "123-ABC-456", 100);</script>"#,
        ))
        .expect(total)
        .mount(&server)
        .await;

    let (records, stats) = crawl(config, &format!("{}/us/en/events", base), SeedKind::StartPage).await;

    assert_eq!(records.len(), total as usize);
    assert!(records.iter().all(|r| r.form_id == Some(FormId::Numeric(100))));
    // listing page + probe + listing + every event page
    assert_eq!(stats.total_fetched(), total + 3);
}

#[tokio::test]
async fn test_events_zero_results_ends_branch() {
    let server = MockServer::start().await;
    let base = server.uri();

    let mut config = create_test_config();
    config.events = Some(EventsConfig::new(
        format!("{}/us/en/events", base),
        format!("{}/api/search", base),
    ));

    mount_page(&server, "/us/en/events", "<div></div>").await;

    Mock::given(method("POST"))
        .and(path("/api/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": {"page": {"total_results": 0}},
            "results": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (records, stats) = crawl(config, &format!("{}/us/en/events/", base), SeedKind::StartPage).await;

    assert!(records.is_empty());
    assert_eq!(stats.total_fetched(), 2);
}

#[tokio::test]
async fn test_sitemap_mode() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/xml")
                .set_body_string(format!(
                    r#"<?xml version="1.0" encoding="UTF-8"?>
                    <sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
                      <sitemap><loc>{0}/sitemap-pages.xml</loc></sitemap>
                    </sitemapindex>"#,
                    base
                )),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sitemap-pages.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/xml")
                .set_body_string(format!(
                    r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
                      <url><loc>{0}/de/de/a</loc></url>
                      <url><loc>{0}/fr/fr/b</loc></url>
                      <url><loc>https://elsewhere.example.com/c</loc></url>
                    </urlset>"#,
                    base
                )),
        )
        .mount(&server)
        .await;

    mount_page(
        &server,
        "/de/de/a",
        r#"<script>MktoForms2.loadForm("//app-ab12.marketo.com", "123-ABC-456", 1);</script>
           <a href="/de/de/linked">Linked</a>"#,
    )
    .await;
    mount_page(
        &server,
        "/fr/fr/b",
        r#"<script>MktoForms2.loadForm("//app-ab12.marketo.com", "123-ABC-456", 2);</script>"#,
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/de/de/linked"))
        .respond_with(html("linked"))
        .expect(0)
        .mount(&server)
        .await;

    let (records, stats) = crawl(
        create_test_config(),
        &format!("{}/sitemap.xml", base),
        SeedKind::Sitemap,
    )
    .await;

    let mut ids: Vec<_> = records
        .iter()
        .filter_map(|r| r.form_id.as_ref().and_then(FormId::as_numeric))
        .collect();
    ids.sort();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(stats.total_fetched(), 4);
}

#[tokio::test]
async fn test_csv_output_append_and_overwrite() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("forms.csv");

    mount_page(
        &server,
        "/us/en/",
        r#"<script>MktoForms2.loadForm("//app-ab12.marketo.com", "123-ABC-456", "1234");</script>"#,
    )
    .await;

    let seed = format!("{}/us/en/", base);
    let run = |append: bool| {
        let seed = seed.clone();
        let output = output.clone();
        async move {
            let scope = CrawlScope::from_seed(&seed, SeedKind::StartPage).unwrap();
            let mut coordinator = Coordinator::new(create_test_config(), scope).unwrap();
            let mut sink = CsvSink::create(&output, append).unwrap();
            coordinator.run(&mut sink).await.unwrap();
        }
    };

    run(false).await;
    run(true).await;

    let content = std::fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    let row = format!(
        "{},200,,1234,app-ab12.marketo.com,123-ABC-456,,,,,",
        seed
    );
    assert_eq!(lines, vec![CSV_HEADER.join(",").as_str(), row.as_str(), row.as_str()]);

    run(false).await;
    let content = std::fs::read_to_string(&output).unwrap();
    assert_eq!(content.lines().count(), 2);
}
