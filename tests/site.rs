//! End-to-end runs over a small content tree.
//!
//! ```text
//! root/
//! ├── .index.html  .sitemap.xml  .newsfeed.rss
//! ├── index.d                  "The archive"
//! ├── home.link                https://example.org/
//! ├── notes.txt
//! ├── story.html + story.html.news
//! └── photos/
//!     ├── index.d              "Holiday photos"
//!     ├── 2023/
//!     ├── beach.jpg + beach.jpg.d + beach.jpg.d.jpeg
//!     └── draft.jpg + draft.jpg.d (empty: hidden)
//! ```

use chrono::{DateTime, TimeZone, Utc};
use make_index::config::SiteConfig;
use make_index::generate::{self, GenerateError};
use make_index::scan;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

const INDEX_TEMPLATE: &str = "\
<h1>/@(pwd){/}</h1>
<a href=\"@(root){/}index.html\">home</a>
@(content)<ul>
@(files){<li><img src=\"@(fileicon)\" alt=\"@(filealt)\"><a href=\"@(filehref)\">@(filename)</a>@(filesize) @(filedesc)</li>
}</ul>
";

const SITEMAP_TEMPLATE: &str = "\
<urlset>
~
<url><loc>https://example.org/@(pwd){/}</loc><lastmod>@(now)</lastmod></url>
~
</urlset>
";

const NEWSFEED_TEMPLATE: &str = "\
<rss><channel>
~
<item><title>@(title)</title><pubDate>@(date)</pubDate><link>@(pwd){/}@(newsname)</link><description>@(news)</description></item>
~
</channel></rss>
";

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn read(root: &Path, rel: &str) -> String {
    fs::read_to_string(root.join(rel)).unwrap()
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn content_tree() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(root, ".index.html", INDEX_TEMPLATE);
    write(root, ".sitemap.xml", SITEMAP_TEMPLATE);
    write(root, ".newsfeed.rss", NEWSFEED_TEMPLATE);
    write(root, "index.d", "The archive\n");
    write(root, "home.link", "https://example.org/\n");
    write(root, "notes.txt", "");
    write(root, "story.html", "<p>Story</p>\n");
    write(root, "story.html.news", "2024-05-01\nWe moved\n");
    write(root, "photos/index.d", "Holiday photos\n");
    write(root, "photos/beach.jpg", &"x".repeat(2048));
    write(root, "photos/beach.jpg.d", "Sand\n");
    write(root, "photos/beach.jpg.d.jpeg", "");
    write(root, "photos/draft.jpg", "");
    write(root, "photos/draft.jpg.d", "");
    fs::create_dir_all(root.join("photos/2023")).unwrap();
    tmp
}

fn generated_indexes(root: &Path) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name() == "index.html")
        .map(|e| e.path().strip_prefix(root).unwrap().to_path_buf())
        .collect();
    found.sort();
    found
}

#[test]
fn writes_an_index_into_every_listed_directory() {
    let tmp = content_tree();
    let report = generate::generate(tmp.path(), &SiteConfig::default(), now()).unwrap();

    assert_eq!(
        generated_indexes(tmp.path()),
        vec![
            PathBuf::from("index.html"),
            PathBuf::from("photos/2023/index.html"),
            PathBuf::from("photos/index.html"),
        ]
    );
    let paths: Vec<_> = report.directories.iter().map(|d| d.path.as_str()).collect();
    assert_eq!(paths, ["", "photos/", "photos/2023/"]);
    assert!(report.diagnostics.is_empty());
}

#[test]
fn root_index_lists_entries_with_sidecars() {
    let tmp = content_tree();
    generate::generate(tmp.path(), &SiteConfig::default(), now()).unwrap();
    let index = read(tmp.path(), "index.html");

    assert!(index.starts_with("<h1>/</h1>\n<a href=\"index.html\">home</a>\nThe archive\n<ul>\n"));
    assert!(index.contains(
        "<li><img src=\"dir.jpeg\" alt=\"Dir\"><a href=\"photos\">photos</a> Holiday photos\n</li>"
    ));
    assert!(index.contains("<a href=\"https://example.org/\">home.link</a> (0 KB)"));
    assert!(index.contains("<a href=\"notes.txt\">notes.txt</a> (0 KB)"));
    assert!(index.contains("<a href=\"story.html\">story.html</a>"));
    assert!(!index.contains("story.html.news"));
    assert!(!index.contains("index.d"));
    assert!(!index.contains(".index.html"));
    assert!(index.ends_with("</ul>\n"));

    // Directories first, then files, case-insensitively sorted.
    let photos = index.find(">photos<").unwrap();
    let home = index.find(">home.link<").unwrap();
    let notes = index.find(">notes.txt<").unwrap();
    assert!(photos < home && home < notes);
}

#[test]
fn nested_index_climbs_back_to_the_root() {
    let tmp = content_tree();
    generate::generate(tmp.path(), &SiteConfig::default(), now()).unwrap();

    let photos = read(tmp.path(), "photos/index.html");
    assert!(photos.starts_with("<h1>/photos/</h1>\n<a href=\"../index.html\">home</a>\nHoliday photos\n"));
    assert!(photos.contains("<li><img src=\"../dir.jpeg\" alt=\"Dir\"><a href=\"2023\">2023</a> </li>"));
    assert!(photos.contains(
        "<li><img src=\"beach.jpg.d.jpeg\" alt=\"File\"><a href=\"beach.jpg\">beach.jpg</a> (2 KB) Sand\n</li>"
    ));
    assert!(!photos.contains("draft.jpg"));

    let year = read(tmp.path(), "photos/2023/index.html");
    assert_eq!(
        year,
        "<h1>/photos/2023/</h1>\n<a href=\"../../index.html\">home</a>\n<ul>\n</ul>\n"
    );
}

#[test]
fn sitemap_has_head_one_body_per_directory_and_tail() {
    let tmp = content_tree();
    let report = generate::generate(tmp.path(), &SiteConfig::default(), now()).unwrap();

    assert_eq!(
        read(tmp.path(), "sitemap.xml"),
        "<urlset>\n\
         <url><loc>https://example.org/</loc><lastmod>2024-06-01T12:00:00Z</lastmod></url>\n\
         <url><loc>https://example.org/photos/</loc><lastmod>2024-06-01T12:00:00Z</lastmod></url>\n\
         <url><loc>https://example.org/photos/2023/</loc><lastmod>2024-06-01T12:00:00Z</lastmod></url>\n\
         </urlset>\n"
    );
    assert!(report.outputs.contains(&tmp.path().join("sitemap.xml")));
}

#[test]
fn newsfeed_carries_each_news_item() {
    let tmp = content_tree();
    write(tmp.path(), "photos/album.html", "Album\n");
    write(tmp.path(), "photos/album.html.news", "2024-04-02\nNew album\n");

    let report = generate::generate(tmp.path(), &SiteConfig::default(), now()).unwrap();

    assert_eq!(
        read(tmp.path(), "newsfeed.rss"),
        "<rss><channel>\n\
         <item><title>We moved</title><pubDate>2024-05-01</pubDate><link>story.html</link><description><p>Story</p>\n</description></item>\n\
         <item><title>New album</title><pubDate>2024-04-02</pubDate><link>photos/album.html</link><description>Album\n</description></item>\n\
         </channel></rss>\n"
    );
    assert_eq!(report.news.len(), 2);
    assert_eq!(report.news[1].path, "photos/album.html");
}

#[test]
fn second_run_produces_identical_outputs() {
    let tmp = content_tree();
    let config = SiteConfig::default();
    generate::generate(tmp.path(), &config, now()).unwrap();
    let first: Vec<String> = ["index.html", "photos/index.html", "sitemap.xml", "newsfeed.rss"]
        .iter()
        .map(|rel| read(tmp.path(), rel))
        .collect();

    generate::generate(tmp.path(), &config, now()).unwrap();
    let second: Vec<String> = ["index.html", "photos/index.html", "sitemap.xml", "newsfeed.rss"]
        .iter()
        .map(|rel| read(tmp.path(), rel))
        .collect();

    assert_eq!(first, second);
}

#[test]
fn malformed_templates_are_diagnosed_not_fatal() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), ".index.html", "ok @(nosuchwidget) @(files){@(filename)} tail @(oops");
    write(tmp.path(), "a.txt", "");

    let report = generate::generate(tmp.path(), &SiteConfig::default(), now()).unwrap();

    assert_eq!(read(tmp.path(), "index.html"), "ok  a.txt tail @(oops");
    let messages: Vec<_> = report.diagnostics.iter().map(|d| d.message.as_str()).collect();
    assert_eq!(messages.len(), 2);
    assert!(messages[0].contains("nosuchwidget"));
    assert!(messages[1].contains("no closing"));
}

#[test]
fn no_templates_is_fatal() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "a.txt", "");
    let err = generate::build(tmp.path(), now()).unwrap_err();
    assert!(matches!(err, GenerateError::NoTemplates { .. }));
}

#[test]
fn check_writes_nothing() {
    let tmp = content_tree();
    let report = scan::scan(tmp.path()).unwrap();

    assert!(generated_indexes(tmp.path()).is_empty());
    assert!(!tmp.path().join("sitemap.xml").exists());
    assert_eq!(report.directories.len(), 3);
    assert_eq!(report.news.len(), 1);
    assert!(report.templates.iter().all(|t| t.present));
}
