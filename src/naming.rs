//! Sidecar naming conventions and the entry inclusion rules.
//!
//! A content directory mixes real entries with files that only describe
//! them. With the stock suffixes:
//!
//! | Name | Meaning |
//! |------|---------|
//! | `photo.jpg.d` | description of `photo.jpg` |
//! | `photo.jpg.d.jpeg` | icon of `photo.jpg` |
//! | `index.d` | short description of the directory |
//! | `content.d` | long description of the directory |
//! | `story.html.news` | news item announcing `story.html` |
//! | `home.link` | entry whose first line is its href |
//!
//! Sidecars are never listed, and neither are templates or the generated
//! index. An entry whose description exists but is empty, or starts with a
//! blank line, is hidden along with it.

use crate::config::{CONFIG_FILE, ConventionsConfig, SiteConfig};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const DIR_CURRENT: &str = ".";
const DIR_PARENT: &str = "..";

/// What to do with a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inclusion {
    Include,
    Exclude,
    /// A news sidecar: not listed, but fed to the news feed.
    News,
}

/// Apply the listing rules to `name`, an entry of `dir`.
pub fn classify_entry(dir: &Path, name: &str, config: &SiteConfig) -> Inclusion {
    let conventions = &config.conventions;
    if is_description_sidecar(name, conventions) {
        return Inclusion::Exclude;
    }
    if news_target(name, conventions).is_some() {
        return Inclusion::News;
    }
    if name == DIR_CURRENT
        || name == DIR_PARENT
        || name == config.outputs.index
        || name == CONFIG_FILE
        || is_template(name, config)
    {
        return Inclusion::Exclude;
    }
    let description = dir.join(format!("{name}{}", conventions.description_suffix));
    match starts_blank(&description) {
        Ok(true) => {
            info!("'{name}' rejected because of its empty description");
            Inclusion::Exclude
        }
        Ok(false) => Inclusion::Include,
        Err(e) if e.kind() == io::ErrorKind::NotFound => Inclusion::Include,
        Err(e) => {
            warn!("{}: {e}", description.display());
            Inclusion::Include
        }
    }
}

fn is_template(name: &str, config: &SiteConfig) -> bool {
    let templates = &config.templates;
    name == templates.index || name == templates.sitemap || name == templates.newsfeed
}

/// `true` if the file is empty or its first byte ends a line.
fn starts_blank(path: &Path) -> io::Result<bool> {
    let mut first = [0u8; 1];
    let read = File::open(path)?.read(&mut first)?;
    Ok(read == 0 || first[0] == b'\n' || first[0] == b'\r')
}

/// `*.d` or `*.d.*`: a description or an icon.
pub fn is_description_sidecar(name: &str, conventions: &ConventionsConfig) -> bool {
    let suffix = conventions.description_suffix.as_str();
    let hit = name.match_indices(suffix).any(|(at, _)| {
        let rest = &name[at + suffix.len()..];
        rest.is_empty() || rest.starts_with('.')
    });
    if hit {
        debug!("'{name}' is a sidecar");
    }
    hit
}

/// The announced name if `name` is a news sidecar: `a.html.news` → `a.html`.
pub fn news_target<'n>(name: &'n str, conventions: &ConventionsConfig) -> Option<&'n str> {
    name.strip_suffix(conventions.news_suffix.as_str())
        .filter(|target| !target.is_empty())
}

pub fn is_link(name: &str, conventions: &ConventionsConfig) -> bool {
    name.len() > conventions.link_suffix.len() && name.ends_with(conventions.link_suffix.as_str())
}

/// `<dir>/index.d` for directories, `<file>.d` for files.
pub fn description_path(
    dir: &Path,
    name: &str,
    is_dir: bool,
    conventions: &ConventionsConfig,
) -> PathBuf {
    if is_dir {
        dir.join(name).join(&conventions.directory_description)
    } else {
        dir.join(format!("{name}{}", conventions.description_suffix))
    }
}

/// `photo.jpg` → `photo.jpg.d.jpeg`.
pub fn icon_name(name: &str, conventions: &ConventionsConfig) -> String {
    format!(
        "{name}{}{}",
        conventions.description_suffix, conventions.icon_suffix
    )
}

/// `dir.jpeg` or `file.jpeg`.
pub fn generic_icon(is_dir: bool, conventions: &ConventionsConfig) -> String {
    let stem = if is_dir {
        &conventions.directory_icon
    } else {
        &conventions.file_icon
    };
    format!("{stem}{}", conventions.icon_suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::write_file;
    use tempfile::TempDir;

    fn conventions() -> ConventionsConfig {
        ConventionsConfig::default()
    }

    #[test]
    fn description_sidecars() {
        let c = conventions();
        assert!(is_description_sidecar("photo.jpg.d", &c));
        assert!(is_description_sidecar("photo.jpg.d.jpeg", &c));
        assert!(is_description_sidecar("index.d", &c));
        assert!(is_description_sidecar("a.d.b.d", &c));
        assert!(!is_description_sidecar("data.dat", &c));
        assert!(!is_description_sidecar("notes.doc", &c));
        assert!(!is_description_sidecar("readme", &c));
    }

    #[test]
    fn news_targets() {
        let c = conventions();
        assert_eq!(news_target("story.html.news", &c), Some("story.html"));
        assert_eq!(news_target("plain.news", &c), Some("plain"));
        assert_eq!(news_target(".news", &c), None);
        assert_eq!(news_target("newsletter.txt", &c), None);
    }

    #[test]
    fn link_names() {
        let c = conventions();
        assert!(is_link("home.link", &c));
        assert!(!is_link(".link", &c));
        assert!(!is_link("home.linked", &c));
    }

    #[test]
    fn sidecar_paths() {
        let c = conventions();
        let dir = Path::new("/site");
        assert_eq!(
            description_path(dir, "album", true, &c),
            PathBuf::from("/site/album/index.d")
        );
        assert_eq!(
            description_path(dir, "a.txt", false, &c),
            PathBuf::from("/site/a.txt.d")
        );
        assert_eq!(icon_name("a.txt", &c), "a.txt.d.jpeg");
        assert_eq!(generic_icon(true, &c), "dir.jpeg");
        assert_eq!(generic_icon(false, &c), "file.jpeg");
    }

    #[test]
    fn classify_standard_names() {
        let tmp = TempDir::new().unwrap();
        let config = SiteConfig::default();
        let dir = tmp.path();

        assert_eq!(classify_entry(dir, "photo.jpg", &config), Inclusion::Include);
        assert_eq!(classify_entry(dir, "photo.jpg.d", &config), Inclusion::Exclude);
        assert_eq!(classify_entry(dir, "a.news", &config), Inclusion::News);
        assert_eq!(classify_entry(dir, "index.html", &config), Inclusion::Exclude);
        assert_eq!(classify_entry(dir, CONFIG_FILE, &config), Inclusion::Exclude);
        assert_eq!(classify_entry(dir, ".", &config), Inclusion::Exclude);
        assert_eq!(classify_entry(dir, "..", &config), Inclusion::Exclude);
        assert_eq!(classify_entry(dir, ".sitemap.xml", &config), Inclusion::Exclude);
        assert_eq!(classify_entry(dir, "sitemap.xml", &config), Inclusion::Include);
    }

    #[test]
    fn blank_description_hides_entry() {
        let tmp = TempDir::new().unwrap();
        let config = SiteConfig::default();
        write_file(tmp.path(), "empty.txt.d", "");
        write_file(tmp.path(), "blank.txt.d", "\nlater text");
        write_file(tmp.path(), "crlf.txt.d", "\r\n");
        write_file(tmp.path(), "shown.txt.d", "Shown\n");

        let dir = tmp.path();
        assert_eq!(classify_entry(dir, "empty.txt", &config), Inclusion::Exclude);
        assert_eq!(classify_entry(dir, "blank.txt", &config), Inclusion::Exclude);
        assert_eq!(classify_entry(dir, "crlf.txt", &config), Inclusion::Exclude);
        assert_eq!(classify_entry(dir, "shown.txt", &config), Inclusion::Include);
        assert_eq!(classify_entry(dir, "undescribed.txt", &config), Inclusion::Include);
    }
}
