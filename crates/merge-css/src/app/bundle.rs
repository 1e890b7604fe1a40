//! Recursive bundling of a stylesheet and everything it imports.

use std::collections::HashSet;

use encoding_rs::{Encoding, UTF_8};
use url::Url;

use crate::app::charset::split_charset;
use crate::app::imports::scan_imports;
use crate::app::mask::mask_comments;
use crate::app::resolve::resolve_import;
use crate::domain::errors::BundleError;
use crate::domain::model::Origin;
use crate::infra::config::{Config, DEFAULT_USER_AGENT};
use crate::infra::fetch::{Fetcher, OriginLoader};

/// Policy knobs for one merge run.
#[derive(Debug, Clone)]
pub struct BundleSettings {
    /// Base for resolving site-root imports such as `/assets/site.css`.
    pub base_url: Option<Url>,
    /// Encoding used to decode local files.
    pub encoding: &'static Encoding,
    /// When false, imports are left untouched and inputs are simply concatenated.
    pub inline_imports: bool,
    /// When false, imports resolving to remote URLs are left verbatim.
    pub fetch_remote_imports: bool,
    pub user_agent: String,
}

impl Default for BundleSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            encoding: UTF_8,
            inline_imports: true,
            fetch_remote_imports: false,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl BundleSettings {
    /// Build settings from configuration, validating the encoding label and base URL.
    pub fn from_config(config: &Config) -> Result<Self, BundleError> {
        let label = config.bundle.encoding();
        let encoding = Encoding::for_label_no_replacement(label.trim().as_bytes())
            .ok_or_else(|| BundleError::UnknownEncoding(label.to_owned()))?;

        let base_url = config
            .bundle
            .base_url()
            .map(|raw| {
                Url::parse(raw).map_err(|source| BundleError::InvalidBaseUrl {
                    url: raw.to_owned(),
                    source,
                })
            })
            .transpose()?;

        Ok(Self {
            base_url,
            encoding,
            inline_imports: config.bundle.inline_imports(),
            fetch_remote_imports: config.bundle.fetch_remote_imports(),
            user_agent: config.bundle.user_agent().to_owned(),
        })
    }

    /// Loader reading local files and remote URLs according to these settings.
    pub fn fetcher(&self) -> Fetcher {
        Fetcher::new(self.encoding, self.user_agent.clone())
    }
}

/// Mutable state shared by every recursive bundle call of one merge run.
#[derive(Debug)]
pub struct BundleContext {
    settings: BundleSettings,
    visited: HashSet<Origin>,
    bundled: Vec<Origin>,
    charset: Option<String>,
}

impl BundleContext {
    pub fn new(settings: BundleSettings) -> Self {
        Self {
            settings,
            visited: HashSet::new(),
            bundled: Vec::new(),
            charset: None,
        }
    }

    /// The first `@charset` statement seen in this run.
    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    /// Origins bundled so far, in visit order.
    pub fn bundled(&self) -> &[Origin] {
        &self.bundled
    }

    pub fn is_visited(&self, origin: &Origin) -> bool {
        self.visited.contains(origin)
    }

    /// Record `origin` as visited. Returns false when it was already seen.
    pub fn mark_visited(&mut self, origin: &Origin) -> bool {
        if !self.visited.insert(origin.clone()) {
            return false;
        }
        self.bundled.push(origin.clone());
        true
    }

    /// Keep `statement` unless a charset was already recorded. Returns whether it was kept.
    pub fn record_charset(&mut self, statement: &str) -> bool {
        if self.charset.is_some() {
            return false;
        }
        self.charset = Some(statement.to_owned());
        true
    }

    pub fn into_parts(self) -> (Vec<Origin>, Option<String>) {
        (self.bundled, self.charset)
    }
}

/// Flattens stylesheets by inlining their `@import` statements depth-first.
pub struct Bundler<L> {
    loader: L,
    ctx: BundleContext,
}

impl<L: OriginLoader> Bundler<L> {
    pub fn new(settings: BundleSettings, loader: L) -> Self {
        Self {
            loader,
            ctx: BundleContext::new(settings),
        }
    }

    pub fn into_context(self) -> BundleContext {
        self.ctx
    }

    /// Load `origin` and return its text with imports inlined.
    ///
    /// An origin already bundled in this run contributes nothing, which is what terminates
    /// import cycles.
    pub fn bundle_origin(&mut self, origin: &Origin) -> Result<String, BundleError> {
        if !self.ctx.mark_visited(origin) {
            tracing::debug!(%origin, "already bundled; skipping");
            return Ok(String::new());
        }

        tracing::debug!(%origin, "bundling stylesheet");
        let css = self.loader.load(origin)?;
        let split = split_charset(&css);
        if let Some(statement) = split.statement {
            if self.ctx.record_charset(statement) {
                tracing::debug!(%origin, statement, "recorded charset");
            } else {
                tracing::debug!(%origin, statement, "dropping later charset");
            }
        }

        self.inline_imports(split.body, origin)
    }

    /// Replace every `@import` in `css` (which came from `origin`) with the bundled target.
    pub fn inline_imports(&mut self, css: &str, origin: &Origin) -> Result<String, BundleError> {
        if !self.ctx.settings.inline_imports {
            return Ok(css.to_owned());
        }

        let masked = mask_comments(css);
        let directives = scan_imports(&masked);
        if directives.is_empty() {
            return Ok(css.to_owned());
        }

        let mut out = String::with_capacity(css.len());
        let mut last = 0;

        for directive in directives {
            let span = directive.span.clone();
            out.push_str(&css[last..span.start]);
            last = span.end;
            let statement = &css[span];

            let resolved = resolve_import(
                origin,
                &directive.target,
                self.ctx.settings.base_url.as_ref(),
            );
            let Some(resolved) = resolved else {
                tracing::debug!(
                    %origin,
                    import = %directive.target,
                    "import not fetchable; kept"
                );
                out.push_str(statement);
                continue;
            };

            if resolved.is_remote() && !self.ctx.settings.fetch_remote_imports {
                tracing::debug!(%origin, import = %resolved, "remote import kept");
                out.push_str(statement);
                continue;
            }

            let imported = self.bundle_origin(&resolved)?;
            if imported.trim().is_empty() {
                continue;
            }

            if directive.has_media() {
                out.push_str("@media ");
                out.push_str(&directive.media);
                out.push_str(" {\n");
                out.push_str(&imported);
                out.push_str("\n}\n");
            } else {
                out.push_str(&imported);
                if !imported.ends_with('\n') && !starts_with_line_break(&css[last..]) {
                    out.push('\n');
                }
            }
        }

        out.push_str(&css[last..]);
        Ok(out)
    }
}

fn starts_with_line_break(text: &str) -> bool {
    text.starts_with('\n') || text.starts_with("\r\n")
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::fs;
    use std::path::Path;

    use super::*;

    /// Serves remote origins from memory and local ones from disk, counting loads.
    #[derive(Default)]
    struct MemoryLoader {
        remote: HashMap<String, String>,
        loads: RefCell<Vec<String>>,
    }

    impl MemoryLoader {
        fn with_remote(mut self, url: &str, css: &str) -> Self {
            self.remote.insert(url.to_owned(), css.to_owned());
            self
        }
    }

    impl OriginLoader for MemoryLoader {
        fn load(&self, origin: &Origin) -> Result<String, BundleError> {
            self.loads.borrow_mut().push(origin.to_string());
            match origin {
                Origin::Local(path) => {
                    fs::read_to_string(path).map_err(|source| BundleError::Read {
                        path: path.clone(),
                        source,
                    })
                }
                Origin::Remote(url) => {
                    self.remote
                        .get(url)
                        .cloned()
                        .ok_or_else(|| BundleError::Fetch {
                            url: url.clone(),
                            reason: "not served".into(),
                        })
                }
            }
        }
    }

    fn write(dir: &Path, name: &str, css: &str) -> Origin {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create fixture dir");
        }
        fs::write(&path, css).expect("write fixture");
        Origin::local(path)
    }

    fn bundle(settings: BundleSettings, origin: &Origin) -> (String, BundleContext) {
        let mut bundler = Bundler::new(settings, MemoryLoader::default());
        let css = bundler.bundle_origin(origin).expect("bundle");
        (css, bundler.into_context())
    }

    #[test]
    fn inlines_sibling_import_in_place() {
        let temp = tempfile::tempdir().unwrap();
        let a = write(temp.path(), "a.css", "@import \"b.css\";\n.a{color:blue}");
        write(temp.path(), "b.css", ".b{color:green}");

        let (css, _) = bundle(BundleSettings::default(), &a);
        assert_eq!(css, ".b{color:green}\n.a{color:blue}");
    }

    #[test]
    fn separates_import_from_following_rule_on_same_line() {
        let temp = tempfile::tempdir().unwrap();
        let a = write(temp.path(), "a.css", "@import 'b.css';.a{}");
        write(temp.path(), "b.css", ".b{}");

        let (css, _) = bundle(BundleSettings::default(), &a);
        assert_eq!(css, ".b{}\n.a{}");
    }

    #[test]
    fn import_cycles_terminate_and_include_each_sheet_once() {
        let temp = tempfile::tempdir().unwrap();
        let a = write(temp.path(), "a.css", "@import \"b.css\";\n.a{}\n");
        write(temp.path(), "b.css", "@import \"a.css\";\n.b{}\n");

        let (css, ctx) = bundle(BundleSettings::default(), &a);
        assert_eq!(css, "\n.b{}\n\n.a{}\n");
        assert_eq!(css.matches(".b{}").count(), 1);
        assert_eq!(ctx.bundled().len(), 2);
        assert!(ctx.is_visited(&a));
        assert!(ctx.is_visited(&Origin::local(temp.path().join("b.css"))));
        assert!(!ctx.is_visited(&Origin::local(temp.path().join("c.css"))));
    }

    #[test]
    fn repeated_import_is_dropped_after_first_inclusion() {
        let temp = tempfile::tempdir().unwrap();
        let a = write(
            temp.path(),
            "a.css",
            "@import \"shared.css\";\n@import \"./shared.css\";\n.a{}",
        );
        write(temp.path(), "shared.css", ".shared{}\n");

        let mut bundler = Bundler::new(BundleSettings::default(), MemoryLoader::default());
        let css = bundler.bundle_origin(&a).unwrap();
        assert_eq!(css, ".shared{}\n\n\n.a{}");
        assert_eq!(bundler.loader.loads.borrow().len(), 2);
    }

    #[test]
    fn first_charset_wins_and_later_ones_are_stripped() {
        let temp = tempfile::tempdir().unwrap();
        let a = write(
            temp.path(),
            "a.css",
            "@charset \"utf-8\";\n@import \"b.css\";\n.a{}",
        );
        write(temp.path(), "b.css", "@charset \"iso-8859-1\";\n.b{}");

        let (css, ctx) = bundle(BundleSettings::default(), &a);
        assert_eq!(ctx.charset(), Some("@charset \"utf-8\";"));
        assert!(!css.contains("@charset"));
        assert_eq!(css, ".b{}\n.a{}");
    }

    #[test]
    fn media_qualified_import_is_wrapped() {
        let temp = tempfile::tempdir().unwrap();
        let a = write(temp.path(), "a.css", "@import \"b.css\" screen;");
        write(temp.path(), "b.css", ".x{color:red}");

        let (css, _) = bundle(BundleSettings::default(), &a);
        assert_eq!(css, "@media screen {\n.x{color:red}\n}\n");
    }

    #[test]
    fn non_fetchable_import_is_kept_verbatim() {
        let temp = tempfile::tempdir().unwrap();
        let source = "@import \"data:text/css,.x{color:red}\";\n.a{}";
        let a = write(temp.path(), "a.css", source);

        let (css, _) = bundle(BundleSettings::default(), &a);
        assert_eq!(css, source);
    }

    #[test]
    fn commented_out_imports_are_ignored() {
        let temp = tempfile::tempdir().unwrap();
        let source = "/* @import \"missing.css\"; */\n.a{}";
        let a = write(temp.path(), "a.css", source);

        let (css, _) = bundle(BundleSettings::default(), &a);
        assert_eq!(css, source);
    }

    #[test]
    fn disabled_inlining_leaves_imports_untouched() {
        let temp = tempfile::tempdir().unwrap();
        let a = write(
            temp.path(),
            "a.css",
            "@charset \"utf-8\";\n@import \"b.css\";\n.a{}",
        );
        write(temp.path(), "b.css", ".b{}");

        let settings = BundleSettings {
            inline_imports: false,
            ..BundleSettings::default()
        };
        let (css, ctx) = bundle(settings, &a);
        assert_eq!(css, "@import \"b.css\";\n.a{}");
        assert_eq!(ctx.charset(), Some("@charset \"utf-8\";"));
    }

    #[test]
    fn remote_imports_are_kept_unless_fetching_is_enabled() {
        let temp = tempfile::tempdir().unwrap();
        let source = "@import url(\"https://cdn.example/r.css\");\n.a{}";
        let a = write(temp.path(), "a.css", source);

        let (css, ctx) = bundle(BundleSettings::default(), &a);
        assert_eq!(css, source);
        assert_eq!(ctx.bundled().len(), 1);

        let loader = MemoryLoader::default().with_remote(
            "https://cdn.example/r.css",
            "@import \"nested.css\" print;\n.r{}",
        );
        let loader = loader.with_remote("https://cdn.example/nested.css", ".n{}");
        let settings = BundleSettings {
            fetch_remote_imports: true,
            ..BundleSettings::default()
        };
        let mut bundler = Bundler::new(settings, loader);
        let css = bundler.bundle_origin(&a).unwrap();
        assert_eq!(css, "@media print {\n.n{}\n}\n\n.r{}\n.a{}");
    }

    #[test]
    fn site_root_import_uses_base_url() {
        let temp = tempfile::tempdir().unwrap();
        let a = write(temp.path(), "a.css", "@import \"/theme.css?v=1\";");

        let loader = MemoryLoader::default()
            .with_remote("https://forum.example/theme.css?v=1", ".theme{}");
        let settings = BundleSettings {
            base_url: Some(Url::parse("https://forum.example/t/42").unwrap()),
            fetch_remote_imports: true,
            ..BundleSettings::default()
        };
        let mut bundler = Bundler::new(settings, loader);
        assert_eq!(bundler.bundle_origin(&a).unwrap(), ".theme{}\n");
    }

    #[test]
    fn fetch_failures_abort_the_bundle() {
        let temp = tempfile::tempdir().unwrap();
        let a = write(temp.path(), "a.css", "@import \"missing.css\";");

        let mut bundler = Bundler::new(BundleSettings::default(), MemoryLoader::default());
        let err = bundler.bundle_origin(&a).unwrap_err();
        assert!(matches!(err, BundleError::Read { .. }));
    }

    #[test]
    fn bundling_is_deterministic() {
        let temp = tempfile::tempdir().unwrap();
        let a = write(
            temp.path(),
            "a.css",
            "@import \"nested/b.css\" screen;\n@import \"c.css\";\n.a{}",
        );
        write(temp.path(), "nested/b.css", "@import \"../c.css\";\n.b{}");
        write(temp.path(), "c.css", ".c{}");

        let (first, _) = bundle(BundleSettings::default(), &a);
        let (second, _) = bundle(BundleSettings::default(), &a);
        assert_eq!(first, second);
        assert_eq!(first.matches(".c{}").count(), 1);
    }

    #[test]
    fn settings_reject_unknown_encoding_and_bad_base_url() {
        let mut config = Config::default();
        config.bundle.encoding = Some("no-such-encoding".into());
        assert!(matches!(
            BundleSettings::from_config(&config),
            Err(BundleError::UnknownEncoding(_))
        ));

        config.bundle.encoding = Some("iso-2022-kr".into());
        assert!(matches!(
            BundleSettings::from_config(&config),
            Err(BundleError::UnknownEncoding(label)) if label == "iso-2022-kr"
        ));

        let mut config = Config::default();
        config.bundle.base_url = Some("not a url".into());
        assert!(matches!(
            BundleSettings::from_config(&config),
            Err(BundleError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn settings_follow_configuration() {
        let mut config = Config::default();
        config.bundle.encoding = Some("latin1".into());
        config.bundle.base_url = Some("https://forum.example/".into());
        config.bundle.inline_imports = Some(false);

        let settings = BundleSettings::from_config(&config).unwrap();
        assert_eq!(settings.encoding.name(), "windows-1252");
        assert_eq!(
            settings.base_url.as_ref().map(Url::as_str),
            Some("https://forum.example/")
        );
        assert!(!settings.inline_imports);
        assert_eq!(settings.user_agent, DEFAULT_USER_AGENT);
    }
}
